use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{NaiveDate, TimeZone, Utc};
use jobboard_scraper::{
    models::listing::{ListingRecord, PayPeriod, WorkType},
    routes,
    services::{
        file_store::JsonFileStore,
        listing_store::ListingStore,
        sink::{persist, SinkPolicy},
    },
    AppState,
};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

const API_KEY: &str = "test-key-123";

fn temp_listings_path() -> PathBuf {
    std::env::temp_dir()
        .join(format!("jobboard-api-{}", rand::random::<u64>()))
        .join("jobs.json")
}

fn sample_listings() -> Vec<ListingRecord> {
    vec![
        ListingRecord {
            id: "1f2e3d4c".into(),
            search_keyword: "Front Desk Agent".into(),
            location: "Sydney".into(),
            title: "Front Desk Agent".into(),
            employer: "Harbour Hotel".into(),
            work_type: Some(WorkType::FullTime),
            salary: "$65,000 - $70,000 a year".into(),
            min_salary: Some(65000.0),
            max_salary: Some(70000.0),
            pay_period: Some(PayPeriod::Yearly),
            date_posted: NaiveDate::from_ymd_opt(2024, 3, 12).unwrap(),
            summary: "Join our front office team.".into(),
            description_html: "<p>Join our front office team. Email hr@harbour.com.au</p>".into(),
            listing_url: "https://au.jora.com/job/Front-Desk-Agent-1f2e3d4c".into(),
            apply_url: "https://careers.harbour.com.au/apply/1".into(),
            emails: vec!["hr@harbour.com.au".into()],
            source: "Jora Australia".into(),
            scraped_at: Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap(),
        },
        ListingRecord {
            id: "81234567".into(),
            search_keyword: "Accountant".into(),
            location: "Melbourne VIC".into(),
            title: "Accountant".into(),
            employer: "Employer not specified".into(),
            work_type: None,
            salary: "Salary not specified".into(),
            min_salary: None,
            max_salary: None,
            pay_period: None,
            date_posted: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            summary: "Summary not available".into(),
            description_html: "No description available".into(),
            listing_url: "https://www.seek.com.au/job/81234567".into(),
            apply_url: String::new(),
            emails: vec![],
            source: "Seek Australia".into(),
            scraped_at: Utc.with_ymd_and_hms(2024, 3, 15, 10, 31, 0).unwrap(),
        },
    ]
}

async fn app_with(listings: Vec<ListingRecord>) -> Router {
    let store = JsonFileStore::new(temp_listings_path());
    persist(&store, listings, SinkPolicy::default())
        .await
        .expect("seed listings");
    let store: Arc<dyn ListingStore> = Arc::new(store);
    routes::router(AppState::new(store, API_KEY))
}

async fn body_json(resp: axum::response::Response) -> JsonValue {
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn root_returns_welcome_message() {
    let app = app_with(Vec::new()).await;

    let req = Request::builder().uri("/").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        body_json(resp).await,
        json!({
            "message": "Welcome to the Job Listings API! Please use an API Key to access job listings."
        })
    );
}

#[tokio::test]
async fn listings_round_trip_through_the_api() {
    let listings = sample_listings();
    let app = app_with(listings.clone()).await;

    let req = Request::builder()
        .uri(format!("/jobs?api_key={}", API_KEY))
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let served: Vec<ListingRecord> = serde_json::from_value(body_json(resp).await).unwrap();
    assert_eq!(served, listings);
}

#[tokio::test]
async fn wire_format_uses_enum_names_and_iso_dates() {
    let app = app_with(sample_listings()).await;

    let req = Request::builder()
        .uri("/jobs")
        .header("x-api-key", API_KEY)
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body[0]["work_type"], "FULL_TIME");
    assert_eq!(body[0]["pay_period"], "yearly");
    assert_eq!(body[0]["date_posted"], "2024-03-12");
    assert_eq!(body[1]["work_type"], JsonValue::Null);
    assert_eq!(body[1]["apply_url"], "");
}

#[tokio::test]
async fn missing_or_wrong_key_is_rejected() {
    let app = app_with(sample_listings()).await;

    for uri in ["/jobs", "/jobs?api_key=wrong", "/jobs?api_key="] {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body_json(resp).await, json!({ "error": "Invalid API Key" }));
    }

    let req = Request::builder()
        .uri("/jobs")
        .header("x-api-key", "test-key-12")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn empty_store_serves_empty_array() {
    let store: Arc<dyn ListingStore> = Arc::new(JsonFileStore::new(temp_listings_path()));
    let app = routes::router(AppState::new(store, API_KEY));

    let req = Request::builder()
        .uri(format!("/jobs?api_key={}", API_KEY))
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!([]));
}

#[tokio::test]
async fn corrupt_store_yields_server_error() {
    let path = temp_listings_path();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"not json").unwrap();
    let store: Arc<dyn ListingStore> = Arc::new(JsonFileStore::new(&path));
    let app = routes::router(AppState::new(store, API_KEY));

    let req = Request::builder()
        .uri("/jobs")
        .header("x-api-key", API_KEY)
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_json(resp).await["error"].is_string());
}

#[tokio::test]
async fn openapi_document_lists_routes() {
    let app = app_with(Vec::new()).await;

    let req = Request::builder()
        .uri("/api-docs/openapi.json")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let doc = body_json(resp).await;
    assert!(doc["paths"]["/jobs"]["get"].is_object());
    assert!(doc["paths"]["/"]["get"].is_object());
}

#[tokio::test]
async fn skip_existing_run_keeps_earlier_file_records() {
    let path = temp_listings_path();
    let samples = sample_listings();
    let (first, second) = (samples[0].clone(), samples[1].clone());
    let mut third = first.clone();
    third.id = "9a8b7c6d".into();
    third.listing_url = "https://au.jora.com/job/Front-Desk-Agent-9a8b7c6d".into();

    persist(
        &JsonFileStore::new(&path),
        vec![first.clone(), second.clone()],
        SinkPolicy::default(),
    )
    .await
    .unwrap();

    let store = JsonFileStore::appending(&path);
    let policy = SinkPolicy {
        skip_existing: true,
        ..SinkPolicy::default()
    };
    let written = persist(&store, vec![first.clone(), third.clone()], policy)
        .await
        .unwrap();
    assert_eq!(written, 1);

    let store: Arc<dyn ListingStore> = Arc::new(store);
    let app = routes::router(AppState::new(store, API_KEY));
    let req = Request::builder()
        .uri(format!("/jobs?api_key={}", API_KEY))
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let served: Vec<ListingRecord> = serde_json::from_value(body_json(resp).await).unwrap();
    assert_eq!(served, vec![first, second, third]);
}
