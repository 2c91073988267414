use axum::{response::IntoResponse, Json};
use utoipa::OpenApi;

use crate::dto::listing_dto::WelcomeResponse;
use crate::models::listing::{ListingRecord, PayPeriod, WorkType};

#[derive(OpenApi)]
#[openapi(
    paths(super::health::root, super::listings::list_listings),
    components(schemas(WelcomeResponse, ListingRecord, WorkType, PayPeriod)),
    info(title = "Job Listings API")
)]
pub struct ApiDoc;

pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
