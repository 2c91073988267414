use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use tracing::debug;

use crate::{error::Result, AppState};

#[utoipa::path(
    get,
    path = "/jobs",
    params(
        crate::dto::listing_dto::ApiKeyQuery,
        ("x-api-key" = Option<String>, Header, description = "API key, when not passed as a query parameter")
    ),
    responses(
        (status = 200, description = "Every stored listing", body = Vec<crate::models::listing::ListingRecord>),
        (status = 401, description = "Missing or invalid API key"),
        (status = 500, description = "Storage failure")
    )
)]
#[axum::debug_handler]
pub async fn list_listings(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let listings = state.store.list_all().await?;
    debug!(count = listings.len(), "Serving listings");
    Ok(Json(listings))
}
