use axum::{http::StatusCode, response::IntoResponse, Json};

use crate::dto::listing_dto::WelcomeResponse;

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Welcome message", body = WelcomeResponse)
    )
)]
#[axum::debug_handler]
pub async fn root() -> impl IntoResponse {
    (StatusCode::OK, Json(WelcomeResponse::default()))
}
