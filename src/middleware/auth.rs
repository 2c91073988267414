use axum::{
    extract::{Query, Request, State},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use crate::{
    dto::listing_dto::ApiKeyQuery,
    error::{Error, Result},
    AppState,
};

pub const API_KEY_HEADER: &str = "x-api-key";
const INVALID_API_KEY: &str = "Invalid API Key";

/// Rejects the request unless the `api_key` query parameter or the
/// `x-api-key` header matches the configured key.
pub async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response> {
    let provided = provided_key(&req).ok_or_else(invalid_key)?;
    if ConstantTimeEq::ct_eq(provided.as_bytes(), state.api_key.as_bytes()).into() {
        Ok(next.run(req).await)
    } else {
        Err(invalid_key())
    }
}

fn provided_key(req: &Request) -> Option<String> {
    let from_query = Query::<ApiKeyQuery>::try_from_uri(req.uri())
        .ok()
        .and_then(|Query(query)| query.api_key);
    from_query.or_else(|| {
        req.headers()
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    })
}

fn invalid_key() -> Error {
    Error::Unauthorized(INVALID_API_KEY.into())
}
