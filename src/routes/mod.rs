pub mod docs;
pub mod health;
pub mod listings;

use axum::{middleware, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{middleware::auth::require_api_key, AppState};

/// Public root and docs, plus the key-protected listings route.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/jobs", get(listings::list_listings))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    Router::new()
        .route("/", get(health::root))
        .route("/api-docs/openapi.json", get(docs::openapi_json))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
