use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const WELCOME_MESSAGE: &str =
    "Welcome to the Job Listings API! Please use an API Key to access job listings.";

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ApiKeyQuery {
    /// Alternative to the `x-api-key` header.
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WelcomeResponse {
    pub message: String,
}

impl Default for WelcomeResponse {
    fn default() -> Self {
        Self {
            message: WELCOME_MESSAGE.to_string(),
        }
    }
}
