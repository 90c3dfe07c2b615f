use std::env;

use crate::error::{RecommendError, Result};

const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// All credentials and tunables the service needs, resolved once at startup.
///
/// Collaborators receive their keys from this struct at construction time;
/// nothing else in the crate reads the process environment.
#[derive(Clone, Debug)]
pub struct Settings {
    pub openai_api_key: String,
    pub openai_base_url: Option<String>,
    pub model: String,
    pub vworld_api_key: Option<String>,
    pub kma_service_key: Option<String>,
    pub google_maps_api_key: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let openai_api_key = env::var("OPENAI_API_KEY").map_err(|_| {
            RecommendError::Config(
                "OPENAI_API_KEY environment variable must be set before starting the service"
                    .to_string(),
            )
        })?;

        Ok(Self {
            openai_api_key,
            openai_base_url: non_empty(env::var("OPENAI_BASE_URL").ok()),
            model: non_empty(env::var("OPENAI_MODEL").ok())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            vworld_api_key: non_empty(env::var("VWORLD_API_KEY").ok()),
            kma_service_key: non_empty(env::var("KMA_SERVICE_KEY").ok()),
            google_maps_api_key: non_empty(env::var("GOOGLE_MAPS_API_KEY").ok()),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
