use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::{RecommendError, Result};
use crate::generator::PhotoSource;

const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);
const PHOTO_MAX_WIDTH: u32 = 400;

/// Google Places photo lookup. Cosmetic enrichment only: every failure path
/// resolves to the empty string so a missing photo can never fail a request.
#[derive(Debug, Clone)]
pub struct GooglePlacesPhotos {
    api_key: String,
    base_url: String,
    client: Client,
}

impl GooglePlacesPhotos {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: Client::new(),
        }
    }

    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = base_url.into();
    }

    async fn lookup(&self, place_name: &str) -> Result<Option<String>> {
        let base = self.base_url.trim_end_matches('/');
        let url = format!("{base}/maps/api/place/findplacefromtext/json");
        let response = self
            .client
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .query(&[
                ("input", place_name),
                ("inputtype", "textquery"),
                ("fields", "photos,place_id"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|err| RecommendError::Upstream(format!("place search failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RecommendError::Upstream(format!(
                "place search returned status {status}"
            )));
        }

        let data: Value = response.json().await.map_err(|err| {
            RecommendError::Upstream(format!("place search response unreadable: {err}"))
        })?;

        let photo_reference = data
            .get("candidates")
            .and_then(Value::as_array)
            .and_then(|candidates| candidates.first())
            .and_then(|candidate| candidate.get("photos"))
            .and_then(Value::as_array)
            .and_then(|photos| photos.first())
            .and_then(|photo| photo.get("photo_reference"))
            .and_then(Value::as_str);

        Ok(photo_reference.map(|reference| {
            format!(
                "{base}/maps/api/place/photo?maxwidth={PHOTO_MAX_WIDTH}&photoreference={reference}&key={key}",
                key = self.api_key
            )
        }))
    }
}

#[async_trait]
impl PhotoSource for GooglePlacesPhotos {
    async fn find_photo(&self, place_name: &str) -> String {
        match self.lookup(place_name).await {
            Ok(Some(url)) => url,
            Ok(None) => String::new(),
            Err(err) => {
                debug!(
                    target: "daytrip::photo",
                    place = place_name,
                    error = %err,
                    "photo lookup failed"
                );
                String::new()
            }
        }
    }
}

/// Null photo source for configurations without a Places key.
#[derive(Debug, Clone, Copy)]
pub struct NoPhotos;

#[async_trait]
impl PhotoSource for NoPhotos {
    async fn find_photo(&self, _place_name: &str) -> String {
        String::new()
    }
}
