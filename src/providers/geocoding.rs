use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::{RecommendError, Result};

const DEFAULT_BASE_URL: &str = "https://api.vworld.kr";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// VWorld address geocoder: road-level lookup first, parcel-level fallback.
#[derive(Debug, Clone)]
pub struct VworldGeocoder {
    api_key: Option<String>,
    base_url: String,
    client: Client,
}

impl VworldGeocoder {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: Client::new(),
        }
    }

    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = base_url.into();
    }

    /// Address → (latitude, longitude) in WGS84. Tries the `ROAD` address
    /// type and falls back to `PARCEL` on any lookup failure.
    pub async fn geocode(&self, address: &str) -> Result<(f64, f64)> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| RecommendError::Config("VWORLD_API_KEY is not set".to_string()))?;

        match self.lookup(api_key, address, "ROAD").await {
            Ok(point) => Ok(point),
            Err(err) => {
                debug!(
                    target: "daytrip::geocode",
                    error = %err,
                    "road-level lookup failed, retrying as parcel"
                );
                self.lookup(api_key, address, "PARCEL").await
            }
        }
    }

    async fn lookup(&self, api_key: &str, address: &str, addr_type: &str) -> Result<(f64, f64)> {
        let url = format!("{}/req/address", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .query(&[
                ("service", "address"),
                ("request", "getCoord"),
                ("version", "2.0"),
                ("crs", "epsg:4326"),
                ("format", "json"),
                ("type", addr_type),
                ("address", address),
                ("refine", "true"),
                ("simple", "false"),
                ("key", api_key),
            ])
            .send()
            .await
            .map_err(|err| RecommendError::Upstream(format!("VWorld request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RecommendError::Upstream(format!(
                "VWorld error {status}: {body}"
            )));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|err| RecommendError::Upstream(format!("VWorld response unreadable: {err}")))?;

        let point = data
            .get("response")
            .and_then(|r| r.get("result"))
            .and_then(|r| r.get("point"));
        let lon = point.and_then(|p| p.get("x")).and_then(coordinate);
        let lat = point.and_then(|p| p.get("y")).and_then(coordinate);

        match (lat, lon) {
            (Some(lat), Some(lon)) => Ok((lat, lon)),
            _ => Err(RecommendError::NotFound(format!(
                "no geocoding match ({addr_type}): {address}"
            ))),
        }
    }
}

/// VWorld returns coordinates as strings; tolerate numbers too.
fn coordinate(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn missing_key_is_a_config_error() {
        let geocoder = VworldGeocoder::new(None);
        let err = geocoder.geocode("서울특별시 강남구").await.unwrap_err();
        assert!(matches!(err, RecommendError::Config(_)));
    }

    #[test]
    fn coordinates_parse_from_strings_and_numbers() {
        assert_eq!(coordinate(&json!("127.0276")), Some(127.0276));
        assert_eq!(coordinate(&json!(37.4979)), Some(37.4979));
        assert_eq!(coordinate(&json!(null)), None);
        assert_eq!(coordinate(&json!("not-a-number")), None);
    }

    #[tokio::test]
    async fn falls_back_from_road_to_parcel() {
        let mut server = mockito::Server::new_async().await;

        let road = server
            .mock("GET", "/req/address")
            .match_query(mockito::Matcher::UrlEncoded("type".into(), "ROAD".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "response": { "status": "NOT_FOUND" } }).to_string())
            .create_async()
            .await;

        let parcel = server
            .mock("GET", "/req/address")
            .match_query(mockito::Matcher::UrlEncoded("type".into(), "PARCEL".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "response": {
                        "status": "OK",
                        "result": { "point": { "x": "127.0276", "y": "37.4979" } }
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let mut geocoder = VworldGeocoder::new(Some("test-key".to_string()));
        geocoder.set_base_url(server.url());

        let (lat, lon) = geocoder.geocode("서울특별시 강남구 역삼동").await.unwrap();
        assert!((lat - 37.4979).abs() < 1e-9);
        assert!((lon - 127.0276).abs() < 1e-9);

        road.assert_async().await;
        parcel.assert_async().await;
    }

    #[tokio::test]
    async fn reports_not_found_when_both_types_miss() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/req/address")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "response": { "status": "NOT_FOUND" } }).to_string())
            .expect(2)
            .create_async()
            .await;

        let mut geocoder = VworldGeocoder::new(Some("test-key".to_string()));
        geocoder.set_base_url(server.url());

        let err = geocoder.geocode("존재하지 않는 주소").await.unwrap_err();
        assert!(matches!(err, RecommendError::NotFound(_)));
    }
}
