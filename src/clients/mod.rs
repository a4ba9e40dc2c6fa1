/// External API clients module
use crate::errors::{ApiError, ApiResult};
use crate::geo::GeoPoint;
use crate::utils::num;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// HTTP client wrapper with common configuration
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new() -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("voyage-atlas/0.1")
            .build()?;
        Ok(Self { client })
    }

    pub fn get_client(&self) -> &Client {
        &self.client
    }
}

/// OpenStreetMap Nominatim search client
pub struct NominatimClient {
    http_client: HttpClient,
    base_url: String,
}

impl NominatimClient {
    pub fn new(base_url: String) -> ApiResult<Self> {
        Ok(Self {
            http_client: HttpClient::new()?,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Look up the best match for a free-form place name
    pub async fn search(&self, query: &str) -> ApiResult<Option<GeoPoint>> {
        let resp = self
            .http_client
            .get_client()
            .get(&self.base_url)
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ApiError::Internal(format!(
                "Nominatim request failed with status {}",
                resp.status()
            )));
        }

        let json: Value = resp.json().await?;
        Ok(first_result(&json))
    }
}

/// Nominatim returns coordinates as strings inside an array of places
fn first_result(json: &Value) -> Option<GeoPoint> {
    let place = json.as_array()?.first()?;
    let lat = num(place.get("lat")?)?;
    let lng = num(place.get("lon")?)?;
    Some(GeoPoint::new(lat, lng))
}
