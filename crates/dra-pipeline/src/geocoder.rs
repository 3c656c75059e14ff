//! Nominatim (OpenStreetMap) geocoding client

use async_trait::async_trait;
use dra_core::{Coordinates, DraError, Geocoder, GeocoderConfig, HttpConfig, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

/// Nominatim API response for geocoding
#[derive(Debug, Deserialize)]
struct NominatimResponse {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
}

/// Resolves free-form addresses through the Nominatim search endpoint
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(base_url: impl Into<String>, user_agent: &str) -> Result<Self> {
        Self::build(base_url.into(), user_agent, &HttpConfig::default())
    }

    pub fn from_config(config: &GeocoderConfig, http: &HttpConfig) -> Result<Self> {
        Self::build(config.base_url.clone(), &config.user_agent, http)
    }

    fn build(base_url: String, user_agent: &str, http: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(http.timeout())
            .build()
            .map_err(|e| DraError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn search_url(&self, address: &str) -> String {
        format!(
            "{}/search?q={}&format=json&limit=1",
            self.base_url,
            urlencoding::encode(address)
        )
    }
}

fn parse_coordinate(value: &str, axis: &str) -> Result<f64> {
    value
        .trim()
        .parse()
        .map_err(|e| DraError::MalformedResponse(format!("Invalid {axis} in response: {e}")))
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    #[instrument(skip(self))]
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>> {
        let response = self
            .client
            .get(self.search_url(address))
            .send()
            .await
            .map_err(|e| DraError::Transport(format!("Geocoding request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(DraError::Geocode(format!(
                "Geocoder returned HTTP {}",
                response.status()
            )));
        }

        let results: Vec<NominatimResponse> = response.json().await.map_err(|e| {
            DraError::MalformedResponse(format!("Failed to parse geocoding response: {e}"))
        })?;

        let Some(result) = results.first() else {
            debug!("location not found");
            return Ok(None);
        };

        let coordinates = Coordinates::new(
            parse_coordinate(&result.lat, "latitude")?,
            parse_coordinate(&result.lon, "longitude")?,
        );
        debug!(%coordinates, display_name = %result.display_name, "geocoded");
        Ok(Some(coordinates))
    }

    fn name(&self) -> &str {
        "nominatim"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url_encodes_address() {
        let geocoder = NominatimGeocoder::new("http://localhost:8088/", "test-agent").unwrap();
        assert_eq!(
            geocoder.search_url("123 Main St, , Springfield"),
            "http://localhost:8088/search?q=123%20Main%20St%2C%20%2C%20Springfield&format=json&limit=1"
        );
    }

    #[test]
    fn test_parse_coordinate() {
        assert_eq!(parse_coordinate(" 13.0827 ", "latitude").unwrap(), 13.0827);
        assert!(matches!(
            parse_coordinate("north", "latitude"),
            Err(DraError::MalformedResponse(_))
        ));
    }
}
