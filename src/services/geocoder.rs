//! Address → coordinates lookup.
//!
//! Production uses the MapQuest geocoding API; tests swap in
//! `StaticGeocoder` through `AppState`.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::config::GeocoderConfig;
use crate::database::models::Location;

const MAPQUEST_URL: &str = "https://www.mapquestapi.com/geocoding/v1/address";

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("no results for {0:?}")]
    NoResults(String),

    #[error("geocoder request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("geocoder is not configured: {0}")]
    NotConfigured(String),
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve a free-form address or zipcode to its best match
    async fn geocode(&self, address: &str) -> Result<Location, GeocodeError>;
}

pub struct MapQuestGeocoder {
    client: reqwest::Client,
    api_key: String,
}

impl MapQuestGeocoder {
    pub fn new(config: &GeocoderConfig) -> Result<Self, GeocodeError> {
        if config.provider != "mapquest" {
            return Err(GeocodeError::NotConfigured(format!(
                "unsupported provider {}",
                config.provider
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct MapQuestResponse {
    #[serde(default)]
    results: Vec<MapQuestResult>,
}

#[derive(Debug, Deserialize)]
struct MapQuestResult {
    #[serde(default)]
    locations: Vec<MapQuestLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapQuestLocation {
    lat_lng: LatLng,
    #[serde(default)]
    street: String,
    #[serde(default)]
    admin_area5: String,
    #[serde(default)]
    admin_area3: String,
    #[serde(default)]
    postal_code: String,
    #[serde(default)]
    admin_area1: String,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

impl From<MapQuestLocation> for Location {
    fn from(loc: MapQuestLocation) -> Self {
        let state_zip = [loc.admin_area3.as_str(), loc.postal_code.as_str()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        let formatted = [loc.street.as_str(), loc.admin_area5.as_str(), state_zip.as_str(), loc.admin_area1.as_str()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(", ");

        let mut location = Location::point(loc.lat_lng.lng, loc.lat_lng.lat);
        location.formatted_address = non_empty(formatted);
        location.street = non_empty(loc.street);
        location.city = non_empty(loc.admin_area5);
        location.state = non_empty(loc.admin_area3);
        location.zipcode = non_empty(loc.postal_code);
        location.country = non_empty(loc.admin_area1);
        location
    }
}

#[async_trait]
impl Geocoder for MapQuestGeocoder {
    async fn geocode(&self, address: &str) -> Result<Location, GeocodeError> {
        if self.api_key.is_empty() {
            return Err(GeocodeError::NotConfigured("GEOCODER_API_KEY".to_string()));
        }

        let response: MapQuestResponse = self
            .client
            .get(MAPQUEST_URL)
            .query(&[("key", self.api_key.as_str()), ("location", address)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let first = response
            .results
            .into_iter()
            .next()
            .and_then(|r| r.locations.into_iter().next())
            .ok_or_else(|| GeocodeError::NoResults(address.to_string()))?;

        tracing::debug!("Geocoded {:?} to ({}, {})", address, first.lat_lng.lat, first.lat_lng.lng);
        Ok(first.into())
    }
}

/// Fixed lookup table, for tests and offline seeding
#[derive(Default)]
pub struct StaticGeocoder {
    entries: HashMap<String, Location>,
    fallback: Option<Location>,
}

impl StaticGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, address: impl Into<String>, location: Location) -> Self {
        self.entries.insert(address.into(), location);
        self
    }

    /// Answer unknown addresses with `location` instead of failing
    pub fn with_fallback(mut self, location: Location) -> Self {
        self.fallback = Some(location);
        self
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn geocode(&self, address: &str) -> Result<Location, GeocodeError> {
        self.entries
            .get(address)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| GeocodeError::NoResults(address.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_mapquest_payload() {
        let body = serde_json::json!({
            "results": [{
                "locations": [{
                    "latLng": { "lat": 42.350846, "lng": -71.103259 },
                    "street": "233 Bay State Rd",
                    "adminArea5": "Boston",
                    "adminArea3": "MA",
                    "postalCode": "02215",
                    "adminArea1": "US"
                }]
            }]
        });

        let parsed: MapQuestResponse = serde_json::from_value(body).unwrap();
        let location: Location = parsed.results.into_iter().next().unwrap().locations.into_iter().next().unwrap().into();

        assert_eq!(location.kind, "Point");
        assert_eq!(location.coordinates, [-71.103259, 42.350846]);
        assert_eq!(location.city.as_deref(), Some("Boston"));
        assert_eq!(location.zipcode.as_deref(), Some("02215"));
        assert_eq!(
            location.formatted_address.as_deref(),
            Some("233 Bay State Rd, Boston, MA 02215, US")
        );
    }

    #[tokio::test]
    async fn static_geocoder_answers_known_addresses() {
        let geocoder = StaticGeocoder::new().with("02118", Location::point(-71.07, 42.34));
        assert_eq!(geocoder.geocode("02118").await.unwrap().latitude(), 42.34);
        assert!(matches!(
            geocoder.geocode("99999").await,
            Err(GeocodeError::NoResults(_))
        ));
    }
}
