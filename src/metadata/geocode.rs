//! Reverse geocoding.
//!
//! A [`Geocoder`] turns coordinates into a structured address;
//! [`build_location_name`] condenses the address into a short, human string
//! such as `Hallstatt, Gmunden, Upper Austria, Austria`:
//!
//! 1. the most specific settlement (village → town → city → municipality → county)
//! 2. the district, if different
//! 3. the state or region, if different
//! 4. the country, if different
//!
//! Without any structured component the provider's display name is used.

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Geocoding service error: {0}")]
    Service(String),
}

/// Address components as returned by Nominatim-compatible services.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Address {
    pub village: Option<String>,
    pub town: Option<String>,
    pub city: Option<String>,
    pub municipality: Option<String>,
    pub county: Option<String>,
    pub state_district: Option<String>,
    pub state: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
}

/// A reverse-geocoding result.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReverseGeocode {
    pub display_name: Option<String>,
    pub address: Option<Address>,
    /// Set by the service instead of an address when the lookup fails.
    pub error: Option<String>,
}

/// Coordinates → address lookup.
pub trait Geocoder {
    fn reverse(&self, latitude: f64, longitude: f64) -> Result<ReverseGeocode, GeocodeError>;
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Condense an address into a location name.
pub fn build_location_name(result: &ReverseGeocode) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    if let Some(address) = &result.address {
        let settlement = [
            &address.village,
            &address.town,
            &address.city,
            &address.municipality,
            &address.county,
        ]
        .into_iter()
        .find_map(non_empty);
        let district = non_empty(&address.state_district);
        let state = non_empty(&address.state).or_else(|| non_empty(&address.region));
        let country = non_empty(&address.country);

        for part in [settlement, district, state, country].into_iter().flatten() {
            if !parts.contains(&part) {
                parts.push(part);
            }
        }
    }

    if parts.is_empty() {
        return non_empty(&result.display_name).map(str::to_string);
    }
    Some(parts.join(", "))
}

/// Best-effort location name for a coordinate pair.
pub fn location_name(geocoder: &dyn Geocoder, latitude: f64, longitude: f64) -> Option<String> {
    match geocoder.reverse(latitude, longitude) {
        Ok(result) => {
            let name = build_location_name(&result);
            debug!(latitude, longitude, name = ?name, "Reverse geocoded");
            name
        }
        Err(e) => {
            warn!(latitude, longitude, error = %e, "Reverse geocoding failed");
            None
        }
    }
}

/// Nominatim (OpenStreetMap) client.
pub struct NominatimGeocoder {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl NominatimGeocoder {
    pub fn new(endpoint: impl Into<String>, user_agent: &str) -> Result<Self, GeocodeError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

impl Geocoder for NominatimGeocoder {
    fn reverse(&self, latitude: f64, longitude: f64) -> Result<ReverseGeocode, GeocodeError> {
        let result: ReverseGeocode = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("zoom", "14".to_string()),
                ("addressdetails", "1".to_string()),
            ])
            .send()?
            .error_for_status()?
            .json()?;
        match result.error {
            Some(message) => Err(GeocodeError::Service(message)),
            None => Ok(result),
        }
    }
}
