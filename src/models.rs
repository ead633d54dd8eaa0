//! Data models for USGS earthquake feed responses.
//!
//! The wire structures match the GeoJSON summary format. `Record` is the
//! normalized shape the rest of the crate works with.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::FeedError;

/// Top-level GeoJSON response from USGS feeds.
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureCollection {
    /// Always "FeatureCollection"
    #[serde(rename = "type")]
    pub type_: String,

    /// Feed metadata
    #[serde(default)]
    pub metadata: Option<Metadata>,

    /// Earthquake events
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Validate the response structure.
    pub fn validate(&self) -> Result<(), FeedError> {
        if self.type_ != "FeatureCollection" {
            return Err(FeedError::InvalidResponse(format!(
                "expected type 'FeatureCollection', got '{}'",
                self.type_
            )));
        }
        Ok(())
    }

    /// Normalize every feature into a [`Record`], keeping feed order.
    ///
    /// A single malformed feature fails the whole document so that a
    /// half-decoded snapshot never replaces good data.
    pub fn into_records(self) -> Result<Vec<Record>, FeedError> {
        self.validate()?;
        self.features.iter().map(Record::try_from).collect()
    }
}

/// Metadata about the feed response.
#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    /// When this feed was generated (ms since epoch)
    pub generated: i64,

    /// Human-readable title
    pub title: String,

    /// Number of events in response
    pub count: usize,
}

/// A single earthquake event.
#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    /// Unique event ID
    pub id: String,

    /// Geographic location
    pub geometry: Geometry,

    /// Event properties
    pub properties: Properties,
}

impl Feature {
    /// Validate the event structure.
    pub fn validate(&self) -> Result<(), FeedError> {
        if self.id.is_empty() {
            return Err(FeedError::Validation("empty event ID".into()));
        }
        // Depth is optional upstream; lon/lat are not.
        if !(2..=3).contains(&self.geometry.coordinates.len()) {
            return Err(FeedError::Validation(format!(
                "event {}: expected 2 or 3 coordinates, got {}",
                self.id,
                self.geometry.coordinates.len()
            )));
        }
        Ok(())
    }

    /// Get the event time as a `DateTime<Utc>`.
    #[must_use]
    pub fn time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.properties.time).single()
    }
}

/// Geographic geometry for an event.
#[derive(Debug, Clone, Deserialize)]
pub struct Geometry {
    /// Coordinates: [longitude, latitude, depth_km]
    pub coordinates: Vec<Option<f64>>,
}

/// Event properties from the USGS feed, limited to what the dashboard shows.
#[derive(Debug, Clone, Deserialize)]
pub struct Properties {
    /// Magnitude value
    pub mag: Option<f64>,

    /// Human-readable place description
    pub place: Option<String>,

    /// Event time (ms since epoch)
    pub time: i64,

    /// Event page URL
    pub url: Option<String>,
}

/// One normalized earthquake, as held by the record store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub id: String,
    pub magnitude: Option<f64>,
    pub place: String,
    pub occurred_at: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub depth_km: Option<f64>,
    pub detail_url: Option<String>,
}

impl TryFrom<&Feature> for Record {
    type Error = FeedError;

    fn try_from(f: &Feature) -> Result<Self, Self::Error> {
        f.validate()?;

        let coords = &f.geometry.coordinates;
        let (Some(longitude), Some(latitude)) = (coords[0], coords[1]) else {
            return Err(FeedError::Validation(format!(
                "event {}: missing latitude/longitude",
                f.id
            )));
        };
        let occurred_at = f.time().ok_or_else(|| {
            FeedError::Validation(format!(
                "event {}: timestamp {} out of range",
                f.id, f.properties.time
            ))
        })?;

        Ok(Self {
            id: f.id.clone(),
            magnitude: f.properties.mag,
            place: f
                .properties
                .place
                .clone()
                .unwrap_or_else(|| "Unknown location".into()),
            occurred_at,
            latitude,
            longitude,
            depth_km: coords.get(2).copied().flatten(),
            detail_url: f.properties.url.clone(),
        })
    }
}
