//! Data models for the USGS GeoJSON summary feed.
//!
//! Deserialization is lenient so a sparse feed still parses. Null scalar
//! properties (`mag`, `place`, `time`) carry through to the record as `None`;
//! [`EarthquakeRecord::try_from`] only rejects features whose `properties` or
//! `geometry` object is missing or whose coordinates are too short.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::errors::QuakemapError;

/// Top-level GeoJSON document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureCollection {
    /// Feed metadata, absent from hand-written fixtures
    #[serde(default)]
    pub metadata: Option<Metadata>,

    /// Earthquake events
    #[serde(default)]
    pub features: Vec<Feature>,
}

/// Metadata about the feed response.
#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    /// When this feed was generated (ms since epoch)
    pub generated: Option<i64>,

    /// Human-readable title
    pub title: Option<String>,

    /// Number of events in response
    pub count: Option<usize>,
}

/// A single earthquake event.
#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    /// USGS event ID
    #[serde(default)]
    pub id: Option<String>,

    /// Geographic location
    #[serde(default)]
    pub geometry: Option<Geometry>,

    /// Event properties
    #[serde(default)]
    pub properties: Option<Properties>,
}

/// Point geometry for an event.
#[derive(Debug, Clone, Deserialize)]
pub struct Geometry {
    /// Coordinates: [longitude, latitude, depth_km]
    #[serde(default)]
    pub coordinates: Vec<f64>,
}

/// The event properties the map uses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Properties {
    /// Magnitude value
    pub mag: Option<f64>,

    /// Human-readable place description
    pub place: Option<String>,

    /// Event time (ms since epoch)
    pub time: Option<i64>,
}

/// One earthquake as the renderer sees it.
///
/// Location is always present; the feed may publish null scalars, which stay
/// `None` here.
#[derive(Debug, Clone, PartialEq)]
pub struct EarthquakeRecord {
    pub place: Option<String>,
    pub time_millis: Option<i64>,
    pub magnitude: Option<f64>,
    pub longitude: f64,
    pub latitude: f64,
    pub depth_km: f64,
}

impl EarthquakeRecord {
    /// Event time as a `DateTime<Utc>`, if the millisecond value is representable.
    #[must_use]
    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.time_millis
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }
}

impl TryFrom<&Feature> for EarthquakeRecord {
    type Error = QuakemapError;

    fn try_from(feature: &Feature) -> Result<Self, Self::Error> {
        let id = feature.id.as_deref().unwrap_or("<no id>");
        let missing = |field: &str| QuakemapError::Validation(format!("event {id}: missing {field}"));

        let props = feature
            .properties
            .as_ref()
            .ok_or_else(|| missing("properties"))?;
        let geometry = feature
            .geometry
            .as_ref()
            .ok_or_else(|| missing("geometry"))?;

        let [longitude, latitude, depth_km] = match geometry.coordinates.as_slice() {
            [lon, lat, depth, ..] => [*lon, *lat, *depth],
            other => {
                return Err(QuakemapError::Validation(format!(
                    "event {id}: expected 3 coordinates, got {}",
                    other.len()
                )));
            }
        };

        Ok(Self {
            place: props.place.clone(),
            time_millis: props.time,
            magnitude: props.mag,
            longitude,
            latitude,
            depth_km,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(json: &str) -> Feature {
        serde_json::from_str(json).expect("failed to parse feature")
    }

    #[test]
    fn test_parse_sample_feed() {
        let json = include_str!("../tools/sample_all_week.geojson");
        let feed: FeatureCollection =
            serde_json::from_str(json).expect("failed to parse sample feed");

        assert_eq!(feed.features.len(), 4);
        assert_eq!(
            feed.metadata.and_then(|m| m.count),
            Some(feed.features.len())
        );

        for feature in &feed.features {
            let record = EarthquakeRecord::try_from(feature).expect("invalid feature");
            assert!(record.place.is_some());
            assert!(record.magnitude.is_some());
            assert!(record.time().is_some());
        }
    }

    #[test]
    fn test_record_from_feature() {
        let f = feature(
            r#"{"id":"x1","properties":{"place":"10km N of X","mag":4.5,"time":1700000000000},
                "geometry":{"type":"Point","coordinates":[-120.5,36.25,25.0]}}"#,
        );
        let record = EarthquakeRecord::try_from(&f).unwrap();
        assert_eq!(record.place.as_deref(), Some("10km N of X"));
        assert_eq!(record.time_millis, Some(1_700_000_000_000));
        assert_eq!(record.magnitude, Some(4.5));
        assert!((record.longitude - -120.5).abs() < f64::EPSILON);
        assert!((record.latitude - 36.25).abs() < f64::EPSILON);
        assert!((record.depth_km - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_null_scalars_pass_through() {
        let f = feature(
            r#"{"id":"x2","properties":{"place":null,"mag":null,"time":null},
                "geometry":{"coordinates":[1.5,-2.0,5]}}"#,
        );
        let record = EarthquakeRecord::try_from(&f).unwrap();
        assert!(record.place.is_none());
        assert!(record.magnitude.is_none());
        assert!(record.time().is_none());
        assert!((record.depth_km - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_properties_is_rejected() {
        let f = feature(r#"{"id":"x3","geometry":{"coordinates":[0,0,5]}}"#);
        let err = EarthquakeRecord::try_from(&f).unwrap_err();
        assert!(matches!(err, QuakemapError::Validation(_)));
        assert!(err.to_string().contains("x3"));
        assert!(err.to_string().contains("missing properties"));
    }

    #[test]
    fn test_null_geometry_is_rejected() {
        let f = feature(r#"{"id":"x4","properties":{"mag":1.0},"geometry":null}"#);
        let err = EarthquakeRecord::try_from(&f).unwrap_err();
        assert!(err.to_string().contains("missing geometry"));
    }

    #[test]
    fn test_short_coordinates_are_rejected() {
        let f = feature(
            r#"{"properties":{"place":"Somewhere","mag":1.0,"time":1},
                "geometry":{"coordinates":[0,0]}}"#,
        );
        let err = EarthquakeRecord::try_from(&f).unwrap_err();
        assert!(err.to_string().contains("expected 3 coordinates, got 2"));
    }

    #[test]
    fn test_empty_collection_parses() {
        let feed: FeatureCollection =
            serde_json::from_str(r#"{"type":"FeatureCollection","features":[]}"#).unwrap();
        assert!(feed.features.is_empty());
        assert!(feed.metadata.is_none());
    }
}
