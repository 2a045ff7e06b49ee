//! Per-earthquake rendering: marker style and popup content.

use chrono::{DateTime, FixedOffset, Local, TimeZone};
use serde::Serialize;

use crate::errors::QuakemapError;
use crate::models::{EarthquakeRecord, Feature};
use crate::style::{Color, MarkerStyle, classify_color, scale_radius};

/// Popup text for a null place.
pub const UNKNOWN_PLACE: &str = "Unknown location";

/// Popup timestamp layout, e.g. `11/14/2023, 10:13:20 PM`.
const POPUP_TIME_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

/// A circle marker ready to hand to the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub lat: f64,
    pub lon: f64,
    pub style: MarkerStyle,
    pub popup: String,
}

/// Turns earthquake records into marker styles and popup HTML.
pub trait FeatureRenderer: Send + Sync {
    fn style_for(&self, record: &EarthquakeRecord) -> MarkerStyle;

    fn popup_for(&self, record: &EarthquakeRecord) -> String;

    /// Render one feed feature.
    ///
    /// # Errors
    ///
    /// Returns [`QuakemapError::Validation`] if the feature has no
    /// `properties` or `geometry` object, or fewer than three coordinates.
    fn render(&self, feature: &Feature) -> Result<Marker, QuakemapError> {
        let record = EarthquakeRecord::try_from(feature)?;
        Ok(Marker {
            lat: record.latitude,
            lon: record.longitude,
            style: self.style_for(&record),
            popup: self.popup_for(&record),
        })
    }
}

/// Default renderer: radius by magnitude, fill by depth.
#[derive(Debug, Clone, Copy, Default)]
pub struct DepthRenderer {
    /// Zone for popup timestamps; `None` means the host's local zone.
    offset: Option<FixedOffset>,
}

impl DepthRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Format popup timestamps at a fixed UTC offset instead of local time.
    #[must_use]
    pub fn with_offset(offset: FixedOffset) -> Self {
        Self {
            offset: Some(offset),
        }
    }

    fn format_time(&self, record: &EarthquakeRecord) -> String {
        let Some(utc) = record.time() else {
            return "Invalid Date".to_string();
        };
        match self.offset {
            Some(offset) => format_in(&utc, &offset),
            None => format_in(&utc, &Local),
        }
    }
}

fn format_in<Tz: TimeZone>(utc: &DateTime<chrono::Utc>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    utc.with_timezone(tz).format(POPUP_TIME_FORMAT).to_string()
}

impl FeatureRenderer for DepthRenderer {
    fn style_for(&self, record: &EarthquakeRecord) -> MarkerStyle {
        MarkerStyle {
            radius: scale_radius(record.magnitude.unwrap_or(0.0)),
            fill_color: classify_color(record.depth_km),
            fill_opacity: 0.5,
            stroke_color: Color::BLACK,
            stroke_weight: 0.5,
        }
    }

    fn popup_for(&self, record: &EarthquakeRecord) -> String {
        format!(
            "<h3>Location: {place}</h3>\
             <h3>Date: {date}</h3>\
             <h3>Magnitude: {mag}</h3>\
             <h3>Depth: {depth}</h3>",
            place = escape_html(record.place.as_deref().unwrap_or(UNKNOWN_PLACE)),
            date = self.format_time(record),
            mag = record
                .magnitude
                .map_or_else(|| "null".to_string(), |m| m.to_string()),
            depth = record.depth_km,
        )
    }
}

/// Escape text for inclusion in HTML element content or attributes.
pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
