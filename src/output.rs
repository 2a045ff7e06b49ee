//! Marker listings for the terminal.
//!
//! Supports human-readable (with depth swatches), JSON, and NDJSON formats.

use std::io::{self, Write};

use serde::Serialize;

use crate::models::EarthquakeRecord;
use crate::render::{FeatureRenderer, UNKNOWN_PLACE};
use crate::style::Color;

// ANSI codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Human-readable terminal output (default)
    #[default]
    Human,
    /// JSON array
    Json,
    /// Newline-delimited JSON (one object per line)
    Ndjson,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "ndjson" => Ok(Self::Ndjson),
            _ => Err(format!("unknown format: {s} (expected: human, json, ndjson)")),
        }
    }
}

/// Flattened marker descriptor we emit in JSON/NDJSON output.
#[derive(Debug, Clone, Serialize)]
pub struct OutputMarker {
    pub place: Option<String>,
    pub time: String,
    pub magnitude: Option<f64>,
    pub depth_km: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_m: f64,
    pub fill_color: Color,
}

impl OutputMarker {
    fn new<R: FeatureRenderer + ?Sized>(record: &EarthquakeRecord, renderer: &R) -> Self {
        let style = renderer.style_for(record);
        Self {
            place: record.place.clone(),
            time: record
                .time()
                .map_or_else(|| "unknown".into(), |t| t.to_rfc3339()),
            magnitude: record.magnitude,
            depth_km: record.depth_km,
            latitude: record.latitude,
            longitude: record.longitude,
            radius_m: style.radius,
            fill_color: style.fill_color,
        }
    }
}

/// Truecolor background escape for a `#RRGGBB` color, empty for named colors.
fn swatch(color: Color) -> String {
    let hex = color.as_str().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return String::new();
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match (channel(0), channel(2), channel(4)) {
        (Some(r), Some(g), Some(b)) => format!("\x1b[48;2;{r};{g};{b}m  {RESET}"),
        _ => String::new(),
    }
}

/// Write markers in human-readable format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_human<W: Write, R: FeatureRenderer + ?Sized>(
    writer: &mut W,
    records: &[EarthquakeRecord],
    renderer: &R,
) -> io::Result<()> {
    for record in records {
        let marker = OutputMarker::new(record, renderer);
        let mag = marker
            .magnitude
            .map_or_else(|| "M?  ".into(), |m| format!("M{m:.1}"));
        let time = record
            .time()
            .map_or_else(|| "unknown".into(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string());

        writeln!(
            writer,
            "{swatch} {BOLD}{mag}{RESET} │ \
             {DIM}r={radius:>7.0}m{RESET} │ \
             {color} {depth:>5.0}km │ \
             {time} UTC │ \
             {place}",
            swatch = swatch(marker.fill_color),
            radius = marker.radius_m,
            color = marker.fill_color,
            depth = marker.depth_km,
            place = marker.place.as_deref().unwrap_or(UNKNOWN_PLACE),
        )?;
    }
    Ok(())
}

/// Write markers as a JSON array.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write, R: FeatureRenderer + ?Sized>(
    writer: &mut W,
    records: &[EarthquakeRecord],
    renderer: &R,
) -> io::Result<()> {
    let output: Vec<OutputMarker> = records
        .iter()
        .map(|r| OutputMarker::new(r, renderer))
        .collect();
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}

/// Write markers as newline-delimited JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_ndjson<W: Write, R: FeatureRenderer + ?Sized>(
    writer: &mut W,
    records: &[EarthquakeRecord],
    renderer: &R,
) -> io::Result<()> {
    for record in records {
        let json = serde_json::to_string(&OutputMarker::new(record, renderer))
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(writer, "{json}")?;
    }
    Ok(())
}

/// Write markers in the specified format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_markers<W: Write, R: FeatureRenderer + ?Sized>(
    writer: &mut W,
    records: &[EarthquakeRecord],
    renderer: &R,
    format: Format,
) -> io::Result<()> {
    match format {
        Format::Human => write_human(writer, records, renderer),
        Format::Json => write_json(writer, records, renderer),
        Format::Ndjson => write_ndjson(writer, records, renderer),
    }
}
