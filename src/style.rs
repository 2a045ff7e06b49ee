//! Marker styling: magnitude scaling, depth classification and the legend table.
//!
//! Both functions are total over `f64`. Nothing here clamps or validates;
//! negative magnitudes give negative radii and NaN depths land in the
//! deepest bin.

use serde::Serialize;

/// Meters of circle radius per unit of magnitude.
pub const RADIUS_PER_MAGNITUDE: f64 = 15_000.0;

/// A CSS color, either `#RRGGBB` or a named color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Color(&'static str);

impl Color {
    pub const BLACK: Self = Self("black");

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// Depth bins as `(exclusive upper bound in km, color)`, shallowest first.
pub const DEPTH_BINS: [(f64, Color); 5] = [
    (10.0, Color("#FB8CAB")),
    (30.0, Color("#E65C9C")),
    (50.0, Color("#CF268A")),
    (70.0, Color("#AF1281")),
    (90.0, Color("#6B0772")),
];

/// Color for anything at or below the deepest bound.
pub const DEEPEST_COLOR: Color = Color("#360167");

/// Lower bounds of the legend rows.
pub const LEGEND_BOUNDS: [f64; 6] = [-10.0, 10.0, 30.0, 50.0, 70.0, 90.0];

/// Circle radius in meters for a magnitude.
#[must_use]
pub fn scale_radius(magnitude: f64) -> f64 {
    magnitude * RADIUS_PER_MAGNITUDE
}

/// Fill color for a hypocenter depth in kilometers.
///
/// Bins are half-open: a depth equal to a bound belongs to the deeper bin.
#[must_use]
pub fn classify_color(depth_km: f64) -> Color {
    DEPTH_BINS
        .iter()
        .find(|(upper, _)| depth_km < *upper)
        .map_or(DEEPEST_COLOR, |(_, color)| *color)
}

/// Complete styling for one earthquake circle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerStyle {
    pub radius: f64,
    pub fill_color: Color,
    pub fill_opacity: f64,
    #[serde(rename = "color")]
    pub stroke_color: Color,
    #[serde(rename = "weight")]
    pub stroke_weight: f64,
}

/// One row of the depth legend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LegendEntry {
    pub lower_bound: f64,
    pub color: Color,
}

/// The legend rows, one per bound in [`LEGEND_BOUNDS`].
///
/// Each swatch is sampled one kilometer inside its range so it matches the
/// color markers in that range actually get.
#[must_use]
pub fn legend_entries() -> Vec<LegendEntry> {
    LEGEND_BOUNDS
        .iter()
        .map(|&lower_bound| LegendEntry {
            lower_bound,
            color: classify_color(lower_bound + 1.0),
        })
        .collect()
}
