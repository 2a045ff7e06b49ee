//! Map assembly: base layers, the earthquake overlay, controls and legend.
//!
//! [`MapAssembler`] builds a serializable [`MapView`] from feed features and
//! renders it into a standalone HTML page. The page embeds the view as JSON
//! and a short bootstrap script hands it to Leaflet.

use serde::Serialize;
use tracing::debug;

use crate::errors::QuakemapError;
use crate::models::Feature;
use crate::render::{DepthRenderer, FeatureRenderer, Marker, escape_html};
use crate::style::{Color, legend_entries};

/// Name of the earthquake overlay in the layer control.
pub const OVERLAY_NAME: &str = "Earthquakes";

/// Geographic point for the initial view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl std::str::FromStr for LatLon {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').collect();
        let [lat, lon] = parts.as_slice() else {
            return Err(format!(
                "center requires 2 values (lat,lon), got {}",
                parts.len()
            ));
        };

        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|e| format!("invalid latitude: {e}"))?;
        let lon: f64 = lon
            .trim()
            .parse()
            .map_err(|e| format!("invalid longitude: {e}"))?;

        if !(-90.0..=90.0).contains(&lat) {
            return Err(format!("latitude {lat} out of range [-90, 90]"));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(format!("longitude {lon} out of range [-180, 180]"));
        }

        Ok(Self { lat, lon })
    }
}

/// Background imagery choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseLayerKind {
    Street,
    Satellite,
}

impl BaseLayerKind {
    pub const ALL: [Self; 2] = [Self::Street, Self::Satellite];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Street => "Street",
            Self::Satellite => "Satellite",
        }
    }

    const fn url(self) -> &'static str {
        match self {
            Self::Street => "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
            Self::Satellite => {
                "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}"
            }
        }
    }

    const fn attribution(self) -> &'static str {
        match self {
            Self::Street => {
                "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors"
            }
            Self::Satellite => {
                "Tiles &copy; Esri &mdash; Source: Esri, i-cubed, USDA, USGS, AEX, GeoEye, Getmapping, Aerogrid, IGN, IGP, UPR-EGP, and the GIS User Community"
            }
        }
    }
}

/// Leaflet control corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl std::str::FromStr for Position {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "topleft" => Ok(Self::TopLeft),
            "topright" => Ok(Self::TopRight),
            "bottomleft" => Ok(Self::BottomLeft),
            "bottomright" => Ok(Self::BottomRight),
            _ => Err(format!(
                "unknown position: {s} (expected: topleft, topright, bottomleft, bottomright)"
            )),
        }
    }
}

/// Construction-time settings for the map page.
#[derive(Debug, Clone)]
pub struct MapConfig {
    pub container_id: String,
    pub title: String,
    pub center: LatLon,
    pub zoom: u8,
    pub active_base: BaseLayerKind,
    pub control_collapsed: bool,
    pub legend_position: Position,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            container_id: "map".to_string(),
            title: "Earthquakes".to_string(),
            center: LatLon {
                lat: 39.73,
                lon: -101.4,
            },
            zoom: 4,
            active_base: BaseLayerKind::Street,
            control_collapsed: true,
            legend_position: Position::BottomRight,
        }
    }
}

/// Everything the browser needs to draw the map.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapView {
    pub container_id: String,
    pub center: [f64; 2],
    pub zoom: u8,
    pub base_layers: Vec<BaseLayer>,
    pub overlays: Vec<Overlay>,
    pub layer_control: LayerControl,
    pub legend: Legend,
}

impl MapView {
    #[must_use]
    pub fn marker_count(&self) -> usize {
        self.overlays.iter().map(|o| o.markers.len()).sum()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BaseLayer {
    pub name: &'static str,
    pub url: &'static str,
    pub attribution: &'static str,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Overlay {
    pub name: &'static str,
    pub active: bool,
    pub markers: Vec<Marker>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct LayerControl {
    pub collapsed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Legend {
    pub position: Position,
    pub title: &'static str,
    pub rows: Vec<LegendRow>,
    /// Pre-rendered inner HTML of the legend box
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendRow {
    pub color: Color,
    pub label: String,
}

/// Build the legend rows: `lower–upper` for closed ranges, `lower+` for the last.
#[must_use]
pub fn legend_rows() -> Vec<LegendRow> {
    let entries = legend_entries();
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let label = match entries.get(i + 1) {
                Some(next) => format!("{}\u{2013}{}", entry.lower_bound, next.lower_bound),
                None => format!("{}+", entry.lower_bound),
            };
            LegendRow {
                color: entry.color,
                label,
            }
        })
        .collect()
}

fn legend_html(title: &str, rows: &[LegendRow]) -> String {
    let mut html = format!("<h3 style='text-align: center'>{}</h3>", escape_html(title));
    for (i, row) in rows.iter().enumerate() {
        let br = if i + 1 < rows.len() { "<br>" } else { "" };
        html.push_str(&format!(
            "<i style=\"background:{}\"></i> {}{br}",
            row.color,
            row.label.replace('\u{2013}', "&ndash;"),
        ));
    }
    html
}

/// Builds map views from feed features with an injected renderer.
pub struct MapAssembler<R = DepthRenderer> {
    config: MapConfig,
    renderer: R,
}

impl MapAssembler<DepthRenderer> {
    #[must_use]
    pub fn with_defaults(config: MapConfig) -> Self {
        Self::new(config, DepthRenderer::new())
    }
}

impl<R: FeatureRenderer> MapAssembler<R> {
    #[must_use]
    pub fn new(config: MapConfig, renderer: R) -> Self {
        Self { config, renderer }
    }

    /// Render every feature and wire the result into a map view.
    ///
    /// # Errors
    ///
    /// Fails on the first feature the renderer rejects.
    pub fn assemble(&self, features: &[Feature]) -> Result<MapView, QuakemapError> {
        let markers = features
            .iter()
            .map(|f| self.renderer.render(f))
            .collect::<Result<Vec<_>, _>>()?;
        debug!("rendered {} markers", markers.len());

        let base_layers = BaseLayerKind::ALL
            .iter()
            .map(|&kind| BaseLayer {
                name: kind.name(),
                url: kind.url(),
                attribution: kind.attribution(),
                active: kind == self.config.active_base,
            })
            .collect();

        let rows = legend_rows();
        let legend = Legend {
            position: self.config.legend_position,
            title: "Depth",
            html: legend_html("Depth", &rows),
            rows,
        };

        Ok(MapView {
            container_id: self.config.container_id.clone(),
            center: [self.config.center.lat, self.config.center.lon],
            zoom: self.config.zoom,
            base_layers,
            overlays: vec![Overlay {
                name: OVERLAY_NAME,
                active: true,
                markers,
            }],
            layer_control: LayerControl {
                collapsed: self.config.control_collapsed,
            },
            legend,
        })
    }

    /// Render a view into a complete HTML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the view cannot be serialized.
    pub fn render_page(&self, view: &MapView) -> Result<String, QuakemapError> {
        // "</" inside a string would close the script element early.
        let json = serde_json::to_string(view)?.replace("</", "<\\/");

        Ok(PAGE_TEMPLATE
            .replace("__TITLE__", &escape_html(&self.config.title))
            .replace("__CONTAINER__", &escape_html(&view.container_id))
            .replace("__VIEW__", &json))
    }

    /// Assemble and render in one step.
    ///
    /// # Errors
    ///
    /// See [`Self::assemble`] and [`Self::render_page`].
    pub fn build_page(&self, features: &[Feature]) -> Result<String, QuakemapError> {
        let view = self.assemble(features)?;
        self.render_page(&view)
    }
}

// ============================================================================
// HTML Template
// ============================================================================

const PAGE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>__TITLE__</title>
    <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css"
          integrity="sha256-p4NxAoJBhIIN+hmNHrzRCf9tD/miZyoHS5obTRR9BMY=" crossorigin="">
    <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"
            integrity="sha256-20nQCchB9co0qIjJZRGuk2/Z9VM+kNiyxNV1lvTlZBo=" crossorigin=""></script>
    <style>
        html, body { height: 100%; margin: 0; padding: 0; }
        .info {
            padding: 6px 8px;
            font: 14px/16px Arial, Helvetica, sans-serif;
            background: rgba(255, 255, 255, 0.85);
            box-shadow: 0 0 15px rgba(0, 0, 0, 0.2);
            border-radius: 5px;
        }
        .info h3 { margin: 0 0 5px; }
        .legend { line-height: 18px; color: #555; }
        .legend i { width: 18px; height: 18px; float: left; margin-right: 8px; opacity: 0.7; }
    </style>
</head>
<body>
    <div id="__CONTAINER__" style="height: 100%; width: 100%;"></div>
    <script>
        (function () {
            var view = __VIEW__;

            var baseMaps = {};
            var active = [];
            view.baseLayers.forEach(function (b) {
                var layer = L.tileLayer(b.url, { attribution: b.attribution });
                baseMaps[b.name] = layer;
                if (b.active) active.push(layer);
            });

            var overlayMaps = {};
            view.overlays.forEach(function (o) {
                var group = L.layerGroup(o.markers.map(function (m) {
                    return L.circle([m.lat, m.lon], m.style).bindPopup(m.popup);
                }));
                overlayMaps[o.name] = group;
                if (o.active) active.push(group);
            });

            var map = L.map(view.containerId, {
                center: view.center,
                zoom: view.zoom,
                layers: active
            });

            L.control.layers(baseMaps, overlayMaps, {
                collapsed: view.layerControl.collapsed
            }).addTo(map);

            var legend = L.control({ position: view.legend.position });
            legend.onAdd = function () {
                var div = L.DomUtil.create('div', 'info legend');
                div.innerHTML = view.legend.html;
                return div;
            };
            legend.addTo(map);
        })();
    </script>
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;

    use super::*;
    use crate::models::FeatureCollection;

    fn sample_features() -> Vec<Feature> {
        let json = include_str!("../tools/sample_all_week.geojson");
        let feed: FeatureCollection = serde_json::from_str(json).unwrap();
        feed.features
    }

    fn assembler() -> MapAssembler {
        MapAssembler::new(
            MapConfig::default(),
            DepthRenderer::with_offset(FixedOffset::east_opt(0).unwrap()),
        )
    }

    #[test]
    fn test_empty_feed_still_renders() {
        let view = assembler().assemble(&[]).unwrap();

        let names: Vec<&str> = view.base_layers.iter().map(|b| b.name).collect();
        assert_eq!(names, vec!["Street", "Satellite"]);
        assert_eq!(view.overlays.len(), 1);
        assert_eq!(view.overlays[0].name, OVERLAY_NAME);
        assert!(view.overlays[0].active);
        assert_eq!(view.marker_count(), 0);
        assert_eq!(view.legend.rows.len(), 6);

        let page = assembler().render_page(&view).unwrap();
        assert!(page.contains(r#"<div id="map" style="height: 100%; width: 100%;"></div>"#));
        assert!(page.contains("leaflet.js"));
    }

    #[test]
    fn test_default_view_state() {
        let view = assembler().assemble(&[]).unwrap();
        assert_eq!(view.container_id, "map");
        assert!((view.center[0] - 39.73).abs() < f64::EPSILON);
        assert!((view.center[1] - -101.4).abs() < f64::EPSILON);
        assert_eq!(view.zoom, 4);
        assert!(view.layer_control.collapsed);
        assert_eq!(view.legend.position, Position::BottomRight);

        let active: Vec<&str> = view
            .base_layers
            .iter()
            .filter(|b| b.active)
            .map(|b| b.name)
            .collect();
        assert_eq!(active, vec!["Street"]);
    }

    #[test]
    fn test_satellite_can_be_default() {
        let config = MapConfig {
            active_base: BaseLayerKind::Satellite,
            ..MapConfig::default()
        };
        let view = MapAssembler::with_defaults(config).assemble(&[]).unwrap();
        let active: Vec<&str> = view
            .base_layers
            .iter()
            .filter(|b| b.active)
            .map(|b| b.name)
            .collect();
        assert_eq!(active, vec!["Satellite"]);
    }

    #[test]
    fn test_legend_rows() {
        let rows = legend_rows();
        let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["-10\u{2013}10", "10\u{2013}30", "30\u{2013}50", "50\u{2013}70", "70\u{2013}90", "90+"]
        );

        let colors: Vec<&str> = rows.iter().map(|r| r.color.as_str()).collect();
        assert_eq!(
            colors,
            vec!["#FB8CAB", "#E65C9C", "#CF268A", "#AF1281", "#6B0772", "#360167"]
        );
    }

    #[test]
    fn test_legend_html() {
        let view = assembler().assemble(&[]).unwrap();
        let html = &view.legend.html;

        assert!(html.starts_with("<h3 style='text-align: center'>Depth</h3>"));
        assert_eq!(html.matches("<i style=").count(), 6);
        assert!(html.contains(r#"<i style="background:#FB8CAB"></i> -10&ndash;10<br>"#));
        assert!(html.ends_with(r#"<i style="background:#360167"></i> 90+"#));
    }

    #[test]
    fn test_assemble_sample_feed() {
        let view = assembler().assemble(&sample_features()).unwrap();
        assert_eq!(view.marker_count(), 4);

        let first = &view.overlays[0].markers[0];
        assert!((first.style.radius - 67_500.0).abs() < f64::EPSILON);
        assert_eq!(first.style.fill_color.as_str(), "#E65C9C");

        let fiji = &view.overlays[0].markers[3];
        assert_eq!(fiji.style.fill_color.as_str(), "#360167");
        assert!((fiji.lat - -18.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_null_magnitude_event_keeps_its_marker() {
        let feed: FeatureCollection = serde_json::from_str(
            r#"{"type":"FeatureCollection","features":[
                {"id":"good","properties":{"place":"10km N of X","mag":4.5,"time":1700000000000},
                 "geometry":{"type":"Point","coordinates":[0,0,25]}},
                {"id":"sparse","properties":{"place":null,"mag":null,"time":1700000000000},
                 "geometry":{"type":"Point","coordinates":[10,20,60]}}]}"#,
        )
        .unwrap();
        let view = assembler().assemble(&feed.features).unwrap();
        assert_eq!(view.marker_count(), 2);

        let good = &view.overlays[0].markers[0];
        assert!((good.style.radius - 67_500.0).abs() < f64::EPSILON);
        assert!(good.popup.contains("Magnitude: 4.5"));
        assert!(good.popup.contains("Location: 10km N of X"));

        let sparse = &view.overlays[0].markers[1];
        assert!(sparse.style.radius.abs() < f64::EPSILON);
        assert_eq!(sparse.style.fill_color.as_str(), "#AF1281");
        assert!((sparse.lat - 20.0).abs() < f64::EPSILON);
        assert!(sparse.popup.contains("Magnitude: null"));
        assert!(sparse.popup.contains("Location: Unknown location"));
        assert!(sparse.popup.contains("Date: 11/14/2023, 10:13:20 PM"));
    }

    #[test]
    fn test_bad_feature_fails_the_pass() {
        let mut features = sample_features();
        features[1].geometry = None;
        let err = assembler().assemble(&features).unwrap_err();
        assert!(matches!(err, QuakemapError::Validation(_)));
    }

    #[test]
    fn test_container_id_stays_in_attribute() {
        let config = MapConfig {
            container_id: "my map\"><b>".to_string(),
            ..MapConfig::default()
        };
        let page = MapAssembler::with_defaults(config).build_page(&[]).unwrap();
        assert!(page.contains(
            r#"<div id="my map&quot;&gt;&lt;b&gt;" style="height: 100%; width: 100%;"></div>"#
        ));
        assert!(page.contains(r#""containerId":"my map\"><b>""#));
    }

    #[test]
    fn test_page_embeds_view_json() {
        let view = assembler().assemble(&sample_features()).unwrap();
        let page = assembler().render_page(&view).unwrap();

        assert!(page.contains("<title>Earthquakes</title>"));
        assert!(page.contains(r#""containerId":"map""#));
        assert!(page.contains(r##""fillColor":"#E65C9C""##));
        assert!(page.contains("Fiji region"));
        assert!(!page.contains("__VIEW__"));
        assert!(!page.contains("__CONTAINER__"));
    }

    #[test]
    fn test_page_cannot_close_script_early() {
        let mut features = sample_features();
        features[0].properties.as_mut().unwrap().place =
            Some("</script><script>alert(1)</script>".into());
        let page = assembler().build_page(&features).unwrap();
        assert_eq!(page.matches("</script>").count(), 2);
    }

    #[test]
    fn test_position_parse() {
        assert_eq!("bottomright".parse::<Position>().unwrap(), Position::BottomRight);
        assert_eq!("TopLeft".parse::<Position>().unwrap(), Position::TopLeft);
        assert!("middle".parse::<Position>().is_err());

        let json = serde_json::to_string(&Position::BottomLeft).unwrap();
        assert_eq!(json, r#""bottomleft""#);
    }

    #[test]
    fn test_latlon_parse() {
        let center: LatLon = "39.73,-101.4".parse().unwrap();
        assert!((center.lat - 39.73).abs() < f64::EPSILON);
        assert!((center.lon - -101.4).abs() < f64::EPSILON);

        assert!("39.73".parse::<LatLon>().is_err());
        assert!("91,0".parse::<LatLon>().is_err());
        assert!("0,181".parse::<LatLon>().is_err());
        assert!("a,b".parse::<LatLon>().is_err());
    }
}
