//! Command-line interface definitions.
//!
//! Uses clap derive API for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::client::FeedType;
use crate::map::{BaseLayerKind, LatLon, MapConfig, Position};
use crate::output::Format;

/// Render the USGS earthquake feed as an interactive map.
#[derive(Parser, Debug)]
#[command(name = "quakemap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    pub quiet: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write the map page to a file or stdout
    Render(RenderArgs),

    /// List the marker each earthquake would get
    Markers(MarkersArgs),

    /// Serve the map over HTTP
    Serve(ServeArgs),
}

/// Where the feed comes from. Shared by every command.
#[derive(Args, Debug)]
pub struct SourceArgs {
    /// USGS summary feed to fetch
    #[arg(long, default_value = "all_week", value_parser = parse_feed_type)]
    pub feed: FeedType,

    /// Read a GeoJSON file instead of fetching the feed
    #[arg(long)]
    pub fixture: Option<PathBuf>,
}

/// How the map page is laid out. Shared by `render` and `serve`.
#[derive(Args, Debug, Default)]
pub struct MapArgs {
    /// Initial map center: lat,lon
    #[arg(long, value_parser = parse_center, allow_hyphen_values = true)]
    pub center: Option<LatLon>,

    /// Initial zoom level
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=22))]
    pub zoom: Option<u8>,

    /// Id of the element the map is drawn into
    #[arg(long)]
    pub container: Option<String>,

    /// Page title
    #[arg(long)]
    pub title: Option<String>,

    /// Start on satellite imagery instead of streets
    #[arg(long)]
    pub satellite: bool,

    /// Show the layer control expanded
    #[arg(long)]
    pub expand_layers: bool,

    /// Legend corner: topleft, topright, bottomleft, bottomright
    #[arg(long, value_parser = parse_position)]
    pub legend_position: Option<Position>,
}

impl MapArgs {
    /// Overlay the given flags on the default map configuration.
    #[must_use]
    pub fn into_config(self) -> MapConfig {
        let defaults = MapConfig::default();
        MapConfig {
            center: self.center.unwrap_or(defaults.center),
            zoom: self.zoom.unwrap_or(defaults.zoom),
            container_id: self.container.unwrap_or(defaults.container_id),
            title: self.title.unwrap_or(defaults.title),
            active_base: if self.satellite {
                BaseLayerKind::Satellite
            } else {
                defaults.active_base
            },
            control_collapsed: !self.expand_layers,
            legend_position: self.legend_position.unwrap_or(defaults.legend_position),
        }
    }
}

/// Arguments for the `render` command.
#[derive(Parser, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub map: MapArgs,

    /// Output file (defaults to stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

/// Arguments for the `markers` command.
#[derive(Parser, Debug)]
pub struct MarkersArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Arguments for the `serve` command.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub map: MapArgs,

    /// Port to listen on
    #[arg(long, short = 'p', default_value = "8080")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Open browser automatically
    #[arg(long)]
    pub open: bool,
}

/// Parse a feed type from string.
fn parse_feed_type(s: &str) -> Result<FeedType, String> {
    s.parse()
}

/// Parse an output format from string.
fn parse_format(s: &str) -> Result<Format, String> {
    s.parse()
}

/// Parse a control position from string.
fn parse_position(s: &str) -> Result<Position, String> {
    s.parse()
}

/// Parse a map center from string.
fn parse_center(s: &str) -> Result<LatLon, String> {
    s.parse()
}
