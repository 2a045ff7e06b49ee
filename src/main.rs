//! quakemap - the USGS earthquake feed as an interactive web map.
//!
//! Fetches the GeoJSON summary feed, sizes each earthquake by magnitude and
//! colors it by depth, and emits a Leaflet page with switchable base layers
//! and a depth legend.

use std::fs;
use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info};

mod cli;
mod client;
mod errors;
mod map;
mod models;
mod output;
mod render;
mod server;
mod style;

use cli::{Cli, Command};
use client::open_source;
use map::MapAssembler;
use models::EarthquakeRecord;
use render::DepthRenderer;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Command::Render(args) => cmd_render(args),
        Command::Markers(args) => cmd_markers(args),
        Command::Serve(args) => cmd_serve(args),
    }
}

/// Initialize tracing subscriber.
fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Build the source and fetch it once.
fn load_feed(args: &cli::SourceArgs) -> Result<models::FeatureCollection> {
    let source = open_source(args.feed, args.fixture.as_deref())
        .context("failed to create feed source")?;
    let feed = source
        .fetch()
        .with_context(|| format!("failed to load {}", source.describe()))?;

    if let Some(meta) = &feed.metadata {
        debug!(
            title = meta.title.as_deref().unwrap_or("untitled"),
            generated = ?meta.generated,
            count = ?meta.count,
            "feed metadata"
        );
    }
    Ok(feed)
}

/// Execute the `render` command - write the map page.
fn cmd_render(args: cli::RenderArgs) -> Result<()> {
    let config = args.map.into_config();
    let feed = load_feed(&args.source)?;
    let page = MapAssembler::with_defaults(config)
        .build_page(&feed.features)
        .context("failed to render map")?;

    match args.output {
        Some(path) => {
            fs::write(&path, page)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(
                "wrote map of {} earthquakes to {}",
                feed.features.len(),
                path.display()
            );
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(page.as_bytes())?;
            handle.flush()?;
        }
    }

    Ok(())
}

/// Execute the `markers` command - list marker descriptors.
fn cmd_markers(args: cli::MarkersArgs) -> Result<()> {
    let feed = load_feed(&args.source)?;

    let records = feed
        .features
        .iter()
        .map(EarthquakeRecord::try_from)
        .collect::<Result<Vec<_>, _>>()
        .context("failed to render markers")?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_markers(&mut handle, &records, &DepthRenderer::new(), args.format)?;

    Ok(())
}

/// Execute the `serve` command - start web server.
fn cmd_serve(args: cli::ServeArgs) -> Result<()> {
    let config = server::ServerConfig {
        port: args.port,
        host: args.host.clone(),
    };

    // The blocking HTTP client must be built outside the async runtime.
    let source = open_source(args.source.feed, args.source.fixture.as_deref())
        .context("failed to create feed source")?;
    let assembler = MapAssembler::with_defaults(args.map.into_config());
    let state = server::AppState::new(source, assembler);

    let url = format!("http://{}:{}", args.host, args.port);
    println!("\x1b[1m🌍 quakemap\x1b[0m");
    println!("\x1b[2m───────────────────────────────────────\x1b[0m");
    println!("  Local:   \x1b[96m{url}\x1b[0m");
    println!("  Feed:    {}", args.source.feed);
    println!("\x1b[2m───────────────────────────────────────\x1b[0m");
    println!("\x1b[2mPress Ctrl+C to stop\x1b[0m\n");

    if args.open {
        #[cfg(target_os = "linux")]
        let _ = std::process::Command::new("xdg-open").arg(&url).spawn();
        #[cfg(target_os = "macos")]
        let _ = std::process::Command::new("open").arg(&url).spawn();
        #[cfg(target_os = "windows")]
        let _ = std::process::Command::new("cmd").args(["/c", "start", &url]).spawn();
    }

    tokio::runtime::Runtime::new()
        .context("failed to create tokio runtime")?
        .block_on(server::run_server(config, state))
}
