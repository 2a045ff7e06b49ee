//! Feed loading.
//!
//! [`FeedSource`] is the seam between the renderer and wherever the GeoJSON
//! comes from: the live USGS summary feed over blocking reqwest with rustls,
//! or a fixture file on disk.

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, instrument};

use crate::errors::QuakemapError;
use crate::models::FeatureCollection;

/// Default request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// User agent string for API requests.
const USER_AGENT: &str = concat!("quakemap/", env!("CARGO_PKG_VERSION"));

/// USGS base URL for earthquake feeds.
const USGS_BASE_URL: &str = "https://earthquake.usgs.gov";

/// Minimum magnitude class of a summary feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Threshold {
    All,
    Mag1,
    Mag25,
    Mag45,
    Significant,
}

impl Threshold {
    const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Mag1 => "1.0",
            Self::Mag25 => "2.5",
            Self::Mag45 => "4.5",
            Self::Significant => "significant",
        }
    }
}

/// Time window of a summary feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Hour,
    Day,
    Week,
    Month,
}

impl Period {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

/// One of the USGS summary feeds, e.g. `all_week` or `4.5_day`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedType {
    pub threshold: Threshold,
    pub period: Period,
}

impl Default for FeedType {
    fn default() -> Self {
        Self {
            threshold: Threshold::All,
            period: Period::Week,
        }
    }
}

impl fmt::Display for FeedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.threshold.as_str(), self.period.as_str())
    }
}

impl std::str::FromStr for FeedType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        let (threshold, period) = lower
            .split_once('_')
            .ok_or_else(|| format!("unknown feed type: {s} (expected <threshold>_<period>)"))?;

        let threshold = match threshold {
            "all" => Threshold::All,
            "1.0" => Threshold::Mag1,
            "2.5" => Threshold::Mag25,
            "4.5" => Threshold::Mag45,
            "significant" => Threshold::Significant,
            _ => return Err(format!("unknown feed threshold: {threshold}")),
        };
        let period = match period {
            "hour" => Period::Hour,
            "day" => Period::Day,
            "week" => Period::Week,
            "month" => Period::Month,
            _ => return Err(format!("unknown feed period: {period}")),
        };

        Ok(Self { threshold, period })
    }
}

/// Somewhere a feature collection can be loaded from.
pub trait FeedSource: Send + Sync {
    /// Load the current feed.
    ///
    /// # Errors
    ///
    /// Returns an error if the feed cannot be read or parsed.
    fn fetch(&self) -> Result<FeatureCollection, QuakemapError>;

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}

/// Client for the USGS summary feeds.
pub struct UsgsClient {
    client: Client,
    base_url: String,
    feed: FeedType,
}

impl UsgsClient {
    /// Create a client for one summary feed.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(feed: FeedType) -> Result<Self, QuakemapError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: USGS_BASE_URL.to_string(),
            feed,
        })
    }

    /// Full URL of the GeoJSON document.
    #[must_use]
    pub fn feed_url(&self) -> String {
        format!(
            "{}/earthquakes/feed/v1.0/summary/{}.geojson",
            self.base_url, self.feed
        )
    }
}

impl FeedSource for UsgsClient {
    #[instrument(skip(self), fields(feed = %self.feed))]
    fn fetch(&self) -> Result<FeatureCollection, QuakemapError> {
        let url = self.feed_url();
        debug!("fetching feed from {}", url);

        let response = self.client.get(&url).send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(QuakemapError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let feed: FeatureCollection = response.json()?;
        debug!("fetched {} events", feed.features.len());
        Ok(feed)
    }

    fn describe(&self) -> String {
        format!("USGS {} feed", self.feed)
    }
}

/// A GeoJSON document on disk, read fresh on every fetch.
#[derive(Debug, Clone)]
pub struct FixtureSource {
    path: PathBuf,
}

impl FixtureSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FeedSource for FixtureSource {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn fetch(&self) -> Result<FeatureCollection, QuakemapError> {
        let reader = BufReader::new(File::open(&self.path)?);
        let feed: FeatureCollection = serde_json::from_reader(reader)?;
        debug!("loaded {} events", feed.features.len());
        Ok(feed)
    }

    fn describe(&self) -> String {
        format!("fixture {}", self.path.display())
    }
}

/// Pick the fixture when one is given, the live feed otherwise.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be initialized.
pub fn open_source(
    feed: FeedType,
    fixture: Option<&Path>,
) -> Result<Arc<dyn FeedSource>, QuakemapError> {
    let source: Arc<dyn FeedSource> = match fixture {
        Some(path) => Arc::new(FixtureSource::new(path)),
        None => Arc::new(UsgsClient::new(feed)?),
    };
    Ok(source)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn fixture_path(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tools").join(name)
    }

    #[test]
    fn test_feed_type_parse() {
        for name in ["all_hour", "2.5_day", "4.5_month", "significant_week", "1.0_hour"] {
            let feed: FeedType = name.parse().expect("failed to parse");
            assert_eq!(feed.to_string(), name);
        }

        let feed: FeedType = "ALL_WEEK".parse().unwrap();
        assert_eq!(feed, FeedType::default());

        assert!("all".parse::<FeedType>().is_err());
        assert!("3.0_day".parse::<FeedType>().is_err());
        assert!("all_year".parse::<FeedType>().is_err());
    }

    #[test]
    fn test_feed_url() {
        let client = UsgsClient::new(FeedType::default()).unwrap();
        assert_eq!(
            client.feed_url(),
            "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/all_week.geojson"
        );
        assert_eq!(client.describe(), "USGS all_week feed");
    }

    #[test]
    fn test_fixture_source_fetch() {
        let source = FixtureSource::new(fixture_path("sample_all_week.geojson"));
        let feed = source.fetch().unwrap();
        assert_eq!(feed.features.len(), 4);
        assert!(source.describe().contains("sample_all_week.geojson"));
    }

    #[test]
    fn test_fixture_source_missing_file() {
        let source = FixtureSource::new(fixture_path("does_not_exist.geojson"));
        assert!(matches!(source.fetch(), Err(QuakemapError::Io(_))));
    }

    #[test]
    fn test_open_source_prefers_fixture() {
        let path = fixture_path("empty_feed.geojson");
        let source = open_source(FeedType::default(), Some(&path)).unwrap();
        assert!(source.describe().starts_with("fixture"));
        assert!(source.fetch().unwrap().features.is_empty());
    }
}
