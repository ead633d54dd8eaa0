//! USGS earthquake feed client.
//!
//! Provides async HTTP access to the USGS summary feeds and the
//! [`FeedSource`] seam the refresh scheduler fetches through.
//! Uses reqwest with rustls for TLS.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument};

use crate::errors::FeedError;
use crate::models::{FeatureCollection, Record};

/// Default request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// User agent string for API requests.
const USER_AGENT: &str = concat!("quakeboard/", env!("CARGO_PKG_VERSION"));

/// USGS base URL for earthquake feeds.
const USGS_BASE_URL: &str = "https://earthquake.usgs.gov";

/// Available summary feeds, by magnitude floor and time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedType {
    AllHour,
    AllDay,
    AllWeek,
    Mag1Hour,
    Mag1Day,
    Mag1Week,
    Mag25Hour,
    #[default]
    Mag25Day,
    Mag25Week,
    Mag45Hour,
    Mag45Day,
    Mag45Week,
    SignificantDay,
    SignificantWeek,
}

impl FeedType {
    /// Get the URL path segment for this feed type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AllHour => "all_hour",
            Self::AllDay => "all_day",
            Self::AllWeek => "all_week",
            Self::Mag1Hour => "1.0_hour",
            Self::Mag1Day => "1.0_day",
            Self::Mag1Week => "1.0_week",
            Self::Mag25Hour => "2.5_hour",
            Self::Mag25Day => "2.5_day",
            Self::Mag25Week => "2.5_week",
            Self::Mag45Hour => "4.5_hour",
            Self::Mag45Day => "4.5_day",
            Self::Mag45Week => "4.5_week",
            Self::SignificantDay => "significant_day",
            Self::SignificantWeek => "significant_week",
        }
    }
}

impl std::str::FromStr for FeedType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all_hour" => Ok(Self::AllHour),
            "all_day" => Ok(Self::AllDay),
            "all_week" => Ok(Self::AllWeek),
            "1.0_hour" => Ok(Self::Mag1Hour),
            "1.0_day" => Ok(Self::Mag1Day),
            "1.0_week" => Ok(Self::Mag1Week),
            "2.5_hour" => Ok(Self::Mag25Hour),
            "2.5_day" => Ok(Self::Mag25Day),
            "2.5_week" => Ok(Self::Mag25Week),
            "4.5_hour" => Ok(Self::Mag45Hour),
            "4.5_day" => Ok(Self::Mag45Day),
            "4.5_week" => Ok(Self::Mag45Week),
            "significant_day" => Ok(Self::SignificantDay),
            "significant_week" => Ok(Self::SignificantWeek),
            _ => Err(format!("unknown feed type: {s}")),
        }
    }
}

/// Anything that can produce a full snapshot of normalized records.
///
/// Each call is one complete fetch; there is no partial or incremental form.
pub trait FeedSource: Send + Sync + 'static {
    /// Fetch and decode the current feed.
    fn fetch(&self) -> impl Future<Output = Result<Vec<Record>, FeedError>> + Send;
}

/// Client for USGS earthquake API.
#[derive(Debug, Clone)]
pub struct UsgsClient {
    client: Client,
    base_url: String,
    feed_type: FeedType,
}

impl UsgsClient {
    /// Create a new USGS client for one summary feed.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(feed_type: FeedType) -> Result<Self, FeedError> {
        Self::with_base_url(feed_type, USGS_BASE_URL)
    }

    /// Create a client against a different host (mirrors, local fixtures).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn with_base_url(feed_type: FeedType, base_url: &str) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            feed_type,
        })
    }

    /// Full URL of the GeoJSON document for this client's feed.
    #[must_use]
    pub fn feed_url(&self) -> String {
        format!(
            "{}/earthquakes/feed/v1.0/summary/{}.geojson",
            self.base_url,
            self.feed_type.as_str()
        )
    }

    /// Fetch the summary GeoJSON feed.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or response cannot be parsed.
    #[instrument(skip(self), fields(feed = self.feed_type.as_str()))]
    pub async fn fetch_feed(&self) -> Result<FeatureCollection, FeedError> {
        let url = self.feed_url();

        debug!("fetching feed from {}", url);

        let response = self.client.get(&url).send().await?;

        // Check status before parsing
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.bytes().await?;
        let feed: FeatureCollection = serde_json::from_slice(&body)?;

        feed.validate()?;

        if let Some(meta) = &feed.metadata {
            debug!(
                generated = meta.generated,
                "'{}' reports {} events",
                meta.title,
                meta.count
            );
        }
        debug!("fetched {} events", feed.features.len());
        Ok(feed)
    }
}

impl FeedSource for UsgsClient {
    async fn fetch(&self) -> Result<Vec<Record>, FeedError> {
        self.fetch_feed().await?.into_records()
    }
}
