use super::models::Event;
use crate::config::FrigateConfig;
use crate::error::Error;
use anyhow::{Context, Result};
use log::debug;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use url::Url;

/// Time window applied to an event query
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FetchWindow {
    None,
    /// Events that started after this unix timestamp
    After(f64),
    /// Events that started before this unix timestamp
    Before(f64),
}

/// HTTP client for the detection API
#[derive(Clone)]
pub struct FrigateClient {
    client: Client,
    base_url: String,
    event_limit: u32,
}

impl FrigateClient {
    pub fn new(config: &FrigateConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            event_limit: config.event_limit,
        })
    }

    /// URL of the event list query for a window
    pub fn events_url(&self, window: FetchWindow) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/api/events", self.base_url))
            .map_err(|e| Error::Config(format!("Invalid event API url: {}", e)))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &self.event_limit.to_string());
            match window {
                FetchWindow::None => {}
                FetchWindow::After(ts) => {
                    query.append_pair("after", &format!("{:.6}", ts));
                }
                FetchWindow::Before(ts) => {
                    query.append_pair("before", &format!("{:.6}", ts));
                }
            }
        }
        Ok(url)
    }

    /// Fetch one batch of events.
    ///
    /// Transport failures and non-200 answers are `Error::Source`; a body that
    /// is not a JSON event array is `Error::Decode`.
    pub async fn fetch_events(&self, window: FetchWindow) -> Result<Vec<Event>> {
        let url = self.events_url(window)?;
        debug!("Getting events from Frigate via URL: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Source(format!("Error getting events from Frigate: {}", e)))?;

        if response.status() != StatusCode::OK {
            return Err(Error::Source(format!(
                "Response status {} when getting events from Frigate",
                response.status()
            ))
            .into());
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Source(format!("Failed to read events response: {}", e)))?;

        let events: Vec<Event> = serde_json::from_slice(&body).map_err(|e| {
            Error::Decode(format!(
                "Error unmarshalling events at line {} column {}: {}",
                e.line(),
                e.column(),
                e
            ))
        })?;

        debug!("Fetched {} events", events.len());
        Ok(events)
    }

    pub fn thumbnail_url(&self, event_id: &str) -> String {
        format!("{}/api/events/{}/thumbnail.jpg", self.base_url, event_id)
    }

    pub fn clip_url(&self, event_id: &str) -> String {
        format!("{}/api/events/{}/clip.mp4", self.base_url, event_id)
    }

    /// Download the thumbnail of an event into memory
    pub async fn get_thumbnail(&self, event_id: &str) -> Result<Vec<u8>> {
        let response = self.get_checked(&self.thumbnail_url(event_id)).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Source(format!("Failed to read thumbnail {}: {}", event_id, e)))?;
        Ok(bytes.to_vec())
    }

    /// Start downloading the clip of an event; the caller streams the body
    pub async fn open_clip(&self, event_id: &str) -> Result<Response> {
        self.get_checked(&self.clip_url(event_id)).await
    }

    async fn get_checked(&self, url: &str) -> Result<Response> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Source(format!("Error downloading {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::Source(format!(
                "Return bad status {} for {}",
                response.status(),
                url
            ))
            .into());
        }
        Ok(response)
    }
}
