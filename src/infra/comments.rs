//! Comment counts from a remark42-compatible service.
//!
//! The service is asked for the counts of every post URL in one request:
//! `POST {base}/api/v1/counts?site={site_id}` with a JSON array of URLs,
//! answered by `[{"url": "...", "count": 3}, ...]`.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::application::comments::{CommentCountSource, CommentSourceError};
use crate::config::CommentsSettings;
use crate::infra::error::InfraError;

const COUNTS_PATH: &str = "api/v1/counts";

#[derive(Debug, Deserialize)]
struct CountEntry {
    url: String,
    count: u64,
}

pub struct Remark42Counter {
    client: Client,
    endpoint: Url,
    public_host: String,
}

impl Remark42Counter {
    /// Build a counter from settings. Returns `Ok(None)` when no base URL is set.
    pub fn from_settings(
        settings: &CommentsSettings,
        public_host: &str,
    ) -> Result<Option<Self>, InfraError> {
        let Some(base) = settings.base_url.as_ref() else {
            return Ok(None);
        };

        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(settings.timeout)
            .build()
            .map_err(|err| InfraError::http(format!("failed to build client: {err}")))?;
        let endpoint = counts_endpoint(base, &settings.site_id)?;

        Ok(Some(Self {
            client,
            endpoint,
            public_host: public_host.to_string(),
        }))
    }

    pub fn user_agent() -> &'static str {
        concat!("quire/", env!("CARGO_PKG_VERSION"))
    }
}

/// Counts endpoint below the configured base, keeping any path prefix.
fn counts_endpoint(base: &Url, site_id: &str) -> Result<Url, InfraError> {
    let mut root = base.clone();
    root.set_query(None);
    root.set_fragment(None);
    if !root.path().ends_with('/') {
        let path = format!("{}/", root.path());
        root.set_path(&path);
    }

    let mut endpoint = root
        .join(COUNTS_PATH)
        .map_err(|err| InfraError::configuration(format!("invalid comments url: {err}")))?;
    endpoint.query_pairs_mut().append_pair("site", site_id);
    Ok(endpoint)
}

/// Public URL of a post, as the comment widget registers it.
fn post_url(host: &str, slug: &str) -> String {
    format!("https://{host}/post/{slug}.html")
}

fn counts_by_slug(
    entries: Vec<CountEntry>,
    slugs_by_url: &HashMap<String, &String>,
) -> HashMap<String, u64> {
    entries
        .into_iter()
        .filter_map(|entry| {
            slugs_by_url
                .get(&entry.url)
                .map(|slug| ((*slug).clone(), entry.count))
        })
        .collect()
}

#[async_trait]
impl CommentCountSource for Remark42Counter {
    async fn fetch_counts(
        &self,
        slugs: &[String],
    ) -> Result<HashMap<String, u64>, CommentSourceError> {
        let slugs_by_url: HashMap<String, &String> = slugs
            .iter()
            .map(|slug| (post_url(&self.public_host, slug), slug))
            .collect();
        let urls: Vec<&String> = slugs_by_url.keys().collect();

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&urls)
            .send()
            .await
            .map_err(|err| CommentSourceError::Request(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CommentSourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let entries: Vec<CountEntry> = response
            .json()
            .await
            .map_err(|err| CommentSourceError::Request(format!("failed to parse body: {err}")))?;
        Ok(counts_by_slug(entries, &slugs_by_url))
    }
}
