//! Service configuration, read from the environment.
//!
//! | Variable                | Default                                   |
//! |-------------------------|-------------------------------------------|
//! | `YOUTUBE_API_KEYS`      | comma-separated list of keys              |
//! | `YOUTUBE_API_KEY1`, ... | one key each, read until the first gap    |
//! | `PORT`                  | `3000`                                    |
//! | `YOUTUBE_API_BASE_URL`  | `https://www.googleapis.com/youtube/v3`   |
//! | `MAX_PAGES`             | unlimited                                 |
//! | `REQUEST_TIMEOUT_SECS`  | unlimited                                 |
//! | `HTTP_TIMEOUT_SECS`     | `30`                                      |
//! | `ON_PIPELINE_FAILURE`   | `degrade` (or `error`)                    |
//!
//! At least one API key must be configured.

use crate::server::PipelineFailurePolicy;
use crate::youtube_api::DEFAULT_BASE_URL;
use eyre::{Context, bail};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_keys: Vec<String>,
    pub port: u16,
    pub api_base_url: String,
    /// Cap on pages fetched per paginated listing
    pub max_pages: Option<usize>,
    /// Cap on the time spent assembling one channel
    pub fetch_timeout: Option<Duration>,
    /// Timeout of each individual YouTube API request
    pub http_timeout: Duration,
    pub failure_policy: PipelineFailurePolicy,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// Variables that are set but blank are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> eyre::Result<Self> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let mut api_keys: Vec<String> = var("YOUTUBE_API_KEYS")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|key| !key.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        api_keys.extend(
            (1..)
                .map_while(|i| lookup(&format!("YOUTUBE_API_KEY{i}")))
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
        );
        if api_keys.is_empty() {
            bail!("no YouTube API keys configured (set YOUTUBE_API_KEYS or YOUTUBE_API_KEY1)");
        }

        let port = parse_var(&var, "PORT")?.unwrap_or(DEFAULT_PORT);
        let api_base_url = var("YOUTUBE_API_BASE_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let max_pages: Option<usize> = parse_var(&var, "MAX_PAGES")?;
        if max_pages == Some(0) {
            bail!("MAX_PAGES must be at least 1");
        }

        let fetch_timeout = parse_var(&var, "REQUEST_TIMEOUT_SECS")?.map(Duration::from_secs);
        let http_timeout = parse_var(&var, "HTTP_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_HTTP_TIMEOUT);
        let failure_policy = parse_var(&var, "ON_PIPELINE_FAILURE")?.unwrap_or_default();

        Ok(Self {
            api_keys,
            port,
            api_base_url,
            max_pages,
            fetch_timeout,
            http_timeout,
            failure_policy,
        })
    }
}

fn parse_var<T>(var: impl Fn(&str) -> Option<String>, name: &str) -> eyre::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var(name)
        .map(|value| {
            value
                .trim()
                .parse()
                .with_context(|| format!("parse {name}={value:?}"))
        })
        .transpose()
}
