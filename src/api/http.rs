use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use super::FetchError;

const DEFAULT_USER_AGENT: &str = concat!(
    "panoramax2osm/",
    env!("CARGO_PKG_VERSION"),
    " (https://github.com/latetedansleguidon/panoramax2osm)"
);

/// One blocking JSON GET. The services only ever talk to upstream through this.
pub trait Transport: Send + Sync {
    fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, FetchError>;
}

/// Fetch and deserialize into `T`, mapping shape mismatches to [`FetchError::Decode`]
pub fn get_as<T: DeserializeOwned>(
    transport: &dyn Transport,
    url: &str,
    query: &[(&str, String)],
) -> Result<T, FetchError> {
    let body = transport.get_json(url, query)?;
    serde_json::from_value(body).map_err(|e| FetchError::decode(url, e.to_string()))
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_retry_backoff_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra attempts on 429/504; zero sends exactly one request
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            max_retries: 0,
            retry_backoff_secs: default_retry_backoff_secs(),
        }
    }
}

/// [`Transport`] backed by a blocking reqwest client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    max_retries: u32,
    retry_backoff: Duration,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig) -> anyhow::Result<Self> {
        use anyhow::Context;

        let client = reqwest::blocking::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            max_retries: config.max_retries,
            retry_backoff: Duration::from_secs(config.retry_backoff_secs),
        })
    }

    /// Wait before retry number `attempt` (1-based), growing linearly
    fn backoff(&self, attempt: u32) -> Duration {
        self.retry_backoff * attempt
    }
}

impl Transport for HttpTransport {
    fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, FetchError> {
        let transport_error = |e: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };

        let mut attempt = 0;
        loop {
            tracing::debug!(url, attempt, "GET");
            let response = self
                .client
                .get(url)
                .query(query)
                .send()
                .map_err(transport_error)?;

            let status = response.status().as_u16();
            match status {
                200..=299 => {
                    let text = response.text().map_err(transport_error)?;
                    return serde_json::from_str(&text)
                        .map_err(|e| FetchError::decode(url, e.to_string()));
                }
                // Overpass answers these when overloaded
                429 | 504 if attempt < self.max_retries => {
                    attempt += 1;
                    let wait = self.backoff(attempt);
                    tracing::warn!(
                        url,
                        status,
                        "upstream busy, retrying in {:.1}s (attempt {}/{})",
                        wait.as_secs_f32(),
                        attempt + 1,
                        self.max_retries + 1
                    );
                    std::thread::sleep(wait);
                }
                _ => {
                    return Err(FetchError::Status {
                        url: url.to_string(),
                        status,
                    });
                }
            }
        }
    }
}
