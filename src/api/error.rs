use thiserror::Error;

/// Why an upstream request produced no data
#[derive(Debug, Error)]
pub enum FetchError {
    /// DNS, connect, timeout or body read failure
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    /// Body was not JSON or did not have the expected shape
    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },

    /// Request URL could not be built from the configured base and the input
    #[error("cannot build request URL from {url}: {message}")]
    InvalidUrl { url: String, message: String },
}

impl FetchError {
    pub fn decode(url: &str, message: impl Into<String>) -> Self {
        FetchError::Decode {
            url: url.to_string(),
            message: message.into(),
        }
    }

    pub fn url(&self) -> &str {
        match self {
            FetchError::Transport { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::Decode { url, .. }
            | FetchError::InvalidUrl { url, .. } => url,
        }
    }
}
