use http::StatusCode;
use snafu::Snafu;

/// Books API client error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)), visibility(pub(crate)))]
pub enum ClientError {
    /// The request could not be completed: connection failure, timeout, or an error while reading the body.
    #[snafu(display("request to '{}' failed: {}", path, source))]
    Network {
        /// Request path, relative to the API base URL.
        path: String,

        /// Error source.
        source: reqwest::Error,
    },

    /// The API answered with a status code outside of the 2xx range.
    #[snafu(display("request to '{}' returned non-success status {}: {}", path, status, body))]
    NonSuccessStatus {
        /// Request path, relative to the API base URL.
        path: String,

        /// Response status code.
        status: StatusCode,

        /// Response body, truncated.
        body: String,
    },

    /// The API answered successfully, but the response body could not be decoded.
    #[snafu(display("failed to decode response from '{}': {}", path, source))]
    Decode {
        /// Request path, relative to the API base URL.
        path: String,

        /// Error source.
        source: serde_json::Error,
    },

    /// The API base URL could not be parsed.
    #[snafu(display("invalid base URL '{}': {}", url, source))]
    InvalidBaseUrl {
        /// Base URL as given.
        url: String,

        /// Error source.
        source: url::ParseError,
    },

    /// The API base URL does not use the `http` or `https` scheme.
    #[snafu(display("unsupported base URL '{}': scheme must be 'http' or 'https'", url))]
    UnsupportedBaseUrl {
        /// Base URL as given.
        url: String,
    },

    /// The underlying HTTP client could not be built.
    #[snafu(display("failed to build HTTP client: {}", source))]
    Build {
        /// Error source.
        source: reqwest::Error,
    },

    /// The request path could not be resolved against the API base URL.
    #[snafu(display("invalid request path '{}': {}", path, source))]
    InvalidPath {
        /// Request path, relative to the API base URL.
        path: String,

        /// Error source.
        source: url::ParseError,
    },
}

impl ClientError {
    /// Returns a short, low-cardinality label describing the kind of failure.
    ///
    /// Non-success statuses are labelled with their status code, such as `status 500`.
    pub fn kind(&self) -> String {
        match self {
            Self::Network { .. } => "network".to_string(),
            Self::NonSuccessStatus { status, .. } => format!("status {}", status.as_u16()),
            Self::Decode { .. } => "decode".to_string(),
            Self::InvalidBaseUrl { .. } | Self::UnsupportedBaseUrl { .. } | Self::Build { .. } => "setup".to_string(),
            Self::InvalidPath { .. } => "invalid_path".to_string(),
        }
    }

    /// Returns the status code of the response, if the API answered with a non-success status.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::NonSuccessStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}
