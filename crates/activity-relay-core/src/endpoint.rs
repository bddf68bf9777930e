//! Relay endpoint derivation.
//!
//! The relay lives on the same host as the page that embeds the dashboard.
//! A page served over `https` talks to `wss://host/<path>`, a page served
//! over `http` talks to `ws://host/<path>`.

use std::fmt;
use std::str::FromStr;
use url::Url;

/// Path the backend mounts the activity relay on.
pub const DEFAULT_RELAY_PATH: &str = "/ws/activities";

/// A resolved relay URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelayEndpoint {
    secure: bool,
    host: String,
    path: String,
}

impl RelayEndpoint {
    /// Create an endpoint from parts. `path` gets a leading `/` if missing.
    pub fn new(secure: bool, host: impl Into<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        Self {
            secure,
            host: host.into(),
            path,
        }
    }

    /// Derive the relay endpoint for a page URL, using [`DEFAULT_RELAY_PATH`].
    pub fn from_page_url(page_url: &str) -> Result<Self, EndpointError> {
        Self::from_page_url_with_path(page_url, DEFAULT_RELAY_PATH)
    }

    /// Derive the relay endpoint for a page URL with a custom relay path.
    ///
    /// Everything after the page's authority is discarded.
    pub fn from_page_url_with_path(page_url: &str, path: &str) -> Result<Self, EndpointError> {
        let url = Url::parse(page_url).map_err(|e| match e {
            url::ParseError::RelativeUrlWithoutBase => {
                EndpointError::MissingScheme(page_url.to_string())
            }
            e => EndpointError::Invalid(e),
        })?;

        let secure = match url.scheme() {
            "https" | "wss" => true,
            "http" | "ws" => false,
            scheme => return Err(EndpointError::UnsupportedScheme(scheme.to_string())),
        };

        // host_str keeps IPv6 brackets; userinfo never belongs in the relay URL
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or(EndpointError::EmptyHost)?;
        let host = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        Ok(Self::new(secure, host, path))
    }

    /// Whether the channel uses TLS.
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// Host and optional port.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// `wss` or `ws`.
    pub fn scheme(&self) -> &'static str {
        if self.secure { "wss" } else { "ws" }
    }
}

impl fmt::Display for RelayEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.scheme(), self.host, self.path)
    }
}

impl FromStr for RelayEndpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_page_url(s)
    }
}

/// Error deriving a relay endpoint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointError {
    #[error("page URL must contain '://' separator, got: {0}")]
    MissingScheme(String),
    #[error("unsupported page scheme: {0}")]
    UnsupportedScheme(String),
    #[error("page URL has no host")]
    EmptyHost,
    #[error("invalid page URL: {0}")]
    Invalid(#[from] url::ParseError),
}
