use kitchensink_core::ClientError;
use std::time::Duration;
use url::Url;

/// Backend used when `KITCHENSINK_BASE_URL` is unset.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
/// Request timeout used when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Backend endpoints, relative to the base URL.
pub mod endpoints {
    pub const LOGIN: &str = "api/auth/login";
    pub const REGISTER: &str = "api/auth/register";
    pub const REFRESH_TOKEN: &str = "api/auth/refresh-token";
    pub const LOGOUT: &str = "api/auth/logout";
    pub const CONTACTS: &str = "api/kitchensink/contacts";
    pub const ADMIN_USERS: &str = "api/admin/users";
    pub const ADMIN_CONTACTS: &str = "api/admin/contacts";
}

/// Configuration of the HTTP client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every endpoint is resolved against. Always ends with `/`.
    pub base_url: Url,
    /// Per-request timeout covering connect, send and body read. `None` disables it.
    pub request_timeout: Option<Duration>,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: normalize(Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid")),
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            user_agent: concat!("kitchensink-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    /// Create a configuration for the backend at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::Config(format!("invalid base URL `{base_url}`: {e}")))?;
        Ok(Self {
            base_url: normalize(base_url),
            ..Self::default()
        })
    }

    /// Read the configuration from the environment.
    ///
    /// - `KITCHENSINK_BASE_URL` (default `http://localhost:8080`)
    /// - `KITCHENSINK_REQUEST_TIMEOUT_SECS` (default 30, `0` disables the timeout)
    pub fn from_env() -> Result<Self, ClientError> {
        let base_url =
            std::env::var("KITCHENSINK_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let mut config = Self::new(&base_url)?;

        if let Ok(secs) = std::env::var("KITCHENSINK_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|e| {
                ClientError::Config(format!(
                    "invalid KITCHENSINK_REQUEST_TIMEOUT_SECS `{secs}`: {e}"
                ))
            })?;
            config.request_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        Ok(config)
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Resolve a resource identifier: absolute URLs are used as-is, anything else is joined
    /// onto the base URL.
    pub fn resolve(&self, resource: &str) -> Result<Url, ClientError> {
        if let Ok(url) = Url::parse(resource) {
            if url.has_host() {
                return Ok(url);
            }
        }
        self.base_url
            .join(resource.trim_start_matches('/'))
            .map_err(|e| ClientError::Config(format!("invalid resource `{resource}`: {e}")))
    }
}

fn normalize(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
