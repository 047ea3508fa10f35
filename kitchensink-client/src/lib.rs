//! # Kitchensink Client
//!
//! `kitchensink-client` talks to the kitchensink backend on behalf of a signed-in user.
//!
//! ## Key Components
//!
//! - **[`Gateway`]**: Sends authenticated requests, refreshing the access token once on 401.
//! - **[`AuthFlow`]**: Login, registration and logout.
//! - **[`ContactsApi`]** and **[`AdminApi`]**: Typed access to contacts and users.
//! - **[`KitchensinkClient`]**: Owns the gateway and hands out the APIs above.
//!
//! Session changes are published as [`AuthEvent`]s; subscribe with
//! [`KitchensinkClient::subscribe`] to drive navigation.

use kitchensink_core::{AuthEvent, ClientError, View};
use kitchensink_session::SessionStore;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Typed resource APIs.
pub mod api;
/// Login, registration and logout.
pub mod auth;
/// Client configuration and backend endpoints.
pub mod config;
/// The authenticated request gateway.
pub mod gateway;

pub use api::{AdminApi, ContactsApi};
pub use auth::AuthFlow;
pub use config::ClientConfig;
pub use gateway::{Gateway, RequestOptions, ResponseBody};

const DEFAULT_EVENT_CAPACITY: usize = 16;

/// Marker for a missing component in the typestate pattern.
#[derive(Clone, Default)]
pub struct Missing;

/// Marker for a configured component in the typestate pattern.
#[derive(Clone)]
pub struct Configured<T>(pub T);

/// Entry point to the backend.
pub struct KitchensinkClient {
    gateway: Gateway,
}

impl KitchensinkClient {
    /// Create a new [`KitchensinkClientBuilder`].
    pub fn builder() -> KitchensinkClientBuilder<Missing> {
        KitchensinkClientBuilder::default()
    }

    /// The underlying gateway, for requests not covered by the typed APIs.
    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Login, registration and logout.
    pub fn auth(&self) -> AuthFlow<'_> {
        AuthFlow::new(&self.gateway)
    }

    /// The signed-in user's contacts.
    pub fn contacts(&self) -> ContactsApi<'_> {
        ContactsApi::new(&self.gateway)
    }

    /// User and contact administration.
    pub fn admin(&self) -> AdminApi<'_> {
        AdminApi::new(&self.gateway)
    }

    /// Receive session lifecycle events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.gateway.subscribe()
    }

    /// The store holding the current session.
    pub fn session_store(&self) -> &Arc<dyn SessionStore> {
        self.gateway.session_store()
    }

    /// The view matching the current session.
    pub async fn current_view(&self) -> View {
        let session = self.session_store().snapshot().await;
        if session.is_authenticated() {
            View::for_identity(session.identity())
        } else {
            View::Login
        }
    }
}

/// A builder for [`KitchensinkClient`]. A session store is required.
pub struct KitchensinkClientBuilder<S = Missing> {
    config: ClientConfig,
    event_capacity: usize,
    session_store: S,
}

impl Default for KitchensinkClientBuilder<Missing> {
    fn default() -> Self {
        Self {
            config: ClientConfig::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            session_store: Missing,
        }
    }
}

impl<S> KitchensinkClientBuilder<S> {
    /// Set the client configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Number of events buffered per subscriber before the slowest one lags.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Set the session store.
    pub fn session_store(
        self,
        store: Arc<dyn SessionStore>,
    ) -> KitchensinkClientBuilder<Configured<Arc<dyn SessionStore>>> {
        KitchensinkClientBuilder {
            config: self.config,
            event_capacity: self.event_capacity,
            session_store: Configured(store),
        }
    }
}

impl KitchensinkClientBuilder<Configured<Arc<dyn SessionStore>>> {
    /// Build the client.
    pub fn build(self) -> Result<KitchensinkClient, ClientError> {
        let mut http = reqwest::Client::builder().user_agent(self.config.user_agent.clone());
        if let Some(timeout) = self.config.request_timeout {
            http = http.timeout(timeout);
        }
        let http = http
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;

        let (events, _) = broadcast::channel(self.event_capacity);
        Ok(KitchensinkClient {
            gateway: Gateway::new(http, self.config, self.session_store.0, events),
        })
    }
}
