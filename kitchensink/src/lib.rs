//! # Kitchensink
//!
//! Facade over the kitchensink client crates.
//!
//! - `session` (enabled by `client`): session stores and storage backends.
//! - `client` (default): the authenticated gateway and typed APIs.
//! - `sqlite`: a SQLite storage backend for sessions.
//!
//! ```no_run
//! use kitchensink::{ClientConfig, KitchensinkClient, MemorySessionStore};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), kitchensink::ClientError> {
//! let client = KitchensinkClient::builder()
//!     .config(ClientConfig::from_env()?)
//!     .session_store(Arc::new(MemorySessionStore::in_memory()))
//!     .build()?;
//! client.auth().login("bob", "secret").await?;
//! let contacts = client.contacts().list().await?;
//! # Ok(())
//! # }
//! ```

pub use kitchensink_core::{response, state, utils};
pub use kitchensink_core::{
    AuthEvent, ClientError, Contact, ContactForm, Identity, RegistrationError, Role,
    SignOutReason, User, UserUpdate, View,
};

#[cfg(feature = "session")]
pub use kitchensink_session as session;
#[cfg(feature = "session")]
pub use kitchensink_session::{
    FileStorage, MemorySessionStore, MemoryStorage, PersistentSessionStore, Session,
    SessionStore, Storage,
};
#[cfg(feature = "sqlite")]
pub use kitchensink_session::SqlStorage;

#[cfg(feature = "client")]
pub use kitchensink_client as client;
#[cfg(feature = "client")]
pub use kitchensink_client::{
    AdminApi, AuthFlow, ClientConfig, ContactsApi, Gateway, KitchensinkClient, RequestOptions,
    ResponseBody,
};
