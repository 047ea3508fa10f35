//! # Kitchensink Session
//!
//! Holds the signed-in user's token pair and identity in durable client-side storage.
//!
//! The [`SessionStore`] trait is the only way session state is mutated. The provided
//! [`PersistentSessionStore`] keeps a cached snapshot behind a lock and writes through to a
//! [`Storage`] backend under that lock, so readers never observe a half-written session.

use async_trait::async_trait;
use kitchensink_core::Identity;
use tokio::sync::RwLock;

pub mod error;
pub mod storage;
#[cfg(feature = "sqlite")]
pub mod sql_store;

pub use error::StorageError;
#[cfg(feature = "sqlite")]
pub use sql_store::SqlStorage;
pub use storage::{FileStorage, MemoryStorage, Storage};

/// Storage key of the access token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Storage key of the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
/// Storage key of the serialized identity.
pub const CURRENT_USER_KEY: &str = "currentUser";

const KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, CURRENT_USER_KEY];

/// A snapshot of the session.
///
/// Either all three fields are present or none is.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    access_token: Option<String>,
    refresh_token: Option<String>,
    identity: Option<Identity>,
}

impl Session {
    /// An unauthenticated session.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        identity: Identity,
    ) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token: Some(refresh_token.into()),
            identity: Some(identity),
        }
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none() && self.identity.is_none()
    }

    /// True iff an access token and a well-formed identity with at least one role are present.
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some() && self.identity.as_ref().is_some_and(Identity::is_well_formed)
    }
}

/// Trait for the store holding the current session.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// A consistent copy of the whole session.
    async fn snapshot(&self) -> Session;

    /// Replace the session with a new token pair and identity, atomically for readers.
    async fn set_session(
        &self,
        access_token: String,
        refresh_token: String,
        identity: Identity,
    ) -> Result<(), StorageError>;

    /// Remove the session and return what was removed. Returns an empty session when there
    /// was nothing to remove.
    async fn take_session(&self) -> Result<Session, StorageError>;

    /// Remove the session. Idempotent.
    async fn clear_session(&self) -> Result<(), StorageError> {
        self.take_session().await.map(|_| ())
    }

    async fn access_token(&self) -> Option<String> {
        self.snapshot().await.access_token
    }

    async fn refresh_token(&self) -> Option<String> {
        self.snapshot().await.refresh_token
    }

    async fn identity(&self) -> Option<Identity> {
        self.snapshot().await.identity
    }

    async fn is_authenticated(&self) -> bool {
        self.snapshot().await.is_authenticated()
    }
}

/// A [`SessionStore`] that caches the session and writes through to a [`Storage`] backend.
pub struct PersistentSessionStore<S: Storage> {
    storage: S,
    current: RwLock<Session>,
}

/// A session store that lives only as long as the process.
pub type MemorySessionStore = PersistentSessionStore<MemoryStorage>;

impl MemorySessionStore {
    pub fn in_memory() -> Self {
        Self {
            storage: MemoryStorage::new(),
            current: RwLock::new(Session::empty()),
        }
    }
}

impl<S: Storage> PersistentSessionStore<S> {
    /// Open a store over `storage`, restoring any persisted session.
    ///
    /// A partially persisted session (for example tokens without an identity, or an identity
    /// that no longer parses) is discarded and removed from storage.
    pub async fn open(storage: S) -> Result<Self, StorageError> {
        let session = load(&storage).await?;
        Ok(Self {
            storage,
            current: RwLock::new(session),
        })
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    async fn remove_all(&self) -> Result<(), StorageError> {
        remove_all(&self.storage).await
    }
}

async fn load<S: Storage>(storage: &S) -> Result<Session, StorageError> {
    let access_token = storage.get_item(ACCESS_TOKEN_KEY).await?;
    let refresh_token = storage.get_item(REFRESH_TOKEN_KEY).await?;
    let user = storage.get_item(CURRENT_USER_KEY).await?;

    match (access_token, refresh_token, user) {
        (None, None, None) => Ok(Session::empty()),
        (Some(access_token), Some(refresh_token), Some(user)) => {
            match serde_json::from_str::<Identity>(&user) {
                Ok(identity) if identity.is_well_formed() => {
                    log::debug!("Restored session for {}", identity.username);
                    Ok(Session::new(access_token, refresh_token, identity))
                }
                Ok(_) => {
                    log::warn!("Discarding persisted session with an empty identity");
                    remove_all(storage).await?;
                    Ok(Session::empty())
                }
                Err(e) => {
                    log::warn!("Discarding persisted session with unreadable identity: {e}");
                    remove_all(storage).await?;
                    Ok(Session::empty())
                }
            }
        }
        _ => {
            log::warn!("Discarding partially persisted session");
            remove_all(storage).await?;
            Ok(Session::empty())
        }
    }
}

// Attempts every key before reporting the first failure.
async fn remove_all<S: Storage>(storage: &S) -> Result<(), StorageError> {
    let mut first_error = None;
    for key in KEYS {
        if let Err(e) = storage.remove_item(key).await {
            log::error!("Failed to remove `{key}` from session storage: {e}");
            first_error.get_or_insert(e);
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[async_trait]
impl<S: Storage> SessionStore for PersistentSessionStore<S> {
    async fn snapshot(&self) -> Session {
        self.current.read().await.clone()
    }

    async fn set_session(
        &self,
        access_token: String,
        refresh_token: String,
        identity: Identity,
    ) -> Result<(), StorageError> {
        let mut current = self.current.write().await;
        let user = serde_json::to_string(&identity)?;

        let written = async {
            self.storage.set_item(ACCESS_TOKEN_KEY, &access_token).await?;
            self.storage.set_item(REFRESH_TOKEN_KEY, &refresh_token).await?;
            self.storage.set_item(CURRENT_USER_KEY, &user).await
        }
        .await;

        if let Err(e) = written {
            log::error!("Failed to persist session, clearing it: {e}");
            *current = Session::empty();
            let _ = self.remove_all().await;
            return Err(e);
        }

        log::debug!("Stored session for {}", identity.username);
        *current = Session::new(access_token, refresh_token, identity);
        Ok(())
    }

    async fn take_session(&self) -> Result<Session, StorageError> {
        let mut current = self.current.write().await;
        let previous = std::mem::take(&mut *current);
        if !previous.is_empty() {
            log::debug!("Clearing stored session");
        }
        self.remove_all().await?;
        Ok(previous)
    }
}
