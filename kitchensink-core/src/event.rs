use crate::state::Identity;
use serde::{Deserialize, Serialize};

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignOutReason {
    /// The user logged out.
    UserRequested,
    /// A request was attempted without any credentials.
    AuthenticationRequired,
    /// The access token expired and could not be refreshed.
    SessionExpired,
}

/// Session lifecycle notifications published to the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// A login stored a new session.
    SignedIn(Identity),
    /// A transparent refresh replaced the token pair.
    TokenRefreshed(Identity),
    /// The session was torn down; the UI should show the login view.
    SignedOut {
        /// What triggered the teardown.
        reason: SignOutReason,
    },
}

/// The top-level sections of the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum View {
    /// Login form.
    Login,
    /// Registration form.
    Register,
    /// The signed-in user's own contacts.
    KitchenSink,
    /// User and contact administration.
    Admin,
}

impl View {
    /// The landing view for an identity: admins get [`View::Admin`], other signed-in users
    /// [`View::KitchenSink`], everyone else [`View::Login`].
    pub fn for_identity(identity: Option<&Identity>) -> Self {
        match identity {
            Some(identity) if identity.is_well_formed() && identity.is_admin() => View::Admin,
            Some(identity) if identity.is_well_formed() => View::KitchenSink,
            _ => View::Login,
        }
    }

    /// Whether the view needs an authenticated session.
    pub fn requires_auth(&self) -> bool {
        match self {
            View::Login | View::Register => false,
            View::KitchenSink | View::Admin => true,
        }
    }

    /// The view to show after an event.
    pub fn after(event: &AuthEvent) -> Self {
        match event {
            AuthEvent::SignedIn(identity) | AuthEvent::TokenRefreshed(identity) => {
                View::for_identity(Some(identity))
            }
            AuthEvent::SignedOut { .. } => View::Login,
        }
    }
}
