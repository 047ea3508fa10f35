//! # Kitchensink Core
//!
//! `kitchensink-core` provides the foundational types shared by the kitchensink client crates.
//! It defines identities and roles, the wire types exchanged with the backend, the error taxonomy
//! surfaced to callers, and the auth events a rendering layer subscribes to.

#![warn(missing_docs)]

/// Errors surfaced by the client.
pub mod error;
pub use crate::error::{ClientError, RegistrationError};

/// Identities, roles and token responses.
pub mod state;
pub use crate::state::{Identity, Role, TokenResponse, UnknownRole};

/// Contacts and users managed through the backend.
pub mod model;
pub use crate::model::{Contact, ContactForm, User, UserUpdate};

/// Auth events and role-gated views.
pub mod event;
pub use crate::event::{AuthEvent, SignOutReason, View};

/// Decoding of backend error bodies.
pub mod response;
pub use crate::response::{ApiError, ErrorBody};

/// Utility functions for request preparation and response inspection.
pub mod utils {
    use http::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
    use http::Method;

    /// Media type used for request bodies sent by the client.
    pub const JSON_MEDIA_TYPE: &str = "application/json";

    /// Build the `Authorization: Bearer <token>` header value.
    pub fn bearer(token: &str) -> Option<HeaderValue> {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}")).ok()?;
        value.set_sensitive(true);
        Some(value)
    }

    /// Whether a request with this method carries a body that defaults to JSON.
    pub fn is_mutating(method: &Method) -> bool {
        *method == Method::POST || *method == Method::PUT || *method == Method::PATCH
    }

    /// Whether a `Content-Type` value denotes JSON.
    pub fn is_json(content_type: Option<&str>) -> bool {
        content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains(JSON_MEDIA_TYPE))
    }

    /// Inject the bearer token and, for mutating requests with a body, a default JSON
    /// content type. Caller-supplied headers win, except `Authorization` which is always replaced.
    pub fn prepare_headers(
        headers: &HeaderMap,
        method: &Method,
        has_body: bool,
        access_token: &str,
    ) -> Option<HeaderMap> {
        let mut headers = headers.clone();
        headers.insert(AUTHORIZATION, bearer(access_token)?);
        if has_body && is_mutating(method) && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MEDIA_TYPE));
        }
        Some(headers)
    }
}
