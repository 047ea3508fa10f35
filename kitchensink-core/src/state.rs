use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Username shown when the backend omits it from a token response.
pub const FALLBACK_USERNAME: &str = "Authenticated User";

/// The closed set of roles granted by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    /// A regular user managing their own contacts.
    #[serde(rename = "ROLE_USER")]
    User,
    /// An administrator managing all users and contacts.
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
}

impl Role {
    /// The wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "ROLE_USER",
            Role::Admin => "ROLE_ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role name outside the known set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ROLE_USER" => Ok(Role::User),
            "ROLE_ADMIN" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// The cached claims of the signed-in user. Not verified client-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Login name.
    pub username: String,
    /// Granted roles.
    pub roles: BTreeSet<Role>,
}

impl Identity {
    /// Create an identity from a username and its roles.
    pub fn new(username: impl Into<String>, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            username: username.into(),
            roles: roles.into_iter().collect(),
        }
    }

    /// Whether the identity carries the given role.
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Whether the identity carries [`Role::Admin`].
    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    /// Whether the role set is usable for an authenticated session.
    pub fn is_well_formed(&self) -> bool {
        !self.username.is_empty() && !self.roles.is_empty()
    }
}

/// Token pair and claims returned by the login and refresh endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    /// Short-lived bearer credential.
    pub access_token: String,
    /// Long-lived credential used to mint new access tokens.
    pub refresh_token: String,
    /// Token type, always `Bearer` in practice.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Backend id of the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Login name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Role names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
}

impl TokenResponse {
    /// The identity carried by this response.
    ///
    /// A missing username or role list falls back to a generic user; unknown role names are
    /// dropped.
    pub fn identity(&self) -> Identity {
        let username = self
            .username
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| FALLBACK_USERNAME.to_string());

        let roles = match &self.roles {
            Some(names) => names
                .iter()
                .filter_map(|name| match name.parse::<Role>() {
                    Ok(role) => Some(role),
                    Err(e) => {
                        log::warn!("Ignoring role in token response: {e}");
                        None
                    }
                })
                .collect(),
            None => BTreeSet::from([Role::User]),
        };

        Identity { username, roles }
    }
}
