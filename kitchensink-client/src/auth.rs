use crate::config::endpoints;
use crate::gateway::Gateway;
use kitchensink_core::response::ErrorBody;
use kitchensink_core::{
    AuthEvent, ClientError, Identity, RegistrationError, SignOutReason, TokenResponse,
};
use serde::Serialize;
use serde_json::Value;

const REGISTRATION_SUCCESS: &str = "Registration successful! You can now log in.";
const MISSING_CREDENTIALS: &str = "Username and password are required.";

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshTokenRequest<'a> {
    refresh_token: &'a str,
}

/// Login, registration and logout against the backend's auth endpoints.
///
/// These endpoints are public: requests carry no bearer token and never trigger a refresh.
pub struct AuthFlow<'a> {
    gateway: &'a Gateway,
}

impl<'a> AuthFlow<'a> {
    pub(crate) fn new(gateway: &'a Gateway) -> Self {
        Self { gateway }
    }

    /// Exchange credentials for a token pair, store it and publish [`AuthEvent::SignedIn`].
    pub async fn login(&self, username: &str, password: &str) -> Result<Identity, ClientError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(ClientError::RequestFailed {
                status: None,
                message: MISSING_CREDENTIALS.to_string(),
            });
        }

        let (status, text) =
            post_public(self.gateway, endpoints::LOGIN, &LoginRequest { username, password })
                .await?;

        if !status.is_success() {
            let message = json_message(&text)
                .unwrap_or_else(|| format!("Login failed with status: {}", status.as_u16()));
            log::warn!("Login failed for {username}: {message}");
            return Err(ClientError::http(status.as_u16(), message));
        }

        let tokens: TokenResponse = serde_json::from_str(&text).map_err(|e| {
            ClientError::http(status.as_u16(), format!("invalid login response: {e}"))
        })?;
        let identity = tokens.identity();

        self.gateway
            .session_store()
            .set_session(tokens.access_token, tokens.refresh_token, identity.clone())
            .await?;

        log::info!("Signed in as {}", identity.username);
        self.gateway.publish(AuthEvent::SignedIn(identity.clone()));
        Ok(identity)
    }

    /// Create an account. Returns the backend's confirmation message.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<String, ClientError> {
        let request = RegisterRequest {
            username,
            email,
            password,
        };
        let (status, text) = post_public(self.gateway, endpoints::REGISTER, &request).await?;

        if status.is_success() {
            log::info!("Registered {username}");
            return Ok(json_message(&text).unwrap_or_else(|| REGISTRATION_SUCCESS.to_string()));
        }

        let status = status.as_u16();
        let error = match ErrorBody::decode(&text) {
            Some(ErrorBody::FieldErrors(fields)) => RegistrationError::Validation(fields),
            Some(ErrorBody::Structured(body)) => RegistrationError::Rejected {
                status,
                message: body
                    .best_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| registration_failed(status)),
            },
            None if !text.trim().is_empty() => RegistrationError::Rejected {
                status,
                message: text,
            },
            None => RegistrationError::Rejected {
                status,
                message: registration_failed(status),
            },
        };
        log::warn!("Registration of {username} rejected: {error}");
        Err(error.into())
    }

    /// End the session: revoke the refresh token on the backend (best effort), clear the
    /// store and publish [`AuthEvent::SignedOut`] with [`SignOutReason::UserRequested`].
    pub async fn logout(&self) {
        self.gateway.teardown(SignOutReason::UserRequested).await;
    }
}

fn registration_failed(status: u16) -> String {
    format!("Registration failed with status: {status}")
}

// `message`, else `error`, from a JSON object body.
fn json_message(text: &str) -> Option<String> {
    let value: Value = serde_json::from_str(text).ok()?;
    ["message", "error"].iter().find_map(|key| {
        value
            .get(*key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

async fn post_public<T: Serialize>(
    gateway: &Gateway,
    endpoint: &str,
    body: &T,
) -> Result<(http::StatusCode, String), ClientError> {
    let url = gateway.config().resolve(endpoint)?;
    log::debug!("POST {url}");
    let response = gateway
        .http()
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| {
            log::warn!("Request to {endpoint} failed: {e}");
            ClientError::network(e)
        })?;
    let status = response.status();
    let text = response.text().await.map_err(ClientError::network)?;
    Ok((status, text))
}

/// Exchange a refresh token for a new pair. Any non-2xx or unreadable body is an error.
pub(crate) async fn request_token_refresh(
    gateway: &Gateway,
    refresh_token: &str,
) -> Result<TokenResponse, ClientError> {
    let (status, text) = post_public(
        gateway,
        endpoints::REFRESH_TOKEN,
        &RefreshTokenRequest { refresh_token },
    )
    .await?;

    if !status.is_success() {
        return Err(ClientError::http(
            status.as_u16(),
            format!("Token refresh failed with status {}", status.as_u16()),
        ));
    }

    serde_json::from_str(&text).map_err(|e| {
        ClientError::http(status.as_u16(), format!("invalid refresh response: {e}"))
    })
}

/// Invalidate a refresh token on the backend. Failures are logged and ignored.
pub(crate) async fn revoke_refresh_token(gateway: &Gateway, refresh_token: &str) {
    match post_public(
        gateway,
        endpoints::LOGOUT,
        &RefreshTokenRequest { refresh_token },
    )
    .await
    {
        Ok((status, _)) if status.is_success() => log::debug!("Refresh token revoked"),
        Ok((status, _)) => log::warn!("Backend logout returned status {status}"),
        Err(e) => log::warn!("Backend logout failed: {e}"),
    }
}
