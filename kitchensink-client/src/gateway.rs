use crate::auth;
use crate::config::ClientConfig;
use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use http::{Method, StatusCode};
use kitchensink_core::response::error_message;
use kitchensink_core::utils::{self, JSON_MEDIA_TYPE};
use kitchensink_core::{AuthEvent, ClientError, SignOutReason};
use kitchensink_session::{Session, SessionStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use url::Url;

/// Method, headers and optional body of a request sent through the [`Gateway`].
///
/// The `Authorization` header is injected by the gateway.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    method: Method,
    headers: HeaderMap,
    body: Option<String>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new(Method::GET)
    }
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set a raw body. For POST, PUT and PATCH the content type defaults to JSON.
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self, ClientError> {
        let body = serde_json::to_string(value)
            .map_err(|e| ClientError::network(format!("failed to encode request body: {e}")))?;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MEDIA_TYPE));
        self.body = Some(body);
        Ok(self)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }
}

/// A successful response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// The response declared a JSON content type.
    Json(Value),
    /// Any other content type.
    Text(String),
}

impl ResponseBody {
    /// Decode into `T`. Text bodies are parsed as JSON.
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        match self {
            ResponseBody::Json(value) => serde_json::from_value(value),
            ResponseBody::Text(text) => serde_json::from_str(&text),
        }
    }
}

// One caller's request, kept for the duration of a gateway call so it can be re-sent.
struct PendingRequest {
    url: Url,
    options: RequestOptions,
}

impl PendingRequest {
    fn headers(&self, access_token: &str) -> Result<HeaderMap, ClientError> {
        utils::prepare_headers(
            &self.options.headers,
            &self.options.method,
            self.options.body.is_some(),
            access_token,
        )
        .ok_or_else(|| ClientError::network("access token is not a valid header value"))
    }
}

/// Performs requests on behalf of callers, injecting the access token and transparently
/// refreshing it once when the backend answers 401.
///
/// Every failure that cannot be recovered because of authentication tears the session down
/// and publishes [`AuthEvent::SignedOut`].
pub struct Gateway {
    http: reqwest::Client,
    config: ClientConfig,
    store: Arc<dyn SessionStore>,
    events: broadcast::Sender<AuthEvent>,
    refresh_guard: Mutex<()>,
}

impl Gateway {
    pub fn new(
        http: reqwest::Client,
        config: ClientConfig,
        store: Arc<dyn SessionStore>,
        events: broadcast::Sender<AuthEvent>,
    ) -> Self {
        Self {
            http,
            config,
            store,
            events,
            refresh_guard: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session_store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn publish(&self, event: AuthEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Perform one request.
    ///
    /// Returns `None` for 204 and empty bodies, parsed JSON when the response is JSON and raw
    /// text otherwise.
    pub async fn request(
        &self,
        resource: &str,
        options: RequestOptions,
    ) -> Result<Option<ResponseBody>, ClientError> {
        let pending = PendingRequest {
            url: self.config.resolve(resource)?,
            options,
        };
        log::debug!("{} {}", pending.options.method, pending.url);

        let Some(access_token) = self.store.access_token().await else {
            log::warn!(
                "No access token for {} {}",
                pending.options.method,
                pending.url
            );
            self.teardown(SignOutReason::AuthenticationRequired).await;
            return Err(ClientError::AuthenticationRequired);
        };

        let response = self.send(&pending, &access_token).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return read_response(response).await;
        }

        log::warn!(
            "Received 401 for {} {}, attempting token refresh",
            pending.options.method,
            pending.url
        );
        let access_token = self.refresh_after_unauthorized(&access_token).await?;

        log::debug!(
            "Retrying {} {} with refreshed token",
            pending.options.method,
            pending.url
        );
        let retry = self.send(&pending, &access_token).await?;
        read_response(retry).await
    }

    /// Perform a request and decode the body into `T`. An absent body decodes from `null`.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        resource: &str,
        options: RequestOptions,
    ) -> Result<T, ClientError> {
        let decoded = match self.request(resource, options).await? {
            Some(body) => body.into_json(),
            None => serde_json::from_value(Value::Null),
        };
        decoded.map_err(|e| ClientError::network(format!("unexpected response body: {e}")))
    }

    async fn send(
        &self,
        pending: &PendingRequest,
        access_token: &str,
    ) -> Result<reqwest::Response, ClientError> {
        let mut builder = self
            .http
            .request(pending.options.method.clone(), pending.url.clone())
            .headers(pending.headers(access_token)?);
        if let Some(body) = &pending.options.body {
            builder = builder.body(body.clone());
        }
        builder.send().await.map_err(|e| {
            log::warn!("Request to {} failed: {e}", pending.url);
            ClientError::network(e)
        })
    }

    /// Obtain a fresh access token after `stale` was rejected.
    ///
    /// Refreshes are serialized: a caller that waited on another caller's refresh reuses its
    /// result instead of refreshing again.
    async fn refresh_after_unauthorized(&self, stale: &str) -> Result<String, ClientError> {
        let _guard = self.refresh_guard.lock().await;

        let session = self.store.snapshot().await;
        match session.access_token() {
            Some(current) if current != stale => {
                log::debug!("Access token was refreshed by a concurrent request");
                return Ok(current.to_string());
            }
            Some(_) => {}
            None => {
                log::warn!("Session was cleared while waiting to refresh");
                self.teardown(SignOutReason::SessionExpired).await;
                return Err(ClientError::SessionExpired);
            }
        }

        let Some(refresh_token) = session.refresh_token() else {
            log::warn!("No refresh token available, logging out");
            self.teardown(SignOutReason::SessionExpired).await;
            return Err(ClientError::SessionExpired);
        };

        let tokens = match auth::request_token_refresh(self, refresh_token).await {
            Ok(tokens) => tokens,
            Err(e) => {
                log::warn!("Token refresh failed: {e}");
                self.teardown(SignOutReason::SessionExpired).await;
                return Err(ClientError::SessionExpired);
            }
        };

        let identity = tokens.identity();
        if let Err(e) = self
            .store
            .set_session(
                tokens.access_token.clone(),
                tokens.refresh_token,
                identity.clone(),
            )
            .await
        {
            log::error!("Failed to store refreshed session: {e}");
            self.teardown(SignOutReason::SessionExpired).await;
            return Err(e.into());
        }

        log::debug!("Token refreshed for {}", identity.username);
        self.publish(AuthEvent::TokenRefreshed(identity));
        Ok(tokens.access_token)
    }

    /// Clear the session, revoke its refresh token on the backend (best effort) and publish
    /// [`AuthEvent::SignedOut`].
    ///
    /// Concurrent teardowns of the same session revoke and publish `SessionExpired` once.
    pub(crate) async fn teardown(&self, reason: SignOutReason) {
        let (previous, publish) = match self.store.take_session().await {
            Ok(previous) => {
                let publish = !previous.is_empty() || reason != SignOutReason::SessionExpired;
                (previous, publish)
            }
            Err(e) => {
                log::error!("Failed to clear session storage: {e}");
                (Session::empty(), true)
            }
        };

        if let Some(refresh_token) = previous.refresh_token() {
            auth::revoke_refresh_token(self, refresh_token).await;
        }

        if publish {
            log::info!("Session ended: {reason:?}");
            self.publish(AuthEvent::SignedOut { reason });
        }
    }
}

async fn read_response(response: reqwest::Response) -> Result<Option<ResponseBody>, ClientError> {
    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let message = error_message(status.as_u16(), content_type.as_deref(), &text);
        log::warn!("Request failed with status {status}: {message}");
        return Err(ClientError::http(status.as_u16(), message));
    }

    let empty_length = response
        .headers()
        .get(CONTENT_LENGTH)
        .is_some_and(|v| v.as_bytes() == b"0");
    if status == StatusCode::NO_CONTENT || empty_length {
        return Ok(None);
    }

    let text = response.text().await.map_err(ClientError::network)?;
    if text.is_empty() {
        return Ok(None);
    }

    if utils::is_json(content_type.as_deref()) {
        let value = serde_json::from_str(&text).map_err(|e| {
            ClientError::http(status.as_u16(), format!("invalid JSON response: {e}"))
        })?;
        Ok(Some(ResponseBody::Json(value)))
    } else {
        Ok(Some(ResponseBody::Text(text)))
    }
}
