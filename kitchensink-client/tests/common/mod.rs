#![allow(dead_code)]

use kitchensink_client::{ClientConfig, KitchensinkClient};
use kitchensink_core::{Identity, Role};
use kitchensink_session::MemorySessionStore;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::MockServer;

pub fn client_for(base_url: &str) -> KitchensinkClient {
    KitchensinkClient::builder()
        .config(ClientConfig::new(base_url).unwrap())
        .session_store(Arc::new(MemorySessionStore::in_memory()))
        .build()
        .unwrap()
}

pub async fn client(server: &MockServer) -> KitchensinkClient {
    client_for(&server.uri())
}

pub async fn signed_in(server: &MockServer, identity: Identity) -> KitchensinkClient {
    let client = client(server).await;
    client
        .session_store()
        .set_session("A1".into(), "R1".into(), identity)
        .await
        .unwrap();
    client
}

pub fn bob() -> Identity {
    Identity::new("bob", [Role::User])
}

pub fn admin() -> Identity {
    Identity::new("adminuser1", [Role::User, Role::Admin])
}

pub fn token_pair(access: &str, refresh: &str, username: &str, roles: &[&str]) -> Value {
    json!({
        "accessToken": access,
        "refreshToken": refresh,
        "type": "Bearer",
        "id": "1",
        "username": username,
        "roles": roles,
    })
}

pub fn contact(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "email": format!("{}@example.com", name.to_lowercase()),
        "phoneNumber": "5551234567",
        "createdBy": "bob",
        "createdAt": "2024-05-01T10:00:00Z",
        "updatedAt": "2024-05-01T10:00:00Z",
    })
}
