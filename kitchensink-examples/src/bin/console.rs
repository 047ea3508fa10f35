//! A console front end: restores the saved session (or signs in with credentials from the
//! environment) and prints the landing view for the signed-in role.
//!
//! Environment:
//! - `KITCHENSINK_BASE_URL`, `KITCHENSINK_REQUEST_TIMEOUT_SECS`
//! - `KITCHENSINK_SESSION_FILE` (default `kitchensink-session.json`)
//! - `KITCHENSINK_USERNAME`, `KITCHENSINK_PASSWORD`
//! - `KITCHENSINK_LOGOUT=1` to sign out at the end

use kitchensink::{
    AuthEvent, ClientConfig, ClientError, FileStorage, KitchensinkClient, PersistentSessionStore,
    View,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,kitchensink_client=debug")),
        )
        .init();

    let session_file = std::env::var("KITCHENSINK_SESSION_FILE")
        .unwrap_or_else(|_| "kitchensink-session.json".to_string());
    let store = PersistentSessionStore::open(FileStorage::new(&session_file)).await?;

    let client = KitchensinkClient::builder()
        .config(ClientConfig::from_env()?)
        .session_store(Arc::new(store))
        .build()?;

    let mut events = client.subscribe();
    let navigator = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match &event {
                AuthEvent::SignedOut { reason } => {
                    tracing::warn!(?reason, "Signed out, showing {:?}", View::after(&event))
                }
                AuthEvent::SignedIn(identity) | AuthEvent::TokenRefreshed(identity) => {
                    tracing::info!(user = %identity.username, "Showing {:?}", View::after(&event))
                }
            }
        }
    });

    if !client.session_store().is_authenticated().await {
        let (Ok(username), Ok(password)) = (
            std::env::var("KITCHENSINK_USERNAME"),
            std::env::var("KITCHENSINK_PASSWORD"),
        ) else {
            tracing::error!("Not signed in; set KITCHENSINK_USERNAME and KITCHENSINK_PASSWORD");
            return Ok(());
        };
        client.auth().login(&username, &password).await?;
    }

    let result = match client.current_view().await {
        View::Admin => show_admin(&client).await,
        View::KitchenSink => show_contacts(&client).await,
        view => {
            tracing::info!("Nothing to show for {view:?}");
            Ok(())
        }
    };
    if let Err(e) = result {
        tracing::error!("{e}");
    }

    if std::env::var("KITCHENSINK_LOGOUT").is_ok_and(|v| v == "1") {
        client.auth().logout().await;
    }

    drop(client);
    let _ = navigator.await;
    Ok(())
}

async fn show_contacts(client: &KitchensinkClient) -> Result<(), ClientError> {
    let contacts = client.contacts().list().await?;
    println!("My contacts ({}):", contacts.len());
    for contact in contacts {
        println!(
            "  [{}] {} <{}> {}",
            contact.id, contact.name, contact.email, contact.phone_number
        );
    }
    Ok(())
}

async fn show_admin(client: &KitchensinkClient) -> Result<(), ClientError> {
    let admin = client.admin();

    let users = admin.list_users().await?;
    println!("Users ({}):", users.len());
    for user in users {
        let roles: Vec<_> = user.roles.iter().map(|r| r.as_str()).collect();
        println!(
            "  [{}] {} <{}> {}",
            user.id,
            user.username,
            user.email.as_deref().unwrap_or("-"),
            roles.join(", ")
        );
    }

    let contacts = admin.list_contacts().await?;
    println!("All contacts ({}):", contacts.len());
    for contact in contacts {
        println!(
            "  [{}] {} <{}> owned by {}",
            contact.id,
            contact.name,
            contact.email,
            contact.created_by.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
