use crate::config::endpoints;
use crate::gateway::{Gateway, RequestOptions};
use http::Method;
use kitchensink_core::{ClientError, Contact, ContactForm, User, UserUpdate};

fn item(collection: &str, id: &str) -> String {
    format!("{collection}/{}", urlencoding::encode(id))
}

/// The signed-in user's own contacts.
pub struct ContactsApi<'a> {
    gateway: &'a Gateway,
}

impl<'a> ContactsApi<'a> {
    pub(crate) fn new(gateway: &'a Gateway) -> Self {
        Self { gateway }
    }

    pub async fn list(&self) -> Result<Vec<Contact>, ClientError> {
        self.gateway
            .request_json(endpoints::CONTACTS, RequestOptions::get())
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Contact, ClientError> {
        self.gateway
            .request_json(&item(endpoints::CONTACTS, id), RequestOptions::get())
            .await
    }

    pub async fn create(&self, form: &ContactForm) -> Result<Contact, ClientError> {
        let options = RequestOptions::new(Method::POST).json(form)?;
        self.gateway.request_json(endpoints::CONTACTS, options).await
    }

    pub async fn update(&self, id: &str, form: &ContactForm) -> Result<Contact, ClientError> {
        let options = RequestOptions::new(Method::PUT).json(form)?;
        self.gateway
            .request_json(&item(endpoints::CONTACTS, id), options)
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ClientError> {
        self.gateway
            .request(&item(endpoints::CONTACTS, id), RequestOptions::delete())
            .await
            .map(|_| ())
    }
}

/// User and contact administration. The backend requires `ROLE_ADMIN`.
pub struct AdminApi<'a> {
    gateway: &'a Gateway,
}

impl<'a> AdminApi<'a> {
    pub(crate) fn new(gateway: &'a Gateway) -> Self {
        Self { gateway }
    }

    pub async fn list_users(&self) -> Result<Vec<User>, ClientError> {
        self.gateway
            .request_json(endpoints::ADMIN_USERS, RequestOptions::get())
            .await
    }

    pub async fn get_user(&self, id: &str) -> Result<User, ClientError> {
        self.gateway
            .request_json(&item(endpoints::ADMIN_USERS, id), RequestOptions::get())
            .await
    }

    /// Update `user`. Refused locally when `user` is the signed-in account.
    pub async fn update_user(&self, user: &User, update: &UserUpdate) -> Result<User, ClientError> {
        self.refuse_own_account(user, "You cannot edit your own user account.")
            .await?;
        let options = RequestOptions::new(Method::PUT).json(update)?;
        self.gateway
            .request_json(&item(endpoints::ADMIN_USERS, &user.id), options)
            .await
    }

    /// Delete `user`. Refused locally when `user` is the signed-in account.
    pub async fn delete_user(&self, user: &User) -> Result<(), ClientError> {
        self.refuse_own_account(user, "You cannot delete your own user account.")
            .await?;
        self.gateway
            .request(&item(endpoints::ADMIN_USERS, &user.id), RequestOptions::delete())
            .await
            .map(|_| ())
    }

    pub async fn list_contacts(&self) -> Result<Vec<Contact>, ClientError> {
        self.gateway
            .request_json(endpoints::ADMIN_CONTACTS, RequestOptions::get())
            .await
    }

    pub async fn get_contact(&self, id: &str) -> Result<Contact, ClientError> {
        self.gateway
            .request_json(&item(endpoints::ADMIN_CONTACTS, id), RequestOptions::get())
            .await
    }

    pub async fn update_contact(
        &self,
        id: &str,
        form: &ContactForm,
    ) -> Result<Contact, ClientError> {
        let options = RequestOptions::new(Method::PUT).json(form)?;
        self.gateway
            .request_json(&item(endpoints::ADMIN_CONTACTS, id), options)
            .await
    }

    pub async fn delete_contact(&self, id: &str) -> Result<(), ClientError> {
        self.gateway
            .request(&item(endpoints::ADMIN_CONTACTS, id), RequestOptions::delete())
            .await
            .map(|_| ())
    }

    async fn refuse_own_account(&self, user: &User, message: &str) -> Result<(), ClientError> {
        let current = self.gateway.session_store().identity().await;
        if current.is_some_and(|identity| identity.username == user.username) {
            log::warn!("Refusing to modify the signed-in account {}", user.username);
            return Err(ClientError::RequestFailed {
                status: None,
                message: message.to_string(),
            });
        }
        Ok(())
    }
}
