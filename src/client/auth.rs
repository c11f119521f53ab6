use std::sync::Arc;

use serde_json::json;
use tracing::info;

use super::{
    http::{ApiClient, ClientError},
    session::SessionProvider,
};
use crate::auth::dto::{AuthResponse, PublicUser};

/// Sign-in flow: calls the auth endpoints and keeps the session in step.
#[derive(Clone)]
pub struct AuthClient {
    api: ApiClient,
    session: Arc<dyn SessionProvider>,
}

impl AuthClient {
    pub fn new(api: ApiClient, session: Arc<dyn SessionProvider>) -> Self {
        Self { api, session }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session(&self) -> &Arc<dyn SessionProvider> {
        &self.session
    }

    fn accept(&self, res: AuthResponse) -> Result<PublicUser, ClientError> {
        let user = serde_json::to_value(&res.user)?;
        self.session.login(user, res.token);
        info!(user_id = %res.user.id, "signed in");
        Ok(res.user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<PublicUser, ClientError> {
        let res: AuthResponse = self
            .api
            .post_json("/auth/login", &json!({ "email": email, "password": password }))
            .await?;
        self.accept(res)
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<PublicUser, ClientError> {
        let res: AuthResponse = self
            .api
            .post_json(
                "/auth/register",
                &json!({ "name": name, "email": email, "password": password }),
            )
            .await?;
        self.accept(res)
    }

    pub async fn me(&self) -> Result<PublicUser, ClientError> {
        self.api.get_json("/auth/me").await
    }

    pub fn logout(&self) {
        self.session.logout();
        info!("signed out");
    }
}
