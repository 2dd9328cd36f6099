use serde::{Deserialize, Serialize};
use tracing::info;

use super::xcr_path;
use crate::client::EnfClient;
use crate::context::RequestContext;
use crate::endpoint::Endpoint;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequest {
    pub username: String,
    pub password: String,
}

/// The outcome of a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub token: String,
    pub user_id: i64,
}

pub struct AuthService<'a> {
    client: &'a EnfClient,
}

impl<'a> AuthService<'a> {
    pub(crate) fn new(client: &'a EnfClient) -> Self {
        Self { client }
    }

    /// Log in and store the returned token on the client, so every later
    /// request (from any clone of the client) is authenticated.
    pub async fn authenticate(
        &self,
        ctx: &RequestContext,
        username: &str,
        password: &str,
    ) -> Result<Credentials> {
        let request = AuthRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let endpoint = Endpoint::post(xcr_path("/xauth"), &request)?;
        let credentials: Credentials = self.client.dispatch_one(ctx, endpoint).await?;

        self.client.token().set(credentials.token.clone());
        info!(username = %credentials.username, user_id = credentials.user_id, "authenticated");
        Ok(credentials)
    }
}
