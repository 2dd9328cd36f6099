use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::xcr_path;
use crate::client::EnfClient;
use crate::context::RequestContext;
use crate::endpoint::Endpoint;
use crate::error::Result;

/// A role granted over an address range (domain or network CIDR).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRole {
    pub cidr: String,
    pub role: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default)]
    pub domain_id: Option<i64>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub roles: Vec<UserRole>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatusUpdate {
    /// `ACTIVE` or `INACTIVE`.
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordReset {
    pub email: String,
    /// The code mailed by `email_reset_password_code`.
    pub code: String,
    pub password: String,
}

/// Which roles to remove. An empty `roles` list matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteRolesQuery {
    pub roles: Vec<String>,
    pub network_cidr: Option<String>,
}

pub struct UserService<'a> {
    client: &'a EnfClient,
}

impl<'a> UserService<'a> {
    pub(crate) fn new(client: &'a EnfClient) -> Self {
        Self { client }
    }

    /// The user the current token belongs to.
    pub async fn me(&self, ctx: &RequestContext) -> Result<User> {
        self.client.dispatch_one(ctx, Endpoint::get(xcr_path("/me"))).await
    }

    pub async fn list_users(&self, ctx: &RequestContext) -> Result<Vec<User>> {
        self.client.dispatch_all(ctx, Endpoint::get(xcr_path("/users"))).await
    }

    pub async fn list_users_for_domain(
        &self,
        ctx: &RequestContext,
        domain: &str,
    ) -> Result<Vec<User>> {
        let endpoint = Endpoint::get(xcr_path("/users")).query("domain", domain);
        self.client.dispatch_all(ctx, endpoint).await
    }

    pub async fn list_users_for_network(
        &self,
        ctx: &RequestContext,
        network: &str,
    ) -> Result<Vec<User>> {
        let endpoint = Endpoint::get(xcr_path("/users")).query("network", network);
        self.client.dispatch_all(ctx, endpoint).await
    }

    pub async fn get_user(&self, ctx: &RequestContext, id: i64) -> Result<User> {
        let endpoint = Endpoint::get(xcr_path(&format!("/users/{id}")));
        self.client.dispatch_one(ctx, endpoint).await
    }

    pub async fn update_user_status(
        &self,
        ctx: &RequestContext,
        id: i64,
        update: &UserStatusUpdate,
    ) -> Result<()> {
        let endpoint = Endpoint::put(xcr_path(&format!("/users/{id}/status")), update)?;
        self.client.dispatch_empty(ctx, endpoint).await
    }

    /// Ask the API to mail a password reset code to `email`.
    pub async fn email_reset_password_code(&self, ctx: &RequestContext, email: &str) -> Result<()> {
        let endpoint = Endpoint::get(xcr_path("/users/reset")).query("email", email);
        self.client.dispatch_empty(ctx, endpoint).await
    }

    pub async fn reset_password(&self, ctx: &RequestContext, reset: &PasswordReset) -> Result<()> {
        let endpoint = Endpoint::post(xcr_path("/users/reset"), reset)?;
        self.client.dispatch_empty(ctx, endpoint).await
    }

    pub async fn list_roles(&self, ctx: &RequestContext, user_id: i64) -> Result<Vec<UserRole>> {
        let endpoint = Endpoint::get(roles_path(user_id));
        self.client.dispatch_all(ctx, endpoint).await
    }

    /// Grant `roles` in addition to the user's current roles.
    pub async fn append_roles(
        &self,
        ctx: &RequestContext,
        user_id: i64,
        roles: &[UserRole],
    ) -> Result<Vec<UserRole>> {
        let endpoint = Endpoint::post(roles_path(user_id), roles)?;
        self.client.dispatch_all(ctx, endpoint).await
    }

    pub async fn replace_roles(
        &self,
        ctx: &RequestContext,
        user_id: i64,
        roles: &[UserRole],
    ) -> Result<Vec<UserRole>> {
        let endpoint = Endpoint::put(roles_path(user_id), roles)?;
        self.client.dispatch_all(ctx, endpoint).await
    }

    pub async fn delete_roles(
        &self,
        ctx: &RequestContext,
        user_id: i64,
        query: &DeleteRolesQuery,
    ) -> Result<()> {
        let mut endpoint =
            Endpoint::delete(roles_path(user_id)).query("roles", &query.roles.join(","));
        if let Some(network) = &query.network_cidr {
            endpoint = endpoint.query("network_cidr", network);
        }
        self.client.dispatch_empty(ctx, endpoint).await
    }

    pub async fn delete_all_roles(&self, ctx: &RequestContext, user_id: i64) -> Result<()> {
        let endpoint = Endpoint::delete(roles_path(user_id));
        self.client.dispatch_empty(ctx, endpoint).await
    }
}

fn roles_path(user_id: i64) -> String {
    xcr_path(&format!("/users/{user_id}/roles"))
}
