use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{empty_object, xcr_path, UserRole};
use crate::client::EnfClient;
use crate::context::RequestContext;
use crate::endpoint::Endpoint;
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invite {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub domain_id: Option<i64>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub role: Option<UserRole>,
    #[serde(default)]
    pub invite_token: Option<String>,
    #[serde(default)]
    pub invited_by: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub inserted_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub version: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendInvite {
    pub email: String,
    pub full_name: String,
    pub domain: String,
    pub roles: Vec<UserRole>,
}

/// Redeem an invite: the `code` from the invite mail plus the new account's
/// name and password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptInvite {
    pub email: String,
    pub code: String,
    pub name: String,
    pub password: String,
}

pub struct InviteService<'a> {
    client: &'a EnfClient,
}

impl<'a> InviteService<'a> {
    pub(crate) fn new(client: &'a EnfClient) -> Self {
        Self { client }
    }

    pub async fn list_invites(&self, ctx: &RequestContext) -> Result<Vec<Invite>> {
        self.client.dispatch_all(ctx, Endpoint::get(xcr_path("/invites"))).await
    }

    pub async fn send_invite(&self, ctx: &RequestContext, invite: &SendInvite) -> Result<Invite> {
        let endpoint = Endpoint::post(xcr_path("/invites"), invite)?;
        self.client.dispatch_one(ctx, endpoint).await
    }

    pub async fn accept_invite(&self, ctx: &RequestContext, accept: &AcceptInvite) -> Result<()> {
        let endpoint = Endpoint::post(xcr_path("/invites"), accept)?;
        self.client.dispatch_empty(ctx, endpoint).await
    }

    pub async fn resend_invite(&self, ctx: &RequestContext, id: i64) -> Result<()> {
        let endpoint = Endpoint::put(xcr_path(&format!("/invites/{id}")), &empty_object())?;
        self.client.dispatch_empty(ctx, endpoint).await
    }

    pub async fn delete_invite(&self, ctx: &RequestContext, id: i64) -> Result<()> {
        let endpoint = Endpoint::delete(xcr_path(&format!("/invites/{id}")));
        self.client.dispatch_empty(ctx, endpoint).await
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::http::HttpMethod;
    use crate::test_support::{client_with, ScriptedTransport};

    #[tokio::test]
    async fn send_and_accept_share_a_path() {
        let transport = ScriptedTransport::default();
        transport.respond(
            201,
            r#"{"data":[{"id":3,"email":"new@acme.com","name":"New User","domain":"fd00:8f80:8000::/48","role":{"cidr":"fd00:8f80:8000::/48","role":"DOMAIN_USER"},"inserted_date":"2021-01-01T00:00:00Z"}],"page":{}}"#,
        );
        transport.respond(200, "");
        let client = client_with(&transport);
        let ctx = RequestContext::background();

        let invite = client
            .invites()
            .send_invite(
                &ctx,
                &SendInvite {
                    email: "new@acme.com".to_string(),
                    full_name: "New User".to_string(),
                    domain: "fd00:8f80:8000::/48".to_string(),
                    roles: vec![UserRole {
                        cidr: "fd00:8f80:8000::/48".to_string(),
                        role: "DOMAIN_USER".to_string(),
                    }],
                },
            )
            .await
            .unwrap();
        assert_eq!(invite.id, Some(3));
        assert_eq!(invite.role.unwrap().role, "DOMAIN_USER");

        client
            .invites()
            .accept_invite(
                &ctx,
                &AcceptInvite {
                    email: "new@acme.com".to_string(),
                    code: "abc123".to_string(),
                    name: "New User".to_string(),
                    password: "Secret1!".to_string(),
                },
            )
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].url, requests[1].url);
        assert!(requests[1].body.as_deref().unwrap().contains(r#""code":"abc123""#));
    }

    #[tokio::test]
    async fn resend_puts_empty_object() {
        let transport = ScriptedTransport::default();
        transport.respond(200, "{}");
        let client = client_with(&transport);

        client
            .invites()
            .resend_invite(&RequestContext::background(), 3)
            .await
            .unwrap();

        let request = transport.last_request();
        assert_eq!(request.method, HttpMethod::Put);
        assert_eq!(request.url, "http://localhost/api/xcr/v3/invites/3");
        assert_eq!(request.body.as_deref(), Some("{}"));
    }
}
