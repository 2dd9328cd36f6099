use serde::{Deserialize, Serialize};

use super::{empty_object, rate_limit, xcr_path, RateLimits};
use crate::client::EnfClient;
use crate::context::RequestContext;
use crate::endpoint::Endpoint;
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub cidr: Option<String>,
    #[serde(default)]
    pub allocated: Option<String>,
    #[serde(default, rename = "type")]
    pub domain_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub last_network: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDomain {
    pub name: String,
    #[serde(rename = "type")]
    pub domain_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_email: Option<String>,
}

pub struct DomainService<'a> {
    client: &'a EnfClient,
}

impl<'a> DomainService<'a> {
    pub(crate) fn new(client: &'a EnfClient) -> Self {
        Self { client }
    }

    pub async fn list_domains(&self, ctx: &RequestContext) -> Result<Vec<Domain>> {
        let endpoint = Endpoint::get(xcr_path("/domains"));
        self.client.dispatch_all(ctx, endpoint).await
    }

    /// `domain` is the domain's CIDR, e.g. `fd00:8f80:8000::/48`.
    pub async fn get_domain(&self, ctx: &RequestContext, domain: &str) -> Result<Domain> {
        let endpoint = Endpoint::get(xcr_path(&format!("/domains/{domain}")));
        self.client.dispatch_one(ctx, endpoint).await
    }

    pub async fn create_domain(&self, ctx: &RequestContext, request: &NewDomain) -> Result<Domain> {
        let endpoint = Endpoint::post(xcr_path("/domains"), request)?;
        self.client.dispatch_one(ctx, endpoint).await
    }

    pub async fn activate_domain(&self, ctx: &RequestContext, domain: &str) -> Result<()> {
        let path = xcr_path(&format!("/domains/{domain}/status"));
        let endpoint = Endpoint::put(path, &empty_object())?;
        self.client.dispatch_empty(ctx, endpoint).await
    }

    pub async fn deactivate_domain(&self, ctx: &RequestContext, domain: &str) -> Result<()> {
        let endpoint = Endpoint::delete(xcr_path(&format!("/domains/{domain}/status")));
        self.client.dispatch_empty(ctx, endpoint).await
    }

    /// Limits applied to new endpoints in the domain.
    pub async fn get_default_endpoint_rate_limits(
        &self,
        ctx: &RequestContext,
        domain: &str,
    ) -> Result<RateLimits> {
        self.get_rate_limits(ctx, domain, "default").await
    }

    pub async fn set_default_endpoint_rate_limits(
        &self,
        ctx: &RequestContext,
        domain: &str,
        limits: &RateLimits,
    ) -> Result<RateLimits> {
        self.set_rate_limits(ctx, domain, "default", limits).await
    }

    /// Ceiling for any endpoint rate limit in the domain.
    pub async fn get_max_endpoint_rate_limits(
        &self,
        ctx: &RequestContext,
        domain: &str,
    ) -> Result<RateLimits> {
        self.get_rate_limits(ctx, domain, "max").await
    }

    pub async fn set_max_endpoint_rate_limits(
        &self,
        ctx: &RequestContext,
        domain: &str,
        limits: &RateLimits,
    ) -> Result<RateLimits> {
        self.set_rate_limits(ctx, domain, "max", limits).await
    }

    async fn get_rate_limits(
        &self,
        ctx: &RequestContext,
        domain: &str,
        kind: &str,
    ) -> Result<RateLimits> {
        rate_limit::fetch(self.client, ctx, rate_limit_path(domain, kind)).await
    }

    async fn set_rate_limits(
        &self,
        ctx: &RequestContext,
        domain: &str,
        kind: &str,
        limits: &RateLimits,
    ) -> Result<RateLimits> {
        rate_limit::store(self.client, ctx, rate_limit_path(domain, kind), limits).await
    }
}

fn rate_limit_path(domain: &str, kind: &str) -> String {
    xcr_path(&format!("/domains/{domain}/ep_rate_limits/{kind}"))
}
