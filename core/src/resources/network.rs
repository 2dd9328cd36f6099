use serde::{Deserialize, Serialize};

use super::{rate_limit, xcr_path, RateLimits};
use crate::client::EnfClient;
use crate::context::RequestContext;
use crate::endpoint::Endpoint;
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub domain_id: Option<i64>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub cidr: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNetwork {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateNetwork {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

pub struct NetworkService<'a> {
    client: &'a EnfClient,
}

impl<'a> NetworkService<'a> {
    pub(crate) fn new(client: &'a EnfClient) -> Self {
        Self { client }
    }

    /// Networks in `domain` (a domain CIDR).
    pub async fn list_networks(&self, ctx: &RequestContext, domain: &str) -> Result<Vec<Network>> {
        let endpoint = Endpoint::get(xcr_path(&format!("/domains/{domain}/nws")));
        self.client.dispatch_all(ctx, endpoint).await
    }

    pub async fn create_network(
        &self,
        ctx: &RequestContext,
        domain: &str,
        request: &NewNetwork,
    ) -> Result<Network> {
        let endpoint = Endpoint::post(xcr_path(&format!("/domains/{domain}/nws")), request)?;
        self.client.dispatch_one(ctx, endpoint).await
    }

    /// `network` is the network's CIDR.
    pub async fn get_network(&self, ctx: &RequestContext, network: &str) -> Result<Network> {
        let endpoint = Endpoint::get(xcr_path(&format!("/nws/{network}")));
        self.client.dispatch_one(ctx, endpoint).await
    }

    pub async fn update_network(
        &self,
        ctx: &RequestContext,
        network: &str,
        request: &UpdateNetwork,
    ) -> Result<Network> {
        let endpoint = Endpoint::put(xcr_path(&format!("/nws/{network}")), request)?;
        self.client.dispatch_one(ctx, endpoint).await
    }

    pub async fn get_default_endpoint_rate_limits(
        &self,
        ctx: &RequestContext,
        network: &str,
    ) -> Result<RateLimits> {
        rate_limit::fetch(self.client, ctx, rate_limit_path(network, "default")).await
    }

    pub async fn set_default_endpoint_rate_limits(
        &self,
        ctx: &RequestContext,
        network: &str,
        limits: &RateLimits,
    ) -> Result<RateLimits> {
        rate_limit::store(self.client, ctx, rate_limit_path(network, "default"), limits).await
    }

    pub async fn get_max_endpoint_rate_limits(
        &self,
        ctx: &RequestContext,
        network: &str,
    ) -> Result<RateLimits> {
        rate_limit::fetch(self.client, ctx, rate_limit_path(network, "max")).await
    }

    pub async fn set_max_endpoint_rate_limits(
        &self,
        ctx: &RequestContext,
        network: &str,
        limits: &RateLimits,
    ) -> Result<RateLimits> {
        rate_limit::store(self.client, ctx, rate_limit_path(network, "max"), limits).await
    }
}

fn rate_limit_path(network: &str, kind: &str) -> String {
    xcr_path(&format!("/nws/{network}/ep_rate_limits/{kind}"))
}
