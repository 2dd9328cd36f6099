use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{rate_limit, xcr_path, RateLimits};
use crate::client::EnfClient;
use crate::context::RequestContext;
use crate::endpoint::Endpoint;
use crate::error::Result;

/// A device connected to an ENF network, keyed by its IPv6 address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkEndpoint {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub ipv6: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub domain_id: Option<i64>,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub network_id: Option<i64>,
    #[serde(default, rename = "endpoint_state")]
    pub state: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub last_event: Option<EndpointEvent>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointEvent {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub ipv6: Option<String>,
    #[serde(default, rename = "type")]
    pub event_type: Option<String>,
    #[serde(default)]
    pub asn_org: Option<String>,
    #[serde(default)]
    pub instance_id: Option<i64>,
    #[serde(default)]
    pub pop_id: Option<i64>,
    #[serde(default)]
    pub remote_ip: Option<String>,
    #[serde(default)]
    pub remote_port: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

pub struct EndpointService<'a> {
    client: &'a EnfClient,
}

impl<'a> EndpointService<'a> {
    pub(crate) fn new(client: &'a EnfClient) -> Self {
        Self { client }
    }

    pub async fn list_endpoints(
        &self,
        ctx: &RequestContext,
        network: &str,
    ) -> Result<Vec<NetworkEndpoint>> {
        let endpoint = Endpoint::get(xcr_path(&format!("/nws/{network}/cxns")));
        self.client.dispatch_all(ctx, endpoint).await
    }

    pub async fn get_endpoint(&self, ctx: &RequestContext, ipv6: &str) -> Result<NetworkEndpoint> {
        let endpoint = Endpoint::get(xcr_path(&format!("/cxns/{ipv6}")));
        self.client.dispatch_one(ctx, endpoint).await
    }

    pub async fn get_current_rate_limits(
        &self,
        ctx: &RequestContext,
        ipv6: &str,
    ) -> Result<RateLimits> {
        rate_limit::fetch(self.client, ctx, rate_limit_path(ipv6, "current")).await
    }

    pub async fn set_current_rate_limits(
        &self,
        ctx: &RequestContext,
        ipv6: &str,
        limits: &RateLimits,
    ) -> Result<RateLimits> {
        rate_limit::store(self.client, ctx, rate_limit_path(ipv6, "current"), limits).await
    }

    pub async fn get_max_rate_limits(&self, ctx: &RequestContext, ipv6: &str) -> Result<RateLimits> {
        rate_limit::fetch(self.client, ctx, rate_limit_path(ipv6, "max")).await
    }

    pub async fn set_max_rate_limits(
        &self,
        ctx: &RequestContext,
        ipv6: &str,
        limits: &RateLimits,
    ) -> Result<RateLimits> {
        rate_limit::store(self.client, ctx, rate_limit_path(ipv6, "max"), limits).await
    }
}

fn rate_limit_path(ipv6: &str, kind: &str) -> String {
    xcr_path(&format!("/cxns/{ipv6}/ep_rate_limits/{kind}"))
}
