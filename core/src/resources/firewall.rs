use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::firewall_path;
use crate::client::EnfClient;
use crate::context::RequestContext;
use crate::endpoint::Endpoint;
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallRuleRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    /// `TCP`, `UDP`, `ICMP6` or `ANY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    /// `INGRESS` or `EGRESS`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_port: Option<u16>,
    /// `ACCEPT` or `DROP`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_family: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallRule {
    pub id: Uuid,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(flatten)]
    pub rule: FirewallRuleRequest,
}

pub struct FirewallService<'a> {
    client: &'a EnfClient,
}

impl<'a> FirewallService<'a> {
    pub(crate) fn new(client: &'a EnfClient) -> Self {
        Self { client }
    }

    pub async fn add_rule(
        &self,
        ctx: &RequestContext,
        network: &str,
        rule: &FirewallRuleRequest,
    ) -> Result<FirewallRule> {
        let endpoint = Endpoint::post(firewall_path(&format!("/{network}/rule")), rule)?;
        self.client.dispatch_one(ctx, endpoint).await
    }

    pub async fn list_rules(&self, ctx: &RequestContext, network: &str) -> Result<Vec<FirewallRule>> {
        let endpoint = Endpoint::get(firewall_path(&format!("/{network}/rule")));
        self.client.dispatch_all(ctx, endpoint).await
    }

    pub async fn get_rule(
        &self,
        ctx: &RequestContext,
        network: &str,
        id: Uuid,
    ) -> Result<FirewallRule> {
        let endpoint = Endpoint::get(firewall_path(&format!("/{network}/rule/{id}")));
        self.client.dispatch_one(ctx, endpoint).await
    }

    pub async fn delete_rule(&self, ctx: &RequestContext, network: &str, id: Uuid) -> Result<()> {
        let endpoint = Endpoint::delete(firewall_path(&format!("/{network}/rule/{id}")));
        self.client.dispatch_empty(ctx, endpoint).await
    }
}
