//! Private DNS: zones, the networks that see them, DNS servers and records.
//!
//! Zones belong to an ENF domain and are served to the networks attached to
//! them. Records live in a zone and carry a typed value whose shape depends
//! on the record type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::dns_path;
use crate::client::EnfClient;
use crate::context::RequestContext;
use crate::endpoint::Endpoint;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsZone {
    pub id: Uuid,
    #[serde(default)]
    pub zone_domain_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "enf_domain")]
    pub domain: Option<String>,
    #[serde(default)]
    pub privileged: bool,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDnsZone {
    pub zone_domain_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "enf_domain", skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, rename = "enf_network", skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDnsZone {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Body for adding networks to, or replacing the networks of, a zone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneNetworks {
    pub networks: Vec<String>,
}

/// One network attached to a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsZoneNetwork {
    #[serde(default, rename = "rowid")]
    pub id: Option<i64>,
    pub zone_id: Uuid,
    #[serde(default, rename = "enf_domain")]
    pub domain: Option<String>,
    #[serde(default, rename = "enf_network")]
    pub network: Option<String>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDnsServer {
    pub ipv6: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsServer {
    pub id: Uuid,
    pub ipv6: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "enf_domain")]
    pub domain: Option<String>,
    #[serde(default, rename = "enf_network")]
    pub network: Option<String>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AaaaValue {
    pub ipv6: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CnameValue {
    pub dname: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxtValue {
    pub txt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrvValue {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    pub target: String,
}

/// The value of a DNS record, matched by shape. Anything unrecognized is
/// kept as raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordValue {
    Srv(SrvValue),
    Aaaa(AaaaValue),
    Cname(CnameValue),
    Txt(TxtValue),
    Other(serde_json::Value),
}

impl RecordValue {
    /// The record type this value belongs to, if it is one of the typed shapes.
    pub fn record_type(&self) -> Option<&'static str> {
        match self {
            RecordValue::Srv(_) => Some(NewDnsRecord::SRV),
            RecordValue::Aaaa(_) => Some(NewDnsRecord::AAAA),
            RecordValue::Cname(_) => Some(NewDnsRecord::CNAME),
            RecordValue::Txt(_) => Some(NewDnsRecord::TXT),
            RecordValue::Other(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDnsRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    #[serde(rename = "type")]
    pub record_type: String,
    pub value: RecordValue,
}

impl NewDnsRecord {
    pub const AAAA: &'static str = "AAAA";
    pub const CNAME: &'static str = "CNAME";
    pub const SRV: &'static str = "SRV";
    pub const TXT: &'static str = "TXT";

    /// A record whose type follows from `value`. Use the struct literal for
    /// types without a typed value.
    pub fn new(name: impl Into<String>, ttl: Option<u32>, value: RecordValue) -> Self {
        let record_type = value.record_type().unwrap_or_default().to_string();
        Self {
            name: name.into(),
            ttl,
            record_type,
            value,
        }
    }

    pub fn aaaa(name: impl Into<String>, ttl: Option<u32>, ipv6: impl Into<String>) -> Self {
        Self::new(name, ttl, RecordValue::Aaaa(AaaaValue { ipv6: ipv6.into() }))
    }

    pub fn cname(name: impl Into<String>, ttl: Option<u32>, dname: impl Into<String>) -> Self {
        Self::new(name, ttl, RecordValue::Cname(CnameValue { dname: dname.into() }))
    }

    pub fn txt(name: impl Into<String>, ttl: Option<u32>, txt: impl Into<String>) -> Self {
        Self::new(name, ttl, RecordValue::Txt(TxtValue { txt: txt.into() }))
    }

    pub fn srv(name: impl Into<String>, ttl: Option<u32>, value: SrvValue) -> Self {
        Self::new(name, ttl, RecordValue::Srv(value))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsRecord {
    pub id: Uuid,
    #[serde(default)]
    pub zone_id: Option<Uuid>,
    #[serde(default, rename = "enf_domain")]
    pub domain: Option<String>,
    #[serde(default)]
    pub privileged: bool,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub record: NewDnsRecord,
}

pub struct DnsService<'a> {
    client: &'a EnfClient,
}

impl<'a> DnsService<'a> {
    pub(crate) fn new(client: &'a EnfClient) -> Self {
        Self { client }
    }

    /// All visible zones, or only those of `domain` when given.
    pub async fn list_zones(
        &self,
        ctx: &RequestContext,
        domain: Option<&str>,
    ) -> Result<Vec<DnsZone>> {
        let mut endpoint = Endpoint::get(dns_path("/zones"));
        if let Some(domain) = domain {
            endpoint = endpoint.query("enf_domain", domain);
        }
        self.client.dispatch_all(ctx, endpoint).await
    }

    pub async fn create_zone(&self, ctx: &RequestContext, zone: &NewDnsZone) -> Result<DnsZone> {
        let endpoint = Endpoint::post(dns_path("/zones"), zone)?;
        self.client.dispatch_one(ctx, endpoint).await
    }

    pub async fn get_zone(&self, ctx: &RequestContext, zone_id: Uuid) -> Result<DnsZone> {
        let endpoint = Endpoint::get(dns_path(&format!("/zones/{zone_id}")));
        self.client.dispatch_one(ctx, endpoint).await
    }

    pub async fn update_zone(
        &self,
        ctx: &RequestContext,
        zone_id: Uuid,
        update: &UpdateDnsZone,
    ) -> Result<DnsZone> {
        let endpoint = Endpoint::put(dns_path(&format!("/zones/{zone_id}")), update)?;
        self.client.dispatch_one(ctx, endpoint).await
    }

    pub async fn delete_zone(&self, ctx: &RequestContext, zone_id: Uuid) -> Result<()> {
        let endpoint = Endpoint::delete(dns_path(&format!("/zones/{zone_id}")));
        self.client.dispatch_empty(ctx, endpoint).await
    }

    pub async fn add_networks_to_zone(
        &self,
        ctx: &RequestContext,
        zone_id: Uuid,
        networks: &ZoneNetworks,
    ) -> Result<Vec<DnsZoneNetwork>> {
        let endpoint = Endpoint::post(dns_path(&format!("/zones/{zone_id}/networks")), networks)?;
        self.client.dispatch_all(ctx, endpoint).await
    }

    /// Make `networks` the complete set of networks served by the zone.
    pub async fn replace_networks_in_zone(
        &self,
        ctx: &RequestContext,
        zone_id: Uuid,
        networks: &ZoneNetworks,
    ) -> Result<Vec<DnsZoneNetwork>> {
        let endpoint = Endpoint::put(dns_path(&format!("/zones/{zone_id}/networks")), networks)?;
        self.client.dispatch_all(ctx, endpoint).await
    }

    pub async fn list_networks_in_zone(
        &self,
        ctx: &RequestContext,
        zone_id: Uuid,
    ) -> Result<Vec<DnsZoneNetwork>> {
        let endpoint = Endpoint::get(dns_path(&format!("/zones/{zone_id}/networks")));
        self.client.dispatch_all(ctx, endpoint).await
    }

    pub async fn delete_networks_from_zone(
        &self,
        ctx: &RequestContext,
        zone_id: Uuid,
        networks: &[&str],
    ) -> Result<()> {
        let endpoint = Endpoint::delete(dns_path(&format!("/zones/{zone_id}/networks")))
            .query("delete", &networks.join(","));
        self.client.dispatch_empty(ctx, endpoint).await
    }

    pub async fn list_zones_in_network(
        &self,
        ctx: &RequestContext,
        network: &str,
    ) -> Result<Vec<DnsZone>> {
        let endpoint = Endpoint::get(dns_path(&format!("/networks/{network}/zones")));
        self.client.dispatch_all(ctx, endpoint).await
    }

    pub async fn provision_server(
        &self,
        ctx: &RequestContext,
        network: &str,
        server: &NewDnsServer,
    ) -> Result<DnsServer> {
        let endpoint = Endpoint::post(dns_path(&format!("/networks/{network}/servers")), server)?;
        self.client.dispatch_one(ctx, endpoint).await
    }

    pub async fn get_server(
        &self,
        ctx: &RequestContext,
        network: &str,
        ipv6: &str,
    ) -> Result<DnsServer> {
        let endpoint = Endpoint::get(dns_path(&format!("/networks/{network}/servers/{ipv6}")));
        self.client.dispatch_one(ctx, endpoint).await
    }

    pub async fn list_servers(&self, ctx: &RequestContext, network: &str) -> Result<Vec<DnsServer>> {
        let endpoint = Endpoint::get(dns_path(&format!("/networks/{network}/servers")));
        self.client.dispatch_all(ctx, endpoint).await
    }

    pub async fn delete_server(&self, ctx: &RequestContext, network: &str, ipv6: &str) -> Result<()> {
        let endpoint = Endpoint::delete(dns_path(&format!("/networks/{network}/servers/{ipv6}")));
        self.client.dispatch_empty(ctx, endpoint).await
    }

    pub async fn list_records(&self, ctx: &RequestContext, zone_id: Uuid) -> Result<Vec<DnsRecord>> {
        let endpoint = Endpoint::get(dns_path(&format!("/zones/{zone_id}/records")));
        self.client.dispatch_all(ctx, endpoint).await
    }

    pub async fn get_record(&self, ctx: &RequestContext, id: Uuid) -> Result<DnsRecord> {
        let endpoint = Endpoint::get(dns_path(&format!("/records/{id}")));
        self.client.dispatch_one(ctx, endpoint).await
    }

    pub async fn create_record(
        &self,
        ctx: &RequestContext,
        zone_id: Uuid,
        record: &NewDnsRecord,
    ) -> Result<DnsRecord> {
        let endpoint = Endpoint::post(dns_path(&format!("/zones/{zone_id}/records")), record)?;
        self.client.dispatch_one(ctx, endpoint).await
    }

    pub async fn delete_record(&self, ctx: &RequestContext, id: Uuid) -> Result<()> {
        let endpoint = Endpoint::delete(dns_path(&format!("/records/{id}")));
        self.client.dispatch_empty(ctx, endpoint).await
    }

    /// Resolve `name` as seen from `network`.
    pub async fn query(
        &self,
        ctx: &RequestContext,
        network: &str,
        record_type: &str,
        name: &str,
    ) -> Result<Vec<DnsRecord>> {
        let path = format!("/networks/{network}/query/{record_type}/{name}");
        self.client.dispatch_all(ctx, Endpoint::get(dns_path(&path))).await
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::http::HttpMethod;
    use crate::test_support::{client_with, ScriptedTransport};

    #[test]
    fn record_values_are_matched_by_shape() {
        let cases = [
            (json!({"ipv6": "fd00::1"}), Some("AAAA")),
            (json!({"dname": "example.com"}), Some("CNAME")),
            (json!({"txt": "v=spf1"}), Some("TXT")),
            (
                json!({"priority": 1, "weight": 2, "port": 443, "target": "svc.local"}),
                Some("SRV"),
            ),
            (json!({"mx": "mail.local"}), None),
        ];
        for (raw, expected) in cases {
            let value: RecordValue = serde_json::from_value(raw.clone()).unwrap();
            assert_eq!(value.record_type(), expected, "{raw}");
            assert_eq!(serde_json::to_value(&value).unwrap(), raw);
        }
    }

    #[test]
    fn constructors_set_the_record_type() {
        let record = NewDnsRecord::aaaa("host.acme.local", Some(300), "fd00::1");
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"name": "host.acme.local", "ttl": 300, "type": "AAAA", "value": {"ipv6": "fd00::1"}})
        );
        assert_eq!(NewDnsRecord::cname("a", None, "b").record_type, "CNAME");
        assert_eq!(NewDnsRecord::txt("a", None, "b").record_type, "TXT");
    }

    #[tokio::test]
    async fn list_zones_filters_by_domain_in_query() {
        let transport = ScriptedTransport::default();
        transport.respond(200, r#"{"data":[],"page":{}}"#);
        transport.respond(200, r#"{"data":[],"page":{}}"#);
        let client = client_with(&transport);
        let ctx = RequestContext::background();

        client.dns().list_zones(&ctx, None).await.unwrap();
        client
            .dns()
            .list_zones(&ctx, Some("fd00:8f80:8000::/48"))
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].url, "http://localhost/api/xdns/v1/zones");
        assert_eq!(
            requests[1].url,
            "http://localhost/api/xdns/v1/zones?enf_domain=fd00%3A8f80%3A8000%3A%3A%2F48"
        );
    }

    #[tokio::test]
    async fn create_record_decodes_flattened_record() {
        let zone_id = Uuid::new_v4();
        let record_id = Uuid::new_v4();
        let transport = ScriptedTransport::default();
        transport.respond(
            201,
            &json!({
                "data": [{
                    "id": record_id,
                    "zone_id": zone_id,
                    "enf_domain": "fd00:8f80:8000::/48",
                    "privileged": false,
                    "created": "2020-01-02T03:04:05Z",
                    "name": "svc.acme.local",
                    "ttl": 60,
                    "type": "SRV",
                    "value": {"priority": 1, "weight": 5, "port": 8443, "target": "host.acme.local"}
                }],
                "page": {}
            })
            .to_string(),
        );
        let client = client_with(&transport);

        let srv = SrvValue {
            priority: 1,
            weight: 5,
            port: 8443,
            target: "host.acme.local".to_string(),
        };
        let request = NewDnsRecord::srv("svc.acme.local", Some(60), srv.clone());
        let record = client
            .dns()
            .create_record(&RequestContext::background(), zone_id, &request)
            .await
            .unwrap();

        assert_eq!(record.id, record_id);
        assert_eq!(record.zone_id, Some(zone_id));
        assert_eq!(record.record, request);
        assert_eq!(record.record.value, RecordValue::Srv(srv));
        assert_eq!(
            transport.last_request().url,
            format!("http://localhost/api/xdns/v1/zones/{zone_id}/records")
        );
    }

    #[tokio::test]
    async fn delete_networks_from_zone_joins_cidrs() {
        let zone_id = Uuid::nil();
        let transport = ScriptedTransport::default();
        transport.respond(200, "");
        let client = client_with(&transport);

        client
            .dns()
            .delete_networks_from_zone(
                &RequestContext::background(),
                zone_id,
                &["fd00::/64", "fd01::/64"],
            )
            .await
            .unwrap();

        let request = transport.last_request();
        assert_eq!(request.method, HttpMethod::Delete);
        assert_eq!(
            request.url,
            format!(
                "http://localhost/api/xdns/v1/zones/{zone_id}/networks?delete=fd00%3A%3A%2F64%2Cfd01%3A%3A%2F64"
            )
        );
    }

    #[tokio::test]
    async fn query_builds_type_and_name_path() {
        let transport = ScriptedTransport::default();
        transport.respond(200, r#"{"data":[],"page":{}}"#);
        let client = client_with(&transport);

        let records = client
            .dns()
            .query(
                &RequestContext::background(),
                "fd00:8f80:8000:1::/64",
                NewDnsRecord::AAAA,
                "host.acme.local",
            )
            .await
            .unwrap();
        assert!(records.is_empty());
        assert_eq!(
            transport.last_request().url,
            "http://localhost/api/xdns/v1/networks/fd00:8f80:8000:1::/64/query/AAAA/host.acme.local"
        );
    }

    #[tokio::test]
    async fn unknown_zone_surfaces_structured_not_found() {
        let transport = ScriptedTransport::default();
        transport.respond(
            404,
            r#"{"error":{"code":"not_found","text":"zone does not exist"}}"#,
        );
        let client = client_with(&transport);

        let err = client
            .dns()
            .get_zone(&RequestContext::background(), Uuid::nil())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "NOT_FOUND: zone does not exist");
        assert_eq!(err.status(), Some(404));
    }
}
