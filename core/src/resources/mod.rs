//! Typed wrappers over the ENF REST resources.
//!
//! Each service borrows the client (`client.domains()`, `client.dns()`, ...)
//! and turns one method call into one `Endpoint` handed to the dispatcher.
//! Path segments supplied by the caller are inserted verbatim.

mod auth;
mod dns;
mod domain;
mod endpoint;
mod firewall;
mod invite;
mod network;
mod rate_limit;
mod user;

pub use auth::{AuthRequest, AuthService, Credentials};
pub use dns::{
    AaaaValue, CnameValue, DnsRecord, DnsServer, DnsService, DnsZone, DnsZoneNetwork,
    NewDnsRecord, NewDnsServer, NewDnsZone, RecordValue, SrvValue, TxtValue, UpdateDnsZone,
    ZoneNetworks,
};
pub use domain::{Domain, DomainService, NewDomain};
pub use endpoint::{EndpointEvent, EndpointService, NetworkEndpoint};
pub use firewall::{FirewallRule, FirewallRuleRequest, FirewallService};
pub use invite::{AcceptInvite, Invite, InviteService, SendInvite};
pub use network::{Network, NetworkService, NewNetwork, UpdateNetwork};
pub use rate_limit::RateLimits;
pub use user::{
    DeleteRolesQuery, PasswordReset, User, UserRole, UserService, UserStatusUpdate,
};

pub const XCR_API_PATH: &str = "/api/xcr/v3";
pub const FIREWALL_API_PATH: &str = "/api/xfw/v2";
pub const DNS_API_PATH: &str = "/api/xdns/v1";

/// `{}`, for PUTs that carry no data of their own.
pub(crate) fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

pub(crate) fn xcr_path(path: &str) -> String {
    format!("{XCR_API_PATH}{path}")
}

pub(crate) fn firewall_path(path: &str) -> String {
    format!("{FIREWALL_API_PATH}{path}")
}

pub(crate) fn dns_path(path: &str) -> String {
    format!("{DNS_API_PATH}{path}")
}
