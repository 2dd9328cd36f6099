use serde::{Deserialize, Serialize};

use crate::client::EnfClient;
use crate::context::RequestContext;
use crate::endpoint::Endpoint;
use crate::error::Result;

/// Endpoint rate limits, shared by domains, networks and endpoints.
///
/// Unset fields are left out of request bodies, so a partial value only
/// updates what it names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packets_per_second: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packets_burst_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes_per_second: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes_burst_size: Option<u64>,
    /// Take the value from the parent scope instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherit: Option<bool>,
}

pub(super) async fn fetch(
    client: &EnfClient,
    ctx: &RequestContext,
    path: String,
) -> Result<RateLimits> {
    client.dispatch_one(ctx, Endpoint::get(path)).await
}

pub(super) async fn store(
    client: &EnfClient,
    ctx: &RequestContext,
    path: String,
    limits: &RateLimits,
) -> Result<RateLimits> {
    client.dispatch_one(ctx, Endpoint::put(path, limits)?).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_fields_are_omitted() {
        let limits = RateLimits {
            packets_per_second: Some(10),
            inherit: Some(false),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_string(&limits).unwrap(),
            r#"{"packets_per_second":10,"inherit":false}"#
        );
    }

    #[test]
    fn missing_fields_deserialize_as_none() {
        let limits: RateLimits = serde_json::from_str(r#"{"bytes_per_second":5}"#).unwrap();
        assert_eq!(limits.bytes_per_second, Some(5));
        assert_eq!(limits.inherit, None);
    }
}
