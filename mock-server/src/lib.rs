//! In-memory stand-in for the ENF REST API, used by the client's
//! integration tests.
//!
//! Responses follow the API's conventions: results wrapped in
//! `{"data": [...], "page": {}}`, failures as `{"error": {"code", "text"}}`
//! (or `{"xiam_error": {"reason"}}` for rejected tokens), and a bare 404
//! for unknown routes. Domain and network identifiers are CIDRs, so their
//! routes capture the rest of the path and split it by hand.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{info, warn};
use uuid::Uuid;

pub const USERNAME: &str = "user";
pub const PASSWORD: &str = "pass";
pub const USER_ID: i64 = 1;

const XCR: &str = "/api/xcr/v3";
const XFW: &str = "/api/xfw/v2";
const XDNS: &str = "/api/xdns/v1";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub token: String,
    pub user_id: i64,
}

#[derive(Deserialize)]
pub struct AuthRequest {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Domain {
    pub id: i64,
    pub cidr: String,
    pub name: String,
    #[serde(rename = "type")]
    pub domain_type: String,
    pub status: String,
}

#[derive(Deserialize)]
pub struct CreateDomain {
    pub name: String,
    #[serde(rename = "type")]
    pub domain_type: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Network {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub domain: String,
    pub cidr: String,
    pub status: String,
}

#[derive(Deserialize)]
pub struct CreateNetwork {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateNetwork {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RateLimits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packets_per_second: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packets_burst_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes_per_second: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes_burst_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherit: Option<bool>,
}

impl RateLimits {
    fn max() -> Self {
        Self {
            packets_per_second: Some(1_000),
            packets_burst_size: Some(2_000),
            bytes_per_second: Some(1_000_000),
            bytes_burst_size: Some(2_000_000),
            inherit: Some(false),
        }
    }

    fn default_limits() -> Self {
        Self {
            packets_per_second: Some(100),
            packets_burst_size: Some(200),
            bytes_per_second: Some(100_000),
            bytes_burst_size: Some(200_000),
            inherit: Some(true),
        }
    }

    /// Every limit set on both sides is no higher than `max`.
    pub fn within(&self, max: &RateLimits) -> bool {
        fn ok(value: Option<u64>, max: Option<u64>) -> bool {
            match (value, max) {
                (Some(value), Some(max)) => value <= max,
                _ => true,
            }
        }
        ok(self.packets_per_second, max.packets_per_second)
            && ok(self.packets_burst_size, max.packets_burst_size)
            && ok(self.bytes_per_second, max.bytes_per_second)
            && ok(self.bytes_burst_size, max.bytes_burst_size)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FirewallRule {
    pub id: Uuid,
    pub network: String,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Zone {
    pub id: Uuid,
    pub zone_domain_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub enf_domain: Option<String>,
    pub privileged: bool,
}

#[derive(Deserialize)]
pub struct CreateZone {
    pub zone_domain_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub enf_domain: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateZone {
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct ZoneFilter {
    pub enf_domain: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Scope {
    Domain,
    Network,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum LimitKind {
    Default,
    Max,
}

impl LimitKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "default" => Some(LimitKind::Default),
            "max" => Some(LimitKind::Max),
            _ => None,
        }
    }
}

#[derive(Default)]
pub struct Store {
    tokens: HashSet<String>,
    domains: BTreeMap<String, Domain>,
    networks: BTreeMap<String, Network>,
    rate_limits: HashMap<(Scope, String, LimitKind), RateLimits>,
    rules: BTreeMap<Uuid, FirewallRule>,
    zones: BTreeMap<Uuid, Zone>,
    next_id: i64,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn limits(&self, scope: Scope, cidr: &str, kind: LimitKind) -> RateLimits {
        self.rate_limits
            .get(&(scope, cidr.to_string(), kind))
            .cloned()
            .unwrap_or_else(|| match kind {
                LimitKind::Default => RateLimits::default_limits(),
                LimitKind::Max => RateLimits::max(),
            })
    }
}

pub type Db = Arc<RwLock<Store>>;

/// The API's `{"error": {...}}` failure body.
#[derive(Debug)]
pub struct ApiFailure {
    status: StatusCode,
    code: &'static str,
    text: String,
}

impl ApiFailure {
    fn new(status: StatusCode, code: &'static str, text: impl Into<String>) -> Self {
        Self {
            status,
            code,
            text: text.into(),
        }
    }

    fn not_found(text: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", text)
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let body = json!({"error": {"code": self.code, "text": self.text}});
        (self.status, Json(body)).into_response()
    }
}

type ApiResult = Result<Response, ApiFailure>;

fn data<T: Serialize>(status: StatusCode, items: Vec<T>) -> Response {
    (status, Json(json!({"data": items, "page": {}}))).into_response()
}

fn ok<T: Serialize>(item: T) -> ApiResult {
    Ok(data(StatusCode::OK, vec![item]))
}

fn created<T: Serialize>(item: T) -> ApiResult {
    Ok(data(StatusCode::CREATED, vec![item]))
}

fn empty() -> ApiResult {
    Ok(StatusCode::OK.into_response())
}

/// Unknown route: 404 with no body.
async fn no_route() -> Response {
    StatusCode::NOT_FOUND.into_response()
}

fn parse<T: serde::de::DeserializeOwned>(body: Value) -> Result<T, ApiFailure> {
    serde_json::from_value(body)
        .map_err(|err| ApiFailure::new(StatusCode::BAD_REQUEST, "validation_error", err.to_string()))
}

pub fn app() -> Router {
    app_with_state(Db::default())
}

pub fn app_with_state(db: Db) -> Router {
    let protected = Router::new()
        .route(&format!("{XCR}/me"), get(me))
        .route(&format!("{XCR}/domains"), get(list_domains).post(create_domain))
        .route(
            &format!("{XCR}/domains/{{*rest}}"),
            get(domain_get).put(domain_put).post(domain_post).delete(domain_delete),
        )
        .route(&format!("{XCR}/nws/{{*rest}}"), get(network_get).put(network_put))
        .route(
            &format!("{XFW}/{{*rest}}"),
            get(firewall_get).post(firewall_post).delete(firewall_delete),
        )
        .route(&format!("{XDNS}/zones"), get(list_zones).post(create_zone))
        .route(
            &format!("{XDNS}/zones/{{id}}"),
            get(get_zone).put(update_zone).delete(delete_zone),
        )
        .route_layer(middleware::from_fn_with_state(db.clone(), require_token));

    Router::new()
        .route(&format!("{XCR}/xauth"), post(authenticate))
        .merge(protected)
        .fallback(no_route)
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn require_token(State(db): State<Db>, request: Request, next: Next) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    let known = match token {
        Some(token) => db.read().await.tokens.contains(token),
        None => false,
    };
    if !known {
        warn!(path = %request.uri().path(), "rejected request without a valid token");
        let body = json!({"xiam_error": {"reason": "Invalid token"}});
        return (StatusCode::UNAUTHORIZED, Json(body)).into_response();
    }
    next.run(request).await
}

async fn authenticate(State(db): State<Db>, Json(input): Json<AuthRequest>) -> ApiResult {
    if input.username != USERNAME || input.password != PASSWORD {
        warn!(username = %input.username, "login rejected");
        return Err(ApiFailure::new(
            StatusCode::BAD_REQUEST,
            "authentication_failed",
            "invalid username or password",
        ));
    }
    let token = Uuid::new_v4().simple().to_string();
    db.write().await.tokens.insert(token.clone());
    info!(username = %input.username, "login accepted");
    ok(Credentials {
        username: input.username,
        token,
        user_id: USER_ID,
    })
}

async fn me() -> ApiResult {
    ok(json!({
        "id": USER_ID,
        "username": USERNAME,
        "full_name": "Mock User",
        "status": "ACTIVE",
        "roles": [],
    }))
}

// --- domains ---

enum DomainRoute<'a> {
    Domain(&'a str),
    Status(&'a str),
    Networks(&'a str),
    RateLimits(&'a str, LimitKind),
}

fn domain_route(rest: &str) -> Option<DomainRoute<'_>> {
    if let Some(domain) = rest.strip_suffix("/status") {
        return Some(DomainRoute::Status(domain));
    }
    if let Some(domain) = rest.strip_suffix("/nws") {
        return Some(DomainRoute::Networks(domain));
    }
    if let Some((domain, kind)) = rest.rsplit_once("/ep_rate_limits/") {
        return LimitKind::parse(kind).map(|kind| DomainRoute::RateLimits(domain, kind));
    }
    Some(DomainRoute::Domain(rest))
}

async fn list_domains(State(db): State<Db>) -> ApiResult {
    let store = db.read().await;
    Ok(data(StatusCode::OK, store.domains.values().cloned().collect()))
}

async fn create_domain(State(db): State<Db>, Json(input): Json<CreateDomain>) -> ApiResult {
    let mut store = db.write().await;
    let id = store.next_id();
    let domain = Domain {
        id,
        cidr: format!("fd00:8f80:{:x}::/48", 0x8000 + id),
        name: input.name,
        domain_type: input.domain_type,
        status: "READY".to_string(),
    };
    store.domains.insert(domain.cidr.clone(), domain.clone());
    created(domain)
}

async fn domain_get(State(db): State<Db>, Path(rest): Path<String>) -> ApiResult {
    let store = db.read().await;
    match domain_route(&rest) {
        Some(DomainRoute::Domain(cidr)) => {
            let domain = store
                .domains
                .get(cidr)
                .cloned()
                .ok_or_else(|| ApiFailure::not_found("domain does not exist"))?;
            ok(domain)
        }
        Some(DomainRoute::Networks(cidr)) => {
            let networks = store
                .networks
                .values()
                .filter(|network| network.domain == cidr)
                .cloned()
                .collect();
            Ok(data(StatusCode::OK, networks))
        }
        Some(DomainRoute::RateLimits(cidr, kind)) => ok(store.limits(Scope::Domain, cidr, kind)),
        _ => Ok(no_route().await),
    }
}

async fn domain_put(
    State(db): State<Db>,
    Path(rest): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult {
    match domain_route(&rest) {
        Some(DomainRoute::Status(cidr)) => set_domain_status(&db, cidr, "ACTIVE").await,
        Some(DomainRoute::RateLimits(cidr, kind)) => {
            set_limits(&db, Scope::Domain, cidr, kind, parse(body)?).await
        }
        _ => Ok(no_route().await),
    }
}

async fn domain_post(
    State(db): State<Db>,
    Path(rest): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult {
    let Some(DomainRoute::Networks(cidr)) = domain_route(&rest) else {
        return Ok(no_route().await);
    };
    let input: CreateNetwork = parse(body)?;

    let mut store = db.write().await;
    if !store.domains.contains_key(cidr) {
        return Err(ApiFailure::not_found("domain does not exist"));
    }
    let id = store.next_id();
    let index = store.networks.values().filter(|n| n.domain == cidr).count() + 1;
    let prefix = cidr.trim_end_matches("::/48");
    let network = Network {
        id,
        name: input.name,
        description: input.description,
        domain: cidr.to_string(),
        cidr: format!("{prefix}:{index:x}::/64"),
        status: "ACTIVE".to_string(),
    };
    store.networks.insert(network.cidr.clone(), network.clone());
    created(network)
}

async fn domain_delete(State(db): State<Db>, Path(rest): Path<String>) -> ApiResult {
    match domain_route(&rest) {
        Some(DomainRoute::Status(cidr)) => set_domain_status(&db, cidr, "INACTIVE").await,
        _ => Ok(no_route().await),
    }
}

async fn set_domain_status(db: &Db, cidr: &str, status: &str) -> ApiResult {
    let mut store = db.write().await;
    let domain = store
        .domains
        .get_mut(cidr)
        .ok_or_else(|| ApiFailure::not_found("domain does not exist"))?;
    domain.status = status.to_string();
    empty()
}

async fn set_limits(
    db: &Db,
    scope: Scope,
    cidr: &str,
    kind: LimitKind,
    limits: RateLimits,
) -> ApiResult {
    let mut store = db.write().await;
    if kind == LimitKind::Default && !limits.within(&store.limits(scope, cidr, LimitKind::Max)) {
        return Err(ApiFailure::new(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "rate limit exceeds allowed max",
        ));
    }
    store
        .rate_limits
        .insert((scope, cidr.to_string(), kind), limits.clone());
    ok(limits)
}

// --- networks ---

fn network_route(rest: &str) -> Option<(&str, Option<LimitKind>)> {
    match rest.rsplit_once("/ep_rate_limits/") {
        Some((network, kind)) => LimitKind::parse(kind).map(|kind| (network, Some(kind))),
        None => Some((rest, None)),
    }
}

async fn network_get(State(db): State<Db>, Path(rest): Path<String>) -> ApiResult {
    let store = db.read().await;
    match network_route(&rest) {
        Some((cidr, Some(kind))) => ok(store.limits(Scope::Network, cidr, kind)),
        Some((cidr, None)) => {
            let network = store
                .networks
                .get(cidr)
                .cloned()
                .ok_or_else(|| ApiFailure::not_found("network does not exist"))?;
            ok(network)
        }
        None => Ok(no_route().await),
    }
}

async fn network_put(
    State(db): State<Db>,
    Path(rest): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult {
    match network_route(&rest) {
        Some((cidr, Some(kind))) => set_limits(&db, Scope::Network, cidr, kind, parse(body)?).await,
        Some((cidr, None)) => {
            let input: UpdateNetwork = parse(body)?;
            let mut store = db.write().await;
            let network = store
                .networks
                .get_mut(cidr)
                .ok_or_else(|| ApiFailure::not_found("network does not exist"))?;
            if let Some(name) = input.name {
                network.name = name;
            }
            if let Some(description) = input.description {
                network.description = Some(description);
            }
            ok(network.clone())
        }
        None => Ok(no_route().await),
    }
}

// --- firewall ---

/// `{network}/rule` or `{network}/rule/{id}`.
fn firewall_route(rest: &str) -> Option<(&str, Option<&str>)> {
    let (network, tail) = rest.rsplit_once("/rule")?;
    match tail {
        "" => Some((network, None)),
        _ => tail.strip_prefix('/').map(|id| (network, Some(id))),
    }
}

fn firewall_error(text: &str) -> ApiFailure {
    ApiFailure::new(StatusCode::BAD_REQUEST, "firewall_error", text)
}

async fn firewall_get(State(db): State<Db>, Path(rest): Path<String>) -> ApiResult {
    let store = db.read().await;
    match firewall_route(&rest) {
        Some((network, None)) => {
            let rules = store
                .rules
                .values()
                .filter(|rule| rule.network == network)
                .cloned()
                .collect();
            Ok(data(StatusCode::OK, rules))
        }
        Some((network, Some(id))) => {
            let rule = Uuid::parse_str(id)
                .ok()
                .and_then(|id| store.rules.get(&id))
                .filter(|rule| rule.network == network)
                .cloned()
                .ok_or_else(|| ApiFailure::not_found("rule does not exist"))?;
            ok(rule)
        }
        None => Ok(no_route().await),
    }
}

async fn firewall_post(
    State(db): State<Db>,
    Path(rest): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult {
    let Some((network, None)) = firewall_route(&rest) else {
        return Ok(no_route().await);
    };
    let Value::Object(fields) = body else {
        return Err(firewall_error("rule must be a JSON object"));
    };

    let mut store = db.write().await;
    if !store.networks.contains_key(network) {
        return Err(firewall_error("network does not exist"));
    }
    let rule = FirewallRule {
        id: Uuid::new_v4(),
        network: network.to_string(),
        fields,
    };
    store.rules.insert(rule.id, rule.clone());
    created(rule)
}

async fn firewall_delete(State(db): State<Db>, Path(rest): Path<String>) -> ApiResult {
    let Some((network, Some(id))) = firewall_route(&rest) else {
        return Ok(no_route().await);
    };
    let mut store = db.write().await;
    let id = Uuid::parse_str(id).map_err(|_| firewall_error("rule not found"))?;
    match store.rules.get(&id) {
        Some(rule) if rule.network == network => {
            store.rules.remove(&id);
            empty()
        }
        _ => Err(firewall_error("rule not found")),
    }
}

// --- dns zones ---

async fn list_zones(State(db): State<Db>, Query(filter): Query<ZoneFilter>) -> ApiResult {
    let store = db.read().await;
    let zones = store
        .zones
        .values()
        .filter(|zone| match &filter.enf_domain {
            Some(domain) => zone.enf_domain.as_ref() == Some(domain),
            None => true,
        })
        .cloned()
        .collect();
    Ok(data(StatusCode::OK, zones))
}

async fn create_zone(State(db): State<Db>, Json(input): Json<CreateZone>) -> ApiResult {
    let zone = Zone {
        id: Uuid::new_v4(),
        zone_domain_name: input.zone_domain_name,
        description: input.description,
        enf_domain: input.enf_domain,
        privileged: false,
    };
    db.write().await.zones.insert(zone.id, zone.clone());
    created(zone)
}

async fn get_zone(State(db): State<Db>, Path(id): Path<Uuid>) -> ApiResult {
    let store = db.read().await;
    let zone = store
        .zones
        .get(&id)
        .cloned()
        .ok_or_else(|| ApiFailure::not_found("zone does not exist"))?;
    ok(zone)
}

async fn update_zone(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateZone>,
) -> ApiResult {
    let mut store = db.write().await;
    let zone = store
        .zones
        .get_mut(&id)
        .ok_or_else(|| ApiFailure::not_found("zone does not exist"))?;
    if let Some(description) = input.description {
        zone.description = Some(description);
    }
    ok(zone.clone())
}

async fn delete_zone(State(db): State<Db>, Path(id): Path<Uuid>) -> ApiResult {
    let mut store = db.write().await;
    store
        .zones
        .remove(&id)
        .ok_or_else(|| ApiFailure::not_found("zone does not exist"))?;
    empty()
}
