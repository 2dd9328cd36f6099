//! Request dispatcher for the ENF API.
//!
//! # Design
//! `EnfClient` holds the normalized base URL, the user agent, the shared
//! token store and a `Transport`. Every remote operation goes through the
//! same three steps:
//!
//! 1. `build_request` turns an `Endpoint` into an `HttpRequest` (pure);
//! 2. the transport executes it, raced against the caller's `RequestContext`;
//! 3. `parse_response` maps the status code and decodes the body (pure).
//!
//! One `Endpoint` is exactly one round trip: nothing is retried or paged.

use std::fmt;
use std::sync::Arc;

use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::context::RequestContext;
use crate::endpoint::Endpoint;
use crate::envelope::Envelope;
use crate::error::{ApiError, Error};
use crate::http::{
    HttpRequest, HttpResponse, HEADER_ACCEPT, HEADER_AUTHORIZATION, HEADER_CONTENT_TYPE,
    HEADER_USER_AGENT, MEDIA_TYPE_JSON,
};
use crate::resources::{
    AuthService, DnsService, DomainService, EndpointService, FirewallService, InviteService,
    NetworkService, UserService,
};
use crate::token::TokenStore;
use crate::transport::{Transport, UreqTransport};

#[derive(Clone)]
pub struct EnfClient {
    base_url: String,
    user_agent: String,
    token: TokenStore,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for EnfClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnfClient")
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent)
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

impl EnfClient {
    /// Client over the default `ureq` transport.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let transport = UreqTransport::from_config(&config);
        Self::with_transport(config, transport)
    }

    pub fn with_transport<T>(config: ClientConfig, transport: T) -> Result<Self, Error>
    where
        T: Transport + 'static,
    {
        Self::with_shared_transport(config, Arc::new(transport))
    }

    pub fn with_shared_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, Error> {
        let base_url = config.resolve_base_url()?;
        Ok(Self {
            base_url,
            user_agent: config.user_agent,
            token: TokenStore::new(config.token),
            transport,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn token(&self) -> &TokenStore {
        &self.token
    }

    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self)
    }

    pub fn domains(&self) -> DomainService<'_> {
        DomainService::new(self)
    }

    pub fn networks(&self) -> NetworkService<'_> {
        NetworkService::new(self)
    }

    pub fn endpoints(&self) -> EndpointService<'_> {
        EndpointService::new(self)
    }

    pub fn firewall(&self) -> FirewallService<'_> {
        FirewallService::new(self)
    }

    pub fn dns(&self) -> DnsService<'_> {
        DnsService::new(self)
    }

    pub fn users(&self) -> UserService<'_> {
        UserService::new(self)
    }

    pub fn invites(&self) -> InviteService<'_> {
        InviteService::new(self)
    }

    /// Build the wire request for `endpoint` with the current token.
    pub fn build_request(&self, endpoint: &Endpoint) -> Result<HttpRequest, Error> {
        let mut headers = vec![
            (HEADER_ACCEPT.to_string(), MEDIA_TYPE_JSON.to_string()),
            (HEADER_USER_AGENT.to_string(), self.user_agent.clone()),
        ];
        if let Some(authorization) = self.token.authorization() {
            headers.push((HEADER_AUTHORIZATION.to_string(), authorization));
        }

        let method = endpoint.method();
        let body = match endpoint.body() {
            Some(body) if method.allows_body() => {
                Some(serde_json::to_string(body).map_err(Error::Serialization)?)
            }
            _ => None,
        };
        if body.is_some() {
            headers.push((HEADER_CONTENT_TYPE.to_string(), MEDIA_TYPE_JSON.to_string()));
        }

        Ok(HttpRequest {
            method,
            url: format!("{}{}", self.base_url, endpoint.path()),
            headers,
            body,
        })
    }

    /// Execute `endpoint` and decode the whole body as `T`.
    pub async fn dispatch<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        endpoint: Endpoint,
    ) -> Result<T, Error> {
        let response = self.execute(ctx, &endpoint).await?;
        parse_response(response)
    }

    /// Execute `endpoint` and return the single resource in the envelope.
    pub async fn dispatch_one<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        endpoint: Endpoint,
    ) -> Result<T, Error> {
        let envelope: Envelope<T> = self.dispatch(ctx, endpoint).await?;
        envelope.into_first()
    }

    /// Execute `endpoint` and return every resource in the envelope.
    pub async fn dispatch_all<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        endpoint: Endpoint,
    ) -> Result<Vec<T>, Error> {
        let envelope: Envelope<T> = self.dispatch(ctx, endpoint).await?;
        Ok(envelope.into_data())
    }

    /// Execute `endpoint` for its status only.
    pub async fn dispatch_empty(
        &self,
        ctx: &RequestContext,
        endpoint: Endpoint,
    ) -> Result<(), Error> {
        let response = self.execute(ctx, &endpoint).await?;
        parse_empty_response(response)
    }

    async fn execute(
        &self,
        ctx: &RequestContext,
        endpoint: &Endpoint,
    ) -> Result<HttpResponse, Error> {
        if let Some(err) = ctx.error() {
            return Err(err);
        }

        let request = self.build_request(endpoint)?;
        debug!(method = %request.method, url = %request.url, "dispatching request");

        let outcome = tokio::select! {
            biased;
            err = ctx.done() => {
                debug!(error = %err, "request abandoned");
                return Err(err);
            }
            outcome = self.transport.execute(request) => outcome,
        };

        match outcome {
            Ok(response) => {
                debug!(status = response.status, "received response");
                Ok(response)
            }
            Err(err) => {
                // a transport error caused by the caller giving up is reported as such
                if let Some(ctx_err) = ctx.error() {
                    return Err(ctx_err);
                }
                warn!(error = %err, "transport failure");
                Err(ApiError::transport().into())
            }
        }
    }
}

/// Map the status code and decode a success body as `T`.
pub fn parse_response<T: DeserializeOwned>(response: HttpResponse) -> Result<T, Error> {
    check_status(&response)?;
    serde_json::from_str(&response.body)
        .inspect_err(|err| warn!(error = %err, "undecodable response body"))
        .map_err(Error::Decode)
}

/// Map the status code; an empty body or any JSON document is success.
pub fn parse_empty_response(response: HttpResponse) -> Result<(), Error> {
    check_status(&response)?;
    if response.body.trim().is_empty() {
        return Ok(());
    }
    serde_json::from_str::<IgnoredAny>(&response.body)
        .map(|_| ())
        .map_err(Error::Decode)
}

/// Map non-success status codes to an `ApiError`.
///
/// 403 and 415 never carry a usable body, so theirs is not parsed.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    let status = response.status;
    let body = response.body.as_str();
    let err = match status {
        200 | 201 => return Ok(()),
        400 | 401 if body.trim().is_empty() => ApiError::new(status),
        400 | 401 => ApiError::from_body(status, body)
            .unwrap_or_else(|_| ApiError::with_message(status, body)),
        403 => ApiError::with_code(status, "http_error", "Method Not Found"),
        415 => ApiError::with_code(status, "http_error", "Unsupported Media Type"),
        404 => ApiError::from_body(status, body)
            .unwrap_or_else(|_| ApiError::with_code(status, "http_error", "Not Found")),
        500 => ApiError::from_body(status, body).unwrap_or_else(|_| {
            ApiError::with_code(status, "server_error", "Server error received without details")
        }),
        other => ApiError::with_message(other, format!("unexpected status code {other}")),
    };
    Err(err)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::http::HttpMethod;
    use crate::test_support::{client_with, ScriptedTransport};
    use crate::transport::TransportError;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Credentials {
        username: String,
        token: String,
        user_id: i64,
    }

    #[derive(Debug, Serialize)]
    struct Login {
        username: String,
        password: String,
    }

    fn login() -> Login {
        Login {
            username: "user".to_string(),
            password: "pass".to_string(),
        }
    }

    const CREDENTIALS_ENVELOPE: &str =
        r#"{"data":[{"username":"user","token":"12345678","user_id":1}],"page":{}}"#;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse::new(status, body)
    }

    fn api_error<T: fmt::Debug>(result: Result<T, Error>) -> ApiError {
        match result.unwrap_err() {
            Error::Api(err) => err,
            other => panic!("expected API error, got {other:?}"),
        }
    }

    #[test]
    fn build_request_sets_json_headers_and_body() {
        let transport = ScriptedTransport::default();
        let client = client_with(&transport);
        let endpoint = Endpoint::post("/auth", &login()).unwrap();

        let req = client.build_request(&endpoint).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost/auth");
        assert_eq!(req.header("accept"), Some("application/json"));
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert!(req.header("user-agent").unwrap().starts_with("enf-rs/"));
        assert_eq!(req.header("authorization"), None);

        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"username": "user", "password": "pass"}));
    }

    #[test]
    fn build_request_without_body_omits_content_type() {
        let transport = ScriptedTransport::default();
        let client = client_with(&transport);
        client.token().set("abc");

        let req = client.build_request(&Endpoint::get("/api/xcr/v3/me")).unwrap();
        assert!(req.body.is_none());
        assert_eq!(req.header("content-type"), None);
        assert_eq!(req.header("authorization"), Some("Bearer abc"));
    }

    #[tokio::test]
    async fn post_decodes_first_element_of_envelope() {
        let transport = ScriptedTransport::default();
        transport.respond(200, CREDENTIALS_ENVELOPE);
        let client = client_with(&transport);

        let endpoint = Endpoint::post("/auth", &login()).unwrap();
        let credentials: Credentials = client
            .dispatch_one(&RequestContext::background(), endpoint)
            .await
            .unwrap();

        assert_eq!(
            credentials,
            Credentials {
                username: "user".to_string(),
                token: "12345678".to_string(),
                user_id: 1,
            }
        );
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn every_method_decodes_on_success() {
        let ctx = RequestContext::background();
        for status in [200, 201] {
            let transport = ScriptedTransport::default();
            let client = client_with(&transport);
            let endpoints = [
                Endpoint::get("/r"),
                Endpoint::post("/r", &login()).unwrap(),
                Endpoint::put("/r", &login()).unwrap(),
                Endpoint::delete("/r"),
            ];
            for endpoint in endpoints {
                let method = endpoint.method();
                transport.respond(status, CREDENTIALS_ENVELOPE);
                let credentials: Credentials = client.dispatch_one(&ctx, endpoint).await.unwrap();
                assert_eq!(credentials.user_id, 1, "{method} {status}");
                assert_eq!(transport.last_request().method, method);
            }
        }
    }

    #[tokio::test]
    async fn repeated_get_yields_equal_results() {
        let transport = ScriptedTransport::default();
        transport.respond(200, CREDENTIALS_ENVELOPE);
        transport.respond(200, CREDENTIALS_ENVELOPE);
        let client = client_with(&transport);
        let ctx = RequestContext::background();

        let first: Credentials = client.dispatch_one(&ctx, Endpoint::get("/me")).await.unwrap();
        let second: Credentials = client.dispatch_one(&ctx, Endpoint::get("/me")).await.unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn structured_errors_are_parsed_for_parseable_statuses() {
        for status in [400, 401, 404, 500] {
            let err = api_error(parse_response::<IgnoredAny>(response(
                status,
                r#"{"error":{"code":"x","text":"y"}}"#,
            )));
            assert_eq!(err.to_string(), "X: y", "status {status}");
            assert_eq!(err.status(), status);
        }
    }

    #[test]
    fn forbidden_ignores_body() {
        let err = api_error(parse_response::<IgnoredAny>(response(
            403,
            r#"{"error":{"code":"x","text":"y"}}"#,
        )));
        assert_eq!(err.to_string(), "HTTP_ERROR: Method Not Found");
        assert_eq!(err.status(), 403);
    }

    #[test]
    fn unsupported_media_type_ignores_body() {
        let err = api_error(parse_response::<IgnoredAny>(response(415, "whatever")));
        assert_eq!(err.to_string(), "HTTP_ERROR: Unsupported Media Type");
    }

    #[test]
    fn bad_request_with_plain_body_uses_raw_text() {
        let err = api_error(parse_response::<IgnoredAny>(response(400, "Bad Request")));
        assert_eq!(err.to_string(), "Bad Request");
        assert_eq!(err.message(), Some("Bad Request"));
    }

    #[test]
    fn blank_client_error_body_renders_unknown_error() {
        for (status, body) in [(400, ""), (401, " \r\n")] {
            let err = api_error(parse_response::<IgnoredAny>(response(status, body)));
            assert_eq!(
                err.to_string(),
                "UNKNOWN_ERROR: server did not respond with properly formatted error message."
            );
            assert_eq!(err.message(), None);
            assert_eq!(err.status(), status);
        }
    }

    #[test]
    fn reason_errors_are_rendered_verbatim() {
        let err = api_error(parse_response::<IgnoredAny>(response(
            401,
            r#"{"xiam_error":{"reason":"Invalid token"}}"#,
        )));
        assert_eq!(err.to_string(), "Invalid token");
    }

    #[test]
    fn not_found_and_server_error_fall_back_when_unparseable() {
        let err = api_error(parse_response::<IgnoredAny>(response(404, "")));
        assert_eq!(err.to_string(), "HTTP_ERROR: Not Found");

        let err = api_error(parse_response::<IgnoredAny>(response(500, "<html>")));
        assert_eq!(
            err.to_string(),
            "SERVER_ERROR: Server error received without details"
        );
    }

    #[test]
    fn other_statuses_are_unexpected() {
        for status in [204, 302, 409, 502] {
            let err = api_error(parse_response::<IgnoredAny>(response(
                status,
                r#"{"error":{"code":"x","text":"y"}}"#,
            )));
            assert_eq!(err.to_string(), format!("unexpected status code {status}"));
            assert_eq!(err.status(), status);
        }
    }

    #[test]
    fn undecodable_success_body_is_a_decode_error() {
        let err = parse_response::<Envelope<Credentials>>(response(200, "not json")).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
        assert_eq!(err.status(), None);
    }

    #[test]
    fn wrong_shape_is_a_decode_error() {
        let err = parse_response::<Envelope<Credentials>>(response(200, r#"{"data":[{"x":1}]}"#))
            .unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn empty_responses_accept_blank_or_json_bodies() {
        assert!(parse_empty_response(response(200, "")).is_ok());
        assert!(parse_empty_response(response(200, "[]")).is_ok());
        assert!(parse_empty_response(response(201, r#"{"data":[]}"#)).is_ok());
        assert!(matches!(
            parse_empty_response(response(200, "ok")),
            Err(Error::Decode(_))
        ));
        assert!(matches!(
            parse_empty_response(response(404, "")),
            Err(Error::Api(_))
        ));
    }

    #[tokio::test]
    async fn empty_data_on_singular_endpoint_is_reported() {
        let transport = ScriptedTransport::default();
        transport.respond(200, r#"{"data":[],"page":{}}"#);
        let client = client_with(&transport);

        let result: Result<Credentials, _> = client
            .dispatch_one(&RequestContext::background(), Endpoint::get("/me"))
            .await;
        assert!(matches!(result, Err(Error::EmptyResult)));
    }

    #[tokio::test]
    async fn transport_failure_maps_to_status_zero() {
        let transport = ScriptedTransport::default();
        transport.fail(TransportError::Connection("connection refused".to_string()));
        let client = client_with(&transport);

        let err = api_error(
            client
                .dispatch::<IgnoredAny>(&RequestContext::background(), Endpoint::get("/me"))
                .await,
        );
        assert_eq!(err.status(), 0);
        assert_eq!(err.to_string(), "Unable to create api request");
    }

    #[tokio::test]
    async fn cancellation_while_in_flight_wins() {
        let transport = ScriptedTransport::default();
        transport.hang();
        let client = client_with(&transport);

        let token = CancellationToken::new();
        let ctx = RequestContext::background().with_cancellation(token.clone());
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let result = client.dispatch::<IgnoredAny>(&ctx, Endpoint::get("/me")).await;
        canceller.await.unwrap();
        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn transport_error_after_cancellation_reports_cancellation() {
        let token = CancellationToken::new();
        let transport = ScriptedTransport::default();
        transport.cancel_then_fail(token.clone());
        let client = client_with(&transport);

        let ctx = RequestContext::background().with_cancellation(token);
        let result = client.dispatch::<IgnoredAny>(&ctx, Endpoint::get("/me")).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_while_in_flight_is_reported() {
        let transport = ScriptedTransport::default();
        transport.hang();
        let client = client_with(&transport);

        let ctx = RequestContext::background().with_timeout(Duration::from_secs(5));
        let result = client.dispatch::<IgnoredAny>(&ctx, Endpoint::get("/me")).await;
        assert!(matches!(result, Err(Error::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn already_cancelled_context_sends_nothing() {
        let transport = ScriptedTransport::default();
        let client = client_with(&transport);
        let token = CancellationToken::new();
        token.cancel();

        let ctx = RequestContext::background().with_cancellation(token);
        let result = client.dispatch::<IgnoredAny>(&ctx, Endpoint::get("/me")).await;
        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn invalid_configuration_fails_before_any_request() {
        let transport = ScriptedTransport::default();
        let err = EnfClient::with_transport(ClientConfig::new("http://[::1"), transport.clone())
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(transport.requests().is_empty());
    }
}
