//! Async client for the ENF (Encrypted Network Fabric) REST API.
//!
//! # Overview
//! Every remote operation is an `Endpoint` (method, path, optional JSON
//! body) executed by `EnfClient` in exactly one HTTP round trip. The client
//! attaches the JSON and bearer-token headers, races the round trip against
//! the caller's `RequestContext`, maps the status code onto `ApiError` and
//! decodes the `{"data": [...], "page": {...}}` envelope into typed values.
//!
//! # Design
//! - Building a request and parsing a response are pure functions; only the
//!   `Transport` touches the network. The default transport is `ureq`.
//! - The bearer token lives in a `TokenStore` shared by every clone of a
//!   client. Authenticating writes it; every dispatch reads it.
//! - Resource wrappers (`client.domains()`, `client.dns()`, ...) only build
//!   endpoints; status mapping and decoding live in the dispatcher.
//! - Nothing is retried, paged or cached.
//!
//! ```no_run
//! use enf_core::{ClientConfig, EnfClient, RequestContext};
//!
//! # async fn run() -> enf_core::Result<()> {
//! let client = EnfClient::new(ClientConfig::new("https://api.xaptum.io"))?;
//! let ctx = RequestContext::background();
//! client.auth().authenticate(&ctx, "user@acme.com", "secret").await?;
//! for domain in client.domains().list_domains(&ctx).await? {
//!     println!("{:?}", domain.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod context;
pub mod endpoint;
pub mod envelope;
pub mod error;
pub mod http;
pub mod resources;
pub mod token;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::{parse_empty_response, parse_response, EnfClient};
pub use config::{ClientConfig, ConfigError, DEFAULT_BASE_URL};
pub use context::RequestContext;
pub use endpoint::Endpoint;
pub use envelope::Envelope;
pub use error::{ApiError, CodeError, Error, ReasonError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use resources::*;
pub use token::TokenStore;
pub use transport::{Transport, TransportError, UreqTransport};
