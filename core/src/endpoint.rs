//! Endpoint descriptors: what to call, not how.
//!
//! An `Endpoint` names the method, the path relative to the client's base URL
//! and the optional JSON body of one remote operation. It is built per call
//! and consumed by `EnfClient::dispatch`. GET and DELETE descriptors have no
//! body by construction.

use serde::Serialize;
use url::form_urlencoded;

use crate::error::Error;
use crate::http::HttpMethod;

#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    method: HttpMethod,
    path: String,
    body: Option<serde_json::Value>,
}

impl Endpoint {
    pub fn get(path: impl Into<String>) -> Self {
        Self::without_body(HttpMethod::Get, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::without_body(HttpMethod::Delete, path)
    }

    pub fn post<B: Serialize + ?Sized>(path: impl Into<String>, body: &B) -> Result<Self, Error> {
        Self::with_body(HttpMethod::Post, path, body)
    }

    pub fn put<B: Serialize + ?Sized>(path: impl Into<String>, body: &B) -> Result<Self, Error> {
        Self::with_body(HttpMethod::Put, path, body)
    }

    fn without_body(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    fn with_body<B: Serialize + ?Sized>(
        method: HttpMethod,
        path: impl Into<String>,
        body: &B,
    ) -> Result<Self, Error> {
        let body = serde_json::to_value(body).map_err(Error::Serialization)?;
        Ok(Self {
            method,
            path: path.into(),
            body: Some(body),
        })
    }

    /// Append a url-encoded `key=value` pair to the path's query string.
    pub fn query(mut self, key: &str, value: &str) -> Self {
        let pair = form_urlencoded::Serializer::new(String::new())
            .append_pair(key, value)
            .finish();
        let separator = if self.path.contains('?') { '&' } else { '?' };
        self.path.push(separator);
        self.path.push_str(&pair);
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }
}
