//! Shared bearer-token cell.
//!
//! Every dispatch reads the token; only the authentication flow and the
//! owner of the store write it. Clones share the same cell, so a token
//! obtained through one `EnfClient` clone is seen by all of them.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

#[derive(Clone, Default)]
pub struct TokenStore {
    inner: Arc<RwLock<Option<String>>>,
}

impl TokenStore {
    pub fn new(token: Option<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(token)),
        }
    }

    pub fn get(&self) -> Option<String> {
        self.inner.read().clone()
    }

    pub fn is_set(&self) -> bool {
        self.inner.read().is_some()
    }

    pub fn set(&self, token: impl Into<String>) {
        *self.inner.write() = Some(token.into());
    }

    pub fn clear(&self) {
        *self.inner.write() = None;
    }

    /// `Bearer <token>` when a token is present.
    pub(crate) fn authorization(&self) -> Option<String> {
        self.inner
            .read()
            .as_deref()
            .filter(|token| !token.is_empty())
            .map(|token| format!("Bearer {token}"))
    }
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore")
            .field("is_set", &self.is_set())
            .finish()
    }
}
