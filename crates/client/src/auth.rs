//! Credential provider seam.
//!
//! The import core only ever reads the bearer token. Refresh and expiry
//! belong to whoever implements [`AccessTokenProvider`]; a missing token
//! fails the call locally before any request is built.

use std::sync::RwLock;

pub trait AccessTokenProvider: Send + Sync {
    /// Current bearer credential, or `None` when signed out.
    fn access_token(&self) -> Option<String>;

    /// Forget the credential.
    fn logout(&self) {}
}

/// Blank tokens count as absent.
fn non_blank(token: Option<String>) -> Option<String> {
    token.filter(|t| !t.trim().is_empty())
}

/// A fixed credential, e.g. read once from the environment.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: Option<String>) -> Self {
        Self(non_blank(token))
    }
}

impl AccessTokenProvider for StaticToken {
    fn access_token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// A credential that can be replaced or cleared at runtime.
#[derive(Debug, Default)]
pub struct SharedToken {
    inner: RwLock<Option<String>>,
}

impl SharedToken {
    pub fn new(token: Option<String>) -> Self {
        Self {
            inner: RwLock::new(non_blank(token)),
        }
    }

    pub fn set(&self, token: Option<String>) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = non_blank(token);
    }
}

impl AccessTokenProvider for SharedToken {
    fn access_token(&self) -> Option<String> {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn logout(&self) {
        self.set(None);
    }
}
