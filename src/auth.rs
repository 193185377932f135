//! Read-only view of the sign-in session.

use std::fmt;
use std::sync::{Arc, RwLock};

/// Opaque bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub user: Option<String>,
    pub token: Option<Credential>,
    pub loading: bool,
}

impl AuthSnapshot {
    pub fn signed_in(user: impl Into<String>, token: Credential) -> Self {
        Self {
            user: Some(user.into()),
            token: Some(token),
            loading: false,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.user.is_some() && self.token.is_some()
    }
}

/// Anything that can report the current session.
pub trait CredentialSource: Send + Sync {
    fn snapshot(&self) -> AuthSnapshot;

    fn credential(&self) -> Option<Credential> {
        self.snapshot().token
    }
}

/// Shared session handle. Sign-in flows write it; this crate only reads.
#[derive(Clone, Debug, Default)]
pub struct AuthSession {
    inner: Arc<RwLock<AuthSnapshot>>,
}

impl AuthSession {
    pub fn new(snapshot: AuthSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(snapshot)),
        }
    }

    pub fn replace(&self, snapshot: AuthSnapshot) {
        if let Ok(mut guard) = self.inner.write() {
            *guard = snapshot;
        }
    }
}

impl CredentialSource for AuthSession {
    fn snapshot(&self) -> AuthSnapshot {
        self.inner
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}
