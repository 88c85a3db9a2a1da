//! Anti-forgery tokens
//!
//! Pages that call the bridge's actions embed a token issued here, and
//! every action checks it before doing anything. A token is valid for its
//! scope until it expires; the check is plain string identity.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Mutex;

use crate::error::{BridgeError, BridgeResult};

/// Who a token was issued to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NonceScope {
    /// Editor pages (search and import)
    Admin,
    /// Public pages carrying the embedded search widget
    Public,
}

impl NonceScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Public => "public",
        }
    }
}

impl FromStr for NonceScope {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "public" => Ok(Self::Public),
            other => Err(BridgeError::InvalidRequest(format!(
                "Unknown nonce scope '{other}'"
            ))),
        }
    }
}

/// A freshly issued token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedNonce {
    pub token: String,
    pub scope: NonceScope,
    pub expires_at: DateTime<Utc>,
}

/// Issues and checks anti-forgery tokens
///
/// The router only sees this trait, so the tokens can come from whatever
/// auth layer wraps the service.
pub trait NonceGuard: Send + Sync {
    /// Issue a new token for `scope`
    fn issue(&self, scope: NonceScope) -> IssuedNonce;

    /// Check `token`; succeeds with its scope if it is known, unexpired and
    /// one of `accepted`
    fn verify(&self, token: &str, accepted: &[NonceScope]) -> BridgeResult<NonceScope>;
}

/// In-process token registry
pub struct NonceRegistry {
    ttl: Duration,
    tokens: Mutex<HashMap<String, (NonceScope, DateTime<Utc>)>>,
}

impl NonceRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Number of live (unexpired) tokens
    pub fn live_count(&self) -> usize {
        let now = Utc::now();
        self.lock().values().filter(|(_, exp)| *exp > now).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, (NonceScope, DateTime<Utc>)>> {
        self.tokens
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl NonceGuard for NonceRegistry {
    fn issue(&self, scope: NonceScope) -> IssuedNonce {
        let now = Utc::now();
        let token = uuid::Uuid::new_v4().simple().to_string();
        let expires_at = now + self.ttl;

        let mut tokens = self.lock();
        tokens.retain(|_, (_, exp)| *exp > now);
        tokens.insert(token.clone(), (scope, expires_at));

        tracing::debug!(scope = scope.as_str(), "issued nonce");
        IssuedNonce {
            token,
            scope,
            expires_at,
        }
    }

    fn verify(&self, token: &str, accepted: &[NonceScope]) -> BridgeResult<NonceScope> {
        let token = token.trim();
        if token.is_empty() {
            return Err(BridgeError::InvalidNonce);
        }

        let tokens = self.lock();
        match tokens.get(token) {
            Some((scope, exp)) if *exp > Utc::now() && accepted.contains(scope) => Ok(*scope),
            Some((scope, _)) => {
                tracing::warn!(scope = scope.as_str(), "rejected expired or out-of-scope nonce");
                Err(BridgeError::InvalidNonce)
            }
            None => {
                tracing::warn!("rejected unknown nonce");
                Err(BridgeError::InvalidNonce)
            }
        }
    }
}
