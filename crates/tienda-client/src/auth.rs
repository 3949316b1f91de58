//! # Session Credentials
//!
//! The POS does not authenticate anyone itself: the login screen (outside
//! this crate) hands us a bearer token, the operator's ID and a role string.
//! This module keeps them in memory and attaches the token to requests.
//!
//! ```text
//!   login shell ──set()──► TokenStore ──bearer()──► HttpBackend
//!                              ▲                        │
//!                              └──────clear()───────────┘
//!                                   (on HTTP 401)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::ClientError;

// =============================================================================
// Role
// =============================================================================

/// Operator role as reported by the backend at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Sales,
    Warehouse,
}

impl Role {
    /// Whether this role may run checkout and the cash drawer.
    pub fn can_sell(&self) -> bool {
        matches!(self, Role::Admin | Role::Sales)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Sales => write!(f, "sales"),
            Role::Warehouse => write!(f, "warehouse"),
        }
    }
}

impl FromStr for Role {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" | "administrador" => Ok(Role::Admin),
            "sales" | "ventas" | "vendedor" => Ok(Role::Sales),
            "warehouse" | "bodega" | "bodeguero" => Ok(Role::Warehouse),
            other => Err(ClientError::Config(format!(
                "Unknown role: '{}'. Valid options: admin, ventas, bodega",
                other
            ))),
        }
    }
}

// =============================================================================
// Credentials
// =============================================================================

/// What the login shell hands over after a successful sign-in.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub operator_id: String,
    pub role: Role,
}

// The token must never end up in logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("operator_id", &self.operator_id)
            .field("role", &self.role)
            .finish()
    }
}

/// Shared, clonable holder for the current session's credentials.
#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    inner: Arc<RwLock<Option<Credentials>>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: Credentials) -> Self {
        TokenStore {
            inner: Arc::new(RwLock::new(Some(credentials))),
        }
    }

    pub async fn set(&self, credentials: Credentials) {
        info!(operator_id = %credentials.operator_id, role = %credentials.role, "Operator signed in");
        *self.inner.write().await = Some(credentials);
    }

    /// Drops the credentials. Called on 401 and on sign-out.
    pub async fn clear(&self) {
        let mut guard = self.inner.write().await;
        if guard.take().is_some() {
            debug!("Session credentials cleared");
        }
    }

    pub async fn bearer(&self) -> Option<String> {
        self.inner.read().await.as_ref().map(|c| c.token.clone())
    }

    pub async fn operator_id(&self) -> Option<String> {
        self.inner
            .read()
            .await
            .as_ref()
            .map(|c| c.operator_id.clone())
    }

    pub async fn role(&self) -> Option<Role> {
        self.inner.read().await.as_ref().map(|c| c.role)
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.read().await.is_some()
    }
}
