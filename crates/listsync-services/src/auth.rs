//! Authentication provider.
//!
//! Consumed to stamp authorship on drafts. Store logic never checks it.

use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// A signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            full_name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.full_name = Some(name.into());
        self
    }
}

/// Who is signed in.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The current user, `None` when signed out.
    async fn current_user(&self) -> Result<Option<User>>;

    /// Sign a user in.
    async fn login(&self, user: User) -> Result<()>;

    /// Sign out. Succeeds when already signed out.
    async fn logout(&self) -> Result<()>;

    /// The current user, or `Unauthenticated`.
    async fn require_user(&self) -> Result<User> {
        self.current_user()
            .await?
            .ok_or(ServiceError::Unauthenticated)
    }
}

/// In-process session holder.
#[derive(Debug, Default)]
pub struct MemoryAuth {
    user: RwLock<Option<User>>,
}

impl MemoryAuth {
    /// Start signed out.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start signed in as `user`.
    pub fn signed_in(user: User) -> Self {
        Self {
            user: RwLock::new(Some(user)),
        }
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> ServiceError {
    ServiceError::Backend(format!("session lock poisoned: {}", e))
}

#[async_trait]
impl AuthProvider for MemoryAuth {
    async fn current_user(&self) -> Result<Option<User>> {
        Ok(self.user.read().map_err(poisoned)?.clone())
    }

    async fn login(&self, user: User) -> Result<()> {
        tracing::debug!(user = %user.id, "login");
        *self.user.write().map_err(poisoned)? = Some(user);
        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        tracing::debug!("logout");
        *self.user.write().map_err(poisoned)? = None;
        Ok(())
    }
}
