//! Identity port - who is importing

use async_trait::async_trait;

use crate::domain::result::Result;
use crate::domain::User;

/// Authentication collaborator
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The currently authenticated user, or None when signed out
    async fn current_user(&self) -> Result<Option<User>>;

    /// Keep the underlying session alive
    ///
    /// Called periodically by `SessionRefresher`. Providers without
    /// expiring sessions can rely on the default.
    async fn refresh_session(&self) -> Result<()> {
        Ok(())
    }
}
