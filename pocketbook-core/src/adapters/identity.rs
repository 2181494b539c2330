//! Identity adapter - user identity taken from local configuration

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::config::Config;
use crate::domain::result::Result;
use crate::domain::User;
use crate::ports::IdentityProvider;

/// Identity fixed at construction time
///
/// The CLI has no login flow of its own; the signed-in user is whatever
/// `userId` the settings (or `POCKETBOOK_USER_ID`) name.
#[derive(Debug, Default)]
pub struct StaticIdentity {
    user: Option<User>,
    refreshes: AtomicUsize,
}

impl StaticIdentity {
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self {
            user: Some(User::new(user_id)),
            refreshes: AtomicUsize::new(0),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn from_config(config: &Config) -> Self {
        match config.user_id.as_deref().filter(|id| !id.trim().is_empty()) {
            Some(id) => Self::signed_in(id.trim()),
            None => Self::signed_out(),
        }
    }

    /// How many times the session was refreshed
    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_user(&self) -> Result<Option<User>> {
        Ok(self.user.clone())
    }

    async fn refresh_session(&self) -> Result<()> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_config() {
        let mut config = Config::default();
        assert!(StaticIdentity::from_config(&config)
            .current_user()
            .await
            .unwrap()
            .is_none());

        config.user_id = Some("  ".to_string());
        assert!(StaticIdentity::from_config(&config)
            .current_user()
            .await
            .unwrap()
            .is_none());

        config.user_id = Some("user-42".to_string());
        let user = StaticIdentity::from_config(&config)
            .current_user()
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.id, "user-42");
    }
}
