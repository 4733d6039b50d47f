use std::collections::HashMap;
use std::sync::RwLock;

use storefront_core::UserId;

use crate::identity::{IdentityProvider, UserProfile};

/// In-memory identity provider for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    users: RwLock<HashMap<UserId, UserProfile>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, profile: UserProfile) {
        if let Ok(mut users) = self.users.write() {
            tracing::debug!(user_id = %profile.id, "registered user profile");
            users.insert(profile.id, profile);
        }
    }

    pub fn remove(&self, user_id: UserId) -> Option<UserProfile> {
        self.users.write().ok()?.remove(&user_id)
    }

    pub fn len(&self) -> usize {
        self.users.read().map(|u| u.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl IdentityProvider for InMemoryDirectory {
    async fn profile(&self, user_id: UserId) -> Option<UserProfile> {
        self.users.read().ok()?.get(&user_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn resolves_registered_users_only() {
        let directory = InMemoryDirectory::new();
        let ada = UserProfile::new(UserId::new(), "Ada", "Lovelace").unwrap();
        directory.register(ada.clone());

        assert_eq!(directory.display_name(ada.id).await.as_deref(), Some("Ada Lovelace"));
        assert_eq!(directory.display_name(UserId::new()).await, None);
    }

    #[tokio::test]
    async fn arc_wrapped_directory_is_a_provider() {
        let directory = Arc::new(InMemoryDirectory::new());
        let ada = UserProfile::new(UserId::new(), "Ada", "Lovelace").unwrap();
        directory.register(ada.clone());

        let provider: Arc<dyn IdentityProvider> = directory.clone();
        assert_eq!(provider.profile(ada.id).await, Some(ada.clone()));

        directory.remove(ada.id);
        assert!(directory.is_empty());
        assert_eq!(provider.profile(ada.id).await, None);
    }
}
