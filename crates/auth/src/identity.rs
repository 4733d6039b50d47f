use std::sync::Arc;

use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, UserId};

/// Minimal user record the storefront reads from the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub surname: String,
    pub email: Option<String>,
}

impl UserProfile {
    pub fn new(id: UserId, name: impl Into<String>, surname: impl Into<String>) -> DomainResult<Self> {
        let name = name.into().trim().to_string();
        let surname = surname.into().trim().to_string();
        if name.is_empty() && surname.is_empty() {
            return Err(DomainError::validation("user needs a name or a surname"));
        }
        Ok(Self {
            id,
            name,
            surname,
            email: None,
        })
    }

    pub fn with_email(mut self, email: impl Into<String>) -> DomainResult<Self> {
        let email = email.into().trim().to_lowercase();
        if !email.contains('@') {
            return Err(DomainError::validation("invalid email format"));
        }
        self.email = Some(email);
        Ok(self)
    }

    /// "name surname", without stray spaces when either part is empty.
    pub fn display_name(&self) -> String {
        match (self.name.is_empty(), self.surname.is_empty()) {
            (false, false) => format!("{} {}", self.name, self.surname),
            (false, true) => self.name.clone(),
            _ => self.surname.clone(),
        }
    }
}

/// Resolves user ids to profiles. `None` means the user is unknown.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn profile(&self, user_id: UserId) -> Option<UserProfile>;

    async fn display_name(&self, user_id: UserId) -> Option<String> {
        self.profile(user_id).await.map(|p| p.display_name())
    }
}

#[async_trait::async_trait]
impl<P> IdentityProvider for Arc<P>
where
    P: IdentityProvider + ?Sized,
{
    async fn profile(&self, user_id: UserId) -> Option<UserProfile> {
        (**self).profile(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_joins_name_and_surname() {
        let profile = UserProfile::new(UserId::new(), " Ada ", "Lovelace").unwrap();
        assert_eq!(profile.display_name(), "Ada Lovelace");

        let only_name = UserProfile::new(UserId::new(), "Ada", "").unwrap();
        assert_eq!(only_name.display_name(), "Ada");
    }

    #[test]
    fn nameless_profile_is_rejected() {
        assert!(UserProfile::new(UserId::new(), " ", "").is_err());
    }

    #[test]
    fn email_is_normalised() {
        let profile = UserProfile::new(UserId::new(), "Ada", "Lovelace")
            .unwrap()
            .with_email(" Ada@Example.com ")
            .unwrap();
        assert_eq!(profile.email.as_deref(), Some("ada@example.com"));
        assert!(
            UserProfile::new(UserId::new(), "Ada", "Lovelace")
                .unwrap()
                .with_email("nope")
                .is_err()
        );
    }
}
