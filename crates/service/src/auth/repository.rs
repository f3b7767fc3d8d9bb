use async_trait::async_trait;
use uuid::Uuid;

use models::user::NewUser;

use super::domain::{AuthUser, StoredUser};
use super::errors::AuthError;

/// Repository abstraction for user lookups.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<StoredUser>, AuthError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthError>;
    async fn create_user(&self, input: NewUser) -> Result<AuthUser, AuthError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Default)]
    pub struct MockUserRepository {
        users: Mutex<HashMap<Uuid, StoredUser>>, // key: user id
    }

    impl MockUserRepository {
        pub fn new() -> Self { Self::default() }

        /// Flip `is_active` on a stored user.
        pub async fn set_active(&self, id: Uuid, active: bool) {
            if let Some(stored) = self.users.lock().await.get_mut(&id) {
                stored.user.is_active = active;
            }
        }
    }

    #[async_trait]
    impl UserRepository for MockUserRepository {
        async fn find_by_username(&self, username: &str) -> Result<Option<StoredUser>, AuthError> {
            let users = self.users.lock().await;
            Ok(users.values().find(|s| s.user.username == username).cloned())
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthError> {
            let users = self.users.lock().await;
            Ok(users.get(&id).map(|s| s.user.clone()))
        }

        async fn create_user(&self, input: NewUser) -> Result<AuthUser, AuthError> {
            models::user::validate_username(&input.username)?;
            let username = input.username.trim().to_string();
            let mut users = self.users.lock().await;
            if users.values().any(|s| s.user.username == username) {
                return Err(AuthError::Conflict);
            }
            let user = AuthUser {
                id: Uuid::new_v4(),
                username,
                email: input.email,
                is_staff: input.is_staff,
                is_superuser: input.is_superuser,
                is_active: true,
            };
            users.insert(user.id, StoredUser { user: user.clone(), password_hash: input.password_hash });
            Ok(user)
        }
    }
}
