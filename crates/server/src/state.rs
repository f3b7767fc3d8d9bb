use std::sync::Arc;

use service::account::{AccountRepository, AccountService};
use service::auth::repository::UserRepository;
use service::auth::{AuthService, AuthSettings};
use service::permission::{AccessPolicy, IsAccountOwnerOrAdmin};

/// Shared handler state.
#[derive(Clone)]
pub struct ServerState {
    pub accounts: Arc<AccountService>,
    pub auth: Arc<AuthService>,
    pub policy: Arc<dyn AccessPolicy>,
}

impl ServerState {
    /// Wire services over the given repositories with the default account policy.
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        users: Arc<dyn UserRepository>,
        auth: AuthSettings,
    ) -> Self {
        Self {
            accounts: Arc::new(AccountService::new(accounts)),
            auth: Arc::new(AuthService::new(users, auth)),
            policy: Arc::new(IsAccountOwnerOrAdmin),
        }
    }
}
