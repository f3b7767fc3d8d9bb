//! Authorization gate for account endpoints.
//!
//! Checked in two phases: [`authorize`] before any record is loaded and
//! [`authorize_object`] once it is.
use crate::account::Account;
use crate::auth::AuthUser;
use crate::errors::ServiceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    PartialUpdate,
    Destroy,
}

impl Action {
    /// Read-only actions.
    pub fn is_safe(self) -> bool {
        matches!(self, Action::List | Action::Retrieve)
    }
}

pub trait AccessPolicy: Send + Sync {
    fn has_permission(&self, user: Option<&AuthUser>, action: Action) -> bool;
    fn has_object_permission(&self, user: Option<&AuthUser>, action: Action, account: &Account) -> bool;
}

/// Authenticated users read and create; only staff update or delete.
///
/// The object-level owner rule for mutations is kept even though the
/// action-level gate already refuses non-staff mutations.
#[derive(Clone, Copy, Debug, Default)]
pub struct IsAccountOwnerOrAdmin;

impl AccessPolicy for IsAccountOwnerOrAdmin {
    fn has_permission(&self, user: Option<&AuthUser>, action: Action) -> bool {
        let Some(user) = user else { return false };
        match action {
            Action::List | Action::Retrieve | Action::Create => true,
            Action::Update | Action::PartialUpdate | Action::Destroy => user.is_staff,
        }
    }

    fn has_object_permission(&self, user: Option<&AuthUser>, action: Action, account: &Account) -> bool {
        let Some(user) = user else { return false };
        if user.is_staff || action.is_safe() {
            return true;
        }
        account.is_owned_by(user.id)
    }
}

fn denied(user: Option<&AuthUser>) -> ServiceError {
    match user {
        None => ServiceError::not_authenticated(),
        Some(_) => ServiceError::permission_denied(),
    }
}

pub fn authorize(policy: &dyn AccessPolicy, user: Option<&AuthUser>, action: Action) -> Result<(), ServiceError> {
    if policy.has_permission(user, action) { Ok(()) } else { Err(denied(user)) }
}

pub fn authorize_object(
    policy: &dyn AccessPolicy,
    user: Option<&AuthUser>,
    action: Action,
    account: &Account,
) -> Result<(), ServiceError> {
    if policy.has_object_permission(user, action, account) { Ok(()) } else { Err(denied(user)) }
}

/// Gate for endpoints that only need a logged-in user.
pub fn require_authenticated(user: Option<&AuthUser>) -> Result<&AuthUser, ServiceError> {
    user.ok_or_else(ServiceError::not_authenticated)
}
