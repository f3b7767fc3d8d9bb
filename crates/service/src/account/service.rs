use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use common::pagination::{Page, Pagination};
use models::account_query::{AccountOrdering, AccountQuery};

use super::domain::{Account, AccountChanges, NewAccount};
use super::repository::AccountRepository;
use super::validation::REQUIRED;
use crate::errors::ServiceError;

/// Account business operations independent of the web framework.
///
/// Every mutation stamps the audit columns from the acting user and is
/// persisted atomically by the repository.
pub struct AccountService {
    repo: Arc<dyn AccountRepository>,
}

impl AccountService {
    pub fn new(repo: Arc<dyn AccountRepository>) -> Self { Self { repo } }

    pub fn repository(&self) -> &dyn AccountRepository { self.repo.as_ref() }

    /// All accounts, unfiltered.
    pub async fn list(&self) -> Result<Vec<Account>, ServiceError> {
        self.repo.all().await
    }

    /// One page of accounts matching `query`.
    pub async fn list_filtered(
        &self,
        query: &AccountQuery,
        ordering: &AccountOrdering,
        pagination: Pagination,
    ) -> Result<Page<Account>, ServiceError> {
        self.repo.find(query, ordering, pagination).await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<Account, ServiceError> {
        self.repo.get(id).await?.ok_or_else(ServiceError::not_found)
    }

    /// Create an account owned by and attributed to `actor`.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use service::account::{AccountFields, AccountService, NewAccount};
    /// use service::account::repository::memory::InMemoryAccountRepository;
    /// let svc = AccountService::new(Arc::new(InMemoryAccountRepository::new()));
    /// let actor = uuid::Uuid::new_v4();
    /// let fields = AccountFields { name: Some("Acme Corp".into()), ..Default::default() };
    /// let acc = tokio_test::block_on(svc.create(NewAccount::from(fields), actor)).unwrap();
    /// assert_eq!(acc.owner_user, Some(actor));
    /// assert_eq!(acc.created_by, Some(actor));
    /// ```
    #[instrument(skip(self, input), fields(actor = %actor))]
    pub async fn create(&self, input: NewAccount, actor: Uuid) -> Result<Account, ServiceError> {
        if input.owner_user.is_some() {
            return Err(ServiceError::Conflict("owner_user is set from the requesting user and cannot be supplied".into()));
        }
        if input.created_by.is_some() {
            return Err(ServiceError::Conflict("created_by is set from the requesting user and cannot be supplied".into()));
        }
        let Some(name) = input.fields.name.clone() else {
            return Err(ServiceError::field("name", REQUIRED));
        };

        let mut account = Account::new_blank(name, Utc::now().into());
        input.fields.apply_to(&mut account);
        account.owner_user = Some(actor);
        account.created_by = Some(actor);
        account.updated_by = None;

        let created = self.repo.insert(account).await?;
        info!(account_id = %created.id, "account_created");
        Ok(created)
    }

    /// Apply allow-listed changes. `id`, `created_at`, `created_by` and
    /// `owner_user` in `changes` are dropped without error.
    #[instrument(skip(self, account, changes), fields(account_id = %account.id, actor = %actor))]
    pub async fn update(&self, account: Account, changes: AccountChanges, actor: Uuid) -> Result<Account, ServiceError> {
        let AccountChanges { id, created_at, created_by, owner_user, fields } = changes;
        if id.is_some() || created_at.is_some() || created_by.is_some() {
            debug!("ignoring immutable keys in update payload");
        }
        if owner_user.is_some() {
            debug!("ignoring owner_user in update payload");
        }

        let mut account = account;
        fields.apply_to(&mut account);
        account.updated_by = Some(actor);
        account.updated_at = Utc::now().into();

        let saved = self.repo.save(account).await?;
        info!("account_updated");
        Ok(saved)
    }

    /// Mark the account invalid. Repeating the call is a no-op success.
    #[instrument(skip(self, account), fields(account_id = %account.id, actor = %actor))]
    pub async fn soft_delete(&self, account: Account, actor: Uuid) -> Result<Account, ServiceError> {
        let mut account = account;
        account.is_invalid = true;
        account.updated_by = Some(actor);
        account.updated_at = Utc::now().into();
        let saved = self.repo.save(account).await?;
        info!("account_soft_deleted");
        Ok(saved)
    }
}
