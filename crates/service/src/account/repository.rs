use async_trait::async_trait;
use uuid::Uuid;

use common::pagination::{Page, Pagination};
use models::account_query::{AccountOrdering, AccountQuery};

use super::domain::Account;
use crate::errors::ServiceError;

/// Persistence seam for accounts.
///
/// `insert` and `save` are atomic; a store-level uniqueness violation on
/// `account_number` surfaces as the same field error the pre-check yields.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Every record, newest first.
    async fn all(&self) -> Result<Vec<Account>, ServiceError>;
    async fn find(
        &self,
        query: &AccountQuery,
        ordering: &AccountOrdering,
        page: Pagination,
    ) -> Result<Page<Account>, ServiceError>;
    async fn get(&self, id: Uuid) -> Result<Option<Account>, ServiceError>;
    async fn account_number_taken(&self, number: &str, exclude: Option<Uuid>) -> Result<bool, ServiceError>;
    async fn insert(&self, account: Account) -> Result<Account, ServiceError>;
    async fn save(&self, account: Account) -> Result<Account, ServiceError>;
}

/// In-memory repository for tests and doc examples.
pub mod memory {
    use std::collections::HashMap;

    use tokio::sync::RwLock;

    use common::pagination::resolve_page;

    use super::*;
    use crate::account::validation::ACCOUNT_NUMBER_TAKEN;

    #[derive(Default)]
    pub struct InMemoryAccountRepository {
        rows: RwLock<HashMap<Uuid, Account>>,
    }

    impl InMemoryAccountRepository {
        pub fn new() -> Self { Self::default() }

        fn number_clash(rows: &HashMap<Uuid, Account>, account: &Account) -> bool {
            let Some(number) = account.account_number.as_deref() else { return false };
            rows.values()
                .any(|r| r.id != account.id && r.account_number.as_deref() == Some(number))
        }
    }

    #[async_trait]
    impl AccountRepository for InMemoryAccountRepository {
        async fn all(&self) -> Result<Vec<Account>, ServiceError> {
            let mut rows: Vec<Account> = self.rows.read().await.values().cloned().collect();
            AccountOrdering::default().sort(&mut rows);
            Ok(rows)
        }

        async fn find(
            &self,
            query: &AccountQuery,
            ordering: &AccountOrdering,
            page: Pagination,
        ) -> Result<Page<Account>, ServiceError> {
            let mut hits: Vec<Account> = self
                .rows
                .read()
                .await
                .values()
                .filter(|m| query.matches(m))
                .cloned()
                .collect();
            ordering.sort(&mut hits);
            let total = hits.len() as u64;
            let resolved = resolve_page(page, total)?;
            let start = ((resolved.page - 1) * resolved.per_page) as usize;
            let items = hits.into_iter().skip(start).take(resolved.per_page as usize).collect();
            Ok(Page { items, total, page: resolved.page, per_page: resolved.per_page })
        }

        async fn get(&self, id: Uuid) -> Result<Option<Account>, ServiceError> {
            Ok(self.rows.read().await.get(&id).cloned())
        }

        async fn account_number_taken(&self, number: &str, exclude: Option<Uuid>) -> Result<bool, ServiceError> {
            Ok(self
                .rows
                .read()
                .await
                .values()
                .any(|r| Some(r.id) != exclude && r.account_number.as_deref() == Some(number)))
        }

        async fn insert(&self, account: Account) -> Result<Account, ServiceError> {
            let mut rows = self.rows.write().await;
            if rows.contains_key(&account.id) {
                return Err(ServiceError::Db(format!("duplicate key: account {}", account.id)));
            }
            if Self::number_clash(&rows, &account) {
                return Err(ServiceError::field("account_number", ACCOUNT_NUMBER_TAKEN));
            }
            rows.insert(account.id, account.clone());
            Ok(account)
        }

        async fn save(&self, account: Account) -> Result<Account, ServiceError> {
            let mut rows = self.rows.write().await;
            if !rows.contains_key(&account.id) {
                return Err(ServiceError::not_found());
            }
            if Self::number_clash(&rows, &account) {
                return Err(ServiceError::field("account_number", ACCOUNT_NUMBER_TAKEN));
            }
            rows.insert(account.id, account.clone());
            Ok(account)
        }
    }
}
