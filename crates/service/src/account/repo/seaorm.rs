use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, SqlErr, TransactionTrait,
};
use tracing::warn;
use uuid::Uuid;

use common::pagination::{resolve_page, Page, Pagination};
use models::account::{ActiveModel, Column, Entity};
use models::account_query::{AccountOrdering, AccountQuery};

use crate::account::domain::Account;
use crate::account::repository::AccountRepository;
use crate::account::validation::ACCOUNT_NUMBER_TAKEN;
use crate::errors::ServiceError;

pub struct SeaOrmAccountRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmAccountRepository {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }
}

fn map_write_err(e: DbErr) -> ServiceError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            warn!(%detail, "account_number unique index rejected write");
            ServiceError::field("account_number", ACCOUNT_NUMBER_TAKEN)
        }
        _ => match e {
            DbErr::RecordNotUpdated | DbErr::RecordNotFound(_) => ServiceError::not_found(),
            other => ServiceError::Db(other.to_string()),
        },
    }
}

#[async_trait]
impl AccountRepository for SeaOrmAccountRepository {
    async fn all(&self) -> Result<Vec<Account>, ServiceError> {
        let rows = Entity::find()
            .order_by_desc(Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(rows)
    }

    async fn find(
        &self,
        query: &AccountQuery,
        ordering: &AccountOrdering,
        page: Pagination,
    ) -> Result<Page<Account>, ServiceError> {
        let (_, per_page) = page.normalize();
        let paginator = ordering.apply(query.select()).paginate(&self.db, per_page);
        let total = paginator.num_items().await?;
        let resolved = resolve_page(page, total)?;
        // fetch_page is 0-based
        let items = paginator.fetch_page(resolved.page - 1).await?;
        Ok(Page { items, total, page: resolved.page, per_page: resolved.per_page })
    }

    async fn get(&self, id: Uuid) -> Result<Option<Account>, ServiceError> {
        Ok(Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn account_number_taken(&self, number: &str, exclude: Option<Uuid>) -> Result<bool, ServiceError> {
        let mut select = Entity::find().filter(Column::AccountNumber.eq(number));
        if let Some(id) = exclude {
            select = select.filter(Column::Id.ne(id));
        }
        Ok(select.count(&self.db).await? > 0)
    }

    async fn insert(&self, account: Account) -> Result<Account, ServiceError> {
        let txn = self.db.begin().await?;
        let saved = ActiveModel::from(account)
            .reset_all()
            .insert(&txn)
            .await
            .map_err(map_write_err)?;
        txn.commit().await?;
        Ok(saved)
    }

    async fn save(&self, account: Account) -> Result<Account, ServiceError> {
        let txn = self.db.begin().await?;
        let saved = ActiveModel::from(account)
            .reset_all()
            .update(&txn)
            .await
            .map_err(map_write_err)?;
        txn.commit().await?;
        Ok(saved)
    }
}
