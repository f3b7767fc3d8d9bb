use sea_orm::{entity::prelude::*, Set, ConnectionTrait, PaginatorTrait, QueryFilter, TransactionTrait};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::account;
use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    OwnedAccounts,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::OwnedAccounts => Entity::has_many(account::Entity).into(),
        }
    }
}

impl Related<account::Entity> for Entity {
    fn to() -> RelationDef { Relation::OwnedAccounts.def() }
}

impl ActiveModelBehavior for ActiveModel {}

/// Fields needed to insert a user.
#[derive(Clone, Debug, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

pub fn validate_username(username: &str) -> Result<(), ModelError> {
    let trimmed = username.trim();
    if trimmed.is_empty() { return Err(ModelError::Validation("username required".into())); }
    if trimmed.len() > 150 { return Err(ModelError::Validation("username too long (<=150)".into())); }
    Ok(())
}

/// Unsaved row for `input`; the username is trimmed.
pub fn build(input: NewUser) -> ActiveModel {
    let now = Utc::now().into();
    ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(input.username.trim().to_string()),
        email: Set(input.email),
        password_hash: Set(input.password_hash),
        is_staff: Set(input.is_staff),
        is_superuser: Set(input.is_superuser),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

pub async fn create<C: ConnectionTrait>(db: &C, input: NewUser) -> Result<Model, ModelError> {
    validate_username(&input.username)?;
    Ok(build(input).insert(db).await?)
}

pub async fn find_by_username<C: ConnectionTrait>(db: &C, username: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find().filter(Column::Username.eq(username)).one(db).await?)
}

/// Physically remove a user.
///
/// Refused while the user still owns accounts; audit references on
/// accounts are cleared by the `ON DELETE SET NULL` foreign keys.
pub async fn hard_delete(db: &DatabaseConnection, id: Uuid) -> Result<(), ModelError> {
    let txn = db.begin().await?;
    let owned = account::Entity::find()
        .filter(account::Column::OwnerUser.eq(id))
        .count(&txn)
        .await?;
    if owned > 0 {
        txn.rollback().await?;
        return Err(ModelError::Protected(format!("user {id} still owns {owned} account(s)")));
    }
    Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;
    Ok(())
}
