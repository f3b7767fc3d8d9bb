use anyhow::Result;
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, TransactionTrait};

use super::setup_test_db;
use crate::account;

#[tokio::test]
async fn test_transaction_commit() -> Result<()> {
    let Some(db) = setup_test_db().await? else { return Ok(()) };

    let txn = db.begin().await?;
    let m = account::Model::new_blank("Committed", chrono::Utc::now().into());
    let saved = m.into_active_model().reset_all().insert(&txn).await?;
    txn.commit().await?;

    assert!(account::Entity::find_by_id(saved.id).one(&db).await?.is_some());
    account::Entity::delete_by_id(saved.id).exec(&db).await?;
    Ok(())
}

#[tokio::test]
async fn test_transaction_rollback() -> Result<()> {
    let Some(db) = setup_test_db().await? else { return Ok(()) };

    let txn = db.begin().await?;
    let m = account::Model::new_blank("Rolled back", chrono::Utc::now().into());
    let saved = m.into_active_model().reset_all().insert(&txn).await?;
    txn.rollback().await?;

    assert!(account::Entity::find_by_id(saved.id).one(&db).await?.is_none());
    Ok(())
}
