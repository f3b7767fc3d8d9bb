use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Account: owner lookups, status filter, soft-delete filter
        manager
            .create_index(
                Index::create()
                    .name("idx_account_owner_user")
                    .table(Account::Table)
                    .col(Account::OwnerUser)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_account_status")
                    .table(Account::Table)
                    .col(Account::Status)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_account_is_invalid")
                    .table(Account::Table)
                    .col(Account::IsInvalid)
                    .to_owned(),
            )
            .await?;

        // Default list ordering is newest first
        manager
            .create_index(
                Index::create()
                    .name("idx_account_created_at")
                    .table(Account::Table)
                    .col(Account::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for name in ["idx_account_owner_user", "idx_account_status", "idx_account_is_invalid", "idx_account_created_at"] {
            manager
                .drop_index(Index::drop().name(name).table(Account::Table).to_owned())
                .await?;
        }
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Account { Table, OwnerUser, Status, IsInvalid, CreatedAt }
