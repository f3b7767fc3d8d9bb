//! Create `account` table with FKs to `user`.
//!
//! `owner_user` is RESTRICT so a user cannot be removed while owning accounts;
//! the audit columns fall back to NULL when their user goes away.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Account::Table)
                    .if_not_exists()
                    .col(uuid(Account::Id).primary_key())
                    .col(string_len(Account::Name, 255))
                    .col(string_len_null(Account::AccountNumber, 50).unique_key())
                    .col(string_len(Account::Status, 20).default("prospect"))
                    .col(string_len(Account::Type, 20).default("customer"))
                    .col(string_len_null(Account::Industry, 100))
                    .col(string_len_null(Account::CompanySize, 20))
                    .col(decimal_len_null(Account::AnnualRevenue, 20, 2))
                    .col(string_len_null(Account::Website, 200))
                    .col(text_null(Account::Description))
                    .col(uuid_null(Account::OwnerUser))
                    .col(timestamp_with_time_zone(Account::CreatedAt))
                    .col(timestamp_with_time_zone(Account::UpdatedAt))
                    .col(uuid_null(Account::CreatedBy))
                    .col(uuid_null(Account::UpdatedBy))
                    .col(boolean(Account::IsInvalid).default(false))
                    .col(string_len_null(Account::BillingStreet, 255))
                    .col(string_len_null(Account::BillingCity, 100))
                    .col(string_len_null(Account::BillingState, 100))
                    .col(string_len_null(Account::BillingCountry, 100))
                    .col(string_len_null(Account::BillingPostalCode, 20))
                    .col(string_len_null(Account::ShippingStreet, 255))
                    .col(string_len_null(Account::ShippingCity, 100))
                    .col(string_len_null(Account::ShippingState, 100))
                    .col(string_len_null(Account::ShippingCountry, 100))
                    .col(string_len_null(Account::ShippingPostalCode, 20))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_account_owner_user")
                            .from(Account::Table, Account::OwnerUser)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_account_created_by")
                            .from(Account::Table, Account::CreatedBy)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_account_updated_by")
                            .from(Account::Table, Account::UpdatedBy)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Account::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Account {
    Table,
    Id,
    Name,
    AccountNumber,
    Status,
    Type,
    Industry,
    CompanySize,
    AnnualRevenue,
    Website,
    Description,
    OwnerUser,
    CreatedAt,
    UpdatedAt,
    CreatedBy,
    UpdatedBy,
    IsInvalid,
    BillingStreet,
    BillingCity,
    BillingState,
    BillingCountry,
    BillingPostalCode,
    ShippingStreet,
    ShippingCity,
    ShippingState,
    ShippingCountry,
    ShippingPostalCode,
}

#[derive(DeriveIden)]
enum User { Table, Id }
