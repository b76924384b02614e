//! Adds the covering index for settlement candidate scans.
//!
//! `settle_debt` walks a debtor's unsettled splits oldest-first; without this
//! index the scan degrades to a full table walk once groups accumulate
//! history.

use sea_orm_migration::prelude::*;

use crate::m20260512_000000_init::ExpenseSplits;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("idx-expense_splits-user_id-settled-created_at")
                    .table(ExpenseSplits::Table)
                    .col(ExpenseSplits::UserId)
                    .col(ExpenseSplits::Settled)
                    .col(ExpenseSplits::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx-expense_splits-user_id-settled-created_at")
                    .table(ExpenseSplits::Table)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}
