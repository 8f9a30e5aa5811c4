use sea_orm_migration::prelude::*;

use crate::NonBlockingLock;

const IDX_RENEWED_ON: &str = "idx_non_blocking_lock_renewed_on";
const IDX_EXPIRES_ON: &str = "idx_non_blocking_lock_expires_on";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name(IDX_RENEWED_ON)
                    .table(NonBlockingLock::Table)
                    .col(NonBlockingLock::RenewedOn)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(IDX_EXPIRES_ON)
                    .table(NonBlockingLock::Table)
                    .col(NonBlockingLock::ExpiresOn)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name(IDX_EXPIRES_ON)
                    .table(NonBlockingLock::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name(IDX_RENEWED_ON)
                    .table(NonBlockingLock::Table)
                    .to_owned(),
            )
            .await
    }
}
