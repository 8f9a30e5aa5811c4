use sea_orm_migration::prelude::*;

use crate::NonBlockingLock;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(NonBlockingLock::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(NonBlockingLock::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    // One row per object; expired rows are superseded on acquire
                    .col(
                        ColumnDef::new(NonBlockingLock::LockedObject)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(NonBlockingLock::CreatedOn)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NonBlockingLock::RenewedOn)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NonBlockingLock::ExpiresOn)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(NonBlockingLock::MaxAge).big_integer().null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(NonBlockingLock::Table).to_owned())
            .await
    }
}
