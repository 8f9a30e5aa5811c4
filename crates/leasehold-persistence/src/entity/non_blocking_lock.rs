//! Non-blocking lock entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "non_blocking_lock")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub locked_object: String,
    #[sea_orm(column_type = "TimestampWithTimeZone")]
    pub created_on: DateTimeUtc,
    #[sea_orm(column_type = "TimestampWithTimeZone", indexed)]
    pub renewed_on: DateTimeUtc,
    #[sea_orm(column_type = "TimestampWithTimeZone", nullable, indexed)]
    pub expires_on: Option<DateTimeUtc>,
    pub max_age: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
