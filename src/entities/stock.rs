//! Stock entity - Countable inventory for one `(type, year, month)` key.
//!
//! `quantity` is sellable, `reserved` is held by open orders and `sold` is
//! delivered. `initial_quantity` only ever grows.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::{Month, ProductType};

/// Stock database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Group or channel
    pub product_type: ProductType,
    /// Product year
    pub year: i32,
    /// Product month
    pub month: Month,
    /// Units currently sellable
    pub quantity: i64,
    /// Units ever added
    pub initial_quantity: i64,
    /// Units delivered
    pub sold: i64,
    /// Units held by open orders
    pub reserved: i64,
    /// Admin that created the record
    pub added_by: i64,
    /// When the record was created
    pub added_at: DateTimeUtc,
    /// Admin that last changed the record
    pub last_updated_by: Option<i64>,
    /// When an admin last changed the record
    pub last_updated_at: Option<DateTimeUtc>,
    /// Timestamped admin notes, one per line
    pub notes: Option<String>,
}

/// Stock has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
