//! Pricing entity - Price override for one `(type, year, month)` key.
//!
//! When no active override exists the configured per-type default applies.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::{Month, ProductType};

/// Pricing database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pricing")]
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
    /// Unit price in USDT
    pub price: f64,
    /// Inactive overrides fall back to the default price
    pub is_active: bool,
    /// Admin that created the override
    pub set_by: i64,
    /// When the override was created
    pub set_at: DateTimeUtc,
    /// Admin that last changed the override
    pub last_updated_by: Option<i64>,
    /// When the override last changed
    pub last_updated_at: Option<DateTimeUtc>,
    /// Timestamped admin notes, one per line
    pub notes: Option<String>,
}

/// Pricing has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
