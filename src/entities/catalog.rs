//! Catalog entity - Which months of a `(type, year)` are offered.
//!
//! The months themselves live in `catalog_months` so a month can be switched
//! off without losing the link from older orders.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::ProductType;

/// Catalog database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "catalogs")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Group or channel
    pub product_type: ProductType,
    /// Product year
    pub year: i32,
    /// Inactive catalogs are hidden from the shop
    pub is_active: bool,
    /// Admin that created the catalog
    pub added_by: i64,
    /// When the catalog was created
    pub added_at: DateTimeUtc,
    /// Admin that last changed the catalog
    pub last_updated_by: Option<i64>,
    /// When the catalog last changed
    pub last_updated_at: Option<DateTimeUtc>,
}

/// Defines relationships between Catalog and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One catalog lists many months
    #[sea_orm(has_many = "super::catalog_month::Entity")]
    Months,
}

impl Related<super::catalog_month::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Months.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
