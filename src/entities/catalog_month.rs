//! Catalog month entity - One month entry of a catalog, soft-removable.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::Month;

/// Catalog month database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "catalog_months")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning catalog
    #[sea_orm(indexed)]
    pub catalog_id: i64,
    /// The month
    pub month: Month,
    /// Inactive months are no longer offered
    pub is_active: bool,
}

/// Defines relationships between `CatalogMonth` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each month belongs to one catalog
    #[sea_orm(
        belongs_to = "super::catalog::Entity",
        from = "Column::CatalogId",
        to = "super::catalog::Column::Id"
    )]
    Catalog,
}

impl Related<super::catalog::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Catalog.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
