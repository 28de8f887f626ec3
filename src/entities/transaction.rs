//! Transaction entity - One entry of a user's wallet ledger.
//!
//! This table is the only record of wallet history. `balance_before` and
//! `balance_after` are filled in when the entry touches the balance, so a pending
//! deposit carries neither until an admin approves it.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::{TransactionKind, TransactionStatus};

/// Transaction database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning user
    #[sea_orm(indexed)]
    pub user_id: i64,
    /// What the entry does to the balance
    pub kind: TransactionKind,
    /// Amount in USDT; only `admin_adjustment` may be negative
    pub amount: f64,
    /// Lifecycle state
    pub status: TransactionStatus,
    /// Balance before the entry was applied
    pub balance_before: Option<f64>,
    /// Balance after the entry was applied
    pub balance_after: Option<f64>,
    /// Order this entry pays for or refunds
    pub order_id: Option<i64>,
    /// Human-readable description
    pub description: String,
    /// Free-form reference or admin note
    pub reference: Option<String>,
    /// When the entry was created
    pub created_at: DateTimeUtc,
    /// When the entry last changed state
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Transaction and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each transaction belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// Purchase and refund entries point at their order
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
