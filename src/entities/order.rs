//! Order entity - A purchase snapshot.
//!
//! Unit price and total are frozen at checkout. The order joins the wallet debit
//! (a `purchase` transaction) with the stock reservation for the same
//! `(product_type, year, month)` key.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::{Month, OrderStatus, PaymentStatus, ProductType};

/// Order database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Unique identifier for the order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Buyer
    #[sea_orm(indexed)]
    pub user_id: i64,
    /// Group or channel
    pub product_type: ProductType,
    /// Product month
    pub month: Month,
    /// Product year
    pub year: i32,
    /// Number of units (at least 1)
    pub quantity: i64,
    /// Price of one unit at checkout
    pub price_per_unit: f64,
    /// `price_per_unit * quantity`, frozen at checkout
    pub total_price: f64,
    /// Username the product should be delivered to
    pub target_username: String,
    /// Fulfilment status
    pub status: OrderStatus,
    /// Payment status
    pub payment_status: PaymentStatus,
    /// Cumulative amount refunded so far
    pub refund_amount: f64,
    /// Reason given for the latest refund
    pub refund_reason: Option<String>,
    /// Timestamped admin notes, one per line
    pub admin_notes: Option<String>,
    /// When the order was placed
    pub created_at: DateTimeUtc,
    /// When the order last changed
    pub updated_at: DateTimeUtc,
    /// When the order was completed
    pub completed_at: Option<DateTimeUtc>,
    /// When the order was cancelled
    pub cancelled_at: Option<DateTimeUtc>,
    /// When the latest refund happened
    pub refunded_at: Option<DateTimeUtc>,
}

/// Defines relationships between Order and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each order belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// Payment and refund entries
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
