//! User entity - A chat user known to the store.
//!
//! Users are created on first contact and never deleted. The wallet counters
//! (`balance`, `total_deposited`, `total_spent`) live on this row and are only
//! mutated together with a `transactions` row by the wallet ledger.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Internal identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Opaque chat platform user id
    #[sea_orm(unique)]
    pub external_id: String,
    /// Platform username, if any
    pub username: Option<String>,
    /// Display name
    pub display_name: String,
    /// Preferred language code (e.g. `"en"`)
    pub language: String,
    /// Spendable balance in USDT
    pub balance: f64,
    /// Sum of approved deposits
    pub total_deposited: f64,
    /// Sum of purchases minus refunds
    pub total_spent: f64,
    /// Whether the user may use admin commands
    pub is_admin: bool,
    /// Blocked users are refused by every command
    pub is_blocked: bool,
    /// Cached result of the required-channel membership check
    pub joined_channels: bool,
    /// Whether a support session is open
    pub support_active: bool,
    /// When the current support session was opened
    pub support_started_at: Option<DateTimeUtc>,
    /// Last message within the current support session
    pub support_last_message_at: Option<DateTimeUtc>,
    /// When the user first contacted the bot
    pub registered_at: DateTimeUtc,
    /// Last time the user issued a command
    pub last_activity: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user has many wallet transactions
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
    /// One user has many orders
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
