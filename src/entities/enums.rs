//! String-backed enums shared by several entities.
//!
//! Each enum is stored as its lowercase (or canonical month) name so the
//! sqlite file stays readable from the command line.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::Error;

/// Kind of product sold by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum ProductType {
    /// A group
    #[sea_orm(string_value = "group")]
    Group,
    /// A channel
    #[sea_orm(string_value = "channel")]
    Channel,
}

impl ProductType {
    /// Lowercase name as stored.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::Channel => "channel",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "group" => Ok(Self::Group),
            "channel" => Ok(Self::Channel),
            other => Err(Error::Validation {
                message: format!("Unknown product type '{other}'"),
            }),
        }
    }
}

/// Calendar month, stored by its English name.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[allow(missing_docs)]
pub enum Month {
    #[sea_orm(string_value = "January")]
    January,
    #[sea_orm(string_value = "February")]
    February,
    #[sea_orm(string_value = "March")]
    March,
    #[sea_orm(string_value = "April")]
    April,
    #[sea_orm(string_value = "May")]
    May,
    #[sea_orm(string_value = "June")]
    June,
    #[sea_orm(string_value = "July")]
    July,
    #[sea_orm(string_value = "August")]
    August,
    #[sea_orm(string_value = "September")]
    September,
    #[sea_orm(string_value = "October")]
    October,
    #[sea_orm(string_value = "November")]
    November,
    #[sea_orm(string_value = "December")]
    December,
}

impl Month {
    /// All twelve months in calendar order.
    pub const ALL: [Self; 12] = [
        Self::January,
        Self::February,
        Self::March,
        Self::April,
        Self::May,
        Self::June,
        Self::July,
        Self::August,
        Self::September,
        Self::October,
        Self::November,
        Self::December,
    ];

    /// Canonical English name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::January => "January",
            Self::February => "February",
            Self::March => "March",
            Self::April => "April",
            Self::May => "May",
            Self::June => "June",
            Self::July => "July",
            Self::August => "August",
            Self::September => "September",
            Self::October => "October",
            Self::November => "November",
            Self::December => "December",
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Month {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::Validation {
                message: format!("Unknown month '{wanted}'"),
            })
    }
}

/// What a wallet transaction did to the balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum TransactionKind {
    /// External funds credited (after admin approval)
    #[sea_orm(string_value = "deposit")]
    Deposit,
    /// Order payment debited
    #[sea_orm(string_value = "purchase")]
    Purchase,
    /// Order payment returned
    #[sea_orm(string_value = "refund")]
    Refund,
    /// Manual correction, may be negative
    #[sea_orm(string_value = "admin_adjustment")]
    AdminAdjustment,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Deposit => "Deposit",
            Self::Purchase => "Purchase",
            Self::Refund => "Refund",
            Self::AdminAdjustment => "Adjustment",
        })
    }
}

/// Lifecycle of a wallet transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum TransactionStatus {
    /// Awaiting an admin decision (deposits only)
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Applied to the balance
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Withdrawn before completion
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    /// Refused by an admin
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl TransactionStatus {
    /// Whether the entry can no longer change state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Rejected => "rejected",
        })
    }
}

/// Fulfilment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum OrderStatus {
    /// Paid, stock reserved, not yet handled
    #[sea_orm(string_value = "pending")]
    Pending,
    /// An admin is working on it
    #[sea_orm(string_value = "processing")]
    Processing,
    /// Delivered, reserved stock converted to sold
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Cancelled, stock returned and payment refunded
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    /// Fully refunded
    #[sea_orm(string_value = "refunded")]
    Refunded,
}

impl OrderStatus {
    /// Statuses that still hold a stock reservation.
    #[must_use]
    pub const fn holds_reservation(self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }

    /// Forward-only transitions reachable through a plain status update.
    ///
    /// `Refunded` is only reachable through the refund path.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing | Self::Completed | Self::Cancelled)
                | (Self::Processing, Self::Completed | Self::Cancelled)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        })
    }
}

/// Payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum PaymentStatus {
    /// Debited from the wallet
    #[sea_orm(string_value = "paid")]
    Paid,
    /// Whole total returned
    #[sea_orm(string_value = "refunded")]
    Refunded,
    /// Part of the total returned
    #[sea_orm(string_value = "partially_refunded")]
    PartiallyRefunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Paid => "paid",
            Self::Refunded => "refunded",
            Self::PartiallyRefunded => "partially refunded",
        })
    }
}
