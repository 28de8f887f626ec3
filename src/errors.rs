//! Unified error types for the storefront.
//!
//! Ledger and catalog operations raise the typed variants below; the bot layer
//! catches them at the command boundary, logs them and turns them into a short
//! user-facing message via [`Error::user_message`].

use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description of the problem
        message: String,
    },

    /// Storage layer failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Required environment variable missing
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// I/O failure (config file etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serenity/Poise transport failure
    #[error("Serenity/Poise framework error: {0}")]
    Framework(Box<poise::serenity_prelude::Error>),

    /// Integer conversion failure
    #[error("Integer conversion error: {0}")]
    TryFromInt(#[from] std::num::TryFromIntError),

    /// No user with this id
    #[error("User not found: {user_id}")]
    UserNotFound {
        /// Internal or external id that was looked up
        user_id: String,
    },

    /// No wallet transaction with this id (for this user)
    #[error("Transaction not found: {transaction_id}")]
    TransactionNotFound {
        /// Transaction id that was looked up
        transaction_id: i64,
    },

    /// No order with this id
    #[error("Order not found: {order_id}")]
    OrderNotFound {
        /// Order id that was looked up
        order_id: i64,
    },

    /// No stock record for this key
    #[error("Stock not found: {key}")]
    StockNotFound {
        /// Rendered `(type, year, month)` key
        key: String,
    },

    /// No catalog for this key
    #[error("Catalog not found: {key}")]
    CatalogNotFound {
        /// Rendered `(type, year)` key
        key: String,
    },

    /// No pricing override for this key
    #[error("Pricing not found: {key}")]
    PricingNotFound {
        /// Rendered `(type, year, month)` key
        key: String,
    },

    /// The requested product is not offered by the catalog
    #[error("Product not found: {key}")]
    ProductNotFound {
        /// Rendered `(type, year, month)` key
        key: String,
    },

    /// Operation not allowed in the record's current state
    #[error("Invalid state: {message}")]
    InvalidState {
        /// What was attempted and why it is not allowed
        message: String,
    },

    /// Wallet balance too low
    #[error("Insufficient funds: balance {current:.2}, required {required:.2}")]
    InsufficientFunds {
        /// Current balance
        current: f64,
        /// Amount that was needed
        required: f64,
    },

    /// Not enough sellable units
    #[error("Insufficient stock: {available} available, {requested} requested")]
    InsufficientStock {
        /// Units currently sellable
        available: i64,
        /// Units requested
        requested: i64,
    },

    /// Not enough reserved units to confirm or return
    #[error("Insufficient reserved stock: {reserved} reserved, {requested} requested")]
    InsufficientReserved {
        /// Units currently reserved
        reserved: i64,
        /// Units requested
        requested: i64,
    },

    /// Amount is zero, negative, non-finite or below a configured minimum
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// Offending amount
        amount: f64,
    },

    /// Quantity out of range
    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity {
        /// Offending quantity
        quantity: i64,
    },

    /// Any other rejected input (unknown month, empty username, ...)
    #[error("Validation error: {message}")]
    Validation {
        /// What failed validation
        message: String,
    },
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Framework(Box::new(value))
    }
}

impl Error {
    /// True for every "referenced record is absent" variant.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound { .. }
                | Self::TransactionNotFound { .. }
                | Self::OrderNotFound { .. }
                | Self::StockNotFound { .. }
                | Self::CatalogNotFound { .. }
                | Self::PricingNotFound { .. }
                | Self::ProductNotFound { .. }
        )
    }

    /// True for infrastructure failures, as opposed to rejected requests.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Config { .. }
                | Self::Database(_)
                | Self::EnvVar(_)
                | Self::Io(_)
                | Self::Framework(_)
                | Self::TryFromInt(_)
        )
    }

    /// Short message suitable for showing to a chat user.
    ///
    /// Domain errors are rendered as-is; infrastructure errors collapse into a
    /// generic failure so storage details never leak into the chat.
    #[must_use]
    pub fn user_message(&self) -> String {
        if self.is_internal() {
            "❌ An error occurred. Please try again later.".to_string()
        } else {
            format!("❌ {self}")
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
