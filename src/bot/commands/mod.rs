//! Slash command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Admin commands (deposits, stock, pricing, catalog, orders, users)
pub mod admin;

/// General commands (start, help, language, membership)
pub mod general;

/// Shop commands (browse, buy, orders)
pub mod shop;

/// Support chat commands
pub mod support;

/// Wallet and deposit commands
pub mod wallet;

use crate::{
    bot::BotData,
    core::stock::ProductKey,
    entities::{Month, ProductType},
    errors::{Error, Result},
};

// Export commands
pub use admin::*;
pub use general::*;
pub use shop::*;
pub use support::*;
pub use wallet::*;

/// Product type as offered in command menus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum ProductChoice {
    /// A group
    #[name = "Group"]
    Group,
    /// A channel
    #[name = "Channel"]
    Channel,
}

impl From<ProductChoice> for ProductType {
    fn from(choice: ProductChoice) -> Self {
        match choice {
            ProductChoice::Group => Self::Group,
            ProductChoice::Channel => Self::Channel,
        }
    }
}

/// Deposit network as offered in command menus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum NetworkChoice {
    /// USDT on Tron
    #[name = "TRC20 (Tron)"]
    Trc20,
    /// USDT on BNB Smart Chain
    #[name = "BEP20 (BSC)"]
    Bep20,
}

impl From<NetworkChoice> for crate::core::conversation::Network {
    fn from(choice: NetworkChoice) -> Self {
        match choice {
            NetworkChoice::Trc20 => Self::Trc20,
            NetworkChoice::Bep20 => Self::Bep20,
        }
    }
}

/// Builds a product key from command arguments.
pub(crate) fn product_key(product_type: ProductChoice, year: i32, month: &str) -> Result<ProductKey> {
    Ok(ProductKey::new(product_type.into(), year, month.parse()?))
}

/// Parses a comma or space separated month list such as `January, March`.
pub(crate) fn parse_months(input: &str) -> Result<Vec<Month>> {
    input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect()
}

/// Every command the bot registers.
#[must_use]
pub fn all() -> Vec<poise::Command<BotData, Error>> {
    vec![
        general::start(),
        general::help(),
        general::language(),
        general::check_membership(),
        shop::shop(),
        shop::product(),
        shop::buy(),
        shop::orders(),
        shop::cancel_order(),
        wallet::wallet(),
        wallet::history(),
        wallet::deposit(),
        wallet::deposit_network(),
        wallet::deposit_proof(),
        wallet::deposit_cancel(),
        support::support(),
        support::support_message(),
        support::support_end(),
        admin::admin(),
    ]
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_months() {
        assert_eq!(
            parse_months("January, march  December").unwrap(),
            vec![Month::January, Month::March, Month::December]
        );
        assert!(parse_months("January, Smarch").is_err());
        assert!(parse_months(" , ").unwrap().is_empty());
    }

    #[test]
    fn test_product_key() {
        let key = product_key(ProductChoice::Channel, 2024, "may").unwrap();
        assert_eq!(key, ProductKey::new(ProductType::Channel, 2024, Month::May));
    }
}
