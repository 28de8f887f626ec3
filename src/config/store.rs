//! Store configuration loading from config.toml
//!
//! Everything that is not a secret lives in `config.toml`: admin ids, the
//! communities users must join, deposit addresses and limits, default prices and
//! the support session timeout. The parsed [`AppConfig`] is built once at startup
//! and handed to every component through an `Arc`.

use crate::entities::ProductType;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Platform ids of users with admin rights
    #[serde(default)]
    pub admin_ids: Vec<u64>,
    /// Language used for new users
    #[serde(default = "default_language")]
    pub default_language: String,
    /// Supported language codes and their display names
    #[serde(default = "default_languages")]
    pub languages: BTreeMap<String, String>,
    /// Communities a user must join before using the store
    #[serde(default)]
    pub required_channels: Vec<RequiredChannel>,
    /// Deposit settings
    pub wallet: WalletConfig,
    /// Catalog and pricing settings
    #[serde(default)]
    pub shop: ShopConfig,
    /// Support chat settings
    #[serde(default)]
    pub support: SupportConfig,
}

/// A community users have to be a member of
#[derive(Debug, Clone, Deserialize)]
pub struct RequiredChannel {
    /// Platform id of the community
    pub id: u64,
    /// Display name
    pub title: String,
    /// Link shown to users who have not joined yet
    pub invite_link: String,
}

/// Deposit configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    /// Receiving address on Tron
    pub trc20_address: String,
    /// Receiving address on BNB Smart Chain
    pub bep20_address: String,
    /// Smallest accepted deposit in USDT
    #[serde(default = "default_min_deposit")]
    pub min_deposit: f64,
    /// Amounts offered as quick choices
    #[serde(default = "default_predefined_amounts")]
    pub predefined_amounts: Vec<f64>,
}

/// Shop configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ShopConfig {
    /// Years admins may create catalogs for
    #[serde(default = "default_available_years")]
    pub available_years: Vec<i32>,
    /// Prices used when no active override exists
    #[serde(default)]
    pub default_pricing: DefaultPricing,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            available_years: default_available_years(),
            default_pricing: DefaultPricing::default(),
        }
    }
}

/// Per-type fallback prices
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DefaultPricing {
    /// Default unit price for groups
    pub group: f64,
    /// Default unit price for channels
    pub channel: f64,
}

impl Default for DefaultPricing {
    fn default() -> Self {
        Self {
            group: 5.0,
            channel: 7.0,
        }
    }
}

impl DefaultPricing {
    /// Default unit price for a product type.
    #[must_use]
    pub const fn for_type(&self, product_type: ProductType) -> f64 {
        match product_type {
            ProductType::Group => self.group,
            ProductType::Channel => self.channel,
        }
    }
}

/// Support chat configuration
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SupportConfig {
    /// Idle time after which a support session closes
    #[serde(default = "default_support_timeout")]
    pub timeout_secs: u64,
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_support_timeout(),
        }
    }
}

fn default_language() -> String {
    "en".to_string()
}

fn default_languages() -> BTreeMap<String, String> {
    [
        ("en", "English"),
        ("id", "Indonesia"),
        ("zh", "China"),
        ("uz", "Uzbekistan"),
        ("ru", "Russia"),
    ]
    .into_iter()
    .map(|(code, name)| (code.to_string(), name.to_string()))
    .collect()
}

const fn default_min_deposit() -> f64 {
    1.0
}

fn default_predefined_amounts() -> Vec<f64> {
    vec![1.0, 10.0, 50.0, 100.0]
}

fn default_available_years() -> Vec<i32> {
    vec![2023, 2024]
}

const fn default_support_timeout() -> u64 {
    3600
}

impl AppConfig {
    /// Whether a platform user id belongs to an admin.
    #[must_use]
    pub fn is_admin_id(&self, platform_id: &str) -> bool {
        platform_id
            .parse::<u64>()
            .is_ok_and(|id| self.admin_ids.contains(&id))
    }

    /// Whether a language code is supported.
    #[must_use]
    pub fn supports_language(&self, code: &str) -> bool {
        self.languages.contains_key(code)
    }

    /// Checks values serde cannot check on its own.
    ///
    /// # Errors
    /// Returns `Error::Config` for a zero platform id, a non-positive minimum
    /// deposit, a negative default price or a default language missing from
    /// `languages`.
    pub fn validate(&self) -> Result<()> {
        // Platform ids are never zero.
        if self.admin_ids.contains(&0) {
            return Err(Error::Config {
                message: "admin_ids cannot contain 0".to_string(),
            });
        }
        if let Some(channel) = self.required_channels.iter().find(|c| c.id == 0) {
            return Err(Error::Config {
                message: format!("required_channels entry '{}' has id 0", channel.title),
            });
        }

        if !self.wallet.min_deposit.is_finite() || self.wallet.min_deposit <= 0.0 {
            return Err(Error::Config {
                message: format!(
                    "wallet.min_deposit must be positive, got {}",
                    self.wallet.min_deposit
                ),
            });
        }

        let pricing = self.shop.default_pricing;
        if pricing.group < 0.0 || pricing.channel < 0.0 {
            return Err(Error::Config {
                message: "shop.default_pricing values cannot be negative".to_string(),
            });
        }

        if !self.supports_language(&self.default_language) {
            return Err(Error::Config {
                message: format!(
                    "default_language '{}' is not listed in [languages]",
                    self.default_language
                ),
            });
        }

        Ok(())
    }
}

/// Loads and validates the store configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
/// - [`AppConfig::validate`] rejects a value
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);

    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    parse_config(&contents)
}

/// Parses and validates configuration from a TOML string
///
/// # Errors
/// Returns `Error::Config` when the TOML is invalid or fails validation.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    config.validate()?;
    Ok(config)
}

/// Loads the configuration from `CONFIG_PATH`, or `./config.toml` when unset
pub fn load_default_config() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_config(path)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    const MINIMAL: &str = r#"
        [wallet]
        trc20_address = "T-address"
        bep20_address = "0x-address"
    "#;

    #[test]
    fn test_parse_minimal_config_uses_defaults() {
        let config = parse_config(MINIMAL).unwrap();

        assert!(config.admin_ids.is_empty());
        assert_eq!(config.default_language, "en");
        assert_eq!(config.languages.len(), 5);
        assert_eq!(config.wallet.min_deposit, 1.0);
        assert_eq!(config.wallet.predefined_amounts, vec![1.0, 10.0, 50.0, 100.0]);
        assert_eq!(config.shop.default_pricing.for_type(ProductType::Group), 5.0);
        assert_eq!(config.shop.default_pricing.for_type(ProductType::Channel), 7.0);
        assert_eq!(config.support.timeout_secs, 3600);
    }

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            admin_ids = [5988451717, 87654321]
            default_language = "ru"

            [languages]
            en = "English"
            ru = "Russia"

            [[required_channels]]
            id = 1002316736329
            title = "Announcements"
            invite_link = "https://discord.gg/example"

            [wallet]
            trc20_address = "T-address"
            bep20_address = "0x-address"
            min_deposit = 5.0
            predefined_amounts = [5.0, 20.0]

            [shop]
            available_years = [2024]

            [shop.default_pricing]
            group = 4.5
            channel = 6.0

            [support]
            timeout_secs = 60
        "#;

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.admin_ids, vec![5_988_451_717, 87_654_321]);
        assert!(config.is_admin_id("87654321"));
        assert!(!config.is_admin_id("42"));
        assert!(!config.is_admin_id("not-a-number"));
        assert_eq!(config.required_channels.len(), 1);
        assert_eq!(config.required_channels[0].title, "Announcements");
        assert_eq!(config.wallet.min_deposit, 5.0);
        assert_eq!(config.shop.available_years, vec![2024]);
        assert_eq!(config.shop.default_pricing.group, 4.5);
        assert_eq!(config.support.timeout_secs, 60);
        assert!(config.supports_language("ru"));
        assert!(!config.supports_language("zh"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let zero_min = r#"
            [wallet]
            trc20_address = "T"
            bep20_address = "0x"
            min_deposit = 0.0
        "#;
        assert!(matches!(
            parse_config(zero_min).unwrap_err(),
            Error::Config { message: _ }
        ));

        let unknown_language = r#"
            default_language = "fr"
            [wallet]
            trc20_address = "T"
            bep20_address = "0x"
        "#;
        assert!(parse_config(unknown_language).is_err());

        let negative_price = r#"
            [wallet]
            trc20_address = "T"
            bep20_address = "0x"
            [shop.default_pricing]
            group = -1.0
            channel = 7.0
        "#;
        assert!(parse_config(negative_price).is_err());

        let zero_admin = r#"
            admin_ids = [42, 0]
            [wallet]
            trc20_address = "T"
            bep20_address = "0x"
        "#;
        assert!(matches!(
            parse_config(zero_admin).unwrap_err(),
            Error::Config { message: _ }
        ));

        let zero_channel = r#"
            [wallet]
            trc20_address = "T"
            bep20_address = "0x"
            [[required_channels]]
            id = 0
            title = "News"
            invite_link = "https://example.com/news"
        "#;
        assert!(matches!(
            parse_config(zero_channel).unwrap_err(),
            Error::Config { message: _ }
        ));
    }

    #[test]
    fn test_missing_wallet_section_fails() {
        assert!(parse_config("admin_ids = [1]").is_err());
    }
}
