/// Database configuration and connection management
pub mod database;

/// Store configuration loading from config.toml
pub mod store;

pub use store::{AppConfig, DefaultPricing, RequiredChannel, ShopConfig, SupportConfig, WalletConfig};
