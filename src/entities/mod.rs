//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod catalog;
pub mod catalog_month;
pub mod enums;
pub mod order;
pub mod pricing;
pub mod stock;
pub mod transaction;
pub mod user;

// Re-export specific types to avoid conflicts
pub use catalog::{Column as CatalogColumn, Entity as Catalog, Model as CatalogModel};
pub use catalog_month::{
    Column as CatalogMonthColumn, Entity as CatalogMonth, Model as CatalogMonthModel,
};
pub use enums::{Month, OrderStatus, PaymentStatus, ProductType, TransactionKind, TransactionStatus};
pub use order::{Column as OrderColumn, Entity as Order, Model as OrderModel};
pub use pricing::{Column as PricingColumn, Entity as Pricing, Model as PricingModel};
pub use stock::{Column as StockColumn, Entity as Stock, Model as StockModel};
pub use transaction::{
    Column as TransactionColumn, Entity as Transaction, Model as TransactionModel,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
