//! Database configuration module.
//!
//! This module handles the `SQLite` connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust
//! structs. Natural keys (stock, pricing and catalog keys) additionally get
//! composite unique indexes, which the entity derive cannot express.

use crate::entities::{
    Catalog, CatalogMonth, Order, Pricing, Stock, Transaction, User, catalog, catalog_month,
    pricing, stock,
};
use crate::errors::Result;
use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/storefront.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a local `SQLite` file if no environment variable is set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    Database::connect(&get_database_url())
        .await
        .map_err(Into::into)
}

/// Creates all tables (if missing) plus the natural-key unique indexes.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    create_entity_table(db, &schema, User).await?;
    create_entity_table(db, &schema, Order).await?;
    create_entity_table(db, &schema, Transaction).await?;
    create_entity_table(db, &schema, Stock).await?;
    create_entity_table(db, &schema, Pricing).await?;
    create_entity_table(db, &schema, Catalog).await?;
    create_entity_table(db, &schema, CatalogMonth).await?;

    let unique_keys: [IndexCreateStatement; 4] = [
        Index::create()
            .name("idx_stock_key")
            .table(Stock)
            .col(stock::Column::ProductType)
            .col(stock::Column::Year)
            .col(stock::Column::Month)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_pricing_key")
            .table(Pricing)
            .col(pricing::Column::ProductType)
            .col(pricing::Column::Year)
            .col(pricing::Column::Month)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_catalog_key")
            .table(Catalog)
            .col(catalog::Column::ProductType)
            .col(catalog::Column::Year)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_catalog_month_key")
            .table(CatalogMonth)
            .col(catalog_month::Column::CatalogId)
            .col(catalog_month::Column::Month)
            .unique()
            .if_not_exists()
            .to_owned(),
    ];

    for index in &unique_keys {
        db.execute(builder.build(index)).await?;
    }

    Ok(())
}

async fn create_entity_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();

    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    db.execute(builder.build(&table)).await?;

    for mut index in schema.create_index_from_entity(entity) {
        index.if_not_exists();
        db.execute(builder.build(&index)).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        CatalogModel, OrderModel, PricingModel, StockModel, TransactionModel, UserModel,
    };
    use sea_orm::{EntityTrait, QuerySelect};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<UserModel> = User::find().limit(1).all(&db).await?;
        let _: Vec<TransactionModel> = Transaction::find().limit(1).all(&db).await?;
        let _: Vec<OrderModel> = Order::find().limit(1).all(&db).await?;
        let _: Vec<StockModel> = Stock::find().limit(1).all(&db).await?;
        let _: Vec<PricingModel> = Pricing::find().limit(1).all(&db).await?;
        let _: Vec<CatalogModel> = Catalog::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_repeatable() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        // A restart runs the same statements against an existing file
        create_tables(&db).await?;
        Ok(())
    }
}
