//! Shared test utilities for the storefront.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    config::{AppConfig, store::parse_config},
    core::{
        catalog,
        stock::{self, ProductKey},
        user::{self, NewUser},
        wallet,
    },
    entities::{self, TransactionKind},
    errors::Result,
};
use sea_orm::DatabaseConnection;

/// Platform id listed as admin in [`test_config`].
pub const TEST_ADMIN_ID: &str = "5988451717";

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Configuration used by tests.
///
/// # Defaults
/// * admin: [`TEST_ADMIN_ID`]
/// * languages: en, id, zh, uz, ru (default en)
/// * `min_deposit`: 1.0
/// * default prices: group 5.0, channel 7.0
#[allow(clippy::unwrap_used)]
pub fn test_config() -> AppConfig {
    parse_config(&format!(
        r#"
        admin_ids = [{TEST_ADMIN_ID}]

        [wallet]
        trc20_address = "TTestTronAddress"
        bep20_address = "0xTestBscAddress"
        "#
    ))
    .unwrap()
}

/// Identity of a first-contact user with platform id `external_id`.
pub fn new_user(external_id: &str) -> NewUser {
    NewUser {
        external_id: external_id.to_string(),
        username: Some(format!("user{external_id}")),
        display_name: format!("User {external_id}"),
    }
}

/// Registers a user with zero balance.
pub async fn create_test_user(
    db: &DatabaseConnection,
    external_id: &str,
) -> Result<entities::user::Model> {
    let (created, _) = user::find_or_create(db, &test_config(), new_user(external_id)).await?;
    Ok(created)
}

/// Sets up a test environment with one registered user.
/// Returns (db, user).
pub async fn setup_with_user() -> Result<(DatabaseConnection, entities::user::Model)> {
    let db = setup_test_db().await?;
    let created = create_test_user(&db, "1001").await?;
    Ok((db, created))
}

/// Sets up a test environment with one user whose balance was funded through a
/// completed deposit of `balance`.
pub async fn setup_with_balance(
    balance: f64,
) -> Result<(DatabaseConnection, entities::user::Model)> {
    let (db, created) = setup_with_user().await?;
    let funded = wallet::record_transaction(
        &db,
        created.id,
        TransactionKind::Deposit,
        balance,
        "Test deposit".to_string(),
        None,
        None,
    )
    .await?;
    Ok((db, funded))
}

/// Makes `key` sellable: its month is added to the catalog and `quantity`
/// units are stocked.
pub async fn seed_listing(
    db: &DatabaseConnection,
    key: ProductKey,
    quantity: i64,
) -> Result<entities::stock::Model> {
    catalog::add_catalog(db, key.product_type, key.year, &[key.month], 1).await?;
    stock::add_stock(db, key, quantity, 1, None).await
}

/// A user row that never touched the database, for pure functions.
pub fn sample_user_model() -> entities::user::Model {
    let now = chrono::Utc::now();
    entities::user::Model {
        id: 1,
        external_id: "1001".to_string(),
        username: None,
        display_name: "User 1001".to_string(),
        language: "en".to_string(),
        balance: 0.0,
        total_deposited: 0.0,
        total_spent: 0.0,
        is_admin: false,
        is_blocked: false,
        joined_channels: false,
        support_active: false,
        support_started_at: None,
        support_last_message_at: None,
        registered_at: now,
        last_activity: now,
    }
}
