//! Stock ledger - sellable, reserved and sold counters per product key.
//!
//! Units move between three buckets:
//! - [`reserve`]: `quantity -> reserved` (checkout)
//! - [`confirm_reserved`]: `reserved -> sold` (order completed)
//! - [`return_reserved`]: `reserved -> quantity` (order cancelled)
//!
//! Each move is one conditional `UPDATE` whose `WHERE` clause carries the
//! precondition (`quantity >= n` or `reserved >= n`), so counters can never go
//! negative even when two orders hit the same key at once.

use crate::{
    core::append_note,
    entities::{Month, ProductType, Stock, stock},
    errors::{Error, Result},
};
use sea_orm::{Set, TransactionTrait, prelude::*, sea_query::Expr};
use std::fmt;
use tracing::info;

/// Natural key of a stock, pricing or order record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProductKey {
    /// Group or channel
    pub product_type: ProductType,
    /// Product year
    pub year: i32,
    /// Product month
    pub month: Month,
}

impl ProductKey {
    /// Builds a key.
    #[must_use]
    pub const fn new(product_type: ProductType, year: i32, month: Month) -> Self {
        Self {
            product_type,
            year,
            month,
        }
    }
}

impl fmt::Display for ProductKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.product_type, self.month, self.year)
    }
}

/// Per-type totals across all stock records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockStats {
    /// Group or channel
    pub product_type: ProductType,
    /// Units currently sellable
    pub total_quantity: i64,
    /// Units delivered
    pub total_sold: i64,
    /// Units held by open orders
    pub total_reserved: i64,
}

fn key_filter(key: ProductKey) -> sea_orm::Condition {
    sea_orm::Condition::all()
        .add(stock::Column::ProductType.eq(key.product_type))
        .add(stock::Column::Year.eq(key.year))
        .add(stock::Column::Month.eq(key.month))
}

const fn validate_quantity(quantity: i64, minimum: i64) -> Result<()> {
    if quantity < minimum {
        return Err(Error::InvalidQuantity { quantity });
    }
    Ok(())
}

/// Sorts records newest year first, then calendar month.
fn sort_for_display(records: &mut [stock::Model]) {
    records.sort_by(|a, b| b.year.cmp(&a.year).then(a.month.cmp(&b.month)));
}

/// Finds the stock record for a key.
pub async fn get_stock<C>(db: &C, key: ProductKey) -> Result<Option<stock::Model>>
where
    C: ConnectionTrait,
{
    Stock::find()
        .filter(key_filter(key))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn require_stock<C>(db: &C, key: ProductKey) -> Result<stock::Model>
where
    C: ConnectionTrait,
{
    get_stock(db, key)
        .await?
        .ok_or_else(|| Error::StockNotFound {
            key: key.to_string(),
        })
}

/// All stock records, newest year first.
pub async fn get_all_stock(db: &DatabaseConnection) -> Result<Vec<stock::Model>> {
    let mut records = Stock::find().all(db).await?;
    sort_for_display(&mut records);
    Ok(records)
}

/// Stock records of one product type, newest year first.
pub async fn get_stock_by_type(
    db: &DatabaseConnection,
    product_type: ProductType,
) -> Result<Vec<stock::Model>> {
    let mut records = Stock::find()
        .filter(stock::Column::ProductType.eq(product_type))
        .all(db)
        .await?;
    sort_for_display(&mut records);
    Ok(records)
}

/// Sums quantity, sold and reserved per product type. Types without any stock
/// record are omitted.
pub async fn get_stock_stats(db: &DatabaseConnection) -> Result<Vec<StockStats>> {
    let records = Stock::find().all(db).await?;

    let stats = [ProductType::Group, ProductType::Channel]
        .into_iter()
        .filter_map(|product_type| {
            let of_type: Vec<&stock::Model> = records
                .iter()
                .filter(|r| r.product_type == product_type)
                .collect();
            (!of_type.is_empty()).then(|| StockStats {
                product_type,
                total_quantity: of_type.iter().map(|r| r.quantity).sum(),
                total_sold: of_type.iter().map(|r| r.sold).sum(),
                total_reserved: of_type.iter().map(|r| r.reserved).sum(),
            })
        })
        .collect();

    Ok(stats)
}

/// Adds units to a key, creating the record on first use.
///
/// On an existing record both `quantity` and `initial_quantity` grow by
/// `quantity`; a new record starts with both equal to `quantity`.
pub async fn add_stock(
    db: &DatabaseConnection,
    key: ProductKey,
    quantity: i64,
    admin_id: i64,
    notes: Option<&str>,
) -> Result<stock::Model> {
    validate_quantity(quantity, 1)?;

    let txn = db.begin().await?;
    let now = chrono::Utc::now();

    let record = if let Some(existing) = get_stock(&txn, key).await? {
        Stock::update_many()
            .col_expr(
                stock::Column::Quantity,
                Expr::col(stock::Column::Quantity).add(quantity),
            )
            .col_expr(
                stock::Column::InitialQuantity,
                Expr::col(stock::Column::InitialQuantity).add(quantity),
            )
            .col_expr(stock::Column::LastUpdatedBy, Expr::value(admin_id))
            .col_expr(stock::Column::LastUpdatedAt, Expr::value(now))
            .col_expr(
                stock::Column::Notes,
                Expr::value(append_note(existing.notes, notes, now)),
            )
            .filter(stock::Column::Id.eq(existing.id))
            .exec(&txn)
            .await?;
        require_stock(&txn, key).await?
    } else {
        stock::ActiveModel {
            product_type: Set(key.product_type),
            year: Set(key.year),
            month: Set(key.month),
            quantity: Set(quantity),
            initial_quantity: Set(quantity),
            sold: Set(0),
            reserved: Set(0),
            added_by: Set(admin_id),
            added_at: Set(now),
            last_updated_by: Set(Some(admin_id)),
            last_updated_at: Set(Some(now)),
            notes: Set(append_note(None, notes, now)),
            ..Default::default()
        }
        .insert(&txn)
        .await?
    };

    txn.commit().await?;

    info!(target: "admin_audit", admin_id, key = %key, added = quantity, quantity = record.quantity, "stock added");
    Ok(record)
}

/// Sets the sellable quantity to an explicit value.
///
/// Increases are counted into `initial_quantity` (more stock arrived); decreases
/// are not (a correction). The write only succeeds if `quantity` still holds the
/// value it was computed from.
pub async fn set_stock(
    db: &DatabaseConnection,
    key: ProductKey,
    quantity: i64,
    admin_id: i64,
    notes: Option<&str>,
) -> Result<stock::Model> {
    validate_quantity(quantity, 0)?;

    let existing = require_stock(db, key).await?;
    let increase = (quantity - existing.quantity).max(0);
    let now = chrono::Utc::now();

    let touched = Stock::update_many()
        .col_expr(stock::Column::Quantity, Expr::value(quantity))
        .col_expr(
            stock::Column::InitialQuantity,
            Expr::col(stock::Column::InitialQuantity).add(increase),
        )
        .col_expr(stock::Column::LastUpdatedBy, Expr::value(admin_id))
        .col_expr(stock::Column::LastUpdatedAt, Expr::value(now))
        .col_expr(
            stock::Column::Notes,
            Expr::value(append_note(existing.notes.clone(), notes, now)),
        )
        .filter(stock::Column::Id.eq(existing.id))
        .filter(stock::Column::Quantity.eq(existing.quantity))
        .exec(db)
        .await?
        .rows_affected;

    if touched == 0 {
        return Err(Error::InvalidState {
            message: format!("Stock for {key} changed while it was being set, try again"),
        });
    }

    info!(target: "admin_audit", admin_id, key = %key, from = existing.quantity, to = quantity, "stock set");
    require_stock(db, key).await
}

/// Moves `quantity` units from sellable to reserved.
///
/// # Errors
/// - `StockNotFound` when the key has no record
/// - `InsufficientStock` when fewer than `quantity` units are sellable; no
///   counter changes in that case
pub async fn reserve<C>(db: &C, key: ProductKey, quantity: i64) -> Result<stock::Model>
where
    C: ConnectionTrait,
{
    validate_quantity(quantity, 1)?;

    let touched = Stock::update_many()
        .col_expr(
            stock::Column::Quantity,
            Expr::col(stock::Column::Quantity).sub(quantity),
        )
        .col_expr(
            stock::Column::Reserved,
            Expr::col(stock::Column::Reserved).add(quantity),
        )
        .filter(key_filter(key))
        .filter(stock::Column::Quantity.gte(quantity))
        .exec(db)
        .await?
        .rows_affected;

    let record = require_stock(db, key).await?;
    if touched == 0 {
        return Err(Error::InsufficientStock {
            available: record.quantity,
            requested: quantity,
        });
    }

    info!(key = %key, quantity, "stock reserved");
    Ok(record)
}

/// Shared body of [`confirm_reserved`] and [`return_reserved`]: takes `quantity`
/// out of `reserved` and adds it to `target`.
async fn release_reserved<C>(
    db: &C,
    key: ProductKey,
    quantity: i64,
    target: stock::Column,
) -> Result<stock::Model>
where
    C: ConnectionTrait,
{
    validate_quantity(quantity, 1)?;

    let touched = Stock::update_many()
        .col_expr(
            stock::Column::Reserved,
            Expr::col(stock::Column::Reserved).sub(quantity),
        )
        .col_expr(target, Expr::col(target).add(quantity))
        .filter(key_filter(key))
        .filter(stock::Column::Reserved.gte(quantity))
        .exec(db)
        .await?
        .rows_affected;

    let record = require_stock(db, key).await?;
    if touched == 0 {
        return Err(Error::InsufficientReserved {
            reserved: record.reserved,
            requested: quantity,
        });
    }
    Ok(record)
}

/// Converts `quantity` reserved units into sold units.
///
/// # Errors
/// `StockNotFound`, or `InsufficientReserved` when fewer units are reserved.
pub async fn confirm_reserved<C>(db: &C, key: ProductKey, quantity: i64) -> Result<stock::Model>
where
    C: ConnectionTrait,
{
    let record = release_reserved(db, key, quantity, stock::Column::Sold).await?;
    info!(key = %key, quantity, "reserved stock confirmed as sold");
    Ok(record)
}

/// Returns `quantity` reserved units to the sellable pool.
///
/// # Errors
/// `StockNotFound`, or `InsufficientReserved` when fewer units are reserved.
pub async fn return_reserved<C>(db: &C, key: ProductKey, quantity: i64) -> Result<stock::Model>
where
    C: ConnectionTrait,
{
    let record = release_reserved(db, key, quantity, stock::Column::Quantity).await?;
    info!(key = %key, quantity, "reserved stock returned");
    Ok(record)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn january() -> ProductKey {
        ProductKey::new(ProductType::Group, 2024, Month::January)
    }

    fn total(record: &stock::Model) -> i64 {
        record.quantity + record.reserved + record.sold
    }

    #[tokio::test]
    async fn test_quantity_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = add_stock(&db, january(), 0, 1, None).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidQuantity { quantity: 0 }));

        let result = set_stock(&db, january(), -1, 1, None).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidQuantity { quantity: -1 }));

        let result = reserve(&db, january(), 0).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidQuantity { quantity: 0 }));
        Ok(())
    }

    #[tokio::test]
    async fn test_add_stock_creates_then_tops_up() -> Result<()> {
        let db = setup_test_db().await?;

        let created = add_stock(&db, january(), 10, 1, Some("first batch")).await?;
        assert_eq!(created.quantity, 10);
        assert_eq!(created.initial_quantity, 10);
        assert_eq!(created.added_by, 1);
        assert!(created.notes.as_deref().unwrap().ends_with("first batch"));

        let topped_up = add_stock(&db, january(), 5, 2, Some("second batch")).await?;
        assert_eq!(topped_up.id, created.id);
        assert_eq!(topped_up.quantity, 15);
        assert_eq!(topped_up.initial_quantity, 15);
        assert_eq!(topped_up.last_updated_by, Some(2));
        assert_eq!(topped_up.notes.as_deref().unwrap().lines().count(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_audit_timestamps_are_utc() -> Result<()> {
        let db = setup_test_db().await?;
        let before = chrono::Utc::now() - chrono::Duration::seconds(1);

        let created = add_stock(&db, january(), 4, 1, None).await?;
        let updated = set_stock(&db, january(), 6, 2, None).await?;

        let after = chrono::Utc::now() + chrono::Duration::seconds(1);
        assert!(created.added_at > before && created.added_at < after);
        let touched = updated.last_updated_at.unwrap();
        assert!(touched >= created.added_at - chrono::Duration::seconds(1) && touched < after);
        Ok(())
    }

    #[tokio::test]
    async fn test_reserve_then_confirm() -> Result<()> {
        let db = setup_test_db().await?;
        let start = add_stock(&db, january(), 10, 1, None).await?;

        let reserved = reserve(&db, january(), 3).await?;
        assert_eq!(reserved.quantity, 7);
        assert_eq!(reserved.reserved, 3);
        assert_eq!(total(&reserved), total(&start));

        let confirmed = confirm_reserved(&db, january(), 3).await?;
        assert_eq!(confirmed.reserved, 0);
        assert_eq!(confirmed.sold, 3);
        assert_eq!(confirmed.quantity, 7);
        assert_eq!(total(&confirmed), total(&start));
        Ok(())
    }

    #[tokio::test]
    async fn test_reserve_then_return() -> Result<()> {
        let db = setup_test_db().await?;
        add_stock(&db, january(), 4, 1, None).await?;

        reserve(&db, january(), 4).await?;
        let returned = return_reserved(&db, january(), 4).await?;
        assert_eq!(returned.quantity, 4);
        assert_eq!(returned.reserved, 0);
        assert_eq!(returned.sold, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_reserve_insufficient_leaves_counters() -> Result<()> {
        let db = setup_test_db().await?;
        add_stock(&db, january(), 2, 1, None).await?;

        let result = reserve(&db, january(), 3).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InsufficientStock {
                available: 2,
                requested: 3
            }
        ));

        let unchanged = get_stock(&db, january()).await?.unwrap();
        assert_eq!(unchanged.quantity, 2);
        assert_eq!(unchanged.reserved, 0);
        assert_eq!(unchanged.sold, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_key() -> Result<()> {
        let db = setup_test_db().await?;

        let result = reserve(&db, january(), 1).await;
        assert!(matches!(result.unwrap_err(), Error::StockNotFound { key: _ }));

        let result = confirm_reserved(&db, january(), 1).await;
        assert!(matches!(result.unwrap_err(), Error::StockNotFound { key: _ }));

        let result = set_stock(&db, january(), 5, 1, None).await;
        assert!(matches!(result.unwrap_err(), Error::StockNotFound { key: _ }));
        Ok(())
    }

    #[tokio::test]
    async fn test_release_more_than_reserved() -> Result<()> {
        let db = setup_test_db().await?;
        add_stock(&db, january(), 10, 1, None).await?;
        reserve(&db, january(), 2).await?;

        let result = confirm_reserved(&db, january(), 3).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InsufficientReserved {
                reserved: 2,
                requested: 3
            }
        ));

        let result = return_reserved(&db, january(), 5).await;
        assert!(matches!(result.unwrap_err(), Error::InsufficientReserved { .. }));

        let unchanged = get_stock(&db, january()).await?.unwrap();
        assert_eq!(unchanged.reserved, 2);
        assert_eq!(unchanged.quantity, 8);
        Ok(())
    }

    #[tokio::test]
    async fn test_set_stock_only_counts_increases() -> Result<()> {
        let db = setup_test_db().await?;
        add_stock(&db, january(), 10, 1, None).await?;

        let lowered = set_stock(&db, january(), 6, 1, Some("miscounted")).await?;
        assert_eq!(lowered.quantity, 6);
        assert_eq!(lowered.initial_quantity, 10);

        let raised = set_stock(&db, january(), 9, 1, None).await?;
        assert_eq!(raised.quantity, 9);
        assert_eq!(raised.initial_quantity, 13);
        Ok(())
    }

    #[tokio::test]
    async fn test_listing_and_stats() -> Result<()> {
        let db = setup_test_db().await?;
        add_stock(&db, ProductKey::new(ProductType::Group, 2023, Month::March), 3, 1, None).await?;
        add_stock(&db, ProductKey::new(ProductType::Group, 2024, Month::February), 4, 1, None)
            .await?;
        add_stock(&db, ProductKey::new(ProductType::Group, 2024, Month::January), 5, 1, None)
            .await?;
        add_stock(&db, ProductKey::new(ProductType::Channel, 2024, Month::May), 6, 1, None).await?;
        reserve(&db, ProductKey::new(ProductType::Group, 2024, Month::January), 2).await?;

        let all = get_all_stock(&db).await?;
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].year, 2024);
        assert_eq!(all.last().unwrap().year, 2023);

        let groups = get_stock_by_type(&db, ProductType::Group).await?;
        let order: Vec<(i32, Month)> = groups.iter().map(|s| (s.year, s.month)).collect();
        assert_eq!(
            order,
            vec![
                (2024, Month::January),
                (2024, Month::February),
                (2023, Month::March)
            ]
        );

        let stats = get_stock_stats(&db).await?;
        assert_eq!(
            stats,
            vec![
                StockStats {
                    product_type: ProductType::Group,
                    total_quantity: 10,
                    total_sold: 0,
                    total_reserved: 2,
                },
                StockStats {
                    product_type: ProductType::Channel,
                    total_quantity: 6,
                    total_sold: 0,
                    total_reserved: 0,
                },
            ]
        );
        Ok(())
    }
}
