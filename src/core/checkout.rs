//! Checkout and order lifecycle orchestration.
//!
//! These functions are the only place where stock, wallet and order records
//! change together. Each one runs inside a single database transaction, so a
//! failure at any step leaves all three exactly as they were.

use crate::{
    config::DefaultPricing,
    core::{
        catalog, order as orders, pricing,
        stock::{self, ProductKey},
        user::require_user,
        wallet::{self, has_enough_balance},
    },
    entities::{OrderStatus, PaymentStatus, TransactionKind, order, user},
    errors::{Error, Result},
};
use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::info;

/// A purchase request coming from the chat surface.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Internal id of the buyer
    pub user_id: i64,
    /// What is bought
    pub key: ProductKey,
    /// Number of units, at least 1
    pub quantity: i64,
    /// Username the product is delivered to
    pub target_username: String,
}

/// Result of a successful checkout.
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    /// The new order
    pub order: order::Model,
    /// The buyer after the debit
    pub user: user::Model,
}

impl CheckoutReceipt {
    /// Amount charged.
    #[must_use]
    pub const fn total(&self) -> f64 {
        self.order.total_price
    }
}

/// Places an order.
///
/// 1. the month must be offered in the catalog
/// 2. the unit price comes from pricing, falling back to the type default
/// 3. the balance must cover `price * quantity`
/// 4. stock is reserved, the order is created and the wallet is debited, all in
///    one transaction
///
/// # Errors
/// `InvalidQuantity`, `InvalidState` (blocked user), `ProductNotFound`,
/// `InsufficientFunds`, `InsufficientStock` or `StockNotFound`.
pub async fn place_order(
    db: &DatabaseConnection,
    defaults: &DefaultPricing,
    request: CheckoutRequest,
) -> Result<CheckoutReceipt> {
    if request.quantity < 1 {
        return Err(Error::InvalidQuantity {
            quantity: request.quantity,
        });
    }

    let buyer = require_user(db, request.user_id).await?;
    if buyer.is_blocked {
        return Err(Error::InvalidState {
            message: "Blocked users cannot place orders".to_string(),
        });
    }

    let key = request.key;
    if !catalog::is_month_available(db, key).await? {
        return Err(Error::ProductNotFound {
            key: key.to_string(),
        });
    }

    let price_per_unit = pricing::get_price(db, defaults, key).await?;
    #[allow(clippy::cast_precision_loss)]
    let total = price_per_unit * request.quantity as f64;
    if !has_enough_balance(&buyer, total) {
        return Err(Error::InsufficientFunds {
            current: buyer.balance,
            required: total,
        });
    }

    let txn = db.begin().await?;

    stock::reserve(&txn, key, request.quantity).await?;
    let order = orders::create_order(
        &txn,
        orders::NewOrder {
            user_id: buyer.id,
            key,
            quantity: request.quantity,
            price_per_unit,
            target_username: request.target_username,
        },
    )
    .await?;
    let user = wallet::debit_purchase(
        &txn,
        buyer.id,
        total,
        format!("Purchase: {} x {key}", request.quantity),
        Some(order.id),
    )
    .await?;

    txn.commit().await?;

    info!(
        order_id = order.id,
        user_id = user.id,
        key = %key,
        quantity = order.quantity,
        total,
        balance = user.balance,
        "checkout completed"
    );
    Ok(CheckoutReceipt { order, user })
}

fn order_key(order: &order::Model) -> ProductKey {
    ProductKey::new(order.product_type, order.year, order.month)
}

fn require_open(order: &order::Model) -> Result<()> {
    if order.status.holds_reservation() {
        Ok(())
    } else {
        Err(Error::InvalidState {
            message: format!("Order #{} is already {}", order.id, order.status),
        })
    }
}

/// Delivers an order: reserved stock becomes sold and the order is completed.
///
/// # Errors
/// `OrderNotFound`, or `InvalidState` when the order is no longer open.
pub async fn complete_order(
    db: &DatabaseConnection,
    order_id: i64,
    admin_id: i64,
    notes: Option<&str>,
) -> Result<order::Model> {
    let txn = db.begin().await?;

    let current = orders::require_order(&txn, order_id).await?;
    require_open(&current)?;

    stock::confirm_reserved(&txn, order_key(&current), current.quantity).await?;
    let completed = orders::update_status(&txn, order_id, OrderStatus::Completed, notes).await?;

    txn.commit().await?;

    info!(target: "admin_audit", admin_id, order_id, "order completed");
    Ok(completed)
}

/// Cancels an open order: reserved stock goes back on sale, whatever has not
/// been refunded yet is credited back to the buyer and the order ends up
/// `cancelled` with payment `refunded`.
///
/// # Errors
/// `OrderNotFound`, or `InvalidState` when the order is no longer open.
pub async fn cancel_order(
    db: &DatabaseConnection,
    order_id: i64,
    reason: &str,
) -> Result<order::Model> {
    let txn = db.begin().await?;

    let current = orders::require_order(&txn, order_id).await?;
    require_open(&current)?;

    stock::return_reserved(&txn, order_key(&current), current.quantity).await?;
    let mut cancelled =
        orders::update_status(&txn, order_id, OrderStatus::Cancelled, Some(reason)).await?;

    let outstanding = current.total_price - current.refund_amount;
    if outstanding > 0.0 {
        wallet::record_transaction(
            &txn,
            current.user_id,
            TransactionKind::Refund,
            outstanding,
            format!("Refund for cancelled order #{order_id}"),
            None,
            Some(order_id),
        )
        .await?;
        cancelled = orders::process_refund(&txn, order_id, outstanding, reason).await?;
    }

    txn.commit().await?;

    info!(order_id, user_id = current.user_id, refunded = outstanding, reason, "order cancelled");
    Ok(cancelled)
}

/// Refunds `amount` of an order to the buyer's wallet.
///
/// A refund that brings the order to fully refunded while its stock is still
/// reserved also puts that stock back on sale.
///
/// # Errors
/// `OrderNotFound`, `InvalidAmount` (not positive, or above what is left to
/// refund) or `InvalidState` (already fully refunded).
pub async fn refund_order(
    db: &DatabaseConnection,
    order_id: i64,
    amount: f64,
    reason: &str,
    admin_id: i64,
) -> Result<order::Model> {
    let txn = db.begin().await?;

    let current = orders::require_order(&txn, order_id).await?;
    let refunded = orders::process_refund(&txn, order_id, amount, reason).await?;

    wallet::record_transaction(
        &txn,
        current.user_id,
        TransactionKind::Refund,
        amount,
        format!("Refund for order #{order_id}: {reason}"),
        Some(format!("admin:{admin_id}")),
        Some(order_id),
    )
    .await?;

    if refunded.payment_status == PaymentStatus::Refunded && current.status.holds_reservation() {
        stock::return_reserved(&txn, order_key(&current), current.quantity).await?;
    }

    txn.commit().await?;

    info!(target: "admin_audit", admin_id, order_id, amount, reason, "order refunded");
    Ok(refunded)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::wallet::get_user_transactions;
    use crate::entities::{Month, ProductType, TransactionStatus};
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn group_january() -> ProductKey {
        ProductKey::new(ProductType::Group, 2024, Month::January)
    }

    fn request(user_id: i64, key: ProductKey, quantity: i64) -> CheckoutRequest {
        CheckoutRequest {
            user_id,
            key,
            quantity,
            target_username: "@buyer".to_string(),
        }
    }

    #[tokio::test]
    async fn test_rejects_zero_quantity() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = place_order(&db, &DefaultPricing::default(), request(1, group_january(), 0)).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidQuantity { quantity: 0 }));
        Ok(())
    }

    #[tokio::test]
    async fn test_checkout_reserves_debits_and_links() -> Result<()> {
        let (db, user) = setup_with_balance(20.0).await?;
        seed_listing(&db, group_january(), 10).await?;

        let receipt =
            place_order(&db, &DefaultPricing::default(), request(user.id, group_january(), 2))
                .await?;
        assert_eq!(receipt.total(), 10.0);
        assert_eq!(receipt.order.price_per_unit, 5.0);
        assert_eq!(receipt.order.status, OrderStatus::Pending);
        assert_eq!(receipt.order.payment_status, PaymentStatus::Paid);
        assert_eq!(receipt.user.balance, 10.0);
        assert_eq!(receipt.user.total_spent, 10.0);

        let stock = stock::get_stock(&db, group_january()).await?.unwrap();
        assert_eq!(stock.quantity, 8);
        assert_eq!(stock.reserved, 2);

        let history = get_user_transactions(&db, user.id, Some(1)).await?;
        assert_eq!(history[0].kind, TransactionKind::Purchase);
        assert_eq!(history[0].status, TransactionStatus::Completed);
        assert_eq!(history[0].order_id, Some(receipt.order.id));
        Ok(())
    }

    #[tokio::test]
    async fn test_insufficient_funds_changes_nothing() -> Result<()> {
        let (db, user) = setup_with_balance(5.0).await?;
        let key = ProductKey::new(ProductType::Channel, 2024, Month::January);
        seed_listing(&db, key, 10).await?;

        let result = place_order(&db, &DefaultPricing::default(), request(user.id, key, 1)).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InsufficientFunds {
                current: _,
                required: _
            }
        ));

        assert_eq!(require_user(&db, user.id).await?.balance, 5.0);
        assert_eq!(stock::get_stock(&db, key).await?.unwrap().reserved, 0);
        assert!(orders::get_user_orders(&db, user.id, None).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_month_must_be_in_catalog() -> Result<()> {
        let (db, user) = setup_with_balance(50.0).await?;
        stock::add_stock(&db, group_january(), 10, 1, None).await?;

        let result =
            place_order(&db, &DefaultPricing::default(), request(user.id, group_january(), 1))
                .await;
        assert!(matches!(result.unwrap_err(), Error::ProductNotFound { key: _ }));
        Ok(())
    }

    #[tokio::test]
    async fn test_insufficient_stock_charges_nothing() -> Result<()> {
        let (db, user) = setup_with_balance(50.0).await?;
        seed_listing(&db, group_january(), 1).await?;

        let result =
            place_order(&db, &DefaultPricing::default(), request(user.id, group_january(), 2))
                .await;
        assert!(matches!(result.unwrap_err(), Error::InsufficientStock { .. }));
        assert_eq!(require_user(&db, user.id).await?.balance, 50.0);
        assert!(orders::get_user_orders(&db, user.id, None).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_failure_after_reservation_rolls_back() -> Result<()> {
        let (db, user) = setup_with_balance(50.0).await?;
        seed_listing(&db, group_january(), 5).await?;

        let mut bad = request(user.id, group_january(), 2);
        bad.target_username = "   ".to_string();
        let result = place_order(&db, &DefaultPricing::default(), bad).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { message: _ }));

        let stock = stock::get_stock(&db, group_january()).await?.unwrap();
        assert_eq!(stock.quantity, 5);
        assert_eq!(stock.reserved, 0);
        assert_eq!(require_user(&db, user.id).await?.balance, 50.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_complete_order_sells_reserved_stock() -> Result<()> {
        let (db, user) = setup_with_balance(20.0).await?;
        seed_listing(&db, group_january(), 10).await?;
        let receipt =
            place_order(&db, &DefaultPricing::default(), request(user.id, group_january(), 3))
                .await?;

        let completed = complete_order(&db, receipt.order.id, 1, Some("delivered")).await?;
        assert_eq!(completed.status, OrderStatus::Completed);

        let stock = stock::get_stock(&db, group_january()).await?.unwrap();
        assert_eq!((stock.quantity, stock.reserved, stock.sold), (7, 0, 3));

        let result = complete_order(&db, receipt.order.id, 1, None).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidState { message: _ }));
        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_order_returns_stock_and_funds() -> Result<()> {
        let (db, user) = setup_with_balance(20.0).await?;
        seed_listing(&db, group_january(), 10).await?;
        let receipt =
            place_order(&db, &DefaultPricing::default(), request(user.id, group_january(), 2))
                .await?;

        let cancelled = cancel_order(&db, receipt.order.id, "changed my mind").await?;
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);
        assert_eq!(cancelled.refund_amount, 10.0);

        let buyer = require_user(&db, user.id).await?;
        assert_eq!(buyer.balance, 20.0);
        assert_eq!(buyer.total_spent, 0.0);

        let stock = stock::get_stock(&db, group_january()).await?.unwrap();
        assert_eq!((stock.quantity, stock.reserved, stock.sold), (10, 0, 0));

        let result = cancel_order(&db, receipt.order.id, "again").await;
        assert!(matches!(result.unwrap_err(), Error::InvalidState { message: _ }));
        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_processing_order_refunds_the_rest() -> Result<()> {
        let (db, user) = setup_with_balance(20.0).await?;
        seed_listing(&db, group_january(), 10).await?;
        let receipt =
            place_order(&db, &DefaultPricing::default(), request(user.id, group_january(), 3))
                .await?;
        orders::update_status(&db, receipt.order.id, OrderStatus::Processing, None).await?;
        refund_order(&db, receipt.order.id, 5.0, "late delivery", 1).await?;

        let cancelled = cancel_order(&db, receipt.order.id, "cannot deliver").await?;
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);
        assert_eq!(cancelled.refund_amount, 15.0);
        assert_eq!(require_user(&db, user.id).await?.balance, 20.0);

        let stock = stock::get_stock(&db, group_january()).await?.unwrap();
        assert_eq!((stock.quantity, stock.reserved, stock.sold), (10, 0, 0));
        Ok(())
    }

    #[tokio::test]
    async fn test_refund_order_partial_then_full() -> Result<()> {
        let (db, user) = setup_with_balance(20.0).await?;
        seed_listing(&db, group_january(), 10).await?;
        let receipt =
            place_order(&db, &DefaultPricing::default(), request(user.id, group_january(), 4))
                .await?;
        assert_eq!(receipt.user.balance, 0.0);

        let partial = refund_order(&db, receipt.order.id, 5.0, "late delivery", 1).await?;
        assert_eq!(partial.payment_status, PaymentStatus::PartiallyRefunded);
        assert_eq!(partial.status, OrderStatus::Pending);
        assert_eq!(require_user(&db, user.id).await?.balance, 5.0);
        assert_eq!(stock::get_stock(&db, group_january()).await?.unwrap().reserved, 4);

        let full = refund_order(&db, receipt.order.id, 15.0, "not delivered", 1).await?;
        assert_eq!(full.payment_status, PaymentStatus::Refunded);
        assert_eq!(full.status, OrderStatus::Refunded);
        assert_eq!(require_user(&db, user.id).await?.balance, 20.0);

        let stock = stock::get_stock(&db, group_january()).await?.unwrap();
        assert_eq!((stock.quantity, stock.reserved), (10, 0));

        let result = refund_order(&db, receipt.order.id, 1.0, "more", 1).await;
        assert!(result.is_err());
        assert_eq!(require_user(&db, user.id).await?.balance, 20.0);
        Ok(())
    }
}
