//! Order records - purchase snapshots and their status lifecycle.
//!
//! Price and total are frozen when the order is created. Status moves forward
//! only (`pending -> processing -> completed`, or to `cancelled` before
//! completion). Refunds accumulate in `refund_amount` and may never exceed
//! `total_price`.

use crate::{
    core::{append_note, stock::ProductKey},
    entities::{Order, OrderStatus, PaymentStatus, ProductType, order},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{PaginatorTrait, QueryOrder, QuerySelect, Set, prelude::*, sea_query::Expr};
use tracing::info;

/// Refund totals within this distance of the order total count as a full refund.
const REFUND_EPSILON: f64 = 1e-9;

/// Data needed to create an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// Buyer
    pub user_id: i64,
    /// What is bought
    pub key: ProductKey,
    /// Number of units
    pub quantity: i64,
    /// Unit price at checkout
    pub price_per_unit: f64,
    /// Delivery target
    pub target_username: String,
}

/// Order counts per product type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeCounts {
    /// Orders for groups
    pub group: u64,
    /// Orders for channels
    pub channel: u64,
}

impl TypeCounts {
    /// Sum over both types.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.group + self.channel
    }
}

/// Inserts a `pending`/`paid` order with the total frozen as
/// `price_per_unit * quantity`.
pub async fn create_order<C>(db: &C, new_order: NewOrder) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    if new_order.quantity < 1 {
        return Err(Error::InvalidQuantity {
            quantity: new_order.quantity,
        });
    }
    if !new_order.price_per_unit.is_finite() || new_order.price_per_unit < 0.0 {
        return Err(Error::InvalidAmount {
            amount: new_order.price_per_unit,
        });
    }
    let target_username = new_order.target_username.trim().trim_start_matches('@');
    if target_username.is_empty() {
        return Err(Error::Validation {
            message: "Target username cannot be empty".to_string(),
        });
    }

    #[allow(clippy::cast_precision_loss)]
    let total_price = new_order.price_per_unit * new_order.quantity as f64;
    let now = Utc::now();

    let created = order::ActiveModel {
        user_id: Set(new_order.user_id),
        product_type: Set(new_order.key.product_type),
        month: Set(new_order.key.month),
        year: Set(new_order.key.year),
        quantity: Set(new_order.quantity),
        price_per_unit: Set(new_order.price_per_unit),
        total_price: Set(total_price),
        target_username: Set(target_username.to_string()),
        status: Set(OrderStatus::Pending),
        payment_status: Set(PaymentStatus::Paid),
        refund_amount: Set(0.0),
        refund_reason: Set(None),
        admin_notes: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        completed_at: Set(None),
        cancelled_at: Set(None),
        refunded_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(
        order_id = created.id,
        user_id = created.user_id,
        key = %new_order.key,
        quantity = created.quantity,
        total = created.total_price,
        "order created"
    );
    Ok(created)
}

/// Retrieves an order by id.
pub async fn get_order_by_id<C>(db: &C, order_id: i64) -> Result<Option<order::Model>>
where
    C: ConnectionTrait,
{
    Order::find_by_id(order_id).one(db).await.map_err(Into::into)
}

/// Like [`get_order_by_id`] but a missing order is an error.
pub async fn require_order<C>(db: &C, order_id: i64) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    get_order_by_id(db, order_id)
        .await?
        .ok_or(Error::OrderNotFound { order_id })
}

/// A user's orders, newest first, optionally limited.
pub async fn get_user_orders(
    db: &DatabaseConnection,
    user_id: i64,
    limit: Option<u64>,
) -> Result<Vec<order::Model>> {
    Order::find()
        .filter(order::Column::UserId.eq(user_id))
        .order_by_desc(order::Column::Id)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}

/// The most recent orders across all users.
pub async fn get_recent_orders(db: &DatabaseConnection, limit: u64) -> Result<Vec<order::Model>> {
    Order::find()
        .order_by_desc(order::Column::Id)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Number of orders per product type.
pub async fn count_orders_by_type(db: &DatabaseConnection) -> Result<TypeCounts> {
    let count = |product_type: ProductType| {
        Order::find()
            .filter(order::Column::ProductType.eq(product_type))
            .count(db)
    };
    Ok(TypeCounts {
        group: count(ProductType::Group).await?,
        channel: count(ProductType::Channel).await?,
    })
}

/// Number of orders created in `[from, to)`.
pub async fn count_orders_by_period(
    db: &DatabaseConnection,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<u64> {
    Order::find()
        .filter(order::Column::CreatedAt.gte(from))
        .filter(order::Column::CreatedAt.lt(to))
        .count(db)
        .await
        .map_err(Into::into)
}

/// Moves an order to `status`.
///
/// Only forward transitions are allowed; `completed_at` or `cancelled_at` is
/// stamped accordingly and `notes` is appended to the admin notes. Stock and
/// wallet are not touched here, see [`crate::core::checkout`].
///
/// # Errors
/// - `OrderNotFound`
/// - `InvalidState` for a backward or repeated transition, or when the order
///   changed concurrently
pub async fn update_status<C>(
    db: &C,
    order_id: i64,
    status: OrderStatus,
    notes: Option<&str>,
) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    let current = require_order(db, order_id).await?;
    if !current.status.can_advance_to(status) {
        return Err(Error::InvalidState {
            message: format!(
                "Order #{order_id} cannot move from {} to {status}",
                current.status
            ),
        });
    }

    let now = Utc::now();
    let mut update = Order::update_many()
        .col_expr(order::Column::Status, Expr::value(status))
        .col_expr(order::Column::UpdatedAt, Expr::value(now))
        .col_expr(
            order::Column::AdminNotes,
            Expr::value(append_note(current.admin_notes.clone(), notes, now)),
        );
    match status {
        OrderStatus::Completed => {
            update = update.col_expr(order::Column::CompletedAt, Expr::value(Some(now)));
        }
        OrderStatus::Cancelled => {
            update = update.col_expr(order::Column::CancelledAt, Expr::value(Some(now)));
        }
        OrderStatus::Pending | OrderStatus::Processing | OrderStatus::Refunded => {}
    }

    let touched = update
        .filter(order::Column::Id.eq(order_id))
        .filter(order::Column::Status.eq(current.status))
        .exec(db)
        .await?
        .rows_affected;
    if touched == 0 {
        return Err(Error::InvalidState {
            message: format!("Order #{order_id} changed while it was being updated"),
        });
    }

    info!(order_id, from = %current.status, to = %status, "order status updated");
    require_order(db, order_id).await
}

/// Records a refund of `amount` against an order.
///
/// Refunds accumulate. When the accumulated amount reaches `total_price` the
/// order becomes `refunded`/`refunded` (a cancelled order keeps its status);
/// below that the payment is
/// `partially_refunded` and the fulfilment status is kept. This only updates the
/// order; the wallet credit is done by [`crate::core::checkout::refund_order`].
///
/// # Errors
/// - `OrderNotFound`
/// - `InvalidAmount` when `amount` is not positive or the accumulated refund
///   would exceed `total_price`
/// - `InvalidState` when the order is already fully refunded
pub async fn process_refund<C>(
    db: &C,
    order_id: i64,
    amount: f64,
    reason: &str,
) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidAmount { amount });
    }

    let current = require_order(db, order_id).await?;
    if current.payment_status == PaymentStatus::Refunded {
        return Err(Error::InvalidState {
            message: format!("Order #{order_id} is already fully refunded"),
        });
    }

    let refunded = current.refund_amount + amount;
    if refunded > current.total_price + REFUND_EPSILON {
        return Err(Error::InvalidAmount { amount });
    }

    let fully_refunded = (current.total_price - refunded).abs() <= REFUND_EPSILON;
    let (refund_amount, payment_status, status) = if fully_refunded {
        // A cancelled order stays cancelled; only its payment is marked refunded
        let status = if current.status == OrderStatus::Cancelled {
            OrderStatus::Cancelled
        } else {
            OrderStatus::Refunded
        };
        (current.total_price, PaymentStatus::Refunded, status)
    } else {
        (refunded, PaymentStatus::PartiallyRefunded, current.status)
    };

    let now = Utc::now();
    let touched = Order::update_many()
        .col_expr(order::Column::RefundAmount, Expr::value(refund_amount))
        .col_expr(order::Column::PaymentStatus, Expr::value(payment_status))
        .col_expr(order::Column::Status, Expr::value(status))
        .col_expr(order::Column::RefundReason, Expr::value(Some(reason.to_string())))
        .col_expr(order::Column::RefundedAt, Expr::value(Some(now)))
        .col_expr(order::Column::UpdatedAt, Expr::value(now))
        .filter(order::Column::Id.eq(order_id))
        .filter(order::Column::RefundAmount.eq(current.refund_amount))
        .exec(db)
        .await?
        .rows_affected;
    if touched == 0 {
        return Err(Error::InvalidState {
            message: format!("Order #{order_id} changed while the refund was being recorded"),
        });
    }

    info!(order_id, amount, refund_amount, payment_status = %payment_status, "refund recorded");
    require_order(db, order_id).await
}
