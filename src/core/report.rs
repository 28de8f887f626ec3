//! Store-wide statistics for the admin dashboard.
//!
//! Returns structured data only; the bot layer formats it.

use crate::{
    core::{
        order::{TypeCounts, count_orders_by_type},
        stock::{StockStats, get_stock_stats},
        user::count_users,
        wallet::get_pending_deposits,
    },
    entities::{Order, OrderStatus, order},
    errors::Result,
};
use sea_orm::{DatabaseConnection, prelude::*};

/// Snapshot of the whole store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreStatistics {
    /// Registered users
    pub total_users: u64,
    /// Orders per product type
    pub orders_by_type: TypeCounts,
    /// Sum of completed order totals
    pub revenue: f64,
    /// Deposits waiting for review
    pub pending_deposits: usize,
    /// Stock totals per product type
    pub stock: Vec<StockStats>,
}

impl StoreStatistics {
    /// Orders of every type.
    #[must_use]
    pub const fn total_orders(&self) -> u64 {
        self.orders_by_type.total()
    }
}

/// Collects user, order, revenue and stock figures.
pub async fn store_statistics(db: &DatabaseConnection) -> Result<StoreStatistics> {
    let completed = Order::find()
        .filter(order::Column::Status.eq(OrderStatus::Completed))
        .all(db)
        .await?;
    let revenue = completed.iter().map(|o| o.total_price).sum();

    Ok(StoreStatistics {
        total_users: count_users(db).await?,
        orders_by_type: count_orders_by_type(db).await?,
        revenue,
        pending_deposits: get_pending_deposits(db).await?.len(),
        stock: get_stock_stats(db).await?,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::config::DefaultPricing;
    use crate::core::checkout::{CheckoutRequest, complete_order, place_order};
    use crate::core::stock::ProductKey;
    use crate::core::wallet::create_pending_deposit;
    use crate::entities::{Month, ProductType};
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_empty_store() -> Result<()> {
        let db = setup_test_db().await?;

        let stats = store_statistics(&db).await?;
        assert_eq!(stats.total_users, 0);
        assert_eq!(stats.total_orders(), 0);
        assert_eq!(stats.revenue, 0.0);
        assert!(stats.stock.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_counts_completed_revenue_only() -> Result<()> {
        let (db, user) = setup_with_balance(30.0).await?;
        let key = ProductKey::new(ProductType::Group, 2024, Month::March);
        seed_listing(&db, key, 10).await?;

        let checkout = |quantity| CheckoutRequest {
            user_id: user.id,
            key,
            quantity,
            target_username: "buyer".to_string(),
        };
        let first = place_order(&db, &DefaultPricing::default(), checkout(2)).await?;
        place_order(&db, &DefaultPricing::default(), checkout(1)).await?;
        complete_order(&db, first.order.id, 1, None).await?;
        create_pending_deposit(&db, user.id, 10.0, "Deposit 10 USDT via TRC20".to_string())
            .await?;

        let stats = store_statistics(&db).await?;
        assert_eq!(stats.total_users, 1);
        assert_eq!(stats.total_orders(), 2);
        assert_eq!(stats.orders_by_type.group, 2);
        assert_eq!(stats.revenue, 10.0);
        assert_eq!(stats.pending_deposits, 1);
        assert_eq!(stats.stock[0].total_sold, 2);
        assert_eq!(stats.stock[0].total_reserved, 1);
        Ok(())
    }
}
