//! Wallet ledger - balances and the transaction log.
//!
//! Every balance change is a single atomic `UPDATE users SET balance = balance + x`
//! paired with a `transactions` row, both inside one database transaction, so the
//! counters on the user row always agree with the log:
//! `balance = total_deposited - total_spent + sum(admin adjustments)`.
//!
//! Deposits go through an explicit lifecycle: [`create_pending_deposit`] records
//! the request without touching the balance, and exactly one of
//! [`approve_deposit`] or [`reject_deposit`] finalizes it.

use crate::{
    core::user::require_user,
    entities::{Transaction, TransactionKind, TransactionStatus, User, transaction, user},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::info;

/// How one ledger entry moves the three wallet counters.
#[derive(Debug, Clone, Copy, PartialEq)]
struct WalletDelta {
    balance: f64,
    deposited: f64,
    spent: f64,
}

impl WalletDelta {
    fn for_kind(kind: TransactionKind, amount: f64) -> Self {
        match kind {
            TransactionKind::Deposit => Self {
                balance: amount,
                deposited: amount,
                spent: 0.0,
            },
            TransactionKind::Purchase => Self {
                balance: -amount,
                deposited: 0.0,
                spent: amount,
            },
            TransactionKind::Refund => Self {
                balance: amount,
                deposited: 0.0,
                spent: -amount,
            },
            TransactionKind::AdminAdjustment => Self {
                balance: amount,
                deposited: 0.0,
                spent: 0.0,
            },
        }
    }
}

/// Rejects amounts a ledger entry of `kind` cannot carry.
///
/// Adjustments may be negative but not zero; every other kind must be positive.
fn validate_amount(kind: TransactionKind, amount: f64) -> Result<()> {
    let valid = amount.is_finite()
        && match kind {
            TransactionKind::AdminAdjustment => amount != 0.0,
            _ => amount > 0.0,
        };

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidAmount { amount })
    }
}

/// Whether the user can pay `amount` from their balance.
#[must_use]
pub fn has_enough_balance(user: &user::Model, amount: f64) -> bool {
    user.balance >= amount
}

/// Applies a delta to the user's counters, optionally only if the balance covers
/// `min_balance`. Returns the number of rows touched (0 or 1).
async fn apply_delta<C>(
    db: &C,
    user_id: i64,
    delta: WalletDelta,
    min_balance: Option<f64>,
) -> Result<u64>
where
    C: ConnectionTrait,
{
    let mut update = User::update_many()
        .col_expr(
            user::Column::Balance,
            Expr::col(user::Column::Balance).add(delta.balance),
        )
        .col_expr(
            user::Column::TotalDeposited,
            Expr::col(user::Column::TotalDeposited).add(delta.deposited),
        )
        .col_expr(
            user::Column::TotalSpent,
            Expr::col(user::Column::TotalSpent).add(delta.spent),
        )
        .filter(user::Column::Id.eq(user_id));

    if let Some(required) = min_balance {
        update = update.filter(user::Column::Balance.gte(required));
    }

    Ok(update.exec(db).await?.rows_affected)
}

/// Inserts a completed entry whose balance effect has just been applied.
async fn insert_completed_entry<C>(
    db: &C,
    updated_user: &user::Model,
    kind: TransactionKind,
    amount: f64,
    description: String,
    reference: Option<String>,
    order_id: Option<i64>,
) -> Result<transaction::Model>
where
    C: ConnectionTrait,
{
    let delta = WalletDelta::for_kind(kind, amount);
    let now = chrono::Utc::now();

    transaction::ActiveModel {
        user_id: Set(updated_user.id),
        kind: Set(kind),
        amount: Set(amount),
        status: Set(TransactionStatus::Completed),
        balance_before: Set(Some(updated_user.balance - delta.balance)),
        balance_after: Set(Some(updated_user.balance)),
        order_id: Set(order_id),
        description: Set(description),
        reference: Set(reference),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Appends a completed ledger entry and moves the wallet counters accordingly.
///
/// - `deposit`: balance and `total_deposited` grow by `amount`
/// - `purchase`: balance shrinks, `total_spent` grows
/// - `refund`: balance grows, `total_spent` shrinks
/// - `admin_adjustment`: balance moves by `amount`, which may be negative
///
/// This does not check that the balance stays non-negative; purchase callers
/// check with [`has_enough_balance`] or use [`debit_purchase`].
pub async fn record_transaction<C>(
    db: &C,
    user_id: i64,
    kind: TransactionKind,
    amount: f64,
    description: String,
    reference: Option<String>,
    order_id: Option<i64>,
) -> Result<user::Model>
where
    C: ConnectionTrait + TransactionTrait,
{
    validate_amount(kind, amount)?;

    let txn = db.begin().await?;

    if apply_delta(&txn, user_id, WalletDelta::for_kind(kind, amount), None).await? == 0 {
        return Err(Error::UserNotFound {
            user_id: user_id.to_string(),
        });
    }

    let updated = require_user(&txn, user_id).await?;
    let entry =
        insert_completed_entry(&txn, &updated, kind, amount, description, reference, order_id)
            .await?;

    txn.commit().await?;

    info!(
        user_id,
        transaction_id = entry.id,
        kind = %kind,
        amount,
        balance = updated.balance,
        "wallet transaction recorded"
    );
    Ok(updated)
}

/// Debits a purchase only if the balance covers it, in one conditional update.
///
/// Two concurrent purchases can never both spend the same funds: the second one
/// finds `balance >= amount` false and fails with `InsufficientFunds`.
pub async fn debit_purchase<C>(
    db: &C,
    user_id: i64,
    amount: f64,
    description: String,
    order_id: Option<i64>,
) -> Result<user::Model>
where
    C: ConnectionTrait + TransactionTrait,
{
    validate_amount(TransactionKind::Purchase, amount)?;

    let txn = db.begin().await?;
    let delta = WalletDelta::for_kind(TransactionKind::Purchase, amount);

    if apply_delta(&txn, user_id, delta, Some(amount)).await? == 0 {
        let user = require_user(&txn, user_id).await?;
        return Err(Error::InsufficientFunds {
            current: user.balance,
            required: amount,
        });
    }

    let updated = require_user(&txn, user_id).await?;
    insert_completed_entry(
        &txn,
        &updated,
        TransactionKind::Purchase,
        amount,
        description,
        None,
        order_id,
    )
    .await?;

    txn.commit().await?;
    Ok(updated)
}

/// Applies an admin correction (positive or negative) to a user's balance.
pub async fn adjust_balance(
    db: &DatabaseConnection,
    user_id: i64,
    amount: f64,
    reason: &str,
    admin_id: i64,
) -> Result<user::Model> {
    let updated = record_transaction(
        db,
        user_id,
        TransactionKind::AdminAdjustment,
        amount,
        reason.to_string(),
        Some(format!("admin:{admin_id}")),
        None,
    )
    .await?;

    info!(target: "admin_audit", admin_id, user_id, amount, reason, "balance adjusted");
    Ok(updated)
}

/// Records a deposit request awaiting admin review. The balance is not touched.
pub async fn create_pending_deposit(
    db: &DatabaseConnection,
    user_id: i64,
    amount: f64,
    description: String,
) -> Result<transaction::Model> {
    validate_amount(TransactionKind::Deposit, amount)?;
    require_user(db, user_id).await?;

    let now = chrono::Utc::now();
    let entry = transaction::ActiveModel {
        user_id: Set(user_id),
        kind: Set(TransactionKind::Deposit),
        amount: Set(amount),
        status: Set(TransactionStatus::Pending),
        balance_before: Set(None),
        balance_after: Set(None),
        order_id: Set(None),
        description: Set(description),
        reference: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(user_id, transaction_id = entry.id, amount, "pending deposit created");
    Ok(entry)
}

/// Loads a pending deposit of `user_id`, failing when it cannot be decided.
async fn pending_deposit<C>(
    db: &C,
    user_id: i64,
    transaction_id: i64,
) -> Result<transaction::Model>
where
    C: ConnectionTrait,
{
    let entry = Transaction::find_by_id(transaction_id)
        .one(db)
        .await?
        .filter(|t| t.user_id == user_id)
        .ok_or(Error::TransactionNotFound { transaction_id })?;

    if entry.kind != TransactionKind::Deposit {
        return Err(Error::InvalidState {
            message: format!("Transaction {transaction_id} is a {} entry, not a deposit", entry.kind),
        });
    }

    if entry.status != TransactionStatus::Pending {
        return Err(Error::InvalidState {
            message: format!("Deposit {transaction_id} was already {}", entry.status),
        });
    }

    Ok(entry)
}

/// Moves a pending deposit to a terminal status, guarding against a concurrent
/// decision on the same entry.
async fn finalize_deposit<C>(
    db: &C,
    transaction_id: i64,
    status: TransactionStatus,
    description: String,
    balances: Option<(f64, f64)>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let mut update = Transaction::update_many()
        .col_expr(transaction::Column::Status, Expr::value(status))
        .col_expr(transaction::Column::Description, Expr::value(description))
        .col_expr(
            transaction::Column::UpdatedAt,
            Expr::value(chrono::Utc::now()),
        );

    if let Some((before, after)) = balances {
        update = update
            .col_expr(transaction::Column::BalanceBefore, Expr::value(before))
            .col_expr(transaction::Column::BalanceAfter, Expr::value(after));
    }

    let touched = update
        .filter(transaction::Column::Id.eq(transaction_id))
        .filter(transaction::Column::Status.eq(TransactionStatus::Pending))
        .exec(db)
        .await?
        .rows_affected;

    if touched == 0 {
        return Err(Error::InvalidState {
            message: format!("Deposit {transaction_id} was decided concurrently"),
        });
    }
    Ok(())
}

/// Approves a pending deposit: the entry becomes `completed` and its amount is
/// credited to `balance` and `total_deposited`.
///
/// # Errors
/// - `TransactionNotFound` when the id does not exist or belongs to another user
/// - `InvalidState` when the entry is not a deposit or is no longer pending
pub async fn approve_deposit(
    db: &DatabaseConnection,
    user_id: i64,
    transaction_id: i64,
) -> Result<user::Model> {
    let txn = db.begin().await?;

    let entry = pending_deposit(&txn, user_id, transaction_id).await?;
    let delta = WalletDelta::for_kind(TransactionKind::Deposit, entry.amount);

    if apply_delta(&txn, user_id, delta, None).await? == 0 {
        return Err(Error::UserNotFound {
            user_id: user_id.to_string(),
        });
    }
    let updated = require_user(&txn, user_id).await?;

    finalize_deposit(
        &txn,
        transaction_id,
        TransactionStatus::Completed,
        entry.description,
        Some((updated.balance - delta.balance, updated.balance)),
    )
    .await?;

    txn.commit().await?;

    info!(
        user_id,
        transaction_id,
        amount = entry.amount,
        balance = updated.balance,
        "deposit approved"
    );
    Ok(updated)
}

/// Rejects a pending deposit. The reason is appended to the description and the
/// balance is left untouched.
///
/// # Errors
/// Same preconditions as [`approve_deposit`].
pub async fn reject_deposit(
    db: &DatabaseConnection,
    user_id: i64,
    transaction_id: i64,
    reason: &str,
) -> Result<user::Model> {
    let txn = db.begin().await?;

    let entry = pending_deposit(&txn, user_id, transaction_id).await?;
    let description = format!("{} | Rejected: {reason}", entry.description);

    finalize_deposit(
        &txn,
        transaction_id,
        TransactionStatus::Rejected,
        description,
        None,
    )
    .await?;

    let user = require_user(&txn, user_id).await?;
    txn.commit().await?;

    info!(user_id, transaction_id, reason, "deposit rejected");
    Ok(user)
}

/// Retrieves a specific transaction by its unique ID.
pub async fn get_transaction_by_id(
    db: &DatabaseConnection,
    transaction_id: i64,
) -> Result<Option<transaction::Model>> {
    Transaction::find_by_id(transaction_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// A user's transactions, newest first, optionally limited.
pub async fn get_user_transactions(
    db: &DatabaseConnection,
    user_id: i64,
    limit: Option<u64>,
) -> Result<Vec<transaction::Model>> {
    Transaction::find()
        .filter(transaction::Column::UserId.eq(user_id))
        .order_by_desc(transaction::Column::Id)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}

/// The most recent transactions across all users.
pub async fn get_recent_transactions(
    db: &DatabaseConnection,
    limit: u64,
) -> Result<Vec<transaction::Model>> {
    Transaction::find()
        .order_by_desc(transaction::Column::Id)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deposits still waiting for an admin decision, oldest first.
pub async fn get_pending_deposits(db: &DatabaseConnection) -> Result<Vec<transaction::Model>> {
    Transaction::find()
        .filter(transaction::Column::Kind.eq(TransactionKind::Deposit))
        .filter(transaction::Column::Status.eq(TransactionStatus::Pending))
        .order_by_asc(transaction::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[test]
    fn test_wallet_delta_per_kind() {
        let deposit = WalletDelta::for_kind(TransactionKind::Deposit, 10.0);
        assert_eq!((deposit.balance, deposit.deposited, deposit.spent), (10.0, 10.0, 0.0));

        let purchase = WalletDelta::for_kind(TransactionKind::Purchase, 7.0);
        assert_eq!((purchase.balance, purchase.deposited, purchase.spent), (-7.0, 0.0, 7.0));

        let refund = WalletDelta::for_kind(TransactionKind::Refund, 7.0);
        assert_eq!((refund.balance, refund.deposited, refund.spent), (7.0, 0.0, -7.0));

        let adjustment = WalletDelta::for_kind(TransactionKind::AdminAdjustment, -3.0);
        assert_eq!(
            (adjustment.balance, adjustment.deposited, adjustment.spent),
            (-3.0, 0.0, 0.0)
        );
    }

    #[tokio::test]
    async fn test_record_transaction_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        for (kind, amount) in [
            (TransactionKind::Deposit, 0.0),
            (TransactionKind::Deposit, -5.0),
            (TransactionKind::Purchase, f64::NAN),
            (TransactionKind::Refund, f64::INFINITY),
            (TransactionKind::AdminAdjustment, 0.0),
        ] {
            let result =
                record_transaction(&db, 1, kind, amount, "test".to_string(), None, None).await;
            assert!(matches!(result.unwrap_err(), Error::InvalidAmount { amount: _ }));
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_record_transaction_updates_counters_and_log() -> Result<()> {
        let (db, user) = setup_with_user().await?;

        let after_deposit = record_transaction(
            &db,
            user.id,
            TransactionKind::Deposit,
            20.0,
            "manual deposit".to_string(),
            None,
            None,
        )
        .await?;
        assert_eq!(after_deposit.balance, 20.0);
        assert_eq!(after_deposit.total_deposited, 20.0);

        let after_purchase = record_transaction(
            &db,
            user.id,
            TransactionKind::Purchase,
            7.0,
            "order".to_string(),
            None,
            None,
        )
        .await?;
        assert_eq!(after_purchase.balance, 13.0);
        assert_eq!(after_purchase.total_spent, 7.0);

        let after_refund = record_transaction(
            &db,
            user.id,
            TransactionKind::Refund,
            2.0,
            "partial refund".to_string(),
            None,
            None,
        )
        .await?;
        assert_eq!(after_refund.balance, 15.0);
        assert_eq!(after_refund.total_spent, 5.0);

        let after_adjustment =
            adjust_balance(&db, user.id, -4.0, "correction", 1).await?;
        assert_eq!(after_adjustment.balance, 11.0);

        // balance = deposited - spent + adjustments
        assert_eq!(
            after_adjustment.balance,
            after_adjustment.total_deposited - after_adjustment.total_spent - 4.0
        );

        let log = get_user_transactions(&db, user.id, None).await?;
        assert_eq!(log.len(), 4);
        assert_eq!(log[0].kind, TransactionKind::AdminAdjustment);
        assert_eq!(log[0].reference.as_deref(), Some("admin:1"));
        assert_eq!(log[0].balance_before, Some(15.0));
        assert_eq!(log[0].balance_after, Some(11.0));
        assert!(log.iter().all(|t| t.status == TransactionStatus::Completed));
        Ok(())
    }

    #[tokio::test]
    async fn test_record_transaction_unknown_user() -> Result<()> {
        let db = setup_test_db().await?;
        let result = record_transaction(
            &db,
            42,
            TransactionKind::Deposit,
            5.0,
            "ghost".to_string(),
            None,
            None,
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::UserNotFound { user_id: _ }));
        assert!(get_recent_transactions(&db, 10).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_has_enough_balance() -> Result<()> {
        let (_db, user) = setup_with_balance(5.0).await?;
        assert!(has_enough_balance(&user, 5.0));
        assert!(!has_enough_balance(&user, 7.0));
        Ok(())
    }

    #[tokio::test]
    async fn test_debit_purchase_refuses_overdraft() -> Result<()> {
        let (db, user) = setup_with_balance(5.0).await?;

        let result = debit_purchase(&db, user.id, 7.0, "too much".to_string(), None).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InsufficientFunds {
                current: 5.0,
                required: 7.0
            }
        ));

        let reloaded = require_user(&db, user.id).await?;
        assert_eq!(reloaded.balance, 5.0);
        assert_eq!(reloaded.total_spent, 0.0);

        let paid = debit_purchase(&db, user.id, 5.0, "exact".to_string(), None).await?;
        assert_eq!(paid.balance, 0.0);
        assert_eq!(paid.total_spent, 5.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_pending_deposit_does_not_touch_balance() -> Result<()> {
        let (db, user) = setup_with_user().await?;

        let pending =
            create_pending_deposit(&db, user.id, 10.0, "Deposit 10 USDT via TRC20".to_string())
                .await?;
        assert_eq!(pending.status, TransactionStatus::Pending);
        assert_eq!(pending.balance_after, None);

        let reloaded = require_user(&db, user.id).await?;
        assert_eq!(reloaded.balance, 0.0);
        assert_eq!(get_pending_deposits(&db).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_pending_deposit_rejects_bad_amount() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let result = create_pending_deposit(&db, user.id, -1.0, "bad".to_string()).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidAmount { amount: _ }));
        Ok(())
    }

    #[tokio::test]
    async fn test_approve_deposit_credits_balance() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let pending = create_pending_deposit(&db, user.id, 10.0, "deposit".to_string()).await?;

        let approved = approve_deposit(&db, user.id, pending.id).await?;
        assert_eq!(approved.balance, 10.0);
        assert_eq!(approved.total_deposited, 10.0);

        let entry = get_transaction_by_id(&db, pending.id).await?.unwrap();
        assert_eq!(entry.status, TransactionStatus::Completed);
        assert_eq!(entry.balance_before, Some(0.0));
        assert_eq!(entry.balance_after, Some(10.0));
        assert!(get_pending_deposits(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_deposit_reaches_exactly_one_terminal_state() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        let pending = create_pending_deposit(&db, user.id, 10.0, "deposit".to_string()).await?;

        approve_deposit(&db, user.id, pending.id).await?;

        let again = approve_deposit(&db, user.id, pending.id).await;
        assert!(matches!(again.unwrap_err(), Error::InvalidState { message: _ }));

        let reject_after = reject_deposit(&db, user.id, pending.id, "late").await;
        assert!(matches!(reject_after.unwrap_err(), Error::InvalidState { message: _ }));

        let reloaded = require_user(&db, user.id).await?;
        assert_eq!(reloaded.balance, 10.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_reject_deposit_keeps_balance() -> Result<()> {
        let (db, user) = setup_with_balance(3.0).await?;
        let pending = create_pending_deposit(&db, user.id, 10.0, "deposit".to_string()).await?;

        let rejected = reject_deposit(&db, user.id, pending.id, "no proof").await?;
        assert_eq!(rejected.balance, 3.0);

        let entry = get_transaction_by_id(&db, pending.id).await?.unwrap();
        assert_eq!(entry.status, TransactionStatus::Rejected);
        assert_eq!(entry.description, "deposit | Rejected: no proof");

        let approve_after = approve_deposit(&db, user.id, pending.id).await;
        assert!(matches!(approve_after.unwrap_err(), Error::InvalidState { message: _ }));
        assert_eq!(require_user(&db, user.id).await?.balance, 3.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_decisions_on_unknown_or_foreign_entries() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_user(&db, "owner").await?;
        let other = create_test_user(&db, "other").await?;
        let pending = create_pending_deposit(&db, owner.id, 10.0, "deposit".to_string()).await?;

        let missing = approve_deposit(&db, owner.id, 999).await;
        assert!(matches!(
            missing.unwrap_err(),
            Error::TransactionNotFound { transaction_id: 999 }
        ));

        let foreign = reject_deposit(&db, other.id, pending.id, "nope").await;
        assert!(matches!(
            foreign.unwrap_err(),
            Error::TransactionNotFound { transaction_id: _ }
        ));

        assert_eq!(require_user(&db, owner.id).await?.balance, 0.0);
        assert_eq!(require_user(&db, other.id).await?.balance, 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_approve_non_deposit_entry() -> Result<()> {
        let (db, user) = setup_with_balance(10.0).await?;
        let log = get_user_transactions(&db, user.id, Some(1)).await?;

        let result = approve_deposit(&db, user.id, log[0].id).await;
        // The seeded deposit is already completed
        assert!(matches!(result.unwrap_err(), Error::InvalidState { message: _ }));

        debit_purchase(&db, user.id, 2.0, "order".to_string(), None).await?;
        let purchase = get_user_transactions(&db, user.id, Some(1)).await?;
        let result = reject_deposit(&db, user.id, purchase[0].id, "x").await;
        assert!(matches!(result.unwrap_err(), Error::InvalidState { message: _ }));
        Ok(())
    }
}
