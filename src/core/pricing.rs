//! Price overrides per `(type, year, month)` with configured per-type defaults.

use crate::{
    config::DefaultPricing,
    core::{append_note, stock::ProductKey},
    entities::{Pricing, ProductType, pricing},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*};
use tracing::info;

fn key_filter(key: ProductKey) -> sea_orm::Condition {
    sea_orm::Condition::all()
        .add(pricing::Column::ProductType.eq(key.product_type))
        .add(pricing::Column::Year.eq(key.year))
        .add(pricing::Column::Month.eq(key.month))
}

fn sort_for_display(records: &mut [pricing::Model]) {
    records.sort_by(|a, b| b.year.cmp(&a.year).then(a.month.cmp(&b.month)));
}

/// Finds the override record for a key, active or not.
pub async fn get_pricing<C>(db: &C, key: ProductKey) -> Result<Option<pricing::Model>>
where
    C: ConnectionTrait,
{
    Pricing::find()
        .filter(key_filter(key))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Unit price for a key: the active override if there is one, otherwise the
/// default for the product type.
pub async fn get_price<C>(db: &C, defaults: &DefaultPricing, key: ProductKey) -> Result<f64>
where
    C: ConnectionTrait,
{
    let price = get_pricing(db, key)
        .await?
        .filter(|p| p.is_active)
        .map_or_else(|| defaults.for_type(key.product_type), |p| p.price);
    Ok(price)
}

/// Creates or updates the override for a key.
///
/// An existing override is updated in place and reactivated; only
/// `last_updated_by`/`last_updated_at` (and the note log) record the change.
pub async fn set_price(
    db: &DatabaseConnection,
    key: ProductKey,
    price: f64,
    admin_id: i64,
    notes: Option<&str>,
) -> Result<pricing::Model> {
    if !price.is_finite() || price <= 0.0 {
        return Err(Error::InvalidAmount { amount: price });
    }

    let now = chrono::Utc::now();
    let record = if let Some(existing) = get_pricing(db, key).await? {
        let existing_notes = existing.notes.clone();
        let mut active: pricing::ActiveModel = existing.into();
        active.price = Set(price);
        active.is_active = Set(true);
        active.last_updated_by = Set(Some(admin_id));
        active.last_updated_at = Set(Some(now));
        active.notes = Set(append_note(existing_notes, notes, now));
        active.update(db).await?
    } else {
        pricing::ActiveModel {
            product_type: Set(key.product_type),
            year: Set(key.year),
            month: Set(key.month),
            price: Set(price),
            is_active: Set(true),
            set_by: Set(admin_id),
            set_at: Set(now),
            last_updated_by: Set(None),
            last_updated_at: Set(None),
            notes: Set(append_note(None, notes, now)),
            ..Default::default()
        }
        .insert(db)
        .await?
    };

    info!(target: "admin_audit", admin_id, key = %key, price, "price set");
    Ok(record)
}

/// Switches an override off so the default price applies again.
///
/// # Errors
/// `PricingNotFound` when the key has no override.
pub async fn deactivate_price(
    db: &DatabaseConnection,
    key: ProductKey,
    admin_id: i64,
) -> Result<pricing::Model> {
    let existing = get_pricing(db, key)
        .await?
        .ok_or_else(|| Error::PricingNotFound {
            key: key.to_string(),
        })?;

    let mut active: pricing::ActiveModel = existing.into();
    active.is_active = Set(false);
    active.last_updated_by = Set(Some(admin_id));
    active.last_updated_at = Set(Some(chrono::Utc::now()));
    let record = active.update(db).await?;

    info!(target: "admin_audit", admin_id, key = %key, "price override removed");
    Ok(record)
}

/// All active overrides, newest year first.
pub async fn get_all_active_pricing(db: &DatabaseConnection) -> Result<Vec<pricing::Model>> {
    let mut records = Pricing::find()
        .filter(pricing::Column::IsActive.eq(true))
        .all(db)
        .await?;
    sort_for_display(&mut records);
    Ok(records)
}

/// Active overrides of one product type, newest year first.
pub async fn get_active_pricing_by_type(
    db: &DatabaseConnection,
    product_type: ProductType,
) -> Result<Vec<pricing::Model>> {
    let mut records = Pricing::find()
        .filter(pricing::Column::IsActive.eq(true))
        .filter(pricing::Column::ProductType.eq(product_type))
        .all(db)
        .await?;
    sort_for_display(&mut records);
    Ok(records)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::entities::Month;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn key(product_type: ProductType) -> ProductKey {
        ProductKey::new(product_type, 2024, Month::January)
    }

    #[tokio::test]
    async fn test_rejects_bad_price() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = set_price(&db, key(ProductType::Group), -1.0, 1, None).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidAmount { amount: _ }));

        let result = set_price(&db, key(ProductType::Group), 0.0, 1, None).await;
        assert!(result.is_err());

        let result = set_price(&db, key(ProductType::Group), f64::NAN, 1, None).await;
        assert!(result.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_falls_back_to_type_defaults() -> Result<()> {
        let db = setup_test_db().await?;
        let defaults = DefaultPricing::default();

        assert_eq!(get_price(&db, &defaults, key(ProductType::Group)).await?, 5.0);
        assert_eq!(get_price(&db, &defaults, key(ProductType::Channel)).await?, 7.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_override_and_deactivate() -> Result<()> {
        let db = setup_test_db().await?;
        let defaults = DefaultPricing::default();

        set_price(&db, key(ProductType::Group), 3.5, 1, Some("promo")).await?;
        assert_eq!(get_price(&db, &defaults, key(ProductType::Group)).await?, 3.5);
        assert_eq!(get_active_pricing_by_type(&db, ProductType::Group).await?.len(), 1);
        assert!(get_active_pricing_by_type(&db, ProductType::Channel).await?.is_empty());

        deactivate_price(&db, key(ProductType::Group), 1).await?;
        assert_eq!(get_price(&db, &defaults, key(ProductType::Group)).await?, 5.0);
        assert!(get_all_active_pricing(&db).await?.is_empty());

        let reactivated = set_price(&db, key(ProductType::Group), 4.0, 2, None).await?;
        assert!(reactivated.is_active);
        assert_eq!(get_price(&db, &defaults, key(ProductType::Group)).await?, 4.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_set_price_twice_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let defaults = DefaultPricing::default();

        let first = set_price(&db, key(ProductType::Channel), 9.0, 1, None).await?;
        let second = set_price(&db, key(ProductType::Channel), 9.0, 2, None).await?;

        assert_eq!(first.id, second.id);
        assert_eq!(second.price, 9.0);
        assert_eq!(second.set_by, 1);
        assert_eq!(second.last_updated_by, Some(2));
        assert!(second.last_updated_at.unwrap() >= second.set_at);
        assert_eq!(get_price(&db, &defaults, key(ProductType::Channel)).await?, 9.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_deactivate_missing() -> Result<()> {
        let db = setup_test_db().await?;

        let result = deactivate_price(&db, key(ProductType::Group), 1).await;
        assert!(matches!(result.unwrap_err(), Error::PricingNotFound { key: _ }));
        Ok(())
    }
}
