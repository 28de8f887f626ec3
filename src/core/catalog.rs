//! Catalog store - which `(type, year, month)` combinations are offered.
//!
//! A catalog is keyed by `(type, year)` and owns one row per month it has ever
//! listed. Months are switched off rather than deleted so older orders keep
//! pointing at something that exists.

use crate::{
    core::stock::ProductKey,
    entities::{Catalog, CatalogMonth, Month, ProductType, catalog, catalog_month},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use std::collections::BTreeSet;
use tracing::info;

/// A catalog together with its month rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogWithMonths {
    /// The catalog record
    pub catalog: catalog::Model,
    /// Month rows, calendar order, including switched-off months
    pub months: Vec<catalog_month::Model>,
}

impl CatalogWithMonths {
    fn new(catalog: catalog::Model, mut months: Vec<catalog_month::Model>) -> Self {
        months.sort_by_key(|m| m.month);
        Self { catalog, months }
    }

    /// Months currently offered, calendar order.
    #[must_use]
    pub fn active_months(&self) -> Vec<Month> {
        self.months
            .iter()
            .filter(|m| m.is_active)
            .map(|m| m.month)
            .collect()
    }
}

fn validate_months(months: &[Month]) -> Result<BTreeSet<Month>> {
    if months.is_empty() {
        return Err(Error::Validation {
            message: "A catalog needs at least one month".to_string(),
        });
    }
    Ok(months.iter().copied().collect())
}

fn not_found(product_type: ProductType, year: i32) -> Error {
    Error::CatalogNotFound {
        key: format!("{product_type} {year}"),
    }
}

async fn find_catalog<C>(
    db: &C,
    product_type: ProductType,
    year: i32,
) -> Result<Option<catalog::Model>>
where
    C: ConnectionTrait,
{
    Catalog::find()
        .filter(catalog::Column::ProductType.eq(product_type))
        .filter(catalog::Column::Year.eq(year))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn load_months<C>(db: &C, catalog_id: i64) -> Result<Vec<catalog_month::Model>>
where
    C: ConnectionTrait,
{
    CatalogMonth::find()
        .filter(catalog_month::Column::CatalogId.eq(catalog_id))
        .all(db)
        .await
        .map_err(Into::into)
}

/// Brings the month rows of a catalog in line with `wanted`.
///
/// Months in `wanted` end up active, creating rows as needed. When
/// `switch_off_others` is set, rows for months outside `wanted` are switched off.
async fn merge_months<C>(
    db: &C,
    catalog_id: i64,
    wanted: &BTreeSet<Month>,
    switch_off_others: bool,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let existing = load_months(db, catalog_id).await?;

    for row in &existing {
        let should_be_active = if wanted.contains(&row.month) {
            true
        } else if switch_off_others {
            false
        } else {
            row.is_active
        };
        if row.is_active != should_be_active {
            let mut active: catalog_month::ActiveModel = row.clone().into();
            active.is_active = Set(should_be_active);
            active.update(db).await?;
        }
    }

    for month in wanted {
        if !existing.iter().any(|row| row.month == *month) {
            catalog_month::ActiveModel {
                catalog_id: Set(catalog_id),
                month: Set(*month),
                is_active: Set(true),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
    }

    Ok(())
}

/// Looks up a catalog with its months.
pub async fn get_catalog<C>(
    db: &C,
    product_type: ProductType,
    year: i32,
) -> Result<Option<CatalogWithMonths>>
where
    C: ConnectionTrait,
{
    let Some(catalog) = find_catalog(db, product_type, year).await? else {
        return Ok(None);
    };
    let months = load_months(db, catalog.id).await?;
    Ok(Some(CatalogWithMonths::new(catalog, months)))
}

/// Adds months to the catalog for `(type, year)`, creating it if needed.
///
/// On an existing catalog the given months are switched on and the others are
/// left as they were. The catalog itself is reactivated.
pub async fn add_catalog(
    db: &DatabaseConnection,
    product_type: ProductType,
    year: i32,
    months: &[Month],
    admin_id: i64,
) -> Result<CatalogWithMonths> {
    let wanted = validate_months(months)?;
    let txn = db.begin().await?;
    let now = chrono::Utc::now();

    let catalog = if let Some(existing) = find_catalog(&txn, product_type, year).await? {
        let mut active: catalog::ActiveModel = existing.into();
        active.is_active = Set(true);
        active.last_updated_by = Set(Some(admin_id));
        active.last_updated_at = Set(Some(now));
        active.update(&txn).await?
    } else {
        catalog::ActiveModel {
            product_type: Set(product_type),
            year: Set(year),
            is_active: Set(true),
            added_by: Set(admin_id),
            added_at: Set(now),
            last_updated_by: Set(None),
            last_updated_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?
    };

    merge_months(&txn, catalog.id, &wanted, false).await?;
    let months = load_months(&txn, catalog.id).await?;
    txn.commit().await?;

    info!(target: "admin_audit", admin_id, %product_type, year, months = wanted.len(), "catalog months added");
    Ok(CatalogWithMonths::new(catalog, months))
}

/// Replaces the offered months of an existing catalog.
///
/// Months in `months` are switched on; every other listed month is switched off
/// but kept.
///
/// # Errors
/// `CatalogNotFound` when `(type, year)` has no catalog.
pub async fn update_catalog(
    db: &DatabaseConnection,
    product_type: ProductType,
    year: i32,
    months: &[Month],
    admin_id: i64,
) -> Result<CatalogWithMonths> {
    let wanted = validate_months(months)?;
    let txn = db.begin().await?;

    let existing = find_catalog(&txn, product_type, year)
        .await?
        .ok_or_else(|| not_found(product_type, year))?;

    let mut active: catalog::ActiveModel = existing.into();
    active.last_updated_by = Set(Some(admin_id));
    active.last_updated_at = Set(Some(chrono::Utc::now()));
    let catalog = active.update(&txn).await?;

    merge_months(&txn, catalog.id, &wanted, true).await?;
    let months = load_months(&txn, catalog.id).await?;
    txn.commit().await?;

    info!(target: "admin_audit", admin_id, %product_type, year, months = wanted.len(), "catalog months replaced");
    Ok(CatalogWithMonths::new(catalog, months))
}

/// Hides a whole catalog from the shop.
///
/// # Errors
/// `CatalogNotFound` when `(type, year)` has no catalog.
pub async fn deactivate_catalog(
    db: &DatabaseConnection,
    product_type: ProductType,
    year: i32,
    admin_id: i64,
) -> Result<catalog::Model> {
    let existing = find_catalog(db, product_type, year)
        .await?
        .ok_or_else(|| not_found(product_type, year))?;

    let mut active: catalog::ActiveModel = existing.into();
    active.is_active = Set(false);
    active.last_updated_by = Set(Some(admin_id));
    active.last_updated_at = Set(Some(chrono::Utc::now()));
    let catalog = active.update(db).await?;

    info!(target: "admin_audit", admin_id, %product_type, year, "catalog deactivated");
    Ok(catalog)
}

/// Active catalogs with their months, newest year first.
pub async fn get_active_catalogs(db: &DatabaseConnection) -> Result<Vec<CatalogWithMonths>> {
    let rows = Catalog::find()
        .filter(catalog::Column::IsActive.eq(true))
        .order_by_desc(catalog::Column::Year)
        .order_by_asc(catalog::Column::ProductType)
        .find_with_related(CatalogMonth)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(catalog, months)| CatalogWithMonths::new(catalog, months))
        .collect())
}

/// Active catalogs of one product type, newest year first.
pub async fn get_active_catalogs_by_type(
    db: &DatabaseConnection,
    product_type: ProductType,
) -> Result<Vec<CatalogWithMonths>> {
    let rows = Catalog::find()
        .filter(catalog::Column::IsActive.eq(true))
        .filter(catalog::Column::ProductType.eq(product_type))
        .order_by_desc(catalog::Column::Year)
        .find_with_related(CatalogMonth)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(catalog, months)| CatalogWithMonths::new(catalog, months))
        .collect())
}

/// Years with an active catalog for a product type, newest first.
pub async fn get_available_years(
    db: &DatabaseConnection,
    product_type: ProductType,
) -> Result<Vec<i32>> {
    let catalogs = Catalog::find()
        .filter(catalog::Column::IsActive.eq(true))
        .filter(catalog::Column::ProductType.eq(product_type))
        .order_by_desc(catalog::Column::Year)
        .all(db)
        .await?;
    Ok(catalogs.into_iter().map(|c| c.year).collect())
}

/// Months offered for `(type, year)` in calendar order. Empty when the catalog
/// is missing or inactive.
pub async fn get_available_months<C>(
    db: &C,
    product_type: ProductType,
    year: i32,
) -> Result<Vec<Month>>
where
    C: ConnectionTrait,
{
    Ok(get_catalog(db, product_type, year)
        .await?
        .filter(|c| c.catalog.is_active)
        .map(|c| c.active_months())
        .unwrap_or_default())
}

/// Whether the key's month is currently offered.
pub async fn is_month_available<C>(db: &C, key: ProductKey) -> Result<bool>
where
    C: ConnectionTrait,
{
    Ok(get_available_months(db, key.product_type, key.year)
        .await?
        .contains(&key.month))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_empty_month_list_rejected() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = add_catalog(&db, ProductType::Group, 2024, &[], 1).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { message: _ }));
        Ok(())
    }

    #[tokio::test]
    async fn test_add_catalog_merges_months() -> Result<()> {
        let db = setup_test_db().await?;

        let created = add_catalog(
            &db,
            ProductType::Group,
            2024,
            &[Month::March, Month::January],
            1,
        )
        .await?;
        assert_eq!(created.active_months(), vec![Month::January, Month::March]);

        let merged = add_catalog(&db, ProductType::Group, 2024, &[Month::February], 2).await?;
        assert_eq!(merged.catalog.id, created.catalog.id);
        assert_eq!(
            merged.active_months(),
            vec![Month::January, Month::February, Month::March]
        );
        assert_eq!(merged.catalog.last_updated_by, Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_catalog_soft_removes_months() -> Result<()> {
        let db = setup_test_db().await?;
        add_catalog(
            &db,
            ProductType::Channel,
            2023,
            &[Month::January, Month::February, Month::March],
            1,
        )
        .await?;

        let updated = update_catalog(
            &db,
            ProductType::Channel,
            2023,
            &[Month::February, Month::April],
            1,
        )
        .await?;

        assert_eq!(updated.active_months(), vec![Month::February, Month::April]);
        // Removed months stay as inactive rows
        assert_eq!(updated.months.len(), 4);
        assert!(!updated.months.iter().find(|m| m.month == Month::January).unwrap().is_active);

        let key = ProductKey::new(ProductType::Channel, 2023, Month::January);
        assert!(!is_month_available(&db, key).await?);
        let key = ProductKey::new(ProductType::Channel, 2023, Month::April);
        assert!(is_month_available(&db, key).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_missing_catalog() -> Result<()> {
        let db = setup_test_db().await?;

        let result = update_catalog(&db, ProductType::Group, 2030, &[Month::May], 1).await;
        assert!(matches!(result.unwrap_err(), Error::CatalogNotFound { key: _ }));

        let result = deactivate_catalog(&db, ProductType::Group, 2030, 1).await;
        assert!(matches!(result.unwrap_err(), Error::CatalogNotFound { key: _ }));
        Ok(())
    }

    #[tokio::test]
    async fn test_active_listings() -> Result<()> {
        let db = setup_test_db().await?;
        add_catalog(&db, ProductType::Group, 2023, &[Month::June], 1).await?;
        add_catalog(&db, ProductType::Group, 2024, &[Month::July], 1).await?;
        add_catalog(&db, ProductType::Channel, 2024, &[Month::August], 1).await?;

        let all = get_active_catalogs(&db).await?;
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].catalog.year, 2024);
        assert_eq!(all[2].catalog.year, 2023);

        assert_eq!(get_available_years(&db, ProductType::Group).await?, vec![2024, 2023]);

        deactivate_catalog(&db, ProductType::Group, 2024, 1).await?;
        assert_eq!(get_available_years(&db, ProductType::Group).await?, vec![2023]);
        assert!(get_available_months(&db, ProductType::Group, 2024).await?.is_empty());
        assert_eq!(
            get_available_months(&db, ProductType::Group, 2023).await?,
            vec![Month::June]
        );

        let channels = get_active_catalogs_by_type(&db, ProductType::Channel).await?;
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].active_months(), vec![Month::August]);
        Ok(())
    }
}
