//! User business logic - registration, preferences and moderation flags.
//!
//! Users are found or created on first contact and never deleted. Wallet fields
//! are deliberately absent from everything in this module; they change only
//! through [`crate::core::wallet`].

use crate::{
    config::AppConfig,
    entities::{User, user},
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, Set, prelude::*, sea_query::OnConflict};
use tracing::info;

/// Identity data supplied by the chat platform on first contact.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Opaque platform user id
    pub external_id: String,
    /// Platform username, if any
    pub username: Option<String>,
    /// Display name
    pub display_name: String,
}

/// Finds a user by platform id, creating them if this is their first contact.
///
/// New users get the configured default language and are flagged as admins when
/// their platform id is listed in `admin_ids`. Returns the user and whether it was
/// just created.
pub async fn find_or_create(
    db: &DatabaseConnection,
    config: &AppConfig,
    new_user: NewUser,
) -> Result<(user::Model, bool)> {
    if new_user.external_id.trim().is_empty() {
        return Err(Error::Validation {
            message: "External user id cannot be empty".to_string(),
        });
    }

    if let Some(existing) = get_user_by_external_id(db, &new_user.external_id).await? {
        return Ok((existing, false));
    }

    insert_if_absent(db, config, new_user).await
}

/// Inserts the user unless a row with the same platform id already exists, then
/// reads the stored row back.
///
/// Two first contacts racing past the lookup in [`find_or_create`] both end up
/// here; the unique `external_id` index lets exactly one insert through and the
/// other reads the winner's row.
async fn insert_if_absent(
    db: &DatabaseConnection,
    config: &AppConfig,
    new_user: NewUser,
) -> Result<(user::Model, bool)> {
    let now = chrono::Utc::now();
    let external_id = new_user.external_id.clone();
    let is_admin = config.is_admin_id(&external_id);
    let user = user::ActiveModel {
        external_id: Set(new_user.external_id),
        username: Set(new_user.username),
        display_name: Set(new_user.display_name),
        language: Set(config.default_language.clone()),
        balance: Set(0.0),
        total_deposited: Set(0.0),
        total_spent: Set(0.0),
        is_admin: Set(is_admin),
        is_blocked: Set(false),
        joined_channels: Set(false),
        support_active: Set(false),
        support_started_at: Set(None),
        support_last_message_at: Set(None),
        registered_at: Set(now),
        last_activity: Set(now),
        ..Default::default()
    };

    let inserted = User::insert(user)
        .on_conflict(
            OnConflict::column(user::Column::ExternalId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    let stored = require_user_by_external_id(db, &external_id).await?;
    let created = inserted > 0;
    if created {
        info!(user_id = stored.id, external_id = %stored.external_id, is_admin, "registered new user");
    }
    Ok((stored, created))
}

/// Finds a user by platform id.
pub async fn get_user_by_external_id(
    db: &DatabaseConnection,
    external_id: &str,
) -> Result<Option<user::Model>> {
    User::find()
        .filter(user::Column::ExternalId.eq(external_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a user by internal id.
pub async fn get_user_by_id<C>(db: &C, user_id: i64) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// Like [`get_user_by_id`] but a missing user is an error.
pub async fn require_user<C>(db: &C, user_id: i64) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    get_user_by_id(db, user_id)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            user_id: user_id.to_string(),
        })
}

/// Like [`get_user_by_external_id`] but a missing user is an error.
pub async fn require_user_by_external_id(
    db: &DatabaseConnection,
    external_id: &str,
) -> Result<user::Model> {
    get_user_by_external_id(db, external_id)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            user_id: external_id.to_string(),
        })
}

/// Changes a user's language after checking it is supported.
pub async fn set_language(
    db: &DatabaseConnection,
    config: &AppConfig,
    user_id: i64,
    language: &str,
) -> Result<user::Model> {
    if !config.supports_language(language) {
        return Err(Error::Validation {
            message: format!("Unsupported language '{language}'"),
        });
    }

    let mut user: user::ActiveModel = require_user(db, user_id).await?.into();
    user.language = Set(language.to_string());
    user.update(db).await.map_err(Into::into)
}

/// Records that the user passed the required-channel membership check.
pub async fn mark_joined_channels(db: &DatabaseConnection, user_id: i64) -> Result<user::Model> {
    let mut user: user::ActiveModel = require_user(db, user_id).await?.into();
    user.joined_channels = Set(true);
    user.update(db).await.map_err(Into::into)
}

/// Blocks or unblocks a user.
pub async fn set_blocked(
    db: &DatabaseConnection,
    user_id: i64,
    blocked: bool,
) -> Result<user::Model> {
    let mut user: user::ActiveModel = require_user(db, user_id).await?.into();
    user.is_blocked = Set(blocked);
    user.update(db).await.map_err(Into::into)
}

/// Stamps the user's last activity time.
pub async fn touch_activity(db: &DatabaseConnection, user_id: i64) -> Result<()> {
    let mut user: user::ActiveModel = require_user(db, user_id).await?.into();
    user.last_activity = Set(chrono::Utc::now());
    user.update(db).await?;
    Ok(())
}

/// Number of registered users.
pub async fn count_users(db: &DatabaseConnection) -> Result<u64> {
    User::find().count(db).await.map_err(Into::into)
}
