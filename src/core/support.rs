//! Support chat sessions.
//!
//! A session is a flag on the user plus two timestamps. It closes when the user
//! ends it or when no message arrived within the configured idle timeout.

use crate::{
    config::SupportConfig,
    core::user::require_user,
    entities::user,
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{DatabaseConnection, Set, prelude::*};
use tracing::info;

fn idle_timeout(config: SupportConfig) -> Duration {
    i64::try_from(config.timeout_secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

/// Whether an active session has been idle longer than the timeout at `now`.
#[must_use]
pub fn is_expired(user: &user::Model, config: SupportConfig, now: DateTime<Utc>) -> bool {
    let last = user.support_last_message_at.or(user.support_started_at);
    last.is_some_and(|at| now - at > idle_timeout(config))
}

/// Opens (or restarts) a support session.
pub async fn start_support_session(db: &DatabaseConnection, user_id: i64) -> Result<user::Model> {
    let now = Utc::now();
    let mut active: user::ActiveModel = require_user(db, user_id).await?.into();
    active.support_active = Set(true);
    active.support_started_at = Set(Some(now));
    active.support_last_message_at = Set(None);
    let updated = active.update(db).await?;

    info!(user_id, "support session started");
    Ok(updated)
}

/// Notes a message in the user's session so the idle timer restarts.
///
/// # Errors
/// `InvalidState` when no session is open, or when it timed out; a timed-out
/// session is closed as a side effect.
pub async fn record_support_message(
    db: &DatabaseConnection,
    config: SupportConfig,
    user_id: i64,
) -> Result<user::Model> {
    let current = require_user(db, user_id).await?;
    if !current.support_active {
        return Err(Error::InvalidState {
            message: "No active support session".to_string(),
        });
    }

    let now = Utc::now();
    if is_expired(&current, config, now) {
        end_support_session(db, user_id).await?;
        return Err(Error::InvalidState {
            message: "The support session timed out".to_string(),
        });
    }

    let mut active: user::ActiveModel = current.into();
    active.support_last_message_at = Set(Some(now));
    active.update(db).await.map_err(Into::into)
}

/// Closes the session. Closing a closed session is a no-op.
pub async fn end_support_session(db: &DatabaseConnection, user_id: i64) -> Result<user::Model> {
    let current = require_user(db, user_id).await?;
    if !current.support_active {
        return Ok(current);
    }

    let mut active: user::ActiveModel = current.into();
    active.support_active = Set(false);
    let updated = active.update(db).await?;

    info!(user_id, "support session ended");
    Ok(updated)
}
