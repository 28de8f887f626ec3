//! Direct-message notifications.
//!
//! Delivery is best effort: a failure to reach one recipient is logged and the
//! rest still get their message. Ledger writes are committed before any
//! notification is attempted.

use crate::{
    config::AppConfig,
    core::conversation::Network,
    entities::{TransactionModel, UserModel},
};
use poise::serenity_prelude as serenity;
use tracing::{info, warn};

/// Button id prefix for approving a deposit.
pub const APPROVE_DEPOSIT: &str = "approve_deposit:";
/// Button id prefix for rejecting a deposit.
pub const REJECT_DEPOSIT: &str = "reject_deposit:";

/// Sends `message` to every configured admin and returns how many received it.
pub async fn notify_admins(
    http: &serenity::Http,
    config: &AppConfig,
    message: serenity::CreateMessage,
) -> usize {
    let mut delivered = 0;
    for &admin_id in &config.admin_ids {
        match serenity::UserId::new(admin_id)
            .direct_message(http, message.clone())
            .await
        {
            Ok(_) => delivered += 1,
            Err(e) => warn!(admin_id, error = %e, "failed to notify admin"),
        }
    }
    info!(delivered, admins = config.admin_ids.len(), "admin notification sent");
    delivered
}

/// Sends a plain text message to a user by their stored platform id.
pub async fn notify_user(http: &serenity::Http, external_id: &str, text: impl Into<String>) {
    let Ok(id) = external_id.parse::<u64>() else {
        warn!(external_id, "cannot message user with a non-numeric id");
        return;
    };
    let message = serenity::CreateMessage::new().content(text);
    if let Err(e) = serenity::UserId::new(id).direct_message(http, message).await {
        warn!(external_id, error = %e, "failed to notify user");
    }
}

/// Review request for a new deposit, with approve and reject buttons.
#[must_use]
pub fn deposit_review_message(
    user: &UserModel,
    entry: &TransactionModel,
    network: Network,
    proof_url: &str,
) -> serenity::CreateMessage {
    let who = user
        .username
        .as_deref()
        .map_or_else(|| user.display_name.clone(), |name| format!("@{name}"));

    let embed = serenity::CreateEmbed::new()
        .title("💰 New deposit request")
        .field("User", format!("{who} ({})", user.external_id), false)
        .field("Amount", format!("{:.2} USDT", entry.amount), true)
        .field("Network", network.to_string(), true)
        .field("Transaction", format!("#{}", entry.id), true)
        .image(proof_url)
        .color(0x00F1_C40F);

    let buttons = serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new(format!("{APPROVE_DEPOSIT}{}", entry.id))
            .label("Approve")
            .style(serenity::ButtonStyle::Success),
        serenity::CreateButton::new(format!("{REJECT_DEPOSIT}{}", entry.id))
            .label("Reject")
            .style(serenity::ButtonStyle::Danger),
    ]);

    serenity::CreateMessage::new()
        .embed(embed)
        .components(vec![buttons])
}

/// Support message forwarded to admins.
#[must_use]
pub fn support_forward_message(user: &UserModel, text: &str) -> serenity::CreateMessage {
    serenity::CreateMessage::new().content(format!(
        "🆘 Support message from {} ({}):\n{text}",
        user.display_name, user.external_id
    ))
}
