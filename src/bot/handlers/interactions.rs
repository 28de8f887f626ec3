//! Button interactions.
//!
//! Deposit review messages carry `approve_deposit:<id>` and
//! `reject_deposit:<id>` buttons. Pressing one finalises the pending deposit
//! and replaces the buttons with the outcome.

use crate::{
    bot::{
        BotData,
        notify::{self, APPROVE_DEPOSIT, REJECT_DEPOSIT},
    },
    core::wallet,
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use tracing::info;

/// What an admin decided about a deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositDecision {
    /// Credit the deposit
    Approve,
    /// Discard the deposit
    Reject,
}

/// Reads a deposit decision out of a button id.
#[must_use]
pub fn parse_decision(custom_id: &str) -> Option<(DepositDecision, i64)> {
    let (decision, id) = if let Some(id) = custom_id.strip_prefix(APPROVE_DEPOSIT) {
        (DepositDecision::Approve, id)
    } else if let Some(id) = custom_id.strip_prefix(REJECT_DEPOSIT) {
        (DepositDecision::Reject, id)
    } else {
        return None;
    };
    id.parse().ok().map(|id| (decision, id))
}

/// Entry point for non-command gateway events.
pub async fn handle_event(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    data: &BotData,
) -> Result<()> {
    if let serenity::FullEvent::InteractionCreate {
        interaction: serenity::Interaction::Component(component),
    } = event
    {
        handle_component(ctx, component, data).await?;
    }
    Ok(())
}

async fn reply_ephemeral(
    ctx: &serenity::Context,
    component: &serenity::ComponentInteraction,
    text: String,
) -> Result<()> {
    component
        .create_response(
            &ctx.http,
            serenity::CreateInteractionResponse::Message(
                serenity::CreateInteractionResponseMessage::new()
                    .content(text)
                    .ephemeral(true),
            ),
        )
        .await
        .map_err(Into::into)
}

async fn handle_component(
    ctx: &serenity::Context,
    component: &serenity::ComponentInteraction,
    data: &BotData,
) -> Result<()> {
    let Some((decision, transaction_id)) = parse_decision(&component.data.custom_id) else {
        return Ok(());
    };

    let admin = component.user.id.to_string();
    if !data.config.is_admin_id(&admin) {
        return reply_ephemeral(ctx, component, "⛔ Only admins can review deposits.".to_string())
            .await;
    }

    let db = &data.database;
    let outcome = match wallet::get_transaction_by_id(db, transaction_id).await? {
        None => Err(Error::TransactionNotFound { transaction_id }),
        Some(entry) => match decision {
            DepositDecision::Approve => wallet::approve_deposit(db, entry.user_id, transaction_id)
                .await
                .map(|user| (user, entry)),
            DepositDecision::Reject => {
                wallet::reject_deposit(db, entry.user_id, transaction_id, "Rejected by admin")
                    .await
                    .map(|user| (user, entry))
            }
        },
    };

    let (user, entry) = match outcome {
        Ok(done) => done,
        Err(e) => return reply_ephemeral(ctx, component, e.user_message()).await,
    };

    info!(target: "admin_audit", admin = %admin, transaction_id, ?decision, "deposit reviewed");

    let (summary, user_text) = match decision {
        DepositDecision::Approve => (
            format!("✅ Deposit #{transaction_id} approved by <@{admin}>"),
            format!(
                "✅ Your deposit of {:.2} USDT was approved. New balance: {:.2} USDT",
                entry.amount, user.balance
            ),
        ),
        DepositDecision::Reject => (
            format!("❌ Deposit #{transaction_id} rejected by <@{admin}>"),
            format!(
                "❌ Your deposit of {:.2} USDT was rejected. Contact support if you think this is a mistake.",
                entry.amount
            ),
        ),
    };

    component
        .create_response(
            &ctx.http,
            serenity::CreateInteractionResponse::UpdateMessage(
                serenity::CreateInteractionResponseMessage::new()
                    .content(summary)
                    .components(vec![]),
            ),
        )
        .await?;

    notify::notify_user(&ctx.http, &user.external_id, user_text).await;
    Ok(())
}
