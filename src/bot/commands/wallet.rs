//! Wallet commands - balance, history and the deposit conversation.
//!
//! A deposit takes three steps (`/deposit`, `/deposit_network`,
//! `/deposit_proof`). The step a user is at lives in
//! [`BotData::conversations`](crate::bot::BotData); the lock is held only to
//! read or write the entry, never across a database call.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, commands::NetworkChoice, current_user, notify},
        core::{
            conversation::{self, DepositFlow, Network},
            wallet,
        },
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use tracing::info;

    async fn take_flow(ctx: poise::Context<'_, BotData, Error>, user_id: i64) -> DepositFlow {
        ctx.data()
            .conversations
            .lock()
            .await
            .remove(&user_id)
            .unwrap_or_else(DepositFlow::start)
    }

    async fn store_flow(ctx: poise::Context<'_, BotData, Error>, user_id: i64, flow: DepositFlow) {
        let mut conversations = ctx.data().conversations.lock().await;
        if flow.is_finished() {
            conversations.remove(&user_id);
        } else {
            conversations.insert(user_id, flow);
        }
    }

    fn network_menu() -> String {
        Network::ALL
            .iter()
            .map(|n| format!("• {}", n.label()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Shows your wallet balance.
    #[poise::command(slash_command, prefix_command)]
    pub async fn wallet(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let me = current_user(ctx).await?;

        let embed = serenity::CreateEmbed::default()
            .title("💼 Wallet")
            .field("Balance", format!("{:.2} USDT", me.balance), false)
            .field("Deposited", format!("{:.2} USDT", me.total_deposited), true)
            .field("Spent", format!("{:.2} USDT", me.total_spent), true)
            .footer(serenity::CreateEmbedFooter::new(
                "Top up with /deposit, see /history for details",
            ))
            .color(0x002E_CC71);

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Shows your recent wallet transactions.
    #[poise::command(slash_command, prefix_command)]
    pub async fn history(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "How many entries to show (default 10)"]
        #[min = 1]
        #[max = 50]
        limit: Option<u64>,
    ) -> Result<()> {
        let me = current_user(ctx).await?;
        let entries =
            wallet::get_user_transactions(&ctx.data().database, me.id, Some(limit.unwrap_or(10)))
                .await?;

        if entries.is_empty() {
            ctx.say("📭 No transactions yet.").await?;
            return Ok(());
        }

        let mut response = String::from("📜 **Recent transactions**\n");
        for entry in &entries {
            response.push_str(&format!(
                "`#{}` {} {:+.2} USDT ({}) - {} - {}\n",
                entry.id,
                entry.kind,
                entry.amount,
                entry.status,
                entry.description,
                entry.created_at.format("%Y-%m-%d %H:%M")
            ));
        }

        ctx.say(response).await?;
        Ok(())
    }

    /// Starts a deposit. Pass an amount, or leave it out to see the options.
    #[poise::command(slash_command, prefix_command)]
    pub async fn deposit(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Amount in USDT"] amount: Option<f64>,
    ) -> Result<()> {
        let me = current_user(ctx).await?;
        let wallet_config = &ctx.data().config.wallet;

        let Some(amount) = amount else {
            store_flow(ctx, me.id, DepositFlow::start()).await;
            let options = wallet_config
                .predefined_amounts
                .iter()
                .map(|a| format!("`{a}`"))
                .collect::<Vec<_>>()
                .join(", ");
            ctx.say(format!(
                "💰 How much would you like to deposit?\nQuick options: {options} USDT (minimum {} USDT).\nRun `/deposit <amount>` to continue.",
                wallet_config.min_deposit
            ))
            .await?;
            return Ok(());
        };

        // A new amount always restarts the conversation.
        take_flow(ctx, me.id).await;
        let flow = DepositFlow::start().choose_amount(amount, wallet_config)?;
        store_flow(ctx, me.id, flow).await;

        ctx.say(format!(
            "💰 Deposit of **{amount:.2} USDT**. Which network will you pay on?\n{}\nRun `/deposit_network` to choose.",
            network_menu()
        ))
        .await?;
        Ok(())
    }

    /// Chooses the network for your deposit and shows where to pay.
    #[poise::command(slash_command, prefix_command)]
    pub async fn deposit_network(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Network"] network: NetworkChoice,
    ) -> Result<()> {
        let me = current_user(ctx).await?;
        let network: Network = network.into();

        let flow = take_flow(ctx, me.id).await;
        let next = match flow.choose_network(network) {
            Ok(next) => next,
            Err(e) => {
                store_flow(ctx, me.id, flow).await;
                return Err(e);
            }
        };
        store_flow(ctx, me.id, next).await;

        let DepositFlow::AwaitingProof { amount, .. } = next else {
            return Ok(());
        };
        ctx.say(format!(
            "📨 Send exactly **{amount:.2} USDT** via **{}** to:\n`{}`\n\nThen upload a screenshot of the payment with `/deposit_proof`.",
            network.label(),
            network.address(&ctx.data().config.wallet)
        ))
        .await?;
        Ok(())
    }

    /// Uploads the proof of payment for your deposit.
    #[poise::command(slash_command)]
    pub async fn deposit_proof(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Screenshot of the payment"] proof: serenity::Attachment,
    ) -> Result<()> {
        let me = current_user(ctx).await?;
        conversation::check_proof_image(proof.content_type.as_deref())?;

        let flow = take_flow(ctx, me.id).await;
        let DepositFlow::AwaitingProof { network, .. } = flow else {
            store_flow(ctx, me.id, flow).await;
            return Err(Error::InvalidState {
                message: "Please start with /deposit and choose a network first".to_string(),
            });
        };

        let (next, entry) = match flow.submit_proof(&ctx.data().database, me.id).await {
            Ok(done) => done,
            Err(e) => {
                store_flow(ctx, me.id, flow).await;
                return Err(e);
            }
        };
        store_flow(ctx, me.id, next).await;

        info!(user_id = me.id, transaction_id = entry.id, amount = entry.amount, "deposit submitted");

        ctx.say(format!(
            "✅ Thanks! Deposit request **#{}** for **{:.2} USDT** is waiting for review. You'll get a message once it's checked.",
            entry.id, entry.amount
        ))
        .await?;

        let review = notify::deposit_review_message(&me, &entry, network, &proof.url);
        notify::notify_admins(ctx.http(), &ctx.data().config, review).await;
        Ok(())
    }

    /// Abandons the deposit in progress.
    #[poise::command(slash_command, prefix_command)]
    pub async fn deposit_cancel(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let me = current_user(ctx).await?;

        let Some(flow) = ctx.data().conversations.lock().await.remove(&me.id) else {
            ctx.say("There is no deposit in progress.").await?;
            return Ok(());
        };

        flow.cancel()?;
        ctx.say("❌ Deposit cancelled.").await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
