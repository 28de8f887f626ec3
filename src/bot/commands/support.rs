//! Support chat commands.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, current_user, notify},
        core::support,
        errors::{Error, Result},
    };

    /// Opens a support session with the team.
    #[poise::command(slash_command, prefix_command)]
    pub async fn support(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let me = current_user(ctx).await?;
        support::start_support_session(&ctx.data().database, me.id).await?;

        let minutes = ctx.data().config.support.timeout_secs / 60;
        ctx.say(format!(
            "🆘 Support session opened. Send your questions with `/support_message`.\nThe session closes after {minutes} minutes without messages, or with `/support_end`."
        ))
        .await?;
        Ok(())
    }

    /// Sends a message to the support team.
    #[poise::command(slash_command, prefix_command)]
    pub async fn support_message(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Your message"]
        #[rest]
        text: String,
    ) -> Result<()> {
        let me = current_user(ctx).await?;
        let config = &ctx.data().config;

        support::record_support_message(&ctx.data().database, config.support, me.id).await?;

        let delivered = notify::notify_admins(
            ctx.http(),
            config,
            notify::support_forward_message(&me, text.trim()),
        )
        .await;

        if delivered == 0 {
            ctx.say("⚠️ The team could not be reached right now. Please try again later.")
                .await?;
        } else {
            ctx.say("📨 Message sent to the team.").await?;
        }
        Ok(())
    }

    /// Closes your support session.
    #[poise::command(slash_command, prefix_command)]
    pub async fn support_end(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let me = current_user(ctx).await?;
        support::end_support_session(&ctx.data().database, me.id).await?;
        ctx.say("✅ Support session closed. Thanks for reaching out!")
            .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
