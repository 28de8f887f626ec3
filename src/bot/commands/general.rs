//! General commands - start, help, language and the membership check.
//! These work for everyone, including users who have not joined the required
//! communities yet (except `language`, which needs a registered user).

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, current_user, fetch_membership, handlers::autocomplete, join_instructions},
        core::{
            membership,
            user::{self, NewUser},
        },
        errors::{Error, Result},
    };

    /// Registers you with the store and shows what to do next.
    #[poise::command(slash_command, prefix_command)]
    pub async fn start(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let author = ctx.author();
        let new_user = NewUser {
            external_id: author.id.to_string(),
            username: Some(author.name.clone()),
            display_name: author
                .global_name
                .clone()
                .unwrap_or_else(|| author.name.clone()),
        };

        let config = &ctx.data().config;
        let (registered, created) =
            user::find_or_create(&ctx.data().database, config, new_user).await?;

        let greeting = if created {
            format!("👋 Welcome to the store, {}!", registered.display_name)
        } else {
            format!("👋 Welcome back, {}!", registered.display_name)
        };

        if registered.joined_channels || config.required_channels.is_empty() {
            ctx.say(format!(
                "{greeting}\n\nBrowse products with `/shop`, top up with `/deposit` and see `/help` for everything else."
            ))
            .await?;
        } else {
            ctx.say(format!("{greeting}\n\n{}", join_instructions(config)))
                .await?;
        }
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "**Store Help**\n\n\
        **Shop**\n\
        • `/shop` - Lists everything on sale with prices.\n\
        • `/product <type> <year> <month>` - Shows price and availability.\n\
        • `/buy <type> <year> <month> <quantity> <username>` - Buys from your wallet balance.\n\
        • `/orders` - Shows your recent orders.\n\
        • `/cancel_order <id>` - Cancels a pending order and refunds it.\n\n\
        **Wallet**\n\
        • `/wallet` - Shows your balance.\n\
        • `/history` - Shows your recent transactions.\n\
        • `/deposit <amount>` then `/deposit_network` then `/deposit_proof` - Tops up your balance.\n\
        • `/deposit_cancel` - Abandons a deposit in progress.\n\n\
        **Other**\n\
        • `/support`, `/support_message`, `/support_end` - Talk to the team.\n\
        • `/language <code>` - Changes your language.\n\
        • `/check_membership` - Re-checks the required communities.";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Changes your preferred language.
    #[poise::command(slash_command, prefix_command)]
    pub async fn language(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Language code (e.g. en, ru)"]
        #[autocomplete = "autocomplete::autocomplete_language"]
        code: String,
    ) -> Result<()> {
        let me = current_user(ctx).await?;
        let config = &ctx.data().config;
        let updated = user::set_language(&ctx.data().database, config, me.id, code.trim()).await?;

        let name = config
            .languages
            .get(&updated.language)
            .map_or(updated.language.as_str(), String::as_str);
        ctx.say(format!("✅ Language set to {name}.")).await?;
        Ok(())
    }

    /// Checks whether you have joined every required community.
    #[poise::command(slash_command, prefix_command)]
    pub async fn check_membership(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let db = &ctx.data().database;
        let Some(me) = user::get_user_by_external_id(db, &ctx.author().id.to_string()).await?
        else {
            ctx.say("You are not registered yet. Please use `/start` first.")
                .await?;
            return Ok(());
        };

        if membership::all_joined(&fetch_membership(ctx).await) {
            user::mark_joined_channels(db, me.id).await?;
            ctx.say("✅ Thanks for joining! You can use the store now.")
                .await?;
        } else {
            ctx.say(join_instructions(&ctx.data().config)).await?;
        }
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
