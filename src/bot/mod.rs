//! Bot layer - chat-platform interface and command handlers
//!
//! This module binds the storefront to the poise/serenity stack: slash commands,
//! the membership gate that runs before them, button interactions for deposit
//! review and the admin notification fan-out.

/// Slash command implementations (general, shop, wallet, support, admin)
pub mod commands;
/// Non-command interaction handlers (autocomplete, buttons)
pub mod handlers;
/// Direct-message notifications to admins and users
pub mod notify;

use crate::{
    config::AppConfig,
    core::{
        conversation::DepositFlow,
        membership::{self, MembershipStatus},
        user,
    },
    entities::UserModel,
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

/// Shared data available to all bot commands.
/// This structure holds the database connection, the injected configuration and
/// the per-user deposit conversations.
pub struct BotData {
    /// Database connection for all database operations
    pub database: DatabaseConnection,
    /// Store configuration loaded at startup
    pub config: Arc<AppConfig>,
    /// Open deposit conversations keyed by internal user id
    pub conversations: Mutex<HashMap<i64, DepositFlow>>,
}

impl BotData {
    /// Creates a new `BotData` instance with the given database connection and
    /// configuration.
    #[must_use]
    pub fn new(database: DatabaseConnection, config: Arc<AppConfig>) -> Self {
        Self {
            database,
            config,
            conversations: Mutex::new(HashMap::new()),
        }
    }
}

/// Context type shared by every command
pub type Context<'a> = poise::Context<'a, BotData, Error>;

/// Commands that work before registration and the membership check.
const UNGATED_COMMANDS: [&str; 3] = ["start", "help", "check_membership"];

/// Loads the registered user behind a command invocation.
pub async fn current_user(ctx: Context<'_>) -> Result<UserModel> {
    user::require_user_by_external_id(&ctx.data().database, &ctx.author().id.to_string()).await
}

/// The invoker's platform id in the form stored in audit columns.
pub(crate) fn admin_numeric_id(ctx: Context<'_>) -> i64 {
    i64::try_from(ctx.author().id.get()).unwrap_or_default()
}

/// Asks the platform for the author's status in each required community.
pub async fn fetch_membership(ctx: Context<'_>) -> Vec<MembershipStatus> {
    let mut statuses = Vec::new();
    for channel in &ctx.data().config.required_channels {
        let guild = serenity::GuildId::new(channel.id);
        let status = match ctx.http().get_member(guild, ctx.author().id).await {
            Ok(_) => MembershipStatus::Member,
            Err(e) => {
                debug!(community = channel.id, error = %e, "membership lookup failed");
                MembershipStatus::Unknown
            }
        };
        statuses.push(status);
    }
    statuses
}

/// Lists the communities the user still has to join.
pub fn join_instructions(config: &AppConfig) -> String {
    let mut text = String::from("📢 Please join all of these communities first:\n");
    for channel in &config.required_channels {
        text.push_str(&format!("• {} - {}\n", channel.title, channel.invite_link));
    }
    text.push_str("\nThen run `/check_membership`.");
    text
}

/// Runs before every command: the user must be registered, not blocked and a
/// member of every required community.
async fn membership_gate(ctx: Context<'_>) -> Result<bool> {
    if UNGATED_COMMANDS.contains(&ctx.command().name.as_str()) {
        return Ok(true);
    }

    let db = &ctx.data().database;
    let Some(found) = user::get_user_by_external_id(db, &ctx.author().id.to_string()).await? else {
        ctx.say("You are not registered yet. Please use `/start` first.")
            .await?;
        return Ok(false);
    };

    if found.is_blocked {
        ctx.say("⛔ Your account has been blocked.").await?;
        return Ok(false);
    }

    if !found.joined_channels {
        if !membership::all_joined(&fetch_membership(ctx).await) {
            ctx.say(join_instructions(&ctx.data().config)).await?;
            return Ok(false);
        }
        user::mark_joined_channels(db, found.id).await?;
    }

    user::touch_activity(db, found.id).await?;
    Ok(true)
}

/// Only configured admins pass.
pub async fn admin_check(ctx: Context<'_>) -> Result<bool> {
    let is_admin = ctx
        .data()
        .config
        .is_admin_id(&ctx.author().id.to_string());
    if !is_admin {
        ctx.say("⛔ This command is for admins only.").await?;
    }
    Ok(is_admin)
}

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {:?}", error);
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            if error.is_internal() {
                error!("Error in command `{}`: {:?}", ctx.command().name, error);
            } else {
                warn!("Command `{}` rejected: {}", ctx.command().name, error);
            }
            if let Err(e) = ctx.say(error.user_message()).await {
                error!("Failed to send error message: {}", e);
            }
        }
        poise::FrameworkError::CommandCheckFailed { error: None, .. } => {}
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

/// Starts the bot and blocks until the client stops.
#[instrument(skip(token, config, database))]
pub async fn run_bot(
    token: String,
    config: Arc<AppConfig>,
    database: DatabaseConnection,
) -> Result<()> {
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            on_error: |error| Box::pin(on_error(error)),
            command_check: Some(|ctx| Box::pin(membership_gate(ctx))),
            event_handler: |ctx, event, _framework, data| {
                Box::pin(handlers::interactions::handle_event(ctx, event, data))
            },
            ..Default::default()
        })
        .setup(|ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                info!("Registering commands globally...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(BotData::new(database, config))
            })
        })
        .build();

    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::DIRECT_MESSAGES;

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::Client::builder(&token, intents)
        .framework(framework)
        .await?;

    info!("Starting bot client...");
    client.start().await?;
    Ok(())
}
