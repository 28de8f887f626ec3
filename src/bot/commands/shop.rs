//! Shop commands - browse the catalog, buy, and manage your orders.
//!
//! All money moves through [`crate::core::checkout`]; these commands only
//! translate arguments and render results.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{
            BotData,
            commands::{ProductChoice, product_key},
            current_user,
            handlers::autocomplete,
            notify,
        },
        core::{
            catalog,
            checkout::{self, CheckoutRequest},
            order, pricing, stock,
        },
        entities::{OrderStatus, ProductType},
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;

    /// Lists every product on sale with its unit price.
    #[poise::command(slash_command, prefix_command)]
    pub async fn shop(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let db = &ctx.data().database;
        let defaults = ctx.data().config.shop.default_pricing;

        let catalogs = catalog::get_active_catalogs(db).await?;
        if catalogs.is_empty() {
            ctx.say("🛒 Nothing is on sale right now. Please check back later.")
                .await?;
            return Ok(());
        }

        let mut fields = Vec::new();
        for listed in &catalogs {
            let mut lines = Vec::new();
            for month in listed.active_months() {
                let key = stock::ProductKey::new(
                    listed.catalog.product_type,
                    listed.catalog.year,
                    month,
                );
                let price = pricing::get_price(db, &defaults, key).await?;
                lines.push(format!("{month}: **{price:.2} USDT**"));
            }
            if lines.is_empty() {
                continue;
            }
            let title = format!(
                "{} {}",
                if listed.catalog.product_type == ProductType::Group {
                    "👥 Groups"
                } else {
                    "📢 Channels"
                },
                listed.catalog.year
            );
            fields.push((title, lines.join("\n"), true));
        }

        let embed = serenity::CreateEmbed::default()
            .title("🛒 Shop")
            .description("Buy with `/buy <type> <year> <month> <quantity> <username>`.")
            .color(0x0034_98DB)
            .fields(fields);

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Shows price and availability of one product.
    #[poise::command(slash_command, prefix_command)]
    pub async fn product(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Group or channel"] product_type: ProductChoice,
        #[description = "Year"] year: i32,
        #[description = "Month"]
        #[autocomplete = "autocomplete::autocomplete_month"]
        month: String,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let key = product_key(product_type, year, &month)?;

        if !catalog::is_month_available(db, key).await? {
            ctx.say(format!("❌ {key} is not on sale.")).await?;
            return Ok(());
        }

        let price = pricing::get_price(db, &ctx.data().config.shop.default_pricing, key).await?;
        let available = stock::get_stock(db, key).await?.map_or(0, |s| s.quantity);

        ctx.say(format!(
            "📦 **{key}**\nPrice: **{price:.2} USDT** per unit\nIn stock: **{available}**"
        ))
        .await?;
        Ok(())
    }

    /// Buys a product with your wallet balance.
    #[poise::command(slash_command, prefix_command)]
    pub async fn buy(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Group or channel"] product_type: ProductChoice,
        #[description = "Year"] year: i32,
        #[description = "Month"]
        #[autocomplete = "autocomplete::autocomplete_month"]
        month: String,
        #[description = "How many units"]
        #[min = 1]
        quantity: i64,
        #[description = "Username the product should be delivered to"] target_username: String,
    ) -> Result<()> {
        let me = current_user(ctx).await?;
        let key = product_key(product_type, year, &month)?;

        ctx.defer().await?;

        let receipt = checkout::place_order(
            &ctx.data().database,
            &ctx.data().config.shop.default_pricing,
            CheckoutRequest {
                user_id: me.id,
                key,
                quantity,
                target_username,
            },
        )
        .await?;

        ctx.say(format!(
            "✅ Order **#{}** placed: {quantity} x {key} for **{:.2} USDT**.\nNew balance: **{:.2} USDT**. We'll deliver to @{} shortly.",
            receipt.order.id,
            receipt.total(),
            receipt.user.balance,
            receipt.order.target_username
        ))
        .await?;

        let admin_message = serenity::CreateMessage::new().content(format!(
            "🛍️ New order #{} from {} ({}): {quantity} x {key}, {:.2} USDT, deliver to @{}",
            receipt.order.id,
            me.display_name,
            me.external_id,
            receipt.total(),
            receipt.order.target_username
        ));
        notify::notify_admins(ctx.http(), &ctx.data().config, admin_message).await;
        Ok(())
    }

    /// Shows your recent orders.
    #[poise::command(slash_command, prefix_command)]
    pub async fn orders(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let me = current_user(ctx).await?;
        let recent = order::get_user_orders(&ctx.data().database, me.id, Some(10)).await?;

        if recent.is_empty() {
            ctx.say("📭 You have no orders yet.").await?;
            return Ok(());
        }

        let lines: Vec<String> = recent
            .iter()
            .map(|o| {
                format!(
                    "**#{}** {} x {} {} {} - {:.2} USDT - {} ({})",
                    o.id,
                    o.quantity,
                    o.product_type,
                    o.month,
                    o.year,
                    o.total_price,
                    o.status,
                    o.payment_status
                )
            })
            .collect();

        ctx.say(format!("🧾 **Your orders**\n{}", lines.join("\n")))
            .await?;
        Ok(())
    }

    /// Cancels one of your pending orders and refunds it to your wallet.
    #[poise::command(slash_command, prefix_command)]
    pub async fn cancel_order(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Order number"] order_id: i64,
    ) -> Result<()> {
        let me = current_user(ctx).await?;
        let db = &ctx.data().database;

        let existing = order::require_order(db, order_id).await?;
        if existing.user_id != me.id {
            return Err(Error::OrderNotFound { order_id });
        }
        if existing.status != OrderStatus::Pending {
            ctx.say(format!(
                "❌ Order #{order_id} is {} and can no longer be cancelled. Please contact `/support`.",
                existing.status
            ))
            .await?;
            return Ok(());
        }

        let cancelled = checkout::cancel_order(db, order_id, "Cancelled by customer").await?;
        ctx.say(format!(
            "✅ Order #{order_id} cancelled. {:.2} USDT returned to your wallet.",
            cancelled.refund_amount - existing.refund_amount
        ))
        .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
