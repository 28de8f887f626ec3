//! Admin commands - deposit review, stock, pricing, catalog, orders and users.
//!
//! Everything hangs off the `/admin` parent. The parent and every subcommand
//! carry the `admin_check`, so a subcommand can never be reached by a
//! non-admin even when registered on its own.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{
            BotData, admin_check, admin_numeric_id,
            commands::{ProductChoice, parse_months, product_key},
            handlers::autocomplete,
            notify,
        },
        core::{catalog, checkout, order, pricing, report, stock, user, wallet},
        entities::{OrderStatus, UserModel},
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use tracing::info;

    async fn target_user(
        ctx: poise::Context<'_, BotData, Error>,
        member: &serenity::User,
    ) -> Result<UserModel> {
        user::require_user_by_external_id(&ctx.data().database, &member.id.to_string()).await
    }

    fn check_year(ctx: poise::Context<'_, BotData, Error>, year: i32) -> Result<()> {
        let years = &ctx.data().config.shop.available_years;
        if years.contains(&year) {
            Ok(())
        } else {
            Err(Error::Validation {
                message: format!("Year {year} is not one of the configured years {years:?}"),
            })
        }
    }

    /// Store administration.
    #[poise::command(
        slash_command,
        check = "admin_check",
        subcommands(
            "approve",
            "reject",
            "pending",
            "stock_add",
            "stock_set",
            "stock_list",
            "price_set",
            "price_remove",
            "prices",
            "catalog_add",
            "catalog_update",
            "catalog_remove",
            "order_process",
            "order_complete",
            "order_cancel",
            "refund",
            "recent_orders",
            "adjust",
            "block",
            "unblock",
            "stats"
        )
    )]
    pub async fn admin(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "**Admin commands**\n\
            Deposits: `approve`, `reject`, `pending`\n\
            Stock: `stock_add`, `stock_set`, `stock_list`\n\
            Pricing: `price_set`, `price_remove`, `prices`\n\
            Catalog: `catalog_add`, `catalog_update`, `catalog_remove`\n\
            Orders: `order_process`, `order_complete`, `order_cancel`, `refund`, `recent_orders`\n\
            Users: `adjust`, `block`, `unblock`\n\
            `stats` - Store statistics";

        ctx.say(help_text).await?;
        Ok(())
    }

    // --- Deposits ---

    /// Approves a pending deposit and credits the user.
    #[poise::command(slash_command, check = "admin_check")]
    pub async fn approve(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Deposit transaction id"] transaction_id: i64,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let entry = wallet::get_transaction_by_id(db, transaction_id)
            .await?
            .ok_or(Error::TransactionNotFound { transaction_id })?;

        let updated = wallet::approve_deposit(db, entry.user_id, transaction_id).await?;
        info!(target: "admin_audit", admin_id = admin_numeric_id(ctx), transaction_id, "deposit approved");

        ctx.say(format!(
            "✅ Deposit #{transaction_id} approved. {} now has {:.2} USDT.",
            updated.display_name, updated.balance
        ))
        .await?;

        notify::notify_user(
            ctx.http(),
            &updated.external_id,
            format!(
                "✅ Your deposit of {:.2} USDT was approved. New balance: {:.2} USDT",
                entry.amount, updated.balance
            ),
        )
        .await;
        Ok(())
    }

    /// Rejects a pending deposit.
    #[poise::command(slash_command, check = "admin_check")]
    pub async fn reject(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Deposit transaction id"] transaction_id: i64,
        #[description = "Reason shown to the user"] reason: Option<String>,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let entry = wallet::get_transaction_by_id(db, transaction_id)
            .await?
            .ok_or(Error::TransactionNotFound { transaction_id })?;

        let reason = reason.unwrap_or_else(|| "Rejected by admin".to_string());
        let owner = wallet::reject_deposit(db, entry.user_id, transaction_id, &reason).await?;
        info!(target: "admin_audit", admin_id = admin_numeric_id(ctx), transaction_id, reason = %reason, "deposit rejected");

        ctx.say(format!("❌ Deposit #{transaction_id} rejected."))
            .await?;

        notify::notify_user(
            ctx.http(),
            &owner.external_id,
            format!(
                "❌ Your deposit of {:.2} USDT was rejected: {reason}",
                entry.amount
            ),
        )
        .await;
        Ok(())
    }

    /// Lists deposits waiting for review.
    #[poise::command(slash_command, check = "admin_check")]
    pub async fn pending(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let deposits = wallet::get_pending_deposits(&ctx.data().database).await?;
        if deposits.is_empty() {
            ctx.say("No deposits are waiting for review.").await?;
            return Ok(());
        }

        let lines: Vec<String> = deposits
            .iter()
            .map(|d| {
                format!(
                    "`#{}` user {} - {:.2} USDT - {}",
                    d.id, d.user_id, d.amount, d.description
                )
            })
            .collect();
        ctx.say(format!("⏳ **Pending deposits**\n{}", lines.join("\n")))
            .await?;
        Ok(())
    }

    // --- Stock ---

    /// Adds units to a product's stock, creating the record when needed.
    #[poise::command(slash_command, check = "admin_check")]
    pub async fn stock_add(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Group or channel"] product_type: ProductChoice,
        #[description = "Year"] year: i32,
        #[description = "Month"]
        #[autocomplete = "autocomplete::autocomplete_month"]
        month: String,
        #[description = "Units to add"] quantity: i64,
        #[description = "Note for the stock log"] notes: Option<String>,
    ) -> Result<()> {
        let key = product_key(product_type, year, &month)?;
        let record = stock::add_stock(
            &ctx.data().database,
            key,
            quantity,
            admin_numeric_id(ctx),
            notes.as_deref(),
        )
        .await?;

        ctx.say(format!(
            "📦 {key}: {} available, {} reserved, {} sold.",
            record.quantity, record.reserved, record.sold
        ))
        .await?;
        Ok(())
    }

    /// Overwrites a product's available quantity.
    #[poise::command(slash_command, check = "admin_check")]
    pub async fn stock_set(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Group or channel"] product_type: ProductChoice,
        #[description = "Year"] year: i32,
        #[description = "Month"]
        #[autocomplete = "autocomplete::autocomplete_month"]
        month: String,
        #[description = "New available quantity"] quantity: i64,
        #[description = "Note for the stock log"] notes: Option<String>,
    ) -> Result<()> {
        let key = product_key(product_type, year, &month)?;
        let record = stock::set_stock(
            &ctx.data().database,
            key,
            quantity,
            admin_numeric_id(ctx),
            notes.as_deref(),
        )
        .await?;

        ctx.say(format!(
            "📦 {key}: quantity set to {} (initial {}).",
            record.quantity, record.initial_quantity
        ))
        .await?;
        Ok(())
    }

    /// Lists stock, optionally for one product type.
    #[poise::command(slash_command, check = "admin_check")]
    pub async fn stock_list(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Only this type"] product_type: Option<ProductChoice>,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let records = match product_type {
            Some(choice) => stock::get_stock_by_type(db, choice.into()).await?,
            None => stock::get_all_stock(db).await?,
        };

        if records.is_empty() {
            ctx.say("📦 No stock recorded.").await?;
            return Ok(());
        }

        let mut response = String::from("📦 **Stock**\n");
        for record in &records {
            response.push_str(&format!(
                "{} {} {}: {} available, {} reserved, {} sold\n",
                record.product_type,
                record.month,
                record.year,
                record.quantity,
                record.reserved,
                record.sold
            ));
        }
        ctx.say(response).await?;
        Ok(())
    }

    // --- Pricing ---

    /// Sets the unit price for one product.
    #[poise::command(slash_command, check = "admin_check")]
    pub async fn price_set(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Group or channel"] product_type: ProductChoice,
        #[description = "Year"] year: i32,
        #[description = "Month"]
        #[autocomplete = "autocomplete::autocomplete_month"]
        month: String,
        #[description = "Unit price in USDT"] price: f64,
        #[description = "Note for the pricing log"] notes: Option<String>,
    ) -> Result<()> {
        let key = product_key(product_type, year, &month)?;
        let record = pricing::set_price(
            &ctx.data().database,
            key,
            price,
            admin_numeric_id(ctx),
            notes.as_deref(),
        )
        .await?;

        ctx.say(format!("💲 {key} now costs {:.2} USDT.", record.price))
            .await?;
        Ok(())
    }

    /// Removes a price override so the default price applies again.
    #[poise::command(slash_command, check = "admin_check")]
    pub async fn price_remove(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Group or channel"] product_type: ProductChoice,
        #[description = "Year"] year: i32,
        #[description = "Month"]
        #[autocomplete = "autocomplete::autocomplete_month"]
        month: String,
    ) -> Result<()> {
        let key = product_key(product_type, year, &month)?;
        let db = &ctx.data().database;
        pricing::deactivate_price(db, key, admin_numeric_id(ctx)).await?;

        let fallback = pricing::get_price(db, &ctx.data().config.shop.default_pricing, key).await?;
        ctx.say(format!(
            "💲 Override removed. {key} is back at the default {fallback:.2} USDT."
        ))
        .await?;
        Ok(())
    }

    /// Lists active price overrides.
    #[poise::command(slash_command, check = "admin_check")]
    pub async fn prices(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Only this type"] product_type: Option<ProductChoice>,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let overrides = match product_type {
            Some(choice) => pricing::get_active_pricing_by_type(db, choice.into()).await?,
            None => pricing::get_all_active_pricing(db).await?,
        };
        let defaults = ctx.data().config.shop.default_pricing;

        let mut response = format!(
            "💲 **Prices**\nDefaults: group {:.2} USDT, channel {:.2} USDT\n",
            defaults.group, defaults.channel
        );
        for p in &overrides {
            response.push_str(&format!(
                "{} {} {}: {:.2} USDT\n",
                p.product_type, p.month, p.year, p.price
            ));
        }
        ctx.say(response).await?;
        Ok(())
    }

    // --- Catalog ---

    /// Puts months of a year on sale, merging with months already listed.
    #[poise::command(slash_command, check = "admin_check")]
    pub async fn catalog_add(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Group or channel"] product_type: ProductChoice,
        #[description = "Year"] year: i32,
        #[description = "Months, e.g. 'January, February'"] months: String,
    ) -> Result<()> {
        check_year(ctx, year)?;
        let listed = catalog::add_catalog(
            &ctx.data().database,
            product_type.into(),
            year,
            &parse_months(&months)?,
            admin_numeric_id(ctx),
        )
        .await?;

        ctx.say(format!(
            "🗂️ {} {} on sale: {}",
            listed.catalog.product_type,
            year,
            month_list(&listed)
        ))
        .await?;
        Ok(())
    }

    /// Replaces the months on sale for a year.
    #[poise::command(slash_command, check = "admin_check")]
    pub async fn catalog_update(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Group or channel"] product_type: ProductChoice,
        #[description = "Year"] year: i32,
        #[description = "Months, e.g. 'March April'"] months: String,
    ) -> Result<()> {
        let listed = catalog::update_catalog(
            &ctx.data().database,
            product_type.into(),
            year,
            &parse_months(&months)?,
            admin_numeric_id(ctx),
        )
        .await?;

        ctx.say(format!(
            "🗂️ {} {} now on sale: {}",
            listed.catalog.product_type,
            year,
            month_list(&listed)
        ))
        .await?;
        Ok(())
    }

    /// Takes a whole year off sale.
    #[poise::command(slash_command, check = "admin_check")]
    pub async fn catalog_remove(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Group or channel"] product_type: ProductChoice,
        #[description = "Year"] year: i32,
    ) -> Result<()> {
        let removed = catalog::deactivate_catalog(
            &ctx.data().database,
            product_type.into(),
            year,
            admin_numeric_id(ctx),
        )
        .await?;

        ctx.say(format!(
            "🗂️ {} {} is no longer on sale.",
            removed.product_type, removed.year
        ))
        .await?;
        Ok(())
    }

    fn month_list(listed: &catalog::CatalogWithMonths) -> String {
        listed
            .active_months()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }

    // --- Orders ---

    /// Marks an order as being worked on.
    #[poise::command(slash_command, check = "admin_check")]
    pub async fn order_process(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Order number"] order_id: i64,
        #[description = "Note for the order log"] notes: Option<String>,
    ) -> Result<()> {
        let updated = order::update_status(
            &ctx.data().database,
            order_id,
            OrderStatus::Processing,
            notes.as_deref(),
        )
        .await?;
        info!(target: "admin_audit", admin_id = admin_numeric_id(ctx), order_id, "order processing");

        ctx.say(format!("⚙️ Order #{order_id} is now {}.", updated.status))
            .await?;
        Ok(())
    }

    /// Marks an order as delivered and books its stock as sold.
    #[poise::command(slash_command, check = "admin_check")]
    pub async fn order_complete(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Order number"] order_id: i64,
        #[description = "Note for the order log"] notes: Option<String>,
    ) -> Result<()> {
        let completed = checkout::complete_order(
            &ctx.data().database,
            order_id,
            admin_numeric_id(ctx),
            notes.as_deref(),
        )
        .await?;

        ctx.say(format!("✅ Order #{order_id} completed.")).await?;

        let owner = user::require_user(&ctx.data().database, completed.user_id).await?;
        notify::notify_user(
            ctx.http(),
            &owner.external_id,
            format!(
                "📦 Your order #{order_id} ({} x {} {} {}) has been delivered to @{}.",
                completed.quantity,
                completed.product_type,
                completed.month,
                completed.year,
                completed.target_username
            ),
        )
        .await;
        Ok(())
    }

    /// Cancels an open order, returning its stock and refunding what is left.
    #[poise::command(slash_command, check = "admin_check")]
    pub async fn order_cancel(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Order number"] order_id: i64,
        #[description = "Reason shown to the buyer"] reason: String,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let before = order::require_order(db, order_id).await?;
        let cancelled = checkout::cancel_order(db, order_id, &reason).await?;
        info!(target: "admin_audit", admin_id = admin_numeric_id(ctx), order_id, reason = %reason, "order cancelled");

        let returned = cancelled.refund_amount - before.refund_amount;
        ctx.say(format!(
            "🛑 Order #{order_id} cancelled, {returned:.2} USDT returned to the buyer."
        ))
        .await?;

        let owner = user::require_user(db, cancelled.user_id).await?;
        notify::notify_user(
            ctx.http(),
            &owner.external_id,
            format!(
                "🛑 Your order #{order_id} was cancelled: {reason}. {returned:.2} USDT was returned to your wallet."
            ),
        )
        .await;
        Ok(())
    }

    /// Refunds part or all of an order to the buyer's wallet.
    #[poise::command(slash_command, check = "admin_check")]
    pub async fn refund(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Order number"] order_id: i64,
        #[description = "Amount in USDT"] amount: f64,
        #[description = "Reason"] reason: String,
    ) -> Result<()> {
        let refunded = checkout::refund_order(
            &ctx.data().database,
            order_id,
            amount,
            &reason,
            admin_numeric_id(ctx),
        )
        .await?;

        ctx.say(format!(
            "💸 Refunded {amount:.2} USDT on order #{order_id} ({:.2} of {:.2} refunded, payment {}).",
            refunded.refund_amount, refunded.total_price, refunded.payment_status
        ))
        .await?;

        let owner = user::require_user(&ctx.data().database, refunded.user_id).await?;
        notify::notify_user(
            ctx.http(),
            &owner.external_id,
            format!("💸 {amount:.2} USDT from order #{order_id} was refunded to your wallet: {reason}"),
        )
        .await;
        Ok(())
    }

    /// Lists the latest orders across all users.
    #[poise::command(slash_command, check = "admin_check")]
    pub async fn recent_orders(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "How many (default 10)"]
        #[min = 1]
        #[max = 50]
        limit: Option<u64>,
    ) -> Result<()> {
        let recent = order::get_recent_orders(&ctx.data().database, limit.unwrap_or(10)).await?;
        if recent.is_empty() {
            ctx.say("No orders yet.").await?;
            return Ok(());
        }

        let mut response = String::from("🧾 **Recent orders**\n");
        for o in &recent {
            response.push_str(&format!(
                "**#{}** user {} - {} x {} {} {} - {:.2} USDT - {}\n",
                o.id, o.user_id, o.quantity, o.product_type, o.month, o.year, o.total_price, o.status
            ));
        }
        ctx.say(response).await?;
        Ok(())
    }

    // --- Users ---

    /// Corrects a user's balance by a positive or negative amount.
    #[poise::command(slash_command, check = "admin_check")]
    pub async fn adjust(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "User"] member: serenity::User,
        #[description = "Amount in USDT, negative to deduct"] amount: f64,
        #[description = "Reason"] reason: String,
    ) -> Result<()> {
        let target = target_user(ctx, &member).await?;
        let updated = wallet::adjust_balance(
            &ctx.data().database,
            target.id,
            amount,
            &reason,
            admin_numeric_id(ctx),
        )
        .await?;

        ctx.say(format!(
            "✅ {} balance adjusted by {amount:+.2} USDT to {:.2} USDT.",
            updated.display_name, updated.balance
        ))
        .await?;
        Ok(())
    }

    /// Blocks a user from the store.
    #[poise::command(slash_command, check = "admin_check")]
    pub async fn block(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "User"] member: serenity::User,
    ) -> Result<()> {
        let target = target_user(ctx, &member).await?;
        user::set_blocked(&ctx.data().database, target.id, true).await?;
        info!(target: "admin_audit", admin_id = admin_numeric_id(ctx), user_id = target.id, "user blocked");

        ctx.say(format!("🚫 {} is blocked.", target.display_name))
            .await?;
        Ok(())
    }

    /// Lifts a block.
    #[poise::command(slash_command, check = "admin_check")]
    pub async fn unblock(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "User"] member: serenity::User,
    ) -> Result<()> {
        let target = target_user(ctx, &member).await?;
        user::set_blocked(&ctx.data().database, target.id, false).await?;
        info!(target: "admin_audit", admin_id = admin_numeric_id(ctx), user_id = target.id, "user unblocked");

        ctx.say(format!("✅ {} is unblocked.", target.display_name))
            .await?;
        Ok(())
    }

    /// Shows store statistics.
    #[poise::command(slash_command, check = "admin_check")]
    pub async fn stats(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let stats = report::store_statistics(&ctx.data().database).await?;

        let mut stock_lines = String::new();
        for s in &stats.stock {
            stock_lines.push_str(&format!(
                "{}: {} available, {} reserved, {} sold\n",
                s.product_type, s.total_quantity, s.total_reserved, s.total_sold
            ));
        }
        if stock_lines.is_empty() {
            stock_lines.push_str("No stock recorded");
        }

        let embed = serenity::CreateEmbed::default()
            .title("📊 Store statistics")
            .field("Users", stats.total_users.to_string(), true)
            .field("Orders", stats.total_orders().to_string(), true)
            .field("Revenue", format!("{:.2} USDT", stats.revenue), true)
            .field(
                "Orders by type",
                format!(
                    "Groups: {}\nChannels: {}",
                    stats.orders_by_type.group, stats.orders_by_type.channel
                ),
                true,
            )
            .field("Pending deposits", stats.pending_deposits.to_string(), true)
            .field("Stock", stock_lines, false)
            .color(0x009B_59B6);

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
