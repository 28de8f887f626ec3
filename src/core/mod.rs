//! Core business logic - framework-agnostic storefront operations.
//!
//! Nothing in here knows about the chat transport. Every function takes a
//! database connection (and, where needed, the injected [`crate::config::AppConfig`])
//! and returns [`crate::errors::Result`].

/// Catalog store - which months of a year are offered
pub mod catalog;
/// Checkout and order lifecycle orchestration across stock, wallet and orders
pub mod checkout;
/// Deposit conversation state machine
pub mod conversation;
/// Required community membership decisions
pub mod membership;
/// Order records
pub mod order;
/// Price overrides with per-type defaults
pub mod pricing;
/// Store-wide statistics
pub mod report;
/// Stock ledger
pub mod stock;
/// Support chat sessions
pub mod support;
/// User registration and preferences
pub mod user;
/// Wallet ledger
pub mod wallet;

use chrono::{DateTime, Utc};

/// Appends `note` to an existing note log as a `[<rfc3339>] <note>` line.
///
/// Blank notes leave the log untouched.
pub(crate) fn append_note(
    existing: Option<String>,
    note: Option<&str>,
    at: DateTime<Utc>,
) -> Option<String> {
    let Some(note) = note.map(str::trim).filter(|n| !n.is_empty()) else {
        return existing;
    };
    let line = format!("[{}] {note}", at.to_rfc3339());
    match existing {
        Some(log) if !log.is_empty() => Some(format!("{log}\n{line}")),
        _ => Some(line),
    }
}
