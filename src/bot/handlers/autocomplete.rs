//! Autocomplete handlers for slash command parameters.
//!
//! Suggestions come from fixed lists (months) or from the injected configuration
//! (languages), so none of these touch the database.

use crate::{bot::BotData, entities::Month, errors::Error};

/// Suggests month names matching what the user typed, in calendar order.
#[must_use]
pub async fn autocomplete_month(_ctx: poise::Context<'_, BotData, Error>, partial: &str) -> Vec<String> {
    matching_months(partial)
}

fn matching_months(partial: &str) -> Vec<String> {
    let partial_lower = partial.to_lowercase();
    Month::ALL
        .iter()
        .map(|m| m.name())
        .filter(|name| name.to_lowercase().starts_with(&partial_lower))
        .map(str::to_string)
        .collect()
}

/// Suggests configured language codes, shown as `code` with the name as label.
#[must_use]
pub async fn autocomplete_language(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let partial_lower = partial.to_lowercase();
    ctx.data()
        .config
        .languages
        .iter()
        .filter(|(code, name)| {
            code.starts_with(&partial_lower) || name.to_lowercase().contains(&partial_lower)
        })
        .map(|(code, _)| code.clone())
        .take(25) // Discord autocomplete limit
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_months() {
        assert_eq!(matching_months("ju"), vec!["June", "July"]);
        assert_eq!(matching_months("").len(), 12);
        assert!(matching_months("x").is_empty());
    }
}
