//! Interaction handlers
//!
//! This module provides handlers for interactions that are not slash commands:
//! parameter autocomplete and the deposit review buttons.

/// Autocomplete handlers for months and languages
pub mod autocomplete;
/// Button interactions (deposit approve/reject)
pub mod interactions;
