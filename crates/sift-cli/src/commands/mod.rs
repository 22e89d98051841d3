//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (config loading, service construction)
//! - `similar` - Similar-transaction lookup
//! - `recategorize` - Bulk recategorization of an anchor and its matches
//! - `categorize` - Batch and single-transaction AI categorization
//! - `search` - Natural-language search and paging

pub mod categorize;
pub mod core;
pub mod recategorize;
pub mod search;
pub mod similar;

// Re-export command functions for main.rs
pub use categorize::*;
pub use core::*;
pub use recategorize::*;
pub use search::*;
pub use similar::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
