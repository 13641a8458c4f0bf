//! Utility functions for formatting counts and dates for display.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{format_change, format_count, format_date, format_money};
