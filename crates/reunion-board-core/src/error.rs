//! Error types for board model validation.

use thiserror::Error;

/// Errors raised while constructing model values from raw input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Month id is not one of the 13 slots on the month axis.
    #[error("month id {0} is not on the month axis (expected 1..=13)")]
    MonthOutOfRange(i64),

    /// Calendar date could not be parsed as `YYYY-MM-DD`.
    #[error("invalid calendar date: {0}")]
    InvalidDate(String),
}
