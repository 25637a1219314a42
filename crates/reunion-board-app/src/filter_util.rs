use std::fmt::{self, Display};

use reunion_board_core::{BoardFilter, StatusFilter};
use thiserror::Error;

/// Error type returned while constructing board filters from user-facing inputs.
#[derive(Debug, Error)]
pub enum FilterBuildError {
    #[error("invalid status filter: {token}")]
    InvalidStatus { token: String },
}

/// Result alias for filter construction helpers.
pub type FilterBuildResult<T> = Result<T, FilterBuildError>;

/// Builder that accepts user-facing strings and normalizes them into [`BoardFilter`] values.
#[derive(Debug, Clone, Default)]
pub struct BoardFilterBuilder {
    text: Option<String>,
    status: StatusFilter,
}

impl BoardFilterBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the optional search text, kept as typed (empty becomes `None`).
    #[must_use]
    pub fn with_text(mut self, text: Option<String>) -> Self {
        self.text = text.filter(|raw| !raw.is_empty());
        self
    }

    /// Configure the status filter from a user token.
    ///
    /// # Errors
    /// Returns an error if the token does not name a known status filter.
    pub fn with_status(mut self, token: Option<&str>) -> FilterBuildResult<Self> {
        if let Some(token) = token {
            self.status = parse_status_token(token)?;
        }
        Ok(self)
    }

    /// Configure the status filter using an already parsed value.
    #[must_use]
    pub const fn with_status_value(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    /// Build the final [`BoardFilter`].
    #[must_use]
    pub fn build(self) -> BoardFilter {
        BoardFilter {
            text: self.text,
            status: self.status,
        }
    }
}

/// Convert a token into a [`StatusFilter`].
///
/// Accepts the English names and the board's own labels.
///
/// # Errors
/// Returns an error if the token does not match a valid status filter.
pub fn parse_status_token(token: &str) -> FilterBuildResult<StatusFilter> {
    let normalized = token.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "" | "all" | "すべて" => Ok(StatusFilter::All),
        "done" | "済" => Ok(StatusFilter::Done),
        "planned" | "予定" => Ok(StatusFilter::Planned),
        "undetermined" | "未定" => Ok(StatusFilter::Undetermined),
        _ => Err(FilterBuildError::InvalidStatus {
            token: token.to_string(),
        }),
    }
}

impl FilterBuildError {
    /// Convert the error into a message that is friendly for end-users.
    #[must_use]
    pub fn describe_user_facing(&self) -> String {
        match self {
            Self::InvalidStatus { token } => {
                format!("ステータスの指定が不正です: {token} (すべて / 済 / 予定 / 未定)")
            }
        }
    }
}

impl Display for BoardFilterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoardFilterBuilder")
            .field("text", &self.text)
            .field("status", &self.status)
            .finish()
    }
}
