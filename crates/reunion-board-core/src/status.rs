use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Stored label for a finished cell.
pub const DONE_LABEL: &str = "済";
/// Stored label for a scheduled cell.
pub const PLANNED_LABEL: &str = "予定";
/// Display label for a cell without a status.
pub const UNDETERMINED_LABEL: &str = "未定";

/// Status tag carried by a task cell.
///
/// An absent status (`Option::None` at the use site) means "undetermined".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellStatus {
    /// Work for the month is finished.
    Done,
    /// Work for the month is scheduled.
    Planned,
    /// Any other free-text tag.
    Custom(String),
}

impl CellStatus {
    /// Interpret raw cell content.
    ///
    /// Blank input and the undetermined label map to `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "" | UNDETERMINED_LABEL => None,
            DONE_LABEL => Some(Self::Done),
            PLANNED_LABEL => Some(Self::Planned),
            _ => Some(Self::Custom(raw.to_owned())),
        }
    }

    /// Label written back to the store.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Done => DONE_LABEL,
            Self::Planned => PLANNED_LABEL,
            Self::Custom(text) => text,
        }
    }

    /// True for [`CellStatus::Done`].
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// True for [`CellStatus::Planned`].
    #[must_use]
    pub const fn is_planned(&self) -> bool {
        matches!(self, Self::Planned)
    }
}

impl fmt::Display for CellStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CellStatus {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(self.as_str())
    }
}

/// Serde adapter for `Option<CellStatus>` columns stored as nullable text.
pub mod content {
    use super::{CellStatus, Deserialize, Deserializer, Serializer};

    /// Serialize the status label or `null`.
    ///
    /// # Errors
    /// Propagates serializer failures.
    #[allow(clippy::ref_option)]
    pub fn serialize<S>(value: &Option<CellStatus>, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(status) => s.serialize_str(status.as_str()),
            None => s.serialize_none(),
        }
    }

    /// Deserialize nullable text through [`CellStatus::parse`].
    ///
    /// # Errors
    /// Fails when the value is neither a string nor `null`.
    pub fn deserialize<'de, D>(d: D) -> Result<Option<CellStatus>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(d)?;
        Ok(raw.as_deref().and_then(CellStatus::parse))
    }
}
