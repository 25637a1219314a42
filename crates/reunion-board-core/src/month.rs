//! The fixed 13-slot month axis of the planning board.

use serde::{Deserialize, Serialize};
use std::fmt;
use time::Month as CalendarMonth;

use crate::error::ModelError;

/// Number of slots on the month axis.
pub const MONTH_COUNT: u8 = 13;

/// Identifier of a slot on the month axis (`1..=13`).
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct MonthId(u8);

impl MonthId {
    /// Slot of the reunion itself.
    pub const MAIN_EVENT: Self = Self(MONTH_COUNT);

    /// Validate a raw month id.
    ///
    /// # Errors
    /// Returns [`ModelError::MonthOutOfRange`] when `raw` is outside `1..=13`.
    pub fn new(raw: i64) -> Result<Self, ModelError> {
        u8::try_from(raw)
            .ok()
            .filter(|value| (1..=MONTH_COUNT).contains(value))
            .map(Self)
            .ok_or(ModelError::MonthOutOfRange(raw))
    }

    /// Raw numeric id.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Axis entry for this id.
    #[must_use]
    pub const fn month(self) -> &'static Month {
        &MONTHS[(self.0 - 1) as usize]
    }
}

impl TryFrom<i64> for MonthId {
    type Error = ModelError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MonthId> for u8 {
    fn from(value: MonthId) -> Self {
        value.0
    }
}

impl fmt::Display for MonthId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One column of the month axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Month {
    /// Axis id.
    pub id: MonthId,
    /// Era-style column label.
    pub label: &'static str,
    /// Gregorian year.
    pub year: i32,
    /// Calendar month.
    pub month: CalendarMonth,
    /// Whether this column is the culminating event month.
    pub is_main: bool,
}

const fn slot(id: u8, label: &'static str, year: i32, month: CalendarMonth) -> Month {
    Month {
        id: MonthId(id),
        label,
        year,
        month,
        is_main: id == MONTH_COUNT,
    }
}

/// The planning horizon, October 2025 through the reunion in October 2026.
pub const MONTHS: [Month; MONTH_COUNT as usize] = [
    slot(1, "R7.10", 2025, CalendarMonth::October),
    slot(2, "R7.11", 2025, CalendarMonth::November),
    slot(3, "R7.12", 2025, CalendarMonth::December),
    slot(4, "R8.1", 2026, CalendarMonth::January),
    slot(5, "R8.2", 2026, CalendarMonth::February),
    slot(6, "R8.3", 2026, CalendarMonth::March),
    slot(7, "R8.4", 2026, CalendarMonth::April),
    slot(8, "R8.5", 2026, CalendarMonth::May),
    slot(9, "R8.6", 2026, CalendarMonth::June),
    slot(10, "R8.7", 2026, CalendarMonth::July),
    slot(11, "R8.8", 2026, CalendarMonth::August),
    slot(12, "R8.9", 2026, CalendarMonth::September),
    slot(13, "R8.10", 2026, CalendarMonth::October),
];

/// Iterate the axis ids in display order.
pub fn month_ids() -> impl Iterator<Item = MonthId> {
    MONTHS.iter().map(|month| month.id)
}
