//! Display helpers for calendar dates.

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, Month};

use crate::error::ModelError;

/// Gregorian year preceding the first year of the Reiwa era.
pub const ERA_START_YEAR: i32 = 2018;
/// Prefix used for era-relative years.
pub const ERA_PREFIX: &str = "R";

const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

time::serde::format_description!(pub iso_date, Date, "[year]-[month]-[day]");

/// Parse a `YYYY-MM-DD` string.
///
/// # Errors
/// Returns [`ModelError::InvalidDate`] when the input is not a valid ISO calendar date.
pub fn parse_iso_date(iso: &str) -> Result<Date, ModelError> {
    Date::parse(iso.trim(), ISO_DATE).map_err(|_| ModelError::InvalidDate(iso.to_owned()))
}

/// Render a date as `YYYY-MM-DD`.
#[must_use]
pub fn iso(date: Date) -> String {
    date.format(ISO_DATE).unwrap_or_default()
}

/// Era-relative rendering, e.g. `R8.2.14` for 2026-02-14.
#[must_use]
pub fn era_date(date: Date) -> String {
    format!(
        "{ERA_PREFIX}{}.{}.{}",
        date.year() - ERA_START_YEAR,
        u8::from(date.month()),
        date.day()
    )
}

/// Month/day rendering, e.g. `2/14`.
#[must_use]
pub fn short_date(date: Date) -> String {
    format!("{}/{}", u8::from(date.month()), date.day())
}

/// Era-relative month label used by the month axis, e.g. `R8.2`.
#[must_use]
pub fn era_month_label(year: i32, month: Month) -> String {
    format!("{ERA_PREFIX}{}.{}", year - ERA_START_YEAR, u8::from(month))
}

/// String form of [`era_date`]; empty for empty or malformed input.
#[must_use]
pub fn to_era_date(iso: &str) -> String {
    parse_iso_date(iso).map(era_date).unwrap_or_default()
}

/// String form of [`short_date`]; empty for empty or malformed input.
#[must_use]
pub fn to_short_date(iso: &str) -> String {
    parse_iso_date(iso).map(short_date).unwrap_or_default()
}

/// Whole days from `today` until `target` (negative once the date has passed).
#[must_use]
pub fn days_until(target: Date, today: Date) -> i64 {
    (target - today).whole_days()
}
