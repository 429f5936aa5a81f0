//! Shared utility functions.

use chrono::NaiveDate;

/// Human-readable English date, e.g. "March 1, 2023". `site.locale` does
/// not change it.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}
