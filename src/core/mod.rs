//! Core data structures for weekly seasonal adjustment.

mod calendar;
mod weekly_series;

pub use calendar::{days_in_month, days_in_year, monthly_position, yearly_position, HolidayMatrix};
pub use weekly_series::{WeeklySeries, WEEK_DAYS};
