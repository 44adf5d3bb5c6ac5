//! Budget period calculation.
//!
//! A category's spending is measured against a recurring date window. This
//! module answers one question: given a budget frequency and today's date,
//! when did the current window start?

use chrono::{Datelike, Duration, Months, NaiveDate};

use walletkit_shared::types::BudgetFrequency;

/// Start date of the budget window containing `today`.
///
/// Weekly windows start on Monday; monthly windows reset on the
/// configured day, clamped to the month's length (a reset day of 31 works
/// in February); yearly windows start January 1st.
#[must_use]
pub fn period_start(frequency: BudgetFrequency, today: NaiveDate) -> NaiveDate {
    match frequency {
        BudgetFrequency::Weekly => {
            today - Duration::days(i64::from(today.weekday().num_days_from_monday()))
        }
        BudgetFrequency::Monthly { reset_day } => {
            let this_month = clamp_to_month(today.year(), today.month(), reset_day);
            if today >= this_month {
                this_month
            } else {
                let prev = today - Months::new(1);
                clamp_to_month(prev.year(), prev.month(), reset_day)
            }
        }
        BudgetFrequency::Yearly => clamp_to_month(today.year(), 1, 1),
    }
}

/// Builds a date in the given month, pulling the day back to the last
/// valid day when it overshoots the month's length.
fn clamp_to_month(year: i32, month: u32, day: u32) -> NaiveDate {
    let mut day = day.clamp(1, 31);
    loop {
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return date;
        }
        day -= 1;
    }
}
