use crate::error::{AnalysisError, Result};
use crate::schema::FiscalPeriod;
use chrono::{Datelike, Days, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places kept on every computed ratio.
pub const RATIO_DECIMAL_PLACES: u32 = 4;

/// Decimal places kept on percentage changes.
pub const PERCENT_DECIMAL_PLACES: u32 = 2;

pub fn last_day_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.checked_sub_days(Days::new(1)))
        .ok_or_else(|| {
            AnalysisError::DateError(format!("No month end exists for {}-{:02}", year, month))
        })
}

pub fn validate_fiscal_year_end_month(month: u32) -> Result<()> {
    if !(1..=12).contains(&month) {
        return Err(AnalysisError::InvalidFiscalYearEndMonth(month));
    }
    Ok(())
}

/// Moves a (year, month) pair by `delta` months, in either direction.
pub fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let index = year * 12 + (month as i32 - 1) + delta;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

/// Returns the last calendar day of a fiscal period.
///
/// The annual period ends on the last day of `fiscal_year_end_month` in
/// `fiscal_year`. Each quarter ends three months after the previous one, so
/// Q4 shares the annual end date.
///
/// # Examples
/// - FY ends Dec: FY2023 Q1 ends 2023-03-31
/// - FY ends June: FY2023 Q1 ends 2022-09-30, FY2023 ends 2023-06-30
pub fn fiscal_period_end(
    fiscal_year: i32,
    period: FiscalPeriod,
    fiscal_year_end_month: u32,
) -> Result<NaiveDate> {
    validate_fiscal_year_end_month(fiscal_year_end_month)?;

    let quarters_before_year_end = match period {
        FiscalPeriod::Annual | FiscalPeriod::Q4 => 0,
        FiscalPeriod::Q3 => 1,
        FiscalPeriod::Q2 => 2,
        FiscalPeriod::Q1 => 3,
    };

    let (year, month) = shift_month(
        fiscal_year,
        fiscal_year_end_month,
        -(quarters_before_year_end * 3),
    );
    last_day_of_month(year, month)
}

/// Fiscal quarter a calendar month falls in, for a given fiscal year end month.
pub fn fiscal_quarter_for_month(calendar_month: u32, fiscal_year_end_month: u32) -> FiscalPeriod {
    let fy_start_month = if fiscal_year_end_month == 12 {
        1
    } else {
        fiscal_year_end_month + 1
    };

    let index = if calendar_month >= fy_start_month {
        calendar_month - fy_start_month
    } else {
        calendar_month + 12 - fy_start_month
    };

    match index / 3 {
        0 => FiscalPeriod::Q1,
        1 => FiscalPeriod::Q2,
        2 => FiscalPeriod::Q3,
        _ => FiscalPeriod::Q4,
    }
}

/// Fiscal year a date belongs to, labelled by the calendar year the fiscal year ends in.
pub fn fiscal_year_for_date(date: NaiveDate, fiscal_year_end_month: u32) -> i32 {
    if date.month() <= fiscal_year_end_month {
        date.year()
    } else {
        date.year() + 1
    }
}

/// Rounds half away from zero and pads to exactly `dp` places, so `0.4` reads `0.4000`.
fn round_fixed(value: Decimal, dp: u32) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(dp);
    rounded
}

pub fn round_ratio(value: Decimal) -> Decimal {
    round_fixed(value, RATIO_DECIMAL_PLACES)
}

pub fn round_percent(value: Decimal) -> Decimal {
    round_fixed(value, PERCENT_DECIMAL_PLACES)
}
