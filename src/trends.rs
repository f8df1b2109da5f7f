use crate::error::{AnalysisError, Result};
use crate::ratios::{RatioKey, RatioResult};
use crate::schema::PeriodIdentifier;
use crate::utils::round_percent;
use log::debug;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default band, in percent, within which a change counts as flat.
pub const DEFAULT_FLAT_THRESHOLD: Decimal = dec!(1.0);

/// The ratios computed for one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodRatios {
    pub period: PeriodIdentifier,
    pub ratios: Vec<RatioResult>,
}

impl PeriodRatios {
    pub fn new(period: PeriodIdentifier, ratios: Vec<RatioResult>) -> Self {
        Self { period, ratios }
    }

    fn computed_value(&self, key: RatioKey) -> Option<Decimal> {
        self.ratios
            .iter()
            .find(|r| r.name() == key)
            .and_then(RatioResult::value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Declining,
    Flat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TrendResult {
    pub ratio: RatioKey,
    /// `None` when fewer than two periods computed the ratio.
    pub direction: Option<TrendDirection>,
    /// Percent change from the earliest to the latest computed value, 2 dp.
    pub pct_change: Option<Decimal>,
    pub earliest: Option<Decimal>,
    pub latest: Option<Decimal>,
    /// Number of periods in which the ratio was computed.
    pub periods_compared: usize,
}

/// Direction and size of each ratio's move across the supplied periods.
///
/// Periods must already be in strictly increasing end-date order; they are
/// never reordered. Only computed values take part, so a ratio that is
/// undefined in some middle period still trends between the ends.
pub fn compute_trends(periods: &[PeriodRatios], flat_threshold: Decimal) -> Result<Vec<TrendResult>> {
    for pair in periods.windows(2) {
        let previous = pair[0].period.period_end_date;
        let next = pair[1].period.period_end_date;
        if next <= previous {
            return Err(AnalysisError::PeriodOrder { previous, next });
        }
    }

    let trends = RatioKey::ALL
        .iter()
        .map(|key| trend_for(*key, periods, flat_threshold))
        .collect();

    Ok(trends)
}

fn trend_for(key: RatioKey, periods: &[PeriodRatios], flat_threshold: Decimal) -> TrendResult {
    let values: Vec<Decimal> = periods
        .iter()
        .filter_map(|p| p.computed_value(key))
        .collect();

    let (earliest, latest) = match (values.first(), values.last()) {
        (Some(first), Some(last)) if values.len() >= 2 => (*first, *last),
        _ => {
            return TrendResult {
                ratio: key,
                direction: None,
                pct_change: None,
                earliest: values.first().copied(),
                latest: values.last().copied(),
                periods_compared: values.len(),
            }
        }
    };

    let pct_change = latest
        .checked_sub(earliest)
        .and_then(|change| change.checked_div(earliest.abs()))
        .and_then(|fraction| fraction.checked_mul(dec!(100)))
        .map(round_percent);

    let direction = if latest == earliest
        || pct_change.is_some_and(|pct| pct.abs() < flat_threshold)
    {
        TrendDirection::Flat
    } else if latest > earliest {
        TrendDirection::Improving
    } else {
        TrendDirection::Declining
    };

    debug!(
        "{}: {} -> {} over {} periods ({:?})",
        key,
        earliest,
        latest,
        values.len(),
        direction
    );

    TrendResult {
        ratio: key,
        direction: Some(direction),
        pct_change,
        earliest: Some(earliest),
        latest: Some(latest),
        periods_compared: values.len(),
    }
}
