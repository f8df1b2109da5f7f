use crate::ratios::{RatioKey, RatioResult};
use log::debug;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Acceptable range for one ratio. Either bound may be left open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BenchmarkThreshold {
    pub ratio: RatioKey,
    #[serde(default)]
    pub min: Option<Decimal>,
    #[serde(default)]
    pub max: Option<Decimal>,
}

impl BenchmarkThreshold {
    pub fn at_least(ratio: RatioKey, min: Decimal) -> Self {
        Self {
            ratio,
            min: Some(min),
            max: None,
        }
    }

    pub fn at_most(ratio: RatioKey, max: Decimal) -> Self {
        Self {
            ratio,
            min: None,
            max: Some(max),
        }
    }
}

pub fn default_thresholds() -> Vec<BenchmarkThreshold> {
    vec![
        BenchmarkThreshold::at_least(RatioKey::CurrentRatio, dec!(1.0)),
        BenchmarkThreshold::at_least(RatioKey::NetMargin, Decimal::ZERO),
        BenchmarkThreshold::at_most(RatioKey::DebtToEquity, dec!(1.5)),
        BenchmarkThreshold::at_least(RatioKey::AssetTurnover, dec!(0.5)),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Breach {
    BelowMin,
    AboveMax,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BenchmarkFlag {
    pub ratio: RatioKey,
    pub value: Decimal,
    pub threshold: Decimal,
    pub breach: Breach,
}

/// Flags computed ratios that fall outside their configured range.
pub fn flag_ratios(ratios: &[RatioResult], thresholds: &[BenchmarkThreshold]) -> Vec<BenchmarkFlag> {
    let mut flags = Vec::new();

    for threshold in thresholds {
        let Some(value) = ratios
            .iter()
            .find(|r| r.name() == threshold.ratio)
            .and_then(RatioResult::value)
        else {
            continue;
        };

        if let Some(min) = threshold.min.filter(|min| value < *min) {
            flags.push(BenchmarkFlag {
                ratio: threshold.ratio,
                value,
                threshold: min,
                breach: Breach::BelowMin,
            });
        }
        if let Some(max) = threshold.max.filter(|max| value > *max) {
            flags.push(BenchmarkFlag {
                ratio: threshold.ratio,
                value,
                threshold: max,
                breach: Breach::AboveMax,
            });
        }
    }

    debug!("{} benchmark flags raised", flags.len());
    flags
}
