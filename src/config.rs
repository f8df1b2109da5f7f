use crate::alias_table::AliasTable;
use crate::benchmark::{default_thresholds, BenchmarkThreshold};
use crate::error::{AnalysisError, Result};
use crate::schema::FactKey;
use crate::trends::DEFAULT_FLAT_THRESHOLD;
use crate::validator::DEFAULT_BALANCE_SHEET_TOLERANCE;
use log::{debug, info};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

pub const ENV_BALANCE_SHEET_TOLERANCE: &str = "FSA_BALANCE_SHEET_TOLERANCE";
pub const ENV_TREND_FLAT_THRESHOLD: &str = "FSA_TREND_FLAT_THRESHOLD";

/// Aliases to add to or remove from the built-in table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AliasOverrides {
    #[schemars(description = "Extra labels per canonical key, e.g. {\"revenue\": [\"Turnover\"]}")]
    #[serde(default)]
    pub add: BTreeMap<FactKey, Vec<String>>,

    #[schemars(description = "Labels to drop from the built-in table. Applied before additions.")]
    #[serde(default)]
    pub remove: Vec<String>,
}

impl AliasOverrides {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AnalysisConfig {
    #[schemars(
        description = "Largest accepted |assets - (liabilities + equity)| / |assets|, as a fraction"
    )]
    pub balance_sheet_tolerance: Decimal,

    #[schemars(description = "Percent change below which a trend counts as flat")]
    pub trend_flat_threshold: Decimal,

    pub benchmarks: Vec<BenchmarkThreshold>,

    pub aliases: AliasOverrides,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            balance_sheet_tolerance: DEFAULT_BALANCE_SHEET_TOLERANCE,
            trend_flat_threshold: DEFAULT_FLAT_THRESHOLD,
            benchmarks: default_thresholds(),
            aliases: AliasOverrides::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading analysis configuration from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Applies `FSA_BALANCE_SHEET_TOLERANCE` and `FSA_TREND_FLAT_THRESHOLD` when set.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_BALANCE_SHEET_TOLERANCE) {
            self.balance_sheet_tolerance = parse_decimal_var(ENV_BALANCE_SHEET_TOLERANCE, &raw)?;
            debug!("Balance sheet tolerance overridden to {}", self.balance_sheet_tolerance);
        }
        if let Some(raw) = lookup(ENV_TREND_FLAT_THRESHOLD) {
            self.trend_flat_threshold = parse_decimal_var(ENV_TREND_FLAT_THRESHOLD, &raw)?;
            debug!("Trend flat threshold overridden to {}", self.trend_flat_threshold);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.balance_sheet_tolerance < Decimal::ZERO || self.balance_sheet_tolerance > Decimal::ONE
        {
            return Err(AnalysisError::InvalidConfig(format!(
                "balance_sheet_tolerance must be between 0 and 1, got {}",
                self.balance_sheet_tolerance
            )));
        }

        if self.trend_flat_threshold < Decimal::ZERO {
            return Err(AnalysisError::InvalidConfig(format!(
                "trend_flat_threshold must not be negative, got {}",
                self.trend_flat_threshold
            )));
        }

        for threshold in &self.benchmarks {
            if let (Some(min), Some(max)) = (threshold.min, threshold.max) {
                if min > max {
                    return Err(AnalysisError::InvalidConfig(format!(
                        "benchmark for {} has min {} above max {}",
                        threshold.ratio, min, max
                    )));
                }
            }
        }

        Ok(())
    }

    /// The built-in aliases with this configuration's overrides applied.
    pub fn alias_table(&self) -> Result<AliasTable> {
        let defaults = AliasTable::with_defaults();
        if self.aliases.is_empty() {
            return Ok(defaults);
        }
        defaults.with_overrides(&self.aliases.add, &self.aliases.remove)
    }
}

fn parse_decimal_var(name: &str, raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw.trim()).map_err(|e| {
        AnalysisError::InvalidConfig(format!("{} is not a decimal ('{}'): {}", name, raw, e))
    })
}
