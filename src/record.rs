use crate::benchmark::BenchmarkFlag;
use crate::normalizer::{NormalizationWarning, UnmappedRow};
use crate::ratios::{RatioKey, RatioResult};
use crate::schema::{Confidence, FactSet, PeriodIdentifier};
use crate::trends::TrendResult;
use crate::validator::{SupersededFiling, ValidationReport};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::Serialize;

/// Everything derived for a single reporting period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct PeriodAnalysis {
    pub period: PeriodIdentifier,
    pub filing_date: Option<NaiveDate>,
    pub facts: FactSet,
    pub unmapped: Vec<UnmappedRow>,
    pub warnings: Vec<NormalizationWarning>,
    pub validation: ValidationReport,
    /// The full ratio catalogue, including ratios that could not be computed.
    pub ratios: Vec<RatioResult>,
    pub benchmark_flags: Vec<BenchmarkFlag>,
}

impl PeriodAnalysis {
    pub fn ratio(&self, key: RatioKey) -> Option<&RatioResult> {
        self.ratios.iter().find(|r| r.name() == key)
    }
}

/// Output of one company analysis, handed to report rendering as is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct AnalysisRecord {
    pub company: String,
    /// Periods in increasing end-date order.
    pub periods: Vec<PeriodAnalysis>,
    /// Trends across the annual periods.
    pub trends: Vec<TrendResult>,
    /// Trends across the quarterly periods, kept apart from the annual series.
    pub quarterly_trends: Vec<TrendResult>,
    pub superseded: Vec<SupersededFiling>,
    /// Lowest confidence of any period; low when there are no periods.
    pub confidence: Confidence,
}

impl AnalysisRecord {
    pub fn new(
        company: String,
        periods: Vec<PeriodAnalysis>,
        trends: Vec<TrendResult>,
        quarterly_trends: Vec<TrendResult>,
        superseded: Vec<SupersededFiling>,
    ) -> Self {
        let confidence = periods
            .iter()
            .map(|p| p.validation.confidence)
            .min()
            .unwrap_or(Confidence::Low);

        Self {
            company,
            periods,
            trends,
            quarterly_trends,
            superseded,
            confidence,
        }
    }

    pub fn period(&self, period: &PeriodIdentifier) -> Option<&PeriodAnalysis> {
        self.periods.iter().find(|p| &p.period == period)
    }

    pub fn latest_period(&self) -> Option<&PeriodAnalysis> {
        self.periods.last()
    }

    /// Label a report must show next to the figures.
    pub fn confidence_label(&self) -> &'static str {
        match self.confidence {
            Confidence::Low => "LOW CONFIDENCE",
            Confidence::Medium => "medium confidence",
            Confidence::High => "high confidence",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AnalysisRecord)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
