//! # Financial Statement Analyzer
//!
//! A library for turning extracted financial statement line items into canonical
//! facts, validating them, and computing ratios and trends with explicit validity.
//!
//! ## Core Concepts
//!
//! - **Raw Tables**: Line items for one period as extracted from XBRL, HTML or PDF, with free-text labels and unparsed values
//! - **Canonical Facts**: One value per `FactKey` per period, in ones, after alias lookup and value parsing
//! - **Validation**: Balance-sheet equation, sign sanity and completeness checks that lower confidence instead of failing
//! - **Ratios**: A fixed catalogue where every result is `computed`, `undefined_denominator` or `missing_input`
//! - **Trends**: Direction and percent change of each ratio between the earliest and latest computed periods, with annual and quarterly periods trended as separate series
//!
//! ## Example
//!
//! ```rust,ignore
//! use financial_statement_analyzer::*;
//! use chrono::NaiveDate;
//!
//! let period = PeriodIdentifier::new(
//!     2023,
//!     FiscalPeriod::Annual,
//!     NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
//! );
//! let table = RawTable::new(
//!     period,
//!     UnitScale::Thousands,
//!     vec![
//!         RawRow::new("Net sales", ["1,000"]),
//!         RawRow::new("Cost of sales", ["600"]),
//!         RawRow::new("Net income", ["200"]),
//!     ],
//! );
//!
//! let record = analyze_company("ACME Corp", &[table]).unwrap();
//! println!("{}", record.to_json().unwrap());
//! ```

pub mod alias_table;
pub mod benchmark;
pub mod config;
pub mod error;
pub mod ingestion;
pub mod normalizer;
pub mod ratios;
pub mod record;
pub mod schema;
pub mod trends;
pub mod utils;
pub mod validator;
pub mod value_parser;

pub use alias_table::{canonicalize, install_global, normalize_label, AliasTable, NotRecognized};
pub use benchmark::{default_thresholds, flag_ratios, BenchmarkFlag, BenchmarkThreshold, Breach};
pub use config::{AliasOverrides, AnalysisConfig};
pub use error::{AnalysisError, Result};
pub use ingestion::*;
pub use normalizer::{
    normalize, NormalizationWarning, NormalizedStatement, StatementNormalizer, UnmappedReason,
    UnmappedRow,
};
pub use ratios::{compute_ratio, compute_ratios, RatioCategory, RatioKey, RatioResult, Validity};
pub use record::{AnalysisRecord, PeriodAnalysis};
pub use schema::*;
pub use trends::{compute_trends, PeriodRatios, TrendDirection, TrendResult};
pub use utils::*;
pub use validator::{
    select_latest_filings, validate, ConsistencyValidator, SupersededFiling, ValidationReport,
    Violation, ViolationKind,
};
pub use value_parser::{parse_value, ParseFailure};

use log::{debug, info};

/// Runs the whole pipeline for one company.
pub struct AnalysisProcessor<'a> {
    config: &'a AnalysisConfig,
    aliases: &'a AliasTable,
}

impl<'a> AnalysisProcessor<'a> {
    pub fn new(config: &'a AnalysisConfig, aliases: &'a AliasTable) -> Self {
        Self { config, aliases }
    }

    /// Normalizes every table, keeps the latest filing per period, then validates,
    /// computes ratios and benchmark flags per period. Annual and quarterly
    /// periods are trended as two separate series, so a fiscal year and its
    /// fourth quarter may share an end date.
    ///
    /// Data-quality problems end up in the record. Errors are reserved for an
    /// invalid configuration or two distinct periods of the same cadence that
    /// end on the same date.
    pub fn analyze(&self, company: &str, tables: &[RawTable]) -> Result<AnalysisRecord> {
        self.config.validate()?;

        info!(
            "Analyzing {}: {} statement tables",
            company,
            tables.len()
        );

        let normalizer = StatementNormalizer::new(self.aliases);
        let statements: Vec<NormalizedStatement> =
            tables.iter().map(|t| normalizer.normalize(t)).collect();

        let (mut statements, superseded) = select_latest_filings(statements);
        statements.sort_by(|a, b| a.period.cmp(&b.period));

        debug!(
            "{} periods after restatement selection ({} filings superseded)",
            statements.len(),
            superseded.len()
        );

        let validator = ConsistencyValidator::new(self.config.balance_sheet_tolerance);
        let periods: Vec<PeriodAnalysis> = statements
            .into_iter()
            .map(|statement| self.analyze_period(&validator, statement))
            .collect();

        let trends = self.trend_series(&periods, true)?;
        let quarterly_trends = self.trend_series(&periods, false)?;

        let record = AnalysisRecord::new(
            company.to_string(),
            periods,
            trends,
            quarterly_trends,
            superseded,
        );
        info!(
            "Finished {}: {} periods, {}",
            company,
            record.periods.len(),
            record.confidence_label()
        );

        Ok(record)
    }

    fn trend_series(&self, periods: &[PeriodAnalysis], annual: bool) -> Result<Vec<TrendResult>> {
        let series: Vec<PeriodRatios> = periods
            .iter()
            .filter(|p| p.period.fiscal_period.is_annual() == annual)
            .map(|p| PeriodRatios::new(p.period, p.ratios.clone()))
            .collect();

        debug!(
            "Trending {} {} periods",
            series.len(),
            if annual { "annual" } else { "quarterly" }
        );

        compute_trends(&series, self.config.trend_flat_threshold)
    }

    fn analyze_period(
        &self,
        validator: &ConsistencyValidator,
        statement: NormalizedStatement,
    ) -> PeriodAnalysis {
        let validation = validator.validate(&statement.facts);
        let ratios = compute_ratios(&statement.facts);
        let benchmark_flags = flag_ratios(&ratios, &self.config.benchmarks);

        debug!(
            "{}: {} facts, {} unmapped rows, {} of {} ratios computed, confidence {}",
            statement.period,
            statement.facts.len(),
            statement.unmapped.len(),
            ratios.iter().filter(|r| r.is_computed()).count(),
            ratios.len(),
            validation.confidence
        );

        PeriodAnalysis {
            period: statement.period,
            filing_date: statement.filing_date,
            facts: statement.facts,
            unmapped: statement.unmapped,
            warnings: statement.warnings,
            validation,
            ratios,
            benchmark_flags,
        }
    }
}

/// Analyzes with the default configuration and the process-wide alias table.
pub fn analyze_company(company: &str, tables: &[RawTable]) -> Result<AnalysisRecord> {
    let config = AnalysisConfig::default();
    AnalysisProcessor::new(&config, alias_table::global()).analyze(company, tables)
}
