use crate::schema::{FactKey, PeriodIdentifier};
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Duplicate fact {key} for period {period}: a fact set holds one value per key")]
    DuplicateFact {
        key: FactKey,
        period: PeriodIdentifier,
    },

    #[error("Fact {key} belongs to period {found}, but the fact set is for {expected}")]
    PeriodMismatch {
        key: FactKey,
        expected: PeriodIdentifier,
        found: PeriodIdentifier,
    },

    #[error("Periods must be in strictly increasing end-date order: {next} follows {previous}")]
    PeriodOrder {
        previous: NaiveDate,
        next: NaiveDate,
    },

    #[error("Alias '{alias}' maps to both {existing} and {conflicting}")]
    AliasConflict {
        alias: String,
        existing: FactKey,
        conflicting: FactKey,
    },

    #[error("Alias '{raw}' for {key} is empty after normalization")]
    EmptyAlias { key: FactKey, raw: String },

    #[error("The process-wide alias table has already been installed")]
    AliasTableAlreadyInstalled,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid fiscal year end month {0}: must be between 1 and 12")]
    InvalidFiscalYearEndMonth(u32),

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
