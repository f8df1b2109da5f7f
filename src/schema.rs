use crate::error::{AnalysisError, Result};
use crate::utils::{fiscal_period_end, fiscal_quarter_for_month, fiscal_year_for_date};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Canonical financial statement line items.
///
/// New members need matching alias entries in the alias table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum FactKey {
    #[schemars(description = "Total revenue or net sales for the period (Income Statement)")]
    Revenue,

    #[schemars(description = "Cost of goods sold / cost of revenue (Income Statement)")]
    CostOfGoods,

    #[schemars(description = "Revenue less cost of goods sold, as stated (Income Statement)")]
    GrossProfit,

    #[schemars(description = "Operating income or EBIT (Income Statement)")]
    OperatingIncome,

    #[schemars(description = "Net income attributable to the company (Income Statement)")]
    NetIncome,

    #[schemars(description = "Interest expense for the period (Income Statement)")]
    InterestExpense,

    #[schemars(description = "Total assets at period end (Balance Sheet)")]
    TotalAssets,

    #[schemars(description = "Total current assets at period end (Balance Sheet)")]
    CurrentAssets,

    #[schemars(description = "Cash and cash equivalents at period end (Balance Sheet)")]
    Cash,

    #[schemars(description = "Inventories at period end (Balance Sheet)")]
    Inventory,

    #[schemars(description = "Trade accounts receivable at period end (Balance Sheet)")]
    AccountsReceivable,

    #[schemars(description = "Total liabilities at period end (Balance Sheet)")]
    TotalLiabilities,

    #[schemars(description = "Total current liabilities at period end (Balance Sheet)")]
    CurrentLiabilities,

    #[schemars(description = "Long-term debt, non-current portion (Balance Sheet)")]
    LongTermDebt,

    #[schemars(description = "Total shareholders' equity at period end (Balance Sheet)")]
    ShareholdersEquity,

    #[schemars(description = "Net cash provided by operating activities (Cash Flow Statement)")]
    OperatingCashFlow,

    #[schemars(description = "Purchases of property, plant and equipment (Cash Flow Statement)")]
    CapitalExpenditures,
}

impl FactKey {
    pub const ALL: [FactKey; 17] = [
        FactKey::Revenue,
        FactKey::CostOfGoods,
        FactKey::GrossProfit,
        FactKey::OperatingIncome,
        FactKey::NetIncome,
        FactKey::InterestExpense,
        FactKey::TotalAssets,
        FactKey::CurrentAssets,
        FactKey::Cash,
        FactKey::Inventory,
        FactKey::AccountsReceivable,
        FactKey::TotalLiabilities,
        FactKey::CurrentLiabilities,
        FactKey::LongTermDebt,
        FactKey::ShareholdersEquity,
        FactKey::OperatingCashFlow,
        FactKey::CapitalExpenditures,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FactKey::Revenue => "revenue",
            FactKey::CostOfGoods => "cost_of_goods",
            FactKey::GrossProfit => "gross_profit",
            FactKey::OperatingIncome => "operating_income",
            FactKey::NetIncome => "net_income",
            FactKey::InterestExpense => "interest_expense",
            FactKey::TotalAssets => "total_assets",
            FactKey::CurrentAssets => "current_assets",
            FactKey::Cash => "cash",
            FactKey::Inventory => "inventory",
            FactKey::AccountsReceivable => "accounts_receivable",
            FactKey::TotalLiabilities => "total_liabilities",
            FactKey::CurrentLiabilities => "current_liabilities",
            FactKey::LongTermDebt => "long_term_debt",
            FactKey::ShareholdersEquity => "shareholders_equity",
            FactKey::OperatingCashFlow => "operating_cash_flow",
            FactKey::CapitalExpenditures => "capital_expenditures",
        }
    }

    /// Keys whose values are expected to be non-negative on a sane statement.
    pub fn expects_non_negative(self) -> bool {
        matches!(
            self,
            FactKey::Revenue
                | FactKey::TotalAssets
                | FactKey::CurrentAssets
                | FactKey::Cash
                | FactKey::Inventory
                | FactKey::AccountsReceivable
                | FactKey::ShareholdersEquity
        )
    }
}

impl fmt::Display for FactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum FiscalPeriod {
    Annual,
    Q1,
    Q2,
    Q3,
    Q4,
}

impl FiscalPeriod {
    pub fn is_annual(self) -> bool {
        self == FiscalPeriod::Annual
    }
}

impl fmt::Display for FiscalPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FiscalPeriod::Annual => "FY",
            FiscalPeriod::Q1 => "Q1",
            FiscalPeriod::Q2 => "Q2",
            FiscalPeriod::Q3 => "Q3",
            FiscalPeriod::Q4 => "Q4",
        };
        f.write_str(label)
    }
}

/// Identifies one reporting period. Ordered by `period_end_date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct PeriodIdentifier {
    pub fiscal_year: i32,
    pub fiscal_period: FiscalPeriod,
    #[schemars(description = "Last day of the reporting period, YYYY-MM-DD")]
    pub period_end_date: NaiveDate,
}

impl PeriodIdentifier {
    pub fn new(fiscal_year: i32, fiscal_period: FiscalPeriod, period_end_date: NaiveDate) -> Self {
        Self {
            fiscal_year,
            fiscal_period,
            period_end_date,
        }
    }

    /// Builds a period whose end date follows from the company's fiscal calendar.
    pub fn from_fiscal_calendar(
        fiscal_year: i32,
        fiscal_period: FiscalPeriod,
        fiscal_year_end_month: u32,
    ) -> Result<Self> {
        let period_end_date = fiscal_period_end(fiscal_year, fiscal_period, fiscal_year_end_month)?;
        Ok(Self::new(fiscal_year, fiscal_period, period_end_date))
    }

    /// Builds the quarter that ends on `period_end_date`, which must be a fiscal quarter end.
    pub fn quarter_ending(period_end_date: NaiveDate, fiscal_year_end_month: u32) -> Result<Self> {
        let fiscal_year = fiscal_year_for_date(period_end_date, fiscal_year_end_month);
        let fiscal_period = fiscal_quarter_for_month(period_end_date.month(), fiscal_year_end_month);
        let period = Self::from_fiscal_calendar(fiscal_year, fiscal_period, fiscal_year_end_month)?;

        if period.period_end_date != period_end_date {
            return Err(AnalysisError::DateError(format!(
                "{} is not a fiscal quarter end for a year ending in month {}",
                period_end_date, fiscal_year_end_month
            )));
        }

        Ok(period)
    }
}

impl Ord for PeriodIdentifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.period_end_date
            .cmp(&other.period_end_date)
            .then(self.fiscal_year.cmp(&other.fiscal_year))
            .then(self.fiscal_period.cmp(&other.fiscal_period))
    }
}

impl PartialOrd for PeriodIdentifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PeriodIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} (ending {})",
            self.fiscal_period, self.fiscal_year, self.period_end_date
        )
    }
}

/// Reporting scale a source document declares for its figures.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum UnitScale {
    #[default]
    Ones,
    Thousands,
    Millions,
}

impl UnitScale {
    pub fn multiplier(self) -> Decimal {
        match self {
            UnitScale::Ones => Decimal::ONE,
            UnitScale::Thousands => dec!(1_000),
            UnitScale::Millions => dec!(1_000_000),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// One level down, saturating at `Low`.
    pub fn lowered(self) -> Self {
        match self {
            Confidence::High => Confidence::Medium,
            Confidence::Medium | Confidence::Low => Confidence::Low,
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        };
        f.write_str(label)
    }
}

/// Kind of document a statement table was extracted from.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[schemars(description = "Tagged XBRL facts from a structured filing")]
    #[default]
    Xbrl,

    #[schemars(description = "An HTML statement table")]
    Html,

    #[schemars(description = "A table recovered from a PDF, possibly via OCR")]
    Pdf,
}

impl SourceKind {
    pub fn fact_confidence(self) -> Confidence {
        match self {
            SourceKind::Xbrl | SourceKind::Html => Confidence::High,
            SourceKind::Pdf => Confidence::Medium,
        }
    }
}

/// One normalized data point. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CanonicalFact {
    key: FactKey,
    #[schemars(description = "Value in ones, already multiplied by the declared unit scale")]
    value: Decimal,
    period: PeriodIdentifier,
    #[schemars(description = "Reporting scale the source document declared")]
    unit_scale: UnitScale,
    confidence: Confidence,
}

impl CanonicalFact {
    pub fn new(
        key: FactKey,
        value: Decimal,
        period: PeriodIdentifier,
        unit_scale: UnitScale,
        confidence: Confidence,
    ) -> Self {
        Self {
            key,
            value,
            period,
            unit_scale,
            confidence,
        }
    }

    pub fn key(&self) -> FactKey {
        self.key
    }

    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn period(&self) -> PeriodIdentifier {
        self.period
    }

    pub fn unit_scale(&self) -> UnitScale {
        self.unit_scale
    }

    pub fn confidence(&self) -> Confidence {
        self.confidence
    }
}

/// All canonical facts for a single period, at most one per key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct FactSet {
    period: PeriodIdentifier,
    facts: BTreeMap<FactKey, CanonicalFact>,
}

impl FactSet {
    pub fn new(period: PeriodIdentifier) -> Self {
        Self {
            period,
            facts: BTreeMap::new(),
        }
    }

    /// Builds a set from loose facts, failing on a repeated key or a foreign period.
    pub fn from_facts<I>(period: PeriodIdentifier, facts: I) -> Result<Self>
    where
        I: IntoIterator<Item = CanonicalFact>,
    {
        let mut set = Self::new(period);
        for fact in facts {
            set.try_insert(fact)?;
        }
        Ok(set)
    }

    pub fn try_insert(&mut self, fact: CanonicalFact) -> Result<()> {
        if fact.period != self.period {
            return Err(AnalysisError::PeriodMismatch {
                key: fact.key,
                expected: self.period,
                found: fact.period,
            });
        }

        if self.facts.contains_key(&fact.key) {
            return Err(AnalysisError::DuplicateFact {
                key: fact.key,
                period: self.period,
            });
        }

        self.facts.insert(fact.key, fact);
        Ok(())
    }

    pub fn period(&self) -> PeriodIdentifier {
        self.period
    }

    pub fn get(&self, key: FactKey) -> Option<&CanonicalFact> {
        self.facts.get(&key)
    }

    /// The stated value, or `None` when the statement did not report it.
    pub fn value(&self, key: FactKey) -> Option<Decimal> {
        self.facts.get(&key).map(CanonicalFact::value)
    }

    pub fn contains(&self, key: FactKey) -> bool {
        self.facts.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CanonicalFact> {
        self.facts.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = FactKey> + '_ {
        self.facts.keys().copied()
    }
}
