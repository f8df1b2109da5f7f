use crate::normalizer::NormalizedStatement;
use crate::ratios::RatioKey;
use crate::schema::{Confidence, FactKey, FactSet, PeriodIdentifier};
use chrono::NaiveDate;
use log::warn;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub const DEFAULT_BALANCE_SHEET_TOLERANCE: Decimal = dec!(0.05);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    BalanceEquation,
    UnexpectedSign,
    GrossProfitMismatch,
    InsufficientData,
}

/// A consistency problem in one period's facts. Recoverable: it lowers
/// confidence but never stops the analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// Assets differ from liabilities plus equity by more than the tolerance.
    BalanceEquation {
        total_assets: Decimal,
        total_liabilities: Decimal,
        shareholders_equity: Decimal,
        /// |assets - (liabilities + equity)| / |assets|, absent when assets are zero.
        relative_difference: Option<Decimal>,
    },
    UnexpectedSign {
        key: FactKey,
        value: Decimal,
    },
    /// Stated gross profit disagrees with revenue less cost of goods.
    GrossProfitMismatch {
        revenue: Decimal,
        cost_of_goods: Decimal,
        gross_profit: Decimal,
    },
    InsufficientData {
        present: usize,
        required: usize,
    },
}

impl Violation {
    pub fn kind(&self) -> ViolationKind {
        match self {
            Violation::BalanceEquation { .. } => ViolationKind::BalanceEquation,
            Violation::UnexpectedSign { .. } => ViolationKind::UnexpectedSign,
            Violation::GrossProfitMismatch { .. } => ViolationKind::GrossProfitMismatch,
            Violation::InsufficientData { .. } => ViolationKind::InsufficientData,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::BalanceEquation {
                total_assets,
                total_liabilities,
                shareholders_equity,
                ..
            } => write!(
                f,
                "Assets ({}) != Liabilities ({}) + Equity ({})",
                total_assets, total_liabilities, shareholders_equity
            ),
            Violation::UnexpectedSign { key, value } => {
                write!(f, "{} is negative ({})", key, value)
            }
            Violation::GrossProfitMismatch {
                revenue,
                cost_of_goods,
                gross_profit,
            } => write!(
                f,
                "Gross profit ({}) != Revenue ({}) - Cost of goods ({})",
                gross_profit, revenue, cost_of_goods
            ),
            Violation::InsufficientData { present, required } => write!(
                f,
                "Only {} of {} ratio inputs are present",
                present, required
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationReport {
    pub ok: bool,
    pub violations: Vec<Violation>,
    pub confidence: Confidence,
}

impl ValidationReport {
    pub fn has_violation(&self, kind: ViolationKind) -> bool {
        self.violations.iter().any(|v| v.kind() == kind)
    }
}

/// A filing dropped in favour of a later filing for the same period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SupersededFiling {
    pub period: PeriodIdentifier,
    pub superseded_filing_date: Option<NaiveDate>,
    pub retained_filing_date: Option<NaiveDate>,
}

pub struct ConsistencyValidator {
    tolerance: Decimal,
}

impl ConsistencyValidator {
    pub fn new(tolerance: Decimal) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> Decimal {
        self.tolerance
    }

    /// Checks one period's facts. Always returns a report.
    pub fn validate(&self, facts: &FactSet) -> ValidationReport {
        let required = ratio_inputs();
        let present = required.iter().filter(|k| facts.contains(**k)).count();

        if facts.is_empty() {
            return ValidationReport {
                ok: false,
                violations: vec![Violation::InsufficientData {
                    present: 0,
                    required: required.len(),
                }],
                confidence: Confidence::Low,
            };
        }

        let mut violations = Vec::new();
        let mut confidence = completeness_confidence(present, required.len());

        let mut equation_violations = 0;
        if let Some(violation) = self.check_balance_equation(facts) {
            violations.push(violation);
            equation_violations += 1;
        }
        if let Some(violation) = self.check_gross_profit(facts) {
            violations.push(violation);
            equation_violations += 1;
        }
        if equation_violations > 0 {
            confidence = confidence.lowered();
        }

        let sign_violations = check_signs(facts);
        if !sign_violations.is_empty() {
            confidence = Confidence::Low;
            violations.extend(sign_violations);
        }

        for violation in &violations {
            warn!("{}: {}", facts.period(), violation);
        }

        ValidationReport {
            ok: violations.is_empty(),
            violations,
            confidence,
        }
    }

    fn check_balance_equation(&self, facts: &FactSet) -> Option<Violation> {
        let total_assets = facts.value(FactKey::TotalAssets)?;
        let total_liabilities = facts.value(FactKey::TotalLiabilities)?;
        let shareholders_equity = facts.value(FactKey::ShareholdersEquity)?;

        let difference = total_liabilities
            .checked_add(shareholders_equity)
            .and_then(|rhs| total_assets.checked_sub(rhs))
            .map(|d| d.abs());
        let relative_difference = difference.and_then(|d| d.checked_div(total_assets.abs()));

        let violated = self.exceeds_tolerance(difference, total_assets);

        violated.then_some(Violation::BalanceEquation {
            total_assets,
            total_liabilities,
            shareholders_equity,
            relative_difference,
        })
    }

    fn check_gross_profit(&self, facts: &FactSet) -> Option<Violation> {
        let revenue = facts.value(FactKey::Revenue)?;
        let cost_of_goods = facts.value(FactKey::CostOfGoods)?;
        let gross_profit = facts.value(FactKey::GrossProfit)?;

        let difference = revenue
            .checked_sub(cost_of_goods)
            .and_then(|d| d.checked_sub(gross_profit))
            .map(|d| d.abs());
        let violated = self.exceeds_tolerance(difference, revenue);

        violated.then_some(Violation::GrossProfitMismatch {
            revenue,
            cost_of_goods,
            gross_profit,
        })
    }

    /// An absolute difference that overflowed always exceeds the tolerance; against
    /// a zero base any non-zero difference does.
    fn exceeds_tolerance(&self, difference: Option<Decimal>, base: Decimal) -> bool {
        match difference {
            None => true,
            Some(difference) => match difference.checked_div(base.abs()) {
                Some(relative) => relative > self.tolerance,
                None => !difference.is_zero(),
            },
        }
    }
}

impl Default for ConsistencyValidator {
    fn default() -> Self {
        Self::new(DEFAULT_BALANCE_SHEET_TOLERANCE)
    }
}

/// Validates with the default tolerance.
pub fn validate(facts: &FactSet) -> ValidationReport {
    ConsistencyValidator::default().validate(facts)
}

fn check_signs(facts: &FactSet) -> Vec<Violation> {
    facts
        .iter()
        .filter(|fact| fact.key().expects_non_negative() && fact.value().is_sign_negative())
        .filter(|fact| !fact.value().is_zero())
        .map(|fact| Violation::UnexpectedSign {
            key: fact.key(),
            value: fact.value(),
        })
        .collect()
}

/// Every key some ratio in the catalogue needs.
fn ratio_inputs() -> BTreeSet<FactKey> {
    RatioKey::ALL
        .iter()
        .flat_map(|ratio| ratio.inputs().iter().copied())
        .collect()
}

fn completeness_confidence(present: usize, required: usize) -> Confidence {
    if present >= required {
        Confidence::High
    } else if present * 2 < required {
        Confidence::Low
    } else {
        Confidence::Medium
    }
}

/// Keeps, for each period, the statement from the latest filing.
///
/// A statement without a filing date is older than any dated one; between
/// equal filing dates the one supplied later wins. Dropped filings are
/// returned, never merged or averaged. Output keeps the order in which each
/// retained period first appeared.
pub fn select_latest_filings(
    statements: Vec<NormalizedStatement>,
) -> (Vec<NormalizedStatement>, Vec<SupersededFiling>) {
    let mut order: Vec<PeriodIdentifier> = Vec::new();
    let mut latest: BTreeMap<PeriodIdentifier, NormalizedStatement> = BTreeMap::new();
    let mut superseded = Vec::new();

    for statement in statements {
        let period = statement.period;
        match latest.remove(&period) {
            None => {
                order.push(period);
                latest.insert(period, statement);
            }
            Some(existing) => {
                let (kept, dropped) = if statement.filing_date >= existing.filing_date {
                    (statement, existing)
                } else {
                    (existing, statement)
                };

                warn!(
                    "Restatement for {}: using filing of {:?} over {:?}",
                    period, kept.filing_date, dropped.filing_date
                );
                superseded.push(SupersededFiling {
                    period,
                    superseded_filing_date: dropped.filing_date,
                    retained_filing_date: kept.filing_date,
                });
                latest.insert(period, kept);
            }
        }
    }

    let retained = order
        .into_iter()
        .filter_map(|period| latest.remove(&period))
        .collect();

    (retained, superseded)
}
