use crate::schema::{FactKey, FactSet};
use crate::utils::round_ratio;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum RatioCategory {
    Liquidity,
    Profitability,
    Leverage,
    Efficiency,
}

/// The ratio catalogue. Declaration order is the order results are produced in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum RatioKey {
    #[schemars(description = "current_assets / current_liabilities")]
    CurrentRatio,
    #[schemars(description = "(current_assets - inventory) / current_liabilities")]
    QuickRatio,
    #[schemars(description = "cash / current_liabilities")]
    CashRatio,
    #[schemars(description = "operating_cash_flow / current_liabilities")]
    OperatingCashFlowRatio,
    #[schemars(description = "(revenue - cost_of_goods) / revenue")]
    GrossMargin,
    #[schemars(description = "operating_income / revenue")]
    OperatingMargin,
    #[schemars(description = "net_income / revenue")]
    NetMargin,
    #[schemars(description = "net_income / total_assets")]
    Roa,
    #[schemars(description = "net_income / shareholders_equity, undefined for non-positive equity")]
    Roe,
    #[schemars(description = "(operating_cash_flow - |capital_expenditures|) / revenue")]
    FreeCashFlowMargin,
    #[schemars(description = "long_term_debt / shareholders_equity, undefined for non-positive equity")]
    DebtToEquity,
    #[schemars(description = "operating_income / interest_expense")]
    InterestCoverage,
    #[schemars(description = "long_term_debt / total_assets")]
    DebtToAssets,
    #[schemars(description = "operating_cash_flow / long_term_debt")]
    DebtServiceCoverage,
    #[schemars(description = "revenue / total_assets")]
    AssetTurnover,
    #[schemars(description = "cost_of_goods / inventory")]
    InventoryTurnover,
    #[schemars(description = "revenue / accounts_receivable")]
    ReceivablesTurnover,
}

impl RatioKey {
    pub const ALL: [RatioKey; 17] = [
        RatioKey::CurrentRatio,
        RatioKey::QuickRatio,
        RatioKey::CashRatio,
        RatioKey::OperatingCashFlowRatio,
        RatioKey::GrossMargin,
        RatioKey::OperatingMargin,
        RatioKey::NetMargin,
        RatioKey::Roa,
        RatioKey::Roe,
        RatioKey::FreeCashFlowMargin,
        RatioKey::DebtToEquity,
        RatioKey::InterestCoverage,
        RatioKey::DebtToAssets,
        RatioKey::DebtServiceCoverage,
        RatioKey::AssetTurnover,
        RatioKey::InventoryTurnover,
        RatioKey::ReceivablesTurnover,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RatioKey::CurrentRatio => "current_ratio",
            RatioKey::QuickRatio => "quick_ratio",
            RatioKey::CashRatio => "cash_ratio",
            RatioKey::OperatingCashFlowRatio => "operating_cash_flow_ratio",
            RatioKey::GrossMargin => "gross_margin",
            RatioKey::OperatingMargin => "operating_margin",
            RatioKey::NetMargin => "net_margin",
            RatioKey::Roa => "roa",
            RatioKey::Roe => "roe",
            RatioKey::FreeCashFlowMargin => "free_cash_flow_margin",
            RatioKey::DebtToEquity => "debt_to_equity",
            RatioKey::InterestCoverage => "interest_coverage",
            RatioKey::DebtToAssets => "debt_to_assets",
            RatioKey::DebtServiceCoverage => "debt_service_coverage",
            RatioKey::AssetTurnover => "asset_turnover",
            RatioKey::InventoryTurnover => "inventory_turnover",
            RatioKey::ReceivablesTurnover => "receivables_turnover",
        }
    }

    pub fn category(self) -> RatioCategory {
        match self {
            RatioKey::CurrentRatio
            | RatioKey::QuickRatio
            | RatioKey::CashRatio
            | RatioKey::OperatingCashFlowRatio => RatioCategory::Liquidity,
            RatioKey::GrossMargin
            | RatioKey::OperatingMargin
            | RatioKey::NetMargin
            | RatioKey::Roa
            | RatioKey::Roe
            | RatioKey::FreeCashFlowMargin => RatioCategory::Profitability,
            RatioKey::DebtToEquity
            | RatioKey::InterestCoverage
            | RatioKey::DebtToAssets
            | RatioKey::DebtServiceCoverage => RatioCategory::Leverage,
            RatioKey::AssetTurnover
            | RatioKey::InventoryTurnover
            | RatioKey::ReceivablesTurnover => RatioCategory::Efficiency,
        }
    }

    /// Facts the formula reads.
    pub fn inputs(self) -> &'static [FactKey] {
        use FactKey::*;
        match self {
            RatioKey::CurrentRatio => &[CurrentAssets, CurrentLiabilities],
            RatioKey::QuickRatio => &[CurrentAssets, Inventory, CurrentLiabilities],
            RatioKey::CashRatio => &[Cash, CurrentLiabilities],
            RatioKey::OperatingCashFlowRatio => &[OperatingCashFlow, CurrentLiabilities],
            RatioKey::GrossMargin => &[Revenue, CostOfGoods],
            RatioKey::OperatingMargin => &[OperatingIncome, Revenue],
            RatioKey::NetMargin => &[NetIncome, Revenue],
            RatioKey::Roa => &[NetIncome, TotalAssets],
            RatioKey::Roe => &[NetIncome, ShareholdersEquity],
            RatioKey::FreeCashFlowMargin => &[OperatingCashFlow, CapitalExpenditures, Revenue],
            RatioKey::DebtToEquity => &[LongTermDebt, ShareholdersEquity],
            RatioKey::InterestCoverage => &[OperatingIncome, InterestExpense],
            RatioKey::DebtToAssets => &[LongTermDebt, TotalAssets],
            RatioKey::DebtServiceCoverage => &[OperatingCashFlow, LongTermDebt],
            RatioKey::AssetTurnover => &[Revenue, TotalAssets],
            RatioKey::InventoryTurnover => &[CostOfGoods, Inventory],
            RatioKey::ReceivablesTurnover => &[Revenue, AccountsReceivable],
        }
    }

    /// Numerator and denominator from a set already known to hold every input.
    fn operands(self, v: &dyn Fn(FactKey) -> Decimal) -> Option<(Decimal, Decimal)> {
        use FactKey::*;
        let pair = match self {
            RatioKey::CurrentRatio => (v(CurrentAssets), v(CurrentLiabilities)),
            RatioKey::QuickRatio => (
                v(CurrentAssets).checked_sub(v(Inventory))?,
                v(CurrentLiabilities),
            ),
            RatioKey::CashRatio => (v(Cash), v(CurrentLiabilities)),
            RatioKey::OperatingCashFlowRatio => (v(OperatingCashFlow), v(CurrentLiabilities)),
            RatioKey::GrossMargin => (v(Revenue).checked_sub(v(CostOfGoods))?, v(Revenue)),
            RatioKey::OperatingMargin => (v(OperatingIncome), v(Revenue)),
            RatioKey::NetMargin => (v(NetIncome), v(Revenue)),
            RatioKey::Roa => (v(NetIncome), v(TotalAssets)),
            RatioKey::Roe => (v(NetIncome), v(ShareholdersEquity)),
            RatioKey::FreeCashFlowMargin => (
                v(OperatingCashFlow).checked_sub(v(CapitalExpenditures).abs())?,
                v(Revenue),
            ),
            RatioKey::DebtToEquity => (v(LongTermDebt), v(ShareholdersEquity)),
            RatioKey::InterestCoverage => (v(OperatingIncome), v(InterestExpense)),
            RatioKey::DebtToAssets => (v(LongTermDebt), v(TotalAssets)),
            RatioKey::DebtServiceCoverage => (v(OperatingCashFlow), v(LongTermDebt)),
            RatioKey::AssetTurnover => (v(Revenue), v(TotalAssets)),
            RatioKey::InventoryTurnover => (v(CostOfGoods), v(Inventory)),
            RatioKey::ReceivablesTurnover => (v(Revenue), v(AccountsReceivable)),
        };
        Some(pair)
    }

    /// Equity-based ratios are meaningless for non-positive equity.
    fn requires_positive_denominator(self) -> bool {
        matches!(self, RatioKey::Roe | RatioKey::DebtToEquity)
    }
}

impl fmt::Display for RatioKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Validity {
    Computed,
    UndefinedDenominator,
    MissingInput,
}

/// Result of one catalogue ratio for one period.
///
/// `value` is present exactly when `validity` is `Computed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct RatioResult {
    name: RatioKey,
    value: Option<Decimal>,
    inputs_used: BTreeSet<FactKey>,
    missing_inputs: BTreeSet<FactKey>,
    validity: Validity,
}

impl RatioResult {
    pub fn computed(name: RatioKey, value: Decimal) -> Self {
        Self {
            name,
            value: Some(value),
            inputs_used: name.inputs().iter().copied().collect(),
            missing_inputs: BTreeSet::new(),
            validity: Validity::Computed,
        }
    }

    pub fn undefined_denominator(name: RatioKey) -> Self {
        Self {
            name,
            value: None,
            inputs_used: name.inputs().iter().copied().collect(),
            missing_inputs: BTreeSet::new(),
            validity: Validity::UndefinedDenominator,
        }
    }

    pub fn missing_input(name: RatioKey, missing_inputs: BTreeSet<FactKey>) -> Self {
        let inputs_used = name
            .inputs()
            .iter()
            .copied()
            .filter(|k| !missing_inputs.contains(k))
            .collect();
        Self {
            name,
            value: None,
            inputs_used,
            missing_inputs,
            validity: Validity::MissingInput,
        }
    }

    pub fn name(&self) -> RatioKey {
        self.name
    }

    pub fn value(&self) -> Option<Decimal> {
        self.value
    }

    /// Input keys that were present.
    pub fn inputs_used(&self) -> &BTreeSet<FactKey> {
        &self.inputs_used
    }

    pub fn missing_inputs(&self) -> &BTreeSet<FactKey> {
        &self.missing_inputs
    }

    pub fn validity(&self) -> Validity {
        self.validity
    }

    pub fn is_computed(&self) -> bool {
        self.validity == Validity::Computed
    }
}

pub fn compute_ratio(key: RatioKey, facts: &FactSet) -> RatioResult {
    let missing: BTreeSet<FactKey> = key
        .inputs()
        .iter()
        .copied()
        .filter(|k| !facts.contains(*k))
        .collect();
    if !missing.is_empty() {
        return RatioResult::missing_input(key, missing);
    }

    let lookup = |k: FactKey| facts.value(k).unwrap_or_default();
    let Some((numerator, denominator)) = key.operands(&lookup) else {
        return RatioResult::undefined_denominator(key);
    };

    let denominator_defined = if key.requires_positive_denominator() {
        denominator > Decimal::ZERO
    } else {
        !denominator.is_zero()
    };
    if !denominator_defined {
        return RatioResult::undefined_denominator(key);
    }

    match numerator.checked_div(denominator) {
        Some(value) => RatioResult::computed(key, round_ratio(value)),
        None => RatioResult::undefined_denominator(key),
    }
}

/// Computes the whole catalogue, in catalogue order.
pub fn compute_ratios(facts: &FactSet) -> Vec<RatioResult> {
    RatioKey::ALL
        .iter()
        .map(|key| compute_ratio(*key, facts))
        .collect()
}
