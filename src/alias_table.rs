//! Label canonicalization.
//!
//! Free-text line-item labels are normalized (lowercase, punctuation other
//! than parentheses removed, whitespace collapsed) and then looked up by exact
//! equality. There is no substring or fuzzy matching: "Cost of services" is not
//! a cost-of-goods label just because it shares words with one.

use crate::error::{AnalysisError, Result};
use crate::schema::FactKey;
use log::debug;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

static GLOBAL_ALIASES: OnceCell<AliasTable> = OnceCell::new();

/// Label that matched no alias.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("Label '{raw}' (normalized '{normalized}') matches no known alias")]
pub struct NotRecognized {
    pub raw: String,
    pub normalized: String,
}

pub fn normalize_label(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '(' || *c == ')')
        .flat_map(char::to_lowercase)
        .collect();

    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Maps normalized label text to canonical fact keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTable {
    by_alias: BTreeMap<String, FactKey>,
}

impl AliasTable {
    /// Builds a table from `FactKey -> aliases`, normalizing every alias.
    pub fn from_entries<I, A, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (FactKey, A)>,
        A: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = Self {
            by_alias: BTreeMap::new(),
        };
        for (key, aliases) in entries {
            for alias in aliases {
                table.insert(key, alias.as_ref())?;
            }
        }
        Ok(table)
    }

    /// Parses a JSON object of the form `{"revenue": ["Net sales", ...], ...}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: BTreeMap<FactKey, Vec<String>> = serde_json::from_str(json)?;
        Self::from_entries(entries)
    }

    pub fn with_defaults() -> Self {
        let mut by_alias = BTreeMap::new();
        for (key, aliases) in DEFAULT_ALIASES {
            for alias in *aliases {
                by_alias.insert(normalize_label(alias), *key);
            }
        }
        Self { by_alias }
    }

    /// Returns a copy with aliases added and removed.
    pub fn with_overrides(
        &self,
        add: &BTreeMap<FactKey, Vec<String>>,
        remove: &[String],
    ) -> Result<Self> {
        let mut table = self.clone();

        for alias in remove {
            let normalized = normalize_label(alias);
            if table.by_alias.remove(&normalized).is_none() {
                debug!("Alias '{}' was not present, nothing to remove", alias);
            }
        }

        for (key, aliases) in add {
            for alias in aliases {
                table.insert(*key, alias)?;
            }
        }

        Ok(table)
    }

    fn insert(&mut self, key: FactKey, raw: &str) -> Result<()> {
        let normalized = normalize_label(raw);
        if normalized.is_empty() {
            return Err(AnalysisError::EmptyAlias {
                key,
                raw: raw.to_string(),
            });
        }

        match self.by_alias.get(&normalized) {
            Some(existing) if *existing != key => Err(AnalysisError::AliasConflict {
                alias: normalized,
                existing: *existing,
                conflicting: key,
            }),
            _ => {
                self.by_alias.insert(normalized, key);
                Ok(())
            }
        }
    }

    pub fn canonicalize(&self, raw_label: &str) -> std::result::Result<FactKey, NotRecognized> {
        let normalized = normalize_label(raw_label);
        self.by_alias
            .get(&normalized)
            .copied()
            .ok_or_else(|| NotRecognized {
                raw: raw_label.to_string(),
                normalized,
            })
    }

    pub fn aliases_for(&self, key: FactKey) -> Vec<&str> {
        self.by_alias
            .iter()
            .filter(|(_, k)| **k == key)
            .map(|(alias, _)| alias.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_alias.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_alias.is_empty()
    }

    pub fn entries(&self) -> BTreeMap<FactKey, Vec<String>> {
        let mut entries: BTreeMap<FactKey, Vec<String>> = BTreeMap::new();
        for (alias, key) in &self.by_alias {
            entries.entry(*key).or_default().push(alias.clone());
        }
        entries
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.entries())
    }

    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str("# Alias Table\n\n");
        output.push_str("| Fact Key | Aliases |\n");
        output.push_str("|----------|---------|\n");

        for key in FactKey::ALL {
            let aliases = self.aliases_for(key);
            let rendered = if aliases.is_empty() {
                "_none_".to_string()
            } else {
                aliases.join(", ")
            };
            output.push_str(&format!("| {} | {} |\n", key, rendered));
        }

        output
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Installs the process-wide alias table. Only the first call succeeds.
pub fn install_global(table: AliasTable) -> Result<()> {
    GLOBAL_ALIASES
        .set(table)
        .map_err(|_| AnalysisError::AliasTableAlreadyInstalled)
}

/// The process-wide alias table; the built-in defaults if none was installed.
pub fn global() -> &'static AliasTable {
    GLOBAL_ALIASES.get_or_init(AliasTable::with_defaults)
}

/// Canonicalizes a label against the process-wide alias table.
pub fn canonicalize(raw_label: &str) -> std::result::Result<FactKey, NotRecognized> {
    global().canonicalize(raw_label)
}

// Common statement wording plus the US-GAAP element names found in SEC company facts.
const DEFAULT_ALIASES: &[(FactKey, &[&str])] = &[
    (
        FactKey::Revenue,
        &[
            "Revenue",
            "Revenues",
            "Total revenue",
            "Total revenues",
            "Net revenue",
            "Net revenues",
            "Net sales",
            "Total net sales",
            "Total net revenue",
            "Sales",
            "SalesRevenueNet",
            "TotalRevenues",
            "RevenueFromContractWithCustomerExcludingAssessedTax",
        ],
    ),
    (
        FactKey::CostOfGoods,
        &[
            "Cost of goods sold",
            "Cost of sales",
            "Cost of revenue",
            "Cost of revenues",
            "Total cost of revenue",
            "Cost of goods and services sold",
            "CostOfGoodsAndServicesSold",
            "CostOfRevenue",
        ],
    ),
    (
        FactKey::GrossProfit,
        &["Gross profit", "Gross margin", "Total gross profit", "GrossProfit"],
    ),
    (
        FactKey::OperatingIncome,
        &[
            "Operating income",
            "Operating income (loss)",
            "Income from operations",
            "Operating profit",
            "OperatingIncomeLoss",
        ],
    ),
    (
        FactKey::NetIncome,
        &[
            "Net income",
            "Net income (loss)",
            "Net earnings",
            "Net profit",
            "Profit for the year",
            "NetIncomeLoss",
            "ProfitLoss",
        ],
    ),
    (
        FactKey::InterestExpense,
        &["Interest expense", "Interest expense, net", "InterestExpense"],
    ),
    (FactKey::TotalAssets, &["Total assets", "Assets"]),
    (
        FactKey::CurrentAssets,
        &["Total current assets", "Current assets", "AssetsCurrent"],
    ),
    (
        FactKey::Cash,
        &[
            "Cash",
            "Cash and cash equivalents",
            "Cash and equivalents",
            "CashAndCashEquivalentsAtCarryingValue",
        ],
    ),
    (FactKey::Inventory, &["Inventory", "Inventories", "InventoryNet"]),
    (
        FactKey::AccountsReceivable,
        &[
            "Accounts receivable",
            "Accounts receivable, net",
            "Trade receivables",
            "AccountsReceivableNetCurrent",
        ],
    ),
    (
        FactKey::TotalLiabilities,
        &["Total liabilities", "Liabilities"],
    ),
    (
        FactKey::CurrentLiabilities,
        &[
            "Total current liabilities",
            "Current liabilities",
            "LiabilitiesCurrent",
        ],
    ),
    (
        FactKey::LongTermDebt,
        &[
            "Long-term debt",
            "Long term debt",
            "Long-term debt, net of current portion",
            "Long-term borrowings",
            "LongTermDebt",
            "LongTermDebtNoncurrent",
        ],
    ),
    (
        FactKey::ShareholdersEquity,
        &[
            "Total shareholders' equity",
            "Shareholders' equity",
            "Total stockholders' equity",
            "Stockholders' equity",
            "Total equity",
            "StockholdersEquity",
            "StockholdersEquityIncludingPortionAttributableToNoncontrollingInterest",
        ],
    ),
    (
        FactKey::OperatingCashFlow,
        &[
            "Net cash provided by operating activities",
            "Net cash provided by (used in) operating activities",
            "Net cash from operating activities",
            "Cash flow from operations",
            "Operating cash flow",
            "NetCashProvidedByUsedInOperatingActivities",
        ],
    ),
    (
        FactKey::CapitalExpenditures,
        &[
            "Capital expenditures",
            "Purchases of property and equipment",
            "Purchases of property, plant and equipment",
            "Payments for property, plant and equipment",
            "PaymentsToAcquirePropertyPlantAndEquipment",
        ],
    ),
];
