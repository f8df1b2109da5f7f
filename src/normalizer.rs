use crate::alias_table::{self, AliasTable, NotRecognized};
use crate::ingestion::RawTable;
use crate::schema::{CanonicalFact, FactKey, FactSet, PeriodIdentifier};
use crate::value_parser::{parse_value, ParseFailure};
use chrono::NaiveDate;
use log::{debug, warn};
use schemars::JsonSchema;
use serde::Serialize;
use std::collections::BTreeMap;

/// Why a row did not become a fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum UnmappedReason {
    /// The label matched no alias.
    NotRecognized { normalized_label: String },
    /// The label mapped to a key but no column carried a usable value.
    ParseFailure { key: FactKey, failure: ParseFailure },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct UnmappedRow {
    pub row_index: usize,
    pub label: String,
    pub reason: UnmappedReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizationWarning {
    /// Two rows mapped to the same key; the first was kept.
    DuplicateKey {
        key: FactKey,
        kept_row: usize,
        kept_label: String,
        dropped_row: usize,
        dropped_label: String,
    },
}

/// Output of normalizing one raw table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct NormalizedStatement {
    pub period: PeriodIdentifier,
    pub filing_date: Option<NaiveDate>,
    pub facts: FactSet,
    pub unmapped: Vec<UnmappedRow>,
    pub warnings: Vec<NormalizationWarning>,
}

pub struct StatementNormalizer<'a> {
    aliases: &'a AliasTable,
}

impl<'a> StatementNormalizer<'a> {
    pub fn new(aliases: &'a AliasTable) -> Self {
        Self { aliases }
    }

    /// Turns one raw table into canonical facts for the table's period.
    ///
    /// The value of each row is taken from its last non-empty column. Rows that
    /// cannot be mapped or parsed are reported in `unmapped`; the first row to
    /// produce a given key wins and later ones are reported as warnings.
    pub fn normalize(&self, table: &RawTable) -> NormalizedStatement {
        let confidence = table.source.fact_confidence();
        let mut facts = FactSet::new(table.period);
        let mut kept_rows: BTreeMap<FactKey, (usize, &str)> = BTreeMap::new();
        let mut unmapped = Vec::new();
        let mut warnings = Vec::new();

        for (row_index, row) in table.rows.iter().enumerate() {
            let key = match self.aliases.canonicalize(&row.label) {
                Ok(key) => key,
                Err(NotRecognized { normalized, .. }) => {
                    debug!("Unmapped label '{}' in {}", row.label, table.period);
                    unmapped.push(UnmappedRow {
                        row_index,
                        label: row.label.clone(),
                        reason: UnmappedReason::NotRecognized {
                            normalized_label: normalized,
                        },
                    });
                    continue;
                }
            };

            let unit_scale = row.effective_unit_scale(table.unit_scale);
            let parsed = row
                .last_non_empty_value()
                .ok_or(ParseFailure::Empty)
                .and_then(|raw| parse_value(raw, unit_scale));

            let value = match parsed {
                Ok(value) => value,
                Err(failure) => {
                    debug!(
                        "Row '{}' ({}) in {} has no usable value: {}",
                        row.label, key, table.period, failure
                    );
                    unmapped.push(UnmappedRow {
                        row_index,
                        label: row.label.clone(),
                        reason: UnmappedReason::ParseFailure { key, failure },
                    });
                    continue;
                }
            };

            if let Some((kept_row, kept_label)) = kept_rows.get(&key) {
                warn!(
                    "Duplicate {} in {}: keeping row {} ('{}'), dropping row {} ('{}')",
                    key, table.period, kept_row, kept_label, row_index, row.label
                );
                warnings.push(NormalizationWarning::DuplicateKey {
                    key,
                    kept_row: *kept_row,
                    kept_label: kept_label.to_string(),
                    dropped_row: row_index,
                    dropped_label: row.label.clone(),
                });
                continue;
            }

            // `kept_rows` rules out duplicates and every fact takes the table's period,
            // so this only fails if those two guarantees drift apart.
            let fact = CanonicalFact::new(key, value, table.period, unit_scale, confidence);
            match facts.try_insert(fact) {
                Ok(()) => {
                    kept_rows.insert(key, (row_index, row.label.as_str()));
                }
                Err(e) => warn!("Row {} ('{}') rejected: {}", row_index, row.label, e),
            }
        }

        NormalizedStatement {
            period: table.period,
            filing_date: table.filing_date,
            facts,
            unmapped,
            warnings,
        }
    }
}

/// Normalizes a table against the process-wide alias table.
pub fn normalize(table: &RawTable) -> NormalizedStatement {
    StatementNormalizer::new(alias_table::global()).normalize(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::RawRow;
    use crate::schema::{Confidence, FiscalPeriod, SourceKind, UnitScale};
    use rust_decimal_macros::dec;

    fn fy2023() -> PeriodIdentifier {
        PeriodIdentifier::new(
            2023,
            FiscalPeriod::Annual,
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
        )
    }

    fn sample_table() -> RawTable {
        RawTable::new(
            fy2023(),
            UnitScale::Thousands,
            vec![
                RawRow::new("Net sales", ["450", "500"]),
                RawRow::new("Cost of sales", ["(300)"]),
                RawRow::new("Cost of services", ["20"]),
                RawRow::new("Total revenues", ["999"]),
                RawRow::new("Inventories", ["-"]),
                RawRow::new("Cash and cash equivalents", ["$1,250", ""]),
            ],
        )
    }

    #[test]
    fn test_normalize_maps_and_scales() {
        let aliases = AliasTable::with_defaults();
        let statement = StatementNormalizer::new(&aliases).normalize(&sample_table());

        assert_eq!(statement.period, fy2023());
        assert_eq!(statement.facts.value(FactKey::Revenue), Some(dec!(500000)));
        assert_eq!(
            statement.facts.value(FactKey::CostOfGoods),
            Some(dec!(-300000))
        );
        assert_eq!(statement.facts.value(FactKey::Cash), Some(dec!(1250000)));
        assert_eq!(statement.facts.len(), 3);

        let revenue = statement.facts.get(FactKey::Revenue).unwrap();
        assert_eq!(revenue.unit_scale(), UnitScale::Thousands);
        assert_eq!(revenue.confidence(), Confidence::High);
        assert_eq!(revenue.period(), fy2023());
    }

    #[test]
    fn test_normalize_reports_unmapped_and_failed_rows() {
        let aliases = AliasTable::with_defaults();
        let statement = StatementNormalizer::new(&aliases).normalize(&sample_table());

        assert_eq!(statement.unmapped.len(), 2);
        assert_eq!(statement.unmapped[0].label, "Cost of services");
        assert_eq!(
            statement.unmapped[0].reason,
            UnmappedReason::NotRecognized {
                normalized_label: "cost of services".to_string()
            }
        );

        assert_eq!(statement.unmapped[1].label, "Inventories");
        assert!(matches!(
            statement.unmapped[1].reason,
            UnmappedReason::ParseFailure {
                key: FactKey::Inventory,
                ..
            }
        ));
        assert!(!statement.facts.contains(FactKey::Inventory));
    }

    #[test]
    fn test_duplicate_key_keeps_first() {
        let aliases = AliasTable::with_defaults();
        let statement = StatementNormalizer::new(&aliases).normalize(&sample_table());

        assert_eq!(
            statement.warnings,
            vec![NormalizationWarning::DuplicateKey {
                key: FactKey::Revenue,
                kept_row: 0,
                kept_label: "Net sales".to_string(),
                dropped_row: 3,
                dropped_label: "Total revenues".to_string(),
            }]
        );
        assert_eq!(statement.facts.value(FactKey::Revenue), Some(dec!(500000)));
    }

    #[test]
    fn test_failed_row_does_not_block_later_duplicate() {
        let aliases = AliasTable::with_defaults();
        let table = RawTable::new(
            fy2023(),
            UnitScale::Ones,
            vec![
                RawRow::new("Revenue", ["N/A"]),
                RawRow::new("Net sales", ["700"]),
            ],
        );

        let statement = StatementNormalizer::new(&aliases).normalize(&table);
        assert_eq!(statement.facts.value(FactKey::Revenue), Some(dec!(700)));
        assert!(statement.warnings.is_empty());
        assert_eq!(statement.unmapped.len(), 1);
    }

    #[test]
    fn test_row_scale_overrides_table_scale() {
        let aliases = AliasTable::with_defaults();
        let table = RawTable::new(
            fy2023(),
            UnitScale::Ones,
            vec![
                RawRow::new("Revenue", ["500"]).with_unit_scale(UnitScale::Millions),
                RawRow::new("Net income", ["100"]).with_unit_scale(UnitScale::Millions),
                RawRow::new("Cash", ["1,000"]).with_unit_scale(UnitScale::Thousands),
                RawRow::new("Inventory", ["7"]),
            ],
        );

        let statement = StatementNormalizer::new(&aliases).normalize(&table);
        assert_eq!(statement.facts.value(FactKey::Revenue), Some(dec!(500000000)));
        assert_eq!(statement.facts.value(FactKey::NetIncome), Some(dec!(100000000)));
        assert_eq!(statement.facts.value(FactKey::Cash), Some(dec!(1000000)));
        assert_eq!(statement.facts.value(FactKey::Inventory), Some(dec!(7)));
        assert_eq!(
            statement.facts.get(FactKey::Cash).unwrap().unit_scale(),
            UnitScale::Thousands
        );
    }

    #[test]
    fn test_pdf_source_lowers_fact_confidence() {
        let aliases = AliasTable::with_defaults();
        let table = RawTable::new(
            fy2023(),
            UnitScale::Ones,
            vec![RawRow::new("Total assets", ["1,000"])],
        )
        .with_source(SourceKind::Pdf);

        let statement = StatementNormalizer::new(&aliases).normalize(&table);
        let fact = statement.facts.get(FactKey::TotalAssets).unwrap();
        assert_eq!(fact.confidence(), Confidence::Medium);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let aliases = AliasTable::with_defaults();
        let normalizer = StatementNormalizer::new(&aliases);
        let table = sample_table();

        let first = normalizer.normalize(&table);
        let second = normalizer.normalize(&table);

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_row_without_columns_is_a_parse_failure() {
        let table = RawTable::new(
            fy2023(),
            UnitScale::Ones,
            vec![RawRow::new("Total assets", ["", "  "])],
        );

        let statement = normalize(&table);
        assert!(statement.facts.is_empty());
        assert_eq!(
            statement.unmapped[0].reason,
            UnmappedReason::ParseFailure {
                key: FactKey::TotalAssets,
                failure: ParseFailure::Empty,
            }
        );
    }
}
