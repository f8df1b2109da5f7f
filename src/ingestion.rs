use crate::schema::{PeriodIdentifier, SourceKind, UnitScale};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One line item as handed over by the extraction collaborator, already aligned
/// to its reporting period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRow {
    pub raw_label: String,
    pub raw_values: Vec<String>,
    pub period: PeriodIdentifier,
    #[serde(default)]
    pub unit_scale_hint: UnitScale,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    pub label: String,
    pub values: Vec<String>,
    /// Scale declared for this row alone; the table's scale applies when absent.
    #[serde(default)]
    pub unit_scale: Option<UnitScale>,
}

impl RawRow {
    pub fn new<L, I, V>(label: L, values: I) -> Self
    where
        L: Into<String>,
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self {
            label: label.into(),
            values: values.into_iter().map(Into::into).collect(),
            unit_scale: None,
        }
    }

    pub fn with_unit_scale(mut self, unit_scale: UnitScale) -> Self {
        self.unit_scale = Some(unit_scale);
        self
    }

    /// The scale that applies to this row within `table_scale`'s table.
    pub fn effective_unit_scale(&self, table_scale: UnitScale) -> UnitScale {
        self.unit_scale.unwrap_or(table_scale)
    }

    /// The last column holding anything other than whitespace.
    pub fn last_non_empty_value(&self) -> Option<&str> {
        self.values
            .iter()
            .rev()
            .map(|v| v.as_str())
            .find(|v| !v.trim().is_empty())
    }
}

/// One extracted statement table for a single reporting period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTable {
    pub period: PeriodIdentifier,
    #[serde(default)]
    pub unit_scale: UnitScale,
    #[serde(default)]
    pub source: SourceKind,
    /// Date the filing containing this table was published, used to pick
    /// restatements.
    #[serde(default)]
    pub filing_date: Option<NaiveDate>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn new(period: PeriodIdentifier, unit_scale: UnitScale, rows: Vec<RawRow>) -> Self {
        Self {
            period,
            unit_scale,
            source: SourceKind::default(),
            filing_date: None,
            rows,
        }
    }

    pub fn with_source(mut self, source: SourceKind) -> Self {
        self.source = source;
        self
    }

    pub fn with_filing_date(mut self, filing_date: NaiveDate) -> Self {
        self.filing_date = Some(filing_date);
        self
    }
}

/// Groups one filing's extracted rows into one table per period, keeping tables
/// in the order their first row appeared and rows in input order.
///
/// Each row keeps its own unit scale, so a period mixing millions and thousands
/// still forms a single table.
pub fn group_rows_into_tables(
    rows: &[ExtractedRow],
    source: SourceKind,
    filing_date: Option<NaiveDate>,
) -> Vec<RawTable> {
    let mut tables: Vec<RawTable> = Vec::new();

    for row in rows {
        let raw_row = RawRow {
            label: row.raw_label.clone(),
            values: row.raw_values.clone(),
            unit_scale: Some(row.unit_scale_hint),
        };

        match tables.iter_mut().find(|t| t.period == row.period) {
            Some(table) => table.rows.push(raw_row),
            None => tables.push(RawTable {
                period: row.period,
                unit_scale: row.unit_scale_hint,
                source,
                filing_date,
                rows: vec![raw_row],
            }),
        }
    }

    tables
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FiscalPeriod;

    fn period(year: i32) -> PeriodIdentifier {
        PeriodIdentifier::new(
            year,
            FiscalPeriod::Annual,
            NaiveDate::from_ymd_opt(year, 12, 31).unwrap(),
        )
    }

    fn row(label: &str, value: &str, period: PeriodIdentifier, scale: UnitScale) -> ExtractedRow {
        ExtractedRow {
            raw_label: label.to_string(),
            raw_values: vec![value.to_string()],
            period,
            unit_scale_hint: scale,
        }
    }

    #[test]
    fn test_last_non_empty_value() {
        let row = RawRow::new("Revenue", ["1,000", "1,200", "  ", ""]);
        assert_eq!(row.last_non_empty_value(), Some("1,200"));

        let blank = RawRow::new("Revenue", ["", " "]);
        assert_eq!(blank.last_non_empty_value(), None);

        let no_columns = RawRow::new("Revenue", Vec::<String>::new());
        assert_eq!(no_columns.last_non_empty_value(), None);
    }

    #[test]
    fn test_group_rows_into_tables() {
        let rows = vec![
            row("Revenue", "500", period(2023), UnitScale::Ones),
            row("Revenue", "400", period(2022), UnitScale::Ones),
            row("Net income", "100", period(2023), UnitScale::Ones),
            row("Total assets", "9", period(2023), UnitScale::Millions),
        ];

        let filed = NaiveDate::from_ymd_opt(2024, 2, 15).unwrap();
        let tables = group_rows_into_tables(&rows, SourceKind::Html, Some(filed));

        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].period, period(2023));
        assert_eq!(tables[0].rows.len(), 3);
        assert_eq!(tables[0].rows[1].label, "Net income");
        assert_eq!(tables[0].unit_scale, UnitScale::Ones);
        assert_eq!(tables[0].rows[2].unit_scale, Some(UnitScale::Millions));
        assert_eq!(
            tables[0].rows[2].effective_unit_scale(tables[0].unit_scale),
            UnitScale::Millions
        );
        assert_eq!(tables[1].period, period(2022));
        assert!(tables
            .iter()
            .all(|t| t.source == SourceKind::Html && t.filing_date == Some(filed)));
    }

    #[test]
    fn test_row_scale_defaults_to_table_scale() {
        let row = RawRow::new("Revenue", ["5"]);
        assert_eq!(row.unit_scale, None);
        assert_eq!(row.effective_unit_scale(UnitScale::Thousands), UnitScale::Thousands);

        let row = row.with_unit_scale(UnitScale::Millions);
        assert_eq!(row.effective_unit_scale(UnitScale::Thousands), UnitScale::Millions);
    }

    #[test]
    fn test_table_deserializes_with_defaults() {
        let json = r#"{
            "period": {"fiscal_year": 2023, "fiscal_period": "annual", "period_end_date": "2023-12-31"},
            "rows": [{"label": "Revenue", "values": ["500"]}]
        }"#;

        let table: RawTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.unit_scale, UnitScale::Ones);
        assert_eq!(table.source, SourceKind::Xbrl);
        assert_eq!(table.filing_date, None);
        assert_eq!(table.period, period(2023));
        assert_eq!(table.rows[0].unit_scale, None);
    }
}
