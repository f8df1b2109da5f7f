use chrono::NaiveDate;
use financial_statement_analyzer::{
    analyze_company, group_rows_into_tables, ExtractedRow, SourceKind, Validity,
};

const EXTRACTED_ROWS: &str = r#"[
    {"raw_label": "Net sales", "raw_values": ["1,820", "2,140"], "unit_scale_hint": "thousands",
     "period": {"fiscal_year": 2023, "fiscal_period": "annual", "period_end_date": "2023-06-30"}},
    {"raw_label": "Cost of sales", "raw_values": ["(1,301)"], "unit_scale_hint": "thousands",
     "period": {"fiscal_year": 2023, "fiscal_period": "annual", "period_end_date": "2023-06-30"}},
    {"raw_label": "Net income (loss)", "raw_values": ["96"], "unit_scale_hint": "thousands",
     "period": {"fiscal_year": 2023, "fiscal_period": "annual", "period_end_date": "2023-06-30"}},
    {"raw_label": "Total current assets", "raw_values": ["640"], "unit_scale_hint": "thousands",
     "period": {"fiscal_year": 2023, "fiscal_period": "annual", "period_end_date": "2023-06-30"}},
    {"raw_label": "Total current liabilities", "raw_values": ["410"], "unit_scale_hint": "thousands",
     "period": {"fiscal_year": 2023, "fiscal_period": "annual", "period_end_date": "2023-06-30"}},
    {"raw_label": "Total assets", "raw_values": ["1,950"], "unit_scale_hint": "thousands",
     "period": {"fiscal_year": 2023, "fiscal_period": "annual", "period_end_date": "2023-06-30"}},
    {"raw_label": "Total liabilities", "raw_values": ["1,100"], "unit_scale_hint": "thousands",
     "period": {"fiscal_year": 2023, "fiscal_period": "annual", "period_end_date": "2023-06-30"}},
    {"raw_label": "Total shareholders' equity", "raw_values": ["850"], "unit_scale_hint": "thousands",
     "period": {"fiscal_year": 2023, "fiscal_period": "annual", "period_end_date": "2023-06-30"}},
    {"raw_label": "Net sales", "raw_values": ["2,480"], "unit_scale_hint": "thousands",
     "period": {"fiscal_year": 2024, "fiscal_period": "annual", "period_end_date": "2024-06-30"}},
    {"raw_label": "Cost of sales", "raw_values": ["1,612"], "unit_scale_hint": "thousands",
     "period": {"fiscal_year": 2024, "fiscal_period": "annual", "period_end_date": "2024-06-30"}},
    {"raw_label": "Net income (loss)", "raw_values": ["(35)"], "unit_scale_hint": "thousands",
     "period": {"fiscal_year": 2024, "fiscal_period": "annual", "period_end_date": "2024-06-30"}},
    {"raw_label": "Total current assets", "raw_values": ["590"], "unit_scale_hint": "thousands",
     "period": {"fiscal_year": 2024, "fiscal_period": "annual", "period_end_date": "2024-06-30"}},
    {"raw_label": "Total current liabilities", "raw_values": ["620"], "unit_scale_hint": "thousands",
     "period": {"fiscal_year": 2024, "fiscal_period": "annual", "period_end_date": "2024-06-30"}},
    {"raw_label": "Total assets", "raw_values": ["2,010"], "unit_scale_hint": "thousands",
     "period": {"fiscal_year": 2024, "fiscal_period": "annual", "period_end_date": "2024-06-30"}},
    {"raw_label": "Total liabilities", "raw_values": ["1,195"], "unit_scale_hint": "thousands",
     "period": {"fiscal_year": 2024, "fiscal_period": "annual", "period_end_date": "2024-06-30"}},
    {"raw_label": "Total shareholders' equity", "raw_values": ["815"], "unit_scale_hint": "thousands",
     "period": {"fiscal_year": 2024, "fiscal_period": "annual", "period_end_date": "2024-06-30"}},
    {"raw_label": "Segment EBITDA", "raw_values": ["210"], "unit_scale_hint": "thousands",
     "period": {"fiscal_year": 2024, "fiscal_period": "annual", "period_end_date": "2024-06-30"}}
]"#;

fn main() -> anyhow::Result<()> {
    let rows: Vec<ExtractedRow> = serde_json::from_str(EXTRACTED_ROWS)?;
    let filed = NaiveDate::from_ymd_opt(2024, 9, 12);
    let tables = group_rows_into_tables(&rows, SourceKind::Html, filed);

    let record = analyze_company("Harbour Outfitters Ltd", &tables)?;

    println!("{} ({})", record.company, record.confidence_label());
    for period in &record.periods {
        for row in &period.unmapped {
            println!(" - {}: unmapped '{}'", period.period, row.label);
        }
        for violation in &period.validation.violations {
            println!(" - {}: {}", period.period, violation);
        }
        for flag in &period.benchmark_flags {
            println!(
                " - {}: {} = {} ({:?} {})",
                period.period, flag.ratio, flag.value, flag.breach, flag.threshold
            );
        }
    }

    let mut writer = csv::Writer::from_writer(std::io::stdout());
    writer.write_record(["period_end", "ratio", "category", "value", "validity"])?;
    for period in &record.periods {
        for ratio in &period.ratios {
            let value = match ratio.validity() {
                Validity::Computed => ratio.value().map(|v| v.to_string()).unwrap_or_default(),
                other => format!("{:?}", other),
            };
            writer.write_record([
                period.period.period_end_date.to_string(),
                ratio.name().to_string(),
                format!("{:?}", ratio.name().category()),
                value,
                format!("{:?}", ratio.validity()),
            ])?;
        }
    }
    writer.flush()?;

    println!("Trends:");
    let annual = record.trends.iter().map(|t| ("annual", t));
    let quarterly = record.quarterly_trends.iter().map(|t| ("quarterly", t));
    for (series, trend) in annual.chain(quarterly).filter(|(_, t)| t.direction.is_some()) {
        println!(
            " - {} {}: {:?} ({}%)",
            series,
            trend.ratio,
            trend.direction,
            trend
                .pct_change
                .map(|p| p.to_string())
                .unwrap_or_else(|| "n/a".to_string())
        );
    }

    Ok(())
}
