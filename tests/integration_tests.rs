use chrono::NaiveDate;
use financial_statement_analyzer::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::path::Path;

fn export_ratios_to_csv(record: &AnalysisRecord, path: &Path) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["period_end", "ratio", "validity", "value"])?;

    for period in &record.periods {
        for ratio in &period.ratios {
            writer.write_record([
                period.period.period_end_date.to_string(),
                ratio.name().to_string(),
                format!("{:?}", ratio.validity()),
                ratio.value().map(|v| v.to_string()).unwrap_or_default(),
            ])?;
        }
    }

    writer.flush()?;
    Ok(())
}

fn annual(year: i32) -> PeriodIdentifier {
    PeriodIdentifier::from_fiscal_calendar(year, FiscalPeriod::Annual, 12).unwrap()
}

fn ratio_value(period: &PeriodAnalysis, key: RatioKey) -> Option<Decimal> {
    period.ratio(key).and_then(RatioResult::value)
}

fn find_trend(trends: &[TrendResult], key: RatioKey) -> &TrendResult {
    trends.iter().find(|t| t.ratio == key).unwrap()
}

#[test]
fn test_concrete_scenario() {
    let table = RawTable::new(
        annual(2023),
        UnitScale::Ones,
        vec![
            RawRow::new("Revenue", ["500"]),
            RawRow::new("Cost of goods sold", ["300"]),
            RawRow::new("Net income", ["100"]),
            RawRow::new("Current assets", ["250"]),
            RawRow::new("Current liabilities", ["100"]),
            RawRow::new("Total assets", ["500"]),
            RawRow::new("Total liabilities", ["300"]),
            RawRow::new("Shareholders' equity", ["200"]),
        ],
    );

    let record = analyze_company("Scenario Co", &[table]).unwrap();
    let period = &record.periods[0];

    assert!(period.validation.ok);
    assert!(period.unmapped.is_empty());
    assert_eq!(ratio_value(period, RatioKey::GrossMargin), Some(dec!(0.4000)));
    assert_eq!(ratio_value(period, RatioKey::NetMargin), Some(dec!(0.2000)));
    assert_eq!(ratio_value(period, RatioKey::CurrentRatio), Some(dec!(2.5000)));
    assert_eq!(ratio_value(period, RatioKey::Roe), Some(dec!(0.5000)));
    assert_eq!(
        period.ratio(RatioKey::DebtToEquity).unwrap().validity(),
        Validity::MissingInput
    );
    assert_eq!(period.ratios.len(), RatioKey::ALL.len());
}

#[test]
fn test_multi_year_filing_with_restatement() {
    let filed = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();

    let fy2021 = RawTable::new(
        annual(2021),
        UnitScale::Millions,
        vec![
            RawRow::new("Net sales", ["2,000"]),
            RawRow::new("Cost of sales", ["1,200"]),
            RawRow::new("Operating income", ["300"]),
            RawRow::new("Net income", ["200"]),
            RawRow::new("Total current assets", ["800"]),
            RawRow::new("Total current liabilities", ["400"]),
            RawRow::new("Total assets", ["2,500"]),
            RawRow::new("Total liabilities", ["1,500"]),
            RawRow::new("Total stockholders' equity", ["1,000"]),
        ],
    )
    .with_filing_date(filed(2022, 2, 20));

    let fy2022_original = RawTable::new(
        annual(2022),
        UnitScale::Millions,
        vec![
            RawRow::new("Net sales", ["2,400"]),
            RawRow::new("Net income", ["(50)"]),
        ],
    )
    .with_filing_date(filed(2023, 2, 20));

    let fy2022_restated = RawTable::new(
        annual(2022),
        UnitScale::Millions,
        vec![
            RawRow::new("Net sales", ["2,300"]),
            RawRow::new("Cost of sales", ["1,500"]),
            RawRow::new("Operating income", ["230"]),
            RawRow::new("Net income", ["(46)"]),
            RawRow::new("Total current assets", ["700"]),
            RawRow::new("Total current liabilities", ["500"]),
            RawRow::new("Total assets", ["2,600"]),
            RawRow::new("Total liabilities", ["1,700"]),
            RawRow::new("Total stockholders' equity", ["900"]),
        ],
    )
    .with_filing_date(filed(2023, 9, 1));

    let tables = vec![fy2022_restated, fy2021, fy2022_original];
    let record = analyze_company("Restated Inc", &tables).unwrap();

    assert_eq!(record.periods.len(), 2);
    assert_eq!(record.periods[0].period, annual(2021));
    assert_eq!(record.superseded.len(), 1);
    assert_eq!(
        record.superseded[0].superseded_filing_date,
        Some(filed(2023, 2, 20))
    );

    let fy2022 = &record.periods[1];
    assert_eq!(fy2022.facts.value(FactKey::Revenue), Some(dec!(2300000000)));
    assert_eq!(fy2022.facts.value(FactKey::NetIncome), Some(dec!(-46000000)));
    assert_eq!(ratio_value(fy2022, RatioKey::NetMargin), Some(dec!(-0.0200)));
    assert!(fy2022
        .benchmark_flags
        .iter()
        .any(|f| f.ratio == RatioKey::NetMargin && f.breach == Breach::BelowMin));

    let net_margin = find_trend(&record.trends, RatioKey::NetMargin);
    assert_eq!(net_margin.direction, Some(TrendDirection::Declining));
    assert_eq!(net_margin.earliest, Some(dec!(0.1)));
    assert_eq!(net_margin.pct_change, Some(dec!(-120.00)));

    let current_ratio = find_trend(&record.trends, RatioKey::CurrentRatio);
    assert_eq!(current_ratio.direction, Some(TrendDirection::Declining));
    assert_eq!(current_ratio.pct_change, Some(dec!(-30.00)));

    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("ratios.csv");
    export_ratios_to_csv(&record, &csv_path).unwrap();

    let contents = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(contents.lines().count(), 1 + 2 * RatioKey::ALL.len());
    assert!(contents.contains("2022-12-31,net_margin,Computed,-0.0200"));
}

#[test]
fn test_extracted_rows_through_pipeline() {
    let q1 = PeriodIdentifier::from_fiscal_calendar(2024, FiscalPeriod::Q1, 6).unwrap();
    let q2 = PeriodIdentifier::from_fiscal_calendar(2024, FiscalPeriod::Q2, 6).unwrap();
    assert_eq!(q1.period_end_date, NaiveDate::from_ymd_opt(2023, 9, 30).unwrap());
    assert_eq!(q2.period_end_date, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());

    let row = |label: &str, value: &str, period| ExtractedRow {
        raw_label: label.to_string(),
        raw_values: vec![value.to_string()],
        period,
        unit_scale_hint: UnitScale::Thousands,
    };

    let rows = vec![
        row("Cash and cash equivalents", "$120", q2),
        row("Total current liabilities", "100", q2),
        row("Cash and cash equivalents", "$90", q1),
        row("Total current liabilities", "100", q1),
        row("Deferred revenue", "40", q1),
    ];

    let tables = group_rows_into_tables(&rows, SourceKind::Pdf, None);
    assert_eq!(tables.len(), 2);

    let record = analyze_company("Quarterly Ltd", &tables).unwrap();
    assert_eq!(record.periods[0].period, q1);
    assert_eq!(record.periods[0].unmapped.len(), 1);
    assert_eq!(
        record.periods[0].facts.get(FactKey::Cash).unwrap().confidence(),
        Confidence::Medium
    );

    let cash_ratio = find_trend(&record.quarterly_trends, RatioKey::CashRatio);
    assert_eq!(cash_ratio.pct_change, Some(dec!(33.33)));
    assert_eq!(cash_ratio.direction, Some(TrendDirection::Improving));
    assert!(record.trends.iter().all(|t| t.periods_compared == 0));

    assert_eq!(record.confidence, Confidence::Low);
    assert_eq!(record.confidence_label(), "LOW CONFIDENCE");
}

#[test]
fn test_unbalanced_sheet_is_reported_not_fatal() {
    let table = RawTable::new(
        annual(2023),
        UnitScale::Ones,
        vec![
            RawRow::new("Total assets", ["1,100"]),
            RawRow::new("Total liabilities", ["600"]),
            RawRow::new("Total equity", ["400"]),
            RawRow::new("Revenue", ["500"]),
        ],
    );

    let record = analyze_company("Unbalanced Co", &[table]).unwrap();
    let validation = &record.periods[0].validation;

    assert!(!validation.ok);
    assert!(validation.has_violation(ViolationKind::BalanceEquation));
    assert_eq!(
        ratio_value(&record.periods[0], RatioKey::AssetTurnover),
        Some(dec!(0.4545))
    );
}

#[test]
fn test_mixed_unit_scales_within_one_period() {
    let fy2023 = annual(2023);
    let row = |label: &str, value: &str, unit_scale_hint| ExtractedRow {
        raw_label: label.to_string(),
        raw_values: vec![value.to_string()],
        period: fy2023,
        unit_scale_hint,
    };

    let rows = vec![
        row("Revenue", "500", UnitScale::Millions),
        row("Net income", "100", UnitScale::Millions),
        row("Cash", "1,000", UnitScale::Thousands),
    ];
    let filed = NaiveDate::from_ymd_opt(2024, 2, 1);

    let tables = group_rows_into_tables(&rows, SourceKind::Html, filed);
    assert_eq!(tables.len(), 1);

    let record = analyze_company("Scaled Co", &tables).unwrap();
    assert!(record.superseded.is_empty());
    assert_eq!(record.periods.len(), 1);

    let period = &record.periods[0];
    assert_eq!(period.filing_date, filed);
    assert_eq!(period.facts.value(FactKey::Revenue), Some(dec!(500000000)));
    assert_eq!(period.facts.value(FactKey::NetIncome), Some(dec!(100000000)));
    assert_eq!(period.facts.value(FactKey::Cash), Some(dec!(1000000)));
    assert_eq!(ratio_value(period, RatioKey::NetMargin), Some(dec!(0.2000)));
}

#[test]
fn test_annual_and_fourth_quarter_sharing_end_date() {
    let q4 = PeriodIdentifier::from_fiscal_calendar(2023, FiscalPeriod::Q4, 12).unwrap();
    assert_eq!(q4.period_end_date, annual(2023).period_end_date);

    let table = |period, revenue: &str, net_income: &str| {
        RawTable::new(
            period,
            UnitScale::Ones,
            vec![
                RawRow::new("Revenue", [revenue]),
                RawRow::new("Net income", [net_income]),
            ],
        )
    };
    let tables = vec![
        table(annual(2022), "400", "40"),
        table(annual(2023), "500", "60"),
        table(q4, "130", "10"),
    ];

    let record = analyze_company("Mixed Co", &tables).unwrap();
    assert_eq!(record.periods.len(), 3);
    assert!(record.superseded.is_empty());
    assert!(record.period(&q4).is_some());

    let annual_margin = find_trend(&record.trends, RatioKey::NetMargin);
    assert_eq!(annual_margin.periods_compared, 2);
    assert_eq!(annual_margin.earliest, Some(dec!(0.1)));
    assert_eq!(annual_margin.latest, Some(dec!(0.12)));
    assert_eq!(annual_margin.direction, Some(TrendDirection::Improving));
    assert_eq!(annual_margin.pct_change, Some(dec!(20.00)));

    let quarterly_margin = find_trend(&record.quarterly_trends, RatioKey::NetMargin);
    assert_eq!(quarterly_margin.periods_compared, 1);
    assert_eq!(quarterly_margin.direction, None);
    assert_eq!(quarterly_margin.latest, Some(dec!(0.0769)));
}

#[test]
fn test_alias_determinism() {
    for label in ["Net sales", "NET SALES", "  net   sales. ", "Net-sales"] {
        let first = canonicalize(label);
        let second = canonicalize(label);
        assert_eq!(first, second);
    }
    assert_eq!(canonicalize("Net sales"), Ok(FactKey::Revenue));
    assert!(canonicalize("Net sales growth").is_err());
}

#[test]
fn test_parenthetical_negation() {
    assert_eq!(parse_value("(1,234)", UnitScale::Ones), Ok(dec!(-1234)));
    assert_eq!(parse_value("1,234", UnitScale::Ones), Ok(dec!(1234)));
    assert!(parse_value("-", UnitScale::Ones).is_err());
}

#[test]
fn test_schema_generation() {
    let schema = AnalysisRecord::generate_json_schema();
    let schema_json = serde_json::to_string_pretty(&schema).unwrap();

    assert!(schema_json.contains("periods"));
    assert!(schema_json.contains("trends"));
    assert!(schema_json.contains("quarterly_trends"));
    assert!(schema_json.contains("superseded"));
    assert!(schema_json.contains("missing_input"));
}

#[test]
fn test_record_json_is_stable() {
    let table = RawTable::new(
        annual(2023),
        UnitScale::Ones,
        vec![
            RawRow::new("Revenue", ["1,000"]),
            RawRow::new("Gross profit", ["400"]),
            RawRow::new("Mystery line", ["7"]),
        ],
    );

    let first = analyze_company("Stable Co", &[table.clone()]).unwrap();
    let second = analyze_company("Stable Co", &[table]).unwrap();
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());

    let json: serde_json::Value = serde_json::from_str(&first.to_json().unwrap()).unwrap();
    assert_eq!(
        json["periods"][0]["unmapped"][0]["reason"]["reason"],
        "not_recognized"
    );
}
