//! End-to-end tests over generated PDFs.

mod common;

use std::collections::HashSet;
use std::str::FromStr;

use basket_core::models::config::NormalizeConfig;
use basket_core::{
    BasketConfig, BasketError, BasketExtractor, BasketRecord, ColumnLookup, FailureKind,
    PdfTableScanner, Period, Provenance, RawTable, TableClassifier, TableNormalizer, TableScanner,
    TableSignature,
};
use basket_core::error::PdfError;
use common::*;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;

fn may_2025() -> Period {
    Period::new(2025, 5).unwrap()
}

fn price(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

#[test]
fn test_scanner_finds_one_table_per_page() {
    let pdf = monthly_report("Area");
    let scanner = PdfTableScanner::default();

    let tables: Vec<RawTable> = scanner
        .scan(&pdf)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(tables.len(), 3);
    let pages: Vec<u32> = tables.iter().map(|t| t.provenance.page).collect();
    assert_eq!(pages, vec![1, 2, 3]);
    let ordinals: Vec<usize> = tables.iter().map(|t| t.provenance.ordinal).collect();
    assert_eq!(ordinals, vec![0, 1, 2]);
    assert!(tables.iter().all(|t| t.provenance.page_count == 3));

    let target = &tables[1];
    assert_eq!(target.num_rows(), 6);
    assert_eq!(target.num_cols(), 3);
    assert_eq!(target.row(0).unwrap(), &["Area", "Maize meal (kg)", "Rice (kg)"]);
    assert_eq!(target.row(2).unwrap(), &["Durban", "-", "R 31,49"]);
    assert!(target.context.contains("Per area, compared"));
    assert!(target.context.contains("May 2025"));
}

#[test]
fn test_end_to_end_selects_basket_table() {
    let pdf = monthly_report("Area");
    let extractor = BasketExtractor::new(BasketConfig::default()).unwrap();

    let extraction = extractor.extract(&pdf, Some(may_2025())).unwrap();

    assert_eq!(extraction.page, 2);
    assert_eq!(extraction.records.len(), 5);
    assert_eq!(extraction.skipped.missing_prices, 5);
    assert_eq!(extraction.warning_count(), 0);

    let items: HashSet<&str> = extraction.records.iter().map(|r| r.item()).collect();
    let expected: HashSet<&str> = ["Maize meal (kg)", "Rice (kg)"].into_iter().collect();
    assert!(items.is_subset(&expected));

    let durban = extraction
        .records
        .iter()
        .find(|r| r.region() == "Durban")
        .unwrap();
    assert_eq!(durban.item(), "Rice (kg)");
    assert_eq!(durban.price(), price("31.49"));
    assert_eq!(durban.unit(), Some("kg"));
    assert_eq!(durban.period(), may_2025());

    // The trailing source line is not a region
    assert!(extraction.records.iter().all(|r| !r.region().starts_with("Source")));
}

#[test]
fn test_period_read_from_page_text() {
    let pdf = monthly_report("Area");
    let extractor = BasketExtractor::new(BasketConfig::default()).unwrap();

    let extraction = extractor.extract(&pdf, None).unwrap();
    assert_eq!(extraction.period, may_2025());
    assert!(extraction.records.iter().all(|r| r.period() == may_2025()));
}

#[test]
fn test_header_drift_between_months() {
    let extractor = BasketExtractor::new(BasketConfig::default()).unwrap();

    let april = extractor
        .extract(&monthly_report("Area"), Period::new(2025, 4))
        .unwrap();
    let may = extractor
        .extract(&monthly_report("Region/Area"), Period::new(2025, 5))
        .unwrap();

    assert_eq!(april.records.len(), may.records.len());
    for (a, m) in april.records.iter().zip(&may.records) {
        assert_eq!((a.region(), a.item(), a.price()), (m.region(), m.item(), m.price()));
    }
}

#[test]
fn test_inspect_scores_every_candidate() {
    let pdf = monthly_report("Area");
    let extractor = BasketExtractor::new(BasketConfig::default()).unwrap();

    let candidates = extractor.inspect(&pdf).unwrap();
    let eligible: Vec<u32> = candidates
        .iter()
        .filter(|(_, s)| s.eligible)
        .map(|(t, _)| t.provenance.page)
        .collect();

    assert_eq!(eligible, vec![2]);
    assert!(candidates[1].1.title_matched);
}

#[test]
fn test_corrupt_bytes_are_unreadable() {
    let extractor = BasketExtractor::new(BasketConfig::default()).unwrap();
    let err = extractor
        .extract(b"%PDF-1.5 definitely not a document", Some(may_2025()))
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::DocumentUnreadable);
}

#[test]
fn test_document_without_text_is_unreadable() {
    let pdf = build_pdf(vec![drawing_operations(), drawing_operations()]);

    let scan: Vec<_> = PdfTableScanner::default().scan(&pdf).unwrap().collect();
    assert!(matches!(scan.as_slice(), [Err(PdfError::NoText)]));

    let extractor = BasketExtractor::new(BasketConfig::default()).unwrap();
    let err = extractor.extract(&pdf, Some(may_2025())).unwrap_err();
    assert!(matches!(err, BasketError::DocumentUnreadable(PdfError::NoText)));
}

#[test]
fn test_text_without_tables_is_no_match() {
    let pdf = build_pdf(vec![text_operations(&[
        text(72, 780, "Household Food Basket"),
        text(72, 766, "No data this month."),
    ])]);

    let extractor = BasketExtractor::new(BasketConfig::default()).unwrap();
    let err = extractor.extract(&pdf, Some(may_2025())).unwrap_err();
    assert_eq!(err.kind(), FailureKind::NoMatchingTable);
}

#[test]
fn test_records_survive_table_round_trip() {
    let period = may_2025();
    let records = vec![
        BasketRecord::new("Joburg", "Maize meal (kg)", price("54.99"), Some("kg".into()), period).unwrap(),
        BasketRecord::new("Joburg", "Rice (kg)", price("31.99"), Some("kg".into()), period).unwrap(),
        BasketRecord::new("Durban", "Maize meal (kg)", price("49.50"), Some("kg".into()), period).unwrap(),
        BasketRecord::new("Durban", "Rice (kg)", price("30.00"), Some("kg".into()), period).unwrap(),
    ];

    let header = vec!["Area".to_string(), "Maize meal (kg)".to_string(), "Rice (kg)".to_string()];
    let mut rows = vec![header];
    for region in ["Joburg", "Durban"] {
        let mut row = vec![region.to_string()];
        for item in ["Maize meal (kg)", "Rice (kg)"] {
            let record = records
                .iter()
                .find(|r| r.region() == region && r.item() == item)
                .unwrap();
            row.push(format!("R {}", record.price()));
        }
        rows.push(row);
    }
    let table = RawTable::new(rows, Provenance::default());

    let classifier = TableClassifier::new(TableSignature::default()).unwrap();
    let classified = classifier.classify(vec![table]).unwrap();
    let normalizer = TableNormalizer::new(ColumnLookup::default(), NormalizeConfig::default());

    let first = normalizer.normalize(&classified, period).unwrap();
    let second = normalizer.normalize(&classified, period).unwrap();

    assert_eq!(first.records, records);
    assert_eq!(first, second);
}

#[test]
fn test_wrapped_header_is_folded_into_one_row() {
    let tables: Vec<RawTable> = PdfTableScanner::default()
        .scan(&publisher_report())
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    let per_area = tables.iter().find(|t| t.provenance.page == 2).unwrap();
    assert_eq!(per_area.num_rows(), 1 + PER_AREA_ROWS.len());
    assert_eq!(
        per_area.row(0).unwrap(),
        &[
            "Foods\ntracked",
            "Quantity\ntracked",
            "Joburg",
            "Durban",
            "Cape Town",
            "Springbok",
            "Averag\ne",
        ]
    );
    assert_eq!(per_area.row(1).unwrap(), PER_AREA_ROWS[0]);
}

#[test]
fn test_publisher_preset_extracts_per_area_table() {
    let extractor = BasketExtractor::new(BasketConfig::pmbejd()).unwrap();

    let extraction = extractor.extract(&publisher_report(), None).unwrap();

    assert_eq!(extraction.page, 2);
    assert_eq!(extraction.period, may_2025());
    // Four cities per food; the average column is not a region
    assert_eq!(extraction.records.len(), 4 * PER_AREA_ROWS.len());
    assert_eq!(extraction.warning_count(), 0);

    let regions: HashSet<&str> = extraction.records.iter().map(|r| r.region()).collect();
    let expected: HashSet<&str> = ["Joburg", "Durban", "Cape Town", "Springbok"].into_iter().collect();
    assert_eq!(regions, expected);

    let maize = extraction
        .records
        .iter()
        .find(|r| r.region() == "Joburg" && r.item() == "Maize meal")
        .unwrap();
    assert_eq!(maize.price(), price("82.99"));
    assert_eq!(maize.unit(), Some("10kg"));

    let oil = extraction
        .records
        .iter()
        .find(|r| r.region() == "Cape Town" && r.item() == "Cooking oil")
        .unwrap();
    assert_eq!(oil.price(), price("144.99"));
    assert_eq!(oil.unit(), Some("5L"));
}

#[test]
fn test_publisher_preset_ranks_national_summary_below() {
    let extractor = BasketExtractor::new(BasketConfig::pmbejd()).unwrap();

    let candidates = extractor.inspect(&publisher_report()).unwrap();
    let eligible: Vec<u32> = candidates
        .iter()
        .filter(|(_, s)| s.eligible)
        .map(|(t, _)| t.provenance.page)
        .collect();

    assert_eq!(eligible, vec![2]);
    let national = candidates.iter().find(|(t, _)| t.provenance.page == 1).unwrap();
    assert_eq!(national.1.keywords_matched, 1);
}
