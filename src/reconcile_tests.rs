//! Tests for feed/catalog reconciliation

use std::collections::BTreeSet;

use chrono::{TimeZone, Utc};

use crate::error::SyncError;
use crate::models::{CatalogSnapshot, RawFeedRecord};
use crate::reconcile::{reconcile, ReconcileParams};

fn params() -> ReconcileParams {
    ReconcileParams {
        warehouse_id: Some("wh-1".to_string()),
        currency: "RUB".to_string(),
        updated_at: Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap(),
    }
}

fn catalog(ids: &[&str]) -> CatalogSnapshot {
    ids.iter().copied().collect()
}

fn quantity_of(stocks: &[crate::models::StockRecord], id: &str) -> u64 {
    stocks
        .iter()
        .find(|s| s.offer_id == id)
        .map(|s| s.quantity)
        .unwrap_or_else(|| panic!("no stock record for {id}"))
}

#[test]
fn end_to_end_scenario() {
    let feed = vec![
        RawFeedRecord::new("A", ">10", "100.00 р"),
        RawFeedRecord::new("B", "1", "50.00 р"),
    ];

    let result = reconcile(&feed, &catalog(&["A", "B", "C"]), &params()).unwrap();

    assert_eq!(result.stocks.len(), 3);
    assert_eq!(quantity_of(&result.stocks, "A"), 100);
    assert_eq!(quantity_of(&result.stocks, "B"), 0);
    assert_eq!(quantity_of(&result.stocks, "C"), 0);

    let prices: Vec<(&str, u64)> = result
        .prices
        .iter()
        .map(|p| (p.offer_id.as_str(), p.price))
        .collect();
    assert_eq!(prices, vec![("A", 100), ("B", 50)]);
}

#[test]
fn every_listed_offer_gets_exactly_one_stock_record() {
    let feed = vec![
        RawFeedRecord::new("2", "5", "10"),
        RawFeedRecord::new("9", "5", "10"),
        RawFeedRecord::new("4", "0", "10"),
    ];
    let listed = catalog(&["1", "2", "3", "4"]);

    let result = reconcile(&feed, &listed, &params()).unwrap();

    let ids: Vec<&str> = result.stocks.iter().map(|s| s.offer_id.as_str()).collect();
    let unique: BTreeSet<&str> = ids.iter().copied().collect();
    assert_eq!(ids.len(), unique.len());
    let expected: BTreeSet<&str> = listed.iter().map(String::as_str).collect();
    assert_eq!(unique, expected);
}

#[test]
fn feed_rows_not_listed_contribute_nothing() {
    let feed = vec![RawFeedRecord::new("ZZZ", "7", "999")];

    let result = reconcile(&feed, &catalog(&["A"]), &params()).unwrap();

    assert_eq!(result.stocks.len(), 1);
    assert_eq!(result.stocks[0].offer_id, "A");
    assert_eq!(result.stocks[0].quantity, 0);
    assert!(result.prices.is_empty());
}

#[test]
fn unmatched_offers_get_no_price_record() {
    let feed = vec![RawFeedRecord::new("A", "3", "10")];

    let result = reconcile(&feed, &catalog(&["A", "B"]), &params()).unwrap();

    assert_eq!(result.prices.len(), 1);
    assert!(result.prices.iter().all(|p| p.offer_id != "B"));
}

#[test]
fn duplicate_feed_codes_only_count_once() {
    let feed = vec![
        RawFeedRecord::new("A", "4", "10"),
        RawFeedRecord::new("A", "8", "20"),
    ];

    let result = reconcile(&feed, &catalog(&["A"]), &params()).unwrap();

    assert_eq!(result.stocks.len(), 1);
    assert_eq!(result.stocks[0].quantity, 4);
    assert_eq!(result.prices.len(), 1);
    assert_eq!(result.prices[0].price, 10);
}

#[test]
fn numeric_codes_match_after_coercion() {
    let feed = vec![RawFeedRecord::new("10234.0", "2", "1'500.00 руб")];

    let result = reconcile(&feed, &catalog(&["10234"]), &params()).unwrap();

    assert_eq!(result.stocks[0].quantity, 2);
    assert_eq!(result.prices[0].price, 1500);
}

#[test]
fn matched_rows_precede_zeroed_offers() {
    let feed = vec![RawFeedRecord::new("C", "2", "10")];

    let result = reconcile(&feed, &catalog(&["A", "B", "C"]), &params()).unwrap();

    let ids: Vec<&str> = result.stocks.iter().map(|s| s.offer_id.as_str()).collect();
    assert_eq!(ids, vec!["C", "A", "B"]);
}

#[test]
fn all_records_share_batch_timestamp_and_target_fields() {
    let feed = vec![RawFeedRecord::new("A", "3", "10")];
    let p = params();

    let result = reconcile(&feed, &catalog(&["A", "B"]), &p).unwrap();

    assert!(result.stocks.iter().all(|s| s.updated_at == p.updated_at));
    assert!(result
        .stocks
        .iter()
        .all(|s| s.warehouse_id.as_deref() == Some("wh-1")));
    assert!(result.prices.iter().all(|p| p.currency == "RUB"));
}

#[test]
fn malformed_quantity_on_matched_row_fails_whole_call() {
    let feed = vec![
        RawFeedRecord::new("A", "3", "10"),
        RawFeedRecord::new("B", "lots", "10"),
    ];

    match reconcile(&feed, &catalog(&["A", "B"]), &params()) {
        Err(SyncError::InvalidQuantity { code, token }) => {
            assert_eq!(code, "B");
            assert_eq!(token, "lots");
        }
        other => panic!("Expected InvalidQuantity, got: {other:?}"),
    }
}

#[test]
fn malformed_price_on_matched_row_fails_whole_call() {
    let feed = vec![RawFeedRecord::new("A", "3", "по запросу")];

    match reconcile(&feed, &catalog(&["A"]), &params()) {
        Err(SyncError::InvalidPrice { code, .. }) => assert_eq!(code, "A"),
        other => panic!("Expected InvalidPrice, got: {other:?}"),
    }
}

#[test]
fn malformed_tokens_on_unlisted_rows_are_ignored() {
    let feed = vec![RawFeedRecord::new("X", "???", "???")];

    let result = reconcile(&feed, &catalog(&["A"]), &params()).unwrap();
    assert_eq!(result.stocks.len(), 1);
}

#[test]
fn reconciliation_is_deterministic() {
    let feed = vec![
        RawFeedRecord::new("B", "2", "10"),
        RawFeedRecord::new("A", ">10", "20"),
    ];
    let listed = catalog(&["A", "B", "C", "D"]);

    let first = reconcile(&feed, &listed, &params()).unwrap();
    let second = reconcile(&feed, &listed, &params()).unwrap();

    assert_eq!(first, second);
}

#[test]
fn in_stock_filters_zero_quantities() {
    let feed = vec![
        RawFeedRecord::new("A", ">10", "10"),
        RawFeedRecord::new("B", "1", "10"),
        RawFeedRecord::new("C", "4", "10"),
    ];

    let result = reconcile(&feed, &catalog(&["A", "B", "C", "D"]), &params()).unwrap();

    let in_stock = result.in_stock();
    let ids: Vec<&str> = in_stock.iter().map(|s| s.offer_id.as_str()).collect();
    assert_eq!(ids, vec!["A", "C"]);
}

#[test]
fn empty_catalog_yields_nothing() {
    let feed = vec![RawFeedRecord::new("A", "3", "10")];

    let result = reconcile(&feed, &CatalogSnapshot::new(), &params()).unwrap();
    assert!(result.stocks.is_empty());
    assert!(result.prices.is_empty());
}
