//! Reconciliation of the remnants feed against a marketplace catalog snapshot
//!
//! Every listed offer ends up with exactly one stock record. Offers missing from the
//! feed are zeroed so stale listings cannot be oversold; their prices are left alone.

use crate::error::{Result, SyncError};
use crate::models::{CatalogSnapshot, PriceRecord, RawFeedRecord, StockRecord};
use crate::normalize::{normalize_price, normalize_quantity};
use chrono::{DateTime, Utc};

/// Target-specific inputs of one reconciliation run
#[derive(Debug, Clone)]
pub struct ReconcileParams {
    /// Warehouse the stock belongs to, if the marketplace wants one
    pub warehouse_id: Option<String>,
    /// Currency code stamped on every price record
    pub currency: String,
    /// Batch timestamp shared by every stock record of the run
    pub updated_at: DateTime<Utc>,
}

/// Records derived by one reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub stocks: Vec<StockRecord>,
    pub prices: Vec<PriceRecord>,
}

impl Reconciliation {
    /// Stock records with a non-zero quantity
    pub fn in_stock(&self) -> Vec<StockRecord> {
        self.stocks
            .iter()
            .filter(|s| s.quantity != 0)
            .cloned()
            .collect()
    }
}

/// Match `feed` rows against `catalog` and derive stock and price records.
///
/// Matched rows come first, in feed order; unmatched offers follow in ascending id
/// order with quantity 0. A duplicate feed code only counts once. A malformed token on
/// a matched row fails the whole call.
pub fn reconcile(
    feed: &[RawFeedRecord],
    catalog: &CatalogSnapshot,
    params: &ReconcileParams,
) -> Result<Reconciliation> {
    let mut unmatched = catalog.clone().into_set();
    let mut stocks = Vec::with_capacity(unmatched.len());
    let mut prices = Vec::new();

    for row in feed {
        let offer_id = row.offer_id();
        if !unmatched.remove(&offer_id) {
            continue;
        }

        let quantity = normalize_quantity(&row.quantity).map_err(|e| with_code(e, &offer_id))?;
        let price = normalize_price(&row.price).map_err(|e| with_code(e, &offer_id))?;

        stocks.push(stock_record(offer_id.clone(), quantity, params));
        prices.push(PriceRecord {
            offer_id,
            price,
            currency: params.currency.clone(),
        });
    }

    let matched = prices.len();
    for offer_id in unmatched {
        stocks.push(stock_record(offer_id, 0, params));
    }

    log::debug!(
        "Reconciled {} listed offers: {} matched, {} zeroed",
        catalog.len(),
        matched,
        stocks.len() - matched
    );

    Ok(Reconciliation { stocks, prices })
}

fn stock_record(offer_id: String, quantity: u64, params: &ReconcileParams) -> StockRecord {
    StockRecord {
        offer_id,
        warehouse_id: params.warehouse_id.clone(),
        quantity,
        updated_at: params.updated_at,
    }
}

fn with_code(err: SyncError, offer_id: &str) -> SyncError {
    match err {
        SyncError::InvalidQuantity { token, .. } => SyncError::InvalidQuantity {
            code: offer_id.to_string(),
            token,
        },
        SyncError::InvalidPrice { token, .. } => SyncError::InvalidPrice {
            code: offer_id.to_string(),
            token,
        },
        other => other,
    }
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
