//! Canonical records shared by the reconciliation engine and the marketplace adapters

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Marketplace-side key of one listing (offer id / shop SKU)
pub type OfferId = String;

/// One row of the authoritative remnants feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFeedRecord {
    pub code: String,
    pub quantity: String,
    pub price: String,
}

impl RawFeedRecord {
    pub fn new(
        code: impl Into<String>,
        quantity: impl Into<String>,
        price: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            quantity: quantity.into(),
            price: price.into(),
        }
    }

    /// The feed code as an offer identifier.
    ///
    /// Spreadsheet exports sometimes render numeric codes as floats (`12345.0`);
    /// those are compared by their integer text.
    pub fn offer_id(&self) -> OfferId {
        let code = self.code.trim();
        match code.strip_suffix(".0") {
            Some(int) if !int.is_empty() && int.chars().all(|c| c.is_ascii_digit()) => {
                int.to_string()
            }
            _ => code.to_string(),
        }
    }
}

/// Stock to publish for one offer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockRecord {
    pub offer_id: OfferId,
    pub warehouse_id: Option<String>,
    pub quantity: u64,
    pub updated_at: DateTime<Utc>,
}

/// Price to publish for one offer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceRecord {
    pub offer_id: OfferId,
    pub price: u64,
    pub currency: String,
}

/// Every offer currently listed on one marketplace target
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogSnapshot {
    offer_ids: BTreeSet<OfferId>,
}

impl CatalogSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an offer id; `false` if it was already listed
    pub fn insert(&mut self, offer_id: OfferId) -> bool {
        self.offer_ids.insert(offer_id)
    }

    pub fn contains(&self, offer_id: &str) -> bool {
        self.offer_ids.contains(offer_id)
    }

    pub fn len(&self) -> usize {
        self.offer_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offer_ids.is_empty()
    }

    /// Iterate over offer ids in ascending order
    pub fn iter(&self) -> impl Iterator<Item = &OfferId> {
        self.offer_ids.iter()
    }

    pub(crate) fn into_set(self) -> BTreeSet<OfferId> {
        self.offer_ids
    }
}

impl<S: Into<OfferId>> FromIterator<S> for CatalogSnapshot {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        snapshot.extend(iter);
        snapshot
    }
}

impl<S: Into<OfferId>> Extend<S> for CatalogSnapshot {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for offer_id in iter {
            self.insert(offer_id.into());
        }
    }
}
