//! Marketplace API clients
//!
//! Each client knows how to page its offer listing and how to serialize canonical
//! stock and price records into its own update payloads.

mod ozon;
mod yandex;

pub use ozon::OzonClient;
pub use yandex::{Campaign, YandexMarketClient};

use std::num::NonZeroUsize;

use serde::de::DeserializeOwned;

use crate::error::{Result, SyncError};
use crate::models::{PriceRecord, StockRecord};
use crate::pager::CatalogSource;

/// Per-target request sizes fixed by the marketplace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    /// Offers requested per catalog page
    pub page_size: NonZeroUsize,
    /// Stock records per update call
    pub stock_batch: NonZeroUsize,
    /// Price records per update call
    pub price_batch: NonZeroUsize,
}

impl BatchLimits {
    /// Limits known at compile time; a zero size fails const evaluation
    pub const fn fixed(page_size: usize, stock_batch: usize, price_batch: usize) -> Self {
        Self {
            page_size: non_zero(page_size),
            stock_batch: non_zero(stock_batch),
            price_batch: non_zero(price_batch),
        }
    }

    /// Build limits from plain sizes; `None` if any of them is zero
    pub fn new(page_size: usize, stock_batch: usize, price_batch: usize) -> Option<Self> {
        Some(Self {
            page_size: NonZeroUsize::new(page_size)?,
            stock_batch: NonZeroUsize::new(stock_batch)?,
            price_batch: NonZeroUsize::new(price_batch)?,
        })
    }

    /// Shrink the update batch sizes. Sizes above the current ones are clamped, a zero
    /// size yields `None`.
    pub fn with_overrides(
        self,
        stock_batch: Option<usize>,
        price_batch: Option<usize>,
    ) -> Option<Self> {
        let clamp = |requested: Option<usize>, max: NonZeroUsize| {
            requested.map_or(max.get(), |n| n.min(max.get()))
        };
        Self::new(
            self.page_size.get(),
            clamp(stock_batch, self.stock_batch),
            clamp(price_batch, self.price_batch),
        )
    }
}

const fn non_zero(n: usize) -> NonZeroUsize {
    match NonZeroUsize::new(n) {
        Some(n) => n,
        None => panic!("batch size must be non-zero"),
    }
}

/// A marketplace target that stock and prices can be pushed to
#[allow(async_fn_in_trait)]
pub trait Marketplace: CatalogSource {
    /// Human readable target name for logs
    fn name(&self) -> &str;

    fn limits(&self) -> BatchLimits;

    /// Warehouse stamped on stock records, if the marketplace uses one
    fn warehouse_id(&self) -> Option<&str>;

    /// Currency code the marketplace expects on prices
    fn currency(&self) -> &str;

    /// Push one batch of stock records
    async fn update_stocks(&self, batch: &[StockRecord]) -> Result<serde_json::Value>;

    /// Push one batch of price records
    async fn update_prices(&self, batch: &[PriceRecord]) -> Result<serde_json::Value>;
}

/// Read a response body, failing with the body attached on non-success status
pub(crate) async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        log::error!("Request failed with status {}: {}", status, body);
        return Err(SyncError::HttpStatus { status, body });
    }

    log::debug!("Response ({}): {} bytes", status, body.len());
    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sizes_are_rejected() {
        assert!(BatchLimits::new(0, 1, 1).is_none());
        assert!(BatchLimits::new(1, 0, 1).is_none());
        assert!(BatchLimits::new(1, 1, 0).is_none());
    }

    #[test]
    fn overrides_shrink_batches_but_never_grow_them() {
        let yandex = BatchLimits::fixed(200, 2000, 500);

        let limits = yandex.with_overrides(Some(300), Some(5000)).unwrap();
        assert_eq!(limits.page_size.get(), 200);
        assert_eq!(limits.stock_batch.get(), 300);
        assert_eq!(limits.price_batch.get(), 500);

        assert_eq!(yandex.with_overrides(None, None), Some(yandex));
        assert!(yandex.with_overrides(Some(0), None).is_none());
    }

    #[test]
    fn limits_keep_given_sizes() {
        let limits = BatchLimits::new(200, 2000, 500).unwrap();
        assert_eq!(limits.page_size.get(), 200);
        assert_eq!(limits.stock_batch.get(), 2000);
        assert_eq!(limits.price_batch.get(), 500);
    }
}
