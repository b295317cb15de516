//! Watch Sync - remnants feed to marketplace stock & price synchronization
//!
//! Downloads the supplier's remnants export and pushes stock counts and prices to
//! Ozon and to the FBS and DBS campaigns of Yandex Market. Offers listed on a
//! marketplace but missing from the feed are zeroed.

pub mod batch;
pub mod error;
pub mod feed;
pub mod marketplace;
pub mod models;
pub mod normalize;
pub mod pager;
pub mod reconcile;
pub mod sync;

pub use error::{FailureKind, Result, SyncError};
pub use feed::{read_remnants, RemnantsArchive};
pub use marketplace::{BatchLimits, Campaign, Marketplace, OzonClient, YandexMarketClient};
pub use models::{CatalogSnapshot, PriceRecord, RawFeedRecord, StockRecord};
pub use sync::{
    report_failure, synchronize, upload_prices, upload_stocks, SyncMode, SyncOutcome,
};
