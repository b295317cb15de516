//! Upload orchestration for one marketplace target
//!
//! A run fetches the full catalog, reconciles it with the feed, then pushes stock and
//! price batches strictly one after another. The first failing batch stops the run;
//! batches already accepted stay applied. Re-running from scratch is safe because every
//! run recomputes the complete record set.

use chrono::{DateTime, SubsecRound, Utc};

use crate::batch::{batch_count, partition};
use crate::error::{FailureKind, Result, SyncError};
use crate::marketplace::Marketplace;
use crate::models::{PriceRecord, RawFeedRecord, StockRecord};
use crate::pager::fetch_full_catalog;
use crate::reconcile::{reconcile, ReconcileParams, Reconciliation};

/// Whether update endpoints are actually called
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncMode {
    #[default]
    Live,
    /// Fetch and reconcile, but only log the batches that would be sent
    DryRun,
}

/// Result of a full synchronization run
#[derive(Debug, Clone, Default)]
pub struct SyncOutcome {
    /// Every stock record of the run, zeroed offers included
    pub stocks: Vec<StockRecord>,
    pub prices: Vec<PriceRecord>,
    /// Stock records with a non-zero quantity
    pub in_stock: Vec<StockRecord>,
    /// Stock update calls issued (0 in dry-run)
    pub stock_calls: usize,
    /// Price update calls issued (0 in dry-run)
    pub price_calls: usize,
}

/// Push stock and prices for every listed offer of `market`
pub async fn synchronize<M: Marketplace>(
    market: &M,
    feed: &[RawFeedRecord],
    mode: SyncMode,
) -> Result<SyncOutcome> {
    let reconciliation = prepare(market, feed).await?;
    let in_stock = reconciliation.in_stock();

    let stock_calls = push_stocks(market, &reconciliation.stocks, mode).await?;
    let price_calls = push_prices(market, &reconciliation.prices, mode).await?;

    log::info!(
        "{}: synchronized {} stocks ({} in stock) and {} prices",
        market.name(),
        reconciliation.stocks.len(),
        in_stock.len(),
        reconciliation.prices.len()
    );

    Ok(SyncOutcome {
        stocks: reconciliation.stocks,
        prices: reconciliation.prices,
        in_stock,
        stock_calls,
        price_calls,
    })
}

/// Push stock only. Returns `(in_stock, stocks)`.
pub async fn upload_stocks<M: Marketplace>(
    market: &M,
    feed: &[RawFeedRecord],
    mode: SyncMode,
) -> Result<(Vec<StockRecord>, Vec<StockRecord>)> {
    let reconciliation = prepare(market, feed).await?;
    push_stocks(market, &reconciliation.stocks, mode).await?;
    Ok((reconciliation.in_stock(), reconciliation.stocks))
}

/// Push prices only
pub async fn upload_prices<M: Marketplace>(
    market: &M,
    feed: &[RawFeedRecord],
    mode: SyncMode,
) -> Result<Vec<PriceRecord>> {
    let reconciliation = prepare(market, feed).await?;
    push_prices(market, &reconciliation.prices, mode).await?;
    Ok(reconciliation.prices)
}

/// Log a failed run of `target` by kind and return the kind
pub fn report_failure(target: &str, err: &SyncError) -> FailureKind {
    let kind = err.kind();
    match kind {
        FailureKind::Timeout => log::error!("{}: server did not answer in time: {}", target, err),
        FailureKind::Connect => log::error!("{}: connection failed: {}", target, err),
        FailureKind::Other => log::error!("{}: {}", target, err),
    }
    kind
}

/// One timestamp for the whole run, whole seconds
fn batch_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

async fn prepare<M: Marketplace>(market: &M, feed: &[RawFeedRecord]) -> Result<Reconciliation> {
    let updated_at = batch_timestamp();

    log::info!("{}: fetching catalog...", market.name());
    let catalog = fetch_full_catalog(market).await?;

    let params = ReconcileParams {
        warehouse_id: market.warehouse_id().map(str::to_string),
        currency: market.currency().to_string(),
        updated_at,
    };
    let reconciliation = reconcile(feed, &catalog, &params)?;

    log::info!(
        "{}: {} listed offers, {} priced from feed of {} rows",
        market.name(),
        catalog.len(),
        reconciliation.prices.len(),
        feed.len()
    );
    Ok(reconciliation)
}

async fn push_stocks<M: Marketplace>(
    market: &M,
    stocks: &[StockRecord],
    mode: SyncMode,
) -> Result<usize> {
    let size = market.limits().stock_batch;
    let total = batch_count(stocks.len(), size);

    if mode == SyncMode::DryRun {
        log::info!(
            "{}: dry run, would send {} stock record(s) in {} batch(es) of up to {}",
            market.name(),
            stocks.len(),
            total,
            size
        );
        return Ok(0);
    }

    for (index, batch) in partition(stocks, size).enumerate() {
        log::debug!(
            "{}: stock batch {}/{} ({} records)",
            market.name(),
            index + 1,
            total,
            batch.len()
        );
        if let Err(e) = market.update_stocks(batch).await {
            log::error!(
                "{}: stock batch {}/{} failed, {} earlier batch(es) already applied: {}",
                market.name(),
                index + 1,
                total,
                index,
                e
            );
            return Err(e);
        }
    }
    Ok(total)
}

async fn push_prices<M: Marketplace>(
    market: &M,
    prices: &[PriceRecord],
    mode: SyncMode,
) -> Result<usize> {
    let size = market.limits().price_batch;
    let total = batch_count(prices.len(), size);

    if mode == SyncMode::DryRun {
        log::info!(
            "{}: dry run, would send {} price record(s) in {} batch(es) of up to {}",
            market.name(),
            prices.len(),
            total,
            size
        );
        return Ok(0);
    }

    for (index, batch) in partition(prices, size).enumerate() {
        log::debug!(
            "{}: price batch {}/{} ({} records)",
            market.name(),
            index + 1,
            total,
            batch.len()
        );
        if let Err(e) = market.update_prices(batch).await {
            log::error!(
                "{}: price batch {}/{} failed, {} earlier batch(es) already applied: {}",
                market.name(),
                index + 1,
                total,
                index,
                e
            );
            return Err(e);
        }
    }
    Ok(total)
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
