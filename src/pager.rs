//! Catalog pagination shared by every marketplace
//!
//! Marketplaces differ only in how they signal the last page, so the loop lives here
//! and each adapter picks a [`Termination`] policy.

use crate::error::{Result, SyncError};
use crate::models::{CatalogSnapshot, OfferId};

/// One page of a marketplace offer listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogPage {
    pub offer_ids: Vec<OfferId>,
    /// Cursor to request the following page with
    pub next_cursor: Option<String>,
    /// Total number of offers the marketplace claims to hold
    pub total: Option<u64>,
}

/// How a marketplace signals that the listing is exhausted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Stop once a page carries no next cursor (Yandex Market)
    CursorExhausted,
    /// Stop once the running item count reaches the declared total (Ozon)
    TotalReached,
}

impl Termination {
    /// Decide whether `page` was the last one, `received` counting every item so far
    fn is_last(self, page: &CatalogPage, received: u64) -> Result<bool> {
        match self {
            Termination::CursorExhausted => {
                Ok(page.next_cursor.as_deref().map_or(true, str::is_empty))
            }
            Termination::TotalReached => {
                let total = page.total.ok_or_else(|| {
                    SyncError::ProtocolShape("catalog page carries no total".to_string())
                })?;
                if received >= total {
                    return Ok(true);
                }
                if page.offer_ids.is_empty() {
                    return Err(SyncError::ProtocolShape(format!(
                        "empty catalog page after {received} of {total} items"
                    )));
                }
                Ok(false)
            }
        }
    }
}

/// A paginated offer listing endpoint
#[allow(async_fn_in_trait)]
pub trait CatalogSource {
    /// Termination policy of this listing
    fn termination(&self) -> Termination;

    /// Fetch the page starting at `cursor` (`None` for the first page)
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<CatalogPage>;
}

/// Walk every page of `source` and collect the listed offer ids.
///
/// Pages are fetched one at a time. Any failure discards what was collected so far.
pub async fn fetch_full_catalog<S: CatalogSource>(source: &S) -> Result<CatalogSnapshot> {
    let termination = source.termination();
    let mut snapshot = CatalogSnapshot::new();
    let mut cursor: Option<String> = None;
    let mut received: u64 = 0;
    let mut pages = 0usize;

    loop {
        let page = source.fetch_page(cursor.as_deref()).await?;
        pages += 1;
        received += page.offer_ids.len() as u64;
        log::debug!(
            "Catalog page {}: {} items ({} so far)",
            pages,
            page.offer_ids.len(),
            received
        );

        let last = termination.is_last(&page, received)?;
        let next_cursor = page.next_cursor;
        snapshot.extend(page.offer_ids);

        if last {
            break;
        }

        match next_cursor {
            Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
            Some(next) => {
                return Err(SyncError::ProtocolShape(format!(
                    "catalog cursor '{next}' did not advance"
                )))
            }
            None => {
                return Err(SyncError::ProtocolShape(
                    "catalog page carries no next cursor".to_string(),
                ))
            }
        }
    }

    log::info!(
        "Fetched catalog: {} offers in {} page(s)",
        snapshot.len(),
        pages
    );
    Ok(snapshot)
}

#[cfg(test)]
#[path = "pager_tests.rs"]
mod tests;
