//! Ozon seller API client
//!
//! Catalog pages are requested by `last_id` and end when the item count reaches the
//! declared `total`. Stock and price payloads are flat lists keyed by `offer_id`.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{read_json, BatchLimits, Marketplace};
use crate::error::{Result, SyncError};
use crate::models::{PriceRecord, StockRecord};
use crate::pager::{CatalogPage, CatalogSource, Termination};

const BASE_URL: &str = "https://api-seller.ozon.ru";
const CURRENCY: &str = "RUB";

/// Ozon client for one seller account
pub struct OzonClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    client_id: String,
    api_key: String,
    limits: BatchLimits,
}

#[derive(Debug, Serialize)]
struct ListRequest<'a> {
    filter: ListFilter,
    last_id: &'a str,
    limit: usize,
}

#[derive(Debug, Serialize)]
struct ListFilter {
    visibility: &'static str,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    result: Option<ListResult>,
}

#[derive(Debug, Deserialize)]
struct ListResult {
    #[serde(default)]
    items: Vec<ListItem>,
    total: Option<u64>,
    last_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListItem {
    offer_id: String,
}

#[derive(Debug, Serialize)]
struct StocksPayload<'a> {
    stocks: Vec<OzonStock<'a>>,
}

/// Flat stock entry of the Ozon import endpoint
#[derive(Debug, Serialize)]
struct OzonStock<'a> {
    offer_id: &'a str,
    stock: u64,
}

impl<'a> From<&'a StockRecord> for OzonStock<'a> {
    fn from(record: &'a StockRecord) -> Self {
        Self {
            offer_id: &record.offer_id,
            stock: record.quantity,
        }
    }
}

#[derive(Debug, Serialize)]
struct PricesPayload<'a> {
    prices: Vec<OzonPrice<'a>>,
}

/// Price entry of the Ozon import endpoint. Prices travel as strings.
#[derive(Debug, Serialize)]
struct OzonPrice<'a> {
    auto_action_enabled: &'static str,
    currency_code: &'a str,
    offer_id: &'a str,
    old_price: &'static str,
    price: String,
}

impl<'a> From<&'a PriceRecord> for OzonPrice<'a> {
    fn from(record: &'a PriceRecord) -> Self {
        Self {
            auto_action_enabled: "UNKNOWN",
            currency_code: &record.currency,
            offer_id: &record.offer_id,
            old_price: "0",
            price: record.price.to_string(),
        }
    }
}

impl OzonClient {
    /// 1000 offers per page, 100 stocks and 900 prices per update.
    /// The price endpoint itself accepts up to 1000.
    pub const DEFAULT_LIMITS: BatchLimits = BatchLimits::fixed(1000, 100, 900);

    pub fn new(client_id: String, api_key: String) -> Self {
        log::debug!("Creating Ozon client for seller {}", client_id);
        Self {
            client: Client::new(),
            base_url: BASE_URL.to_string(),
            client_id,
            api_key,
            limits: Self::DEFAULT_LIMITS,
        }
    }

    /// Use a preconfigured HTTP client (timeouts, proxies)
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_limits(mut self, limits: BatchLimits) -> Self {
        self.limits = limits;
        self
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .header("Client-Id", &self.client_id)
            .header("Api-Key", &self.api_key)
    }
}

impl CatalogSource for OzonClient {
    fn termination(&self) -> Termination {
        Termination::TotalReached
    }

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<CatalogPage> {
        let request = ListRequest {
            filter: ListFilter { visibility: "ALL" },
            last_id: cursor.unwrap_or_default(),
            limit: self.limits.page_size.get(),
        };

        let response = self.post("/v2/product/list").json(&request).send().await?;
        let body: ListResponse = read_json(response).await?;
        let result = body.result.ok_or_else(|| {
            SyncError::ProtocolShape("Ozon product list has no result".to_string())
        })?;

        Ok(CatalogPage {
            offer_ids: result.items.into_iter().map(|i| i.offer_id).collect(),
            next_cursor: result.last_id,
            total: result.total,
        })
    }
}

impl Marketplace for OzonClient {
    fn name(&self) -> &str {
        "Ozon"
    }

    fn limits(&self) -> BatchLimits {
        self.limits
    }

    fn warehouse_id(&self) -> Option<&str> {
        None
    }

    fn currency(&self) -> &str {
        CURRENCY
    }

    async fn update_stocks(&self, batch: &[StockRecord]) -> Result<serde_json::Value> {
        let payload = StocksPayload {
            stocks: batch.iter().map(OzonStock::from).collect(),
        };
        let response = self
            .post("/v1/product/import/stocks")
            .json(&payload)
            .send()
            .await?;
        read_json(response).await
    }

    async fn update_prices(&self, batch: &[PriceRecord]) -> Result<serde_json::Value> {
        let payload = PricesPayload {
            prices: batch.iter().map(OzonPrice::from).collect(),
        };
        let response = self
            .post("/v1/product/import/prices")
            .json(&payload)
            .send()
            .await?;
        read_json(response).await
    }
}

#[cfg(test)]
#[path = "ozon_tests.rs"]
mod tests;
