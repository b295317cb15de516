//! Yandex Market partner API client
//!
//! One client serves one campaign; FBS and DBS logistics models are separate
//! campaigns with their own warehouse. Catalog pages follow `nextPageToken` until it
//! disappears. Stock entries are nested per SKU and warehouse.

use chrono::SecondsFormat;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{read_json, BatchLimits, Marketplace};
use crate::error::{Result, SyncError};
use crate::models::{PriceRecord, StockRecord};
use crate::pager::{CatalogPage, CatalogSource, Termination};

const BASE_URL: &str = "https://api.partner.market.yandex.ru";
const CURRENCY: &str = "RUR";

/// Logistics model of a Yandex Market campaign
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Campaign {
    /// Fulfilment by seller
    Fbs,
    /// Delivery by seller
    Dbs,
}

impl Campaign {
    fn label(self) -> &'static str {
        match self {
            Campaign::Fbs => "Yandex Market FBS",
            Campaign::Dbs => "Yandex Market DBS",
        }
    }
}

/// Yandex Market client bound to a single campaign and warehouse
pub struct YandexMarketClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    access_token: String,
    campaign_id: String,
    warehouse_id: String,
    campaign: Campaign,
    limits: BatchLimits,
}

#[derive(Debug, Deserialize)]
struct MappingResponse {
    result: Option<MappingResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MappingResult {
    paging: Option<Paging>,
    #[serde(default)]
    offer_mapping_entries: Vec<MappingEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Paging {
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MappingEntry {
    offer: Option<MappedOffer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MappedOffer {
    shop_sku: Option<String>,
}

#[derive(Debug, Serialize)]
struct StocksPayload<'a> {
    skus: Vec<YandexStock<'a>>,
}

/// Nested stock entry: one SKU, one warehouse, one count
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct YandexStock<'a> {
    sku: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    warehouse_id: Option<&'a str>,
    items: [StockItem; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StockItem {
    count: u64,
    #[serde(rename = "type")]
    kind: &'static str,
    updated_at: String,
}

impl<'a> From<&'a StockRecord> for YandexStock<'a> {
    fn from(record: &'a StockRecord) -> Self {
        Self {
            sku: &record.offer_id,
            warehouse_id: record.warehouse_id.as_deref(),
            items: [StockItem {
                count: record.quantity,
                kind: "FIT",
                updated_at: record.updated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            }],
        }
    }
}

#[derive(Debug, Serialize)]
struct PricesPayload<'a> {
    offers: Vec<YandexOfferPrice<'a>>,
}

#[derive(Debug, Serialize)]
struct YandexOfferPrice<'a> {
    id: &'a str,
    price: YandexPrice<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct YandexPrice<'a> {
    value: u64,
    currency_id: &'a str,
}

impl<'a> From<&'a PriceRecord> for YandexOfferPrice<'a> {
    fn from(record: &'a PriceRecord) -> Self {
        Self {
            id: &record.offer_id,
            price: YandexPrice {
                value: record.price,
                currency_id: &record.currency,
            },
        }
    }
}

impl YandexMarketClient {
    /// 200 offers per page, 2000 stocks and 500 prices per update
    pub const DEFAULT_LIMITS: BatchLimits = BatchLimits::fixed(200, 2000, 500);

    pub fn new(
        access_token: String,
        campaign_id: String,
        warehouse_id: String,
        campaign: Campaign,
    ) -> Self {
        log::debug!(
            "Creating {} client for campaign {}",
            campaign.label(),
            campaign_id
        );
        Self {
            client: Client::new(),
            base_url: BASE_URL.to_string(),
            access_token,
            campaign_id,
            warehouse_id,
            campaign,
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

    pub fn campaign(&self) -> Campaign {
        self.campaign
    }

    fn url(&self, path: &str) -> String {
        format!("{}/campaigns/{}/{}", self.base_url, self.campaign_id, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json")
    }
}

impl CatalogSource for YandexMarketClient {
    fn termination(&self) -> Termination {
        Termination::CursorExhausted
    }

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<CatalogPage> {
        let limit = self.limits.page_size.get().to_string();
        let query = [
            ("page_token", cursor.unwrap_or_default()),
            ("limit", limit.as_str()),
        ];

        let response = self
            .authorize(self.client.get(self.url("offer-mapping-entries")))
            .query(&query)
            .send()
            .await?;
        let body: MappingResponse = read_json(response).await?;

        let result = body.result.ok_or_else(|| {
            SyncError::ProtocolShape("offer mapping response has no result".to_string())
        })?;
        let paging = result.paging.ok_or_else(|| {
            SyncError::ProtocolShape("offer mapping response has no paging".to_string())
        })?;

        let offer_ids = result
            .offer_mapping_entries
            .into_iter()
            .map(|entry| {
                entry.offer.and_then(|o| o.shop_sku).ok_or_else(|| {
                    SyncError::ProtocolShape("offer mapping entry has no shopSku".to_string())
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(CatalogPage {
            offer_ids,
            next_cursor: paging.next_page_token,
            total: None,
        })
    }
}

impl Marketplace for YandexMarketClient {
    fn name(&self) -> &str {
        self.campaign.label()
    }

    fn limits(&self) -> BatchLimits {
        self.limits
    }

    fn warehouse_id(&self) -> Option<&str> {
        Some(&self.warehouse_id)
    }

    fn currency(&self) -> &str {
        CURRENCY
    }

    async fn update_stocks(&self, batch: &[StockRecord]) -> Result<serde_json::Value> {
        let payload = StocksPayload {
            skus: batch.iter().map(YandexStock::from).collect(),
        };
        let response = self
            .authorize(self.client.put(self.url("offers/stocks")))
            .json(&payload)
            .send()
            .await?;
        read_json(response).await
    }

    async fn update_prices(&self, batch: &[PriceRecord]) -> Result<serde_json::Value> {
        let payload = PricesPayload {
            offers: batch.iter().map(YandexOfferPrice::from).collect(),
        };
        let response = self
            .authorize(self.client.post(self.url("offer-prices/updates")))
            .json(&payload)
            .send()
            .await?;
        read_json(response).await
    }
}

#[cfg(test)]
#[path = "yandex_tests.rs"]
mod tests;
