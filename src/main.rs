//! Watch Sync - remnants feed to marketplace stock & price synchronization
//!
//! Fetches the remnants feed once, then synchronizes each configured marketplace
//! target in turn. A failing target is reported and does not stop the others.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use watch_sync::feed::REMNANTS_URL;
use watch_sync::{
    read_remnants, report_failure, synchronize, BatchLimits, Campaign, Marketplace, OzonClient,
    RawFeedRecord, RemnantsArchive, SyncMode, YandexMarketClient,
};

/// Push watch stock and prices from the remnants feed to Ozon and Yandex Market
#[derive(Parser, Debug)]
#[command(name = "watch_sync")]
#[command(version, about, long_about = None)]
struct Args {
    /// Marketplace target(s) to synchronize
    #[arg(long, value_enum, default_value_t = Target::All)]
    target: Target,

    /// Fetch and reconcile, but do not call any update endpoint
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Read remnants from a local zip or table instead of downloading them
    #[arg(long)]
    feed_file: Option<PathBuf>,

    /// Remnants archive URL
    #[arg(long, env = "REMNANTS_URL", default_value = REMNANTS_URL)]
    remnants_url: String,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,

    /// Stock records per update call, capped at each marketplace's maximum
    #[arg(long)]
    stock_batch: Option<usize>,

    /// Price records per update call, capped at each marketplace's maximum
    #[arg(long)]
    price_batch: Option<usize>,

    /// Ozon API key
    #[arg(long, env = "SELLER_TOKEN", hide_env_values = true)]
    seller_token: Option<String>,

    /// Ozon client id
    #[arg(long, env = "CLIENT_ID")]
    client_id: Option<String>,

    /// Yandex Market OAuth token
    #[arg(long, env = "MARKET_TOKEN", hide_env_values = true)]
    market_token: Option<String>,

    /// Yandex Market FBS campaign id
    #[arg(long, env = "FBS_ID")]
    fbs_id: Option<String>,

    /// Yandex Market FBS warehouse id
    #[arg(long, env = "WAREHOUSE_FBS_ID")]
    warehouse_fbs_id: Option<String>,

    /// Yandex Market DBS campaign id
    #[arg(long, env = "DBS_ID")]
    dbs_id: Option<String>,

    /// Yandex Market DBS warehouse id
    #[arg(long, env = "WAREHOUSE_DBS_ID")]
    warehouse_dbs_id: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Target {
    /// Every target that has credentials configured
    All,
    Ozon,
    YandexFbs,
    YandexDbs,
}

#[tokio::main]
async fn main() -> ExitCode {
    // .env must be loaded before clap reads environment fallbacks
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mode = if args.dry_run {
        SyncMode::DryRun
    } else {
        SyncMode::Live
    };

    log::info!("Starting watch_sync...");
    if mode == SyncMode::DryRun {
        log::info!("Dry run: no stock or price will be changed");
    }

    let http = match reqwest::Client::builder()
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            log::error!("Failed to build HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let limits = batch_limits(&args, OzonClient::DEFAULT_LIMITS)
        .zip(batch_limits(&args, YandexMarketClient::DEFAULT_LIMITS));
    let Some((ozon_limits, yandex_limits)) = limits else {
        log::error!("Batch sizes must be greater than zero");
        return ExitCode::from(2);
    };

    let ozon = ozon_client(&args, &http).map(|c| c.with_limits(ozon_limits));
    let fbs = yandex_client(&args, &http, Campaign::Fbs).map(|c| c.with_limits(yandex_limits));
    let dbs = yandex_client(&args, &http, Campaign::Dbs).map(|c| c.with_limits(yandex_limits));

    let wanted = |target: Target| args.target == Target::All || args.target == target;
    for (target, configured) in [
        (Target::Ozon, ozon.is_some()),
        (Target::YandexFbs, fbs.is_some()),
        (Target::YandexDbs, dbs.is_some()),
    ] {
        if wanted(target) && !configured {
            if args.target == Target::All {
                log::warn!("Skipping {:?}: credentials not configured", target);
            } else {
                log::error!("Cannot synchronize {:?}: credentials not configured", target);
                return ExitCode::from(2);
            }
        }
    }
    if ozon.is_none() && fbs.is_none() && dbs.is_none() {
        log::error!("No marketplace credentials configured");
        return ExitCode::from(2);
    }

    let feed = match load_feed(&args, &http).await {
        Ok(feed) => feed,
        Err(e) => {
            report_failure("Remnants feed", &e);
            return ExitCode::FAILURE;
        }
    };

    let mut failed = false;
    if let Some(ozon) = ozon.as_ref().filter(|_| wanted(Target::Ozon)) {
        failed |= !run_target(ozon, &feed, mode).await;
    }
    if let Some(fbs) = fbs.as_ref().filter(|_| wanted(Target::YandexFbs)) {
        failed |= !run_target(fbs, &feed, mode).await;
    }
    if let Some(dbs) = dbs.as_ref().filter(|_| wanted(Target::YandexDbs)) {
        failed |= !run_target(dbs, &feed, mode).await;
    }

    if failed {
        log::error!("Sync finished with errors.");
        ExitCode::FAILURE
    } else {
        log::info!("Sync completed successfully.");
        ExitCode::SUCCESS
    }
}

fn batch_limits(args: &Args, defaults: BatchLimits) -> Option<BatchLimits> {
    defaults.with_overrides(args.stock_batch, args.price_batch)
}

fn ozon_client(args: &Args, http: &reqwest::Client) -> Option<OzonClient> {
    let client_id = args.client_id.clone()?;
    let seller_token = args.seller_token.clone()?;
    Some(OzonClient::new(client_id, seller_token).with_http_client(http.clone()))
}

fn yandex_client(
    args: &Args,
    http: &reqwest::Client,
    campaign: Campaign,
) -> Option<YandexMarketClient> {
    let token = args.market_token.clone()?;
    let (campaign_id, warehouse_id) = match campaign {
        Campaign::Fbs => (args.fbs_id.clone()?, args.warehouse_fbs_id.clone()?),
        Campaign::Dbs => (args.dbs_id.clone()?, args.warehouse_dbs_id.clone()?),
    };
    Some(
        YandexMarketClient::new(token, campaign_id, warehouse_id, campaign)
            .with_http_client(http.clone()),
    )
}

async fn load_feed(
    args: &Args,
    http: &reqwest::Client,
) -> watch_sync::Result<Vec<RawFeedRecord>> {
    match &args.feed_file {
        Some(path) => read_remnants(path),
        None => {
            RemnantsArchive::new(args.remnants_url.clone())
                .with_http_client(http.clone())
                .download()
                .await
        }
    }
}

/// Synchronize one target; `false` if it failed
async fn run_target<M: Marketplace>(market: &M, feed: &[RawFeedRecord], mode: SyncMode) -> bool {
    match synchronize(market, feed, mode).await {
        Ok(outcome) => {
            log::info!(
                "{}: {} offers in stock, {} zeroed, {} prices ({} stock / {} price calls)",
                market.name(),
                outcome.in_stock.len(),
                outcome.stocks.len() - outcome.in_stock.len(),
                outcome.prices.len(),
                outcome.stock_calls,
                outcome.price_calls
            );
            true
        }
        Err(e) => {
            report_failure(market.name(), &e);
            false
        }
    }
}
