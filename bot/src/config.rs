use std::collections::HashSet;
use std::time::Duration;

use market::Asset;

use crate::error::AppError;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// SQLite connection string for subscribers and the broadcast gate.
    pub database_url: String,

    // =========================
    // Messaging
    // =========================
    /// Telegram bot token (`TELETOKEN`). Required.
    pub telegram_token: String,

    /// Base URL of the Bot API, overridable for self-hosted servers.
    pub telegram_api_url: String,

    /// Long-poll timeout for `getUpdates`. The HTTP timeout is derived
    /// from it so the request outlives the server-side wait.
    pub long_poll_timeout: Duration,

    /// Users allowed to force an out-of-schedule broadcast.
    pub admin_ids: HashSet<i64>,

    // =========================
    // Price sampling
    // =========================
    /// Spot-price API base URL.
    pub price_api_url: String,

    /// Assets sampled every cycle, in message order.
    pub assets: Vec<Asset>,

    /// Samples kept per asset. One per minute over a day by default.
    pub window_capacity: usize,

    /// Period of the poll loop.
    pub poll_interval: Duration,

    /// Upper bound on a single price request.
    pub fetch_timeout: Duration,

    // =========================
    // Broadcasting
    // =========================
    /// Local hour (0..=23) of the daily broadcast.
    pub send_hour: u32,

    /// Deliveries in flight per broadcast pass.
    pub delivery_concurrency: usize,

    /// Capacity of the on-demand request queue.
    ///
    /// Acts as backpressure: when full, `/update` is refused instead of
    /// piling up requests against the price API.
    pub on_demand_queue: usize,

    /// `APP_ENV=production` switches logs to JSON.
    pub production: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let telegram_token = get("TELETOKEN").ok_or(AppError::MissingEnv("TELETOKEN"))?;

        let assets = match get("ASSETS") {
            Some(raw) => parse_assets(&raw)?,
            None => vec![Asset::new("BTC", "USD"), Asset::new("ETH", "USD")],
        };

        let send_hour: u32 = parse_or(get("SEND_HOUR"), "SEND_HOUR", 6)?;
        if send_hour > 23 {
            return Err(AppError::InvalidConfig {
                key: "SEND_HOUR",
                reason: format!("{send_hour} is not an hour of the day"),
            });
        }

        let admin_ids = match get("ADMIN_IDS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<i64>().map_err(|e| AppError::InvalidConfig {
                        key: "ADMIN_IDS",
                        reason: format!("{s}: {e}"),
                    })
                })
                .collect::<Result<HashSet<_>, _>>()?,
            None => HashSet::new(),
        };

        Ok(Self {
            database_url: get("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://pricebot.db?mode=rwc".to_string()),

            telegram_token,
            telegram_api_url: get("TELEGRAM_API_URL")
                .unwrap_or_else(|| "https://api.telegram.org".to_string()),
            long_poll_timeout: Duration::from_secs(parse_or(
                get("LONG_POLL_TIMEOUT_SECS"),
                "LONG_POLL_TIMEOUT_SECS",
                10,
            )?),
            admin_ids,

            price_api_url: get("PRICE_API_URL")
                .unwrap_or_else(|| "https://api.coinbase.com/v2".to_string()),
            assets,
            window_capacity: parse_or(get("WINDOW_CAPACITY"), "WINDOW_CAPACITY", 1440)?,
            poll_interval: Duration::from_secs(parse_or(
                get("POLL_INTERVAL_SECS"),
                "POLL_INTERVAL_SECS",
                60,
            )?),
            fetch_timeout: Duration::from_secs(parse_or(
                get("FETCH_TIMEOUT_SECS"),
                "FETCH_TIMEOUT_SECS",
                30,
            )?),

            send_hour,
            delivery_concurrency: parse_or(
                get("DELIVERY_CONCURRENCY"),
                "DELIVERY_CONCURRENCY",
                8,
            )?,
            on_demand_queue: parse_or(get("ON_DEMAND_QUEUE"), "ON_DEMAND_QUEUE", 64)?,

            production: get("APP_ENV").is_some_and(|v| v == "production"),
        })
    }
}

fn parse_or<T>(raw: Option<String>, key: &'static str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(v) => v.parse().map_err(|e: T::Err| AppError::InvalidConfig {
            key,
            reason: format!("{v}: {e}"),
        }),
        None => Ok(default),
    }
}

fn parse_assets(raw: &str) -> Result<Vec<Asset>, AppError> {
    let assets = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<Asset>().map_err(|e| AppError::InvalidConfig {
                key: "ASSETS",
                reason: e.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if assets.is_empty() {
        return Err(AppError::InvalidConfig {
            key: "ASSETS",
            reason: "no assets listed".into(),
        });
    }
    Ok(assets)
}
