use std::sync::Arc;

use anyhow::{Context, Result};
use lib_controllog::configs::IntervalSettings;
use lib_controllog::connections::{PostgresEventLoader, RedisLogCache};
use lib_controllog::core::{ConfigurationContext, ConfigurationRefresher, LogPoller, LogProcessor};
use lib_controllog::notify::TwilioGateway;
use lib_controllog::processors::{CacheProcessor, NotificationProcessor};
use lib_controllog::sources::{GoogleSheetsSource, SourceRegistry};
use tracing::info;

use super::config::{Config, required};

/// The two long-running loops, sharing one configuration context.
pub struct Pipeline {
    pub refresher: ConfigurationRefresher,
    pub poller: LogPoller,
}

/// Connects every adapter and assembles the loops.
pub async fn build_pipeline(config: &Config, intervals: IntervalSettings) -> Result<Pipeline> {
    let context = Arc::new(ConfigurationContext::new());

    let loader = PostgresEventLoader::connect(required(&config.database_url, "DATABASE_URL")?)
        .context("Failed to create Postgres pool")?;
    let refresher =
        ConfigurationRefresher::new(Arc::new(loader), context.clone(), intervals.refresh_interval);

    let mut sources = SourceRegistry::new();
    sources.register(Arc::new(
        GoogleSheetsSource::new(
            required(&config.google_sheets_spreadsheet_id, "GOOGLE_SHEETS_SPREADSHEET_ID")?,
            required(&config.google_sheets_api_key, "GOOGLE_SHEETS_API_KEY")?,
        )
        .context("Failed to create Google Sheets source")?,
    ));

    let cache = RedisLogCache::connect(required(&config.redis_url, "REDIS_URL")?)
        .await
        .context("Failed to connect to Redis")?;
    let gateway = TwilioGateway::new(
        required(&config.twilio_account_sid, "TWILIO_ACCOUNT_SID")?,
        required(&config.twilio_auth_token, "TWILIO_AUTH_TOKEN")?,
    )
    .context("Failed to create Twilio gateway")?;

    let processors: Vec<Arc<dyn LogProcessor>> = vec![
        Arc::new(CacheProcessor::new(Arc::new(cache))),
        Arc::new(NotificationProcessor::new(
            Arc::new(gateway),
            required(&config.sms_from_number, "SMS_FROM_NUMBER")?,
        )),
    ];

    info!(
        sources = sources.len(),
        processors = processors.len(),
        "Pipeline assembled"
    );

    let poller = LogPoller::new(context, sources, processors, intervals.poll_interval);
    Ok(Pipeline { refresher, poller })
}
