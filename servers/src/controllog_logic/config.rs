use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default)]
#[clap(about = "Race control-log poller and penalty notifier", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "CONTROLLOG_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "CONTROLLOG_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "CONTROLLOG_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "CONTROLLOG_POLL_INTERVAL_MS", help = "Milliseconds between the starts of two poll ticks. Required.")]
    pub poll_interval_ms: Option<u64>,

    #[clap(long, env = "CONTROLLOG_REFRESH_INTERVAL_MS", help = "Milliseconds between two configuration refreshes.")]
    pub refresh_interval_ms: Option<u64>,

    #[clap(long, env = "DATABASE_URL", help = "Postgres connection string for events, cars and subscribers.")]
    pub database_url: Option<String>,

    #[clap(long, env = "REDIS_URL", help = "Redis URL the latest control logs are published to.")]
    pub redis_url: Option<String>,

    #[clap(long, env = "GOOGLE_SHEETS_API_KEY", help = "API key for the Google Sheets values endpoint.")]
    pub google_sheets_api_key: Option<String>,

    #[clap(long, env = "GOOGLE_SHEETS_SPREADSHEET_ID", help = "Spreadsheet holding one control-log sheet per event.")]
    pub google_sheets_spreadsheet_id: Option<String>,

    #[clap(long, env = "TWILIO_ACCOUNT_SID", help = "Twilio account SID.")]
    pub twilio_account_sid: Option<String>,

    #[clap(long, env = "TWILIO_AUTH_TOKEN", help = "Twilio auth token.")]
    pub twilio_auth_token: Option<String>,

    #[clap(long, env = "SMS_FROM_NUMBER", help = "Sender number for penalty notifications.")]
    pub sms_from_number: Option<String>,
}

impl Config {
    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            poll_interval_ms: other.poll_interval_ms.or(self.poll_interval_ms),
            refresh_interval_ms: other.refresh_interval_ms.or(self.refresh_interval_ms),
            database_url: other.database_url.or(self.database_url),
            redis_url: other.redis_url.or(self.redis_url),
            google_sheets_api_key: other.google_sheets_api_key.or(self.google_sheets_api_key),
            google_sheets_spreadsheet_id: other
                .google_sheets_spreadsheet_id
                .or(self.google_sheets_spreadsheet_id),
            twilio_account_sid: other.twilio_account_sid.or(self.twilio_account_sid),
            twilio_auth_token: other.twilio_auth_token.or(self.twilio_auth_token),
            sms_from_number: other.sms_from_number.or(self.sms_from_number),
        }
    }
}

/// Reads a required value, naming the environment variable when it is missing.
pub fn required<'a>(value: &'a Option<String>, env_name: &str) -> anyhow::Result<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("{env_name} is not configured"))
}

/// Defaults, then the JSON config file, then environment and CLI.
///
/// Messages are returned rather than logged because logging is not set up yet.
pub fn load_config() -> (Config, Vec<String>) {
    let mut notes = Vec::new();

    // 1. Load defaults. The poll interval deliberately has none.
    let default_config = Config {
        log_dir: Some(PathBuf::from("./logs")),
        log_level: Some("info".to_string()),
        redis_url: Some("redis://127.0.0.1/".to_string()),
        ..Default::default()
    };

    // 2. Load from config file (server_controllog.conf) if present.
    let cli_args = Config::parse();

    let config_file_path = cli_args
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("server_controllog.conf"));

    let mut current_config = default_config;

    if config_file_path.exists() {
        match fs::read_to_string(&config_file_path) {
            Ok(config_str) => match serde_json::from_str::<Config>(&config_str) {
                Ok(file_config) => current_config = current_config.merge(file_config),
                Err(e) => notes.push(format!(
                    "Failed to parse config file {}: {}. Falling back to other sources.",
                    config_file_path.display(),
                    e
                )),
            },
            Err(e) => notes.push(format!(
                "Failed to read config file {}: {}. Falling back to other sources.",
                config_file_path.display(),
                e
            )),
        }
    } else {
        notes.push(format!(
            "Config file not found at {}. Using defaults and environment/CLI variables.",
            config_file_path.display()
        ));
    }

    // 3. Environment variables and CLI arguments win over the file.
    current_config = current_config.merge(cli_args);

    (current_config, notes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_prefers_the_overriding_values() {
        let base = Config {
            log_level: Some("info".to_string()),
            poll_interval_ms: Some(5000),
            redis_url: Some("redis://base/".to_string()),
            ..Default::default()
        };
        let file: Config = serde_json::from_str(
            r#"{ "pollIntervalMs": 2000, "smsFromNumber": "+15550001111" }"#,
        )
        .unwrap();

        let merged = base.merge(file);

        assert_eq!(merged.poll_interval_ms, Some(2000));
        assert_eq!(merged.log_level.as_deref(), Some("info"));
        assert_eq!(merged.redis_url.as_deref(), Some("redis://base/"));
        assert_eq!(merged.sms_from_number.as_deref(), Some("+15550001111"));
    }

    #[test]
    fn required_rejects_missing_and_blank_values() {
        assert!(required(&None, "DATABASE_URL").is_err());
        assert!(required(&Some("  ".to_string()), "DATABASE_URL").is_err());
        assert_eq!(
            required(&Some("postgres://x".to_string()), "DATABASE_URL").unwrap(),
            "postgres://x"
        );
    }
}
