use serde::Serialize;

use outlay_core::config::{AppConfig, LoadOptions, LogFormat};

#[derive(Debug, Serialize)]
struct EffectiveConfig {
    database_url: String,
    database_max_connections: u32,
    database_timeout_secs: u64,
    logging_level: String,
    logging_format: &'static str,
}

pub fn run() -> String {
    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            let effective = EffectiveConfig {
                database_url: config.database.url,
                database_max_connections: config.database.max_connections,
                database_timeout_secs: config.database.timeout_secs,
                logging_level: config.logging.level,
                logging_format: match config.logging.format {
                    LogFormat::Compact => "compact",
                    LogFormat::Pretty => "pretty",
                    LogFormat::Json => "json",
                },
            };
            serde_json::to_string_pretty(&effective)
                .unwrap_or_else(|error| format!("{{\"error\":\"{error}\"}}"))
        }
        Err(error) => format!("configuration issue: {error}"),
    }
}
