use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use cycle_common::ingestors::redis_sub::{RECONNECT_BASE_DELAY, RECONNECT_MAX_DELAY};

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default)]
#[clap(about = "Production-cycle dashboard gateway", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "CYCLE_PORT", help = "Port to listen on for viewer connections.")]
    pub port: Option<u16>,

    #[clap(long, env = "CYCLE_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "CYCLE_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "CYCLE_LOG_LEVEL", help = "Logging level (debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "DATABASE_URL", help = "PostgreSQL connection URL for the cycle store.")]
    pub database_url: Option<String>,

    #[clap(long, env = "REDIS_URL", help = "Redis URL for the subscribe channel.")]
    pub redis_url: Option<String>,

    #[clap(long, env = "CYCLE_CHANNEL", help = "Pub/Sub channel the controller publishes to.")]
    pub channel: Option<String>,

    #[clap(long, env = "CYCLE_RECONNECT_BASE_DELAY_MS", help = "Base delay in milliseconds for subscribe-channel reconnect attempts.")]
    pub reconnect_base_delay_ms: Option<u64>,

    #[clap(long, env = "CYCLE_RECONNECT_MAX_DELAY_MS", help = "Maximum delay in milliseconds for subscribe-channel reconnect attempts.")]
    pub reconnect_max_delay_ms: Option<u64>,
}

impl Config {
    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            port: other.port.or(self.port),
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            database_url: other.database_url.or(self.database_url),
            redis_url: other.redis_url.or(self.redis_url),
            channel: other.channel.or(self.channel),
            reconnect_base_delay_ms: other.reconnect_base_delay_ms.or(self.reconnect_base_delay_ms),
            reconnect_max_delay_ms: other.reconnect_max_delay_ms.or(self.reconnect_max_delay_ms),
        }
    }
}

pub fn load_config() -> Config {
    // 1. Load defaults
    let default_config = Config {
        port: Some(9100),
        log_dir: Some(PathBuf::from("./logs")),
        log_level: Some("info".to_string()),
        redis_url: Some("redis://127.0.0.1/".to_string()),
        channel: Some("factory/cycle".to_string()),
        reconnect_base_delay_ms: Some(RECONNECT_BASE_DELAY.as_millis() as u64),
        reconnect_max_delay_ms: Some(RECONNECT_MAX_DELAY.as_millis() as u64),
        ..Default::default()
    };

    // 2. Load from config file (server_cycle.conf) if present.
    //    Allow overriding the default config file path with a CLI arg.
    let cli_args_for_path = Config::parse();

    let config_file_path = cli_args_for_path
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("server_cycle.conf"));

    let mut current_config = default_config;

    if config_file_path.exists() {
        if let Ok(config_str) = fs::read_to_string(&config_file_path) {
            if let Ok(file_config) = serde_json::from_str::<Config>(&config_str) {
                current_config = current_config.merge(file_config);
            } else {
                log::warn!(
                    "Failed to parse config file: {}. Falling back to other sources.",
                    config_file_path.display()
                );
            }
        } else {
            log::warn!(
                "Failed to read config file: {}. Falling back to other sources.",
                config_file_path.display()
            );
        }
    }

    // 3. Override with environment variables and CLI arguments.
    //    clap handles env vars; merge CLI args (which include env vars)
    //    over the file config.
    let cli_args_final = Config::parse();
    current_config.merge(cli_args_final)
}
