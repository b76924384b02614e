//! Application settings: TOML file layered with environment variables.

use clap::Parser;
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "config/chaipaani";

#[derive(Debug, Clone, Deserialize)]
pub enum Database {
    #[serde(rename = "memory")]
    Memory,
    #[serde(rename = "sqlite")]
    Sqlite(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
    /// HTTP endpoint of the SMTP relay function; notifications are dropped
    /// when unset.
    pub mail_relay_url: Option<String>,
    pub invitation_ttl_days: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub server: Option<Server>,
}

#[derive(Debug, Parser)]
#[command(name = "chaipaani", disable_version_flag = true)]
struct Args {
    /// Optional config file path (TOML).
    #[arg(long)]
    config: Option<String>,
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        let args = Args::parse();
        let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);

        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("CHAIPAANI").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}
