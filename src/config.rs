use crate::face::MATCH_THRESHOLD;
use crate::purchase::DeskConfig;
use lazy_static::lazy_static;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

lazy_static! {
    pub static ref CONFIG: Config = Config::from_env();
}

pub struct Config {
    pub port: u16,
    pub records_url: String,
    pub records_key: Option<String>,
    pub records_version: String,
    pub customer_db_id: Option<String>,
    pub consultation_db_id: Option<String>,
    pub income_db_id: Option<String>,
    pub match_threshold: f64,
    pub storage_dir: String,
    pub owner_name: String,
    pub owner_pin: String,
    pub session_idle: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            records_url: "https://api.notion.com".to_string(),
            records_key: None,
            records_version: "2022-06-28".to_string(),
            customer_db_id: None,
            consultation_db_id: None,
            income_db_id: None,
            match_threshold: MATCH_THRESHOLD,
            storage_dir: "./storage".to_string(),
            owner_name: "master".to_string(),
            owner_pin: "0000".to_string(),
            session_idle: Duration::from_secs(5 * 60),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let records_key = optional("NOTION_API_KEY");
        if records_key.is_none() {
            warn!("NOTION_API_KEY not set, records service calls will be rejected");
        }
        let owner_pin = optional("PURCHASE_OWNER_PIN").unwrap_or_else(|| {
            warn!("PURCHASE_OWNER_PIN not set, the seeded owner account uses the default pin");
            defaults.owner_pin.clone()
        });

        Self {
            port: try_load("PORT", defaults.port),
            records_url: optional("NOTION_API_URL").unwrap_or(defaults.records_url),
            records_key,
            records_version: optional("NOTION_VERSION").unwrap_or(defaults.records_version),
            customer_db_id: optional("NOTION_CUSTOMER_DB_ID"),
            consultation_db_id: optional("NOTION_CONSULTATION_DB_ID"),
            income_db_id: optional("NOTION_DATABASE_ID"),
            match_threshold: try_load("FACE_MATCH_THRESHOLD", defaults.match_threshold),
            storage_dir: optional("PURCHASE_STORAGE_DIR").unwrap_or(defaults.storage_dir),
            owner_name: optional("PURCHASE_OWNER_NAME").unwrap_or(defaults.owner_name),
            owner_pin,
            session_idle: Duration::from_secs(
                60 * try_load("SESSION_IDLE_MINUTES", defaults.session_idle.as_secs() / 60),
            ),
        }
    }

    pub fn desk(&self) -> DeskConfig {
        DeskConfig {
            storage_dir: self.storage_dir.clone(),
            owner_name: self.owner_name.clone(),
            owner_pin: self.owner_pin.clone(),
            idle_timeout: self.session_idle,
        }
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match optional(key) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("invalid {} value {:?}: {}, using default: {}", key, raw, e, default);
            default
        }),
    }
}
