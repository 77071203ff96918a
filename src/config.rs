//! Persistent application configuration model and defaults.

use std::time::Duration;

use crate::backends::google_sheets::{DEFAULT_DRIVE_API_BASE_URL, DEFAULT_SHEETS_API_BASE_URL};
use crate::backends::igdb::DEFAULT_API_BASE_URL;
use crate::backends::twitch::DEFAULT_TOKEN_URL;
use crate::metadata_client::{SearchOptions, DEFAULT_RESULT_LIMIT, STEAM_WEBSITE_CATEGORY};
use crate::rate_limiter::DEFAULT_REQUEST_INTERVAL;

const MAX_RESULT_LIMIT: u32 = 500;

/// Root configuration persisted to `game_lookup.toml`.
///
/// Secrets are kept in the system keyring, never here.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    #[serde(default)]
    /// IGDB search preferences.
    pub igdb: IgdbConfig,
    #[serde(default)]
    /// Twitch app-token exchange.
    pub twitch: TwitchConfig,
    #[serde(default)]
    /// Spreadsheet location and API endpoints.
    pub sheets: SheetsConfig,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct IgdbConfig {
    /// Twitch application client id.
    #[serde(default)]
    pub client_id: String,
    #[serde(default = "default_igdb_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_result_limit")]
    pub result_limit: u32,
    /// IGDB website category for storefront links (13 = Steam).
    #[serde(default = "default_storefront_category")]
    pub storefront_category: u32,
    #[serde(default = "default_request_interval_ms")]
    pub request_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct TwitchConfig {
    #[serde(default = "default_token_url")]
    pub token_url: String,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct SheetsConfig {
    /// A1 range holding the game rows.
    #[serde(default = "default_range")]
    pub range: String,
    #[serde(default = "default_sheets_api_base_url")]
    pub sheets_api_base_url: String,
    #[serde(default = "default_drive_api_base_url")]
    pub drive_api_base_url: String,
}

fn default_igdb_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_result_limit() -> u32 {
    DEFAULT_RESULT_LIMIT
}

fn default_storefront_category() -> u32 {
    STEAM_WEBSITE_CATEGORY
}

fn default_request_interval_ms() -> u64 {
    DEFAULT_REQUEST_INTERVAL.as_millis() as u64
}

fn default_token_url() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

fn default_range() -> String {
    "A:H".to_string()
}

fn default_sheets_api_base_url() -> String {
    DEFAULT_SHEETS_API_BASE_URL.to_string()
}

fn default_drive_api_base_url() -> String {
    DEFAULT_DRIVE_API_BASE_URL.to_string()
}

impl Default for IgdbConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            api_base_url: default_igdb_api_base_url(),
            result_limit: default_result_limit(),
            storefront_category: default_storefront_category(),
            request_interval_ms: default_request_interval_ms(),
        }
    }
}

impl Default for TwitchConfig {
    fn default() -> Self {
        Self {
            token_url: default_token_url(),
        }
    }
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            range: default_range(),
            sheets_api_base_url: default_sheets_api_base_url(),
            drive_api_base_url: default_drive_api_base_url(),
        }
    }
}

impl IgdbConfig {
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            result_limit: self.result_limit,
            storefront_category: self.storefront_category,
        }
    }

    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms)
    }
}

/// Clamps loaded values into ranges the pipeline can use.
pub fn sanitize_config(mut config: Config) -> Config {
    config.igdb.client_id = config.igdb.client_id.trim().to_string();
    config.igdb.result_limit = config.igdb.result_limit.clamp(1, MAX_RESULT_LIMIT);
    config.igdb.request_interval_ms = config.igdb.request_interval_ms.max(1);
    if config.sheets.range.trim().is_empty() {
        config.sheets.range = default_range();
    }
    config
}
