//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The Sheets access token and the Twilio auth token are loaded from env vars
//! or token files, never stored in the TOML directly.

use common::{Secret, load_secret};
use credential_pool::{DEFAULT_MESSAGE_TEMPLATE, DEFAULT_USED_MARKER, SheetLayout};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub sheets: Option<SheetsConfig>,
    #[serde(default)]
    pub twilio: Option<TwilioConfig>,
    /// Serve canned rows from memory instead of a live sheet
    #[serde(default)]
    pub demo: bool,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// Table shape
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    #[default]
    Single,
    Five,
}

/// Pool behavior
#[derive(Debug, Deserialize)]
pub struct PoolConfig {
    #[serde(default)]
    pub layout: LayoutKind,
    /// Overrides the preset's slot count
    #[serde(default)]
    pub slot_count: Option<usize>,
    /// Overrides the preset's status column
    #[serde(default)]
    pub status_column: Option<String>,
    #[serde(default = "default_used_marker")]
    pub used_marker: String,
    #[serde(default = "default_store_timeout")]
    pub store_timeout_secs: u64,
    #[serde(default = "default_message_template")]
    pub message_template: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            layout: LayoutKind::default(),
            slot_count: None,
            status_column: None,
            used_marker: default_used_marker(),
            store_timeout_secs: default_store_timeout(),
            message_template: default_message_template(),
        }
    }
}

impl PoolConfig {
    /// Build the table layout from the preset plus overrides.
    pub fn sheet_layout(&self) -> credential_pool::Result<SheetLayout> {
        let preset = match self.layout {
            LayoutKind::Single => SheetLayout::single_slot(),
            LayoutKind::Five => SheetLayout::five_slot(),
        };
        SheetLayout::new(
            self.slot_count.unwrap_or(preset.slot_count()),
            self.status_column.as_deref().unwrap_or(preset.status_column()),
            &self.used_marker,
        )
    }
}

/// Google Sheets store settings
#[derive(Debug, Deserialize)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
    #[serde(default = "default_sheets_api_base")]
    pub api_base: String,
    #[serde(skip)]
    pub access_token: Option<Secret<String>>,
    /// Path to a file containing the access token (alternative to SHEETS_ACCESS_TOKEN)
    #[serde(default)]
    pub access_token_file: Option<PathBuf>,
}

/// Twilio SMS settings
#[derive(Debug, Deserialize)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub from_number: String,
    #[serde(default = "default_twilio_api_base")]
    pub api_base: String,
    #[serde(skip)]
    pub auth_token: Option<Secret<String>>,
    /// Path to a file containing the auth token (alternative to TWILIO_AUTH_TOKEN)
    #[serde(default)]
    pub auth_token_file: Option<PathBuf>,
}

fn default_max_connections() -> usize {
    1000
}

fn default_used_marker() -> String {
    DEFAULT_USED_MARKER.to_string()
}

fn default_store_timeout() -> u64 {
    10
}

fn default_message_template() -> String {
    DEFAULT_MESSAGE_TEMPLATE.to_string()
}

fn default_sheet_name() -> String {
    "Sheet1".to_string()
}

fn default_sheets_api_base() -> String {
    pool_store::sheets::DEFAULT_API_BASE.to_string()
}

fn default_twilio_api_base() -> String {
    notifier::twilio::DEFAULT_API_BASE.to_string()
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Token resolution order for both Sheets and Twilio:
    /// 1. env var (SHEETS_ACCESS_TOKEN / TWILIO_AUTH_TOKEN)
    /// 2. token file path from config
    ///
    /// FORCE_DEMO=true (or 1) switches on demo mode.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if config.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        if config.pool.store_timeout_secs == 0 {
            return Err(common::Error::Config(
                "store_timeout_secs must be greater than 0".into(),
            ));
        }

        config
            .pool
            .sheet_layout()
            .map_err(|e| common::Error::Config(e.to_string()))?;

        if let Some(sheets) = config.sheets.as_mut() {
            if sheets.spreadsheet_id.trim().is_empty() {
                return Err(common::Error::Config(
                    "sheets.spreadsheet_id must not be empty".into(),
                ));
            }
            sheets.access_token =
                load_secret("SHEETS_ACCESS_TOKEN", sheets.access_token_file.as_deref())?;
        }

        if let Some(twilio) = config.twilio.as_mut() {
            twilio.auth_token = load_secret("TWILIO_AUTH_TOKEN", twilio.auth_token_file.as_deref())?;
        }

        if let Ok(value) = std::env::var("FORCE_DEMO") {
            if matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes") {
                config.demo = true;
            }
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("credential-gateway.toml")
    }

    /// Sheets settings with a resolved token, unless demo mode is on.
    pub fn live_sheets(&self) -> Option<(&SheetsConfig, &Secret<String>)> {
        if self.demo {
            return None;
        }
        let sheets = self.sheets.as_ref()?;
        let token = sheets.access_token.as_ref()?;
        Some((sheets, token))
    }
}
