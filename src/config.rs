use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::channel::ReconnectPolicy;
use crate::ingest::MergePolicy;
use crate::predict::ViscosityModel;

/// Points at an optional JSON config file.
pub const CONFIG_PATH_ENV: &str = "MILKDASH_CONFIG";
pub const PORT_ENV: &str = "PORT";
pub const ASSETS_DIR_ENV: &str = "MILKDASH_ASSETS_DIR";
pub const DEBUG_ENV: &str = "MILKDASH_DEBUG";

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    pub port: u16,
    /// Prebuilt front-end bundle served at `/`.
    pub assets_dir: PathBuf,
    /// Rows kept for new connections and full-window ticks.
    pub window_size: usize,
    pub tick_interval_ms: u64,
    /// Send the whole rolling window every tick instead of only the newest row.
    pub send_full_window: bool,
    /// Front-end dev server allowed through CORS.
    pub allowed_origin: Option<String>,
    pub model: ViscosityModel,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            assets_dir: PathBuf::from("dist"),
            window_size: 20,
            tick_interval_ms: 1000,
            send_full_window: true,
            allowed_origin: Some("http://localhost:5173".into()),
            model: ViscosityModel::default(),
        }
    }
}

impl ServerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    /// Push channel endpoint.
    pub endpoint: String,
    pub predict_url: String,
    pub reconnect: ReconnectPolicy,
    pub merge_policy: MergePolicy,
    /// Sparkline width in cells for `watch`.
    pub chart_width: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: format!("ws://127.0.0.1:{DEFAULT_PORT}/ws"),
            predict_url: format!("http://127.0.0.1:{DEFAULT_PORT}/predict"),
            reconnect: ReconnectPolicy::default(),
            merge_policy: MergePolicy::default(),
            chart_width: 40,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub client: ClientConfig,
    #[serde(skip)]
    pub debug: bool,
}

impl Config {
    /// Defaults, then the file named by `MILKDASH_CONFIG`, then the environment.
    pub fn load() -> Result<Self> {
        let mut config = match env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_env(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config in {}", path.display()))
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(port) = lookup(PORT_ENV) {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("{PORT_ENV}={port} is not a valid port"))?;
        }
        if let Some(dir) = lookup(ASSETS_DIR_ENV) {
            self.server.assets_dir = PathBuf::from(dir);
        }
        self.debug = lookup(DEBUG_ENV)
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        Ok(())
    }
}
