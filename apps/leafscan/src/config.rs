use std::{fs, path::Path};

use anyhow::{bail, Context};
use serde::Deserialize;
use shared::protocol::DEFAULT_SERVICE_URL;
use tracing::warn;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "leafscan.toml";

/// Front-end settings. The request timeout is not among them: every analysis
/// is bounded by `client_core::REQUEST_TIMEOUT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub service_url: String,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.into(),
            log_filter: "info".into(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> anyhow::Result<()> {
        let url = Url::parse(&self.service_url)
            .with_context(|| format!("invalid service url '{}'", self.service_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("service url '{}' must use http or https", self.service_url);
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    service_url: Option<String>,
    log_filter: Option<String>,
}

pub fn load_settings(config_path: Option<&Path>) -> Settings {
    let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    load_settings_from(path, |key| std::env::var(key).ok())
}

/// Defaults, then the TOML file (if readable), then environment overrides.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.service_url {
                    settings.service_url = v;
                }
                if let Some(v) = file_cfg.log_filter {
                    settings.log_filter = v;
                }
            }
            Err(error) => warn!(path = %path.display(), %error, "ignoring unreadable config file"),
        }
    }

    if let Some(v) = env("LEAFSCAN_SERVICE_URL") {
        settings.service_url = v;
    }
    if let Some(v) = env("APP__SERVICE_URL") {
        settings.service_url = v;
    }

    if let Some(v) = env("RUST_LOG") {
        settings.log_filter = v;
    }
    if let Some(v) = env("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    settings
}
