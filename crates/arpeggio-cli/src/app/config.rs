use std::path::{Path, PathBuf};

use arpeggio_core::ArpeggioRequest;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub(crate) struct AppConfig {
    /// URL or path of the sound used when nothing was uploaded or recorded
    pub default_sound: String,
    /// Directives added on top of RUST_LOG
    pub log_filter: String,
    /// Sample rate for `export`
    pub export_sample_rate: u32,
    pub arpeggio: ArpeggioRequest,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_sound: "sounds/default.wav".into(),
            log_filter: "arpeggio=info".into(),
            export_sample_rate: 44100,
            arpeggio: ArpeggioRequest::default(),
        }
    }
}

pub(crate) fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("arpeggio")
        .join("config.toml")
}

pub(crate) fn load_config() -> AppConfig {
    load_config_from(&config_path())
}

pub(crate) fn load_config_from(path: &Path) -> AppConfig {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|s| toml::from_str(&s).ok())
        .unwrap_or_default()
}

pub(crate) fn save_config(config: &AppConfig) -> std::io::Result<()> {
    save_config_to(config, &config_path())
}

pub(crate) fn save_config_to(config: &AppConfig, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let s = toml::to_string_pretty(config).map_err(std::io::Error::other)?;
    std::fs::write(path, s)
}
