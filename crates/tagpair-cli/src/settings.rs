//! Console settings.
//!
//! Loaded from a TOML file, then overridden by `TAGPAIR_*` environment
//! variables, then by command line flags.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use tagpair_core::PairingTable;
use tagpair_core::constants::{DEFAULT_REDIRECT_BASE, DEFAULT_RESET_DELAY_SECS};
use tagpair_flow::FlowConfig;

/// File read when no `--config` is given, if it exists.
pub const DEFAULT_CONFIG_FILE: &str = "tagpair.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Seconds to show the result before restarting.
    pub reset_delay_secs: u64,

    /// Deep link used when in-process NFC is unavailable.
    pub redirect_base: String,

    /// SQLite file backing the session store. In-memory when unset.
    pub store_path: Option<PathBuf>,

    /// Whether the in-process NFC reader is available.
    pub web_nfc: bool,

    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Pairing table, barcode to tag UID.
    pub pairs: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reset_delay_secs: DEFAULT_RESET_DELAY_SECS,
            redirect_base: DEFAULT_REDIRECT_BASE.to_string(),
            store_path: None,
            web_nfc: true,
            log_level: "info".to_string(),
            pairs: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, or from [`DEFAULT_CONFIG_FILE`] if present,
    /// and apply the process environment.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        settings.apply_env(std::env::vars())?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))
    }

    /// Apply `TAGPAIR_*` overrides from `vars`.
    pub fn apply_env<I>(&mut self, vars: I) -> anyhow::Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            match key.as_str() {
                "TAGPAIR_RESET_DELAY_SECS" => {
                    self.reset_delay_secs = value
                        .parse()
                        .with_context(|| format!("invalid {key}: {value}"))?;
                }
                "TAGPAIR_REDIRECT_BASE" => self.redirect_base = value,
                "TAGPAIR_STORE_PATH" => self.store_path = Some(PathBuf::from(value)),
                "TAGPAIR_LOG_LEVEL" => self.log_level = value,
                "TAGPAIR_WEB_NFC" => {
                    self.web_nfc = parse_flag(&value)
                        .with_context(|| format!("invalid {key}: {value}"))?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn flow_config(&self) -> FlowConfig {
        FlowConfig::new()
            .reset_delay(Duration::from_secs(self.reset_delay_secs))
            .redirect_base(self.redirect_base.clone())
    }

    /// The configured pairing table, or `None` if the file lists no pairs.
    pub fn pairing_table(&self) -> anyhow::Result<Option<PairingTable>> {
        if self.pairs.is_empty() {
            return Ok(None);
        }
        let table = PairingTable::from_pairs(
            self.pairs.iter().map(|(b, t)| (b.as_str(), t.as_str())),
        )
        .context("invalid [pairs] entry")?;
        Ok(Some(table))
    }
}

fn parse_flag(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("expected a boolean, got '{other}'"),
    }
}
