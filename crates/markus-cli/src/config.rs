// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use markus_app::SortKey;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Level;

const CONFIG_VERSION: i64 = 1;
const DEFAULT_LOG_LEVEL: &str = "info";
const LOG_FILE_NAME: &str = "markus.log";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            storage: Storage::default(),
            ui: Ui::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Storage {
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub sort: Option<String>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            sort: Some(SortKey::Newest.as_str().to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub path: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
            path: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("MARKUS_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set MARKUS_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(markus_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version; add `version = 1` at the top and keep values under [storage], [ui], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1. Run `markus --print-example-config` for a template",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(db_path) = &self.storage.db_path {
            markus_db::validate_db_path(db_path)?;
        }

        if let Some(sort) = &self.ui.sort
            && SortKey::parse(sort).is_none()
        {
            bail!(
                "ui.sort in {} must be one of newest, oldest, az, za; got {sort:?}",
                path.display()
            );
        }

        if let Some(level) = &self.log.level {
            parse_level(level)
                .with_context(|| format!("invalid log.level in {}", path.display()))?;
        }

        if let Some(log_path) = &self.log.path
            && log_path.trim().is_empty()
        {
            bail!(
                "log.path in {} must not be empty; remove it to use the default",
                path.display()
            );
        }

        Ok(())
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => markus_db::default_db_path(),
        }
    }

    pub fn sort_key(&self) -> SortKey {
        self.ui
            .sort
            .as_deref()
            .and_then(SortKey::parse)
            .unwrap_or(SortKey::Newest)
    }

    pub fn log_level(&self) -> Level {
        self.log
            .level
            .as_deref()
            .and_then(|level| parse_level(level).ok())
            .unwrap_or(Level::INFO)
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        match &self.log.path {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(markus_db::data_dir()?.join(LOG_FILE_NAME)),
        }
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# markus config\n# Place this file at: {}\n\nversion = 1\n\n[storage]\n# Optional. Default is platform data dir (for example ~/.local/share/markus/markus.db)\n# db_path = \"/absolute/path/to/markus.db\"\n\n[ui]\n# newest, oldest, az, or za\nsort = \"newest\"\n\n[log]\n# error, warn, info, debug, or trace\nlevel = \"{DEFAULT_LOG_LEVEL}\"\n# path = \"/absolute/path/to/markus.log\"\n",
            path.display(),
        )
    }
}

fn parse_level(raw: &str) -> Result<Level> {
    raw.trim().parse::<Level>().map_err(|_| {
        anyhow!("invalid log level {raw:?}; use one of: error, warn, info, debug, trace")
    })
}
