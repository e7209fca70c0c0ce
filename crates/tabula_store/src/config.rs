use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use tabula_core::{GridError, GridResult};

use crate::DEFAULT_DB_NAME;

pub const DEFAULT_CONFIG_NAME: &str = "tabula.json";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum DatabaseConfig {
    Sqlite { path: Option<String> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub foreign_keys: Option<bool>,
    pub busy_timeout_ms: Option<u64>,
}

impl SessionConfig {
    pub fn with_defaults() -> Self {
        Self {
            foreign_keys: Some(true),
            busy_timeout_ms: Some(5_000),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabulaConfig {
    pub database: DatabaseConfig,
    pub session: Option<SessionConfig>,
}

impl TabulaConfig {
    pub fn default_sqlite(path: impl Into<String>) -> Self {
        Self {
            database: DatabaseConfig::Sqlite {
                path: Some(path.into()),
            },
            session: Some(SessionConfig::with_defaults()),
        }
    }

    /// Read `tabula.json` from `base_dir`, writing the defaults there first if
    /// the file does not exist yet.
    pub fn load_or_init(base_dir: &Path) -> GridResult<Self> {
        let config_path = base_dir.join(DEFAULT_CONFIG_NAME);
        match fs::read_to_string(&config_path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|err| {
                GridError::config(format!("{}: {err}", config_path.display()))
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                let config = Self::default_sqlite(DEFAULT_DB_NAME);
                config.write(base_dir)?;
                debug!("tabula: wrote default config to {}", config_path.display());
                Ok(config)
            }
            Err(err) => Err(GridError::storage(format!(
                "read {}: {err}",
                config_path.display()
            ))),
        }
    }

    pub fn write(&self, base_dir: &Path) -> GridResult<()> {
        fs::create_dir_all(base_dir).map_err(|err| {
            GridError::storage(format!("create {}: {err}", base_dir.display()))
        })?;
        let payload = serde_json::to_string_pretty(self)
            .map_err(|err| GridError::config(format!("encode config: {err}")))?;
        let config_path = base_dir.join(DEFAULT_CONFIG_NAME);
        fs::write(&config_path, payload)
            .map_err(|err| GridError::storage(format!("write {}: {err}", config_path.display())))
    }

    /// Database file, with relative paths taken from `base_dir`.
    pub fn sqlite_path(&self, base_dir: &Path) -> PathBuf {
        let DatabaseConfig::Sqlite { path } = &self.database;
        let candidate = PathBuf::from(path.as_deref().unwrap_or(DEFAULT_DB_NAME));
        if candidate.is_absolute() {
            candidate
        } else {
            base_dir.join(candidate)
        }
    }

    pub fn foreign_keys(&self) -> bool {
        self.session
            .as_ref()
            .and_then(|session| session.foreign_keys)
            .unwrap_or(true)
    }

    pub fn busy_timeout_ms(&self) -> Option<u64> {
        self.session
            .as_ref()
            .and_then(|session| session.busy_timeout_ms)
    }
}
