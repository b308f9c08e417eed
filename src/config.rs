//! Layered configuration.
//!
//! Sources, highest priority first:
//! 1. Environment variables (`SALARY_BOOK_*`, `__` separates sections)
//! 2. `salary-book.toml` in the working directory, or an explicit file
//! 3. Built-in defaults
//!
//! `SALARY_BOOK_DATABASE__PATH` maps to `database.path`,
//! `SALARY_BOOK_WORKSPACE__PREVIEW_LIMIT` to `workspace.preview_limit`.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "salary-book.toml";
pub const ENV_PREFIX: &str = "SALARY_BOOK_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Figment(#[from] figment::Error),

    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// SQLite file holding the warehouse reporting views
    pub path: PathBuf,
    pub read_only: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            path: PathBuf::from("warehouse.db"),
            read_only: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: "0.0.0.0:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WorkspaceConfig {
    /// Rows shown in the sidebar preview
    pub preview_limit: usize,
    /// Hard cap on rows fetched per workspace query
    pub row_limit: usize,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        WorkspaceConfig {
            preview_limit: 14,
            row_limit: 500,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
}

impl AppConfig {
    /// Load from defaults, the config file and the environment, then validate
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let config: AppConfig = Self::figment(config_file).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Provider chain, public so callers can layer extra providers on top
    pub fn figment(config_file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

        match config_file {
            Some(path) => figment = figment.merge(Toml::file(path)),
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                if local.exists() {
                    figment = figment.merge(Toml::file(local));
                }
            }
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workspace.preview_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "workspace.preview_limit".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.workspace.row_limit < self.workspace.preview_limit {
            return Err(ConfigError::InvalidValue {
                field: "workspace.row_limit".to_string(),
                reason: format!(
                    "must be at least preview_limit ({})",
                    self.workspace.preview_limit
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();

        assert_eq!(config.workspace.preview_limit, 14);
        assert_eq!(config.workspace.row_limit, 500);
        assert!(config.database.read_only);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn toml_file_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                DEFAULT_CONFIG_FILE,
                r#"
                [database]
                path = "/srv/warehouse.db"

                [workspace]
                preview_limit = 10
                "#,
            )?;

            let config = AppConfig::load(None).expect("config loads");
            assert_eq!(config.database.path, PathBuf::from("/srv/warehouse.db"));
            assert!(config.database.read_only);
            assert_eq!(config.workspace.preview_limit, 10);
            assert_eq!(config.workspace.row_limit, 500);
            Ok(())
        });
    }

    #[test]
    fn env_beats_toml() {
        Jail::expect_with(|jail| {
            jail.create_file(DEFAULT_CONFIG_FILE, "[server]\nbind = \"127.0.0.1:8080\"\n")?;
            jail.set_env("SALARY_BOOK_SERVER__BIND", "127.0.0.1:9090");
            jail.set_env("SALARY_BOOK_DATABASE__READ_ONLY", "false");

            let config = AppConfig::load(None).expect("config loads");
            assert_eq!(config.server.bind, "127.0.0.1:9090");
            assert!(!config.database.read_only);
            Ok(())
        });
    }

    #[test]
    fn explicit_file_is_used() {
        Jail::expect_with(|jail| {
            jail.create_file("custom.toml", "[workspace]\nrow_limit = 40\n")?;

            let config = AppConfig::load(Some(Path::new("custom.toml"))).expect("config loads");
            assert_eq!(config.workspace.row_limit, 40);
            Ok(())
        });
    }

    #[test]
    fn invalid_limits_are_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("SALARY_BOOK_WORKSPACE__PREVIEW_LIMIT", "20");
            jail.set_env("SALARY_BOOK_WORKSPACE__ROW_LIMIT", "5");

            let err = AppConfig::load(None).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { .. }));
            assert!(err.to_string().contains("workspace.row_limit"));
            Ok(())
        });
    }
}
