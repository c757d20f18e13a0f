use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Application configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub interpreter: InterpreterConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: Option<String>,
    pub format: String, // "json" or "text"
}

/// Tunables of the message pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterpreterConfig {
    /// Rows rendered in a simple-query reply
    pub response_row_limit: usize,
    /// Upper bound on shortcut rewrites per message
    pub max_shortcut_depth: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            response_row_limit: 25,
            max_shortcut_depth: 16,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                path: "data/tables.db".to_string(),
                max_connections: 10,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: None,
                format: "text".to_string(),
            },
            interpreter: InterpreterConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, `config/default`, `config/local`,
    /// then `TABLES_SMS__SECTION__KEY` environment variables
    pub fn load() -> Result<Self> {
        Self::load_from(&["config/default", "config/local"])
    }

    /// Load configuration layering the named files (extension optional) over
    /// the defaults; missing files are skipped
    pub fn load_from(files: &[&str]) -> Result<Self> {
        let defaults = Self::default();
        let mut builder = Config::builder()
            .set_default("database.path", defaults.database.path)?
            .set_default("database.max_connections", i64::from(defaults.database.max_connections))?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.format", defaults.logging.format)?
            .set_default(
                "interpreter.response_row_limit",
                defaults.interpreter.response_row_limit as i64,
            )?
            .set_default(
                "interpreter.max_shortcut_depth",
                defaults.interpreter.max_shortcut_depth as i64,
            )?;

        for file in files {
            builder = builder.add_source(File::with_name(file).required(false));
        }

        let config = builder
            .add_source(Environment::with_prefix("TABLES_SMS").separator("__"))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        let app_config: AppConfig = config
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Failed to deserialize configuration: {}", e))?;

        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(anyhow::anyhow!("database path must not be empty"));
        }
        if self.database.max_connections == 0 {
            return Err(anyhow::anyhow!("max_connections must be greater than 0"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            ));
        }

        if self.interpreter.response_row_limit == 0 {
            return Err(anyhow::anyhow!("response_row_limit must be greater than 0"));
        }
        if self.interpreter.max_shortcut_depth == 0 {
            return Err(anyhow::anyhow!("max_shortcut_depth must be greater than 0"));
        }

        Ok(())
    }

    /// Get log level from environment or config
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.database.path, "data/tables.db");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.interpreter.response_row_limit, 25);
    }

    #[test]
    fn test_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let mut config = AppConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.interpreter.max_shortcut_depth = 0;
        assert!(config.validate().is_err());
    }
}
