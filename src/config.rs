//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `hub.toml`.
//!     loads configuration from file or falls back to defaults, then
//!     applies environment overrides (PORT, SECRET_KEY) so a hosted
//!     deployment can configure the process without a file.
//!
//! structure:
//!     - ServerConfig: bind address, port, and the session signing secret.
//!     - LoggingConfig: log level tag and per-update logging toggle.
//!
//! ==============================================================================

use serde::Deserialize;
use std::path::Path;

/// placeholder secret - fine for local development, never for production
pub const INSECURE_SECRET: &str = "default_secret_key";

/// Root configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct HubConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// signing secret for the transport layer; operational concern,
    /// not part of the sync protocol
    #[serde(default = "default_secret")]
    pub secret_key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub show_updates: bool,
}

fn default_secret() -> String {
    INSECURE_SECRET.to_string()
}

impl HubConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        let config: HubConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))?;

        Ok(config)
    }

    /// Load with default fallback, then apply environment overrides
    pub fn load_or_default() -> Self {
        let paths = [
            std::path::PathBuf::from("hub.toml"),
            std::path::PathBuf::from("config").join("hub.toml"),
        ];

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        println!("[CONFIG] Loaded from {}", path.display());
                        return config.with_env_overrides();
                    }
                    Err(e) => {
                        println!("[CONFIG] Warning: Failed to load {}: {}", path.display(), e);
                    }
                }
            }
        }

        println!("[CONFIG] Warning: No config file found - using defaults");
        Self::default().with_env_overrides()
    }

    /// PORT and SECRET_KEY from the process environment win over the file
    fn with_env_overrides(mut self) -> Self {
        if let Ok(port) = std::env::var("PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => println!("[CONFIG] Warning: Ignoring unparseable PORT={}", port),
            }
        }
        if let Ok(secret) = std::env::var("SECRET_KEY") {
            self.server.secret_key = secret;
        }
        self
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("┌─────────────────────────────────────────┐");
        println!("│           HUB CONFIGURATION             │");
        println!("├─────────────────────────────────────────┤");
        println!("│ Bind: {}:{}", self.server.bind, self.server.port);
        println!("│ Log Level: {}", self.logging.level);
        println!("│ Show Updates: {}", self.logging.show_updates);
        println!("└─────────────────────────────────────────┘");
        if self.server.secret_key == INSECURE_SECRET {
            println!("[CONFIG] Warning: SECRET_KEY not set - using insecure placeholder");
        }
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind: "0.0.0.0".to_string(),
                port: 5000,
                secret_key: default_secret(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                show_updates: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_dashboard_deployment() {
        let config = HubConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.server.secret_key, INSECURE_SECRET);
    }

    #[test]
    fn file_without_secret_falls_back_to_placeholder() {
        let config: HubConfig = toml::from_str(
            r#"
            [server]
            bind = "127.0.0.1"
            port = 8080

            [logging]
            level = "info"
            show_updates = false
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.secret_key, INSECURE_SECRET);
        assert!(!config.logging.show_updates);
    }
}
