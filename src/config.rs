//! Daemon configuration
//!
//! Defaults, overlaid by an optional TOML file, overlaid by `ARENAD_`
//! environment variables.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::engine::EngineConfig;
use crate::error::ServerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// How long a defender gets to pick a defense before none is taken
    pub defense_timeout_ms: u64,
    /// How long a reactor gets before the reaction is declined
    pub reaction_timeout_ms: u64,
    /// Pause before a bot acts, so turns are followable
    pub bot_think_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            defense_timeout_ms: 30_000,
            reaction_timeout_ms: 30_000,
            bot_think_delay_ms: 1_500,
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self, ServerError> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment
            .merge(Env::prefixed("ARENAD_"))
            .extract()
            .map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            defense_timeout: Duration::from_millis(self.defense_timeout_ms),
            reaction_timeout: Duration::from_millis(self.reaction_timeout_ms),
            bot_think_delay: Duration::from_millis(self.bot_think_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.defense_timeout_ms, 30_000);
        assert_eq!(config.engine().bot_think_delay, Duration::from_millis(1_500));
    }

    #[test]
    fn test_file_and_env_overlay() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "arenad.toml",
                r#"
                bind_addr = "0.0.0.0:9000"
                defense_timeout_ms = 5000
                "#,
            )?;
            jail.set_env("ARENAD_BOT_THINK_DELAY_MS", "10");

            let config = Config::load(Some(Path::new("arenad.toml"))).unwrap();
            assert_eq!(config.bind_addr.port(), 9000);
            assert_eq!(config.defense_timeout_ms, 5000);
            assert_eq!(config.bot_think_delay_ms, 10);
            // untouched keys keep their defaults
            assert_eq!(config.reaction_timeout_ms, 30_000);
            Ok(())
        });
    }
}
