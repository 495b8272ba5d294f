use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use super::network_sim::NetworkSimConfig;
use super::schema::SchemaConfig;
use super::server::ServerConfig;
use super::simulation::SimulationConfig;

/// Root configuration, composed of the per-concern sections below.
///
/// Loaded via [`super::loader::load`]: compiled defaults, layered with an
/// optional `config.json`, layered with `SHOOTER__<SECTION>__<FIELD>`
/// environment overrides, layered with the three literally-named
/// environment variables the spec calls out directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    pub server: ServerConfig,
    pub simulation: SimulationConfig,
    pub schema: SchemaConfig,
    pub logging: LoggingConfig,
    pub network_sim: NetworkSimConfig,
    pub cors_origins: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3838,
            server: ServerConfig::default(),
            simulation: SimulationConfig::default(),
            schema: SchemaConfig::default(),
            logging: LoggingConfig::default(),
            network_sim: NetworkSimConfig::default(),
            cors_origins: "*".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_json() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let deserialized: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.port, 3838);
        assert_eq!(config.server.room_capacity, 2);
        assert_eq!(config.server.sim_tick_hz, 20);
    }
}
