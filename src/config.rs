use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::game::constants::{population, tick, world};
use crate::game::state::{clamp_count, clamp_grid_dimension, clamp_tick_ms};

/// Which world store backs the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    Sqlite(PathBuf),
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to
    pub bind_address: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// World store backend
    pub store: StoreKind,
    /// Drive ticks from a server-side timer in addition to client calls
    pub server_tick: bool,
    /// Serve `/metrics` and `/metrics/json`
    pub metrics_enabled: bool,
    /// Values for the world record when it is first created
    pub world: WorldDefaults,
}

/// Initial values of the singleton world record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldDefaults {
    pub grid_width: u32,
    pub grid_height: u32,
    pub tick_ms: u32,
    pub max_fruits: u32,
    pub target_bots: u32,
}

impl Default for WorldDefaults {
    fn default() -> Self {
        Self {
            grid_width: world::DEFAULT_GRID_WIDTH,
            grid_height: world::DEFAULT_GRID_HEIGHT,
            tick_ms: tick::DEFAULT_TICK_MS,
            max_fruits: population::DEFAULT_MAX_FRUITS,
            target_bots: population::DEFAULT_TARGET_BOTS,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 8080,
            store: StoreKind::Memory,
            server_tick: false,
            metrics_enabled: true,
            world: WorldDefaults::default(),
        }
    }
}

impl ServerConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("BIND_ADDRESS") {
            if let Ok(parsed) = addr.parse() {
                config.bind_address = parsed;
            } else {
                tracing::warn!("Invalid BIND_ADDRESS '{}', using default", addr);
            }
        }

        if let Ok(port) = std::env::var("PORT") {
            if let Ok(parsed) = port.parse::<u16>() {
                if parsed > 0 {
                    config.port = parsed;
                } else {
                    tracing::warn!("PORT must be > 0, using default");
                }
            } else {
                tracing::warn!("Invalid PORT '{}', using default", port);
            }
        }

        let store_path = std::env::var("STORE_PATH").unwrap_or_else(|_| "data/arena.db".to_string());
        if let Ok(kind) = std::env::var("STORE") {
            match kind.to_ascii_lowercase().as_str() {
                "memory" => config.store = StoreKind::Memory,
                "sqlite" => config.store = StoreKind::Sqlite(PathBuf::from(store_path)),
                _ => tracing::warn!("Invalid STORE '{}', using in-memory store", kind),
            }
        }

        config.server_tick = env_flag("SERVER_TICK", config.server_tick);
        config.metrics_enabled = env_flag("METRICS_ENABLED", config.metrics_enabled);

        if let Some(v) = env_number("GRID_WIDTH") {
            config.world.grid_width = clamp_grid_dimension(v);
        }
        if let Some(v) = env_number("GRID_HEIGHT") {
            config.world.grid_height = clamp_grid_dimension(v);
        }
        if let Some(v) = env_number("TICK_MS") {
            config.world.tick_ms = clamp_tick_ms(v);
        }
        if let Some(v) = env_number("MAX_FRUITS") {
            config.world.max_fruits = clamp_count(v);
        }
        if let Some(v) = env_number("TARGET_BOTS") {
            config.world.target_bots = clamp_count(v);
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("Port cannot be 0".to_string());
        }
        if self.world.tick_ms < tick::MIN_TICK_MS {
            return Err(format!("tick_ms must be at least {}", tick::MIN_TICK_MS));
        }
        if self.world.grid_width < world::MIN_GRID_DIMENSION
            || self.world.grid_height < world::MIN_GRID_DIMENSION
        {
            return Err(format!(
                "grid dimensions must be at least {}",
                world::MIN_GRID_DIMENSION
            ));
        }
        if let StoreKind::Sqlite(path) = &self.store {
            if path.as_os_str().is_empty() {
                return Err("STORE_PATH cannot be empty".to_string());
            }
        }
        Ok(())
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                tracing::warn!("Invalid {} '{}', using default", name, v);
                default
            }
        },
        Err(_) => default,
    }
}

fn env_number(name: &str) -> Option<f64> {
    let raw = std::env::var(name).ok()?;
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            tracing::warn!("Invalid {} '{}', using default", name, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.store, StoreKind::Memory);
        assert!(!config.server_tick);
        assert!(config.metrics_enabled);
        assert_eq!(config.world, WorldDefaults::default());
    }

    #[test]
    fn test_world_defaults() {
        let world = WorldDefaults::default();
        assert_eq!(world.grid_width, 40);
        assert_eq!(world.grid_height, 28);
        assert_eq!(world.tick_ms, 120);
        assert_eq!(world.max_fruits, 6);
        assert_eq!(world.target_bots, 3);
    }

    #[test]
    fn test_load_or_default() {
        let config = ServerConfig::load_or_default();
        assert!(config.port > 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_counts_are_clamped() {
        std::env::set_var("MAX_FRUITS", "-4");
        std::env::set_var("TARGET_BOTS", "7.9");
        let config = ServerConfig::load_or_default();
        std::env::remove_var("MAX_FRUITS");
        std::env::remove_var("TARGET_BOTS");

        assert_eq!(config.world.max_fruits, 0);
        assert_eq!(config.world.target_bots, 7);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ServerConfig::default();
        config.port = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.world.tick_ms = 10;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.world.grid_height = 4;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.store = StoreKind::Sqlite(PathBuf::new());
        assert!(config.validate().is_err());
    }
}
