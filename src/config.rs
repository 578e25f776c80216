//! Runtime configuration
//!
//! Everything is read from the environment (a `.env` file is loaded by the
//! binary first). Unparseable numbers fall back to their defaults.

use std::net::SocketAddr;
use std::str::FromStr;

use tracing::warn;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_POKEAPI_BASE_URL: &str = "https://pokeapi.co/api/v2";
pub const DEFAULT_POKEAPI_TIMEOUT_SECS: u64 = 10;

/// Which catalog backend the server runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    Memory,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(StoreKind::Postgres),
            "memory" | "mem" => Ok(StoreKind::Memory),
            other => Err(format!("unknown store kind '{}'", other)),
        }
    }
}

/// Upstream lookup settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

impl LookupConfig {
    pub fn from_lookup(env: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            base_url: env("POKEAPI_BASE_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_POKEAPI_BASE_URL.to_string()),
            timeout_secs: parse_or_default(
                &env,
                "POKEAPI_TIMEOUT_SECS",
                DEFAULT_POKEAPI_TIMEOUT_SECS,
            ),
        }
    }
}

/// Server settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub store: StoreKind,
    pub lookup: LookupConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

impl ServerConfig {
    pub fn from_lookup(env: impl Fn(&str) -> Option<String>) -> Self {
        let default_addr: SocketAddr = ([0, 0, 0, 0], 8000).into();
        Self {
            bind_addr: parse_or_default(&env, "POKEMON_BIND_ADDR", default_addr),
            store: parse_or_default(&env, "POKEMON_STORE", StoreKind::Postgres),
            lookup: LookupConfig::from_lookup(&env),
        }
    }
}

fn parse_or_default<T>(env: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr,
{
    match env(key) {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("Ignoring invalid {}='{}', using default", key, raw);
                default
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(env(&[]));
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.store, StoreKind::Postgres);
        assert_eq!(config.lookup.base_url, DEFAULT_POKEAPI_BASE_URL);
        assert_eq!(config.lookup.timeout_secs, 10);
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(env(&[
            ("POKEMON_BIND_ADDR", "127.0.0.1:9000"),
            ("POKEMON_STORE", "memory"),
            ("POKEAPI_BASE_URL", "http://localhost:4000/api/v2"),
            ("POKEAPI_TIMEOUT_SECS", "3"),
        ]));
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.store, StoreKind::Memory);
        assert_eq!(config.lookup.base_url, "http://localhost:4000/api/v2");
        assert_eq!(config.lookup.timeout_secs, 3);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = ServerConfig::from_lookup(env(&[
            ("POKEMON_BIND_ADDR", "nowhere"),
            ("POKEMON_STORE", "redis"),
            ("POKEAPI_TIMEOUT_SECS", "soon"),
        ]));
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.store, StoreKind::Postgres);
        assert_eq!(config.lookup.timeout_secs, DEFAULT_POKEAPI_TIMEOUT_SECS);
    }
}
