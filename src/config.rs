// src/config.rs

use crate::error::{RelayError, Result};
use crate::models::RoomKeying;
use std::{net::SocketAddr, str::FromStr};

pub const BIND_ADDR_VAR: &str = "RELAY_BIND_ADDR";
pub const OUTBOUND_BUFFER_VAR: &str = "RELAY_OUTBOUND_BUFFER";
pub const ROOM_KEYING_VAR: &str = "RELAY_ROOM_KEYING";

/// Runtime configuration for the relay process.
#[derive(Clone, Debug, PartialEq)]
pub struct RelayConfig {
    /// Address the HTTP/WebSocket listener binds to.
    pub bind_addr: SocketAddr,
    /// Per-connection outbound queue capacity. Messages for a member whose
    /// queue is full are dropped for that member only.
    pub outbound_buffer: usize,
    /// How participant pairs map onto rooms.
    pub room_keying: RoomKeying,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            outbound_buffer: 64,
            room_keying: RoomKeying::Ordered,
        }
    }
}

impl RelayConfig {
    /// Builds a config from the process environment, starting from the defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(BIND_ADDR_VAR) {
            config.bind_addr = parse_var(BIND_ADDR_VAR, &value)?;
        }
        if let Some(value) = lookup(OUTBOUND_BUFFER_VAR) {
            config.outbound_buffer = parse_var(OUTBOUND_BUFFER_VAR, &value)?;
        }
        if let Some(value) = lookup(ROOM_KEYING_VAR) {
            config.room_keying = parse_var(ROOM_KEYING_VAR, &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.outbound_buffer == 0 {
            return Err(RelayError::Config(format!(
                "{OUTBOUND_BUFFER_VAR} must be at least 1"
            )));
        }
        Ok(())
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| RelayError::Config(format!("{name}={value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = RelayConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, RelayConfig::default());
        assert_eq!(config.room_keying, RoomKeying::Ordered);
    }

    #[test]
    fn overrides_are_applied() {
        let config = RelayConfig::from_lookup(lookup_from(&[
            (BIND_ADDR_VAR, "127.0.0.1:4000"),
            (OUTBOUND_BUFFER_VAR, "8"),
            (ROOM_KEYING_VAR, "canonical"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr, SocketAddr::from(([127, 0, 0, 1], 4000)));
        assert_eq!(config.outbound_buffer, 8);
        assert_eq!(config.room_keying, RoomKeying::Canonical);
    }

    #[test]
    fn bad_values_are_errors() {
        let err = RelayConfig::from_lookup(lookup_from(&[(BIND_ADDR_VAR, "nowhere")])).unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));

        let err =
            RelayConfig::from_lookup(lookup_from(&[(OUTBOUND_BUFFER_VAR, "0")])).unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));

        let err =
            RelayConfig::from_lookup(lookup_from(&[(ROOM_KEYING_VAR, "random")])).unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));
    }
}
