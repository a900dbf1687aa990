use std::{env, net::SocketAddr};

use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MCP_PATH: &str = "/mcp";

/// Listen address and protocol endpoint, passed explicitly into `AppState`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    pub path: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("PORT must be a valid u16")]
    InvalidPort,
    #[error("MCP_PATH must start with '/'")]
    InvalidPath,
    #[error("invalid bind address or port")]
    InvalidSocket,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            port: DEFAULT_PORT,
            path: DEFAULT_MCP_PATH.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup("BIND_ADDR")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let port = lookup("PORT")
            .map(|value| {
                value
                    .trim()
                    .parse::<u16>()
                    .map_err(|_| ConfigError::InvalidPort)
            })
            .transpose()?
            .unwrap_or(DEFAULT_PORT);
        let path = lookup("MCP_PATH")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_MCP_PATH.to_string());

        if !path.starts_with('/') {
            return Err(ConfigError::InvalidPath);
        }

        let config = Self {
            bind_addr,
            port,
            path,
        };

        let _ = config.bind_socket()?;
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn parse_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).expect("config should parse");
        assert_eq!(config, Config::default());
        assert_eq!(config.port, 3000);
        assert_eq!(config.path, "/mcp");
    }

    #[test]
    fn custom_port_and_path() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "8787"),
            ("MCP_PATH", "/protocol"),
            ("BIND_ADDR", "0.0.0.0"),
        ]))
        .expect("config should parse");

        assert_eq!(config.port, 8787);
        assert_eq!(config.path, "/protocol");
        assert_eq!(
            config.bind_socket().expect("socket"),
            "0.0.0.0:8787".parse().expect("addr")
        );
    }

    #[test]
    fn invalid_port_fails() {
        let err = Config::from_lookup(lookup_from(&[("PORT", "70000")]))
            .expect_err("expected invalid port");
        assert!(matches!(err, ConfigError::InvalidPort));
    }

    #[test]
    fn relative_path_fails() {
        let err = Config::from_lookup(lookup_from(&[("MCP_PATH", "mcp")]))
            .expect_err("expected invalid path");
        assert!(matches!(err, ConfigError::InvalidPath));
    }

    #[test]
    fn invalid_bind_addr_fails() {
        let err = Config::from_lookup(lookup_from(&[("BIND_ADDR", "not an address")]))
            .expect_err("expected invalid socket");
        assert!(matches!(err, ConfigError::InvalidSocket));
    }
}
