use crate::{env_or_default, env_parse_or_default, ConfigError, FromEnv};
use std::net::Ipv4Addr;

/// Listen address for an HTTP surface
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Read `{prefix}HOST` / `{prefix}PORT`, falling back to `default_port`.
    ///
    /// An empty prefix reads plain `HOST` and `PORT`.
    pub fn from_env_with_prefix(prefix: &str, default_port: u16) -> Result<Self, ConfigError> {
        let host = env_or_default(&format!("{prefix}HOST"), &Ipv4Addr::UNSPECIFIED.to_string());
        let port = env_parse_or_default(&format!("{prefix}PORT"), default_port)?;
        Ok(Self { host, port })
    }

    /// The address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl FromEnv for ServerConfig {
    /// `HOST` defaults to 0.0.0.0, `PORT` to 8080
    fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with_prefix("", 8080)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(Ipv4Addr::UNSPECIFIED.to_string(), 8080)
    }
}
