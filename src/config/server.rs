use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use serde::{Deserialize, Serialize};

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request body size limit in bytes.
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub(super) fn validate(&self) -> Result<(), String> {
        if self.body_limit_bytes == 0 {
            return Err("server.body_limit_bytes must be greater than 0".into());
        }
        Ok(())
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

fn default_body_limit() -> usize {
    1024 * 1024 // 1 MB
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn test_ipv6_host() {
        let config: ServerConfig = toml::from_str("host = \"::1\"\nport = 9000").unwrap();
        assert_eq!(config.socket_addr().to_string(), "[::1]:9000");
    }

    #[test]
    fn test_rejects_unknown_field() {
        assert!(toml::from_str::<ServerConfig>("tls = true").is_err());
    }

    #[test]
    fn test_zero_body_limit_invalid() {
        let config = ServerConfig {
            body_limit_bytes: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
