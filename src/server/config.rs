use clap::Parser;

/// Serve the current directory over HTTP with cross-origin isolation headers
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(author, version, about, long_about = None)]
pub struct ServerConfig {
    /// Address to bind the listening socket to
    #[arg(short, long, default_value = "0.0.0.0")]
    pub address: String,

    /// Port to bind the listening socket to
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        if self.address.contains(':') && !self.address.starts_with('[') {
            format!("[{}]:{}", self.address, self.port)
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_parse_without_flags() {
        let parsed = ServerConfig::try_parse_from(["coi-serve"]).unwrap();
        assert_eq!(parsed, ServerConfig::default());
        assert_eq!(parsed.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn short_and_long_flags() {
        let short = ServerConfig::try_parse_from(["coi-serve", "-a", "127.0.0.1", "-p", "9999"]).unwrap();
        let long =
            ServerConfig::try_parse_from(["coi-serve", "--address", "127.0.0.1", "--port", "9999"])
                .unwrap();
        assert_eq!(short, long);
        assert_eq!(short.bind_addr(), "127.0.0.1:9999");
    }

    #[test]
    fn ipv6_address_is_bracketed() {
        let config = ServerConfig {
            address: "::1".to_string(),
            port: 80,
        };
        assert_eq!(config.bind_addr(), "[::1]:80");
    }

    #[test]
    fn rejects_non_numeric_port() {
        assert!(ServerConfig::try_parse_from(["coi-serve", "-p", "http"]).is_err());
        assert!(ServerConfig::try_parse_from(["coi-serve", "-p", "70000"]).is_err());
    }
}
