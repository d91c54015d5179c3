//! Service configuration resolution for pfw-ws
//!
//! Priority per field: environment variable → TOML → compiled default.

use pfw_common::config::TomlConfig;

pub const DEFAULT_BIND_HOST: &str = "127.0.0.1";
pub const DEFAULT_BIND_PORT: u16 = 6810;

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_host: String,
    pub bind_port: u16,
    /// Outbound mail relay; notifications are disabled when unset
    pub email_relay_url: Option<String>,
    pub media_base_url: String,
}

impl ServiceConfig {
    pub fn resolve(toml_config: &TomlConfig) -> Self {
        let bind_host = env_string("PFW_BIND_HOST")
            .or_else(|| toml_config.bind_host.clone())
            .unwrap_or_else(|| DEFAULT_BIND_HOST.to_string());

        let bind_port = env_string("PFW_BIND_PORT")
            .and_then(|v| v.parse().ok())
            .or(toml_config.bind_port)
            .unwrap_or(DEFAULT_BIND_PORT);

        let email_relay_url =
            env_string("PFW_EMAIL_RELAY_URL").or_else(|| toml_config.email_relay_url.clone());

        let media_base_url = env_string("PFW_MEDIA_BASE_URL")
            .or_else(|| toml_config.media_base_url.clone())
            .unwrap_or_else(|| format!("http://{}:{}/media", DEFAULT_BIND_HOST, DEFAULT_BIND_PORT));

        Self {
            bind_host,
            bind_port,
            email_relay_url,
            media_base_url,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.bind_port)
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_with_empty_config() {
        std::env::remove_var("PFW_BIND_HOST");
        std::env::remove_var("PFW_BIND_PORT");
        std::env::remove_var("PFW_EMAIL_RELAY_URL");
        std::env::remove_var("PFW_MEDIA_BASE_URL");

        let config = ServiceConfig::resolve(&TomlConfig::default());
        assert_eq!(config.bind_addr(), "127.0.0.1:6810");
        assert!(config.email_relay_url.is_none());
    }

    #[test]
    fn toml_values_override_defaults() {
        std::env::remove_var("PFW_BIND_HOST");
        std::env::remove_var("PFW_BIND_PORT");

        let toml = TomlConfig {
            bind_host: Some("0.0.0.0".to_string()),
            bind_port: Some(7100),
            ..Default::default()
        };
        let config = ServiceConfig::resolve(&toml);
        assert_eq!(config.bind_addr(), "0.0.0.0:7100");
    }
}
