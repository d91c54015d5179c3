//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Service configuration loaded from TOML, with environment overrides
/// applied by the resolver below.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root data folder holding the database
    pub root_folder: Option<String>,
    /// HTTP bind address (default 127.0.0.1)
    pub bind_host: Option<String>,
    /// HTTP bind port (default 6810)
    pub bind_port: Option<u16>,
    /// Base URL of the outbound email relay
    pub email_relay_url: Option<String>,
    /// Base URL for resolving photo media references
    pub media_base_url: Option<String>,
}

/// Root folder resolution priority order:
/// 1. Explicit argument (highest priority)
/// 2. PFW_ROOT environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(explicit: Option<&str>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = explicit {
        return PathBuf::from(path);
    }

    if let Ok(path) = std::env::var("PFW_ROOT") {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.root_folder {
        return PathBuf::from(path);
    }

    default_root_folder()
}

/// OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "windows") {
        dirs::data_dir()
            .map(|d| d.join("prooflow"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\prooflow"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("prooflow"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/prooflow"))
    } else {
        dirs::data_local_dir()
            .map(|d| d.join("prooflow"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/prooflow"))
    }
}

/// Default configuration file path for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("prooflow").join("prooflow.toml"))
}

/// Load the TOML config file, returning defaults when absent
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match default_config_path() {
            Some(p) => p,
            None => return Ok(TomlConfig::default()),
        },
    };

    if !path.exists() {
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Write the TOML config file, creating parent directories as needed
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Database file path under a root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join("prooflow.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_root_wins() {
        let config = TomlConfig {
            root_folder: Some("/from/toml".to_string()),
            ..Default::default()
        };
        let root = resolve_root_folder(Some("/explicit"), &config);
        assert_eq!(root, PathBuf::from("/explicit"));
    }

    #[test]
    fn toml_root_used_when_no_override() {
        // Tests must not depend on the ambient PFW_ROOT
        std::env::remove_var("PFW_ROOT");
        let config = TomlConfig {
            root_folder: Some("/from/toml".to_string()),
            ..Default::default()
        };
        let root = resolve_root_folder(None, &config);
        assert_eq!(root, PathBuf::from("/from/toml"));
    }

    #[test]
    fn missing_config_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_toml_config(Some(&dir.path().join("nope.toml"))).unwrap();
        assert!(config.root_folder.is_none());
        assert!(config.bind_port.is_none());
    }

    #[test]
    fn toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prooflow.toml");
        let config = TomlConfig {
            root_folder: Some("/data/prooflow".to_string()),
            bind_host: Some("0.0.0.0".to_string()),
            bind_port: Some(7000),
            email_relay_url: Some("http://relay.local/send".to_string()),
            media_base_url: Some("http://media.local".to_string()),
        };

        write_toml_config(&config, &path).unwrap();
        let loaded = load_toml_config(Some(&path)).unwrap();

        assert_eq!(loaded.bind_port, Some(7000));
        assert_eq!(loaded.email_relay_url.as_deref(), Some("http://relay.local/send"));
    }
}
