//! Fabric configuration.
//!
//! Loaded from an optional TOML file passed with `--config`:
//!
//! ```toml
//! [[default_networks]]
//! name = "management"
//! vlan_id = 101
//! cidr = "10.20.0.0/24"
//! ```
//!
//! `default_networks` is the catalog given to clusters created without explicit networks.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::CreateNetworkRequest;

/// Errors loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// A network of the default catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DefaultNetwork {
    pub name: String,
    #[serde(default)]
    pub vlan_id: Option<u16>,
    #[serde(default)]
    pub cidr: Option<String>,
}

impl DefaultNetwork {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            vlan_id: None,
            cidr: None,
        }
    }
}

impl From<&DefaultNetwork> for CreateNetworkRequest {
    fn from(network: &DefaultNetwork) -> Self {
        CreateNetworkRequest {
            name: network.name.clone(),
            vlan_id: network.vlan_id,
            cidr: network.cidr.clone(),
            bound_macs: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FabricConfig {
    #[serde(default = "default_networks")]
    pub default_networks: Vec<DefaultNetwork>,
}

fn default_networks() -> Vec<DefaultNetwork> {
    ["management", "public", "storage"]
        .into_iter()
        .map(DefaultNetwork::named)
        .collect()
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self {
            default_networks: default_networks(),
        }
    }
}

impl FabricConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for network in &self.default_networks {
            if network.name.is_empty() {
                return Err(ConfigError::Invalid(
                    "default network name cannot be empty".to_string(),
                ));
            }
            if !seen.insert(network.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate default network '{}'",
                    network.name
                )));
            }
            if let Some(vlan) = network.vlan_id
                && !(1..=4094).contains(&vlan)
            {
                return Err(ConfigError::Invalid(format!(
                    "default network '{}': vlan_id {} outside 1..=4094",
                    network.name, vlan
                )));
            }
        }
        Ok(())
    }

    /// The default catalog as create requests.
    pub fn default_catalog(&self) -> Vec<CreateNetworkRequest> {
        self.default_networks.iter().map(Into::into).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_defaults() {
        let config = FabricConfig::default();
        let names: Vec<&str> = config
            .default_networks
            .iter()
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(names, vec!["management", "public", "storage"]);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = FabricConfig::from_toml("").unwrap();
        assert_eq!(config, FabricConfig::default());
    }

    #[test]
    fn test_parse_default_networks() {
        let toml = r#"
            [[default_networks]]
            name = "management"
            vlan_id = 101
            cidr = "10.20.0.0/24"

            [[default_networks]]
            name = "public"
        "#;

        let config = FabricConfig::from_toml(toml).unwrap();

        assert_eq!(config.default_networks.len(), 2);
        assert_eq!(config.default_networks[0].vlan_id, Some(101));
        assert_eq!(
            config.default_networks[0].cidr.as_deref(),
            Some("10.20.0.0/24")
        );
        assert_eq!(config.default_networks[1].vlan_id, None);

        let catalog = config.default_catalog();
        assert_eq!(catalog[0].name, "management");
        assert!(catalog[0].bound_macs.is_empty());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let toml = r#"
            [[default_networks]]
            name = "public"

            [[default_networks]]
            name = "public"
        "#;

        let err = FabricConfig::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("duplicate default network"));
    }

    #[test]
    fn test_invalid_vlan_rejected() {
        let toml = r#"
            [[default_networks]]
            name = "storage"
            vlan_id = 4095
        "#;

        assert!(matches!(
            FabricConfig::from_toml(toml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            FabricConfig::from_toml("default_networks = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = FabricConfig::from_file("/nonexistent/mvirt-fabric.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
