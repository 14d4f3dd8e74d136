use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::record::DEFAULT_CLUSTER_DOMAIN;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct MeshAuditConfig {
    /// DNS suffix used to derive service hosts
    pub cluster_domain: Option<String>,
    /// Output format: "human" or "json"
    pub format: Option<String>,
    /// Treat warning-level violations as failures
    pub strict: Option<bool>,
}

impl MeshAuditConfig {
    pub fn cluster_domain(&self) -> &str {
        self.cluster_domain.as_deref().unwrap_or(DEFAULT_CLUSTER_DOMAIN)
    }

    pub fn strict(&self) -> bool {
        self.strict.unwrap_or(false)
    }

    /// The config written by `meshaudit init`
    pub fn starter() -> Self {
        Self {
            cluster_domain: Some(DEFAULT_CLUSTER_DOMAIN.to_string()),
            format: Some("human".to_string()),
            strict: Some(false),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("meshaudit.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<MeshAuditConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: MeshAuditConfig = toml::from_str(&contents)
        .map_err(|e| crate::Error::Config(format!("{}: {}", path.display(), e)))?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &MeshAuditConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_config(Some(&dir.path().join("meshaudit.toml"))).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meshaudit.toml");

        write_config(&path, &MeshAuditConfig::starter(), false).unwrap();
        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded, MeshAuditConfig::starter());
        assert_eq!(loaded.cluster_domain(), "svc.cluster.local");

        assert!(write_config(&path, &MeshAuditConfig::default(), false).is_err());
        write_config(&path, &MeshAuditConfig::default(), true).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap().unwrap(), MeshAuditConfig::default());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: MeshAuditConfig = toml::from_str(r#"cluster_domain = "svc.corp.local""#).unwrap();
        assert_eq!(config.cluster_domain(), "svc.corp.local");
        assert!(!config.strict());
        assert!(config.format.is_none());
    }

    #[test]
    fn test_invalid_config_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meshaudit.toml");
        std::fs::write(&path, "strict = \"maybe\"").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }
}
