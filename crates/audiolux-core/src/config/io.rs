//! YAML scene loading and saving
//!
//! Generic over the configuration type so the same helpers serve scenes
//! and any settings file an embedding application keeps next to them.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Load configuration from a YAML file
///
/// A missing file gives the default configuration. So does an unreadable
/// or unparsable one, with a warning saying why.
///
/// ```ignore
/// let scene: GraphConfig = load_config(Path::new("scene.yaml"));
/// ```
pub fn load_config<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    log::info!("load_config: Loading from {:?}", path);

    if !path.exists() {
        log::info!("load_config: {:?} doesn't exist, using defaults", path);
        return T::default();
    }

    match try_load_config(path) {
        Ok(config) => {
            log::info!("load_config: Loaded {:?}", path);
            config
        }
        Err(e) => {
            log::warn!("load_config: {:#}, using defaults", e);
            T::default()
        }
    }
}

/// Load configuration from a YAML file, reporting any failure
pub fn try_load_config<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned,
{
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read config file: {:?}", path))?;
    serde_yaml::from_str(&contents).with_context(|| format!("Failed to parse config file: {:?}", path))
}

/// Save configuration to a YAML file
///
/// Creates parent directories if they don't exist.
pub fn save_config<T>(config: &T, path: &Path) -> Result<()>
where
    T: Serialize,
{
    log::info!("save_config: Saving to {:?}", path);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;
    std::fs::write(path, yaml).with_context(|| format!("Failed to write config file: {:?}", path))?;

    log::info!("save_config: Saved {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::scene::{GraphConfig, NodeConfig, NodeKind, ShiftConfig};

    #[test]
    fn test_load_nonexistent_returns_default() {
        let config: GraphConfig = load_config(Path::new("/nonexistent/path/scene.yaml"));
        assert_eq!(config, GraphConfig::default());
    }

    #[test]
    fn test_load_invalid_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        std::fs::write(&path, "num_pixels: [not, a, number").unwrap();

        let config: GraphConfig = load_config(&path);
        assert_eq!(config, GraphConfig::default());
        assert!(try_load_config::<GraphConfig>(&path).is_err());
    }

    #[test]
    fn test_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenes").join("strip.yaml");

        let mut config = GraphConfig::default();
        config.num_pixels = 144;
        config.brightness = 0.75;
        config
            .nodes
            .push(NodeConfig::new("trail", NodeKind::Shift(ShiftConfig { dim_time: 2.5 })));
        config.nodes.push(NodeConfig::new("mirror", NodeKind::Mirror));

        save_config(&config, &path).unwrap();
        let loaded: GraphConfig = try_load_config(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
