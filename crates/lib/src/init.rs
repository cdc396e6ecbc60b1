//! Initialize the configuration directory: create ~/.parrot and a template config.json.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::Config;

/// Create the config directory and a template config file if it does not exist.
/// The template holds every section with defaults and null platform values to fill in.
/// Returns the config directory.
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if config_path.exists() {
        log::debug!("config already exists at {}, skipping", config_path.display());
    } else {
        let template = serde_json::to_string_pretty(&Config::default())
            .context("serializing default config")?;
        std::fs::write(config_path, template)
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
        log::info!("created default config at {}", config_path.display());
    }

    Ok(config_dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("parrot-init-test-{}", uuid::Uuid::new_v4()))
            .join("config.json")
    }

    #[test]
    fn writes_loadable_template() {
        let path = temp_config_path();
        let dir = init_config_dir(&path).unwrap();
        assert_eq!(Some(dir.as_path()), path.parent());

        let (config, _) = crate::config::load_config(Some(path.clone())).unwrap();
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.delivery.max_attempts, 5);
        assert!(config.platform.access_token.is_none());

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn keeps_existing_config() {
        let path = temp_config_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"gateway":{"port":9999}}"#).unwrap();

        let dir = init_config_dir(&path).unwrap();
        let s = std::fs::read_to_string(&path).unwrap();
        assert_eq!(s, r#"{"gateway":{"port":9999}}"#);

        let _ = std::fs::remove_dir_all(dir);
    }
}
