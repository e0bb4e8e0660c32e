//! Default locations for the CLI
//!
//! The config file lives in the platform config directory
//! (`~/.config/fileplacer/fileplacer.yaml` on Linux). Default source and
//! destination folders are derived from the home directory.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

pub const APP_DIR: &str = "fileplacer";
pub const CONFIG_FILE: &str = "fileplacer.yaml";

/// The user's home directory
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory"))
}

/// Where the config file is looked up when `--config` is not given
pub fn default_config_path() -> Result<PathBuf> {
    match dirs::config_dir() {
        Some(base) => Ok(config_path_under(&base)),
        None => Ok(config_path_under(&home_dir()?.join(".config"))),
    }
}

fn config_path_under(base: &Path) -> PathBuf {
    base.join(APP_DIR).join(CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_layout() {
        let path = config_path_under(Path::new("/home/me/.config"));
        assert_eq!(path, PathBuf::from("/home/me/.config/fileplacer/fileplacer.yaml"));
    }

    #[test]
    fn test_default_config_path_ends_with_app_file() {
        // Needs a home or config dir, which every CI runner has
        if let Ok(path) = default_config_path() {
            assert!(path.ends_with(Path::new(APP_DIR).join(CONFIG_FILE)));
        }
    }
}
