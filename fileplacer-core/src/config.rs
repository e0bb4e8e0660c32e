use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fs;
use std::path::{Path, PathBuf};

/// Default file name of the rule workbook, resolved against the working directory
pub const DEFAULT_RULE_DOCUMENT: &str = "file_mapping.xlsx";

/// yes/no switch as written in the config file.
///
/// Accepts `yes`/`no` in any case, or a plain YAML boolean.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Toggle {
    #[default]
    Yes,
    No,
}

impl Toggle {
    pub fn is_enabled(self) -> bool {
        self == Toggle::Yes
    }
}

impl From<bool> for Toggle {
    fn from(value: bool) -> Self {
        if value {
            Toggle::Yes
        } else {
            Toggle::No
        }
    }
}

impl Serialize for Toggle {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(match self {
            Toggle::Yes => "yes",
            Toggle::No => "no",
        })
    }
}

impl<'de> Deserialize<'de> for Toggle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bool(bool),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Bool(value) => Ok(Toggle::from(value)),
            Raw::Text(text) => match text.trim().to_lowercase().as_str() {
                "yes" => Ok(Toggle::Yes),
                "no" => Ok(Toggle::No),
                other => Err(serde::de::Error::custom(format!(
                    "expected `yes` or `no`, found `{other}`"
                ))),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Flat folder scanned for incoming files
    pub source_folder: PathBuf,
    /// Root of the destination tree; categories become its first level
    pub destination_base: PathBuf,
    /// Workbook holding one sheet of rules per category
    pub rule_document: PathBuf,
    /// Where model analysis reports are written
    pub report_folder: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsConfig {
    /// Extract element metadata from model files before placing them
    #[serde(default)]
    pub analyze_models: Toggle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizerConfig {
    pub paths: PathsConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
}

/// A loaded config plus whether it was freshly synthesized
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: OrganizerConfig,
    pub created: bool,
}

impl OrganizerConfig {
    /// Defaults rooted at the given home directory
    pub fn defaults_for_home(home: &Path) -> Self {
        let documents = home.join("Documents");
        Self {
            paths: PathsConfig {
                source_folder: home.join("Downloads"),
                destination_base: documents.join("Organised_Files"),
                rule_document: PathBuf::from(DEFAULT_RULE_DOCUMENT),
                report_folder: documents.join("Model_Analysis"),
            },
            settings: SettingsConfig::default(),
        }
    }

    pub fn analysis_enabled(&self) -> bool {
        self.settings.analyze_models.is_enabled()
    }

    /// Load config from file path
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_yaml::from_str(&content)
            .map_err(|e| anyhow!("Invalid config {}: {}", path.display(), e))
    }

    /// Load config, or write defaults to `path` when it does not exist yet.
    ///
    /// `home` is only asked for when defaults have to be synthesized.
    pub fn load_or_create(
        path: &Path,
        home: impl FnOnce() -> Result<PathBuf>,
    ) -> Result<LoadedConfig> {
        if path.exists() {
            return Ok(LoadedConfig {
                config: Self::load_from_file(path)?,
                created: false,
            });
        }

        let config = Self::defaults_for_home(&home()?);
        config.save(path)?;
        tracing::debug!("wrote default config to {}", path.display());
        Ok(LoadedConfig {
            config,
            created: true,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)
            .with_context(|| format!("Failed to write config {}", path.display()))?;
        Ok(())
    }
}
