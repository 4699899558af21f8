use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Model identifier used when `initialize` is called without a model path.
pub const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";

const DEFAULT_ASSETS_DIR: &str = "models";

/// Bridge settings, read from a JSON file or from the Tauri plugin config block.
/// Every field is optional in the serialized form.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbedderConfig {
    /// Directory model identifiers are resolved against
    pub assets_dir: PathBuf,
    pub default_model: String,
    /// Reported by `getModelInfo`; derived from the build target when unset
    pub platform: Option<String>,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from(DEFAULT_ASSETS_DIR),
            default_model: DEFAULT_MODEL.to_string(),
            platform: None,
        }
    }
}

impl EmbedderConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        serde_json::from_str(&content).with_context(|| format!("Invalid config {:?}", path))
    }

    pub fn with_assets_dir(mut self, assets_dir: impl Into<PathBuf>) -> Self {
        self.assets_dir = assets_dir.into();
        self
    }

    pub fn platform_name(&self) -> String {
        self.platform
            .clone()
            .unwrap_or_else(|| current_platform().to_string())
    }
}

/// Display name of the platform this crate was built for
pub fn current_platform() -> &'static str {
    match std::env::consts::OS {
        "android" => "Android",
        "ios" => "iOS",
        "macos" => "macOS",
        "windows" => "Windows",
        "linux" => "Linux",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: EmbedderConfig =
            serde_json::from_str(r#"{ "assetsDir": "/opt/models" }"#).unwrap();

        assert_eq!(config.assets_dir, PathBuf::from("/opt/models"));
        assert_eq!(config.default_model, DEFAULT_MODEL);
        assert_eq!(config.platform, None);
    }

    #[test]
    fn test_platform_override() {
        let mut config = EmbedderConfig::default();
        assert_eq!(config.platform_name(), current_platform());

        config.platform = Some("Android".to_string());
        assert_eq!(config.platform_name(), "Android");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("embedder.json");
        fs::write(
            &path,
            r#"{ "defaultModel": "bge-small-en-v1.5", "platform": "iOS" }"#,
        )
        .unwrap();

        let config = EmbedderConfig::load(&path).unwrap();
        assert_eq!(config.default_model, "bge-small-en-v1.5");
        assert_eq!(config.platform_name(), "iOS");
        assert_eq!(config.assets_dir, PathBuf::from("models"));

        assert!(EmbedderConfig::load(&dir.path().join("missing.json")).is_err());
    }
}
