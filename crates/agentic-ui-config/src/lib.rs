use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory of `NNN-role.md` conversation files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcripts_path: Option<PathBuf>,
    pub lazy: LazySettings,
    pub sandbox: SandboxSettings,
    pub monitor: MonitorSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LazySettings {
    pub enable: bool,
    pub placeholder_height: f64,
    /// CSS-like margin, e.g. `"200px"` or `"10% 0px"`.
    pub root_margin: String,
    /// Trailing items that are always rendered.
    pub keep_last: usize,
}

impl Default for LazySettings {
    fn default() -> Self {
        Self {
            enable: true,
            placeholder_height: 100.0,
            root_margin: "200px".to_string(),
            keep_last: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxSettings {
    /// `basic`, `secure` or `restricted`.
    pub preset: String,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            preset: "basic".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub enabled: bool,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            enabled: cfg!(debug_assertions),
        }
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the transcripts path
        config.transcripts_path = config
            .transcripts_path
            .map(|path| Self::expand_path(&path).unwrap_or(path));

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/agentic-ui");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/agentic-ui/config.toml"));
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config.transcripts_path, None);
        assert_eq!(config.lazy, LazySettings::default());
        assert_eq!(config.sandbox.preset, "basic");
    }

    #[test]
    fn test_partial_sections_fill_in_defaults() {
        let config_content = r#"
[lazy]
keep_last = 3

[sandbox]
preset = "restricted"
"#;

        let config: Config = toml::from_str(config_content).unwrap();

        assert_eq!(config.lazy.keep_last, 3);
        assert_eq!(config.lazy.root_margin, "200px");
        assert!(config.lazy.enable);
        assert_eq!(config.sandbox.preset, "restricted");
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let original = Config {
            transcripts_path: Some(PathBuf::from("/tmp/transcripts")),
            lazy: LazySettings {
                enable: false,
                placeholder_height: 64.0,
                root_margin: "10% 0px".to_string(),
                keep_last: 2,
            },
            sandbox: SandboxSettings {
                preset: "secure".to_string(),
            },
            monitor: MonitorSettings { enabled: true },
        };

        let toml_str = toml::to_string(&original).unwrap();
        let deserialized: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test/path");
        let expanded = Config::expand_path(&path).unwrap();

        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("test/path"));
    }

    #[test]
    fn test_expand_path_with_absolute_path() {
        let path = PathBuf::from("/absolute/path");
        let expanded = Config::expand_path(&path).unwrap();

        assert_eq!(expanded, path);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_load_invalid_toml_is_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "lazy = [not toml").unwrap();

        let result = Config::load_from_path(&config_file);

        assert!(matches!(result, Err(ConfigError::ConfigParseError { .. })));
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");
        let test_config = Config {
            transcripts_path: Some(PathBuf::from("/tmp/transcripts")),
            ..Config::default()
        };

        test_config.save_to_path(&config_file).unwrap();
        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded_config, test_config);
    }

    #[test]
    fn test_transcripts_path_with_env_var_in_toml() {
        unsafe {
            env::set_var("AGENTIC_UI_TEST_ROOT", "/custom/chats");
        }
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(
            &config_file,
            "transcripts_path = \"$AGENTIC_UI_TEST_ROOT/today\"\n",
        )
        .unwrap();

        let config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(
            config.transcripts_path,
            Some(PathBuf::from("/custom/chats/today"))
        );

        unsafe {
            env::remove_var("AGENTIC_UI_TEST_ROOT");
        }
    }
}
