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

    #[error("Unknown page profile '{0}'")]
    UnknownProfile(String),
}

/// One embosser page profile: the cell grid the layout engine targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub cells_per_line: usize,
    pub lines_per_page: usize,
}

impl Profile {
    /// US letter interpoint, the most common embosser setup.
    pub fn letter() -> Self {
        Self {
            name: "letter".into(),
            cells_per_line: 40,
            lines_per_page: 25,
        }
    }

    pub fn a4() -> Self {
        Self {
            name: "a4".into(),
            cells_per_line: 32,
            lines_per_page: 27,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// Name of the active profile; resolved against `profiles` first, then
    /// the built-ins.
    pub profile: String,
    /// Render at most this many pages per section; unset means all.
    #[serde(default)]
    pub page_limit: Option<usize>,
    /// User-defined profiles, in addition to the built-in letter and a4.
    #[serde(default)]
    pub profiles: Vec<Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: "letter".into(),
            page_limit: None,
            profiles: Vec::new(),
        }
    }
}

impl Config {
    /// Resolve the active profile by name.
    pub fn active_profile(&self) -> Result<Profile, ConfigError> {
        self.profiles
            .iter()
            .find(|p| p.name == self.profile)
            .cloned()
            .or_else(|| match self.profile.as_str() {
                "letter" => Some(Profile::letter()),
                "a4" => Some(Profile::a4()),
                _ => None,
            })
            .ok_or_else(|| ConfigError::UnknownProfile(self.profile.clone()))
    }

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

        let config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

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
        let config_dir = shellexpand::tilde("~/.config/braille-loom");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/braille-loom/config.toml"));
    }

    #[test]
    fn test_default_profile_is_letter() {
        let profile = Config::default().active_profile().unwrap();
        assert_eq!(profile, Profile::letter());
        assert_eq!(profile.cells_per_line, 40);
        assert_eq!(profile.lines_per_page, 25);
    }

    #[test]
    fn test_builtin_a4_profile() {
        let config = Config {
            profile: "a4".into(),
            ..Config::default()
        };
        let profile = config.active_profile().unwrap();
        assert_eq!(profile.cells_per_line, 32);
        assert_eq!(profile.lines_per_page, 27);
    }

    #[test]
    fn test_user_profile_shadows_builtin() {
        let config = Config {
            profile: "letter".into(),
            page_limit: None,
            profiles: vec![Profile {
                name: "letter".into(),
                cells_per_line: 38,
                lines_per_page: 24,
            }],
        };
        let profile = config.active_profile().unwrap();
        assert_eq!(profile.cells_per_line, 38);
    }

    #[test]
    fn test_unknown_profile_is_an_error() {
        let config = Config {
            profile: "tabloid".into(),
            ..Config::default()
        };
        let err = config.active_profile().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProfile(name) if name == "tabloid"));
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let original = Config {
            profile: "a4".into(),
            page_limit: Some(3),
            profiles: vec![Profile {
                name: "pocket".into(),
                cells_per_line: 24,
                lines_per_page: 20,
            }],
        };

        let toml_str = toml::to_string(&original).unwrap();
        let deserialized: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(deserialized.profile, original.profile);
        assert_eq!(deserialized.page_limit, original.page_limit);
        assert_eq!(deserialized.profiles, original.profiles);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        let test_config = Config {
            profile: "a4".into(),
            page_limit: Some(10),
            profiles: Vec::new(),
        };

        test_config.save_to_path(&config_file).unwrap();

        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded_config.profile, test_config.profile);
        assert_eq!(loaded_config.page_limit, test_config.page_limit);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(r#"profile = "letter""#).unwrap();
        assert_eq!(config.page_limit, None);
        assert!(config.profiles.is_empty());
    }
}
