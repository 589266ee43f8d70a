//! Optional YAML configuration (`hexpect.yaml`).
//!
//! ```yaml
//! extension: golden
//! output: text
//! color: true
//! strict: false
//! timeout_secs: 10
//! ```

use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_EXTENSION: &str = "golden";
pub const DEFAULT_CONFIG_FILE: &str = "hexpect.yaml";

/// Output format for reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Extension that marks golden files when scanning a directory.
    pub extension: String,
    pub output: OutputFormat,
    /// ANSI colors in text output.
    pub color: bool,
    /// Treat warnings as errors.
    pub strict: bool,
    /// Timeout for live requests made by `check --url`.
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extension: DEFAULT_EXTENSION.to_string(),
            output: OutputFormat::Text,
            color: true,
            strict: false,
            timeout_secs: 10,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, anyhow::Error> {
        // An empty file deserializes to unit, not to an empty mapping.
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `explicit` if given, else `hexpect.yaml` in `dir` if it exists,
    /// else defaults.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self, anyhow::Error> {
        if let Some(path) = explicit {
            return Self::from_file(path).map_err(|e| {
                anyhow::anyhow!("Failed to load config {}: {e}", path.display())
            });
        }
        let default_path = dir.join(DEFAULT_CONFIG_FILE);
        if default_path.is_file() {
            tracing::debug!(path = %default_path.display(), "using config file");
            return Self::from_file(&default_path).map_err(|e| {
                anyhow::anyhow!("Failed to load config {}: {e}", default_path.display())
            });
        }
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.extension.is_empty() {
            anyhow::bail!("'extension' must not be empty");
        }
        if self.extension.starts_with('.') {
            anyhow::bail!(
                "'extension' is given without the leading dot (use '{}', not '{}')",
                self.extension.trim_start_matches('.'),
                self.extension
            );
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("'timeout_secs' must be greater than zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.extension, "golden");
        assert_eq!(config.timeout_secs, 10);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_yaml("output: json\nstrict: true\n").unwrap();
        assert_eq!(config.output, OutputFormat::Json);
        assert!(config.strict);
        assert!(config.color);
        assert_eq!(config.extension, "golden");
    }

    #[test]
    fn test_validation_errors() {
        let err = Config::from_yaml("extension: .gold\n").unwrap_err();
        assert!(err.to_string().contains("without the leading dot"));

        let err = Config::from_yaml("timeout_secs: 0\n").unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));

        assert!(Config::from_yaml("output: xml\n").is_err());
        assert!(Config::from_yaml("colour: false\n").is_err());
    }

    #[test]
    fn test_discover() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::discover(None, dir.path()).unwrap(), Config::default());

        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "extension: txt\n").unwrap();
        assert_eq!(Config::discover(None, dir.path()).unwrap().extension, "txt");

        let explicit = dir.path().join("other.yaml");
        std::fs::write(&explicit, "color: false\n").unwrap();
        let config = Config::discover(Some(&explicit), dir.path()).unwrap();
        assert!(!config.color);
        assert_eq!(config.extension, "golden");

        let missing = dir.path().join("missing.yaml");
        assert!(Config::discover(Some(&missing), dir.path()).is_err());
    }
}
