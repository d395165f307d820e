//! Optional YAML configuration.
//!
//! ```yaml
//! reporters:
//!   - default
//!   - json:recheck-results.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RecheckError, Result};
use crate::reporter::{available_reporters, ReporterSpec};

/// Config file names searched for, in order.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["recheck.yaml", ".recheck.yaml", "recheck.yml"];

/// Reporter used when neither the command line nor the config names one.
pub const DEFAULT_REPORTER: &str = "default";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Reporter specs, `name` or `name:arg`.
    #[serde(default)]
    pub reporters: Vec<String>,
}

impl Config {
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Find a config file in `dir`.
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        DEFAULT_CONFIG_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Load `explicit` if given (it must exist), else a discovered file in
    /// `dir`, else the empty config.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(RecheckError::Config(format!(
                        "config file {} not found",
                        path.display()
                    )));
                }
                path.to_path_buf()
            }
            None => match Self::discover(dir) {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };
        debug!(path = %path.display(), "loading config");
        let config = Self::parse_file(&path)?;
        config.validate()?;
        Ok(config)
    }

    /// Every configured reporter spec must parse and name a built-in reporter.
    pub fn validate(&self) -> Result<()> {
        for raw in &self.reporters {
            let spec: ReporterSpec = raw
                .parse()
                .map_err(|e| RecheckError::Config(format!("reporter {:?}: {}", raw, e)))?;
            if !available_reporters().iter().any(|info| info.name == spec.name) {
                return Err(RecheckError::Config(format!(
                    "unknown reporter {:?} (available: {})",
                    spec.name,
                    available_reporters()
                        .iter()
                        .map(|info| info.name)
                        .collect::<Vec<_>>()
                        .join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Reporter specs to run with: command-line specs win over the config,
    /// and the default reporter is used when neither names any.
    pub fn reporter_specs(&self, overrides: &[String]) -> Vec<String> {
        if !overrides.is_empty() {
            overrides.to_vec()
        } else if !self.reporters.is_empty() {
            self.reporters.clone()
        } else {
            vec![DEFAULT_REPORTER.to_string()]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_reporters() {
        let config = Config::parse("reporters:\n  - cron\n  - json:out.json\n").unwrap();
        assert_eq!(config.reporters, vec!["cron", "json:out.json"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
        assert_eq!(Config::parse("  \n").unwrap(), Config::default());
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(matches!(
            Config::parse("reporter: cron\n"),
            Err(RecheckError::Yaml(_))
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_reporter() {
        let config = Config {
            reporters: vec!["fancy".to_string()],
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("unknown reporter \"fancy\""));
    }

    #[test]
    fn test_discover_in_order() {
        let temp = TempDir::new().unwrap();
        assert_eq!(Config::discover(temp.path()), None);

        fs::write(temp.path().join("recheck.yml"), "reporters: [silent]\n").unwrap();
        assert_eq!(
            Config::discover(temp.path()),
            Some(temp.path().join("recheck.yml"))
        );

        fs::write(temp.path().join("recheck.yaml"), "reporters: [cron]\n").unwrap();
        assert_eq!(
            Config::discover(temp.path()),
            Some(temp.path().join("recheck.yaml"))
        );

        let config = Config::load(None, temp.path()).unwrap();
        assert_eq!(config.reporters, vec!["cron"]);
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.yaml");
        assert!(matches!(
            Config::load(Some(missing.as_path()), temp.path()),
            Err(RecheckError::Config(_))
        ));
    }

    #[test]
    fn test_load_without_file_is_default() {
        let temp = TempDir::new().unwrap();
        assert_eq!(Config::load(None, temp.path()).unwrap(), Config::default());
    }

    #[test]
    fn test_reporter_spec_precedence() {
        let config = Config {
            reporters: vec!["cron".to_string()],
        };
        assert_eq!(config.reporter_specs(&[]), vec!["cron"]);
        assert_eq!(
            config.reporter_specs(&["json".to_string()]),
            vec!["json"]
        );
        assert_eq!(Config::default().reporter_specs(&[]), vec![DEFAULT_REPORTER]);
    }
}
