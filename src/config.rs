//! Loader configuration using Figment
//!
//! Settings that shape how a session namespace is assembled, as opposed to the
//! session's own YAML sections. Loaded from:
//! 1. built-in defaults
//! 2. a TOML file (default `config/loader.toml`)
//! 3. environment variables prefixed with `DAQ_LOADER_`
//!
//! # Example
//! ```no_run
//! use daq_loader::config::LoaderConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LoaderConfig::load()?;
//! config.validate()?;
//! println!("Searching {:?} for bare class names", config.resolver_search_path());
//! # Ok(())
//! # }
//! ```

use crate::error::{LoadError, LoadResult};
use crate::experiment::DEFAULT_EXPERIMENT_SCRIPT;
use crate::loader::CollisionPolicy;
use crate::logging::Severity;
use crate::resolver::{is_dotted_path, DEFAULT_CLASS_SEARCH_PATH};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level loader configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Logging level (trace, debug, info, success, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// What happens when two plugins bind the same global name
    #[serde(default)]
    pub collision_policy: CollisionPolicy,
    /// Extra namespaces searched for bare class names, after the built-in ones
    #[serde(default)]
    pub class_search_path: Vec<String>,
    /// Command template for the current-experiment lookup; `{}` is the hutch name
    #[serde(default = "default_experiment_script")]
    pub experiment_script: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_experiment_script() -> String {
    DEFAULT_EXPERIMENT_SCRIPT.to_string()
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            collision_policy: CollisionPolicy::default(),
            class_search_path: Vec::new(),
            experiment_script: default_experiment_script(),
        }
    }
}

impl LoaderConfig {
    /// Load configuration from config/loader.toml and environment variables
    ///
    /// Environment variables override the file with prefix DAQ_LOADER_,
    /// e.g. DAQ_LOADER_LOG_LEVEL=debug
    pub fn load() -> LoadResult<Self> {
        Self::load_from("config/loader.toml")
    }

    /// Load configuration from a specific file path
    ///
    /// A missing file is not an error; defaults and the environment still apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> LoadResult<Self> {
        Ok(Self::figment(path.as_ref()).extract()?)
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(LoaderConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("DAQ_LOADER_"))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> LoadResult<()> {
        self.log_level.parse::<Severity>()?;

        for entry in &self.class_search_path {
            if !is_dotted_path(entry) {
                return Err(LoadError::Validation(format!(
                    "Invalid class_search_path entry '{}': must be a dotted module path",
                    entry
                )));
            }
        }

        if !self.experiment_script.contains("{}") {
            return Err(LoadError::Validation(format!(
                "experiment_script '{}' has no '{{}}' placeholder for the hutch name",
                self.experiment_script
            )));
        }

        Ok(())
    }

    /// Built-in class search namespaces followed by the configured ones.
    pub fn resolver_search_path(&self) -> Vec<String> {
        let mut path: Vec<String> = DEFAULT_CLASS_SEARCH_PATH
            .iter()
            .map(|s| s.to_string())
            .collect();
        for entry in &self.class_search_path {
            if !path.contains(entry) {
                path.push(entry.clone());
            }
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_toml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_validate() {
        let config = LoaderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.collision_policy, CollisionPolicy::Replace);
        assert_eq!(
            config.resolver_search_path(),
            vec!["pcdsdevices.device_types".to_string()]
        );
    }

    #[test]
    fn test_load_from_file() {
        let file = write_toml(
            r#"
log_level = "success"
collision_policy = "reject"
class_search_path = ["ophyd.signal", "pcdsdevices.device_types"]
"#,
        );

        let config = LoaderConfig::load_from(file.path()).unwrap();
        assert_eq!(config.log_level, "success");
        assert_eq!(config.collision_policy, CollisionPolicy::Reject);
        assert_eq!(
            config.resolver_search_path(),
            vec![
                "pcdsdevices.device_types".to_string(),
                "ophyd.signal".to_string(),
            ]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoaderConfig::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_invalid_log_level() {
        let config = LoaderConfig {
            log_level: "loud".to_string(),
            ..LoaderConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_search_path_entry() {
        let config = LoaderConfig {
            class_search_path: vec!["ophyd..signal".to_string()],
            ..LoaderConfig::default()
        };
        assert!(matches!(config.validate(), Err(LoadError::Validation(_))));
    }

    #[test]
    fn test_script_needs_placeholder() {
        let config = LoaderConfig {
            experiment_script: "get_curr_exp".to_string(),
            ..LoaderConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
