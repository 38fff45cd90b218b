//! Configuration file support.
//!
//! User priorities and exclusions live in `wheelvariant.toml`:
//!
//! ```toml
//! namespace_priorities = ["fictional_hw", "fictional_tech"]
//! feature_priorities = ["fictional_hw :: architecture"]
//! property_priorities = ["fictional_tech :: risk_exposure :: 25"]
//!
//! forbidden_properties = ["fictional_hw :: humor :: 0"]
//! ```
//!
//! The file is looked up in these locations, first match wins:
//! - Project: `<cwd>/wheelvariant.toml`
//! - Virtual environment: `$VIRTUAL_ENV/wheelvariant.toml`
//! - User: the platform config directory, e.g. `~/.config/wheelvariant/`
//! - System: `/etc/wheelvariant/` (or `%PROGRAMDATA%\wheelvariant\`)

use std::fmt;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, VariantError};
use crate::resolver::filter::{ExclusionLists, Exclusions};
use crate::resolver::policy::PriorityLists;

/// Name of the configuration file.
pub const CONFIG_FILENAME: &str = "wheelvariant.toml";

/// User configuration: priorities plus exclusions. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub priorities: PriorityLists,

    #[serde(flatten)]
    pub exclusions: ExclusionLists,
}

/// Where a configuration file was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLocation {
    Project,
    VirtualEnv,
    User,
    System,
}

impl fmt::Display for ConfigLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConfigLocation::Project => "project",
            ConfigLocation::VirtualEnv => "virtual environment",
            ConfigLocation::User => "user",
            ConfigLocation::System => "system",
        };
        f.write_str(s)
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            VariantError::configuration(format!(
                "failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&contents, path)
    }

    /// Parse configuration content. `path` is only used in messages.
    pub fn parse(contents: &str, path: &Path) -> Result<Self> {
        let config: Config = toml::from_str(contents).map_err(|e| {
            VariantError::configuration(format!(
                "failed to parse config file {}: {}",
                path.display(),
                e.message()
            ))
        })?;

        // Fail on malformed keys now rather than at ranking time.
        config.exclusions()?;
        Ok(config)
    }

    /// Load configuration with fallback to defaults if the file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parsed exclusion lists.
    pub fn exclusions(&self) -> Result<Exclusions> {
        Exclusions::parse(&self.exclusions)
    }

    pub fn is_empty(&self) -> bool {
        self.priorities.is_empty() && self.exclusions.is_empty()
    }
}

/// Candidate configuration files in lookup order.
pub fn search_paths(cwd: &Path, virtual_env: Option<&Path>) -> Vec<(ConfigLocation, PathBuf)> {
    let mut paths = vec![(ConfigLocation::Project, cwd.join(CONFIG_FILENAME))];

    if let Some(venv) = virtual_env {
        paths.push((ConfigLocation::VirtualEnv, venv.join(CONFIG_FILENAME)));
    }
    if let Some(dirs) = ProjectDirs::from("", "", "wheelvariant") {
        paths.push((ConfigLocation::User, dirs.config_dir().join(CONFIG_FILENAME)));
    }
    if let Some(dir) = system_config_dir() {
        paths.push((ConfigLocation::System, dir.join(CONFIG_FILENAME)));
    }

    paths
}

#[cfg(windows)]
fn system_config_dir() -> Option<PathBuf> {
    std::env::var_os("PROGRAMDATA").map(|p| PathBuf::from(p).join("wheelvariant"))
}

#[cfg(not(windows))]
fn system_config_dir() -> Option<PathBuf> {
    Some(PathBuf::from("/etc/wheelvariant"))
}

/// Load the first configuration file found in `paths`, or defaults.
pub fn load_first(paths: &[(ConfigLocation, PathBuf)]) -> Result<Config> {
    for (location, path) in paths {
        if path.is_file() {
            tracing::info!("Using {} configuration from {}", location, path.display());
            return Config::load(path);
        }
    }
    tracing::debug!("No {} found; using defaults", CONFIG_FILENAME);
    Ok(Config::default())
}

/// Discover and load the configuration for a working directory.
pub fn load_config(cwd: &Path) -> Result<Config> {
    let virtual_env = std::env::var_os("VIRTUAL_ENV").map(PathBuf::from);
    load_first(&search_paths(cwd, virtual_env.as_deref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.is_empty());
        assert!(config.exclusions().unwrap().is_empty());
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join(CONFIG_FILENAME);

        std::fs::write(
            &config_path,
            r#"
namespace_priorities = ["fictional_hw", "fictional_tech"]
property_priorities = ["fictional_tech :: risk_exposure :: 25"]
forbidden_features = ["fictional_hw :: humor"]
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(
            config.priorities.namespace_priorities,
            vec!["fictional_hw", "fictional_tech"]
        );
        assert!(config.priorities.feature_priorities.is_empty());
        assert_eq!(
            config.priorities.property_priorities,
            vec!["fictional_tech :: risk_exposure :: 25"]
        );
        assert_eq!(config.exclusions.forbidden_features, vec!["fictional_hw :: humor"]);
        assert!(!config.exclusions().unwrap().is_empty());
    }

    #[test]
    fn test_config_parse_errors() {
        let path = Path::new(CONFIG_FILENAME);

        let err = Config::parse("namespace_priorities = \"not-a-list\"", path).unwrap_err();
        assert!(matches!(err, VariantError::Configuration { .. }));
        assert!(err.to_string().contains(CONFIG_FILENAME));

        let err = Config::parse("forbidden_properties = [\"ns :: feat\"]", path).unwrap_err();
        assert!(matches!(err, VariantError::MalformedKey { .. }));
    }

    #[test]
    fn test_config_load_or_default_missing() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load_or_default(&tmp.path().join(CONFIG_FILENAME)).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_search_order() {
        let cwd = Path::new("/work/project");
        let venv = Path::new("/work/.venv");
        let paths = search_paths(cwd, Some(venv));

        assert_eq!(paths[0], (ConfigLocation::Project, cwd.join(CONFIG_FILENAME)));
        assert_eq!(paths[1], (ConfigLocation::VirtualEnv, venv.join(CONFIG_FILENAME)));
        assert!(paths[2..]
            .iter()
            .all(|(loc, _)| matches!(loc, ConfigLocation::User | ConfigLocation::System)));

        let without_venv = search_paths(cwd, None);
        assert!(without_venv.iter().all(|(loc, _)| *loc != ConfigLocation::VirtualEnv));
    }

    #[test]
    fn test_first_config_wins() {
        let project = TempDir::new().unwrap();
        let venv = TempDir::new().unwrap();
        std::fs::write(
            venv.path().join(CONFIG_FILENAME),
            "namespace_priorities = [\"from_venv\"]",
        )
        .unwrap();

        let paths = vec![
            (ConfigLocation::Project, project.path().join(CONFIG_FILENAME)),
            (ConfigLocation::VirtualEnv, venv.path().join(CONFIG_FILENAME)),
        ];
        let config = load_first(&paths).unwrap();
        assert_eq!(config.priorities.namespace_priorities, vec!["from_venv"]);

        std::fs::write(
            project.path().join(CONFIG_FILENAME),
            "namespace_priorities = [\"from_project\"]",
        )
        .unwrap();
        let config = load_first(&paths).unwrap();
        assert_eq!(config.priorities.namespace_priorities, vec!["from_project"]);
    }

    #[test]
    fn test_nothing_found_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let paths = vec![(ConfigLocation::Project, tmp.path().join(CONFIG_FILENAME))];
        assert!(load_first(&paths).unwrap().is_empty());
    }
}
