//! Configuration: YAML file plus environment overrides.
//!
//! # API pattern
//!
//! - `load_at(path)` reads an explicit file; used in tests with `TempDir`.
//! - `load(path)` resolves the default location through `dirs` when no path is
//!   given, then applies `EXTSYNC_*` environment overrides.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalog::{ContentLayout, ReferencePattern};
use crate::error::{io_err, CoreError};

/// Snapshot file name inside the data directory.
pub const SNAPSHOT_FILE: &str = "content-extensions.json";
/// Pass lock file name inside the data directory.
pub const LOCK_FILE: &str = "extsync.lock";

pub const DEFAULT_EXTENSIONS_DIR: &str = "/app/share/kolibri-content";
pub const DEFAULT_INSTANCE_INFO: &str = "/.flatpak-info";
pub const DEFAULT_REFERENCE_PREFIX: &str = "org.learningequality.Kolibri.Content";
pub const DEFAULT_FALLBACK_DIRS_VAR: &str = "KOLIBRI_CONTENT_FALLBACK_DIRS";

/// How the content-management backend is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    /// Backend executable.
    pub program: PathBuf,
    /// Arguments placed before every operation verb.
    pub manage_args: Vec<String>,
    /// Environment variable carrying the content fallback directories.
    pub fallback_dirs_var: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("kolibri"),
            manage_args: vec!["manage".to_string()],
            fallback_dirs_var: DEFAULT_FALLBACK_DIRS_VAR.to_string(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding the snapshot and the pass lock.
    /// Defaults to `<data_dir>/extsync`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// Root under which every extension's content is mounted.
    pub extensions_dir: PathBuf,
    /// Host instance metadata listing active extensions.
    pub instance_info: PathBuf,
    /// Reference prefix of content extensions.
    pub reference_prefix: String,
    pub backend: BackendConfig,
    /// Skip all remaining operations after the first failure.
    pub fail_fast: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            extensions_dir: PathBuf::from(DEFAULT_EXTENSIONS_DIR),
            instance_info: PathBuf::from(DEFAULT_INSTANCE_INFO),
            reference_prefix: DEFAULT_REFERENCE_PREFIX.to_string(),
            backend: BackendConfig::default(),
            fail_fast: false,
        }
    }
}

impl Config {
    /// Load config from `path`. A missing file yields the defaults.
    pub fn load_at(path: &Path) -> Result<Self, CoreError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(io_err(path, err)),
        };
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&contents).map_err(|source| CoreError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load config from `path` (or the default location) and apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, CoreError> {
        let mut config = match path {
            Some(path) => Self::load_at(path)?,
            None => Self::load_at(&default_config_path()?)?,
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override fields from `EXTSYNC_*` variables resolved through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("EXTSYNC_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("EXTSYNC_EXTENSIONS_DIR") {
            self.extensions_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("EXTSYNC_INSTANCE_INFO") {
            self.instance_info = PathBuf::from(v);
        }
        if let Some(v) = lookup("EXTSYNC_REFERENCE_PREFIX") {
            self.reference_prefix = v;
        }
        if let Some(v) = lookup("EXTSYNC_BACKEND") {
            self.backend.program = PathBuf::from(v);
        }
        if let Some(v) = lookup("EXTSYNC_FAIL_FAST") {
            self.fail_fast = matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    /// Resolved data directory.
    pub fn data_dir(&self) -> Result<PathBuf, CoreError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_dir()
                .map(|d| d.join("extsync"))
                .ok_or(CoreError::DirNotFound { what: "data" }),
        }
    }

    /// `<data_dir>/content-extensions.json`
    pub fn snapshot_path(&self) -> Result<PathBuf, CoreError> {
        Ok(self.data_dir()?.join(SNAPSHOT_FILE))
    }

    /// `<data_dir>/extsync.lock`
    pub fn lock_path(&self) -> Result<PathBuf, CoreError> {
        Ok(self.data_dir()?.join(LOCK_FILE))
    }

    pub fn layout(&self) -> ContentLayout {
        ContentLayout::new(&self.extensions_dir)
    }

    pub fn reference_pattern(&self) -> Result<ReferencePattern, CoreError> {
        ReferencePattern::new(&self.reference_prefix)
    }
}

/// `<config_dir>/extsync/config.yaml`
pub fn default_config_path() -> Result<PathBuf, CoreError> {
    dirs::config_dir()
        .map(|d| d.join("extsync").join("config.yaml"))
        .ok_or(CoreError::DirNotFound { what: "config" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load_at(&tmp.path().join("config.yaml")).expect("load");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.yaml");
        std::fs::write(
            &path,
            "extensions_dir: /srv/content\nbackend:\n  program: /usr/bin/kolibri\nfail_fast: true\n",
        )
        .unwrap();

        let config = Config::load_at(&path).expect("load");
        assert_eq!(config.extensions_dir, PathBuf::from("/srv/content"));
        assert_eq!(config.backend.program, PathBuf::from("/usr/bin/kolibri"));
        assert_eq!(config.backend.manage_args, vec!["manage".to_string()]);
        assert!(config.fail_fast);
        assert_eq!(config.reference_prefix, DEFAULT_REFERENCE_PREFIX);
    }

    #[test]
    fn unknown_key_is_a_config_error_with_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.yaml");
        std::fs::write(&path, "extension_dir: /typo\n").unwrap();

        let err = Config::load_at(&path).unwrap_err();
        assert!(matches!(err, CoreError::Config { .. }), "got: {err}");
        assert!(err.to_string().contains("config.yaml"));
    }

    #[test]
    fn env_overrides_file_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("EXTSYNC_DATA_DIR", "/var/lib/extsync"),
            ("EXTSYNC_BACKEND", "/opt/backend"),
            ("EXTSYNC_FAIL_FAST", "TRUE"),
        ]);
        let mut config = Config::default();
        config.apply_env(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.data_dir().unwrap(), PathBuf::from("/var/lib/extsync"));
        assert_eq!(config.backend.program, PathBuf::from("/opt/backend"));
        assert!(config.fail_fast);
        assert!(config
            .snapshot_path()
            .unwrap()
            .ends_with("extsync/content-extensions.json"));
    }

    #[test]
    fn reference_pattern_uses_prefix() {
        let config = Config {
            reference_prefix: "org.example.App.Content".to_string(),
            ..Config::default()
        };
        let pattern = config.reference_pattern().expect("pattern");
        assert!(pattern.name_of("org.example.App.Content.Demo").is_some());
    }
}
