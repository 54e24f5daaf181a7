//! Generator settings and their layered loading.
//!
//! Settings come from, lowest priority first: compiled defaults, every
//! `buildmatrix.toml` found along the search paths, `BUILDMATRIX__*`
//! environment variables, and explicit overrides (usually CLI flags).
//! [`SettingsLoader`] gathers those inputs; [`resolve_settings`] merges them
//! without touching the filesystem.

mod discover;
mod layers;
mod resolve;

use std::path::PathBuf;

use confique::Config;
use serde::{Deserialize, Serialize};

use crate::error::MatrixError;
use crate::template::DEFAULT_ITERATION_CAP;

pub use discover::{SearchPath, load_settings_files};
pub use layers::{deep_merge, env_to_table, overrides_to_table, valid_keys};
pub use resolve::{SettingsInput, resolve_settings};

/// Name used for the platform config directory.
pub const APP_NAME: &str = "buildmatrix";

/// Default settings file name.
pub const SETTINGS_FILE: &str = "buildmatrix.toml";

/// Default environment variable prefix.
pub const ENV_PREFIX: &str = "BUILDMATRIX";

#[derive(Config, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorSettings {
    /// Substitution passes allowed per template.
    #[config(default = 16)]
    pub template_iteration_cap: usize,

    /// Directory substituted for `[project.SharpmakeCsPath]`.
    /// Defaults to the directory containing the model file.
    pub definition_dir: Option<PathBuf>,

    /// Reject unknown keys in model files.
    #[config(default = true)]
    pub strict: bool,

    /// Resource enumeration.
    #[config(nested)]
    pub resources: ResourceSettings,
}

#[derive(Config, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSettings {
    /// Resource root, relative to the definition directory.
    #[config(default = "resources")]
    pub dir: PathBuf,

    /// Projects that receive the scanned manifest. Empty means every project.
    #[config(default = [])]
    pub projects: Vec<String>,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            template_iteration_cap: DEFAULT_ITERATION_CAP,
            definition_dir: None,
            strict: true,
            resources: ResourceSettings::default(),
        }
    }
}

impl Default for ResourceSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("resources"),
            projects: Vec::new(),
        }
    }
}

/// Collects the inputs of a settings load.
pub struct SettingsLoader {
    file_name: String,
    search_paths: Vec<SearchPath>,
    env_prefix: Option<String>,
    strict: bool,
    overrides: Vec<(String, toml::Value)>,
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsLoader {
    /// Search the platform config directory, then the working directory.
    pub fn new() -> Self {
        Self {
            file_name: SETTINGS_FILE.to_string(),
            search_paths: vec![SearchPath::Platform, SearchPath::Cwd],
            env_prefix: Some(ENV_PREFIX.to_string()),
            strict: true,
            overrides: Vec::new(),
        }
    }

    pub fn file_name(mut self, name: &str) -> Self {
        self.file_name = name.to_string();
        self
    }

    /// Replace the search paths. Listed in priority-ascending order.
    pub fn search_paths(mut self, paths: Vec<SearchPath>) -> Self {
        self.search_paths = paths;
        self
    }

    /// Append a search path with the highest priority so far.
    pub fn add_search_path(mut self, path: SearchPath) -> Self {
        self.search_paths.push(path);
        self
    }

    pub fn env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self
    }

    pub fn no_env(mut self) -> Self {
        self.env_prefix = None;
        self
    }

    /// Reject unknown keys in settings files and overrides (default: `true`).
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Add an override for a dotted key. `None` is ignored, so optional CLI
    /// arguments can be passed straight through.
    pub fn set_override<V: Into<toml::Value>>(mut self, key: &str, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.overrides.push((key.to_string(), v.into()));
        }
        self
    }

    fn input(&self) -> Result<SettingsInput, MatrixError> {
        let files = load_settings_files(&self.search_paths, &self.file_name)?;
        Ok(SettingsInput {
            files,
            env_vars: std::env::vars().collect(),
            env_prefix: self.env_prefix.clone(),
            overrides: self.overrides.clone(),
            strict: self.strict,
        })
    }

    pub fn load(self) -> Result<GeneratorSettings, MatrixError> {
        let input = self.input()?;
        resolve_settings(input)
    }
}
