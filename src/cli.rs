//! Clap adapter, compiled with the `clap` feature (on by default).
//!
//! [`GenerateArgs`] can be flattened into an application's own parser. Flags
//! become settings overrides, so they take precedence over settings files and
//! environment variables without the rest of the crate knowing about clap.

use std::path::PathBuf;

use clap::Args;

use crate::settings::SettingsLoader;

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Model file to expand.
    #[arg(short, long, default_value = "buildmatrix.model.toml")]
    pub model: PathBuf,

    /// Resource directory, relative to the definition directory.
    #[arg(long)]
    pub resources: Option<PathBuf>,

    /// Substitution passes allowed per template.
    #[arg(long)]
    pub iteration_cap: Option<u32>,

    /// Directory substituted for `[project.SharpmakeCsPath]`.
    #[arg(long)]
    pub definition_dir: Option<PathBuf>,

    /// Accept unknown keys in the model file.
    #[arg(long)]
    pub no_strict: bool,
}

impl GenerateArgs {
    /// Register every flag that was given as an override on `loader`.
    pub fn apply(&self, loader: SettingsLoader) -> SettingsLoader {
        loader
            .set_override("resources.dir", self.resources.as_deref().map(path_value))
            .set_override(
                "template_iteration_cap",
                self.iteration_cap.map(i64::from),
            )
            .set_override(
                "definition_dir",
                self.definition_dir.as_deref().map(path_value),
            )
            .set_override("strict", self.no_strict.then_some(false))
    }
}

fn path_value(path: &std::path::Path) -> String {
    path.to_string_lossy().into_owned()
}
