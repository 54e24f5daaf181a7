//! Declarative build-configuration expansion. Describe projects once, get one
//! resolved configuration per target.
//!
//! A model declares projects and solutions. Each declares its targets as axes
//! with flag sets of values (`Optimization = "Debug|Release"`), and a list of
//! configuration steps. Projects inherit from a base project. Generation
//! expands every solution's targets, runs each referenced project's steps
//! root-to-leaf for that target, resolves `[owner.field]` templates, and
//! hands back one [`GenerationUnit`] per (solution, target).
//!
//! ```ignore
//! let registry = Registry::builder()
//!     .definition_dir("/work/oxygen")
//!     .project(Project::builder("oxygen").targets(targets).configure(|c| {
//!         c.set(ScalarField::ProjectFileName, "[project.Name]_[target.Platform]")?;
//!         Ok(())
//!     }).build())
//!     .solution(solution)
//!     .build()?;
//! let generation = generate(&registry)?;
//! ```
//!
//! # Targets
//!
//! A target declaration is an ordered list of axes. Expansion is a cartesian
//! product with the first axis as the outermost loop and flag members in the
//! order written. That order is the order of generated output, and it does
//! not change between runs.
//!
//! # Inheritance
//!
//! A project's configuration for a target is built by walking its ancestor
//! chain from the root down. Every ancestor's steps run, in order, against one
//! accumulating [`Configuration`], so a derived project sees what its base
//! already set. Inheriting a field means leaving it alone; overriding means
//! assigning it again.
//!
//! | Field | Merge |
//! |-------|-------|
//! | scalars, output type | last write wins, a different value is reported |
//! | defines, options | ordered set |
//! | include paths, library files, copy files | ordered list |
//! | custom properties | ordered map, a different value is reported |
//!
//! A project reached twice while walking fails with
//! [`MatrixError::InheritanceCycle`] before any step runs.
//!
//! # Templates
//!
//! Strings assigned through a [`Configurator`] are resolved at assignment time.
//! `[project.X]` reads the project's raw fields (with `Name` and
//! `SharpmakeCsPath` built in), `[target.Axis]` the current target,
//! `[solution.X]` the solution being generated, and `[conf.X]` a scalar
//! already assigned in this configuration. Raw fields may reference other raw
//! fields; resolution repeats until nothing is left or the iteration cap
//! (16 by default) is exhausted.
//!
//! # Models on disk
//!
//! [`load_model`] reads a TOML model (`[[project]]`, `[[solution]]`) whose
//! `configure` entries are declarative [`Rule`]s with `when`/`unless` target
//! filters. [`SettingsLoader`] layers generator settings from files,
//! `BUILDMATRIX__*` environment variables and overrides, and [`resources`]
//! enumerates resource files into copy manifests.
//!
//! # Results and diagnostics
//!
//! Fatal conditions are [`MatrixError`] values and abort the run with no
//! partial output. Recoverable findings are [`Diagnostic`] values returned in
//! [`Generation::diagnostics`] and logged through `tracing` as they happen.

pub mod configuration;
pub mod diagnostic;
pub mod driver;
pub mod emit;
pub mod error;
pub mod model;
pub mod project;
pub mod registry;
pub mod resources;
pub mod settings;
pub mod solution;
pub mod target;
pub mod template;
pub mod walker;

#[cfg(feature = "clap")]
mod cli;

#[cfg(test)]
mod fixtures;

#[cfg(feature = "clap")]
pub use cli::GenerateArgs;
pub use configuration::{Configuration, Configurator, CopyRule, OutputType, ScalarField};
pub use diagnostic::Diagnostic;
pub use driver::{Generation, GenerationUnit, Generator, ResourceManifests, generate};
pub use emit::{Emitter, JsonLinesEmitter};
pub use error::MatrixError;
pub use model::{ModelFile, Rule, SolutionRule, load_model, parse_model};
pub use project::{ConfigureStep, Project, ProjectBuilder};
pub use registry::{Registry, RegistryBuilder};
pub use settings::{GeneratorSettings, SearchPath, SettingsLoader};
pub use solution::{
    Solution, SolutionBuilder, SolutionConfiguration, SolutionConfigurator, SolutionField,
    SolutionStep,
};
pub use target::{FlagSet, Target, TargetDecl};
pub use template::{FieldSource, TemplateContext};
pub use walker::{Walker, resolve_configuration};
