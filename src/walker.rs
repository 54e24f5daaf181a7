//! Configuration inheritance walk for one (project, target) pair.
//!
//! 1. Build the ancestor chain root-to-leaf; a cycle fails before any step runs.
//! 2. Merge the chain's raw fields into the `[project.*]` view.
//! 3. Run every ancestor's steps in order over one accumulating configuration.
//! 4. Attach the resource manifest and finalize.

use crate::configuration::{Configuration, Configurator, CopyRule};
use crate::diagnostic::Diagnostic;
use crate::error::MatrixError;
use crate::registry::Registry;
use crate::solution::Solution;
use crate::target::Target;
use crate::template::DEFAULT_ITERATION_CAP;

/// Resolves project configurations against a registry.
pub struct Walker<'r> {
    registry: &'r Registry,
    iteration_cap: usize,
}

impl<'r> Walker<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            iteration_cap: DEFAULT_ITERATION_CAP,
        }
    }

    pub fn iteration_cap(mut self, cap: usize) -> Self {
        self.iteration_cap = cap;
        self
    }

    /// Resolve `project` for `target`, optionally in the context of `solution`.
    /// Warnings are appended to `diagnostics`.
    pub fn resolve(
        &self,
        project: &str,
        target: &Target,
        solution: Option<&Solution>,
        manifest: &[CopyRule],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Configuration, MatrixError> {
        let chain = self.registry.ancestry(project)?;
        let project_fields = self.registry.project_fields(&chain);
        let solution_fields = solution.map(|s| self.registry.solution_fields(s));

        let mut conf = Configuration::new(project, target.clone());
        {
            let mut configurator = Configurator::new(
                &mut conf,
                &project_fields,
                solution_fields.as_ref(),
                self.iteration_cap,
                diagnostics,
            );
            for level in &chain {
                tracing::debug!(
                    project = project,
                    level = level.name(),
                    target_name = %target,
                    steps = level.steps().len(),
                    "applying configuration steps"
                );
                for step in level.steps() {
                    step.apply(&mut configurator)?;
                }
            }
        }

        conf.attach_manifest(manifest)?;
        conf.finalize();
        Ok(conf)
    }
}

/// Resolve one configuration with default settings and no resource manifest.
pub fn resolve_configuration(
    registry: &Registry,
    project: &str,
    target: &Target,
    solution: Option<&Solution>,
) -> Result<(Configuration, Vec<Diagnostic>), MatrixError> {
    let mut diagnostics = Vec::new();
    let conf = Walker::new(registry).resolve(project, target, solution, &[], &mut diagnostics)?;
    Ok((conf, diagnostics))
}
