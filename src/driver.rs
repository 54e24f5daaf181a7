//! Generation driver: expands every solution into generation units.
//!
//! A run is all-or-nothing. The first fatal error aborts it and no units are
//! returned; warnings are collected into [`Generation::diagnostics`].
//!
//! Output order is fixed by the registry: solutions in declaration order, then
//! each solution's targets in expansion order, then projects in the order the
//! solution referenced them.

use indexmap::IndexMap;
use serde::Serialize;

use crate::configuration::{Configuration, CopyRule};
use crate::diagnostic::Diagnostic;
use crate::error::MatrixError;
use crate::registry::Registry;
use crate::solution::{Solution, SolutionConfiguration, SolutionConfigurator};
use crate::target::{self, Target};
use crate::template::DEFAULT_ITERATION_CAP;
use crate::walker::Walker;

/// Pre-enumerated resource files, keyed by project name.
pub type ResourceManifests = IndexMap<String, Vec<CopyRule>>;

/// One solution resolved for one target, with the configurations of every
/// project it references.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationUnit {
    pub solution: SolutionConfiguration,
    pub target: Target,
    pub projects: Vec<Configuration>,
}

/// The result of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Generation {
    pub units: Vec<GenerationUnit>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct Generator<'r> {
    registry: &'r Registry,
    iteration_cap: usize,
    resources: Option<&'r ResourceManifests>,
}

impl<'r> Generator<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            iteration_cap: DEFAULT_ITERATION_CAP,
            resources: None,
        }
    }

    /// Substitution passes allowed per template (default 16).
    pub fn iteration_cap(mut self, cap: usize) -> Self {
        self.iteration_cap = cap;
        self
    }

    /// Attach resource manifests. Projects without an entry get none.
    pub fn resources(mut self, manifests: &'r ResourceManifests) -> Self {
        self.resources = Some(manifests);
        self
    }

    pub fn run(&self) -> Result<Generation, MatrixError> {
        let mut diagnostics = Vec::new();
        self.check_leaf_projects(&mut diagnostics)?;

        let walker = Walker::new(self.registry).iteration_cap(self.iteration_cap);
        let mut units = Vec::new();
        for solution in self.registry.solutions() {
            let targets = target::expand_all(solution.targets());
            if targets.is_empty() {
                Diagnostic::EmptyTargetExpansion {
                    unit: solution.name().to_string(),
                }
                .report(&mut diagnostics);
                continue;
            }

            for target in targets {
                let unit = self.generate_unit(&walker, solution, target, &mut diagnostics)?;
                units.push(unit);
            }
        }

        tracing::info!(
            units = units.len(),
            diagnostics = diagnostics.len(),
            "generation finished"
        );
        Ok(Generation { units, diagnostics })
    }

    /// Leaf projects that declare no targets can never be generated.
    fn check_leaf_projects(&self, diagnostics: &mut Vec<Diagnostic>) -> Result<(), MatrixError> {
        for project in self.registry.projects() {
            if self.registry.is_leaf(project.name())
                && self.registry.project_targets(project.name())?.is_empty()
            {
                Diagnostic::EmptyTargetExpansion {
                    unit: project.name().to_string(),
                }
                .report(diagnostics);
            }
        }
        Ok(())
    }

    fn generate_unit(
        &self,
        walker: &Walker<'_>,
        solution: &Solution,
        target: Target,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<GenerationUnit, MatrixError> {
        let solution_fields = self.registry.solution_fields(solution);
        let mut solution_conf = SolutionConfiguration::new(solution.name(), target.clone());
        {
            let mut configurator = SolutionConfigurator::new(
                &mut solution_conf,
                &solution_fields,
                self.iteration_cap,
                diagnostics,
            );
            for step in solution.steps() {
                step.apply(&mut configurator)?;
            }
        }

        tracing::debug!(
            solution = solution.name(),
            target_name = %target,
            projects = solution_conf.projects().count(),
            "solution configured"
        );

        let mut projects = Vec::new();
        for name in solution_conf.projects() {
            if self.registry.project(name).is_none() {
                return Err(MatrixError::UnknownProject {
                    name: name.to_string(),
                    referenced_by: format!("solution '{}'", solution.name()),
                });
            }
            if !self.registry.project_targets(name)?.contains(&target) {
                return Err(MatrixError::UnsupportedTargetForProject {
                    solution: solution.name().to_string(),
                    project: name.to_string(),
                    target: target.to_string(),
                });
            }

            let manifest = self
                .resources
                .and_then(|m| m.get(name))
                .map(Vec::as_slice)
                .unwrap_or_default();
            let conf = walker.resolve(name, &target, Some(solution), manifest, diagnostics)?;
            projects.push(conf);
        }

        Ok(GenerationUnit {
            solution: solution_conf,
            target,
            projects,
        })
    }
}

/// Run a generation over `registry` with default settings and no resources.
pub fn generate(registry: &Registry) -> Result<Generation, MatrixError> {
    Generator::new(registry).run()
}
