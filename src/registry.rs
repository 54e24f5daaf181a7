//! The declared model: projects and solutions in registration order.
//!
//! A [`Registry`] is built once and is read-only afterwards. Registration
//! order is iteration order, which fixes the order of generated output.

use std::path::PathBuf;

use indexmap::{IndexMap, IndexSet};

use crate::error::MatrixError;
use crate::project::Project;
use crate::solution::Solution;
use crate::target::{self, Target};

/// Built-in field holding the directory the model was defined in.
pub const DEFINITION_DIR_FIELD: &str = "SharpmakeCsPath";

/// Built-in field holding a project's or solution's own name.
pub const NAME_FIELD: &str = "Name";

#[derive(Debug, Clone)]
pub struct Registry {
    projects: IndexMap<String, Project>,
    solutions: IndexMap<String, Solution>,
    definition_dir: String,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    pub fn solutions(&self) -> impl Iterator<Item = &Solution> {
        self.solutions.values()
    }

    pub fn project(&self, name: &str) -> Option<&Project> {
        self.projects.get(name)
    }

    pub fn solution(&self, name: &str) -> Option<&Solution> {
        self.solutions.get(name)
    }

    pub fn definition_dir(&self) -> &str {
        &self.definition_dir
    }

    /// The inheritance chain of `name`, root first.
    ///
    /// Fails with [`MatrixError::InheritanceCycle`] naming the first project
    /// reached twice.
    pub fn ancestry(&self, name: &str) -> Result<Vec<&Project>, MatrixError> {
        let mut seen: IndexSet<&str> = IndexSet::new();
        let mut chain = Vec::new();
        let mut current = Some(name);
        let mut referenced_by = String::from("solution");

        while let Some(project_name) = current {
            let project =
                self.projects
                    .get(project_name)
                    .ok_or_else(|| MatrixError::UnknownProject {
                        name: project_name.to_string(),
                        referenced_by: referenced_by.clone(),
                    })?;
            if !seen.insert(project.name()) {
                return Err(MatrixError::InheritanceCycle {
                    project: project.name().to_string(),
                });
            }
            chain.push(project);
            referenced_by = format!("project '{project_name}'");
            current = project.base();
        }

        chain.reverse();
        Ok(chain)
    }

    /// Every target `name` supports: the declarations of its whole chain,
    /// root first, expanded and de-duplicated.
    pub fn project_targets(&self, name: &str) -> Result<Vec<Target>, MatrixError> {
        let chain = self.ancestry(name)?;
        Ok(target::expand_all(chain.iter().flat_map(|p| p.targets())))
    }

    /// Raw fields visible as `[project.*]` for a chain: the definition directory,
    /// then each level's fields root-to-leaf (derived levels override), then
    /// the leaf's name.
    pub fn project_fields(&self, chain: &[&Project]) -> IndexMap<String, String> {
        let mut fields = IndexMap::new();
        fields.insert(DEFINITION_DIR_FIELD.to_string(), self.definition_dir.clone());
        for project in chain {
            for (k, v) in project.fields() {
                fields.insert(k.clone(), v.clone());
            }
        }
        if let Some(leaf) = chain.last() {
            fields.insert(NAME_FIELD.to_string(), leaf.name().to_string());
        }
        fields
    }

    /// Raw fields visible as `[solution.*]`.
    pub fn solution_fields(&self, solution: &Solution) -> IndexMap<String, String> {
        let mut fields = IndexMap::new();
        fields.insert(DEFINITION_DIR_FIELD.to_string(), self.definition_dir.clone());
        for (k, v) in solution.fields() {
            fields.insert(k.clone(), v.clone());
        }
        fields.insert(NAME_FIELD.to_string(), solution.name().to_string());
        fields
    }

    /// True when no declared project derives from `name`.
    pub fn is_leaf(&self, name: &str) -> bool {
        !self.projects.values().any(|p| p.base() == Some(name))
    }
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    projects: Vec<Project>,
    solutions: Vec<Solution>,
    definition_dir: Option<PathBuf>,
}

impl RegistryBuilder {
    pub fn project(mut self, project: Project) -> Self {
        self.projects.push(project);
        self
    }

    pub fn solution(mut self, solution: Solution) -> Self {
        self.solutions.push(solution);
        self
    }

    /// Directory substituted for `[project.SharpmakeCsPath]` (default `.`).
    pub fn definition_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.definition_dir = Some(dir.into());
        self
    }

    /// Validate names and base references, then freeze the model.
    pub fn build(self) -> Result<Registry, MatrixError> {
        let mut projects = IndexMap::new();
        for project in self.projects {
            let name = project.name().to_string();
            if projects.insert(name.clone(), project).is_some() {
                return Err(MatrixError::DuplicateDeclaration {
                    kind: "project",
                    name,
                });
            }
        }

        for project in projects.values() {
            if let Some(base) = project.base()
                && !projects.contains_key(base)
            {
                return Err(MatrixError::UnknownProject {
                    name: base.to_string(),
                    referenced_by: format!("project '{}'", project.name()),
                });
            }
        }

        let mut solutions = IndexMap::new();
        for solution in self.solutions {
            let name = solution.name().to_string();
            if solutions.insert(name.clone(), solution).is_some() {
                return Err(MatrixError::DuplicateDeclaration {
                    kind: "solution",
                    name,
                });
            }
        }

        let definition_dir = self
            .definition_dir
            .map(|d| d.to_string_lossy().into_owned())
            .unwrap_or_else(|| ".".to_string());

        tracing::debug!(
            projects = projects.len(),
            solutions = solutions.len(),
            definition_dir = %definition_dir,
            "registry built"
        );

        Ok(Registry {
            projects,
            solutions,
            definition_dir,
        })
    }
}
