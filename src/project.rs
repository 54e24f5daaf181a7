//! Project declarations.
//!
//! A project carries raw (unresolved) fields, target declarations, an optional
//! base project, and an ordered list of configuration steps. The walker runs
//! the steps of every ancestor root-to-leaf, so a derived project's steps always
//! see what its base already configured.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::configuration::Configurator;
use crate::error::MatrixError;
use crate::model::Rule;
use crate::target::TargetDecl;

/// Signature of a closure-based project configuration step.
pub type ConfigureFn = dyn Fn(&mut Configurator<'_>) -> Result<(), MatrixError> + Send + Sync;

/// One configuration step attached to a project.
#[derive(Clone)]
pub enum ConfigureStep {
    /// Declarative rules, applied in order to every target they match.
    Rules(Arc<[Rule]>),
    /// Arbitrary code.
    Custom(Arc<ConfigureFn>),
}

impl ConfigureStep {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&mut Configurator<'_>) -> Result<(), MatrixError> + Send + Sync + 'static,
    {
        ConfigureStep::Custom(Arc::new(f))
    }

    pub(crate) fn apply(&self, conf: &mut Configurator<'_>) -> Result<(), MatrixError> {
        match self {
            ConfigureStep::Rules(rules) => {
                for rule in rules.iter() {
                    rule.apply(conf)?;
                }
                Ok(())
            }
            ConfigureStep::Custom(f) => f(conf),
        }
    }
}

impl fmt::Debug for ConfigureStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigureStep::Rules(rules) => write!(f, "Rules({} rules)", rules.len()),
            ConfigureStep::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// A declared build unit.
#[derive(Debug, Clone)]
pub struct Project {
    name: String,
    base: Option<String>,
    fields: IndexMap<String, String>,
    targets: Vec<TargetDecl>,
    steps: Vec<ConfigureStep>,
}

impl Project {
    pub fn builder(name: &str) -> ProjectBuilder {
        ProjectBuilder {
            project: Project {
                name: name.to_string(),
                base: None,
                fields: IndexMap::new(),
                targets: Vec::new(),
                steps: Vec::new(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the project this one derives from.
    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    /// Raw field templates declared at this level.
    pub fn fields(&self) -> &IndexMap<String, String> {
        &self.fields
    }

    pub fn targets(&self) -> &[TargetDecl] {
        &self.targets
    }

    pub fn steps(&self) -> &[ConfigureStep] {
        &self.steps
    }
}

pub struct ProjectBuilder {
    project: Project,
}

impl ProjectBuilder {
    pub fn base(mut self, base: &str) -> Self {
        self.project.base = Some(base.to_string());
        self
    }

    /// Declare a raw field. Templates are kept unresolved until read, so a field
    /// may reference fields a derived project declares (`[project.Name]`).
    pub fn field(mut self, name: &str, template: &str) -> Self {
        self.project
            .fields
            .insert(name.to_string(), template.to_string());
        self
    }

    pub fn targets(mut self, decl: TargetDecl) -> Self {
        self.project.targets.push(decl);
        self
    }

    pub fn configure<F>(self, f: F) -> Self
    where
        F: Fn(&mut Configurator<'_>) -> Result<(), MatrixError> + Send + Sync + 'static,
    {
        self.step(ConfigureStep::custom(f))
    }

    pub fn step(mut self, step: ConfigureStep) -> Self {
        self.project.steps.push(step);
        self
    }

    pub fn build(self) -> Project {
        self.project
    }
}
