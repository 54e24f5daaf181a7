//! Solution declarations and their per-target configuration.
//!
//! A solution's configuration is scalar only: its file name, its path, and the
//! projects it includes for the current target.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::diagnostic::Diagnostic;
use crate::error::MatrixError;
use crate::model::SolutionRule;
use crate::target::{Target, TargetDecl};
use crate::template::{self, FieldSource, TemplateContext};

/// Scalar fields of a solution configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolutionField {
    SolutionFileName,
    SolutionPath,
}

impl SolutionField {
    pub fn name(self) -> &'static str {
        match self {
            SolutionField::SolutionFileName => "SolutionFileName",
            SolutionField::SolutionPath => "SolutionPath",
        }
    }
}

impl FromStr for SolutionField {
    type Err = MatrixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SolutionFileName" => Ok(SolutionField::SolutionFileName),
            "SolutionPath" => Ok(SolutionField::SolutionPath),
            other => Err(MatrixError::InvalidValue {
                key: other.to_string(),
                reason: "not a solution field".into(),
            }),
        }
    }
}

impl fmt::Display for SolutionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolved solution settings for one target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolutionConfiguration {
    solution: String,
    target: Target,
    scalars: IndexMap<SolutionField, String>,
    projects: IndexSet<String>,
}

impl SolutionConfiguration {
    pub fn new(solution: &str, target: Target) -> Self {
        Self {
            solution: solution.to_string(),
            target,
            scalars: IndexMap::new(),
            projects: IndexSet::new(),
        }
    }

    pub fn solution(&self) -> &str {
        &self.solution
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn scalar(&self, field: SolutionField) -> Option<&str> {
        self.scalars.get(&field).map(String::as_str)
    }

    /// Referenced projects, in the order they were first added.
    pub fn projects(&self) -> impl Iterator<Item = &str> {
        self.projects.iter().map(String::as_str)
    }

    fn set_scalar(&mut self, field: SolutionField, value: String) -> Option<Diagnostic> {
        let old = self.scalars.insert(field, value.clone())?;
        (old != value).then(|| Diagnostic::ConflictingOverride {
            owner: self.solution.clone(),
            target: self.target.to_string(),
            field: field.name().to_string(),
            old,
            new: value,
        })
    }
}

impl FieldSource for SolutionConfiguration {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        let field = name.parse::<SolutionField>().ok()?;
        self.scalar(field).map(Cow::Borrowed)
    }
}

/// Mutation handle passed to solution steps.
pub struct SolutionConfigurator<'a> {
    conf: &'a mut SolutionConfiguration,
    fields: &'a IndexMap<String, String>,
    iteration_cap: usize,
    diagnostics: &'a mut Vec<Diagnostic>,
}

impl<'a> SolutionConfigurator<'a> {
    pub(crate) fn new(
        conf: &'a mut SolutionConfiguration,
        fields: &'a IndexMap<String, String>,
        iteration_cap: usize,
        diagnostics: &'a mut Vec<Diagnostic>,
    ) -> Self {
        Self {
            conf,
            fields,
            iteration_cap,
            diagnostics,
        }
    }

    pub fn target(&self) -> &Target {
        self.conf.target()
    }

    pub fn get(&self, field: SolutionField) -> Option<&str> {
        self.conf.scalar(field)
    }

    pub fn resolve(&self, text: &str) -> Result<String, MatrixError> {
        let conf: &SolutionConfiguration = &*self.conf;
        let ctx = TemplateContext::new()
            .with_solution(self.fields)
            .with_target(conf.target())
            .with_conf(conf)
            .iteration_cap(self.iteration_cap);
        template::resolve(text, &ctx)
    }

    pub fn set(&mut self, field: SolutionField, value: &str) -> Result<&mut Self, MatrixError> {
        let value = self.resolve(value)?;
        if let Some(d) = self.conf.set_scalar(field, value) {
            d.report(self.diagnostics);
        }
        Ok(self)
    }

    /// Include `project` in this solution for the current target.
    pub fn add_project(&mut self, project: &str) -> &mut Self {
        self.conf.projects.insert(project.to_string());
        self
    }
}

/// Signature of a closure-based solution step.
pub type SolutionFn =
    dyn Fn(&mut SolutionConfigurator<'_>) -> Result<(), MatrixError> + Send + Sync;

#[derive(Clone)]
pub enum SolutionStep {
    Rules(Arc<[SolutionRule]>),
    Custom(Arc<SolutionFn>),
}

impl SolutionStep {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&mut SolutionConfigurator<'_>) -> Result<(), MatrixError> + Send + Sync + 'static,
    {
        SolutionStep::Custom(Arc::new(f))
    }

    pub(crate) fn apply(&self, conf: &mut SolutionConfigurator<'_>) -> Result<(), MatrixError> {
        match self {
            SolutionStep::Rules(rules) => {
                for rule in rules.iter() {
                    rule.apply(conf)?;
                }
                Ok(())
            }
            SolutionStep::Custom(f) => f(conf),
        }
    }
}

impl fmt::Debug for SolutionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolutionStep::Rules(rules) => write!(f, "Rules({} rules)", rules.len()),
            SolutionStep::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// A named aggregate of projects.
#[derive(Debug, Clone)]
pub struct Solution {
    name: String,
    fields: IndexMap<String, String>,
    targets: Vec<TargetDecl>,
    steps: Vec<SolutionStep>,
}

impl Solution {
    pub fn builder(name: &str) -> SolutionBuilder {
        SolutionBuilder {
            solution: Solution {
                name: name.to_string(),
                fields: IndexMap::new(),
                targets: Vec::new(),
                steps: Vec::new(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &IndexMap<String, String> {
        &self.fields
    }

    pub fn targets(&self) -> &[TargetDecl] {
        &self.targets
    }

    pub fn steps(&self) -> &[SolutionStep] {
        &self.steps
    }
}

pub struct SolutionBuilder {
    solution: Solution,
}

impl SolutionBuilder {
    pub fn field(mut self, name: &str, template: &str) -> Self {
        self.solution
            .fields
            .insert(name.to_string(), template.to_string());
        self
    }

    pub fn targets(mut self, decl: TargetDecl) -> Self {
        self.solution.targets.push(decl);
        self
    }

    pub fn configure<F>(self, f: F) -> Self
    where
        F: Fn(&mut SolutionConfigurator<'_>) -> Result<(), MatrixError> + Send + Sync + 'static,
    {
        self.step(SolutionStep::custom(f))
    }

    pub fn step(mut self, step: SolutionStep) -> Self {
        self.solution.steps.push(step);
        self
    }

    pub fn build(self) -> Solution {
        self.solution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> IndexMap<String, String> {
        [("Name", "Oxygen"), ("SharpmakeCsPath", "/work")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn target() -> Target {
        Target::new([
            ("Platform", "win64"),
            ("DevEnv", "vs2022"),
            ("Optimization", "Debug"),
        ])
    }

    #[test]
    fn solution_templates_resolve() {
        let fields = fields();
        let mut conf = SolutionConfiguration::new("Oxygen", target());
        let mut diagnostics = Vec::new();
        let mut c = SolutionConfigurator::new(&mut conf, &fields, 16, &mut diagnostics);
        c.set(
            SolutionField::SolutionFileName,
            "[solution.Name]_[target.DevEnv]_[target.Platform]",
        )
        .unwrap()
        .set(SolutionField::SolutionPath, "[solution.SharpmakeCsPath]/solution")
        .unwrap()
        .add_project("oxygen");

        assert_eq!(
            conf.scalar(SolutionField::SolutionFileName),
            Some("Oxygen_vs2022_win64")
        );
        assert_eq!(conf.scalar(SolutionField::SolutionPath), Some("/work/solution"));
        assert_eq!(conf.projects().collect::<Vec<_>>(), ["oxygen"]);
    }

    #[test]
    fn project_references_dedup_in_order() {
        let fields = fields();
        let mut conf = SolutionConfiguration::new("Oxygen", target());
        let mut diagnostics = Vec::new();
        let mut c = SolutionConfigurator::new(&mut conf, &fields, 16, &mut diagnostics);
        c.add_project("engine").add_project("game").add_project("engine");
        assert_eq!(conf.projects().collect::<Vec<_>>(), ["engine", "game"]);
    }

    #[test]
    fn project_owner_is_not_visible_to_solutions() {
        let fields = fields();
        let mut conf = SolutionConfiguration::new("Oxygen", target());
        let mut diagnostics = Vec::new();
        let c = SolutionConfigurator::new(&mut conf, &fields, 16, &mut diagnostics);
        let err = c.resolve("[project.Name]").unwrap_err();
        assert_eq!(err.kind(), "UnknownTemplateReference");
    }

    #[test]
    fn solution_scalar_conflict_is_reported() {
        let fields = fields();
        let mut conf = SolutionConfiguration::new("Oxygen", target());
        let mut diagnostics = Vec::new();
        {
            let mut c = SolutionConfigurator::new(&mut conf, &fields, 16, &mut diagnostics);
            c.set(SolutionField::SolutionPath, "a").unwrap();
            c.set(SolutionField::SolutionPath, "b").unwrap();
        }
        assert_eq!(conf.scalar(SolutionField::SolutionPath), Some("b"));
        assert!(matches!(
            &diagnostics[0],
            Diagnostic::ConflictingOverride { owner, old, new, .. }
                if owner == "Oxygen" && old == "a" && new == "b"
        ));
    }
}
