//! The per-(project, target) configuration accumulator.
//!
//! [`Configuration`] holds already-resolved values and enforces the merge
//! rules. [`Configurator`] is the handle mutation steps receive: it resolves
//! every template at assignment time against the project, target, solution
//! and the configuration built so far, then hands the result to
//! [`Configuration`].
//!
//! Merge rules:
//!
//! | Field | Policy |
//! |-------|--------|
//! | scalars, `Output` | last write wins; a different value raises `ConflictingOverride` |
//! | `defines`, `options` | ordered set, repeats dropped |
//! | `include_paths`, `library_files` | ordered, repeats kept |
//! | `custom_properties` | ordered map; a different value raises `ConflictingOverride` |
//! | `copy_files` | ordered |
//!
//! Nothing is ever removed. Once the walker finalizes a configuration every
//! mutation fails with [`MatrixError::ConfigurationAlreadyFinalized`].

use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::diagnostic::Diagnostic;
use crate::error::MatrixError;
use crate::target::Target;
use crate::template::{self, FieldSource, TemplateContext};

/// Single-valued string fields of a project configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarField {
    ProjectFileName,
    ProjectPath,
    IntermediatePath,
    TargetPath,
    PrecompHeader,
    PrecompSource,
    SolutionFolder,
}

impl ScalarField {
    pub const ALL: [ScalarField; 7] = [
        ScalarField::ProjectFileName,
        ScalarField::ProjectPath,
        ScalarField::IntermediatePath,
        ScalarField::TargetPath,
        ScalarField::PrecompHeader,
        ScalarField::PrecompSource,
        ScalarField::SolutionFolder,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ScalarField::ProjectFileName => "ProjectFileName",
            ScalarField::ProjectPath => "ProjectPath",
            ScalarField::IntermediatePath => "IntermediatePath",
            ScalarField::TargetPath => "TargetPath",
            ScalarField::PrecompHeader => "PrecompHeader",
            ScalarField::PrecompSource => "PrecompSource",
            ScalarField::SolutionFolder => "SolutionFolder",
        }
    }
}

impl FromStr for ScalarField {
    type Err = MatrixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScalarField::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| MatrixError::InvalidValue {
                key: s.to_string(),
                reason: "not a configuration scalar field".into(),
            })
    }
}

impl fmt::Display for ScalarField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of artifact a project produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputType {
    Exe,
    Lib,
    Dll,
    Utility,
    None,
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutputType::Exe => "Exe",
            OutputType::Lib => "Lib",
            OutputType::Dll => "Dll",
            OutputType::Utility => "Utility",
            OutputType::None => "None",
        };
        f.write_str(s)
    }
}

/// Copy `source` into `destination` (a subdirectory of the output directory;
/// empty means the output directory itself).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyRule {
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl CopyRule {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }
}

/// Resolved settings for one (project, target) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Configuration {
    project: String,
    target: Target,
    scalars: IndexMap<ScalarField, String>,
    output: Option<OutputType>,
    defines: IndexSet<String>,
    include_paths: Vec<String>,
    library_files: Vec<String>,
    options: IndexSet<String>,
    custom_properties: IndexMap<String, String>,
    copy_files: Vec<CopyRule>,
    resource_manifest: Vec<CopyRule>,
    #[serde(skip)]
    finalized: bool,
}

impl Configuration {
    pub fn new(project: &str, target: Target) -> Self {
        Self {
            project: project.to_string(),
            target,
            scalars: IndexMap::new(),
            output: None,
            defines: IndexSet::new(),
            include_paths: Vec::new(),
            library_files: Vec::new(),
            options: IndexSet::new(),
            custom_properties: IndexMap::new(),
            copy_files: Vec::new(),
            resource_manifest: Vec::new(),
            finalized: false,
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn scalar(&self, field: ScalarField) -> Option<&str> {
        self.scalars.get(&field).map(String::as_str)
    }

    pub fn output(&self) -> Option<OutputType> {
        self.output
    }

    pub fn defines(&self) -> &IndexSet<String> {
        &self.defines
    }

    pub fn include_paths(&self) -> &[String] {
        &self.include_paths
    }

    pub fn library_files(&self) -> &[String] {
        &self.library_files
    }

    pub fn options(&self) -> &IndexSet<String> {
        &self.options
    }

    pub fn custom_properties(&self) -> &IndexMap<String, String> {
        &self.custom_properties
    }

    pub fn copy_files(&self) -> &[CopyRule] {
        &self.copy_files
    }

    /// Resource files the emitter copies into the output tree.
    pub fn resource_manifest(&self) -> &[CopyRule] {
        &self.resource_manifest
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Assign a scalar. Returns a conflict diagnostic when a different value was
    /// already present; the new value is applied either way.
    pub fn set_scalar(
        &mut self,
        field: ScalarField,
        value: String,
    ) -> Result<Option<Diagnostic>, MatrixError> {
        self.ensure_open()?;
        let old = self.scalars.insert(field, value.clone());
        Ok(old
            .filter(|old| *old != value)
            .map(|old| self.conflict(field.name(), old, value)))
    }

    /// Extend a scalar with `suffix`, starting it if unset. Never a conflict.
    pub fn append_scalar(&mut self, field: ScalarField, suffix: &str) -> Result<(), MatrixError> {
        self.ensure_open()?;
        self.scalars.entry(field).or_default().push_str(suffix);
        Ok(())
    }

    pub fn set_output(&mut self, output: OutputType) -> Result<Option<Diagnostic>, MatrixError> {
        self.ensure_open()?;
        let old = self.output.replace(output);
        Ok(old
            .filter(|old| *old != output)
            .map(|old| self.conflict("Output", old.to_string(), output.to_string())))
    }

    pub fn add_define(&mut self, define: String) -> Result<(), MatrixError> {
        self.ensure_open()?;
        self.defines.insert(define);
        Ok(())
    }

    pub fn add_include_path(&mut self, path: String) -> Result<(), MatrixError> {
        self.ensure_open()?;
        self.include_paths.push(path);
        Ok(())
    }

    pub fn add_library_file(&mut self, library: String) -> Result<(), MatrixError> {
        self.ensure_open()?;
        self.library_files.push(library);
        Ok(())
    }

    pub fn add_option(&mut self, option: String) -> Result<(), MatrixError> {
        self.ensure_open()?;
        self.options.insert(option);
        Ok(())
    }

    pub fn add_custom_property(
        &mut self,
        key: String,
        value: String,
    ) -> Result<Option<Diagnostic>, MatrixError> {
        self.ensure_open()?;
        let old = self.custom_properties.insert(key.clone(), value.clone());
        Ok(old
            .filter(|old| *old != value)
            .map(|old| self.conflict(&format!("CustomProperties.{key}"), old, value)))
    }

    pub fn add_copy_file(&mut self, rule: CopyRule) -> Result<(), MatrixError> {
        self.ensure_open()?;
        self.copy_files.push(rule);
        Ok(())
    }

    pub(crate) fn attach_manifest(&mut self, manifest: &[CopyRule]) -> Result<(), MatrixError> {
        self.ensure_open()?;
        self.resource_manifest.extend_from_slice(manifest);
        Ok(())
    }

    pub(crate) fn finalize(&mut self) {
        self.finalized = true;
    }

    fn ensure_open(&self) -> Result<(), MatrixError> {
        if self.finalized {
            return Err(MatrixError::ConfigurationAlreadyFinalized {
                project: self.project.clone(),
                target: self.target.to_string(),
            });
        }
        Ok(())
    }

    fn conflict(&self, field: &str, old: String, new: String) -> Diagnostic {
        Diagnostic::ConflictingOverride {
            owner: self.project.clone(),
            target: self.target.to_string(),
            field: field.to_string(),
            old,
            new,
        }
    }
}

/// `[conf.X]` reads scalars assigned so far, plus `Output`.
impl FieldSource for Configuration {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        if name == "Output" {
            return self.output.map(|o| Cow::Owned(o.to_string()));
        }
        let field = name.parse::<ScalarField>().ok()?;
        self.scalar(field).map(Cow::Borrowed)
    }
}

/// Mutation handle passed to project configuration steps.
#[derive(Debug)]
pub struct Configurator<'a> {
    conf: &'a mut Configuration,
    project_fields: &'a IndexMap<String, String>,
    solution_fields: Option<&'a IndexMap<String, String>>,
    iteration_cap: usize,
    diagnostics: &'a mut Vec<Diagnostic>,
}

impl<'a> Configurator<'a> {
    pub(crate) fn new(
        conf: &'a mut Configuration,
        project_fields: &'a IndexMap<String, String>,
        solution_fields: Option<&'a IndexMap<String, String>>,
        iteration_cap: usize,
        diagnostics: &'a mut Vec<Diagnostic>,
    ) -> Self {
        Self {
            conf,
            project_fields,
            solution_fields,
            iteration_cap,
            diagnostics,
        }
    }

    pub fn target(&self) -> &Target {
        self.conf.target()
    }

    pub fn project_name(&self) -> &str {
        self.conf.project()
    }

    /// The configuration accumulated so far, including ancestor steps.
    pub fn configuration(&self) -> &Configuration {
        self.conf
    }

    /// Current value of a scalar, or `None` if no step assigned it yet.
    pub fn get(&self, field: ScalarField) -> Option<&str> {
        self.conf.scalar(field)
    }

    /// Resolve a template against the current state without assigning it.
    pub fn resolve(&self, text: &str) -> Result<String, MatrixError> {
        let conf: &Configuration = &*self.conf;
        let target = conf.target();
        let mut ctx = TemplateContext::new()
            .with_project(self.project_fields)
            .with_target(target)
            .with_conf(conf)
            .iteration_cap(self.iteration_cap);
        if let Some(solution) = self.solution_fields {
            ctx = ctx.with_solution(solution);
        }
        template::resolve(text, &ctx)
    }

    pub fn set(&mut self, field: ScalarField, value: &str) -> Result<&mut Self, MatrixError> {
        let value = self.resolve(value)?;
        if let Some(d) = self.conf.set_scalar(field, value)? {
            d.report(self.diagnostics);
        }
        Ok(self)
    }

    pub fn append(&mut self, field: ScalarField, suffix: &str) -> Result<&mut Self, MatrixError> {
        let suffix = self.resolve(suffix)?;
        self.conf.append_scalar(field, &suffix)?;
        Ok(self)
    }

    pub fn output(&mut self, output: OutputType) -> Result<&mut Self, MatrixError> {
        if let Some(d) = self.conf.set_output(output)? {
            d.report(self.diagnostics);
        }
        Ok(self)
    }

    pub fn define(&mut self, define: &str) -> Result<&mut Self, MatrixError> {
        let define = self.resolve(define)?;
        self.conf.add_define(define)?;
        Ok(self)
    }

    pub fn include_path(&mut self, path: &str) -> Result<&mut Self, MatrixError> {
        let path = self.resolve(path)?;
        self.conf.add_include_path(path)?;
        Ok(self)
    }

    pub fn library_file(&mut self, library: &str) -> Result<&mut Self, MatrixError> {
        let library = self.resolve(library)?;
        self.conf.add_library_file(library)?;
        Ok(self)
    }

    pub fn option(&mut self, option: &str) -> Result<&mut Self, MatrixError> {
        let option = self.resolve(option)?;
        self.conf.add_option(option)?;
        Ok(self)
    }

    pub fn custom_property(&mut self, key: &str, value: &str) -> Result<&mut Self, MatrixError> {
        let key = self.resolve(key)?;
        let value = self.resolve(value)?;
        if let Some(d) = self.conf.add_custom_property(key, value)? {
            d.report(self.diagnostics);
        }
        Ok(self)
    }

    pub fn copy_file(&mut self, source: &str, destination: &str) -> Result<&mut Self, MatrixError> {
        let rule = CopyRule::new(self.resolve(source)?, self.resolve(destination)?);
        self.conf.add_copy_file(rule)?;
        Ok(self)
    }
}
