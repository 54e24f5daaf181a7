//! Declarative model files.
//!
//! A model file declares projects and solutions as TOML arrays of tables. Each
//! `configure` entry is a [`Rule`]: a target filter plus the effects to apply
//! when the filter matches. Table order is preserved, so axis order, rule
//! order and list order all follow the file.
//!
//! ```toml
//! [[project]]
//! name = "oxygen"
//! base = "BaseProject"
//! targets = [{ Platform = "win64", Optimization = "Release|Debug" }]
//!
//! [[project.configure]]
//! when = { Optimization = "Debug" }
//! defines = ["OXYDEBUG"]
//! ```
//!
//! In strict mode every key the model types do not consume is reported with
//! its dotted path and a best-effort line number.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::configuration::{Configurator, OutputType, ScalarField};
use crate::error::MatrixError;
use crate::project::{ConfigureStep, Project};
use crate::registry::Registry;
use crate::settings::GeneratorSettings;
use crate::solution::{Solution, SolutionConfigurator, SolutionField, SolutionStep};
use crate::target::{FlagSet, Target, TargetDecl};

/// Axis conditions: axis name to the values that satisfy it.
pub type Conditions = IndexMap<String, FlagSet>;

/// A parsed model file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelFile {
    #[serde(default, rename = "project")]
    pub projects: Vec<ProjectDecl>,
    #[serde(default, rename = "solution")]
    pub solutions: Vec<SolutionDecl>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDecl {
    pub name: String,
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub targets: Vec<Conditions>,
    #[serde(default)]
    pub fields: IndexMap<String, String>,
    #[serde(default)]
    pub configure: Vec<Rule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionDecl {
    pub name: String,
    #[serde(default)]
    pub targets: Vec<Conditions>,
    #[serde(default)]
    pub fields: IndexMap<String, String>,
    #[serde(default)]
    pub configure: Vec<SolutionRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyFileDecl {
    pub source: String,
    #[serde(default)]
    pub destination: String,
}

/// A declarative project configuration step.
///
/// The rule applies to a target when every `when` condition holds and no
/// `unless` condition does. Effects run in field order: `set`, `append`,
/// `output`, `defines`, `include_paths`, `library_files`, `options`,
/// `custom_properties`, `copy_files`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rule {
    pub when: Conditions,
    pub unless: Conditions,
    pub set: IndexMap<String, String>,
    pub append: IndexMap<String, String>,
    pub output: Option<OutputType>,
    pub defines: Vec<String>,
    pub include_paths: Vec<String>,
    pub library_files: Vec<String>,
    pub options: Vec<String>,
    pub custom_properties: IndexMap<String, String>,
    pub copy_files: Vec<CopyFileDecl>,
}

impl Rule {
    pub fn applies_to(&self, target: &Target) -> bool {
        applies(&self.when, &self.unless, target)
    }

    /// Reject scalar names that are not configuration fields.
    pub fn validate(&self, context: &str) -> Result<(), MatrixError> {
        for (op, map) in [("set", &self.set), ("append", &self.append)] {
            for name in map.keys() {
                name.parse::<ScalarField>()
                    .map_err(|_| MatrixError::InvalidValue {
                        key: format!("{context}.{op}.{name}"),
                        reason: "not a configuration scalar field".into(),
                    })?;
            }
        }
        Ok(())
    }

    pub(crate) fn apply(&self, conf: &mut Configurator<'_>) -> Result<(), MatrixError> {
        if !self.applies_to(conf.target()) {
            return Ok(());
        }

        for (name, value) in &self.set {
            conf.set(name.parse()?, value)?;
        }
        for (name, suffix) in &self.append {
            conf.append(name.parse()?, suffix)?;
        }
        if let Some(output) = self.output {
            conf.output(output)?;
        }
        for define in &self.defines {
            conf.define(define)?;
        }
        for path in &self.include_paths {
            conf.include_path(path)?;
        }
        for library in &self.library_files {
            conf.library_file(library)?;
        }
        for option in &self.options {
            conf.option(option)?;
        }
        for (key, value) in &self.custom_properties {
            conf.custom_property(key, value)?;
        }
        for copy in &self.copy_files {
            conf.copy_file(&copy.source, &copy.destination)?;
        }
        Ok(())
    }
}

/// A declarative solution configuration step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolutionRule {
    pub when: Conditions,
    pub unless: Conditions,
    pub set: IndexMap<String, String>,
    pub projects: Vec<String>,
}

impl SolutionRule {
    pub fn applies_to(&self, target: &Target) -> bool {
        applies(&self.when, &self.unless, target)
    }

    pub fn validate(&self, context: &str) -> Result<(), MatrixError> {
        for name in self.set.keys() {
            name.parse::<SolutionField>()
                .map_err(|_| MatrixError::InvalidValue {
                    key: format!("{context}.set.{name}"),
                    reason: "not a solution field".into(),
                })?;
        }
        Ok(())
    }

    pub(crate) fn apply(&self, conf: &mut SolutionConfigurator<'_>) -> Result<(), MatrixError> {
        if !self.applies_to(conf.target()) {
            return Ok(());
        }
        for (name, value) in &self.set {
            conf.set(name.parse()?, value)?;
        }
        for project in &self.projects {
            conf.add_project(project);
        }
        Ok(())
    }
}

fn applies(when: &Conditions, unless: &Conditions, target: &Target) -> bool {
    target.satisfies(when) && !target.matches_any(unless)
}

fn target_decls(targets: Vec<Conditions>) -> impl Iterator<Item = TargetDecl> {
    targets
        .into_iter()
        .map(|axes| axes.into_iter().collect::<TargetDecl>())
}

impl ProjectDecl {
    pub fn into_project(self) -> Result<Project, MatrixError> {
        for (i, rule) in self.configure.iter().enumerate() {
            rule.validate(&format!("project '{}'.configure.{i}", self.name))?;
        }

        let mut builder = Project::builder(&self.name);
        if let Some(base) = &self.base {
            builder = builder.base(base);
        }
        for (name, template) in &self.fields {
            builder = builder.field(name, template);
        }
        for decl in target_decls(self.targets) {
            builder = builder.targets(decl);
        }
        if !self.configure.is_empty() {
            builder = builder.step(ConfigureStep::Rules(Arc::from(self.configure)));
        }
        Ok(builder.build())
    }
}

impl SolutionDecl {
    pub fn into_solution(self) -> Result<Solution, MatrixError> {
        for (i, rule) in self.configure.iter().enumerate() {
            rule.validate(&format!("solution '{}'.configure.{i}", self.name))?;
        }

        let mut builder = Solution::builder(&self.name);
        for (name, template) in &self.fields {
            builder = builder.field(name, template);
        }
        for decl in target_decls(self.targets) {
            builder = builder.targets(decl);
        }
        if !self.configure.is_empty() {
            builder = builder.step(SolutionStep::Rules(Arc::from(self.configure)));
        }
        Ok(builder.build())
    }
}

impl ModelFile {
    /// Build a registry. `definition_dir` backs `[project.SharpmakeCsPath]`.
    pub fn into_registry(self, definition_dir: impl Into<PathBuf>) -> Result<Registry, MatrixError> {
        let mut builder = Registry::builder().definition_dir(definition_dir);
        for decl in self.projects {
            builder = builder.project(decl.into_project()?);
        }
        for decl in self.solutions {
            builder = builder.solution(decl.into_solution()?);
        }
        builder.build()
    }
}

/// Parse model text. `path` is only used for error reporting.
pub fn parse_model(content: &str, path: &Path, strict: bool) -> Result<ModelFile, MatrixError> {
    let parse_err = |e: toml::de::Error| MatrixError::ParseError {
        path: path.to_path_buf(),
        source: e,
    };

    if !strict {
        return toml::from_str(content).map_err(parse_err);
    }

    let mut unknown_keys: Vec<String> = Vec::new();
    let deserializer = toml::Deserializer::new(content);
    let model: ModelFile = serde_ignored::deserialize(deserializer, |ignored| {
        unknown_keys.push(ignored.to_string());
    })
    .map_err(parse_err)?;

    if unknown_keys.is_empty() {
        return Ok(model);
    }

    let keys = unknown_keys
        .into_iter()
        .map(|key| {
            let line = find_key_line(content, &key);
            MatrixError::UnknownKey {
                key,
                path: path.to_path_buf(),
                line,
            }
        })
        .collect();
    Err(MatrixError::UnknownKeys {
        path: path.to_path_buf(),
        keys,
    })
}

/// Read and parse a model file into a registry.
///
/// The definition directory is `settings.definition_dir` when set, otherwise
/// the directory containing the model file.
pub fn load_model(path: &Path, settings: &GeneratorSettings) -> Result<Registry, MatrixError> {
    let content = std::fs::read_to_string(path).map_err(|e| MatrixError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let model = parse_model(&content, path, settings.strict)?;
    let definition_dir = definition_dir(path, settings);

    tracing::info!(
        path = %path.display(),
        projects = model.projects.len(),
        solutions = model.solutions.len(),
        definition_dir = %definition_dir.display(),
        "model loaded"
    );
    model.into_registry(definition_dir)
}

pub(crate) fn definition_dir(model_path: &Path, settings: &GeneratorSettings) -> PathBuf {
    if let Some(dir) = &settings.definition_dir {
        return dir.clone();
    }
    model_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf()
}

/// Find the 1-indexed line of a dotted key such as `project.1.configure.0.typo`.
///
/// Tracks `[table]` and `[[array]]` headers while scanning, numbering array
/// entries as they appear, and matches the leaf only inside the right table.
/// Keys inside inline tables are not located. Returns 0 when not found.
fn find_key_line(content: &str, dotted_key: &str) -> usize {
    let segments: Vec<&str> = dotted_key.split('.').collect();
    let Some((leaf, expected_section)) = segments.split_last() else {
        return 0;
    };

    let mut array_counts: HashMap<String, usize> = HashMap::new();
    let mut current_section: Vec<String> = Vec::new();

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();

        if let Some(header) = trimmed
            .strip_prefix("[[")
            .and_then(|rest| rest.split_once("]]"))
            .map(|(h, _)| h)
        {
            let parts: Vec<&str> = header.split('.').map(str::trim).collect();
            if let Some((last, parents)) = parts.split_last() {
                let mut resolved = resolve_header(parents, &array_counts);
                resolved.push(last.to_string());
                let key = resolved.join(".");
                let index = array_counts
                    .entry(key)
                    .and_modify(|n| *n += 1)
                    .or_insert(0);
                resolved.push(index.to_string());
                current_section = resolved;
            }
            continue;
        }

        if let Some(header) = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.split_once(']'))
            .map(|(h, _)| h)
        {
            let parts: Vec<&str> = header.split('.').map(str::trim).collect();
            current_section = resolve_header(&parts, &array_counts);
            continue;
        }

        let in_right_section = expected_section.len() == current_section.len()
            && expected_section
                .iter()
                .zip(&current_section)
                .all(|(a, b)| *a == b);

        if in_right_section
            && let Some(after_key) = trimmed.strip_prefix(leaf)
            && after_key.trim_start().starts_with('=')
        {
            return i + 1;
        }
    }
    0
}

/// Resolve header segments to a concrete path, inserting the current index
/// after every segment that names an array of tables.
fn resolve_header(parts: &[&str], array_counts: &HashMap<String, usize>) -> Vec<String> {
    let mut resolved: Vec<String> = Vec::new();
    for part in parts {
        resolved.push(part.to_string());
        if let Some(index) = array_counts.get(&resolved.join(".")) {
            resolved.push(index.to_string());
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::Configuration;
    use crate::driver::generate;
    use crate::fixtures::test::{OXYGEN_MODEL, oxygen_registry, oxygen_target};
    use crate::walker::resolve_configuration;

    fn path() -> PathBuf {
        PathBuf::from("/work/oxygen.model.toml")
    }

    fn registry(content: &str) -> Registry {
        parse_model(content, &path(), true)
            .unwrap()
            .into_registry("/work")
            .unwrap()
    }

    fn resolve(registry: &Registry, project: &str, target: &Target) -> Configuration {
        resolve_configuration(registry, project, target, None)
            .unwrap()
            .0
    }

    #[test]
    fn oxygen_model_matches_programmatic_model() {
        let declared = generate(&registry(OXYGEN_MODEL)).unwrap();
        let programmatic = generate(&oxygen_registry()).unwrap();
        assert_eq!(declared, programmatic);
    }

    #[test]
    fn oxygen_model_keeps_declaration_order() {
        let model = parse_model(OXYGEN_MODEL, &path(), true).unwrap();
        let names: Vec<&str> = model.projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["BaseProject", "oxygen"]);
        let axes: Vec<&str> = model.projects[1].targets[0]
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(axes, ["Platform", "DevEnv", "Optimization"]);
    }

    #[test]
    fn when_and_unless_filter_rules() {
        let content = r#"
[[project]]
name = "app"
targets = [{ Platform = "win64|linux", Optimization = "Debug|Release" }]

[[project.configure]]
when = { Optimization = "Debug" }
defines = ["DEBUG"]

[[project.configure]]
unless = { Platform = "linux" }
defines = ["WINDOWS"]

[[project.configure]]
when = { Platform = "win64", Optimization = "Release" }
defines = ["SHIP"]
"#;
        let registry = registry(content);
        let defines = |platform: &str, optimization: &str| -> Vec<String> {
            let target = Target::new([("Platform", platform), ("Optimization", optimization)]);
            resolve(&registry, "app", &target)
                .defines()
                .iter()
                .cloned()
                .collect()
        };
        assert_eq!(defines("win64", "Debug"), ["DEBUG", "WINDOWS"]);
        assert_eq!(defines("win64", "Release"), ["WINDOWS", "SHIP"]);
        assert_eq!(defines("linux", "Debug"), ["DEBUG"]);
        assert!(defines("linux", "Release").is_empty());
    }

    #[test]
    fn effects_apply_in_field_order() {
        let content = r#"
[[project]]
name = "app"

[[project.configure]]
copy_files = [{ source = "[conf.TargetPath]/x.dll", destination = "bin" }]
append = { TargetPath = "/[target.Optimization]" }
set = { TargetPath = "out" }
"#;
        let registry = registry(content);
        let conf = resolve(&registry, "app", &Target::new([("Optimization", "Debug")]));
        assert_eq!(conf.scalar(ScalarField::TargetPath), Some("out/Debug"));
        assert_eq!(conf.copy_files()[0].source, PathBuf::from("out/Debug/x.dll"));
        assert_eq!(conf.copy_files()[0].destination, PathBuf::from("bin"));
    }

    #[test]
    fn unknown_scalar_name_is_rejected_at_load_time() {
        let content = r#"
[[project]]
name = "app"

[[project.configure]]
set = { OutputPath = "x" }
"#;
        let err = parse_model(content, &path(), true)
            .unwrap()
            .into_registry("/work")
            .unwrap_err();
        match err {
            MatrixError::InvalidValue { key, .. } => {
                assert_eq!(key, "project 'app'.configure.0.set.OutputPath")
            }
            other => panic!("Expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn unknown_solution_field_is_rejected() {
        let content = r#"
[[solution]]
name = "S"

[[solution.configure]]
set = { SolutionDir = "x" }
"#;
        let err = parse_model(content, &path(), true)
            .unwrap()
            .into_registry("/work")
            .unwrap_err();
        assert_eq!(err.kind(), "InvalidValue");
    }

    #[test]
    fn strict_reports_unknown_keys_with_lines() {
        let content = r#"[[project]]
name = "first"

[[project]]
name = "second"
bsae = "first"

[[project.configure]]
defines = ["A"]
includes = ["B"]
"#;
        let err = parse_model(content, &path(), true).unwrap_err();
        match err {
            MatrixError::UnknownKeys { path: p, keys } => {
                assert_eq!(p, path());
                assert_eq!(keys.len(), 2);
                match (&keys[0], &keys[1]) {
                    (
                        MatrixError::UnknownKey {
                            key: k1, line: l1, ..
                        },
                        MatrixError::UnknownKey {
                            key: k2, line: l2, ..
                        },
                    ) => {
                        assert_eq!(k1, "project.1.bsae");
                        assert_eq!(*l1, 6);
                        assert_eq!(k2, "project.1.configure.0.includes");
                        assert_eq!(*l2, 10);
                    }
                    other => panic!("Expected UnknownKey pair, got {other:?}"),
                }
            }
            other => panic!("Expected UnknownKeys, got {other:?}"),
        }
    }

    #[test]
    fn lenient_mode_ignores_unknown_keys() {
        let content = "[[project]]\nname = \"app\"\ncolour = \"blue\"\n";
        let model = parse_model(content, &path(), false).unwrap();
        assert_eq!(model.projects[0].name, "app");
    }

    #[test]
    fn syntax_error_names_the_file() {
        let err = parse_model("[[project]\nname = ", &path(), true).unwrap_err();
        match err {
            MatrixError::ParseError { path: p, .. } => assert_eq!(p, path()),
            other => panic!("Expected ParseError, got {other:?}"),
        }
    }

    #[test]
    fn missing_project_name_is_a_parse_error() {
        let err = parse_model("[[project]]\nbase = \"x\"\n", &path(), true).unwrap_err();
        assert_eq!(err.kind(), "ParseError");
    }

    #[test]
    fn find_key_line_tracks_nested_arrays() {
        let content = "[[a]]\nx = 1\n[[a]]\n[a.t]\ny = 2\n[[a.b]]\nz = 3\n";
        assert_eq!(find_key_line(content, "a.0.x"), 2);
        assert_eq!(find_key_line(content, "a.1.t.y"), 5);
        assert_eq!(find_key_line(content, "a.1.b.0.z"), 7);
        assert_eq!(find_key_line(content, "a.0.z"), 0);
    }

    #[test]
    fn load_model_defaults_definition_dir_to_file_parent() {
        let dir = tempfile::TempDir::new().unwrap();
        let model_path = dir.path().join("model.toml");
        std::fs::write(
            &model_path,
            "[[project]]\nname = \"app\"\ntargets = [{ Platform = \"win64\" }]\n\n[[project.configure]]\ninclude_paths = ['[project.SharpmakeCsPath]/src']\n",
        )
        .unwrap();

        let registry = load_model(&model_path, &GeneratorSettings::default()).unwrap();
        assert_eq!(registry.definition_dir(), dir.path().to_string_lossy());

        let conf = resolve(&registry, "app", &Target::new([("Platform", "win64")]));
        assert_eq!(
            conf.include_paths(),
            [format!("{}/src", dir.path().to_string_lossy())]
        );
    }

    #[test]
    fn load_model_honours_definition_dir_override() {
        let dir = tempfile::TempDir::new().unwrap();
        let model_path = dir.path().join("model.toml");
        std::fs::write(&model_path, "").unwrap();
        let settings = GeneratorSettings {
            definition_dir: Some(PathBuf::from("/elsewhere")),
            ..GeneratorSettings::default()
        };
        let registry = load_model(&model_path, &settings).unwrap();
        assert_eq!(registry.definition_dir(), "/elsewhere");
    }

    #[test]
    fn missing_model_file_is_an_io_error() {
        let err = load_model(Path::new("/no/such/model.toml"), &GeneratorSettings::default())
            .unwrap_err();
        assert_eq!(err.kind(), "IoError");
    }

    #[test]
    fn oxygen_target_fixture_matches_model_targets() {
        let registry = registry(OXYGEN_MODEL);
        let targets = registry.project_targets("oxygen").unwrap();
        assert!(targets.contains(&oxygen_target("Debug")));
        assert!(targets.contains(&oxygen_target("Release")));
    }
}
