use std::path::PathBuf;
use thiserror::Error;

/// Every fatal condition raised while loading, expanding, or emitting a model.
///
/// Each variant carries a stable tag (see [`MatrixError::kind`]) so callers and
/// log pipelines can match on the kind without parsing messages.
#[derive(Debug, Error)]
#[cfg_attr(feature = "rich-errors", derive(miette::Diagnostic))]
pub enum MatrixError {
    #[error("Inheritance cycle: project '{project}' appears twice in its own ancestor chain")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(buildmatrix::inheritance_cycle)))]
    InheritanceCycle { project: String },

    #[error("Solution '{solution}' references project '{project}' for target {target}, which the project does not declare")]
    #[cfg_attr(
        feature = "rich-errors",
        diagnostic(code(buildmatrix::unsupported_target_for_project))
    )]
    UnsupportedTargetForProject {
        solution: String,
        project: String,
        target: String,
    },

    #[error("Unknown template reference '[{owner}.{field}]'")]
    #[cfg_attr(
        feature = "rich-errors",
        diagnostic(code(buildmatrix::unknown_template_reference))
    )]
    UnknownTemplateReference { owner: String, field: String },

    #[error("Template '{template}' did not resolve within {iteration_cap} passes (reference cycle?)")]
    #[cfg_attr(
        feature = "rich-errors",
        diagnostic(code(buildmatrix::unresolvable_template))
    )]
    UnresolvableTemplate {
        template: String,
        iteration_cap: usize,
    },

    #[error("Configuration of '{project}' for target {target} is finalized and cannot be modified")]
    #[cfg_attr(
        feature = "rich-errors",
        diagnostic(code(buildmatrix::configuration_already_finalized))
    )]
    ConfigurationAlreadyFinalized { project: String, target: String },

    #[error("Unknown project '{name}' (referenced by {referenced_by})")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(buildmatrix::unknown_project)))]
    UnknownProject { name: String, referenced_by: String },

    #[error("Duplicate {kind} declaration '{name}'")]
    #[cfg_attr(
        feature = "rich-errors",
        diagnostic(code(buildmatrix::duplicate_declaration))
    )]
    DuplicateDeclaration { kind: &'static str, name: String },

    #[error("Unknown key '{key}' in {path} (line {line})")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(buildmatrix::unknown_key)))]
    UnknownKey {
        key: String,
        path: PathBuf,
        line: usize,
    },

    #[error("Unknown keys in {path}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(buildmatrix::unknown_keys)))]
    UnknownKeys {
        path: PathBuf,
        keys: Vec<MatrixError>,
    },

    #[error("Failed to parse {path}: {source}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(buildmatrix::parse_error)))]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to read {path}: {source}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(buildmatrix::io_error)))]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Settings error: {0}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(buildmatrix::settings_error)))]
    ConfigError(#[from] confique::Error),

    #[error("Invalid value for '{key}': {reason}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(buildmatrix::invalid_value)))]
    InvalidValue { key: String, reason: String },

    #[error("Failed to emit generation unit: {0}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(buildmatrix::emit_error)))]
    Emit(#[from] serde_json::Error),
}

impl MatrixError {
    /// Stable tag for this error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            MatrixError::InheritanceCycle { .. } => "InheritanceCycle",
            MatrixError::UnsupportedTargetForProject { .. } => "UnsupportedTargetForProject",
            MatrixError::UnknownTemplateReference { .. } => "UnknownTemplateReference",
            MatrixError::UnresolvableTemplate { .. } => "UnresolvableTemplate",
            MatrixError::ConfigurationAlreadyFinalized { .. } => "ConfigurationAlreadyFinalized",
            MatrixError::UnknownProject { .. } => "UnknownProject",
            MatrixError::DuplicateDeclaration { .. } => "DuplicateDeclaration",
            MatrixError::UnknownKey { .. } => "UnknownKey",
            MatrixError::UnknownKeys { .. } => "UnknownKeys",
            MatrixError::ParseError { .. } => "ParseError",
            MatrixError::IoError { .. } => "IoError",
            MatrixError::ConfigError(_) => "ConfigError",
            MatrixError::InvalidValue { .. } => "InvalidValue",
            MatrixError::Emit(_) => "Emit",
        }
    }
}
