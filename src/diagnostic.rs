//! Non-fatal findings collected during a generation run.
//!
//! Diagnostics never abort a run. They are returned alongside the generated
//! units and mirrored to `tracing` at warn level as they are raised.

use std::fmt;

use serde::Serialize;

/// A recoverable condition raised while expanding a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum Diagnostic {
    /// A scalar field was re-assigned to a different value. The new value wins.
    ConflictingOverride {
        /// Project (or solution) whose configuration was being built.
        owner: String,
        target: String,
        field: String,
        old: String,
        new: String,
    },
    /// A declared project or solution expanded to zero targets.
    EmptyTargetExpansion { unit: String },
}

impl Diagnostic {
    /// Stable tag for this diagnostic kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Diagnostic::ConflictingOverride { .. } => "ConflictingOverride",
            Diagnostic::EmptyTargetExpansion { .. } => "EmptyTargetExpansion",
        }
    }

    /// Log the diagnostic and append it to `sink`.
    pub(crate) fn report(self, sink: &mut Vec<Diagnostic>) {
        match &self {
            Diagnostic::ConflictingOverride {
                owner,
                target,
                field,
                old,
                new,
            } => tracing::warn!(
                kind = self.kind(),
                owner = %owner,
                target_name = %target,
                field = %field,
                old = %old,
                new = %new,
                "conflicting override, last write wins"
            ),
            Diagnostic::EmptyTargetExpansion { unit } => tracing::warn!(
                kind = self.kind(),
                unit = %unit,
                "no targets declared, nothing will be generated"
            ),
        }
        sink.push(self);
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::ConflictingOverride {
                owner,
                target,
                field,
                old,
                new,
            } => write!(
                f,
                "{}: {owner} [{target}] {field} overridden: '{old}' -> '{new}'",
                self.kind()
            ),
            Diagnostic::EmptyTargetExpansion { unit } => {
                write!(f, "{}: '{unit}' declares no targets", self.kind())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_display_carries_both_values() {
        let d = Diagnostic::ConflictingOverride {
            owner: "oxygen".into(),
            target: "Optimization=Debug".into(),
            field: "TargetPath".into(),
            old: "P1".into(),
            new: "P2".into(),
        };
        let msg = d.to_string();
        assert!(msg.starts_with("ConflictingOverride"));
        assert!(msg.contains("'P1' -> 'P2'"));
        assert!(msg.contains("TargetPath"));
    }

    #[test]
    fn report_appends_to_sink() {
        let mut sink = Vec::new();
        Diagnostic::EmptyTargetExpansion {
            unit: "tools".into(),
        }
        .report(&mut sink);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].kind(), "EmptyTargetExpansion");
    }

    #[test]
    fn serializes_with_kind_tag() {
        let d = Diagnostic::EmptyTargetExpansion {
            unit: "tools".into(),
        };
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["kind"], "EmptyTargetExpansion");
        assert_eq!(json["unit"], "tools");
    }
}
