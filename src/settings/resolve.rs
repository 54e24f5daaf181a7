//! The settings pipeline over pre-loaded input. No I/O happens here.
//!
//! 1. Check each file for unknown keys (strict mode)
//! 2. Parse and deep-merge files, later over earlier
//! 3. Merge environment variables on top
//! 4. Check override keys (strict mode) and merge them on top
//! 5. Deserialize into the confique layer; confique fills defaults

use std::path::{Path, PathBuf};

use confique::Config;
use toml::{Table, Value};

use crate::error::MatrixError;

use super::GeneratorSettings;
use super::layers::{deep_merge, env_to_table, overrides_to_table, valid_keys};

type SettingsLayer = <GeneratorSettings as Config>::Layer;

/// Everything a settings load needs.
pub struct SettingsInput {
    /// File contents, lowest priority first.
    pub files: Vec<(PathBuf, String)>,
    /// Raw environment, or synthetic pairs in tests.
    pub env_vars: Vec<(String, String)>,
    /// `None` disables the environment layer.
    pub env_prefix: Option<String>,
    /// `(dotted_key, value)` pairs with the highest priority.
    pub overrides: Vec<(String, Value)>,
    pub strict: bool,
}

pub fn resolve_settings(input: SettingsInput) -> Result<GeneratorSettings, MatrixError> {
    let mut merged = Table::new();
    for (path, content) in &input.files {
        if input.strict {
            check_unknown_keys(content, path)?;
        }
        let table: Table = toml::from_str(content).map_err(|e| MatrixError::ParseError {
            path: path.clone(),
            source: e,
        })?;
        merged = deep_merge(merged, table);
    }

    if let Some(prefix) = &input.env_prefix {
        merged = deep_merge(merged, env_to_table(prefix, input.env_vars));
    }

    if !input.overrides.is_empty() {
        if input.strict {
            let known = valid_keys(&GeneratorSettings::META);
            if let Some((key, _)) = input.overrides.iter().find(|(k, _)| !known.contains(k)) {
                return Err(MatrixError::InvalidValue {
                    key: key.clone(),
                    reason: "not a settings key".into(),
                });
            }
        }
        merged = deep_merge(merged, overrides_to_table(&input.overrides));
    }

    let layer: SettingsLayer =
        Value::Table(merged)
            .try_into()
            .map_err(|e: toml::de::Error| MatrixError::InvalidValue {
                key: "<settings>".into(),
                reason: e.to_string(),
            })?;

    let settings = GeneratorSettings::builder().preloaded(layer).load()?;
    tracing::debug!(
        template_iteration_cap = settings.template_iteration_cap,
        strict = settings.strict,
        "settings resolved"
    );
    Ok(settings)
}

/// Report every key in `content` the settings layer does not consume.
fn check_unknown_keys(content: &str, path: &Path) -> Result<(), MatrixError> {
    let mut unknown: Vec<String> = Vec::new();
    let deserializer = toml::Deserializer::new(content);
    let _layer: SettingsLayer = serde_ignored::deserialize(deserializer, |ignored| {
        unknown.push(ignored.to_string());
    })
    .map_err(|e| MatrixError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    if unknown.is_empty() {
        return Ok(());
    }

    let keys = unknown
        .into_iter()
        .map(|key| MatrixError::UnknownKey {
            line: key_line(content, &key),
            key,
            path: path.to_path_buf(),
        })
        .collect();
    Err(MatrixError::UnknownKeys {
        path: path.to_path_buf(),
        keys,
    })
}

/// 1-indexed line of a dotted key in a flat settings file, 0 when not found.
/// Settings files only use plain `[section]` headers.
fn key_line(content: &str, dotted_key: &str) -> usize {
    let (section, leaf) = match dotted_key.rsplit_once('.') {
        Some((section, leaf)) => (section, leaf),
        None => ("", dotted_key),
    };

    let mut current = String::new();
    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if let Some(header) = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.split_once(']'))
            .map(|(h, _)| h.trim())
        {
            current = header.to_string();
            continue;
        }
        if current == section
            && let Some(after) = trimmed.strip_prefix(leaf)
            && after.trim_start().starts_with('=')
        {
            return i + 1;
        }
    }
    0
}
