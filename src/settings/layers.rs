//! Turning each settings source into a `toml::Table` and merging them.

use std::collections::HashSet;

use confique::meta::{FieldKind, Meta};
use toml::{Table, Value};

/// Deep-merge `overlay` on top of `base`. Tables merge recursively; any other
/// value in `overlay` replaces the one in `base`.
pub fn deep_merge(mut base: Table, overlay: Table) -> Table {
    for (key, overlay_val) in overlay {
        match (base.remove(&key), overlay_val) {
            (Some(Value::Table(base_tbl)), Value::Table(overlay_tbl)) => {
                base.insert(key, Value::Table(deep_merge(base_tbl, overlay_tbl)));
            }
            (_, overlay_val) => {
                base.insert(key, overlay_val);
            }
        }
    }
    base
}

/// Build a table from `{PREFIX}__*` environment variables.
///
/// `__` separates nesting levels and segments are lowercased, so
/// `BUILDMATRIX__RESOURCES__DIR` sets `resources.dir`. Values are typed
/// heuristically: a bracketed TOML array, then bool, integer, float, string.
pub fn env_to_table(prefix: &str, vars: impl IntoIterator<Item = (String, String)>) -> Table {
    let needle = format!("{prefix}__");
    let mut table = Table::new();

    for (key, value) in vars {
        let Some(rest) = key.strip_prefix(&needle) else {
            continue;
        };
        if rest.is_empty() {
            continue;
        }
        let segments: Vec<String> = rest.split("__").map(str::to_lowercase).collect();
        insert_nested(&mut table, &segments, parse_env_value(&value));
    }

    table
}

fn parse_env_value(s: &str) -> Value {
    if s.trim_start().starts_with('[')
        && let Ok(mut parsed) = format!("v = {s}").parse::<Table>()
        && let Some(array) = parsed.remove("v")
    {
        return array;
    }
    if s.eq_ignore_ascii_case("true") {
        return Value::Boolean(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Value::Boolean(false);
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Integer(i);
    }
    if s.contains('.')
        && let Ok(f) = s.parse::<f64>()
    {
        return Value::Float(f);
    }
    Value::String(s.to_string())
}

/// Expand `("resources.dir", v)` pairs into nested tables. Later entries win.
pub fn overrides_to_table(entries: &[(String, Value)]) -> Table {
    let mut table = Table::new();
    for (dotted_key, value) in entries {
        let segments: Vec<String> = dotted_key.split('.').map(str::to_string).collect();
        insert_nested(&mut table, &segments, value.clone());
    }
    table
}

/// Insert `value` at `segments`, replacing any non-table found on the way.
fn insert_nested(table: &mut Table, segments: &[String], value: Value) {
    let Some((leaf, parents)) = segments.split_last() else {
        return;
    };

    let mut current = table;
    for segment in parents {
        let entry = current
            .entry(segment.as_str())
            .or_insert_with(|| Value::Table(Table::new()));
        if !entry.is_table() {
            *entry = Value::Table(Table::new());
        }
        let Value::Table(sub) = entry else {
            return;
        };
        current = sub;
    }
    current.insert(leaf.clone(), value);
}

/// Every dotted leaf key of a confique config, e.g. `resources.dir`.
pub fn valid_keys(meta: &Meta) -> HashSet<String> {
    let mut keys = HashSet::new();
    collect_keys(meta, "", &mut keys);
    keys
}

fn collect_keys(meta: &Meta, prefix: &str, keys: &mut HashSet<String>) {
    for field in meta.fields {
        let dotted = if prefix.is_empty() {
            field.name.to_string()
        } else {
            format!("{prefix}.{}", field.name)
        };
        match &field.kind {
            FieldKind::Leaf { .. } => {
                keys.insert(dotted);
            }
            FieldKind::Nested { meta, .. } => collect_keys(meta, &dotted, keys),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::GeneratorSettings;
    use confique::Config;

    fn table(s: &str) -> Table {
        s.parse::<Table>().unwrap()
    }

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn merge_recurses_into_tables() {
        let base = table("strict = true\n[resources]\ndir = \"res\"\nprojects = [\"a\"]\n");
        let overlay = table("[resources]\nprojects = [\"b\"]\n");
        let merged = deep_merge(base, overlay);
        assert!(merged["strict"].as_bool().unwrap());
        assert_eq!(merged["resources"]["dir"].as_str(), Some("res"));
        assert_eq!(
            merged["resources"]["projects"].as_array().unwrap()[0].as_str(),
            Some("b")
        );
    }

    #[test]
    fn merge_scalar_replaces_table() {
        let merged = deep_merge(table("[resources]\ndir = \"x\"\n"), table("resources = 1\n"));
        assert_eq!(merged["resources"].as_integer(), Some(1));
    }

    #[test]
    fn merge_with_empty_sides() {
        let t = table("template_iteration_cap = 8\n");
        assert_eq!(deep_merge(t.clone(), Table::new()), t);
        assert_eq!(deep_merge(Table::new(), t.clone()), t);
    }

    #[test]
    fn env_nested_key_and_types() {
        let t = env_to_table(
            "BUILDMATRIX",
            vars(&[
                ("BUILDMATRIX__TEMPLATE_ITERATION_CAP", "32"),
                ("BUILDMATRIX__STRICT", "FALSE"),
                ("BUILDMATRIX__RESOURCES__DIR", "assets"),
                ("BUILDMATRIX__RATIO", "1.5"),
            ]),
        );
        assert_eq!(t["template_iteration_cap"].as_integer(), Some(32));
        assert_eq!(t["strict"].as_bool(), Some(false));
        assert_eq!(t["resources"]["dir"].as_str(), Some("assets"));
        assert_eq!(t["ratio"].as_float(), Some(1.5));
    }

    #[test]
    fn env_array_value() {
        let t = env_to_table(
            "BUILDMATRIX",
            vars(&[("BUILDMATRIX__RESOURCES__PROJECTS", r#"["oxygen", "tools"]"#)]),
        );
        let projects = t["resources"]["projects"].as_array().unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[1].as_str(), Some("tools"));
    }

    #[test]
    fn env_malformed_array_is_a_string() {
        let t = env_to_table("BUILDMATRIX", vars(&[("BUILDMATRIX__DIR", "[oops")]));
        assert_eq!(t["dir"].as_str(), Some("[oops"));
    }

    #[test]
    fn env_ignores_other_prefixes() {
        let t = env_to_table(
            "BUILDMATRIX",
            vars(&[
                ("BUILDMATRIX", "x"),
                ("BUILDMATRIX_STRICT", "x"),
                ("OTHER__STRICT", "x"),
                ("BUILDMATRIX__", "x"),
            ]),
        );
        assert!(t.is_empty());
    }

    #[test]
    fn overrides_nest_and_last_wins() {
        let t = overrides_to_table(&[
            ("resources.dir".into(), Value::String("a".into())),
            ("resources.dir".into(), Value::String("b".into())),
            ("strict".into(), Value::Boolean(false)),
        ]);
        assert_eq!(t["resources"]["dir"].as_str(), Some("b"));
        assert_eq!(t["strict"].as_bool(), Some(false));
    }

    #[test]
    fn override_through_a_scalar_replaces_it() {
        let t = overrides_to_table(&[
            ("resources".into(), Value::Integer(1)),
            ("resources.dir".into(), Value::String("a".into())),
        ]);
        assert_eq!(t["resources"]["dir"].as_str(), Some("a"));
    }

    #[test]
    fn valid_keys_lists_leaves_only() {
        let keys = valid_keys(&GeneratorSettings::META);
        for key in [
            "template_iteration_cap",
            "definition_dir",
            "strict",
            "resources.dir",
            "resources.projects",
        ] {
            assert!(keys.contains(key), "missing {key}");
        }
        assert!(!keys.contains("resources"));
        assert_eq!(keys.len(), 5);
    }
}
