//! Target axes and their expansion into concrete targets.
//!
//! A [`TargetDecl`] lists axes in declaration order, each with a [`FlagSet`] of
//! values. `"Debug|Release"` is a flag set with two members and expands into
//! two targets. Expansion is a cartesian product with the first-declared axis
//! as the outermost loop, and flag members in the order they were written:
//!
//! ```text
//! Platform = "win32|win64", Optimization = "Debug|Release"
//!   -> win32/Debug, win32/Release, win64/Debug, win64/Release
//! ```
//!
//! Emitters rely on this order being stable between runs.

use std::borrow::Cow;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::template::FieldSource;

/// Ordered set of values for one axis. Repeated members are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct FlagSet(Vec<String>);

impl FlagSet {
    /// Parse `"a|b|c"`. Whitespace around members is trimmed, empty members skipped.
    pub fn parse(s: &str) -> Self {
        let mut members: Vec<String> = Vec::new();
        for member in s.split('|').map(str::trim).filter(|m| !m.is_empty()) {
            if !members.iter().any(|m| m == member) {
                members.push(member.to_string());
            }
        }
        FlagSet(members)
    }

    pub fn members(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|m| m == value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for FlagSet {
    fn from(s: &str) -> Self {
        FlagSet::parse(s)
    }
}

impl From<String> for FlagSet {
    fn from(s: String) -> Self {
        FlagSet::parse(&s)
    }
}

impl From<FlagSet> for String {
    fn from(set: FlagSet) -> Self {
        set.0.join("|")
    }
}

impl fmt::Display for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("|"))
    }
}

/// One axis of a target declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisDecl {
    pub axis: String,
    pub values: FlagSet,
}

/// A set of axes declared together, e.g. `win64 × vs2022 × Debug|Release`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetDecl {
    axes: Vec<AxisDecl>,
}

impl TargetDecl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an axis. Declaring the same axis twice replaces its values in place,
    /// so every expanded target still carries exactly one value per axis.
    pub fn axis(mut self, name: &str, values: impl Into<FlagSet>) -> Self {
        let values = values.into();
        match self.axes.iter_mut().find(|a| a.axis == name) {
            Some(existing) => existing.values = values,
            None => self.axes.push(AxisDecl {
                axis: name.to_string(),
                values,
            }),
        }
        self
    }

    pub fn axes(&self) -> &[AxisDecl] {
        &self.axes
    }

    /// Expand this declaration into concrete targets.
    pub fn expand(&self) -> Vec<Target> {
        expand(&self.axes)
    }
}

impl<K: Into<String>, V: Into<FlagSet>> FromIterator<(K, V)> for TargetDecl {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(TargetDecl::new(), |decl, (k, v)| decl.axis(&k.into(), v))
    }
}

/// One concrete combination of axis values.
///
/// Axes keep their declaration order for display and serialization; equality
/// ignores that order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Target {
    values: IndexMap<String, String>,
}

impl Target {
    pub fn new<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        Target {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// The value of `axis`, if this target carries it.
    pub fn get(&self, axis: &str) -> Option<&str> {
        self.values.get(axis).map(String::as_str)
    }

    /// `(axis, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// True when every `(axis, set)` condition has this target's value in `set`.
    /// An axis the target does not carry never matches.
    pub fn satisfies(&self, conditions: &IndexMap<String, FlagSet>) -> bool {
        conditions
            .iter()
            .all(|(axis, set)| self.get(axis).is_some_and(|v| set.contains(v)))
    }

    /// True when any `(axis, set)` condition has this target's value in `set`.
    pub fn matches_any(&self, conditions: &IndexMap<String, FlagSet>) -> bool {
        conditions
            .iter()
            .any(|(axis, set)| self.get(axis).is_some_and(|v| set.contains(v)))
    }
}

impl FieldSource for Target {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get(name).map(Cow::Borrowed)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (axis, value)) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{axis}={value}")?;
        }
        Ok(())
    }
}

/// Expand one declaration. No axes, or an axis with no values, yields nothing.
pub fn expand(axes: &[AxisDecl]) -> Vec<Target> {
    if axes.is_empty() {
        return Vec::new();
    }

    let mut partials: Vec<IndexMap<String, String>> = vec![IndexMap::new()];
    for decl in axes {
        let mut next = Vec::with_capacity(partials.len() * decl.values.len());
        for partial in &partials {
            for value in decl.values.members() {
                let mut combined = partial.clone();
                combined.insert(decl.axis.clone(), value.clone());
                next.push(combined);
            }
        }
        partials = next;
    }

    partials
        .into_iter()
        .map(|values| Target { values })
        .collect()
}

/// Expand several declarations in order, dropping targets already produced.
pub fn expand_all<'a>(decls: impl IntoIterator<Item = &'a TargetDecl>) -> Vec<Target> {
    let mut targets: Vec<Target> = Vec::new();
    for decl in decls {
        for target in decl.expand() {
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
    }
    targets
}
