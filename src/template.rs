//! `[owner.field]` placeholder resolution.
//!
//! Owners are `project`, `target`, `solution` and `conf`. Project and solution
//! fields are stored unresolved, so substituting one may introduce new
//! placeholders; resolution repeats whole-string passes until no placeholder is
//! left. A reference cycle never converges and is reported once the iteration
//! cap is exhausted.
//!
//! Only `[ident.ident]` is a placeholder. Any other bracketed text (`[x]`,
//! `[a b.c]`, an unmatched `[`) is kept literally.

use std::borrow::Cow;

use indexmap::IndexMap;

use crate::error::MatrixError;

/// Default number of substitution passes before giving up.
pub const DEFAULT_ITERATION_CAP: usize = 16;

/// Read access to the fields of one template owner.
pub trait FieldSource {
    fn field(&self, name: &str) -> Option<Cow<'_, str>>;
}

impl FieldSource for IndexMap<String, String> {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get(name).map(|v| Cow::Borrowed(v.as_str()))
    }
}

/// The owners visible to a template. Owners left unset resolve to
/// [`MatrixError::UnknownTemplateReference`].
#[derive(Clone, Copy)]
pub struct TemplateContext<'a> {
    project: Option<&'a dyn FieldSource>,
    target: Option<&'a dyn FieldSource>,
    solution: Option<&'a dyn FieldSource>,
    conf: Option<&'a dyn FieldSource>,
    iteration_cap: usize,
}

impl Default for TemplateContext<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> TemplateContext<'a> {
    pub fn new() -> Self {
        Self {
            project: None,
            target: None,
            solution: None,
            conf: None,
            iteration_cap: DEFAULT_ITERATION_CAP,
        }
    }

    pub fn with_project(mut self, source: &'a dyn FieldSource) -> Self {
        self.project = Some(source);
        self
    }

    pub fn with_target(mut self, source: &'a dyn FieldSource) -> Self {
        self.target = Some(source);
        self
    }

    pub fn with_solution(mut self, source: &'a dyn FieldSource) -> Self {
        self.solution = Some(source);
        self
    }

    pub fn with_conf(mut self, source: &'a dyn FieldSource) -> Self {
        self.conf = Some(source);
        self
    }

    pub fn iteration_cap(mut self, cap: usize) -> Self {
        self.iteration_cap = cap;
        self
    }

    fn owner(&self, name: &str) -> Option<&'a dyn FieldSource> {
        match name {
            "project" => self.project,
            "target" => self.target,
            "solution" => self.solution,
            "conf" => self.conf,
            _ => None,
        }
    }
}

/// Resolve every placeholder in `template`.
pub fn resolve(template: &str, ctx: &TemplateContext<'_>) -> Result<String, MatrixError> {
    let mut current = template.to_string();
    for _ in 0..ctx.iteration_cap {
        match substitute_once(&current, ctx)? {
            Some(next) => current = next,
            None => return Ok(current),
        }
    }
    if next_placeholder(&current, 0).is_none() {
        return Ok(current);
    }
    Err(MatrixError::UnresolvableTemplate {
        template: template.to_string(),
        iteration_cap: ctx.iteration_cap,
    })
}

/// True if `s` still contains at least one placeholder.
pub fn has_placeholders(s: &str) -> bool {
    next_placeholder(s, 0).is_some()
}

struct Placeholder<'t> {
    start: usize,
    end: usize,
    owner: &'t str,
    field: &'t str,
}

/// One pass over `s`. Returns `None` when there was nothing to substitute.
fn substitute_once(s: &str, ctx: &TemplateContext<'_>) -> Result<Option<String>, MatrixError> {
    let mut out = String::with_capacity(s.len());
    let mut cursor = 0;
    let mut found = false;

    while let Some(ph) = next_placeholder(s, cursor) {
        found = true;
        out.push_str(&s[cursor..ph.start]);

        let value = ctx
            .owner(ph.owner)
            .and_then(|source| source.field(ph.field))
            .ok_or_else(|| MatrixError::UnknownTemplateReference {
                owner: ph.owner.to_string(),
                field: ph.field.to_string(),
            })?;
        out.push_str(&value);
        cursor = ph.end;
    }

    if !found {
        return Ok(None);
    }
    out.push_str(&s[cursor..]);
    Ok(Some(out))
}

fn next_placeholder(s: &str, from: usize) -> Option<Placeholder<'_>> {
    let mut search = from;
    while let Some(offset) = s[search..].find('[') {
        let start = search + offset;
        let inner_start = start + 1;
        let close = s[inner_start..].find(']')? + inner_start;
        let inner = &s[inner_start..close];
        if let Some((owner, field)) = inner.split_once('.')
            && is_ident(owner)
            && is_ident(field)
        {
            return Some(Placeholder {
                start,
                end: close + 1,
                owner,
                field,
            });
        }
        search = inner_start;
    }
    None
}

fn is_ident(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
