//! `%name` placeholder substitution for RUN lines.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::TestError;

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%([A-Za-z_][A-Za-z0-9_]*)").unwrap());

/// Placeholder values available to one test: resolved tools plus `%s` / `%t`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placeholders {
    values: BTreeMap<String, String>,
}

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `%name` to `value`, replacing any earlier binding.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

/// Names (without `%`) of every placeholder token a RUN line uses.
pub fn referenced_placeholders(line: &str) -> BTreeSet<String> {
    TOKEN_RE
        .captures_iter(line)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Replace every `%name` token in `line` with its bound value.
///
/// Values are inserted verbatim; a value containing spaces will later be
/// split into several arguments.
pub fn substitute(line: &str, placeholders: &Placeholders) -> Result<String, TestError> {
    if let Some(missing) = referenced_placeholders(line)
        .into_iter()
        .find(|name| !placeholders.contains(name))
    {
        return Err(TestError::ToolNotFound {
            token: format!("%{missing}"),
            reason: "no tool configured for this placeholder".to_string(),
        });
    }

    let replaced = TOKEN_RE.replace_all(line, |caps: &Captures<'_>| {
        placeholders.get(&caps[1]).unwrap_or_default().to_string()
    });
    Ok(replaced.into_owned())
}
