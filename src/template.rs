//! Template interpolation for provisioning documents
//!
//! Handles `{{ env.NAME }}` interpolation so passwords and connection strings
//! can live in the environment instead of the document itself.
//! `{{ vars.NAME }}` reads from caller-supplied variables.

use crate::error::{Error, Result};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Regex for matching template variables: {{ root.NAME }}
static TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)\s*\}\}")
        .expect("template regex is valid")
});

/// Context for template interpolation
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    /// Environment snapshot
    pub env: HashMap<String, String>,
    /// Additional variables
    pub vars: HashMap<String, String>,
}

impl TemplateContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context holding the current process environment
    pub fn from_env() -> Self {
        Self {
            env: std::env::vars().collect(),
            ..Default::default()
        }
    }

    /// Set an environment value
    pub fn set_env(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set an additional variable
    pub fn set_var(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Get a value by path (e.g., "env.DB_PASSWORD")
    pub fn get(&self, path: &str) -> Option<&str> {
        match path.split_once('.') {
            Some(("env", key)) => self.env.get(key).map(String::as_str),
            Some(("vars", key)) => self.vars.get(key).map(String::as_str),
            // Bare names resolve against vars first, then the environment
            None => self
                .vars
                .get(path)
                .or_else(|| self.env.get(path))
                .map(String::as_str),
            Some(_) => None,
        }
    }
}

/// Render a template string with the given context
///
/// Substitution is a single pass: values are inserted verbatim and never
/// rendered again. Every undefined variable is collected so one error lists
/// all of them.
pub fn render(template: &str, ctx: &TemplateContext) -> Result<String> {
    let mut errors = Vec::new();

    let result = TEMPLATE_REGEX.replace_all(template, |cap: &Captures<'_>| {
        let var_path = &cap[1];
        match ctx.get(var_path) {
            Some(value) => value.to_string(),
            None => {
                errors.push(var_path.to_string());
                String::new()
            }
        }
    });

    if errors.is_empty() {
        Ok(result.into_owned())
    } else {
        Err(Error::undefined_var(errors.join(", ")))
    }
}

/// Check if a string contains template variables
pub fn has_templates(s: &str) -> bool {
    TEMPLATE_REGEX.is_match(s)
}

/// Extract all variable names from a template
pub fn extract_variables(template: &str) -> Vec<String> {
    TEMPLATE_REGEX
        .captures_iter(template)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Render a string in place, skipping the work when there is nothing to do
pub fn render_in_place(value: &mut String, ctx: &TemplateContext) -> Result<()> {
    if has_templates(value) {
        *value = render(value, ctx)?;
    }
    Ok(())
}
