//! Parser for provisioning documents
//!
//! Reads a document, renders `{{ env.* }}` templates in every string field and
//! validates the result. Every failure here is a configuration error.

use crate::config::DesiredState;
use crate::error::{Error, Result};
use crate::template::{render_in_place, TemplateContext};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Serialization format of a provisioning document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// JSON document
    Json,
    /// YAML document
    Yaml,
}

impl DocumentFormat {
    /// Pick the format from a file extension (JSON unless `.yaml`/`.yml`)
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Self::Yaml
            }
            _ => Self::Json,
        }
    }
}

/// Load a desired state from a file path
///
/// Templates are rendered against the current process environment.
///
/// # Examples
///
/// ```ignore
/// let state = load_desired_state("/config/config.json")?;
/// println!("{} servers", state.servers.len());
/// ```
pub fn load_desired_state(path: impl AsRef<Path>) -> Result<DesiredState> {
    let path = path.as_ref();

    let content = fs::read_to_string(path).map_err(|e| {
        Error::config(format!(
            "failed to read config file '{}': {e}",
            path.display()
        ))
    })?;

    debug!(path = %path.display(), bytes = content.len(), "Read provisioning document");

    load_desired_state_from_str(
        &content,
        DocumentFormat::from_path(path),
        &TemplateContext::from_env(),
    )
}

/// Load a desired state from a string
pub fn load_desired_state_from_str(
    content: &str,
    format: DocumentFormat,
    ctx: &TemplateContext,
) -> Result<DesiredState> {
    let state: DesiredState = match format {
        DocumentFormat::Json => serde_json::from_str(content)
            .map_err(|e| Error::config(format!("failed to parse config: {e}")))?,
        DocumentFormat::Yaml => serde_yaml::from_str(content)
            .map_err(|e| Error::config(format!("failed to parse config: {e}")))?,
    };

    let state = render_state(state, ctx)?;
    state.validate()?;
    Ok(state)
}

/// Render templates in every string field of the document
fn render_state(mut state: DesiredState, ctx: &TemplateContext) -> Result<DesiredState> {
    for (index, server) in state.servers.iter_mut().enumerate() {
        render_in_place(&mut server.name, ctx).map_err(|e| at_server(index, e))?;
        render_in_place(&mut server.connection_string, ctx).map_err(|e| at_server(index, e))?;

        for grant in &mut server.databases {
            render_in_place(&mut grant.database, ctx).map_err(|e| at_server(index, e))?;
            render_in_place(&mut grant.user, ctx).map_err(|e| at_server(index, e))?;
            render_in_place(&mut grant.password, ctx).map_err(|e| at_server(index, e))?;
        }
    }
    Ok(state)
}

fn at_server(index: usize, error: Error) -> Error {
    Error::config(format!("server {index}: {error}"))
}
