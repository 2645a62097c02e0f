use serde::Serialize;

use crate::completeness::{self, CompletenessReport};
use crate::deps::{self, DependencySet};
use crate::digest::digest_b3;
use crate::entry::bind_entry_point;
use crate::error::{NormalizeError, Result};
use crate::fence::strip_fences;
use crate::sanitize::sanitize;

/// Generated code rewritten for the no-module sandbox.
///
/// `code` carries no import or export statements, no type-only syntax, and
/// exactly one assignment to the component slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedSource {
    pub code: String,
    /// Identifier bound to the component slot.
    pub component: String,
    pub digest: String,
    pub dependencies: DependencySet,
}

/// Stage results kept for offline inspection.
#[derive(Debug, Clone, Serialize)]
pub struct Inspection {
    pub stripped: String,
    pub completeness: CompletenessReport,
    pub normalized: Option<NormalizedSource>,
    pub error: Option<String>,
}

/// Fence stripping plus the completeness gate.
pub fn prepare(raw: &str) -> Result<String> {
    let stripped = strip_fences(raw);
    let report = completeness::inspect(&stripped);
    if report.looks_incomplete() {
        let findings = report.findings();
        tracing::debug!(?findings, "generated code rejected as incomplete");
        return Err(NormalizeError::Incomplete { findings });
    }
    Ok(stripped)
}

/// Rewrite already-complete code into the sandbox dialect.
pub fn rewrite(complete: &str) -> Result<NormalizedSource> {
    let sanitized = sanitize(complete);
    let (rewritten, dependencies) = deps::rewrite_imports(&sanitized);
    let (code, component) = bind_entry_point(&rewritten)?;
    let digest = digest_b3(code.as_bytes());
    Ok(NormalizedSource { code, component, digest, dependencies })
}

/// Full pipeline over raw model output.
pub fn normalize(raw: &str) -> Result<NormalizedSource> {
    let complete = prepare(raw)?;
    rewrite(&complete)
}

/// Run every stage and report what each produced, without failing.
pub fn inspect(raw: &str) -> Inspection {
    let stripped = strip_fences(raw);
    let completeness = completeness::inspect(&stripped);
    let (normalized, error) = match normalize(raw) {
        Ok(n) => (Some(n), None),
        Err(e) => (None, Some(e.to_string())),
    };
    Inspection { stripped, completeness, normalized, error }
}
