//! Sketch normalizer: turns free-form, model-generated React source into a
//! dialect that runs in a sandboxed document with no module system and no
//! build step.
//!
//! ```text
//! raw text ─▶ strip_fences ─▶ completeness gate ─▶ sanitize
//!          ─▶ rewrite_imports ─▶ bind_entry_point ─▶ NormalizedSource
//!                                                      │
//!                                                      ▼
//!                                               build_document
//! ```
//!
//! Every stage is a pure text transform. Only the completeness gate and the
//! entry-point binder can fail.

pub mod completeness;
pub mod deps;
pub mod digest;
pub mod entry;
pub mod error;
pub mod fence;
pub mod pipeline;
pub mod sanitize;
pub mod srcdoc;

/// Global the bootstrap polls for the component to render.
pub const COMPONENT_SLOT: &str = "__PREVIEW_COMPONENT__";

pub use completeness::{looks_incomplete, CompletenessReport};
pub use deps::{rewrite_imports, DependencySet};
pub use digest::digest_b3;
pub use entry::bind_entry_point;
pub use error::{NormalizeError, Result};
pub use fence::strip_fences;
pub use pipeline::{normalize, Inspection, NormalizedSource};
pub use sanitize::sanitize;
pub use srcdoc::{build_document, build_document_with, BootstrapTiming, SandboxDocument};
