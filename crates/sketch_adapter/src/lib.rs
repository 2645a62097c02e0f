//! Upstream boundary for sketch previews.
//!
//! ```text
//! GenerateRequest
//!   │  resolve_model
//!   ▼
//! retry_with_backoff ──▶ Generator::generate ──▶ sketch_normalize::normalize
//!   │        ▲                  │
//!   │        └── Retryable ─────┘        every attempt ─▶ ProviderLogBook
//!   ▼
//! fallback model (optional, fresh retry budget)
//!   ▼
//! Generated { source, model, attempts, … }
//! ```
//!
//! The Gemini client needs the `http` feature. Scripted fakes for tests are
//! available under `test-helpers`.

pub mod error;
#[cfg(any(test, feature = "test-helpers"))]
pub mod fakes;
pub mod gemini;
pub mod generate;
pub mod generator;
pub mod provider_log;
pub mod retry;
pub mod types;

pub use error::{GenerateError, Result};
pub use generate::{Generated, GenerationFailure, GenerationService, GenerationSettings};
pub use generator::Generator;
pub use provider_log::{Clock, ManualClock, ProviderLogBook, ProviderLogEntry, SystemClock};
pub use retry::{retry_with_backoff, AttemptOutcome, Retried, RetryPolicy, Sleeper, TokioSleeper};
pub use types::{resolve_model, GenerateParams, GenerateRequest, GeneratedBlob};
