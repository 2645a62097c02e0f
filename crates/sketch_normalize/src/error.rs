use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// Output was cut off or never got to a component; worth another attempt.
    #[error("generated code looks incomplete: {}", findings.join(", "))]
    Incomplete { findings: Vec<&'static str> },

    #[error("no default export found in generated code")]
    NoDefaultExport,
}

impl NormalizeError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, NormalizeError::Incomplete { .. })
    }
}

pub type Result<T> = std::result::Result<T, NormalizeError>;
