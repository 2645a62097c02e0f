use sketch_normalize::NormalizeError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    /// Network failure or non-success answer from the model provider.
    #[error("provider: {0}")]
    Provider(String),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error("not configured: {0}")]
    NotConfigured(String),
}

impl GenerateError {
    /// Transient provider failures and truncated output are worth another
    /// attempt; everything else ends the run.
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerateError::Provider(_) => true,
            GenerateError::Normalize(e) => e.is_retryable(),
            GenerateError::NotConfigured(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, GenerateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_classification() {
        assert!(GenerateError::Provider("503".into()).is_retryable());
        assert!(GenerateError::from(NormalizeError::Incomplete { findings: vec!["unbalanced braces"] })
            .is_retryable());
        assert!(!GenerateError::from(NormalizeError::NoDefaultExport).is_retryable());
        assert!(!GenerateError::NotConfigured("GEMINI_API_KEY".into()).is_retryable());
    }

    #[test]
    fn normalize_errors_keep_their_message() {
        let err = GenerateError::from(NormalizeError::NoDefaultExport);
        assert_eq!(err.to_string(), "no default export found in generated code");
    }
}
