use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Prefix a requested model must carry to be honoured.
pub const MODEL_PREFIX: &str = "gemini-";

/// One upstream call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateParams {
    pub image_url: String,
    pub model: String,
    /// 1-based attempt number within the run.
    pub attempt: u32,
}

/// Raw upstream text for one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedBlob {
    pub text: String,
    pub model: String,
    pub attempt: u32,
}

/// What a caller asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub image_url: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_allow_fallback")]
    pub allow_fallback: bool,
}

fn default_allow_fallback() -> bool {
    true
}

/// The requested model if it names a supported one, otherwise `default`.
pub fn resolve_model(requested: Option<&str>, default: &str) -> String {
    match requested.map(str::trim) {
        Some(m) if m.starts_with(MODEL_PREFIX) && m.len() > MODEL_PREFIX.len() => m.to_string(),
        _ => default.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn honours_supported_models() {
        assert_eq!(resolve_model(Some("gemini-1.5-pro"), DEFAULT_MODEL), "gemini-1.5-pro");
    }

    #[test]
    fn falls_back_to_default() {
        assert_eq!(resolve_model(None, DEFAULT_MODEL), DEFAULT_MODEL);
        assert_eq!(resolve_model(Some("gpt-4o"), DEFAULT_MODEL), DEFAULT_MODEL);
        assert_eq!(resolve_model(Some("gemini-"), "gemini-2.0-flash"), "gemini-2.0-flash");
        assert_eq!(resolve_model(Some(""), DEFAULT_MODEL), DEFAULT_MODEL);
    }

    #[test]
    fn request_defaults() {
        let req: GenerateRequest = serde_json::from_str(r#"{"image_url":"https://x/y.png"}"#).unwrap();
        assert!(req.allow_fallback);
        assert_eq!(req.model, None);
    }
}
