//! Startup configuration, read once from the environment.

use sketch_adapter::provider_log::DEFAULT_CAPACITY;
use sketch_adapter::types::DEFAULT_MODEL;
use sketch_adapter::{GenerationSettings, RetryPolicy};

use crate::upload::UploadCredentials;

pub const DEFAULT_BIND: &str = "0.0.0.0:3000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    pub bind: String,
    pub gemini_api_key: Option<String>,
    pub generation: GenerationSettings,
    pub admin_api_key: Option<String>,
    pub upload: Option<UploadCredentials>,
    pub log_capacity: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.into(),
            gemini_api_key: None,
            generation: GenerationSettings::default(),
            admin_api_key: None,
            upload: None,
            log_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl GateConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from any key lookup. Blank values count as unset; unparsable
    /// numbers fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let num = |k: &str, default: u64| -> u64 {
            match get(k) {
                None => default,
                Some(v) => v.parse().unwrap_or_else(|_| {
                    tracing::warn!(key = k, value = %v, default, "ignoring unparsable setting");
                    default
                }),
            }
        };

        let defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            attempts: num("SKETCH_RETRY_ATTEMPTS", defaults.attempts as u64).clamp(1, 10) as u32,
            base_ms: num("SKETCH_RETRY_BASE_MS", defaults.base_ms),
            jitter_ms: defaults.jitter_ms,
        };
        let upload = match (get("CLOUDINARY_CLOUD_NAME"), get("CLOUDINARY_API_KEY"), get("CLOUDINARY_API_SECRET")) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => {
                Some(UploadCredentials { cloud_name, api_key, api_secret })
            }
            _ => None,
        };

        Self {
            bind: get("SKETCH_BIND").unwrap_or_else(|| DEFAULT_BIND.into()),
            gemini_api_key: get("GEMINI_API_KEY"),
            generation: GenerationSettings {
                default_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into()),
                fallback_model: get("SKETCH_FALLBACK_MODEL"),
                retry,
            },
            admin_api_key: get("ADMIN_API_KEY"),
            upload,
            log_capacity: num("SKETCH_LOG_CAPACITY", DEFAULT_CAPACITY as u64).max(1) as usize,
        }
    }
}
