//! One generation run: model resolution, retry loop, optional fallback
//! model, normalization of every attempt, and the audit trail.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sketch_normalize::{normalize, NormalizedSource};

use crate::error::{GenerateError, Result};
use crate::generator::Generator;
use crate::provider_log::{AttemptStart, ProviderLogBook};
use crate::retry::{retry_with_backoff, AttemptOutcome, Retried, RetryPolicy, Sleeper};
use crate::types::{resolve_model, GenerateParams, GenerateRequest, DEFAULT_MODEL};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSettings {
    pub default_model: String,
    /// Model tried once more, with a fresh retry budget, after the primary
    /// model exhausts its attempts.
    pub fallback_model: Option<String>,
    pub retry: RetryPolicy,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self { default_model: DEFAULT_MODEL.into(), fallback_model: None, retry: RetryPolicy::default() }
    }
}

/// Successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Generated {
    pub request_id: String,
    pub source: NormalizedSource,
    pub model: String,
    pub provider: String,
    pub fallback_used: bool,
    /// Attempts across primary and fallback models.
    pub attempts: u32,
}

/// Failed run, with enough context for the caller to report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationFailure {
    pub request_id: String,
    pub error: GenerateError,
    pub attempts: u32,
    pub fallback_used: bool,
}

pub struct GenerationService {
    generator: Arc<dyn Generator>,
    log: Arc<ProviderLogBook>,
    sleeper: Arc<dyn Sleeper>,
    settings: GenerationSettings,
}

struct Pass<'a> {
    request_id: &'a str,
    image_url: &'a str,
    model: &'a str,
    fallback_used: bool,
    /// Attempts already spent by earlier passes.
    offset: u32,
}

impl GenerationService {
    pub fn new(
        generator: Arc<dyn Generator>,
        log: Arc<ProviderLogBook>,
        sleeper: Arc<dyn Sleeper>,
        settings: GenerationSettings,
    ) -> Self {
        Self { generator, log, sleeper, settings }
    }

    pub async fn run(&self, req: &GenerateRequest) -> std::result::Result<Generated, GenerationFailure> {
        let request_id = self.log.new_id();
        let model = resolve_model(req.model.as_deref(), &self.settings.default_model);
        tracing::info!(request_id = %request_id, model = %model, "generation started");

        let primary = Pass {
            request_id: &request_id,
            image_url: &req.image_url,
            model: &model,
            fallback_used: false,
            offset: 0,
        };
        let first = self.run_pass(&primary).await;
        let err = match first.result {
            Ok(source) => return Ok(self.generated(request_id, source, model, false, first.attempts)),
            Err(e) => e,
        };

        let fallback = self
            .settings
            .fallback_model
            .as_deref()
            .filter(|f| req.allow_fallback && err.is_retryable() && *f != model);
        let Some(fallback) = fallback else {
            tracing::warn!(request_id = %request_id, error = %err, "generation failed");
            return Err(GenerationFailure { request_id, error: err, attempts: first.attempts, fallback_used: false });
        };

        tracing::warn!(request_id = %request_id, from = %model, to = %fallback, error = %err, "switching to fallback model");
        let second = self
            .run_pass(&Pass { model: fallback, fallback_used: true, offset: first.attempts, ..primary })
            .await;
        let attempts = first.attempts + second.attempts;
        match second.result {
            Ok(source) => Ok(self.generated(request_id, source, fallback.to_string(), true, attempts)),
            Err(error) => {
                tracing::warn!(request_id = %request_id, error = %error, "generation failed after fallback");
                Err(GenerationFailure { request_id, error, attempts, fallback_used: true })
            }
        }
    }

    fn generated(&self, request_id: String, source: NormalizedSource, model: String, fallback_used: bool, attempts: u32) -> Generated {
        tracing::info!(
            request_id = %request_id,
            model = %model,
            attempts,
            component = %source.component,
            digest = %source.digest,
            "generation succeeded"
        );
        Generated {
            request_id,
            source,
            model,
            provider: self.generator.provider().to_string(),
            fallback_used,
            attempts,
        }
    }

    async fn run_pass(&self, pass: &Pass<'_>) -> Retried<NormalizedSource, GenerateError> {
        retry_with_backoff(&self.settings.retry, self.sleeper.as_ref(), |index| {
            self.attempt(pass, pass.offset + index + 1)
        })
        .await
    }

    async fn attempt(&self, pass: &Pass<'_>, attempt: u32) -> AttemptOutcome<NormalizedSource, GenerateError> {
        let entry = self.log.begin(AttemptStart {
            request_id: pass.request_id,
            provider: self.generator.provider(),
            model: pass.model,
            attempt,
            image_url: Some(pass.image_url),
            fallback_used: pass.fallback_used,
        });
        let params = GenerateParams {
            image_url: pass.image_url.to_string(),
            model: pass.model.to_string(),
            attempt,
        };
        let result = self.produce(&params).await;
        self.log.finish(&entry, result.as_ref().map(|_| ()).map_err(ToString::to_string));
        AttemptOutcome::classify(result, GenerateError::is_retryable)
    }

    async fn produce(&self, params: &GenerateParams) -> Result<NormalizedSource> {
        let blob = self.generator.generate(params).await?;
        tracing::debug!(attempt = blob.attempt, chars = blob.text.len(), "raw generation received");
        Ok(normalize(&blob.text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{RecordingSleeper, ScriptedGenerator, VALID_COMPONENT};
    use sketch_normalize::NormalizeError;

    fn service(
        script: Vec<Result<String>>,
        fallback: Option<&str>,
    ) -> (GenerationService, Arc<ScriptedGenerator>, Arc<ProviderLogBook>, Arc<RecordingSleeper>) {
        let gen = Arc::new(ScriptedGenerator::new(script));
        let log = Arc::new(ProviderLogBook::new(50));
        let sleeper = Arc::new(RecordingSleeper::default());
        let settings = GenerationSettings {
            fallback_model: fallback.map(str::to_string),
            ..GenerationSettings::default()
        };
        let svc = GenerationService::new(gen.clone(), log.clone(), sleeper.clone(), settings);
        (svc, gen, log, sleeper)
    }

    fn request(model: Option<&str>, allow_fallback: bool) -> GenerateRequest {
        GenerateRequest {
            image_url: "https://img.example/sketch.png".into(),
            model: model.map(str::to_string),
            allow_fallback,
        }
    }

    fn provider_err() -> Result<String> {
        Err(GenerateError::Provider("503 service unavailable".into()))
    }

    #[tokio::test]
    async fn first_attempt_success() {
        let (svc, gen, log, sleeper) = service(vec![Ok(VALID_COMPONENT.into())], None);
        let out = svc.run(&request(None, true)).await.unwrap();

        assert_eq!(out.attempts, 1);
        assert_eq!(out.model, DEFAULT_MODEL);
        assert_eq!(out.provider, "scripted");
        assert!(!out.fallback_used);
        assert_eq!(out.source.component, "App");
        assert_eq!(gen.calls().len(), 1);
        assert!(sleeper.sleeps().is_empty());

        let entries = log.recent(10);
        assert_eq!(entries.len(), 1);
        assert!(entries[0].success);
        assert!(!entries[0].is_pending());
        assert_eq!(entries[0].request_id, out.request_id);
    }

    #[tokio::test]
    async fn incomplete_output_is_retried() {
        let truncated = "import React from 'react'\nexport default function App(){return <div style={{";
        let (svc, gen, log, sleeper) =
            service(vec![Ok(truncated.into()), provider_err(), Ok(VALID_COMPONENT.into())], None);
        let out = svc.run(&request(None, true)).await.unwrap();

        assert_eq!(out.attempts, 3);
        assert_eq!(sleeper.sleeps().len(), 2);
        let attempts: Vec<u32> = gen.calls().iter().map(|p| p.attempt).collect();
        assert_eq!(attempts, vec![1, 2, 3]);

        let entries = log.recent(10);
        assert_eq!(entries.len(), 3);
        assert!(entries[0].success);
        assert!(entries[1].error.as_deref().unwrap().starts_with("provider:"));
        assert!(entries[2].error.as_deref().unwrap().contains("incomplete"));
    }

    #[tokio::test]
    async fn missing_default_export_is_not_retried() {
        let (svc, gen, _, sleeper) =
            service(vec![Ok("import React from 'react';\nconst App = () => <div/>;".into())], Some("gemini-1.5-pro"));
        let failure = svc.run(&request(None, true)).await.unwrap_err();

        assert_eq!(failure.error, GenerateError::Normalize(NormalizeError::NoDefaultExport));
        assert_eq!(failure.attempts, 1);
        assert!(!failure.fallback_used);
        assert_eq!(gen.calls().len(), 1);
        assert!(sleeper.sleeps().is_empty());
    }

    #[tokio::test]
    async fn exhausted_primary_uses_fallback() {
        let script = vec![provider_err(), provider_err(), provider_err(), Ok(VALID_COMPONENT.into())];
        let (svc, gen, log, _) = service(script, Some("gemini-1.5-pro"));
        let out = svc.run(&request(Some("gemini-2.0-flash"), true)).await.unwrap();

        assert!(out.fallback_used);
        assert_eq!(out.model, "gemini-1.5-pro");
        assert_eq!(out.attempts, 4);
        let models: Vec<String> = gen.calls().into_iter().map(|p| p.model).collect();
        assert_eq!(models, vec!["gemini-2.0-flash", "gemini-2.0-flash", "gemini-2.0-flash", "gemini-1.5-pro"]);
        assert!(log.recent(1)[0].fallback_used);
        assert_eq!(log.recent(1)[0].attempt, 4);
    }

    #[tokio::test]
    async fn fallback_respects_request_opt_out() {
        let (svc, gen, _, _) =
            service(vec![provider_err(), provider_err(), provider_err()], Some("gemini-1.5-pro"));
        let failure = svc.run(&request(None, false)).await.unwrap_err();

        assert_eq!(failure.attempts, 3);
        assert_eq!(failure.error, GenerateError::Provider("503 service unavailable".into()));
        assert_eq!(gen.calls().len(), 3);
    }

    #[tokio::test]
    async fn unsupported_model_resolves_to_default() {
        let (svc, gen, _, _) = service(vec![Ok(VALID_COMPONENT.into())], None);
        svc.run(&request(Some("llama-3"), true)).await.unwrap();
        assert_eq!(gen.calls()[0].model, DEFAULT_MODEL);
    }
}
