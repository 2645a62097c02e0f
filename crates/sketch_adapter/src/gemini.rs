//! Gemini vision client.
//!
//! The request and response shapes are plain JSON helpers; the network
//! client itself is behind the `http` feature.

use serde_json::{json, Value};

pub const PROVIDER: &str = "gemini";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

pub const TEMPERATURE: f64 = 0.2;
pub const MAX_OUTPUT_TOKENS: u32 = 16_000;
pub const TOP_P: f64 = 0.95;
pub const TOP_K: u32 = 40;

pub const PROMPT: &str = r#"You are an expert frontend React developer.

You are given a screenshot or a hand-drawn sketch of a web UI. Recreate it as a single React component.

Work out the layout, the visible text, the colors and the interactive parts before writing code, but output only code.

Design:
- Wireframes get a clean, professional color scheme; real screenshots are matched closely.
- Use the exact visible text and repeat list, grid and card items as shown.
- Use inline SVG or emoji for images and icons. Do not import image files.

Technical requirements:
- React with JSX in plain JavaScript. No TypeScript: no React.FC, no type annotations, no interfaces, no `as`.
- Plain function components, e.g. const Dashboard = () => { ... }.
- Tailwind CSS with standard classes only, no arbitrary values.
- Every tag closed, every brace balanced. Never stop mid-component.
- Import hooks explicitly: import React, { useState } from 'react'.
- Stay around 150-200 lines; simplify the UI rather than truncate it.
- Add hover states and local state for tabs, toggles and forms.

Output format:
1. Start directly with the imports. No markdown fences, no explanation.
2. Finish with the main component as the default export: export default ComponentName
3. Do not assign anything to window.__PREVIEW_COMPONENT__.
4. Do not leave placeholder comments such as "// add more items".

Now recreate the UI in the image."#;

pub fn endpoint(base: &str, model: &str) -> String {
    format!("{}/v1beta/models/{model}:generateContent", base.trim_end_matches('/'))
}

/// `generateContent` body with the prompt and the inlined image.
pub fn request_body(mime_type: &str, image_base64: &str) -> Value {
    json!({
        "contents": [{
            "parts": [
                { "text": PROMPT },
                { "inline_data": { "mime_type": mime_type, "data": image_base64 } }
            ]
        }],
        "generationConfig": {
            "temperature": TEMPERATURE,
            "maxOutputTokens": MAX_OUTPUT_TOKENS,
            "topP": TOP_P,
            "topK": TOP_K
        }
    })
}

/// First text part of the first candidate.
pub fn extract_text(response: &Value) -> Option<&str> {
    response
        .pointer("/candidates/0/content/parts")?
        .as_array()?
        .iter()
        .find_map(|part| part.get("text").and_then(Value::as_str))
}

#[cfg(feature = "http")]
pub use client::GeminiGenerator;

#[cfg(feature = "http")]
mod client {
    use std::time::Duration;

    use async_trait::async_trait;
    use base64::Engine;

    use super::*;
    use crate::error::{GenerateError, Result};
    use crate::generator::Generator;
    use crate::types::{GenerateParams, GeneratedBlob};

    const FETCH_TIMEOUT: Duration = Duration::from_secs(90);
    const DEFAULT_MIME: &str = "image/png";

    fn http_err(e: reqwest::Error) -> GenerateError {
        // The API key travels in the query string; never echo the URL.
        GenerateError::Provider(e.without_url().to_string())
    }

    pub struct GeminiGenerator {
        api_key: String,
        endpoint: String,
        http: reqwest::Client,
    }

    impl GeminiGenerator {
        pub fn new(api_key: impl Into<String>) -> Result<Self> {
            Self::with_endpoint(api_key, DEFAULT_ENDPOINT)
        }

        pub fn with_endpoint(api_key: impl Into<String>, endpoint: impl Into<String>) -> Result<Self> {
            let api_key = api_key.into();
            if api_key.trim().is_empty() {
                return Err(GenerateError::NotConfigured("GEMINI_API_KEY is empty".into()));
            }
            let http = reqwest::Client::builder()
                .timeout(FETCH_TIMEOUT)
                .build()
                .map_err(|e| GenerateError::NotConfigured(e.to_string()))?;
            Ok(Self { api_key, endpoint: endpoint.into(), http })
        }

        async fn fetch_image(&self, url: &str) -> Result<(String, String)> {
            let resp = self.http.get(url).send().await.map_err(http_err)?;
            let status = resp.status();
            if !status.is_success() {
                return Err(GenerateError::Provider(format!("failed to fetch image: {status}")));
            }
            let mime = resp
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or(DEFAULT_MIME)
                .to_string();
            let bytes = resp.bytes().await.map_err(http_err)?;
            Ok((mime, base64::engine::general_purpose::STANDARD.encode(&bytes)))
        }
    }

    #[async_trait]
    impl Generator for GeminiGenerator {
        fn provider(&self) -> &str {
            PROVIDER
        }

        async fn generate(&self, params: &GenerateParams) -> Result<GeneratedBlob> {
            let (mime, data) = self.fetch_image(&params.image_url).await?;
            let resp = self
                .http
                .post(endpoint(&self.endpoint, &params.model))
                .query(&[("key", self.api_key.as_str())])
                .json(&request_body(&mime, &data))
                .send()
                .await
                .map_err(http_err)?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(GenerateError::Provider(format!("gemini api error: {status} - {body}")));
            }
            let json: Value = resp.json().await.map_err(http_err)?;
            let text = extract_text(&json).unwrap_or_default().to_string();
            tracing::debug!(model = %params.model, chars = text.len(), "gemini responded");
            Ok(GeneratedBlob { text, model: params.model.clone(), attempt: params.attempt })
        }
    }
}
