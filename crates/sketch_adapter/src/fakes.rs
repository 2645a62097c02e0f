//! In-memory stand-ins for the upstream model and the timer (testing only).

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{GenerateError, Result};
use crate::generator::Generator;
use crate::retry::Sleeper;
use crate::types::{GenerateParams, GeneratedBlob};

/// A complete component as a model would return it, fences included.
pub const VALID_COMPONENT: &str = "```jsx\nimport React, { useState } from 'react'\nimport { Home } from 'lucide-react'\n\nexport default function App() {\n  const [open, setOpen] = useState(false)\n  return <div className=\"p-4\"><Home /><button onClick={() => setOpen(!open)}>Toggle</button></div>\n}\n```";

/// Replays a fixed script of answers, one per call.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<Vec<GenerateParams>>,
}

impl ScriptedGenerator {
    pub fn new(script: impl IntoIterator<Item = Result<String>>) -> Self {
        Self { script: Mutex::new(script.into_iter().collect()), calls: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> Vec<GenerateParams> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn provider(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, params: &GenerateParams) -> Result<GeneratedBlob> {
        self.calls.lock().unwrap().push(params.clone());
        let next = self.script.lock().unwrap().pop_front();
        let text = next.unwrap_or_else(|| Err(GenerateError::Provider("script exhausted".into())))?;
        Ok(GeneratedBlob { text, model: params.model.clone(), attempt: params.attempt })
    }
}

/// Records requested sleeps and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}
