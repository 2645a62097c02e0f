use async_trait::async_trait;

use crate::error::Result;
use crate::types::{GenerateParams, GeneratedBlob};

/// Produces raw component source for an image. One call per attempt.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Provider name recorded in the audit log and responses.
    fn provider(&self) -> &str;

    async fn generate(&self, params: &GenerateParams) -> Result<GeneratedBlob>;
}
