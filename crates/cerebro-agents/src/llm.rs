use async_trait::async_trait;

use crate::error::AgentError;

/// Language-model collaborator: turns a system prompt plus a user prompt into text.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;

    async fn invoke(&self, system_prompt: &str, prompt: &str) -> Result<String, AgentError>;
}
