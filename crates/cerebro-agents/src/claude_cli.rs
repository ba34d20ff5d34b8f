use std::time::Duration;

use async_trait::async_trait;
use cerebro_models::config::AgentConfig;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::AgentError;
use crate::llm::LanguageModel;

/// Language model backed by the `claude` CLI in print mode.
#[derive(Debug, Clone)]
pub struct ClaudeCli {
    pub program: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for ClaudeCli {
    fn default() -> Self {
        Self {
            program: "claude".to_string(),
            model: "claude-3-5-haiku-latest".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl ClaudeCli {
    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            model: config.model.clone(),
            timeout: Duration::from_secs(config.llm_timeout_seconds),
            ..Self::default()
        }
    }

    /// Whether the configured program answers `--version`.
    pub async fn is_available(&self) -> bool {
        match Command::new(&self.program).arg("--version").output().await {
            Ok(output) => output.status.success(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl LanguageModel for ClaudeCli {
    fn name(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, system_prompt: &str, prompt: &str) -> Result<String, AgentError> {
        debug!(model = %self.model, prompt_len = prompt.len(), "Invoking claude CLI");

        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.program)
                .args([
                    "-p",
                    prompt,
                    "--system-prompt",
                    system_prompt,
                    "--model",
                    &self.model,
                    "--output-format",
                    "text",
                ])
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| AgentError::Timeout(self.timeout.as_secs()))?
        .map_err(|e| AgentError::Cli(format!("Failed to spawn {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = %output.status, stderr = %stderr, "Claude CLI failed");
            return Err(AgentError::Cli(format!(
                "{} exited {}: {}",
                self.program, output.status, stderr
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if text.is_empty() {
            return Err(AgentError::Cli("Claude returned empty response".to_string()));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_copies_model_and_timeout() {
        let config = AgentConfig {
            model: "claude-sonnet-4-5-20250929".to_string(),
            llm_timeout_seconds: 15,
            ..AgentConfig::default()
        };
        let cli = ClaudeCli::from_config(&config);
        assert_eq!(cli.program, "claude");
        assert_eq!(cli.name(), "claude-sonnet-4-5-20250929");
        assert_eq!(cli.timeout, Duration::from_secs(15));
    }

    #[tokio::test]
    async fn missing_program_is_a_cli_error() {
        let cli = ClaudeCli {
            program: "cerebro-no-such-binary".to_string(),
            ..ClaudeCli::default()
        };
        assert!(!cli.is_available().await);
        let err = cli.invoke("system", "prompt").await.unwrap_err();
        assert!(matches!(err, AgentError::Cli(_)));
    }
}
