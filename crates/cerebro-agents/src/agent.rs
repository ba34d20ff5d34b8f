use std::sync::Arc;

use async_trait::async_trait;
use cerebro_models::agent_message::{AgentAnalysis, AgentRole};
use tracing::{error, warn};

use crate::error::AgentError;

/// A named capability that turns arbitrary input data into an `AgentAnalysis`.
/// Mockable for testing.
#[async_trait]
pub trait AnalysisAgent: Send + Sync {
    fn role(&self) -> AgentRole;

    /// Label stored in `AgentAnalysis::analysis_type`.
    fn analysis_type(&self) -> &str;

    /// Recommendation reported when `analyze` fails.
    fn fallback_recommendation(&self) -> &str {
        "HOLD"
    }

    async fn analyze(&self, data: &serde_json::Value) -> Result<AgentAnalysis, AgentError>;
}

/// Run `agent.analyze` in its own task so that neither an error nor a panic
/// escapes: both become a zero-confidence analysis carrying the error text.
pub async fn analyze_guarded(
    agent: Arc<dyn AnalysisAgent>,
    data: serde_json::Value,
) -> AgentAnalysis {
    let role = agent.role();
    let analysis_type = agent.analysis_type().to_string();
    let fallback = agent.fallback_recommendation().to_string();

    let task = tokio::spawn(async move { agent.analyze(&data).await });

    match task.await {
        Ok(Ok(analysis)) => analysis,
        Ok(Err(e)) => {
            warn!(role = %role, error = %e, "Analysis failed");
            AgentAnalysis::failed(role, &analysis_type, &fallback, &e.to_string())
        }
        Err(e) => {
            error!(role = %role, error = %e, "Analysis task panicked");
            AgentAnalysis::failed(role, &analysis_type, &fallback, &format!("task panicked: {e}"))
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::time::Duration;

    /// Mock role returning a fixed recommendation, optionally after a delay.
    pub struct MockAgent {
        pub role: AgentRole,
        pub recommendation: String,
        pub confidence: f64,
        pub delay: Option<Duration>,
        pub should_fail: bool,
        pub should_panic: bool,
    }

    impl MockAgent {
        pub fn new(role: AgentRole, recommendation: &str, confidence: f64) -> Self {
            Self {
                role,
                recommendation: recommendation.to_string(),
                confidence,
                delay: None,
                should_fail: false,
                should_panic: false,
            }
        }

        pub fn failing(role: AgentRole) -> Self {
            let mut mock = Self::new(role, "HOLD", 0.0);
            mock.should_fail = true;
            mock
        }

        pub fn panicking(role: AgentRole) -> Self {
            let mut mock = Self::new(role, "HOLD", 0.0);
            mock.should_panic = true;
            mock
        }

        pub fn slow(role: AgentRole, delay: Duration) -> Self {
            let mut mock = Self::new(role, "BUY", 0.9);
            mock.delay = Some(delay);
            mock
        }
    }

    #[async_trait]
    impl AnalysisAgent for MockAgent {
        fn role(&self) -> AgentRole {
            self.role
        }

        fn analysis_type(&self) -> &str {
            "mock_analysis"
        }

        async fn analyze(&self, data: &serde_json::Value) -> Result<AgentAnalysis, AgentError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.should_panic {
                panic!("mock panic");
            }
            if self.should_fail {
                return Err(AgentError::InvalidInput("mock failure".to_string()));
            }

            Ok(AgentAnalysis {
                agent_role: self.role,
                analysis_type: "mock_analysis".to_string(),
                confidence: self.confidence,
                recommendation: self.recommendation.clone(),
                data: data.clone(),
                reasoning: format!("Mock {} analysis", self.role),
                created_at: chrono::Utc::now(),
            })
        }
    }

    #[tokio::test]
    async fn guarded_passes_through_success() {
        let agent = Arc::new(MockAgent::new(AgentRole::TechnicalAnalyst, "BUY", 0.8));
        let analysis = analyze_guarded(agent, serde_json::json!({"x": 1})).await;
        assert_eq!(analysis.recommendation, "BUY");
        assert_eq!(analysis.confidence, 0.8);
        assert_eq!(analysis.data["x"], 1);
    }

    #[tokio::test]
    async fn guarded_converts_error() {
        let agent = Arc::new(MockAgent::failing(AgentRole::RiskAssessor));
        let analysis = analyze_guarded(agent, serde_json::json!({})).await;
        assert_eq!(analysis.confidence, 0.0);
        assert_eq!(analysis.recommendation, "HOLD");
        assert!(analysis.reasoning.contains("mock failure"));
    }

    #[tokio::test]
    async fn guarded_converts_panic() {
        let agent = Arc::new(MockAgent::panicking(AgentRole::SentimentAnalyzer));
        let analysis = analyze_guarded(agent, serde_json::json!({})).await;
        assert_eq!(analysis.agent_role, AgentRole::SentimentAnalyzer);
        assert_eq!(analysis.confidence, 0.0);
        assert!(analysis.reasoning.contains("panicked"));
    }
}
