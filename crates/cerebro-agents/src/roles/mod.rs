//! Built-in analysis roles.

pub mod risk;
pub mod sentiment;
pub mod technical;

use std::sync::Arc;

use cerebro_models::AgentRole;

use crate::agent::AnalysisAgent;

pub use risk::RiskAssessor;
pub use sentiment::SentimentAnalyzer;
pub use technical::TechnicalAnalyst;

/// Resolve a role identifier to its built-in implementation.
///
/// Roles that only coordinate or execute have no analysis capability.
pub fn builtin_agent(role: AgentRole) -> Option<Arc<dyn AnalysisAgent>> {
    match role {
        AgentRole::SentimentAnalyzer => Some(Arc::new(SentimentAnalyzer::new())),
        AgentRole::TechnicalAnalyst => Some(Arc::new(TechnicalAnalyst::new())),
        AgentRole::RiskAssessor => Some(Arc::new(RiskAssessor::new())),
        AgentRole::StrategyCoordinator | AgentRole::ActionExecutor => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_roles_resolve() {
        for role in [
            AgentRole::SentimentAnalyzer,
            AgentRole::TechnicalAnalyst,
            AgentRole::RiskAssessor,
        ] {
            let agent = builtin_agent(role).unwrap();
            assert_eq!(agent.role(), role);
        }
        assert!(builtin_agent(AgentRole::StrategyCoordinator).is_none());
    }
}
