//! Cerebro - trading analysis orchestrator
//!
//! Answers trading questions and market events by running a bounded
//! plan/act/observe loop over a language model and tools, collecting opinions
//! from sentiment, technical and risk roles, and routing any resulting trading
//! decision through a risk-tiered human approval gate.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use cerebro::models::config::CerebroConfig;
//!
//! # async fn run() -> Result<(), cerebro::AnalystError> {
//! let analyst = cerebro::build_analyst(&CerebroConfig::default()).await?;
//! let answer = analyst
//!     .enhanced_analysis("Should I buy SOL?", serde_json::json!({}))
//!     .await;
//! println!("{}", answer.response);
//! analyst.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub use cerebro_agents as agents;
pub use cerebro_approval as approval;
pub use cerebro_memory as memory;
pub use cerebro_models as models;

pub mod analyst;
pub mod decision;
pub mod error;
pub mod intent;
pub mod market;
pub mod metrics;
pub mod tools;

pub use analyst::{AnalysisResponse, AnalystStatus, EnhancedResponse, TradingAnalyst};
pub use decision::ApprovalOutcome;
pub use error::AnalystError;
pub use intent::Intent;
pub use market::{MarketDataSource, StaticMarketData};
pub use metrics::AnalystMetrics;

use std::sync::Arc;
use std::time::Duration;

use cerebro_agents::{ClaudeCli, MemorySearchTool, MultiAgentCoordinator, OrchestrationFlow, ToolRegistry};
use cerebro_approval::{ApprovalManager, LogChannel};
use cerebro_memory::{MemoryBackend, MemoryStore};
use cerebro_models::config::CerebroConfig;

use crate::tools::{MarketConditionsTool, TradingStatsTool};

/// Build a ready-to-use analyst from configuration: SQLite-backed memory, the
/// `claude` CLI as language model, the reference market snapshot, the
/// built-in analysis roles and a log notification channel. The approval
/// expiry sweeper is already running.
pub async fn build_analyst(config: &CerebroConfig) -> Result<TradingAnalyst, AnalystError> {
    if config.agent.max_iterations == 0 {
        return Err(AnalystError::Config(
            "agent.max_iterations must be at least 1".to_string(),
        ));
    }

    let memory: Arc<dyn MemoryBackend> = Arc::new(MemoryStore::open(&config.memory)?);
    let market: Arc<dyn MarketDataSource> = Arc::new(StaticMarketData::from_config(&config.market));

    let tools = ToolRegistry::new()
        .with(Arc::new(MemorySearchTool::new(
            Arc::clone(&memory),
            config.memory.search_limit,
        )))
        .with(Arc::new(MarketConditionsTool::new(Arc::clone(&market))))
        .with(Arc::new(TradingStatsTool::new(Arc::clone(&market))));

    let flow = OrchestrationFlow::new(
        Arc::new(ClaudeCli::from_config(&config.agent)),
        Arc::new(tools),
        Arc::clone(&memory),
        config.agent.max_iterations,
    )
    .with_memory_search_limit(config.memory.search_limit);

    let coordinator = MultiAgentCoordinator::from_config(&config.agent);

    let approvals = Arc::new(ApprovalManager::new(config.approval.clone()));
    approvals
        .add_notification_channel(Arc::new(LogChannel::default()))
        .await;

    let analyst = TradingAnalyst::new(
        flow,
        coordinator,
        approvals,
        memory,
        market,
        config.trading.clone(),
    );
    analyst
        .start_expiry_sweeper(Duration::from_secs(config.approval.sweep_interval_seconds.max(1)))
        .await;
    Ok(analyst)
}
