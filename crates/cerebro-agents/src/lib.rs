pub mod agent;
pub mod bus;
pub mod claude_cli;
pub mod coordinator;
pub mod error;
pub mod flow;
pub mod llm;
pub mod prompts;
pub mod roles;
pub mod tools;

pub mod test_support;

pub use agent::{analyze_guarded, AnalysisAgent};
pub use bus::{Mailbox, MessageBus};
pub use claude_cli::ClaudeCli;
pub use coordinator::{synthesize, MultiAgentCoordinator};
pub use error::{AgentError, BusError};
pub use flow::OrchestrationFlow;
pub use llm::LanguageModel;
pub use tools::{MemorySearchTool, Tool, ToolExecutor, ToolKind, ToolRegistry};
