//! Test doubles for the collaborator seams of the orchestration loop.
//!
//! `ScriptedLlm` replays canned model output, `StaticTool`/`FlakyTool` stand in
//! for tool implementations, `FixedAgent` plays an analysis role with a set
//! opinion, and `InMemoryMemory` is a `MemoryBackend` that keeps entries in a
//! vector and scores them by keyword overlap.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use cerebro_memory::{MemoryBackend, MemoryError};
use cerebro_models::agent_message::{AgentAnalysis, AgentRole};
use cerebro_models::memory_schema::MemoryContext;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::agent::AnalysisAgent;
use crate::error::AgentError;
use crate::llm::LanguageModel;
use crate::tools::{Tool, ToolKind};

/// A language model that answers from a script, then repeats a fallback.
pub struct ScriptedLlm {
    script: Mutex<VecDeque<Result<String, String>>>,
    fallback: Result<String, String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    /// `Err` entries surface as `AgentError::Llm`. Once the script runs out,
    /// every call returns a generic answer.
    pub fn new(script: Vec<Result<String, String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: Ok("No further analysis.".to_string()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always answers `text`.
    pub fn repeating(text: &str) -> Self {
        let mut llm = Self::new(Vec::new());
        llm.fallback = Ok(text.to_string());
        llm
    }

    /// Always fails with `error`.
    pub fn failing(error: &str) -> Self {
        let mut llm = Self::new(Vec::new());
        llm.fallback = Err(error.to_string());
        llm
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// User prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn invoke(&self, _system_prompt: &str, prompt: &str) -> Result<String, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let next = self
            .script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front())
            .unwrap_or_else(|| self.fallback.clone());
        next.map_err(AgentError::Llm)
    }
}

/// A tool that always returns the same data.
pub struct StaticTool {
    kind: ToolKind,
    data: serde_json::Value,
    calls: AtomicUsize,
}

impl StaticTool {
    pub fn new(kind: ToolKind, data: serde_json::Value) -> Self {
        Self {
            kind,
            data,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for StaticTool {
    fn kind(&self) -> ToolKind {
        self.kind
    }

    async fn call(&self, _input: &serde_json::Value) -> Result<serde_json::Value, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.data.clone())
    }
}

/// A tool that fails its first `failures` calls, then succeeds.
pub struct FlakyTool {
    kind: ToolKind,
    remaining_failures: AtomicU32,
}

impl FlakyTool {
    pub fn new(kind: ToolKind, failures: u32) -> Self {
        Self {
            kind,
            remaining_failures: AtomicU32::new(failures),
        }
    }
}

#[async_trait]
impl Tool for FlakyTool {
    fn kind(&self) -> ToolKind {
        self.kind
    }

    async fn call(&self, input: &serde_json::Value) -> Result<serde_json::Value, AgentError> {
        let failed = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(AgentError::Tool(format!("{} temporarily unavailable", self.kind)));
        }
        Ok(serde_json::json!({"tool": self.kind.as_str(), "input": input}))
    }
}

/// An analysis role with a fixed opinion, optionally answering late.
pub struct FixedAgent {
    role: AgentRole,
    recommendation: String,
    confidence: f64,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FixedAgent {
    pub fn new(role: AgentRole, recommendation: &str, confidence: f64) -> Self {
        Self {
            role,
            recommendation: recommendation.to_string(),
            confidence,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisAgent for FixedAgent {
    fn role(&self) -> AgentRole {
        self.role
    }

    fn analysis_type(&self) -> &str {
        "fixed_analysis"
    }

    async fn analyze(&self, data: &serde_json::Value) -> Result<AgentAnalysis, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(AgentAnalysis {
            agent_role: self.role,
            analysis_type: "fixed_analysis".to_string(),
            confidence: self.confidence,
            recommendation: self.recommendation.clone(),
            data: data.clone(),
            reasoning: format!("{} holds {}", self.role, self.recommendation),
            created_at: Utc::now(),
        })
    }
}

/// Vector-backed memory. Relevance is the share of query words found in an entry.
#[derive(Default)]
pub struct InMemoryMemory {
    entries: RwLock<Vec<MemoryContext>>,
    fail_writes: bool,
}

impl InMemoryMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose `store` always fails.
    pub fn read_only() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            fail_writes: true,
        }
    }

    pub async fn entries(&self) -> Vec<MemoryContext> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl MemoryBackend for InMemoryMemory {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<MemoryContext>, MemoryError> {
        let words: Vec<String> = query
            .split_whitespace()
            .filter(|w| w.len() >= 3)
            .map(|w| w.to_lowercase())
            .collect();

        let entries = self.entries.read().await;
        let mut hits: Vec<MemoryContext> = entries
            .iter()
            .rev()
            .filter_map(|entry| {
                let content = entry.content.to_lowercase();
                let matched = words.iter().filter(|w| content.contains(w.as_str())).count();
                if matched == 0 {
                    return None;
                }
                let mut hit = entry.clone();
                hit.relevance = matched as f64 / words.len() as f64;
                Some(hit)
            })
            .collect();
        hits.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn store(
        &self,
        content: &str,
        kind: &str,
        metadata: serde_json::Value,
    ) -> Result<(), MemoryError> {
        if self.fail_writes {
            return Err(MemoryError::Unavailable("read-only memory".to_string()));
        }
        self.entries.write().await.push(MemoryContext {
            id: Uuid::new_v4().to_string(),
            kind: kind.to_string(),
            content: content.to_string(),
            metadata,
            relevance: 0.0,
            created_at: Utc::now(),
        });
        Ok(())
    }
}
