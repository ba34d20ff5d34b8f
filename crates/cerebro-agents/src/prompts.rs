use cerebro_models::memory_schema::MemoryContext;
use cerebro_models::session::{ActionBatch, Observation, OrchestrationSession};

/// How many earlier iterations are replayed into the planning prompt.
const HISTORY_WINDOW: usize = 3;

pub fn system_prompt(tool_names: &[&str]) -> String {
    format!(
        "You are Cerebro, an AI assistant for Solana HFT trading analysis.\n\
         You work in iterations: plan, act with tools, observe the results, then decide \
         whether more work is needed.\n\
         Available tools: {}.\n\
         Name a tool explicitly in your plan when you need it.",
        if tool_names.is_empty() {
            "none".to_string()
        } else {
            tool_names.join(", ")
        }
    )
}

fn tail<T>(items: &[T]) -> &[T] {
    &items[items.len().saturating_sub(HISTORY_WINDOW)..]
}

fn pretty<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "[]".to_string())
}

pub fn planning_prompt(
    query: &str,
    memory_context: &[MemoryContext],
    actions_taken: &[ActionBatch],
    observations: &[Observation],
) -> String {
    let memory = if memory_context.is_empty() {
        "No relevant context found".to_string()
    } else {
        pretty(memory_context)
    };
    let actions = if actions_taken.is_empty() {
        "No previous actions".to_string()
    } else {
        pretty(tail(actions_taken))
    };
    let observed = if observations.is_empty() {
        "No previous observations".to_string()
    } else {
        pretty(tail(observations))
    };

    format!(
        "USER QUERY: {query}\n\n\
         RELEVANT MEMORY CONTEXT:\n{memory}\n\n\
         PREVIOUS ACTIONS TAKEN:\n{actions}\n\n\
         PREVIOUS OBSERVATIONS:\n{observed}\n\n\
         Create a specific action plan to address the user's query. Consider:\n\
         1. What information do you need to gather?\n\
         2. What tools should you use?\n\
         3. What analysis should you perform?\n\
         4. How will you provide value to the user?\n\n\
         Respond with a clear, actionable plan."
    )
}

pub fn final_response_prompt(session: &OrchestrationSession) -> String {
    let last_observation = session
        .observations
        .last()
        .map(|o| o.summary.as_str())
        .unwrap_or("none");

    format!(
        "Based on the analysis performed, generate a comprehensive response to the user's query: \"{}\"\n\n\
         Actions taken: {}\n\
         Observations made: {}\n\
         Iterations completed: {}\n\
         Latest observation: {last_observation}\n\n\
         Provide a helpful, actionable response that addresses the user's needs.",
        session.query,
        session.total_actions(),
        session.observations.len(),
        session.iteration_count,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn observation(summary: &str) -> Observation {
        Observation {
            summary: summary.to_string(),
            succeeded: 1,
            failed: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn system_prompt_lists_tools() {
        let prompt = system_prompt(&["get_hft_stats", "search_memory"]);
        assert!(prompt.contains("get_hft_stats, search_memory"));
        assert!(system_prompt(&[]).contains("Available tools: none"));
    }

    #[test]
    fn first_planning_prompt_has_placeholders() {
        let prompt = planning_prompt("how did we do today?", &[], &[], &[]);
        assert!(prompt.contains("USER QUERY: how did we do today?"));
        assert!(prompt.contains("No relevant context found"));
        assert!(prompt.contains("No previous actions"));
        assert!(prompt.contains("No previous observations"));
    }

    #[test]
    fn planning_prompt_keeps_last_three_observations() {
        let observations: Vec<Observation> = (1..=5)
            .map(|i| observation(&format!("observation-{i}")))
            .collect();
        let prompt = planning_prompt("q", &[], &[], &observations);
        assert!(!prompt.contains("observation-2"));
        assert!(prompt.contains("observation-3"));
        assert!(prompt.contains("observation-5"));
    }

    #[test]
    fn final_prompt_reports_counts() {
        let mut session = OrchestrationSession::new("check stats", 5);
        session.iteration_count = 2;
        session.observations.push(observation("Executed 1 actions: 1 successful, 0 failed"));

        let prompt = final_response_prompt(&session);
        assert!(prompt.contains("\"check stats\""));
        assert!(prompt.contains("Iterations completed: 2"));
        assert!(prompt.contains("Latest observation: Executed 1 actions"));
    }
}
