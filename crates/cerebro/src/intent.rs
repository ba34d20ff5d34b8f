use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse topic of a user query, checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Mathematical,
    PerformanceAnalysis,
    StrategyOptimization,
    MarketAnalysis,
    Configuration,
    General,
}

const RULES: &[(Intent, &[&str])] = &[
    (
        Intent::Mathematical,
        &["calculate", "math", "formula", "percentage", "ratio", "statistics"],
    ),
    (
        Intent::PerformanceAnalysis,
        &["performance", "profit", "loss", "roi", "pnl"],
    ),
    (
        Intent::StrategyOptimization,
        &["strategy", "optimize", "improve", "settings", "parameters"],
    ),
    (
        Intent::MarketAnalysis,
        &["market", "price", "trend", "sentiment", "volatility"],
    ),
    (
        Intent::Configuration,
        &["config", "setting", "change", "update", "modify"],
    ),
];

impl Intent {
    pub fn classify(query: &str) -> Self {
        let lower = query.to_lowercase();
        RULES
            .iter()
            .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
            .map(|(intent, _)| *intent)
            .unwrap_or(Intent::General)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Mathematical => "mathematical",
            Intent::PerformanceAnalysis => "performance_analysis",
            Intent::StrategyOptimization => "strategy_optimization",
            Intent::MarketAnalysis => "market_analysis",
            Intent::Configuration => "configuration",
            Intent::General => "general",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_matching_rule_wins() {
        // "profit" and "strategy" both appear; performance is checked first.
        assert_eq!(
            Intent::classify("Which strategy made the most profit?"),
            Intent::PerformanceAnalysis
        );
        assert_eq!(
            Intent::classify("Calculate the win ratio"),
            Intent::Mathematical
        );
        assert_eq!(
            Intent::classify("What is the SOL price trend?"),
            Intent::MarketAnalysis
        );
        assert_eq!(Intent::classify("Please update the slippage"), Intent::Configuration);
        assert_eq!(Intent::classify("hello there"), Intent::General);
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(Intent::classify("OPTIMIZE my bot"), Intent::StrategyOptimization);
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Intent::PerformanceAnalysis).unwrap(),
            "\"performance_analysis\""
        );
    }
}
