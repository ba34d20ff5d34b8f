use async_trait::async_trait;
use cerebro_models::agent_message::{AgentAnalysis, AgentRole};
use chrono::Utc;
use serde::Deserialize;

use crate::agent::AnalysisAgent;
use crate::error::AgentError;

const POSITIVE_KEYWORDS: &[&str] = &["bullish", "moon", "pump", "buy", "long", "up", "gain", "profit"];
const NEGATIVE_KEYWORDS: &[&str] = &["bearish", "dump", "sell", "short", "down", "loss", "crash", "bear"];

/// Per-keyword nudge applied to news items.
const NEWS_STEP: f64 = 0.1;
/// Per-keyword nudge applied to social posts.
const SOCIAL_STEP: f64 = 0.05;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SentimentInput {
    #[serde(alias = "news")]
    news_data: Vec<TextItem>,
    #[serde(alias = "social")]
    social_data: Vec<TextItem>,
    market_data: MarketMove,
}

#[derive(Debug, Deserialize)]
struct TextItem {
    #[serde(default)]
    content: String,
    importance: Option<f64>,
    engagement: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MarketMove {
    price_change_24h: f64,
    volume_change_24h: f64,
}

/// Keyword-weighted news/social sentiment blended with a price/volume reading.
#[derive(Debug, Default, Clone)]
pub struct SentimentAnalyzer;

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

/// Score one text around the 0.5 baseline by its positive/negative keyword surplus.
fn keyword_score(text: &str, step: f64) -> f64 {
    let text = text.to_lowercase();
    let positive = POSITIVE_KEYWORDS.iter().filter(|k| text.contains(*k)).count() as f64;
    let negative = NEGATIVE_KEYWORDS.iter().filter(|k| text.contains(*k)).count() as f64;
    0.5 + (positive - negative) * step
}

/// Weighted item scores accumulated on top of a 0.5 seed, divided by at least 1.
fn text_sentiment(news: &[TextItem], social: &[TextItem]) -> f64 {
    let scored = news
        .iter()
        .map(|item| (keyword_score(&item.content, NEWS_STEP), item.importance))
        .chain(
            social
                .iter()
                .map(|item| (keyword_score(&item.content, SOCIAL_STEP), item.engagement)),
        );

    let (mut total, mut weight_sum) = (0.5, 0.0);
    for (score, weight) in scored {
        let weight = weight.unwrap_or(1.0).max(0.0);
        total += score * weight;
        weight_sum += weight;
    }

    (total / f64::max(1.0, weight_sum)).clamp(0.0, 1.0)
}

fn market_sentiment(market: &MarketMove) -> f64 {
    let mut sentiment = 0.5;
    if market.price_change_24h > 0.05 {
        sentiment += 0.2;
    } else if market.price_change_24h < -0.05 {
        sentiment -= 0.2;
    }
    if market.volume_change_24h > 0.2 {
        sentiment += 0.1;
    }
    f64::clamp(sentiment, 0.0, 1.0)
}

fn sentiment_label(score: f64) -> &'static str {
    if score > 0.7 {
        "BULLISH"
    } else if score > 0.3 {
        "NEUTRAL"
    } else {
        "BEARISH"
    }
}

#[async_trait]
impl AnalysisAgent for SentimentAnalyzer {
    fn role(&self) -> AgentRole {
        AgentRole::SentimentAnalyzer
    }

    fn analysis_type(&self) -> &str {
        "sentiment_analysis"
    }

    fn fallback_recommendation(&self) -> &str {
        "NEUTRAL"
    }

    async fn analyze(&self, data: &serde_json::Value) -> Result<AgentAnalysis, AgentError> {
        let input: SentimentInput = serde_json::from_value(data.clone())
            .map_err(|e| AgentError::InvalidInput(format!("sentiment input: {e}")))?;

        let sentiment_score = text_sentiment(&input.news_data, &input.social_data);
        let market = market_sentiment(&input.market_data);
        let overall = (sentiment_score + market) / 2.0;

        Ok(AgentAnalysis {
            agent_role: self.role(),
            analysis_type: self.analysis_type().to_string(),
            confidence: f64::min(0.9, (overall - 0.5).abs() * 2.0),
            recommendation: sentiment_label(overall).to_string(),
            data: serde_json::json!({
                "sentiment_score": sentiment_score,
                "market_sentiment": market,
                "overall_sentiment": overall,
                "news_count": input.news_data.len(),
                "social_mentions": input.social_data.len(),
            }),
            reasoning: format!(
                "Sentiment analysis based on {} news items and {} social mentions. Overall sentiment: {overall:.2}",
                input.news_data.len(),
                input.social_data.len(),
            ),
            created_at: Utc::now(),
        })
    }
}
