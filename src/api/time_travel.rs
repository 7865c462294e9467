//! Time-travel endpoints (`/api/time-travel/*`)
//!
//! A session rewinds a player's timeline to a past date, records alternative
//! trades and, once completed, compares the alternative history with the
//! original one.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::fmt;
use tracing::info;

use super::{ApiClient, ApiError, TimeTravelApi};
use crate::types::format_date_time;

/// Lifecycle of a backend session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Active,
    Completed,
    Abandoned,
}

/// Risk classification attached to a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    #[serde(other)]
    Unknown,
}

impl Default for RiskLevel {
    fn default() -> Self {
        RiskLevel::Unknown
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
            RiskLevel::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Reply to `POST /api/time-travel/start`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStarted {
    pub session_id: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub rewind_to_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub original_portfolio_value: Option<Decimal>,
}

/// Original vs alternative outcome for one symbol
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TradeComparison {
    pub symbol: String,
    pub original_action: String,
    pub alternative_action: String,
    #[serde(rename = "originalPnL")]
    pub original_pnl: Decimal,
    #[serde(rename = "alternativePnL")]
    pub alternative_pnl: Decimal,
    pub improvement: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LearningInsight {
    pub insight_type: String,
    pub description: String,
    pub impact_score: Decimal,
    pub recommendation: String,
}

/// Comparison produced when a session completes (or previewed while active)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeTravelResult {
    pub session_id: String,
    pub player_id: String,
    pub rewind_point: Option<NaiveDateTime>,
    pub simulation_end_date: Option<NaiveDateTime>,
    pub original_performance: Decimal,
    pub alternative_performance: Decimal,
    pub performance_gap: Decimal,
    pub trade_comparisons: Vec<TradeComparison>,
    pub sector_impact: HashMap<String, Decimal>,
    pub learning_insights: Vec<LearningInsight>,
    pub risk_assessment: RiskLevel,
    pub original_sharpe_ratio: Option<Decimal>,
    pub alternative_sharpe_ratio: Option<Decimal>,
    pub max_drawdown_improvement: Option<Decimal>,
}

impl TimeTravelResult {
    /// The alternative timeline did at least as well as the original
    pub fn alternative_outperformed(&self) -> bool {
        self.performance_gap >= Decimal::ZERO
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
}

/// Trade the player would have made in the alternative timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternativeTrade {
    pub symbol: String,
    pub action: TradeAction,
    pub quantity: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_price: Option<Decimal>,
    pub execution_date: NaiveDateTime,
    pub alternative_decision: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeReceipt {
    pub trade_id: i64,
    pub symbol: String,
    pub action: TradeAction,
    #[serde(default)]
    pub execution_price: Option<Decimal>,
}

/// Persisted session as listed by `/player/{id}/sessions`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeTravelSessionRecord {
    #[serde(default)]
    pub id: Option<i64>,
    pub session_id: String,
    pub player_id: String,
    pub rewind_to_date: NaiveDateTime,
    #[serde(default)]
    pub current_simulation_date: Option<NaiveDateTime>,
    pub status: SessionStatus,
    #[serde(default)]
    pub original_portfolio_value: Option<Decimal>,
    #[serde(default)]
    pub alternative_portfolio_value: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct CompletionEnvelope {
    results: TimeTravelResult,
}

#[derive(Debug, Deserialize)]
struct PreviewEnvelope {
    preview: TimeTravelResult,
}

#[async_trait]
impl TimeTravelApi for ApiClient {
    async fn start_session(
        &self,
        player_id: &str,
        rewind_to: NaiveDateTime,
    ) -> Result<SessionStarted, ApiError> {
        let started: SessionStarted = self
            .rest
            .post_json(
                &["api", "time-travel", "start"],
                &[
                    ("playerId", player_id.to_string()),
                    ("rewindToDate", format_date_time(rewind_to)),
                ],
                &serde_json::Value::Null,
            )
            .await?;
        info!(
            session_id = %started.session_id,
            player_id = %player_id,
            rewind_to = %rewind_to,
            "Time travel session started"
        );
        Ok(started)
    }

    async fn complete_session(&self, session_id: &str) -> Result<TimeTravelResult, ApiError> {
        let envelope: CompletionEnvelope = self
            .rest
            .post_json(
                &["api", "time-travel", session_id, "complete"],
                &[],
                &json!({}),
            )
            .await?;
        Ok(envelope.results)
    }

    async fn record_trade(
        &self,
        session_id: &str,
        trade: AlternativeTrade,
    ) -> Result<TradeReceipt, ApiError> {
        self.rest
            .post_json(&["api", "time-travel", session_id, "trade"], &[], &trade)
            .await
    }

    async fn preview(&self, session_id: &str) -> Result<TimeTravelResult, ApiError> {
        let envelope: PreviewEnvelope = self
            .rest
            .get_json(&["api", "time-travel", session_id, "preview"], &[])
            .await?;
        Ok(envelope.preview)
    }

    async fn player_sessions(
        &self,
        player_id: &str,
    ) -> Result<Vec<TimeTravelSessionRecord>, ApiError> {
        self.rest
            .get_json(&["api", "time-travel", "player", player_id, "sessions"], &[])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn completion_envelope_parses_results() {
        let json = r#"{
            "status": "success",
            "message": "Time travel analysis completed",
            "results": {
                "sessionId": "tt-42",
                "playerId": "player-001",
                "rewindPoint": "2023-03-01T00:00:00",
                "simulationEndDate": "2023-06-30T16:00:00",
                "originalPerformance": 4.2,
                "alternativePerformance": 9.7,
                "performanceGap": 5.5,
                "tradeComparisons": [{
                    "symbol": "AAPL", "originalAction": "SELL", "alternativeAction": "HOLD",
                    "originalPnL": -120.5, "alternativePnL": 310.0, "improvement": 430.5
                }],
                "learningInsights": [{
                    "insightType": "TIMING", "description": "Sold too early",
                    "impactScore": 0.8, "recommendation": "Hold through volatility"
                }],
                "riskAssessment": "MEDIUM",
                "alternativeSharpeRatio": 1.4,
                "maxDrawdownImprovement": 2.1
            }
        }"#;
        let envelope: CompletionEnvelope = serde_json::from_str(json).expect("parse completion");
        let result = envelope.results;

        assert_eq!(result.session_id, "tt-42");
        assert_eq!(result.risk_assessment, RiskLevel::Medium);
        assert_eq!(result.performance_gap, dec!(5.5));
        assert_eq!(result.trade_comparisons[0].original_pnl, dec!(-120.5));
        assert_eq!(result.learning_insights.len(), 1);
        assert!(result.original_sharpe_ratio.is_none());
        assert!(result.alternative_outperformed());
    }

    #[test]
    fn unknown_risk_level_is_preserved_as_unknown() {
        let result: TimeTravelResult =
            serde_json::from_str(r#"{"riskAssessment":"EXTREME","performanceGap":-1.0}"#)
                .expect("parse result");
        assert_eq!(result.risk_assessment, RiskLevel::Unknown);
        assert!(!result.alternative_outperformed());
    }

    #[test]
    fn alternative_trade_serializes_backend_field_names() {
        let trade = AlternativeTrade {
            symbol: "MSFT".to_string(),
            action: TradeAction::Buy,
            quantity: dec!(10),
            execution_price: None,
            execution_date: chrono::NaiveDate::from_ymd_opt(2023, 4, 3)
                .and_then(|d| d.and_hms_opt(9, 30, 0))
                .expect("valid date"),
            alternative_decision: "Buy the dip".to_string(),
        };
        let value = serde_json::to_value(&trade).expect("serialize trade");
        assert_eq!(value["action"], "BUY");
        assert_eq!(value["executionDate"], "2023-04-03T09:30:00");
        assert_eq!(value["alternativeDecision"], "Buy the dip");
        assert!(value.get("executionPrice").is_none());
    }

    #[test]
    fn session_record_parses_status() {
        let json = r#"[{"id":7,"sessionId":"tt-7","playerId":"player-001",
            "rewindToDate":"2023-02-01T00:00:00","status":"ABANDONED"}]"#;
        let sessions: Vec<TimeTravelSessionRecord> =
            serde_json::from_str(json).expect("parse sessions");
        assert_eq!(sessions[0].status, SessionStatus::Abandoned);
        assert_eq!(sessions[0].id, Some(7));
    }
}
