//! Simulation clock endpoints (`/api/market/time/*`)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{ApiClient, ApiError, ClockApi};
use crate::types::SimulationClockState;

/// Acknowledgement returned by clock control commands
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandAck {
    pub message: Option<String>,
    pub compression: Option<String>,
}

impl ApiClient {
    async fn clock_command(&self, command: &str) -> Result<CommandAck, ApiError> {
        self.rest
            .post_json(&["api", "market", "time", command], &[], &json!({}))
            .await
    }
}

#[async_trait]
impl ClockApi for ApiClient {
    async fn status(&self) -> Result<SimulationClockState, ApiError> {
        self.rest
            .get_json(&["api", "market", "time", "status"], &[])
            .await
    }

    async fn start(&self) -> Result<CommandAck, ApiError> {
        self.clock_command("start").await
    }

    async fn stop(&self) -> Result<CommandAck, ApiError> {
        self.clock_command("stop").await
    }

    async fn reset(&self) -> Result<CommandAck, ApiError> {
        self.clock_command("reset").await
    }
}
