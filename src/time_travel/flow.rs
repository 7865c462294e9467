//! Time-Travel Session Flow
//!
//! `Idle -> Active -> Completed -> Idle`. A failed start stays `Idle`, a failed
//! completion stays `Active` so it can be retried.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

use super::timeline::{MonthTimeline, TimelineError};
use crate::api::{ApiError, TimeTravelApi, TimeTravelResult};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("no active time travel session")]
    NotActive,
    #[error(transparent)]
    Timeline(#[from] TimelineError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Active {
        session_id: String,
        rewind_to: NaiveDateTime,
    },
    Completed {
        session_id: String,
        result: Box<TimeTravelResult>,
    },
}

/// Banner shown to the player after the last action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowMessage {
    Success(String),
    Error(String),
}

pub struct TimeTravelFlow {
    api: Arc<dyn TimeTravelApi>,
    player_id: String,
    timeline: MonthTimeline,
    state: SessionState,
    message: Option<FlowMessage>,
}

impl TimeTravelFlow {
    pub fn new(
        api: Arc<dyn TimeTravelApi>,
        player_id: impl Into<String>,
        timeline: MonthTimeline,
    ) -> Self {
        Self {
            api,
            player_id: player_id.into(),
            timeline,
            state: SessionState::Idle,
            message: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn message(&self) -> Option<&FlowMessage> {
        self.message.as_ref()
    }

    pub fn timeline(&self) -> &MonthTimeline {
        &self.timeline
    }

    pub fn active_session(&self) -> Option<&str> {
        match &self.state {
            SessionState::Active { session_id, .. } => Some(session_id),
            _ => None,
        }
    }

    pub fn results(&self) -> Option<&TimeTravelResult> {
        match &self.state {
            SessionState::Completed { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn select_month(&mut self, index: u32) -> Result<NaiveDate, SessionError> {
        Ok(self.timeline.select_month(index)?)
    }

    pub fn on_clock_update(&mut self, game_time: NaiveDateTime) -> NaiveDate {
        self.timeline.on_clock_update(game_time)
    }

    /// Open a session for the configured player, rewound to the first day of
    /// the selected month
    pub async fn start(&mut self) -> Result<String, SessionError> {
        let rewind_to = self.timeline.selected_date().and_time(NaiveTime::MIN);
        let player_id = self.player_id.clone();
        self.start_at(&player_id, rewind_to).await
    }

    /// Open a session for `player_id` rewound to `rewind_to`.
    ///
    /// Returns the session id. While a session is active this is a no-op that
    /// returns the existing id. Dates outside the unlocked months of the game
    /// year are rejected without contacting the backend.
    pub async fn start_at(
        &mut self,
        player_id: &str,
        rewind_to: NaiveDateTime,
    ) -> Result<String, SessionError> {
        if let SessionState::Active { session_id, .. } = &self.state {
            return Ok(session_id.clone());
        }
        self.timeline.unlocked_month(rewind_to.date())?;

        self.message = None;
        match self.api.start_session(player_id, rewind_to).await {
            Ok(started) => {
                info!(
                    session_id = %started.session_id,
                    rewind_to = %rewind_to,
                    "Time travel session active"
                );
                self.message = Some(FlowMessage::Success(format!(
                    "Time travel started to {}",
                    rewind_to.format("%B %Y")
                )));
                self.state = SessionState::Active {
                    session_id: started.session_id.clone(),
                    rewind_to,
                };
                Ok(started.session_id)
            }
            Err(e) => {
                error!(player_id = %player_id, error = %e, "Failed to start time travel");
                self.message = Some(FlowMessage::Error(
                    "Failed to start time travel".to_string(),
                ));
                self.state = SessionState::Idle;
                Err(e.into())
            }
        }
    }

    /// Complete the active session and keep its comparison results
    pub async fn complete(&mut self) -> Result<TimeTravelResult, SessionError> {
        let SessionState::Active { session_id, .. } = &self.state else {
            return Err(SessionError::NotActive);
        };
        let session_id = session_id.clone();

        self.message = None;
        match self.api.complete_session(&session_id).await {
            Ok(result) => {
                info!(
                    session_id = %session_id,
                    performance_gap = %result.performance_gap,
                    risk = %result.risk_assessment,
                    "Time travel session completed"
                );
                self.state = SessionState::Completed {
                    session_id,
                    result: Box::new(result.clone()),
                };
                Ok(result)
            }
            Err(e) => {
                error!(session_id = %session_id, error = %e, "Failed to complete time travel");
                self.message = Some(FlowMessage::Error(
                    "Failed to fetch time travel results".to_string(),
                ));
                Err(e.into())
            }
        }
    }

    /// Close the results view. Returns `false` unless results were shown.
    pub fn dismiss_results(&mut self) -> bool {
        if matches!(self.state, SessionState::Completed { .. }) {
            self.state = SessionState::Idle;
            true
        } else {
            false
        }
    }
}
