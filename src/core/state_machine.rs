//! State machine for tracking a single publish run
//!
//! Runs are single-shot, so state lives in memory only; every transition is
//! timestamped for the run history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Publishing state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublishState {
    Validating,
    CheckingVersion,
    Skipped,
    Publishing,
    Tagging,
    Done,
    Failed,
}

impl PublishState {
    /// Terminal states end the run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Skipped | Self::Done | Self::Failed)
    }

    /// Terminal states that exit with success
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Skipped | Self::Done)
    }

    /// Whether `to` is a legal successor of this state
    pub fn can_transition_to(&self, to: PublishState) -> bool {
        use PublishState::*;

        match (self, to) {
            (Validating, CheckingVersion) => true,
            (CheckingVersion, Skipped | Publishing) => true,
            (Publishing, Tagging | Done) => true,
            (Tagging, Done) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

/// State transition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateTransition {
    /// From state
    pub from: PublishState,

    /// To state
    pub to: PublishState,

    /// Timestamp
    pub timestamp: DateTime<Utc>,

    /// Additional metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// Rejected transition
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("illegal state transition {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub from: PublishState,
    pub to: PublishState,
}

/// State machine for tracking the publishing workflow
#[derive(Debug)]
pub struct PublishStateMachine {
    current_state: PublishState,
    started_at: DateTime<Utc>,
    transitions: Vec<StateTransition>,
    error: Option<String>,
}

impl Default for PublishStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PublishStateMachine {
    /// Create a new state machine in `Validating`
    pub fn new() -> Self {
        Self {
            current_state: PublishState::Validating,
            started_at: Utc::now(),
            transitions: Vec::new(),
            error: None,
        }
    }

    /// Transition to a new state
    pub fn transition(
        &mut self,
        to: PublishState,
        metadata: Option<HashMap<String, serde_json::Value>>,
    ) -> Result<(), InvalidTransition> {
        if !self.current_state.can_transition_to(to) {
            return Err(InvalidTransition {
                from: self.current_state,
                to,
            });
        }

        if let Some(serde_json::Value::String(error)) =
            metadata.as_ref().and_then(|meta| meta.get("error"))
        {
            self.error = Some(error.clone());
        }

        self.transitions.push(StateTransition {
            from: self.current_state,
            to,
            timestamp: Utc::now(),
            metadata,
        });
        self.current_state = to;

        Ok(())
    }

    /// Move to `Failed`, recording the error message
    pub fn fail(&mut self, error: &str) {
        let metadata = HashMap::from([(
            "error".to_string(),
            serde_json::Value::String(error.to_string()),
        )]);
        // Already terminal: keep the first outcome
        let _ = self.transition(PublishState::Failed, Some(metadata));
    }

    /// Get current state
    pub fn get_state(&self) -> PublishState {
        self.current_state
    }

    /// Recorded transitions
    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    /// Get last error
    pub fn get_last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Milliseconds since the machine was created
    pub fn get_elapsed_time(&self) -> i64 {
        let end = self
            .transitions
            .last()
            .map(|t| t.timestamp)
            .unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds()
    }

    /// Get transition history as human-readable string
    pub fn get_history(&self) -> String {
        self.transitions
            .iter()
            .map(|t| {
                let time = t.timestamp.to_rfc3339();
                let meta = if let Some(metadata) = &t.metadata {
                    format!(" ({})", serde_json::to_string(metadata).unwrap_or_default())
                } else {
                    String::new()
                };
                format!("{}: {:?} → {:?}{}", time, t.from, t.to, meta)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
