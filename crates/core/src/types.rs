//! Type definitions for the call screening pipeline
//!
//! This module contains the core data model: call identifiers, the per-call
//! state record and its status machine, decisions produced by the reasoning
//! layer, and the results of routed actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, ScreenError};

/// Unique identifier for one call leg
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(pub String);

impl CallId {
    /// Generate a fresh call ID for events that arrive without one
    pub fn new() -> Self {
        Self(format!("call-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CallId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CallId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Inbound call-arrival event, as delivered by the signaling front door
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingCallEvent {
    /// Caller-supplied call ID; generated when absent
    #[serde(default)]
    pub call_id: Option<String>,

    /// Number the call originates from
    pub caller_number: String,

    /// Number that was dialed
    pub called_number: String,

    /// Arrival timestamp as reported by the signaling layer
    #[serde(default)]
    pub timestamp: Option<String>,

    /// Signaling channel identifier (e.g. a trunk channel string)
    #[serde(default)]
    pub channel: Option<String>,
}

/// Call status enumeration
///
/// A call only moves forward through the screening pipeline or terminates;
/// the single loop edge is `Asking` back to `Capturing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    /// Call has arrived but is not yet answered
    Ringing,

    /// Call leg is answered and live
    Answered,

    /// Capturing a bounded sample of caller audio
    Capturing,

    /// Speech-to-text in progress
    Transcribing,

    /// Waiting on the reasoning service
    Analyzing,

    /// Executing the chosen disposition
    Routing,

    /// Follow-up question played, looping back to capture
    Asking,

    /// Call reached a disposition
    Completed,

    /// Call could not be screened
    Failed,
}

impl CallStatus {
    /// Whether this status is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallStatus::Completed | CallStatus::Failed)
    }

    /// Check if a status transition is valid
    pub fn can_transition_to(&self, to: CallStatus) -> bool {
        use CallStatus::*;

        // Any live call can fail on a telephony-level error
        if to == Failed && !self.is_terminal() {
            return true;
        }

        match (self, to) {
            (Ringing, Answered) => true,
            (Answered, Capturing) => true,
            (Capturing, Transcribing) => true,
            // Persistent capture failure skips perception and routes the
            // fail-safe voicemail decision directly
            (Capturing, Routing) => true,
            (Transcribing, Analyzing) => true,
            (Analyzing, Routing) => true,
            (Routing, Completed) => true,
            (Routing, Asking) => true,
            (Asking, Capturing) => true,

            // No transitions out of terminal states
            _ => false,
        }
    }
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CallStatus::Ringing => "ringing",
            CallStatus::Answered => "answered",
            CallStatus::Capturing => "capturing",
            CallStatus::Transcribing => "transcribing",
            CallStatus::Analyzing => "analyzing",
            CallStatus::Routing => "routing",
            CallStatus::Asking => "asking",
            CallStatus::Completed => "completed",
            CallStatus::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// The closed set of call dispositions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Transfer the call to a destination extension
    Forward,

    /// Record a voicemail message
    Voicemail,

    /// Ask the caller a clarifying question and listen again
    AskQuestion,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ActionKind::Forward => "forward",
            ActionKind::Voicemail => "voicemail",
            ActionKind::AskQuestion => "ask_question",
        };
        write!(f, "{}", name)
    }
}

/// A validated screening decision, produced once per orchestration cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// The disposition to execute
    pub action: ActionKind,

    /// Transfer destination; present iff `action` is `Forward`
    pub destination: Option<String>,

    /// Question to play; present iff `action` is `AskQuestion`
    pub prompt_text: Option<String>,

    /// Reasoning service confidence in [0, 1], when reported
    pub confidence: Option<f64>,

    /// Free-form rationale from the reasoning service
    pub reasoning: Option<String>,
}

impl Decision {
    /// Create a forward decision for a validated destination
    pub fn forward(destination: impl Into<String>) -> Self {
        Self {
            action: ActionKind::Forward,
            destination: Some(destination.into()),
            prompt_text: None,
            confidence: None,
            reasoning: None,
        }
    }

    /// Create a voicemail decision
    pub fn voicemail() -> Self {
        Self {
            action: ActionKind::Voicemail,
            destination: None,
            prompt_text: None,
            confidence: None,
            reasoning: None,
        }
    }

    /// Create an ask-question decision with the prompt to play
    pub fn ask_question(prompt: impl Into<String>) -> Self {
        Self {
            action: ActionKind::AskQuestion,
            destination: None,
            prompt_text: Some(prompt.into()),
            confidence: None,
            reasoning: None,
        }
    }

    /// Attach a rationale
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    /// Attach a confidence score, clamped to [0, 1]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }
}

/// Outcome of one routed action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    /// The disposition that was executed
    pub action: ActionKind,

    /// Whether the disposition succeeded
    pub success: bool,

    /// Human-readable outcome description
    pub detail: String,

    /// Reference to a produced artifact (e.g. a voicemail recording)
    pub artifact_ref: Option<String>,
}

impl ActionResult {
    /// Create a successful result
    pub fn ok(action: ActionKind, detail: impl Into<String>) -> Self {
        Self {
            action,
            success: true,
            detail: detail.into(),
            artifact_ref: None,
        }
    }

    /// Create a failed result
    pub fn failed(action: ActionKind, detail: impl Into<String>) -> Self {
        Self {
            action,
            success: false,
            detail: detail.into(),
            artifact_ref: None,
        }
    }

    /// Attach an artifact reference
    pub fn with_artifact(mut self, artifact_ref: impl Into<String>) -> Self {
        self.artifact_ref = Some(artifact_ref.into());
        self
    }
}

/// Per-call state record
///
/// Owned by the [`CallRegistry`](crate::registry::CallRegistry); mutated
/// exclusively through its serialized `update` path.
#[derive(Debug, Clone)]
pub struct CallState {
    pub call_id: CallId,
    pub caller_number: String,
    pub called_number: String,
    pub channel: Option<String>,
    pub status: CallStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub transcript: Option<String>,
    pub decision: Option<Decision>,
    pub action_result: Option<ActionResult>,
    pub attempt_count: u32,
    pub owner_user_id: Option<String>,
    pub failure_reason: Option<String>,

    /// Cooperative cancellation flag, set when the signaling layer reports
    /// the call ended mid-pipeline
    pub hangup_requested: bool,
}

impl CallState {
    /// Build the initial record for an accepted call-arrival event
    pub fn from_event(event: &IncomingCallEvent, owner_user_id: Option<String>) -> Self {
        let call_id = event
            .call_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .map(CallId::from)
            .unwrap_or_else(CallId::new);

        let now = Utc::now();
        Self {
            call_id,
            caller_number: event.caller_number.clone(),
            called_number: event.called_number.clone(),
            channel: event.channel.clone(),
            status: CallStatus::Ringing,
            created_at: now,
            updated_at: now,
            transcript: None,
            decision: None,
            action_result: None,
            attempt_count: 0,
            owner_user_id,
            failure_reason: None,
            hangup_requested: false,
        }
    }

    /// Advance the status, enforcing the forward-only transition table
    pub fn set_status(&mut self, next: CallStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(ScreenError::InvalidTransition(format!(
                "call {}: {} -> {}",
                self.call_id, self.status, next
            )));
        }
        tracing::debug!("🔄 Call {} status: {} -> {}", self.call_id, self.status, next);
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Produce the externally visible view of this record
    pub fn snapshot(&self) -> CallSnapshot {
        CallSnapshot {
            call_id: self.call_id.as_str().to_string(),
            caller_number: self.caller_number.clone(),
            called_number: self.called_number.clone(),
            channel: self.channel.clone(),
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            transcript: self.transcript.clone(),
            decision: self.decision.clone(),
            action_result: self.action_result.clone(),
            attempt_count: self.attempt_count,
            owner_user_id: self.owner_user_id.clone(),
            failure_reason: self.failure_reason.clone(),
        }
    }
}

/// Read-only view of a call record for status queries and monitoring clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSnapshot {
    pub call_id: String,
    pub caller_number: String,
    pub called_number: String,
    pub channel: Option<String>,
    pub status: CallStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub transcript: Option<String>,
    pub decision: Option<Decision>,
    pub action_result: Option<ActionResult>,
    pub attempt_count: u32,
    pub owner_user_id: Option<String>,
    pub failure_reason: Option<String>,
}

/// Context handed to the reasoning service for one orchestration cycle
#[derive(Debug, Clone, Serialize)]
pub struct ReasoningContext {
    pub caller_number: String,
    pub called_number: String,

    /// Latest transcript; empty when the caller produced no intelligible input
    pub transcript: String,

    /// How many clarifying questions have been asked so far
    pub attempt_count: u32,

    /// Optional deployment context (e.g. business hours) for the prompt
    pub notes: Option<String>,
}

/// Aggregate screening statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScreenerStats {
    pub active_calls: usize,
    pub total_calls: u64,
    pub completed_calls: u64,
    pub failed_calls: u64,
    pub calls_forwarded: u64,
    pub voicemails_recorded: u64,
    pub questions_asked: u64,
}
