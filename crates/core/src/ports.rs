//! Port traits for the external collaborators
//!
//! The screening engine talks to the outside world only through these
//! boundaries: the call-control stack, the speech-to-text service, the
//! reasoning service, and the recording store. Concrete implementations
//! live in the adapters crate; tests script their own.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{CallId, ReasoningContext};

/// Reference to a captured or stored audio artifact
pub type AudioRef = String;

/// Boundary to the call-control/signaling subsystem.
///
/// Every method acts on a single live call leg. Implementations do not
/// bound their own latency; callers wrap each operation in a timeout.
#[async_trait]
pub trait TelephonyPort: Send + Sync {
    /// Answer a ringing call leg
    async fn answer(&self, call_id: &CallId) -> Result<()>;

    /// Hang up a call leg; idempotent for already-ended legs
    async fn hangup(&self, call_id: &CallId) -> Result<()>;

    /// Transfer the leg to a destination extension or number
    async fn transfer(&self, call_id: &CallId, destination: &str) -> Result<()>;

    /// Play a prompt to the caller. The prompt is plain text; the adapter
    /// renders it (TTS or pre-rendered audio lookup).
    async fn play(&self, call_id: &CallId, prompt: &str) -> Result<()>;

    /// Capture caller audio for at most `max_duration`, returning a
    /// reference to the recorded sample
    async fn record(&self, call_id: &CallId, max_duration: Duration) -> Result<AudioRef>;
}

/// Boundary to the speech-to-text service
#[async_trait]
pub trait TranscriptionPort: Send + Sync {
    /// Transcribe a captured audio sample. An empty string is a valid
    /// result meaning "no intelligible input".
    async fn transcribe(&self, audio: &AudioRef, language_hint: Option<&str>) -> Result<String>;
}

/// Boundary to the reasoning service that recommends a disposition
#[async_trait]
pub trait ReasoningPort: Send + Sync {
    /// Produce a raw recommendation for the given call context. The output
    /// is unstructured text; the decision parser validates it.
    async fn recommend(&self, context: &ReasoningContext) -> Result<String>;
}

/// Capacity guard for the recording artifact store.
///
/// Consulted before a voicemail recording is opened; a refusal here is a
/// resource-precondition failure, not a crash.
#[async_trait]
pub trait RecordingStore: Send + Sync {
    /// Verify the store can accept another recording
    async fn ensure_capacity(&self) -> Result<()>;
}
