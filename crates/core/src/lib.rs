//! # Callscreen Core
//!
//! Per-call orchestration pipeline and decision-to-action routing for the
//! callscreen stack. An incoming call is answered, a short sample of caller
//! speech is captured and transcribed, a reasoning service recommends a
//! disposition, and the engine executes it: transfer the call, record a
//! voicemail, or ask a clarifying question and listen again.
//!
//! ```text
//! arrival event ──▶ CallRegistry ──▶ ScreeningEngine
//!                                        │
//!                     TelephonyPort ◀────┼────▶ TranscriptionPort
//!                                        │
//!                     ActionRouter ◀── DecisionParser ◀── ReasoningPort
//! ```
//!
//! The external world (signaling stack, speech-to-text, reasoning service,
//! recording storage) is reached only through the traits in [`ports`];
//! concrete adapters live in the `callscreen-adapters` crate and the HTTP
//! front door in `callscreen-gateway`.

// Core modules
pub mod config;
pub mod error;
pub mod types;

// Ports to external collaborators
pub mod ports;

// Pipeline components
pub mod decision;
pub mod orchestrator;
pub mod registry;
pub mod router;
pub mod server;

// Re-exports for convenience
pub use config::{ActionConfig, CaptureConfig, GeneralConfig, ReasoningConfig, ScreenConfig,
    TranscriptionConfig};
pub use decision::DecisionParser;
pub use error::{Result, ScreenError};
pub use orchestrator::ScreeningEngine;
pub use registry::CallRegistry;
pub use router::ActionRouter;
pub use server::ScreeningServer;
pub use types::{
    ActionKind, ActionResult, CallId, CallSnapshot, CallState, CallStatus, Decision,
    IncomingCallEvent, ReasoningContext, ScreenerStats,
};

/// Commonly used items
pub mod prelude {
    pub use crate::config::ScreenConfig;
    pub use crate::error::{Result, ScreenError};
    pub use crate::orchestrator::ScreeningEngine;
    pub use crate::ports::{
        AudioRef, ReasoningPort, RecordingStore, TelephonyPort, TranscriptionPort,
    };
    pub use crate::server::ScreeningServer;
    pub use crate::types::{
        ActionKind, ActionResult, CallId, CallSnapshot, CallStatus, Decision, IncomingCallEvent,
        ReasoningContext, ScreenerStats,
    };
}
