//! # Callscreen Adapters
//!
//! Concrete implementations of the `callscreen-core` port traits:
//!
//! - [`telephony::SimulatedTelephony`]: in-process stand-in for the
//!   call-control stack, for development and deployments where the
//!   signaling subsystem is driven externally
//! - [`transcription::HttpTranscriptionClient`]: client for a
//!   speech-to-text HTTP service
//! - [`reasoning::OllamaReasoningClient`]: client for an Ollama chat
//!   endpoint that recommends call dispositions
//! - [`storage::DiskRecordingStore`]: recording store with a
//!   minimum-free-space capacity guard

pub mod reasoning;
pub mod storage;
pub mod telephony;
pub mod transcription;

pub use reasoning::OllamaReasoningClient;
pub use storage::DiskRecordingStore;
pub use telephony::SimulatedTelephony;
pub use transcription::HttpTranscriptionClient;
