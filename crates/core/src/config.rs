//! Configuration for the call screening engine
//!
//! Sections mirror the pipeline stages: general engine limits, audio
//! capture, transcription, reasoning, and action routing. Every timeout a
//! port call can hang on is bounded here.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Call screening configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenConfig {
    /// General engine settings
    pub general: GeneralConfig,

    /// Audio capture settings
    pub capture: CaptureConfig,

    /// Transcription settings
    pub transcription: TranscriptionConfig,

    /// Reasoning service settings
    pub reasoning: ReasoningConfig,

    /// Action routing settings
    pub actions: ActionConfig,
}

/// General engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Maximum number of concurrently screened calls
    pub max_concurrent_calls: usize,

    /// Upper bound for a single telephony operation (answer, transfer, play)
    pub telephony_timeout: Duration,

    /// How long terminal call records stay queryable before eviction
    pub retention_window: Duration,

    /// Interval between eviction sweeps
    pub eviction_interval: Duration,
}

/// Audio capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Greeting played before the first capture window
    pub greeting: String,

    /// Length of one caller-audio capture window
    pub capture_window: Duration,

    /// How many times a failed capture is retried before the fail-safe
    /// voicemail path takes over
    pub capture_retries: u32,
}

/// Transcription configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Upper bound for one transcription request
    pub timeout: Duration,

    /// Optional language hint forwarded to the transcriber
    pub language_hint: Option<String>,
}

/// Reasoning service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningConfig {
    /// Upper bound for one recommendation request
    pub timeout: Duration,

    /// Optional deployment notes included in the reasoning context
    /// (e.g. business hours, company name)
    pub notes: Option<String>,
}

/// Action routing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionConfig {
    /// Known transfer destinations: name -> extension (e.g. "sales" -> "100")
    pub destinations: HashMap<String, String>,

    /// Maximum clarifying questions before the engine forces voicemail
    pub max_ask_attempts: u32,

    /// Clarification prompt used when the reasoning output names none
    pub default_question: String,

    /// Prompt used when the reasoning service is unavailable
    pub reasoning_unavailable_question: String,

    /// Greeting played before a voicemail recording starts
    pub voicemail_greeting: String,

    /// Maximum voicemail recording length
    pub voicemail_max_duration: Duration,

    /// Final message played when no disposition could be completed
    pub apology: String,
}

impl ScreenConfig {
    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> Result<(), String> {
        if self.general.max_concurrent_calls == 0 {
            return Err("max_concurrent_calls must be greater than 0".to_string());
        }

        if self.general.telephony_timeout.is_zero() {
            return Err("telephony_timeout must be greater than 0".to_string());
        }

        if self.capture.capture_window.is_zero() {
            return Err("capture_window must be greater than 0".to_string());
        }

        if self.actions.max_ask_attempts == 0 {
            return Err("max_ask_attempts must be greater than 0".to_string());
        }

        if self.actions.voicemail_max_duration.is_zero() {
            return Err("voicemail_max_duration must be greater than 0".to_string());
        }

        for (name, extension) in &self.actions.destinations {
            if name.trim().is_empty() || extension.trim().is_empty() {
                return Err("destination names and extensions cannot be empty".to_string());
            }
        }

        Ok(())
    }
}

impl ActionConfig {
    /// Resolve a destination token against the configured directory.
    ///
    /// Accepts either a destination name (case-insensitive) or a bare
    /// extension that appears in the directory. Unknown tokens resolve to
    /// `None` and callers downgrade the decision.
    pub fn resolve_destination(&self, token: &str) -> Option<String> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }

        let lowered = token.to_lowercase();
        if let Some(extension) = self
            .destinations
            .iter()
            .find(|(name, _)| name.to_lowercase() == lowered)
            .map(|(_, extension)| extension.clone())
        {
            return Some(extension);
        }

        self.destinations
            .values()
            .find(|extension| extension.as_str() == token)
            .cloned()
    }
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            capture: CaptureConfig::default(),
            transcription: TranscriptionConfig::default(),
            reasoning: ReasoningConfig::default(),
            actions: ActionConfig::default(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            max_concurrent_calls: 200,
            telephony_timeout: Duration::from_secs(10),
            retention_window: Duration::from_secs(300), // 5 minutes
            eviction_interval: Duration::from_secs(60),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            greeting: "Hello, please state your reason for calling.".to_string(),
            capture_window: Duration::from_secs(5),
            capture_retries: 1,
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            language_hint: None,
        }
    }
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            notes: None,
        }
    }
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            destinations: HashMap::new(),
            max_ask_attempts: 3,
            default_question: "How can I help you today?".to_string(),
            reasoning_unavailable_question:
                "I'm sorry, could you please repeat your request?".to_string(),
            voicemail_greeting: "Please leave a message after the beep.".to_string(),
            voicemail_max_duration: Duration::from_secs(30),
            apology: "We are unable to take your call right now. Goodbye.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ScreenConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_limits() {
        let mut config = ScreenConfig::default();
        config.general.max_concurrent_calls = 0;
        assert!(config.validate().is_err());

        let mut config = ScreenConfig::default();
        config.actions.max_ask_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = ScreenConfig::default();
        config.capture.capture_window = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_destination_resolution() {
        let mut actions = ActionConfig::default();
        actions.destinations.insert("sales".to_string(), "100".to_string());
        actions.destinations.insert("billing".to_string(), "200".to_string());

        // Names resolve case-insensitively to extensions
        assert_eq!(actions.resolve_destination("sales").as_deref(), Some("100"));
        assert_eq!(actions.resolve_destination("Sales").as_deref(), Some("100"));

        // Bare extensions already in the directory pass through
        assert_eq!(actions.resolve_destination("200").as_deref(), Some("200"));

        // Unknown tokens are rejected
        assert_eq!(actions.resolve_destination("support"), None);
        assert_eq!(actions.resolve_destination("999"), None);
        assert_eq!(actions.resolve_destination(""), None);
    }
}
