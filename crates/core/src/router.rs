//! Action router
//!
//! Executes a validated [`Decision`] against the telephony port and the
//! recording store, producing an [`ActionResult`]. The action set is
//! closed, so routing is an exhaustive match. The router never mutates
//! registry state; the orchestrator writes results back, preserving the
//! single-writer invariant.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::{ActionConfig, ScreenConfig};
use crate::error::{Result, ScreenError};
use crate::ports::{AudioRef, RecordingStore, TelephonyPort};
use crate::types::{ActionKind, ActionResult, CallId, CallSnapshot, Decision};

/// Routes screening decisions to telephony actions
pub struct ActionRouter {
    telephony: Arc<dyn TelephonyPort>,
    store: Arc<dyn RecordingStore>,
    actions: ActionConfig,
    telephony_timeout: Duration,
}

impl ActionRouter {
    /// Create a router over the given ports
    pub fn new(
        telephony: Arc<dyn TelephonyPort>,
        store: Arc<dyn RecordingStore>,
        config: &ScreenConfig,
    ) -> Self {
        Self {
            telephony,
            store,
            actions: config.actions.clone(),
            telephony_timeout: config.general.telephony_timeout,
        }
    }

    /// Execute a decision against the live call leg.
    ///
    /// Always returns a result; telephony and storage problems surface as
    /// `success = false`, never as an error from this method.
    pub async fn route(&self, decision: &Decision, call: &CallSnapshot) -> ActionResult {
        let call_id = CallId::from(call.call_id.clone());
        info!("Routing call {} to action: {}", call_id, decision.action);

        match decision.action {
            ActionKind::Forward => self.forward(&call_id, decision).await,
            ActionKind::Voicemail => self.voicemail(&call_id).await,
            ActionKind::AskQuestion => self.ask_question(&call_id, decision).await,
        }
    }

    /// Transfer the call; on failure, fall back to voicemail once.
    async fn forward(&self, call_id: &CallId, decision: &Decision) -> ActionResult {
        let destination = match decision.destination.as_deref() {
            Some(destination) if !destination.is_empty() => destination,
            // The parser guarantees a destination; guard anyway
            _ => {
                return ActionResult::failed(ActionKind::Forward, "no transfer destination");
            }
        };

        match self
            .timed(self.telephony.transfer(call_id, destination))
            .await
        {
            Ok(()) => {
                info!("Call {} transferred to {}", call_id, destination);
                ActionResult::ok(
                    ActionKind::Forward,
                    format!("call forwarded to {}", destination),
                )
            }
            Err(e) => {
                warn!(
                    "Transfer of call {} to {} failed ({}); falling back to voicemail",
                    call_id, destination, e
                );
                match self.record_voicemail(call_id).await {
                    Ok(artifact) => ActionResult::ok(
                        ActionKind::Voicemail,
                        "transfer failed; voicemail recorded instead",
                    )
                    .with_artifact(artifact),
                    Err(e) => {
                        warn!("Voicemail fallback for call {} also failed: {}", call_id, e);
                        ActionResult::failed(
                            ActionKind::Forward,
                            "transfer failed and voicemail was unavailable",
                        )
                    }
                }
            }
        }
    }

    /// Record a voicemail, guarded by the store capacity precondition.
    async fn voicemail(&self, call_id: &CallId) -> ActionResult {
        match self.record_voicemail(call_id).await {
            Ok(artifact) => {
                ActionResult::ok(ActionKind::Voicemail, "voicemail recorded").with_artifact(artifact)
            }
            Err(ScreenError::Storage(reason)) => {
                warn!("Voicemail for call {} refused: {}", call_id, reason);
                ActionResult::failed(
                    ActionKind::Voicemail,
                    "voicemail is unavailable: insufficient recording storage",
                )
            }
            Err(e) => {
                warn!("Voicemail recording for call {} failed: {}", call_id, e);
                ActionResult::failed(ActionKind::Voicemail, "voicemail recording failed")
            }
        }
    }

    /// Play the clarifying question; the orchestrator loops on success.
    async fn ask_question(&self, call_id: &CallId, decision: &Decision) -> ActionResult {
        let prompt = decision
            .prompt_text
            .clone()
            .unwrap_or_else(|| self.actions.default_question.clone());

        info!("Asking caller on call {}: {}", call_id, prompt);
        match self.timed(self.telephony.play(call_id, &prompt)).await {
            Ok(()) => ActionResult::ok(ActionKind::AskQuestion, "awaiting caller response"),
            Err(e) => {
                warn!("Failed to play question on call {}: {}", call_id, e);
                ActionResult::failed(ActionKind::AskQuestion, "failed to play question")
            }
        }
    }

    /// Shared voicemail recording path (direct disposition and transfer
    /// fallback): capacity check, greeting, bounded recording.
    async fn record_voicemail(&self, call_id: &CallId) -> Result<AudioRef> {
        self.store.ensure_capacity().await?;

        self.timed(self.telephony.play(call_id, &self.actions.voicemail_greeting))
            .await?;

        // The recording itself runs up to the voicemail window; allow the
        // telephony grace period on top before declaring it hung.
        let budget = self.actions.voicemail_max_duration + self.telephony_timeout;
        match tokio::time::timeout(
            budget,
            self.telephony
                .record(call_id, self.actions.voicemail_max_duration),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ScreenError::timeout("voicemail recording timed out")),
        }
    }

    async fn timed<T>(&self, operation: impl std::future::Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.telephony_timeout, operation).await {
            Ok(result) => result,
            Err(_) => Err(ScreenError::timeout("telephony operation timed out")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use crate::types::IncomingCallEvent;

    #[derive(Default)]
    struct FakeTelephony {
        fail_transfer: AtomicBool,
        fail_record: AtomicBool,
        transfers: Mutex<Vec<String>>,
        played: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TelephonyPort for FakeTelephony {
        async fn answer(&self, _call_id: &CallId) -> Result<()> {
            Ok(())
        }

        async fn hangup(&self, _call_id: &CallId) -> Result<()> {
            Ok(())
        }

        async fn transfer(&self, _call_id: &CallId, destination: &str) -> Result<()> {
            if self.fail_transfer.load(Ordering::SeqCst) {
                return Err(ScreenError::telephony("transfer rejected"));
            }
            self.transfers.lock().push(destination.to_string());
            Ok(())
        }

        async fn play(&self, _call_id: &CallId, prompt: &str) -> Result<()> {
            self.played.lock().push(prompt.to_string());
            Ok(())
        }

        async fn record(&self, call_id: &CallId, _max_duration: Duration) -> Result<AudioRef> {
            if self.fail_record.load(Ordering::SeqCst) {
                return Err(ScreenError::telephony("no media stream"));
            }
            Ok(format!("recordings/{}.wav", call_id))
        }
    }

    struct FakeStore {
        full: bool,
    }

    #[async_trait]
    impl RecordingStore for FakeStore {
        async fn ensure_capacity(&self) -> Result<()> {
            if self.full {
                Err(ScreenError::storage("2 MB free, 50 MB required"))
            } else {
                Ok(())
            }
        }
    }

    fn call() -> CallSnapshot {
        let event = IncomingCallEvent {
            call_id: Some("test-call".to_string()),
            caller_number: "+15550100".to_string(),
            called_number: "+15550200".to_string(),
            timestamp: None,
            channel: None,
        };
        crate::types::CallState::from_event(&event, None).snapshot()
    }

    fn router(
        telephony: Arc<FakeTelephony>,
        store: FakeStore,
    ) -> ActionRouter {
        let mut config = ScreenConfig::default();
        config.general.telephony_timeout = Duration::from_millis(200);
        config.actions.voicemail_max_duration = Duration::from_millis(50);
        ActionRouter::new(telephony, Arc::new(store), &config)
    }

    #[tokio::test]
    async fn test_forward_success() {
        let telephony = Arc::new(FakeTelephony::default());
        let router = router(telephony.clone(), FakeStore { full: false });

        let result = router.route(&Decision::forward("100"), &call()).await;
        assert!(result.success);
        assert_eq!(result.action, ActionKind::Forward);
        assert_eq!(telephony.transfers.lock().as_slice(), ["100"]);
    }

    #[tokio::test]
    async fn test_forward_failure_falls_back_to_voicemail() {
        let telephony = Arc::new(FakeTelephony::default());
        telephony.fail_transfer.store(true, Ordering::SeqCst);
        let router = router(telephony.clone(), FakeStore { full: false });

        let result = router.route(&Decision::forward("100"), &call()).await;
        assert!(result.success);
        assert_eq!(result.action, ActionKind::Voicemail);
        assert!(result.artifact_ref.is_some());
        // The voicemail greeting was played on the fallback path
        assert!(!telephony.played.lock().is_empty());
    }

    #[tokio::test]
    async fn test_forward_and_fallback_both_failing_reports_failure() {
        let telephony = Arc::new(FakeTelephony::default());
        telephony.fail_transfer.store(true, Ordering::SeqCst);
        telephony.fail_record.store(true, Ordering::SeqCst);
        let router = router(telephony, FakeStore { full: false });

        let result = router.route(&Decision::forward("100"), &call()).await;
        assert!(!result.success);
        assert!(result.artifact_ref.is_none());
    }

    #[tokio::test]
    async fn test_voicemail_refused_when_storage_low() {
        let telephony = Arc::new(FakeTelephony::default());
        let router = router(telephony.clone(), FakeStore { full: true });

        let result = router.route(&Decision::voicemail(), &call()).await;
        assert!(!result.success);
        assert_eq!(result.action, ActionKind::Voicemail);
        assert!(result.artifact_ref.is_none());
        // Refusal happens before any prompt is played
        assert!(telephony.played.lock().is_empty());
    }

    #[tokio::test]
    async fn test_ask_question_plays_prompt() {
        let telephony = Arc::new(FakeTelephony::default());
        let router = router(telephony.clone(), FakeStore { full: false });

        let result = router
            .route(&Decision::ask_question("Which department?"), &call())
            .await;
        assert!(result.success);
        assert_eq!(result.action, ActionKind::AskQuestion);
        assert_eq!(telephony.played.lock().as_slice(), ["Which department?"]);
    }
}
