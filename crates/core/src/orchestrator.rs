//! # Call Screening Orchestrator
//!
//! Drives a single call from arrival to disposition through the screening
//! pipeline, and runs many such pipelines concurrently. Each call is one
//! tokio task; the suspension points are exactly the port calls, and every
//! port call is bounded by a timeout.
//!
//! ```text
//! RINGING → ANSWERED → CAPTURING → TRANSCRIBING → ANALYZING → ROUTING
//!                          ▲                                     │
//!                          └──────────── ASKING ◄────────────────┤
//!                                                                ▼
//!                                                   COMPLETED / FAILED
//! ```
//!
//! Failure policy: telephony-level errors fail the call; perception-level
//! errors (transcription, reasoning) never do — they degrade to the empty
//! transcript or the parser's fallback decision so the caller always
//! reaches a disposition. The ask-question loop is bounded by an explicit
//! attempt counter; past the cap the engine forces voicemail.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::ScreenConfig;
use crate::decision::DecisionParser;
use crate::error::{Result, ScreenError};
use crate::ports::{AudioRef, ReasoningPort, RecordingStore, TelephonyPort, TranscriptionPort};
use crate::registry::CallRegistry;
use crate::router::ActionRouter;
use crate::types::{
    ActionKind, CallId, CallSnapshot, CallStatus, Decision, IncomingCallEvent, ReasoningContext,
    ScreenerStats,
};

#[derive(Debug, Default)]
struct Counters {
    total: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    forwarded: AtomicU64,
    voicemails: AtomicU64,
    questions: AtomicU64,
}

/// The call screening engine
///
/// Owns the call registry and the ports, and is the sole mutator of call
/// records. Cheap to share behind an [`Arc`]; one engine serves the whole
/// process.
pub struct ScreeningEngine {
    config: ScreenConfig,
    registry: Arc<CallRegistry>,
    telephony: Arc<dyn TelephonyPort>,
    transcription: Arc<dyn TranscriptionPort>,
    reasoning: Arc<dyn ReasoningPort>,
    parser: DecisionParser,
    router: ActionRouter,
    counters: Counters,
}

impl ScreeningEngine {
    /// Create an engine over the given ports
    pub fn new(
        config: ScreenConfig,
        telephony: Arc<dyn TelephonyPort>,
        transcription: Arc<dyn TranscriptionPort>,
        reasoning: Arc<dyn ReasoningPort>,
        store: Arc<dyn RecordingStore>,
    ) -> Result<Self> {
        config.validate().map_err(ScreenError::config)?;

        let parser = DecisionParser::new(config.actions.clone());
        let router = ActionRouter::new(Arc::clone(&telephony), store, &config);

        info!("🎛️ Screening engine initialized ({} known destinations, max {} attempts)",
            config.actions.destinations.len(),
            config.actions.max_ask_attempts,
        );

        Ok(Self {
            config,
            registry: Arc::new(CallRegistry::new()),
            telephony,
            transcription,
            reasoning,
            parser,
            router,
            counters: Counters::default(),
        })
    }

    /// The call registry (shared with status queries and eviction)
    pub fn registry(&self) -> &Arc<CallRegistry> {
        &self.registry
    }

    /// Engine configuration
    pub fn config(&self) -> &ScreenConfig {
        &self.config
    }

    /// Aggregate screening statistics
    pub fn stats(&self) -> ScreenerStats {
        ScreenerStats {
            active_calls: self.registry.active_count(),
            total_calls: self.counters.total.load(Ordering::Relaxed),
            completed_calls: self.counters.completed.load(Ordering::Relaxed),
            failed_calls: self.counters.failed.load(Ordering::Relaxed),
            calls_forwarded: self.counters.forwarded.load(Ordering::Relaxed),
            voicemails_recorded: self.counters.voicemails.load(Ordering::Relaxed),
            questions_asked: self.counters.questions.load(Ordering::Relaxed),
        }
    }

    /// Snapshot of one call record for status queries
    pub fn call_snapshot(&self, call_id: &CallId) -> Result<CallSnapshot> {
        self.registry.get(call_id)
    }

    /// Signal that the caller hung up; the pipeline aborts cooperatively at
    /// its next suspension point.
    pub fn end_call(&self, call_id: &CallId) -> Result<CallSnapshot> {
        info!("☎️ External hangup signalled for call {}", call_id);
        self.registry.request_hangup(call_id)
    }

    /// Screen one call to its terminal disposition.
    ///
    /// Internal errors never escape as a crashed pipeline: anything the
    /// stages cannot absorb lands the call in `Failed` with a generic
    /// message, and the terminal snapshot is returned.
    pub async fn handle_call(
        &self,
        event: IncomingCallEvent,
        owner_user_id: Option<String>,
    ) -> Result<CallSnapshot> {
        let call_id = self.admit(&event, owner_user_id)?;
        if let Err(e) = self.run_pipeline(&call_id).await {
            error!("💥 Screening pipeline for call {} aborted: {}", call_id, e);
            self.fail_call(&call_id, "internal screening error");
        }
        self.registry.get(&call_id)
    }

    /// Screen a call on a detached task, returning immediately with its ID.
    /// Admission (duplicate IDs, capacity) still fails synchronously.
    pub fn spawn_call(
        self: Arc<Self>,
        event: IncomingCallEvent,
        owner_user_id: Option<String>,
    ) -> Result<CallId> {
        let call_id = self.admit(&event, owner_user_id)?;
        let task_call_id = call_id.clone();
        tokio::spawn(async move {
            if let Err(e) = self.run_pipeline(&task_call_id).await {
                error!("💥 Screening pipeline for call {} aborted: {}", task_call_id, e);
                self.fail_call(&task_call_id, "internal screening error");
            }
        });
        Ok(call_id)
    }

    /// Validate and register an arrival event
    fn admit(&self, event: &IncomingCallEvent, owner_user_id: Option<String>) -> Result<CallId> {
        if event.caller_number.trim().is_empty() || event.called_number.trim().is_empty() {
            return Err(ScreenError::invalid_input(
                "caller_number and called_number are required",
            ));
        }

        if self.registry.active_count() >= self.config.general.max_concurrent_calls {
            return Err(ScreenError::resource_unavailable(
                "maximum concurrent calls reached",
            ));
        }

        let snapshot = self.registry.create(event, owner_user_id)?;
        self.counters.total.fetch_add(1, Ordering::Relaxed);
        info!(
            "📞 Screening call {} from {} to {}",
            snapshot.call_id, snapshot.caller_number, snapshot.called_number
        );
        Ok(CallId::from(snapshot.call_id))
    }

    /// The per-call state machine
    async fn run_pipeline(&self, call_id: &CallId) -> Result<()> {
        // Answer the leg. Failure here means the call is unreachable and
        // nothing further is attempted.
        match self
            .timed_telephony(self.telephony.answer(call_id))
            .await
        {
            Ok(()) => {
                self.registry
                    .update(call_id, |call| call.set_status(CallStatus::Answered))?;
            }
            Err(e) => {
                warn!("Failed to answer call {}: {}", call_id, e);
                self.fail_call(call_id, "unable to answer the call");
                return Ok(());
            }
        }

        // The greeting opens the first cycle; on loop iterations the router
        // has already played the follow-up question.
        let mut play_greeting = true;

        loop {
            if self.registry.hangup_requested(call_id) {
                self.fail_call(call_id, "call ended by caller");
                return Ok(());
            }

            self.registry
                .update(call_id, |call| call.set_status(CallStatus::Capturing))?;

            if play_greeting {
                play_greeting = false;
                if let Err(e) = self
                    .timed_telephony(self.telephony.play(call_id, &self.config.capture.greeting))
                    .await
                {
                    warn!("Failed to play greeting on call {}: {}", call_id, e);
                    self.fail_call(call_id, "unable to play greeting");
                    return Ok(());
                }
            }

            let sample = self.capture_sample(call_id).await;

            if self.registry.hangup_requested(call_id) {
                self.fail_call(call_id, "call ended by caller");
                return Ok(());
            }

            let decision = match sample {
                Some(audio) => {
                    self.registry
                        .update(call_id, |call| call.set_status(CallStatus::Transcribing))?;
                    let transcript = self.transcribe_sample(call_id, &audio).await;
                    self.registry.update(call_id, |call| {
                        call.transcript = Some(transcript.clone());
                        Ok(())
                    })?;

                    if self.registry.hangup_requested(call_id) {
                        self.fail_call(call_id, "call ended by caller");
                        return Ok(());
                    }

                    self.registry
                        .update(call_id, |call| call.set_status(CallStatus::Analyzing))?;
                    self.decide(call_id, transcript).await?
                }
                None => {
                    // Fail-safe: a caller we cannot hear still gets a
                    // disposition instead of an abandoned line.
                    warn!(
                        "🎙️ Audio capture failed for call {}; defaulting to voicemail",
                        call_id
                    );
                    Decision::voicemail().with_reasoning("audio capture unavailable")
                }
            };

            // The ask-question loop is bounded; past the cap the engine
            // overrides whatever the reasoning service keeps suggesting.
            let attempts = self.registry.get(call_id)?.attempt_count;
            let decision = if decision.action == ActionKind::AskQuestion
                && attempts >= self.config.actions.max_ask_attempts
            {
                info!(
                    "🔁 Call {} reached {} clarification attempts; overriding to voicemail",
                    call_id, attempts
                );
                Decision::voicemail().with_reasoning("clarification attempts exhausted")
            } else {
                decision
            };

            let snapshot = self.registry.update(call_id, |call| {
                call.decision = Some(decision.clone());
                call.set_status(CallStatus::Routing)
            })?;

            if self.registry.hangup_requested(call_id) {
                self.fail_call(call_id, "call ended by caller");
                return Ok(());
            }

            let result = self.router.route(&decision, &snapshot).await;
            self.registry.update(call_id, |call| {
                call.action_result = Some(result.clone());
                Ok(())
            })?;

            match (result.action, result.success) {
                (ActionKind::AskQuestion, true) => {
                    self.counters.questions.fetch_add(1, Ordering::Relaxed);
                    self.registry.update(call_id, |call| {
                        call.attempt_count += 1;
                        call.set_status(CallStatus::Asking)
                    })?;
                    continue;
                }
                (ActionKind::AskQuestion, false) => {
                    // Could not even play the question: telephony-level failure
                    self.fail_call(call_id, "the call could not be continued");
                    return Ok(());
                }
                (ActionKind::Forward, true) => {
                    self.counters.forwarded.fetch_add(1, Ordering::Relaxed);
                    self.complete_call(call_id, &result.detail);
                    return Ok(());
                }
                (ActionKind::Voicemail, true) => {
                    self.counters.voicemails.fetch_add(1, Ordering::Relaxed);
                    // The leg stays with us after a voicemail; release it.
                    if let Err(e) = self.telephony.hangup(call_id).await {
                        debug!("Hangup after voicemail on call {} failed: {}", call_id, e);
                    }
                    self.complete_call(call_id, &result.detail);
                    return Ok(());
                }
                (_, false) => {
                    // No disposition worked. Apologize, release the leg and
                    // surface a generic failure.
                    let _ = self
                        .timed_telephony(
                            self.telephony.play(call_id, &self.config.actions.apology),
                        )
                        .await;
                    let _ = self.telephony.hangup(call_id).await;
                    self.fail_call(call_id, "screening could not complete the call");
                    return Ok(());
                }
            }
        }
    }

    /// Capture one bounded audio sample, retrying per configuration
    async fn capture_sample(&self, call_id: &CallId) -> Option<AudioRef> {
        let window = self.config.capture.capture_window;
        let budget = window + self.config.general.telephony_timeout;

        for attempt in 0..=self.config.capture.capture_retries {
            match tokio::time::timeout(budget, self.telephony.record(call_id, window)).await {
                Ok(Ok(audio)) => return Some(audio),
                Ok(Err(e)) => {
                    warn!("Capture attempt {} on call {} failed: {}", attempt + 1, call_id, e)
                }
                Err(_) => warn!("Capture attempt {} on call {} timed out", attempt + 1, call_id),
            }
        }
        None
    }

    /// Transcribe a sample; empty or failed transcription degrades to the
    /// empty sentinel transcript rather than failing the call.
    async fn transcribe_sample(&self, call_id: &CallId, audio: &AudioRef) -> String {
        let hint = self.config.transcription.language_hint.as_deref();
        match tokio::time::timeout(
            self.config.transcription.timeout,
            self.transcription.transcribe(audio, hint),
        )
        .await
        {
            Ok(Ok(text)) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    debug!(
                        "No intelligible input on call {}; proceeding with empty transcript",
                        call_id
                    );
                } else {
                    info!("📝 Transcribed call {}: {}", call_id, text);
                }
                text
            }
            Ok(Err(e)) => {
                warn!(
                    "Transcription failed for call {} ({}); proceeding with empty transcript",
                    call_id, e
                );
                String::new()
            }
            Err(_) => {
                warn!(
                    "Transcription timed out for call {}; proceeding with empty transcript",
                    call_id
                );
                String::new()
            }
        }
    }

    /// Query the reasoning service and parse its output. Timeouts and
    /// errors yield the parser's deterministic fallback decision.
    async fn decide(&self, call_id: &CallId, transcript: String) -> Result<Decision> {
        let snapshot = self.registry.get(call_id)?;
        let context = ReasoningContext {
            caller_number: snapshot.caller_number,
            called_number: snapshot.called_number,
            transcript,
            attempt_count: snapshot.attempt_count,
            notes: self.config.reasoning.notes.clone(),
        };

        let decision = match tokio::time::timeout(
            self.config.reasoning.timeout,
            self.reasoning.recommend(&context),
        )
        .await
        {
            Ok(Ok(raw)) => {
                debug!("🧠 Reasoning output for call {}: {}", call_id, raw);
                self.parser.parse(&raw)
            }
            Ok(Err(e)) => {
                warn!(
                    "🧠 Reasoning unavailable for call {} ({}); using fallback decision",
                    call_id, e
                );
                self.parser.fallback()
            }
            Err(_) => {
                warn!(
                    "🧠 Reasoning timed out for call {} after {:?}; using fallback decision",
                    call_id, self.config.reasoning.timeout
                );
                self.parser.fallback()
            }
        };

        info!("🎯 Decision for call {}: {}", call_id, decision.action);
        Ok(decision)
    }

    fn complete_call(&self, call_id: &CallId, detail: &str) {
        match self
            .registry
            .update(call_id, |call| call.set_status(CallStatus::Completed))
        {
            Ok(_) => {
                self.counters.completed.fetch_add(1, Ordering::Relaxed);
                info!("✅ Call {} completed: {}", call_id, detail);
            }
            Err(e) => debug!("Could not mark call {} completed: {}", call_id, e),
        }
    }

    fn fail_call(&self, call_id: &CallId, reason: &str) {
        match self.registry.update(call_id, |call| {
            call.failure_reason = Some(reason.to_string());
            call.set_status(CallStatus::Failed)
        }) {
            Ok(_) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!("❌ Call {} failed: {}", call_id, reason);
            }
            Err(e) => debug!("Could not mark call {} failed: {}", call_id, e),
        }
    }

    async fn timed_telephony<T>(
        &self,
        operation: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.config.general.telephony_timeout, operation).await {
            Ok(result) => result,
            Err(_) => Err(ScreenError::timeout("telephony operation timed out")),
        }
    }
}
