//! Simulated telephony backend
//!
//! Stand-in for a live call-control stack. Legs are tracked in memory,
//! operations take realistic (jittered) time, and recordings produce real
//! files in a spool directory so downstream stages have an artifact to
//! reference. Prompts are "rendered" by pacing playback to the text length
//! the way a TTS leg would.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, info};

use callscreen_core::error::{Result, ScreenError};
use callscreen_core::ports::{AudioRef, TelephonyPort};
use callscreen_core::types::CallId;

/// Per-character playback pacing for simulated prompts
const PLAYBACK_MS_PER_CHAR: u64 = 5;

/// Upper bound on simulated playback time
const PLAYBACK_CAP: Duration = Duration::from_secs(2);

#[derive(Debug)]
struct LegState {
    answered_at: chrono::DateTime<Utc>,
    recordings: u32,
}

/// In-memory telephony port
pub struct SimulatedTelephony {
    spool_dir: PathBuf,
    legs: DashMap<CallId, LegState>,
}

impl SimulatedTelephony {
    /// Create a simulated backend spooling recordings under `spool_dir`
    pub fn new(spool_dir: impl Into<PathBuf>) -> Result<Self> {
        let spool_dir = spool_dir.into();
        std::fs::create_dir_all(&spool_dir).map_err(|e| {
            ScreenError::telephony(format!(
                "cannot create spool directory {}: {}",
                spool_dir.display(),
                e
            ))
        })?;
        info!("Simulated telephony ready (spool: {})", spool_dir.display());
        Ok(Self {
            spool_dir,
            legs: DashMap::new(),
        })
    }

    /// Number of currently live legs
    pub fn active_legs(&self) -> usize {
        self.legs.len()
    }

    fn require_leg(&self, call_id: &CallId) -> Result<()> {
        if self.legs.contains_key(call_id) {
            Ok(())
        } else {
            Err(ScreenError::telephony(format!(
                "no active leg for call {}",
                call_id
            )))
        }
    }

    async fn signaling_latency(&self) {
        tokio::time::sleep(Duration::from_millis(20 + fastrand::u64(0..30))).await;
    }
}

#[async_trait]
impl TelephonyPort for SimulatedTelephony {
    async fn answer(&self, call_id: &CallId) -> Result<()> {
        self.signaling_latency().await;
        self.legs.insert(
            call_id.clone(),
            LegState {
                answered_at: Utc::now(),
                recordings: 0,
            },
        );
        info!("📞 Answered call {}", call_id);
        Ok(())
    }

    async fn hangup(&self, call_id: &CallId) -> Result<()> {
        self.signaling_latency().await;
        match self.legs.remove(call_id) {
            Some((_, leg)) => {
                let duration = Utc::now() - leg.answered_at;
                info!("📴 Hung up call {} after {}s", call_id, duration.num_seconds());
            }
            None => debug!("Hangup for call {} with no active leg (already ended)", call_id),
        }
        Ok(())
    }

    async fn transfer(&self, call_id: &CallId, destination: &str) -> Result<()> {
        self.require_leg(call_id)?;
        self.signaling_latency().await;
        // The leg leaves our control once the transfer target picks up
        self.legs.remove(call_id);
        info!("↪️ Transferred call {} to {}", call_id, destination);
        Ok(())
    }

    async fn play(&self, call_id: &CallId, prompt: &str) -> Result<()> {
        self.require_leg(call_id)?;
        let duration = Duration::from_millis(prompt.len() as u64 * PLAYBACK_MS_PER_CHAR)
            .min(PLAYBACK_CAP);
        debug!("🔊 Playing to call {} ({:?}): {}", call_id, duration, prompt);
        tokio::time::sleep(duration).await;
        Ok(())
    }

    async fn record(&self, call_id: &CallId, max_duration: Duration) -> Result<AudioRef> {
        let sequence = {
            let mut leg = self.legs.get_mut(call_id).ok_or_else(|| {
                ScreenError::telephony(format!("no active leg for call {}", call_id))
            })?;
            leg.recordings += 1;
            leg.recordings
        };

        // The simulated caller talks for the whole window
        tokio::time::sleep(max_duration).await;

        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let filename = format!("audio_{}_{}_{}.wav", call_id, timestamp, sequence);
        let path = self.spool_dir.join(filename);

        tokio::fs::write(&path, b"").await.map_err(|e| {
            ScreenError::telephony(format!("cannot write recording {}: {}", path.display(), e))
        })?;

        debug!("🎙️ Recorded {:?} from call {} into {}", max_duration, call_id, path.display());
        Ok(path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spool() -> PathBuf {
        std::env::temp_dir().join(format!("callscreen-spool-{}", fastrand::u64(..)))
    }

    #[tokio::test]
    async fn test_leg_lifecycle() {
        let telephony = SimulatedTelephony::new(spool()).unwrap();
        let call_id = CallId::from("sim-1");

        telephony.answer(&call_id).await.unwrap();
        assert_eq!(telephony.active_legs(), 1);

        telephony.play(&call_id, "hello").await.unwrap();
        telephony.hangup(&call_id).await.unwrap();
        assert_eq!(telephony.active_legs(), 0);

        // Hangup is idempotent
        telephony.hangup(&call_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_operations_require_a_live_leg() {
        let telephony = SimulatedTelephony::new(spool()).unwrap();
        let call_id = CallId::from("sim-2");

        assert!(telephony.play(&call_id, "hello").await.is_err());
        assert!(telephony.transfer(&call_id, "100").await.is_err());
        assert!(telephony
            .record(&call_id, Duration::from_millis(1))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_record_produces_an_artifact() {
        let telephony = SimulatedTelephony::new(spool()).unwrap();
        let call_id = CallId::from("sim-3");

        telephony.answer(&call_id).await.unwrap();
        let audio = telephony
            .record(&call_id, Duration::from_millis(5))
            .await
            .unwrap();

        assert!(audio.contains("sim-3"));
        assert!(std::path::Path::new(&audio).exists());
    }

    #[tokio::test]
    async fn test_transfer_releases_the_leg() {
        let telephony = SimulatedTelephony::new(spool()).unwrap();
        let call_id = CallId::from("sim-4");

        telephony.answer(&call_id).await.unwrap();
        telephony.transfer(&call_id, "100").await.unwrap();
        assert_eq!(telephony.active_legs(), 0);
    }
}
