//! Per-key cooldown circuit breaker.

use std::collections::HashMap;
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Cooldown-based circuit breaker, one cooldown per key.
///
/// [`FaultGate::open_fault`] records a cooldown; while it is active,
/// [`FaultGate::guard`] suspends callers until it expires, then clears it
/// and runs the guarded future. A subsequent `open_fault` only ever extends
/// an unexpired cooldown, never shortens it.
///
/// # Examples
///
/// ```
/// use remora_rate_limit::FaultGate;
/// use std::time::Duration;
///
/// # async fn demo() {
/// let gate = FaultGate::new();
/// gate.open_fault("premiumize", Duration::from_secs(30));
/// let answer = gate.guard("premiumize", async { 42 }).await;
/// assert_eq!(answer, 42);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct FaultGate {
    cooldowns: StdMutex<HashMap<String, Instant>>,
}

impl FaultGate {
    /// Create a gate with no open cooldowns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or extend) a cooldown for `key` lasting `duration` from now.
    pub fn open_fault(&self, key: &str, duration: Duration) {
        let proposed = Instant::now() + duration;
        let mut cooldowns = self.cooldowns.lock().unwrap_or_else(|e| e.into_inner());
        let expiry = cooldowns
            .entry(key.to_string())
            .and_modify(|current| {
                // Extend only; a shorter fault report never shrinks an
                // active cooldown.
                if proposed > *current {
                    *current = proposed;
                }
            })
            .or_insert(proposed);
        debug!(key, cooldown_ms = duration.as_millis() as u64, expiry = ?expiry, "Opened fault cooldown");
    }

    /// Remaining cooldown for `key`, if one is active.
    pub fn remaining(&self, key: &str) -> Option<Duration> {
        let cooldowns = self.cooldowns.lock().unwrap_or_else(|e| e.into_inner());
        cooldowns
            .get(key)
            .map(|expiry| expiry.saturating_duration_since(Instant::now()))
            .filter(|remaining| !remaining.is_zero())
    }

    /// Wait out any active cooldown for `key`, clear it, then run `fut`.
    pub async fn guard<F>(&self, key: &str, fut: F) -> F::Output
    where
        F: Future,
    {
        loop {
            let deadline = {
                let cooldowns = self.cooldowns.lock().unwrap_or_else(|e| e.into_inner());
                cooldowns.get(key).copied()
            };

            match deadline {
                Some(expiry) if expiry > Instant::now() => {
                    debug!(
                        key,
                        wait_ms = expiry.saturating_duration_since(Instant::now()).as_millis() as u64,
                        "Cooldown active, waiting"
                    );
                    tokio::time::sleep_until(expiry).await;
                    // Re-check: the cooldown may have been extended while
                    // this caller slept.
                }
                Some(expiry) => {
                    let mut cooldowns = self.cooldowns.lock().unwrap_or_else(|e| e.into_inner());
                    // Clear only if nobody extended it since the read.
                    if cooldowns.get(key) == Some(&expiry) {
                        cooldowns.remove(key);
                    } else {
                        continue;
                    }
                    break;
                }
                None => break,
            }
        }

        fut.await
    }
}
