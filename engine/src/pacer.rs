use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Pause,
    Stop,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pause => f.write_str("pause"),
            Self::Stop => f.write_str("stop"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("run cancelled: {0} requested")]
pub struct Cancelled(pub StopReason);

const RUNNING: u8 = 0;
const PAUSE_REQUESTED: u8 = 1;
const STOP_REQUESTED: u8 = 2;

/// Cooperative cancellation flag shared between the run loop and whoever
/// controls it (CLI signal handler, control API).
#[derive(Debug, Clone, Default)]
pub struct RunSignal {
    state: Arc<AtomicU8>,
}

impl RunSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_pause(&self) {
        // A stop outranks a pause.
        let _ = self.state.compare_exchange(
            RUNNING,
            PAUSE_REQUESTED,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    pub fn request_stop(&self) {
        self.state.store(STOP_REQUESTED, Ordering::SeqCst);
    }

    /// Clears a pause request. Returns false when a stop is pending.
    pub fn resume(&self) -> bool {
        match self.state.compare_exchange(
            PAUSE_REQUESTED,
            RUNNING,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => true,
            Err(current) => current == RUNNING,
        }
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        match self.state.load(Ordering::SeqCst) {
            PAUSE_REQUESTED => Some(StopReason::Pause),
            STOP_REQUESTED => Some(StopReason::Stop),
            _ => None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.stop_reason().is_none()
    }

    pub fn check(&self) -> Result<(), Cancelled> {
        match self.stop_reason() {
            Some(reason) => Err(Cancelled(reason)),
            None => Ok(()),
        }
    }
}

pub trait Clock: Send {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Clock that only counts. Clones share the same counter, so a test can keep
/// one handle while the pacer owns the other.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    slept_ms: Arc<AtomicU64>,
    trip: Option<(u64, RunSignal, StopReason)>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise `reason` on `signal` once the accumulated sleep reaches `after`.
    pub fn tripping(mut self, after: Duration, signal: RunSignal, reason: StopReason) -> Self {
        self.trip = Some((after.as_millis() as u64, signal, reason));
        self
    }

    pub fn slept(&self) -> Duration {
        Duration::from_millis(self.slept_ms.load(Ordering::SeqCst))
    }
}

impl Clock for ManualClock {
    fn sleep(&self, duration: Duration) {
        let total = self
            .slept_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst)
            + duration.as_millis() as u64;
        if let Some((after, signal, reason)) = &self.trip {
            if total >= *after {
                match reason {
                    StopReason::Pause => signal.request_pause(),
                    StopReason::Stop => signal.request_stop(),
                }
            }
        }
    }
}

/// Blocking waits that notice a stop request within one second.
pub struct Pacer {
    clock: Box<dyn Clock>,
    signal: RunSignal,
}

impl Pacer {
    pub fn new(clock: impl Clock + 'static, signal: RunSignal) -> Self {
        Self {
            clock: Box::new(clock),
            signal,
        }
    }

    pub fn system(signal: RunSignal) -> Self {
        Self::new(SystemClock, signal)
    }

    pub fn signal(&self) -> &RunSignal {
        &self.signal
    }

    pub fn check(&self) -> Result<(), Cancelled> {
        self.signal.check()
    }

    pub fn wait(&self, seconds: f32) -> Result<(), Cancelled> {
        let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        let whole = seconds.trunc() as u64;
        for _ in 0..whole {
            self.signal.check()?;
            self.clock.sleep(Duration::from_secs(1));
        }
        self.signal.check()?;
        let remainder = seconds.fract();
        if remainder > 0.0 {
            self.clock.sleep(Duration::from_secs_f32(remainder));
        }
        Ok(())
    }

    /// Blocks while a pause is pending. Returns false when a stop arrives
    /// instead of a resume.
    pub fn wait_for_resume(&self) -> bool {
        loop {
            match self.signal.stop_reason() {
                None => return true,
                Some(StopReason::Stop) => return false,
                Some(StopReason::Pause) => self.clock.sleep(Duration::from_secs(1)),
            }
        }
    }
}
