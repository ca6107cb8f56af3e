//! Caller-side frame loop
//!
//! Pumps the engine one frame at a time on the calling thread until the
//! engine asks to quit, a frame or time budget runs out, or the run is
//! cancelled from elsewhere (e.g. a Ctrl-C handler).

use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::HostConfig;
use crate::engine::InstancePump;
use crate::error::Result;

/// Budgets for one run; `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunLimits {
    pub max_frames: Option<u64>,
    pub max_duration: Option<Duration>,
}

impl RunLimits {
    pub fn from_config(config: &HostConfig) -> Self {
        Self {
            max_frames: config.max_frames,
            max_duration: config.time_budget(),
        }
    }
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EngineQuit,
    FrameLimit,
    TimeLimit,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub elapsed: Duration,
    pub reason: StopReason,
}

/// Pump `pump` until a stop condition is met.
///
/// Errors from `iteration()` end the loop and are returned as-is.
pub fn run_frames(
    pump: &InstancePump,
    limits: &RunLimits,
    cancel: &CancellationToken,
) -> Result<RunSummary> {
    let started = Instant::now();
    let mut frames = 0u64;

    let reason = loop {
        if cancel.is_cancelled() {
            break StopReason::Cancelled;
        }
        if limits.max_frames.is_some_and(|max| frames >= max) {
            break StopReason::FrameLimit;
        }
        if limits.max_duration.is_some_and(|max| started.elapsed() >= max) {
            break StopReason::TimeLimit;
        }

        let quit = pump.iteration()?;
        frames += 1;
        if quit {
            debug!(frames, "Engine requested quit");
            break StopReason::EngineQuit;
        }
    };

    let summary = RunSummary {
        frames,
        elapsed: started.elapsed(),
        reason,
    };
    info!(frames, elapsed = ?summary.elapsed, reason = ?reason, "Frame loop finished");
    Ok(summary)
}
