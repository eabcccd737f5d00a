//! Progress events emitted by the procedure and orchestrator.
//!
//! The engine never logs on its own; callers inject a [`RunObserver`].
//! [`TracingObserver`] forwards everything to `tracing`.

use std::fmt;
use std::time::Duration;

use ratewatch_core::StrategyMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcedureStep {
    Navigate,
    Consent,
    RevealCalendar,
    Extract,
    Assemble,
}

impl fmt::Display for ProcedureStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Navigate => "navigate",
            Self::Consent => "consent",
            Self::RevealCalendar => "reveal_calendar",
            Self::Extract => "extract",
            Self::Assemble => "assemble",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent<'a> {
    RunStarted {
        strategy: StrategyMode,
        hotels: usize,
        dates: usize,
    },
    HotelStarted {
        hotel: &'a str,
        position: usize,
        total: usize,
    },
    StepCompleted {
        hotel: &'a str,
        step: ProcedureStep,
    },
    /// A non-fatal problem; extraction carries on.
    Degraded {
        hotel: &'a str,
        step: ProcedureStep,
        message: String,
    },
    ExtractionAttempt {
        hotel: &'a str,
        attempt: u32,
        observed: usize,
    },
    HotelFinished {
        hotel: &'a str,
        snapshots: usize,
        observed: usize,
    },
    HotelFailed {
        hotel: &'a str,
        error: String,
    },
    Pausing {
        delay: Duration,
    },
    SessionReleaseFailed {
        error: String,
    },
    RunFinished {
        successful: usize,
        failed: usize,
        snapshots: usize,
    },
}

pub trait RunObserver: Send + Sync {
    fn on_event(&self, event: &RunEvent<'_>);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {
    fn on_event(&self, _event: &RunEvent<'_>) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn on_event(&self, event: &RunEvent<'_>) {
        match event {
            RunEvent::RunStarted {
                strategy,
                hotels,
                dates,
            } => tracing::info!(%strategy, hotels, dates, "price run starting"),
            RunEvent::HotelStarted {
                hotel,
                position,
                total,
            } => tracing::info!(hotel, position, total, "hotel starting"),
            RunEvent::StepCompleted { hotel, step } => {
                tracing::debug!(hotel, %step, "step completed");
            }
            RunEvent::Degraded {
                hotel,
                step,
                message,
            } => tracing::warn!(hotel, %step, error = %message, "step degraded"),
            RunEvent::ExtractionAttempt {
                hotel,
                attempt,
                observed,
            } => tracing::debug!(hotel, attempt, observed, "calendar capture"),
            RunEvent::HotelFinished {
                hotel,
                snapshots,
                observed,
            } => tracing::info!(hotel, snapshots, observed, "hotel finished"),
            RunEvent::HotelFailed { hotel, error } => {
                tracing::error!(hotel, error = %error, "hotel failed");
            }
            RunEvent::Pausing { delay } => {
                tracing::debug!(?delay, "pausing between hotels");
            }
            RunEvent::SessionReleaseFailed { error } => {
                tracing::warn!(error = %error, "failed to release browser session");
            }
            RunEvent::RunFinished {
                successful,
                failed,
                snapshots,
            } => tracing::info!(successful, failed, snapshots, "price run finished"),
        }
    }
}
