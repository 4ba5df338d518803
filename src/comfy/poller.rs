//! Fixed-interval wait loops against a [`GenerationServer`].
//!
//! [`await_ready`] gates submission on the server answering `GET /`, and
//! [`poll_until_complete`] drives the per-job completion state machine:
//!
//! ```text
//! Pending --(outputs present)--> Completed
//!    |  \--(fetch error)-------> Failed
//!    \----(budget exhausted)---> TimedOut
//! ```
//!
//! Both loops own their counters; nothing is shared between jobs.

use std::time::Duration;

use tokio::time::sleep;

use super::error::ComfyError;
use super::types::{History, HistoryRecord};
use super::GenerationServer;

/// Result of polling the history of one tracking id.
#[derive(Debug)]
pub enum PollOutcome {
    /// The record is absent or has no outputs yet.
    Pending,
    /// The record carries a non-empty outputs object.
    Completed(HistoryRecord),
    /// `attempts` fetches were made without the outputs appearing.
    TimedOut { attempts: u32 },
    /// Fetch number `attempt` failed; polling stopped there.
    Failed { attempt: u32, cause: ComfyError },
}

/// Probe the server until it answers with 200, at most `max_retries` times.
///
/// Sleeps `interval` after each failed probe except the last. Returns `false`
/// once the budget is exhausted; the caller decides how to report that.
pub async fn await_ready(
    server: &impl GenerationServer,
    max_retries: u32,
    interval: Duration,
) -> bool {
    for attempt in 1..=max_retries {
        if server.probe().await {
            tracing::debug!(attempt, "ComfyUI is ready");
            return true;
        }
        if attempt < max_retries {
            sleep(interval).await;
        }
    }
    false
}

/// Classify one history response for `prompt_id`: `Completed` or `Pending`.
pub fn inspect(mut history: History, prompt_id: &str) -> PollOutcome {
    match history.remove(prompt_id) {
        Some(record) if record.non_empty_outputs().is_some() => PollOutcome::Completed(record),
        _ => PollOutcome::Pending,
    }
}

/// Poll `/history/{prompt_id}` until outputs appear, a fetch fails, or
/// `max_retries` fetches have been made.
pub async fn poll_until_complete(
    server: &impl GenerationServer,
    prompt_id: &str,
    max_retries: u32,
    interval: Duration,
) -> PollOutcome {
    for attempt in 1..=max_retries {
        let history = match server.history(prompt_id).await {
            Ok(history) => history,
            Err(cause) => return PollOutcome::Failed { attempt, cause },
        };

        match inspect(history, prompt_id) {
            PollOutcome::Pending => {
                tracing::trace!(prompt_id, attempt, max_retries, "workflow still running");
            }
            outcome => return outcome,
        }

        if attempt < max_retries {
            sleep(interval).await;
        }
    }
    PollOutcome::TimedOut {
        attempts: max_retries,
    }
}
