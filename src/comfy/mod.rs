pub mod client;
pub mod error;
pub mod poller;
pub mod types;

use std::future::Future;

pub use client::ComfyClient;
pub use error::ComfyError;
pub use poller::{PollOutcome, await_ready, inspect, poll_until_complete};
pub use types::{History, HistoryRecord, QueueRequest, QueueResponse};

/// The HTTP surface of a generation server that the job pipeline depends on.
///
/// [`ComfyClient`] is the real implementation; tests substitute scripted servers.
pub trait GenerationServer {
    /// Single readiness probe: `true` iff `GET /` answered with status 200.
    fn probe(&self) -> impl Future<Output = bool> + Send;

    /// Queue a resolved workflow and return its tracking id.
    fn queue_workflow(
        &self,
        workflow: &str,
    ) -> impl Future<Output = Result<String, ComfyError>> + Send;

    /// Fetch the history for a tracking id.
    fn history(&self, prompt_id: &str) -> impl Future<Output = Result<History, ComfyError>> + Send;
}
