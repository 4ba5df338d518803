//! Job bridge between a serverless queue and a ComfyUI generation server.
//!
//! A job carries a templated workflow and named inputs. The
//! [`JobOrchestrator`](orchestrator::JobOrchestrator) parses it, substitutes
//! `{{name}}` placeholders, waits for ComfyUI to come up, queues the workflow,
//! polls its history and returns the outputs as a [`JobResult`](job::JobResult).

pub mod cli;
pub mod comfy;
pub mod config;
pub mod error;
pub mod job;
pub mod logging;
pub mod orchestrator;
pub mod remote;
pub mod ui;

pub use config::BridgeConfig;
pub use error::{JobError, RelayError};
pub use job::{Job, JobResult};
pub use orchestrator::JobOrchestrator;
