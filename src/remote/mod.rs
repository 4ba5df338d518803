//! Client side of the bridge: submits workflows to the hosting runtime's HTTP
//! API and waits for the bridge's [`JobResult`](crate::job::JobResult).

pub mod client;
pub mod types;

pub use client::RunpodClient;
pub use types::{RemoteStatus, StatusResponse};
