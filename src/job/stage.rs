use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The stages of the job pipeline, in execution order.
///
/// Each job flows through: PARSE → RESOLVE → PROBE → SUBMIT → POLL → EXTRACT → DONE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Parse,
    Resolve,
    Probe,
    Submit,
    Poll,
    Extract,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Parse => write!(f, "PARSE"),
            Stage::Resolve => write!(f, "RESOLVE"),
            Stage::Probe => write!(f, "PROBE"),
            Stage::Submit => write!(f, "SUBMIT"),
            Stage::Poll => write!(f, "POLL"),
            Stage::Extract => write!(f, "EXTRACT"),
            Stage::Done => write!(f, "DONE"),
        }
    }
}

impl Stage {
    /// The stage that follows a successful `self`. `Done` is terminal.
    pub fn next(self) -> Stage {
        match self {
            Stage::Parse => Stage::Resolve,
            Stage::Resolve => Stage::Probe,
            Stage::Probe => Stage::Submit,
            Stage::Submit => Stage::Poll,
            Stage::Poll => Stage::Extract,
            Stage::Extract | Stage::Done => Stage::Done,
        }
    }
}

/// Per-job record of which stages ran and how long the job took.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobTrace {
    pub job_id: String,
    /// The stage currently executing, or the one that failed.
    pub stage: Stage,
    /// Stages that completed successfully, in order.
    pub completed: Vec<Stage>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobTrace {
    pub fn start(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            stage: Stage::Parse,
            completed: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Mark the current stage as completed and move to the next one.
    pub fn advance(&mut self) -> Stage {
        if self.stage != Stage::Done {
            self.completed.push(self.stage);
            self.stage = self.stage.next();
        }
        self.stage
    }

    /// Stamp the end time and return the job's wall-clock duration in milliseconds.
    pub fn finish(&mut self) -> i64 {
        let now = Utc::now();
        self.finished_at = Some(now);
        (now - self.started_at).num_milliseconds()
    }

    pub fn reached(&self, stage: Stage) -> bool {
        self.stage == stage || self.completed.contains(&stage)
    }
}
