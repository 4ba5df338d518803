use std::time::Instant;

use serde_json::{Map, Value};
use tracing::Instrument;
use uuid::Uuid;

use crate::comfy::{
    ComfyClient, GenerationServer, PollOutcome, await_ready, poll_until_complete,
};
use crate::config::{BridgeConfig, PlaceholderPolicy};
use crate::error::{JobError, RelayError};
use crate::job::{Job, JobResult, JobTrace, input, outputs, template};

const EMPTY_INPUTS_WARNING: &str =
    r#"A value was provided for the field "workflow_inputs", but it does not contain any input."#;

type Completed = (Map<String, Value>, Vec<String>);

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Drives one job at a time through PARSE → RESOLVE → PROBE → SUBMIT → POLL → EXTRACT.
///
/// Holds no per-job state, so a single orchestrator can serve concurrent jobs.
pub struct JobOrchestrator<S = ComfyClient> {
    server: S,
    config: BridgeConfig,
}

impl JobOrchestrator<ComfyClient> {
    /// Build an orchestrator talking to `config.comfy_url` over HTTP.
    pub fn from_config(config: BridgeConfig) -> Result<Self, RelayError> {
        config.validate()?;
        let client = ComfyClient::new(&config.comfy_url, config.request_timeout())?;
        Self::new(client, config)
    }
}

impl<S: GenerationServer> JobOrchestrator<S> {
    /// Create an orchestrator over any [`GenerationServer`]. Fails if `config` is invalid.
    pub fn new(server: S, config: BridgeConfig) -> Result<Self, RelayError> {
        config.validate()?;
        Ok(Self { server, config })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn server(&self) -> &S {
        &self.server
    }

    /// Run a job to completion. Every failure is folded into [`JobResult::Error`].
    pub async fn handle(&self, job: &Job) -> JobResult {
        self.handle_traced(job).await.0
    }

    /// Like [`handle`](Self::handle), also returning the stage trace of the run.
    pub async fn handle_traced(&self, job: &Job) -> (JobResult, JobTrace) {
        let job_id = job
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut trace = JobTrace::start(job_id);
        let span = tracing::info_span!("job", id = %trace.job_id);

        let outcome = self.run(job, &mut trace).instrument(span.clone()).await;
        let duration_ms = trace.finish();

        let result = match outcome {
            Ok((outputs, warnings)) => {
                tracing::info!(
                    parent: &span,
                    duration_ms,
                    outputs = outputs.len(),
                    warnings = warnings.len(),
                    "job completed"
                );
                JobResult::success(outputs, warnings)
            }
            Err(e) => {
                tracing::error!(parent: &span, stage = %e.stage(), duration_ms, "job failed: {e}");
                JobResult::error(e.to_string())
            }
        };
        (result, trace)
    }

    async fn run(&self, job: &Job, trace: &mut JobTrace) -> Result<Completed, JobError> {
        // PARSE
        let parsed = input::parse(job.input.as_ref())?;
        trace.advance();

        // RESOLVE
        let mut warnings = Vec::new();
        if parsed.inputs.as_ref().is_some_and(Map::is_empty) {
            warnings.push(EMPTY_INPUTS_WARNING.to_string());
        }
        let resolution = template::resolve(&parsed.workflow, parsed.inputs.as_ref());
        if self.config.placeholder_policy == PlaceholderPolicy::Fail
            && !resolution.unresolved_placeholders.is_empty()
        {
            return Err(JobError::UnresolvedPlaceholders(
                resolution.unresolved_placeholders,
            ));
        }
        if parsed.structured {
            serde_json::from_str::<Value>(&resolution.workflow)
                .map_err(JobError::MalformedWorkflow)?;
        }
        warnings.extend(resolution.warnings());
        for warning in &warnings {
            tracing::warn!("{warning}");
        }
        tracing::debug!(workflow = %resolution.workflow, "inputs processed");
        trace.advance();

        // PROBE
        let started = Instant::now();
        if !await_ready(
            &self.server,
            self.config.ready_max_retries,
            self.config.ready_interval(),
        )
        .await
        {
            return Err(JobError::Connectivity {
                attempts: self.config.ready_max_retries,
                waited_ms: elapsed_ms(started),
            });
        }
        trace.advance();

        // SUBMIT
        let prompt_id = self
            .server
            .queue_workflow(&resolution.workflow)
            .await
            .map_err(JobError::Submission)?;
        tracing::info!(prompt_id = %prompt_id, "workflow queued");
        trace.advance();

        // POLL
        let started = Instant::now();
        let record = match poll_until_complete(
            &self.server,
            &prompt_id,
            self.config.poll_max_retries,
            self.config.poll_interval(),
        )
        .await
        {
            PollOutcome::Completed(record) => record,
            PollOutcome::Failed { attempt, cause } => {
                return Err(JobError::Polling {
                    retries: attempt.saturating_sub(1),
                    elapsed_ms: elapsed_ms(started),
                    cause,
                });
            }
            PollOutcome::TimedOut { .. } | PollOutcome::Pending => {
                return Err(JobError::Timeout {
                    attempts: self.config.poll_max_retries,
                    elapsed_ms: elapsed_ms(started),
                });
            }
        };
        trace.advance();

        // EXTRACT
        let outputs = outputs::extract(record)?;
        trace.advance();

        Ok((outputs, warnings))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use serde_json::json;

    use super::*;
    use crate::comfy::{ComfyError, History};
    use crate::job::Stage;

    /// In-memory generation server recording what the orchestrator sent it.
    struct MockServer {
        ready: bool,
        queue_response: Mutex<Option<Result<String, ComfyError>>>,
        histories: Mutex<VecDeque<Result<History, ComfyError>>>,
        probe_calls: AtomicU32,
        history_calls: AtomicU32,
        submitted: Mutex<Vec<String>>,
    }

    impl MockServer {
        fn new(ready: bool) -> Self {
            Self {
                ready,
                queue_response: Mutex::new(Some(Ok("job-1".into()))),
                histories: Mutex::new(VecDeque::new()),
                probe_calls: AtomicU32::new(0),
                history_calls: AtomicU32::new(0),
                submitted: Mutex::new(Vec::new()),
            }
        }

        fn with_queue_response(self, response: Result<String, ComfyError>) -> Self {
            *self.queue_response.lock().unwrap() = Some(response);
            self
        }

        fn with_history(self, history: Result<History, ComfyError>) -> Self {
            self.histories.lock().unwrap().push_back(history);
            self
        }

        fn completed(self, prompt_id: &str, outputs: Value) -> Self {
            let history =
                serde_json::from_value(json!({ prompt_id: {"outputs": outputs} })).unwrap();
            self.with_history(Ok(history))
        }

        fn submitted(&self) -> Vec<String> {
            self.submitted.lock().unwrap().clone()
        }
    }

    impl GenerationServer for MockServer {
        async fn probe(&self) -> bool {
            self.probe_calls.fetch_add(1, Ordering::SeqCst);
            self.ready
        }

        async fn queue_workflow(&self, workflow: &str) -> Result<String, ComfyError> {
            self.submitted.lock().unwrap().push(workflow.to_string());
            self.queue_response
                .lock()
                .unwrap()
                .take()
                .unwrap_or(Err(ComfyError::MissingPromptId))
        }

        async fn history(&self, _prompt_id: &str) -> Result<History, ComfyError> {
            self.history_calls.fetch_add(1, Ordering::SeqCst);
            self.histories
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(History::new()))
        }
    }

    fn fast_config() -> BridgeConfig {
        BridgeConfig {
            ready_max_retries: 3,
            ready_interval_ms: 1,
            poll_max_retries: 5,
            poll_interval_ms: 1,
            ..Default::default()
        }
    }

    fn orchestrator(server: MockServer) -> JobOrchestrator<MockServer> {
        JobOrchestrator::new(server, fast_config()).unwrap()
    }

    fn error_of(result: &JobResult) -> &str {
        match result {
            JobResult::Error { error } => error,
            other => panic!("expected error result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn orchestrator_happy_path() {
        let server = MockServer::new(true)
            .with_history(Ok(History::new()))
            .completed("job-1", json!({"out.png": "aGk="}));
        let orch = orchestrator(server);
        let job = Job::new(json!({
            "workflow": "{{greeting}}",
            "workflow_inputs": {"greeting": "hi"}
        }));

        let (result, trace) = orch.handle_traced(&job).await;

        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"success": true, "outputs": {"out.png": "aGk="}})
        );
        assert_eq!(orch.server().submitted(), vec!["hi"]);
        assert_eq!(orch.server().history_calls.load(Ordering::SeqCst), 2);
        assert_eq!(trace.stage, Stage::Done);
        assert_eq!(
            trace.completed,
            vec![
                Stage::Parse,
                Stage::Resolve,
                Stage::Probe,
                Stage::Submit,
                Stage::Poll,
                Stage::Extract
            ]
        );
    }

    #[tokio::test]
    async fn unreachable_server_never_submits() {
        let orch = orchestrator(MockServer::new(false));
        let job = Job::new(json!({"workflow": "w"}));

        let (result, trace) = orch.handle_traced(&job).await;

        assert!(
            error_of(&result).starts_with("The ComfyUI server did not respond after 3 attempts")
        );
        assert_eq!(orch.server().probe_calls.load(Ordering::SeqCst), 3);
        assert!(orch.server().submitted().is_empty());
        assert_eq!(trace.stage, Stage::Probe);
        assert!(!trace.reached(Stage::Submit));
    }

    #[tokio::test]
    async fn invalid_input_stops_before_probe() {
        let orch = orchestrator(MockServer::new(true));

        let result = orch.handle(&Job::default()).await;
        assert!(error_of(&result).contains("No input provided"));

        let result = orch.handle(&Job::new(json!(r#"{"workflow": ""}"#))).await;
        assert!(error_of(&result).contains("The input workflow is empty"));

        assert_eq!(orch.server().probe_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unresolved_placeholders_warn_by_default() {
        let server = MockServer::new(true).completed("job-1", json!({"out.png": "aGk="}));
        let orch = orchestrator(server);
        let job = Job::new(json!({
            "workflow": "{{prompt}} {{seed}}",
            "workflow_inputs": {"prompt": "cat", "steps": 20}
        }));

        let result = orch.handle(&job).await;

        match result {
            JobResult::Success { warnings, .. } => {
                assert_eq!(warnings.len(), 2);
                assert!(warnings.iter().any(|w| w.contains("steps")));
                assert!(warnings.iter().any(|w| w.contains("seed")));
            }
            other => panic!("expected success, got {other:?}"),
        }
        assert_eq!(orch.server().submitted(), vec!["cat {{seed}}"]);
    }

    #[tokio::test]
    async fn fail_policy_rejects_unresolved_placeholders() {
        let config = BridgeConfig {
            placeholder_policy: PlaceholderPolicy::Fail,
            ..fast_config()
        };
        let orch = JobOrchestrator::new(MockServer::new(true), config).unwrap();
        let job = Job::new(json!({"workflow": "{{prompt}}"}));

        let result = orch.handle(&job).await;

        assert!(error_of(&result).ends_with("no input for: prompt"));
        assert_eq!(orch.server().probe_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn structured_workflow_broken_by_substitution_is_rejected() {
        let orch = orchestrator(MockServer::new(true));
        let job = Job::new(json!({
            "workflow": {"6": {"inputs": {"text": "{{prompt}}"}}},
            "workflow_inputs": {"prompt": "a \"red\" fox"}
        }));

        let (result, trace) = orch.handle_traced(&job).await;

        assert!(error_of(&result).starts_with("The workflow is no longer valid JSON"));
        assert_eq!(trace.stage, Stage::Resolve);
        assert_eq!(orch.server().probe_calls.load(Ordering::SeqCst), 0);
        assert!(orch.server().submitted().is_empty());
    }

    #[tokio::test]
    async fn empty_inputs_are_reported() {
        let server = MockServer::new(true).completed("job-1", json!({"a": "b"}));
        let orch = orchestrator(server);
        let job = Job::new(json!({"workflow": "plain", "workflow_inputs": {}}));

        match orch.handle(&job).await {
            JobResult::Success { warnings, .. } => {
                assert_eq!(warnings, vec![EMPTY_INPUTS_WARNING.to_string()]);
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn submission_failure_is_reported() {
        let server = MockServer::new(true).with_queue_response(Err(ComfyError::Api {
            status: 400,
            body: "invalid prompt".into(),
        }));
        let orch = orchestrator(server);

        let result = orch.handle(&Job::new(json!({"workflow": "w"}))).await;

        assert_eq!(
            error_of(&result),
            "Failed to queue workflow: ComfyUI API error (status 400): invalid prompt"
        );
        assert_eq!(orch.server().history_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn polling_failure_stops_immediately() {
        let server = MockServer::new(true)
            .with_history(Ok(History::new()))
            .with_history(Err(ComfyError::Api {
                status: 500,
                body: "history unavailable".into(),
            }));
        let orch = orchestrator(server);

        let result = orch.handle(&Job::new(json!({"workflow": "w"}))).await;

        let message = error_of(&result);
        assert!(
            message.starts_with("Failed to poll ComfyUI status during generation after 1 retries")
        );
        assert!(message.contains("history unavailable"));
        assert_eq!(orch.server().history_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn polling_budget_exhausted_times_out() {
        let orch = orchestrator(MockServer::new(true));

        let result = orch.handle(&Job::new(json!({"workflow": "w"}))).await;

        assert!(
            error_of(&result)
                .starts_with("ComfyUI did not produce any output after 5 polling attempts")
        );
        assert_eq!(orch.server().history_calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn job_id_is_kept_or_generated() {
        let orch = orchestrator(MockServer::new(false));

        let job = Job {
            id: Some("rp-42".into()),
            input: None,
        };
        let (_, trace) = orch.handle_traced(&job).await;
        assert_eq!(trace.job_id, "rp-42");

        let (_, trace) = orch.handle_traced(&Job::default()).await;
        assert!(Uuid::parse_str(&trace.job_id).is_ok());
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let config = BridgeConfig {
            comfy_url: String::new(),
            ..Default::default()
        };
        assert!(JobOrchestrator::new(MockServer::new(true), config).is_err());
    }
}
