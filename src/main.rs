use std::io::Read;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde_json::{Map, Value};

use comfy_relay::cli::{Cli, Command};
use comfy_relay::comfy::{ComfyClient, await_ready};
use comfy_relay::job::outputs::{save_outputs, save_result_outputs};
use comfy_relay::remote::RunpodClient;
use comfy_relay::{BridgeConfig, Job, JobOrchestrator, JobResult, logging, ui};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut config = BridgeConfig::load(cli.config.as_deref())?;
    if let Some(url) = cli.comfy_url {
        config.comfy_url = url;
    }

    match cli.command {
        Command::Handle { job, save_dir } => handle(config, &job, save_dir.as_deref()).await,
        Command::Probe => probe(config).await,
        Command::Remote {
            endpoint,
            workflow_path,
            inputs,
            poll_interval_ms,
            output_dir,
        } => {
            remote(
                endpoint,
                &workflow_path,
                inputs,
                Duration::from_millis(poll_interval_ms),
                &output_dir,
            )
            .await
        }
    }
}

fn read_job(source: &str) -> Result<Job> {
    let raw = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read job from stdin")?;
        buf
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("failed to read job file {source}"))?
    };
    serde_json::from_str(&raw).context("job file is not a valid job envelope")
}

async fn handle(config: BridgeConfig, source: &str, save_dir: Option<&Path>) -> Result<ExitCode> {
    let job = read_job(source)?;
    let orchestrator = JobOrchestrator::from_config(config)?;
    let mut result = orchestrator.handle(&job).await;
    if let Some(dir) = save_dir {
        result = save_result_outputs(result, dir);
    }

    println!("{}", serde_json::to_string_pretty(&result)?);
    if result.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

async fn probe(config: BridgeConfig) -> Result<ExitCode> {
    config.validate()?;
    let client = ComfyClient::new(&config.comfy_url, config.request_timeout())?;
    if await_ready(&client, config.ready_max_retries, config.ready_interval()).await {
        tracing::info!(url = %config.comfy_url, "ComfyUI is ready");
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::error!(
            url = %config.comfy_url,
            attempts = config.ready_max_retries,
            "ComfyUI did not respond"
        );
        Ok(ExitCode::FAILURE)
    }
}

async fn remote(
    endpoint: String,
    workflow_path: &Path,
    inputs: Vec<(String, String)>,
    poll_interval: Duration,
    output_dir: &Path,
) -> Result<ExitCode> {
    let api_key = match std::env::var("RUNPOD_KEY") {
        Ok(key) if !key.is_empty() => key,
        _ => bail!(
            "Please set the \"RUNPOD_KEY\" environment variable or set its value in the .env file. \
             You can create a new Runpod API key in Account > Settings > API Keys."
        ),
    };

    let contents = std::fs::read_to_string(workflow_path)
        .with_context(|| format!("failed to read workflow {}", workflow_path.display()))?;
    let workflow: Value = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not valid JSON", workflow_path.display()))?;
    let inputs: Option<Map<String, Value>> = (!inputs.is_empty()).then(|| {
        inputs
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect()
    });

    let client = RunpodClient::new(api_key, endpoint)?;
    let progress = ui::RemoteProgress::start("Sending workflow...");
    let job_id = match client.run(&workflow, inputs.as_ref()).await {
        Ok(id) => id,
        Err(e) => {
            progress.failure(&format!("Failed to send workflow: {e}"));
            return Ok(ExitCode::FAILURE);
        }
    };

    let started = chrono::Utc::now();
    progress.set_message(&format!("Job {job_id} queued"));
    let status = match client
        .wait_for_completion(&job_id, poll_interval, |count, status| {
            progress.poll(count, status)
        })
        .await
    {
        Ok(status) => status,
        Err(e) => {
            progress.failure(&e.to_string());
            return Ok(ExitCode::FAILURE);
        }
    };
    let elapsed = (chrono::Utc::now() - started).num_seconds();

    let result = match serde_json::from_value::<JobResult>(status.output.unwrap_or(Value::Null)) {
        Ok(result) => result,
        Err(e) => {
            progress.failure(&format!("The endpoint returned an unusable job result: {e}"));
            return Ok(ExitCode::FAILURE);
        }
    };
    match result {
        JobResult::Error { error } => {
            progress.failure(&format!("Job failed: {error}"));
            Ok(ExitCode::FAILURE)
        }
        JobResult::Success {
            outputs, warnings, ..
        } => {
            progress.success(&format!("Job completed successfully in {elapsed}s."));
            for warning in &warnings {
                tracing::warn!("{warning}");
            }
            println!("Saving {} output(s) to {}...", outputs.len(), output_dir.display());
            let written = save_outputs(&outputs, output_dir)?;
            ui::print_saved(&written);
            Ok(ExitCode::SUCCESS)
        }
    }
}
