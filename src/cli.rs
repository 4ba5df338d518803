//! Command-line interface built on clap.
//!
//! [`Cli`] carries the global flags (`--config`, `--comfy-url`, `--verbose`) and
//! one of three subcommands: `handle` runs a job against the local ComfyUI
//! server, `probe` checks that server, and `remote` drives a deployed bridge.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Bridge between a job queue and a ComfyUI generation server.
#[derive(Debug, Parser)]
#[command(name = "comfy-relay", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to a TOML config file (defaults to ./comfy-relay.toml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the ComfyUI base URL.
    #[arg(long, global = true)]
    pub comfy_url: Option<String>,

    /// Enable debug logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one job: resolve, submit to ComfyUI, wait, print the result as JSON.
    Handle {
        /// Job envelope file (`{"id": ..., "input": {...}}`); `-` reads stdin.
        #[arg(long, default_value = "-")]
        job: String,

        /// Also decode base64 outputs into this directory.
        #[arg(long)]
        save_dir: Option<PathBuf>,
    },

    /// Check that the ComfyUI server answers within the configured retry budget.
    Probe,

    /// Send a workflow to a deployed Runpod endpoint and save the produced images.
    Remote {
        /// ID of the Runpod serverless endpoint.
        #[arg(long)]
        endpoint: String,

        /// Workflow in ComfyUI API JSON format.
        #[arg(long, default_value = "workflow.json")]
        workflow_path: PathBuf,

        /// Placeholder values, formatted as `key=value`.
        #[arg(long, num_args = 0.., value_parser = parse_key_value)]
        inputs: Vec<(String, String)>,

        /// Milliseconds between status polls.
        #[arg(long, default_value_t = 5000)]
        poll_interval_ms: u64,

        /// Directory the decoded outputs are written to.
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },
}

/// Parse `key=value`, splitting at the first `=`.
pub fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!(
            "Invalid input format {raw:?}. Please format the inputs as \"key=value\"."
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_handle_subcommand() {
        let cli = Cli::parse_from(["comfy-relay", "handle", "--job", "job.json"]);
        match cli.command {
            Command::Handle { job, save_dir } => {
                assert_eq!(job, "job.json");
                assert!(save_dir.is_none());
            }
            _ => panic!("expected Handle command"),
        }
    }

    #[test]
    fn cli_handle_defaults_to_stdin() {
        let cli = Cli::parse_from(["comfy-relay", "handle"]);
        assert!(matches!(cli.command, Command::Handle { job, .. } if job == "-"));
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from([
            "comfy-relay",
            "--comfy-url",
            "http://gpu:8188",
            "--verbose",
            "probe",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.comfy_url.as_deref(), Some("http://gpu:8188"));
        assert!(matches!(cli.command, Command::Probe));
    }

    #[test]
    fn cli_parses_remote_inputs() {
        let cli = Cli::parse_from([
            "comfy-relay",
            "remote",
            "--endpoint",
            "ep-1",
            "--inputs",
            "prompt=a cat",
            "expr=a=b",
        ]);
        match cli.command {
            Command::Remote {
                endpoint,
                workflow_path,
                inputs,
                poll_interval_ms,
                ..
            } => {
                assert_eq!(endpoint, "ep-1");
                assert_eq!(workflow_path, PathBuf::from("workflow.json"));
                assert_eq!(poll_interval_ms, 5000);
                assert_eq!(
                    inputs,
                    vec![
                        ("prompt".to_string(), "a cat".to_string()),
                        ("expr".to_string(), "a=b".to_string())
                    ]
                );
            }
            _ => panic!("expected Remote command"),
        }
    }

    #[test]
    fn key_value_without_separator_is_rejected() {
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
