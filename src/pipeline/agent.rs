//! Optional cleanup agent: an external LLM CLI that edits the written file.
//!
//! The agent runs strictly after the deterministic output is on disk and only
//! sees the file, never in-memory text. It is best effort: a failing, silent
//! or slow agent leaves the deterministic result in place and the conversion
//! still succeeds. Only a missing command is reported as an error, so callers
//! can tell "not installed" apart from "ran and did nothing".

use crate::error::Paper2MdError;
use crate::prompts::cleanup_prompt;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// How to invoke the cleanup agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Executable to run. Default: `claude`.
    pub command: String,
    /// Tools the agent may use. Default: Read, Edit, Glob, Grep.
    pub allowed_tools: Vec<String>,
    /// Wall-clock limit for the whole agent run. Default: 1800 s.
    pub timeout_secs: u64,
    /// Let the agent's stderr through to the terminal. Default: false.
    pub verbose: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            command: "claude".to_string(),
            allowed_tools: ["Read", "Edit", "Glob", "Grep"]
                .into_iter()
                .map(String::from)
                .collect(),
            timeout_secs: 1800,
            verbose: false,
        }
    }
}

impl AgentConfig {
    /// Arguments passed to [`AgentConfig::command`] for a given prompt.
    pub fn args(&self, prompt: &str) -> Vec<String> {
        vec![
            "-p".to_string(),
            prompt.to_string(),
            "--allowedTools".to_string(),
            self.allowed_tools.join(","),
            "--permission-mode".to_string(),
            "acceptEdits".to_string(),
        ]
    }
}

/// Run the cleanup agent on `md_path`.
///
/// `img_dir` defaults to `img/` next to the Markdown file. The agent's working
/// directory is the Markdown file's directory.
///
/// # Returns
/// * `Ok(Some(summary))`: the agent exited successfully; trimmed stdout.
/// * `Ok(None)`: the agent failed, timed out or printed nothing (logged).
/// * `Err(AgentNotInstalled)`: the command does not exist.
pub async fn run_cleanup_agent(
    md_path: &Path,
    img_dir: Option<&Path>,
    config: &AgentConfig,
) -> Result<Option<String>, Paper2MdError> {
    let md_path = tokio::fs::canonicalize(md_path)
        .await
        .map_err(|_| Paper2MdError::FileNotFound {
            path: md_path.to_path_buf(),
        })?;
    let doc_dir = md_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let img_dir = img_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| doc_dir.join("img"));

    let prompt = cleanup_prompt(&md_path, &img_dir);
    info!(
        "Running cleanup agent '{}' on {}",
        config.command,
        md_path.display()
    );

    let mut cmd = Command::new(&config.command);
    cmd.args(config.args(&prompt))
        .current_dir(&doc_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(if config.verbose {
            Stdio::inherit()
        } else {
            Stdio::piped()
        })
        .kill_on_drop(true);

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(Paper2MdError::AgentNotInstalled {
                command: config.command.clone(),
            });
        }
        Err(e) => {
            warn!("Cleanup agent could not be started: {}", e);
            return Ok(None);
        }
    };

    // Dropping the future on timeout drops the child, which kills it.
    let timeout = Duration::from_secs(config.timeout_secs);
    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            warn!("Cleanup agent failed while running: {}", e);
            return Ok(None);
        }
        Err(_) => {
            warn!(
                "Cleanup agent timed out after {}s; keeping deterministic output",
                config.timeout_secs
            );
            return Ok(None);
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(
            "Cleanup agent exited with {}: {}",
            output.status,
            stderr.trim()
        );
        return Ok(None);
    }

    let summary = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if summary.is_empty() {
        warn!("Cleanup agent produced no output");
        return Ok(None);
    }
    debug!(bytes = summary.len(), "cleanup agent summary");
    Ok(Some(summary))
}
