//! External process adapter
//!
//! A step is launched as `executor_path target_path <args>` when it has an
//! executor, otherwise as `target_path <args>`. Associatable steps receive
//! `-I <input>` for suggestion queries and `-S <input>` for runs and answer
//! with a JSON report on stdout. Other steps get the raw input split on
//! whitespace and are launched detached.

use std::collections::HashMap;
use std::process::Stdio;

use tokio::process::Command;

use super::report::{self, RunReport, SuggestionReport};
use crate::error::{Error, Result};
use crate::models::StepConfig;

/// Which flag an associatable step is invoked with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationMode {
    /// `-I`: incremental suggestion query
    Query,
    /// `-S`: selection / run
    Run,
}

impl InvocationMode {
    pub fn flag(&self) -> &'static str {
        match self {
            InvocationMode::Query => "-I",
            InvocationMode::Run => "-S",
        }
    }
}

/// What a run invocation produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Non-associatable step spawned detached
    Launched,
    /// Associatable step exited cleanly with a decoded report
    Reported(RunReport),
    /// Associatable step wrote to stderr or exited non-zero; `report` holds
    /// whatever stdout still decoded to
    Failed {
        reason: String,
        report: Option<RunReport>,
    },
}

/// Invokes steps on behalf of the execution engine
#[async_trait::async_trait]
pub trait StepRunner: Send + Sync {
    /// Run `step` with `input`
    async fn run(&self, step: &StepConfig, input: &str) -> Result<RunOutcome>;

    /// Ask an associatable step for candidates matching `partial`
    async fn query(&self, step: &StepConfig, partial: &str) -> Result<Vec<String>>;
}

/// [`StepRunner`] backed by real child processes
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    env_vars: HashMap<String, String>,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an environment variable for every launched step
    pub fn set_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.env_vars.insert(key.into(), value.into());
    }

    fn command(&self, step: &StepConfig, args: Vec<String>) -> Result<Command> {
        if step.target_path.trim().is_empty() {
            return Err(launch_failure(step, "no target path configured"));
        }

        let mut command = if step.has_executor {
            let executor = step
                .executor_path
                .as_deref()
                .filter(|p| !p.trim().is_empty())
                .ok_or_else(|| launch_failure(step, "executor enabled but no executor path set"))?;
            let mut command = Command::new(executor);
            command.arg(&step.target_path);
            command
        } else {
            Command::new(&step.target_path)
        };

        command.args(args).envs(&self.env_vars);
        Ok(command)
    }

    /// Run to completion capturing both streams; `Err(reason)` on transport failure
    async fn capture(
        &self,
        step: &StepConfig,
        mut command: Command,
    ) -> Result<(String, std::result::Result<(), String>)> {
        let output = command
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| launch_failure(step, &e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);

        let transport = if !stderr.is_empty() {
            Err(format!("stderr: {}", stderr.trim()))
        } else if !output.status.success() {
            Err(format!("exited with {}", output.status))
        } else {
            Ok(())
        };

        Ok((stdout, transport))
    }
}

#[async_trait::async_trait]
impl StepRunner for ProcessRunner {
    async fn run(&self, step: &StepConfig, input: &str) -> Result<RunOutcome> {
        let command = self.command(step, arguments(step, InvocationMode::Run, input))?;

        if !step.is_associatable() {
            let mut command = command;
            let child = command
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .map_err(|e| launch_failure(step, &e.to_string()))?;
            debug!("Launched '{}' detached (pid {:?})", step.name, child.id());
            return Ok(RunOutcome::Launched);
        }

        let (stdout, transport) = self.capture(step, command).await?;
        match transport {
            Ok(()) => RunReport::decode(&stdout)
                .map(RunOutcome::Reported)
                .map_err(|e| e.into_error(&step.name)),
            Err(reason) => {
                warn!("Step '{}' failed: {}", step.name, reason);
                Ok(RunOutcome::Failed {
                    reason,
                    report: report::decode::<RunReport>(&stdout).ok(),
                })
            }
        }
    }

    async fn query(&self, step: &StepConfig, partial: &str) -> Result<Vec<String>> {
        if !step.is_associatable() {
            return Ok(Vec::new());
        }

        let command = self.command(step, arguments(step, InvocationMode::Query, partial))?;
        let (stdout, transport) = self.capture(step, command).await?;
        transport.map_err(|reason| Error::ProcessRuntimeFailure {
            command: step.name.clone(),
            reason,
        })?;

        SuggestionReport::decode(&stdout)
            .map(|report| report.result)
            .map_err(|e| e.into_error(&step.name))
    }
}

/// Arguments appended after the target for one invocation
pub fn arguments(step: &StepConfig, mode: InvocationMode, input: &str) -> Vec<String> {
    if input.is_empty() {
        return Vec::new();
    }
    if step.is_associatable() {
        vec![mode.flag().to_string(), input.to_string()]
    } else {
        input.split_whitespace().map(str::to_string).collect()
    }
}

fn launch_failure(step: &StepConfig, reason: &str) -> Error {
    Error::ProcessLaunchFailure {
        command: step.name.clone(),
        reason: reason.to_string(),
    }
}
