//! Scripted Step Runner
//!
//! Records every invocation and answers from a per-step script. When a
//! step's script runs out, plain steps report `Launched` and associatable
//! steps report a clean success.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use launchline::execution::{PipeTarget, RunOutcome, RunReport, StepRunner};
use launchline::models::StepConfig;
use launchline::{Error, Result};

enum Scripted {
    Outcome(RunOutcome),
    LaunchFailure,
}

#[derive(Default)]
pub struct ScriptedRunner {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    suggestions: Mutex<HashMap<String, Vec<String>>>,
    runs: Mutex<Vec<(String, String)>>,
    queries: Mutex<Vec<(String, String)>>,
    delay: Option<Duration>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every run
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Queue the next outcome for `step`
    pub fn script(&self, step: &str, outcome: RunOutcome) {
        self.push(step, Scripted::Outcome(outcome));
    }

    /// Make the next run of `step` fail to launch
    pub fn fail_launch(&self, step: &str) {
        self.push(step, Scripted::LaunchFailure);
    }

    /// Candidates returned by queries against `step`
    pub fn set_suggestions(&self, step: &str, candidates: &[&str]) {
        self.suggestions.lock().unwrap().insert(
            step.to_string(),
            candidates.iter().map(|s| s.to_string()).collect(),
        );
    }

    /// `(step, input)` for every run, in order
    pub fn runs(&self) -> Vec<(String, String)> {
        self.runs.lock().unwrap().clone()
    }

    pub fn run_count(&self) -> usize {
        self.runs.lock().unwrap().len()
    }

    /// Step names of every run, in order
    pub fn run_names(&self) -> Vec<String> {
        self.runs().into_iter().map(|(name, _)| name).collect()
    }

    pub fn queries(&self) -> Vec<(String, String)> {
        self.queries.lock().unwrap().clone()
    }

    fn push(&self, step: &str, scripted: Scripted) {
        self.scripts
            .lock()
            .unwrap()
            .entry(step.to_string())
            .or_default()
            .push_back(scripted);
    }
}

#[async_trait::async_trait]
impl StepRunner for ScriptedRunner {
    async fn run(&self, step: &StepConfig, input: &str) -> Result<RunOutcome> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.runs
            .lock()
            .unwrap()
            .push((step.name.clone(), input.to_string()));

        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&step.name)
            .and_then(|queue| queue.pop_front());

        match next {
            Some(Scripted::Outcome(outcome)) => Ok(outcome),
            Some(Scripted::LaunchFailure) => Err(Error::ProcessLaunchFailure {
                command: step.name.clone(),
                reason: "scripted launch failure".to_string(),
            }),
            None if step.is_associatable() => Ok(reported(false, true)),
            None => Ok(RunOutcome::Launched),
        }
    }

    async fn query(&self, step: &StepConfig, partial: &str) -> Result<Vec<String>> {
        self.queries
            .lock()
            .unwrap()
            .push((step.name.clone(), partial.to_string()));
        Ok(self
            .suggestions
            .lock()
            .unwrap()
            .get(&step.name)
            .cloned()
            .unwrap_or_default())
    }
}

/// Clean report with the given `continue` and `success` flags
pub fn reported(keep_waiting: bool, success: bool) -> RunOutcome {
    RunOutcome::Reported(RunReport {
        keep_waiting,
        success,
        pipe: false,
        info: None,
    })
}

/// Clean report asking to pipe into `name` with `input`
pub fn pipe_to(name: &str, input: &str) -> RunOutcome {
    RunOutcome::Reported(RunReport {
        keep_waiting: false,
        success: true,
        pipe: true,
        info: Some(PipeTarget {
            name: name.to_string(),
            input: input.to_string(),
        }),
    })
}
