//! Execution engine
//!
//! Drives one resolved chain at a time. A step that is `waitable` pauses the
//! engine until [`ExecutionEngine::advance`] supplies its input; a step whose
//! report asks to continue pauses again on the same step; a pipe report
//! replaces the current step with a freshly resolved one.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use uuid::Uuid;

use super::report::PipeTarget;
use super::runner::{RunOutcome, StepRunner};
use crate::error::Error;
use crate::models::{ControlSignal, Outcome, ResolvedChain, StepConfig};
use crate::resolver::Resolver;

/// Lifecycle of an engine session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No chain installed
    Idle,
    /// Inside the drive loop
    Running,
    /// Paused on a waitable step
    AwaitingInput,
    /// Completed, failed or cancelled; the session is discarded
    Finished,
}

/// Shared cancellation flag, observed between steps
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Single-session state machine over a resolved chain
pub struct ExecutionEngine {
    id: Uuid,
    chain_name: String,
    resolver: Arc<Resolver>,
    runner: Arc<dyn StepRunner>,
    allow_restricted: bool,
    pending: VecDeque<StepConfig>,
    current: Option<StepConfig>,
    /// A step is in hand and must not be replaced by the next dequeue
    resuming: bool,
    cancel: CancelHandle,
    state: EngineState,
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("id", &self.id)
            .field("chain_name", &self.chain_name)
            .field("state", &self.state)
            .field("pending", &self.pending.len())
            .field("current", &self.current.as_ref().map(|s| &s.name))
            .finish()
    }
}

impl ExecutionEngine {
    /// Create an idle engine; pipe targets are resolved with `allow_restricted`
    pub fn new(resolver: Arc<Resolver>, runner: Arc<dyn StepRunner>, allow_restricted: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            chain_name: String::new(),
            resolver,
            runner,
            allow_restricted,
            pending: VecDeque::new(),
            current: None,
            resuming: false,
            cancel: CancelHandle::default(),
            state: EngineState::Idle,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn chain_name(&self) -> &str {
        &self.chain_name
    }

    /// Step currently in hand, if any
    pub fn current_step(&self) -> Option<&StepConfig> {
        self.current.as_ref()
    }

    /// Steps not yet dequeued
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Handle that cancels this engine from outside
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn request_cancel(&self) {
        debug!(session = %self.id, "Cancellation requested for '{}'", self.chain_name);
        self.cancel.cancel();
    }

    /// Install `chain` and drive it until it pauses or finishes
    pub async fn begin(&mut self, chain: ResolvedChain) -> Outcome {
        info!(
            session = %self.id,
            "Beginning chain '{}' with {} step(s)",
            chain.name,
            chain.len()
        );
        self.chain_name = chain.name.clone();
        self.pending = chain.into_queue();
        self.current = None;
        self.resuming = false;
        self.state = EngineState::Running;
        self.drive().await
    }

    /// Feed `input` to the paused step and resume
    pub async fn advance(&mut self, input: &str) -> Outcome {
        if self.state != EngineState::AwaitingInput {
            warn!(
                session = %self.id,
                "Input for '{}' ignored in state {:?}",
                self.chain_name,
                self.state
            );
            return Outcome::failed(Error::EngineNotAwaitingInput);
        }

        if let Some(step) = self.current.as_mut() {
            step.preset_input = input.to_string();
            step.waitable = false;
        }
        self.state = EngineState::Running;
        self.drive().await
    }

    /// Candidates from the current step's incremental query, empty when unsupported
    pub async fn suggest_for_current_step(&self, partial: &str) -> Vec<String> {
        let Some(step) = self.current.as_ref() else {
            return Vec::new();
        };
        if !step.is_associatable() {
            return Vec::new();
        }

        match self.runner.query(step, partial).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(session = %self.id, "Suggestion query for '{}' failed: {}", step.name, e);
                Vec::new()
            }
        }
    }

    async fn drive(&mut self) -> Outcome {
        loop {
            if self.cancel.is_cancelled() {
                info!(session = %self.id, "Chain '{}' cancelled", self.chain_name);
                return self.finish(ControlSignal::deactivate(), None);
            }

            if !self.resuming {
                let Some(next) = self.pending.pop_front() else {
                    info!(session = %self.id, "Chain '{}' completed", self.chain_name);
                    return self.finish(ControlSignal::close(), None);
                };
                self.current = Some(next);
                self.resuming = true;
            }

            let Some(step) = self.current.clone() else {
                self.resuming = false;
                continue;
            };

            if step.waitable {
                debug!(session = %self.id, "Step '{}' waiting for input", step.name);
                self.state = EngineState::AwaitingInput;
                return Outcome::new(ControlSignal::stay());
            }

            debug!(
                session = %self.id,
                "Invoking '{}' with input {:?}",
                step.name,
                step.preset_input
            );
            let result = self.runner.run(&step, &step.preset_input).await;

            let report = match result {
                Err(err) => {
                    error!(session = %self.id, "Step '{}' could not run: {}", step.name, err);
                    return self.finish(ControlSignal::close(), Some(err));
                }
                Ok(RunOutcome::Failed { reason, report }) => {
                    let reason = match report {
                        Some(r) if r.success && step.is_associatable() => {
                            format!("contradictory result, payload reports success but {}", reason)
                        }
                        _ => reason,
                    };
                    error!(session = %self.id, "Step '{}' failed: {}", step.name, reason);
                    return self.finish(
                        ControlSignal::close(),
                        Some(Error::ProcessRuntimeFailure {
                            command: step.name.clone(),
                            reason,
                        }),
                    );
                }
                Ok(_) if !step.is_associatable() => {
                    self.resuming = false;
                    continue;
                }
                Ok(RunOutcome::Launched) => {
                    return self.finish(
                        ControlSignal::close(),
                        Some(Error::DecodeFailure {
                            command: step.name.clone(),
                            reason: "step produced no report".to_string(),
                        }),
                    );
                }
                Ok(RunOutcome::Reported(report)) => report,
            };

            if report.keep_waiting {
                debug!(session = %self.id, "Step '{}' asked for more input", step.name);
                if let Some(current) = self.current.as_mut() {
                    current.waitable = true;
                }
                continue;
            }
            self.resuming = false;

            if report.pipe {
                match self.pipe_target(report.info) {
                    Ok(next) => {
                        info!(
                            session = %self.id,
                            "Step '{}' piped into '{}'",
                            step.name,
                            next.name
                        );
                        self.current = Some(next);
                        self.resuming = true;
                    }
                    Err(err) => {
                        error!(session = %self.id, "Pipe from '{}' failed: {}", step.name, err);
                        return self.finish(ControlSignal::close(), Some(err));
                    }
                }
            }
        }
    }

    /// Resolve a pipe request into the single step that replaces the current one
    fn pipe_target(&self, target: Option<PipeTarget>) -> crate::error::Result<StepConfig> {
        let target = target.ok_or_else(|| Error::PipeTargetInvalid {
            name: String::new(),
            steps: 0,
        })?;

        let chain = self.resolver.resolve(&target.name, self.allow_restricted)?;
        if chain.len() != 1 {
            return Err(Error::PipeTargetInvalid {
                name: target.name,
                steps: chain.len(),
            });
        }

        let mut step = chain
            .into_queue()
            .pop_front()
            .ok_or_else(|| Error::PipeTargetInvalid {
                name: target.name.clone(),
                steps: 0,
            })?;
        step.preset_input = target.input;
        step.waitable = false;
        Ok(step)
    }

    fn finish(&mut self, signal: ControlSignal, diagnostic: Option<Error>) -> Outcome {
        self.state = EngineState::Finished;
        self.pending.clear();
        self.current = None;
        self.resuming = false;
        Outcome { signal, diagnostic }
    }
}
