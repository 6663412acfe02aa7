//! Dispatcher
//!
//! The long-lived entry point a front end talks to. It holds exactly one
//! authoritative role: the idle search role, backed by the resolver, or an
//! active chain, backed by an [`ExecutionEngine`]. Selecting a name in search
//! resolves it and starts the chain in a background task; the first outcome
//! of that task comes back through a one-shot channel that the front end
//! drains with [`Dispatcher::poll_background`] or
//! [`Dispatcher::wait_background`].

use std::sync::Arc;

use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio::sync::Mutex;

use crate::error::Error;
use crate::execution::{CancelHandle, ExecutionEngine, StepRunner};
use crate::models::{ControlSignal, Directive, Outcome};
use crate::resolver::Resolver;

/// Token that flips restricted visibility when selected in search
pub const DEFAULT_TOGGLE_TOKEN: &str = "nsfw";

/// The running chain while it is authoritative
struct ActiveChain {
    name: String,
    engine: Arc<Mutex<ExecutionEngine>>,
    cancel: CancelHandle,
}

enum Role {
    Search,
    Active(ActiveChain),
}

pub struct Dispatcher {
    resolver: Arc<Resolver>,
    runner: Arc<dyn StepRunner>,
    allow_restricted: bool,
    toggle_token: String,
    role: Role,
    pending_run: Option<oneshot::Receiver<Outcome>>,
}

impl Dispatcher {
    pub fn new(resolver: Arc<Resolver>, runner: Arc<dyn StepRunner>) -> Self {
        Self {
            resolver,
            runner,
            allow_restricted: false,
            toggle_token: DEFAULT_TOGGLE_TOKEN.to_string(),
            role: Role::Search,
            pending_run: None,
        }
    }

    /// Builder-style toggle token
    pub fn with_toggle_token(mut self, token: impl Into<String>) -> Self {
        self.toggle_token = token.into();
        self
    }

    /// Builder-style initial visibility
    pub fn with_allow_restricted(mut self, allow: bool) -> Self {
        self.allow_restricted = allow;
        self
    }

    pub fn allow_restricted(&self) -> bool {
        self.allow_restricted
    }

    /// True while an active chain is authoritative
    pub fn is_busy(&self) -> bool {
        matches!(self.role, Role::Active(_))
    }

    /// Name of the active chain, if any
    pub fn active_chain(&self) -> Option<&str> {
        match &self.role {
            Role::Active(active) => Some(active.name.as_str()),
            Role::Search => None,
        }
    }

    /// Suggestions for the current input
    pub async fn on_text_changed(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        let suggestions = match &self.role {
            Role::Search => self
                .resolver
                .suggest(text, self.allow_restricted)
                .unwrap_or_else(|e| {
                    warn!("Suggestion lookup for '{}' failed: {}", text, e);
                    Vec::new()
                }),
            Role::Active(active) => match active.engine.try_lock() {
                Ok(engine) => engine.suggest_for_current_step(text).await,
                Err(_) => {
                    trace!("Chain '{}' busy, no suggestions", active.name);
                    Vec::new()
                }
            },
        };

        // Echoing back exactly what was typed adds nothing
        if suggestions.len() == 1 && suggestions[0] == text {
            return Vec::new();
        }
        suggestions
    }

    /// Handle a selection in whichever role is authoritative
    pub async fn on_select(&mut self, text: &str) -> Outcome {
        if self.is_busy() {
            self.select_in_active(text).await
        } else {
            self.select_in_search(text).await
        }
    }

    async fn select_in_search(&mut self, text: &str) -> Outcome {
        if text == self.toggle_token {
            self.allow_restricted = !self.allow_restricted;
            info!("Restricted commands {}", if self.allow_restricted { "shown" } else { "hidden" });
            return ControlSignal::stay().into();
        }

        let chain = match self.resolver.resolve(text, self.allow_restricted) {
            Ok(chain) => chain,
            Err(e) => {
                warn!("Cannot start '{}': {}", text, e);
                return Outcome::failed(e);
            }
        };

        match self.resolver.catalog().increment_usage(&chain.name) {
            Ok(true) => {}
            Ok(false) => debug!("No usage counter for '{}'", chain.name),
            Err(e) => warn!("Failed to record usage of '{}': {}", chain.name, e),
        }

        let engine = ExecutionEngine::new(
            self.resolver.clone(),
            self.runner.clone(),
            self.allow_restricted,
        );
        let cancel = engine.cancel_handle();
        let engine = Arc::new(Mutex::new(engine));

        // Lock before spawning so a foreground advance cannot overtake begin
        let mut guard = engine.clone().lock_owned().await;
        let (tx, rx) = oneshot::channel();
        let name = chain.name.clone();
        tokio::spawn(async move {
            let outcome = guard.begin(chain).await;
            drop(guard);
            if tx.send(outcome).is_err() {
                debug!("Background result dropped; dispatcher was reset");
            }
        });

        info!("Chain '{}' is now active", name);
        self.pending_run = Some(rx);
        self.role = Role::Active(ActiveChain {
            name: name.clone(),
            engine,
            cancel,
        });
        ControlSignal::switch_to(name).into()
    }

    async fn select_in_active(&mut self, text: &str) -> Outcome {
        if self.pending_run.is_some() {
            match self.poll_background() {
                Some(outcome) if !self.is_busy() => return outcome,
                Some(_) => {}
                None => {
                    warn!("Input ignored: chain is still running its first steps");
                    return ControlSignal::stay().into();
                }
            }
        }

        let Role::Active(active) = &self.role else {
            return Outcome::failed(Error::EngineNotAwaitingInput);
        };
        let engine = active.engine.clone();
        let outcome = engine.lock().await.advance(text).await;

        match outcome.directive() {
            Directive::Continue => outcome,
            Directive::Terminate => {
                self.revert_to_search();
                outcome
            }
            Directive::HandOff => {
                self.revert_to_search();
                Outcome {
                    signal: ControlSignal::switch_to(""),
                    diagnostic: outcome.diagnostic,
                }
            }
        }
    }

    /// Outcome of the background run if it has arrived
    pub fn poll_background(&mut self) -> Option<Outcome> {
        let rx = self.pending_run.as_mut()?;
        let outcome = match rx.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Closed) => Outcome::failed(Error::BackgroundTaskLost),
        };
        self.pending_run = None;
        Some(self.apply_background(outcome))
    }

    /// Wait for the background run; `None` when none is pending
    pub async fn wait_background(&mut self) -> Option<Outcome> {
        let rx = self.pending_run.take()?;
        let outcome = rx
            .await
            .unwrap_or_else(|_| Outcome::failed(Error::BackgroundTaskLost));
        Some(self.apply_background(outcome))
    }

    fn apply_background(&mut self, outcome: Outcome) -> Outcome {
        match outcome.directive() {
            Directive::Continue => outcome,
            Directive::Terminate => {
                self.revert_to_search();
                Outcome {
                    signal: ControlSignal::close(),
                    diagnostic: outcome.diagnostic,
                }
            }
            Directive::HandOff => {
                self.revert_to_search();
                Outcome {
                    signal: ControlSignal::deactivate(),
                    diagnostic: outcome.diagnostic,
                }
            }
        }
    }

    /// Cancel any active chain and return to search
    pub fn reset(&mut self) {
        if let Role::Active(active) = &self.role {
            info!("Resetting; cancelling chain '{}'", active.name);
            active.cancel.cancel();
        }
        self.pending_run = None;
        self.role = Role::Search;
    }

    fn revert_to_search(&mut self) {
        if let Role::Active(active) = &self.role {
            debug!("Chain '{}' released", active.name);
        }
        self.role = Role::Search;
    }
}
