//! Control Signals
//!
//! The two-level protocol value passed from the engine to the dispatcher and
//! from the dispatcher to the UI layer.

use std::fmt;

use crate::error::Error;

/// What the caller should do with the authoritative role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Keep the current role
    Continue,
    /// Swap roles
    HandOff,
    /// Stop and fall back to search
    Terminate,
}

/// How the UI should change its view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    /// Clear the input, keep the chain label
    StayOnSameChain,
    /// Show the named chain as active
    SwitchToChain(String),
    /// Hide the chain label and return to search
    Deactivate,
    /// Hide the input box
    Close,
}

/// Directive plus UI action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlSignal {
    pub directive: Directive,
    pub action: UiAction,
}

impl ControlSignal {
    /// `(Continue, StayOnSameChain)`
    pub fn stay() -> Self {
        Self {
            directive: Directive::Continue,
            action: UiAction::StayOnSameChain,
        }
    }

    /// `(HandOff, SwitchToChain(name))`
    pub fn switch_to(name: impl Into<String>) -> Self {
        Self {
            directive: Directive::HandOff,
            action: UiAction::SwitchToChain(name.into()),
        }
    }

    /// `(HandOff, Deactivate)`
    pub fn deactivate() -> Self {
        Self {
            directive: Directive::HandOff,
            action: UiAction::Deactivate,
        }
    }

    /// `(Terminate, Close)`
    pub fn close() -> Self {
        Self {
            directive: Directive::Terminate,
            action: UiAction::Close,
        }
    }
}

impl fmt::Display for ControlSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.action {
            UiAction::StayOnSameChain => write!(f, "{:?}: stay", self.directive),
            UiAction::SwitchToChain(name) => write!(f, "{:?}: switch to '{}'", self.directive, name),
            UiAction::Deactivate => write!(f, "{:?}: deactivate", self.directive),
            UiAction::Close => write!(f, "{:?}: close", self.directive),
        }
    }
}

/// A control signal with the failure that produced it, if any
#[derive(Debug)]
pub struct Outcome {
    pub signal: ControlSignal,
    pub diagnostic: Option<Error>,
}

impl Outcome {
    /// Outcome without a diagnostic
    pub fn new(signal: ControlSignal) -> Self {
        Self {
            signal,
            diagnostic: None,
        }
    }

    /// `(Terminate, Close)` carrying the failure
    pub fn failed(err: Error) -> Self {
        Self {
            signal: ControlSignal::close(),
            diagnostic: Some(err),
        }
    }

    /// Outer directive
    pub fn directive(&self) -> Directive {
        self.signal.directive
    }

    /// Inner UI action
    pub fn action(&self) -> &UiAction {
        &self.signal.action
    }

    /// Whether the outcome reports a failure
    pub fn is_failure(&self) -> bool {
        self.diagnostic.is_some()
    }
}

impl From<ControlSignal> for Outcome {
    fn from(signal: ControlSignal) -> Self {
        Self::new(signal)
    }
}
