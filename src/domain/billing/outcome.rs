//! Explicit outcomes for every side effect the dispatcher attempts.
//!
//! Downstream failures never propagate as errors once an event is routed;
//! they are collected here and logged as one structured record per event.

use std::fmt;

use super::stripe_event::EventKind;

/// A side effect performed while handling one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectStep {
    ApplyUpdate,
    ApplyCancellation,
    FetchSubscription,
    MarkCanceled,
    NotifyUser,
    CancelAtProvider,
    Ignore,
    RecordProcessed,
}

impl EffectStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            EffectStep::ApplyUpdate => "apply_update",
            EffectStep::ApplyCancellation => "apply_cancellation",
            EffectStep::FetchSubscription => "fetch_subscription",
            EffectStep::MarkCanceled => "mark_canceled",
            EffectStep::NotifyUser => "notify_user",
            EffectStep::CancelAtProvider => "cancel_at_provider",
            EffectStep::Ignore => "ignore",
            EffectStep::RecordProcessed => "record_processed",
        }
    }

    /// Bookkeeping and reads do not change user-visible state.
    pub fn is_state_change(&self) -> bool {
        !matches!(
            self,
            EffectStep::FetchSubscription | EffectStep::RecordProcessed
        )
    }
}

/// How a side effect ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectOutcome {
    Succeeded,
    /// Deliberately not performed (no user, already canceled, wrong payload).
    Skipped(String),
    Failed(String),
    /// The outbound call exceeded its deadline.
    TimedOut,
}

impl EffectOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        EffectOutcome::Skipped(reason.into())
    }

    pub fn failed(reason: impl fmt::Display) -> Self {
        EffectOutcome::Failed(reason.to_string())
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, EffectOutcome::Failed(_) | EffectOutcome::TimedOut)
    }
}

impl fmt::Display for EffectOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectOutcome::Succeeded => write!(f, "ok"),
            EffectOutcome::Skipped(reason) => write!(f, "skipped ({})", reason),
            EffectOutcome::Failed(reason) => write!(f, "failed ({})", reason),
            EffectOutcome::TimedOut => write!(f, "timed out"),
        }
    }
}

/// One attempted side effect and its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideEffect {
    pub step: EffectStep,
    pub outcome: EffectOutcome,
}

/// Aggregate of everything that happened while dispatching one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub event_id: String,
    pub kind: EventKind,
    pub effects: Vec<SideEffect>,
}

impl DispatchReport {
    pub fn new(event_id: impl Into<String>, kind: EventKind) -> Self {
        Self {
            event_id: event_id.into(),
            kind,
            effects: Vec::new(),
        }
    }

    pub fn push(&mut self, step: EffectStep, outcome: EffectOutcome) {
        self.effects.push(SideEffect { step, outcome });
    }

    /// Outcome of the first occurrence of `step`, if it was attempted.
    pub fn outcome_of(&self, step: EffectStep) -> Option<&EffectOutcome> {
        self.effects
            .iter()
            .find(|effect| effect.step == step)
            .map(|effect| &effect.outcome)
    }

    pub fn has_failures(&self) -> bool {
        self.effects.iter().any(|effect| effect.outcome.is_failure())
    }

    /// True when at least one state-changing side effect ran to completion.
    pub fn changed_anything(&self) -> bool {
        self.effects.iter().any(|effect| {
            effect.step.is_state_change() && effect.outcome == EffectOutcome::Succeeded
        })
    }

    /// Compact `step=outcome` list for the structured log line.
    pub fn summary(&self) -> String {
        self.effects
            .iter()
            .map(|effect| format!("{}={}", effect.step.as_str(), effect.outcome))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
