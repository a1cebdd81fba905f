//! Events emitted by the annealing loop.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How a trial changed the objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TrialClass {
    /// The objective decreased.
    Improved,
    /// The objective did not change.
    Equivalent,
    /// The objective increased (or is not comparable).
    Degraded,
}

impl TrialClass {
    pub fn from_delta(delta: f64) -> Self {
        if delta < 0.0 {
            TrialClass::Improved
        } else if delta == 0.0 {
            TrialClass::Equivalent
        } else {
            TrialClass::Degraded
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TrialClass::Improved => "Improved",
            TrialClass::Equivalent => "Equal",
            TrialClass::Degraded => "Degraded",
        }
    }
}

/// Whether a trial was kept or reverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Verdict {
    Keep,
    Revert,
}

impl Verdict {
    pub fn is_keep(self) -> bool {
        matches!(self, Verdict::Keep)
    }

    pub fn label(self) -> &'static str {
        match self {
            Verdict::Keep => "Keep",
            Verdict::Revert => "Revert",
        }
    }
}

/// Start of a temperature phase.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PhaseStart {
    /// 1-based phase index.
    pub phase: usize,
    pub temperature: f64,
}

/// One perturb/evaluate/accept cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrialEvent {
    pub phase: usize,
    /// 1-based trial index within the phase.
    pub trial: usize,
    /// Running count of kept trials of the same class in this phase, for
    /// kept trials only.
    pub class_index: Option<usize>,
    pub class: TrialClass,
    pub verdict: Verdict,
    /// Objective right after the perturbation, before any revert.
    pub objective: f64,
    pub previous_objective: f64,
    pub delta: f64,
    pub acceptance_probability: f64,
}

/// Totals of one temperature phase.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PhaseSummary {
    pub phase: usize,
    pub temperature: f64,
    /// Objective at the end of the phase.
    pub objective: f64,
    pub trials: usize,
    pub improved: usize,
    pub degraded: usize,
    pub equivalent: usize,
    pub reverted: usize,
    /// Trials run so far over the whole search.
    pub total_trials: usize,
}

/// Outcome of a full run as reported to a monitor.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RunSummary {
    /// The entry conditions already satisfied the termination policy.
    NoSearchNeeded,
    /// Summaries of every phase, in order.
    Phases(Vec<PhaseSummary>),
}

impl RunSummary {
    pub fn phases(&self) -> &[PhaseSummary] {
        match self {
            RunSummary::NoSearchNeeded => &[],
            RunSummary::Phases(phases) => phases,
        }
    }
}
