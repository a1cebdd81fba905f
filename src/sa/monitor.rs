//! Observers of an annealing run.
//!
//! The annealing loop reports structured events to an [`AnnealingMonitor`].
//! [`LogMonitor`] renders them through the `log` facade, [`RecordingMonitor`]
//! keeps them in memory, and [`NoOpMonitor`] discards them.

use super::types::{PhaseStart, PhaseSummary, RunSummary, TrialClass, TrialEvent};

/// Receiver of annealing events. Every method defaults to a no-op.
pub trait AnnealingMonitor {
    /// Called after the temperature of a new phase is set.
    fn on_phase_start(&mut self, _event: &PhaseStart) {}

    /// Called after every trial is classified, before a revert.
    fn on_trial(&mut self, _event: &TrialEvent) {}

    /// Called when a phase ends.
    fn on_phase_summary(&mut self, _summary: &PhaseSummary) {}

    /// Called once when the run ends.
    fn on_run_summary(&mut self, _summary: &RunSummary) {}

    /// Returns the name of the monitor.
    fn name(&self) -> &str;
}

impl std::fmt::Debug for dyn AnnealingMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AnnealingMonitor({})", self.name())
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMonitor;

impl AnnealingMonitor for NoOpMonitor {
    fn name(&self) -> &str {
        "NoOpMonitor"
    }
}

/// Keeps every event of the runs it observes.
#[derive(Debug, Clone, Default)]
pub struct RecordingMonitor {
    pub phase_starts: Vec<PhaseStart>,
    pub trials: Vec<TrialEvent>,
    pub phase_summaries: Vec<PhaseSummary>,
    pub run_summaries: Vec<RunSummary>,
}

impl RecordingMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent run summary, if a run finished.
    pub fn last_run(&self) -> Option<&RunSummary> {
        self.run_summaries.last()
    }
}

impl AnnealingMonitor for RecordingMonitor {
    fn on_phase_start(&mut self, event: &PhaseStart) {
        self.phase_starts.push(*event);
    }

    fn on_trial(&mut self, event: &TrialEvent) {
        self.trials.push(*event);
    }

    fn on_phase_summary(&mut self, summary: &PhaseSummary) {
        self.phase_summaries.push(*summary);
    }

    fn on_run_summary(&mut self, summary: &RunSummary) {
        self.run_summaries.push(summary.clone());
    }

    fn name(&self) -> &str {
        "RecordingMonitor"
    }
}

/// Writes annealing progress through the `log` facade.
///
/// Run summaries go to `info`. With `detailed` set, phase headers, trial
/// rows and phase summaries go to `debug`, with the trial column headings
/// repeated every `heading_interval` trials.
#[derive(Debug, Clone)]
pub struct LogMonitor {
    detailed: bool,
    heading_interval: usize,
}

impl Default for LogMonitor {
    fn default() -> Self {
        Self {
            detailed: false,
            heading_interval: 40,
        }
    }
}

const RULE: &str = "-------------------------------------------------------------------------------------------------------";

impl LogMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn detailed() -> Self {
        Self {
            detailed: true,
            ..Self::default()
        }
    }

    pub fn with_heading_interval(mut self, interval: usize) -> Self {
        self.heading_interval = interval.max(1);
        self
    }

    fn trial_headings() -> String {
        format!(
            "{:>7} {:>10} {:>10} {:>10} {:>10} {:>9} {:>15} {:>15} {:>15} {:>15}",
            "Trial #",
            "Improved #",
            "Degraded #",
            "Equiv #",
            "Result",
            "Verdict",
            "ObjFunc",
            "ObjFunc_Prev",
            "ObjFunc_Delta",
            "Probability"
        )
    }

    fn summary_headings() -> String {
        format!(
            "{:>5} {:>15} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>15}",
            "Index",
            "ObjFunc",
            "# Total",
            "# Trials",
            "# Improved",
            "# Degraded",
            "# Equiv",
            "# Reverted",
            "Temperature"
        )
    }

    fn summary_row(s: &PhaseSummary) -> String {
        format!(
            "{:>5} {:>15.6} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>15.6}",
            s.phase,
            s.objective,
            s.total_trials,
            s.trials,
            s.improved,
            s.degraded,
            s.equivalent,
            s.reverted,
            s.temperature
        )
    }
}

impl AnnealingMonitor for LogMonitor {
    fn on_phase_start(&mut self, event: &PhaseStart) {
        if self.detailed {
            log::debug!(
                "{:>3}. Temperature = {:>9.6}",
                event.phase,
                event.temperature
            );
        }
    }

    fn on_trial(&mut self, event: &TrialEvent) {
        if !self.detailed {
            return;
        }
        if event.trial.saturating_sub(1) % self.heading_interval == 0 {
            log::debug!("{}", Self::trial_headings());
        }

        let index = event
            .class_index
            .map(|i| i.to_string())
            .unwrap_or_default();
        let (improved, degraded, equivalent) = match event.class {
            TrialClass::Improved => (index.as_str(), "", ""),
            TrialClass::Degraded => ("", index.as_str(), ""),
            TrialClass::Equivalent => ("", "", index.as_str()),
        };
        log::debug!(
            "{:>7} {:>10} {:>10} {:>10} {:>10} {:>9} {:>15.6} {:>15.6} {:>15.6} {:>15.6e}",
            event.trial,
            improved,
            degraded,
            equivalent,
            event.class.label(),
            event.verdict.label(),
            event.objective,
            event.previous_objective,
            event.delta,
            event.acceptance_probability
        );
    }

    fn on_phase_summary(&mut self, summary: &PhaseSummary) {
        if self.detailed {
            log::debug!(
                "phase {} summary: objective {:.6}, improved {}, degraded {}, equivalent {}, reverted {}, trials {}, total trials {}",
                summary.phase,
                summary.objective,
                summary.improved,
                summary.degraded,
                summary.equivalent,
                summary.reverted,
                summary.trials,
                summary.total_trials
            );
        }
    }

    fn on_run_summary(&mut self, summary: &RunSummary) {
        match summary {
            RunSummary::NoSearchNeeded => {
                log::info!("search was not necessary based on entry conditions");
            }
            RunSummary::Phases(phases) => {
                log::info!("search results summary");
                log::info!("{}", Self::summary_headings());
                log::info!("{RULE}");
                for phase in phases {
                    log::info!("{}", Self::summary_row(phase));
                }
            }
        }
    }

    fn name(&self) -> &str {
        "LogMonitor"
    }
}
