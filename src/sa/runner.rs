//! SA execution loop.
//!
//! # Algorithm
//!
//! 1. Perturb every visible item once to randomize the starting state
//! 2. At each temperature phase:
//!    a. Cool: `T *= reduction_factor`
//!    b. Run trials until the trial cap or the improved-trial cap is hit:
//!       perturb one random item, re-evaluate, keep or revert
//! 3. Stop when the goal is reached, a phase neither improved nor kept a
//!    degraded trial, the phase limit is hit, or the time budget ran out

use std::time::{Duration, Instant};

use rand::Rng;

use super::config::SaConfig;
use super::monitor::{AnnealingMonitor, LogMonitor};
use super::types::{PhaseStart, PhaseSummary, RunSummary, TrialClass, TrialEvent, Verdict};
use crate::error::SearchError;
use crate::operator::SearchOperator;
use crate::solution::Solution;

/// Why the temperature loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The objective reached the solution's goal.
    GoalReached,
    /// A phase ended without improved or kept degraded trials.
    Converged,
    /// `max_phases` phases ran.
    PhaseLimit,
    /// The wall-clock budget was used up.
    TimeLimit,
    /// The solution had nothing to perturb.
    NoVisibleItems,
}

/// Result of a Simulated Annealing run.
#[derive(Debug, Clone, PartialEq)]
pub struct SaReport {
    /// Number of temperature phases run.
    pub phases: usize,

    /// Total number of trials over all phases.
    pub total_trials: usize,

    /// Objective after the randomized start.
    pub initial_objective: f64,

    /// Objective when the run ended.
    pub final_objective: f64,

    /// Temperature of the last phase.
    pub final_temperature: f64,

    /// Time spent in the temperature loop.
    pub elapsed: Duration,

    pub stop_reason: StopReason,

    /// The summary handed to the monitor.
    pub summary: RunSummary,
}

/// Acceptance probability of a trial that changed the objective by `delta`
/// at temperature `temperature`.
///
/// Non-worsening trials are always acceptable; worsening ones follow the
/// Metropolis criterion `exp(-delta / T)`.
pub fn acceptance_probability(delta: f64, temperature: f64) -> f64 {
    if delta <= 0.0 {
        1.0
    } else {
        (-delta / temperature).exp()
    }
}

/// Per-phase caps derived from the visible item count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TrialCaps {
    trials: usize,
    improved: usize,
}

impl TrialCaps {
    fn new(config: &SaConfig, solution: &Solution) -> Self {
        let visible = solution.optimization_items().len();
        Self {
            trials: config.trial_factor * visible,
            improved: config.improved_trial_factor * visible,
        }
    }
}

#[derive(Debug, Default)]
struct RunState {
    temperature: f64,
    phase: usize,
    trials: usize,
    improved: usize,
    equivalent: usize,
    degraded: usize,
    total_trials: usize,
    objective: f64,
}

impl RunState {
    fn start_phase(&mut self, reduction_factor: f64) {
        self.temperature *= reduction_factor;
        self.phase += 1;
        self.trials = 0;
        self.improved = 0;
        self.equivalent = 0;
        self.degraded = 0;
    }

    fn summary(&self) -> PhaseSummary {
        PhaseSummary {
            phase: self.phase,
            temperature: self.temperature,
            objective: self.objective,
            trials: self.trials,
            improved: self.improved,
            degraded: self.degraded,
            equivalent: self.equivalent,
            reverted: self.trials - self.improved - self.degraded - self.equivalent,
            total_trials: self.total_trials,
        }
    }
}

/// Simulated annealing over the items of a [`Solution`].
///
/// # Examples
///
/// ```
/// use rand::{Rng, RngCore};
/// use u_optsearch::item::{ItemFlags, NoValidValue, ObjectiveItem, OptimizationItem};
/// use u_optsearch::sa::{SaConfig, SimulatedAnnealing};
/// use u_optsearch::sa::monitor::NoOpMonitor;
/// use u_optsearch::solution::Solution;
///
/// struct Slot { value: i32, previous: i32 }
///
/// impl ObjectiveItem for Slot {
///     fn cost(&self) -> Result<f64, NoValidValue> { Ok((self.value - 3).pow(2) as f64) }
/// }
///
/// impl OptimizationItem for Slot {
///     fn randomize_value(&mut self, rng: &mut dyn RngCore) -> Result<(), NoValidValue> {
///         self.previous = self.value;
///         self.value = rng.random_range(0..8);
///         Ok(())
///     }
///     fn undo_value(&mut self) -> Result<(), NoValidValue> {
///         self.value = self.previous;
///         Ok(())
///     }
/// }
///
/// let mut solution = Solution::with_seed(42);
/// solution.add_item(Slot { value: 0, previous: 0 }, ItemFlags::default()).unwrap();
///
/// let mut sa = SimulatedAnnealing::new(SaConfig::default().with_initial_temperature(4.0));
/// let report = sa.optimize_with(&mut solution, &mut NoOpMonitor).unwrap();
/// assert!(report.phases <= sa.config().max_phases);
/// assert_eq!(solution.pending(), None);
/// ```
#[derive(Debug)]
pub struct SimulatedAnnealing {
    config: SaConfig,
    caps: Option<TrialCaps>,
    monitor: Box<dyn AnnealingMonitor>,
    last_report: Option<SaReport>,
}

impl SimulatedAnnealing {
    /// Creates the operator with a [`LogMonitor`] as its event sink.
    pub fn new(config: SaConfig) -> Self {
        Self {
            config,
            caps: None,
            monitor: Box::new(LogMonitor::default()),
            last_report: None,
        }
    }

    /// Replaces the sink used when run through [`SearchOperator::optimize`].
    pub fn with_monitor(mut self, monitor: impl AnnealingMonitor + 'static) -> Self {
        self.monitor = Box::new(monitor);
        self
    }

    pub fn config(&self) -> &SaConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut SaConfig {
        &mut self.config
    }

    /// Trial and improved-trial caps captured by the last [`bind`].
    ///
    /// [`bind`]: SearchOperator::bind
    pub fn trial_caps(&self) -> Option<(usize, usize)> {
        self.caps.map(|c| (c.trials, c.improved))
    }

    /// Report of the last run started through [`SearchOperator::optimize`].
    pub fn last_report(&self) -> Option<&SaReport> {
        self.last_report.as_ref()
    }

    /// Runs the search, reporting events to `monitor`.
    ///
    /// Uses the caps from a preceding [`bind`](SearchOperator::bind) if
    /// there is one, otherwise binds to `solution` first. Mutex enforcement
    /// is left as the caller set it.
    pub fn optimize_with<M>(
        &mut self,
        solution: &mut Solution,
        monitor: &mut M,
    ) -> Result<SaReport, SearchError>
    where
        M: AnnealingMonitor + ?Sized,
    {
        self.config.validate()?;
        let caps = self
            .caps
            .take()
            .unwrap_or_else(|| TrialCaps::new(&self.config, solution));

        let mut state = RunState {
            temperature: self.config.initial_temperature / self.config.reduction_factor,
            ..RunState::default()
        };

        let visible = solution.optimization_items();
        if visible.is_empty() {
            log::warn!("simulated annealing skipped: no visible optimization items");
            let summary = RunSummary::NoSearchNeeded;
            monitor.on_run_summary(&summary);
            let objective = solution.objective_function()?;
            return Ok(SaReport {
                phases: 0,
                total_trials: 0,
                initial_objective: objective,
                final_objective: objective,
                final_temperature: state.temperature,
                elapsed: Duration::ZERO,
                stop_reason: StopReason::NoVisibleItems,
                summary,
            });
        }

        // Values the items were constructed with are not trusted as a start.
        for id in visible {
            solution.perturb_item_randomly(id)?;
            solution.accept_perturbation();
        }
        state.objective = solution.objective_function()?;
        let initial_objective = state.objective;
        let goal = solution.objective_goal();

        let started = Instant::now();
        let mut phases = Vec::new();
        let stop_reason = loop {
            if let Some(reason) = self.stop_reason(&state, goal, started) {
                break reason;
            }

            state.start_phase(self.config.reduction_factor);
            monitor.on_phase_start(&PhaseStart {
                phase: state.phase,
                temperature: state.temperature,
            });

            loop {
                Self::trial(solution, &mut state, &mut *monitor)?;
                if state.trials >= caps.trials || state.improved >= caps.improved {
                    break;
                }
            }

            let summary = state.summary();
            monitor.on_phase_summary(&summary);
            phases.push(summary);
        };
        let elapsed = started.elapsed();

        let summary = if phases.is_empty() {
            RunSummary::NoSearchNeeded
        } else {
            RunSummary::Phases(phases)
        };
        monitor.on_run_summary(&summary);

        Ok(SaReport {
            phases: state.phase,
            total_trials: state.total_trials,
            initial_objective,
            final_objective: state.objective,
            final_temperature: state.temperature,
            elapsed,
            stop_reason,
            summary,
        })
    }

    /// Checks the loop conditions at the top of a phase.
    fn stop_reason(&self, state: &RunState, goal: f64, started: Instant) -> Option<StopReason> {
        if !(state.objective > goal) {
            Some(StopReason::GoalReached)
        } else if state.phase > 0 && state.improved == 0 && state.degraded == 0 {
            Some(StopReason::Converged)
        } else if state.phase >= self.config.max_phases {
            Some(StopReason::PhaseLimit)
        } else if self
            .config
            .time_budget()
            .is_some_and(|budget| started.elapsed() >= budget)
        {
            Some(StopReason::TimeLimit)
        } else {
            None
        }
    }

    fn trial<M>(
        solution: &mut Solution,
        state: &mut RunState,
        monitor: &mut M,
    ) -> Result<(), SearchError>
    where
        M: AnnealingMonitor + ?Sized,
    {
        state.trials += 1;
        state.total_trials += 1;

        solution.perturb_randomly()?;

        let previous_objective = state.objective;
        state.objective = solution.objective_function()?;
        let delta = state.objective - previous_objective;

        let class = TrialClass::from_delta(delta);
        let acceptance_probability = acceptance_probability(delta, state.temperature);

        // One fresh draw per non-improving trial.
        let keep = match class {
            TrialClass::Improved => true,
            TrialClass::Equivalent => solution.rng_mut().random_range(0.0..1.0) <= 0.5,
            TrialClass::Degraded => {
                solution.rng_mut().random_range(0.0..1.0) < acceptance_probability
            }
        };

        let class_index = keep.then(|| {
            let counter = match class {
                TrialClass::Improved => &mut state.improved,
                TrialClass::Equivalent => &mut state.equivalent,
                TrialClass::Degraded => &mut state.degraded,
            };
            *counter += 1;
            *counter
        });

        monitor.on_trial(&TrialEvent {
            phase: state.phase,
            trial: state.trials,
            class_index,
            class,
            verdict: if keep { Verdict::Keep } else { Verdict::Revert },
            objective: state.objective,
            previous_objective,
            delta,
            acceptance_probability,
        });

        if keep {
            solution.accept_perturbation();
        } else {
            solution.undo_perturbed_item()?;
            // Undo of a caller item is not guaranteed to be exact.
            state.objective = solution.objective_function()?;
        }
        Ok(())
    }
}

impl Default for SimulatedAnnealing {
    fn default() -> Self {
        Self::new(SaConfig::default())
    }
}

impl SearchOperator for SimulatedAnnealing {
    fn name(&self) -> &str {
        "SimulatedAnnealing"
    }

    fn requires_mutexes(&self) -> bool {
        true
    }

    fn bind(&mut self, solution: &Solution) {
        self.caps = Some(TrialCaps::new(&self.config, solution));
    }

    fn optimize(&mut self, solution: &mut Solution) -> Result<(), SearchError> {
        let mut monitor = std::mem::replace(&mut self.monitor, Box::new(LogMonitor::default()));
        let result = self.optimize_with(solution, monitor.as_mut());
        self.monitor = monitor;
        self.last_report = Some(result?);
        Ok(())
    }
}
