//! SA configuration.

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// Configuration for [`SimulatedAnnealing`](super::SimulatedAnnealing).
///
/// The per-phase trial caps scale with the number of visible items:
/// `trial_factor * n` trials at most, and the phase also ends once
/// `improved_trial_factor * n` trials improved the objective.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use u_optsearch::sa::SaConfig;
///
/// let config = SaConfig::default()
///     .with_initial_temperature(25.0)
///     .with_reduction_factor(0.85)
///     .with_max_phases(80)
///     .with_search_time_max(Duration::from_secs(2));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SaConfig {
    /// Temperature of the first phase.
    pub initial_temperature: f64,

    /// Multiplicative cooling applied at the start of every phase.
    pub reduction_factor: f64,

    /// Maximum number of temperature phases.
    pub max_phases: usize,

    /// Trial cap per phase, per visible item.
    pub trial_factor: usize,

    /// Improved-trial cap per phase, per visible item.
    pub improved_trial_factor: usize,

    /// Wall-clock budget, checked before each phase. `None` or zero means
    /// no limit.
    pub search_time_max: Option<Duration>,
}

impl Default for SaConfig {
    fn default() -> Self {
        Self {
            initial_temperature: 0.0,
            reduction_factor: 0.9,
            max_phases: 50,
            trial_factor: 20,
            improved_trial_factor: 5,
            search_time_max: None,
        }
    }
}

impl SaConfig {
    pub fn with_initial_temperature(mut self, t: f64) -> Self {
        self.initial_temperature = t;
        self
    }

    pub fn with_reduction_factor(mut self, factor: f64) -> Self {
        self.reduction_factor = factor;
        self
    }

    pub fn with_max_phases(mut self, n: usize) -> Self {
        self.max_phases = n;
        self
    }

    pub fn with_trial_factor(mut self, n: usize) -> Self {
        self.trial_factor = n;
        self
    }

    pub fn with_improved_trial_factor(mut self, n: usize) -> Self {
        self.improved_trial_factor = n;
        self
    }

    pub fn with_search_time_max(mut self, budget: Duration) -> Self {
        self.search_time_max = Some(budget);
        self
    }

    /// The wall-clock budget, if one is in force.
    pub fn time_budget(&self) -> Option<Duration> {
        self.search_time_max.filter(|d| !d.is_zero())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), SearchError> {
        if !self.initial_temperature.is_finite() || self.initial_temperature < 0.0 {
            return Err(SearchError::InvalidConfig(format!(
                "initial_temperature must be finite and non-negative, got {}",
                self.initial_temperature
            )));
        }
        if !self.reduction_factor.is_finite() || self.reduction_factor <= 0.0 {
            return Err(SearchError::InvalidConfig(format!(
                "reduction_factor must be finite and positive, got {}",
                self.reduction_factor
            )));
        }
        Ok(())
    }
}
