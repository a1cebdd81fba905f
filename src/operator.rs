//! Pluggable search algorithms and the orchestrator that sequences them.

use crate::error::SearchError;
use crate::solution::Solution;

/// A search algorithm that improves a [`Solution`] in place.
pub trait SearchOperator {
    /// Short name used in log output.
    fn name(&self) -> &str;

    /// Whether mutexes must be enforced while this operator runs.
    fn requires_mutexes(&self) -> bool {
        false
    }

    /// Captures any state derived from the solution before a run.
    fn bind(&mut self, _solution: &Solution) {}

    /// Runs the search.
    fn optimize(&mut self, solution: &mut Solution) -> Result<(), SearchError>;
}

/// Applies an ordered list of search operators to a solution.
///
/// Before each operator the solution's mutexes are switched on or off to
/// match [`SearchOperator::requires_mutexes`]. The first error stops the
/// sequence.
#[derive(Default)]
pub struct Optimizer {
    operators: Vec<Box<dyn SearchOperator>>,
}

impl Optimizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operator(mut self, operator: impl SearchOperator + 'static) -> Self {
        self.operators.push(Box::new(operator));
        self
    }

    pub fn push(&mut self, operator: Box<dyn SearchOperator>) {
        self.operators.push(operator);
    }

    pub fn operators(&self) -> &[Box<dyn SearchOperator>] {
        &self.operators
    }

    /// Runs every operator in order.
    ///
    /// Does nothing when the solution has no visible optimization items.
    pub fn run(&mut self, solution: &mut Solution) -> Result<(), SearchError> {
        if solution.optimization_items().is_empty() {
            log::warn!("optimization not performed since there are no optimization items");
            return Ok(());
        }

        for operator in &mut self.operators {
            if operator.requires_mutexes() {
                solution.activate_mutexes();
            } else {
                solution.deactivate_mutexes();
            }
            operator.bind(solution);

            log::debug!("running search operator `{}`", operator.name());
            if let Err(err) = operator.optimize(solution) {
                log::error!("optimization not completed by `{}`: {err}", operator.name());
                return Err(err);
            }
        }
        Ok(())
    }
}
