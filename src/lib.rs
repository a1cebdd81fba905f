//! Item-based stochastic search engine.
//!
//! Callers describe the search space as a set of items:
//!
//! - **Optimization items**: values the search may randomize and undo.
//! - **Objective items**: cost terms summed into the objective function.
//!   An item may be both.
//! - **Mutex groups**: optimization items sharing a group id, of which at
//!   most one is active while enforcement is on.
//!
//! A [`Solution`](solution::Solution) holds the items and exposes the
//! perturb/undo protocol. [`SearchOperator`](operator::SearchOperator)s
//! drive it; the crate ships [`SimulatedAnnealing`](sa::SimulatedAnnealing),
//! and an [`Optimizer`](operator::Optimizer) applies several operators in
//! sequence.
//!
//! # Architecture
//!
//! The crate contains no domain concepts. What an item's value is, how it is
//! randomized, and what it costs are all defined by consumers.

pub mod error;
pub mod item;
pub mod mutex;
pub mod operator;
pub mod sa;
pub mod solution;

pub use error::SearchError;
