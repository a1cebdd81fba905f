//! Item capabilities and the flag record the solution keeps for every item.
//!
//! A searchable entity is described by two independent capabilities:
//!
//! - [`ObjectiveItem`]: contributes a cost term and a validity check.
//! - [`OptimizationItem`]: additionally owns a value that can be randomized
//!   and reverted by one level.
//!
//! The engine-controlled state (`active`, `constant`, mutex group) lives in
//! [`ItemFlags`], stored next to the item inside the solution rather than in
//! the item itself.

use std::fmt;

use rand::RngCore;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Handle to an item registered in a [`Solution`](crate::solution::Solution).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ItemId(usize);

impl ItemId {
    /// Creates a handle from a raw arena index.
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the raw arena index.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Engine-visible state of an item.
///
/// # Examples
///
/// ```
/// use u_optsearch::item::ItemFlags;
///
/// let flags = ItemFlags::default().with_mutex_group("labels");
/// assert!(flags.active);
/// assert!(!flags.constant);
/// assert_eq!(flags.group(), Some("labels"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ItemFlags {
    /// Counted in the objective and, unless mutexed, visible to the search.
    pub active: bool,

    /// Excluded from the search regardless of `active`.
    pub constant: bool,

    /// Items sharing a non-empty group id are mutually exclusive.
    pub mutex_group: Option<String>,
}

impl Default for ItemFlags {
    fn default() -> Self {
        Self {
            active: true,
            constant: false,
            mutex_group: None,
        }
    }
}

impl ItemFlags {
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn with_constant(mut self, constant: bool) -> Self {
        self.constant = constant;
        self
    }

    pub fn with_mutex_group(mut self, group: impl Into<String>) -> Self {
        self.mutex_group = Some(group.into());
        self
    }

    /// Returns the mutex group id, treating an empty string as no group.
    pub fn group(&self) -> Option<&str> {
        self.mutex_group.as_deref().filter(|g| !g.is_empty())
    }
}

/// Raised by an item capability when no valid value exists, i.e. the
/// solution space is overconstrained for that item.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct NoValidValue {
    reason: String,
}

impl NoValidValue {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl Default for NoValidValue {
    fn default() -> Self {
        Self::new("valid item value cannot be found; solution space is overconstrained")
    }
}

/// An item contributing a cost term to the objective function.
pub trait ObjectiveItem {
    /// Cost of the item in its current state. Lower is better.
    fn cost(&self) -> Result<f64, NoValidValue>;

    /// Whether the item is in a valid state. Checked by
    /// [`Solution::is_valid`](crate::solution::Solution::is_valid).
    fn is_valid(&self) -> bool {
        true
    }
}

/// An objective item whose value the search can change.
///
/// Only the solution should call these methods while mutexes are active;
/// it keeps the mutex bookkeeping in step with the value changes.
pub trait OptimizationItem: ObjectiveItem {
    /// Moves the item to a new random value.
    fn randomize_value(&mut self, rng: &mut dyn RngCore) -> Result<(), NoValidValue>;

    /// Reverts the most recent [`randomize_value`](Self::randomize_value).
    /// Only one level of undo is required.
    fn undo_value(&mut self) -> Result<(), NoValidValue>;
}
