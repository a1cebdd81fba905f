//! Error types for the search engine.

use thiserror::Error;

use crate::item::{ItemId, NoValidValue};

/// Errors raised by [`Solution`](crate::solution::Solution) and the search
/// operators driving it.
///
/// `Overconstrained` is the only runtime condition; every other variant
/// signals misuse of the perturb/undo protocol or of the item handles.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    /// An item capability could not produce a valid value.
    #[error("item {item} is overconstrained: {source}")]
    Overconstrained {
        item: ItemId,
        #[source]
        source: NoValidValue,
    },

    /// A mutex was asked to activate an item outside its group.
    #[error("item {item} is not a member of mutex group `{group}`")]
    NotAMutexMember { item: ItemId, group: String },

    /// Undo was requested while no perturbation is outstanding.
    #[error("no pending perturbation to undo")]
    NoPendingPerturbation,

    /// A perturbation was requested while another one is unresolved.
    #[error("perturbation of item {item} is still pending")]
    PerturbationPending { item: ItemId },

    /// The handle does not belong to this solution.
    #[error("unknown item {0}")]
    UnknownItem(ItemId),

    /// The item was registered without the randomize/undo capability.
    #[error("item {0} cannot be perturbed")]
    NotPerturbable(ItemId),

    /// The same item was listed twice in an item set.
    #[error("item {0} listed more than once")]
    DuplicateItem(ItemId),

    /// Random selection over an empty visible item set.
    #[error("no visible optimization items")]
    NoVisibleItems,

    /// Invalid search operator configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
