//! Mutual-exclusion groups over optimization items.
//!
//! A [`Mutex`] keeps at most one of its members active while enforcement is
//! on. Propagation remembers the previously active member so that exactly
//! one level of undo is possible.

use std::collections::HashMap;

use crate::error::SearchError;
use crate::item::ItemId;

/// Index of a mutex inside its owning solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MutexId(usize);

impl MutexId {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

/// Access to the `active` flag of items.
///
/// Implemented by the solution's item storage; mutexes only ever read and
/// toggle flags through this seam.
pub trait ActivationTable {
    fn is_active(&self, item: ItemId) -> bool;

    fn set_active(&mut self, item: ItemId, active: bool);
}

/// Member flags and propagation history of a mutex, taken by
/// [`Mutex::checkpoint`] and put back by [`Mutex::restore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutexCheckpoint {
    current: Option<ItemId>,
    previous: Option<ItemId>,
    flags: Vec<(ItemId, bool)>,
}

/// A group of two or more items of which at most one may be active.
#[derive(Debug, Clone)]
pub struct Mutex {
    group: String,
    members: Vec<ItemId>,
    active: bool,
    current: Option<ItemId>,
    previous: Option<ItemId>,
}

impl Mutex {
    /// Creates an inactive mutex over `members`.
    pub fn new(group: impl Into<String>, members: Vec<ItemId>) -> Self {
        Self {
            group: group.into(),
            members,
            active: false,
            current: None,
            previous: None,
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn members(&self) -> &[ItemId] {
        &self.members
    }

    pub fn contains(&self, item: ItemId) -> bool {
        self.members.contains(&item)
    }

    /// Whether the mutex is currently enforced.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// The member most recently made active by propagation.
    pub fn current(&self) -> Option<ItemId> {
        self.current
    }

    /// The member an undo would restore.
    pub fn previous(&self) -> Option<ItemId> {
        self.previous
    }

    /// Makes `selected` the single active member.
    ///
    /// No-op while the mutex is inactive or when `selected` is `None`.
    /// Fails without touching any flag when `selected` is not a member.
    pub fn propagate<T: ActivationTable + ?Sized>(
        &mut self,
        selected: Option<ItemId>,
        table: &mut T,
    ) -> Result<(), SearchError> {
        let Some(selected) = selected else {
            return Ok(());
        };
        if !self.active {
            return Ok(());
        }
        if !self.contains(selected) {
            return Err(SearchError::NotAMutexMember {
                item: selected,
                group: self.group.clone(),
            });
        }

        self.previous = self.current;
        self.current = Some(selected);
        for &member in &self.members {
            table.set_active(member, false);
        }
        table.set_active(selected, true);
        Ok(())
    }

    /// Restores the member that was active before the last propagation.
    ///
    /// Afterwards `previous == current`, so a second undo in a row only
    /// re-asserts the current member.
    pub fn undo_propagate<T: ActivationTable + ?Sized>(
        &mut self,
        table: &mut T,
    ) -> Result<(), SearchError> {
        if !self.active {
            return Ok(());
        }
        self.propagate(self.previous, table)?;
        self.previous = self.current;
        Ok(())
    }

    /// Captures the member flags and history ahead of a propagation that
    /// may have to be abandoned.
    pub fn checkpoint<T: ActivationTable + ?Sized>(&self, table: &T) -> MutexCheckpoint {
        MutexCheckpoint {
            current: self.current,
            previous: self.previous,
            flags: self
                .members
                .iter()
                .map(|&member| (member, table.is_active(member)))
                .collect(),
        }
    }

    /// Puts the mutex and its members back exactly as `checkpoint` found
    /// them. Unlike [`undo_propagate`](Self::undo_propagate) this also
    /// reverts a first propagation.
    pub fn restore<T: ActivationTable + ?Sized>(
        &mut self,
        checkpoint: MutexCheckpoint,
        table: &mut T,
    ) {
        self.current = checkpoint.current;
        self.previous = checkpoint.previous;
        for (member, active) in checkpoint.flags {
            table.set_active(member, active);
        }
    }
}

/// Builds one mutex per group id shared by at least two items.
///
/// Groups appear in order of first occurrence in `items`, and members keep
/// their order. Items whose `group_of` is `None` or empty are skipped.
///
/// # Examples
///
/// ```
/// use u_optsearch::item::ItemId;
/// use u_optsearch::mutex::derive_mutexes;
///
/// let groups = [Some("g1"), Some("g1"), Some(""), None, Some("g2")];
/// let items: Vec<ItemId> = (0..groups.len()).map(ItemId::new).collect();
///
/// let mutexes = derive_mutexes(&items, |id| groups[id.index()]);
/// assert_eq!(mutexes.len(), 1);
/// assert_eq!(mutexes[0].group(), "g1");
/// assert_eq!(mutexes[0].members(), &[ItemId::new(0), ItemId::new(1)]);
/// ```
pub fn derive_mutexes<'a, F>(items: &[ItemId], mut group_of: F) -> Vec<Mutex>
where
    F: FnMut(ItemId) -> Option<&'a str>,
{
    let mut slots: HashMap<&'a str, usize> = HashMap::new();
    let mut groups: Vec<(&'a str, Vec<ItemId>)> = Vec::new();

    for &item in items {
        let Some(group) = group_of(item).filter(|g| !g.is_empty()) else {
            continue;
        };
        let slot = *slots.entry(group).or_insert_with(|| {
            groups.push((group, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(item);
    }

    groups
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(group, members)| Mutex::new(group, members))
        .collect()
}
