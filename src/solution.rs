//! The solution container searched by the operators.
//!
//! A [`Solution`] owns every registered item, the working set of
//! optimization items, the set of objective items, and the mutexes derived
//! from the working set. It exposes the perturb/undo primitives that search
//! operators build on, and enforces that at most one perturbation is
//! pending at any time.

use std::any::Any;
use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::SearchError;
use crate::item::{ItemFlags, ItemId, NoValidValue, ObjectiveItem, OptimizationItem};
use crate::mutex::{derive_mutexes, ActivationTable, Mutex, MutexId};

/// Type-erased storage for a caller item.
trait Slot {
    fn objective(&self) -> &dyn ObjectiveItem;
    fn optimization_mut(&mut self) -> Option<&mut dyn OptimizationItem>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct Perturbable<T>(T);

impl<T: OptimizationItem + 'static> Slot for Perturbable<T> {
    fn objective(&self) -> &dyn ObjectiveItem {
        &self.0
    }

    fn optimization_mut(&mut self) -> Option<&mut dyn OptimizationItem> {
        Some(&mut self.0)
    }

    fn as_any(&self) -> &dyn Any {
        &self.0
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        &mut self.0
    }
}

struct CostOnly<T>(T);

impl<T: ObjectiveItem + 'static> Slot for CostOnly<T> {
    fn objective(&self) -> &dyn ObjectiveItem {
        &self.0
    }

    fn optimization_mut(&mut self) -> Option<&mut dyn OptimizationItem> {
        None
    }

    fn as_any(&self) -> &dyn Any {
        &self.0
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        &mut self.0
    }
}

struct Entry {
    slot: Box<dyn Slot>,
    flags: ItemFlags,
    mutex: Option<MutexId>,
}

/// Arena of registered items, addressed by [`ItemId`].
#[derive(Default)]
struct Items(Vec<Entry>);

impl Items {
    fn entry(&self, id: ItemId) -> Result<&Entry, SearchError> {
        self.0.get(id.index()).ok_or(SearchError::UnknownItem(id))
    }

    fn entry_mut(&mut self, id: ItemId) -> Result<&mut Entry, SearchError> {
        self.0.get_mut(id.index()).ok_or(SearchError::UnknownItem(id))
    }
}

impl ActivationTable for Items {
    fn is_active(&self, item: ItemId) -> bool {
        self.0.get(item.index()).is_some_and(|e| e.flags.active)
    }

    fn set_active(&mut self, item: ItemId, active: bool) {
        if let Some(entry) = self.0.get_mut(item.index()) {
            entry.flags.active = active;
        }
    }
}

/// The single outstanding perturbation, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Idle,
    Perturbed {
        item: ItemId,
        mutex: Option<MutexId>,
    },
}

/// Items, objective and mutex bookkeeping for one search.
///
/// # Examples
///
/// ```
/// use rand::{Rng, RngCore};
/// use u_optsearch::item::{ItemFlags, NoValidValue, ObjectiveItem, OptimizationItem};
/// use u_optsearch::solution::Solution;
///
/// struct Knob { value: f64, previous: f64 }
///
/// impl ObjectiveItem for Knob {
///     fn cost(&self) -> Result<f64, NoValidValue> { Ok((self.value - 1.0).abs()) }
/// }
///
/// impl OptimizationItem for Knob {
///     fn randomize_value(&mut self, rng: &mut dyn RngCore) -> Result<(), NoValidValue> {
///         self.previous = self.value;
///         self.value = rng.random_range(0.0..2.0);
///         Ok(())
///     }
///     fn undo_value(&mut self) -> Result<(), NoValidValue> {
///         self.value = self.previous;
///         Ok(())
///     }
/// }
///
/// let mut solution = Solution::with_seed(7);
/// let id = solution.add_item(Knob { value: 0.0, previous: 0.0 }, ItemFlags::default()).unwrap();
/// assert_eq!(solution.objective_function().unwrap(), 1.0);
///
/// solution.perturb_item_randomly(id).unwrap();
/// solution.undo_perturbed_item().unwrap();
/// assert_eq!(solution.get::<Knob>(id).unwrap().value, 0.0);
/// ```
pub struct Solution {
    items: Items,
    optimization: Vec<ItemId>,
    objective: Vec<ItemId>,
    mutexes: Vec<Mutex>,
    pending: Pending,
    objective_goal: f64,
    rng: StdRng,
}

impl Default for Solution {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solution")
            .field("items", &self.items.0.len())
            .field("optimization", &self.optimization)
            .field("objective", &self.objective)
            .field("mutexes", &self.mutexes)
            .field("pending", &self.pending)
            .field("objective_goal", &self.objective_goal)
            .finish()
    }
}

impl Solution {
    /// Creates an empty solution with an OS-seeded random source.
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_os_rng())
    }

    /// Creates an empty solution whose random source is seeded with `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            items: Items::default(),
            optimization: Vec::new(),
            objective: Vec::new(),
            mutexes: Vec::new(),
            pending: Pending::Idle,
            objective_goal: 0.0,
            rng,
        }
    }

    /// Restarts the random source from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// The random source shared by the solution and its search operators.
    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    // ---- Registration ----

    /// Registers a perturbable item without adding it to any item set.
    pub fn insert_optimization_item<T>(&mut self, item: T, flags: ItemFlags) -> ItemId
    where
        T: OptimizationItem + 'static,
    {
        self.insert(Box::new(Perturbable(item)), flags)
    }

    /// Registers a cost-only item without adding it to any item set.
    pub fn insert_objective_item<T>(&mut self, item: T, flags: ItemFlags) -> ItemId
    where
        T: ObjectiveItem + 'static,
    {
        self.insert(Box::new(CostOnly(item)), flags)
    }

    fn insert(&mut self, slot: Box<dyn Slot>, flags: ItemFlags) -> ItemId {
        let id = ItemId::new(self.items.0.len());
        self.items.0.push(Entry {
            slot,
            flags,
            mutex: None,
        });
        id
    }

    /// Registers a perturbable item and appends it to both the optimization
    /// and the objective item sets.
    ///
    /// Mutexes are re-derived, so any mutex activation is reset. Fails
    /// while a perturbation is pending.
    pub fn add_item<T>(&mut self, item: T, flags: ItemFlags) -> Result<ItemId, SearchError>
    where
        T: OptimizationItem + 'static,
    {
        self.ensure_idle()?;
        let id = self.insert_optimization_item(item, flags);
        self.optimization.push(id);
        self.objective.push(id);
        self.rebuild_mutexes();
        Ok(id)
    }

    /// Replaces the optimization item set and re-derives the mutexes.
    ///
    /// Fails while a perturbation is pending, since its undo refers to the
    /// current mutexes.
    pub fn set_optimization_items<I>(&mut self, ids: I) -> Result<(), SearchError>
    where
        I: IntoIterator<Item = ItemId>,
    {
        self.ensure_idle()?;
        let ids = self.checked_set(ids, true)?;
        self.optimization = ids;
        self.rebuild_mutexes();
        Ok(())
    }

    /// Replaces the objective item set.
    pub fn set_objective_items<I>(&mut self, ids: I) -> Result<(), SearchError>
    where
        I: IntoIterator<Item = ItemId>,
    {
        self.objective = self.checked_set(ids, false)?;
        Ok(())
    }

    fn checked_set<I>(&mut self, ids: I, perturbable: bool) -> Result<Vec<ItemId>, SearchError>
    where
        I: IntoIterator<Item = ItemId>,
    {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for id in ids {
            let entry = self.items.entry_mut(id)?;
            if perturbable && entry.slot.optimization_mut().is_none() {
                return Err(SearchError::NotPerturbable(id));
            }
            if !seen.insert(id) {
                return Err(SearchError::DuplicateItem(id));
            }
            out.push(id);
        }
        Ok(out)
    }

    fn rebuild_mutexes(&mut self) {
        let items = &self.items;
        self.mutexes = derive_mutexes(&self.optimization, |id| {
            items.0.get(id.index()).and_then(|e| e.flags.group())
        });

        for entry in &mut self.items.0 {
            entry.mutex = None;
        }
        for (index, mutex) in self.mutexes.iter().enumerate() {
            for &member in mutex.members() {
                if let Some(entry) = self.items.0.get_mut(member.index()) {
                    entry.mutex = Some(MutexId::new(index));
                }
            }
        }
    }

    // ---- Item access ----

    /// Every item of the optimization set, visible or not.
    pub fn all_optimization_items(&self) -> &[ItemId] {
        &self.optimization
    }

    /// Every item of the objective set, active or not.
    pub fn all_objective_items(&self) -> &[ItemId] {
        &self.objective
    }

    pub fn flags(&self, id: ItemId) -> Option<&ItemFlags> {
        self.items.0.get(id.index()).map(|e| &e.flags)
    }

    pub fn set_active(&mut self, id: ItemId, active: bool) -> Result<(), SearchError> {
        self.items.entry_mut(id)?.flags.active = active;
        Ok(())
    }

    pub fn set_constant(&mut self, id: ItemId, constant: bool) -> Result<(), SearchError> {
        self.items.entry_mut(id)?.flags.constant = constant;
        Ok(())
    }

    /// Borrows the caller's item behind `id` as its concrete type.
    pub fn get<T: 'static>(&self, id: ItemId) -> Option<&T> {
        self.items
            .0
            .get(id.index())
            .and_then(|e| e.slot.as_any().downcast_ref())
    }

    /// Mutably borrows the caller's item behind `id` as its concrete type.
    pub fn get_mut<T: 'static>(&mut self, id: ItemId) -> Option<&mut T> {
        self.items
            .0
            .get_mut(id.index())
            .and_then(|e| e.slot.as_any_mut().downcast_mut())
    }

    /// The mutex `id` belongs to, if any.
    pub fn mutex_of(&self, id: ItemId) -> Option<&Mutex> {
        let entry = self.items.0.get(id.index())?;
        entry.mutex.map(|m| &self.mutexes[m.index()])
    }

    pub fn mutexes(&self) -> &[Mutex] {
        &self.mutexes
    }

    /// Whether `id` is inactive only because a sibling holds an active mutex.
    pub fn is_mutexed(&self, id: ItemId) -> bool {
        let Some(entry) = self.items.0.get(id.index()) else {
            return false;
        };
        !entry.flags.active
            && entry
                .mutex
                .is_some_and(|m| self.mutexes[m.index()].is_active())
    }

    fn is_visible(&self, id: ItemId) -> bool {
        let Some(entry) = self.items.0.get(id.index()) else {
            return false;
        };
        !entry.flags.constant && (entry.flags.active || self.is_mutexed(id))
    }

    /// Optimization items eligible for random selection.
    ///
    /// Constant items are never visible. Inactive members of an active
    /// mutex stay visible so the search can hand exclusivity to them.
    pub fn optimization_items(&self) -> Vec<ItemId> {
        self.optimization
            .iter()
            .copied()
            .filter(|&id| self.is_visible(id))
            .collect()
    }

    /// Objective items currently counted in the objective function.
    pub fn objective_items(&self) -> Vec<ItemId> {
        self.objective
            .iter()
            .copied()
            .filter(|&id| self.items.0.get(id.index()).is_some_and(|e| e.flags.active))
            .collect()
    }

    // ---- Objective ----

    pub fn objective_goal(&self) -> f64 {
        self.objective_goal
    }

    /// Sets the value at or below which a search counts as finished.
    pub fn set_objective_goal(&mut self, goal: f64) {
        self.objective_goal = goal;
    }

    pub fn with_objective_goal(mut self, goal: f64) -> Self {
        self.objective_goal = goal;
        self
    }

    /// Sum of the costs of the active objective items.
    pub fn objective_function(&self) -> Result<f64, SearchError> {
        let mut sum = 0.0;
        for id in self.objective_items() {
            let entry = self.items.entry(id)?;
            sum += entry.slot.objective().cost().map_err(overconstrained(id))?;
        }
        Ok(sum)
    }

    /// Whether every visible optimization item and active objective item
    /// reports a valid state. Items in both sets are checked once.
    pub fn is_valid(&self) -> bool {
        let mut seen = HashSet::new();
        self.optimization_items()
            .into_iter()
            .chain(self.objective_items())
            .filter(|id| seen.insert(*id))
            .all(|id| {
                self.items
                    .entry(id)
                    .is_ok_and(|e| e.slot.objective().is_valid())
            })
    }

    // ---- Mutex enforcement ----

    pub fn activate_mutexes(&mut self) {
        self.mutexes.iter_mut().for_each(|m| m.set_active(true));
    }

    pub fn deactivate_mutexes(&mut self) {
        self.mutexes.iter_mut().for_each(|m| m.set_active(false));
    }

    // ---- Perturbation protocol ----

    /// The item whose perturbation is awaiting keep or undo.
    pub fn pending(&self) -> Option<ItemId> {
        match self.pending {
            Pending::Idle => None,
            Pending::Perturbed { item, .. } => Some(item),
        }
    }

    fn ensure_idle(&self) -> Result<(), SearchError> {
        match self.pending {
            Pending::Idle => Ok(()),
            Pending::Perturbed { item, .. } => Err(SearchError::PerturbationPending { item }),
        }
    }

    /// Uniformly random visible optimization item.
    pub fn pick_random_item(&mut self) -> Result<ItemId, SearchError> {
        let visible = self.optimization_items();
        if visible.is_empty() {
            return Err(SearchError::NoVisibleItems);
        }
        Ok(visible[self.rng.random_range(0..visible.len())])
    }

    /// Activates `id` within its mutex and moves it to a random value.
    ///
    /// The change stays pending until [`accept_perturbation`] or
    /// [`undo_perturbed_item`] resolves it.
    ///
    /// [`accept_perturbation`]: Self::accept_perturbation
    /// [`undo_perturbed_item`]: Self::undo_perturbed_item
    pub fn perturb_item_randomly(&mut self, id: ItemId) -> Result<(), SearchError> {
        self.ensure_idle()?;
        let mutex = self.items.entry(id)?.mutex;

        let checkpoint = mutex.map(|m| (m, self.mutexes[m.index()].checkpoint(&self.items)));
        if let Some(m) = mutex {
            self.mutexes[m.index()].propagate(Some(id), &mut self.items)?;
        }

        let entry = self.items.entry_mut(id)?;
        let item = entry
            .slot
            .optimization_mut()
            .ok_or(SearchError::NotPerturbable(id))?;
        if let Err(source) = item.randomize_value(&mut self.rng) {
            if let Some((m, checkpoint)) = checkpoint {
                self.mutexes[m.index()].restore(checkpoint, &mut self.items);
            }
            return Err(SearchError::Overconstrained { item: id, source });
        }

        self.pending = Pending::Perturbed { item: id, mutex };
        Ok(())
    }

    /// Perturbs a uniformly random visible item and returns it.
    pub fn perturb_randomly(&mut self) -> Result<ItemId, SearchError> {
        let id = self.pick_random_item()?;
        self.perturb_item_randomly(id)?;
        Ok(id)
    }

    /// Keeps the pending perturbation and returns the released item.
    pub fn accept_perturbation(&mut self) -> Option<ItemId> {
        let released = self.pending();
        self.pending = Pending::Idle;
        released
    }

    /// Reverts the pending perturbation: the item value first, then its
    /// mutex.
    pub fn undo_perturbed_item(&mut self) -> Result<(), SearchError> {
        let Pending::Perturbed { item: id, mutex } = self.pending else {
            return Err(SearchError::NoPendingPerturbation);
        };

        let item = self
            .items
            .entry_mut(id)?
            .slot
            .optimization_mut()
            .ok_or(SearchError::NotPerturbable(id))?;
        item.undo_value().map_err(overconstrained(id))?;

        if let Some(m) = mutex {
            self.mutexes[m.index()].undo_propagate(&mut self.items)?;
        }
        self.pending = Pending::Idle;
        Ok(())
    }
}

fn overconstrained(item: ItemId) -> impl FnOnce(NoValidValue) -> SearchError {
    move |source| SearchError::Overconstrained { item, source }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::RngCore;

    /// Integer knob minimizing `|value - target|`.
    #[derive(Debug, Clone)]
    pub(crate) struct Knob {
        pub value: i64,
        pub previous: i64,
        pub target: i64,
        pub valid: bool,
        pub fail_after: Option<usize>,
        pub randomized: usize,
    }

    impl Knob {
        pub fn new(value: i64, target: i64) -> Self {
            Self {
                value,
                previous: value,
                target,
                valid: true,
                fail_after: None,
                randomized: 0,
            }
        }
    }

    impl ObjectiveItem for Knob {
        fn cost(&self) -> Result<f64, NoValidValue> {
            Ok((self.value - self.target).abs() as f64)
        }

        fn is_valid(&self) -> bool {
            self.valid
        }
    }

    impl OptimizationItem for Knob {
        fn randomize_value(&mut self, rng: &mut dyn RngCore) -> Result<(), NoValidValue> {
            if self.fail_after.is_some_and(|n| self.randomized >= n) {
                return Err(NoValidValue::new("knob has no free position"));
            }
            self.randomized += 1;
            self.previous = self.value;
            self.value = rng.random_range(0..=10);
            Ok(())
        }

        fn undo_value(&mut self) -> Result<(), NoValidValue> {
            self.value = self.previous;
            Ok(())
        }
    }

    struct Penalty(f64);

    impl ObjectiveItem for Penalty {
        fn cost(&self) -> Result<f64, NoValidValue> {
            Ok(self.0)
        }
    }

    fn grouped(solution: &mut Solution, group: &str, n: usize) -> Vec<ItemId> {
        (0..n)
            .map(|_| {
                let flags = ItemFlags::default().with_mutex_group(group);
                solution.add_item(Knob::new(0, 5), flags).unwrap()
            })
            .collect()
    }

    fn active_count(solution: &Solution, ids: &[ItemId]) -> usize {
        ids.iter()
            .filter(|&&id| solution.flags(id).unwrap().active)
            .count()
    }

    #[test]
    fn test_add_item_joins_both_sets() {
        let mut solution = Solution::with_seed(1);
        let a = solution.add_item(Knob::new(2, 5), ItemFlags::default()).unwrap();
        let b = solution.add_item(Knob::new(9, 5), ItemFlags::default()).unwrap();
        assert_eq!(solution.optimization_items(), vec![a, b]);
        assert_eq!(solution.objective_items(), vec![a, b]);
        assert_eq!(solution.objective_function().unwrap(), 7.0);
    }

    #[test]
    fn test_set_optimization_items_rejects_bad_ids() {
        let mut solution = Solution::with_seed(1);
        let a = solution.insert_optimization_item(Knob::new(0, 0), ItemFlags::default());
        let p = solution.insert_objective_item(Penalty(1.0), ItemFlags::default());

        assert_eq!(
            solution.set_optimization_items([a, a]),
            Err(SearchError::DuplicateItem(a))
        );
        assert_eq!(
            solution.set_optimization_items([p]),
            Err(SearchError::NotPerturbable(p))
        );
        let ghost = ItemId::new(42);
        assert_eq!(
            solution.set_optimization_items([ghost]),
            Err(SearchError::UnknownItem(ghost))
        );
        assert!(solution.all_optimization_items().is_empty());
    }

    #[test]
    fn test_objective_counts_only_active_items() {
        let mut solution = Solution::with_seed(1);
        let a = solution.insert_optimization_item(Knob::new(0, 3), ItemFlags::default());
        let p = solution.insert_objective_item(Penalty(10.0), ItemFlags::default().with_active(false));
        let q = solution.insert_objective_item(Penalty(0.5), ItemFlags::default().with_constant(true));
        solution.set_optimization_items([a]).unwrap();
        solution.set_objective_items([a, p, q]).unwrap();

        assert_eq!(solution.objective_items(), vec![a, q]);
        assert_eq!(solution.objective_function().unwrap(), 3.5);
    }

    #[test]
    fn test_constant_items_are_never_visible() {
        let mut solution = Solution::with_seed(1);
        let ids = grouped(&mut solution, "g", 2);
        let loose = solution
            .add_item(Knob::new(0, 0), ItemFlags::default().with_constant(true))
            .unwrap();
        solution.set_constant(ids[1], true).unwrap();
        solution.activate_mutexes();
        solution.perturb_item_randomly(ids[0]).unwrap();
        solution.accept_perturbation();

        assert!(solution.is_mutexed(ids[1]));
        assert_eq!(solution.optimization_items(), vec![ids[0]]);
        assert!(!solution.optimization_items().contains(&loose));
    }

    #[test]
    fn test_mutexed_siblings_stay_visible() {
        let mut solution = Solution::with_seed(1);
        let ids = grouped(&mut solution, "g", 3);
        solution.activate_mutexes();
        solution.perturb_item_randomly(ids[1]).unwrap();
        solution.accept_perturbation();

        assert_eq!(active_count(&solution, &ids), 1);
        assert!(solution.flags(ids[1]).unwrap().active);
        assert!(solution.is_mutexed(ids[0]));
        assert_eq!(solution.optimization_items(), ids);

        solution.deactivate_mutexes();
        assert!(!solution.is_mutexed(ids[0]));
        assert_eq!(solution.optimization_items(), vec![ids[1]]);
    }

    #[test]
    fn test_mutex_memberships_follow_item_set() {
        let mut solution = Solution::with_seed(1);
        let ids = grouped(&mut solution, "g", 3);
        let other = solution
            .add_item(Knob::new(0, 0), ItemFlags::default().with_mutex_group("h"))
            .unwrap();
        assert_eq!(solution.mutexes().len(), 1);
        assert_eq!(solution.mutex_of(ids[0]).unwrap().group(), "g");
        assert!(solution.mutex_of(other).is_none());

        solution.set_optimization_items([ids[0], other]).unwrap();
        assert!(solution.mutexes().is_empty());
        assert!(solution.mutex_of(ids[0]).is_none());
    }

    #[test]
    fn test_perturb_then_undo_restores_value_and_mutex() {
        let mut solution = Solution::with_seed(3);
        let ids = grouped(&mut solution, "g", 2);
        solution.activate_mutexes();
        solution.perturb_item_randomly(ids[0]).unwrap();
        solution.accept_perturbation();

        let before = solution.get::<Knob>(ids[1]).unwrap().value;
        solution.perturb_item_randomly(ids[1]).unwrap();
        assert_eq!(solution.pending(), Some(ids[1]));
        assert!(solution.flags(ids[1]).unwrap().active);
        assert!(!solution.flags(ids[0]).unwrap().active);

        solution.undo_perturbed_item().unwrap();
        assert_eq!(solution.pending(), None);
        assert_eq!(solution.get::<Knob>(ids[1]).unwrap().value, before);
        assert!(solution.flags(ids[0]).unwrap().active);
        assert!(!solution.flags(ids[1]).unwrap().active);
    }

    #[test]
    fn test_undo_without_pending_fails() {
        let mut solution = Solution::with_seed(1);
        solution.add_item(Knob::new(0, 0), ItemFlags::default()).unwrap();
        assert_eq!(
            solution.undo_perturbed_item(),
            Err(SearchError::NoPendingPerturbation)
        );
    }

    #[test]
    fn test_second_perturbation_requires_resolution() {
        let mut solution = Solution::with_seed(1);
        let a = solution.add_item(Knob::new(0, 0), ItemFlags::default()).unwrap();
        let b = solution.add_item(Knob::new(0, 0), ItemFlags::default()).unwrap();
        solution.perturb_item_randomly(a).unwrap();
        assert_eq!(
            solution.perturb_item_randomly(b),
            Err(SearchError::PerturbationPending { item: a })
        );
        assert_eq!(solution.accept_perturbation(), Some(a));
        solution.perturb_item_randomly(b).unwrap();
    }

    #[test]
    fn test_overconstrained_rolls_back_mutex() {
        let mut solution = Solution::with_seed(1);
        let ids = grouped(&mut solution, "g", 2);
        solution.get_mut::<Knob>(ids[1]).unwrap().fail_after = Some(0);
        solution.activate_mutexes();
        solution.perturb_item_randomly(ids[0]).unwrap();
        solution.accept_perturbation();

        let err = solution.perturb_item_randomly(ids[1]).unwrap_err();
        assert!(matches!(err, SearchError::Overconstrained { item, .. } if item == ids[1]));
        assert_eq!(solution.pending(), None);
        assert!(solution.flags(ids[0]).unwrap().active);
        assert!(!solution.flags(ids[1]).unwrap().active);
        assert_eq!(solution.mutex_of(ids[0]).unwrap().current(), Some(ids[0]));
    }

    #[test]
    fn test_overconstrained_first_propagation_restores_flags() {
        let mut solution = Solution::with_seed(1);
        let ids = grouped(&mut solution, "g", 2);
        solution.get_mut::<Knob>(ids[1]).unwrap().fail_after = Some(0);
        solution.activate_mutexes();

        let err = solution.perturb_item_randomly(ids[1]).unwrap_err();
        assert!(matches!(err, SearchError::Overconstrained { item, .. } if item == ids[1]));
        assert_eq!(active_count(&solution, &ids), 2);
        let mutex = solution.mutex_of(ids[1]).unwrap();
        assert_eq!(mutex.current(), None);
        assert_eq!(mutex.previous(), None);

        solution.perturb_item_randomly(ids[0]).unwrap();
        assert_eq!(active_count(&solution, &ids), 1);
        assert!(solution.flags(ids[0]).unwrap().active);
    }

    #[test]
    fn test_item_sets_are_locked_while_pending() {
        let mut solution = Solution::with_seed(1);
        let ids = grouped(&mut solution, "g", 2);
        let loose = solution.add_item(Knob::new(0, 0), ItemFlags::default()).unwrap();
        solution.activate_mutexes();
        solution.perturb_item_randomly(ids[0]).unwrap();

        let locked = Err(SearchError::PerturbationPending { item: ids[0] });
        assert_eq!(solution.set_optimization_items([ids[0], loose]), locked);
        let extra = Knob::new(0, 0);
        assert_eq!(
            solution.add_item(extra, ItemFlags::default().with_mutex_group("g")),
            Err(SearchError::PerturbationPending { item: ids[0] })
        );
        assert_eq!(solution.all_optimization_items(), &[ids[0], ids[1], loose]);
        assert_eq!(solution.mutexes().len(), 1);

        solution.undo_perturbed_item().unwrap();
        solution.set_optimization_items([ids[0], loose]).unwrap();
        assert!(solution.mutexes().is_empty());
        assert!(solution.mutex_of(ids[0]).is_none());
    }

    #[test]
    fn test_pick_random_item_on_empty_set() {
        let mut solution = Solution::with_seed(1);
        assert_eq!(solution.pick_random_item(), Err(SearchError::NoVisibleItems));
        let a = solution.add_item(Knob::new(0, 0), ItemFlags::default()).unwrap();
        solution.set_active(a, false).unwrap();
        assert_eq!(solution.perturb_randomly(), Err(SearchError::NoVisibleItems));
    }

    #[test]
    fn test_pick_random_item_covers_visible_set() {
        let mut solution = Solution::with_seed(11);
        let ids: Vec<ItemId> = (0..4)
            .map(|_| solution.add_item(Knob::new(0, 0), ItemFlags::default()).unwrap())
            .collect();
        let mut hits = HashSet::new();
        for _ in 0..200 {
            hits.insert(solution.pick_random_item().unwrap());
        }
        assert_eq!(hits.len(), ids.len());
    }

    #[test]
    fn test_is_valid_checks_union_of_sets() {
        let mut solution = Solution::with_seed(1);
        let a = solution.add_item(Knob::new(0, 0), ItemFlags::default()).unwrap();
        let b = solution.insert_optimization_item(Knob::new(0, 0), ItemFlags::default());
        assert!(solution.is_valid());

        solution.get_mut::<Knob>(b).unwrap().valid = false;
        assert!(solution.is_valid());

        solution.set_objective_items([a, b]).unwrap();
        assert!(!solution.is_valid());
    }

    #[test]
    fn test_same_seed_same_trajectory() {
        let run = |seed| {
            let mut solution = Solution::with_seed(seed);
            for _ in 0..3 {
                solution.add_item(Knob::new(0, 0), ItemFlags::default()).unwrap();
            }
            (0..20)
                .map(|_| {
                    let id = solution.perturb_randomly().unwrap();
                    solution.accept_perturbation();
                    (id, solution.get::<Knob>(id).unwrap().value)
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(run(5), run(5));
    }
}
