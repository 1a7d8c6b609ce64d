//! Per-component-type storage: a contiguous sequence kept sorted by owner
//! entity id, plus a parallel `HashSet` for O(1) ownership membership tests.
//!
//! Grounded directly in
//! `examples/original_source/source/module/ecs/public/component.hpp`'s
//! `component<T>` / `owned_component<T>`: binary-search insertion and
//! removal, fast paths for the empty and tail cases, and a pair of
//! "reallocating" events fired only when a non-tail insert/remove actually
//! shifts existing elements (so index-based references know when to fix
//! themselves up).

use std::collections::HashSet;

use crate::entity::EntityId;
use engine_common::Event;

/// One stored component plus the entity that owns it.
pub struct OwnedComponent<T> {
    pub owner_id: EntityId,
    pub data: T,
}

/// Sorted-by-owner storage for a single component type `T`.
pub struct ComponentStore<T> {
    name: &'static str,
    components: Vec<OwnedComponent<T>>,
    owners: HashSet<EntityId>,

    /// Fired with the index of a freshly-inserted element whenever the
    /// insert was not at the tail (i.e. existing elements shifted right).
    pub reallocating_added: Event<usize>,
    /// Fired with the index about to be vacated whenever a removal is not
    /// from the tail (i.e. existing elements will shift left).
    pub reallocating_removed: Event<usize>,
    /// Fired with the owning entity immediately after insertion.
    pub added: Event<EntityId>,
    /// Fired with the owning entity immediately before the record is erased.
    pub removed: Event<EntityId>,
}

impl<T> ComponentStore<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            components: Vec::new(),
            owners: HashSet::new(),
            reallocating_added: Event::new(name),
            reallocating_removed: Event::new(name),
            added: Event::new(name),
            removed: Event::new(name),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn is_owned_by(&self, owner: EntityId) -> bool {
        self.owners.contains(&owner)
    }

    pub fn index_owned_by(&self, owner: EntityId) -> Option<usize> {
        self.components
            .binary_search_by_key(&owner, |c| c.owner_id)
            .ok()
    }

    pub fn owned_by(&self, owner: EntityId) -> Option<&T> {
        self.index_owned_by(owner).map(|i| &self.components[i].data)
    }

    pub fn owned_by_mut(&mut self, owner: EntityId) -> Option<&mut T> {
        let idx = self.index_owned_by(owner)?;
        Some(&mut self.components[idx].data)
    }

    pub(crate) fn record_at(&self, index: usize) -> Option<&OwnedComponent<T>> {
        self.components.get(index)
    }

    /// All owner ids in storage order (sorted ascending). Used by the join
    /// in [`crate::query`].
    pub fn owner_ids(&self) -> Vec<EntityId> {
        self.components.iter().map(|c| c.owner_id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.components.iter().map(|c| (c.owner_id, &c.data))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.components.iter_mut().map(|c| (c.owner_id, &mut c.data))
    }

    /// Insert `value` as owned by `owner`. Refuses (returns `false`, logs) if
    /// `owner` already has a component of this type.
    pub fn add_to(&mut self, owner: EntityId, value: T) -> bool {
        if self.owners.contains(&owner) {
            log::error!(
                target: "ecs",
                "invariant violation: {} already owns a '{}' component",
                owner,
                self.name
            );
            return false;
        }

        let insert_index = match self.components.binary_search_by_key(&owner, |c| c.owner_id) {
            Ok(_) => unreachable!("owners set and sequence disagree"),
            Err(idx) => idx,
        };
        let is_tail = insert_index == self.components.len();

        self.components.insert(
            insert_index,
            OwnedComponent {
                owner_id: owner,
                data: value,
            },
        );
        if !is_tail {
            self.reallocating_added.publish(&insert_index);
        }
        self.owners.insert(owner);
        self.added.publish(&owner);
        true
    }

    /// Like [`Self::add_to`] but builds the value lazily, only if `owner`
    /// doesn't already have one. Avoids paying construction cost for the
    /// common "ensure this exists" call site.
    pub fn add_unique(&mut self, owner: EntityId, make: impl FnOnce() -> T) -> bool {
        if self.owners.contains(&owner) {
            return false;
        }
        self.add_to(owner, make())
    }

    /// Remove the component owned by `owner`. `during_destroy` relaxes the
    /// missing-owner case from an invariant violation to a quiet no-op, for
    /// use while an entity's whole component set is being torn down (other
    /// handlers may have already removed this type as a side effect).
    pub fn remove_from(&mut self, owner: EntityId, during_destroy: bool) -> bool {
        if !self.owners.contains(&owner) {
            if during_destroy {
                log::trace!(
                    target: "ecs",
                    "{} has no '{}' component during destroy, skipping",
                    owner,
                    self.name
                );
            } else {
                log::error!(
                    target: "ecs",
                    "invariant violation: {} does not own a '{}' component",
                    owner,
                    self.name
                );
            }
            return false;
        }

        let idx = self
            .components
            .binary_search_by_key(&owner, |c| c.owner_id)
            .expect("owners set and sequence disagree");

        self.removed.publish(&owner);
        self.components.remove(idx);

        let was_tail = idx == self.components.len();
        if !was_tail {
            self.reallocating_removed.publish(&idx);
        }
        self.owners.remove(&owner);
        true
    }

    #[cfg(test)]
    fn check_invariants(&self) -> bool {
        let sorted = self
            .components
            .windows(2)
            .all(|w| w[0].owner_id < w[1].owner_id);
        let owners_match = self.components.len() == self.owners.len()
            && self.components.iter().all(|c| self.owners.contains(&c.owner_id));
        sorted && owners_match
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eid(raw: u32) -> EntityId {
        EntityId::new(raw)
    }

    #[test]
    fn insertion_keeps_sequence_sorted_by_owner() {
        let mut store = ComponentStore::new("test");
        store.add_to(eid(5), "five");
        store.add_to(eid(1), "one");
        store.add_to(eid(3), "three");

        assert_eq!(store.owner_ids(), vec![eid(1), eid(3), eid(5)]);
        assert!(store.check_invariants());
    }

    #[test]
    fn duplicate_add_is_refused() {
        let mut store = ComponentStore::new("test");
        assert!(store.add_to(eid(1), "a"));
        assert!(!store.add_to(eid(1), "b"));
        assert_eq!(store.owned_by(eid(1)), Some(&"a"));
    }

    #[test]
    fn non_tail_insert_fires_reallocating_added() {
        let mut store = ComponentStore::new("test");
        store.add_to(eid(1), 1);
        store.add_to(eid(5), 5);

        let seen = std::cell::Cell::new(None);
        let _h = store.reallocating_added.subscribe(|idx| seen.set(Some(*idx)));
        store.add_to(eid(3), 3); // inserts between 1 and 5, not at tail
        assert_eq!(seen.get(), Some(1));
    }

    #[test]
    fn tail_insert_does_not_fire_reallocating_added() {
        let mut store = ComponentStore::new("test");
        store.add_to(eid(1), 1);

        let seen = std::cell::Cell::new(false);
        let _h = store.reallocating_added.subscribe(|_| seen.set(true));
        store.add_to(eid(9), 9); // tail insert
        assert!(!seen.get());
    }

    #[test]
    fn remove_from_missing_owner_outside_destroy_is_invariant_violation() {
        let mut store: ComponentStore<&str> = ComponentStore::new("test");
        assert!(!store.remove_from(eid(1), false));
    }

    #[test]
    fn remove_from_missing_owner_during_destroy_is_quiet() {
        let mut store: ComponentStore<&str> = ComponentStore::new("test");
        assert!(!store.remove_from(eid(1), true));
    }

    #[test]
    fn non_tail_remove_fires_reallocating_removed() {
        let mut store = ComponentStore::new("test");
        store.add_to(eid(1), 1);
        store.add_to(eid(3), 3);
        store.add_to(eid(5), 5);

        let seen = std::cell::Cell::new(None);
        let _h = store
            .reallocating_removed
            .subscribe(|idx| seen.set(Some(*idx)));
        store.remove_from(eid(3), false);
        assert_eq!(seen.get(), Some(1));
        assert!(store.check_invariants());
    }

    #[test]
    fn tail_remove_does_not_fire_reallocating_removed() {
        let mut store = ComponentStore::new("test");
        store.add_to(eid(1), 1);
        store.add_to(eid(9), 9);

        let seen = std::cell::Cell::new(false);
        let _h = store
            .reallocating_removed
            .subscribe(|_| seen.set(true));
        store.remove_from(eid(9), false); // tail
        assert!(!seen.get());
    }
}
