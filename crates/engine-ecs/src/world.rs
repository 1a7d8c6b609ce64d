//! Aggregation root tying entities to their component stores and reference
//! tables. The original keeps per-type storage as file-scope globals inside
//! each `.cpp` translation unit; threading a `World` through call sites
//! instead is the natural Rust replacement (see Design Notes resolution in
//! `SPEC_FULL.md`) -- it also makes multiple independent worlds (e.g. one
//! per test) possible without global state.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use engine_common::EngineError;

use crate::entity::EntityId;
use crate::reference::{ComponentRef, ReferenceTable};
use crate::store::ComponentStore;

trait ErasedStore: Any {
    fn remove_during_destroy(&mut self, entity: EntityId);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct TypedStore<T: 'static> {
    store: ComponentStore<T>,
    refs: ReferenceTable<T>,
}

impl<T: 'static> ErasedStore for TypedStore<T> {
    fn remove_during_destroy(&mut self, entity: EntityId) {
        self.store.remove_from(entity, true);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Owns every component store, reference table, and live entity id.
pub struct World {
    next_entity: u32,
    stores: HashMap<TypeId, Box<dyn ErasedStore>>,
    /// Component types each entity currently owns, in the order they were
    /// added. Walked in order on destroy so cascading removal is
    /// deterministic.
    owned_types: HashMap<EntityId, Vec<TypeId>>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        Self {
            next_entity: 1,
            stores: HashMap::new(),
            owned_types: HashMap::new(),
        }
    }

    pub fn create_entity(&mut self) -> EntityId {
        let id = EntityId::new(self.next_entity);
        self.next_entity += 1;
        id
    }

    /// Register storage for component type `T` under `name`. Must be called
    /// once per type before any `add_component::<T>`/`query` call.
    pub fn register<T: 'static>(&mut self, name: &'static str) {
        let store = ComponentStore::<T>::new(name);
        let refs = ReferenceTable::new(&store);
        self.stores
            .insert(TypeId::of::<T>(), Box::new(TypedStore { store, refs }));
    }

    fn typed<T: 'static>(&self) -> Option<&TypedStore<T>> {
        self.stores
            .get(&TypeId::of::<T>())
            .and_then(|s| s.as_any().downcast_ref::<TypedStore<T>>())
    }

    fn typed_mut<T: 'static>(&mut self) -> Option<&mut TypedStore<T>> {
        self.stores
            .get_mut(&TypeId::of::<T>())
            .and_then(|s| s.as_any_mut().downcast_mut::<TypedStore<T>>())
    }

    pub fn store<T: 'static>(&self) -> Option<&ComponentStore<T>> {
        self.typed::<T>().map(|t| &t.store)
    }

    pub fn store_mut<T: 'static>(&mut self) -> Option<&mut ComponentStore<T>> {
        self.typed_mut::<T>().map(|t| &mut t.store)
    }

    pub fn add_component<T: 'static>(&mut self, entity: EntityId, value: T) -> bool {
        let Some(typed) = self.typed_mut::<T>() else {
            log::error!(target: "ecs", "add_component on unregistered type for {entity}");
            return false;
        };
        let added = typed.store.add_to(entity, value);
        if added {
            self.owned_types.entry(entity).or_default().push(TypeId::of::<T>());
        }
        added
    }

    pub fn remove_component<T: 'static>(&mut self, entity: EntityId) -> bool {
        let Some(typed) = self.typed_mut::<T>() else {
            log::error!(target: "ecs", "remove_component on unregistered type for {entity}");
            return false;
        };
        typed.store.remove_from(entity, false)
    }

    pub fn create_reference<T: 'static>(&self, target_entity: EntityId) -> Result<ComponentRef<T>, EngineError> {
        let typed = self.typed::<T>().ok_or_else(|| {
            EngineError::Lookup(format!("create_reference on unregistered type for {target_entity}"))
        })?;
        Ok(typed.refs.create(&typed.store, target_entity))
    }

    /// Remove every component `entity` owns, in the order they were added,
    /// and forget the entity. Safe to call on an entity that owns nothing.
    pub fn destroy_entity(&mut self, entity: EntityId) {
        let Some(types) = self.owned_types.remove(&entity) else {
            return;
        };
        for type_id in types {
            if let Some(store) = self.stores.get_mut(&type_id) {
                store.remove_during_destroy(entity);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Position(f32, f32);
    struct Velocity(f32, f32);

    #[test]
    fn destroy_entity_removes_every_owned_type() {
        let mut world = World::new();
        world.register::<Position>("position");
        world.register::<Velocity>("velocity");

        let e = world.create_entity();
        world.add_component(e, Position(0.0, 0.0));
        world.add_component(e, Velocity(1.0, 1.0));

        world.destroy_entity(e);

        assert!(!world.store::<Position>().unwrap().is_owned_by(e));
        assert!(!world.store::<Velocity>().unwrap().is_owned_by(e));
    }

    #[test]
    fn destroy_entity_with_no_components_is_a_no_op() {
        let mut world = World::new();
        world.register::<Position>("position");
        let e = world.create_entity();
        world.destroy_entity(e); // should not panic
        assert!(!world.store::<Position>().unwrap().is_owned_by(e));
    }

    #[test]
    fn reference_created_through_world_tracks_reallocation() {
        let mut world = World::new();
        world.register::<Position>("position");

        let a = world.create_entity();
        let b = world.create_entity();
        world.add_component(a, Position(1.0, 1.0));
        world.add_component(b, Position(2.0, 2.0));

        let r = world.create_reference::<Position>(b).unwrap();
        let third = world.create_entity();
        world.add_component(third, Position(0.0, 0.0)); // may insert before b depending on ids

        let store = world.store::<Position>().unwrap();
        assert!(r.get(store).is_some());
    }
}
