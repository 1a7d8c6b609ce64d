//! Shared membership-sync helper used by every collector pair: attach the
//! paired destination component to every entity that owns the source
//! component and doesn't have one yet, detach it from every entity that has
//! one but no longer owns the source. Plain per-tick diffing in place of
//! event subscriptions -- see the crate doc comment for why.

use engine_ecs::World;

pub(crate) fn sync_added<S: 'static, D: 'static + Default>(world: &mut World) {
    let Some(source_owners) = world.store::<S>().map(|s| s.owner_ids()) else {
        return;
    };
    for owner in source_owners {
        let has_dest = world.store::<D>().is_some_and(|d| d.is_owned_by(owner));
        if !has_dest {
            world.add_component(owner, D::default());
        }
    }
}

pub(crate) fn sync_removed<S: 'static, D: 'static>(world: &mut World) {
    let Some(dest_owners) = world.store::<D>().map(|s| s.owner_ids()) else {
        return;
    };
    for owner in dest_owners {
        let still_source = world.store::<S>().is_some_and(|s| s.is_owned_by(owner));
        if !still_source {
            world.remove_component::<D>(owner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Source(u32);
    #[derive(Default)]
    struct Dest(u32);

    #[test]
    fn added_source_gains_a_default_destination() {
        let mut world = World::new();
        world.register::<Source>("source");
        world.register::<Dest>("dest");

        let e = world.create_entity();
        world.add_component(e, Source(1));

        sync_added::<Source, Dest>(&mut world);
        assert!(world.store::<Dest>().unwrap().is_owned_by(e));
    }

    #[test]
    fn removed_source_loses_its_destination() {
        let mut world = World::new();
        world.register::<Source>("source");
        world.register::<Dest>("dest");

        let e = world.create_entity();
        world.add_component(e, Source(1));
        sync_added::<Source, Dest>(&mut world);

        world.remove_component::<Source>(e);
        sync_removed::<Source, Dest>(&mut world);
        assert!(!world.store::<Dest>().unwrap().is_owned_by(e));
    }

    #[test]
    fn existing_destination_is_not_duplicated() {
        let mut world = World::new();
        world.register::<Source>("source");
        world.register::<Dest>("dest");

        let e = world.create_entity();
        world.add_component(e, Source(1));
        sync_added::<Source, Dest>(&mut world);
        sync_added::<Source, Dest>(&mut world); // second pass, should be a no-op
        assert!(world.store::<Dest>().unwrap().is_owned_by(e));
    }
}
