//! Keeps `ComponentRef<MeshResources>` / `ComponentRef<MaterialResources>`
//! in sync with `ComponentRef<EcsMesh>` / `ComponentRef<EcsMaterial>`: when
//! an entity references a mesh (or material) owned by some other entity, it
//! also gets a reference into that same entity's GPU-resource component,
//! for the frame loop to resolve without walking back through the logical
//! component at all.
//!
//! Grounded in `examples/original_source/source/module/vulkan_ecs/private/
//! vulkan_resource_collectors.cpp`'s `mesh_reference_collector` /
//! `material_reference_collector`.

use engine_ecs::{ComponentRef, World};
use engine_renderer::{MaterialResources, MeshResources};

use crate::components::{EcsMaterial, EcsMesh};

macro_rules! reference_collector {
    ($name:ident, $source:ty, $dest:ty) => {
        pub struct $name;

        impl $name {
            pub fn run(world: &mut World) {
                Self::sync_membership(world);
                Self::resync_targets(world);
            }

            fn sync_membership(world: &mut World) {
                let owners = world
                    .store::<ComponentRef<$source>>()
                    .map(|s| s.owner_ids())
                    .unwrap_or_default();
                for owner in owners {
                    let has_dest = world
                        .store::<ComponentRef<$dest>>()
                        .is_some_and(|s| s.is_owned_by(owner));
                    if has_dest {
                        continue;
                    }
                    let target = {
                        let Some(store) = world.store::<ComponentRef<$source>>() else { continue };
                        let Some(r) = store.owned_by(owner) else { continue };
                        r.target_entity()
                    };
                    if let Ok(reference) = world.create_reference::<$dest>(target) {
                        world.add_component(owner, reference);
                    }
                }

                let dest_owners = world
                    .store::<ComponentRef<$dest>>()
                    .map(|s| s.owner_ids())
                    .unwrap_or_default();
                for owner in dest_owners {
                    let still_source = world
                        .store::<ComponentRef<$source>>()
                        .is_some_and(|s| s.is_owned_by(owner));
                    if !still_source {
                        world.remove_component::<ComponentRef<$dest>>(owner);
                    }
                }
            }

            /// If the source reference's target entity has moved since the
            /// destination reference was created, rebuild the destination
            /// to point at the new target. `ComponentRef` has no in-place
            /// retarget, so this replaces the whole component.
            fn resync_targets(world: &mut World) {
                let owners = world
                    .store::<ComponentRef<$source>>()
                    .map(|s| s.owner_ids())
                    .unwrap_or_default();
                for owner in owners {
                    let Some(source_store) = world.store::<ComponentRef<$source>>() else { continue };
                    let Some(source_ref) = source_store.owned_by(owner) else { continue };
                    let source_target = source_ref.target_entity();

                    let dest_target = world
                        .store::<ComponentRef<$dest>>()
                        .and_then(|s| s.owned_by(owner))
                        .map(|r| r.target_entity());

                    if dest_target != Some(source_target) {
                        if let Ok(reference) = world.create_reference::<$dest>(source_target) {
                            world.remove_component::<ComponentRef<$dest>>(owner);
                            world.add_component(owner, reference);
                        }
                    }
                }
            }
        }
    };
}

reference_collector!(MeshReferenceCollector, EcsMesh, MeshResources);
reference_collector!(MaterialReferenceCollector, EcsMaterial, MaterialResources);

#[cfg(test)]
mod tests {
    use super::*;
    use engine_resources::{Mesh, ResourceCache};

    #[test]
    fn reference_collector_attaches_a_paired_reference_to_the_same_target() {
        let mesh_cache: ResourceCache<Mesh> = ResourceCache::new();

        let mut world = World::new();
        world.register::<EcsMesh>("ecs_mesh");
        world.register::<MeshResources>("mesh_resources");
        world.register::<ComponentRef<EcsMesh>>("ref<ecs_mesh>");
        world.register::<ComponentRef<MeshResources>>("ref<mesh_resources>");

        let mesh_owner = world.create_entity();
        world.add_component(mesh_owner, EcsMesh::new(mesh_cache.insert("mem://mesh", Mesh::default())));
        world.add_component(mesh_owner, MeshResources::default());

        let referencer = world.create_entity();
        let mesh_ref = world.create_reference::<EcsMesh>(mesh_owner).unwrap();
        world.add_component(referencer, mesh_ref);

        MeshReferenceCollector::run(&mut world);

        let dest_store = world.store::<ComponentRef<MeshResources>>().unwrap();
        let dest_ref = dest_store.owned_by(referencer).expect("paired reference should have been attached");
        assert_eq!(dest_ref.target_entity(), mesh_owner);
    }

    #[test]
    fn reference_collector_resyncs_when_the_source_retargets() {
        let mesh_cache: ResourceCache<Mesh> = ResourceCache::new();

        let mut world = World::new();
        world.register::<EcsMesh>("ecs_mesh");
        world.register::<MeshResources>("mesh_resources");
        world.register::<ComponentRef<EcsMesh>>("ref<ecs_mesh>");
        world.register::<ComponentRef<MeshResources>>("ref<mesh_resources>");

        let first_owner = world.create_entity();
        world.add_component(first_owner, EcsMesh::new(mesh_cache.insert("mem://a", Mesh::default())));
        world.add_component(first_owner, MeshResources::default());

        let second_owner = world.create_entity();
        world.add_component(second_owner, EcsMesh::new(mesh_cache.insert("mem://b", Mesh::default())));
        world.add_component(second_owner, MeshResources::default());

        let referencer = world.create_entity();
        let first_ref = world.create_reference::<EcsMesh>(first_owner).unwrap();
        world.add_component(referencer, first_ref);
        MeshReferenceCollector::run(&mut world);
        assert_eq!(
            world.store::<ComponentRef<MeshResources>>().unwrap().owned_by(referencer).unwrap().target_entity(),
            first_owner
        );

        world.remove_component::<ComponentRef<EcsMesh>>(referencer);
        let second_ref = world.create_reference::<EcsMesh>(second_owner).unwrap();
        world.add_component(referencer, second_ref);
        MeshReferenceCollector::run(&mut world);

        assert_eq!(
            world.store::<ComponentRef<MeshResources>>().unwrap().owned_by(referencer).unwrap().target_entity(),
            second_owner
        );
    }
}
