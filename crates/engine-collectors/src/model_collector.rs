//! Mirrors `EcsModel` presence into `ModelResources`. No per-frame work
//! beyond membership sync -- a model's mesh and material are resolved
//! through the independently-synced reference collectors, not through any
//! data this collector owns.
//!
//! Grounded in `examples/original_source/source/module/vulkan_ecs/private/
//! vulkan_resource_collectors.cpp`'s `model_collector`.

use engine_ecs::World;
use engine_renderer::ModelResources;

use crate::components::EcsModel;
use crate::membership::{sync_added, sync_removed};

pub struct ModelCollector;

impl ModelCollector {
    pub fn run(world: &mut World) {
        sync_added::<EcsModel, ModelResources>(world);
        sync_removed::<EcsModel, ModelResources>(world);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_resources_tracks_ecs_model_membership() {
        let mut world = World::new();
        world.register::<EcsModel>("ecs_model");
        world.register::<ModelResources>("model_resources");

        let e = world.create_entity();
        world.add_component(e, EcsModel);
        ModelCollector::run(&mut world);
        assert!(world.store::<ModelResources>().unwrap().is_owned_by(e));

        world.remove_component::<EcsModel>(e);
        ModelCollector::run(&mut world);
        assert!(!world.store::<ModelResources>().unwrap().is_owned_by(e));
    }
}
