//! Collector systems that bridge logical ECS components (mesh/material/
//! model) to the GPU-resident shadow components `engine_renderer::vulkan`
//! reads when recording draws.
//!
//! Grounded in `examples/original_source/source/module/vulkan_ecs/private/
//! vulkan_resource_collectors.cpp`: five collector types (mesh, mesh
//! reference, material, material reference, model), each observing a
//! logical component's lifecycle and maintaining a paired GPU component.
//!
//! The original wires each collector through component-added/removed
//! events fired by the store itself. Reproducing that here would mean
//! firing those events from inside a handler that needs mutable access to
//! the very `World` the event is published from -- `ComponentStore::added`/
//! `removed` publish while already borrowed mutably by
//! `World::add_component`, so a subscriber can't reach back into `World` to
//! attach the paired component without interior mutability
//! (`Rc<RefCell<World>>`) or a command-buffer indirection, and neither the
//! teacher nor the rest of the pack reaches for either. Collectors here run
//! instead as explicit per-tick functions that diff store membership
//! directly ([`membership::sync_added`]/[`sync_removed`]); the observable
//! effect -- a paired component appears exactly when its source does and
//! disappears exactly when its source does -- is unchanged.

mod membership;

pub mod components;
pub mod material_collector;
pub mod mesh_collector;
pub mod model_collector;
pub mod reference_collectors;

pub use components::{EcsMaterial, EcsMesh, EcsModel};
pub use material_collector::MaterialCollector;
pub use mesh_collector::MeshCollector;
pub use model_collector::ModelCollector;
pub use reference_collectors::{MaterialReferenceCollector, MeshReferenceCollector};
