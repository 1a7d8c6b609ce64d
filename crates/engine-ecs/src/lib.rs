//! Entity-component storage built on `engine_common`'s event bus.
//!
//! Every component type gets its own owner-sorted [`store::ComponentStore`]
//! plus a [`reference::ReferenceTable`] for stable cross-component handles;
//! [`world::World`] is the aggregation root that ties entity lifetime to
//! both. This crate never opens a log sink of its own -- it only calls
//! `log::*`, same as every other core crate.

pub mod entity;
pub mod query;
pub mod reference;
pub mod store;
pub mod world;

pub use engine_common::event::{self, Event, Handler};
pub use entity::EntityId;
pub use query::intersect_owner_ids;
pub use reference::{ComponentRef, ReferenceTable};
pub use store::{ComponentStore, OwnedComponent};
pub use world::World;
