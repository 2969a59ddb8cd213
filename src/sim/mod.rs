//! The event clock (§5), topology generation (§4.10), and the `World` that
//! wires both together with the [`crate::node::Node`] fleet (§2 control
//! flow, §6 driver).

pub mod clock;
pub mod topology;
pub mod world;

pub use clock::{EventId, EventKind, EventQueue};
pub use topology::{NodeTopology, Region, RandomTopology, TopologyGenerator};
pub use world::World;
