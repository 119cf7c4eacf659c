/*!
# RPL multipath simulation

A deterministic, single-threaded simulation of an RPL tree in which every
node runs [`rpl_multipath_core`]. It stands in for the routing protocol:
it owns each node's neighbor and route tables, carries the packet count
sub-option upward and the congestion flag downward, and decides with a
seeded random source which data packets survive each link.

*/

mod delivery;
mod mesh;
mod node;
pub mod stats;

// convenient re-export of `rpl_multipath_core` configuration objects
pub use rpl_multipath_core::{
    Activation, DetectionInterval, MultipathConfig, SelectionPolicy, ThresholdRatio,
};

pub use self::{
    delivery::{Delivery, DeliveryError, DeliveryParseError},
    mesh::{LinkBuilder, Mesh, MeshError, NodeBuilder, StepReport},
    node::{NodeId, SimNode},
    stats::{MeshStats, NodeStats},
};
