//! Mesh observability types.
//!
//! Obtain a snapshot via [`Mesh::stats`](crate::Mesh::stats).

use crate::node::NodeId;
use rpl_multipath_core::MultipathStats;

/// Statistics for a single node of the [`Mesh`](crate::Mesh).
#[derive(Debug, Clone)]
pub struct NodeStats {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    /// Alternate parent while multipath is active.
    pub alternate: Option<NodeId>,
    /// The node's multipath module.
    pub multipath: MultipathStats,
    /// Data packets originated by the node.
    pub originated: u64,
    /// Data packets sent to a next hop, originated or relayed.
    pub forwarded: u64,
    /// Share of `forwarded` sent through the alternate parent.
    pub via_alternate: u64,
    /// Data packets absorbed, for a sink.
    pub received: u64,
    /// Data packets lost on the node's uplinks or for lack of a route.
    pub lost: u64,
}

/// Point-in-time snapshot of the entire simulated mesh.
#[derive(Debug, Clone)]
pub struct MeshStats {
    /// Number of detection intervals simulated.
    pub steps: u64,
    pub nodes: Vec<NodeStats>,
}

impl MeshStats {
    pub fn node(&self, id: NodeId) -> Option<&NodeStats> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Nodes with an alternate route installed.
    pub fn active(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .filter(|node| node.multipath.active)
            .map(|node| node.id)
    }

    /// Data packets absorbed by the sinks.
    pub fn delivered(&self) -> u64 {
        self.nodes.iter().map(|node| node.received).sum()
    }

    pub fn lost(&self) -> u64 {
        self.nodes.iter().map(|node| node.lost).sum()
    }
}
