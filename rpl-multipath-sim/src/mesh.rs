use crate::{
    delivery::Delivery,
    node::{NodeId, SimNode},
    stats::{MeshStats, NodeStats},
};
use rand_chacha::ChaChaRng;
use rand_core::SeedableRng as _;
use rpl_multipath_core::{
    ConfigError, Multipath, MultipathConfig,
    neighbor::{NeighborTable as _, NeighborTableError},
    notification::PacketCountOption,
    scheduler::TickReport,
};
use std::{collections::HashMap, net::Ipv6Addr};
use thiserror::Error;
use tracing::{debug, info, warn};

/// RPL control message type and DAO code, prepended to the sub-option so
/// the parent decodes it at a non-zero offset like in a real report.
const REPORT_HEADER: [u8; 2] = [0x9B, 0x02];

/// A simulated RPL tree running the multipath module on every node.
///
/// Everything is driven by [`Mesh::step`], one detection interval at a time.
/// All randomness comes from a single seeded source, so a run is fully
/// reproducible.
///
/// ```
/// use rpl_multipath_sim::{Delivery, Mesh};
///
/// let mut mesh = Mesh::new();
/// let root = mesh.new_node().build().unwrap();
/// let relay = mesh.new_node().set_parent(root).build().unwrap();
/// let leaf = mesh
///     .new_node()
///     .set_parent(relay)
///     .add_candidate(root)
///     .set_traffic(20)
///     .build()
///     .unwrap();
///
/// // the leaf's uplink breaks down
/// mesh.configure_link(leaf, relay)
///     .set_delivery(Delivery::NONE)
///     .apply()
///     .unwrap();
///
/// for _ in 0..3 {
///     mesh.step();
/// }
/// assert_eq!(mesh.node(leaf).unwrap().alternate(), Some(root));
/// ```
#[derive(Debug)]
pub struct Mesh {
    nodes: Vec<SimNode>,
    links: HashMap<(NodeId, NodeId), Delivery>,
    rng: ChaChaRng,
    steps: u64,
}

/// Error returned when building the mesh.
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("Unknown node {id}")]
    UnknownNode { id: NodeId },
    #[error("Nodes {a} and {b} are not neighbors")]
    NotNeighbors { a: NodeId, b: NodeId },
    #[error("The mesh cannot hold more than {max} nodes")]
    TooManyNodes { max: usize },
    #[error("Invalid multipath configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Neighbor(#[from] NeighborTableError),
}

/// Summary of one [`Mesh::step`].
#[derive(Debug, Clone)]
pub struct StepReport {
    pub step: u64,
    /// Data packets absorbed by the sinks.
    pub delivered: u64,
    /// Data packets lost on a link or for lack of a route.
    pub lost: u64,
    pub ticks: Vec<(NodeId, TickReport)>,
}

pub struct NodeBuilder<'a> {
    mesh: &'a mut Mesh,
    parent: Option<NodeId>,
    candidates: Vec<NodeId>,
    traffic: u32,
    config: Option<MultipathConfig>,
}

impl NodeBuilder<'_> {
    /// Attach the node under `parent`. A node without parent is a sink.
    pub fn set_parent(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Add a neighbor the node may use as alternate parent.
    pub fn add_candidate(mut self, candidate: NodeId) -> Self {
        self.candidates.push(candidate);
        self
    }

    /// Number of data packets the node originates every interval.
    pub fn set_traffic(mut self, packets: u32) -> Self {
        self.traffic = packets;
        self
    }

    /// Use a specific configuration. By default every node uses
    /// [`MultipathConfig::default`] seeded with its identifier.
    pub fn set_config(mut self, config: MultipathConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<NodeId, MeshError> {
        let Self {
            mesh,
            parent,
            candidates,
            traffic,
            config,
        } = self;

        let id = u16::try_from(mesh.nodes.len())
            .map(NodeId::new)
            .map_err(|_| MeshError::TooManyNodes {
                max: usize::from(u16::MAX) + 1,
            })?;
        for other in parent.iter().chain(&candidates) {
            mesh.get(*other)?;
        }

        let config =
            config.unwrap_or_else(|| MultipathConfig::default().set_seed(id.index() as u64));
        let mut node = SimNode::new(id, parent, Multipath::new(config)?);
        node.traffic = traffic;

        if let Some(parent) = parent {
            let handle = node.neighbors.insert(parent.address(), true)?;
            node.neighbors.set_preferred_parent(Some(handle))?;
        }
        for candidate in &candidates {
            node.neighbors.insert(candidate.address(), true)?;
        }
        for other in parent.iter().chain(&candidates) {
            mesh.nodes[other.index()]
                .neighbors
                .insert(id.address(), false)?;
        }

        node.multipath.start(&mut node.timer);
        mesh.nodes.push(node);

        debug!(%id, parent = ?parent, ?candidates, traffic, "Node added to the mesh");

        Ok(id)
    }
}

pub struct LinkBuilder<'a> {
    mesh: &'a mut Mesh,
    a: NodeId,
    b: NodeId,
    delivery: Delivery,
}

impl LinkBuilder<'_> {
    pub fn set_delivery(mut self, delivery: Delivery) -> Self {
        self.delivery = delivery;
        self
    }

    /// # Errors
    ///
    /// Fails if either node is unknown or if they are not neighbors.
    pub fn apply(self) -> Result<(), MeshError> {
        let Self { mesh, a, b, delivery } = self;

        let node = mesh.get(a)?;
        mesh.get(b)?;
        if node.neighbors.lookup(&b.address()).is_none() {
            return Err(MeshError::NotNeighbors { a, b });
        }

        mesh.links.insert(link(a, b), delivery);
        Ok(())
    }
}

/// Links are symmetric.
#[inline]
fn link(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    if a <= b { (a, b) } else { (b, a) }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            links: HashMap::new(),
            rng: ChaChaRng::seed_from_u64(0),
            steps: 0,
        }
    }

    /// Set the seed of the random source deciding packet delivery.
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = ChaChaRng::seed_from_u64(seed);
    }

    pub fn new_node(&mut self) -> NodeBuilder<'_> {
        NodeBuilder {
            mesh: self,
            parent: None,
            candidates: Vec::new(),
            traffic: 0,
            config: None,
        }
    }

    /// Configure the link between two neighbors. Unconfigured links
    /// deliver every packet.
    pub fn configure_link(&mut self, a: NodeId, b: NodeId) -> LinkBuilder<'_> {
        LinkBuilder {
            mesh: self,
            a,
            b,
            delivery: Delivery::default(),
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&SimNode> {
        self.nodes.get(id.index())
    }

    fn get(&self, id: NodeId) -> Result<&SimNode, MeshError> {
        self.node(id).ok_or(MeshError::UnknownNode { id })
    }

    pub fn nodes(&self) -> impl Iterator<Item = &SimNode> + '_ {
        self.nodes.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of intervals simulated so far.
    #[inline]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn delivery(&self, a: NodeId, b: NodeId) -> Delivery {
        self.links.get(&link(a, b)).copied().unwrap_or_default()
    }

    /// Make `node` forget about `neighbor`, as when its neighbor entry
    /// times out.
    ///
    /// If `neighbor` was the preferred parent the node is left detached.
    /// Returns `true` if the node's alternate route had to be withdrawn.
    pub fn evict_neighbor(&mut self, node: NodeId, neighbor: NodeId) -> Result<bool, MeshError> {
        self.get(node)?;
        let node = &mut self.nodes[node.index()];

        let Some(handle) = node.neighbors.lookup(&neighbor.address()) else {
            return Err(MeshError::NotNeighbors {
                a: node.id,
                b: neighbor,
            });
        };
        node.neighbors.remove(handle);
        if node.parent == Some(neighbor) {
            node.parent = None;
        }

        let withdrawn = node.multipath.on_neighbor_removed(handle, &mut node.routes);
        info!(node = %node.id, %neighbor, withdrawn, "Neighbor evicted");
        Ok(withdrawn)
    }

    /// Simulate one detection interval.
    ///
    /// 1. every node originates its traffic and forwards what it received,
    ///    deepest nodes first, through the preferred parent and, while
    ///    multipath is active, the alternate parent in turn;
    /// 2. every node reports its packet count to its preferred parent;
    /// 3. congested nodes raise the flag on their advertisement;
    /// 4. every node runs its detection interval.
    pub fn step(&mut self) -> StepReport {
        self.steps += 1;

        let mut report = StepReport {
            step: self.steps,
            delivered: 0,
            lost: 0,
            ticks: Vec::with_capacity(self.nodes.len()),
        };

        self.forward(&mut report);
        self.exchange_packet_counts();
        self.advertise();

        for node in &mut self.nodes {
            if let Some(tick) = node.multipath.tick(
                &mut node.neighbors,
                &mut node.routes,
                &mut node.advertiser,
                &mut node.timer,
            ) {
                report.ticks.push((node.id, tick));
            }
        }

        report
    }

    fn forward(&mut self, report: &mut StepReport) {
        // parents and candidates are always older than their children
        for index in (0..self.nodes.len()).rev() {
            let node = &mut self.nodes[index];
            let from = node.id;
            let inbox = std::mem::take(&mut node.inbox);

            if node.sink {
                node.received += u64::from(inbox);
                report.delivered += u64::from(inbox);
                continue;
            }

            node.originated += u64::from(node.traffic);
            let packets = node.traffic.saturating_add(inbox);

            for _ in 0..packets {
                let node = &mut self.nodes[index];
                let Some(hop) = node.next_hop() else {
                    node.lost += 1;
                    report.lost += 1;
                    continue;
                };

                node.forwarded += 1;
                if node.parent == Some(hop) {
                    node.multipath.on_packet_sent();
                } else {
                    node.via_alternate += 1;
                }

                let delivery = self.delivery(from, hop);
                if delivery.should_deliver(&mut self.rng) {
                    let next = &mut self.nodes[hop.index()];
                    next.inbox = next.inbox.saturating_add(1);
                    next.multipath.on_packet_received();
                } else {
                    self.nodes[index].lost += 1;
                    report.lost += 1;
                }
            }
        }
    }

    fn exchange_packet_counts(&mut self) {
        const LEN: usize = REPORT_HEADER.len() + PacketCountOption::ENCODED_LEN;

        for index in 0..self.nodes.len() {
            let node = &mut self.nodes[index];
            let Some(parent) = node.parent else {
                continue;
            };

            let option = node.multipath.packet_count_option();
            let mut message = [0; LEN];
            message[..REPORT_HEADER.len()].copy_from_slice(&REPORT_HEADER);
            if let Err(error) = option.encode(&mut message[REPORT_HEADER.len()..]) {
                warn!(node = %node.id, %error, "Cannot build the upward report");
                continue;
            }

            self.nodes[parent.index()]
                .multipath
                .process_packet_count_option(&message, REPORT_HEADER.len());
        }
    }

    fn advertise(&mut self) {
        let senders: Vec<Ipv6Addr> = self
            .nodes
            .iter_mut()
            .filter_map(|node| node.advertiser.take().then_some(node.id.address()))
            .collect();

        for sender in &senders {
            for node in &mut self.nodes {
                if node.neighbors.lookup(sender).is_none() {
                    continue;
                }
                let activation = node.multipath.on_congestion_notification(
                    sender,
                    &mut node.neighbors,
                    &mut node.routes,
                );
                if let Some(activation) = activation {
                    debug!(node = %node.id, %sender, ?activation, "Congestion signal from parent");
                }
            }
        }
    }

    pub fn stats(&self) -> MeshStats {
        MeshStats {
            steps: self.steps,
            nodes: self
                .nodes
                .iter()
                .map(|node| NodeStats {
                    id: node.id,
                    parent: node.parent,
                    alternate: node.alternate(),
                    multipath: node.multipath.stats(),
                    originated: node.originated,
                    forwarded: node.forwarded,
                    via_alternate: node.via_alternate,
                    received: node.received,
                    lost: node.lost,
                })
                .collect(),
        }
    }
}
