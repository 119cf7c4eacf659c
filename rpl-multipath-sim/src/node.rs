use rpl_multipath_core::{
    Multipath,
    neighbor::NeighborArena,
    notification::AdvertisementFlag,
    route::DefaultRouteTable,
    scheduler::ManualTimer,
};
use std::{fmt, net::Ipv6Addr, str};

/// The identifier of a node of the [`Mesh`](crate::Mesh)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u16);

impl NodeId {
    pub const ZERO: Self = NodeId::new(0);

    pub(crate) const fn new(id: u16) -> Self {
        Self(id)
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        usize::from(self.0)
    }

    /// Link-local address of the node, derived from its identifier the way
    /// 6LoWPAN derives one from a 16-bit short address.
    ///
    /// ```
    /// # use rpl_multipath_sim::NodeId;
    /// # use std::net::Ipv6Addr;
    /// let address = NodeId::ZERO.address();
    /// assert_eq!(address, "fe80::ff:fe00:0".parse::<Ipv6Addr>().unwrap());
    /// assert_eq!(NodeId::from_address(&address), Some(NodeId::ZERO));
    /// ```
    pub fn address(self) -> Ipv6Addr {
        Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0x00ff, 0xfe00, self.0)
    }

    pub fn from_address(address: &Ipv6Addr) -> Option<Self> {
        match address.segments() {
            [0xfe80, 0, 0, 0, 0, 0x00ff, 0xfe00, id] => Some(Self(id)),
            _ => None,
        }
    }
}

impl str::FromStr for NodeId {
    type Err = std::num::ParseIntError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A simulated node: the multipath module and the host collaborators it
/// drives.
#[derive(Debug)]
pub struct SimNode {
    pub(crate) id: NodeId,
    pub(crate) parent: Option<NodeId>,
    pub(crate) multipath: Multipath,
    pub(crate) neighbors: NeighborArena,
    pub(crate) routes: DefaultRouteTable,
    pub(crate) advertiser: AdvertisementFlag,
    pub(crate) timer: ManualTimer,

    /// data packets originated every interval
    pub(crate) traffic: u32,
    /// data packets received during the current interval, to be forwarded
    pub(crate) inbox: u32,
    /// built without a parent: absorbs the traffic it receives
    pub(crate) sink: bool,
    /// alternates packets between the two next hops while multipath is on
    pub(crate) split: bool,

    pub(crate) originated: u64,
    pub(crate) forwarded: u64,
    pub(crate) via_alternate: u64,
    pub(crate) received: u64,
    pub(crate) lost: u64,
}

impl SimNode {
    pub(crate) fn new(id: NodeId, parent: Option<NodeId>, multipath: Multipath) -> Self {
        Self {
            id,
            parent,
            multipath,
            neighbors: NeighborArena::new(),
            routes: DefaultRouteTable::new(),
            advertiser: AdvertisementFlag::new(),
            timer: ManualTimer::new(),
            traffic: 0,
            inbox: 0,
            sink: parent.is_none(),
            split: false,
            originated: 0,
            forwarded: 0,
            via_alternate: 0,
            received: 0,
            lost: 0,
        }
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The preferred parent, `None` for a sink or a detached node.
    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[inline]
    pub fn is_sink(&self) -> bool {
        self.sink
    }

    pub fn multipath(&self) -> &Multipath {
        &self.multipath
    }

    pub fn neighbors(&self) -> &NeighborArena {
        &self.neighbors
    }

    pub fn routes(&self) -> &DefaultRouteTable {
        &self.routes
    }

    /// The node currently used as alternate next hop.
    pub fn alternate(&self) -> Option<NodeId> {
        self.multipath
            .state()
            .alternate_next_hop()
            .as_ref()
            .and_then(NodeId::from_address)
    }

    /// Next hop of the next data packet.
    pub(crate) fn next_hop(&mut self) -> Option<NodeId> {
        let parent = self.parent?;
        let Some(alternate) = self.alternate() else {
            return Some(parent);
        };
        self.split = !self.split;
        Some(if self.split { parent } else { alternate })
    }
}
