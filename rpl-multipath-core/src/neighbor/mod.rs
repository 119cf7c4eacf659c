mod handle;

pub use self::handle::NeighborHandle;
use crate::defaults::DEFAULT_NEIGHBOR_CAPACITY;
use std::net::Ipv6Addr;
use thiserror::Error;

/// Access to the routing protocol's neighbor table.
///
/// The table itself belongs to the routing protocol. The multipath module
/// only traverses it, reads the routing parent predicate and the preferred
/// parent, and reads/writes the per-neighbor congestion flag (`cn`).
///
/// Every accessor must be total: a stale [`NeighborHandle`] resolves to
/// `None` (or `false`), it is never an error.
pub trait NeighborTable {
    /// Iterate over every valid neighbor entry.
    fn neighbors(&self) -> impl Iterator<Item = NeighborHandle> + '_;

    /// Link-local address of the neighbor, `None` if the handle is stale.
    fn address(&self, neighbor: NeighborHandle) -> Option<Ipv6Addr>;

    fn lookup(&self, address: &Ipv6Addr) -> Option<NeighborHandle>;

    /// `true` if the neighbor is a valid routing parent candidate.
    fn is_routing_parent(&self, neighbor: NeighborHandle) -> bool;

    /// Last congestion flag received from the neighbor.
    fn congested(&self, neighbor: NeighborHandle) -> Option<bool>;

    /// Returns `false` if the handle is stale.
    fn set_congested(&mut self, neighbor: NeighborHandle, congested: bool) -> bool;

    /// The neighbor currently used as upstream next hop.
    fn preferred_parent(&self) -> Option<NeighborHandle>;

    #[inline]
    fn contains(&self, neighbor: NeighborHandle) -> bool {
        self.address(neighbor).is_some()
    }

    /// Clear the congestion flag of every neighbor.
    fn clear_congestion(&mut self) {
        let neighbors: Vec<_> = self.neighbors().collect();
        for neighbor in neighbors {
            self.set_congested(neighbor, false);
        }
    }
}

/// A neighbor table entry of the [`NeighborArena`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neighbor {
    address: Ipv6Addr,
    routing_parent: bool,
    congested: bool,
}

impl Neighbor {
    #[inline]
    pub fn address(&self) -> Ipv6Addr {
        self.address
    }

    #[inline]
    pub fn is_routing_parent(&self) -> bool {
        self.routing_parent
    }

    #[inline]
    pub fn is_congested(&self) -> bool {
        self.congested
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    entry: Option<Neighbor>,
}

/// Error returned when updating a [`NeighborArena`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NeighborTableError {
    #[error("neighbor table is full ({capacity} entries)")]
    Full { capacity: usize },
    #[error("neighbor {address} is already in the table")]
    Duplicate { address: Ipv6Addr },
    #[error("neighbor {neighbor} is not in the table")]
    NotFound { neighbor: NeighborHandle },
}

/// A bounded, in-memory [`NeighborTable`].
///
/// Entries live in fixed slots. Removing an entry bumps the slot's
/// generation and puts the slot on a free list, so handles to evicted
/// neighbors stop resolving even once the slot is reused.
///
/// ```
/// use rpl_multipath_core::neighbor::{NeighborArena, NeighborTable};
/// use std::net::Ipv6Addr;
///
/// let mut table = NeighborArena::with_capacity(4);
/// let parent = table.insert(Ipv6Addr::LOCALHOST, true).unwrap();
/// table.set_preferred_parent(Some(parent)).unwrap();
///
/// table.remove(parent);
/// assert!(!table.contains(parent));
/// assert_eq!(table.preferred_parent(), None);
/// ```
#[derive(Debug, Clone)]
pub struct NeighborArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    capacity: usize,
    len: usize,
    preferred_parent: Option<NeighborHandle>,
}

impl Default for NeighborArena {
    fn default() -> Self {
        Self::new()
    }
}

impl NeighborArena {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_NEIGHBOR_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            capacity,
            len: 0,
            preferred_parent: None,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Add a neighbor to the table.
    ///
    /// # Errors
    ///
    /// Fails if the table is full or if a neighbor with the same address
    /// is already present.
    pub fn insert(
        &mut self,
        address: Ipv6Addr,
        routing_parent: bool,
    ) -> Result<NeighborHandle, NeighborTableError> {
        if self.lookup(&address).is_some() {
            return Err(NeighborTableError::Duplicate { address });
        }
        if self.len >= self.capacity {
            return Err(NeighborTableError::Full {
                capacity: self.capacity,
            });
        }

        let entry = Some(Neighbor {
            address,
            routing_parent,
            congested: false,
        });

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    entry: None,
                });
                index
            }
        };
        let slot = &mut self.slots[index as usize];
        slot.entry = entry;
        let generation = slot.generation;
        self.len += 1;

        Ok(NeighborHandle::new(index, generation))
    }

    /// Evict a neighbor.
    ///
    /// If the neighbor was the preferred parent, the node is left without
    /// a preferred parent.
    pub fn remove(&mut self, neighbor: NeighborHandle) -> Option<Neighbor> {
        let slot = self.slot_mut(neighbor)?;
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);

        self.free.push(neighbor.index());
        self.len -= 1;
        if self.preferred_parent == Some(neighbor) {
            self.preferred_parent = None;
        }

        Some(entry)
    }

    pub fn get(&self, neighbor: NeighborHandle) -> Option<&Neighbor> {
        let slot = self.slots.get(neighbor.index() as usize)?;
        if slot.generation != neighbor.generation() {
            return None;
        }
        slot.entry.as_ref()
    }

    fn slot_mut(&mut self, neighbor: NeighborHandle) -> Option<&mut Slot> {
        let slot = self.slots.get_mut(neighbor.index() as usize)?;
        if slot.generation != neighbor.generation() || slot.entry.is_none() {
            return None;
        }
        Some(slot)
    }

    fn entry_mut(&mut self, neighbor: NeighborHandle) -> Option<&mut Neighbor> {
        self.slot_mut(neighbor)?.entry.as_mut()
    }

    /// Select the upstream next hop. `None` leaves the node detached.
    ///
    /// # Errors
    ///
    /// Fails if the handle does not resolve to a neighbor of the table.
    pub fn set_preferred_parent(
        &mut self,
        neighbor: Option<NeighborHandle>,
    ) -> Result<(), NeighborTableError> {
        if let Some(neighbor) = neighbor
            && !self.contains(neighbor)
        {
            return Err(NeighborTableError::NotFound { neighbor });
        }
        self.preferred_parent = neighbor;
        Ok(())
    }

    /// # Errors
    ///
    /// Fails if the handle does not resolve to a neighbor of the table.
    pub fn set_routing_parent(
        &mut self,
        neighbor: NeighborHandle,
        routing_parent: bool,
    ) -> Result<(), NeighborTableError> {
        let entry = self
            .entry_mut(neighbor)
            .ok_or(NeighborTableError::NotFound { neighbor })?;
        entry.routing_parent = routing_parent;
        Ok(())
    }
}

impl NeighborTable for NeighborArena {
    fn neighbors(&self) -> impl Iterator<Item = NeighborHandle> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.entry
                .as_ref()
                .map(|_| NeighborHandle::new(index as u32, slot.generation))
        })
    }

    fn address(&self, neighbor: NeighborHandle) -> Option<Ipv6Addr> {
        self.get(neighbor).map(Neighbor::address)
    }

    fn lookup(&self, address: &Ipv6Addr) -> Option<NeighborHandle> {
        self.neighbors()
            .find(|neighbor| self.address(*neighbor).as_ref() == Some(address))
    }

    fn is_routing_parent(&self, neighbor: NeighborHandle) -> bool {
        self.get(neighbor).is_some_and(Neighbor::is_routing_parent)
    }

    fn congested(&self, neighbor: NeighborHandle) -> Option<bool> {
        self.get(neighbor).map(Neighbor::is_congested)
    }

    fn set_congested(&mut self, neighbor: NeighborHandle, congested: bool) -> bool {
        match self.entry_mut(neighbor) {
            Some(entry) => {
                entry.congested = congested;
                true
            }
            None => false,
        }
    }

    fn preferred_parent(&self) -> Option<NeighborHandle> {
        self.preferred_parent
    }

    fn clear_congestion(&mut self) {
        for entry in self.slots.iter_mut().filter_map(|slot| slot.entry.as_mut()) {
            entry.congested = false;
        }
    }
}
