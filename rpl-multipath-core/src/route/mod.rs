mod manager;

pub use self::manager::{
    Activation, IntervalOutcome, MultipathState, RouteManager, StopReason, select_alternate,
};
use crate::defaults::DEFAULT_ROUTE_CAPACITY;
use anyhow::{Result, bail, ensure};
use std::{fmt, net::Ipv6Addr};

/// Preference of a default route.
///
/// Lower values are preferred. The routing protocol owns the
/// [`RoutePriority::PRIMARY`] route toward the preferred parent, the
/// secondary route installed by the multipath module always has a lower
/// preference (i.e. a greater value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoutePriority(u8);

impl RoutePriority {
    pub const PRIMARY: Self = Self(0);

    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    #[inline]
    pub fn into_u8(self) -> u8 {
        self.0
    }

    /// `true` if a route with this priority is used only when `other` is not.
    #[inline]
    pub fn is_lower_than(self, other: Self) -> bool {
        self.0 > other.0
    }
}

impl fmt::Display for RoutePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The node's default route table.
///
/// Every successful [`add_secondary_default_route`] is paired with exactly
/// one later [`remove_default_route`] for the same next hop.
///
/// [`add_secondary_default_route`]: RouteTable::add_secondary_default_route
/// [`remove_default_route`]: RouteTable::remove_default_route
pub trait RouteTable {
    /// Install a default route toward `next_hop` alongside the primary one.
    ///
    /// # Errors
    ///
    /// The route table may refuse the route, e.g. when it is full. The
    /// multipath module then stays inactive.
    fn add_secondary_default_route(
        &mut self,
        next_hop: Ipv6Addr,
        priority: RoutePriority,
    ) -> Result<()>;

    fn remove_default_route(&mut self, next_hop: Ipv6Addr);
}

/// A secondary default route entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DefaultRoute {
    pub next_hop: Ipv6Addr,
    pub priority: RoutePriority,
}

/// A bounded, in-memory table of secondary default routes.
///
/// The primary route toward the preferred parent is managed by the routing
/// protocol and is not stored here.
///
/// ```
/// use rpl_multipath_core::route::{DefaultRouteTable, RoutePriority, RouteTable};
/// use std::net::Ipv6Addr;
///
/// let mut routes = DefaultRouteTable::with_capacity(2);
/// routes
///     .add_secondary_default_route(Ipv6Addr::LOCALHOST, RoutePriority::new(1))
///     .unwrap();
/// assert_eq!(routes.len(), 1);
///
/// routes.remove_default_route(Ipv6Addr::LOCALHOST);
/// assert!(routes.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct DefaultRouteTable {
    routes: Vec<DefaultRoute>,
    capacity: usize,
}

impl Default for DefaultRouteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultRouteTable {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_ROUTE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            routes: Vec::with_capacity(capacity),
            capacity,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn routes(&self) -> &[DefaultRoute] {
        &self.routes
    }

    pub fn get(&self, next_hop: &Ipv6Addr) -> Option<&DefaultRoute> {
        self.routes.iter().find(|route| route.next_hop == *next_hop)
    }
}

impl RouteTable for DefaultRouteTable {
    fn add_secondary_default_route(
        &mut self,
        next_hop: Ipv6Addr,
        priority: RoutePriority,
    ) -> Result<()> {
        ensure!(
            priority.is_lower_than(RoutePriority::PRIMARY),
            "secondary route to {next_hop} must have a lower priority than the primary route"
        );
        if self.get(&next_hop).is_some() {
            bail!("default route to {next_hop} already installed")
        }
        ensure!(
            self.routes.len() < self.capacity,
            "default route table full ({} entries)",
            self.capacity
        );

        self.routes.push(DefaultRoute { next_hop, priority });
        Ok(())
    }

    fn remove_default_route(&mut self, next_hop: Ipv6Addr) {
        self.routes.retain(|route| route.next_hop != next_hop);
    }
}
