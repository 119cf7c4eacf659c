use super::{RoutePriority, RouteTable};
use crate::{
    config::{Hysteresis, SelectionPolicy},
    neighbor::{NeighborHandle, NeighborTable},
};
use rand_core::Rng;
use std::net::Ipv6Addr;
use tracing::{debug, info, warn};

/// The alternate neighbor and the next hop its route was installed with.
///
/// The address is kept so the route can still be withdrawn once the
/// neighbor entry is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Alternate {
    neighbor: NeighborHandle,
    next_hop: Ipv6Addr,
}

/// State of the multipath mode.
///
/// The mode is active exactly when an alternate neighbor is recorded, and
/// an alternate neighbor is recorded exactly when its secondary default
/// route is installed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MultipathState {
    alternate: Option<Alternate>,
    suppressed: bool,
    active_intervals: u32,
    hold_down: u32,
}

impl MultipathState {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.alternate.is_some()
    }

    /// `true` while congestion signals are ignored after a withdrawal.
    #[inline]
    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    pub fn alternate_neighbor(&self) -> Option<NeighborHandle> {
        self.alternate.map(|alternate| alternate.neighbor)
    }

    pub fn alternate_next_hop(&self) -> Option<Ipv6Addr> {
        self.alternate.map(|alternate| alternate.next_hop)
    }

    /// Number of detection intervals the current alternate route has seen.
    pub fn active_intervals(&self) -> u32 {
        self.active_intervals
    }
}

/// Result of an activation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Installed {
        neighbor: NeighborHandle,
        next_hop: Ipv6Addr,
    },
    /// A valid alternate route is already installed, nothing was done.
    AlreadyActive,
    /// Activation is held down after a recent withdrawal.
    Suppressed,
    /// The node has no preferred parent.
    NoParent,
    /// No neighbor qualifies as alternate.
    NoCandidate,
    /// The route table refused the secondary route.
    RouteRejected { next_hop: Ipv6Addr },
}

impl Activation {
    pub fn is_installed(&self) -> bool {
        matches!(self, Self::Installed { .. })
    }
}

/// Why an alternate route was withdrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The preferred parent no longer reports congestion.
    ParentUncongested,
    /// The node lost its preferred parent.
    NoParent,
    /// The alternate neighbor was evicted from the neighbor table.
    AlternateEvicted,
    /// The routing protocol picked the alternate neighbor as new preferred parent.
    AlternateIsPreferredParent,
    /// The alternate neighbor is no longer a routing parent.
    AlternateNotRoutingParent,
    /// The module is shutting down.
    Shutdown,
}

/// What happened to the route at an interval boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalOutcome {
    Inactive,
    /// The preferred parent is still congested.
    Kept,
    /// The parent recovered but the route has not been active long enough.
    Deferred,
    Withdrawn(StopReason),
}

/// Installs and withdraws the secondary default route.
#[derive(Debug, Clone)]
pub struct RouteManager {
    policy: SelectionPolicy,
    priority: RoutePriority,
    hysteresis: Hysteresis,
    state: MultipathState,
}

impl RouteManager {
    pub fn new(policy: SelectionPolicy, priority: RoutePriority, hysteresis: Hysteresis) -> Self {
        Self {
            policy,
            priority,
            hysteresis,
            state: MultipathState::default(),
        }
    }

    #[inline]
    pub fn state(&self) -> &MultipathState {
        &self.state
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Handle a congestion signal from the preferred parent.
    ///
    /// A second call while a valid alternate route is installed does
    /// nothing. If the recorded alternate is no longer usable, its route is
    /// withdrawn before a new alternate is selected.
    pub fn activate<N, R, G>(&mut self, neighbors: &N, routes: &mut R, rng: &mut G) -> Activation
    where
        N: NeighborTable,
        R: RouteTable,
        G: Rng,
    {
        if let Some(alternate) = self.state.alternate {
            match self.check_alternate(neighbors, alternate) {
                None => return Activation::AlreadyActive,
                Some(reason) => {
                    self.stop(routes, reason);
                }
            }
        }

        if self.state.suppressed {
            debug!(hold_down = self.state.hold_down, "Multipath activation suppressed");
            return Activation::Suppressed;
        }

        let Some(preferred) = neighbors.preferred_parent() else {
            debug!("No preferred parent, multipath activation skipped");
            return Activation::NoParent;
        };

        let Some((neighbor, next_hop)) = select_alternate(self.policy, neighbors, preferred, rng)
            .and_then(|neighbor| Some((neighbor, neighbors.address(neighbor)?)))
        else {
            debug!(policy = ?self.policy, "No alternate parent available");
            return Activation::NoCandidate;
        };

        if let Err(error) = routes.add_secondary_default_route(next_hop, self.priority) {
            warn!(%next_hop, %error, "Secondary default route rejected");
            return Activation::RouteRejected { next_hop };
        }

        self.state.alternate = Some(Alternate { neighbor, next_hop });
        self.state.active_intervals = 0;

        info!(
            %next_hop,
            %neighbor,
            priority = %self.priority,
            "Multipath activated"
        );

        Activation::Installed { neighbor, next_hop }
    }

    /// Withdraw the secondary route, if any, and return its next hop.
    pub fn stop<R>(&mut self, routes: &mut R, reason: StopReason) -> Option<Ipv6Addr>
    where
        R: RouteTable,
    {
        let Alternate { neighbor, next_hop } = self.state.alternate.take()?;
        routes.remove_default_route(next_hop);

        let active_intervals = std::mem::take(&mut self.state.active_intervals);
        if reason == StopReason::ParentUncongested && self.hysteresis.hold_down_intervals > 0 {
            self.state.suppressed = true;
            self.state.hold_down = self.hysteresis.hold_down_intervals;
        }

        info!(%next_hop, %neighbor, ?reason, active_intervals, "Multipath deactivated");

        Some(next_hop)
    }

    /// Re-evaluate the alternate route at the end of a detection interval.
    ///
    /// The route is kept while the preferred parent's latest congestion flag
    /// is set. It is forcibly withdrawn, hysteresis notwithstanding, when the
    /// node has no preferred parent or when the alternate neighbor is gone
    /// or no longer usable as a parent.
    pub fn on_interval<N, R>(&mut self, neighbors: &N, routes: &mut R) -> IntervalOutcome
    where
        N: NeighborTable,
        R: RouteTable,
    {
        let Some(alternate) = self.state.alternate else {
            self.release_hold_down();
            return IntervalOutcome::Inactive;
        };

        if let Some(reason) = self.check_alternate(neighbors, alternate) {
            self.stop(routes, reason);
            return IntervalOutcome::Withdrawn(reason);
        }

        self.state.active_intervals = self.state.active_intervals.saturating_add(1);

        let parent_congested = neighbors
            .preferred_parent()
            .and_then(|parent| neighbors.congested(parent))
            .unwrap_or(false);
        if parent_congested {
            return IntervalOutcome::Kept;
        }

        if self.state.active_intervals < self.hysteresis.min_active_intervals {
            debug!(
                active_intervals = self.state.active_intervals,
                min_active_intervals = self.hysteresis.min_active_intervals,
                "Multipath withdrawal deferred"
            );
            return IntervalOutcome::Deferred;
        }

        let reason = StopReason::ParentUncongested;
        self.stop(routes, reason);
        IntervalOutcome::Withdrawn(reason)
    }

    /// Withdraw the route immediately if `neighbor` is the alternate.
    pub fn on_neighbor_removed<R>(&mut self, neighbor: NeighborHandle, routes: &mut R) -> bool
    where
        R: RouteTable,
    {
        if self.state.alternate_neighbor() != Some(neighbor) {
            return false;
        }
        self.stop(routes, StopReason::AlternateEvicted).is_some()
    }

    /// `None` if the alternate is still usable, otherwise why it is not.
    fn check_alternate<N>(&self, neighbors: &N, alternate: Alternate) -> Option<StopReason>
    where
        N: NeighborTable,
    {
        if !neighbors.contains(alternate.neighbor) {
            return Some(StopReason::AlternateEvicted);
        }
        match neighbors.preferred_parent() {
            None => Some(StopReason::NoParent),
            Some(parent) if parent == alternate.neighbor => {
                Some(StopReason::AlternateIsPreferredParent)
            }
            Some(_) if !neighbors.is_routing_parent(alternate.neighbor) => {
                Some(StopReason::AlternateNotRoutingParent)
            }
            Some(_) => None,
        }
    }

    fn release_hold_down(&mut self) {
        if !self.state.suppressed {
            return;
        }
        self.state.hold_down = self.state.hold_down.saturating_sub(1);
        if self.state.hold_down == 0 {
            self.state.suppressed = false;
            debug!("Multipath hold-down released");
        }
    }
}

#[inline]
fn is_candidate<N>(neighbors: &N, neighbor: NeighborHandle, preferred: NeighborHandle) -> bool
where
    N: NeighborTable,
{
    neighbor != preferred && neighbors.is_routing_parent(neighbor)
}

/// Pick an alternate to `preferred` according to `policy`.
pub fn select_alternate<N, G>(
    policy: SelectionPolicy,
    neighbors: &N,
    preferred: NeighborHandle,
    rng: &mut G,
) -> Option<NeighborHandle>
where
    N: NeighborTable,
    G: Rng,
{
    match policy {
        SelectionPolicy::Deterministic => select_deterministic(neighbors, preferred),
        SelectionPolicy::Randomized { attempts } => {
            select_randomized(neighbors, preferred, attempts, rng)
        }
    }
}

fn select_deterministic<N>(neighbors: &N, preferred: NeighborHandle) -> Option<NeighborHandle>
where
    N: NeighborTable,
{
    let mut fallback = None;
    for neighbor in neighbors.neighbors() {
        if !is_candidate(neighbors, neighbor, preferred) {
            continue;
        }
        if neighbors.congested(neighbor) == Some(false) {
            return Some(neighbor);
        }
        fallback = Some(neighbor);
    }
    fallback
}

fn select_randomized<N, G>(
    neighbors: &N,
    preferred: NeighborHandle,
    attempts: u8,
    rng: &mut G,
) -> Option<NeighborHandle>
where
    N: NeighborTable,
    G: Rng,
{
    let count = neighbors.neighbors().count();
    if count == 0 {
        return None;
    }

    (0..attempts).find_map(|_| {
        let neighbor = neighbors.neighbors().nth(uniform(rng, count))?;
        let usable = is_candidate(neighbors, neighbor, preferred)
            && neighbors.congested(neighbor) == Some(false);
        usable.then_some(neighbor)
    })
}

/// Uniform draw in `0..bound` (multiply-shift, `bound` must be non-zero).
#[inline]
fn uniform<G: Rng>(rng: &mut G, bound: usize) -> usize {
    ((u64::from(rng.next_u32()) * bound as u64) >> 32) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        neighbor::NeighborArena,
        route::{DefaultRouteTable, RoutePriority},
    };
    use rand_chacha::ChaChaRng;
    use rand_core::SeedableRng as _;

    const SECONDARY: RoutePriority = RoutePriority::new(1);

    fn addr(n: u16) -> Ipv6Addr {
        Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, n)
    }

    fn rng() -> ChaChaRng {
        ChaChaRng::seed_from_u64(42)
    }

    /// a preferred parent (address 1) and `candidates` other routing parents
    fn network(candidates: u16) -> (NeighborArena, NeighborHandle, Vec<NeighborHandle>) {
        let mut table = NeighborArena::with_capacity(16);
        let parent = table.insert(addr(1), true).unwrap();
        table.set_preferred_parent(Some(parent)).unwrap();
        let others = (0..candidates)
            .map(|i| table.insert(addr(i + 2), true).unwrap())
            .collect();
        (table, parent, others)
    }

    fn manager() -> RouteManager {
        RouteManager::new(SelectionPolicy::Deterministic, SECONDARY, Hysteresis::DISABLED)
    }

    #[test]
    fn deterministic_selects_first_uncongested() {
        let (table, parent, candidates) = network(3);
        let mut routes = DefaultRouteTable::new();
        let mut manager = manager();

        let activation = manager.activate(&table, &mut routes, &mut rng());

        assert_eq!(
            activation,
            Activation::Installed {
                neighbor: candidates[0],
                next_hop: addr(2)
            }
        );
        assert!(manager.is_active());
        assert_eq!(manager.state().alternate_neighbor(), Some(candidates[0]));
        assert_ne!(manager.state().alternate_neighbor(), Some(parent));
        assert_eq!(routes.len(), 1);
        assert_eq!(routes.routes()[0].priority, SECONDARY);
    }

    #[test]
    fn deterministic_skips_congested() {
        let (mut table, _, candidates) = network(3);
        table.set_congested(candidates[0], true);

        let selected = select_alternate(
            SelectionPolicy::Deterministic,
            &table,
            table.preferred_parent().unwrap(),
            &mut rng(),
        );
        assert_eq!(selected, Some(candidates[1]));
    }

    #[test]
    fn deterministic_falls_back_to_last_congested_candidate() {
        let (mut table, parent, candidates) = network(3);
        for candidate in &candidates {
            table.set_congested(*candidate, true);
        }

        let selected =
            select_alternate(SelectionPolicy::Deterministic, &table, parent, &mut rng());
        assert_eq!(selected, Some(candidates[2]));
    }

    #[test]
    fn non_routing_parents_are_never_selected() {
        let (mut table, parent, candidates) = network(2);
        for candidate in &candidates {
            table.set_routing_parent(*candidate, false).unwrap();
        }

        assert_eq!(
            select_alternate(SelectionPolicy::Deterministic, &table, parent, &mut rng()),
            None
        );
        assert_eq!(
            select_alternate(
                SelectionPolicy::Randomized { attempts: 32 },
                &table,
                parent,
                &mut rng()
            ),
            None
        );
    }

    #[test]
    fn randomized_finds_a_candidate() {
        let (table, parent, candidates) = network(3);

        let selected = select_alternate(
            SelectionPolicy::Randomized { attempts: 64 },
            &table,
            parent,
            &mut rng(),
        )
        .unwrap();
        assert!(candidates.contains(&selected));
    }

    #[test]
    fn randomized_only_returns_valid_candidates() {
        let (mut table, parent, candidates) = network(4);
        table.set_congested(candidates[1], true);
        table.set_routing_parent(candidates[2], false).unwrap();

        for seed in 0..200 {
            let mut rng = ChaChaRng::seed_from_u64(seed);
            if let Some(selected) = select_alternate(
                SelectionPolicy::Randomized { attempts: 1 },
                &table,
                parent,
                &mut rng,
            ) {
                assert!(
                    selected == candidates[0] || selected == candidates[3],
                    "seed {seed} selected {selected}"
                );
            }
        }
    }

    #[test]
    fn randomized_is_reproducible() {
        let (table, parent, _) = network(8);
        let policy = SelectionPolicy::Randomized { attempts: 1 };

        let a: Vec<_> = {
            let mut rng = ChaChaRng::seed_from_u64(7);
            (0..50)
                .map(|_| select_alternate(policy, &table, parent, &mut rng))
                .collect()
        };
        let b: Vec<_> = {
            let mut rng = ChaChaRng::seed_from_u64(7);
            (0..50)
                .map(|_| select_alternate(policy, &table, parent, &mut rng))
                .collect()
        };
        assert_eq!(a, b);
    }

    #[test]
    fn uniform_stays_in_bounds() {
        let mut rng = rng();
        for bound in 1..20 {
            for _ in 0..100 {
                assert!(uniform(&mut rng, bound) < bound);
            }
        }
    }

    #[test]
    fn activation_is_idempotent() {
        let (table, _, _) = network(3);
        let mut routes = DefaultRouteTable::new();
        let mut manager = manager();
        let mut rng = rng();

        assert!(manager.activate(&table, &mut routes, &mut rng).is_installed());
        assert_eq!(
            manager.activate(&table, &mut routes, &mut rng),
            Activation::AlreadyActive
        );
        assert_eq!(routes.len(), 1);
    }

    #[test]
    fn no_parent() {
        let (mut table, _, _) = network(3);
        table.set_preferred_parent(None).unwrap();
        let mut routes = DefaultRouteTable::new();
        let mut manager = manager();

        assert_eq!(
            manager.activate(&table, &mut routes, &mut rng()),
            Activation::NoParent
        );
        assert!(!manager.is_active());
        assert!(routes.is_empty());
    }

    #[test]
    fn no_candidate() {
        let (table, _, _) = network(0);
        let mut routes = DefaultRouteTable::new();
        let mut manager = manager();

        assert_eq!(
            manager.activate(&table, &mut routes, &mut rng()),
            Activation::NoCandidate
        );
        assert!(!manager.is_active());
        assert!(routes.is_empty());
    }

    #[test]
    fn route_rejected() {
        let (table, _, _) = network(1);
        let mut routes = DefaultRouteTable::with_capacity(0);
        let mut manager = manager();

        assert_eq!(
            manager.activate(&table, &mut routes, &mut rng()),
            Activation::RouteRejected { next_hop: addr(2) }
        );
        assert!(!manager.is_active());
        assert_eq!(manager.state().alternate_neighbor(), None);
    }

    #[test]
    fn withdrawn_when_parent_recovers() {
        let (mut table, parent, _) = network(3);
        let mut routes = DefaultRouteTable::new();
        let mut manager = manager();

        table.set_congested(parent, true);
        manager.activate(&table, &mut routes, &mut rng());
        assert_eq!(manager.on_interval(&table, &mut routes), IntervalOutcome::Kept);
        assert!(manager.is_active());

        table.set_congested(parent, false);
        assert_eq!(
            manager.on_interval(&table, &mut routes),
            IntervalOutcome::Withdrawn(StopReason::ParentUncongested)
        );
        assert!(!manager.is_active());
        assert_eq!(manager.state().alternate_neighbor(), None);
        assert!(routes.is_empty());
    }

    #[test]
    fn deactivation_clears_state_from_any_state() {
        let (table, _, _) = network(3);
        let mut routes = DefaultRouteTable::new();

        // never activated
        let mut manager = manager();
        assert_eq!(manager.stop(&mut routes, StopReason::Shutdown), None);
        assert_eq!(manager.state().alternate_neighbor(), None);

        // activated
        manager.activate(&table, &mut routes, &mut rng());
        assert_eq!(manager.stop(&mut routes, StopReason::Shutdown), Some(addr(2)));
        assert_eq!(manager.state().alternate_neighbor(), None);
        assert!(routes.is_empty());

        // stopped twice
        assert_eq!(manager.stop(&mut routes, StopReason::Shutdown), None);
        assert!(routes.is_empty());
    }

    #[test]
    fn dangling_alternate_is_withdrawn() {
        let (mut table, parent, candidates) = network(3);
        let mut routes = DefaultRouteTable::new();
        let mut manager = manager();

        table.set_congested(parent, true);
        manager.activate(&table, &mut routes, &mut rng());
        table.remove(candidates[0]);
        // the freed slot is reused by someone else
        let intruder = table.insert(addr(99), true).unwrap();
        assert_eq!(intruder.index(), candidates[0].index());

        assert_eq!(
            manager.on_interval(&table, &mut routes),
            IntervalOutcome::Withdrawn(StopReason::AlternateEvicted)
        );
        assert!(!manager.is_active());
        assert!(routes.is_empty());
    }

    #[test]
    fn neighbor_removed_callback() {
        let (mut table, _, candidates) = network(3);
        let mut routes = DefaultRouteTable::new();
        let mut manager = manager();

        manager.activate(&table, &mut routes, &mut rng());
        assert!(!manager.on_neighbor_removed(candidates[1], &mut routes));
        assert!(manager.is_active());

        table.remove(candidates[0]);
        assert!(manager.on_neighbor_removed(candidates[0], &mut routes));
        assert!(!manager.is_active());
        assert!(routes.is_empty());
    }

    #[test]
    fn reactivation_replaces_dangling_alternate() {
        let (mut table, _, candidates) = network(3);
        let mut routes = DefaultRouteTable::new();
        let mut manager = manager();
        let mut rng = rng();

        manager.activate(&table, &mut routes, &mut rng);
        table.remove(candidates[0]);

        let activation = manager.activate(&table, &mut routes, &mut rng);
        assert_eq!(
            activation,
            Activation::Installed {
                neighbor: candidates[1],
                next_hop: addr(3)
            }
        );
        assert_eq!(routes.len(), 1);
        assert!(routes.get(&addr(2)).is_none());
    }

    #[test]
    fn lost_parent_forces_inactive() {
        let (mut table, parent, _) = network(3);
        let mut routes = DefaultRouteTable::new();
        let mut manager = manager();

        table.set_congested(parent, true);
        manager.activate(&table, &mut routes, &mut rng());
        table.remove(parent);

        assert_eq!(
            manager.on_interval(&table, &mut routes),
            IntervalOutcome::Withdrawn(StopReason::NoParent)
        );
        assert!(routes.is_empty());
    }

    #[test]
    fn alternate_promoted_to_preferred_parent() {
        let (mut table, parent, candidates) = network(3);
        let mut routes = DefaultRouteTable::new();
        let mut manager = manager();

        table.set_congested(parent, true);
        manager.activate(&table, &mut routes, &mut rng());
        table.set_preferred_parent(Some(candidates[0])).unwrap();

        assert_eq!(
            manager.on_interval(&table, &mut routes),
            IntervalOutcome::Withdrawn(StopReason::AlternateIsPreferredParent)
        );
        assert!(routes.is_empty());
    }

    #[test]
    fn alternate_demoted_from_routing_parent() {
        let (mut table, parent, candidates) = network(3);
        let mut routes = DefaultRouteTable::new();
        let mut manager = manager();
        let mut rng = rng();

        table.set_congested(parent, true);
        manager.activate(&table, &mut routes, &mut rng);
        table.set_routing_parent(candidates[0], false).unwrap();

        assert_eq!(
            manager.on_interval(&table, &mut routes),
            IntervalOutcome::Withdrawn(StopReason::AlternateNotRoutingParent)
        );
        assert!(routes.is_empty());

        // the next activation skips the demoted neighbor
        assert_eq!(
            manager.activate(&table, &mut routes, &mut rng),
            Activation::Installed {
                neighbor: candidates[1],
                next_hop: addr(3)
            }
        );
        assert!(routes.get(&addr(2)).is_none());
    }

    #[test]
    fn minimum_active_time_defers_withdrawal() {
        let (table, _, _) = network(3);
        let mut routes = DefaultRouteTable::new();
        let mut manager = RouteManager::new(
            SelectionPolicy::Deterministic,
            SECONDARY,
            Hysteresis {
                min_active_intervals: 3,
                hold_down_intervals: 0,
            },
        );

        manager.activate(&table, &mut routes, &mut rng());
        assert_eq!(manager.on_interval(&table, &mut routes), IntervalOutcome::Deferred);
        assert_eq!(manager.on_interval(&table, &mut routes), IntervalOutcome::Deferred);
        assert_eq!(
            manager.on_interval(&table, &mut routes),
            IntervalOutcome::Withdrawn(StopReason::ParentUncongested)
        );
        assert!(routes.is_empty());
    }

    #[test]
    fn minimum_active_time_does_not_hold_forced_withdrawal() {
        let (mut table, _, _) = network(3);
        let mut routes = DefaultRouteTable::new();
        let mut manager = RouteManager::new(
            SelectionPolicy::Deterministic,
            SECONDARY,
            Hysteresis {
                min_active_intervals: 10,
                hold_down_intervals: 0,
            },
        );

        manager.activate(&table, &mut routes, &mut rng());
        table.set_preferred_parent(None).unwrap();
        assert_eq!(
            manager.on_interval(&table, &mut routes),
            IntervalOutcome::Withdrawn(StopReason::NoParent)
        );
    }

    #[test]
    fn hold_down_suppresses_reactivation() {
        let (table, _, _) = network(3);
        let mut routes = DefaultRouteTable::new();
        let mut manager = RouteManager::new(
            SelectionPolicy::Deterministic,
            SECONDARY,
            Hysteresis {
                min_active_intervals: 0,
                hold_down_intervals: 2,
            },
        );
        let mut rng = rng();

        manager.activate(&table, &mut routes, &mut rng);
        assert_eq!(
            manager.on_interval(&table, &mut routes),
            IntervalOutcome::Withdrawn(StopReason::ParentUncongested)
        );
        assert!(manager.state().is_suppressed());
        assert_eq!(
            manager.activate(&table, &mut routes, &mut rng),
            Activation::Suppressed
        );

        assert_eq!(manager.on_interval(&table, &mut routes), IntervalOutcome::Inactive);
        assert!(manager.state().is_suppressed());
        assert_eq!(manager.on_interval(&table, &mut routes), IntervalOutcome::Inactive);
        assert!(!manager.state().is_suppressed());

        assert!(manager.activate(&table, &mut routes, &mut rng).is_installed());
    }
}
