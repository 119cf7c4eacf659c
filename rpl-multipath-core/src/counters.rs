use std::sync::atomic::{AtomicU32, Ordering};

/// Per-interval traffic tallies of a node.
///
/// These are the raw signal of the congestion estimation:
///
/// * `rx` counts the packets received from children since the last
///   detection interval;
/// * `rx_expected` accumulates what the children claim to have forwarded
///   to this node, as reported in their packet count sub-option;
/// * `tx_toward_parent` counts what this node forwarded toward its own
///   parent since the last counter exchange.
///
/// # Thread Safety
///
/// The packet path holds an `Arc<PacketCounters>` and may increment it at
/// any point, including between two steps of the detection interval. Every
/// field is an independent [`AtomicU32`]: no invariant spans two fields, so
/// an increment landing between a read and the following reset is simply
/// counted in the next interval or lost, never corrupting the counters.
///
/// Counters saturate at [`u32::MAX`] instead of wrapping around.
#[derive(Debug, Default)]
pub struct PacketCounters {
    rx: AtomicU32,
    rx_expected: AtomicU32,
    tx_toward_parent: AtomicU32,
}

/// A copy of the [`PacketCounters`] at a given point in time.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CountersSnapshot {
    pub rx: u32,
    pub rx_expected: u32,
    pub tx_toward_parent: u32,
}

/// use total ordering, the counters are shared with the packet path.
const ORDERING: Ordering = Ordering::SeqCst;

/// Returns the value of the counter after the addition.
#[inline]
fn saturating_add(counter: &AtomicU32, value: u32) -> u32 {
    // `Err` when already saturated, nothing to store
    let previous = counter.fetch_update(ORDERING, ORDERING, |current| {
        (current != u32::MAX).then(|| current.saturating_add(value))
    });
    match previous {
        Ok(previous) => previous.saturating_add(value),
        Err(saturated) => saturated,
    }
}

impl PacketCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one packet received from a child.
    #[inline]
    pub fn record_rx(&self) {
        saturating_add(&self.rx, 1);
    }

    /// Account for one transmission toward the parent, regardless of the
    /// link layer outcome.
    #[inline]
    pub fn record_tx(&self) {
        saturating_add(&self.tx_toward_parent, 1);
    }

    /// Add the count a child reported to have forwarded to us.
    #[inline]
    pub fn apply_expected(&self, count: u32) {
        saturating_add(&self.rx_expected, count);
    }

    /// Read and clear the number of packets forwarded toward the parent.
    ///
    /// This is a single atomic swap: a transmission completing concurrently
    /// is either part of the returned value or of the next exchange.
    ///
    /// ```
    /// # use rpl_multipath_core::PacketCounters;
    /// let counters = PacketCounters::new();
    /// counters.record_tx();
    /// counters.record_tx();
    /// assert_eq!(counters.take_and_reset_tx(), 2);
    /// assert_eq!(counters.take_and_reset_tx(), 0);
    /// ```
    #[inline]
    pub fn take_and_reset_tx(&self) -> u32 {
        self.tx_toward_parent.swap(0, ORDERING)
    }

    /// Start a new detection interval: zero `rx` and `rx_expected`.
    ///
    /// `tx_toward_parent` is left untouched, it is only cleared when it is
    /// sent to the parent (see [`PacketCounters::take_and_reset_tx`]).
    pub fn reset_interval(&self) {
        self.rx.store(0, ORDERING);
        self.rx_expected.store(0, ORDERING);
    }

    #[inline]
    pub fn rx(&self) -> u32 {
        self.rx.load(ORDERING)
    }

    #[inline]
    pub fn rx_expected(&self) -> u32 {
        self.rx_expected.load(ORDERING)
    }

    #[inline]
    pub fn tx_toward_parent(&self) -> u32 {
        self.tx_toward_parent.load(ORDERING)
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            rx: self.rx(),
            rx_expected: self.rx_expected(),
            tx_toward_parent: self.tx_toward_parent(),
        }
    }
}
