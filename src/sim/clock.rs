//! A minimal virtual-time event queue.
//!
//! This is the in-crate stand-in for the "network simulation kernel"
//! carved out of scope by §1: a full deployment would substitute a
//! process/cluster-wide virtual-time scheduler here, but the node state
//! machines in [`crate::node`] only ever see this trait-shaped surface
//! (`now`, `schedule`, `cancel`, `pop_next`), so the substitution is
//! transparent to them.

use crate::blockchain::BlockId;
use crate::network::PeerAddress;
use crate::protocol::NetworkMessage;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

pub type EventId = u64;

/// The four event sources listed in §2's control-flow paragraph, plus the
/// validation-completion event §4.5 schedules internally.
#[derive(Clone, Debug)]
pub enum EventKind {
    /// A message has finished crossing the peer link and is ready to be
    /// handed to the receiving node's message handler.
    PacketArrival {
        from: PeerAddress,
        to: PeerAddress,
        message: NetworkMessage,
    },
    /// A miner's (or order node's) block-production timer fired.
    MiningTimer { node: PeerAddress },
    /// An outstanding `queueInv` entry timed out (§4.8).
    InvTimeout { node: PeerAddress, hash: String },
    /// A client's `create_transaction` timer fired (§4.6).
    ClientTransactionTimer { node: PeerAddress },
    /// A previously-scheduled block validation (§4.5) has completed.
    ValidationComplete { node: PeerAddress, block_id: BlockId },
}

struct ScheduledEvent {
    time: f64,
    seq: u64,
    id: EventId,
    kind: EventKind,
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}
impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the earliest time (and,
        // among ties, the earliest-scheduled event) pops first.
        other
            .time
            .partial_cmp(&self.time)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A single-process discrete-event queue driven by virtual time. Event
/// handles are opaque `u64`s; cancellation is always safe and idempotent
/// (§5), implemented by marking the id cancelled and skipping it when it's
/// popped rather than searching the heap.
pub struct EventQueue {
    heap: BinaryHeap<ScheduledEvent>,
    cancelled: HashSet<EventId>,
    now: f64,
    next_id: EventId,
    next_seq: u64,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub fn new() -> Self {
        EventQueue {
            heap: BinaryHeap::new(),
            cancelled: HashSet::new(),
            now: 0.0,
            next_id: 1,
            next_seq: 0,
        }
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    /// Schedule `kind` to fire at virtual time `at`, which must be
    /// `>= now()`. Returns an id that can be passed to [`Self::cancel`].
    pub fn schedule(&mut self, at: f64, kind: EventKind) -> EventId {
        debug_assert!(at + 1e-9 >= self.now, "cannot schedule into the past");
        let id = self.next_id;
        self.next_id += 1;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(ScheduledEvent {
            time: at.max(self.now),
            seq,
            id,
            kind,
        });
        id
    }

    /// Idempotent: cancelling an id twice, or an id that already fired, is
    /// a no-op rather than an error.
    pub fn cancel(&mut self, id: EventId) {
        self.cancelled.insert(id);
    }

    /// Pop the next non-cancelled event, advancing virtual time to its
    /// scheduled time. Returns `None` once the queue is drained.
    pub fn pop_next(&mut self) -> Option<(EventId, EventKind)> {
        loop {
            let ev = self.heap.pop()?;
            if self.cancelled.remove(&ev.id) {
                continue;
            }
            self.now = ev.time;
            return Some((ev.id, ev.kind));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.heap.len() == self.cancelled.len()
    }

    pub fn pending_count(&self) -> usize {
        self.heap.len().saturating_sub(self.cancelled.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timer(node: PeerAddress) -> EventKind {
        EventKind::ClientTransactionTimer { node }
    }

    #[test]
    fn events_pop_in_time_order_regardless_of_schedule_order() {
        let mut q = EventQueue::new();
        q.schedule(5.0, timer(1));
        q.schedule(1.0, timer(2));
        q.schedule(3.0, timer(3));

        let mut order = Vec::new();
        while let Some((_, kind)) = q.pop_next() {
            if let EventKind::ClientTransactionTimer { node } = kind {
                order.push(node);
            }
        }
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn ties_break_fifo_by_schedule_order() {
        let mut q = EventQueue::new();
        q.schedule(1.0, timer(1));
        q.schedule(1.0, timer(2));

        let (_, first) = q.pop_next().unwrap();
        let (_, second) = q.pop_next().unwrap();
        assert!(matches!(first, EventKind::ClientTransactionTimer { node: 1 }));
        assert!(matches!(second, EventKind::ClientTransactionTimer { node: 2 }));
    }

    #[test]
    fn cancel_is_idempotent_and_skips_the_event() {
        let mut q = EventQueue::new();
        let id = q.schedule(1.0, timer(1));
        q.schedule(2.0, timer(2));
        q.cancel(id);
        q.cancel(id); // second cancel: no-op, must not panic

        let (_, kind) = q.pop_next().unwrap();
        assert!(matches!(kind, EventKind::ClientTransactionTimer { node: 2 }));
        assert!(q.pop_next().is_none());
    }

    #[test]
    fn now_tracks_the_most_recently_popped_event() {
        let mut q = EventQueue::new();
        q.schedule(7.5, timer(1));
        assert_eq!(q.now(), 0.0);
        q.pop_next();
        assert_eq!(q.now(), 7.5);
    }
}
