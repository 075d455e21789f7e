//! The callback queue: a circular, doubly-linked list ordered by
//! non-decreasing `expiration_time`, with FIFO tie-breaking (spec §3, §4.2).
//!
//! Spec §9 explicitly allows substituting an intrusive list with
//! arena-backed node storage in a typed systems language. We do that with
//! `slab::Slab` instead of raw/intrusive pointers: `next`/`prev` become
//! `Option<usize>` slab keys, so there is no `unsafe` anywhere in the queue.
//!
//! `slab` recycles keys immediately after `remove`, which would make a
//! stale [`NodeHandle`] silently alias a *different* node inserted later
//! (a classic ABA hazard). Each node also carries a monotonic `sequence`;
//! a handle is only valid if the slot at its key still holds that sequence,
//! which is what makes `cancel_callback` idempotent rather than dangerous
//! (spec §5's "Cancellation semantics").

use slab::Slab;

use crate::priority::Priority;

pub type Continuation = Option<Callback>;
pub type Callback = Box<dyn FnOnce(&crate::deadline::Deadline) -> Continuation>;

struct Node {
    priority: Priority,
    expiration_time: f64,
    sequence: u64,
    callback: Option<Callback>,
    next: Option<usize>,
    prev: Option<usize>,
}

/// Cancellation handle returned by [`Queue::insert`]. Opaque to callers;
/// only meaningful when passed back to the same `Queue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHandle {
    key: usize,
    sequence: u64,
}

/// A detached node pulled off the head by [`Queue::pop_front`].
pub struct PoppedNode {
    pub priority: Priority,
    pub expiration_time: f64,
    pub callback: Callback,
}

pub struct Queue {
    slots: Slab<Node>,
    head: Option<usize>,
    next_sequence: u64,
}

impl Queue {
    pub fn new() -> Self {
        Self { slots: Slab::new(), head: None, next_sequence: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn head_expiration(&self) -> Option<f64> {
        self.head.map(|k| self.slots[k].expiration_time)
    }

    pub fn head_priority(&self) -> Option<Priority> {
        self.head.map(|k| self.slots[k].priority)
    }

    /// Whether `handle` currently names the head node. Callers use this to
    /// decide whether an insert needs to (re-)arm the host (spec §4.2
    /// steps 3/5).
    pub fn is_head(&self, handle: NodeHandle) -> bool {
        self.head == Some(handle.key) && self.slots.get(handle.key).is_some_and(|n| n.sequence == handle.sequence)
    }

    /// Insert a new node per spec §4.2 step 4: walk forward from head until
    /// a node with `expiration_time` *strictly greater* than the new one is
    /// found (ties go after existing equals), or the walk wraps back to
    /// head without finding one (append at the tail).
    pub fn insert(
        &mut self,
        priority: Priority,
        expiration_time: f64,
        callback: Callback,
    ) -> NodeHandle {
        self.insert_with(priority, expiration_time, callback, |existing, new| existing > new)
    }

    /// Insert a continuation per spec §4.4 step 4: same-expiration peers
    /// are beaten (`>=` instead of `>`), so a continuation resumes *ahead*
    /// of siblings enqueued earlier at the same deadline. This is the
    /// intentional-but-surprising asymmetry spec §9 calls out explicitly.
    pub fn insert_continuation(
        &mut self,
        priority: Priority,
        expiration_time: f64,
        callback: Callback,
    ) -> NodeHandle {
        self.insert_with(priority, expiration_time, callback, |existing, new| existing >= new)
    }

    fn insert_with(
        &mut self,
        priority: Priority,
        expiration_time: f64,
        callback: Callback,
        beats: impl Fn(f64, f64) -> bool,
    ) -> NodeHandle {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let node = Node {
            priority,
            expiration_time,
            sequence,
            callback: Some(callback),
            next: None,
            prev: None,
        };

        let key = self.slots.insert(node);

        let Some(head) = self.head else {
            self.slots[key].next = Some(key);
            self.slots[key].prev = Some(key);
            self.head = Some(key);
            return NodeHandle { key, sequence };
        };

        let len = self.len();
        let mut cur = head;
        let mut found: Option<usize> = None;
        for _ in 0..len {
            if beats(self.slots[cur].expiration_time, expiration_time) {
                found = Some(cur);
                break;
            }
            cur = self.slots[cur].next.expect("ring node missing next");
        }

        let insertion_point = found.unwrap_or(head);
        let prev = self.slots[insertion_point].prev.expect("ring node missing prev");

        self.slots[key].prev = Some(prev);
        self.slots[key].next = Some(insertion_point);
        self.slots[prev].next = Some(key);
        self.slots[insertion_point].prev = Some(key);

        // Only a genuine match (found on the scan, not the wrap fallback)
        // means the new node is earliest and becomes head.
        if found == Some(head) {
            self.head = Some(key);
        }

        NodeHandle { key, sequence }
    }

    /// O(1), idempotent: a handle whose slot is gone, or whose slot has
    /// been recycled for an unrelated node, is treated as already-removed.
    /// Returns whether a live node was actually detached, so callers can
    /// tell a genuine cancellation apart from a no-op against a handle
    /// that's already gone (spec §5: cancelling mid-execution, after the
    /// running node already detached itself, is exactly this case).
    pub fn cancel(&mut self, handle: NodeHandle) -> bool {
        let Some(node) = self.slots.get(handle.key) else { return false };
        if node.sequence != handle.sequence {
            return false;
        }
        self.detach(handle.key);
        self.slots.remove(handle.key);
        true
    }

    /// Detach and return the head node (spec §4.4 `flushFirstCallback`
    /// step 1: links are nulled *before* the callback runs).
    pub fn pop_front(&mut self) -> Option<PoppedNode> {
        let key = self.head?;
        self.detach(key);
        let node = self.slots.remove(key);
        Some(PoppedNode {
            priority: node.priority,
            expiration_time: node.expiration_time,
            callback: node.callback.expect("popped node missing callback"),
        })
    }

    /// Splice `key` out of the ring, updating `head` if necessary. Does not
    /// remove the slab entry — callers that are replacing (not completing)
    /// a node reuse the slot's data via `slots.remove` themselves.
    fn detach(&mut self, key: usize) {
        let node_next = self.slots[key].next.expect("ring node missing next");
        let node_prev = self.slots[key].prev.expect("ring node missing prev");

        if node_next == key {
            // Sole element.
            self.head = None;
        } else {
            self.slots[node_prev].next = Some(node_next);
            self.slots[node_next].prev = Some(node_prev);
            if self.head == Some(key) {
                self.head = Some(node_next);
            }
        }
    }

    /// Re-enqueue the callback returned by a running node as a
    /// continuation (spec §4.4 step 4), reusing the popped node's priority
    /// and expiration but a fresh sequence number.
    pub fn reinsert_continuation(&mut self, popped: &PoppedNode, callback: Callback) -> NodeHandle {
        self.insert_continuation(popped.priority, popped.expiration_time, callback)
    }

    #[cfg(test)]
    pub fn expirations_in_order(&self) -> Vec<f64> {
        let mut out = Vec::new();
        let Some(head) = self.head else { return out };
        let mut cur = head;
        loop {
            out.push(self.slots[cur].expiration_time);
            cur = self.slots[cur].next.unwrap();
            if cur == head {
                break;
            }
        }
        out
    }
}

impl Default for Queue {
    fn default() -> Self {
        Self::new()
    }
}
