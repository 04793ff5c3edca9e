//! Priority Queue with lazy deletion
//!
//! Uses std::collections::BinaryHeap with a HashMap for O(1) lookup.
//! Supports bulk removal via retain() using the lazy deletion pattern:
//! the HashMap is the source of truth and stale heap keys are skipped.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

/// Key for the priority queue heap.
/// Uses (deadline, tie, id) for deterministic ordering.
#[derive(Clone, Debug)]
struct Key {
    deadline: f64,
    tie: u64,
    id: u64,
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.deadline.to_bits() == other.deadline.to_bits()
            && self.tie == other.tie
            && self.id == other.id
    }
}

impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// BinaryHeap is a max-heap, so we reverse the ordering for min-heap behavior.
impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.deadline
            .total_cmp(&other.deadline)
            .then(self.tie.cmp(&other.tie))
            .then(self.id.cmp(&other.id))
            .reverse()
    }
}

/// A min-priority queue keyed by `f64` deadlines.
pub struct MinPq<M> {
    heap: BinaryHeap<Key>,
    live: HashMap<u64, (f64, u64, M)>, // id -> (deadline, tie, metadata)
}

impl<M> Default for MinPq<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> MinPq<M> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            live: HashMap::new(),
        }
    }

    /// Add an item to the queue. Returns false if id already exists.
    pub fn add(&mut self, id: u64, deadline: f64, tie: u64, meta: M) -> bool {
        if self.live.contains_key(&id) {
            return false;
        }
        self.live.insert(id, (deadline, tie, meta));
        self.heap.push(Key { deadline, tie, id });
        true
    }

    /// Peek the minimum deadline without removing. Returns None if empty.
    pub fn peek_deadline(&mut self) -> Option<f64> {
        self.clean_top();
        self.heap.peek().map(|k| k.deadline)
    }

    /// Pop the minimum item. Returns (id, deadline, metadata).
    pub fn pop(&mut self) -> Option<(u64, f64, M)> {
        loop {
            let k = self.heap.pop()?;
            if !self.is_current(&k) {
                continue; // stale entry
            }
            if let Some((dl, _, meta)) = self.live.remove(&k.id) {
                return Some((k.id, dl, meta));
            }
        }
    }

    /// Keep only the items for which `keep` returns true.
    /// Returns the number of items removed.
    ///
    /// Removed keys stay in the heap until they surface on peek/pop, or
    /// until stale keys outnumber live ones and the heap is rebuilt.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&M) -> bool,
    {
        let before = self.live.len();
        self.live.retain(|_, (_, _, meta)| keep(meta));
        let removed = before - self.live.len();
        if self.heap.len() > 2 * self.live.len() {
            self.compact();
        }
        removed
    }

    /// Rebuild the heap from the live map, dropping every stale key.
    fn compact(&mut self) {
        self.heap = self
            .live
            .iter()
            .map(|(&id, &(deadline, tie, _))| Key { deadline, tie, id })
            .collect();
    }

    /// All live deadlines in ascending order.
    pub fn sorted_deadlines(&self) -> Vec<f64> {
        let mut out: Vec<f64> = self.live.values().map(|(dl, _, _)| *dl).collect();
        out.sort_by(f64::total_cmp);
        out
    }

    /// Iterate over live metadata in no particular order.
    pub fn values(&self) -> impl Iterator<Item = &M> {
        self.live.values().map(|(_, _, m)| m)
    }

    fn is_current(&self, k: &Key) -> bool {
        match self.live.get(&k.id) {
            Some((dl, tie, _)) => dl.to_bits() == k.deadline.to_bits() && *tie == k.tie,
            None => false,
        }
    }

    /// Remove stale entries from the top of the heap.
    fn clean_top(&mut self) {
        while let Some(k) = self.heap.peek() {
            if self.is_current(k) {
                break;
            }
            self.heap.pop();
        }
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Get the number of live items.
    pub fn len(&self) -> usize {
        self.live.len()
    }
}
