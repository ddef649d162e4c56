use std::cmp::Ordering;
use std::collections::BinaryHeap;

use hashbrown::HashMap;
use strata_blocks::BlockId;
use strata_geom::{Dims, Vec3S};

/// A cell whose change still has to reach viewers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BroadcastEntry {
    pub pos: Vec3S,
    pub priority: u8,
    /// Type before the edit that queued this entry.
    pub old: BlockId,
}

/// Final state of one cell as sent to viewers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockUpdate {
    pub pos: Vec3S,
    pub ty: BlockId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Queued {
    entry: BroadcastEntry,
    seq: u64,
}

impl Ord for Queued {
    // Max-heap: higher priority first, then lower sequence (earlier insert) first.
    fn cmp(&self, other: &Self) -> Ordering {
        self.entry
            .priority
            .cmp(&other.entry.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Priority queue of pending change notifications. Entries of equal priority
/// come out in insertion order.
#[derive(Debug, Default, Clone)]
pub struct BroadcastQueue {
    heap: BinaryHeap<Queued>,
    next_seq: u64,
}

impl BroadcastQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: BroadcastEntry) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.heap.push(Queued { entry, seq });
    }

    pub fn pop(&mut self) -> Option<BroadcastEntry> {
        self.heap.pop().map(|q| q.entry)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Pops up to `limit` entries (all when `None`) in processing order.
    pub fn drain_ordered(&mut self, limit: Option<usize>) -> Vec<BroadcastEntry> {
        let n = limit.map_or(self.heap.len(), |l| l.min(self.heap.len()));
        let mut out = Vec::with_capacity(n);
        while out.len() < n {
            match self.pop() {
                Some(e) => out.push(e),
                None => break,
            }
        }
        out
    }

    /// Drops entries for cells outside `dims`; relative order of the rest is kept.
    pub fn retain_in(&mut self, dims: Dims) {
        let kept: Vec<Queued> = std::mem::take(&mut self.heap)
            .into_vec()
            .into_iter()
            .filter(|q| dims.contains(q.entry.pos))
            .collect();
        self.heap = BinaryHeap::from(kept);
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Drains up to `limit` entries and collapses them to one update per cell
    /// carrying the type `current` reports; cells `current` no longer knows are
    /// skipped.
    ///
    /// Every pending entry of a drained cell leaves the queue in the same batch,
    /// even past the limit. The cell's type before the batch is the `old` of its
    /// earliest inserted entry; cells that ended up back at that type are elided.
    pub fn drain_updates(
        &mut self,
        limit: Option<usize>,
        current: impl Fn(Vec3S) -> Option<BlockId>,
    ) -> Vec<BlockUpdate> {
        let n = limit.map_or(self.heap.len(), |l| l.min(self.heap.len()));
        // pos -> (seq, old) of the earliest entry seen
        let mut before: HashMap<Vec3S, (u64, BlockId)> = HashMap::new();
        let mut order = Vec::new();
        for _ in 0..n {
            let Some(q) = self.heap.pop() else { break };
            note_earliest(&mut before, &mut order, &q);
        }
        if !self.heap.is_empty() && !order.is_empty() {
            let rest = std::mem::take(&mut self.heap).into_vec();
            let mut kept = Vec::with_capacity(rest.len());
            for q in rest {
                if before.contains_key(&q.entry.pos) {
                    note_earliest(&mut before, &mut order, &q);
                } else {
                    kept.push(q);
                }
            }
            self.heap = BinaryHeap::from(kept);
        }
        order
            .into_iter()
            .filter_map(|pos| {
                let ty = current(pos)?;
                let old = before.get(&pos).map(|&(_, old)| old);
                (old != Some(ty)).then_some(BlockUpdate { pos, ty })
            })
            .collect()
    }
}

fn note_earliest(
    before: &mut HashMap<Vec3S, (u64, BlockId)>,
    order: &mut Vec<Vec3S>,
    q: &Queued,
) {
    let slot = before.entry(q.entry.pos).or_insert_with(|| {
        order.push(q.entry.pos);
        (q.seq, q.entry.old)
    });
    if q.seq < slot.0 {
        *slot = (q.seq, q.entry.old);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(x: u16, priority: u8, old: BlockId) -> BroadcastEntry {
        BroadcastEntry {
            pos: Vec3S::new(x, 0, 0),
            priority,
            old,
        }
    }

    #[test]
    fn higher_priority_first_fifo_within_priority() {
        let mut q = BroadcastQueue::new();
        q.push(entry(0, 5, 0));
        q.push(entry(1, 9, 0));
        q.push(entry(2, 5, 0));
        q.push(entry(3, 9, 0));
        q.push(entry(4, 1, 0));
        let xs: Vec<u16> = q.drain_ordered(None).iter().map(|e| e.pos.x).collect();
        assert_eq!(xs, vec![1, 3, 0, 2, 4]);
        assert!(q.is_empty());
    }

    #[test]
    fn drain_respects_limit() {
        let mut q = BroadcastQueue::new();
        for x in 0..5 {
            q.push(entry(x, 1, 0));
        }
        assert_eq!(q.drain_ordered(Some(2)).len(), 2);
        assert_eq!(q.len(), 3);
    }

    #[test]
    fn retain_keeps_fifo_order() {
        let mut q = BroadcastQueue::new();
        for x in 0..6 {
            q.push(entry(x, 3, 0));
        }
        q.retain_in(Dims::new(4, 1, 1));
        let xs: Vec<u16> = q.drain_ordered(None).iter().map(|e| e.pos.x).collect();
        assert_eq!(xs, vec![0, 1, 2, 3]);
    }

    #[test]
    fn updates_keep_final_type_and_elide_noops() {
        let mut q = BroadcastQueue::new();
        q.push(entry(0, 5, 0)); // 0 -> 1
        q.push(entry(0, 5, 1)); // 1 -> 2
        q.push(entry(1, 5, 3)); // 3 -> 4 -> 3
        q.push(entry(1, 5, 4));
        q.push(entry(2, 5, 0));
        let cur = |p: Vec3S| match p.x {
            0 => Some(2),
            1 => Some(3),
            _ => None,
        };
        let out = q.drain_updates(None, cur);
        assert_eq!(
            out,
            vec![BlockUpdate {
                pos: Vec3S::new(0, 0, 0),
                ty: 2
            }]
        );
        assert!(q.is_empty());
    }

    #[test]
    fn earliest_insert_decides_elision_across_priorities() {
        // 0 -> 1 (low), 1 -> 2 (high), 2 -> 1 (low): viewers still hold 0.
        let mut q = BroadcastQueue::new();
        q.push(entry(0, 10, 0));
        q.push(entry(0, 250, 1));
        q.push(entry(0, 10, 2));
        let out = q.drain_updates(None, |_| Some(1));
        assert_eq!(
            out,
            vec![BlockUpdate {
                pos: Vec3S::ZERO,
                ty: 1
            }]
        );
    }

    #[test]
    fn limit_takes_every_entry_of_a_drained_cell() {
        let mut q = BroadcastQueue::new();
        q.push(entry(0, 10, 0)); // 0 -> 1
        q.push(entry(1, 10, 7));
        q.push(entry(0, 250, 1)); // 1 -> 2
        q.push(entry(0, 10, 2)); // 2 -> 1
        let cur = |p: Vec3S| Some(if p.x == 0 { 1 } else { 8 });
        let out = q.drain_updates(Some(1), cur);
        assert_eq!(
            out,
            vec![BlockUpdate {
                pos: Vec3S::ZERO,
                ty: 1
            }]
        );
        assert_eq!(q.len(), 1);
        let rest = q.drain_updates(Some(1), cur);
        assert_eq!(
            rest,
            vec![BlockUpdate {
                pos: Vec3S::new(1, 0, 0),
                ty: 8
            }]
        );
    }
}
