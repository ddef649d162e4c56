use std::collections::VecDeque;
use std::time::Instant;

use strata_blocks::BlockId;
use strata_geom::{Dims, Vec3S};
use strata_voxel::ActorNumber;

use crate::WorldId;

/// One undo step: what a cell held before an edit, and who made it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChangeRecord {
    pub pos: Vec3S,
    pub world: WorldId,
    pub at: Instant,
    pub before: BlockId,
    pub after: BlockId,
    pub actor_before: ActorNumber,
    pub actor: ActorNumber,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryStats {
    pub entries: usize,
    pub capacity: usize,
    pub evicted: u64,
}

/// Bounded, append-only undo log. The oldest record is evicted first.
#[derive(Debug, Clone)]
pub struct ChangeHistory {
    capacity: usize,
    records: VecDeque<ChangeRecord>,
    evicted: u64,
}

impl ChangeHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity.min(1024)),
            evicted: 0,
        }
    }

    pub fn push(&mut self, rec: ChangeRecord) {
        if self.capacity == 0 {
            self.evicted += 1;
            return;
        }
        while self.records.len() >= self.capacity {
            self.records.pop_front();
            self.evicted += 1;
        }
        self.records.push_back(rec);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &ChangeRecord> {
        self.records.iter()
    }

    /// Records for one cell, oldest first.
    pub fn for_position(&self, pos: Vec3S) -> impl Iterator<Item = &ChangeRecord> {
        self.records.iter().filter(move |r| r.pos == pos)
    }

    /// Records made by `actor` at or after `since`, newest first (replay order).
    pub fn by_actor_since(
        &self,
        actor: ActorNumber,
        since: Instant,
    ) -> impl Iterator<Item = &ChangeRecord> {
        self.records
            .iter()
            .rev()
            .filter(move |r| r.actor == actor && r.at >= since)
    }

    /// Drops records whose cell no longer exists after a resize.
    pub fn retain_in(&mut self, dims: Dims) {
        self.records.retain(|r| dims.contains(r.pos));
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            entries: self.records.len(),
            capacity: self.capacity,
            evicted: self.evicted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn rec(pos: Vec3S, at: Instant, before: BlockId, after: BlockId, actor: ActorNumber) -> ChangeRecord {
        ChangeRecord {
            pos,
            world: 1,
            at,
            before,
            after,
            actor_before: -1,
            actor,
        }
    }

    #[test]
    fn evicts_oldest_when_full() {
        let t0 = Instant::now();
        let mut h = ChangeHistory::new(3);
        for i in 0..5u8 {
            h.push(rec(Vec3S::new(u16::from(i), 0, 0), t0, i, i + 1, 0));
        }
        assert_eq!(h.len(), 3);
        let befores: Vec<_> = h.iter().map(|r| r.before).collect();
        assert_eq!(befores, vec![2, 3, 4]);
        assert_eq!(h.stats().evicted, 2);
    }

    #[test]
    fn actor_query_is_newest_first_and_time_bounded() {
        let t0 = Instant::now();
        let mut h = ChangeHistory::new(16);
        let p = Vec3S::new(1, 1, 1);
        h.push(rec(p, t0, 0, 1, 4));
        h.push(rec(p, t0 + Duration::from_secs(1), 1, 2, 5));
        h.push(rec(p, t0 + Duration::from_secs(2), 2, 3, 4));
        h.push(rec(p, t0 + Duration::from_secs(3), 3, 4, 4));
        let got: Vec<_> = h
            .by_actor_since(4, t0 + Duration::from_secs(1))
            .map(|r| r.before)
            .collect();
        assert_eq!(got, vec![3, 2]);
    }

    #[test]
    fn retain_in_drops_outside_cells() {
        let t0 = Instant::now();
        let mut h = ChangeHistory::new(8);
        h.push(rec(Vec3S::new(1, 1, 1), t0, 0, 1, 0));
        h.push(rec(Vec3S::new(9, 1, 1), t0, 0, 1, 0));
        h.retain_in(Dims::new(5, 5, 5));
        assert_eq!(h.len(), 1);
    }
}
