//! Deferred return of pooled units.

use core::ops::Range;

use crate::graph::UnitKey;

/// A unit due back in the pool at `time` (context seconds).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendingRelease {
    pub time: f64,
    pub unit: UnitKey,
}

/// Releases sorted by time.
///
/// Due entries are consumed through a cursor and then compacted away, so
/// draining never allocates.
#[derive(Clone, Debug, Default)]
pub struct ReleaseQueue {
    entries: Vec<PendingRelease>,
    /// Next entry to hand out.
    cursor: usize,
}

impl ReleaseQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            cursor: 0,
        }
    }

    /// Schedule `unit` for release at `time`. Entries with equal times keep
    /// insertion order.
    pub fn push(&mut self, time: f64, unit: UnitKey) {
        let pos = self
            .entries
            .partition_point(|e| e.time <= time)
            .max(self.cursor);
        self.entries.insert(pos, PendingRelease { time, unit });
    }

    /// Index range of entries due at or before `time`; advances the cursor.
    pub fn drain_until(&mut self, time: f64) -> Range<usize> {
        let start = self.cursor;
        while self.cursor < self.entries.len() && self.entries[self.cursor].time <= time {
            self.cursor += 1;
        }
        start..self.cursor
    }

    /// Get an entry by index (for use with `drain_until` ranges).
    pub fn get(&self, index: usize) -> Option<&PendingRelease> {
        self.entries.get(index)
    }

    /// Drop consumed entries.
    pub fn compact(&mut self) {
        self.entries.drain(..self.cursor);
        self.cursor = 0;
    }

    /// Time of the next pending entry.
    pub fn next_time(&self) -> Option<f64> {
        self.entries.get(self.cursor).map(|e| e.time)
    }

    /// Entries not yet consumed.
    pub fn len(&self) -> usize {
        self.entries.len() - self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take every pending unit regardless of time.
    pub fn drain_all(&mut self) -> impl Iterator<Item = UnitKey> + '_ {
        let start = self.cursor;
        self.cursor = 0;
        self.entries.drain(..).skip(start).map(|e| e.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn keys(n: usize) -> Vec<UnitKey> {
        let mut map: SlotMap<UnitKey, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    #[test]
    fn releases_come_out_in_time_order() {
        let k = keys(3);
        let mut q = ReleaseQueue::new();
        q.push(0.5, k[0]);
        q.push(0.1, k[1]);
        q.push(0.3, k[2]);
        let range = q.drain_until(0.4);
        assert_eq!(range, 0..2);
        assert_eq!(q.get(0).unwrap().unit, k[1]);
        assert_eq!(q.get(1).unwrap().unit, k[2]);
        assert_eq!(q.len(), 1);
        assert_eq!(q.next_time(), Some(0.5));
    }

    #[test]
    fn compact_keeps_pending() {
        let k = keys(2);
        let mut q = ReleaseQueue::new();
        q.push(1.0, k[0]);
        q.push(2.0, k[1]);
        q.drain_until(1.5);
        q.compact();
        assert_eq!(q.len(), 1);
        assert_eq!(q.drain_until(2.0), 0..1);
        assert_eq!(q.get(0).unwrap().unit, k[1]);
    }

    #[test]
    fn late_push_lands_after_cursor() {
        let k = keys(2);
        let mut q = ReleaseQueue::new();
        q.push(1.0, k[0]);
        q.drain_until(1.0);
        q.push(0.5, k[1]);
        assert_eq!(q.drain_until(1.0), 1..2);
    }

    #[test]
    fn equal_times_keep_order() {
        let k = keys(3);
        let mut q = ReleaseQueue::new();
        for key in &k {
            q.push(1.0, *key);
        }
        let range = q.drain_until(1.0);
        let out: Vec<_> = range.map(|i| q.get(i).unwrap().unit).collect();
        assert_eq!(out, k);
    }

    #[test]
    fn drain_all_empties() {
        let k = keys(2);
        let mut q = ReleaseQueue::new();
        q.push(5.0, k[0]);
        q.push(9.0, k[1]);
        assert_eq!(q.drain_all().count(), 2);
        assert!(q.is_empty());
    }
}
