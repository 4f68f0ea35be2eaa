//! Capped newest-first log with FIFO eviction

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Sequence that keeps at most `cap` entries, newest first.
///
/// Pushing onto a full log evicts the oldest entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundedLog<T> {
    entries: VecDeque<T>,
    cap: usize,
}

impl<T: Clone> BoundedLog<T> {
    pub fn new(cap: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(cap.min(128)),
            cap,
        }
    }

    /// Rebuild a log from entries already ordered newest-first
    pub fn from_newest_first(entries: Vec<T>, cap: usize) -> Self {
        let mut entries: VecDeque<T> = entries.into();
        entries.truncate(cap);
        Self { entries, cap }
    }

    /// Prepend an entry, evicting from the old end when full
    pub fn push(&mut self, entry: T) {
        if self.cap == 0 {
            return;
        }
        self.entries.push_front(entry);
        while self.entries.len() > self.cap {
            self.entries.pop_back();
        }
    }

    /// Up to `limit` entries, newest first
    pub fn recent(&self, limit: usize) -> Vec<T> {
        self.entries.iter().take(limit).cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newest_first_order() {
        let mut log = BoundedLog::new(5);
        log.push(1);
        log.push(2);
        log.push(3);
        assert_eq!(log.recent(10), vec![3, 2, 1]);
        assert_eq!(log.recent(2), vec![3, 2]);
    }

    #[test]
    fn test_evicts_oldest_when_full() {
        let mut log = BoundedLog::new(100);
        for i in 0..250 {
            log.push(i);
            assert!(log.len() <= 100);
        }
        let recent = log.recent(usize::MAX);
        assert_eq!(recent.len(), 100);
        assert_eq!(recent.first(), Some(&249));
        assert_eq!(recent.last(), Some(&150));
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut log = BoundedLog::new(0);
        log.push("a");
        assert!(log.is_empty());
    }

    #[test]
    fn test_from_newest_first_truncates_old_end() {
        let log = BoundedLog::from_newest_first(vec![9, 8, 7, 6], 2);
        assert_eq!(log.recent(10), vec![9, 8]);
        assert_eq!(log.capacity(), 2);
    }
}
