use std::collections::BTreeSet;

use crate::protocol::SessionId;

/// Edge detector over repeated snapshots: remembers which sessions were
/// in a transient state last time and reports only the ids that just
/// entered it. Snapshots arrive far more often than states change, so
/// a plain "is biting" check would fire on every frame.
#[derive(Debug, Default)]
pub struct EdgeTracker {
    seen: BTreeSet<SessionId>,
}

impl EdgeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the current set of ids in the tracked state; returns the
    /// ids that were absent in the previous observation.
    pub fn observe(&mut self, current: BTreeSet<SessionId>) -> Vec<SessionId> {
        let entered = current.difference(&self.seen).copied().collect();
        self.seen = current;
        entered
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[SessionId]) -> BTreeSet<SessionId> {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_fires_once_per_entry() {
        let mut tracker = EdgeTracker::new();
        assert_eq!(tracker.observe(set(&[])), Vec::<SessionId>::new());
        assert_eq!(tracker.observe(set(&[101])), vec![101]);
        // Repeated identical snapshots stay silent.
        assert_eq!(tracker.observe(set(&[101])), Vec::<SessionId>::new());
        assert_eq!(tracker.observe(set(&[101])), Vec::<SessionId>::new());
    }

    #[test]
    fn test_reentry_fires_again() {
        let mut tracker = EdgeTracker::new();
        tracker.observe(set(&[101]));
        assert_eq!(tracker.observe(set(&[])), Vec::<SessionId>::new());
        assert_eq!(tracker.observe(set(&[101])), vec![101]);
    }

    #[test]
    fn test_multiple_simultaneous_entries() {
        let mut tracker = EdgeTracker::new();
        tracker.observe(set(&[101]));
        let mut entered = tracker.observe(set(&[101, 102, 103]));
        entered.sort_unstable();
        assert_eq!(entered, vec![102, 103]);
    }

    #[test]
    fn test_clear_forgets_history() {
        let mut tracker = EdgeTracker::new();
        tracker.observe(set(&[101]));
        tracker.clear();
        assert_eq!(tracker.observe(set(&[101])), vec![101]);
    }
}
