//! Cut-point store for the active timeline
//!
//! A cut point marks a time range on the source media. The store keeps its
//! markers sorted by start time after every mutation and never rejects an
//! insertion: overlapping or inverted ranges are stored as given, callers
//! that care should check [`CutPoint::is_well_formed`] before inserting.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

/// A non-destructive edit marker over the source timeline (seconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutPoint {
    /// Opaque identifier, stable for the marker's lifetime
    pub id: String,
    pub start_time: f64,
    pub end_time: f64,
}

impl CutPoint {
    /// Create a marker with a fresh id
    pub fn new(start_time: f64, end_time: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            start_time,
            end_time,
        }
    }

    /// Length of the range in seconds (negative for inverted ranges)
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// `0 <= start < end`
    pub fn is_well_formed(&self) -> bool {
        self.start_time >= 0.0 && self.start_time < self.end_time
    }

    /// Check whether two ranges share any time
    pub fn overlaps(&self, other: &CutPoint) -> bool {
        self.start_time < other.end_time && other.start_time < self.end_time
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.start_time && time <= self.end_time
    }
}

/// Ordered collection of cut points for a single timeline
///
/// Observers subscribe through [`CutPointStore::subscribe`] and receive the
/// full sorted sequence after each mutation that changed it.
#[derive(Debug)]
pub struct CutPointStore {
    cut_points: Vec<CutPoint>,
    observers: watch::Sender<Vec<CutPoint>>,
}

impl CutPointStore {
    pub fn new() -> Self {
        let (observers, _) = watch::channel(Vec::new());
        Self {
            cut_points: Vec::new(),
            observers,
        }
    }

    /// Insert a new marker and re-sort. Returns the inserted marker.
    pub fn add_cut_point(&mut self, start_time: f64, end_time: f64) -> CutPoint {
        let cut_point = CutPoint::new(start_time, end_time);
        debug!(
            "Adding cut point {} [{:.3}, {:.3}]",
            cut_point.id, start_time, end_time
        );
        self.cut_points.push(cut_point.clone());
        self.sort();
        self.publish();
        cut_point
    }

    /// Remove the marker with `id`. Unknown ids are ignored.
    ///
    /// Returns whether a marker was removed.
    pub fn remove_cut_point(&mut self, id: &str) -> bool {
        let before = self.cut_points.len();
        self.cut_points.retain(|cp| cp.id != id);

        let removed = self.cut_points.len() != before;
        if removed {
            debug!("Removed cut point {}", id);
            self.publish();
        }
        removed
    }

    /// Replace the bounds of the marker with `id` and re-sort.
    /// Unknown ids are ignored.
    ///
    /// Returns whether a marker was updated.
    pub fn update_cut_point(&mut self, id: &str, start_time: f64, end_time: f64) -> bool {
        let Some(cut_point) = self.cut_points.iter_mut().find(|cp| cp.id == id) else {
            return false;
        };

        cut_point.start_time = start_time;
        cut_point.end_time = end_time;
        debug!(
            "Updated cut point {} to [{:.3}, {:.3}]",
            id, start_time, end_time
        );

        self.sort();
        self.publish();
        true
    }

    /// Remove every marker
    pub fn clear(&mut self) {
        if !self.cut_points.is_empty() {
            self.cut_points.clear();
            self.publish();
        }
    }

    /// Earliest-starting marker
    pub fn first(&self) -> Option<&CutPoint> {
        self.cut_points.first()
    }

    pub fn get(&self, id: &str) -> Option<&CutPoint> {
        self.cut_points.iter().find(|cp| cp.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn as_slice(&self) -> &[CutPoint] {
        &self.cut_points
    }

    pub fn iter(&self) -> impl Iterator<Item = &CutPoint> {
        self.cut_points.iter()
    }

    pub fn len(&self) -> usize {
        self.cut_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cut_points.is_empty()
    }

    /// Whether any two stored ranges overlap
    pub fn has_overlaps(&self) -> bool {
        // Sorted by start, so only neighbours need checking against the
        // furthest end seen so far.
        let mut furthest_end = f64::NEG_INFINITY;
        for cp in &self.cut_points {
            if cp.start_time < furthest_end {
                return true;
            }
            furthest_end = furthest_end.max(cp.end_time);
        }
        false
    }

    /// Subscribe to the sorted sequence
    pub fn subscribe(&self) -> watch::Receiver<Vec<CutPoint>> {
        self.observers.subscribe()
    }

    // Vec::sort_by is stable: equal start times keep their prior order.
    fn sort(&mut self) {
        self.cut_points
            .sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
    }

    fn publish(&self) {
        self.observers.send_replace(self.cut_points.clone());
    }
}

impl Default for CutPointStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bounds(store: &CutPointStore) -> Vec<(f64, f64)> {
        store
            .iter()
            .map(|cp| (cp.start_time, cp.end_time))
            .collect()
    }

    fn is_sorted(store: &CutPointStore) -> bool {
        store
            .as_slice()
            .windows(2)
            .all(|w| w[0].start_time <= w[1].start_time)
    }

    #[test]
    fn test_add_sorts_by_start_time() {
        let mut store = CutPointStore::new();
        store.add_cut_point(10.0, 20.0);
        store.add_cut_point(5.0, 8.0);

        assert_eq!(bounds(&store), vec![(5.0, 8.0), (10.0, 20.0)]);
    }

    #[test]
    fn test_add_assigns_unique_ids() {
        let mut store = CutPointStore::new();
        let a = store.add_cut_point(1.0, 2.0);
        let b = store.add_cut_point(1.0, 2.0);

        assert_ne!(a.id, b.id);
        assert!(store.contains(&a.id));
        assert!(store.contains(&b.id));
    }

    #[test]
    fn test_add_never_rejects_inverted_range() {
        let mut store = CutPointStore::new();
        let cp = store.add_cut_point(8.0, 3.0);

        assert_eq!(store.len(), 1);
        assert!(!cp.is_well_formed());
        assert_eq!(cp.duration(), -5.0);
    }

    #[test]
    fn test_remove_unknown_id_is_noop() {
        let mut store = CutPointStore::new();
        store.add_cut_point(1.0, 2.0);
        store.add_cut_point(3.0, 4.0);
        let before = store.as_slice().to_vec();

        assert!(!store.remove_cut_point("missing"));
        assert_eq!(store.as_slice(), before.as_slice());
    }

    #[test]
    fn test_remove_existing() {
        let mut store = CutPointStore::new();
        let a = store.add_cut_point(1.0, 2.0);
        store.add_cut_point(3.0, 4.0);

        assert!(store.remove_cut_point(&a.id));
        assert_eq!(bounds(&store), vec![(3.0, 4.0)]);
        assert!(!store.remove_cut_point(&a.id));
    }

    #[test]
    fn test_update_twice_keeps_single_entry_with_latest_bounds() {
        let mut store = CutPointStore::new();
        let a = store.add_cut_point(1.0, 2.0);
        store.add_cut_point(5.0, 6.0);

        assert!(store.update_cut_point(&a.id, 10.0, 12.0));
        assert!(store.update_cut_point(&a.id, 7.0, 9.0));

        let matching: Vec<_> = store.iter().filter(|cp| cp.id == a.id).collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].start_time, 7.0);
        assert_eq!(matching[0].end_time, 9.0);
        assert_eq!(bounds(&store), vec![(5.0, 6.0), (7.0, 9.0)]);
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let mut store = CutPointStore::new();
        store.add_cut_point(1.0, 2.0);

        assert!(!store.update_cut_point("missing", 0.0, 1.0));
        assert_eq!(bounds(&store), vec![(1.0, 2.0)]);
    }

    #[test]
    fn test_equal_start_times_keep_insertion_order() {
        let mut store = CutPointStore::new();
        let a = store.add_cut_point(4.0, 5.0);
        let b = store.add_cut_point(4.0, 9.0);
        let c = store.add_cut_point(1.0, 2.0);

        let ids: Vec<_> = store.iter().map(|cp| cp.id.clone()).collect();
        assert_eq!(ids, vec![c.id, a.id, b.id]);
    }

    #[test]
    fn test_overlap_detection() {
        let mut store = CutPointStore::new();
        store.add_cut_point(0.0, 5.0);
        store.add_cut_point(6.0, 8.0);
        assert!(!store.has_overlaps());

        store.add_cut_point(7.0, 10.0);
        assert!(store.has_overlaps());

        let a = CutPoint::new(0.0, 10.0);
        let b = CutPoint::new(2.0, 3.0);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&CutPoint::new(10.0, 11.0)));
    }

    #[test]
    fn test_contains_time_is_inclusive() {
        let cp = CutPoint::new(2.0, 5.0);
        assert!(cp.contains(2.0));
        assert!(cp.contains(3.5));
        assert!(cp.contains(5.0));
        assert!(!cp.contains(1.99));
        assert!(!cp.contains(5.01));
        assert_eq!(cp.duration(), 3.0);
    }

    #[test]
    fn test_observers_receive_sorted_sequence() {
        let mut store = CutPointStore::new();
        let mut rx = store.subscribe();

        store.add_cut_point(10.0, 20.0);
        store.add_cut_point(5.0, 8.0);

        assert!(rx.has_changed().unwrap());
        let seen: Vec<_> = rx
            .borrow_and_update()
            .iter()
            .map(|cp| (cp.start_time, cp.end_time))
            .collect();
        assert_eq!(seen, vec![(5.0, 8.0), (10.0, 20.0)]);

        // No-op mutations do not notify
        store.remove_cut_point("missing");
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_clear() {
        let mut store = CutPointStore::new();
        store.add_cut_point(1.0, 2.0);
        store.clear();
        assert!(store.is_empty());
        assert!(store.first().is_none());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(f64, f64),
        Remove(usize),
        Update(usize, f64, f64),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0.0..120.0f64, 0.0..120.0f64).prop_map(|(s, e)| Op::Add(s, e)),
            (0usize..8).prop_map(Op::Remove),
            (0usize..8, 0.0..120.0f64, 0.0..120.0f64).prop_map(|(i, s, e)| Op::Update(i, s, e)),
        ]
    }

    proptest! {
        #[test]
        fn prop_store_always_sorted(ops in proptest::collection::vec(op_strategy(), 0..64)) {
            let mut store = CutPointStore::new();
            let mut ids: Vec<String> = Vec::new();

            for op in ops {
                match op {
                    Op::Add(s, e) => ids.push(store.add_cut_point(s, e).id),
                    Op::Remove(i) => {
                        let id = ids.get(i).cloned().unwrap_or_else(|| "missing".to_string());
                        store.remove_cut_point(&id);
                    }
                    Op::Update(i, s, e) => {
                        let id = ids.get(i).cloned().unwrap_or_else(|| "missing".to_string());
                        store.update_cut_point(&id, s, e);
                    }
                }
                prop_assert!(is_sorted(&store));
            }
        }
    }
}
