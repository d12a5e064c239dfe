//! Greedy lane packing for ordered feature groups.
//!
//! Lanes are integer indices; lane `i` sits at vertical offset
//! `(i + 1) * lane_spacing`. A lane remembers only the end coordinate of the
//! last group placed in it, and a lane is reusable for a group only when the
//! group starts strictly after that end. The packer is a first-fit heuristic,
//! not an optimal interval coloring: it never moves a placed group and never
//! consults a lane's earlier occupants, so it can open more lanes than the
//! chromatic number of the overlap graph. Reference renderings depend on this
//! exact behavior, including the lowest-lane tie-break.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::feature::FeatureGroup;

/// Immutable result of packing one track: a lane index per group, in the
/// order the groups were supplied.
#[derive(Debug, Clone, PartialEq)]
pub struct LaneAssignment {
    lanes: Vec<usize>,
    by_id: FxHashMap<String, usize>,
    lane_count: usize,
    lane_spacing: f64,
}

impl LaneAssignment {
    /// Lane index of the group at `index` in the input order.
    pub fn lane(&self, index: usize) -> Option<usize> {
        self.lanes.get(index).copied()
    }

    /// Lane index by group identifier. When several groups share an
    /// identifier this reports the last one placed.
    pub fn lane_of(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    /// Vertical offset of a lane.
    pub fn offset(&self, lane: usize) -> f64 {
        (lane as f64 + 1.0) * self.lane_spacing
    }

    /// Vertical offset of the group at `index` in the input order.
    pub fn offset_of(&self, index: usize) -> Option<f64> {
        self.lane(index).map(|lane| self.offset(lane))
    }

    /// Lane indices per group, in input order.
    pub fn lanes(&self) -> &[usize] {
        &self.lanes
    }

    /// Number of distinct lanes used.
    pub fn lane_count(&self) -> usize {
        self.lane_count
    }

    pub fn lane_spacing(&self) -> f64 {
        self.lane_spacing
    }

    /// Number of groups packed.
    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }
}

/// Pack `groups` into lanes, greedily and in input order.
///
/// For each group the candidate lane defaults to a fresh lane above every
/// occupied one; any occupied lane whose last occupant ends strictly before
/// the group's start may be reused instead, and the lowest such lane wins.
/// The packing is total: any input, including an empty one, yields an
/// assignment.
pub fn allocate(groups: &[FeatureGroup], lane_spacing: f64) -> LaneAssignment {
    let mut occupied_until: BTreeMap<usize, u64> = BTreeMap::new();
    let mut lanes = Vec::with_capacity(groups.len());
    let mut by_id = FxHashMap::default();

    for group in groups {
        let mut candidate = occupied_until.keys().next_back().map_or(0, |&top| top + 1);
        // Ascending key order makes the first reusable lane the lowest one.
        for (&lane, &until) in &occupied_until {
            if group.span.start > until {
                candidate = lane;
                break;
            }
        }
        occupied_until.insert(candidate, group.span.end);
        by_id.insert(group.id.clone(), candidate);
        lanes.push(candidate);
    }

    let lane_count = occupied_until.len();
    LaneAssignment {
        lanes,
        by_id,
        lane_count,
        lane_spacing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{FeatureKind, Interval, SubFeature};

    fn grp(id: &str, start: u64, end: u64) -> FeatureGroup {
        FeatureGroup::transcript(
            id.to_string(),
            vec![SubFeature::new(
                Interval::new(start, end),
                FeatureKind::Transcript,
            )],
        )
        .unwrap()
    }

    #[test]
    fn test_empty_input_yields_empty_assignment() {
        let assignment = allocate(&[], 0.1);
        assert!(assignment.is_empty());
        assert_eq!(assignment.lane_count(), 0);
    }

    #[test]
    fn test_first_group_takes_baseline() {
        let assignment = allocate(&[grp("a", 100, 200)], 0.1);
        assert_eq!(assignment.lane(0), Some(0));
        assert!((assignment.offset_of(0).unwrap() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_disjoint_spans_share_one_lane() {
        let groups = vec![grp("a", 0, 10), grp("b", 20, 30), grp("c", 40, 50)];
        let assignment = allocate(&groups, 1.0);
        assert_eq!(assignment.lanes(), &[0, 0, 0]);
        assert_eq!(assignment.lane_count(), 1);
    }

    #[test]
    fn test_overlap_opens_new_lanes() {
        let groups = vec![grp("a", 0, 100), grp("b", 50, 150), grp("c", 75, 200)];
        let assignment = allocate(&groups, 1.0);
        assert_eq!(assignment.lanes(), &[0, 1, 2]);
        assert_eq!(assignment.lane_count(), 3);
    }

    #[test]
    fn test_lowest_reusable_lane_wins() {
        // After a and b, lanes 0 (until 10) and 1 (until 20) are both free
        // for c at 30; the lower lane must win.
        let groups = vec![grp("a", 0, 10), grp("b", 5, 20), grp("c", 30, 40)];
        let assignment = allocate(&groups, 1.0);
        assert_eq!(assignment.lanes(), &[0, 1, 0]);
        assert_eq!(assignment.lane_count(), 2);
    }

    #[test]
    fn test_abutting_spans_do_not_share_a_lane() {
        // Reuse needs start strictly after the lane's occupied end, so a
        // group starting exactly where the previous one ended opens a new
        // lane even though the half-open spans do not overlap.
        let groups = vec![grp("a", 0, 10), grp("b", 10, 20)];
        let assignment = allocate(&groups, 1.0);
        assert_eq!(assignment.lanes(), &[0, 1]);
    }

    #[test]
    fn test_reuse_updates_lane_occupancy() {
        let groups = vec![
            grp("a", 0, 10),
            grp("b", 5, 20),
            grp("c", 30, 40), // reuses lane 0, occupancy now 40
            grp("d", 35, 50), // 35 > 40 fails, 35 > 20 holds: lane 1
            grp("e", 38, 60), // neither 40 nor 50 is cleared: new lane
        ];
        let assignment = allocate(&groups, 1.0);
        assert_eq!(assignment.lanes(), &[0, 1, 0, 1, 2]);
        assert_eq!(assignment.lane_count(), 3);
    }

    #[test]
    fn test_no_overlap_within_any_lane() {
        let groups = vec![
            grp("a", 0, 100),
            grp("b", 50, 120),
            grp("c", 130, 200),
            grp("d", 90, 140),
            grp("e", 210, 300),
            grp("f", 150, 260),
        ];
        let assignment = allocate(&groups, 1.0);

        for i in 0..groups.len() {
            for j in (i + 1)..groups.len() {
                if assignment.lane(i) == assignment.lane(j) {
                    assert!(
                        !groups[i].span.overlaps(&groups[j].span),
                        "groups {} and {} overlap in lane {:?}",
                        groups[i].id,
                        groups[j].id,
                        assignment.lane(i)
                    );
                }
            }
        }
        assert!(assignment.lane_count() <= groups.len());
    }

    #[test]
    fn test_allocation_is_deterministic() {
        let groups = vec![
            grp("a", 0, 100),
            grp("b", 50, 120),
            grp("c", 130, 200),
            grp("d", 90, 140),
        ];
        assert_eq!(allocate(&groups, 0.5), allocate(&groups, 0.5));
    }

    #[test]
    fn test_lane_lookup_by_id() {
        let groups = vec![grp("a", 0, 10), grp("b", 5, 20)];
        let assignment = allocate(&groups, 1.0);
        assert_eq!(assignment.lane_of("a"), Some(0));
        assert_eq!(assignment.lane_of("b"), Some(1));
        assert_eq!(assignment.lane_of("missing"), None);
    }

    #[test]
    fn test_offsets_scale_with_spacing() {
        let groups = vec![grp("a", 0, 100), grp("b", 50, 120)];
        let spacing = 1.0 / 67.0;
        let assignment = allocate(&groups, spacing);
        assert_eq!(assignment.lane_spacing(), spacing);
        assert!((assignment.offset(0) - spacing).abs() < 1e-12);
        assert!((assignment.offset(1) - 2.0 * spacing).abs() < 1e-12);
    }
}
