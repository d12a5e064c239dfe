//! Projection of packed groups into positioned rectangles.
//!
//! No overlap avoidance happens here: lanes are already assigned, and every
//! rectangle is a direct geometric image of one sub-feature (or of an
//! alignment group's spine). X units are base pairs, y units are lane
//! offsets; the renderer maps both into pixels.

use rustc_hash::FxHashMap;

use crate::feature::{FeatureGroup, FeatureKind, GroupKind, Result, TrackError};
use crate::lane::LaneAssignment;

/// Axis-aligned rectangle in track coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Draw thickness per sub-feature kind. A kind missing from the table is a
/// fatal error when a rectangle for it is requested.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThicknessTable {
    map: FxHashMap<FeatureKind, f64>,
}

impl ThicknessTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: FeatureKind, thickness: f64) -> Self {
        self.map.insert(kind, thickness);
        self
    }

    pub fn set(&mut self, kind: FeatureKind, thickness: f64) {
        self.map.insert(kind, thickness);
    }

    pub fn get(&self, kind: FeatureKind) -> Result<f64> {
        self.map
            .get(&kind)
            .copied()
            .ok_or(TrackError::UnknownFeatureKind(kind))
    }

    pub fn contains(&self, kind: FeatureKind) -> bool {
        self.map.contains_key(&kind)
    }
}

/// Per-track drawing configuration: lane spacing, the thickness table for
/// sub-features, and the spine thickness used by alignment groups.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackStyle {
    pub lane_spacing: f64,
    pub thickness: ThicknessTable,
    pub spine: f64,
}

impl TrackStyle {
    pub fn new(lane_spacing: f64, thickness: ThicknessTable, spine: f64) -> Self {
        Self {
            lane_spacing,
            thickness,
            spine,
        }
    }

    /// Reference style for a transcript track.
    pub fn transcripts_default() -> Self {
        let thickness = ThicknessTable::new()
            .with(FeatureKind::Transcript, 0.011)
            .with(FeatureKind::Exon, 0.025)
            .with(FeatureKind::Cds, 0.0501);
        Self::new(0.1, thickness, 0.0)
    }

    /// Reference style for an alignment track.
    pub fn alignments_default() -> Self {
        let thickness = ThicknessTable::new().with(FeatureKind::Block, 0.0075);
        Self::new(1.0 / 67.0, thickness, 0.001)
    }

    /// Reference style for a densely packed alignment track.
    pub fn alignments_dense() -> Self {
        let thickness = ThicknessTable::new().with(FeatureKind::Block, 0.0007);
        Self::new(0.0025, thickness, 0.0001)
    }
}

/// Emit the rectangles for one group at its assigned lane offset.
///
/// Members are centered on the offset (`y = offset - thickness / 2`).
/// Alignment groups additionally get a spine rectangle over the full span,
/// sitting on the offset (`y = offset`), emitted before the blocks.
pub fn build_rects(group: &FeatureGroup, lane_offset: f64, style: &TrackStyle) -> Result<Vec<Rect>> {
    let mut rects = Vec::with_capacity(group.members.len() + 1);

    if group.kind == GroupKind::Alignment {
        rects.push(Rect {
            x: group.span.start as f64,
            y: lane_offset,
            width: group.span.len() as f64,
            height: style.spine,
        });
    }

    for member in &group.members {
        let thickness = style.thickness.get(member.kind)?;
        rects.push(Rect {
            x: member.interval.start as f64,
            y: lane_offset - thickness / 2.0,
            width: member.interval.len() as f64,
            height: thickness,
        });
    }
    Ok(rects)
}

/// Emit the rectangles for a whole track. `assignment` must be the packing
/// of exactly these `groups`, in the same order.
pub fn build_track(
    groups: &[FeatureGroup],
    assignment: &LaneAssignment,
    style: &TrackStyle,
) -> Result<Vec<Rect>> {
    let mut rects = Vec::new();
    for (group, &lane) in groups.iter().zip(assignment.lanes()) {
        rects.extend(build_rects(group, assignment.offset(lane), style)?);
    }
    Ok(rects)
}
