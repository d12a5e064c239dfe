//! End-to-end track pipeline: raw rows in, packed lanes and rectangles out.

use log::debug;
use rayon::prelude::*;

use crate::draw::{self, Rect, TrackStyle};
use crate::feature::{AlignmentRow, FeatureGroup, Result, TranscriptRow};
use crate::group;
use crate::lane::{self, LaneAssignment};

/// One fully packed track: the ordered groups, their lane assignment, and
/// the rectangles to hand to a renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedTrack {
    pub groups: Vec<FeatureGroup>,
    pub assignment: LaneAssignment,
    pub rects: Vec<Rect>,
}

impl PackedTrack {
    pub fn lane_count(&self) -> usize {
        self.assignment.lane_count()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

/// Rows for one track, before grouping.
#[derive(Debug, Clone)]
pub enum TrackSource {
    Transcripts(Vec<TranscriptRow>),
    Alignments(Vec<AlignmentRow>),
}

/// A track waiting to be packed: its rows plus the style to pack and draw
/// them with.
#[derive(Debug, Clone)]
pub struct TrackJob {
    pub source: TrackSource,
    pub style: TrackStyle,
}

impl TrackJob {
    pub fn transcripts(rows: Vec<TranscriptRow>, style: TrackStyle) -> Self {
        Self {
            source: TrackSource::Transcripts(rows),
            style,
        }
    }

    pub fn alignments(rows: Vec<AlignmentRow>, style: TrackStyle) -> Self {
        Self {
            source: TrackSource::Alignments(rows),
            style,
        }
    }
}

/// Group, pack, and project one track.
pub fn pack_track(job: TrackJob) -> Result<PackedTrack> {
    let groups = match job.source {
        TrackSource::Transcripts(rows) => group::group_transcripts(rows)?,
        TrackSource::Alignments(rows) => group::group_alignments(rows)?,
    };
    let assignment = lane::allocate(&groups, job.style.lane_spacing);
    let rects = draw::build_track(&groups, &assignment, &job.style)?;
    debug!(
        "packed {} groups into {} lanes ({} rects)",
        groups.len(),
        assignment.lane_count(),
        rects.len()
    );
    Ok(PackedTrack {
        groups,
        assignment,
        rects,
    })
}

/// Pack several independent tracks in parallel. Each job owns its rows and
/// allocator state, so no coordination is needed; results come back in job
/// order, and the first failing track fails the whole call.
pub fn pack_tracks(jobs: Vec<TrackJob>) -> Result<Vec<PackedTrack>> {
    jobs.into_par_iter().map(pack_track).collect()
}
