//! LanePack: greedy lane packing for genomic feature tracks.
//!
//! Packs overlapping genomic features (GTF transcript groups, PSL aligned
//! reads) onto horizontal lanes so that no two groups sharing a lane
//! overlap, turns the packed lanes into rectangle draw commands, and
//! renders them as a stacked-panel SVG figure.
//!
//! # Features
//!
//! - **Streaming parsers**: Region-filtered GTF and PSL readers over
//!   memory-mapped files or any `Read` source
//! - **Parallel packing**: Independent tracks are packed on a Rayon pool
//! - **Row cache**: Parsed rows can be cached on disk and reused while the
//!   source file is unchanged
//!
//! # Example
//!
//! ```rust,no_run
//! use lanepack::draw::TrackStyle;
//! use lanepack::gtf;
//! use lanepack::region::Region;
//! use lanepack::track::{pack_track, TrackJob};
//!
//! let region: Region = "chr7:45232945-45240000".parse().unwrap();
//! let rows = gtf::read_transcript_rows("annotation.gtf", &region).unwrap();
//! let track = pack_track(TrackJob::transcripts(rows, TrackStyle::transcripts_default())).unwrap();
//! println!("{} groups in {} lanes", track.group_count(), track.lane_count());
//! ```

pub mod cache;
pub mod draw;
pub mod feature;
pub mod group;
pub mod gtf;
pub mod lane;
pub mod psl;
pub mod region;
pub mod render;
pub mod synth;
pub mod track;

// Re-export commonly used types
pub use draw::{Rect, ThicknessTable, TrackStyle};
pub use feature::{FeatureGroup, FeatureKind, Interval, SubFeature, TrackError};
pub use lane::{allocate, LaneAssignment};
pub use region::Region;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::draw::{build_rects, build_track, Rect, ThicknessTable, TrackStyle};
    pub use crate::feature::{
        AlignmentRow, FeatureGroup, FeatureKind, GroupKind, Interval, SubFeature, TrackError,
        TranscriptRow,
    };
    pub use crate::group::{group_alignments, group_transcripts};
    pub use crate::lane::{allocate, LaneAssignment};
    pub use crate::region::Region;
    pub use crate::track::{pack_track, pack_tracks, PackedTrack, TrackJob};
}
