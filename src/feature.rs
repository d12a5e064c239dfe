//! Core feature types for genomic track packing.

use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while reading or packing a track.
#[derive(Error, Debug)]
pub enum TrackError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("No thickness configured for feature kind '{0}'")]
    UnknownFeatureKind(FeatureKind),

    #[error("Invalid interval: start ({start}) > end ({end})")]
    InvalidInterval { start: u64, end: u64 },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Cache error: {0}")]
    Cache(String),
}

pub type Result<T> = std::result::Result<T, TrackError>;

/// A genomic interval in a shared 1-D coordinate space (base-pair offsets).
/// Uses half-open overlap semantics; invariant `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start: u64,
    pub end: u64,
}

impl Interval {
    /// Create a new interval.
    #[inline]
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Check the `start <= end` invariant.
    #[inline]
    pub fn validate(&self) -> Result<()> {
        if self.start > self.end {
            return Err(TrackError::InvalidInterval {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    /// Returns the length of the interval.
    #[inline]
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Returns true if the interval has zero length.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Check if this interval overlaps with another.
    /// Touching intervals (`a.end == b.start`) do not overlap.
    #[inline]
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Union of two intervals.
    #[inline]
    pub fn merge(&self, other: &Interval) -> Interval {
        Interval {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// The closed set of drawable feature classes.
///
/// `Transcript`, `Exon` and `Cds` come from GTF annotation rows; `Block` is
/// the implicit kind of the aligned segments inside a PSL record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureKind {
    Transcript,
    Exon,
    Cds,
    Block,
}

impl FeatureKind {
    /// Map a GTF `feature` column value onto a kind. Types outside the
    /// drawable set return `None` and are skipped by the reader.
    pub fn from_gtf(feature: &str) -> Option<Self> {
        match feature {
            "transcript" => Some(FeatureKind::Transcript),
            "exon" => Some(FeatureKind::Exon),
            "CDS" => Some(FeatureKind::Cds),
            _ => None,
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureKind::Transcript => write!(f, "transcript"),
            FeatureKind::Exon => write!(f, "exon"),
            FeatureKind::Cds => write!(f, "CDS"),
            FeatureKind::Block => write!(f, "block"),
        }
    }
}

/// One drawable part of a group: an interval tagged with its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubFeature {
    pub interval: Interval,
    pub kind: FeatureKind,
}

impl SubFeature {
    #[inline]
    pub fn new(interval: Interval, kind: FeatureKind) -> Self {
        Self { interval, kind }
    }
}

/// Distinguishes how a group is drawn: transcript groups draw one rectangle
/// per member, alignment groups additionally draw a spine over the full span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    Transcript,
    Alignment,
}

/// A set of sub-features packed into one lane as a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureGroup {
    pub id: String,
    pub span: Interval,
    pub members: Vec<SubFeature>,
    pub kind: GroupKind,
}

impl FeatureGroup {
    /// Build a transcript group from its member features. The span is the
    /// minimal interval covering all members.
    pub fn transcript(id: impl Into<String>, members: Vec<SubFeature>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(TrackError::MalformedRecord(
                "transcript group has no identifier".to_string(),
            ));
        }
        if members.is_empty() {
            return Err(TrackError::MalformedRecord(format!(
                "transcript group '{}' has no members",
                id
            )));
        }
        let mut span = members[0].interval;
        for member in &members {
            member.interval.validate()?;
            span = span.merge(&member.interval);
        }
        Ok(Self {
            id,
            span,
            members,
            kind: GroupKind::Transcript,
        })
    }

    /// Build an alignment group: one spine interval (the full aligned extent)
    /// plus zero or more block sub-features.
    pub fn alignment(id: impl Into<String>, span: Interval, blocks: Vec<SubFeature>) -> Result<Self> {
        span.validate()?;
        for block in &blocks {
            block.interval.validate()?;
        }
        Ok(Self {
            id: id.into(),
            span,
            members: blocks,
            kind: GroupKind::Alignment,
        })
    }
}

impl fmt::Display for FeatureGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] ({} members)", self.id, self.span, self.members.len())
    }
}

/// A raw transcript-track row as supplied by the GTF reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptRow {
    pub group_id: String,
    pub kind: FeatureKind,
    pub interval: Interval,
}

/// A raw alignment-track row as supplied by the PSL reader; `block_sizes`
/// and `block_starts` are parallel arrays describing the aligned segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentRow {
    pub name: String,
    pub span: Interval,
    pub block_sizes: Vec<u64>,
    pub block_starts: Vec<u64>,
}
