//! Target region parsing and the row-retention predicate.
//!
//! Every track operates on a single already-chosen region of a single
//! chromosome; the readers drop rows that fail [`Region::retains`].

use std::fmt;
use std::str::FromStr;

use crate::feature::{Interval, Result, TrackError};

/// A single-chromosome genomic window, e.g. `chr7:45232945-45240000`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub chrom: String,
    pub interval: Interval,
}

impl Region {
    /// Create a new region.
    pub fn new(chrom: impl Into<String>, start: u64, end: u64) -> Result<Self> {
        let interval = Interval::new(start, end);
        interval.validate()?;
        Ok(Self {
            chrom: chrom.into(),
            interval,
        })
    }

    /// Row-retention predicate: the chromosome matches and the row's start
    /// or end coordinate lies inside the region, bounds inclusive.
    ///
    /// An interval straddling the whole region with both endpoints outside
    /// it is dropped; the reference renderer behaves the same way.
    #[inline]
    pub fn retains(&self, chrom: &str, interval: &Interval) -> bool {
        chrom == self.chrom
            && (self.covers(interval.start) || self.covers(interval.end))
    }

    /// True if a single coordinate lies inside the region, bounds inclusive.
    #[inline]
    pub fn covers(&self, pos: u64) -> bool {
        self.interval.start <= pos && pos <= self.interval.end
    }

    /// Region width in base pairs.
    #[inline]
    pub fn len(&self) -> u64 {
        self.interval.len()
    }

    /// True if the region has zero width.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.interval.is_empty()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.chrom, self.interval.start, self.interval.end)
    }
}

impl FromStr for Region {
    type Err = TrackError;

    /// Parse `chrom:start-end`.
    fn from_str(s: &str) -> Result<Self> {
        let (chrom, range) = s
            .rsplit_once(':')
            .ok_or_else(|| TrackError::MalformedRecord(format!("region '{}' lacks ':'", s)))?;
        let (start, end) = range.split_once('-').ok_or_else(|| {
            TrackError::MalformedRecord(format!("region '{}' lacks a start-end range", s))
        })?;

        if chrom.is_empty() {
            return Err(TrackError::MalformedRecord(format!(
                "region '{}' has an empty chromosome",
                s
            )));
        }

        let start: u64 = start.replace(',', "").parse().map_err(|_| {
            TrackError::MalformedRecord(format!("region '{}': bad start coordinate", s))
        })?;
        let end: u64 = end.replace(',', "").parse().map_err(|_| {
            TrackError::MalformedRecord(format!("region '{}': bad end coordinate", s))
        })?;

        Region::new(chrom, start, end)
    }
}
