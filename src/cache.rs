//! On-disk cache of parsed feature rows.
//!
//! An explicit keyed store owned by whoever constructs it; nothing here is
//! process-global. Entries are keyed by source file name and validated
//! against the source's length, modification time, and the region the rows
//! were filtered to. Any mismatch, unreadable entry, or decode failure is a
//! miss, and misses degrade to re-parsing: the cache can make a read cheaper
//! but never makes it fail.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::feature::{AlignmentRow, Result, TrackError, TranscriptRow};
use crate::gtf;
use crate::psl;
use crate::region::Region;

const ENTRY_EXT: &str = "cache";
const TRANSCRIPT_TAG: &str = "transcripts";
const ALIGNMENT_TAG: &str = "alignments";

/// Identity of a source file at the time its rows were stored. An entry is
/// served only while every field still matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SourceStamp {
    len: u64,
    mtime: SystemTime,
    region: String,
}

impl SourceStamp {
    fn current(source: &Path, region: &Region) -> Result<Self> {
        let meta = fs::metadata(source)?;
        Ok(Self {
            len: meta.len(),
            mtime: meta.modified()?,
            region: region.to_string(),
        })
    }
}

/// One serialized entry: the stamp it was taken under plus the rows.
#[derive(Debug, Serialize, Deserialize)]
struct Entry<R> {
    stamp: SourceStamp,
    rows: R,
}

/// Keyed store of parsed rows under one directory.
#[derive(Debug, Clone)]
pub struct FeatureCache {
    dir: PathBuf,
}

impl FeatureCache {
    /// Open a cache directory, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Serve cached transcript rows, or `None` on any miss.
    pub fn load_transcripts(&self, source: &Path, region: &Region) -> Option<Vec<TranscriptRow>> {
        self.load_rows(source, region, TRANSCRIPT_TAG)
    }

    /// Store transcript rows parsed from `source` for `region`.
    pub fn store_transcripts(
        &self,
        source: &Path,
        region: &Region,
        rows: &[TranscriptRow],
    ) -> Result<()> {
        self.store_rows(source, region, TRANSCRIPT_TAG, rows)
    }

    /// Serve cached alignment rows, or `None` on any miss.
    pub fn load_alignments(&self, source: &Path, region: &Region) -> Option<Vec<AlignmentRow>> {
        self.load_rows(source, region, ALIGNMENT_TAG)
    }

    /// Store alignment rows parsed from `source` for `region`.
    pub fn store_alignments(
        &self,
        source: &Path,
        region: &Region,
        rows: &[AlignmentRow],
    ) -> Result<()> {
        self.store_rows(source, region, ALIGNMENT_TAG, rows)
    }

    /// Drop the entries for one source file, if present.
    pub fn invalidate(&self, source: &Path) -> Result<()> {
        for tag in [TRANSCRIPT_TAG, ALIGNMENT_TAG] {
            if let Some(path) = self.entry_path(source, tag) {
                match fs::remove_file(&path) {
                    Ok(()) => debug!("invalidated {}", path.display()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Ok(())
    }

    /// Drop every entry in the cache directory.
    pub fn clear(&self) -> Result<()> {
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == ENTRY_EXT) {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    fn entry_path(&self, source: &Path, tag: &str) -> Option<PathBuf> {
        let name = source.file_name()?.to_str()?;
        Some(self.dir.join(format!("{}.{}.{}", name, tag, ENTRY_EXT)))
    }

    fn load_rows<T: DeserializeOwned>(
        &self,
        source: &Path,
        region: &Region,
        tag: &str,
    ) -> Option<Vec<T>> {
        let path = self.entry_path(source, tag)?;
        let stamp = SourceStamp::current(source, region).ok()?;
        let bytes = fs::read(&path).ok()?;
        // A corrupt entry is just a miss; the next store overwrites it.
        let entry: Entry<Vec<T>> = bincode::deserialize(&bytes).ok()?;
        if entry.stamp != stamp {
            debug!("stale cache entry {}", path.display());
            return None;
        }
        debug!("cache hit {}", path.display());
        Some(entry.rows)
    }

    fn store_rows<T: Serialize>(
        &self,
        source: &Path,
        region: &Region,
        tag: &str,
        rows: &[T],
    ) -> Result<()> {
        let path = self.entry_path(source, tag).ok_or_else(|| {
            TrackError::Cache(format!("source '{}' has no usable file name", source.display()))
        })?;
        let stamp = SourceStamp::current(source, region)?;
        let bytes = bincode::serialize(&Entry { stamp, rows })
            .map_err(|e| TrackError::Cache(e.to_string()))?;
        // Write-then-rename so a crashed store never leaves a torn entry.
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&bytes)?;
        tmp.persist(&path).map_err(|e| TrackError::Io(e.error))?;
        debug!("stored {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}

/// Read transcript rows through an optional cache: a valid entry skips the
/// parse, anything else parses the file and refreshes the entry. A failed
/// store is logged and swallowed.
pub fn cached_transcript_rows(
    cache: Option<&FeatureCache>,
    path: &Path,
    region: &Region,
) -> Result<Vec<TranscriptRow>> {
    let Some(cache) = cache else {
        return gtf::read_transcript_rows(path, region);
    };
    if let Some(rows) = cache.load_transcripts(path, region) {
        return Ok(rows);
    }
    let rows = gtf::read_transcript_rows(path, region)?;
    if let Err(e) = cache.store_transcripts(path, region, &rows) {
        warn!("could not cache rows for {}: {}", path.display(), e);
    }
    Ok(rows)
}

/// Read alignment rows through an optional cache. Same contract as
/// [`cached_transcript_rows`].
pub fn cached_alignment_rows(
    cache: Option<&FeatureCache>,
    path: &Path,
    region: &Region,
) -> Result<Vec<AlignmentRow>> {
    let Some(cache) = cache else {
        return psl::read_alignment_rows(path, region);
    };
    if let Some(rows) = cache.load_alignments(path, region) {
        return Ok(rows);
    }
    let rows = psl::read_alignment_rows(path, region)?;
    if let Err(e) = cache.store_alignments(path, region, &rows) {
        warn!("could not cache rows for {}: {}", path.display(), e);
    }
    Ok(rows)
}
