//! Streaming GTF annotation parser.
//!
//! Keeps `transcript`, `exon` and `CDS` rows inside the target region and
//! extracts the `transcript_name` attribute as the group identifier. All
//! other rows are skipped during reading.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use log::debug;
use memchr::memchr;
use memmap2::Mmap;

use crate::feature::{FeatureKind, Interval, Result, TrackError, TranscriptRow};
use crate::region::Region;

/// A streaming GTF reader over any readable source.
pub struct GtfReader<R: Read> {
    reader: BufReader<R>,
    region: Region,
    line_number: usize,
    buffer: String,
}

impl GtfReader<File> {
    /// Open a GTF file from a path.
    pub fn from_path<P: AsRef<Path>>(path: P, region: Region) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(file, region))
    }
}

impl<R: Read> GtfReader<R> {
    /// Create a new GTF reader from any readable source.
    pub fn new(reader: R, region: Region) -> Self {
        Self {
            reader: BufReader::new(reader),
            region,
            line_number: 0,
            buffer: String::with_capacity(1024),
        }
    }

    /// Read the next retained row, skipping comments, blank lines, feature
    /// types outside the drawable set, and rows outside the region.
    pub fn read_row(&mut self) -> Result<Option<TranscriptRow>> {
        loop {
            self.buffer.clear();
            let bytes_read = self.reader.read_line(&mut self.buffer)?;
            if bytes_read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let line = self.buffer.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(row) = parse_row(line, self.line_number, &self.region)? {
                return Ok(Some(row));
            }
        }
    }

    /// Get an iterator over all retained rows.
    pub fn rows(self) -> GtfRows<R> {
        GtfRows { reader: self }
    }
}

/// Iterator over retained GTF rows.
pub struct GtfRows<R: Read> {
    reader: GtfReader<R>,
}

impl<R: Read> Iterator for GtfRows<R> {
    type Item = Result<TranscriptRow>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Parse a single GTF line. Returns `Ok(None)` for rows that are skipped
/// (undrawn feature type or outside the region).
fn parse_row(line: &str, line_number: usize, region: &Region) -> Result<Option<TranscriptRow>> {
    let fields: Vec<&str> = line.split('\t').collect();

    if fields.len() < 9 {
        return Err(TrackError::Parse {
            line: line_number,
            message: format!("Expected at least 9 fields, got {}", fields.len()),
        });
    }

    let kind = match FeatureKind::from_gtf(fields[2]) {
        Some(kind) => kind,
        None => return Ok(None),
    };

    let start = parse_position(fields[3], "start", line_number)?;
    let end = parse_position(fields[4], "end", line_number)?;
    if start > end {
        return Err(TrackError::Parse {
            line: line_number,
            message: format!("Start ({}) > end ({})", start, end),
        });
    }
    let interval = Interval::new(start, end);

    if !region.retains(fields[0], &interval) {
        return Ok(None);
    }

    let group_id = transcript_name(fields[8]).ok_or_else(|| {
        TrackError::MalformedRecord(format!(
            "{} row at line {} has no transcript_name attribute",
            kind, line_number
        ))
    })?;

    Ok(Some(TranscriptRow {
        group_id: group_id.to_string(),
        kind,
        interval,
    }))
}

/// Extract the quoted value of the `transcript_name` attribute.
fn transcript_name(attributes: &str) -> Option<&str> {
    for attr in attributes.split(';') {
        let attr = attr.trim();
        if let Some(rest) = attr.strip_prefix("transcript_name") {
            let mut parts = rest.split('"');
            parts.next();
            return parts.next().filter(|name| !name.is_empty());
        }
    }
    None
}

fn parse_position(s: &str, field_name: &str, line_number: usize) -> Result<u64> {
    s.parse().map_err(|_| TrackError::Parse {
        line: line_number,
        message: format!("Invalid {} position: '{}'", field_name, s),
    })
}

/// Read all retained rows from a GTF file through a memory map, splitting
/// lines with memchr. This is the fast path for on-disk annotation files;
/// use [`GtfReader`] for arbitrary `Read` sources.
pub fn read_transcript_rows<P: AsRef<Path>>(path: P, region: &Region) -> Result<Vec<TranscriptRow>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    // The map is read-only and lives only for the duration of this call.
    let mmap = unsafe { Mmap::map(&file)? };

    let mut rows = Vec::new();
    let mut data = &mmap[..];
    let mut line_number = 0;

    while !data.is_empty() {
        let line_end = memchr(b'\n', data).unwrap_or(data.len());
        let (mut line, rest) = data.split_at(line_end);
        data = rest.get(1..).unwrap_or(&[]);
        line_number += 1;

        if line.ends_with(b"\r") {
            line = &line[..line.len() - 1];
        }
        if line.is_empty() || line[0] == b'#' {
            continue;
        }

        let line = std::str::from_utf8(line).map_err(|_| TrackError::Parse {
            line: line_number,
            message: "Line is not valid UTF-8".to_string(),
        })?;

        if let Some(row) = parse_row(line.trim(), line_number, region)? {
            rows.push(row);
        }
    }

    debug!(
        "read {} transcript rows in {} from {}",
        rows.len(),
        region,
        path.display()
    );
    Ok(rows)
}

/// Parse retained rows from a string (useful for testing).
pub fn parse_transcript_rows(content: &str, region: &Region) -> Result<Vec<TranscriptRow>> {
    let reader = GtfReader::new(content.as_bytes(), region.clone());
    reader.rows().collect()
}
