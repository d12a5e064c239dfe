//! Streaming PSL alignment parser.
//!
//! Keeps the target-side coordinates of each aligned read: query name,
//! target span, and the parallel `blockSizes`/`tStarts` lists describing the
//! aligned segments. Rows outside the target region are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use log::debug;
use memchr::memchr;
use memmap2::Mmap;

use crate::feature::{AlignmentRow, Interval, Result, TrackError};
use crate::region::Region;

/// Column layout of a PSL row (0-based).
const QNAME_COL: usize = 9;
const TNAME_COL: usize = 13;
const TSTART_COL: usize = 15;
const TEND_COL: usize = 16;
const BLOCK_SIZES_COL: usize = 18;
const TSTARTS_COL: usize = 20;
const MIN_FIELDS: usize = 21;

/// A streaming PSL reader over any readable source.
pub struct PslReader<R: Read> {
    reader: BufReader<R>,
    region: Region,
    line_number: usize,
    buffer: String,
}

impl PslReader<File> {
    /// Open a PSL file from a path.
    pub fn from_path<P: AsRef<Path>>(path: P, region: Region) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(file, region))
    }
}

impl<R: Read> PslReader<R> {
    /// Create a new PSL reader from any readable source.
    pub fn new(reader: R, region: Region) -> Self {
        Self {
            reader: BufReader::new(reader),
            region,
            line_number: 0,
            buffer: String::with_capacity(1024),
        }
    }

    /// Read the next retained row, skipping the psLayout header block,
    /// blank lines, and rows outside the region.
    pub fn read_row(&mut self) -> Result<Option<AlignmentRow>> {
        loop {
            self.buffer.clear();
            let bytes_read = self.reader.read_line(&mut self.buffer)?;
            if bytes_read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let line = self.buffer.trim();
            if is_skippable(line) {
                continue;
            }

            if let Some(row) = parse_row(line, self.line_number, &self.region)? {
                return Ok(Some(row));
            }
        }
    }

    /// Get an iterator over all retained rows.
    pub fn rows(self) -> PslRows<R> {
        PslRows { reader: self }
    }
}

/// Iterator over retained PSL rows.
pub struct PslRows<R: Read> {
    reader: PslReader<R>,
}

impl<R: Read> Iterator for PslRows<R> {
    type Item = Result<AlignmentRow>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Blank lines and the three psLayout header lines.
fn is_skippable(line: &str) -> bool {
    line.is_empty()
        || line.starts_with("psLayout")
        || line.starts_with("match")
        || line.starts_with('-')
}

/// Parse a single PSL line. Returns `Ok(None)` for rows outside the region.
fn parse_row(line: &str, line_number: usize, region: &Region) -> Result<Option<AlignmentRow>> {
    let fields: Vec<&str> = line.split('\t').collect();

    if fields.len() < MIN_FIELDS {
        return Err(TrackError::Parse {
            line: line_number,
            message: format!("Expected at least {} fields, got {}", MIN_FIELDS, fields.len()),
        });
    }

    let start = parse_position(fields[TSTART_COL], "tStart", line_number)?;
    let end = parse_position(fields[TEND_COL], "tEnd", line_number)?;
    if start > end {
        return Err(TrackError::Parse {
            line: line_number,
            message: format!("tStart ({}) > tEnd ({})", start, end),
        });
    }
    let span = Interval::new(start, end);

    if !region.retains(fields[TNAME_COL], &span) {
        return Ok(None);
    }

    let block_sizes = parse_list(fields[BLOCK_SIZES_COL], "blockSizes", line_number)?;
    let block_starts = parse_list(fields[TSTARTS_COL], "tStarts", line_number)?;
    if block_sizes.len() != block_starts.len() {
        return Err(TrackError::Parse {
            line: line_number,
            message: format!(
                "blockSizes has {} entries but tStarts has {}",
                block_sizes.len(),
                block_starts.len()
            ),
        });
    }

    Ok(Some(AlignmentRow {
        name: fields[QNAME_COL].to_string(),
        span,
        block_sizes,
        block_starts,
    }))
}

/// Parse a comma-separated u64 list; PSL lists carry a trailing comma, so
/// empty segments are skipped.
fn parse_list(s: &str, field_name: &str, line_number: usize) -> Result<Vec<u64>> {
    s.split(',')
        .filter(|seg| !seg.is_empty())
        .map(|seg| {
            seg.parse().map_err(|_| TrackError::Parse {
                line: line_number,
                message: format!("Invalid {} entry: '{}'", field_name, seg),
            })
        })
        .collect()
}

fn parse_position(s: &str, field_name: &str, line_number: usize) -> Result<u64> {
    s.parse().map_err(|_| TrackError::Parse {
        line: line_number,
        message: format!("Invalid {} position: '{}'", field_name, s),
    })
}

/// Read all retained rows from a PSL file through a memory map, splitting
/// lines with memchr. This is the fast path for on-disk read sets; use
/// [`PslReader`] for arbitrary `Read` sources.
pub fn read_alignment_rows<P: AsRef<Path>>(path: P, region: &Region) -> Result<Vec<AlignmentRow>> {
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

        let line = std::str::from_utf8(line).map_err(|_| TrackError::Parse {
            line: line_number,
            message: "Line is not valid UTF-8".to_string(),
        })?;

        let line = line.trim();
        if is_skippable(line) {
            continue;
        }
        if let Some(row) = parse_row(line, line_number, region)? {
            rows.push(row);
        }
    }

    debug!(
        "read {} alignment rows in {} from {}",
        rows.len(),
        region,
        path.display()
    );
    Ok(rows)
}

/// Parse retained rows from a string (useful for testing).
pub fn parse_alignment_rows(content: &str, region: &Region) -> Result<Vec<AlignmentRow>> {
    let reader = PslReader::new(content.as_bytes(), region.clone());
    reader.rows().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region() -> Region {
        Region::new("chr7", 45232945, 45240000).unwrap()
    }

    fn psl_line(name: &str, tstart: u64, tend: u64, sizes: &str, tstarts: &str) -> String {
        let block_count = sizes.split(',').filter(|s| !s.is_empty()).count();
        let qsize = tend.saturating_sub(tstart);
        format!(
            "{}\t0\t0\t0\t0\t0\t0\t0\t+\t{}\t{}\t0\t{}\tchr7\t159345973\t{}\t{}\t{}\t{}\t0,\t{}\n",
            qsize, name, qsize, qsize, tstart, tend, block_count, sizes, tstarts
        )
    }

    #[test]
    fn test_parse_alignment_row() {
        let content = psl_line("read1", 45233000, 45233100, "10,20,", "45233000,45233050,");
        let rows = parse_alignment_rows(&content, &region()).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "read1");
        assert_eq!(rows[0].span, Interval::new(45233000, 45233100));
        assert_eq!(rows[0].block_sizes, vec![10, 20]);
        assert_eq!(rows[0].block_starts, vec![45233000, 45233050]);
    }

    #[test]
    fn test_skip_header_block() {
        let content = format!(
            "psLayout version 3\n\nmatch\tmis-\trep.\nmatch\tmatch\n{}\n{}",
            "-".repeat(40),
            psl_line("read1", 45233000, 45233100, "100,", "45233000,")
        );
        let rows = parse_alignment_rows(&content, &region()).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_region_filter() {
        let inside = psl_line("kept", 45233000, 45233100, "100,", "45233000,");
        let outside = psl_line("dropped", 45250000, 45250100, "100,", "45250000,");
        let other_chrom = inside.replace("chr7", "chr6");

        let content = format!("{}{}{}", inside, outside, other_chrom);
        let rows = parse_alignment_rows(&content, &region()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "kept");
    }

    #[test]
    fn test_empty_block_lists() {
        let content = psl_line("read1", 45233000, 45233100, ",", ",");
        let rows = parse_alignment_rows(&content, &region()).unwrap();
        assert!(rows[0].block_sizes.is_empty());
        assert!(rows[0].block_starts.is_empty());
    }

    #[test]
    fn test_mismatched_block_lists() {
        let content = psl_line("read1", 45233000, 45233100, "10,20,", "45233000,");
        let err = parse_alignment_rows(&content, &region()).unwrap_err();
        assert!(matches!(err, TrackError::Parse { .. }));
    }

    #[test]
    fn test_invalid_coordinates() {
        let content = psl_line("read1", 45233100, 45233000, "100,", "45233000,");
        let err = parse_alignment_rows(&content, &region()).unwrap_err();
        assert!(matches!(err, TrackError::Parse { .. }));

        let content = psl_line("read1", 45233000, 45233100, "ten,", "45233000,");
        let err = parse_alignment_rows(&content, &region()).unwrap_err();
        assert!(matches!(err, TrackError::Parse { .. }));
    }

    #[test]
    fn test_too_few_fields() {
        let err = parse_alignment_rows("50\t0\t0\n", &region()).unwrap_err();
        assert!(matches!(err, TrackError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_mmap_path_matches_streaming() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        let content = format!(
            "psLayout version 3\n{}{}",
            psl_line("read1", 45233000, 45233100, "100,", "45233000,"),
            psl_line("read2", 45234000, 45234400, "200,200,", "45234000,45234200,")
        );
        file.write_all(content.as_bytes()).unwrap();

        let from_mmap = read_alignment_rows(file.path(), &region()).unwrap();
        let from_stream = parse_alignment_rows(&content, &region()).unwrap();
        assert_eq!(from_mmap, from_stream);
        assert_eq!(from_mmap.len(), 2);
    }
}
