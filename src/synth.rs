//! Seeded synthetic dataset generation.
//!
//! Produces transcript and alignment row sets inside a region, and writes
//! them as well-formed GTF/PSL files, for the `generate` command and for
//! property tests. Generation is deterministic for a given seed.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rand::rngs::SmallRng;
use rand::Rng;

use crate::feature::{AlignmentRow, FeatureKind, Interval, Result, TranscriptRow};
use crate::region::Region;

/// Generate `count` multi-exon transcripts inside `region`: per transcript
/// one spanning `transcript` row, up to six `exon` rows laid left to right,
/// and one `CDS` row inside the span.
pub fn generate_transcripts(
    region: &Region,
    count: usize,
    rng: &mut SmallRng,
) -> Vec<TranscriptRow> {
    let mut rows = Vec::new();
    for i in 0..count {
        let id = format!("synth-{:04}", i + 1);
        let span = random_span(region, rng);
        rows.push(TranscriptRow {
            group_id: id.clone(),
            kind: FeatureKind::Transcript,
            interval: span,
        });

        for exon in split_span(&span, 6, rng) {
            rows.push(TranscriptRow {
                group_id: id.clone(),
                kind: FeatureKind::Exon,
                interval: exon,
            });
        }

        let cds_start = rng.gen_range(span.start..span.end);
        let cds_end = rng.gen_range(cds_start + 1..=span.end);
        rows.push(TranscriptRow {
            group_id: id,
            kind: FeatureKind::Cds,
            interval: Interval::new(cds_start, cds_end),
        });
    }
    rows
}

/// Generate `count` aligned reads inside `region`, each with a random block
/// decomposition of its span.
pub fn generate_alignments(
    region: &Region,
    count: usize,
    rng: &mut SmallRng,
) -> Vec<AlignmentRow> {
    (0..count)
        .map(|i| {
            let span = random_span(region, rng);
            let blocks = split_span(&span, 5, rng);
            AlignmentRow {
                name: format!("read-{:05}", i + 1),
                span,
                block_sizes: blocks.iter().map(|b| b.len()).collect(),
                block_starts: blocks.iter().map(|b| b.start).collect(),
            }
        })
        .collect()
}

/// A span somewhere inside the region, between 1/20th and 1/4 of its width.
fn random_span(region: &Region, rng: &mut SmallRng) -> Interval {
    let width = region.len();
    let max_len = (width / 4).max(4);
    let min_len = (width / 20).max(4).min(max_len);
    let len = rng.gen_range(min_len..=max_len).min(width.max(1));
    let slack = width.saturating_sub(len);
    let start = region.interval.start + rng.gen_range(0..=slack);
    Interval::new(start, start + len)
}

/// Cut a span into `1..=max` segments separated by gaps. The first segment
/// starts at the span start and the last is stretched to the span end, so
/// the segments and the span describe the same extent.
fn split_span(span: &Interval, max: usize, rng: &mut SmallRng) -> Vec<Interval> {
    let wanted = rng.gen_range(1..=max);
    let mut segments = Vec::with_capacity(wanted);
    let mut pos = span.start;
    while segments.len() < wanted && pos < span.end {
        let remaining = span.end - pos;
        let len = rng.gen_range(1..=remaining.div_ceil(2));
        segments.push(Interval::new(pos, pos + len));
        pos += len;
        let remaining = span.end - pos;
        if remaining == 0 {
            break;
        }
        pos += rng.gen_range(0..=remaining / 2);
    }
    if let Some(last) = segments.last_mut() {
        last.end = span.end;
    }
    segments
}

/// Write transcript rows as a GENCODE-style GTF file on `region`'s
/// chromosome.
pub fn write_gtf<P: AsRef<Path>>(path: P, region: &Region, rows: &[TranscriptRow]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let mut buf = itoa::Buffer::new();

    writeln!(writer, "##description: synthetic annotation covering {}", region)?;
    writeln!(writer, "##provider: lanepack")?;
    for row in rows {
        writer.write_all(region.chrom.as_bytes())?;
        writer.write_all(b"\tlanepack\t")?;
        write!(writer, "{}", row.kind)?;
        writer.write_all(b"\t")?;
        writer.write_all(buf.format(row.interval.start).as_bytes())?;
        writer.write_all(b"\t")?;
        writer.write_all(buf.format(row.interval.end).as_bytes())?;
        writer.write_all(b"\t.\t+\t.\t")?;
        writeln!(
            writer,
            "gene_id \"{}\"; transcript_id \"{}\"; transcript_name \"{}\";",
            row.group_id, row.group_id, row.group_id
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Write alignment rows as a PSL file with the standard psLayout header.
pub fn write_psl<P: AsRef<Path>>(path: P, region: &Region, rows: &[AlignmentRow]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let mut buf = itoa::Buffer::new();

    writeln!(writer, "psLayout version 3")?;
    writeln!(writer)?;
    writeln!(
        writer,
        "match\tmis- \trep. \tN's\tQ gap\tQ gap\tT gap\tT gap\tstrand\tQ        \tQ   \tQ    \tQ  \tT        \tT   \tT    \tT  \tblock\tblockSizes \tqStarts\t tStarts"
    )?;
    writeln!(
        writer,
        "     \tmatch\tmatch\t   \tcount\tbases\tcount\tbases\t      \tname     \tsize\tstart\tend\tname     \tsize\tstart\tend\tcount"
    )?;
    writeln!(writer, "{}", "-".repeat(159))?;

    let t_size = region.interval.end + 1_000_000;
    for row in rows {
        let aligned: u64 = row.block_sizes.iter().sum();
        let gap_bases = row.span.len().saturating_sub(aligned);
        let gap_count = row.block_sizes.len().saturating_sub(1);

        writer.write_all(buf.format(aligned).as_bytes())?;
        writer.write_all(b"\t0\t0\t0\t0\t0\t")?;
        writer.write_all(buf.format(gap_count).as_bytes())?;
        writer.write_all(b"\t")?;
        writer.write_all(buf.format(gap_bases).as_bytes())?;
        writer.write_all(b"\t+\t")?;
        writer.write_all(row.name.as_bytes())?;
        writer.write_all(b"\t")?;
        writer.write_all(buf.format(aligned).as_bytes())?;
        writer.write_all(b"\t0\t")?;
        writer.write_all(buf.format(aligned).as_bytes())?;
        writer.write_all(b"\t")?;
        writer.write_all(region.chrom.as_bytes())?;
        writer.write_all(b"\t")?;
        writer.write_all(buf.format(t_size).as_bytes())?;
        writer.write_all(b"\t")?;
        writer.write_all(buf.format(row.span.start).as_bytes())?;
        writer.write_all(b"\t")?;
        writer.write_all(buf.format(row.span.end).as_bytes())?;
        writer.write_all(b"\t")?;
        writer.write_all(buf.format(row.block_sizes.len()).as_bytes())?;
        writer.write_all(b"\t")?;
        write_list(&mut writer, &mut buf, &row.block_sizes)?;
        writer.write_all(b"\t")?;
        let mut q_offset = 0u64;
        for size in &row.block_sizes {
            writer.write_all(buf.format(q_offset).as_bytes())?;
            writer.write_all(b",")?;
            q_offset += size;
        }
        writer.write_all(b"\t")?;
        write_list(&mut writer, &mut buf, &row.block_starts)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

fn write_list<W: Write>(writer: &mut W, buf: &mut itoa::Buffer, values: &[u64]) -> Result<()> {
    for value in values {
        writer.write_all(buf.format(*value).as_bytes())?;
        writer.write_all(b",")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gtf;
    use crate::psl;
    use rand::SeedableRng;
    use tempfile::tempdir;

    fn sample_region() -> Region {
        Region::new("chr7", 45_232_945, 45_240_000).unwrap()
    }

    #[test]
    fn test_generation_is_deterministic() {
        let region = sample_region();
        let mut a = SmallRng::seed_from_u64(42);
        let mut b = SmallRng::seed_from_u64(42);

        assert_eq!(
            generate_transcripts(&region, 20, &mut a),
            generate_transcripts(&region, 20, &mut b)
        );
        assert_eq!(
            generate_alignments(&region, 50, &mut a),
            generate_alignments(&region, 50, &mut b)
        );
    }

    #[test]
    fn test_seeds_differ() {
        let region = sample_region();
        let mut a = SmallRng::seed_from_u64(1);
        let mut b = SmallRng::seed_from_u64(2);
        assert_ne!(
            generate_alignments(&region, 10, &mut a),
            generate_alignments(&region, 10, &mut b)
        );
    }

    #[test]
    fn test_transcripts_stay_in_region() {
        let region = sample_region();
        let mut rng = SmallRng::seed_from_u64(7);
        for row in generate_transcripts(&region, 30, &mut rng) {
            assert!(region.retains(&region.chrom, &row.interval));
        }
    }

    #[test]
    fn test_transcript_rows_are_grouped_and_spanned() {
        let region = sample_region();
        let mut rng = SmallRng::seed_from_u64(11);
        let rows = generate_transcripts(&region, 5, &mut rng);

        let mut i = 0;
        while i < rows.len() {
            assert_eq!(rows[i].kind, FeatureKind::Transcript);
            let id = rows[i].group_id.clone();
            let span = rows[i].interval;
            let mut j = i + 1;
            while j < rows.len() && rows[j].group_id == id {
                assert!(span.start <= rows[j].interval.start);
                assert!(rows[j].interval.end <= span.end);
                j += 1;
            }
            // transcript + at least one exon + CDS
            assert!(j - i >= 3);
            i = j;
        }
    }

    #[test]
    fn test_alignment_blocks_tie_to_span() {
        let region = sample_region();
        let mut rng = SmallRng::seed_from_u64(13);
        for row in generate_alignments(&region, 40, &mut rng) {
            assert_eq!(row.block_sizes.len(), row.block_starts.len());
            assert!(!row.block_sizes.is_empty());
            assert_eq!(row.block_starts[0], row.span.start);
            let last = row.block_sizes.len() - 1;
            assert_eq!(row.block_starts[last] + row.block_sizes[last], row.span.end);
        }
    }

    #[test]
    fn test_gtf_round_trip() {
        let dir = tempdir().unwrap();
        let region = sample_region();
        let mut rng = SmallRng::seed_from_u64(5);
        let rows = generate_transcripts(&region, 10, &mut rng);

        let path = dir.path().join("annotation.gtf");
        write_gtf(&path, &region, &rows).unwrap();

        let parsed = gtf::read_transcript_rows(&path, &region).unwrap();
        assert_eq!(parsed, rows);
    }

    #[test]
    fn test_psl_round_trip() {
        let dir = tempdir().unwrap();
        let region = sample_region();
        let mut rng = SmallRng::seed_from_u64(6);
        let rows = generate_alignments(&region, 25, &mut rng);

        let path = dir.path().join("reads.psl");
        write_psl(&path, &region, &rows).unwrap();

        let parsed = psl::read_alignment_rows(&path, &region).unwrap();
        assert_eq!(parsed, rows);
    }

    #[test]
    fn test_split_span_covers_extent() {
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..100 {
            let span = Interval::new(1000, 2000);
            let segments = split_span(&span, 5, &mut rng);
            assert!(!segments.is_empty());
            assert_eq!(segments[0].start, span.start);
            assert_eq!(segments.last().unwrap().end, span.end);
            for pair in segments.windows(2) {
                assert!(pair[0].end <= pair[1].start);
            }
        }
    }
}
