//! File-to-figure pipeline tests.
//!
//! Synthetic GTF/PSL datasets are written to disk, read back through the
//! region-filtered parsers (with and without the row cache), packed, and
//! rendered into SVG.

use std::fs;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use tempfile::tempdir;

use lanepack::cache::{cached_alignment_rows, cached_transcript_rows, FeatureCache};
use lanepack::draw::{Rect, TrackStyle};
use lanepack::gtf;
use lanepack::psl;
use lanepack::region::Region;
use lanepack::render::Figure;
use lanepack::synth;
use lanepack::track::{pack_tracks, TrackJob};

fn sample_region() -> Region {
    Region::new("chr7", 45_232_945, 45_240_000).unwrap()
}

// =============================================================================
// Files to figure
// =============================================================================

#[test]
fn test_synthetic_files_render_to_svg() {
    let dir = tempdir().unwrap();
    let region = sample_region();

    let mut rng = SmallRng::seed_from_u64(7);
    let transcripts = synth::generate_transcripts(&region, 12, &mut rng);
    let gtf_path = dir.path().join("annotation.gtf");
    synth::write_gtf(&gtf_path, &region, &transcripts).unwrap();

    let mut rng = SmallRng::seed_from_u64(8);
    let alignments = synth::generate_alignments(&region, 40, &mut rng);
    let psl_path = dir.path().join("reads.psl");
    synth::write_psl(&psl_path, &region, &alignments).unwrap();

    let t_rows = gtf::read_transcript_rows(&gtf_path, &region).unwrap();
    let a_rows = psl::read_alignment_rows(&psl_path, &region).unwrap();
    assert_eq!(t_rows.len(), transcripts.len());
    assert_eq!(a_rows.len(), alignments.len());

    let tracks = pack_tracks(vec![
        TrackJob::transcripts(t_rows, TrackStyle::transcripts_default()),
        TrackJob::alignments(a_rows, TrackStyle::alignments_default()),
    ])
    .unwrap();

    let mut figure = Figure::reference(&region);
    figure.panel_mut(0).add_rects(&tracks[0].rects);
    figure.panel_mut(1).add_rects(&tracks[1].rects);

    let svg_path = dir.path().join("figure.svg");
    figure.write_svg(&svg_path).unwrap();
    let svg = fs::read_to_string(&svg_path).unwrap();

    assert!(svg.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(svg.contains("<svg width=\"1000.0\" height=\"500.0\""));
    assert!(svg.contains("fill=\"white\""));
    assert!(svg.trim_end().ends_with("</svg>"));

    // Background plus every drawn rect that survives clipping.
    let expected: usize = figure
        .panels()
        .iter()
        .map(|p| p.rects().iter().filter(|r| p.project(r).is_some()).count())
        .sum();
    assert!(expected > 0);
    assert_eq!(svg.matches("<rect").count(), 1 + expected);
}

#[test]
fn test_projection_lands_in_panel_pixels() {
    // Region width 1000 against a 1000 px panel keeps x untouched; the
    // y values are powers of two so the pixel arithmetic is exact.
    let region = Region::new("chr1", 0, 999).unwrap();
    let mut figure = Figure::reference(&region);
    figure.panel_mut(0).add_rect(Rect {
        x: 100.0,
        y: 0.5,
        width: 500.0,
        height: 0.25,
    });

    let mut out = Vec::new();
    figure.render(&mut out).unwrap();
    let svg = String::from_utf8(out).unwrap();

    // Panel 0 spans pixel rows 50..175; a rect with its top at y=0.75
    // lands 0.25 * 125 px below the panel top.
    assert!(svg.contains("<rect x=\"100.0\" y=\"81.25\" width=\"500.0\" height=\"31.25\" fill=\"black\"/>"));
}

// =============================================================================
// Row cache
// =============================================================================

#[test]
fn test_cached_reads_match_direct_reads() {
    let dir = tempdir().unwrap();
    let region = sample_region();

    let mut rng = SmallRng::seed_from_u64(19);
    let rows = synth::generate_transcripts(&region, 8, &mut rng);
    let gtf_path = dir.path().join("annotation.gtf");
    synth::write_gtf(&gtf_path, &region, &rows).unwrap();

    let direct = cached_transcript_rows(None, &gtf_path, &region).unwrap();
    assert_eq!(direct, rows);

    let cache = FeatureCache::new(dir.path().join("cache")).unwrap();
    let first = cached_transcript_rows(Some(&cache), &gtf_path, &region).unwrap();
    assert_eq!(first, direct);

    // The entry is on disk now and serves the second read.
    assert_eq!(cache.load_transcripts(&gtf_path, &region).unwrap(), first);
    let second = cached_transcript_rows(Some(&cache), &gtf_path, &region).unwrap();
    assert_eq!(second, first);
}

#[test]
fn test_cache_follows_source_changes() {
    let dir = tempdir().unwrap();
    let region = sample_region();

    let mut rng = SmallRng::seed_from_u64(29);
    let rows = synth::generate_alignments(&region, 10, &mut rng);
    let psl_path = dir.path().join("reads.psl");
    synth::write_psl(&psl_path, &region, &rows).unwrap();

    let cache = FeatureCache::new(dir.path().join("cache")).unwrap();
    let first = cached_alignment_rows(Some(&cache), &psl_path, &region).unwrap();
    assert_eq!(first.len(), 10);

    // Rewriting the source invalidates the entry and the next read parses
    // the new content.
    let mut rng = SmallRng::seed_from_u64(31);
    let fewer = synth::generate_alignments(&region, 4, &mut rng);
    synth::write_psl(&psl_path, &region, &fewer).unwrap();

    assert!(cache.load_alignments(&psl_path, &region).is_none());
    let second = cached_alignment_rows(Some(&cache), &psl_path, &region).unwrap();
    assert_eq!(second, fewer);
    assert_eq!(cache.load_alignments(&psl_path, &region).unwrap(), fewer);
}

#[test]
fn test_cache_management() {
    let dir = tempdir().unwrap();
    let region = sample_region();

    let mut rng = SmallRng::seed_from_u64(37);
    let rows = synth::generate_transcripts(&region, 5, &mut rng);
    let gtf_path = dir.path().join("annotation.gtf");
    synth::write_gtf(&gtf_path, &region, &rows).unwrap();

    let cache = FeatureCache::new(dir.path().join("cache")).unwrap();
    cached_transcript_rows(Some(&cache), &gtf_path, &region).unwrap();
    assert!(cache.load_transcripts(&gtf_path, &region).is_some());

    cache.invalidate(&gtf_path).unwrap();
    assert!(cache.load_transcripts(&gtf_path, &region).is_none());

    cached_transcript_rows(Some(&cache), &gtf_path, &region).unwrap();
    cache.clear().unwrap();
    assert!(cache.load_transcripts(&gtf_path, &region).is_none());
}
