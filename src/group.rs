//! Grouping and deterministic ordering of raw feature rows.
//!
//! The allocator packs groups in the order this module emits them, so the
//! ordering pre-pass here is what makes packings reproducible regardless of
//! input row order.

use rustc_hash::FxHashMap;

use crate::feature::{
    AlignmentRow, FeatureGroup, FeatureKind, Interval, Result, SubFeature, TrackError,
    TranscriptRow,
};

/// Group transcript rows by identifier, in the reference order:
///
/// 1. stable-sort all rows by descending end coordinate;
/// 2. number each identifier in the order it first appears under that sort;
/// 3. stable re-sort rows by that number, descending;
/// 4. each consecutive run of one identifier becomes a group.
///
/// The net effect is a group order driven by end coordinate, independent of
/// the input row order.
pub fn group_transcripts(mut rows: Vec<TranscriptRow>) -> Result<Vec<FeatureGroup>> {
    rows.sort_by(|a, b| b.interval.end.cmp(&a.interval.end));

    let mut order: FxHashMap<String, usize> = FxHashMap::default();
    for row in &rows {
        let next = order.len();
        order.entry(row.group_id.clone()).or_insert(next);
    }
    rows.sort_by(|a, b| order[&b.group_id].cmp(&order[&a.group_id]));

    let mut groups = Vec::new();
    let mut start = 0;
    while start < rows.len() {
        let mut end = start + 1;
        while end < rows.len() && rows[end].group_id == rows[start].group_id {
            end += 1;
        }
        let members = rows[start..end]
            .iter()
            .map(|row| SubFeature::new(row.interval, row.kind))
            .collect();
        groups.push(FeatureGroup::transcript(rows[start].group_id.clone(), members)?);
        start = end;
    }
    Ok(groups)
}

/// Turn each alignment row into its own singleton group, ordered by
/// ascending span start.
pub fn group_alignments(mut rows: Vec<AlignmentRow>) -> Result<Vec<FeatureGroup>> {
    rows.sort_by_key(|row| row.span.start);
    rows.into_iter().map(alignment_group).collect()
}

/// Decode one alignment row: block *i* occupies
/// `[block_starts[i], block_starts[i] + block_sizes[i])`. The readers
/// guarantee the two lists have equal length; rows built by hand are zipped
/// to the shorter list.
fn alignment_group(row: AlignmentRow) -> Result<FeatureGroup> {
    let blocks = row
        .block_starts
        .iter()
        .zip(&row.block_sizes)
        .map(|(&start, &size)| {
            let end = start.checked_add(size).ok_or_else(|| {
                TrackError::MalformedRecord(format!(
                    "alignment '{}': block start {} + size {} overflows",
                    row.name, start, size
                ))
            })?;
            Ok(SubFeature::new(Interval::new(start, end), FeatureKind::Block))
        })
        .collect::<Result<Vec<_>>>()?;
    FeatureGroup::alignment(row.name, row.span, blocks)
}
