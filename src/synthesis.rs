//! Synthesis planner (C7): gap-filling synthetic fragment construction,
//! length-splitting, quality rejection, and the deduplicating synthesis
//! catalog. Grounded on `seq.rs`'s GC/homopolymer metrics and the teacher's
//! `BTreeMap`-keyed dedup pattern in `plane_sweep.rs`.

use crate::config::Config;
use crate::error::{PlannerError, Result};
use crate::fragment::{Fragment, FragmentKind, JunctionContract};
use crate::hit::Strand;
use crate::seq::{doubled, gc_fraction, gc_window_extrema, longest_homopolymer_run};
use std::collections::BTreeMap;

/// Deduplicates identical synthesized sub-sequences across one invocation
/// so they share a single order and identifier (spec.md §4.7).
#[derive(Default)]
pub struct SynthesisCatalog {
    by_seq: BTreeMap<String, String>,
    next_id: usize,
}

impl SynthesisCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the catalog id for `seq`, minting a new one if this exact
    /// sequence has not been seen before.
    pub fn intern(&mut self, seq: &str) -> String {
        if let Some(id) = self.by_seq.get(seq) {
            return id.clone();
        }
        let id = format!("syn-{}", self.next_id);
        self.next_id += 1;
        self.by_seq.insert(seq.to_string(), id.clone());
        id
    }
}

/// Checks a candidate synthetic sequence against the quality gates in
/// spec.md §4.7: overall GC bounds, sliding-window GC bounds, and maximum
/// homopolymer run.
pub fn passes_quality(seq: &str, config: &Config) -> bool {
    let gc = gc_fraction(seq);
    if gc < config.synthesis_gc_bounds.0 || gc > config.synthesis_gc_bounds.1 {
        return false;
    }
    if let Some((min, max)) = gc_window_extrema(seq, config.synthesis_gc_window) {
        if min < config.synthesis_window_gc_bounds.0 || max > config.synthesis_window_gc_bounds.1 {
            return false;
        }
    }
    if longest_homopolymer_run(seq) > config.synthesis_max_homopolymer {
        return false;
    }
    true
}

/// Builds the synthetic fragment filling the gap `[gap_start, gap_end)` on
/// the doubled target, padded symmetrically by `min_junction_length` on
/// both sides so it can form a valid junction with its neighbors.
///
/// Splits into equal-length pieces when the padded region exceeds
/// `synthetic_max_length`; each piece must independently pass quality, and
/// its pairwise overlap with its neighbor piece satisfies the junction
/// contract. Returns `SynthesisRejected` if no split satisfies quality for
/// some piece.
pub fn build_bridge(
    target: &str,
    target_len: usize,
    gap_start: usize,
    gap_end: usize,
    catalog: &mut SynthesisCatalog,
    config: &Config,
) -> Result<Vec<Fragment>> {
    let padded_start = gap_start.saturating_sub(config.fragments_min_junction_length);
    let padded_end = gap_end + config.fragments_min_junction_length;
    let doubled_target = doubled(target);
    let region = doubled_target
        .get(padded_start..padded_end)
        .ok_or_else(|| PlannerError::SynthesisRejected {
            start: gap_start,
            end: gap_end,
            detail: "padded region out of bounds of the doubled target".to_string(),
        })?;

    let total_len = region.len();
    if total_len <= config.synthetic_max_length {
        return build_single_piece(region, padded_start, padded_end, catalog, config, gap_start, gap_end);
    }

    split_into_pieces(region, padded_start, total_len, catalog, config, gap_start, gap_end, target_len)
}

fn build_single_piece(
    region: &str,
    start: usize,
    end: usize,
    catalog: &mut SynthesisCatalog,
    config: &Config,
    gap_start: usize,
    gap_end: usize,
) -> Result<Vec<Fragment>> {
    if !passes_quality(region, config) {
        return Err(PlannerError::SynthesisRejected {
            start: gap_start,
            end: gap_end,
            detail: "single-piece synthesis failed GC/homopolymer quality checks".to_string(),
        });
    }
    let catalog_id = catalog.intern(region);
    Ok(vec![Fragment {
        id: format!("synthetic-{catalog_id}"),
        kind: FragmentKind::Synthetic {
            catalog_id: Some(catalog_id),
            whole_plasmid: false,
        },
        source_db: None,
        source_entry_id: None,
        source_url: None,
        seq: region.to_string(),
        start,
        end,
        strand: Strand::Forward,
        conflicts: Vec::new(),
        junction: JunctionContract::from_config(config),
        source_unit_cost: 0.0,
    }])
}

/// Splits `region` into the minimum number of equal-length pieces each no
/// longer than `synthetic_max_length`, with pairwise overlap equal to
/// `fragments_min_junction_length`. Tries successive piece counts (and,
/// within a count, a small set of boundary offsets) until every piece
/// passes quality, per spec.md §4.7's "re-split at a different boundary"
/// retry policy.
fn split_into_pieces(
    region: &str,
    region_start: usize,
    total_len: usize,
    catalog: &mut SynthesisCatalog,
    config: &Config,
    gap_start: usize,
    gap_end: usize,
    _target_len: usize,
) -> Result<Vec<Fragment>> {
    let overlap = config.fragments_min_junction_length;
    let usable_max = config.synthetic_max_length.saturating_sub(overlap);
    if usable_max == 0 {
        return Err(PlannerError::SynthesisRejected {
            start: gap_start,
            end: gap_end,
            detail: "synthetic-max-length too small to accommodate junction overlap".to_string(),
        });
    }

    let min_pieces = ((total_len - overlap) as f64 / usable_max as f64).ceil() as usize;

    for piece_count in min_pieces.max(2)..=min_pieces.max(2) + 3 {
        for boundary_shift in 0..overlap.max(1) {
            if let Some(pieces) = try_split(
                region,
                region_start,
                total_len,
                piece_count,
                overlap,
                boundary_shift,
                catalog,
                config,
            ) {
                return Ok(pieces);
            }
        }
    }

    Err(PlannerError::SynthesisRejected {
        start: gap_start,
        end: gap_end,
        detail: "no split boundary produced pieces passing quality checks".to_string(),
    })
}

fn try_split(
    region: &str,
    region_start: usize,
    total_len: usize,
    piece_count: usize,
    overlap: usize,
    boundary_shift: usize,
    catalog: &mut SynthesisCatalog,
    config: &Config,
) -> Option<Vec<Fragment>> {
    let stride = (total_len - overlap) / piece_count.max(1);
    if stride == 0 {
        return None;
    }
    let mut pieces = Vec::with_capacity(piece_count);
    for i in 0..piece_count {
        let local_start = (i * stride).saturating_sub(if i == 0 { 0 } else { boundary_shift % stride.max(1) });
        let local_end = (local_start + stride + overlap).min(total_len);
        let local_start = local_end.saturating_sub(stride + overlap).min(local_start);
        let piece_seq = region.get(local_start..local_end)?;
        if !passes_quality(piece_seq, config) {
            return None;
        }
        let catalog_id = catalog.intern(piece_seq);
        pieces.push(Fragment {
            id: format!("synthetic-{catalog_id}"),
            kind: FragmentKind::Synthetic {
                catalog_id: Some(catalog_id),
                whole_plasmid: false,
            },
            source_db: None,
            source_entry_id: None,
            source_url: None,
            seq: piece_seq.to_string(),
            start: region_start + local_start,
            end: region_start + local_end,
            strand: Strand::Forward,
            conflicts: Vec::new(),
            junction: JunctionContract::from_config(config),
            source_unit_cost: 0.0,
        });
    }
    Some(pieces)
}

/// Splices a real synthetic bridge fragment into `fragments` wherever the
/// search's cost-only model (`search::bridge_cost`) priced a synthesis
/// bridge rather than a natural overlap or an embeddable primer tail
/// (spec.md §4.7: "insert a synthetic fragment wherever the search chose a
/// synthesis bridge"). Walks every consecutive pair in assembly order,
/// including the closing pair back to the first fragment, since the search
/// now allows that junction to close via a bridge too (C4/C5).
///
/// `fragments` must already be the search's chosen anchor chain, still in
/// the doubled-target coordinate space the search produced them in.
pub fn materialize_bridges(
    fragments: &[Fragment],
    target: &str,
    target_len: usize,
    catalog: &mut SynthesisCatalog,
    config: &Config,
) -> Result<Vec<Fragment>> {
    let count = fragments.len();
    let mut out = Vec::with_capacity(count + 1);
    for (i, fragment) in fragments.iter().enumerate() {
        out.push(fragment.clone());

        let closing = i + 1 == count;
        let next = if closing { &fragments[0] } else { &fragments[i + 1] };
        let shift = if closing { target_len } else { 0 };
        let shifted_next = Fragment {
            start: next.start + shift,
            end: next.end + shift,
            ..next.clone()
        };

        if fragment.junction_with(&shifted_next, config) > 0 {
            continue; // natural overlap, nothing to bridge
        }
        // Same gap value search priced the edge with, not the raw physical
        // distance: a zero-overlap touch still needs min-junction-length of
        // forged homology (see Fragment::distance_to), so it must classify
        // identically here or the inserted fragments would stop matching
        // what the search already paid for.
        let gap = fragment.distance_to(&shifted_next, config);
        if gap <= 0 {
            continue; // excess overlap, resolved by trimming at assembly time
        }
        if gap as usize <= config.pcr_primer_max_embed_length {
            continue; // bridged by an embedded primer tail, no new fragment
        }

        let bridges = build_bridge(target, target_len, fragment.end, shifted_next.start, catalog, config)?;
        out.extend(bridges);
    }
    Ok(out)
}
