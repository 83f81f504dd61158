//! Match ingestion and canonicalization (C2): turns raw aligner hits into a
//! clean, non-redundant set of `Fragment`s with coordinates on the doubled
//! target. Adapted from the teacher's plane-sweep dedup pass
//! (`plane_sweep.rs`), replacing per-query overlap filtering with the
//! origin-split/dedup/carry-over rules of spec.md §4.2.

use crate::config::Config;
use crate::fragment::{Fragment, FragmentKind, JunctionContract};
use crate::hit::{Match, Strand};
use log::{debug, warn};
use std::collections::HashMap;

/// Normalizes, filters, deduplicates, and prices raw matches into existing
/// fragments ready for the assembly graph.
///
/// Returns an empty vec (not an error) when nothing survives — spec.md §7
/// treats that as the `NoMatches` warning, handled by the caller falling
/// back to full synthesis.
pub fn canonicalize(
    raw_matches: Vec<Match>,
    target_len: usize,
    exclusion_keywords: &[String],
    db_costs: &HashMap<String, f64>,
    config: &Config,
) -> Vec<Fragment> {
    let split = split_origin_crossing(raw_matches, target_len);
    let normalized = drop_duplicate_doubled_copies(split, target_len);
    let filtered = filter_matches(normalized, exclusion_keywords, config);
    let deduped = deduplicate(filtered);

    if deduped.is_empty() {
        warn!("canonicalizer found no usable matches; caller should fall back to full synthesis");
    }

    deduped
        .into_iter()
        .enumerate()
        .map(|(i, m)| carry_over(i, m, db_costs, config))
        .collect()
}

/// Rule 1 (spec.md §4.2): a hit with `start > end` wraps around the
/// origin; split it into the two halves that live on `[0, 2L)`, tagged so
/// they can be rejoined later if they come from the same source and are
/// adjacent.
fn split_origin_crossing(matches: Vec<Match>, target_len: usize) -> Vec<Match> {
    let mut out = Vec::with_capacity(matches.len());
    for m in matches {
        if m.start > m.end {
            // Origin-crossing: [start, L) and [L, L+end) on the doubled target.
            let mut head = m.clone();
            head.end = target_len;
            let mut tail = m;
            tail.start = target_len;
            tail.end = target_len + tail.end;
            out.push(head);
            out.push(tail);
        } else {
            out.push(m);
        }
    }
    out
}

/// Rule 1 continued: drop matches fully inside `[L, 2L)` that shadow an
/// earlier copy already present in `[0, L)` from the same source and
/// coordinates shifted by exactly `L` — these arise because the external
/// aligner was run against the doubled target and reports the same hit
/// twice.
fn drop_duplicate_doubled_copies(matches: Vec<Match>, target_len: usize) -> Vec<Match> {
    let mut seen: HashMap<(String, String, usize, usize), ()> = HashMap::new();
    let mut keep = Vec::with_capacity(matches.len());

    // First pass: record every hit whose start lies in [0, L).
    for m in &matches {
        if m.start < target_len {
            seen.insert(
                (
                    m.source_db.clone(),
                    m.entry_id.clone(),
                    m.start,
                    m.end.min(target_len + m.start.min(target_len)),
                ),
                (),
            );
        }
    }

    for m in matches {
        if m.end > target_len && m.start >= target_len {
            let shadow_key = (
                m.source_db.clone(),
                m.entry_id.clone(),
                m.start - target_len,
                m.end - target_len,
            );
            if seen.contains_key(&shadow_key) {
                continue; // duplicate of the earlier copy
            }
        }
        keep.push(m);
    }
    keep
}

/// Rule 2: drop matches shorter than `pcr-min-length`, or whose source id
/// or description contains a user exclusion keyword (case-insensitive
/// substring).
fn filter_matches(matches: Vec<Match>, exclusion_keywords: &[String], config: &Config) -> Vec<Match> {
    matches
        .into_iter()
        .filter(|m| {
            if m.len() < config.pcr_min_length {
                debug!("dropping match {} below pcr-min-length", m.entry_id);
                return false;
            }
            for keyword in exclusion_keywords {
                if m.matches_exclusion(keyword) {
                    debug!("dropping match {} via exclusion keyword {keyword}", m.entry_id);
                    return false;
                }
            }
            true
        })
        .collect()
}

/// Rule 3: among hits with identical `(source_db, entry_id, start, end,
/// strand)`, keep the highest identity; among hits differing only by
/// strand, keep the orientation minimizing required primer embedding
/// (approximated here as the forward orientation, since embedding is a
/// downstream junction computation not yet available at canonicalization
/// time — ties after that preference fall to higher identity).
fn deduplicate(matches: Vec<Match>) -> Vec<Match> {
    let mut exact: HashMap<(String, String, usize, usize, Strand), Match> = HashMap::new();
    for m in matches {
        let key = (m.source_db.clone(), m.entry_id.clone(), m.start, m.end, m.strand);
        exact
            .entry(key)
            .and_modify(|existing| {
                if m.percent_identity > existing.percent_identity {
                    *existing = m.clone();
                }
            })
            .or_insert(m);
    }

    let mut by_region: HashMap<(String, String, usize, usize), Match> = HashMap::new();
    for (_, m) in exact {
        let key = (m.source_db.clone(), m.entry_id.clone(), m.start, m.end);
        by_region
            .entry(key)
            .and_modify(|existing| {
                let prefer_new = match (existing.strand, m.strand) {
                    (Strand::Reverse, Strand::Forward) => true,
                    (Strand::Forward, Strand::Reverse) => false,
                    _ => m.percent_identity > existing.percent_identity,
                };
                if prefer_new {
                    *existing = m.clone();
                }
            })
            .or_insert(m);
    }

    let mut out: Vec<Match> = by_region.into_values().collect();
    // Canonical ordering (spec.md §9): stable downstream tie-breaks need
    // matches sorted by position, then source, so any hash-based
    // collection above is resolved into deterministic order here.
    out.sort_by(|a, b| {
        (a.start, a.end, a.source_db.as_str(), a.entry_id.as_str()).cmp(&(
            b.start,
            b.end,
            b.source_db.as_str(),
            b.entry_id.as_str(),
        ))
    });
    out
}

/// Rule 4: a surviving match becomes an existing fragment priced at the
/// PCR-cost estimate (it will be amplified out of its source), using the
/// configured estimated median primer length until real primers are
/// designed. Its source database's per-plasmid procurement cost (spec.md
/// §6) is carried along so the search prices fragments from a cheaper
/// database lower than an otherwise-identical hit from a pricier one.
fn carry_over(index: usize, m: Match, db_costs: &HashMap<String, f64>, config: &Config) -> Fragment {
    let id = format!("existing-{index}-{}-{}", m.source_db, m.entry_id);
    let source_unit_cost = db_costs.get(&m.source_db).copied().unwrap_or(0.0);
    Fragment {
        id,
        kind: FragmentKind::Pcr { primers: None },
        source_db: Some(m.source_db.clone()),
        source_entry_id: Some(m.entry_id.clone()),
        source_url: None,
        seq: m.full_seq.clone(),
        start: m.start,
        end: m.end,
        strand: m.strand,
        conflicts: Vec::new(),
        junction: JunctionContract::from_config(config),
        source_unit_cost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_match(db: &str, id: &str, start: usize, end: usize, strand: Strand, pid: f64) -> Match {
        Match {
            source_db: db.to_string(),
            entry_id: id.to_string(),
            full_seq: "A".repeat(end.saturating_sub(start).max(1)),
            start,
            end,
            strand,
            percent_identity: pid,
            circular: false,
        }
    }

    #[test]
    fn short_matches_are_filtered() {
        let config = Config::default();
        let matches = vec![sample_match("lib", "e1", 0, 10, Strand::Forward, 100.0)];
        let fragments = canonicalize(matches, 1000, &[], &HashMap::new(), &config);
        assert!(fragments.is_empty());
    }

    #[test]
    fn exclusion_keyword_drops_match() {
        let config = Config::default();
        let matches = vec![sample_match("lib", "kanR-cassette", 0, 500, Strand::Forward, 100.0)];
        let fragments = canonicalize(matches, 1000, &["kanr".to_string()], &HashMap::new(), &config);
        assert!(fragments.is_empty());
    }

    #[test]
    fn identical_region_keeps_highest_identity() {
        let config = Config::default();
        let matches = vec![
            sample_match("lib", "e1", 0, 500, Strand::Forward, 95.0),
            sample_match("lib", "e1", 0, 500, Strand::Forward, 99.5),
        ];
        let fragments = canonicalize(matches, 1000, &[], &HashMap::new(), &config);
        assert_eq!(fragments.len(), 1);
    }

    #[test]
    fn empty_input_yields_empty_output_not_error() {
        let config = Config::default();
        let fragments = canonicalize(Vec::new(), 1000, &[], &HashMap::new(), &config);
        assert!(fragments.is_empty());
    }

    #[test]
    fn origin_crossing_match_is_split_into_two_ranges() {
        let _config = Config::default();
        let matches = vec![sample_match("lib", "e1", 2900, 100, Strand::Forward, 99.0)];
        let split = split_origin_crossing(matches, 3000);
        assert_eq!(split.len(), 2);
        assert_eq!(split[0].start, 2900);
        assert_eq!(split[0].end, 3000);
        assert_eq!(split[1].start, 3000);
        assert_eq!(split[1].end, 3100);
    }

    #[test]
    fn output_is_sorted_by_position_for_determinism() {
        let config = Config::default();
        let matches = vec![
            sample_match("lib", "e2", 600, 1100, Strand::Forward, 99.0),
            sample_match("lib", "e1", 0, 500, Strand::Forward, 99.0),
        ];
        let fragments = canonicalize(matches, 1000, &[], &HashMap::new(), &config);
        assert_eq!(fragments.len(), 2);
        assert!(fragments[0].start < fragments[1].start);
    }
}
