//! Primer planner (C6): junction/embedding policy around the external
//! primer oracle. The detail-heaviest component after search, grounded on
//! the teacher's `runner.rs` retry-with-adjusted-parameters shape.

use crate::batch;
use crate::config::Config;
use crate::error::{PlannerError, Result};
use crate::fragment::Fragment;
use crate::hit::Strand;
use crate::oracle::{self, PrimerRequest};
use crate::primer::{Primer, PrimerPair};
use crate::scratch::Scratch;
use crate::seq::reverse_complement;
use crate::timeout::CancellationToken;
use std::time::Duration;

/// The annealing window and required embedded tails for one fragment's
/// primer pair (spec.md §4.6 steps 1-2).
struct JunctionPlan {
    window_start: usize,
    window_end: usize,
    fwd_tail: String,
    rev_tail: String,
}

/// Computes the minimal prefix that, prepended to the forward primer's 5'
/// end, forges homology of length `min_junction` with `prev`'s tail, and
/// symmetrically for the reverse primer against `next`'s head. Tail length
/// is capped at `pcr_primer_max_embed_length`; a tail longer than that
/// signals this fragment cannot be realized by PCR alone and must fall
/// back to synthesis (spec.md §4.6 step 5).
fn plan_junction(
    fragment: &Fragment,
    prev: Option<&Fragment>,
    next: Option<&Fragment>,
    config: &Config,
) -> Option<JunctionPlan> {
    let buffer = config.pcr_buffer_length.min(fragment.len() / 2);
    let window_start = fragment.start + buffer;
    let window_end = fragment.end.saturating_sub(buffer);
    if window_start >= window_end {
        return None;
    }

    let fwd_tail = match prev {
        Some(p) => {
            let overlap = p.junction_with(fragment, config);
            let needed = config.fragments_min_junction_length.saturating_sub(overlap);
            if needed > config.pcr_primer_max_embed_length {
                return None;
            }
            if needed == 0 {
                String::new()
            } else {
                let tail_end = p.end.min(p.start + p.len());
                let tail_start = tail_end.saturating_sub(needed);
                p.seq
                    .get(tail_start.saturating_sub(p.start)..tail_end.saturating_sub(p.start))
                    .unwrap_or("")
                    .to_string()
            }
        }
        None => String::new(),
    };

    let rev_tail = match next {
        Some(n) => {
            let overlap = fragment.junction_with(n, config);
            let needed = config.fragments_min_junction_length.saturating_sub(overlap);
            if needed > config.pcr_primer_max_embed_length {
                return None;
            }
            if needed == 0 {
                String::new()
            } else {
                let head = n
                    .seq
                    .get(0..needed.min(n.seq.len()))
                    .unwrap_or("")
                    .to_string();
                reverse_complement(&head)
            }
        }
        None => String::new(),
    };

    Some(JunctionPlan {
        window_start,
        window_end,
        fwd_tail,
        rev_tail,
    })
}

/// Designs and validates a primer pair for `fragment`, retrying with a
/// shifted annealing window up to `pcr_buffer_length` bp before giving up
/// (spec.md §4.6 step 5).
pub fn design_for_fragment(
    fragment: &Fragment,
    prev: Option<&Fragment>,
    next: Option<&Fragment>,
    off_target_sources: &[String],
    config: &Config,
    scratch: &Scratch,
    cancel: &CancellationToken,
) -> Result<PrimerPair> {
    let timeout = Duration::from_secs(config.external_tool_timeout_secs);
    let junction = plan_junction(fragment, prev, next, config).ok_or_else(|| {
        PlannerError::PrimerFailure {
            fragment_id: fragment.id.clone(),
            detail: "required embedded tail exceeds pcr-primer-max-embed-length".to_string(),
        }
    })?;

    let max_shift = config.pcr_buffer_length;
    for shift in 0..=max_shift {
        for sign in [1i64, -1i64] {
            if shift == 0 && sign == -1 {
                continue; // shift 0 tried once
            }
            let delta = sign * shift as i64;
            let start = (junction.window_start as i64 + delta).max(fragment.start as i64) as usize;
            let end = (junction.window_end as i64 + delta).min(fragment.end as i64) as usize;
            if start >= end {
                continue;
            }

            let template = fragment
                .seq
                .get(start.saturating_sub(fragment.start)..end.saturating_sub(fragment.start))
                .unwrap_or("")
                .to_string();
            if template.is_empty() {
                continue;
            }

            let request = PrimerRequest {
                template: template.clone(),
                target_start: 0,
                target_len: template.len(),
                min_primer_len: 18,
                opt_primer_len: 22,
                max_primer_len: 30,
                min_tm: 55.0,
                opt_tm: 60.0,
                max_tm: 65.0,
                max_pair_penalty: config.pcr_primer_max_pair_penalty,
                fwd_overhang: junction.fwd_tail.clone(),
                rev_overhang: junction.rev_tail.clone(),
            };

            let tag = format!("{}-{shift}-{sign}", fragment.id);
            let pairs = match oracle::design_primers(&request, scratch, &tag, timeout) {
                Ok(p) => p,
                Err(_) => continue,
            };

            for (pair_idx, raw) in pairs.iter().enumerate() {
                // The two off-target screens for one pair are independent
                // (spec.md §5's second embarrassingly-parallel batch); run
                // them concurrently rather than one after the other.
                let oligos = [("fwd", &raw.fwd_seq), ("rev", &raw.rev_seq)];
                let screened = batch::run_all(&oligos, cancel, |pair| {
                    let (side, oligo) = *pair;
                    let oligo_tag = format!("{tag}-{pair_idx}-{side}");
                    oracle::off_target_screen(oligo, off_target_sources, scratch, &oligo_tag, timeout)
                        .unwrap_or(None)
                });
                let fwd_off_target = screened[0].flatten();
                let rev_off_target = screened[1].flatten();

                let pair = PrimerPair {
                    fwd: Primer {
                        sequence: format!("{}{}", junction.fwd_tail, raw.fwd_seq),
                        strand: Strand::Forward,
                        annealing_tm: raw.fwd_tm,
                        individual_penalty: raw.fwd_penalty,
                        gc_fraction: crate::seq::gc_fraction(&raw.fwd_seq),
                        off_target_tm: fwd_off_target,
                        embed_length: junction.fwd_tail.len(),
                    },
                    rev: Primer {
                        sequence: format!("{}{}", junction.rev_tail, raw.rev_seq),
                        strand: Strand::Reverse,
                        annealing_tm: raw.rev_tm,
                        individual_penalty: raw.rev_penalty,
                        gc_fraction: crate::seq::gc_fraction(&raw.rev_seq),
                        off_target_tm: rev_off_target,
                        embed_length: junction.rev_tail.len(),
                    },
                    pair_penalty: raw.pair_penalty,
                };

                if pair.passes_acceptance(
                    config.pcr_primer_max_pair_penalty,
                    config.pcr_primer_max_ectopic_tm,
                    config.pcr_max_fwd_rev_primer_tm_diff,
                ) && !junction_hairpin_exceeds(&pair, config, timeout)
                {
                    return Ok(pair);
                }
            }
        }
    }

    Err(PlannerError::PrimerFailure {
        fragment_id: fragment.id.clone(),
        detail: "no primer pair satisfied acceptance gates after window retries".to_string(),
    })
}

/// Whether either primer's predicted hairpin Tm exceeds the junction
/// hairpin ceiling (spec.md §4.6 step 4). A thermo-tool failure is treated
/// as "no hairpin detected" rather than rejecting the pair outright, since
/// the off-target/pair-penalty checks already gate pair quality.
fn junction_hairpin_exceeds(pair: &PrimerPair, config: &Config, timeout: Duration) -> bool {
    for primer in [&pair.fwd, &pair.rev] {
        if let Ok(tm) = oracle::hairpin_tm(&primer.sequence, timeout) {
            if tm > config.fragments_max_junction_hairpin {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::{FragmentKind, JunctionContract};

    fn fragment(id: &str, start: usize, end: usize, seq: &str) -> Fragment {
        Fragment {
            id: id.to_string(),
            kind: FragmentKind::Pcr { primers: None },
            source_db: Some("lib".to_string()),
            source_entry_id: Some(id.to_string()),
            source_url: None,
            seq: seq.to_string(),
            start,
            end,
            strand: Strand::Forward,
            conflicts: Vec::new(),
            junction: JunctionContract { min: 20, max: 120 },
            source_unit_cost: 0.0,
        }
    }

    #[test]
    fn no_neighbors_needs_no_tails() {
        let config = Config::default();
        let seq = "A".repeat(500);
        let f = fragment("f1", 0, 500, &seq);
        let plan = plan_junction(&f, None, None, &config).unwrap();
        assert!(plan.fwd_tail.is_empty());
        assert!(plan.rev_tail.is_empty());
    }

    #[test]
    fn too_short_fragment_has_no_valid_window() {
        let config = Config::default();
        let seq = "A".repeat(10);
        let f = fragment("f1", 0, 10, &seq);
        assert!(plan_junction(&f, None, None, &config).is_none());
    }

    #[test]
    fn sufficient_natural_overlap_needs_no_tail() {
        let config = Config::default();
        let seq_a = "A".repeat(500);
        let seq_b = "T".repeat(500);
        let a = fragment("a", 0, 500, &seq_a);
        let b = fragment("b", 480, 980, &seq_b); // overlap 20 == min
        let plan = plan_junction(&a, None, Some(&b), &config).unwrap();
        assert!(plan.rev_tail.is_empty());
    }
}
