//! The candidate `Fragment` model (C3): PCR/existing/synthetic/linear
//! building blocks with coordinates on the doubled target, a cost model,
//! and the junction-reachability arithmetic consumed by C4/C5.
//!
//! Kinds are a closed tagged variant with per-variant payload (spec.md
//! §9), replacing any class-hierarchy dispatch the source might have used.

use crate::config::Config;
use crate::error::Result;
use crate::hit::Strand;
use crate::primer::PrimerPair;

/// Minimum and maximum homology a fragment must share with each neighbor
/// in a complete plan (spec.md §3).
#[derive(Debug, Clone, Copy)]
pub struct JunctionContract {
    pub min: usize,
    pub max: usize,
}

impl JunctionContract {
    pub fn from_config(config: &Config) -> Self {
        JunctionContract {
            min: config.fragments_min_junction_length,
            max: config.fragments_max_junction_length,
        }
    }
}

/// Discriminated fragment kind, each carrying exactly the data its pricing
/// and realization need.
#[derive(Debug, Clone)]
pub enum FragmentKind {
    /// Procured as-is from a sequence database at a flat unit cost (e.g. a
    /// repository plasmid ordered directly, no PCR).
    Existing { unit_cost: f64 },
    /// Amplified via PCR from a template; `primers` is `None` until C6
    /// successfully designs a pair.
    Pcr { primers: Option<PrimerPair> },
    /// Ordered as de novo synthesis; `catalog_id` ties it back to the
    /// deduplicating synthesis catalog (C7) once assigned. `whole_plasmid`
    /// marks the single-fragment whole-plasmid-synthesis fallback, which
    /// is priced from the plasmid cost table rather than the per-gap
    /// synthesis cost table (spec.md §4.3).
    Synthetic {
        catalog_id: Option<String>,
        whole_plasmid: bool,
    },
    /// The largest fragment surviving in-silico digestion of a backbone,
    /// procured (and priced) the same way as `Existing`.
    LinearBackbone { unit_cost: f64 },
}

/// A candidate building block positioned on the doubled target `[0, 2L)`.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub id: String,
    pub kind: FragmentKind,
    pub source_db: Option<String>,
    pub source_entry_id: Option<String>,
    pub source_url: Option<String>,
    /// Realized sequence: the template (for PCR, before trimming) or the
    /// final sequence (for existing/synthetic/backbone fragments).
    pub seq: String,
    pub start: usize,
    pub end: usize,
    pub strand: Strand,
    /// Other fragment ids that shadow this one (same region, worse cost or
    /// identity) — informational, used by the canonicalizer/search for
    /// tie-break bookkeeping, not for pruning correctness.
    pub conflicts: Vec<String>,
    pub junction: JunctionContract,
    /// Per-plasmid procurement cost of the source database this fragment
    /// was matched against, carried over from the manifest (spec.md §6).
    /// Zero for fragments with no database provenance (synthetic,
    /// whole-plasmid, backbone).
    pub source_unit_cost: f64,
}

impl Fragment {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Deterministic function of kind, length, and configuration
    /// (spec.md §4.3).
    pub fn cost(&self, config: &Config) -> Result<f64> {
        match &self.kind {
            FragmentKind::Existing { unit_cost } => Ok(*unit_cost),
            FragmentKind::LinearBackbone { unit_cost } => Ok(*unit_cost),
            FragmentKind::Pcr { primers } => {
                let (fwd_len, rev_len) = match primers {
                    Some(pair) => (pair.fwd.sequence.len(), pair.rev.sequence.len()),
                    None => (
                        config.pcr_estimated_primer_length,
                        config.pcr_estimated_primer_length,
                    ),
                };
                Ok(self.source_unit_cost
                    + config.pcr_rxn_cost
                    + config.pcr_time_cost
                    + (fwd_len + rev_len) as f64 * config.pcr_bp_cost)
            }
            FragmentKind::Synthetic { whole_plasmid, .. } => {
                let base = if *whole_plasmid {
                    config.plasmid_cost_table.lookup(self.len())?
                } else {
                    config.synthesis_cost_table.lookup(self.len())?
                };
                Ok(base * config.synthetic_fragment_factor)
            }
        }
    }

    /// Observed homology length this fragment can realize with `next`, or
    /// zero if `next` does not lie in this fragment's reachable window
    /// (spec.md §4.3, §4.4). Both the minimum and maximum junction lengths
    /// are treated as inclusive boundaries — pinned by the boundary tests
    /// in spec.md §8 ("an overlap of exactly min_junction_length is
    /// accepted").
    pub fn junction_with(&self, next: &Fragment, config: &Config) -> usize {
        if next.start > self.end {
            return 0;
        }
        let overlap = self.end - next.start;
        if overlap >= config.fragments_min_junction_length
            && overlap <= config.fragments_max_junction_length
        {
            overlap
        } else {
            0
        }
    }

    /// Number of target base pairs of new homology that must be forged
    /// between this fragment's end and `next`'s start: zero once natural
    /// overlap already reaches `min_junction_length`; positive when a gap
    /// must be bridged by primer embedding or synthesis; negative when
    /// overlap exceeds `max_junction_length` and must be trimmed (spec.md
    /// §4.3).
    ///
    /// When the two fragments do not positionally overlap at all
    /// (including when they merely touch end-to-end), the required tail
    /// must both span the raw physical gap and additionally forge
    /// `min_junction_length` of shared sequence with `next` — touching
    /// with zero overlap is not itself homology.
    pub fn distance_to(&self, next: &Fragment, config: &Config) -> i64 {
        if next.start >= self.end {
            ((next.start - self.end) + config.fragments_min_junction_length) as i64
        } else {
            let overlap = self.end - next.start;
            if overlap < config.fragments_min_junction_length {
                (config.fragments_min_junction_length - overlap) as i64
            } else if overlap > config.fragments_max_junction_length {
                -((overlap - config.fragments_max_junction_length) as i64)
            } else {
                0
            }
        }
    }

    pub fn is_pcr(&self) -> bool {
        matches!(self.kind, FragmentKind::Pcr { .. })
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self.kind, FragmentKind::Synthetic { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(start: usize, end: usize) -> Fragment {
        Fragment {
            id: format!("f{start}-{end}"),
            kind: FragmentKind::Pcr { primers: None },
            source_db: None,
            source_entry_id: None,
            source_url: None,
            seq: "A".repeat(end - start),
            start,
            end,
            strand: Strand::Forward,
            conflicts: Vec::new(),
            junction: JunctionContract { min: 20, max: 100 },
            source_unit_cost: 0.0,
        }
    }

    #[test]
    fn junction_exactly_min_is_accepted() {
        let config = Config::default();
        let a = fragment(0, 500);
        let b = fragment(480, 900); // overlap = 20 == min default
        assert_eq!(a.junction_with(&b, &config), 20);
    }

    #[test]
    fn junction_one_bp_short_is_rejected() {
        let config = Config::default();
        let a = fragment(0, 500);
        let b = fragment(481, 900); // overlap = 19
        assert_eq!(a.junction_with(&b, &config), 0);
    }

    #[test]
    fn distance_to_positive_gap() {
        // Raw 100bp gap plus the min-junction homology that must also be
        // forged, since the fragments don't touch at all.
        let config = Config::default();
        let a = fragment(0, 500);
        let b = fragment(600, 900);
        assert_eq!(a.distance_to(&b, &config), 100 + config.fragments_min_junction_length as i64);
    }

    #[test]
    fn distance_to_exact_touch_still_needs_junction_homology() {
        // Zero physical gap is not itself homology: touching ends still
        // need min-junction-length of new shared sequence.
        let config = Config::default();
        let a = fragment(0, 500);
        let b = fragment(500, 900);
        assert_eq!(a.distance_to(&b, &config), config.fragments_min_junction_length as i64);
    }

    #[test]
    fn distance_to_excess_overlap_is_negative() {
        let mut config = Config::default();
        config.fragments_max_junction_length = 50;
        let a = fragment(0, 500);
        let b = fragment(400, 900); // overlap = 100 > max 50
        assert_eq!(a.distance_to(&b, &config), -50);
    }

    #[test]
    fn distance_to_sufficient_overlap_is_zero() {
        let config = Config::default();
        let a = fragment(0, 500);
        let b = fragment(450, 900); // overlap = 50, within [20,100]
        assert_eq!(a.distance_to(&b, &config), 0);
    }

    #[test]
    fn pcr_cost_uses_estimated_primer_length_before_design() {
        let config = Config::default();
        let f = fragment(0, 500);
        let cost = f.cost(&config).unwrap();
        let expected = config.pcr_rxn_cost
            + config.pcr_time_cost
            + (2 * config.pcr_estimated_primer_length) as f64 * config.pcr_bp_cost;
        assert!((cost - expected).abs() < 1e-9);
    }

    #[test]
    fn pcr_cost_adds_source_database_procurement_cost() {
        let config = Config::default();
        let mut f = fragment(0, 500);
        f.source_unit_cost = 65.0;
        let cost = f.cost(&config).unwrap();
        let expected = 65.0
            + config.pcr_rxn_cost
            + config.pcr_time_cost
            + (2 * config.pcr_estimated_primer_length) as f64 * config.pcr_bp_cost;
        assert!((cost - expected).abs() < 1e-9);
    }
}
