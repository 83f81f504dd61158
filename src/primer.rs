//! The `Primer`/`PrimerPair` data model (spec.md §3), populated by the
//! external primer oracle and consumed by C6/C8.

use crate::hit::Strand;

/// A single designed oligonucleotide.
///
/// Invariant: the 3' end anneals inside the fragment's template; the 5'
/// end may carry an embedded tail (not part of `annealing_tm`'s basis) up
/// to `pcr-primer-max-embed-length` bp, forging homology with a neighbor.
#[derive(Debug, Clone)]
pub struct Primer {
    /// Full synthesized sequence, including any embedded 5' tail.
    pub sequence: String,
    pub strand: Strand,
    pub annealing_tm: f64,
    pub individual_penalty: f64,
    pub gc_fraction: f64,
    /// Highest predicted Tm at a non-target site found during off-target
    /// screening; `None` until screening has run.
    pub off_target_tm: Option<f64>,
    /// Length of the non-annealing 5' tail embedded to forge homology,
    /// zero for a primer with no embedding.
    pub embed_length: usize,
}

impl Primer {
    pub fn annealing_len(&self) -> usize {
        self.sequence.len().saturating_sub(self.embed_length)
    }
}

/// A forward/reverse pair returned by the primer oracle for one fragment.
#[derive(Debug, Clone)]
pub struct PrimerPair {
    pub fwd: Primer,
    pub rev: Primer,
    pub pair_penalty: f64,
}

impl PrimerPair {
    pub fn fwd_rev_tm_diff(&self) -> f64 {
        (self.fwd.annealing_tm - self.rev.annealing_tm).abs()
    }

    /// Whether this pair satisfies the acceptance gate in spec.md §4.6
    /// step 4. `max_fwd_rev_tm_diff < 0.0` disables that particular check.
    pub fn passes_acceptance(
        &self,
        max_pair_penalty: f64,
        max_ectopic_tm: f64,
        max_fwd_rev_tm_diff: f64,
    ) -> bool {
        if self.pair_penalty > max_pair_penalty {
            return false;
        }
        for primer in [&self.fwd, &self.rev] {
            if let Some(tm) = primer.off_target_tm {
                if tm > max_ectopic_tm {
                    return false;
                }
            }
        }
        if max_fwd_rev_tm_diff >= 0.0 && self.fwd_rev_tm_diff() > max_fwd_rev_tm_diff {
            return false;
        }
        true
    }
}
