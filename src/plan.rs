//! Plan assembler (C8): composes a kept `Assembly`'s fragments into the
//! final circular plan, trimming overlaps and checking the closing
//! junction identically to interior junctions.

use crate::config::Config;
use crate::error::{PlannerError, Result};
use crate::fragment::{Fragment, FragmentKind};
use crate::primer::PrimerPair;
use crate::search::Assembly;

/// One fragment's final, trimmed contribution to a plan (spec.md §4.8, §6).
#[derive(Debug, Clone)]
pub struct PlanFragment {
    pub kind: &'static str,
    pub id: String,
    pub source_url: Option<String>,
    /// Final realized sequence (post-overlap-trim).
    pub seq: String,
    /// PCR template sequence before trimming, only set for PCR fragments.
    pub pcr_seq: Option<String>,
    pub primers: Option<PrimerPair>,
    pub cost: f64,
}

/// A complete circular assembly plan ready for output (C14).
#[derive(Debug, Clone)]
pub struct Plan {
    pub fragments: Vec<PlanFragment>,
    pub count: usize,
    pub cost: f64,
}

fn kind_label(kind: &FragmentKind) -> &'static str {
    match kind {
        FragmentKind::Existing { .. } => "existing",
        FragmentKind::Pcr { .. } => "pcr",
        FragmentKind::Synthetic { .. } => "synthetic",
        FragmentKind::LinearBackbone { .. } => "linear",
    }
}

/// Assembles `assembly`'s (already primer-designed, already-synthesis-
/// expanded) fragments into a final plan, trimming every junction overlap
/// to its realized length and verifying the closing junction (spec.md
/// §4.8). `target_len` is the non-doubled circular target length.
pub fn assemble(assembly: &Assembly, target_len: usize, config: &Config) -> Result<Plan> {
    let fragments = &assembly.fragments;
    if fragments.is_empty() {
        return Err(PlannerError::NoPlan);
    }

    let mut plan_fragments = Vec::with_capacity(fragments.len());
    for (i, fragment) in fragments.iter().enumerate() {
        let next = fragments.get(i + 1).unwrap_or(&fragments[0]);
        let overlap = fragment.junction_with(next, config);
        if i == fragments.len() - 1 {
            verify_closing_junction(fragment, &fragments[0], target_len, config)?;
        } else if overlap == 0 {
            // No natural homology: only tolerable if a synthesis bridge or
            // an embedded primer tail already closed the gap upstream
            // (search::expand, synthesis::materialize_bridges). Anything
            // wider than the embeddable tail means realization skipped a
            // gap it should have bridged.
            let gap = next.start.saturating_sub(fragment.end);
            if gap > config.pcr_primer_max_embed_length {
                return Err(PlannerError::NoPlan);
            }
        }

        let trimmed_end = fragment.len().saturating_sub(overlap_with_predecessor(fragments, i, config));
        let trimmed_seq = fragment
            .seq
            .get(..trimmed_end.min(fragment.seq.len()))
            .unwrap_or(&fragment.seq)
            .to_string();

        let (primers, pcr_seq) = match &fragment.kind {
            FragmentKind::Pcr { primers } => (primers.clone(), Some(fragment.seq.clone())),
            _ => (None, None),
        };

        plan_fragments.push(PlanFragment {
            kind: kind_label(&fragment.kind),
            id: fragment.id.clone(),
            source_url: fragment.source_url.clone(),
            seq: trimmed_seq,
            pcr_seq,
            primers,
            cost: fragment.cost(config)?,
        });
    }

    let total_cost: f64 = plan_fragments.iter().map(|f| f.cost).sum();
    Ok(Plan {
        count: plan_fragments.len(),
        cost: total_cost,
        fragments: plan_fragments,
    })
}

fn overlap_with_predecessor(fragments: &[Fragment], i: usize, config: &Config) -> usize {
    if i == 0 {
        return 0;
    }
    fragments[i - 1].junction_with(&fragments[i], config)
}

/// Verifies the junction closing the circle from `last` back to `first`,
/// one target-length further around the doubled coordinate space, exactly
/// like an interior junction (spec.md §4.8).
fn verify_closing_junction(
    last: &Fragment,
    first: &Fragment,
    target_len: usize,
    config: &Config,
) -> Result<()> {
    if let FragmentKind::Synthetic { whole_plasmid: true, .. } = &last.kind {
        // The whole-plasmid fallback is a single ordered construct, not a
        // ring of junctioned fragments; there is nothing to close.
        return Ok(());
    }
    let shifted_first = Fragment {
        start: first.start + target_len,
        end: first.end + target_len,
        ..first.clone()
    };
    let overlap = last.junction_with(&shifted_first, config);
    if overlap == 0 {
        // Zero overlap is never valid homology, even when the ends touch
        // exactly: real closing bridges are already spliced in by
        // synthesis::materialize_bridges before assemble runs.
        return Err(PlannerError::NoPlan);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::JunctionContract;
    use crate::hit::Strand;

    fn pcr_fragment(id: &str, start: usize, end: usize) -> Fragment {
        Fragment {
            id: id.to_string(),
            kind: FragmentKind::Pcr { primers: None },
            source_db: Some("lib".to_string()),
            source_entry_id: Some(id.to_string()),
            source_url: None,
            seq: "A".repeat(end - start),
            start,
            end,
            strand: Strand::Forward,
            conflicts: Vec::new(),
            junction: JunctionContract { min: 20, max: 120 },
            source_unit_cost: 0.0,
        }
    }

    #[test]
    fn single_fragment_covering_whole_target_assembles() {
        // A lone fragment closing the circle on itself still needs genuine
        // self-overlap of at least min_junction_length; it does not get a
        // free pass just for reaching exactly the target length.
        let config = Config::default();
        let fragment = pcr_fragment("f1", 0, 1000 + config.fragments_min_junction_length);
        let assembly = Assembly {
            fragments: vec![fragment],
            cost: 10.0,
            synthesized_bp: 0,
        };
        let plan = assemble(&assembly, 1000, &config).unwrap();
        assert_eq!(plan.count, 1);
    }

    #[test]
    fn single_fragment_with_no_self_overlap_is_rejected() {
        let config = Config::default();
        let fragment = pcr_fragment("f1", 0, 1000);
        let assembly = Assembly {
            fragments: vec![fragment],
            cost: 10.0,
            synthesized_bp: 0,
        };
        assert!(matches!(
            assemble(&assembly, 1000, &config).unwrap_err(),
            PlannerError::NoPlan
        ));
    }

    #[test]
    fn empty_assembly_is_no_plan() {
        let config = Config::default();
        let assembly = Assembly {
            fragments: vec![],
            cost: 0.0,
            synthesized_bp: 0,
        };
        assert!(matches!(
            assemble(&assembly, 1000, &config).unwrap_err(),
            PlannerError::NoPlan
        ));
    }

    #[test]
    fn two_fragment_plan_reports_total_cost() {
        let config = Config::default();
        let a = pcr_fragment("a", 0, 520);
        let b = pcr_fragment("b", 500, 1020);
        let assembly = Assembly {
            fragments: vec![a, b],
            cost: 20.0,
            synthesized_bp: 0,
        };
        let plan = assemble(&assembly, 1000, &config).unwrap();
        assert_eq!(plan.count, 2);
        assert!(plan.cost > 0.0);
    }
}
