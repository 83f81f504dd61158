//! # gibson-planner
//!
//! Plans a Gibson Assembly construction of a target plasmid from a library
//! of reusable DNA sequences, combined where necessary with freshly
//! synthesized fragments. Given a circular target sequence, a set of
//! already-indexed sequence databases, and raw hits from an external
//! local-alignment tool, [`plan`] returns the cheapest complete assembly
//! plans: PCR products with designed primer pairs and/or synthetic
//! fragments that, concatenated circularly, reconstitute the target.
//!
//! The crate itself never shells out to search an index, design a primer,
//! or compute a melting temperature — those are external collaborators
//! (see [`oracle`], [`binary_finder`]) invoked as plain subprocesses. A
//! caller (typically the `gibplan` CLI) is responsible for indexing
//! databases, parsing FASTA/GenBank, and wiring the resolved manifest in.

pub mod batch;
pub mod binary_finder;
pub mod config;
pub mod db;
pub mod digest;
pub mod error;
pub mod fragment;
pub mod graph;
pub mod hit;
pub mod matches;
pub mod oracle;
pub mod output;
pub mod plan;
pub mod primer;
pub mod primer_planner;
pub mod scratch;
pub mod search;
pub mod seq;
pub mod synthesis;
pub mod timeout;

pub use config::Config;
pub use error::{PlannerError, Result};
pub use fragment::Fragment;
pub use output::PlanDocument;
pub use plan::Plan;
pub use timeout::CancellationToken;

use fragment::FragmentKind;
use hit::Match;
use log::{info, warn};
use scratch::Scratch;
use std::collections::HashMap;
use synthesis::SynthesisCatalog;

/// Everything [`plan`] needs beyond the target sequence itself: the raw
/// hits already returned by the external search tool, the sources
/// consulted (for off-target screening), and the user's exclusion
/// keywords.
pub struct PlanRequest {
    pub target: String,
    pub raw_matches: Vec<Match>,
    pub off_target_sources: Vec<String>,
    pub exclusion_keywords: Vec<String>,
    /// Per-plasmid procurement cost of each source database, keyed by the
    /// same `source_db` string carried on `Match` (spec.md §6). Databases
    /// absent from this map are treated as free to pull from.
    pub db_costs: HashMap<String, f64>,
}

/// Runs the full pipeline described in spec.md §2: canonicalize matches,
/// build candidate fragments, search for the cheapest complete assemblies,
/// design primers and synthesis for each, and assemble final plans.
///
/// Returns plans in nondecreasing cost order. `NoMatches` is not
/// surfaced as an error — an empty canonicalizer result falls back
/// silently to the whole-plasmid synthesis mock, which the search always
/// considers.
pub fn plan(request: &PlanRequest, config: &Config, cancel: &CancellationToken) -> Result<Vec<Plan>> {
    let target_len = request.target.len();
    if target_len == 0 {
        return Err(PlannerError::InvalidInput("target sequence is empty".to_string()));
    }

    let candidates = matches::canonicalize(
        request.raw_matches.clone(),
        target_len,
        &request.exclusion_keywords,
        &request.db_costs,
        config,
    );
    if candidates.is_empty() {
        warn!("no matches survived canonicalization; relying on whole-plasmid synthesis fallback");
    }

    let assemblies = search::search(&candidates, target_len, config, cancel)?;
    if assemblies.is_empty() {
        return Err(PlannerError::NoPlan);
    }

    let scratch = Scratch::new()?;
    // Bounds the two fork-join batches (primer design, off-target
    // screening) to config.num_threads rather than rayon's process-wide
    // default, per spec.md §5's "bounded pool of parallel workers".
    let pool = batch::build_pool(config.num_threads)
        .map_err(|e| PlannerError::InvalidConfig(format!("failed to build worker pool: {e}")))?;
    let mut plans = Vec::with_capacity(assemblies.len());
    let mut catalog = SynthesisCatalog::new();
    pool.install(|| -> Result<()> {
        for assembly in &assemblies {
            cancel.check()?;
            match realize_assembly(
                assembly,
                &request.target,
                &request.off_target_sources,
                target_len,
                config,
                &scratch,
                &mut catalog,
                cancel,
            ) {
                Ok(p) => plans.push(p),
                Err(e)
                    if matches!(
                        e,
                        PlannerError::PrimerFailure { .. }
                            | PlannerError::SynthesisRejected { .. }
                            | PlannerError::NoPlan
                    ) =>
                {
                    info!("dropping assembly that failed realization: {e}");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    })?;

    if plans.is_empty() {
        return Err(PlannerError::NoPlan);
    }
    plans.sort_by(|a, b| a.cost.partial_cmp(&b.cost).unwrap_or(std::cmp::Ordering::Equal));
    plans.truncate(config.max_kept_solutions);
    Ok(plans)
}

/// Splices real synthetic fragments over every gap the search priced as a
/// synthesis bridge, designs primers for every PCR fragment, and assembles
/// the final plan (C7 + C6 + C8).
///
/// Primer design is independent per fragment (spec.md §5's first
/// embarrassingly-parallel batch), so the PCR fragments of one assembly are
/// designed concurrently via [`batch::run_all`].
fn realize_assembly(
    assembly: &search::Assembly,
    target: &str,
    off_target_sources: &[String],
    target_len: usize,
    config: &Config,
    scratch: &Scratch,
    catalog: &mut SynthesisCatalog,
    cancel: &CancellationToken,
) -> Result<Plan> {
    let mut fragments =
        synthesis::materialize_bridges(&assembly.fragments, target, target_len, catalog, config)?;
    let count = fragments.len();
    let pcr_indices: Vec<usize> = (0..count).filter(|&i| fragments[i].is_pcr()).collect();

    let designed = batch::run_all(&pcr_indices, cancel, |&i| {
        let prev = if i == 0 { None } else { Some(fragments[i - 1].clone()) };
        let next = if i + 1 < count {
            Some(fragments[i + 1].clone())
        } else {
            Some(fragments[0].clone())
        };
        primer_planner::design_for_fragment(
            &fragments[i],
            prev.as_ref(),
            next.as_ref(),
            off_target_sources,
            config,
            scratch,
            cancel,
        )
    });

    for (&i, result) in pcr_indices.iter().zip(designed) {
        let pair = match result {
            Some(r) => r?,
            None => return Err(PlannerError::Cancelled),
        };
        if let FragmentKind::Pcr { primers } = &mut fragments[i].kind {
            *primers = Some(pair);
        }
    }

    let realized = search::Assembly {
        fragments,
        cost: assembly.cost,
        synthesized_bp: assembly.synthesized_bp,
    };
    plan::assemble(&realized, target_len, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hit::Strand;

    fn sample_match(start: usize, end: usize) -> Match {
        Match {
            source_db: "lib".to_string(),
            entry_id: "e1".to_string(),
            full_seq: "A".repeat(end - start),
            start,
            end,
            strand: Strand::Forward,
            percent_identity: 100.0,
            circular: false,
        }
    }

    #[test]
    fn empty_target_is_invalid_input() {
        let config = Config::default();
        let cancel = CancellationToken::new();
        let request = PlanRequest {
            target: String::new(),
            raw_matches: vec![],
            off_target_sources: vec![],
            exclusion_keywords: vec![],
            db_costs: HashMap::new(),
        };
        assert!(matches!(
            plan(&request, &config, &cancel).unwrap_err(),
            PlannerError::InvalidInput(_)
        ));
    }

    #[test]
    fn single_threaded_config_still_produces_a_plan() {
        // Pins that num_threads actually bounds the realization pool
        // rather than being ignored in favor of rayon's process-wide
        // default (spec.md §5).
        let config = Config::builder().num_threads(1).build();
        let cancel = CancellationToken::new();
        let request = PlanRequest {
            target: "A".repeat(120),
            raw_matches: vec![],
            off_target_sources: vec![],
            exclusion_keywords: vec![],
            db_costs: HashMap::new(),
        };
        let plans = plan(&request, &config, &cancel).unwrap();
        assert_eq!(plans.len(), 1);
    }

    #[test]
    fn no_matches_falls_back_to_whole_plasmid_mock() {
        let config = Config::default();
        let cancel = CancellationToken::new();
        let request = PlanRequest {
            target: "A".repeat(120),
            raw_matches: vec![],
            off_target_sources: vec![],
            exclusion_keywords: vec![],
            db_costs: HashMap::new(),
        };
        let plans = plan(&request, &config, &cancel).unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].fragments[0].kind, "synthetic");
    }

    #[test]
    fn cancellation_before_search_short_circuits() {
        let config = Config::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let request = PlanRequest {
            target: "A".repeat(120),
            raw_matches: vec![sample_match(0, 120)],
            off_target_sources: vec![],
            exclusion_keywords: vec![],
            db_costs: HashMap::new(),
        };
        assert!(plan(&request, &config, &cancel).is_err());
    }
}
