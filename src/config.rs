//! Planner configuration and cost tables (C9).
//!
//! Mirrors the teacher's builder-pattern `Config`: a `Default` carrying
//! every numeric knob named in spec.md, a builder for programmatic
//! construction, and a YAML settings overlay that can patch a subset of
//! fields without touching the rest.

use crate::error::{PlannerError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// One tier of a sparse cost table: the cost applying once the smallest
/// covering length key is reached.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CostTier {
    /// If true, `cost` is a flat price regardless of length; if false,
    /// `cost` is a per-bp rate.
    pub fixed: bool,
    pub cost: f64,
}

/// A sparse map from a length threshold to the cost tier that applies for
/// lengths up to (and including) the next threshold. Lookup is
/// "smallest key >= length"; a length beyond every key is
/// `Error::InvalidConfig` (spec.md §9), not a silent astronomical cost.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CostTable(pub BTreeMap<usize, CostTier>);

impl CostTable {
    pub fn new(entries: impl IntoIterator<Item = (usize, CostTier)>) -> Self {
        CostTable(entries.into_iter().collect())
    }

    /// Looks up the price for synthesizing/ordering `length` bp.
    pub fn lookup(&self, length: usize) -> Result<f64> {
        let tier = self
            .0
            .range(length..)
            .next()
            .map(|(_, tier)| *tier)
            .ok_or_else(|| {
                PlannerError::InvalidConfig(format!(
                    "cost table has no entry covering length {length}"
                ))
            })?;
        Ok(if tier.fixed {
            tier.cost
        } else {
            tier.cost * length as f64
        })
    }
}

/// All tunable parameters consumed by C2–C8.
#[derive(Debug, Clone)]
pub struct Config {
    // --- PCR / existing-fragment parameters ---
    /// Shortest hit the canonicalizer will keep (spec.md §4.2 rule 2).
    pub pcr_min_length: usize,
    /// Fixed per-reaction PCR cost.
    pub pcr_rxn_cost: f64,
    /// Fixed per-reaction time-based cost.
    pub pcr_time_cost: f64,
    /// Per-bp primer synthesis cost.
    pub pcr_bp_cost: f64,
    /// Estimated median primer length, used to price carried-over matches
    /// before real primers are designed (spec.md §4.2 rule 4).
    pub pcr_estimated_primer_length: usize,
    /// Buffer (bp) inside a fragment's ends used as the annealing window
    /// (spec.md §4.6 step 1).
    pub pcr_buffer_length: usize,
    /// Maximum 5' embedded-tail length a primer may carry.
    pub pcr_primer_max_embed_length: usize,
    /// Ceiling on the primer oracle's reported pair penalty.
    pub pcr_primer_max_pair_penalty: f64,
    /// Ceiling on an off-target predicted annealing Tm.
    pub pcr_primer_max_ectopic_tm: f64,
    /// Maximum allowed |fwd.tm - rev.tm|; negative disables the check.
    pub pcr_max_fwd_rev_primer_tm_diff: f64,

    // --- Fragment / junction parameters ---
    pub fragments_min_junction_length: usize,
    pub fragments_max_junction_length: usize,
    pub fragments_max_junction_hairpin: f64,
    pub fragments_max_count: usize,

    // --- Synthesis parameters ---
    pub synthetic_min_length: usize,
    pub synthetic_max_length: usize,
    pub synthetic_fragment_factor: f64,
    pub synthesis_cost_table: CostTable,
    pub plasmid_cost_table: CostTable,
    /// GC fraction bounds for a whole synthetic piece.
    pub synthesis_gc_bounds: (f64, f64),
    /// GC fraction bounds for any 50-bp window within a synthetic piece.
    pub synthesis_window_gc_bounds: (f64, f64),
    /// Window size used for the rolling GC quality check.
    pub synthesis_gc_window: usize,
    /// Longest homopolymer run tolerated in a synthetic piece.
    pub synthesis_max_homopolymer: usize,

    // --- Search parameters ---
    pub max_kept_solutions: usize,

    // --- Resource / concurrency parameters ---
    pub num_threads: usize,
    pub external_tool_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            pcr_min_length: 60,
            pcr_rxn_cost: 4.5,
            pcr_time_cost: 1.0,
            pcr_bp_cost: 0.6,
            pcr_estimated_primer_length: 22,
            pcr_buffer_length: 50,
            pcr_primer_max_embed_length: 40,
            pcr_primer_max_pair_penalty: 20.0,
            pcr_primer_max_ectopic_tm: 40.0,
            pcr_max_fwd_rev_primer_tm_diff: 5.0,

            fragments_min_junction_length: 20,
            fragments_max_junction_length: 120,
            fragments_max_junction_hairpin: 47.0,
            fragments_max_count: 6,

            synthetic_min_length: 125,
            synthetic_max_length: 3000,
            synthetic_fragment_factor: 1.0,
            synthesis_cost_table: default_synthesis_cost_table(),
            plasmid_cost_table: default_plasmid_cost_table(),
            synthesis_gc_bounds: (0.25, 0.65),
            synthesis_window_gc_bounds: (0.15, 0.80),
            synthesis_gc_window: 50,
            synthesis_max_homopolymer: 7,

            max_kept_solutions: 5,

            num_threads: num_cpus::get().max(1),
            external_tool_timeout_secs: 30,
        }
    }
}

fn default_synthesis_cost_table() -> CostTable {
    CostTable::new([
        (500, CostTier { fixed: true, cost: 89.0 }),
        (1000, CostTier { fixed: true, cost: 139.0 }),
        (1500, CostTier { fixed: true, cost: 239.0 }),
        (2000, CostTier { fixed: true, cost: 339.0 }),
        (3000, CostTier { fixed: true, cost: 499.0 }),
    ])
}

fn default_plasmid_cost_table() -> CostTable {
    CostTable::new([
        (500, CostTier { fixed: true, cost: 129.0 }),
        (1000, CostTier { fixed: true, cost: 199.0 }),
        (2000, CostTier { fixed: true, cost: 349.0 }),
        (5000, CostTier { fixed: true, cost: 699.0 }),
        (10000, CostTier { fixed: true, cost: 1299.0 }),
    ])
}

impl Config {
    /// Creates a new configuration builder seeded with defaults.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Applies a YAML settings overlay on top of this configuration.
    /// Unknown keys are ignored by `serde` at the overlay layer; only the
    /// fields present in the overlay are patched.
    pub fn apply_overlay(&mut self, yaml: &str) -> Result<()> {
        let overlay: ConfigOverlay = serde_yaml::from_str(yaml)?;
        overlay.patch(self);
        Ok(())
    }

    /// Loads defaults and patches them from a YAML file on disk, if given.
    pub fn load(overlay_path: Option<&Path>) -> Result<Self> {
        let mut config = Config::default();
        if let Some(path) = overlay_path {
            let text = std::fs::read_to_string(path)?;
            config.apply_overlay(&text)?;
        }
        Ok(config)
    }
}

/// Builder mirroring the teacher's `ConfigBuilder` for programmatic use
/// (tests, library embedding) where a YAML overlay would be overkill.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn pcr_min_length(mut self, v: usize) -> Self {
        self.config.pcr_min_length = v;
        self
    }
    pub fn fragments_max_count(mut self, v: usize) -> Self {
        self.config.fragments_max_count = v;
        self
    }
    pub fn fragments_min_junction_length(mut self, v: usize) -> Self {
        self.config.fragments_min_junction_length = v;
        self
    }
    pub fn fragments_max_junction_length(mut self, v: usize) -> Self {
        self.config.fragments_max_junction_length = v;
        self
    }
    pub fn synthetic_fragment_factor(mut self, v: f64) -> Self {
        self.config.synthetic_fragment_factor = v;
        self
    }
    pub fn max_kept_solutions(mut self, v: usize) -> Self {
        self.config.max_kept_solutions = v;
        self
    }
    pub fn num_threads(mut self, v: usize) -> Self {
        assert!(v > 0, "num_threads must be positive");
        self.config.num_threads = v;
        self
    }
    pub fn build(self) -> Config {
        self.config
    }
}

/// Deserialization shape for a YAML settings overlay: every field optional
/// so a user can patch only what they care about.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ConfigOverlay {
    pcr_min_length: Option<usize>,
    pcr_rxn_cost: Option<f64>,
    pcr_time_cost: Option<f64>,
    pcr_bp_cost: Option<f64>,
    pcr_buffer_length: Option<usize>,
    pcr_primer_max_embed_length: Option<usize>,
    pcr_primer_max_pair_penalty: Option<f64>,
    pcr_primer_max_ectopic_tm: Option<f64>,
    pcr_max_fwd_rev_primer_tm_diff: Option<f64>,
    fragments_min_junction_length: Option<usize>,
    fragments_max_junction_length: Option<usize>,
    fragments_max_junction_hairpin: Option<f64>,
    fragments_max_count: Option<usize>,
    synthetic_min_length: Option<usize>,
    synthetic_max_length: Option<usize>,
    synthetic_fragment_factor: Option<f64>,
    max_kept_solutions: Option<usize>,
    num_threads: Option<usize>,
    external_tool_timeout_secs: Option<u64>,
}

impl ConfigOverlay {
    fn patch(self, config: &mut Config) {
        macro_rules! patch {
            ($field:ident) => {
                if let Some(v) = self.$field {
                    config.$field = v;
                }
            };
        }
        patch!(pcr_min_length);
        patch!(pcr_rxn_cost);
        patch!(pcr_time_cost);
        patch!(pcr_bp_cost);
        patch!(pcr_buffer_length);
        patch!(pcr_primer_max_embed_length);
        patch!(pcr_primer_max_pair_penalty);
        patch!(pcr_primer_max_ectopic_tm);
        patch!(pcr_max_fwd_rev_primer_tm_diff);
        patch!(fragments_min_junction_length);
        patch!(fragments_max_junction_length);
        patch!(fragments_max_junction_hairpin);
        patch!(fragments_max_count);
        patch!(synthetic_min_length);
        patch!(synthetic_max_length);
        patch!(synthetic_fragment_factor);
        patch!(max_kept_solutions);
        patch!(num_threads);
        patch!(external_tool_timeout_secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_table_smallest_key_geq_length() {
        let table = default_synthesis_cost_table();
        assert_eq!(table.lookup(120).unwrap(), 89.0);
        assert_eq!(table.lookup(500).unwrap(), 89.0);
        assert_eq!(table.lookup(501).unwrap(), 139.0);
    }

    #[test]
    fn cost_table_missing_coverage_is_invalid_config() {
        let table = default_synthesis_cost_table();
        let err = table.lookup(1_000_000).unwrap_err();
        assert!(matches!(err, PlannerError::InvalidConfig(_)));
    }

    #[test]
    fn overlay_patches_only_named_fields() {
        let mut config = Config::default();
        let original_rxn_cost = config.pcr_rxn_cost;
        config
            .apply_overlay("fragments-max-count: 10\n")
            .unwrap();
        assert_eq!(config.fragments_max_count, 10);
        assert_eq!(config.pcr_rxn_cost, original_rxn_cost);
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = Config::builder().fragments_max_count(3).build();
        assert_eq!(config.fragments_max_count, 3);
    }
}
