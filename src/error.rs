//! Error types for the Gibson Assembly planner.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PlannerError>;

/// Errors that can occur while planning an assembly.
///
/// Every fatal boundary in the planner surfaces one of these variants; see
/// `spec.md` §7 for the propagation policy. `NoMatches` is constructed but
/// recovered at the call site (falls back to full synthesis) rather than
/// ever reaching the CLI on its own.
#[derive(Error, Debug)]
pub enum PlannerError {
    /// Unparseable target, disallowed character, or contradictory flags.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A required external binary was not found on PATH at startup.
    #[error("external tool missing: {0}")]
    ExternalToolMissing(String),

    /// An external tool (aligner, primer oracle, thermo) exited nonzero.
    #[error("external tool failed: {tool}: {detail}")]
    ExternalToolFailure { tool: String, detail: String },

    /// The canonicalizer returned no matches; caller should fall back to
    /// full synthesis. Not a fatal error by itself.
    #[error("no matches found for target")]
    NoMatches,

    /// Search exhausted all candidates and full synthesis was also
    /// rejected.
    #[error("no viable assembly plan exists for this target")]
    NoPlan,

    /// Primer oracle could not satisfy constraints for a fragment after
    /// retrying with shifted annealing windows.
    #[error("primer design failed for fragment {fragment_id}: {detail}")]
    PrimerFailure { fragment_id: String, detail: String },

    /// Every split of a required synthetic region failed quality checks.
    #[error("synthesis rejected for region [{start}, {end}): {detail}")]
    SynthesisRejected {
        start: usize,
        end: usize,
        detail: String,
    },

    /// The caller requested cancellation.
    #[error("operation cancelled")]
    Cancelled,

    /// A cost-table lookup fell outside the configured coverage, or a
    /// settings overlay was otherwise unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Wrapped I/O failure (scratch files, FASTA/overlay reads).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped UTF-8 decoding failure from an external tool's output.
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Wrapped YAML (settings overlay / database manifest) parse failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Wrapped JSON serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Wrapped CSV writing failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<tempfile::PersistError> for PlannerError {
    fn from(e: tempfile::PersistError) -> Self {
        PlannerError::Io(e.error)
    }
}

impl PlannerError {
    /// True for the one error kind that spec.md §7 treats as a recoverable
    /// warning rather than a hard failure.
    pub fn is_recoverable_no_matches(&self) -> bool {
        matches!(self, PlannerError::NoMatches)
    }
}