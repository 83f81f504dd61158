//! Locates the external tool binaries consumed by the planner (C11).
//!
//! Tools are located once at startup; their absence is fatal immediately
//! (spec.md §7, `Error::ExternalToolMissing`) rather than discovered lazily
//! mid-run.

use crate::error::{PlannerError, Result};
use std::path::PathBuf;

/// The four external collaborators named in spec.md §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExternalTool {
    /// Local-alignment tool (used for both match ingestion and off-target
    /// screening).
    Aligner,
    /// Primer/thermodynamics design oracle.
    PrimerOracle,
    /// Hairpin/dimer Tm calculator.
    Thermo,
    /// Sequence database indexing tool.
    DbBuild,
}

impl ExternalTool {
    /// The binary name searched for on `PATH`. Overridable per-deployment
    /// via the `GIBPLAN_<TOOL>_BIN` environment variables so a settings
    /// overlay need not hardcode a vendor's binary name.
    pub fn binary_name(self) -> &'static str {
        match self {
            ExternalTool::Aligner => "seqsearch",
            ExternalTool::PrimerOracle => "primer-oracle",
            ExternalTool::Thermo => "thermo",
            ExternalTool::DbBuild => "dbbuild",
        }
    }

    fn env_override(self) -> &'static str {
        match self {
            ExternalTool::Aligner => "GIBPLAN_ALIGNER_BIN",
            ExternalTool::PrimerOracle => "GIBPLAN_PRIMER_ORACLE_BIN",
            ExternalTool::Thermo => "GIBPLAN_THERMO_BIN",
            ExternalTool::DbBuild => "GIBPLAN_DBBUILD_BIN",
        }
    }
}

/// Resolved locations of every external tool, built once per invocation.
#[derive(Debug, Clone)]
pub struct Locator {
    pub aligner: PathBuf,
    pub primer_oracle: PathBuf,
    pub thermo: PathBuf,
    pub dbbuild: PathBuf,
}

impl Locator {
    /// Resolves all four tools, failing fast with the name of the first
    /// one missing.
    pub fn resolve() -> Result<Self> {
        Ok(Locator {
            aligner: find_binary(ExternalTool::Aligner)?,
            primer_oracle: find_binary(ExternalTool::PrimerOracle)?,
            thermo: find_binary(ExternalTool::Thermo)?,
            dbbuild: find_binary(ExternalTool::DbBuild)?,
        })
    }

    pub fn path_for(&self, tool: ExternalTool) -> &PathBuf {
        match tool {
            ExternalTool::Aligner => &self.aligner,
            ExternalTool::PrimerOracle => &self.primer_oracle,
            ExternalTool::Thermo => &self.thermo,
            ExternalTool::DbBuild => &self.dbbuild,
        }
    }
}

/// Finds one external tool binary.
///
/// Search order: an explicit `GIBPLAN_*_BIN` environment override, then the
/// directory containing the current executable (supports a self-contained
/// install bundling its collaborators), then the system `PATH`.
pub fn find_binary(tool: ExternalTool) -> Result<PathBuf> {
    let name = tool.binary_name();

    if let Ok(path) = std::env::var(tool.env_override()) {
        let candidate = PathBuf::from(path);
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let candidate = exe_dir.join(name);
            if candidate.exists() {
                return Ok(candidate);
            }
        }
    }

    if let Ok(path) = which::which(name) {
        return Ok(path);
    }

    Err(PlannerError::ExternalToolMissing(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tool_is_external_tool_missing() {
        std::env::remove_var(ExternalTool::Aligner.env_override());
        let err = find_binary(ExternalTool::Aligner).unwrap_err();
        assert!(matches!(err, PlannerError::ExternalToolMissing(_)));
    }

    #[test]
    fn env_override_is_honored() {
        let dir = tempfile::tempdir().unwrap();
        let fake_bin = dir.path().join("seqsearch");
        std::fs::write(&fake_bin, b"#!/bin/sh\n").unwrap();
        std::env::set_var(ExternalTool::Aligner.env_override(), &fake_bin);
        let found = find_binary(ExternalTool::Aligner).unwrap();
        assert_eq!(found, fake_bin);
        std::env::remove_var(ExternalTool::Aligner.env_override());
    }
}
