//! The `Match` data model (spec.md §3) and tabular parsing of the external
//! local-alignment tool's output (spec.md §6), adapted from the teacher's
//! `Alignment`/`Alignments` PAF handling.

use crate::error::{PlannerError, Result};

/// Strand of a hit relative to the target's forward sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    fn parse(s: &str) -> Result<Self> {
        match s {
            "+" => Ok(Strand::Forward),
            "-" => Ok(Strand::Reverse),
            other => Err(PlannerError::InvalidInput(format!(
                "unrecognized strand token: {other}"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Strand::Forward => "+",
            Strand::Reverse => "-",
        }
    }
}

/// A local-alignment hit against a circular target (spec.md §3).
///
/// `start`/`end` are expressed on the *doubled* target `[0, 2L)`, matching
/// what the canonicalizer expects as input (it is responsible for putting
/// raw aligner coordinates into this space before constructing a `Match`).
#[derive(Debug, Clone)]
pub struct Match {
    pub source_db: String,
    pub entry_id: String,
    /// Full sequence of the source database entry; used to recover
    /// template bases beyond what the hit itself spans (5'/3' flank
    /// extension for PCR).
    pub full_seq: String,
    pub start: usize,
    pub end: usize,
    pub strand: Strand,
    pub percent_identity: f64,
    /// Whether the source entry is itself annotated as circular.
    pub circular: bool,
}

impl Match {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Whether `description` (entry title/id) matches a user exclusion
    /// keyword, case-insensitively, by substring (spec.md §4.2 rule 2).
    pub fn matches_exclusion(&self, keyword: &str) -> bool {
        let keyword = keyword.to_ascii_lowercase();
        self.entry_id.to_ascii_lowercase().contains(&keyword)
    }
}

/// One row of the external aligner's tabular output (spec.md §6):
/// `(subject_id, subject_length, query_start, query_end, subject_start,
/// subject_end, strand, percent_identity, subject_title)`.
#[derive(Debug, Clone)]
pub struct AlignerHit {
    pub subject_id: String,
    pub subject_length: usize,
    pub query_start: usize,
    pub query_end: usize,
    pub subject_start: usize,
    pub subject_end: usize,
    pub strand: Strand,
    pub percent_identity: f64,
    pub subject_title: String,
}

impl AlignerHit {
    /// Parses one tab-delimited row as emitted by the `seqsearch` external
    /// tool (spec.md §6's nine-field contract).
    pub fn from_row(row: &str) -> Result<Self> {
        let fields: Vec<&str> = row.split('\t').collect();
        if fields.len() < 8 {
            return Err(PlannerError::InvalidInput(format!(
                "aligner row has {} fields, expected at least 8: {row}",
                fields.len()
            )));
        }
        let parse_usize = |s: &str, what: &str| -> Result<usize> {
            s.parse()
                .map_err(|_| PlannerError::InvalidInput(format!("invalid {what}: {s}")))
        };
        let parse_f64 = |s: &str, what: &str| -> Result<f64> {
            s.parse()
                .map_err(|_| PlannerError::InvalidInput(format!("invalid {what}: {s}")))
        };

        Ok(AlignerHit {
            subject_id: fields[0].to_string(),
            subject_length: parse_usize(fields[1], "subject_length")?,
            query_start: parse_usize(fields[2], "query_start")?,
            query_end: parse_usize(fields[3], "query_end")?,
            subject_start: parse_usize(fields[4], "subject_start")?,
            subject_end: parse_usize(fields[5], "subject_end")?,
            strand: Strand::parse(fields[6])?,
            percent_identity: parse_f64(fields[7], "percent_identity")?,
            subject_title: fields.get(8).copied().unwrap_or("").to_string(),
        })
    }

    /// Parses the full tabular output (one row per line, blank lines and
    /// `#`-prefixed comments skipped).
    pub fn parse_table(text: &str) -> Result<Vec<Self>> {
        text.lines()
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(Self::from_row)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_row() {
        let row = "lib_entry1\t1000\t0\t500\t10\t510\t+\t99.2\tsome plasmid backbone";
        let hit = AlignerHit::from_row(row).unwrap();
        assert_eq!(hit.subject_id, "lib_entry1");
        assert_eq!(hit.query_start, 0);
        assert_eq!(hit.query_end, 500);
        assert_eq!(hit.strand, Strand::Forward);
        assert!((hit.percent_identity - 99.2).abs() < 1e-9);
    }

    #[test]
    fn rejects_short_row() {
        let row = "only\tfour\tfields\there";
        assert!(AlignerHit::from_row(row).is_err());
    }

    #[test]
    fn parse_table_skips_blank_and_comment_lines() {
        let text = "# header\nlib\t100\t0\t50\t0\t50\t+\t100.0\ttitle\n\n";
        let hits = AlignerHit::parse_table(text).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn exclusion_keyword_matching_is_case_insensitive_substring() {
        let m = Match {
            source_db: "lib".into(),
            entry_id: "pUC19-AmpR".into(),
            full_seq: String::new(),
            start: 0,
            end: 10,
            strand: Strand::Forward,
            percent_identity: 100.0,
            circular: false,
        };
        assert!(m.matches_exclusion("ampr"));
        assert!(!m.matches_exclusion("kanr"));
    }
}
