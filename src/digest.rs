//! In-silico restriction digestion (C12, spec.md §6): linearizes a backbone
//! with a set of restriction enzymes and concatenates the largest resulting
//! fragment with the insert to build the circular target.
//!
//! Resolves the spec's open question on sequential-vs-simultaneous
//! multi-enzyme digestion: enzymes are applied **sequentially**, in the
//! order supplied, each re-digesting the largest fragment kept from the
//! previous enzyme's cuts (see DESIGN.md).

use crate::error::{PlannerError, Result};
use crate::seq::reverse_complement;

/// A restriction enzyme's recognition site and cut offsets relative to the
/// start of the site match, on the top and bottom strands (spec.md §6:
/// top-strand cut marked `^`, bottom-strand cut `_`).
#[derive(Debug, Clone)]
pub struct Enzyme {
    pub name: String,
    pub recognition_site: String,
    pub top_cut_offset: usize,
    pub bottom_cut_offset: usize,
}

impl Enzyme {
    /// Parses a recognition pattern written with `^`/`_` cut markers, e.g.
    /// `GAATTC^` style input is not how callers construct this; this helper
    /// exists for the database-manifest loader which supplies the two
    /// offsets directly alongside the bare site.
    pub fn new(name: &str, recognition_site: &str, top_cut_offset: usize, bottom_cut_offset: usize) -> Self {
        Enzyme {
            name: name.to_string(),
            recognition_site: recognition_site.to_ascii_uppercase(),
            top_cut_offset,
            bottom_cut_offset,
        }
    }

    /// All top-strand cut positions for this enzyme on `seq`, found on both
    /// strands (reverse-complement matches are mapped back to forward
    /// coordinates).
    fn cut_positions(&self, seq: &str) -> Vec<usize> {
        let upper = seq.to_ascii_uppercase();
        let mut cuts = Vec::new();
        let site_len = self.recognition_site.len();

        let mut start = 0;
        while let Some(offset) = upper[start..].find(&self.recognition_site) {
            let pos = start + offset;
            cuts.push(pos + self.top_cut_offset);
            start = pos + 1;
        }

        let rc_site = reverse_complement(&self.recognition_site);
        if rc_site != self.recognition_site {
            let mut start = 0;
            while let Some(offset) = upper[start..].find(&rc_site) {
                let pos = start + offset;
                let site_end = pos + site_len;
                let cut = site_end.saturating_sub(self.top_cut_offset);
                cuts.push(cut);
                start = pos + 1;
            }
        }

        cuts.sort_unstable();
        cuts.dedup();
        cuts
    }
}

/// Linearizes a circular `backbone` by cutting with every enzyme in
/// `enzymes`, in the order supplied, keeping only the largest resulting
/// fragment to re-digest with the next enzyme. Returns the largest linear
/// fragment surviving the full sequential digestion.
pub fn linearize(backbone: &str, enzymes: &[Enzyme]) -> Result<String> {
    if enzymes.is_empty() {
        return Err(PlannerError::InvalidInput(
            "linearize requires at least one enzyme".to_string(),
        ));
    }

    let mut current = backbone.to_string();
    for enzyme in enzymes {
        let cuts = enzyme.cut_positions(&current);
        if cuts.is_empty() {
            continue;
        }
        current = largest_circular_fragment(&current, &cuts);
    }
    Ok(current)
}

/// Given cut positions on a circular sequence, returns the largest linear
/// fragment between two consecutive cuts (wrapping past the origin for the
/// last-to-first gap).
fn largest_circular_fragment(seq: &str, cuts: &[usize]) -> String {
    let len = seq.len();
    if cuts.len() == 1 {
        let cut = cuts[0] % len;
        let mut out = String::with_capacity(len);
        out.push_str(&seq[cut..]);
        out.push_str(&seq[..cut]);
        return out;
    }

    let mut best_start = cuts[0];
    let mut best_len = 0usize;
    for window in cuts.windows(2) {
        let span = window[1] - window[0];
        if span > best_len {
            best_len = span;
            best_start = window[0];
        }
    }
    // Wrap-around gap from the last cut back to the first.
    let wrap_span = len - cuts[cuts.len() - 1] + cuts[0];
    if wrap_span > best_len {
        best_start = cuts[cuts.len() - 1];
        best_len = wrap_span;
    }

    let start = best_start % len;
    let mut out = String::with_capacity(best_len);
    for i in 0..best_len {
        out.push(seq.as_bytes()[(start + i) % len] as char);
    }
    out
}

/// Concatenates the linearized backbone with the insert to form the new
/// circular target (spec.md §6).
pub fn circularize(insert: &str, linear_backbone: &str) -> String {
    format!("{insert}{linear_backbone}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_cutter_linearizes_at_site() {
        // EcoRI: G^AATTC, blunt-ish single cutter for this test.
        let enzyme = Enzyme::new("EcoRI", "GAATTC", 1, 5);
        let backbone = format!("{}{}", "A".repeat(20), "GAATTC");
        let linear = linearize(&backbone, std::slice::from_ref(&enzyme)).unwrap();
        assert_eq!(linear.len(), backbone.len());
    }

    #[test]
    fn no_recognition_site_keeps_sequence_unchanged() {
        let enzyme = Enzyme::new("EcoRI", "GAATTC", 1, 5);
        let backbone = "A".repeat(30);
        let linear = linearize(&backbone, &[enzyme]).unwrap();
        assert_eq!(linear.len(), backbone.len());
    }

    #[test]
    fn religation_reproduces_original_sequence() {
        let enzyme = Enzyme::new("EcoRI", "GAATTC", 1, 5);
        let backbone = format!("{}{}{}", "A".repeat(15), "GAATTC", "C".repeat(15));
        let linear = linearize(&backbone, std::slice::from_ref(&enzyme)).unwrap();
        // Religating the single linear fragment into a circle and rotating
        // to the same start reproduces the same multiset of bases.
        let mut chars: Vec<char> = linear.chars().collect();
        chars.sort_unstable();
        let mut original_chars: Vec<char> = backbone.chars().collect();
        original_chars.sort_unstable();
        assert_eq!(chars, original_chars);
    }

    #[test]
    fn circularize_concatenates_insert_and_backbone() {
        let result = circularize("INSERT", "BACKBONE");
        assert_eq!(result, "INSERTBACKBONE");
    }

    #[test]
    fn empty_enzyme_list_is_invalid_input() {
        let backbone = "ACGT".to_string();
        assert!(linearize(&backbone, &[]).is_err());
    }
}
