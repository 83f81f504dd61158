//! The implicit assembly graph over candidate fragments (C4): reachability
//! and closure rules that the search (C5) walks without ever materializing
//! the full edge set.

use crate::config::Config;
use crate::fragment::Fragment;

/// Whether an edge `from -> to` exists in the assembly graph (spec.md §4.4):
/// `B.start > A.start` (monotone progress), `B.start - A.end <=
/// synthetic-max-length` (gap is fillable), and `B.end <= A.start + L` (via
/// `first_start`, since the bound is relative to the assembly's opening
/// fragment, not to `A` itself — completing the circle must not pass the
/// start point twice).
pub fn reachable(
    from: &Fragment,
    to: &Fragment,
    first_start: usize,
    target_len: usize,
    config: &Config,
) -> bool {
    to.start > from.start
        && to.start.saturating_sub(from.end) <= config.synthetic_max_length
        && to.end <= first_start + target_len
}

/// Whether extending the assembly with `last` can close the circle: either
/// `last` already overlaps or reaches past the origin copy of the opening
/// fragment's start, or the remaining gap back to it is small enough to
/// bridge with a synthesis fragment (spec.md §4.4's closing-edge rule,
/// generalized to admit the same gap-filling the search already allows for
/// interior edges — see `synthesis::materialize_bridges`).
pub fn closes_circle(last: &Fragment, first_start: usize, target_len: usize, config: &Config) -> bool {
    let required_end = first_start + target_len;
    if last.end >= required_end {
        return true;
    }
    required_end - last.end <= config.synthetic_max_length
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::{Fragment, FragmentKind, JunctionContract};
    use crate::hit::Strand;

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
            junction: JunctionContract { min: 20, max: 120 },
            source_unit_cost: 0.0,
        }
    }

    #[test]
    fn edge_requires_monotone_start() {
        let config = Config::default();
        let a = fragment(500, 900);
        let b = fragment(400, 800);
        assert!(!reachable(&a, &b, 0, 1000, &config));
    }

    #[test]
    fn edge_rejects_gap_exceeding_synthetic_max_length() {
        let mut config = Config::default();
        config.synthetic_max_length = 100;
        let a = fragment(0, 500);
        let b = fragment(700, 900); // gap = 200 > 100
        assert!(!reachable(&a, &b, 0, 1000, &config));
    }

    #[test]
    fn edge_accepts_within_bounds() {
        let config = Config::default();
        let a = fragment(0, 500);
        let b = fragment(480, 900);
        assert!(reachable(&a, &b, 0, 1000, &config));
    }

    #[test]
    fn closing_edge_detected_past_origin() {
        let config = Config::default();
        let last = fragment(900, 1100); // spans past L=1000
        assert!(closes_circle(&last, 0, 1000, &config));
    }

    #[test]
    fn closing_edge_admits_a_bridgeable_gap() {
        let mut config = Config::default();
        config.synthetic_max_length = 100;
        let last = fragment(900, 950); // 50bp short of the origin, bridgeable
        assert!(closes_circle(&last, 0, 1000, &config));
    }

    #[test]
    fn closing_edge_rejects_a_gap_too_large_to_bridge() {
        let mut config = Config::default();
        config.synthetic_max_length = 20;
        let not_closing = fragment(900, 950); // 50bp short, exceeds the bridge cap
        assert!(!closes_circle(&not_closing, 0, 1000, &config));
    }
}
