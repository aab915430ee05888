//! Coverage accounting properties

use std::collections::BTreeSet;

use agedcare::orchestrator::CoverageReport;
use fieldpath::FlatRow;
use proptest::prelude::*;
use serde_json::json;

fn one_row(nid: u64) -> Vec<FlatRow> {
    let mut row = FlatRow::new();
    row.insert("nid".to_string(), json!(nid));
    vec![row]
}

proptest! {
    #[test]
    fn coverage_matches_covered_over_attempted(
        ids in prop::collection::btree_set(1u64..100_000, 1..60),
        mask in prop::collection::vec(any::<bool>(), 60),
    ) {
        let mut report = CoverageReport::new();
        let mut covered = BTreeSet::new();
        for (nid, yields) in ids.iter().copied().zip(mask.iter().copied()) {
            report.record_attempt(nid);
            if yields {
                report.record_rows(nid, &one_row(nid));
                covered.insert(nid);
            } else {
                report.record_rows(nid, &[]);
            }
        }

        let n = ids.len() as f64;
        let m = covered.len() as f64;
        prop_assert!((report.coverage_pct() - 100.0 * m / n).abs() < 1e-9);

        let missed: BTreeSet<u64> = report.missed().into_iter().collect();
        let expected: BTreeSet<u64> = ids.difference(&covered).copied().collect();
        prop_assert_eq!(missed, expected);
    }
}
