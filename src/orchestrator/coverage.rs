//! Coverage and completeness accounting

use std::collections::HashSet;

use fieldpath::{FlatRow, completeness};
use tracing::{debug, info, warn};

/// Which ids were attempted, which produced rows, and how complete the rows were
#[derive(Debug, Clone, Default)]
pub struct CoverageReport {
    attempted: Vec<u64>,
    seen: HashSet<u64>,
    covered: HashSet<u64>,
    failed: Vec<u64>,
    expected_fields: Option<usize>,
    complete_rows: usize,
    incomplete_rows: usize,
}

impl CoverageReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_attempt(&mut self, nid: u64) {
        if self.seen.insert(nid) {
            self.attempted.push(nid);
        }
    }

    /// An id whose fetch failed and was skipped
    pub fn record_failure(&mut self, nid: u64) {
        self.record_attempt(nid);
        if !self.failed.contains(&nid) {
            self.failed.push(nid);
        }
    }

    /// Account for the rows flattened from one id
    ///
    /// The first non-empty row fixes the expected field count for every row
    /// after it. Incomplete rows are logged, never dropped.
    pub fn record_rows(&mut self, nid: u64, rows: &[FlatRow]) {
        self.record_attempt(nid);
        let Some(first) = rows.first() else {
            return;
        };
        self.covered.insert(nid);

        let expected = *self.expected_fields.get_or_insert_with(|| {
            debug!(fields = first.len(), "Detected field count per row");
            first.len()
        });

        for row in rows {
            let score = completeness(row, expected);
            if score.is_complete() {
                self.complete_rows += 1;
                debug!(
                    nid,
                    present = score.present,
                    expected,
                    "[COMPLETE] NID {}: {}/{} fields present",
                    nid,
                    score.present,
                    expected
                );
            } else {
                self.incomplete_rows += 1;
                warn!(
                    nid,
                    present = score.present,
                    expected,
                    missing = score.missing(),
                    "[INCOMPLETE] NID {}: {}/{} fields present, {} missing ({:.1}%)",
                    nid,
                    score.present,
                    expected,
                    score.missing(),
                    score.missing_pct()
                );
            }
        }
    }

    pub fn attempted(&self) -> usize {
        self.attempted.len()
    }

    pub fn covered(&self) -> usize {
        self.covered.len()
    }

    /// `100 * covered / attempted`, 0 when nothing was attempted
    pub fn coverage_pct(&self) -> f64 {
        if self.attempted.is_empty() {
            return 0.0;
        }
        100.0 * self.covered.len() as f64 / self.attempted.len() as f64
    }

    /// Attempted ids without rows, in attempt order
    pub fn missed(&self) -> Vec<u64> {
        self.attempted
            .iter()
            .copied()
            .filter(|nid| !self.covered.contains(nid))
            .collect()
    }

    /// Ids skipped after their fetch failed
    pub fn failed(&self) -> &[u64] {
        &self.failed
    }

    pub fn expected_fields(&self) -> Option<usize> {
        self.expected_fields
    }

    pub fn complete_rows(&self) -> usize {
        self.complete_rows
    }

    pub fn incomplete_rows(&self) -> usize {
        self.incomplete_rows
    }

    pub fn log_summary(&self) {
        let missed = self.missed();
        info!(
            attempted = self.attempted(),
            covered = self.covered(),
            failed = self.failed.len(),
            "NID coverage: {}/{} ({:.1}%) scraped; {} missing: {:?}",
            self.covered(),
            self.attempted(),
            self.coverage_pct(),
            missed.len(),
            missed
        );
    }
}
