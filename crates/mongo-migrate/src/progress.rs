//! Live progress output and the final reconciliation summary.

use crate::transfer::{CollectionStatus, TransferOutcome};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Overwriting per-collection progress counter.
///
/// Renders `migrated/total` on a single stdout line, rewriting it after
/// every batch. Disabled instances swallow all output, which keeps test
/// runs and piped logs clean.
pub struct ProgressReporter {
    enabled: bool,
    line_open: bool,
}

impl ProgressReporter {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            line_open: false,
        }
    }

    /// Rewrite the counter line with the latest cumulative count.
    pub fn update(&mut self, done: u64, total: u64) {
        if !self.enabled {
            return;
        }
        print!("\r  {}", format_progress(done, total));
        let _ = std::io::stdout().flush();
        self.line_open = true;
    }

    /// Terminate the counter line so following output starts fresh.
    pub fn finish(&mut self) {
        if self.line_open {
            println!();
            self.line_open = false;
        }
    }
}

/// `450/1000` style counter text.
pub fn format_progress(done: u64, total: u64) -> String {
    format!("{}/{}", done, total)
}

/// Aggregate totals across every collection processed in a run.
///
/// Built up by value as outcomes arrive; nothing here is shared state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationSummary {
    /// Collections reported by the source catalog.
    pub collections_found: usize,
    /// Collections whose batches were all attempted.
    pub collections_migrated: usize,
    /// Collections skipped because the source side was empty.
    pub collections_skipped: usize,
    /// Collections stopped by a non-conflict error.
    pub collections_failed: usize,
    /// Source documents across all collections.
    pub documents_total: u64,
    /// Documents written to the destination.
    pub documents_migrated: u64,
    /// Documents already present and left alone.
    pub documents_skipped: u64,
    /// Documents that could not be written.
    pub documents_failed: u64,
}

impl MigrationSummary {
    /// Fold one collection's outcome into the totals.
    pub fn absorb(&mut self, outcome: &TransferOutcome) {
        match outcome.status {
            CollectionStatus::Migrated => self.collections_migrated += 1,
            CollectionStatus::SkippedEmpty => self.collections_skipped += 1,
            CollectionStatus::Failed => self.collections_failed += 1,
        }
        self.documents_total += outcome.total;
        self.documents_migrated += outcome.migrated;
        self.documents_skipped += outcome.skipped;
        self.documents_failed += outcome.failed;
    }

    /// True when every known source document landed in the destination.
    pub fn is_complete(&self) -> bool {
        self.documents_migrated == self.documents_total
    }

    /// Run verdict string: `completed` or `partial`.
    pub fn status(&self) -> &'static str {
        if self.is_complete() {
            "completed"
        } else {
            "partial"
        }
    }

    /// Render the boxed summary table.
    pub fn render(&self) -> String {
        const WIDTH: usize = 46;

        let mut out = String::new();
        let rule = "─".repeat(WIDTH);
        let row = |out: &mut String, label: &str, value: String| {
            out.push_str(&format!("│ {:<32}{:>12} │\n", label, value));
        };

        out.push_str(&format!("┌{}┐\n", rule));
        out.push_str(&format!("│ {:<w$}│\n", "Migration summary", w = WIDTH - 1));
        out.push_str(&format!("├{}┤\n", rule));
        row(&mut out, "Collections found", self.collections_found.to_string());
        row(
            &mut out,
            "Collections migrated",
            self.collections_migrated.to_string(),
        );
        row(
            &mut out,
            "Collections skipped (empty)",
            self.collections_skipped.to_string(),
        );
        row(
            &mut out,
            "Collections failed",
            self.collections_failed.to_string(),
        );
        row(&mut out, "Documents found", self.documents_total.to_string());
        row(
            &mut out,
            "Documents migrated",
            self.documents_migrated.to_string(),
        );
        if self.documents_skipped > 0 {
            row(
                &mut out,
                "Documents skipped",
                self.documents_skipped.to_string(),
            );
        }
        if self.documents_failed > 0 {
            row(
                &mut out,
                "Documents failed",
                self.documents_failed.to_string(),
            );
        }
        out.push_str(&format!("├{}┤\n", rule));
        out.push_str(&format!(
            "│ {:<w$}│\n",
            format!("Status: {}", self.status()),
            w = WIDTH - 1
        ));
        out.push_str(&format!("└{}┘", rule));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status: CollectionStatus, total: u64, migrated: u64) -> TransferOutcome {
        TransferOutcome {
            collection: "x".to_string(),
            total,
            migrated,
            skipped: 0,
            failed: 0,
            errors: Vec::new(),
            status,
        }
    }

    #[test]
    fn counter_format() {
        assert_eq!(format_progress(450, 1000), "450/1000");
        assert_eq!(format_progress(0, 0), "0/0");
    }

    #[test]
    fn absorb_accumulates_by_status() {
        let mut summary = MigrationSummary {
            collections_found: 3,
            ..Default::default()
        };
        summary.absorb(&outcome(CollectionStatus::Migrated, 5, 5));
        summary.absorb(&outcome(CollectionStatus::SkippedEmpty, 0, 0));
        summary.absorb(&outcome(CollectionStatus::Migrated, 250, 250));

        assert_eq!(summary.collections_migrated, 2);
        assert_eq!(summary.collections_skipped, 1);
        assert_eq!(summary.documents_total, 255);
        assert_eq!(summary.documents_migrated, 255);
        assert!(summary.is_complete());
        assert_eq!(summary.status(), "completed");
    }

    #[test]
    fn partial_when_documents_lost() {
        let mut summary = MigrationSummary::default();
        summary.absorb(&outcome(CollectionStatus::Failed, 10, 4));
        assert!(!summary.is_complete());
        assert_eq!(summary.status(), "partial");
    }

    #[test]
    fn render_contains_all_rows() {
        let mut summary = MigrationSummary {
            collections_found: 3,
            ..Default::default()
        };
        summary.absorb(&outcome(CollectionStatus::Migrated, 255, 255));
        let report = summary.render();

        assert!(report.contains("Migration summary"));
        assert!(report.contains("Collections found"));
        assert!(report.contains("255"));
        assert!(report.contains("Status: completed"));
        assert!(report.starts_with('┌'));
        assert!(report.ends_with('┘'));
    }

    #[test]
    fn render_shows_skips_and_failures_when_present() {
        let mut summary = MigrationSummary::default();
        let mut o = outcome(CollectionStatus::Migrated, 10, 8);
        o.skipped = 1;
        o.failed = 1;
        summary.absorb(&o);

        let report = summary.render();
        assert!(report.contains("Documents skipped"));
        assert!(report.contains("Documents failed"));
        assert!(report.contains("Status: partial"));
    }
}
