use crate::core::{CheckStatus, Finding};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingsSummary {
    pub total_checks: u32,
    pub passed: u32,
    pub failed: u32,
    pub warnings: u32,
}

impl FindingsSummary {
    fn record(&mut self, status: CheckStatus) {
        self.total_checks += 1;
        match status {
            CheckStatus::Pass => self.passed += 1,
            CheckStatus::Fail => self.failed += 1,
            CheckStatus::Warning => self.warnings += 1,
        }
    }
}

/// The analyzer output. Exported as-is: `{ "summary": ..., "details": [...] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingsReport {
    pub summary: FindingsSummary,
    pub details: Vec<Finding>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRollup {
    pub category: String,
    pub passed: u32,
    pub failed: u32,
    pub warnings: u32,
}

impl CategoryRollup {
    pub fn total(&self) -> u32 {
        self.passed + self.failed + self.warnings
    }

    pub fn status(&self) -> CheckStatus {
        if self.failed > 0 {
            CheckStatus::Fail
        } else if self.warnings > 0 {
            CheckStatus::Warning
        } else {
            CheckStatus::Pass
        }
    }
}

impl FindingsReport {
    /// Builds the report and its counters in one pass, so every finding is counted
    /// exactly once and nothing is counted without a finding.
    pub fn from_findings(details: Vec<Finding>) -> Self {
        let mut summary = FindingsSummary::default();
        for finding in &details {
            summary.record(finding.status);
        }
        Self { summary, details }
    }

    pub fn overall_status(&self) -> CheckStatus {
        if self.summary.failed > 0 {
            CheckStatus::Fail
        } else if self.summary.warnings > 0 {
            CheckStatus::Warning
        } else {
            CheckStatus::Pass
        }
    }

    /// `PASS`, `PASS WITH WARNINGS` or `FAIL`.
    pub fn overall_label(&self) -> &'static str {
        match self.overall_status() {
            CheckStatus::Pass => "PASS",
            CheckStatus::Warning => "PASS WITH WARNINGS",
            CheckStatus::Fail => "FAIL",
        }
    }

    pub fn has_failures(&self) -> bool {
        self.summary.failed > 0
    }

    /// Per-category counts in first-seen order.
    pub fn by_category(&self) -> Vec<CategoryRollup> {
        let mut out: Vec<CategoryRollup> = Vec::new();
        for finding in &self.details {
            let idx = match out.iter().position(|c| c.category == finding.category) {
                Some(idx) => idx,
                None => {
                    out.push(CategoryRollup {
                        category: finding.category.clone(),
                        passed: 0,
                        failed: 0,
                        warnings: 0,
                    });
                    out.len() - 1
                }
            };
            let rollup = &mut out[idx];
            match finding.status {
                CheckStatus::Pass => rollup.passed += 1,
                CheckStatus::Fail => rollup.failed += 1,
                CheckStatus::Warning => rollup.warnings += 1,
            }
        }
        out
    }

    pub fn findings_in<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Finding> + 'a {
        self.details.iter().filter(move |f| f.category == category)
    }
}
