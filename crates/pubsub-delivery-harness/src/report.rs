//! Pass/fail reporting per scenario and protocol.

use crate::delivery_set::ChannelMismatch;
use crate::scenario::{ScenarioKind, ScenarioPhase};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

/// How one scenario ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScenarioOutcome {
    Passed {
        /// Mismatches on relaxed channels.
        warnings: Vec<ChannelMismatch>,
    },
    Failed {
        phase: ScenarioPhase,
        reason: String,
        mismatches: Vec<ChannelMismatch>,
    },
    /// Not executed because preflight failed.
    Skipped,
}

/// Result of one scenario under one protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    pub kind: ScenarioKind,
    pub name: String,
    pub protocol: String,
    pub outcome: ScenarioOutcome,
}

impl ScenarioReport {
    pub fn label(&self) -> String {
        format!("{}_{}", self.name, self.protocol)
    }

    pub fn passed(&self) -> bool {
        matches!(self.outcome, ScenarioOutcome::Passed { .. })
    }
}

/// Whole-run report.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub scenarios: Vec<ScenarioReport>,
    /// Reason the run stopped early, if it did.
    pub aborted: Option<String>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            scenarios: Vec::new(),
            aborted: None,
        }
    }

    pub fn push(&mut self, report: ScenarioReport) {
        self.scenarios.push(report);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn passed_count(&self) -> usize {
        self.scenarios.iter().filter(|s| s.passed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.scenarios
            .iter()
            .filter(|s| matches!(s.outcome, ScenarioOutcome::Failed { .. }))
            .count()
    }

    /// True when nothing failed and the run was not aborted.
    pub fn all_passed(&self) -> bool {
        self.aborted.is_none() && self.failed_count() == 0
    }

    /// One `PASS`/`FAIL`/`SKIP` line per scenario.
    pub fn summary_lines(&self) -> Vec<String> {
        self.scenarios
            .iter()
            .map(|s| match &s.outcome {
                ScenarioOutcome::Passed { warnings } if warnings.is_empty() => {
                    format!("PASS {}", s.label())
                }
                ScenarioOutcome::Passed { warnings } => {
                    format!("PASS {} ({} relaxed channel warning(s))", s.label(), warnings.len())
                }
                ScenarioOutcome::Failed { phase, reason, .. } => {
                    format!("FAIL {} [{}] {}", s.label(), phase, reason)
                }
                ScenarioOutcome::Skipped => format!("SKIP {}", s.label()),
            })
            .collect()
    }

    pub fn write_json(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, content)
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}
