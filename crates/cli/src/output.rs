use crate::error::CliError;
use engine_core::{metrics::MetricsSnapshot, progress::ProgressSender};
use engine_runtime::{
    actor::{
        MailboxStats,
        reporter::{ProgressReporter, spawn_reporter},
    },
    checksum::ChecksumReport,
    driver::DriverReport,
};
use serde::Serialize;
use std::path::Path;
use tokio::task::JoinHandle;

/// The stdout reporter of one command.
pub struct Output {
    progress: ProgressSender,
    handle: JoinHandle<MailboxStats>,
}

impl Output {
    pub fn stdout() -> Self {
        let (progress, handle) = spawn_reporter(ProgressReporter::stdout());
        Self { progress, handle }
    }

    pub fn progress(&self) -> ProgressSender {
        self.progress.clone()
    }

    pub async fn line(&self, text: impl Into<String>) {
        self.progress.line(text).await;
    }

    /// Drops the last sender and waits until every line is written.
    pub async fn finish(self) -> Result<(), CliError> {
        drop(self.progress);
        let stats = self.handle.await?;
        if stats.failed > 0 {
            tracing::warn!(lost = stats.failed, "Some progress lines could not be written");
        }
        Ok(())
    }
}

/// Machine readable outcome of a command, written with `--report`.
#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunSummary {
    Workload {
        command: String,
        jobs: u64,
        elapsed_secs: f64,
        metrics: MetricsSnapshot,
    },
    Checksum {
        ok: u64,
        errors: u64,
        lines: Vec<String>,
    },
    Created {
        names: Vec<String>,
    },
    Fill {
        collection: String,
        count: u64,
    },
    Deleted {
        databases: Vec<String>,
    },
}

impl RunSummary {
    pub fn workload(command: &str, report: &DriverReport) -> Self {
        RunSummary::Workload {
            command: command.to_string(),
            jobs: report.jobs,
            elapsed_secs: report.elapsed.as_secs_f64(),
            metrics: report.metrics,
        }
    }

    pub fn checksum(report: &ChecksumReport) -> Self {
        RunSummary::Checksum {
            ok: report.ok,
            errors: report.errors,
            lines: report.lines.clone(),
        }
    }
}

fn generate_report_json(summary: &RunSummary) -> Result<String, CliError> {
    let json = serde_json::to_string_pretty(summary)?;
    Ok(json)
}

pub async fn write_report(summary: &RunSummary, path: &Path) -> Result<(), CliError> {
    let report_json = generate_report_json(summary)?;
    tokio::fs::write(path, report_json).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn workload_report_is_written_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let report = DriverReport {
            jobs: 4,
            elapsed: Duration::from_millis(1500),
            metrics: MetricsSnapshot {
                operations: 40,
                documents: 4000,
                ..Default::default()
            },
        };

        write_report(&RunSummary::workload("write edges", &report), &path)
            .await
            .unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["kind"], "workload");
        assert_eq!(json["command"], "write edges");
        assert_eq!(json["elapsed_secs"], 1.5);
        assert_eq!(json["metrics"]["documents"], 4000);
    }

    #[test]
    fn checksum_summary_keeps_lines() {
        let report = ChecksumReport {
            ok: 3,
            errors: 1,
            lines: vec!["ERROR x".into()],
        };
        let json = generate_report_json(&RunSummary::checksum(&report)).unwrap();
        assert!(json.contains(r#""kind": "checksum""#));
        assert!(json.contains(r#""errors": 1"#));
    }
}
