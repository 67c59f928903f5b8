use crate::{
    client::{Outcome, ReportMode},
    host::Host,
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::io::Write;
use tracing::{info, warn};

/// Line separator of the grade report.
pub const REPORT_EOL: &str = "\r\n";

/// Terminal outcome of one host.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult {
    pub host: Host,
    pub outcome: Outcome,
}

/// What the scheduler yields: exactly one event per scanned host.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    Finished(ScanResult),
    /// The assessment could not be submitted.
    Skipped { host: Host, reason: String },
    /// The assessment was submitted but never produced a usable result.
    Failed { host: Host, reason: String },
}

impl ScanEvent {
    pub fn host(&self) -> &Host {
        match self {
            ScanEvent::Finished(r) => &r.host,
            ScanEvent::Skipped { host, .. } | ScanEvent::Failed { host, .. } => host,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub hosts: usize,
    pub finished: usize,
    pub skipped: usize,
    pub failed: usize,
    pub skipped_hosts: Vec<Host>,
    pub failed_hosts: Vec<Host>,
}

/// Collects scan events into the final report.
///
/// In grade mode lines are held until [`Aggregator::finalize`]; in JSON mode each
/// document is written to `out` as soon as it arrives.
pub struct Aggregator<W: Write> {
    mode: ReportMode,
    out: W,
    grades: Vec<String>,
    summary: RunSummary,
}

impl<W: Write> Aggregator<W> {
    pub fn new(mode: ReportMode, out: W) -> Self {
        Self {
            mode,
            out,
            grades: Vec::new(),
            summary: RunSummary::default(),
        }
    }

    pub fn collect(&mut self, event: &ScanEvent) -> Result<()> {
        self.summary.hosts += 1;
        match event {
            ScanEvent::Finished(result) => {
                self.summary.finished += 1;
                self.collect_outcome(&result.outcome)?;
            }
            ScanEvent::Skipped { host, reason } => {
                warn!("skipping {host}: {reason}");
                self.summary.skipped += 1;
                self.summary.skipped_hosts.push(host.clone());
            }
            ScanEvent::Failed { host, reason } => {
                warn!("no result for {host}: {reason}");
                self.summary.failed += 1;
                self.summary.failed_hosts.push(host.clone());
            }
        }
        Ok(())
    }

    fn collect_outcome(&mut self, outcome: &Outcome) -> Result<()> {
        match (self.mode, outcome) {
            (ReportMode::Json, Outcome::Report(doc)) => {
                writeln!(self.out, "{}", serde_json::to_string_pretty(doc)?)?;
                self.out.flush()?;
            }
            (_, Outcome::Grades(lines)) => {
                for line in lines {
                    info!("{line}");
                }
                self.grades.extend(lines.iter().cloned());
            }
            (ReportMode::Grades, Outcome::Report(_)) => {
                warn!("full report received in grade mode; ignoring");
            }
        }
        Ok(())
    }

    /// Grade lines sorted descending (worst grades first), CRLF-joined.
    pub fn finalize(&self) -> String {
        let mut lines = self.grades.clone();
        lines.sort_unstable_by(|a, b| b.cmp(a));
        lines.join(REPORT_EOL)
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
