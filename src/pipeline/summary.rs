use crate::error::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const SUMMARY_HEADERS: [&str; 4] = [
    "Script Name",
    "Analyzer Status",
    "Transpile Status",
    "Post-process Status",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum StageStatus {
    Success,
    Failed,
    #[default]
    Skipped,
}

impl StageStatus {
    pub fn from_success(success: bool) -> Self {
        if success {
            StageStatus::Success
        } else {
            StageStatus::Failed
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StageStatus::Success => "Success",
            StageStatus::Failed => "Failed",
            StageStatus::Skipped => "Skipped",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScriptStatus {
    pub analyzer: StageStatus,
    pub transpile: StageStatus,
    pub post_process: StageStatus,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stage {
    Analyzer,
    Transpile,
    PostProcess,
}

/// Per-script outcome of every pipeline stage, keyed by script name.
#[derive(Debug, Default, Serialize)]
pub struct SummaryLedger {
    scripts: BTreeMap<String, ScriptStatus>,
}

impl SummaryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<S: Into<String>>(&mut self, script: S) {
        self.scripts.entry(script.into()).or_default();
    }

    pub fn record(&mut self, script: &str, stage: Stage, status: StageStatus) {
        let entry = self.scripts.entry(script.to_string()).or_default();
        match stage {
            Stage::Analyzer => entry.analyzer = status,
            Stage::Transpile => entry.transpile = status,
            Stage::PostProcess => entry.post_process = status,
        }
    }

    pub fn get(&self, script: &str) -> Option<&ScriptStatus> {
        self.scripts.get(script)
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    pub fn count(&self, status: StageStatus) -> usize {
        self.scripts
            .values()
            .map(|s| {
                [s.analyzer, s.transpile, s.post_process]
                    .iter()
                    .filter(|stage| **stage == status)
                    .count()
            })
            .sum()
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);
        csv_writer.write_record(SUMMARY_HEADERS)?;

        for (script, status) in &self.scripts {
            csv_writer.write_record([
                script.clone(),
                status.analyzer.to_string(),
                status.transpile.to_string(),
                status.post_process.to_string(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        self.write_csv(BufWriter::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_defaults_to_skipped() {
        let mut ledger = SummaryLedger::new();
        ledger.register("a.sql");

        let status = ledger.get("a.sql").unwrap();
        assert_eq!(status.analyzer, StageStatus::Skipped);
        assert_eq!(status.post_process, StageStatus::Skipped);
        assert_eq!(ledger.count(StageStatus::Skipped), 3);
    }

    #[test]
    fn test_csv_output() {
        let mut ledger = SummaryLedger::new();
        ledger.register("b.sql");
        ledger.record("Sales/a.sql", Stage::Analyzer, StageStatus::Success);
        ledger.record("Sales/a.sql", Stage::Transpile, StageStatus::from_success(false));
        ledger.record("b.sql", Stage::Transpile, StageStatus::Success);
        ledger.record("b.sql", Stage::PostProcess, StageStatus::Success);

        let mut buffer = Vec::new();
        ledger.write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert_eq!(
            text,
            "Script Name,Analyzer Status,Transpile Status,Post-process Status\n\
             Sales/a.sql,Success,Failed,Skipped\n\
             b.sql,Skipped,Success,Success\n"
        );
        assert_eq!(ledger.len(), 2);
    }
}
