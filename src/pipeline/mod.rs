pub mod command;
pub mod lakebridge;
pub mod postprocess;
pub mod runner;
pub mod summary;

pub use command::{CommandOutcome, CommandRunner, CommandStatus, ExternalCommand, SystemRunner};
pub use lakebridge::Lakebridge;
pub use runner::{
    discover_scripts, Pipeline, PipelinePaths, PipelineProgress, PipelineReport, RunStamp,
    SqlScript,
};
pub use summary::{Stage, StageStatus, SummaryLedger};
