pub mod naming;
pub mod output_manager;
pub mod sheet_extractor;

pub use naming::{placeholder_name, sanitize_name, NameRegistry};
pub use output_manager::{ExtractionReport, ExtractionSummary, OutputManager};
pub use sheet_extractor::{
    DocumentOutcome, DocumentReport, ExtractionProgress, OutputUnit, SheetToFileExtractor,
    SkipReason, SkippedRow, TablePlan,
};
