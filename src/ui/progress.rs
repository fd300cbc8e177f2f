use crate::extractor::ExtractionProgress;
use crate::pipeline::PipelineProgress;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>4}/{len:4} {prefix} {msg}";

pub struct ProgressManager {
    multi_progress: MultiProgress,
    enabled: bool,
}

impl ProgressManager {
    pub fn new(enabled: bool) -> Self {
        Self {
            multi_progress: MultiProgress::new(),
            enabled,
        }
    }

    fn create_bar(&self, total: u64, prefix: &str) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let pb = self.multi_progress.add(ProgressBar::new(total));
        pb.set_style(
            ProgressStyle::with_template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_prefix(prefix.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    pub fn create_document_progress(&self, total_documents: u64) -> ProgressBar {
        let pb = self.create_bar(total_documents, "workbooks");
        pb.set_message("Reading workbooks...");
        pb
    }

    pub fn create_stage_progress(&self, stage: &str, total_scripts: u64) -> ProgressBar {
        let pb = self.create_bar(total_scripts, "scripts");
        pb.set_message(format!("{}...", stage));
        pb
    }

    pub fn create_spinner(&self, message: &str) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let pb = self.multi_progress.add(ProgressBar::new_spinner());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg} ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        pb.set_message(message.to_string());
        pb
    }

    pub fn suspend<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if self.enabled {
            self.multi_progress.suspend(f)
        } else {
            f()
        }
    }

    pub fn clear(&self) {
        if self.enabled {
            self.multi_progress.clear().ok();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new(true)
    }
}

pub fn update_document_progress(pb: &ProgressBar, progress: &ExtractionProgress) {
    pb.set_position(progress.documents_processed as u64);

    match progress.current_document {
        Some(ref document) if progress.documents_processed < progress.total_documents => {
            pb.set_message(format!(
                "{} done, {} file(s) written",
                document, progress.files_written
            ));
        }
        _ => pb.set_message(format!("{} file(s) written", progress.files_written)),
    }
}

/// Moves `pb` to the stage's position; a new stage resets the bar message.
pub fn update_stage_progress(pb: &ProgressBar, progress: &PipelineProgress) {
    pb.set_length(progress.total as u64);
    pb.set_position(progress.completed as u64);

    match progress.current {
        Some(ref script) => pb.set_message(format!("{} {}", progress.stage, script)),
        None => pb.set_message(format!("{} finished", progress.stage)),
    }
}

pub fn finish_progress_with_summary(pb: &ProgressBar, message: &str, duration: Duration) {
    let final_message = format!("{} (completed in {})", message, format_duration(duration));
    pb.finish_with_message(final_message);
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", duration.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_progress_bars() {
        let manager = ProgressManager::new(false);
        assert!(!manager.is_enabled());

        assert!(manager.create_document_progress(10).is_hidden());
        assert!(manager.create_stage_progress("Analyze", 3).is_hidden());
        assert!(manager.create_spinner("Scanning").is_hidden());
    }

    #[test]
    fn test_document_progress_updates() {
        let manager = ProgressManager::new(false);
        let pb = manager.create_document_progress(2);

        let mut progress = ExtractionProgress::new(2);
        progress.update_document("Sales.xlsx".to_string(), 3);
        update_document_progress(&pb, &progress);

        assert_eq!(pb.position(), 1);
        assert!(pb.message().contains("Sales.xlsx"));
    }

    #[test]
    fn test_stage_progress_updates() {
        let manager = ProgressManager::new(false);
        let pb = manager.create_stage_progress("Transpile", 0);

        update_stage_progress(
            &pb,
            &PipelineProgress {
                stage: "Transpile",
                current: Some("Sales/GetTotals.sql".to_string()),
                completed: 2,
                total: 5,
            },
        );

        assert_eq!(pb.length(), Some(5));
        assert_eq!(pb.position(), 2);
        assert_eq!(pb.message(), "Transpile Sales/GetTotals.sql");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
    }
}
