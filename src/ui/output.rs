use crate::error::{SqlSheetError, UserFriendlyError};
use crate::extractor::{DocumentOutcome, ExtractionReport};
use crate::pipeline::PipelineReport;
use crate::scanner::SourceDocument;
use console::{style, Emoji, Term};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

impl OutputMode {
    pub fn from_string(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputMode::Json,
            "plain" => OutputMode::Plain,
            _ => OutputMode::Human,
        }
    }
}

static CHECKMARK: Emoji = Emoji("✅ ", "✓ ");
static CROSS: Emoji = Emoji("❌ ", "✗ ");
static INFO: Emoji = Emoji("ℹ️  ", "i ");
static WARNING: Emoji = Emoji("⚠️  ", "! ");
static ROCKET: Emoji = Emoji("🚀 ", "> ");
static SPARKLES: Emoji = Emoji("✨ ", "* ");

pub struct OutputFormatter {
    mode: OutputMode,
    use_colors: bool,
    verbose_level: u8,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let use_colors = match mode {
            OutputMode::Human => Term::stdout().features().colors_supported() && !quiet,
            _ => false,
        };

        Self {
            mode,
            use_colors,
            verbose_level: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Success, message),
            OutputMode::Json => self.print_json_message("success", message),
            OutputMode::Plain => println!("SUCCESS: {}", message),
        }
    }

    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Error, message),
            OutputMode::Json => self.print_json_message("error", message),
            OutputMode::Plain => eprintln!("ERROR: {}", message),
        }
    }

    pub fn warning(&self, message: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Warning, message),
                OutputMode::Json => self.print_json_message("warning", message),
                OutputMode::Plain => println!("WARNING: {}", message),
            }
        }
    }

    pub fn info(&self, message: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Info, message),
                OutputMode::Json => self.print_json_message("info", message),
                OutputMode::Plain => println!("INFO: {}", message),
            }
        }
    }

    pub fn debug(&self, message: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        println!("  {}", style(message).dim());
                    } else {
                        println!("  DEBUG: {}", message);
                    }
                }
                OutputMode::Json => self.print_json_message("debug", message),
                OutputMode::Plain => println!("DEBUG: {}", message),
            }
        }
    }

    pub fn start_operation(&self, operation: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        println!("{}{}", ROCKET, style(operation).bold());
                    } else {
                        println!("> {}", operation);
                    }
                }
                OutputMode::Json => self.print_json_message("operation_start", operation),
                OutputMode::Plain => println!("STARTING: {}", operation),
            }
        }
    }

    pub fn print_user_friendly_error(&self, error: &SqlSheetError) {
        self.error(&error.user_message());

        if let Some(suggestion) = error.suggestion() {
            match self.mode {
                OutputMode::Human => {
                    eprintln!();
                    if self.use_colors {
                        eprintln!(
                            "{}{}",
                            INFO,
                            style(format!("Suggestion: {}", suggestion)).cyan()
                        );
                    } else {
                        eprintln!("Suggestion: {}", suggestion);
                    }
                }
                OutputMode::Json => {
                    self.print_json_object(&serde_json::json!({
                        "type": "suggestion",
                        "message": suggestion
                    }));
                }
                OutputMode::Plain => eprintln!("SUGGESTION: {}", suggestion),
            }
        }
    }

    pub fn print_header(&self, title: &str) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                println!();
                if self.use_colors {
                    println!("{} {}", SPARKLES, style(title).bold().cyan());
                } else {
                    println!("=== {} ===", title);
                }
                println!();
            }
            OutputMode::Json => {
                self.print_json_object(&serde_json::json!({
                    "type": "header",
                    "title": title
                }));
            }
            OutputMode::Plain => println!("=== {} ===", title),
        }
    }

    pub fn print_separator(&self) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human if self.use_colors => println!("{}", style("─".repeat(60)).dim()),
            OutputMode::Human | OutputMode::Plain => println!("{}", "-".repeat(60)),
            OutputMode::Json => {}
        }
    }

    /// Documents a dry run would process.
    pub fn print_document_list(&self, documents: &[SourceDocument]) {
        match self.mode {
            OutputMode::Json => {
                let names: Vec<&str> = documents.iter().map(|d| d.file_name.as_str()).collect();
                self.print_json_object(&serde_json::json!({
                    "type": "documents",
                    "documents": names
                }));
            }
            _ => {
                if self.quiet {
                    return;
                }
                for document in documents {
                    println!("  {} ({} bytes)", document.file_name, document.size);
                }
            }
        }
    }

    /// Always printed, even in quiet mode, so completion is reported.
    pub fn print_extraction_report(&self, report: &ExtractionReport) {
        match self.mode {
            OutputMode::Human => self.print_human_report(report),
            OutputMode::Json => {
                let json_output =
                    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string());
                println!("{}", json_output);
            }
            OutputMode::Plain => self.print_plain_report(report),
        }
    }

    pub fn print_pipeline_report(&self, report: &PipelineReport) {
        match self.mode {
            OutputMode::Json => {
                let json_output =
                    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string());
                println!("{}", json_output);
            }
            OutputMode::Human | OutputMode::Plain => {
                if !self.quiet {
                    self.print_separator();
                    println!("  Scripts:           {}", report.scripts);
                    println!("  Notebooks written: {}", report.notebooks_written);
                    if report.uploads_failed > 0 {
                        println!("  Uploads failed:    {}", report.uploads_failed);
                    }
                    println!(
                        "  Time taken:        {}",
                        format_duration(Duration::from_secs_f64(report.elapsed_seconds))
                    );
                    if !report.errors.is_empty() {
                        println!("  Issues encountered:");
                        for error in &report.errors {
                            println!("    - {}", error);
                        }
                    }
                    self.print_separator();
                }
                self.completion_line(&format!(
                    "All tasks completed. Summary CSV saved at {}",
                    report.summary_file.display()
                ));
            }
        }
    }

    fn print_human_report(&self, report: &ExtractionReport) {
        if !self.quiet {
            self.print_header("Extraction Report");

            for document in &report.documents {
                let line = match &document.outcome {
                    DocumentOutcome::Extracted {
                        files,
                        skipped_rows,
                    } => format!(
                        "{}: {} file(s) written, {} row(s) skipped",
                        document.document, files, skipped_rows
                    ),
                    DocumentOutcome::Skipped { reason } => {
                        format!("{}: skipped ({})", document.document, reason)
                    }
                    DocumentOutcome::Failed { error } => {
                        format!("{}: failed ({})", document.document, error)
                    }
                };

                if self.use_colors {
                    let styled = match document.outcome {
                        DocumentOutcome::Extracted { .. } => style(line).green(),
                        DocumentOutcome::Skipped { .. } => style(line).yellow(),
                        DocumentOutcome::Failed { .. } => style(line).red(),
                    };
                    println!("  {}", styled);
                } else {
                    println!("  {}", line);
                }
            }

            let summary = &report.summary;
            println!();
            println!("  Workbooks seen:      {}", summary.documents_seen);
            println!("  Workbooks extracted: {}", summary.documents_extracted);
            println!("  Workbooks skipped:   {}", summary.documents_skipped);
            println!("  Workbooks failed:    {}", summary.documents_failed);
            println!("  Files written:       {}", summary.files_written);
            println!("  Rows skipped:        {}", summary.rows_skipped);
            println!(
                "  Time taken:          {}",
                format_duration(Duration::from_secs_f64(summary.elapsed_seconds))
            );

            if report.has_errors() {
                println!();
                println!("Issues encountered:");
                for error in &report.errors {
                    println!("  - {}", error);
                }
            }
            self.print_separator();
        }

        self.completion_line(&self.completion_message(report));
    }

    fn print_plain_report(&self, report: &ExtractionReport) {
        if !self.quiet {
            for document in &report.documents {
                let status = match &document.outcome {
                    DocumentOutcome::Extracted { files, .. } => format!("EXTRACTED {}", files),
                    DocumentOutcome::Skipped { reason } => format!("SKIPPED {}", reason),
                    DocumentOutcome::Failed { error } => format!("FAILED {}", error),
                };
                println!("{}: {}", document.document, status);
            }
            println!("Files: {}", report.summary.files_written);
            println!("Rows skipped: {}", report.summary.rows_skipped);
            if report.has_errors() {
                println!("Errors: {}", report.errors.len());
            }
        }
        println!("COMPLETED: {}", self.completion_message(report));
    }

    fn completion_message(&self, report: &ExtractionReport) -> String {
        if report.dry_run {
            format!(
                "Dry run complete: {} workbook(s) would be processed into {}",
                report.summary.documents_seen,
                report.output_folder.display()
            )
        } else {
            format!(
                "Extraction complete: {} file(s) written to {}",
                report.summary.files_written,
                report.output_folder.display()
            )
        }
    }

    fn completion_line(&self, message: &str) {
        match self.mode {
            OutputMode::Human if self.use_colors => {
                println!("{}{}", CHECKMARK, style(message).green().bold())
            }
            OutputMode::Human => println!("✓ {}", message),
            OutputMode::Plain => println!("COMPLETED: {}", message),
            OutputMode::Json => self.print_json_message("completed", message),
        }
    }

    fn should_show_message(&self, min_verbose_level: u8) -> bool {
        !self.quiet && self.verbose_level >= min_verbose_level
    }

    fn print_human_message(&self, msg_type: MessageType, message: &str) {
        if self.use_colors {
            let (emoji, styled) = match msg_type {
                MessageType::Success => (CHECKMARK, style(message).green().bold()),
                MessageType::Error => (CROSS, style(message).red().bold()),
                MessageType::Warning => (WARNING, style(message).yellow().bold()),
                MessageType::Info => (INFO, style(message).cyan()),
            };

            match msg_type {
                MessageType::Error => eprintln!("{}{}", emoji, styled),
                _ => println!("{}{}", emoji, styled),
            }
        } else {
            let prefix = match msg_type {
                MessageType::Success => "✓",
                MessageType::Error => "✗",
                MessageType::Warning => "!",
                MessageType::Info => "i",
            };

            match msg_type {
                MessageType::Error => eprintln!("{} {}", prefix, message),
                _ => println!("{} {}", prefix, message),
            }
        }
    }

    fn print_json_message(&self, level: &str, message: &str) {
        self.print_json_object(&serde_json::json!({
            "type": "message",
            "level": level,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn print_json_object(&self, obj: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string(obj).unwrap_or_else(|_| "{}".to_string())
        );
    }
}

#[derive(Debug, Clone, Copy)]
enum MessageType {
    Success,
    Error,
    Warning,
    Info,
}

fn format_duration(duration: Duration) -> String {
    crate::ui::progress::format_duration(duration)
}
