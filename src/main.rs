use clap::Parser;
use sqlsheet::cli::prompt_path;
use sqlsheet::ui::CANCELLED_EXIT_CODE;
use sqlsheet::{
    logging, ExtractCli, OutputFormatter, OutputMode, SqlSheet, SqlSheetError, UserFriendlyError,
};
use std::process;

fn main() {
    let exit_code = run();
    process::exit(exit_code);
}

fn run() -> i32 {
    let cli = ExtractCli::parse();

    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    let mut config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            print_startup_error(&e);
            return 1;
        }
    };

    if config.output.input_folder.is_none() {
        match prompt_path("Folder containing the Excel files") {
            Ok(path) => config.output.input_folder = Some(path),
            Err(e) => {
                print_startup_error(&e);
                return 1;
            }
        }
    }
    if config.output.output_folder.is_none() && !cli.dry_run {
        match prompt_path("Folder to write the .sql files to") {
            Ok(path) => config.output.output_folder = Some(path),
            Err(e) => {
                print_startup_error(&e);
                return 1;
            }
        }
    }
    if config.output.output_folder.is_none() {
        config.output.output_folder = config.output.input_folder.clone();
    }

    if let Err(e) = logging::init(cli.verbosity_level(), cli.log_file.as_deref()) {
        eprintln!("Failed to set up logging: {:#}", e);
        return 1;
    }

    let sqlsheet = match SqlSheet::new(
        config,
        OutputMode::from(cli.output_format),
        cli.verbosity_level(),
        cli.quiet,
    ) {
        Ok(sqlsheet) => sqlsheet,
        Err(e) => {
            print_startup_error(&e);
            return 1;
        }
    };

    let result = if cli.dry_run {
        sqlsheet.dry_run()
    } else {
        sqlsheet.extract()
    };

    match result {
        Ok(report) => {
            log::info!(
                "Run finished: {} file(s) written, {} workbook(s) skipped, {} failed",
                report.summary.files_written,
                report.summary.documents_skipped,
                report.summary.documents_failed
            );
            sqlsheet.output_formatter().print_extraction_report(&report);
            0
        }
        Err(e) => {
            log::error!("{}", e);
            sqlsheet.handle_error(&e);
            match e {
                SqlSheetError::Cancelled => CANCELLED_EXIT_CODE,
                _ => 1,
            }
        }
    }
}

fn handle_generate_config(cli: &ExtractCli) -> i32 {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(sqlsheet::default_config_path);

    match SqlSheet::generate_sample_config(&config_path) {
        Ok(()) => {
            println!(
                "Generated sample configuration file: {}",
                config_path.display()
            );
            println!("\nTo use this configuration:");
            println!(
                "  sqlsheet <input> <output> --config {}",
                config_path.display()
            );
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn print_startup_error(error: &SqlSheetError) {
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}
