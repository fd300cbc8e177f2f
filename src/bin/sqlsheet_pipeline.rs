use clap::Parser;
use sqlsheet::cli::{prompt_path, prompt_value};
use sqlsheet::config::Config;
use sqlsheet::pipeline::{Pipeline, PipelinePaths, PipelineProgress, RunStamp, SystemRunner};
use sqlsheet::ui::{progress, CANCELLED_EXIT_CODE};
use sqlsheet::{
    logging, GracefulShutdown, OutputFormatter, OutputMode, PipelineCli, ProgressManager,
    SqlSheetError,
};
use std::process;

fn main() {
    let exit_code = run();
    process::exit(exit_code);
}

fn run() -> i32 {
    let cli = PipelineCli::parse();

    let config = match cli.load_config().and_then(fill_missing_inputs) {
        Ok(config) => config,
        Err(e) => {
            print_startup_error(&e);
            return 1;
        }
    };

    let mode = OutputMode::from(cli.output_format);
    let formatter = OutputFormatter::new(mode, cli.verbosity_level(), cli.quiet);

    let stamp = RunStamp::now();
    if let Some(ref target) = config.pipeline.target_path {
        let log_file = PipelinePaths::new(target, &stamp).log_file(&stamp);
        if let Err(e) = logging::init(cli.verbosity_level(), Some(&log_file)) {
            eprintln!("Failed to set up logging: {:#}", e);
            return 1;
        }
        formatter.debug(&format!("Logging to {}", log_file.display()));
    }

    let (shutdown, runner) = match GracefulShutdown::new()
        .and_then(|shutdown| SystemRunner::new().map(|runner| (shutdown, runner)))
    {
        Ok(pair) => pair,
        Err(e) => {
            formatter.print_user_friendly_error(&e);
            return 1;
        }
    };

    let pipeline = match Pipeline::new(&config.pipeline, &runner, &shutdown, stamp) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            formatter.print_user_friendly_error(&e);
            return 1;
        }
    };

    formatter.start_operation("Running Lakebridge migration pipeline");

    let progress_manager = ProgressManager::new(!cli.quiet && mode == OutputMode::Human);
    let stage_progress = progress_manager.create_stage_progress("Starting", 0);
    let progress_callback = {
        let pb = stage_progress.clone();
        move |update: &PipelineProgress| progress::update_stage_progress(&pb, update)
    };

    let result = pipeline.run(Some(&progress_callback));
    stage_progress.finish_and_clear();
    progress_manager.clear();

    match result {
        Ok(report) => {
            for warning in &report.warnings {
                formatter.warning(warning);
            }
            formatter.print_pipeline_report(&report);
            0
        }
        Err(e) => {
            log::error!("{}", e);
            formatter.print_user_friendly_error(&e);
            match e {
                SqlSheetError::Cancelled => CANCELLED_EXIT_CODE,
                _ => 1,
            }
        }
    }
}

/// Source, target and dialect fall back to terminal prompts.
fn fill_missing_inputs(mut config: Config) -> Result<Config, SqlSheetError> {
    if config.pipeline.source_path.is_none() {
        config.pipeline.source_path = Some(prompt_path("Source SQL folder")?);
    }
    if config.pipeline.target_path.is_none() {
        config.pipeline.target_path = Some(prompt_path("Target folder")?);
    }
    if config
        .pipeline
        .dialect
        .as_deref()
        .map_or(true, |d| d.trim().is_empty())
    {
        config.pipeline.dialect = Some(prompt_value("Source dialect (e.g. teradata, mssql)")?);
    }
    Ok(config)
}

fn print_startup_error(error: &SqlSheetError) {
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}
