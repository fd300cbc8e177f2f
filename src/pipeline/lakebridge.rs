use crate::config::PipelineConfig;
use crate::pipeline::command::ExternalCommand;
use std::path::Path;
use std::time::Duration;

/// Builds the Databricks CLI invocations used by the pipeline.
#[derive(Debug, Clone)]
pub struct Lakebridge {
    cli: String,
    profile: Option<String>,
    debug: bool,
    timeout: Duration,
}

impl Lakebridge {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            cli: config.cli_binary.clone(),
            profile: config.profile.clone().filter(|p| !p.trim().is_empty()),
            debug: config.debug,
            timeout: Duration::from_secs(config.command_timeout),
        }
    }

    pub fn cli(&self) -> &str {
        &self.cli
    }

    fn profile_flags(&self) -> Vec<String> {
        match &self.profile {
            Some(profile) => vec!["-p".to_string(), profile.clone()],
            None => Vec::new(),
        }
    }

    fn global_flags(&self) -> Vec<String> {
        let mut flags = self.profile_flags();
        if self.debug {
            flags.push("--debug".to_string());
        }
        flags
    }

    pub fn analyze(&self, source_dir: &Path, report_file: &Path, dialect: &str) -> ExternalCommand {
        ExternalCommand::new(self.cli.as_str(), self.timeout)
            .titled("Lakebridge Analyze")
            .args(["labs", "lakebridge", "analyze", "--source-directory"])
            .arg_path(source_dir)
            .arg("--report-file")
            .arg_path(report_file)
            .arg("--source-tech")
            .arg(dialect)
            .args(self.global_flags())
    }

    pub fn transpile(&self, input: &Path, dialect: &str, output_folder: &Path) -> ExternalCommand {
        ExternalCommand::new(self.cli.as_str(), self.timeout)
            .titled("Lakebridge Transpile")
            .args(["labs", "lakebridge", "transpile", "--input-source"])
            .arg_path(input)
            .arg("--source-dialect")
            .arg(dialect.to_lowercase())
            .arg("--output-folder")
            .arg_path(output_folder)
            .args(self.global_flags())
    }

    pub fn import_notebook(&self, notebook: &Path, remote_folder: &str) -> ExternalCommand {
        let file_name = notebook
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let remote_path = format!("{}/{}", remote_folder.trim_end_matches('/'), file_name);

        ExternalCommand::new(self.cli.as_str(), self.timeout)
            .titled("Upload Notebook")
            .args(["workspace", "import", "--file"])
            .arg_path(notebook)
            .arg(remote_path)
            .args(["--language", "PYTHON", "--overwrite"])
            .args(self.profile_flags())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn lakebridge(profile: Option<&str>, debug: bool) -> Lakebridge {
        let config = PipelineConfig {
            profile: profile.map(String::from),
            debug,
            ..PipelineConfig::default()
        };
        Lakebridge::from_config(&config)
    }

    #[test]
    fn test_analyze_command() {
        let command = lakebridge(Some("dev"), true).analyze(
            Path::new("/tmp/src"),
            Path::new("/out/report.xlsx"),
            "Synapse",
        );

        assert_eq!(command.program, "databricks");
        assert_eq!(
            command.args,
            vec![
                "labs",
                "lakebridge",
                "analyze",
                "--source-directory",
                "/tmp/src",
                "--report-file",
                "/out/report.xlsx",
                "--source-tech",
                "Synapse",
                "-p",
                "dev",
                "--debug",
            ]
        );
        assert_eq!(command.timeout, Duration::from_secs(600));
    }

    #[test]
    fn test_transpile_lowercases_dialect() {
        let command = lakebridge(None, false).transpile(
            Path::new("a.sql"),
            "Synapse",
            Path::new("/out/Converted_Code"),
        );

        assert_eq!(
            command.args,
            vec![
                "labs",
                "lakebridge",
                "transpile",
                "--input-source",
                "a.sql",
                "--source-dialect",
                "synapse",
                "--output-folder",
                "/out/Converted_Code",
            ]
        );
    }

    #[test]
    fn test_import_notebook_command() {
        let notebook = PathBuf::from("/out/Databricks_Notebooks/Sales/GetTotals.py");
        let command = lakebridge(Some(" "), true).import_notebook(&notebook, "/Shared/");

        assert_eq!(command.args[0..3], ["workspace", "import", "--file"]);
        assert_eq!(command.args[4], "/Shared/GetTotals.py");
        assert!(command.args.ends_with(&[
            "--language".to_string(),
            "PYTHON".to_string(),
            "--overwrite".to_string()
        ]));
    }
}
