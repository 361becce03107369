pub mod report;

use crate::types::{DisplayAreaSerializationOption, SerializationOptions};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Command-line arguments for pstate
#[derive(Parser, Debug)]
#[command(name = "pstate")]
#[command(about = "DICOM softcopy presentation state inspection tool")]
#[command(version)]
pub struct Cli {
    /// Path to presentation state file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Command-line arguments for pstate-create
#[derive(Parser, Debug)]
#[command(name = "pstate-create")]
#[command(about = "Create softcopy presentation states for a set of DICOM images")]
#[command(version)]
pub struct CreateCli {
    /// Image files, or directories searched for .dcm files
    #[arg(value_name = "INPUT", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Directory the presentation states are written to
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Content label of the created states
    #[arg(short, long)]
    pub label: Option<String>,

    /// How the displayed area is recorded
    #[arg(short, long, default_value = "scale-to-fit")]
    pub mode: DisplayAreaMode,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl CreateCli {
    pub fn serialization_options(&self) -> SerializationOptions {
        let options = SerializationOptions::default().with_display_area_mode(self.mode.into());
        match &self.label {
            Some(label) => options.with_content_label(label.as_str()),
            None => options,
        }
    }
}

/// Initialises env_logger at Info, or Debug when verbose
pub fn setup_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}

/// Output format options
#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    Text,
    /// JSON format
    Json,
}

/// Displayed area size mode
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DisplayAreaMode {
    /// Fit the visible area to the viewport
    ScaleToFit,
    /// Physical size, when pixel spacing is known
    TrueSize,
    /// Current magnification
    Magnify,
}

impl From<DisplayAreaMode> for DisplayAreaSerializationOption {
    fn from(mode: DisplayAreaMode) -> Self {
        match mode {
            DisplayAreaMode::ScaleToFit => DisplayAreaSerializationOption::ScaleToFit,
            DisplayAreaMode::TrueSize => DisplayAreaSerializationOption::TrueSize,
            DisplayAreaMode::Magnify => DisplayAreaSerializationOption::Magnify,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_cli_options() {
        let cli = CreateCli::try_parse_from([
            "pstate-create",
            "a.dcm",
            "images/",
            "--label",
            "review",
            "--mode",
            "true-size",
        ])
        .unwrap();

        assert_eq!(cli.inputs.len(), 2);
        let options = cli.serialization_options();
        assert_eq!(options.content_label, "review");
        assert_eq!(options.display_area_mode, DisplayAreaSerializationOption::TrueSize);
    }

    #[test]
    fn test_create_cli_requires_input() {
        assert!(CreateCli::try_parse_from(["pstate-create"]).is_err());
    }
}
