use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{Settings, DEFAULT_DATA_PATH, DEFAULT_OUTPUT_DIR};

#[derive(Parser, Debug)]
#[command(
    name = "salary-panda",
    version,
    about = "Salary dataset explorer: dashboard, charts, baseline model and PDF reports"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "SALARY_PANDA_DATA",
        default_value = DEFAULT_DATA_PATH,
        help = "Dataset used when nothing is uploaded (.csv, .json or .parquet)"
    )]
    pub data: PathBuf,
    #[arg(
        long,
        global = true,
        env = "SALARY_PANDA_OUTPUT",
        default_value = DEFAULT_OUTPUT_DIR,
        help = "Directory for EDA chart images and EDA_report.pdf"
    )]
    pub output_dir: PathBuf,
    #[arg(long, global = true, help = "Draw dashboard charts as static images")]
    pub static_charts: bool,
    #[arg(
        long,
        global = true,
        env = "SALARY_PANDA_FONT",
        help = "TrueType font for static chart text"
    )]
    pub font: Option<PathBuf>,
    /// Without a subcommand the dashboard opens when a display is available,
    /// otherwise the console summary runs.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Open the interactive dashboard.
    Dashboard,
    /// Write one chart per column and bundle every PNG into EDA_report.pdf.
    Report,
    /// Generate the EDA report in a subprocess, then explain how to open
    /// the dashboard.
    Run,
    /// Train the baseline regression and print its metrics.
    Train {
        #[arg(long, help = "Output machine-readable JSON")]
        json: bool,
    },
    /// Print a preview and summary statistics and write the salary PDF.
    Summary {
        #[arg(long, help = "CSV to summarise; prompted for when omitted")]
        input: Option<PathBuf>,
    },
}

impl Cli {
    pub fn settings(&self) -> Settings {
        Settings {
            data_path: self.data.clone(),
            output_dir: self.output_dir.clone(),
            font_path: self.font.clone(),
            prefer_static: self.static_charts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "salary-panda",
            "train",
            "--json",
            "--data",
            "x.csv",
            "--static-charts",
        ])
        .unwrap();
        assert_eq!(cli.command, Some(Commands::Train { json: true }));
        let settings = cli.settings();
        assert_eq!(settings.data_path, PathBuf::from("x.csv"));
        assert!(settings.prefer_static);
    }

    #[test]
    fn no_subcommand_is_allowed() {
        let cli = Cli::try_parse_from(["salary-panda", "--output-dir", "out"]).unwrap();
        assert_eq!(cli.command, None);
        assert_eq!(cli.settings().output_dir, PathBuf::from("out"));
    }
}
