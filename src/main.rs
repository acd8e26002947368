use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use clap::Parser;

use salary_panda::cli::{Cli, Commands};
use salary_panda::config::RuntimeConfig;
use salary_panda::data::columns::resolve_salary_column;
use salary_panda::data::filter::FilteredView;
use salary_panda::data::loader::load_file;
use salary_panda::data::model::Dataset;
use salary_panda::data::preview::preview_table;
use salary_panda::data::stats::describe;
use salary_panda::predictor::train_baseline;
use salary_panda::report::export_eda_report;
use salary_panda::report::summary::{write_summary_report, DEFAULT_INPUT, SUMMARY_DIR};

/// Rows printed by the console summary.
const CONSOLE_PREVIEW_ROWS: usize = 5;

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = RuntimeConfig::probe(cli.settings());

    match cli.command {
        None if config.capabilities.interactive => dashboard(config),
        None => {
            log::info!("No display available; running the console summary");
            summary(&config, None)
        }
        Some(Commands::Dashboard) => dashboard(config),
        Some(Commands::Report) => report(&config),
        Some(Commands::Run) => run(&config),
        Some(Commands::Train { json }) => train(&config, json),
        Some(Commands::Summary { input }) => summary(&config, input),
    }
}

fn load_dataset(path: &Path) -> Result<Dataset> {
    let loaded = load_file(path).with_context(|| format!("failed to load {}", path.display()))?;
    Ok(loaded.dataset)
}

#[cfg(feature = "gui")]
fn dashboard(config: RuntimeConfig) -> Result<()> {
    use eframe::egui;
    use salary_panda::app::SalaryPandaApp;
    use salary_panda::state::AppState;

    if !config.capabilities.interactive {
        bail!("no display available; try `salary-panda summary` or `salary-panda report`");
    }

    let mut state = AppState::new(config);
    state.load_active(None);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([700.0, 450.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Salary Panda – EDA Dashboard",
        options,
        Box::new(|cc| {
            // Install image loaders so egui can show the static chart PNGs.
            egui_extras::install_image_loaders(&cc.egui_ctx);
            Ok(Box::new(SalaryPandaApp::new(state)))
        }),
    )
    .map_err(|e| anyhow::anyhow!("dashboard failed: {e}"))
}

#[cfg(not(feature = "gui"))]
fn dashboard(_config: RuntimeConfig) -> Result<()> {
    bail!("built without the `gui` feature; try `salary-panda summary` or `salary-panda report`")
}

fn report(config: &RuntimeConfig) -> Result<()> {
    let dataset = load_dataset(&config.settings.data_path)?;
    let summary = export_eda_report(&dataset, config.output_dir(), &config.raster_backend())
        .context("EDA export failed")?;

    println!(
        "Saved {} chart images to {}",
        summary.images.len(),
        config.output_dir().display()
    );
    match summary.pdf {
        Some(pdf) => println!("EDA report: {} ({} pages)", pdf.display(), summary.pages),
        None => println!("No images found; no PDF written"),
    }
    Ok(())
}

fn run(config: &RuntimeConfig) -> Result<()> {
    let exe = std::env::current_exe().context("cannot locate the salary-panda executable")?;
    let mut cmd = Command::new(exe);
    cmd.arg("--data")
        .arg(&config.settings.data_path)
        .arg("--output-dir")
        .arg(&config.settings.output_dir);
    if let Some(font) = &config.settings.font_path {
        cmd.arg("--font").arg(font);
    }
    cmd.arg("report");

    log::info!("Running {cmd:?}");
    let status = cmd.status().context("failed to start the report subprocess")?;
    if !status.success() {
        bail!("report subprocess failed ({status})");
    }

    println!("EDA report generated. Start the dashboard with: salary-panda dashboard");
    Ok(())
}

fn train(config: &RuntimeConfig, json: bool) -> Result<()> {
    let dataset = load_dataset(&config.settings.data_path)?;
    let Some(salary) = resolve_salary_column(&dataset.column_names()) else {
        println!("No salary column found (expected salary_in_usd or salary); nothing to train.");
        return Ok(());
    };
    let outcome = train_baseline(&dataset, salary);
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{outcome}");
    }
    Ok(())
}

fn prompt_input() -> Result<PathBuf> {
    print!("Enter the path to your CSV file (default: {DEFAULT_INPUT}): ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let line = line.trim();
    Ok(PathBuf::from(if line.is_empty() { DEFAULT_INPUT } else { line }))
}

fn summary(config: &RuntimeConfig, input: Option<PathBuf>) -> Result<()> {
    let path = match input {
        Some(path) => path,
        None => prompt_input()?,
    };
    if !path.is_file() {
        println!("CSV file not found!");
        return Ok(());
    }

    let dataset = load_dataset(&path)?;
    println!("Data Preview:");
    println!("{}", preview_table(&FilteredView::all(&dataset), CONSOLE_PREVIEW_ROWS)?);
    println!("\nSummary Statistics:");
    println!("{}", describe(&dataset));

    let report = write_summary_report(&dataset, Path::new(SUMMARY_DIR), &config.raster_backend())
        .context("summary report failed")?;
    if let Some(plot) = &report.plot {
        println!("Plot saved: {}", plot.display());
    }
    println!("PDF report generated: {}", report.pdf.display());
    Ok(())
}
