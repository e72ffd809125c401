//! Himalayan expeditions dashboard.
//!
//! Usage:
//!   himalaya-dash [--data-dir <dir>] [gui]
//!   himalaya-dash [--data-dir <dir>] report [--peak <id>] [--from <year>] [--to <year>]
//!                 [--season <season>] [--format table|json]

mod app;
mod color;
mod state;
mod ui;

use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use eframe::egui;

use himalaya_dash::data::loader::DEFAULT_DATA_DIR;
use himalaya_dash::report::{OutputFormat, Report, Selection};
use himalaya_dash::Pipeline;

use app::HimalayaDashApp;
use state::AppState;

#[derive(Parser)]
#[command(name = "himalaya-dash")]
#[command(about = "Interactive dashboard of Himalayan expedition records")]
#[command(version)]
struct Cli {
    /// Folder holding exped_tidy.csv, peaks_tidy.csv and unique_peaks_coords.csv
    #[arg(long, env = "HIMALAYA_DATA_DIR", default_value = DEFAULT_DATA_DIR, global = true)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive dashboard (default)
    Gui,

    /// Print the dashboard views for one selection to stdout
    Report {
        /// Peak id (defaults to the most climbed peak)
        #[arg(short, long)]
        peak: Option<String>,

        /// First year of the range
        #[arg(long)]
        from: Option<i32>,

        /// Last year of the range
        #[arg(long)]
        to: Option<i32>,

        /// Season name, or "All"
        #[arg(short, long)]
        season: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Gui) {
        Commands::Gui => run_gui(cli.data_dir),
        Commands::Report {
            peak,
            from,
            to,
            season,
            format,
        } => {
            let selection = Selection {
                peak,
                from_year: from,
                to_year: to,
                season,
            };
            run_report(cli.data_dir, &selection, format)
        }
    }
}

fn run_gui(data_dir: PathBuf) -> anyhow::Result<()> {
    let mut state = AppState::new(data_dir, Pipeline::new());
    state
        .load()
        .with_context(|| format!("loading expedition data from {}", state.data_dir.display()))?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Himalayan Expeditions Dashboard",
        options,
        Box::new(|_cc| Ok(Box::new(HimalayaDashApp::new(state)))),
    )
    .map_err(|e| anyhow!("dashboard window failed: {e}"))
}

fn run_report(data_dir: PathBuf, selection: &Selection, format: OutputFormat) -> anyhow::Result<()> {
    let dataset = Pipeline::new()
        .open(&data_dir)
        .with_context(|| format!("loading expedition data from {}", data_dir.display()))?;
    let report = Report::build(&dataset, selection);
    println!("{}", report.render(format)?);
    Ok(())
}
