use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use ratatui::DefaultTerminal;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod column;
mod controller;
mod domain;
mod filter;
mod model;
mod selector;
mod table;
mod ui;

use column::ColumnLayout;
use controller::Controller;
use domain::{UTConfig, UTError};
use model::{Model, Status};
use ui::TableUI;

/// Browse a comparison table with sortable columns and location/rate filters.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Table to show (csv, parquet or arrow)
    path: String,

    /// Header of the admission rate column
    #[arg(long, default_value = "录取率")]
    rate_column: String,

    /// Header of the star rating column
    #[arg(long, default_value = "交通便捷度")]
    rating_column: String,

    /// Glyph counted in the rating column
    #[arg(long, default_value_t = column::DEFAULT_RATING_MARKER)]
    rating_marker: char,

    /// Header of the location column
    #[arg(long, default_value = "地理位置")]
    location_column: String,

    /// Options of the location filter
    #[arg(long, value_delimiter = ',')]
    locations: Option<Vec<String>>,

    #[arg(long, default_value = "ut.log")]
    log_file: String,

    /// Used unless RUST_LOG is set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Event poll time in ms
    #[arg(long, default_value_t = 100)]
    poll_time: u64,
}

impl Args {
    fn config(&self) -> UTConfig {
        let mut layout = ColumnLayout::default()
            .rate_column(self.rate_column.as_str())
            .rating_column(self.rating_column.as_str())
            .rating_marker(self.rating_marker)
            .location_column(self.location_column.as_str());
        if let Some(locations) = &self.locations {
            layout = layout.locations(locations.clone());
        }
        UTConfig::default()
            .event_poll_time(self.poll_time)
            .layout(layout)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn init_logging(args: &Args) -> Result<(), UTError> {
    // The terminal belongs to the UI, so logs go to a file
    let log_path = shellexpand::full(&args.log_file)
        .map_err(|e| UTError::LoadingFailed(e.to_string()))?;
    let file = File::create(&*log_path)?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn run(args: &Args) -> Result<(), UTError> {
    init_logging(args)?;
    let cfg = args.config();
    info!("Starting ut with {:?}", cfg);

    // Load before taking over the terminal so errors print normally
    let mut model = load_model(args, &cfg)?;

    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &mut model, &cfg);
    ratatui::restore();
    result
}

fn load_model(args: &Args, cfg: &UTConfig) -> Result<Model, UTError> {
    let path = shellexpand::full(&args.path)
        .map_err(|e| UTError::LoadingFailed(e.to_string()))?
        .to_string();
    let mut model = Model::init(cfg, 0, 0)?;
    model.load_data_file(PathBuf::from(path))?;
    Ok(model)
}

fn event_loop(terminal: &mut DefaultTerminal, model: &mut Model, cfg: &UTConfig) -> Result<(), UTError> {
    let size = terminal.size()?;
    model.update(Some(domain::Message::Resize(
        size.width as usize,
        size.height as usize,
    )))?;

    let ui = TableUI::new(cfg);
    let controller = Controller::new(cfg);

    while model.status != Status::QUITTING {
        terminal.draw(|f| ui.draw(model, f))?;

        if let Some(message) = controller.handle_event(model)? {
            model.update(Some(message))?;
        };
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_build_config() {
        let args = Args::parse_from([
            "ut",
            "table.csv",
            "--rate-column",
            "rate",
            "--locations",
            "北京市,上海市",
            "--poll-time",
            "50",
        ]);
        let cfg = args.config();
        assert_eq!(cfg.event_poll_time, 50);
        assert_eq!(cfg.layout.rate_column, "rate");
        assert_eq!(cfg.layout.rating_column, "交通便捷度");
        assert_eq!(cfg.layout.locations, vec!["北京市", "上海市"]);
        assert_eq!(cfg.layout.rating_marker, '★');
    }

    #[test]
    fn load_errors_surface_without_a_terminal() {
        let args = Args::parse_from(["ut", "does/not/exist.csv"]);
        let result = load_model(&args, &args.config());
        assert!(matches!(result, Err(UTError::FileNotFound)));
    }

    #[test]
    fn fixture_loads_before_the_terminal() {
        let args = Args::parse_from(["ut", "tests/fixtures/universities.csv"]);
        let model = load_model(&args, &args.config()).unwrap();
        assert_eq!(model.get_uidata().total_rows, 7);
    }

    #[test]
    fn default_locations_are_kept() {
        let cfg = Args::parse_from(["ut", "table.csv"]).config();
        assert_eq!(cfg.layout.locations.len(), 5);
    }
}
