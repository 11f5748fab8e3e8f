use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use tracing::{info, warn};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use diamond::controller::Controller;
use diamond::domain::{DiamondConfig, DiamondError, Season};
use diamond::loader::{discover_seasons, load_season_labels};
use diamond::model::{Model, Status};
use diamond::persist::{PersistedState, default_state_path};
use diamond::state::AppState;
use diamond::ui::TableUI;
use diamond::views::ViewId;

/// Fantasy baseball season dashboard for the terminal.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory with standings_<season>, leaders_<season> and stats_<season> files
    #[arg(short, long, default_value = "public/data")]
    data_dir: String,

    /// Season to show first
    #[arg(short, long)]
    season: Option<Season>,

    /// Tab to show first
    #[arg(short, long, value_enum)]
    tab: Option<ViewId>,

    /// Where season, tab and filters are remembered
    #[arg(long)]
    state_file: Option<String>,

    /// Do not read or write the state file
    #[arg(long)]
    no_persist: bool,

    /// Drop all filters when switching seasons
    #[arg(long)]
    clear_filters_on_season_change: bool,

    /// Always use compact column headers
    #[arg(short, long)]
    compact: bool,

    #[arg(long)]
    log_file: Option<String>,

    /// Log level, RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Event poll interval in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let result = run(args);
    ratatui::restore();
    match result {
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn expand_path(path: &str) -> Result<PathBuf, DiamondError> {
    shellexpand::full(path)
        .map(|p| PathBuf::from(p.as_ref()))
        .map_err(|e| DiamondError::LoadingFailed(format!("cannot expand {path}: {e}")))
}

fn init_logging(args: &Args) -> Result<(), DiamondError> {
    let path = match &args.log_file {
        Some(p) => expand_path(p)?,
        None => default_state_path()
            .and_then(|p| p.parent().map(|d| d.join("diamond.log")))
            .unwrap_or_else(|| PathBuf::from("diamond.log")),
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.as_str()));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn run(args: Args) -> Result<(), DiamondError> {
    init_logging(&args)?;

    let data_dir = expand_path(&args.data_dir)?;
    let state_file = match (&args.state_file, args.no_persist) {
        (_, true) => None,
        (Some(p), false) => Some(expand_path(p)?),
        (None, false) => default_state_path(),
    };
    let cfg = DiamondConfig::default()
        .data_dir(data_dir.clone())
        .state_file(state_file.clone())
        .event_poll_time(args.poll_ms)
        .force_compact(args.compact)
        .clear_filters_on_season_change(args.clear_filters_on_season_change);
    info!("Starting diamond with {cfg:?}");

    let seasons = discover_seasons(&data_dir).unwrap_or_else(|e| {
        warn!("Cannot list {}: {e}", data_dir.display());
        Vec::new()
    });
    let season_labels = load_season_labels(&data_dir);

    let mut persisted = state_file
        .as_deref()
        .and_then(PersistedState::load)
        .unwrap_or_default();
    // Command line wins over the remembered state
    if let Some(season) = args.season {
        if !seasons.contains(&season) {
            warn!("No data for season {season}, available: {seasons:?}");
        }
        persisted.season = Some(season);
    }
    if let Some(tab) = args.tab {
        persisted.tab = Some(tab.tag().to_string());
    }
    let default_season = seasons.last().copied();
    let state = AppState::restore(seasons, &persisted, default_season, ViewId::Standings);

    let mut terminal = ratatui::init();
    let size = terminal.size()?;

    let mut model = Model::init(
        &cfg,
        state,
        season_labels,
        size.width as usize,
        size.height as usize,
    );
    let mut ui = TableUI::new(&cfg);
    let controller = Controller::new(&cfg);

    while model.status != Status::Quitting {
        // Render the current view
        terminal.draw(|f| ui.draw(&model, f))?;

        // Handle events and map to a Message
        let message = controller.handle_event()?;
        model.update(message)?;
    }
    info!("Quitting diamond");

    Ok(())
}
