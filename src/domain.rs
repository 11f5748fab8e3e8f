use std::path::PathBuf;

use derive_setters::Setters;
use polars::error::PolarsError;
use thiserror::Error;

use crate::views::ViewId;

pub type Season = u16;

#[derive(Debug, Error)]
pub enum DiamondError {
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("invalid json: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("loading failed: {0}")]
    LoadingFailed(String),
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),
    #[error("unknown file type: {}", .0.display())]
    UnknownFileType(PathBuf),
    #[error("no {kind} data for season {season} in {}", .dir.display())]
    MissingDataFile {
        kind: &'static str,
        season: Season,
        dir: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    Quit,
    Exit,
    Enter,
    Help,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    NextView,
    PrevView,
    SelectView(ViewId),
    NextSeason,
    PrevSeason,
    ToggleSort,
    Filter,
    ClearFilter,
    ClearAllFilters,
    ToggleCompact,
    CopyRow,
    Reload,
    Resize(usize, usize),
}

#[derive(Debug, Clone, Setters)]
pub struct DiamondConfig {
    pub data_dir: PathBuf,
    pub state_file: Option<PathBuf>,
    pub event_poll_time: u64,
    /// Terminal widths below this render compact headers.
    pub compact_width: usize,
    pub force_compact: bool,
    pub clear_filters_on_season_change: bool,
    pub max_column_width: usize,
}

impl Default for DiamondConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("public/data"),
            state_file: None,
            event_poll_time: 100,
            compact_width: 100,
            force_compact: false,
            clear_filters_on_season_change: false,
            max_column_width: 24,
        }
    }
}

pub const HELP_TEXT: &str = "\
diamond - fantasy baseball season dashboard

Tabs
  Tab / Shift+Tab   next / previous tab
  1 2 3 4 5         standings, weekly leaders, team stats, team performance,
                    probable pitchers
  [ ]               previous / next season
  r                 reload current season

Table
  j k / Up Down     move row
  h l / Left Right  move column
  PgUp PgDn g G     page up / down, first / last row
  s / Enter         sort by selected column (again flips direction)
  f                 pick a filter value
  x                 clear filter of selected filter column
  X                 clear all filters of this tab
  c                 toggle compact headers
  y                 copy row to clipboard

Filter picker
  h l               switch filter column
  j k               move between values
  Enter             apply (All clears the filter)
  Esc               close

  ?                 this help
  q                 quit
";
