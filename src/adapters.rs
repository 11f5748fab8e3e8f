//! Thin per-tab adapters: which file a view reads, which columns it shows
//! and in what order. Team Performance is derived from the standings file,
//! Probable Pitchers reads one nested JSON file shared by all seasons.

use tracing::debug;

use crate::value::{Dataset, Row, Value};
use crate::views::ViewId;

/// How a view's source file is named and laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLayout {
    /// `<source>_<season>.<csv|json|parquet>`, one record per row.
    SeasonTable,
    /// `<source>.json` with `pitchers_by_date: {date: {team: [pitcher]}}`.
    PitchersByDate,
}

#[derive(Debug)]
pub struct ViewAdapter {
    pub view: ViewId,
    /// File stem without season, e.g. `stats` for `stats_2024.csv`.
    pub source: &'static str,
    pub layout: SourceLayout,
    pub columns: &'static [&'static str],
}

pub static STANDINGS: ViewAdapter = ViewAdapter {
    view: ViewId::Standings,
    source: "standings",
    layout: SourceLayout::SeasonTable,
    columns: &[
        "team_name",
        "rank",
        "percentage",
        "Expected Rank",
        "Expected Points",
        "wins",
        "losses",
        "ties",
        "games_back",
    ],
};

pub static WEEKLY_LEADERS: ViewAdapter = ViewAdapter {
    view: ViewId::WeeklyLeaders,
    source: "leaders",
    layout: SourceLayout::SeasonTable,
    columns: &["week", "teams", "val", "stat"],
};

pub static TEAM_STATS: ViewAdapter = ViewAdapter {
    view: ViewId::TeamStats,
    source: "stats",
    layout: SourceLayout::SeasonTable,
    columns: &[
        "week",
        "team_name",
        "R",
        "HR",
        "RBI",
        "SB",
        "TB",
        "AVG",
        "OBP",
        "IP",
        "K",
        "ERA",
        "WHIP",
        "SV",
    ],
};

pub static TEAM_PERFORMANCE: ViewAdapter = ViewAdapter {
    view: ViewId::TeamPerformance,
    source: "standings",
    layout: SourceLayout::SeasonTable,
    columns: &[
        "team_name",
        "rank",
        "percentage",
        "Expected Points",
        "points_share",
    ],
};

pub static PROBABLE_PITCHERS: ViewAdapter = ViewAdapter {
    view: ViewId::ProbablePitchers,
    source: "probable_pitchers",
    layout: SourceLayout::PitchersByDate,
    columns: &[
        "date",
        "team",
        "pitcher",
        "throws",
        "record",
        "era",
        "strikeouts",
    ],
};

pub fn adapter(view: ViewId) -> &'static ViewAdapter {
    match view {
        ViewId::Standings => &STANDINGS,
        ViewId::WeeklyLeaders => &WEEKLY_LEADERS,
        ViewId::TeamStats => &TEAM_STATS,
        ViewId::TeamPerformance => &TEAM_PERFORMANCE,
        ViewId::ProbablePitchers => &PROBABLE_PITCHERS,
    }
}

impl ViewAdapter {
    /// Shapes a freshly loaded dataset for this view.
    pub fn prepare(&self, raw: Dataset) -> Dataset {
        match self.view {
            ViewId::TeamPerformance => with_points_share(raw),
            _ => raw,
        }
    }
}

fn round4(n: f64) -> f64 {
    (n * 10_000.0).round() / 10_000.0
}

/// Adds `points_share`: each team's expected points over the league total.
fn with_points_share(raw: Dataset) -> Dataset {
    let points = |row: &Row| row.get("Expected Points").and_then(Value::as_number);
    let total: f64 = raw.rows().iter().filter_map(points).sum();
    debug!("Deriving points share over {} teams, total {total}", raw.len());

    raw.into_rows()
        .into_iter()
        .map(|row| {
            let share = points(&row)
                .filter(|_| total != 0.0)
                .map(|p| Value::Number(round4(p / total)))
                .unwrap_or(Value::Null);
            row.with("points_share", share)
        })
        .collect()
}
