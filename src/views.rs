//! View identifiers and the static per-view configuration registry.
//!
//! Every lookup here is pure and total. Views without a dedicated record
//! (and tags that no longer name a view) resolve to [`DEFAULT_CONFIG`].

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::table::{SortDirection, SortSpec};
use crate::value::Value;

/// One tag per dashboard tab.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum ViewId {
    Standings,
    WeeklyLeaders,
    TeamStats,
    TeamPerformance,
    ProbablePitchers,
}

impl ViewId {
    pub const ALL: [ViewId; 5] = [
        ViewId::Standings,
        ViewId::WeeklyLeaders,
        ViewId::TeamStats,
        ViewId::TeamPerformance,
        ViewId::ProbablePitchers,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            ViewId::Standings => "standings",
            ViewId::WeeklyLeaders => "weekly-leaders",
            ViewId::TeamStats => "team-stats",
            ViewId::TeamPerformance => "team-performance",
            ViewId::ProbablePitchers => "probable-pitchers",
        }
    }

    pub fn from_tag(tag: &str) -> Option<ViewId> {
        ViewId::ALL.into_iter().find(|v| v.tag() == tag)
    }

    pub fn title(&self) -> &'static str {
        match self {
            ViewId::Standings => "Standings",
            ViewId::WeeklyLeaders => "Weekly Stat Leaders",
            ViewId::TeamStats => "Team Stats",
            ViewId::TeamPerformance => "Team Performance",
            ViewId::ProbablePitchers => "Probable Pitchers",
        }
    }

    pub fn index(&self) -> usize {
        ViewId::ALL.iter().position(|v| v == self).unwrap_or(0)
    }

    pub fn next(&self) -> ViewId {
        ViewId::ALL[(self.index() + 1) % ViewId::ALL.len()]
    }

    pub fn prev(&self) -> ViewId {
        ViewId::ALL[(self.index() + ViewId::ALL.len() - 1) % ViewId::ALL.len()]
    }
}

/// How a column's numeric values are displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    /// Counting statistic, whole numbers without a fraction.
    Integer,
    /// Three decimals, leading zero stripped (".300").
    Rate3,
    /// Two decimals, leading zero kept ("3.00").
    Rate2,
    Passthrough,
}

impl FormatKind {
    fn apply(&self, value: &Value) -> String {
        let number = value.as_number();
        match (self, number) {
            (FormatKind::Rate3, Some(n)) => {
                let fixed = format!("{n:.3}");
                fixed.trim_start_matches('0').to_string()
            }
            (FormatKind::Rate2, Some(n)) => format!("{n:.2}"),
            (FormatKind::Integer, Some(n)) if n.fract() == 0.0 => format!("{n:.0}"),
            _ => value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellAlign {
    Left,
    Center,
}

/// Explicit label for a column key: full form and compact form.
#[derive(Debug, Clone, Copy)]
pub struct HeaderLabel {
    pub column: &'static str,
    pub full: &'static str,
    pub compact: &'static str,
}

const fn label(column: &'static str, full: &'static str, compact: &'static str) -> HeaderLabel {
    HeaderLabel {
        column,
        full,
        compact,
    }
}

#[derive(Debug)]
pub struct ViewConfig {
    pub name: &'static str,
    headers: &'static [HeaderLabel],
    formats: &'static [(&'static str, FormatKind)],
    filterable: &'static [&'static str],
    default_sort: (&'static str, SortDirection),
    /// (value column, column naming the statistic): the value column takes
    /// the format of the statistic named in the same row.
    format_by_row: Option<(&'static str, &'static str)>,
}

const DEFAULT_HEADERS: &[HeaderLabel] = &[
    label("team_name", "TEAM", "TEAM"),
    label("percentage", "PCT", "PCT"),
    label("games_back", "GB", "GB"),
    label("Expected Rank", "EXP. RANK", "ER"),
    label("Expected Points", "EXP. PTS", "EP"),
    label("wins", "W", "W"),
    label("losses", "L", "L"),
    label("ties", "T", "T"),
    label("rank", "RANK", "R"),
    label("week", "WEEK", "WK"),
    label("teams", "TEAMS", "TEAM"),
    label("val", "VALUE", "VAL"),
    label("stat", "STAT", "STAT"),
    label("points_share", "PTS SHARE", "SHR"),
];

const LEADER_HEADERS: &[HeaderLabel] = &[
    label("week", "WEEK", "WK"),
    label("teams", "TEAM", "TEAM"),
    label("val", "VALUE", "VALUE"),
    label("stat", "STAT", "STAT"),
];

const PITCHER_HEADERS: &[HeaderLabel] = &[
    label("date", "DATE", "DATE"),
    label("team", "TEAM", "TEAM"),
    label("pitcher", "PITCHER", "P"),
    label("throws", "THROWS", "T"),
    label("record", "W-L", "W-L"),
    label("era", "ERA", "ERA"),
    label("strikeouts", "K", "K"),
];

/// Formatting kind of every known statistic, independent of the view.
pub const STAT_FORMATS: &[(&str, FormatKind)] = &[
    ("percentage", FormatKind::Rate3),
    ("AVG", FormatKind::Rate3),
    ("OBP", FormatKind::Rate3),
    ("ERA", FormatKind::Rate2),
    ("WHIP", FormatKind::Rate2),
    ("R", FormatKind::Integer),
    ("HR", FormatKind::Integer),
    ("RBI", FormatKind::Integer),
    ("SB", FormatKind::Integer),
    ("TB", FormatKind::Integer),
    ("K", FormatKind::Integer),
    ("SV", FormatKind::Integer),
    ("wins", FormatKind::Integer),
    ("losses", FormatKind::Integer),
    ("ties", FormatKind::Integer),
    ("rank", FormatKind::Integer),
    ("week", FormatKind::Integer),
];

const STANDINGS_FORMATS: &[(&str, FormatKind)] = &[
    ("percentage", FormatKind::Rate3),
    ("wins", FormatKind::Integer),
    ("losses", FormatKind::Integer),
    ("ties", FormatKind::Integer),
    ("rank", FormatKind::Integer),
];

const TEAM_STAT_FORMATS: &[(&str, FormatKind)] = &[
    ("AVG", FormatKind::Rate3),
    ("OBP", FormatKind::Rate3),
    ("ERA", FormatKind::Rate2),
    ("WHIP", FormatKind::Rate2),
    ("R", FormatKind::Integer),
    ("HR", FormatKind::Integer),
    ("RBI", FormatKind::Integer),
    ("SB", FormatKind::Integer),
    ("TB", FormatKind::Integer),
    ("K", FormatKind::Integer),
    ("SV", FormatKind::Integer),
    ("week", FormatKind::Integer),
];

const LEADER_FORMATS: &[(&str, FormatKind)] = &[("week", FormatKind::Integer)];

const PITCHER_FORMATS: &[(&str, FormatKind)] = &[
    ("era", FormatKind::Rate2),
    ("strikeouts", FormatKind::Integer),
];

pub static DEFAULT_CONFIG: ViewConfig = ViewConfig {
    name: "default",
    headers: DEFAULT_HEADERS,
    formats: STAT_FORMATS,
    filterable: &["team_name", "week", "stat"],
    default_sort: ("rank", SortDirection::Ascending),
    format_by_row: None,
};

static STANDINGS_CONFIG: ViewConfig = ViewConfig {
    name: "standings",
    headers: DEFAULT_HEADERS,
    formats: STANDINGS_FORMATS,
    filterable: &[],
    default_sort: ("rank", SortDirection::Ascending),
    format_by_row: None,
};

static WEEKLY_LEADERS_CONFIG: ViewConfig = ViewConfig {
    name: "weekly-leaders",
    headers: LEADER_HEADERS,
    formats: LEADER_FORMATS,
    filterable: &["week", "stat"],
    default_sort: ("week", SortDirection::Ascending),
    format_by_row: Some(("val", "stat")),
};

static TEAM_STATS_CONFIG: ViewConfig = ViewConfig {
    name: "team-stats",
    headers: DEFAULT_HEADERS,
    formats: TEAM_STAT_FORMATS,
    filterable: &["team_name", "week"],
    default_sort: ("week", SortDirection::Ascending),
    format_by_row: None,
};

static PROBABLE_PITCHERS_CONFIG: ViewConfig = ViewConfig {
    name: "probable-pitchers",
    headers: PITCHER_HEADERS,
    formats: PITCHER_FORMATS,
    filterable: &["team"],
    default_sort: ("date", SortDirection::Ascending),
    format_by_row: None,
};

/// Total lookup from view to its configuration record.
pub fn view_config(view: ViewId) -> &'static ViewConfig {
    match view {
        ViewId::Standings => &STANDINGS_CONFIG,
        ViewId::WeeklyLeaders => &WEEKLY_LEADERS_CONFIG,
        ViewId::TeamStats => &TEAM_STATS_CONFIG,
        ViewId::TeamPerformance => &DEFAULT_CONFIG,
        ViewId::ProbablePitchers => &PROBABLE_PITCHERS_CONFIG,
    }
}

/// Lookup by raw tag; unknown tags get the generic default.
pub fn view_config_for_tag(tag: &str) -> &'static ViewConfig {
    ViewId::from_tag(tag)
        .map(view_config)
        .unwrap_or(&DEFAULT_CONFIG)
}

fn auto_label(column: &str) -> String {
    column.to_uppercase().replace('_', " ")
}

impl ViewConfig {
    pub fn header_label(&self, column: &str, compact: bool) -> String {
        match self.headers.iter().find(|h| h.column == column) {
            Some(h) if compact && h.compact.len() <= h.full.len() => h.compact.to_string(),
            Some(h) => h.full.to_string(),
            None => auto_label(column),
        }
    }

    pub fn format_kind(&self, column: &str) -> FormatKind {
        lookup_kind(self.formats, column).unwrap_or(FormatKind::Passthrough)
    }

    pub fn format_cell(&self, column: &str, value: Option<&Value>) -> String {
        match value {
            None | Some(Value::Null) => "-".to_string(),
            Some(v) => self.format_kind(column).apply(v),
        }
    }

    /// Like [`ViewConfig::format_cell`], but lets a value column borrow the
    /// format of the statistic named elsewhere in the row.
    pub fn format_row_cell(&self, column: &str, row: &crate::value::Row) -> String {
        let value = row.get(column);
        if let Some((value_column, stat_column)) = self.format_by_row
            && column == value_column
            && let Some(Value::Text(stat)) = row.get(stat_column)
            && let Some(kind) = lookup_kind(STAT_FORMATS, stat)
            && kind != FormatKind::Integer
        {
            return match value {
                None | Some(Value::Null) => "-".to_string(),
                Some(v) => kind.apply(v),
            };
        }
        self.format_cell(column, value)
    }

    pub fn filterable_columns(&self) -> &'static [&'static str] {
        self.filterable
    }

    pub fn is_filterable(&self, column: &str) -> bool {
        self.filterable.contains(&column)
    }

    pub fn default_sort(&self) -> SortSpec {
        SortSpec::new(self.default_sort.0, self.default_sort.1)
    }
}

fn lookup_kind(table: &[(&str, FormatKind)], column: &str) -> Option<FormatKind> {
    table
        .iter()
        .find(|(name, _)| *name == column)
        .map(|(_, kind)| *kind)
}

pub fn header_label(view: ViewId, column: &str, compact: bool) -> String {
    view_config(view).header_label(column, compact)
}

pub fn format_cell(view: ViewId, column: &str, value: Option<&Value>) -> String {
    view_config(view).format_cell(column, value)
}

pub fn cell_alignment(column: &str) -> CellAlign {
    match column {
        "team_name" | "teams" | "team" | "pitcher" => CellAlign::Left,
        _ => CellAlign::Center,
    }
}

pub fn filterable_columns(view: ViewId) -> &'static [&'static str] {
    view_config(view).filterable_columns()
}

pub fn default_sort(view: ViewId) -> SortSpec {
    view_config(view).default_sort()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Row;

    #[test]
    fn rate_statistics_round_trip() {
        let v = ViewId::TeamStats;
        assert_eq!(format_cell(v, "AVG", Some(&Value::from(0.3))), ".300");
        assert_eq!(format_cell(v, "ERA", Some(&Value::from(3))), "3.00");
        assert_eq!(format_cell(v, "ERA", None), "-");
        assert_eq!(format_cell(v, "ERA", Some(&Value::Null)), "-");
        assert_eq!(
            format_cell(ViewId::Standings, "percentage", Some(&Value::from(0.3))),
            ".300"
        );
        assert_eq!(
            format_cell(ViewId::TeamPerformance, "percentage", Some(&Value::from(0.3))),
            ".300"
        );
    }

    #[test]
    fn rate_text_is_parsed_and_garbage_passes_through() {
        let v = ViewId::TeamStats;
        assert_eq!(format_cell(v, "OBP", Some(&Value::from("0.4127"))), ".413");
        assert_eq!(format_cell(v, "WHIP", Some(&Value::from("1.1"))), "1.10");
        assert_eq!(format_cell(v, "AVG", Some(&Value::from("n/a"))), "n/a");
        // only the leading zeros go
        assert_eq!(format_cell(v, "AVG", Some(&Value::from(1.0))), "1.000");
    }

    #[test]
    fn standings_only_formats_percentage() {
        assert_eq!(
            format_cell(ViewId::Standings, "ERA", Some(&Value::from(3))),
            "3"
        );
        assert_eq!(
            format_cell(ViewId::Standings, "team_name", Some(&Value::from("Team A"))),
            "Team A"
        );
    }

    #[test]
    fn weekly_leader_value_follows_stat_column() {
        let cfg = view_config(ViewId::WeeklyLeaders);
        let avg = Row::new().with("stat", "AVG").with("val", 0.3127);
        let era = Row::new().with("stat", "ERA").with("val", 2.5);
        let hr = Row::new().with("stat", "HR").with("val", 5);
        assert_eq!(cfg.format_row_cell("val", &avg), ".313");
        assert_eq!(cfg.format_row_cell("val", &era), "2.50");
        assert_eq!(cfg.format_row_cell("val", &hr), "5");
        assert_eq!(cfg.format_row_cell("teams", &hr), "-");
    }

    #[test]
    fn header_labels_fall_back_to_upper_case() {
        assert_eq!(header_label(ViewId::TeamStats, "team_name", false), "TEAM");
        assert_eq!(
            header_label(ViewId::TeamStats, "some_new_col", false),
            "SOME NEW COL"
        );
        assert_eq!(
            header_label(ViewId::WeeklyLeaders, "team_name", false),
            "TEAM NAME"
        );
        assert_eq!(header_label(ViewId::Standings, "Expected Rank", true), "ER");
        assert_eq!(
            header_label(ViewId::Standings, "Expected Rank", false),
            "EXP. RANK"
        );
    }

    #[test]
    fn compact_labels_never_longer() {
        let columns = [
            "team_name",
            "rank",
            "percentage",
            "Expected Rank",
            "Expected Points",
            "wins",
            "week",
            "teams",
            "val",
            "stat",
            "points_share",
            "unknown_column",
        ];
        for view in ViewId::ALL {
            for column in columns {
                let full = header_label(view, column, false);
                let compact = header_label(view, column, true);
                assert!(compact.len() <= full.len(), "{view:?} {column}");
            }
        }
    }

    #[test]
    fn alignment() {
        assert_eq!(cell_alignment("team_name"), CellAlign::Left);
        assert_eq!(cell_alignment("teams"), CellAlign::Left);
        assert_eq!(cell_alignment("HR"), CellAlign::Center);
    }

    #[test]
    fn filterable_and_default_sorts() {
        assert!(filterable_columns(ViewId::Standings).is_empty());
        assert_eq!(filterable_columns(ViewId::WeeklyLeaders), &["week", "stat"]);
        assert_eq!(filterable_columns(ViewId::TeamStats), &["team_name", "week"]);
        assert_eq!(
            default_sort(ViewId::Standings),
            SortSpec::new("rank", SortDirection::Ascending)
        );
        assert_eq!(default_sort(ViewId::TeamStats).column, "week");
        assert_eq!(filterable_columns(ViewId::ProbablePitchers), &["team"]);
        assert_eq!(
            default_sort(ViewId::ProbablePitchers),
            SortSpec::new("date", SortDirection::Ascending)
        );
    }

    #[test]
    fn unknown_tags_use_default_config() {
        assert_eq!(view_config_for_tag("box-scores").name, "default");
        assert_eq!(view_config_for_tag("probable-pitchers").name, "probable-pitchers");
        assert_eq!(view_config_for_tag("team-stats").name, "team-stats");
        assert_eq!(view_config(ViewId::TeamPerformance).name, "default");
    }

    #[test]
    fn view_cycling() {
        assert_eq!(ViewId::Standings.next(), ViewId::WeeklyLeaders);
        assert_eq!(ViewId::Standings.prev(), ViewId::ProbablePitchers);
        assert_eq!(ViewId::TeamPerformance.next(), ViewId::ProbablePitchers);
        assert_eq!(ViewId::from_tag("weekly-leaders"), Some(ViewId::WeeklyLeaders));
        assert_eq!(ViewId::from_tag("nope"), None);
    }
}
