use polars::prelude::*;
use rayon::prelude::*;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

use crate::adapters::{SourceLayout, ViewAdapter, adapter};
use crate::domain::{DiamondError, Season};
use crate::value::{Dataset, Row, Value, parse_number};
use crate::views::ViewId;

const SOURCES: [&str; 3] = ["standings", "leaders", "stats"];
const EXTENSIONS: [&str; 3] = ["csv", "json", "parquet"];
pub const SEASON_LABELS_FILE: &str = "seasons.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileType {
    Csv,
    Json,
    Parquet,
}

#[derive(Debug)]
struct FileInfo {
    path: PathBuf,
    file_size: u64,
    file_type: FileType,
}

fn detect_file_type(path: &Path) -> Result<FileType, DiamondError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("CSV") => Ok(FileType::Csv),
        Some("JSON") => Ok(FileType::Json),
        Some("PARQUET") | Some("PQ") => Ok(FileType::Parquet),
        _ => Err(DiamondError::UnknownFileType(path.to_path_buf())),
    }
}

fn get_file_info(path: PathBuf) -> Result<FileInfo, DiamondError> {
    let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => DiamondError::FileNotFound(path.clone()),
        ErrorKind::PermissionDenied => DiamondError::PermissionDenied(path.clone()),
        _ => DiamondError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(DiamondError::LoadingFailed(format!(
            "{} is not a file!",
            path.display()
        )));
    }
    let file_type = detect_file_type(&path)?;
    Ok(FileInfo {
        file_size: metadata.len(),
        path,
        file_type,
    })
}

fn load_frame(info: &FileInfo) -> Result<DataFrame, DiamondError> {
    let frame = match info.file_type {
        FileType::Csv => LazyCsvReader::new(PlPath::Local(info.path.as_path().into()))
            .with_has_header(true)
            .finish()?
            .collect()?,
        FileType::Json => JsonReader::new(File::open(&info.path)?).finish()?,
        FileType::Parquet => LazyFrame::scan_parquet(
            PlPath::Local(info.path.as_path().into()),
            ScanArgsParquet::default(),
        )?
        .collect()?,
    };
    Ok(frame)
}

fn is_numeric_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Converts one polars column into cell values. Numeric columns keep their
/// numbers, everything else is read as text.
fn load_column(df: &DataFrame, name: &str) -> Result<(String, Vec<Value>), PolarsError> {
    let column = df.column(name)?;
    let values = if is_numeric_type(column.dtype()) {
        let cast = column.cast(&DataType::Float64)?;
        cast.f64()?
            .into_iter()
            .map(|v| v.map(Value::Number).unwrap_or(Value::Null))
            .collect()
    } else {
        let cast = column.cast(&DataType::String)?;
        cast.str()?
            .into_iter()
            .map(|v| v.map(|s| Value::Text(s.to_string())).unwrap_or(Value::Null))
            .collect()
    };
    Ok((name.to_string(), values))
}

/// Turns a frame into rows. Each column is converted on its own rayon task.
pub fn frame_to_dataset(df: &DataFrame) -> Result<Dataset, DiamondError> {
    let columns: Vec<(String, Vec<Value>)> = df
        .get_column_names()
        .par_iter()
        .map(|name| load_column(df, name.as_str()))
        .collect::<Result<_, _>>()?;

    let rows = (0..df.height())
        .map(|ridx| {
            columns
                .iter()
                .filter_map(|(name, values)| {
                    values.get(ridx).map(|v| (name.clone(), v.clone()))
                })
                .collect::<Row>()
        })
        .collect();
    Ok(Dataset::new(rows))
}

/// Finds `<source>_<season>.<ext>` in `dir`, trying the known extensions.
pub fn data_file(dir: &Path, source: &str, season: Season) -> Option<PathBuf> {
    EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{source}_{season}.{ext}")))
        .find(|p| p.is_file())
}

#[derive(Debug, Deserialize)]
struct PitcherFile {
    #[serde(default)]
    pitchers_by_date: BTreeMap<String, BTreeMap<String, Vec<PitcherEntry>>>,
}

#[derive(Debug, Deserialize)]
struct PitcherEntry {
    title: String,
    #[serde(default)]
    throws: Option<String>,
    #[serde(default)]
    record: Option<String>,
    #[serde(default)]
    era: Option<serde_json::Value>,
    #[serde(default)]
    strikeouts: Option<serde_json::Value>,
}

fn json_cell(value: Option<serde_json::Value>) -> Value {
    match value {
        Some(serde_json::Value::Number(n)) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
        Some(serde_json::Value::String(s)) => match parse_number(&s) {
            Some(n) => Value::Number(n),
            None if s.is_empty() => Value::Null,
            None => Value::Text(s),
        },
        _ => Value::Null,
    }
}

/// Flattens `pitchers_by_date` into one row per date, team and pitcher,
/// dates and teams in ascending order. Titles like `"Name (ABC)"` keep
/// only the name.
fn pitchers_to_dataset(json: &str) -> Result<Dataset, DiamondError> {
    let file: PitcherFile = serde_json::from_str(json)?;
    let mut rows = Vec::new();
    for (date, teams) in file.pitchers_by_date {
        for (team, pitchers) in teams {
            for pitcher in pitchers {
                let name = pitcher
                    .title
                    .split(" (")
                    .next()
                    .unwrap_or_default()
                    .to_string();
                rows.push(
                    Row::new()
                        .with("date", date.as_str())
                        .with("team", team.as_str())
                        .with("pitcher", name)
                        .with("throws", pitcher.throws)
                        .with("record", pitcher.record)
                        .with("era", json_cell(pitcher.era))
                        .with("strikeouts", json_cell(pitcher.strikeouts)),
                );
            }
        }
    }
    Ok(Dataset::new(rows))
}

/// `<source>.json` in `dir`. The file covers every season.
fn load_pitchers(dir: &Path, adapter: &ViewAdapter) -> Result<Dataset, DiamondError> {
    let info = get_file_info(dir.join(format!("{}.json", adapter.source)))?;
    debug!(
        "Loading {:?} {} ({} bytes)",
        adapter.view,
        info.path.display(),
        info.file_size
    );
    let json = fs::read_to_string(&info.path)?;
    pitchers_to_dataset(&json)
}

/// Loads and prepares the dataset of `view` for `season`. Blocking.
pub fn load_dataset(dir: &Path, view: ViewId, season: Season) -> Result<Dataset, DiamondError> {
    let adapter: &ViewAdapter = adapter(view);
    if adapter.layout == SourceLayout::PitchersByDate {
        let start_time = Instant::now();
        let dataset = adapter.prepare(load_pitchers(dir, adapter)?);
        info!(
            "Loaded {} rows for {:?} in {}ms",
            dataset.len(),
            view,
            start_time.elapsed().as_millis()
        );
        return Ok(dataset);
    }
    let path = data_file(dir, adapter.source, season).ok_or_else(|| {
        DiamondError::MissingDataFile {
            kind: adapter.source,
            season,
            dir: dir.to_path_buf(),
        }
    })?;
    let info = get_file_info(path)?;
    debug!(
        "Loading {:?} {} ({} bytes, {:?})",
        view,
        info.path.display(),
        info.file_size,
        info.file_type
    );

    let start_time = Instant::now();
    let frame = load_frame(&info)?;
    let dataset = adapter.prepare(frame_to_dataset(&frame)?);
    info!(
        "Loaded {} rows for {:?} {} in {}ms",
        dataset.len(),
        view,
        season,
        start_time.elapsed().as_millis()
    );
    Ok(dataset)
}

/// Seasons that have at least one data file in `dir`, oldest first.
pub fn discover_seasons(dir: &Path) -> Result<Vec<Season>, DiamondError> {
    let mut seasons = BTreeSet::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if detect_file_type(&path).is_err() {
            continue;
        }
        if let Some((source, season)) = stem.rsplit_once('_')
            && SOURCES.contains(&source)
            && let Ok(season) = season.parse::<Season>()
        {
            seasons.insert(season);
        }
    }
    trace!("Discovered seasons {seasons:?} in {}", dir.display());
    Ok(seasons.into_iter().collect())
}

/// Optional display names of seasons, e.g. the league name of that year.
pub fn load_season_labels(dir: &Path) -> BTreeMap<Season, String> {
    let path = dir.join(SEASON_LABELS_FILE);
    let Ok(json) = fs::read_to_string(&path) else {
        return BTreeMap::new();
    };
    match serde_json::from_str::<BTreeMap<String, String>>(&json) {
        Ok(labels) => labels
            .into_iter()
            .filter_map(|(k, v)| k.parse::<Season>().ok().map(|s| (s, v)))
            .collect(),
        Err(e) => {
            warn!("Ignoring invalid {}: {e}", path.display());
            BTreeMap::new()
        }
    }
}

#[derive(Debug)]
pub struct LoadResult {
    pub seq: u64,
    pub view: ViewId,
    pub season: Season,
    pub result: Result<Dataset, DiamondError>,
}

/// Runs dataset loads off the UI loop. Every request gets a sequence
/// number and only the newest request per view may commit its result.
pub struct Loader {
    data_dir: PathBuf,
    next_seq: u64,
    pending: HashMap<ViewId, u64>,
    tx: Sender<LoadResult>,
    rx: Receiver<LoadResult>,
}

impl Loader {
    pub fn new(data_dir: PathBuf) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            data_dir,
            next_seq: 1,
            pending: HashMap::new(),
            tx,
            rx,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn is_pending(&self, view: ViewId) -> bool {
        self.pending.contains_key(&view)
    }

    /// Starts loading `view` for `season` on a worker thread and supersedes
    /// any earlier request for the same view.
    pub fn request(&mut self, view: ViewId, season: Season) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.insert(view, seq);

        let tx = self.tx.clone();
        let dir = self.data_dir.clone();
        trace!("Request #{seq}: {view:?} {season}");
        thread::spawn(move || {
            let result = load_dataset(&dir, view, season);
            if let Err(e) = &result {
                error!("Loading {view:?} {season} failed: {e}");
            }
            // the receiver is gone once the app quits
            let _ = tx.send(LoadResult {
                seq,
                view,
                season,
                result,
            });
        });
        seq
    }

    /// Lets a result through only if it answers the newest request for its
    /// view. Anything older was superseded and is dropped.
    pub fn accept(&mut self, result: LoadResult) -> Option<LoadResult> {
        match self.pending.get(&result.view) {
            Some(&latest) if latest == result.seq => {
                self.pending.remove(&result.view);
                Some(result)
            }
            latest => {
                debug!(
                    "Discarding stale result #{} for {:?} (latest {:?})",
                    result.seq, result.view, latest
                );
                None
            }
        }
    }

    /// Results that arrived since the last call and are still current.
    pub fn poll(&mut self) -> Vec<LoadResult> {
        let arrived: Vec<LoadResult> = self.rx.try_iter().collect();
        arrived.into_iter().filter_map(|r| self.accept(r)).collect()
    }

    /// Like [`Loader::poll`] but waits up to `timeout` for the first result.
    pub fn poll_timeout(&mut self, timeout: Duration) -> Vec<LoadResult> {
        let mut arrived = Vec::new();
        if let Ok(first) = self.rx.recv_timeout(timeout) {
            arrived.push(first);
            arrived.extend(self.rx.try_iter());
        }
        arrived.into_iter().filter_map(|r| self.accept(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATS_CSV: &str = "\
week,team_name,R,HR,AVG,ERA
1,Team A,10,2,0.3,3.0
2,Team B,8,3,0.25,
";

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).expect("write fixture");
    }

    #[test]
    fn loads_csv_with_numbers_text_and_nulls() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write(tmp.path(), "stats_2024.csv", STATS_CSV);

        let data = load_dataset(tmp.path(), ViewId::TeamStats, 2024).expect("load");
        assert_eq!(data.len(), 2);
        let first = &data.rows()[0];
        assert_eq!(first.get("week"), Some(&Value::Number(1.0)));
        assert_eq!(first.get("team_name"), Some(&Value::from("Team A")));
        assert_eq!(first.get("AVG"), Some(&Value::Number(0.3)));
        assert_eq!(data.rows()[1].get("ERA"), Some(&Value::Null));
    }

    #[test]
    fn loads_json_records() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write(
            tmp.path(),
            "leaders_2023.json",
            r#"[{"week": 1, "teams": "Team A", "val": 5, "stat": "HR"},
                {"week": 2, "teams": "Team B", "val": 3, "stat": "RBI"}]"#,
        );
        let data = load_dataset(tmp.path(), ViewId::WeeklyLeaders, 2023).expect("load");
        assert_eq!(data.len(), 2);
        assert_eq!(data.rows()[1].get("stat"), Some(&Value::from("RBI")));
        assert_eq!(data.rows()[1].get("week").and_then(Value::as_number), Some(2.0));
    }

    #[test]
    fn team_performance_reads_standings() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write(
            tmp.path(),
            "standings_2024.csv",
            "team_name,rank,percentage,Expected Points\nA,1,0.6,60\nB,2,0.4,40\n",
        );
        let data = load_dataset(tmp.path(), ViewId::TeamPerformance, 2024).expect("load");
        assert_eq!(
            data.rows()[0].get("points_share"),
            Some(&Value::Number(0.6))
        );
    }

    #[test]
    fn missing_file_is_a_distinct_failure() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let err = load_dataset(tmp.path(), ViewId::Standings, 1999).unwrap_err();
        assert!(matches!(err, DiamondError::MissingDataFile { season: 1999, .. }));
    }

    const PITCHERS_JSON: &str = r#"{
        "date_pulled": "2024-06-01",
        "pitchers_by_date": {
            "2024-06-03": {
                "NYY": [{"title": "Gerrit Cole (NYY)", "throws": "R", "record": "3-1", "era": 2.95, "strikeouts": 41}]
            },
            "2024-06-02": {
                "SEA": [{"title": "Logan Gilbert (SEA)", "throws": "R", "record": "", "era": "3.10", "strikeouts": null}],
                "BOS": [
                    {"title": "Brayan Bello (BOS)", "throws": "R", "record": "4-4", "era": "4.50", "strikeouts": "50"},
                    {"title": "Nick Pivetta"}
                ]
            }
        }
    }"#;

    #[test]
    fn flattens_probable_pitchers_by_date_and_team() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write(tmp.path(), "probable_pitchers.json", PITCHERS_JSON);

        let data = load_dataset(tmp.path(), ViewId::ProbablePitchers, 2024).expect("load");
        let keys: Vec<(String, String, String)> = data
            .rows()
            .iter()
            .map(|r| {
                let text = |c: &str| r.get(c).map(|v| v.to_string()).unwrap_or_default();
                (text("date"), text("team"), text("pitcher"))
            })
            .collect();
        let expected = [
            ("2024-06-02", "BOS", "Brayan Bello"),
            ("2024-06-02", "BOS", "Nick Pivetta"),
            ("2024-06-02", "SEA", "Logan Gilbert"),
            ("2024-06-03", "NYY", "Gerrit Cole"),
        ]
        .map(|(d, t, p)| (d.to_string(), t.to_string(), p.to_string()));
        assert_eq!(keys, expected);

        let bello = &data.rows()[0];
        assert_eq!(bello.get("era"), Some(&Value::Number(4.5)));
        assert_eq!(bello.get("strikeouts"), Some(&Value::Number(50.0)));
        assert_eq!(bello.get("record"), Some(&Value::from("4-4")));
        assert_eq!(data.rows()[1].get("throws"), Some(&Value::Null));
        assert_eq!(data.rows()[2].get("strikeouts"), Some(&Value::Null));
        assert_eq!(data.rows()[3].get("era"), Some(&Value::Number(2.95)));
    }

    #[test]
    fn probable_pitchers_ignore_the_season() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write(tmp.path(), "probable_pitchers.json", PITCHERS_JSON);
        let a = load_dataset(tmp.path(), ViewId::ProbablePitchers, 2023).expect("load");
        let b = load_dataset(tmp.path(), ViewId::ProbablePitchers, 2024).expect("load");
        assert_eq!(a.len(), 4);
        assert_eq!(a.rows(), b.rows());
    }

    #[test]
    fn probable_pitchers_without_dates_is_empty() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write(tmp.path(), "probable_pitchers.json", r#"{"date_pulled": "2024-06-01"}"#);
        let data = load_dataset(tmp.path(), ViewId::ProbablePitchers, 2024).expect("load");
        assert!(data.is_empty());
    }

    #[test]
    fn probable_pitchers_missing_or_invalid_file_fails() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let err = load_dataset(tmp.path(), ViewId::ProbablePitchers, 2024).unwrap_err();
        assert!(matches!(err, DiamondError::FileNotFound(_)));

        write(tmp.path(), "probable_pitchers.json", "{not json");
        let err = load_dataset(tmp.path(), ViewId::ProbablePitchers, 2024).unwrap_err();
        assert!(matches!(err, DiamondError::JsonError(_)));
    }

    #[test]
    fn discovers_seasons_from_file_names() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write(tmp.path(), "stats_2024.csv", STATS_CSV);
        write(tmp.path(), "leaders_2023.csv", "week\n1\n");
        write(tmp.path(), "notes_2022.csv", "x\n1\n");
        write(tmp.path(), "stats_2021.txt", "x\n1\n");
        write(tmp.path(), "probable_pitchers.json", "{}");
        assert_eq!(discover_seasons(tmp.path()).expect("seasons"), [2023, 2024]);
    }

    #[test]
    fn season_labels_are_optional() {
        let tmp = tempfile::tempdir().expect("tempdir");
        assert!(load_season_labels(tmp.path()).is_empty());
        write(
            tmp.path(),
            SEASON_LABELS_FILE,
            r#"{"2024": "Errors of Ersen", "later": "x"}"#,
        );
        let labels = load_season_labels(tmp.path());
        assert_eq!(labels.get(&2024).map(String::as_str), Some("Errors of Ersen"));
        assert_eq!(labels.len(), 1);
    }

    #[test]
    fn only_newest_request_commits() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut loader = Loader::new(tmp.path().to_path_buf());
        loader.pending.insert(ViewId::TeamStats, 2);

        let stale = LoadResult {
            seq: 1,
            view: ViewId::TeamStats,
            season: 2023,
            result: Ok(Dataset::empty()),
        };
        assert!(loader.accept(stale).is_none());
        assert!(loader.is_pending(ViewId::TeamStats));

        let current = LoadResult {
            seq: 2,
            view: ViewId::TeamStats,
            season: 2024,
            result: Ok(Dataset::empty()),
        };
        assert!(loader.accept(current).is_some());
        assert!(!loader.is_pending(ViewId::TeamStats));
    }

    #[test]
    fn superseded_request_is_dropped() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write(tmp.path(), "stats_2023.csv", STATS_CSV);
        write(tmp.path(), "stats_2024.csv", STATS_CSV);
        let mut loader = Loader::new(tmp.path().to_path_buf());
        let older = loader.request(ViewId::TeamStats, 2023);
        let newer = loader.request(ViewId::TeamStats, 2024);
        assert!(newer > older);

        let mut committed = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(10);
        while loader.is_pending(ViewId::TeamStats) && Instant::now() < deadline {
            committed.extend(loader.poll_timeout(Duration::from_millis(100)));
        }
        assert_eq!(committed.len(), 1);
        assert_eq!(committed[0].seq, newer);
        assert_eq!(committed[0].season, 2024);
    }
}
