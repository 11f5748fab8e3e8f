//! Versioned application state with reducer style transitions.
//!
//! Every transition that changes something bumps [`AppState::version`], so
//! callers can tell cheaply whether a re-render or a save is due.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, trace};

use crate::adapters::adapter;
use crate::domain::Season;
use crate::filters::{FilterSet, FilterStore};
use crate::persist::PersistedState;
use crate::table::{DataTable, SortSpec, TableOutput, filter_rows};
use crate::value::Dataset;
use crate::views::ViewId;

#[derive(Debug, Clone)]
pub enum DataState {
    Idle,
    Loading,
    Ready(Arc<Dataset>),
    Failed(String),
}

static IDLE: DataState = DataState::Idle;

#[derive(Debug, Clone)]
struct ViewSlot {
    /// Season the current data (or pending load) belongs to.
    requested: Option<Season>,
    data: DataState,
    table: DataTable,
}

impl ViewSlot {
    fn new(view: ViewId) -> Self {
        Self {
            requested: None,
            data: DataState::Idle,
            table: DataTable::new(view),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    version: u64,
    view: ViewId,
    season: Option<Season>,
    seasons: Vec<Season>,
    filters: FilterStore,
    slots: BTreeMap<ViewId, ViewSlot>,
}

impl AppState {
    pub fn new(seasons: Vec<Season>, season: Option<Season>, view: ViewId) -> Self {
        Self {
            version: 0,
            view,
            season,
            seasons,
            filters: FilterStore::new(),
            slots: ViewId::ALL.into_iter().map(|v| (v, ViewSlot::new(v))).collect(),
        }
    }

    /// Restores season, tab and filters. Values that no longer make sense
    /// (unknown tab, season without data) fall back to the given defaults.
    pub fn restore(
        seasons: Vec<Season>,
        persisted: &PersistedState,
        default_season: Option<Season>,
        default_view: ViewId,
    ) -> Self {
        let season = persisted
            .season
            .filter(|s| seasons.contains(s))
            .or(default_season);
        let view = persisted
            .tab
            .as_deref()
            .and_then(ViewId::from_tag)
            .unwrap_or(default_view);
        let mut state = AppState::new(seasons, season, view);
        state.filters = FilterStore::from_persisted(&persisted.filters);
        state
    }

    pub fn to_persisted(&self) -> PersistedState {
        PersistedState {
            season: self.season,
            tab: Some(self.view.tag().to_string()),
            filters: self.filters.to_persisted(),
            ..PersistedState::default()
        }
    }

    fn bump(&mut self) {
        self.version += 1;
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn view(&self) -> ViewId {
        self.view
    }

    pub fn season(&self) -> Option<Season> {
        self.season
    }

    pub fn seasons(&self) -> &[Season] {
        &self.seasons
    }

    pub fn filters(&self, view: ViewId) -> &FilterSet {
        self.filters.filters(view)
    }

    pub fn data_state(&self, view: ViewId) -> &DataState {
        self.slots
            .get(&view)
            .map(|s| &s.data)
            .unwrap_or(&IDLE)
    }

    pub fn dataset(&self, view: ViewId) -> Option<&Dataset> {
        match self.data_state(view) {
            DataState::Ready(d) => Some(d.as_ref()),
            _ => None,
        }
    }

    pub fn sort(&self, view: ViewId) -> Option<&SortSpec> {
        self.slots.get(&view).map(|s| s.table.sort())
    }

    fn slot_mut(&mut self, view: ViewId) -> &mut ViewSlot {
        self.slots.entry(view).or_insert_with(|| ViewSlot::new(view))
    }

    pub fn set_filter(&mut self, view: ViewId, column: &str, value: &str) -> bool {
        let changed = self.filters.set_filter(view, column, value);
        if changed {
            self.bump();
        }
        changed
    }

    pub fn clear_filter(&mut self, view: ViewId, column: &str) -> bool {
        let changed = self.filters.clear_filter(view, column);
        if changed {
            self.bump();
        }
        changed
    }

    pub fn clear_all_filters(&mut self, view: ViewId) -> bool {
        let changed = self.filters.clear_all(view);
        if changed {
            self.bump();
        }
        changed
    }

    /// Header activation on `column` of `view`.
    pub fn set_sort(&mut self, view: ViewId, column: &str) {
        self.slot_mut(view).table.toggle_sort(column);
        self.bump();
    }

    pub fn set_view(&mut self, view: ViewId) -> bool {
        if self.view == view {
            return false;
        }
        trace!("View {:?} -> {:?}", self.view, view);
        self.view = view;
        self.bump();
        true
    }

    /// Switches season. Loaded data of other seasons stays in place until a
    /// load for the new season commits; `clear_filters` drops every filter.
    pub fn set_season(&mut self, season: Season, clear_filters: bool) -> bool {
        if self.season == Some(season) {
            return false;
        }
        info!("Season {:?} -> {season}", self.season);
        self.season = Some(season);
        if clear_filters {
            self.filters.clear_everything();
        }
        self.bump();
        true
    }

    pub fn next_season(&self, step: isize) -> Option<Season> {
        if self.seasons.is_empty() {
            return None;
        }
        let len = self.seasons.len() as isize;
        let current = self
            .season
            .and_then(|s| self.seasons.iter().position(|&x| x == s))
            .map(|p| p as isize)
            .unwrap_or(len - 1);
        let next = (current + step).rem_euclid(len) as usize;
        self.seasons.get(next).copied()
    }

    /// True if the view shows (or waits for) data of another season.
    pub fn needs_load(&self, view: ViewId) -> bool {
        self.season.is_some() && self.slots.get(&view).and_then(|s| s.requested) != self.season
    }

    pub fn start_loading(&mut self, view: ViewId, season: Season) {
        let slot = self.slot_mut(view);
        slot.requested = Some(season);
        slot.data = DataState::Loading;
        self.bump();
    }

    /// Forgets what was loaded for `view` so the next check reloads it.
    pub fn invalidate(&mut self, view: ViewId) {
        self.slot_mut(view).requested = None;
        self.bump();
    }

    /// Commits a finished load. Results for a season other than the current
    /// one are ignored. Returns whether the result was applied.
    pub fn dataset_loaded(
        &mut self,
        view: ViewId,
        season: Season,
        result: Result<Dataset, String>,
    ) -> bool {
        if self.season != Some(season) {
            debug!("Ignoring {view:?} data of season {season}, showing {:?}", self.season);
            return false;
        }
        let slot = self.slot_mut(view);
        slot.requested = Some(season);
        match result {
            Ok(dataset) => {
                let dataset = Arc::new(dataset);
                slot.table.sync(Some(dataset.as_ref()));
                slot.data = DataState::Ready(dataset);
            }
            Err(message) => {
                slot.table.sync(None);
                slot.data = DataState::Failed(message);
            }
        }
        self.bump();
        true
    }

    /// True if the view has rows but its filters exclude all of them, which
    /// happens when a filter value of one season does not exist in another.
    pub fn filters_hide_everything(&self, view: ViewId) -> bool {
        let filters = self.filters(view);
        match self.dataset(view) {
            Some(d) if !d.is_empty() && !filters.is_empty() => filter_rows(d, filters).is_empty(),
            _ => false,
        }
    }

    pub fn render(&self, view: ViewId, compact: bool) -> TableOutput {
        let Some(slot) = self.slots.get(&view) else {
            return TableOutput::NoData;
        };
        slot.table.render(
            self.dataset(view),
            adapter(view).columns,
            self.filters(view),
            compact,
        )
    }
}
