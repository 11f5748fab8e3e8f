use arboard::Clipboard;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

use crate::adapters::adapter;
use crate::domain::{DiamondConfig, DiamondError, HELP_TEXT, Message, Season};
use crate::loader::{LoadResult, Loader};
use crate::persist::PersistedState;
use crate::state::{AppState, DataState};
use crate::table::{FilterControl, RenderedTable, SortDirection, TableOutput};
use crate::views::{CellAlign, ViewId, header_label};
use crate::ui::{
    COLUMN_WIDTH_MARGIN, FILTER_BAR_HEIGHT, SORT_ARROW_WIDTH, STATUSLINE_HEIGHT, TABLE_HEADER_HEIGHT,
    TABS_HEIGHT,
};

const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(8);

#[derive(Debug, PartialEq)]
pub enum Status {
    Ready,
    Quitting,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    Table,
    FilterPicker,
    Popup,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnView {
    pub name: String,
    pub width: usize,
    pub align: CellAlign,
    pub sorted: Option<SortDirection>,
    pub data: Vec<String>,
}

/// What to show instead of a table.
#[derive(Clone, Debug, PartialEq)]
pub enum Placeholder {
    NoSeasons,
    Loading,
    NoData,
    Failed(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct PickerView {
    pub columns: Vec<String>,
    pub selected_column: usize,
    /// First entry is always "All".
    pub options: Vec<String>,
    pub selected_option: usize,
}

pub struct UIData {
    pub tabs: Vec<&'static str>,
    pub active_tab: usize,
    pub season_label: String,
    pub table: Vec<ColumnView>,
    pub placeholder: Option<Placeholder>,
    pub nrows: usize, // Rows left after filtering
    pub total_rows: usize,
    pub selected_row: usize,
    pub selected_column: usize,
    pub abs_selected_row: usize,
    pub active_filters: Vec<(String, String)>,
    pub filterable: bool,
    pub picker: Option<PickerView>,
    pub show_popup: bool,
    pub popup_message: String,
    pub compact: bool,
    pub status_message: String,
    pub last_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            tabs: ViewId::ALL.iter().map(|v| v.title()).collect(),
            active_tab: 0,
            season_label: String::new(),
            table: Vec::new(),
            placeholder: Some(Placeholder::NoData),
            nrows: 0,
            total_rows: 0,
            selected_row: 0,
            selected_column: 0,
            abs_selected_row: 0,
            active_filters: Vec::new(),
            filterable: false,
            picker: None,
            show_popup: false,
            popup_message: String::new(),
            compact: false,
            status_message: String::new(),
            last_update: Instant::now(),
        }
    }
}

#[derive(Default, Clone, Debug)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_width: usize,
    pub table_height: usize,
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize) -> Self {
        let chrome = TABS_HEIGHT + FILTER_BAR_HEIGHT + TABLE_HEADER_HEIGHT + STATUSLINE_HEIGHT;
        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_width: ui_width,
            table_height: ui_height.saturating_sub(chrome).max(1),
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

pub struct Model {
    config: DiamondConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    state: AppState,
    loader: Loader,
    season_labels: BTreeMap<Season, String>,
    output: TableOutput,
    rendered: Option<(u64, bool)>, // (state version, compact) of `output`
    saved_version: u64,
    curser_row: usize,
    offset_row: usize,
    curser_column: usize,
    offset_column: usize,
    picker_column: usize,
    picker_option: usize,
    compact_override: Option<bool>,
    uilayout: UILayout,
    uidata: UIData,
    clipboard: Option<Clipboard>,
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn init(
        config: &DiamondConfig,
        state: AppState,
        season_labels: BTreeMap<Season, String>,
        ui_width: usize,
        ui_height: usize,
    ) -> Self {
        let saved_version = state.version();
        let mut model = Self {
            config: config.clone(),
            status: Status::Ready,
            modus: Modus::Table,
            previous_modus: Modus::Table,
            loader: Loader::new(config.data_dir.clone()),
            state,
            season_labels,
            output: TableOutput::NoData,
            rendered: None,
            saved_version,
            curser_row: 0,
            offset_row: 0,
            curser_column: 0,
            offset_column: 0,
            picker_column: 0,
            picker_option: 0,
            compact_override: None,
            uilayout: UILayout::from_values(ui_width, ui_height),
            uidata: UIData::empty(),
            clipboard: None,
            status_message: "Started diamond!".to_string(),
            last_status_message_update: Instant::now(),
        };
        if model.state.season().is_none() {
            model.set_status_message(format!(
                "No season data found in {}",
                model.config.data_dir.display()
            ));
        }
        model.ensure_loaded();
        model.refresh();
        model
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn quit(&mut self) {
        self.status = Status::Quitting;
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
        trace!("Status: {}", self.status_message);
    }

    fn compact(&self) -> bool {
        self.compact_override.unwrap_or(
            self.config.force_compact || self.uilayout.width < self.config.compact_width,
        )
    }

    fn season_label(&self, season: Season) -> String {
        match self.season_labels.get(&season) {
            Some(label) => format!("{label} ({season})"),
            None => season.to_string(),
        }
    }

    fn columns(&self) -> &'static [&'static str] {
        adapter(self.state.view()).columns
    }

    fn rendered_table(&self) -> Option<&RenderedTable> {
        self.output.rendered()
    }

    fn filter_controls(&self) -> &[FilterControl] {
        self.rendered_table()
            .map(|t| t.filter_controls.as_slice())
            .unwrap_or(&[])
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), DiamondError> {
        let results = self.loader.poll();
        self.apply_loads(results);

        if let Some(msg) = message {
            match self.modus {
                Modus::Table => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveDown => self.move_selection_down(1),
                    Message::MoveUp => self.move_selection_up(1),
                    Message::MovePageDown => {
                        self.move_selection_down(self.uilayout.table_height)
                    }
                    Message::MovePageUp => self.move_selection_up(self.uilayout.table_height),
                    Message::MoveBeginning => self.move_selection_beginning(),
                    Message::MoveEnd => self.move_selection_end(),
                    Message::MoveLeft => self.move_column_left(),
                    Message::MoveRight => self.move_column_right(),
                    Message::NextView => self.select_view(self.state.view().next()),
                    Message::PrevView => self.select_view(self.state.view().prev()),
                    Message::SelectView(view) => self.select_view(view),
                    Message::NextSeason => self.step_season(1),
                    Message::PrevSeason => self.step_season(-1),
                    Message::ToggleSort | Message::Enter => self.sort_current_column(),
                    Message::Filter => self.open_filter_picker(),
                    Message::ClearFilter => self.clear_current_column_filter(),
                    Message::ClearAllFilters => self.clear_all_filters(),
                    Message::ToggleCompact => self.toggle_compact(),
                    Message::CopyRow => self.copy_table_row(),
                    Message::Reload => self.reload(),
                    Message::Help => self.show_help(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    Message::Exit => {}
                },
                Modus::FilterPicker => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveDown => self.move_picker_option(1),
                    Message::MoveUp => self.move_picker_option(-1),
                    Message::MoveRight | Message::NextView => self.move_picker_column(1),
                    Message::MoveLeft | Message::PrevView => self.move_picker_column(-1),
                    Message::Enter | Message::ToggleSort => self.apply_picker(),
                    Message::ClearFilter => self.clear_picker_filter(),
                    Message::Exit | Message::Filter => self.exit(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::Popup => match msg {
                    Message::Quit => self.quit(),
                    Message::Exit | Message::Enter | Message::Help => self.exit(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
            }
        }

        self.ensure_loaded();
        self.persist();
        self.refresh();
        Ok(())
    }

    // -------------------- Data loading ---------------------- //

    fn ensure_loaded(&mut self) {
        let view = self.state.view();
        if let Some(season) = self.state.season()
            && self.state.needs_load(view)
        {
            self.loader.request(view, season);
            self.state.start_loading(view, season);
            self.set_status_message(format!(
                "Loading {} {} ...",
                view.title(),
                self.season_label(season)
            ));
        }
    }

    fn apply_loads(&mut self, results: Vec<LoadResult>) {
        for LoadResult {
            view,
            season,
            result,
            ..
        } in results
        {
            let result = result.map_err(|e| e.to_string());
            let failed = result.as_ref().err().cloned();
            let rows = result.as_ref().map(|d| d.len()).unwrap_or(0);
            if !self.state.dataset_loaded(view, season, result) {
                continue;
            }
            if view != self.state.view() {
                continue;
            }
            self.curser_row = 0;
            self.offset_row = 0;
            if let Some(e) = failed {
                self.set_status_message(format!("Could not load {}: {e}", view.title()));
            } else if self.state.filters_hide_everything(view) {
                warn!("Active filters of {view:?} match none of the {season} rows");
                self.set_status_message(format!(
                    "Active filters hide all {rows} rows of {season}, press X to clear"
                ));
            } else {
                self.set_status_message(format!("Loaded {rows} rows"));
            }
        }
    }

    fn reload(&mut self) {
        let view = self.state.view();
        info!("Reloading {view:?}");
        self.state.invalidate(view);
    }

    fn persist(&mut self) {
        if self.state.version() == self.saved_version {
            return;
        }
        self.saved_version = self.state.version();
        let Some(path) = &self.config.state_file else {
            return;
        };
        let persisted: PersistedState = self.state.to_persisted();
        if let Err(e) = persisted.save(path) {
            error!("Saving state to {} failed: {e}", path.display());
        }
    }

    // -------------------- Rendering ---------------------- //

    /// Re-runs the table engine if state or layout changed and rebuilds the
    /// data handed to the UI.
    fn refresh(&mut self) {
        let key = (self.state.version(), self.compact());
        if self.rendered != Some(key) {
            self.output = self.state.render(self.state.view(), key.1);
            self.rendered = Some(key);
            self.clamp_selection();
        }
        self.update_uidata();
    }

    fn clamp_selection(&mut self) {
        let nrows = self.rendered_table().map(|t| t.rows.len()).unwrap_or(0);
        let abs = (self.offset_row + self.curser_row).min(nrows.saturating_sub(1));
        let height = self.uilayout.table_height;
        if abs < self.offset_row || abs >= self.offset_row + height {
            self.offset_row = abs.saturating_sub(height.saturating_sub(1));
        }
        self.curser_row = abs - self.offset_row;
        self.curser_column = self.curser_column.min(self.columns().len().saturating_sub(1));
        self.offset_column = self.offset_column.min(self.curser_column);
    }

    fn calculate_column_width(label: &str, data: &[String], max_column_width: usize) -> usize {
        let widest = data.iter().map(|s| s.chars().count()).max().unwrap_or(0);
        std::cmp::min(
            std::cmp::max(label.chars().count() + SORT_ARROW_WIDTH, widest) + COLUMN_WIDTH_MARGIN,
            max_column_width,
        )
    }

    fn placeholder(&self) -> Option<Placeholder> {
        if self.state.season().is_none() {
            return Some(Placeholder::NoSeasons);
        }
        match (self.state.data_state(self.state.view()), &self.output) {
            (_, TableOutput::Table(_)) => None,
            (DataState::Loading, _) => Some(Placeholder::Loading),
            (DataState::Failed(e), _) => Some(Placeholder::Failed(e.clone())),
            _ => Some(Placeholder::NoData),
        }
    }

    fn update_uidata(&mut self) {
        let view = self.state.view();
        let mut table = Vec::new();
        let mut nrows = 0;
        let mut total_rows = 0;

        if let Some(rendered) = self.output.rendered() {
            nrows = rendered.rows.len();
            total_rows = rendered.total_rows;
            let rbegin = self.offset_row.min(nrows);
            let rend = std::cmp::min(rbegin + self.uilayout.table_height, nrows);

            // Columns from offset_column that fit into the table width
            let mut visible_width = 0;
            for (cidx, header) in rendered.headers.iter().enumerate().skip(self.offset_column) {
                let all: Vec<String> = rendered.rows.iter().map(|r| r[cidx].clone()).collect();
                let width =
                    Self::calculate_column_width(&header.label, &all, self.config.max_column_width);
                if visible_width + width + 1 > self.uilayout.table_width && !table.is_empty() {
                    break;
                }
                visible_width += width + 1;
                table.push(ColumnView {
                    name: header.label.clone(),
                    width,
                    align: header.align,
                    sorted: header.sorted,
                    data: all[rbegin..rend].to_vec(),
                });
            }
        }

        let filters = self.state.filters(view);
        let active_filters = filters
            .active()
            .map(|(column, value)| (header_label(view, column, true), value.to_string()))
            .collect();

        let picker = (self.modus == Modus::FilterPicker).then(|| self.picker_view());

        self.uidata = UIData {
            tabs: ViewId::ALL.iter().map(|v| v.title()).collect(),
            active_tab: view.index(),
            season_label: self
                .state
                .season()
                .map(|s| self.season_label(s))
                .unwrap_or_else(|| "no season".to_string()),
            table,
            placeholder: self.placeholder(),
            nrows,
            total_rows,
            selected_row: self.curser_row,
            selected_column: self.curser_column.saturating_sub(self.offset_column),
            abs_selected_row: self.offset_row + self.curser_row,
            active_filters,
            filterable: !self.filter_controls().is_empty(),
            picker: picker.flatten(),
            show_popup: self.modus == Modus::Popup,
            popup_message: HELP_TEXT.to_string(),
            compact: self.compact(),
            status_message: if self.last_status_message_update.elapsed() < STATUS_MESSAGE_TTL {
                self.status_message.clone()
            } else {
                String::new()
            },
            last_update: Instant::now(),
        };
    }

    fn picker_view(&self) -> Option<PickerView> {
        let controls = self.filter_controls();
        let control = controls.get(self.picker_column)?;
        let mut options = vec!["All".to_string()];
        options.extend(control.options.iter().cloned());
        Some(PickerView {
            columns: controls.iter().map(|c| c.label.clone()).collect(),
            selected_column: self.picker_column,
            options,
            selected_option: self.picker_option,
        })
    }

    // -------------------- Control handling functions ---------------------- //

    fn select_view(&mut self, view: ViewId) {
        if self.state.set_view(view) {
            self.curser_row = 0;
            self.offset_row = 0;
            self.curser_column = 0;
            self.offset_column = 0;
            self.set_status_message(view.title());
        }
    }

    fn step_season(&mut self, step: isize) {
        let Some(season) = self.state.next_season(step) else {
            self.set_status_message("No seasons available");
            return;
        };
        if self
            .state
            .set_season(season, self.config.clear_filters_on_season_change)
        {
            self.curser_row = 0;
            self.offset_row = 0;
        }
    }

    fn sort_current_column(&mut self) {
        if self.rendered_table().is_none() {
            return;
        }
        if let Some(column) = self.columns().get(self.curser_column) {
            self.state.set_sort(self.state.view(), column);
        }
    }

    fn open_filter_picker(&mut self) {
        // Start on the filter of the selected column if it has one
        let selected = self.columns().get(self.curser_column).copied();
        let controls = self.filter_controls();
        let Some(column) = controls
            .iter()
            .position(|c| Some(c.column.as_str()) == selected)
            .or((!controls.is_empty()).then_some(0))
        else {
            self.set_status_message("No filters for this tab");
            return;
        };
        let option = Self::picker_position(&controls[column]);
        self.picker_column = column;
        self.picker_option = option;
        self.previous_modus = self.modus;
        self.modus = Modus::FilterPicker;
    }

    fn picker_position(control: &FilterControl) -> usize {
        control
            .selected
            .as_ref()
            .and_then(|s| control.options.iter().position(|o| o == s))
            .map(|p| p + 1)
            .unwrap_or(0)
    }

    fn move_picker_column(&mut self, step: isize) {
        let controls = self.filter_controls();
        if controls.is_empty() {
            return;
        }
        let len = controls.len() as isize;
        let column = (self.picker_column as isize + step).rem_euclid(len) as usize;
        self.picker_option = Self::picker_position(&controls[column]);
        self.picker_column = column;
    }

    fn move_picker_option(&mut self, step: isize) {
        let Some(control) = self.filter_controls().get(self.picker_column) else {
            return;
        };
        let last = control.options.len() as isize; // index 0 is "All"
        self.picker_option = (self.picker_option as isize + step).clamp(0, last) as usize;
    }

    fn apply_picker(&mut self) {
        let view = self.state.view();
        let Some(control) = self.filter_controls().get(self.picker_column).cloned() else {
            self.exit();
            return;
        };
        match self.picker_option {
            0 => {
                self.state.clear_filter(view, &control.column);
                self.set_status_message(format!("{}: all", control.label));
            }
            n => {
                if let Some(value) = control.options.get(n - 1) {
                    self.state.set_filter(view, &control.column, value);
                    self.set_status_message(format!("{} = {value}", control.label));
                }
            }
        }
        self.curser_row = 0;
        self.offset_row = 0;
        self.exit();
    }

    fn clear_picker_filter(&mut self) {
        if let Some(control) = self.filter_controls().get(self.picker_column).cloned() {
            self.state.clear_filter(self.state.view(), &control.column);
            self.picker_option = 0;
        }
    }

    fn clear_current_column_filter(&mut self) {
        let view = self.state.view();
        let Some(column) = self.columns().get(self.curser_column).copied() else {
            return;
        };
        if self.state.clear_filter(view, column) {
            self.set_status_message(format!("Cleared filter on {column}"));
        }
    }

    fn clear_all_filters(&mut self) {
        if self.state.clear_all_filters(self.state.view()) {
            self.set_status_message("Cleared all filters");
        }
    }

    fn toggle_compact(&mut self) {
        let compact = !self.compact();
        self.compact_override = Some(compact);
        debug!("Compact headers: {compact}");
    }

    fn exit(&mut self) {
        if self.modus != Modus::Table {
            self.modus = self.previous_modus;
            self.previous_modus = Modus::Table;
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::Popup;
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(width, height);
        self.clamp_selection();
    }

    fn wrap_cell_content(c: &str) -> String {
        let needs_escaping = c.chars().any(|c| c == '"');
        let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
        let mut out = String::from(c);

        if needs_escaping {
            out = out.replace('"', "\"\"");
        }
        if needs_wrapping {
            out = format!("\"{out}\"");
        }
        out
    }

    fn selected_row_text(&self) -> Option<String> {
        let table = self.rendered_table()?;
        let row = table.rows.get(self.offset_row + self.curser_row)?;
        Some(
            row.iter()
                .map(|c| Model::wrap_cell_content(c))
                .collect::<Vec<String>>()
                .join(","),
        )
    }

    fn copy_table_row(&mut self) {
        let Some(row_content) = self.selected_row_text() else {
            return;
        };
        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(c) => self.clipboard = Some(c),
                Err(e) => {
                    error!("Clipboard unavailable: {e:?}");
                    self.set_status_message("Clipboard unavailable");
                    return;
                }
            }
        }
        if let Some(clipboard) = self.clipboard.as_mut() {
            let result = clipboard.set_text(row_content);
            self.report_copy(result);
        }
    }

    fn report_copy(&mut self, result: Result<(), arboard::Error>) {
        match result {
            Ok(_) => {
                trace!("Copied row content to clipboard.");
                self.set_status_message("Copied row");
            }
            Err(e) => {
                error!("Error copying to clipboard: {e:?}");
                self.set_status_message("Copy failed");
            }
        }
    }

    fn nrows(&self) -> usize {
        self.rendered_table().map(|t| t.rows.len()).unwrap_or(0)
    }

    fn move_selection_beginning(&mut self) {
        self.curser_row = 0;
        self.offset_row = 0;
    }

    fn move_selection_end(&mut self) {
        let nrows = self.nrows();
        let height = self.uilayout.table_height;
        if nrows == 0 {
            return;
        }
        if nrows < height {
            self.offset_row = 0;
            self.curser_row = nrows - 1;
        } else {
            self.offset_row = nrows - height;
            self.curser_row = height - 1;
        }
    }

    fn move_selection_up(&mut self, size: usize) {
        if self.curser_row > 0 {
            // Curser somewhere in the middle
            self.curser_row = self.curser_row.saturating_sub(size);
        } else if self.offset_row > 0 {
            // Curser at the top, shift table up
            self.offset_row = self.offset_row.saturating_sub(size);
        }
    }

    fn move_selection_down(&mut self, size: usize) {
        let nrows = self.nrows();
        let height = self.uilayout.table_height;
        if self.curser_row + self.offset_row + 1 >= nrows {
            return;
        }
        let target = std::cmp::min(self.offset_row + self.curser_row + size, nrows - 1);
        if target < self.offset_row + height {
            self.curser_row = target - self.offset_row;
        } else {
            // At the bottom of the table, need to shift table down
            self.offset_row = target + 1 - height;
            self.curser_row = height - 1;
        }
    }

    fn move_column_left(&mut self) {
        if self.curser_column > 0 {
            self.curser_column -= 1;
        }
        if self.curser_column < self.offset_column {
            self.offset_column = self.curser_column;
        }
    }

    fn move_column_right(&mut self) {
        if self.curser_column + 1 < self.columns().len() {
            self.curser_column += 1;
        }
        // Scroll right until the selected column is rendered
        self.update_uidata();
        while self.curser_column >= self.offset_column + self.uidata.table.len().max(1)
            && self.offset_column < self.curser_column
        {
            self.offset_column += 1;
            self.update_uidata();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    const LEADERS: &str = "\
week,teams,val,stat
1,Team A,5,HR
2,Team B,3,RBI
1,Team C,7,SB
2,Team A,0.312,AVG
";

    const STATS_2024: &str = "\
week,team_name,R,HR,AVG,ERA
1,Team A,10,2,0.3,3.0
1,Team B,8,3,0.25,2.5
2,Team A,12,4,0.35,2.0
";

    const STATS_2023: &str = "\
week,team_name,R,HR,AVG,ERA
1,Team X,10,2,0.3,3.0
";

    fn fixture_dir() -> tempfile::TempDir {
        let tmp = tempfile::tempdir().expect("tempdir");
        let write = |name: &str, content: &str| {
            fs::write(tmp.path().join(name), content).expect("write fixture")
        };
        write("leaders_2024.csv", LEADERS);
        write("stats_2024.csv", STATS_2024);
        write("stats_2023.csv", STATS_2023);
        write(
            "standings_2024.csv",
            "team_name,rank,percentage,Expected Points\nTeam A,2,0.5,50\nTeam B,1,0.6,70\n",
        );
        tmp
    }

    fn model(dir: &Path, view: ViewId) -> Model {
        let config = DiamondConfig::default()
            .data_dir(dir.to_path_buf())
            .state_file(Some(dir.join("state.json")));
        let state = AppState::new(vec![2023, 2024], Some(2024), view);
        let mut model = Model::init(&config, state, BTreeMap::new(), 160, 40);
        wait_for_data(&mut model);
        model
    }

    fn wait_for_data(model: &mut Model) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while model.loader.is_pending(model.state.view()) && Instant::now() < deadline {
            let results = model.loader.poll_timeout(Duration::from_millis(50));
            model.apply_loads(results);
        }
        model.refresh();
    }

    fn send(model: &mut Model, message: Message) {
        model.update(Some(message)).expect("update");
    }

    fn column(model: &Model, name: &str) -> Vec<String> {
        model
            .get_uidata()
            .table
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.data.clone())
            .unwrap_or_default()
    }

    #[test]
    fn loads_active_view_and_applies_default_sort() {
        let tmp = fixture_dir();
        let model = model(tmp.path(), ViewId::Standings);
        let ui = model.get_uidata();
        assert_eq!(ui.placeholder, None);
        assert_eq!(column(&model, "TEAM"), ["Team B", "Team A"]);
        assert_eq!(column(&model, "PCT"), [".600", ".500"]);
        assert_eq!(ui.table[1].sorted, Some(SortDirection::Ascending));
    }

    #[test]
    fn failed_copy_is_reported() {
        let tmp = fixture_dir();
        let mut model = model(tmp.path(), ViewId::Standings);
        model.report_copy(Err(arboard::Error::ContentNotAvailable));
        assert_eq!(model.status_message, "Copy failed");
        model.report_copy(Ok(()));
        assert_eq!(model.status_message, "Copied row");
    }

    #[test]
    fn sort_toggle_on_selected_column() {
        let tmp = fixture_dir();
        let mut model = model(tmp.path(), ViewId::Standings);
        // rank is the second column
        send(&mut model, Message::MoveRight);
        send(&mut model, Message::ToggleSort);
        assert_eq!(column(&model, "TEAM"), ["Team A", "Team B"]);
        send(&mut model, Message::ToggleSort);
        assert_eq!(column(&model, "TEAM"), ["Team B", "Team A"]);
    }

    #[test]
    fn filter_picker_sets_and_clears_filters() {
        let tmp = fixture_dir();
        let mut model = model(tmp.path(), ViewId::WeeklyLeaders);
        assert_eq!(model.get_uidata().nrows, 4);

        send(&mut model, Message::Filter);
        let picker = model.get_uidata().picker.clone().expect("picker");
        assert_eq!(picker.columns, ["WEEK", "STAT"]);
        assert_eq!(picker.options, ["All", "1", "2"]);

        send(&mut model, Message::MoveDown);
        send(&mut model, Message::Enter);
        assert!(model.get_uidata().picker.is_none());
        assert_eq!(model.state().filters(ViewId::WeeklyLeaders).get("week"), "1");
        assert_eq!(model.get_uidata().nrows, 2);
        assert_eq!(column(&model, "TEAM"), ["Team A", "Team C"]);

        send(&mut model, Message::ClearAllFilters);
        assert_eq!(model.get_uidata().nrows, 4);
    }

    #[test]
    fn weekly_value_formatted_by_stat() {
        let tmp = fixture_dir();
        let model = model(tmp.path(), ViewId::WeeklyLeaders);
        assert_eq!(column(&model, "VALUE"), ["5", "7", "3", ".312"]);
    }

    #[test]
    fn standings_has_no_filters() {
        let tmp = fixture_dir();
        let mut model = model(tmp.path(), ViewId::Standings);
        assert!(!model.get_uidata().filterable);
        send(&mut model, Message::Filter);
        assert!(model.get_uidata().picker.is_none());
    }

    #[test]
    fn season_switch_reloads_and_keeps_filters() {
        let tmp = fixture_dir();
        let mut model = model(tmp.path(), ViewId::TeamStats);
        model
            .state
            .set_filter(ViewId::TeamStats, "team_name", "Team A");
        model.refresh();
        assert_eq!(model.get_uidata().nrows, 2);

        send(&mut model, Message::PrevSeason);
        assert_eq!(model.state().season(), Some(2023));
        wait_for_data(&mut model);
        // the 2024 filter value does not exist in 2023
        assert_eq!(model.get_uidata().nrows, 0);
        assert_eq!(model.get_uidata().total_rows, 1);
        assert!(model.get_uidata().status_message.contains("hide all"));
    }

    #[test]
    fn missing_season_file_shows_failure() {
        let tmp = fixture_dir();
        let mut model = model(tmp.path(), ViewId::TeamStats);
        send(&mut model, Message::PrevSeason);
        send(&mut model, Message::SelectView(ViewId::WeeklyLeaders));
        wait_for_data(&mut model);
        assert!(matches!(
            model.get_uidata().placeholder,
            Some(Placeholder::Failed(_))
        ));
        // interactions on an empty table are no-ops
        send(&mut model, Message::ToggleSort);
        send(&mut model, Message::MoveDown);
        send(&mut model, Message::Filter);
        assert!(model.get_uidata().table.is_empty());
    }

    #[test]
    fn state_is_persisted_on_change() {
        let tmp = fixture_dir();
        let mut model = model(tmp.path(), ViewId::WeeklyLeaders);
        model.state.set_filter(ViewId::WeeklyLeaders, "stat", "HR");
        send(&mut model, Message::NextView);
        let saved = PersistedState::load(&tmp.path().join("state.json")).expect("saved");
        assert_eq!(saved.tab.as_deref(), Some("team-stats"));
        assert_eq!(saved.filters["weekly-leaders"]["stat"], "HR");
    }

    #[test]
    fn navigation_stays_in_bounds() {
        let tmp = fixture_dir();
        let mut model = model(tmp.path(), ViewId::WeeklyLeaders);
        send(&mut model, Message::MoveUp);
        assert_eq!(model.get_uidata().abs_selected_row, 0);
        for _ in 0..10 {
            send(&mut model, Message::MoveDown);
        }
        assert_eq!(model.get_uidata().abs_selected_row, 3);
        send(&mut model, Message::MoveBeginning);
        assert_eq!(model.get_uidata().abs_selected_row, 0);
        send(&mut model, Message::MoveEnd);
        assert_eq!(model.get_uidata().abs_selected_row, 3);
        for _ in 0..10 {
            send(&mut model, Message::MoveRight);
        }
        assert_eq!(model.curser_column, 3);
    }

    #[test]
    fn compact_headers_follow_width_and_toggle() {
        let tmp = fixture_dir();
        let mut model = model(tmp.path(), ViewId::WeeklyLeaders);
        assert!(!model.get_uidata().compact);
        assert_eq!(model.get_uidata().table[0].name, "WEEK");
        send(&mut model, Message::Resize(60, 40));
        assert!(model.get_uidata().compact);
        assert_eq!(model.get_uidata().table[0].name, "WK");
        send(&mut model, Message::ToggleCompact);
        assert!(!model.get_uidata().compact);
    }

    #[test]
    fn row_text_is_csv_quoted() {
        assert_eq!(Model::wrap_cell_content("Team A"), "\"Team A\"");
        assert_eq!(Model::wrap_cell_content("5"), "5");
        assert_eq!(Model::wrap_cell_content("a\"b"), "a\"\"b");
    }

    #[test]
    fn help_popup_opens_and_closes() {
        let tmp = fixture_dir();
        let mut model = model(tmp.path(), ViewId::Standings);
        send(&mut model, Message::Help);
        assert!(model.get_uidata().show_popup);
        send(&mut model, Message::Exit);
        assert!(!model.get_uidata().show_popup);
    }
}
