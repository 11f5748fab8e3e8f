//! The data table engine: filtering, sorting and the rendered table contract
//! shared by every view.
//!
//! All functions here are pure with respect to their inputs. The only state
//! is [`DataTable`], which holds the active sort of one table and forgets it
//! whenever a different dataset is shown.

use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::trace;

use crate::filters::FilterSet;
use crate::value::{Dataset, Row, Value, parse_number};
use crate::views::{CellAlign, ViewId, cell_alignment, view_config};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flipped(&self) -> SortDirection {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "▲",
            SortDirection::Descending => "▼",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub column: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }

    /// Header activation: the active column flips, any other column becomes
    /// active in ascending order.
    pub fn toggled(&self, column: &str) -> SortSpec {
        if self.column == column {
            SortSpec::new(column, self.direction.flipped())
        } else {
            SortSpec::new(column, SortDirection::Ascending)
        }
    }
}

/// True iff every non-empty constraint equals the row's stringified value.
/// Null and missing cells never satisfy a constraint.
pub fn row_matches(row: &Row, filters: &FilterSet) -> bool {
    filters.active().all(|(column, required)| {
        row.get(column)
            .and_then(Value::as_key)
            .is_some_and(|v| v == required)
    })
}

/// Indices of the rows that pass `filters`, in dataset order.
pub fn filter_rows(dataset: &Dataset, filters: &FilterSet) -> Vec<usize> {
    dataset
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| row_matches(row, filters))
        .map(|(idx, _)| idx)
        .collect()
}

fn sort_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(v) => v.to_string(),
    }
}

/// Numeric reading of a sort key. An empty key sorts as 0.
fn sort_number(key: &str) -> Option<f64> {
    if key.trim().is_empty() {
        Some(0.0)
    } else {
        parse_number(key)
    }
}

/// Ascending comparison of two cells. Two numbers compare numerically, two
/// strings lexicographically. Missing and null cells read as the empty
/// string, which counts as the number 0.
///
/// A number paired with a string always sorts first. This deliberately
/// differs from comparing both as strings: `sort_by` needs a total order.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = sort_text(a);
    let b = sort_text(b);
    match (sort_number(&a), sort_number(&b)) {
        (Some(a_num), Some(b_num)) => a_num.partial_cmp(&b_num).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(&b),
    }
}

/// Stable sort of row indices by `sort`. Ties keep their incoming order in
/// both directions.
pub fn sort_rows(dataset: &Dataset, rows: &mut [usize], sort: &SortSpec) {
    let column = sort.column.as_str();
    let cell = |idx: usize| dataset.row(idx).and_then(|r| r.get(column));
    rows.sort_by(|&a, &b| {
        let ord = compare_values(cell(a), cell(b));
        match sort.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
}

/// Distinct non-null values of `column` across the whole dataset, ordered
/// numerically if all of them are numbers, otherwise lexicographically.
pub fn distinct_values(dataset: &Dataset, column: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut values: Vec<String> = dataset
        .rows()
        .iter()
        .filter_map(|row| row.get(column).and_then(Value::as_key))
        .filter(|v| seen.insert(v.clone()))
        .collect();

    let numeric: Option<Vec<f64>> = values.iter().map(|v| parse_number(v)).collect();
    if let Some(numbers) = numeric {
        let mut pairs: Vec<(f64, String)> = numbers.into_iter().zip(values).collect();
        pairs.sort_by(|(a, _), (b, _)| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        pairs.into_iter().map(|(_, v)| v).collect()
    } else {
        values.sort();
        values
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCell {
    pub column: String,
    pub label: String,
    pub sorted: Option<SortDirection>,
    pub align: CellAlign,
}

/// One dropdown: the "all" choice is implied by `selected == None`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterControl {
    pub column: String,
    pub label: String,
    pub selected: Option<String>,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedTable {
    pub headers: Vec<HeaderCell>,
    pub rows: Vec<Vec<String>>,
    /// Dataset index of every rendered row.
    pub row_indices: Vec<usize>,
    pub total_rows: usize,
    pub filter_controls: Vec<FilterControl>,
    pub active_filters: usize,
    pub sort: SortSpec,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableOutput {
    NoData,
    Table(RenderedTable),
}

impl TableOutput {
    pub fn rendered(&self) -> Option<&RenderedTable> {
        match self {
            TableOutput::NoData => None,
            TableOutput::Table(t) => Some(t),
        }
    }
}

/// Filter controls for the view's filterable columns that are also shown.
pub fn filter_controls(
    view: ViewId,
    dataset: &Dataset,
    columns: &[&str],
    filters: &FilterSet,
) -> Vec<FilterControl> {
    let config = view_config(view);
    config
        .filterable_columns()
        .iter()
        .filter(|c| columns.contains(*c))
        .map(|&column| {
            let selected = Some(filters.get(column))
                .filter(|v| !v.is_empty())
                .map(str::to_string);
            FilterControl {
                column: column.to_string(),
                label: config.header_label(column, false),
                selected,
                options: distinct_values(dataset, column),
            }
        })
        .collect()
}

/// Per-table engine state. Only the sort lives here; filters belong to the
/// filter store.
#[derive(Debug, Clone)]
pub struct DataTable {
    view: ViewId,
    sort: SortSpec,
    dataset_id: Option<u64>,
}

impl DataTable {
    pub fn new(view: ViewId) -> Self {
        Self {
            view,
            sort: view_config(view).default_sort(),
            dataset_id: None,
        }
    }

    pub fn view(&self) -> ViewId {
        self.view
    }

    pub fn sort(&self) -> &SortSpec {
        &self.sort
    }

    /// Notes the dataset about to be shown. A dataset with a new identity
    /// resets the sort to the view default. Returns whether it was new.
    pub fn sync(&mut self, dataset: Option<&Dataset>) -> bool {
        let id = dataset.filter(|d| !d.is_empty()).map(Dataset::id);
        if id == self.dataset_id {
            return false;
        }
        trace!(
            "Table {:?}: dataset {:?} -> {:?}, resetting sort",
            self.view, self.dataset_id, id
        );
        self.dataset_id = id;
        self.sort = view_config(self.view).default_sort();
        true
    }

    pub fn toggle_sort(&mut self, column: &str) {
        self.sort = self.sort.toggled(column);
        trace!("Table {:?}: sort {:?}", self.view, self.sort);
    }

    pub fn set_sort(&mut self, sort: SortSpec) {
        self.sort = sort;
    }

    /// Produces the displayed table. An empty or absent dataset yields
    /// [`TableOutput::NoData`] without filtering or sorting anything.
    pub fn render(
        &self,
        dataset: Option<&Dataset>,
        columns: &[&str],
        filters: &FilterSet,
        compact: bool,
    ) -> TableOutput {
        let Some(dataset) = dataset.filter(|d| !d.is_empty()) else {
            return TableOutput::NoData;
        };
        let config = view_config(self.view);

        let mut indices = filter_rows(dataset, filters);
        sort_rows(dataset, &mut indices, &self.sort);

        let headers = columns
            .iter()
            .map(|&column| HeaderCell {
                column: column.to_string(),
                label: config.header_label(column, compact),
                sorted: (self.sort.column == column).then_some(self.sort.direction),
                align: cell_alignment(column),
            })
            .collect();

        let rows = indices
            .iter()
            .filter_map(|&idx| dataset.row(idx))
            .map(|row| {
                columns
                    .iter()
                    .map(|column| config.format_row_cell(column, row))
                    .collect()
            })
            .collect();

        TableOutput::Table(RenderedTable {
            headers,
            rows,
            row_indices: indices,
            total_rows: dataset.len(),
            filter_controls: filter_controls(self.view, dataset, columns, filters),
            active_filters: filters.active_count(),
            sort: self.sort.clone(),
        })
    }
}
