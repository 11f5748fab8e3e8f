use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::views::{ViewId, view_config};

/// Column key to required value. An absent key or an empty value means
/// "match anything" for that column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    values: BTreeMap<String, String>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder used by tests and adapters. Empty values are dropped.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.put(column.into(), value.into());
        self
    }

    pub fn get(&self, column: &str) -> &str {
        self.values.get(column).map(String::as_str).unwrap_or("")
    }

    /// Constraints that actually restrict rows.
    pub fn active(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    pub fn is_empty(&self) -> bool {
        self.active_count() == 0
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.values.clone()
    }

    fn put(&mut self, column: String, value: String) {
        if value.is_empty() {
            self.values.remove(&column);
        } else {
            self.values.insert(column, value);
        }
    }
}

static EMPTY_SET: FilterSet = FilterSet {
    values: BTreeMap::new(),
};

/// Holds the filter set of every view. It is the only writer of filter sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterStore {
    sets: BTreeMap<ViewId, FilterSet>,
}

impl Default for FilterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterStore {
    pub fn new() -> Self {
        Self {
            sets: ViewId::ALL
                .into_iter()
                .map(|v| (v, FilterSet::new()))
                .collect(),
        }
    }

    pub fn filters(&self, view: ViewId) -> &FilterSet {
        self.sets.get(&view).unwrap_or(&EMPTY_SET)
    }

    /// Sets the required value of `column` for `view`. Columns the view does
    /// not offer as filters are ignored so a set never names them.
    /// Returns whether the stored set changed.
    pub fn set_filter(&mut self, view: ViewId, column: &str, value: &str) -> bool {
        if !view_config(view).is_filterable(column) {
            trace!("Ignoring filter on non filterable column {column} for {view:?}");
            return false;
        }
        let set = self.sets.entry(view).or_default();
        if set.get(column) == value {
            return false;
        }
        trace!("Filter {view:?}: {column} = {value:?}");
        set.put(column.to_string(), value.to_string());
        true
    }

    pub fn clear_filter(&mut self, view: ViewId, column: &str) -> bool {
        self.set_filter(view, column, "")
    }

    pub fn clear_all(&mut self, view: ViewId) -> bool {
        let set = self.sets.entry(view).or_default();
        let changed = !set.is_empty();
        *set = FilterSet::new();
        changed
    }

    pub fn clear_everything(&mut self) {
        *self = FilterStore::new();
    }

    /// Persisted form keyed by view tag.
    pub fn to_persisted(&self) -> BTreeMap<String, BTreeMap<String, String>> {
        self.sets
            .iter()
            .map(|(view, set)| (view.tag().to_string(), set.to_map()))
            .collect()
    }

    /// Rebuilds a store from its persisted form. Unknown view tags and
    /// columns that are no longer filterable are dropped, views missing from
    /// the input get an empty set.
    pub fn from_persisted(persisted: &BTreeMap<String, BTreeMap<String, String>>) -> Self {
        let mut store = FilterStore::new();
        for (tag, values) in persisted {
            let Some(view) = ViewId::from_tag(tag) else {
                debug!("Dropping filters of unknown view {tag}");
                continue;
            };
            for (column, value) in values {
                if !store.set_filter(view, column, value) && !value.is_empty() {
                    debug!("Dropping stale filter {tag}.{column}");
                }
            }
        }
        store
    }
}
