//! Terminal dashboard for fantasy baseball seasons.
//!
//! The table engine ([`table`]) is generic: it filters, sorts and formats any
//! [`value::Dataset`] according to a [`views::ViewConfig`] looked up in the
//! registry. [`adapters`] decide which columns each tab shows, [`state`] holds
//! the active tab, season and per-tab filter sets.

pub mod adapters;
pub mod controller;
pub mod domain;
pub mod filters;
pub mod loader;
pub mod model;
pub mod persist;
pub mod state;
pub mod table;
pub mod ui;
pub mod value;
pub mod views;

pub use domain::{DiamondConfig, DiamondError, Season};
pub use filters::{FilterSet, FilterStore};
pub use table::{DataTable, SortDirection, SortSpec, TableOutput};
pub use value::{Dataset, Row, Value};
pub use views::ViewId;
