//! Table view engine: tabs over one field, per column sorting and substring
//! search on a selected column, derived from a collection of flat records.
//!
//! Layers:
//! - `recordset`, `partition`, `columns`, `filter`: the derivation steps
//! - `view`: view state, its reducer and the view model handed to renderers
//! - `table`, `controller`: the Ready-state bundle and the load/event state machine
//! - `source`: data sources feeding the controller

pub mod columns;
pub mod config;
pub mod controller;
pub mod domain;
pub mod filter;
pub mod partition;
pub mod record;
pub mod recordset;
pub mod source;
pub mod table;
pub mod view;

pub use config::{SchemaPolicy, TableConfig};
pub use controller::{Renderer, TableController};
pub use domain::{Message, Partition, SortDirection, Status, TableError};
pub use record::Record;
pub use recordset::{RecordSet, RowHandle};
pub use source::{DataSource, FileSource, JsonFileSource, MemorySource};
pub use view::{ViewModel, ViewState};
