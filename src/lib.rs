//! Versioned time-series retrieval with stateless pagination.
//!
//! A request for a trace is resolved in stages: [`time_window`] pins the begin/end
//! parameters to instants and a zone, [`version`] picks the version mode, [`cursor`]
//! decodes the page token, and [`query`] issues one bounded store query per page.

pub mod cli;
pub mod config;
pub mod cursor;
pub mod error;
pub mod query;
pub mod series_id;
pub mod service;
pub mod storage;
pub mod time_window;
pub mod units;
pub mod version;

// Re-export commonly used types
pub use cursor::PageCursor;
pub use error::{Error, ErrorKind, Result};
pub use query::{CatalogPage, CatalogPager, PagedQueryAssembler, TimeSeriesResult};
pub use service::{CatalogParams, TimeSeriesParams, TimeSeriesService};
pub use storage::{CatalogEntry, Sample, SeriesStore};
pub use time_window::{TimeWindow, Zone};
pub use version::{VersionMode, VersionType};
