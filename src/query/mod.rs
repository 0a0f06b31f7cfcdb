//! Paged retrieval over a [`SeriesStore`](crate::storage::SeriesStore).
//!
//! [`PagedQueryAssembler`] pages through the samples of one series inside a resolved
//! window; [`CatalogPager`] pages through the catalog of series identifiers. Both use
//! a one-row lookahead so a next-page token is only handed out when more rows exist.

pub mod assembler;
pub mod catalog;

pub use assembler::{PagedQueryAssembler, TimeSeriesResult};
pub use catalog::{CatalogPage, CatalogPager};
