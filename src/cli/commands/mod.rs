pub mod catalog;
pub mod timeseries;
pub mod values;

pub use catalog::CatalogCommand;
pub use timeseries::TimeSeriesCommand;
pub use values::{DeleteCommand, StoreCommand};

use clap::Subcommand;

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Fetch one page of a trace
    Timeseries(TimeSeriesCommand),

    /// List one page of the series catalog
    Catalog(CatalogCommand),

    /// Store a version of a series from a JSON file
    ///
    /// Values land in the archive named by --engine-connection (default tidewater.duckdb
    /// in the working directory). With :memory: they are gone when the command exits.
    Store(StoreCommand),

    /// Blank out the values of a series inside a window
    Delete(DeleteCommand),

    /// Print the effective configuration
    Config,
}
