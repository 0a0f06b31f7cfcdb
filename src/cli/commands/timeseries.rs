use crate::service::TimeSeriesParams;
use clap::Args;

#[derive(Debug, Clone, Args)]
pub struct TimeSeriesCommand {
    /// Series identifier, e.g. `KEYS.Flow.Inst.1Hour.0.raw`
    #[arg(long)]
    pub name: String,

    /// Office owning the series
    #[arg(long, env = "TIDEWATER_OFFICE")]
    pub office: Option<String>,

    /// Concrete unit, or SI / EN
    #[arg(long, default_value = "EN")]
    pub units: String,

    /// Window start (defaults to 24 hours before end)
    #[arg(long)]
    pub begin: Option<String>,

    /// Window end (defaults to now)
    #[arg(long)]
    pub end: Option<String>,

    /// Zone for zone-less times, e.g. America/Chicago
    #[arg(long)]
    pub timezone: Option<String>,

    #[arg(long = "version-date")]
    pub version_date: Option<String>,

    /// unversioned | single-version | max-aggregate
    #[arg(long = "version-type")]
    pub version_type: Option<String>,

    /// Page token from a previous page
    #[arg(long)]
    pub page: Option<String>,

    #[arg(long = "page-size")]
    pub page_size: Option<u32>,

    /// Keep following next-page tokens until the trace is exhausted
    #[arg(long)]
    pub all: bool,
}

impl From<&TimeSeriesCommand> for TimeSeriesParams {
    fn from(cmd: &TimeSeriesCommand) -> Self {
        Self {
            name: cmd.name.clone(),
            office: cmd.office.clone(),
            units: Some(cmd.units.clone()),
            begin: cmd.begin.clone(),
            end: cmd.end.clone(),
            timezone: cmd.timezone.clone(),
            version_date: cmd.version_date.clone(),
            version_type: cmd.version_type.clone(),
            page: cmd.page.clone(),
            page_size: cmd.page_size,
        }
    }
}
