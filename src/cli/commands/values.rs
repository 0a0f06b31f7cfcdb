use crate::service::DeleteParams;
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Clone, Args)]
pub struct StoreCommand {
    /// JSON file with `name`, `office`, `units`, optional `version-date` and `values`
    #[arg(long, short)]
    pub file: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct DeleteCommand {
    #[arg(long)]
    pub name: String,

    #[arg(long, env = "TIDEWATER_OFFICE")]
    pub office: String,

    #[arg(long)]
    pub begin: Option<String>,

    #[arg(long)]
    pub end: Option<String>,

    #[arg(long)]
    pub timezone: Option<String>,

    /// Version to delete from; required for versioned series
    #[arg(long = "version-date")]
    pub version_date: Option<String>,
}

impl From<&DeleteCommand> for DeleteParams {
    fn from(cmd: &DeleteCommand) -> Self {
        Self {
            name: cmd.name.clone(),
            office: cmd.office.clone(),
            begin: cmd.begin.clone(),
            end: cmd.end.clone(),
            timezone: cmd.timezone.clone(),
            version_date: cmd.version_date.clone(),
        }
    }
}
