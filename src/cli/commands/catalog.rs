use crate::service::CatalogParams;
use clap::Args;

#[derive(Debug, Clone, Args)]
pub struct CatalogCommand {
    /// Restrict the listing to one office
    #[arg(long, env = "TIDEWATER_OFFICE")]
    pub office: Option<String>,

    #[arg(long)]
    pub page: Option<String>,

    #[arg(long = "page-size")]
    pub page_size: Option<u32>,
}

impl From<&CatalogCommand> for CatalogParams {
    fn from(cmd: &CatalogCommand) -> Self {
        Self {
            office: cmd.office.clone(),
            page: cmd.page.clone(),
            page_size: cmd.page_size,
        }
    }
}
