use crate::cli::commands::{CatalogCommand, DeleteCommand, StoreCommand, TimeSeriesCommand};
use crate::config::ServiceConfig;
use crate::service::{CatalogParams, DeleteParams, StoreValues, TimeSeriesParams, TimeSeriesService};
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", text);
    Ok(())
}

pub async fn handle_timeseries(service: &TimeSeriesService, cmd: &TimeSeriesCommand) -> Result<()> {
    let mut params = TimeSeriesParams::from(cmd);
    // One clock reading for the whole session so every page sees the same default window
    let now = Utc::now();

    loop {
        let page = service
            .retrieve(&params, now)
            .await
            .with_context(|| format!("Failed to retrieve {}", params.name))?;
        print_json(&page)?;

        match page.next_page {
            Some(next) if cmd.all => {
                debug!(rows = page.values.len(), total = page.total, "Following next page");
                params.page = Some(next);
            }
            _ => break,
        }
    }
    Ok(())
}

pub async fn handle_catalog(service: &TimeSeriesService, cmd: &CatalogCommand) -> Result<()> {
    let page = service
        .catalog(&CatalogParams::from(cmd))
        .await
        .context("Failed to list catalog")?;
    print_json(&page)
}

pub async fn handle_store(service: &TimeSeriesService, cmd: &StoreCommand) -> Result<()> {
    let text = tokio::fs::read_to_string(&cmd.file)
        .await
        .with_context(|| format!("Failed to read {}", cmd.file.display()))?;
    let request: StoreValues = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {}", cmd.file.display()))?;

    let written = service
        .store_values(&request)
        .await
        .with_context(|| format!("Failed to store {}", request.name))?;
    info!(written, name = %request.name, "Store complete");
    Ok(())
}

pub async fn handle_delete(service: &TimeSeriesService, cmd: &DeleteCommand) -> Result<()> {
    let deleted = service
        .delete_values(&DeleteParams::from(cmd), Utc::now())
        .await
        .with_context(|| format!("Failed to delete from {}", cmd.name))?;
    info!(deleted, name = %cmd.name, "Delete complete");
    Ok(())
}

pub fn handle_config(config: &ServiceConfig) -> Result<()> {
    print_json(config)
}
