use crate::cursor::PageCursor;
use crate::error::Result;
use crate::storage::{CatalogEntry, SeriesStore};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument};

/// One page of the series catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CatalogPage {
    /// Identifier this page starts after, `None` on the first page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor_key: Option<String>,
    pub total: u64,
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page: Option<String>,
    pub entries: Vec<CatalogEntry>,
}

/// Pages through series identifiers in case-insensitive order.
#[derive(Clone)]
pub struct CatalogPager {
    store: Arc<dyn SeriesStore>,
}

impl CatalogPager {
    pub fn new(store: Arc<dyn SeriesStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, cursor), fields(page_size = cursor.page_size))]
    pub async fn fetch_catalog_page(
        &self,
        office: Option<&str>,
        cursor: &PageCursor,
    ) -> Result<CatalogPage> {
        let total = match cursor.total {
            Some(total) => total,
            None => self.store.count_catalog_entries(office).await?,
        };

        let page_size = cursor.page_size as usize;
        let mut entries = Vec::new();
        let mut next_page = None;
        if page_size > 0 {
            entries = self
                .store
                .list_catalog_entries(office, cursor.position.as_deref(), page_size + 1)
                .await?;
            if entries.len() > page_size {
                entries.truncate(page_size);
                if let Some(last) = entries.last() {
                    next_page = Some(cursor.advance(last.name.clone(), total).encode());
                }
            }
        }

        debug!(total, rows = entries.len(), has_more = next_page.is_some(), "Assembled catalog page");

        Ok(CatalogPage {
            cursor_key: cursor.position.clone(),
            total,
            page_size: cursor.page_size,
            next_page,
            entries,
        })
    }
}
