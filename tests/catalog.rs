mod common;

use common::{memory_store, service_over};
use tidewater_core::storage::duckdb::DuckDbStore;
use tidewater_core::storage::{SeriesDefinition, SeriesStore};
use tidewater_core::{CatalogParams, TimeSeriesService};

const SWT: &[&str] = &[
    "alpha.Flow.Inst.0.0.raw",
    "Bravo.Stage.Inst.1Hour.0.raw",
    "charlie.Flow.Inst.1Day.0.raw",
    "Delta.Elev.Inst.15Minutes.0.raw",
    "echo.Precip.Total.1Hour.1Hour.rev",
];
const NWD: &[&str] = &["Foxtrot.Flow.Inst.0.0.raw", "golf.Temp.Inst.1Hour.0.raw"];

async fn seeded() -> TimeSeriesService {
    let store = memory_store();
    register(&store, "SWT", SWT).await;
    register(&store, "NWD", NWD).await;
    service_over(store)
}

async fn register(store: &DuckDbStore, office: &str, names: &[&str]) {
    for name in names {
        store
            .create_series(&SeriesDefinition {
                office_id: office.to_string(),
                series_id: name.to_string(),
                storage_unit: "cfs".to_string(),
                versioned: false,
            })
            .await
            .unwrap();
    }
}

async fn collect(service: &TimeSeriesService, office: Option<&str>, page_size: u32) -> (Vec<String>, usize) {
    let mut params = CatalogParams {
        office: office.map(str::to_string),
        page_size: Some(page_size),
        ..Default::default()
    };
    let mut names = Vec::new();
    let mut pages = 0;
    let mut first_total = None;
    loop {
        let page = service.catalog(&params).await.unwrap();
        pages += 1;
        let total = *first_total.get_or_insert(page.total);
        assert_eq!(page.total, total);
        names.extend(page.entries.iter().map(|e| e.name.clone()));
        match page.next_page {
            Some(next) => params.page = Some(next),
            None => break,
        }
        assert!(pages < 20, "catalog paging did not terminate");
    }
    (names, pages)
}

#[tokio::test]
async fn test_office_catalog_pages_in_case_insensitive_order() {
    let service = seeded().await;
    let (names, pages) = collect(&service, Some("swt"), 2).await;
    assert_eq!(names, SWT);
    assert_eq!(pages, 3);
}

#[tokio::test]
async fn test_full_catalog_visits_each_entry_once() {
    let service = seeded().await;
    let (names, pages) = collect(&service, None, 3).await;
    let mut expected: Vec<&str> = SWT.iter().chain(NWD).copied().collect();
    expected.sort_by_key(|n| n.to_uppercase());
    assert_eq!(names, expected);
    assert_eq!(pages, 3);
}

#[tokio::test]
async fn test_exact_page_has_no_next_token() {
    let service = seeded().await;
    let page = service
        .catalog(&CatalogParams {
            office: Some("SWT".into()),
            page_size: Some(5),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.entries.len(), 5);
    assert_eq!(page.total, 5);
    assert!(page.next_page.is_none());
    assert!(page.cursor_key.is_none());
}

#[tokio::test]
async fn test_page_size_zero_reports_total_only() {
    let service = seeded().await;
    let page = service
        .catalog(&CatalogParams {
            page_size: Some(0),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 7);
    assert!(page.entries.is_empty());
    assert!(page.next_page.is_none());
}

#[tokio::test]
async fn test_cursor_key_tracks_last_entry() {
    let service = seeded().await;
    let first = service
        .catalog(&CatalogParams {
            office: Some("SWT".into()),
            page_size: Some(2),
            ..Default::default()
        })
        .await
        .unwrap();
    let second = service
        .catalog(&CatalogParams {
            office: Some("SWT".into()),
            page: first.next_page.clone(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(second.cursor_key.as_deref(), Some("Bravo.Stage.Inst.1Hour.0.raw"));
    assert_eq!(second.entries[0].name, "charlie.Flow.Inst.1Day.0.raw");
    assert_eq!(second.entries[0].office, "SWT");
}

#[tokio::test]
async fn test_unknown_office_is_empty() {
    let service = seeded().await;
    let page = service
        .catalog(&CatalogParams {
            office: Some("LRL".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 0);
    assert!(page.entries.is_empty());
    assert!(service.store().series_exists("golf.Temp.Inst.1Hour.0.raw", Some("NWD")).await.unwrap());
}
