mod common;

use common::{detail_html, detail_path, listing_html, listing_url, StubFetcher, Vessel, BASE};
use std::sync::Arc;
use vessel_scraper::app::FetchOptions;
use vessel_scraper::common::types::ListingRow;
use vessel_scraper::config::Config;
use vessel_scraper::pipeline::ingestion::PaginationCrawler;
use vessel_scraper::pipeline::processing::normalize::Cell;
use vessel_scraper::pipeline::Pipeline;
use vessel_scraper::ScraperError;

fn test_config() -> Config {
    let mut config = Config::default();
    config.site.base_url = BASE.to_string();
    config
}

fn names(rows: &[ListingRow]) -> Vec<String> {
    rows.iter()
        .map(|r| r.value("ship_name").unwrap_or_default().to_string())
        .collect()
}

/// Three listing pages holding 5, 5 and 2 vessels; every page reports 3 pages.
fn three_page_site() -> StubFetcher {
    let mut fetcher = StubFetcher::default();
    for (page, count) in [(1u32, 5u32), (2, 5), (3, 2)] {
        let labels: Vec<String> = (0..count).map(|i| format!("P{page}R{i}")).collect();
        let vessels: Vec<Vessel> = labels
            .iter()
            .enumerate()
            .map(|(i, name)| Vessel {
                name,
                mmsi: page * 100 + i as u32,
                flag: None,
            })
            .collect();
        fetcher = fetcher.page(listing_url(BASE, "6", page), listing_html(&vessels, Some(3)));
    }
    fetcher
}

#[tokio::test]
async fn test_three_pages_yield_twelve_rows_in_page_then_row_order() {
    let fetcher = Arc::new(three_page_site());
    let crawler = PaginationCrawler::new(fetcher.clone(), BASE, FetchOptions::default());

    let rows = crawler.crawl_all("6", None).await.unwrap();

    assert_eq!(rows.len(), 12);
    let expected: Vec<String> = [(1, 5), (2, 5), (3, 2)]
        .iter()
        .flat_map(|(p, n)| (0..*n).map(move |i| format!("P{p}R{i}")))
        .collect();
    assert_eq!(names(&rows), expected);
    assert_eq!(
        fetcher.fetched(),
        vec![listing_url(BASE, "6", 1), listing_url(BASE, "6", 2), listing_url(BASE, "6", 3)]
    );
    assert_eq!(rows[5].value("ship_MMSI"), Some("200"));
    assert_eq!(rows[5].detail_locator, detail_path("P2R0", 200));
}

#[tokio::test]
async fn test_crawl_failure_reports_page_and_invalidates_it() {
    let fetcher = Arc::new(
        StubFetcher::default().page(
            listing_url(BASE, "6", 1),
            listing_html(&[Vessel { name: "A", mmsi: 1, flag: None }], Some(4)),
        ),
    );
    let pipeline = Pipeline::new(test_config());

    let err = pipeline.crawl(fetcher.clone(), "Tanker", None).await.unwrap_err();

    match err {
        ScraperError::Crawl { page, locator, .. } => {
            assert_eq!(page, 2);
            assert_eq!(locator, listing_url(BASE, "6", 2));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fetcher.invalidated(), vec![listing_url(BASE, "6", 2)]);
}

fn fleet() -> (Vec<ListingRow>, StubFetcher) {
    let labels: Vec<String> = (0..10).map(|i| format!("SHIP{i}")).collect();
    let vessels: Vec<Vessel> = labels
        .iter()
        .enumerate()
        .map(|(i, name)| Vessel {
            name,
            mmsi: i as u32,
            flag: Some("Panama"),
        })
        .collect();
    let mut fetcher =
        StubFetcher::default().page(listing_url(BASE, "6", 1), listing_html(&vessels, None));
    for (i, v) in vessels.iter().enumerate() {
        let imo = (9_000_000 + i).to_string();
        let gt = format!("{} t", 50_000 + i);
        let html = detail_html(&[
            ("IMO", imo.as_str()),
            ("Flag", "Panama"),
            ("Gross Tonnage", gt.as_str()),
            ("Course/Speed", "120 / 45"),
            ("Size", "300 x 50"),
            ("Draught", "N/A"),
        ]);
        // reverse completion order
        fetcher = fetcher.slow_page(
            format!("{}{}", BASE, detail_path(v.name, v.mmsi)),
            html,
            (10 - i as u64) * 4,
        );
    }
    let rows = vessels
        .iter()
        .map(|v| {
            let mut row = ListingRow {
                detail_locator: detail_path(v.name, v.mmsi),
                ..Default::default()
            };
            row.fields.insert("ship_name".into(), Some(v.name.to_string()));
            row
        })
        .collect();
    (rows, fetcher)
}

#[tokio::test]
async fn test_enrichment_is_identical_for_any_pool_size() {
    let pipeline = Pipeline::new(test_config());
    let (rows, _) = fleet();

    let mut outputs = Vec::new();
    for pool in [1, 3, 16] {
        let (_, fetcher) = fleet();
        outputs.push(pipeline.enrich(fetcher, &rows, Some(pool)).await.unwrap());
    }

    for out in &outputs {
        assert_eq!(out.len(), rows.len());
        for (i, row) in out.iter().enumerate() {
            assert_eq!(row.load_index, i);
            assert_eq!(row.value("ship_name"), rows[i].value("ship_name"));
            assert_eq!(row.value("IMO"), Some((9_000_000 + i).to_string().as_str()));
        }
    }
    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(outputs[0], outputs[2]);
}

#[tokio::test]
async fn test_one_broken_detail_page_leaves_the_rest_enriched() {
    let pipeline = Pipeline::new(test_config());
    let (rows, fetcher) = fleet();
    let broken = format!("{}{}", BASE, detail_path("SHIP4", 4));
    let fetcher = Arc::new(fetcher.page(broken.clone(), "<html><body>rate limited</body></html>"));

    let out = pipeline.enrich(fetcher.clone(), &rows, Some(4)).await.unwrap();

    assert_eq!(out.len(), 10);
    for name in ["IMO", "Flag", "Gross Tonnage", "Course", "Speed", "Length", "Width", "last_report_ts"] {
        assert!(out[4].fields.contains_key(name), "{name} not backfilled");
        assert_eq!(out[4].value(name), None, "{name} should be missing");
    }
    assert_eq!(out[4].value("ship_name"), Some("SHIP4"));
    for (i, row) in out.iter().enumerate().filter(|(i, _)| *i != 4) {
        assert_eq!(row.value("Gross Tonnage"), Some((50_000 + i).to_string().as_str()));
    }
    assert_eq!(fetcher.invalidated(), vec![broken]);
}

#[tokio::test]
async fn test_field_adaptation_and_normalization_end_to_end() {
    let pipeline = Pipeline::new(test_config());
    let (mut rows, fetcher) = fleet();
    // a re-listed vessel appearing again later supersedes the first sighting
    let mut again = rows[2].clone();
    again.fields.insert("ship_name".into(), Some("SHIP2 RENAMED".into()));
    rows.push(again);

    let enriched = pipeline.enrich(fetcher, &rows, Some(5)).await.unwrap();
    assert_eq!(enriched[0].value("Gross Tonnage"), Some("50000"));
    assert_eq!(enriched[0].value("Draught"), None);
    assert_eq!(enriched[0].value("Course"), Some("120"));
    assert_eq!(enriched[0].value("Speed"), Some("45"));

    let table = pipeline.normalize(&enriched).unwrap();
    assert_eq!(table.len(), 10);
    let row = table.get("9000002").unwrap();
    assert_eq!(row.text("ship_name"), Some("SHIP2 RENAMED"));
    assert_eq!(row.number("Gross Tonnage"), Some(50_002.0));
    assert_eq!(row.number("Length"), Some(300.0));
    assert_eq!(row.cell("Draught"), &Cell::Missing);
    assert!(!table.header().iter().any(|c| c == "Size" || c == "Course/Speed" || c == "GT"));
    let keys: Vec<&str> = table.rows.iter().map(|r| r.key.as_str()).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}
