//! Markup adapter for the vessel listing site: listing pages and detail pages.

use crate::common::constants::{
    FIELD_COUNTRY_OWNER, FIELD_DETAILS_PATH, FIELD_LAST_REPORT, FIELD_MMSI, FIELD_SHIP_NAME,
    FLAG_TITLE_PREFIX, MMSI_MARKER,
};
use crate::common::error::{Result, ScraperError};
use crate::common::types::{DetailFields, Fields, ListingRow};
use crate::parser::{
    find_all, find_first, text_of, AnyOf, AttrValueContains, Tag, TagWithAttr, TagWithClasses,
};
use crate::pipeline::processing::fields::clean_value;
use scraper::{ElementRef, Html};
use tracing::{debug, warn};

/// What the pagination widget says about the number of pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSignal {
    /// The widget reports this many pages in total.
    LastPage(u32),
    /// No pagination widget: the current page is the final one.
    Absent,
    /// A widget is present but its page number is unreadable.
    Unreadable(String),
}

#[derive(Debug, Clone)]
pub struct ListingPage {
    pub rows: Vec<ListingRow>,
    pub signal: PageSignal,
}

/// Parse one listing page into rows and the pagination signal.
///
/// A page without any vessel rows is not an error. A vessel row that lacks
/// its header link is, since the row cannot be identified.
pub fn parse_listing_page(locator: &str, html: &str) -> Result<ListingPage> {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let row_pred = TagWithClasses::new("div", &["ship-row-details"]);
    let mut rows = Vec::new();
    for ship_row in find_all(root, &row_pred) {
        rows.push(parse_listing_row(locator, ship_row)?);
    }

    let signal = pagination_signal(root);
    debug!(locator, rows = rows.len(), ?signal, "parsed listing page");
    Ok(ListingPage { rows, signal })
}

fn parse_listing_row(locator: &str, ship_row: ElementRef<'_>) -> Result<ListingRow> {
    let header = find_first(ship_row, &Tag::new("header"))
        .ok_or_else(|| ScraperError::parse(locator, "vessel row without header"))?;
    let bookmark = find_first(header, &TagWithAttr::new("a", "rel", "bookmark"))
        .ok_or_else(|| ScraperError::parse(locator, "vessel header without bookmark link"))?;
    let details_path = bookmark
        .value()
        .attr("href")
        .ok_or_else(|| ScraperError::parse(locator, "bookmark link without href"))?
        .trim()
        .to_string();

    let mmsi = details_path
        .rsplit_once(MMSI_MARKER)
        .map(|(_, mmsi)| mmsi.to_string());

    let country = find_first(ship_row, &TagWithClasses::new("img", &["ship-flag"]))
        .and_then(|img| img.value().attr("title"))
        .map(|title| title.strip_prefix(FLAG_TITLE_PREFIX).unwrap_or(title).to_string());

    let mut fields = Fields::new();
    fields.insert(FIELD_SHIP_NAME.to_string(), clean_value(Some(&text_of(&bookmark))));
    fields.insert(FIELD_COUNTRY_OWNER.to_string(), clean_value(country.as_deref()));
    fields.insert(FIELD_DETAILS_PATH.to_string(), clean_value(Some(&details_path)));
    fields.insert(FIELD_MMSI.to_string(), clean_value(mmsi.as_deref()));

    let param_pred = TagWithClasses::new("div", &["row", "param"]);
    let div = Tag::new("div");
    for param in find_all(ship_row, &param_pred) {
        let cells = find_all(param, &div);
        let (Some(name), Some(value)) = (cells.first(), cells.get(1)) else {
            continue;
        };
        let name = text_of(name);
        if name.is_empty() {
            continue;
        }
        fields.insert(name, clean_value(Some(&text_of(value))));
    }

    Ok(ListingRow {
        fields,
        detail_locator: details_path,
    })
}

fn pagination_signal(root: ElementRef<'_>) -> PageSignal {
    let href = find_first(root, &TagWithAttr::id("div", "vessels-list"))
        .and_then(|list| find_first(list, &TagWithClasses::new("ul", &["mypagination"])))
        .and_then(|ul| find_first(ul, &TagWithClasses::new("li", &["last"])))
        .and_then(|li| find_first(li, &Tag::new("a")))
        .and_then(|a| a.value().attr("href").map(str::to_string));

    let Some(href) = href else {
        return PageSignal::Absent;
    };
    let tail = href.rsplit("&page=").next().unwrap_or_default().trim();
    match tail.parse::<u32>() {
        Ok(last) => PageSignal::LastPage(last),
        Err(_) => PageSignal::Unreadable(href),
    }
}

/// Parse a vessel detail page into raw, unadapted fields.
pub fn parse_detail_page(locator: &str, html: &str) -> Result<DetailFields> {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let ais = find_first(root, &TagWithAttr::id("div", "ais-data"))
        .ok_or_else(|| ScraperError::parse(locator, "no ais-data section"))?;

    let param_pred = TagWithClasses::new("div", &["row", "param"]);
    let mut fields = DetailFields::empty();

    // newer markup tags cells with itemprop, older markup with classes
    let name_pred = AnyOf::new(vec![
        Box::new(TagWithAttr::new("span", "itemprop", "name")),
        Box::new(TagWithClasses::new("span", &["name"])),
    ]);
    let value_pred = AnyOf::new(vec![
        Box::new(TagWithAttr::new("span", "itemprop", "value")),
        Box::new(TagWithClasses::new("span", &["value"])),
    ]);
    for param in find_all(ais, &param_pred) {
        if let (Some(name), Some(value)) =
            (find_first(param, &name_pred), find_first(param, &value_pred))
        {
            insert_param(&mut fields, &text_of(&name), text_of(&value));
        }
    }

    match find_first(root, &TagWithAttr::id("section", "master-data")) {
        Some(master) => {
            let name_pred = AttrValueContains::new(&["div", "span"], "name");
            let value_pred = AttrValueContains::new(&["div", "span"], "value");
            for param in find_all(master, &param_pred) {
                if let (Some(name), Some(value)) =
                    (find_first(param, &name_pred), find_first(param, &value_pred))
                {
                    insert_param(&mut fields, &text_of(&name), text_of(&value));
                }
            }
        }
        None => warn!(locator, "no master-data section"),
    }

    let last_report = find_first(root, &TagWithAttr::id("time", "last_report_ts"))
        .map(|t| text_of(&t))
        .filter(|t| !t.is_empty());
    fields.insert(FIELD_LAST_REPORT, last_report);

    Ok(fields)
}

fn insert_param(fields: &mut DetailFields, name: &str, value: String) {
    let name = name.replace(':', "");
    let name = name.trim();
    if !name.is_empty() {
        fields.insert(name, Some(value));
    }
}
