use crate::fetch::PageFetcher;
use crate::models::{ListingRef, RawApartment};
use crate::parse::{parse_bathrooms, parse_bedrooms, parse_price};
use anyhow::{Context, Result};
use scraper::{ElementRef, Html, Selector};
use tracing::warn;

pub const BASE_URL: &str = "http://cpm-apts.com/";

fn index_url() -> String {
    format!("{}apartment/", BASE_URL)
}

/// Scrape the single-page CPM catalog. The address only exists on the
/// catalog card, so it travels with the ListingRef.
pub fn discover(fetcher: &PageFetcher) -> Result<Vec<ListingRef>> {
    let body = fetcher.get(&index_url())?;
    listing_refs_from_index(&Html::parse_document(&body))
}

/// Extract one record per unit configuration row of the detail page's
/// stats table.
pub fn extract(fetcher: &PageFetcher, listing: &ListingRef) -> Result<Vec<RawApartment>> {
    let body = fetcher.get(&listing.url)?;
    records_from_detail(&Html::parse_document(&body), listing)
}

pub fn listing_refs_from_index(document: &Html) -> Result<Vec<ListingRef>> {
    let container_selector = Selector::parse("#container").unwrap();
    let item_selector = Selector::parse(".propertyItem").unwrap();
    let link_selector = Selector::parse("a.card[href]").unwrap();
    let address_selector = Selector::parse(".cardAddress").unwrap();

    // Missing catalog container is fatal for the whole run.
    let container = document
        .select(&container_selector)
        .next()
        .context("Catalog container not found on index page")?;

    let mut listings = Vec::new();
    for item in container.select(&item_selector) {
        let link = item
            .select(&link_selector)
            .next()
            .and_then(|a| a.value().attr("href"))
            .context("Catalog entry without a detail link")?;

        let address = item
            .select(&address_selector)
            .next()
            .map(joined_text)
            .context("Catalog entry without an address")?;

        listings.push(ListingRef::with_address(link, address));
    }

    Ok(listings)
}

pub fn records_from_detail(document: &Html, listing: &ListingRef) -> Result<Vec<RawApartment>> {
    let row_selector = Selector::parse("#room-type tbody tr").unwrap();
    let cell_selector = Selector::parse("td").unwrap();

    // One leasable unit configuration per stats row. A page without the
    // stats table cannot be sized, so the whole page fails.
    let rows: Vec<ElementRef> = document.select(&row_selector).collect();
    if rows.is_empty() {
        anyhow::bail!("Stats table not found on {}", listing.url);
    }

    let name = extract_name(document);
    let description = extract_description(document);
    let amenities = extract_amenities(document);
    let image_urls = extract_images(document);

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let mut raw = RawApartment::new(&listing.url);
        raw.name = name.clone();
        // The detail page carries no address; it came off the catalog card.
        raw.address = listing.hint_address.clone();
        raw.description = description.clone();
        raw.amenities = amenities.clone();
        raw.image_urls = image_urls.clone();
        // CPM does not publish leasing periods or floorplans; the period is
        // present-but-empty, the floorplan stays unset (logged, not fatal).
        raw.leasing_period = Some(String::new());

        let cells: Vec<String> = row.select(&cell_selector).map(|td| joined_text(td)).collect();
        if cells.len() >= 4 {
            raw.bedrooms = Some(parse_bedrooms(&cells[0]));
            raw.bathrooms = Some(parse_bathrooms(&cells[1]));
            raw.price = Some(parse_price(&cells[3]));
        } else {
            warn!(url = %listing.url, cells = cells.len(), "stats row too short");
        }

        records.push(raw);
    }

    Ok(records)
}

fn extract_name(document: &Html) -> Option<String> {
    let selector = Selector::parse(".pageTitle").unwrap();
    let name = document.select(&selector).next().map(joined_text);
    if name.is_none() {
        warn!("failed to parse apartment name");
    }
    name
}

fn extract_description(document: &Html) -> Option<String> {
    let selector = Selector::parse("div#building_desc").unwrap();
    let description = document.select(&selector).next().map(joined_text);
    if description.is_none() {
        warn!("failed to parse description");
    }
    description
}

fn extract_amenities(document: &Html) -> Option<Vec<String>> {
    let container_selector = Selector::parse("div#amenities").unwrap();
    let item_selector = Selector::parse("li").unwrap();

    let container = document.select(&container_selector).next()?;
    Some(container.select(&item_selector).map(|li| joined_text(li)).collect())
}

fn extract_images(document: &Html) -> Option<Vec<String>> {
    let container_selector = Selector::parse("div#carouselFull").unwrap();
    let anchor_selector = Selector::parse("a.galleryItem[href]").unwrap();

    let container = document.select(&container_selector).next()?;
    Some(
        container
            .select(&anchor_selector)
            .filter_map(|a| a.value().attr("href"))
            .map(str::to_string)
            .collect(),
    )
}

/// Element text with inner tags (e.g. `<br>`) collapsed to single spaces.
fn joined_text(element: ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Floorplan;

    const INDEX_HTML: &str = r#"
        <div id="container">
            <div class="propertyItem">
                <a class="card" href="http://cpm-apts.com/apartment/101-e-green">101 E Green</a>
                <div class="cardAddress">101 E. Green St.<br>Champaign, IL</div>
            </div>
            <div class="propertyItem">
                <a class="card" href="http://cpm-apts.com/apartment/505-s-fourth">505 S Fourth</a>
                <div class="cardAddress">505 S. Fourth St.<br>Champaign, IL</div>
            </div>
        </div>
    "#;

    const DETAIL_HTML: &str = r#"
        <h1 class="pageTitle">101 East Green Street</h1>
        <table id="room-type"><tbody>
            <tr><td>2 BR</td><td>1</td><td>Aug</td><td>$1,234-$1,500</td></tr>
            <tr><td>3 BR</td><td>2-2.5</td><td>Aug</td><td>$1,800</td></tr>
        </tbody></table>
        <div id="building_desc">Steps from the quad.</div>
        <div id="amenities"><ul><li>Dishwasher</li><li>Balcony</li></ul></div>
        <div id="carouselFull">
            <a class="galleryItem" href="http://cpm-apts.com/img/1.jpg">one</a>
            <a class="galleryItem" href="http://cpm-apts.com/img/2.jpg">two</a>
        </div>
    "#;

    #[test]
    fn index_yields_links_with_inline_addresses() {
        let document = Html::parse_document(INDEX_HTML);
        let listings = listing_refs_from_index(&document).unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].url, "http://cpm-apts.com/apartment/101-e-green");
        assert_eq!(
            listings[0].hint_address.as_deref(),
            Some("101 E. Green St. Champaign, IL")
        );
    }

    #[test]
    fn missing_catalog_container_is_fatal() {
        let document = Html::parse_document("<div>nothing here</div>");
        assert!(listing_refs_from_index(&document).is_err());
    }

    #[test]
    fn multi_unit_page_yields_one_record_per_row() {
        let document = Html::parse_document(DETAIL_HTML);
        let listing = ListingRef::with_address(
            "http://cpm-apts.com/apartment/101-e-green",
            "101 E. Green St. Champaign, IL",
        );
        let records = records_from_detail(&document, &listing).unwrap();
        assert_eq!(records.len(), 2);

        // Shared page-level fields are identical across units.
        assert_eq!(records[0].name, records[1].name);
        assert_eq!(records[0].description, records[1].description);
        assert_eq!(records[0].address, records[1].address);
        assert_eq!(records[0].amenities, records[1].amenities);
        assert_eq!(records[0].image_urls, records[1].image_urls);

        // Per-unit stats differ.
        assert_eq!(records[0].bedrooms, Some(2));
        assert_eq!(records[0].bathrooms, Some(1));
        assert_eq!(records[0].price, Some(1234));
        assert_eq!(records[1].bedrooms, Some(3));
        assert_eq!(records[1].bathrooms, Some(2));
        assert_eq!(records[1].price, Some(1800));

        // CPM has no floorplans; the field stays unset.
        assert_eq!(records[0].floorplan_url, Floorplan::Unset);
        assert_eq!(records[0].leasing_period.as_deref(), Some(""));
    }

    #[test]
    fn missing_stats_table_fails_the_page() {
        let document = Html::parse_document("<h1 class=\"pageTitle\">No table</h1>");
        let listing = ListingRef::new("http://cpm-apts.com/apartment/x");
        assert!(records_from_detail(&document, &listing).is_err());
    }
}
