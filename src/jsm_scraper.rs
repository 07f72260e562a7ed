use crate::fetch::PageFetcher;
use crate::models::{Floorplan, ListingRef, RawApartment};
use crate::parse::{parse_price, parse_size};
use anyhow::Result;
use scraper::{ElementRef, Html, Selector};
use tracing::warn;

pub const BASE_URL: &str = "https://apartments.jsmliving.com/";

fn apartments_url() -> String {
    format!("{}apartments/", BASE_URL)
}

fn start_url() -> String {
    format!("{}?availability=37", apartments_url())
}

/// Walk the paginated JSM catalog, accumulating detail URLs until no
/// next-page affordance remains. No address is available at this level.
pub fn discover(fetcher: &PageFetcher) -> Result<Vec<ListingRef>> {
    let mut listings = Vec::new();
    let mut page_url = start_url();

    loop {
        let body = fetcher.get(&page_url)?;
        let document = Html::parse_document(&body);

        listings.extend(listing_refs_from_index(&document)?);

        match next_page_href(&document) {
            Some(href) => page_url = format!("{}{}", apartments_url(), href),
            None => break,
        }
    }

    Ok(listings)
}

/// One JSM detail page is one leasable unit.
pub fn extract(fetcher: &PageFetcher, listing: &ListingRef) -> Result<Vec<RawApartment>> {
    let body = fetcher.get(&listing.url)?;
    Ok(vec![record_from_detail(
        &Html::parse_document(&body),
        listing,
    )])
}

pub fn listing_refs_from_index(document: &Html) -> Result<Vec<ListingRef>> {
    let grid_selector = Selector::parse("ul.units-grid").unwrap();
    let entry_selector = Selector::parse("li").unwrap();
    let anchor_selector = Selector::parse("a[href]").unwrap();

    // A catalog page without the units grid is fatal for the run.
    let grids: Vec<ElementRef> = document.select(&grid_selector).collect();
    if grids.is_empty() {
        anyhow::bail!("Units grid not found on listing page");
    }

    let mut listings = Vec::new();
    for grid in grids {
        for entry in grid.select(&entry_selector) {
            // The detail link is the first anchor in the entry; entries
            // without one (spacer tiles) are skipped.
            if let Some(href) = entry
                .select(&anchor_selector)
                .next()
                .and_then(|a| a.value().attr("href"))
            {
                listings.push(ListingRef::new(absolute_url(href)));
            }
        }
    }

    Ok(listings)
}

/// Relative href of the next catalog page, if any.
pub fn next_page_href(document: &Html) -> Option<String> {
    let pager_selector = Selector::parse("a.pager.pager-next[href]").unwrap();
    document
        .select(&pager_selector)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string)
}

pub fn record_from_detail(document: &Html, listing: &ListingRef) -> RawApartment {
    let mut raw = RawApartment::new(&listing.url);

    raw.name = extract_name(document);
    raw.address = extract_address(document);
    extract_stats(document, &mut raw);
    raw.description = extract_description(document);
    raw.amenities = extract_amenities(document);
    raw.image_urls = extract_images(document);
    raw.floorplan_url = extract_floorplan(document);

    raw
}

fn extract_name(document: &Html) -> Option<String> {
    let selector = Selector::parse("div.info h1").unwrap();
    let name = document.select(&selector).next().map(joined_text);
    if name.is_none() {
        warn!("failed to parse apartment name");
    }
    name
}

fn extract_address(document: &Html) -> Option<String> {
    let selector = Selector::parse("div.info h2").unwrap();
    let heading = match document.select(&selector).next() {
        Some(h2) => joined_text(h2),
        None => {
            warn!("failed to parse apartment address");
            return None;
        }
    };

    // The heading reads "Location: {address}".
    match heading.strip_prefix("Location:") {
        Some(address) => Some(address.trim().to_string()),
        None => {
            warn!(heading, "address heading without Location prefix");
            None
        }
    }
}

fn extract_stats(document: &Html, raw: &mut RawApartment) {
    let stat_selector = Selector::parse("div.info div.stats div.stat").unwrap();
    let stats: Vec<String> = document.select(&stat_selector).map(joined_text).collect();

    if stats.len() < 3 {
        warn!(found = stats.len(), "failed to parse apartment stats");
        return;
    }

    let (bedrooms, bathrooms) = parse_size(&stats[0]);
    raw.bedrooms = Some(bedrooms);
    raw.bathrooms = Some(bathrooms);
    raw.price = Some(parse_price(&stats[1]));
    raw.leasing_period = Some(stats[2].clone());
}

fn extract_description(document: &Html) -> Option<String> {
    let container_selector = Selector::parse("div.description").unwrap();
    let paragraph_selector = Selector::parse("p").unwrap();

    let container = match document.select(&container_selector).next() {
        Some(c) => c,
        None => {
            warn!("failed to parse description");
            return None;
        }
    };

    Some(
        container
            .select(&paragraph_selector)
            .map(|p| joined_text(p))
            .collect::<Vec<_>>()
            .join(" "),
    )
}

fn extract_amenities(document: &Html) -> Option<Vec<String>> {
    let container_selector = Selector::parse("div.amenities").unwrap();
    let amenity_selector = Selector::parse("span.amenity").unwrap();

    let container = document.select(&container_selector).next()?;
    Some(container.select(&amenity_selector).map(joined_text).collect())
}

fn extract_images(document: &Html) -> Option<Vec<String>> {
    let gallery_selector = Selector::parse("div.photos div div a[href]").unwrap();

    let images: Vec<String> = document
        .select(&gallery_selector)
        .filter_map(|a| a.value().attr("href"))
        .map(absolute_url)
        .collect();

    if images.is_empty() {
        return None;
    }
    Some(images)
}

/// The floorplan lives in its own container, separate from the gallery.
/// Absent means the page genuinely has none, which is a kept state rather
/// than an extraction failure.
fn extract_floorplan(document: &Html) -> Floorplan {
    let container_selector = Selector::parse("div.fl.mb.mr").unwrap();
    let anchor_selector = Selector::parse("a[href]").unwrap();

    if let Some(container) = document.select(&container_selector).next() {
        if let Some(href) = container
            .select(&anchor_selector)
            .next()
            .and_then(|a| a.value().attr("href"))
        {
            return Floorplan::Url(absolute_url(href));
        }
    }

    Floorplan::Missing
}

fn absolute_url(href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else {
        format!("{}{}", BASE_URL.trim_end_matches('/'), href)
    }
}

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

    const INDEX_HTML: &str = r#"
        <ul class="units-grid">
            <li><a href="/apartments/302-e-john">302 E John</a></li>
            <li><a href="/apartments/505-e-clark">505 E Clark</a></li>
            <li><span>no link tile</span></li>
        </ul>
        <a class="pager pager-next" href="?availability=37&page=2">Next</a>
    "#;

    const LAST_PAGE_HTML: &str = r#"
        <ul class="units-grid">
            <li><a href="/apartments/908-s-first">908 S First</a></li>
        </ul>
    "#;

    const DETAIL_HTML: &str = r#"
        <div class="info">
            <h1>302 E. John</h1>
            <h2>Location: 302 E. John St, Champaign, IL</h2>
            <div class="stats">
                <div class="stat">Size: 4 Bedrooms/ 2 Baths</div>
                <div class="stat">$2,340-$2,600</div>
                <div class="stat">August 2026 - July 2027</div>
            </div>
        </div>
        <div class="description"><p>Top floor.</p><p>Newly renovated.</p></div>
        <div class="amenities">
            <span class="amenity">Dishwasher</span>
            <span class="amenity">In-unit laundry</span>
        </div>
        <div class="photos"><div>
            <div><a href="/media/1.jpg">x</a></div>
            <div><a href="/media/2.jpg">x</a></div>
        </div></div>
        <div class="fl mb mr"><a href="/media/plan.pdf">floorplan</a></div>
    "#;

    #[test]
    fn index_entries_become_absolute_urls() {
        let document = Html::parse_document(INDEX_HTML);
        let listings = listing_refs_from_index(&document).unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(
            listings[0].url,
            "https://apartments.jsmliving.com/apartments/302-e-john"
        );
        assert_eq!(listings[0].hint_address, None);
    }

    #[test]
    fn missing_units_grid_is_fatal() {
        let document = Html::parse_document("<div>empty page</div>");
        assert!(listing_refs_from_index(&document).is_err());
    }

    #[test]
    fn next_page_affordance_detection() {
        let with_next = Html::parse_document(INDEX_HTML);
        assert_eq!(
            next_page_href(&with_next).as_deref(),
            Some("?availability=37&page=2")
        );

        let last_page = Html::parse_document(LAST_PAGE_HTML);
        assert_eq!(next_page_href(&last_page), None);
    }

    #[test]
    fn detail_page_extracts_all_fields() {
        let document = Html::parse_document(DETAIL_HTML);
        let listing = ListingRef::new("https://apartments.jsmliving.com/apartments/302-e-john");
        let raw = record_from_detail(&document, &listing);

        assert_eq!(raw.name.as_deref(), Some("302 E. John"));
        assert_eq!(raw.address.as_deref(), Some("302 E. John St, Champaign, IL"));
        assert_eq!(raw.bedrooms, Some(4));
        assert_eq!(raw.bathrooms, Some(2));
        assert_eq!(raw.price, Some(2340));
        assert_eq!(raw.leasing_period.as_deref(), Some("August 2026 - July 2027"));
        assert_eq!(raw.description.as_deref(), Some("Top floor. Newly renovated."));
        assert_eq!(
            raw.amenities.as_deref(),
            Some(&["Dishwasher".to_string(), "In-unit laundry".to_string()][..])
        );
        assert_eq!(
            raw.image_urls.as_deref(),
            Some(
                &[
                    "https://apartments.jsmliving.com/media/1.jpg".to_string(),
                    "https://apartments.jsmliving.com/media/2.jpg".to_string(),
                ][..]
            )
        );
        assert_eq!(
            raw.floorplan_url,
            Floorplan::Url("https://apartments.jsmliving.com/media/plan.pdf".to_string())
        );
    }

    #[test]
    fn efficiency_size_maps_to_one_bedroom() {
        let html = DETAIL_HTML.replace("Size: 4 Bedrooms/ 2 Baths", "Size: Efficiency/ 1 Baths");
        let document = Html::parse_document(&html);
        let listing = ListingRef::new("https://apartments.jsmliving.com/apartments/x");
        let raw = record_from_detail(&document, &listing);
        assert_eq!(raw.bedrooms, Some(1));
        assert_eq!(raw.bathrooms, Some(1));
    }

    #[test]
    fn absent_floorplan_container_is_explicitly_missing() {
        let html = DETAIL_HTML.replace(
            r#"<div class="fl mb mr"><a href="/media/plan.pdf">floorplan</a></div>"#,
            "",
        );
        let document = Html::parse_document(&html);
        let listing = ListingRef::new("https://apartments.jsmliving.com/apartments/x");
        let raw = record_from_detail(&document, &listing);
        assert_eq!(raw.floorplan_url, Floorplan::Missing);
        // Explicitly-missing floorplan is not an extraction failure.
        assert!(!raw.missing_fields().contains(&"floorplan_url"));
    }
}
