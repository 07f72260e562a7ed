use crate::fetch::PageFetcher;
use crate::geocoding::Geocode;
use crate::models::{Agency, Apartment, ListingRef, RawApartment};
use anyhow::Result;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

/// Per-site apartment extraction capability. The pipeline driver is written
/// against this trait only, never against a concrete site.
pub trait ApartmentSource {
    fn name(&self) -> &str;

    /// The fixed agency profile that owns every apartment this source
    /// produces.
    fn agency(&self) -> Agency;

    /// Discover detail-page URLs from the site's listing index. A missing
    /// index structure is a hard failure for the run.
    fn discover_urls(&self, fetcher: &PageFetcher) -> Result<Vec<ListingRef>>;

    /// Extract zero or more raw records from one detail page. Multi-unit
    /// pages yield one record per unit configuration.
    fn extract(&self, fetcher: &PageFetcher, listing: &ListingRef) -> Result<Vec<RawApartment>>;
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Stop after this many accepted records (partial runs for testing).
    pub max_items: Option<usize>,
    /// Delay between detail-page fetches.
    pub fetch_delay: Duration,
}

/// Everything a single site run produced, ready for one transactional
/// write.
pub struct SourceRun {
    pub agency: Agency,
    pub apartments: Vec<Apartment>,
}

/// Run one site end to end: discover listing URLs, extract each page,
/// geocode, validate, accumulate. Discovery failures propagate; a failure
/// on one detail page only skips that page.
pub fn run_source(
    source: &dyn ApartmentSource,
    fetcher: &PageFetcher,
    geocoder: &mut dyn Geocode,
    options: &RunOptions,
) -> Result<SourceRun> {
    info!(source = source.name(), "starting run");

    let listings = source.discover_urls(fetcher)?;
    info!(source = source.name(), count = listings.len(), "discovered listings");

    let mut apartments = Vec::new();
    let mut rejected = 0usize;

    'listings: for listing in &listings {
        if let Some(max) = options.max_items {
            if apartments.len() >= max {
                info!(max, "reached item cap, stopping");
                break;
            }
        }

        let raw_records = match source.extract(fetcher, listing) {
            Ok(records) => records,
            Err(e) => {
                warn!(url = %listing.url, error = %e, "failed to extract page, skipping");
                continue;
            }
        };

        for mut raw in raw_records {
            if raw.lat.is_none() || raw.lng.is_none() {
                if let Some(address) = raw.address.clone() {
                    if let Some((lat, lng)) = geocoder.geocode(&address)? {
                        raw.lat = Some(lat);
                        raw.lng = Some(lng);
                    }
                }
            }

            match raw.finalize() {
                Some(apartment) => {
                    apartments.push(apartment);
                    if let Some(max) = options.max_items {
                        if apartments.len() >= max {
                            continue 'listings;
                        }
                    }
                }
                None => rejected += 1,
            }
        }

        if !options.fetch_delay.is_zero() {
            thread::sleep(options.fetch_delay);
        }
    }

    info!(
        source = source.name(),
        accepted = apartments.len(),
        rejected,
        "run finished"
    );

    Ok(SourceRun {
        agency: source.agency(),
        apartments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::Floorplan;

    struct StubSource;

    impl ApartmentSource for StubSource {
        fn name(&self) -> &str {
            "stub"
        }

        fn agency(&self) -> Agency {
            Agency {
                name: "Stub Leasing",
                base_url: "http://stub.example/",
                description: "test agency",
            }
        }

        fn discover_urls(&self, _fetcher: &PageFetcher) -> Result<Vec<ListingRef>> {
            Ok(vec![ListingRef::with_address(
                "http://stub.example/apt/1",
                "1102 E. Colorado, Urbana, IL",
            )])
        }

        fn extract(
            &self,
            _fetcher: &PageFetcher,
            listing: &ListingRef,
        ) -> Result<Vec<RawApartment>> {
            let mut raw = RawApartment::new(&listing.url);
            raw.name = Some("Colorado Court".to_string());
            raw.address = listing.hint_address.clone();
            raw.bedrooms = Some(2);
            raw.bathrooms = Some(1);
            raw.price = Some(900);
            raw.leasing_period = Some("Fall 2026".to_string());
            raw.description = Some("Near campus".to_string());
            raw.amenities = Some(vec!["Parking".to_string(), "Gym".to_string()]);
            raw.image_urls = Some(vec![
                "http://stub.example/a.jpg".to_string(),
                "http://stub.example/b.jpg".to_string(),
            ]);
            raw.floorplan_url = Floorplan::Url("http://stub.example/plan.jpg".to_string());
            Ok(vec![raw])
        }
    }

    struct NotFoundGeocoder;

    impl Geocode for NotFoundGeocoder {
        fn geocode(&mut self, _address: &str) -> Result<Option<(f64, f64)>> {
            Ok(None)
        }
    }

    struct FixedGeocoder;

    impl Geocode for FixedGeocoder {
        fn geocode(&mut self, _address: &str) -> Result<Option<(f64, f64)>> {
            Ok(Some((40.1105, -88.2073)))
        }
    }

    #[test]
    fn ungeocodable_record_is_excluded() {
        let fetcher = PageFetcher::new().unwrap();
        let run = run_source(
            &StubSource,
            &fetcher,
            &mut NotFoundGeocoder,
            &RunOptions::default(),
        )
        .unwrap();
        assert!(run.apartments.is_empty());
    }

    #[test]
    fn geocoded_record_is_persisted_with_images_and_amenities() {
        let fetcher = PageFetcher::new().unwrap();
        let run = run_source(
            &StubSource,
            &fetcher,
            &mut FixedGeocoder,
            &RunOptions::default(),
        )
        .unwrap();
        assert_eq!(run.apartments.len(), 1);

        let conn = db::open_in_memory().unwrap();
        db::store_run(&conn, &run).unwrap();

        let apartment_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM apartment", [], |r| r.get(0))
            .unwrap();
        assert_eq!(apartment_count, 1);
        let image_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM image", [], |r| r.get(0))
            .unwrap();
        assert_eq!(image_count, 3); // 2 gallery + 1 floorplan
        let amenity_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM amenity", [], |r| r.get(0))
            .unwrap();
        assert_eq!(amenity_count, 2);
    }
}
