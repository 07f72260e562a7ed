use tracing::warn;

/// A detail-page URL discovered on a listing index page.
///
/// `hint_address` is carried when the index page is the only place the
/// address appears (CPM puts it on the catalog card, not the detail page).
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRef {
    pub url: String,
    pub hint_address: Option<String>,
}

impl ListingRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            hint_address: None,
        }
    }

    pub fn with_address(url: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            hint_address: Some(address.into()),
        }
    }
}

/// Floorplan field state. `Missing` means the page was inspected and has no
/// floorplan, which is different from `Unset` (extraction never got there or
/// the expected container was absent).
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Floorplan {
    #[default]
    Unset,
    Missing,
    Url(String),
}

/// Mutable accumulator filled in by a site extractor. Every field starts
/// unset so a failed extraction is distinguishable from a legitimately
/// falsy value (a $0 price is `Some(0)`; only a field never reached stays
/// `None`).
#[derive(Debug, Clone, Default)]
pub struct RawApartment {
    pub url: String,
    pub name: Option<String>,
    pub address: Option<String>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub price: Option<i64>,
    pub leasing_period: Option<String>,
    pub description: Option<String>,
    pub amenities: Option<Vec<String>>,
    pub image_urls: Option<Vec<String>>,
    pub floorplan_url: Floorplan,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl RawApartment {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Names of the fields still unset after extraction.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.is_none() {
            missing.push("name");
        }
        if self.address.is_none() {
            missing.push("address");
        }
        if self.bedrooms.is_none() {
            missing.push("bedrooms");
        }
        if self.bathrooms.is_none() {
            missing.push("bathrooms");
        }
        if self.price.is_none() {
            missing.push("price");
        }
        if self.leasing_period.is_none() {
            missing.push("leasing_period");
        }
        if self.description.is_none() {
            missing.push("description");
        }
        if self.amenities.is_none() {
            missing.push("amenities");
        }
        if self.image_urls.is_none() {
            missing.push("image_urls");
        }
        if self.floorplan_url == Floorplan::Unset {
            missing.push("floorplan_url");
        }
        if self.lat.is_none() {
            missing.push("lat");
        }
        if self.lng.is_none() {
            missing.push("lng");
        }
        missing
    }

    /// Validation gate. Logs every field that stayed unset. A record
    /// without coordinates is dropped; anything else gets the documented
    /// default and goes through.
    pub fn finalize(self) -> Option<Apartment> {
        let mut reject = false;
        for field in self.missing_fields() {
            warn!(url = %self.url, field, "failed to extract field");
            if field == "lat" || field == "lng" {
                reject = true;
            }
        }
        if reject {
            return None;
        }

        let (lat, lng) = (self.lat?, self.lng?);
        Some(Apartment {
            url: self.url,
            name: self.name.unwrap_or_default(),
            address: self.address.unwrap_or_default(),
            bedrooms: self.bedrooms.unwrap_or(1),
            bathrooms: self.bathrooms.unwrap_or(1),
            price: self.price.unwrap_or(0),
            leasing_period: self.leasing_period.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            amenities: self.amenities.unwrap_or_default(),
            image_urls: self.image_urls.unwrap_or_default(),
            floorplan_url: match self.floorplan_url {
                Floorplan::Url(url) => Some(url),
                Floorplan::Missing | Floorplan::Unset => None,
            },
            lat,
            lng,
        })
    }
}

/// A validated apartment record, ready for persistence. Coordinates are
/// always present; a record that failed geocoding never reaches this type.
#[derive(Debug, Clone)]
pub struct Apartment {
    pub url: String,
    pub name: String,
    pub address: String,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub price: i64,
    pub leasing_period: String,
    pub description: String,
    pub amenities: Vec<String>,
    pub image_urls: Vec<String>,
    pub floorplan_url: Option<String>,
    pub lat: f64,
    pub lng: f64,
}

/// Fixed per-site leasing agency profile. Never scraped.
#[derive(Debug, Clone, Copy)]
pub struct Agency {
    pub name: &'static str,
    pub base_url: &'static str,
    pub description: &'static str,
}
