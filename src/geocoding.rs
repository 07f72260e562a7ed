use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Address -> optional (lat, lng) lookup.
///
/// "Not found" is a legitimate outcome (`Ok(None)`), not an error; callers
/// treat it as the signal to drop the record. Implementations should keep
/// transport problems for a single lookup from killing the whole run.
pub trait Geocode {
    fn geocode(&mut self, address: &str) -> Result<Option<(f64, f64)>>;
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    lat: String,
    lon: String,
}

/// OpenStreetMap Nominatim geocoder with a per-process cache and a polite
/// inter-request delay.
pub struct Nominatim {
    client: Client,
    cache: HashMap<String, Option<(f64, f64)>>,
    request_count: usize,
    delay: Duration,
}

impl Nominatim {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent("aptscout/0.1 (apartment listing aggregator)")
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build geocoding client")?;

        Ok(Self {
            client,
            cache: HashMap::new(),
            request_count: 0,
            delay: Duration::from_millis(1100),
        })
    }

    fn lookup(&self, address: &str) -> Result<Option<(f64, f64)>> {
        let url = format!(
            "https://nominatim.openstreetmap.org/search?format=json&q={}&limit=1",
            urlencoding::encode(address)
        );

        let response = self.client.get(&url).send()?;
        if !response.status().is_success() {
            anyhow::bail!("geocoding HTTP {}", response.status());
        }

        let results: Vec<NominatimResponse> = response.json()?;
        let Some(first) = results.first() else {
            return Ok(None);
        };

        match (first.lat.parse::<f64>(), first.lon.parse::<f64>()) {
            (Ok(lat), Ok(lng)) => Ok(Some((lat, lng))),
            _ => Ok(None),
        }
    }
}

impl Geocode for Nominatim {
    fn geocode(&mut self, address: &str) -> Result<Option<(f64, f64)>> {
        if address.trim().is_empty() {
            return Ok(None);
        }

        let cache_key = address.trim().to_lowercase();
        if let Some(cached) = self.cache.get(&cache_key) {
            debug!(address, "geocode cache hit");
            return Ok(*cached);
        }

        // Nominatim usage policy: at most one request per second.
        if self.request_count > 0 {
            thread::sleep(self.delay);
        }
        self.request_count += 1;

        // A failed lookup only costs this one record, so downgrade
        // transport and quota errors to "not found".
        let result = match self.lookup(address) {
            Ok(coords) => coords,
            Err(e) => {
                warn!(address, error = %e, "geocoding request failed");
                None
            }
        };

        self.cache.insert(cache_key, result);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_address_is_not_found() {
        let mut geocoder = Nominatim::new().unwrap();
        assert_eq!(geocoder.geocode("   ").unwrap(), None);
    }
}
