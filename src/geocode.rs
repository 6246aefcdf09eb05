//! Reverse geocoding of GPS positions
//!
//! A lookup turns a decimal latitude/longitude into a country and a town.
//! Lookups are best effort: any failure yields an empty `Location` and the
//! photo is still renamed.

use crate::config::Options;
use crate::error::{Error, Result};
use crate::metadata::GpsPosition;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Minimum delay between two requests to the public Nominatim service
const MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(1);

/// Country and town of a photo
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub country: Option<String>,
    pub town: Option<String>,
}

impl Location {
    pub fn new(country: impl Into<String>, town: impl Into<String>) -> Self {
        Self {
            country: Some(country.into()),
            town: Some(town.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.country.is_none() && self.town.is_none()
    }
}

/// Address fields returned by a reverse lookup
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Address {
    pub country: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
    pub municipality: Option<String>,
    pub city: Option<String>,
}

impl Address {
    /// First of town, village, municipality, then city
    pub fn town(&self) -> Option<&str> {
        [&self.town, &self.village, &self.municipality, &self.city]
            .into_iter()
            .flatten()
            .map(|s| s.as_str())
            .find(|s| !s.trim().is_empty())
    }

    pub fn to_location(&self) -> Location {
        Location {
            country: self
                .country
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string),
            town: self.town().map(str::to_string),
        }
    }
}

/// Reverse geocoding service
pub trait Geocoder: Send + Sync {
    /// Look up the address at a decimal position; `Ok(None)` when the
    /// service knows nothing there
    fn reverse(&self, latitude: f64, longitude: f64) -> Result<Option<Address>>;
}

/// Resolve a GPS position to a location, degrading to an empty location
pub fn locate(geocoder: &dyn Geocoder, position: &GpsPosition) -> Location {
    let (latitude, longitude) = position.to_decimal();
    match geocoder.reverse(latitude, longitude) {
        Ok(Some(address)) => {
            let location = address.to_location();
            debug!(latitude, longitude, ?location, "Resolved location");
            location
        }
        Ok(None) => {
            debug!(latitude, longitude, "No address found for position");
            Location::default()
        }
        Err(e) => {
            warn!(
                latitude,
                longitude,
                error = %e,
                "Reverse geocoding failed, continuing without location"
            );
            Location::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    address: Option<Address>,
    error: Option<String>,
}

/// Nominatim reverse geocoding client
///
/// Requests are spaced out by `MIN_REQUEST_INTERVAL`. Wrap it in a
/// `CachedGeocoder` to avoid asking twice about the same place.
pub struct NominatimGeocoder {
    client: Client,
    url: String,
    last_request: Mutex<Option<Instant>>,
}

impl NominatimGeocoder {
    pub fn new(options: &Options) -> Result<Self> {
        let client = Client::builder()
            .user_agent(options.user_agent.clone())
            .timeout(Duration::from_secs(options.geocoder_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: options.geocoder_url.clone(),
            last_request: Mutex::new(None),
        })
    }

    fn throttle(&self) {
        let mut last = match self.last_request.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < MIN_REQUEST_INTERVAL {
                std::thread::sleep(MIN_REQUEST_INTERVAL - elapsed);
            }
        }
        *last = Some(Instant::now());
    }
}

impl Geocoder for NominatimGeocoder {
    fn reverse(&self, latitude: f64, longitude: f64) -> Result<Option<Address>> {
        self.throttle();

        let lat = latitude.to_string();
        let lon = longitude.to_string();
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("format", "jsonv2"),
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("zoom", "10"),
                ("addressdetails", "1"),
                ("accept-language", "en"),
            ])
            .send()?
            .error_for_status()?;

        let body: ReverseResponse = response.json()?;
        if let Some(message) = body.error {
            return Err(Error::Geocode(message));
        }
        Ok(body.address)
    }
}

fn cache_key(latitude: f64, longitude: f64) -> (i64, i64) {
    (
        (latitude * 1000.0).round() as i64,
        (longitude * 1000.0).round() as i64,
    )
}

/// Caches the answers of another geocoder per ~100 m cell
///
/// The cache stays locked while a miss is looked up, so photos of one place
/// read in parallel trigger a single request. Failures are not cached.
pub struct CachedGeocoder<G> {
    inner: G,
    cache: Mutex<HashMap<(i64, i64), Option<Address>>>,
}

impl<G: Geocoder> CachedGeocoder<G> {
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

impl<G: Geocoder> Geocoder for CachedGeocoder<G> {
    fn reverse(&self, latitude: f64, longitude: f64) -> Result<Option<Address>> {
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let key = cache_key(latitude, longitude);
        if let Some(hit) = cache.get(&key) {
            return Ok(hit.clone());
        }

        let address = self.inner.reverse(latitude, longitude)?;
        cache.insert(key, address.clone());
        Ok(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::GpsCoordinate;
    use rayon::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedGeocoder(Result<Option<Address>>);

    impl Geocoder for FixedGeocoder {
        fn reverse(&self, _latitude: f64, _longitude: f64) -> Result<Option<Address>> {
            match &self.0 {
                Ok(address) => Ok(address.clone()),
                Err(e) => Err(Error::Geocode(e.to_string())),
            }
        }
    }

    fn position() -> GpsPosition {
        GpsPosition {
            latitude: GpsCoordinate {
                degrees: 5.0,
                minutes: 20.0,
                seconds: 0.0,
                reference: 'N',
            },
            longitude: GpsCoordinate {
                degrees: 4.0,
                minutes: 1.0,
                seconds: 0.0,
                reference: 'W',
            },
        }
    }

    #[test]
    fn test_town_priority() {
        let address = Address {
            village: Some("Grand-Bassam".into()),
            municipality: Some("Abidjan".into()),
            ..Default::default()
        };
        assert_eq!(address.town(), Some("Grand-Bassam"));

        let address = Address {
            town: Some("Bouaké".into()),
            village: Some("Other".into()),
            ..Default::default()
        };
        assert_eq!(address.town(), Some("Bouaké"));

        let address = Address {
            municipality: Some("   ".into()),
            city: Some("Abidjan".into()),
            ..Default::default()
        };
        assert_eq!(address.town(), Some("Abidjan"));

        assert_eq!(Address::default().town(), None);
    }

    #[test]
    fn test_locate_success() {
        let geocoder = FixedGeocoder(Ok(Some(Address {
            country: Some("Côte d'Ivoire".into()),
            town: Some("Abidjan".into()),
            ..Default::default()
        })));
        let location = locate(&geocoder, &position());
        assert_eq!(location, Location::new("Côte d'Ivoire", "Abidjan"));
    }

    #[test]
    fn test_locate_partial_address() {
        let geocoder = FixedGeocoder(Ok(Some(Address {
            country: Some("France".into()),
            ..Default::default()
        })));
        let location = locate(&geocoder, &position());
        assert_eq!(location.country.as_deref(), Some("France"));
        assert_eq!(location.town, None);
    }

    #[test]
    fn test_locate_degrades_on_failure() {
        let geocoder = FixedGeocoder(Err(Error::Geocode("timeout".into())));
        assert!(locate(&geocoder, &position()).is_empty());

        let geocoder = FixedGeocoder(Ok(None));
        assert!(locate(&geocoder, &position()).is_empty());
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{
            "place_id": 1,
            "address": {"village": "Assinie", "country": "Côte d'Ivoire", "country_code": "ci"}
        }"#;
        let parsed: ReverseResponse = serde_json::from_str(body).unwrap();
        let location = parsed.address.unwrap().to_location();
        assert_eq!(location, Location::new("Côte d'Ivoire", "Assinie"));

        let body = r#"{"error":"Unable to geocode"}"#;
        let parsed: ReverseResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.address.is_none());
        assert_eq!(parsed.error.as_deref(), Some("Unable to geocode"));
    }

    #[test]
    fn test_cache_key_rounding() {
        assert_eq!(cache_key(5.33331, -4.01669), cache_key(5.33329, -4.01671));
        assert_ne!(cache_key(5.333, -4.016), cache_key(5.343, -4.016));
    }

    struct CountingGeocoder {
        calls: AtomicUsize,
        fail: bool,
    }

    impl Geocoder for CountingGeocoder {
        fn reverse(&self, _latitude: f64, _longitude: f64) -> Result<Option<Address>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // Give other threads time to miss the cache too
            std::thread::sleep(Duration::from_millis(20));
            if self.fail {
                return Err(Error::Geocode("offline".into()));
            }
            Ok(Some(Address {
                country: Some("France".into()),
                city: Some("Paris".into()),
                ..Default::default()
            }))
        }
    }

    #[test]
    fn test_cache_single_lookup_per_place_in_parallel() {
        let geocoder = CachedGeocoder::new(CountingGeocoder {
            calls: AtomicUsize::new(0),
            fail: false,
        });

        let locations: Vec<_> = (0..32)
            .into_par_iter()
            .map(|i| {
                let jitter = (i % 4) as f64 * 0.00001;
                geocoder.reverse(48.8583 + jitter, 2.2944 - jitter).unwrap()
            })
            .collect();

        assert_eq!(geocoder.inner.calls.load(Ordering::SeqCst), 1);
        assert!(locations.iter().all(|a| a.as_ref().and_then(|a| a.town()) == Some("Paris")));

        geocoder.reverse(45.764, 4.8357).unwrap();
        assert_eq!(geocoder.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cache_does_not_keep_failures() {
        let geocoder = CachedGeocoder::new(CountingGeocoder {
            calls: AtomicUsize::new(0),
            fail: true,
        });

        assert!(geocoder.reverse(48.8583, 2.2944).is_err());
        assert!(geocoder.reverse(48.8583, 2.2944).is_err());
        assert_eq!(geocoder.inner.calls.load(Ordering::SeqCst), 2);
    }
}
