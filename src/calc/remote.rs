//! Calculator backed by the public Aladhan `timings` API.
//!
//! The HTTP transport sits behind the [`HttpClient`] trait so the parsing and
//! error mapping can be tested without a network. The reqwest implementation
//! is only compiled with the `remote` feature.

use std::collections::BTreeMap;

use chrono::{Duration as ChronoDuration, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::Deserialize;
use url::Url;

use super::{CalculationRequest, Calculator, RawTimes};
use crate::common::utils::resolve_local;
use crate::error::PrayerError;
use crate::prayer::Prayer;

/// Trait for synchronous HTTP GET requests.
pub trait HttpClient: Send + Sync {
    /// Fetch `url` and return the body of a 2xx response.
    ///
    /// Transport failures and non-2xx statuses are
    /// [`PrayerError::CalculatorUnavailable`].
    fn get(&self, url: &str) -> Result<Vec<u8>, PrayerError>;
}

#[derive(Debug, Deserialize)]
struct TimingsResponse {
    data: TimingsData,
}

#[derive(Debug, Deserialize)]
struct TimingsData {
    timings: BTreeMap<String, String>,
}

pub struct AladhanCalculator<C: HttpClient> {
    client: C,
    api_url: String,
}

impl<C: HttpClient> AladhanCalculator<C> {
    pub fn new(client: C, api_url: &str) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// Request URL for one day.
    pub fn url(&self, request: &CalculationRequest) -> Result<Url, PrayerError> {
        let mut query = vec![
            ("latitude", request.latitude.to_string()),
            ("longitude", request.longitude.to_string()),
            ("school", request.school.api_id().to_string()),
            ("midnightMode", request.midnight_mode.api_id().to_string()),
            (
                "latitudeAdjustmentMethod",
                request.latitude_adjustment.api_id().to_string(),
            ),
            ("timezonestring", request.timezone.name().to_string()),
        ];

        // The API only honours methodSettings for the custom method, so any
        // override turns the request into a custom one.
        let params = request.params;
        if request.method == super::CalculationMethod::Custom
            || params != request.method.defaults()
        {
            query.push(("method", "99".to_string()));
            query.push((
                "methodSettings",
                format!("{},{},{}", params.fajr_angle, params.maghrib, params.isha),
            ));
        } else {
            query.push(("method", request.method.id().to_string()));
        }

        let base = format!("{}/{}", self.api_url, request.date.format("%d-%m-%Y"));
        Url::parse_with_params(&base, &query)
            .map_err(|e| PrayerError::invalid(format!("invalid api_url '{}': {e}", self.api_url)))
    }
}

impl<C: HttpClient> Calculator for AladhanCalculator<C> {
    fn name(&self) -> &'static str {
        "aladhan"
    }

    fn calculate(&self, request: &CalculationRequest) -> Result<RawTimes, PrayerError> {
        let body = self.client.get(self.url(request)?.as_str())?;
        parse_timings(&body, request.date, request.timezone)
    }
}

/// Parse an API response body into timestamps for `date` in `tz`.
pub fn parse_timings(body: &[u8], date: NaiveDate, tz: Tz) -> Result<RawTimes, PrayerError> {
    let response: TimingsResponse = serde_json::from_slice(body)
        .map_err(|e| PrayerError::malformed(format!("unparsable response: {e}")))?;
    let timings = response.data.timings;

    let mut times = RawTimes::new();
    for prayer in Prayer::ALL {
        let text = timings
            .get(prayer.as_str())
            .ok_or_else(|| PrayerError::malformed(format!("missing timing {prayer}")))?;
        let time = parse_clock(text)
            .ok_or_else(|| PrayerError::malformed(format!("bad {prayer} time '{text}'")))?;
        times.insert(prayer, resolve_local(date.and_time(time), tz));
    }

    // Clock times after local midnight belong to the next day
    let sunset = times[&Prayer::Sunset];
    for prayer in [Prayer::Isha, Prayer::Midnight] {
        if let Some(time) = times.get_mut(&prayer)
            && *time < sunset
        {
            *time = resolve_local(time.naive_local() + ChronoDuration::days(1), tz);
        }
    }

    Ok(times)
}

/// "05:12" or "05:12 (CEST)".
fn parse_clock(text: &str) -> Option<NaiveTime> {
    let clock = text.split_whitespace().next()?;
    NaiveTime::parse_from_str(clock, "%H:%M").ok()
}

/// Blocking reqwest implementation of [`HttpClient`].
#[cfg(feature = "remote")]
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "remote")]
impl ReqwestClient {
    pub fn with_timeout(timeout: std::time::Duration) -> Result<Self, PrayerError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("prayertimes/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PrayerError::unavailable(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

#[cfg(feature = "remote")]
impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<Vec<u8>, PrayerError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| PrayerError::unavailable(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(PrayerError::unavailable(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| PrayerError::unavailable(format!("failed to read response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::method::{
        AngleOrMinutes, CalculationMethod, LatitudeAdjustment, MidnightMode, School,
    };
    use std::sync::Mutex;

    struct MockHttpClient {
        response: Result<Vec<u8>, PrayerError>,
        requested: Mutex<Vec<String>>,
    }

    impl MockHttpClient {
        fn new(response: Result<Vec<u8>, PrayerError>) -> Self {
            Self {
                response,
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    impl HttpClient for MockHttpClient {
        fn get(&self, url: &str) -> Result<Vec<u8>, PrayerError> {
            self.requested.lock().unwrap().push(url.to_string());
            self.response.clone()
        }
    }

    const CAIRO_BODY: &str = r#"{
        "code": 200,
        "status": "OK",
        "data": {
            "timings": {
                "Fajr": "04:12", "Sunrise": "05:55", "Dhuhr": "12:52",
                "Asr": "16:29", "Sunset": "19:49", "Maghrib": "19:49",
                "Isha": "21:14", "Imsak": "04:02", "Midnight": "00:52",
                "Firstthird": "23:07", "Lastthird": "02:37"
            }
        }
    }"#;

    fn request() -> CalculationRequest {
        let method = CalculationMethod::Egypt;
        CalculationRequest {
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            latitude: 30.0444,
            longitude: 31.2357,
            timezone: chrono_tz::Africa::Cairo,
            method,
            params: method.defaults(),
            school: School::Shafi,
            midnight_mode: MidnightMode::Standard,
            latitude_adjustment: LatitudeAdjustment::AngleBased,
        }
    }

    #[test]
    fn test_url_carries_all_parameters() {
        let calculator = AladhanCalculator::new(
            MockHttpClient::new(Ok(Vec::new())),
            "http://api.aladhan.com/timings/",
        );
        let url = calculator.url(&request()).unwrap();
        assert!(url.as_str().starts_with("http://api.aladhan.com/timings/01-06-2024?"));
        assert!(url.as_str().contains("method=5"));
        assert!(url.as_str().contains("school=0"));
        assert!(url.as_str().contains("midnightMode=0"));
        assert!(url.as_str().contains("latitudeAdjustmentMethod=3"));
        assert!(url.as_str().contains("timezonestring=Africa%2FCairo"));
        assert!(!url.as_str().contains("methodSettings"));
    }

    #[test]
    fn test_overrides_switch_to_custom_method() {
        let calculator =
            AladhanCalculator::new(MockHttpClient::new(Ok(Vec::new())), "http://x/timings");
        let mut req = request();
        req.params.isha = AngleOrMinutes::Minutes(90.0);

        let url = calculator.url(&req).unwrap();
        assert!(url.as_str().contains("method=99"));
        assert!(url.as_str().contains("methodSettings=19.5%2C0+min%2C90+min"));
    }

    #[test]
    fn test_unparsable_api_url_is_a_configuration_error() {
        let calculator = AladhanCalculator::new(MockHttpClient::new(Ok(Vec::new())), "api.aladhan.com");
        let err = calculator.calculate(&request()).unwrap_err();
        assert!(matches!(err, PrayerError::ConfigurationInvalid(_)));
        assert!(calculator.client.requested.lock().unwrap().is_empty());
    }

    #[test]
    fn test_parses_response_and_rolls_midnight_over() {
        let calculator = AladhanCalculator::new(
            MockHttpClient::new(Ok(CAIRO_BODY.as_bytes().to_vec())),
            "http://x/timings",
        );
        let times = calculator.calculate(&request()).unwrap();

        assert_eq!(times.len(), 9);
        assert_eq!(
            times[&Prayer::Fajr].to_rfc3339(),
            "2024-06-01T04:12:00+03:00"
        );
        assert_eq!(
            times[&Prayer::Midnight].to_rfc3339(),
            "2024-06-02T00:52:00+03:00"
        );
        assert_eq!(calculator.client.requested.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_transport_error_is_unavailable() {
        let calculator = AladhanCalculator::new(
            MockHttpClient::new(Err(PrayerError::unavailable("HTTP 503"))),
            "http://x/timings",
        );
        let err = calculator.calculate(&request()).unwrap_err();
        assert!(matches!(err, PrayerError::CalculatorUnavailable(_)));
    }

    #[test]
    fn test_missing_key_is_malformed() {
        let body = CAIRO_BODY.replace(r#""Isha": "21:14", "#, "");
        let err = parse_timings(body.as_bytes(), request().date, chrono_tz::Africa::Cairo)
            .unwrap_err();
        assert_eq!(err, PrayerError::malformed("missing timing Isha"));
    }

    #[test]
    fn test_bad_clock_and_bad_json_are_malformed() {
        let body = CAIRO_BODY.replace("12:52", "noon");
        let err = parse_timings(body.as_bytes(), request().date, chrono_tz::Africa::Cairo)
            .unwrap_err();
        assert!(matches!(err, PrayerError::CalculatorMalformedResult(_)));

        let err = parse_timings(b"<html>", request().date, chrono_tz::Africa::Cairo)
            .unwrap_err();
        assert!(matches!(err, PrayerError::CalculatorMalformedResult(_)));
    }

    #[test]
    fn test_clock_with_zone_suffix() {
        assert_eq!(
            parse_clock("05:12 (EEST)"),
            NaiveTime::from_hms_opt(5, 12, 0)
        );
        assert_eq!(parse_clock(""), None);
    }
}
