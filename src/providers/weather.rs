use chrono::{NaiveDate, NaiveDateTime};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

use crate::error::{RecommendError, Result};

const KMA_DEFAULT_BASE_URL: &str = "https://apis.data.go.kr";
const KMA_FORECAST_PATH: &str = "/1360000/VilageFcstInfoService_2.0/getVilageFcst";
const OPEN_METEO_DEFAULT_BASE_URL: &str = "https://api.open-meteo.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// KMA forecast issue times, ordered.
const BASE_TIMES: [&str; 8] = [
    "0200", "0500", "0800", "1100", "1400", "1700", "2000", "2300",
];

/// Condition sentinel when nothing could be derived.
pub const UNKNOWN_CONDITION: &str = "알수없음";

/// What the rest of the pipeline needs from a forecast: a temperature when one
/// is available and a short localized condition text.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub temperature: Option<f64>,
    pub condition: String,
}

impl WeatherReport {
    pub fn unknown() -> Self {
        Self {
            temperature: None,
            condition: UNKNOWN_CONDITION.to_string(),
        }
    }

    /// Render the one-line weather text embedded into the LLM prompt.
    pub fn weather_text(&self) -> String {
        match (self.temperature, self.condition.as_str()) {
            (Some(temp), condition) if condition != UNKNOWN_CONDITION => {
                format!("{condition}, {temp:.0}°C")
            }
            (_, condition) if condition != UNKNOWN_CONDITION => condition.to_string(),
            (Some(temp), _) => format!("{temp:.0}°C"),
            _ => "날씨 정보 없음".to_string(),
        }
    }
}

/// Weather lookup with a national-grid primary and an open-data fallback.
///
/// The KMA village forecast needs a service key and grid coordinates derived
/// from the Lambert Conformal Conic projection below; any failure there
/// (missing key included) falls back to Open-Meteo, and a fallback failure
/// degrades to [`WeatherReport::unknown`] rather than failing the request.
#[derive(Debug, Clone)]
pub struct WeatherService {
    kma_service_key: Option<String>,
    kma_base_url: String,
    open_meteo_base_url: String,
    client: Client,
}

impl WeatherService {
    pub fn new(kma_service_key: Option<String>) -> Self {
        Self {
            kma_service_key,
            kma_base_url: KMA_DEFAULT_BASE_URL.to_string(),
            open_meteo_base_url: OPEN_METEO_DEFAULT_BASE_URL.to_string(),
            client: Client::new(),
        }
    }

    pub fn set_kma_base_url(&mut self, base_url: impl Into<String>) {
        self.kma_base_url = base_url.into();
    }

    pub fn set_open_meteo_base_url(&mut self, base_url: impl Into<String>) {
        self.open_meteo_base_url = base_url.into();
    }

    /// Forecast for the given coordinates at `yyyymmdd`/`hhmm`, snapped to the
    /// nearest on-the-hour slot. Never fails.
    pub async fn report(&self, lat: f64, lon: f64, yyyymmdd: &str, hhmm: &str) -> WeatherReport {
        let slot = nearest_forecast_time(hhmm);

        match self.village_forecast(lat, lon, yyyymmdd, &slot).await {
            Ok(report) => report,
            Err(err) => {
                warn!(
                    target: "daytrip::weather",
                    error = %err,
                    "grid forecast unavailable, falling back to Open-Meteo"
                );
                match self.open_meteo(lat, lon, yyyymmdd, &slot).await {
                    Ok(report) => report,
                    Err(err) => {
                        warn!(
                            target: "daytrip::weather",
                            error = %err,
                            "weather lookup degraded to unknown"
                        );
                        WeatherReport::unknown()
                    }
                }
            }
        }
    }

    async fn village_forecast(
        &self,
        lat: f64,
        lon: f64,
        yyyymmdd: &str,
        slot: &str,
    ) -> Result<WeatherReport> {
        let service_key = self
            .kma_service_key
            .as_deref()
            .ok_or_else(|| RecommendError::Config("KMA_SERVICE_KEY is not set".to_string()))?;

        let target = NaiveDate::parse_from_str(yyyymmdd, "%Y%m%d")
            .map_err(|err| RecommendError::Parse(format!("bad forecast date {yyyymmdd}: {err}")))?;
        let (base_date, base_time) = pick_base_date_time(target, chrono::Local::now().naive_local());
        let (nx, ny) = latlon_to_grid(lat, lon);

        let url = format!(
            "{}{}",
            self.kma_base_url.trim_end_matches('/'),
            KMA_FORECAST_PATH
        );
        let nx = nx.to_string();
        let ny = ny.to_string();
        let response = self
            .client
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .query(&[
                ("serviceKey", service_key),
                ("pageNo", "1"),
                ("numOfRows", "300"),
                ("dataType", "JSON"),
                ("base_date", base_date.as_str()),
                ("base_time", base_time.as_str()),
                ("nx", nx.as_str()),
                ("ny", ny.as_str()),
            ])
            .send()
            .await
            .map_err(|err| RecommendError::Upstream(format!("KMA request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RecommendError::Upstream(format!(
                "KMA returned status {status}"
            )));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|err| RecommendError::Upstream(format!("KMA response unreadable: {err}")))?;

        let items = data
            .get("response")
            .and_then(|r| r.get("body"))
            .and_then(|b| b.get("items"))
            .and_then(|i| i.get("item"))
            .and_then(Value::as_array)
            .ok_or_else(|| {
                RecommendError::Upstream("KMA response had no forecast items".to_string())
            })?;

        let mut tmp: Option<String> = None;
        let mut sky: Option<String> = None;
        let mut pty: Option<String> = None;
        for item in items {
            let matches_slot = item.get("fcstDate").and_then(Value::as_str) == Some(yyyymmdd)
                && item.get("fcstTime").and_then(Value::as_str) == Some(slot);
            if !matches_slot {
                continue;
            }
            let value = item
                .get("fcstValue")
                .and_then(Value::as_str)
                .map(str::to_string);
            match item.get("category").and_then(Value::as_str) {
                Some("TMP") => tmp = value,
                Some("SKY") => sky = value,
                Some("PTY") => pty = value,
                _ => {}
            }
        }

        if tmp.is_none() && sky.is_none() && pty.is_none() {
            return Err(RecommendError::Upstream(format!(
                "KMA had no forecast entries for {yyyymmdd} {slot}"
            )));
        }

        Ok(WeatherReport {
            temperature: tmp.and_then(|v| v.parse().ok()),
            condition: map_condition(sky.as_deref(), pty.as_deref()).to_string(),
        })
    }

    async fn open_meteo(
        &self,
        lat: f64,
        lon: f64,
        yyyymmdd: &str,
        slot: &str,
    ) -> Result<WeatherReport> {
        let url = format!(
            "{}/v1/forecast",
            self.open_meteo_base_url.trim_end_matches('/')
        );
        let response = self
            .client
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .query(&[
                ("latitude", lat.to_string()),
                ("longitude", lon.to_string()),
                ("hourly", "temperature_2m,weathercode".to_string()),
                ("timezone", "Asia/Seoul".to_string()),
            ])
            .send()
            .await
            .map_err(|err| RecommendError::Upstream(format!("Open-Meteo request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RecommendError::Upstream(format!(
                "Open-Meteo returned status {status}"
            )));
        }

        let data: Value = response.json().await.map_err(|err| {
            RecommendError::Upstream(format!("Open-Meteo response unreadable: {err}"))
        })?;

        let hourly = data.get("hourly").cloned().unwrap_or(Value::Null);
        let hours = hourly
            .get("time")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let temps = hourly
            .get("temperature_2m")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let codes = hourly
            .get("weathercode")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let target_hour: i64 = slot.get(..2).and_then(|h| h.parse().ok()).unwrap_or(12);
        let want_date = iso_date(yyyymmdd);

        // Nearest hour on the requested date, or the first row when the date
        // is outside the forecast range.
        let mut best: Option<(usize, i64)> = None;
        if let Some(want_date) = &want_date {
            for (idx, entry) in hours.iter().enumerate() {
                let Some(stamp) = entry.as_str() else { continue };
                if !stamp.starts_with(want_date.as_str()) {
                    continue;
                }
                let Some(hour) = stamp.get(11..13).and_then(|h| h.parse::<i64>().ok()) else {
                    continue;
                };
                let gap = (hour - target_hour).abs();
                if best.map_or(true, |(_, min_gap)| gap < min_gap) {
                    best = Some((idx, gap));
                }
            }
        }
        let idx = match best {
            Some((idx, _)) => idx,
            None if !hours.is_empty() => 0,
            None => {
                return Err(RecommendError::Upstream(
                    "Open-Meteo response had no hourly entries".to_string(),
                ))
            }
        };

        let temperature = temps.get(idx).and_then(Value::as_f64);
        let condition = codes
            .get(idx)
            .and_then(Value::as_i64)
            .map(wmo_condition)
            .unwrap_or(UNKNOWN_CONDITION);

        Ok(WeatherReport {
            temperature,
            condition: condition.to_string(),
        })
    }
}

/// Lambert Conformal Conic projection onto the KMA forecast grid.
pub fn latlon_to_grid(lat: f64, lon: f64) -> (i32, i32) {
    const RE: f64 = 6371.00877; // earth radius, km
    const GRID: f64 = 5.0; // grid spacing, km
    const SLAT1: f64 = 30.0;
    const SLAT2: f64 = 60.0;
    const OLON: f64 = 126.0;
    const OLAT: f64 = 38.0;
    const XO: f64 = 43.0;
    const YO: f64 = 136.0;

    let degrad = std::f64::consts::PI / 180.0;
    let re = RE / GRID;
    let slat1 = SLAT1 * degrad;
    let slat2 = SLAT2 * degrad;
    let olon = OLON * degrad;
    let olat = OLAT * degrad;

    let sn = ((slat1.cos() / slat2.cos()).ln())
        / ((std::f64::consts::FRAC_PI_4 + slat2 * 0.5).tan()
            / (std::f64::consts::FRAC_PI_4 + slat1 * 0.5).tan())
        .ln();
    let sf = slat1.cos() * (std::f64::consts::FRAC_PI_4 + slat1 * 0.5).tan().powf(sn) / sn;
    let ro = re * sf / (std::f64::consts::FRAC_PI_4 + olat * 0.5).tan().powf(sn);

    let ra = re * sf / (std::f64::consts::FRAC_PI_4 + lat * degrad * 0.5).tan().powf(sn);
    let mut theta = lon * degrad - olon;
    if theta > std::f64::consts::PI {
        theta -= 2.0 * std::f64::consts::PI;
    }
    if theta < -std::f64::consts::PI {
        theta += 2.0 * std::f64::consts::PI;
    }
    theta *= sn;

    let x = ra * theta.sin() + XO + 0.5;
    let y = ro - ra * theta.cos() + YO + 0.5;
    (x as i32, y as i32)
}

/// Snap a `HH:MM`/`HHMM` request time to the nearest on-the-hour forecast
/// slot, rounding half up; malformed input defaults to midday.
pub fn nearest_forecast_time(hhmm: &str) -> String {
    let digits: String = hhmm.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return "1200".to_string();
    }
    let mut hour: u32 = digits[..2].parse().unwrap_or(12);
    let minute: u32 = digits[2..].parse().unwrap_or(0);
    if minute >= 30 {
        hour = (hour + 1) % 24;
    }
    format!("{hour:02}00")
}

/// Latest KMA issue time not after `now` for same-day forecasts; the 11:00
/// issue otherwise.
fn pick_base_date_time(target: NaiveDate, now: NaiveDateTime) -> (String, String) {
    if target == now.date() {
        let now_hhmm = now.format("%H%M").to_string();
        let mut base_time = BASE_TIMES[0];
        for candidate in BASE_TIMES {
            if candidate <= now_hhmm.as_str() {
                base_time = candidate;
            }
        }
        (now.format("%Y%m%d").to_string(), base_time.to_string())
    } else {
        (target.format("%Y%m%d").to_string(), "1100".to_string())
    }
}

/// Collapse the KMA sky/precipitation codes into one condition text.
/// Precipitation wins over sky state.
fn map_condition(sky: Option<&str>, pty: Option<&str>) -> &'static str {
    match pty {
        Some("1") | Some("5") => return "비",
        Some("2") | Some("6") => return "비/눈",
        Some("3") | Some("7") => return "눈",
        Some("4") => return "소나기",
        _ => {}
    }
    match sky {
        Some("1") => "맑음",
        Some("3") => "구름많음",
        Some("4") => "흐림",
        _ => UNKNOWN_CONDITION,
    }
}

/// WMO weather code → localized condition text (Open-Meteo fallback).
fn wmo_condition(code: i64) -> &'static str {
    match code {
        0 => "맑음",
        1 => "대체로 맑음",
        2 => "부분적으로 흐림",
        3 => "흐림",
        45 => "안개",
        48 => "착빙 안개",
        51 => "이슬비(약)",
        53 => "이슬비(보통)",
        55 => "이슬비(강)",
        56 => "어는 이슬비(약)",
        57 => "어는 이슬비(강)",
        61 => "비(약)",
        63 => "비(보통)",
        65 => "비(강)",
        66 => "어는 비(약)",
        67 => "어는 비(강)",
        71 => "눈(약)",
        73 => "눈(보통)",
        75 => "눈(강)",
        77 => "눈송이",
        80 => "소나기(약)",
        81 => "소나기(보통)",
        82 => "소나기(강)",
        85 => "소낙눈(약)",
        86 => "소낙눈(강)",
        95 => "뇌우",
        96 => "뇌우/우박(약)",
        99 => "뇌우/우박(강)",
        _ => UNKNOWN_CONDITION,
    }
}

fn iso_date(yyyymmdd: &str) -> Option<String> {
    if yyyymmdd.len() != 8 || !yyyymmdd.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(format!(
        "{}-{}-{}",
        &yyyymmdd[..4],
        &yyyymmdd[4..6],
        &yyyymmdd[6..]
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn seoul_city_hall_maps_to_grid_60_127() {
        assert_eq!(latlon_to_grid(37.5665, 126.9780), (60, 127));
    }

    #[test]
    fn forecast_time_rounds_half_up() {
        assert_eq!(nearest_forecast_time("09:34"), "1000");
        assert_eq!(nearest_forecast_time("0912"), "0900");
        assert_eq!(nearest_forecast_time("23:45"), "0000");
        assert_eq!(nearest_forecast_time("13:00"), "1300");
        assert_eq!(nearest_forecast_time("nonsense"), "1200");
        assert_eq!(nearest_forecast_time("9:3"), "1200");
    }

    #[test]
    fn base_time_is_latest_issue_for_today() {
        let now = NaiveDate::from_ymd_opt(2025, 8, 23)
            .unwrap()
            .and_hms_opt(13, 10, 0)
            .unwrap();
        let today = now.date();
        assert_eq!(
            pick_base_date_time(today, now),
            ("20250823".to_string(), "1100".to_string())
        );

        let early = today.and_hms_opt(1, 0, 0).unwrap();
        assert_eq!(
            pick_base_date_time(today, early),
            ("20250823".to_string(), "0200".to_string())
        );

        let other_day = NaiveDate::from_ymd_opt(2025, 8, 25).unwrap();
        assert_eq!(
            pick_base_date_time(other_day, now),
            ("20250825".to_string(), "1100".to_string())
        );
    }

    #[test]
    fn precipitation_outranks_sky_state() {
        assert_eq!(map_condition(Some("1"), Some("1")), "비");
        assert_eq!(map_condition(Some("1"), Some("4")), "소나기");
        assert_eq!(map_condition(Some("1"), None), "맑음");
        assert_eq!(map_condition(Some("3"), Some("0")), "구름많음");
        assert_eq!(map_condition(Some("4"), None), "흐림");
        assert_eq!(map_condition(None, None), UNKNOWN_CONDITION);
    }

    #[test]
    fn weather_text_degrades_gracefully() {
        let full = WeatherReport {
            temperature: Some(27.3),
            condition: "맑음".to_string(),
        };
        assert_eq!(full.weather_text(), "맑음, 27°C");

        let condition_only = WeatherReport {
            temperature: None,
            condition: "흐림".to_string(),
        };
        assert_eq!(condition_only.weather_text(), "흐림");

        let temperature_only = WeatherReport {
            temperature: Some(26.8),
            condition: UNKNOWN_CONDITION.to_string(),
        };
        assert_eq!(temperature_only.weather_text(), "27°C");

        assert_eq!(WeatherReport::unknown().weather_text(), "날씨 정보 없음");
    }

    #[tokio::test]
    async fn falls_back_to_open_meteo_without_a_kma_key() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/forecast")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "hourly": {
                        "time": ["2025-08-23T12:00", "2025-08-23T13:00"],
                        "temperature_2m": [26.0, 27.3],
                        "weathercode": [0, 3]
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let mut service = WeatherService::new(None);
        service.set_open_meteo_base_url(server.url());

        let report = service.report(37.4979, 127.0276, "20250823", "13:10").await;
        assert_eq!(report.temperature, Some(27.3));
        assert_eq!(report.condition, "흐림");
    }

    #[tokio::test]
    async fn kma_bucket_drives_the_primary_report() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", KMA_FORECAST_PATH)
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "response": { "body": { "items": { "item": [
                        { "fcstDate": "20250823", "fcstTime": "1300", "category": "TMP", "fcstValue": "27" },
                        { "fcstDate": "20250823", "fcstTime": "1300", "category": "SKY", "fcstValue": "1" },
                        { "fcstDate": "20250823", "fcstTime": "1300", "category": "PTY", "fcstValue": "0" },
                        { "fcstDate": "20250823", "fcstTime": "1400", "category": "TMP", "fcstValue": "30" }
                    ] } } }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let mut service = WeatherService::new(Some("test-key".to_string()));
        service.set_kma_base_url(server.url());

        let report = service.report(37.5665, 126.9780, "20250823", "12:40").await;
        assert_eq!(report.temperature, Some(27.0));
        assert_eq!(report.condition, "맑음");
    }

    #[tokio::test]
    async fn degrades_to_unknown_when_both_providers_fail() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/forecast")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let mut service = WeatherService::new(None);
        service.set_open_meteo_base_url(server.url());

        let report = service.report(37.5665, 126.9780, "20250823", "13:00").await;
        assert_eq!(report, WeatherReport::unknown());
    }
}
