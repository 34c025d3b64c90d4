use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::{
    error::WeatherError,
    model::{FetchUnits, ForecastSeries, Temperature, WeatherSnapshot},
};

use super::WeatherProvider;

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Marker in `dt_txt` of the 3-hourly feed that picks one sample per day.
const MIDDAY_MARKER: &str = "12:00:00";

#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherClient {
    pub fn with_base_url(api_key: String, base_url: &str) -> Result<Self, WeatherError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|source| WeatherError::Transport { resource: "weather", source })?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// GET `{base}/{endpoint}` and hand back the body of a 2xx answer.
    ///
    /// `Err(status)` carries non-success statuses so each endpoint can name its
    /// own 404.
    async fn get(
        &self,
        endpoint: &'static str,
        city: &str,
        units: FetchUnits,
    ) -> Result<Result<String, StatusCode>, WeatherError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(%url, %city, units = units.as_str(), "requesting");

        let res = self
            .http
            .get(&url)
            .query(&[
                ("q", city),
                ("units", units.as_str()),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|source| WeatherError::Transport { resource: endpoint, source })?;

        let status = res.status();
        if !status.is_success() {
            debug!(%status, endpoint, "provider returned error status");
            return Ok(Err(status));
        }

        let body = res
            .text()
            .await
            .map_err(|source| WeatherError::Transport { resource: endpoint, source })?;
        Ok(Ok(body))
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn fetch_current(
        &self,
        city: &str,
        units: FetchUnits,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let body = match self.get("weather", city, units).await? {
            Ok(body) => body,
            Err(StatusCode::NOT_FOUND) => {
                return Err(WeatherError::NotFound { city: city.to_string() });
            }
            Err(status) => return Err(WeatherError::Http { status }),
        };

        let parsed: OwCurrentResponse = serde_json::from_str(&body)?;
        Ok(parsed.into_snapshot(units))
    }

    async fn fetch_forecast(
        &self,
        city: &str,
        units: FetchUnits,
    ) -> Result<ForecastSeries, WeatherError> {
        let body = match self.get("forecast", city, units).await? {
            Ok(body) => body,
            Err(StatusCode::NOT_FOUND) => {
                return Err(WeatherError::Unavailable { city: city.to_string() });
            }
            Err(status) => return Err(WeatherError::Http { status }),
        };

        let parsed: OwForecastResponse = serde_json::from_str(&body)?;
        Ok(parsed.into_series(units))
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    #[serde(default)]
    temp_min: Option<f64>,
    #[serde(default)]
    temp_max: Option<f64>,
    #[serde(default)]
    humidity: u8,
}

impl OwMain {
    fn temperature(&self) -> Temperature {
        Temperature {
            min: self.temp_min.unwrap_or(self.temp),
            current: self.temp,
            max: self.temp_max.unwrap_or(self.temp),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    icon: String,
    description: String,
}

#[derive(Debug, Default, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Default, Deserialize)]
struct OwSys {
    #[serde(default)]
    country: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    #[serde(default)]
    dt: i64,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    #[serde(default)]
    wind: OwWind,
    #[serde(default)]
    sys: OwSys,
}

impl OwCurrentResponse {
    fn into_snapshot(self, units: FetchUnits) -> WeatherSnapshot {
        build_snapshot(
            self.name,
            self.sys.country,
            self.dt,
            &self.main,
            self.weather.first(),
            self.wind.speed,
            units,
        )
    }
}

#[derive(Debug, Deserialize)]
struct OwCity {
    name: String,
    #[serde(default)]
    country: String,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    dt_txt: String,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    #[serde(default)]
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: OwCity,
    list: Vec<OwForecastEntry>,
}

impl OwForecastResponse {
    fn into_series(self, units: FetchUnits) -> ForecastSeries {
        let days = self
            .list
            .iter()
            .filter(|entry| entry.dt_txt.contains(MIDDAY_MARKER))
            .map(|entry| {
                build_snapshot(
                    self.city.name.clone(),
                    self.city.country.clone(),
                    entry.dt,
                    &entry.main,
                    entry.weather.first(),
                    entry.wind.speed,
                    units,
                )
            })
            .collect();

        ForecastSeries { city: self.city.name, days }
    }
}

fn build_snapshot(
    city: String,
    country: String,
    dt: i64,
    main: &OwMain,
    weather: Option<&OwWeather>,
    wind_speed: f64,
    units: FetchUnits,
) -> WeatherSnapshot {
    let (condition_code, description) = weather
        .map(|w| (w.icon.clone(), w.description.clone()))
        .unwrap_or_else(|| (String::new(), "Unknown".to_string()));

    WeatherSnapshot {
        city,
        country,
        observed_at: DateTime::from_timestamp(dt, 0).unwrap_or_else(Utc::now),
        temperature: main.temperature(),
        humidity_pct: main.humidity,
        wind_speed,
        condition_code,
        description,
        unit: units.temperature_unit(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TemperatureUnit;

    fn entry(dt: i64, dt_txt: &str, temp: f64) -> serde_json::Value {
        serde_json::json!({
            "dt": dt,
            "dt_txt": dt_txt,
            "main": { "temp": temp, "temp_min": temp - 1.0, "temp_max": temp + 1.0, "humidity": 60 },
            "weather": [{ "icon": "10d", "description": "light rain" }],
            "wind": { "speed": 2.5 }
        })
    }

    #[test]
    fn forecast_keeps_only_midday_samples() {
        let json = serde_json::json!({
            "city": { "name": "Paris", "country": "FR" },
            "list": [
                entry(1_700_000_000, "2023-11-14 09:00:00", 10.0),
                entry(1_700_010_800, "2023-11-14 12:00:00", 12.0),
                entry(1_700_021_600, "2023-11-14 15:00:00", 11.0),
                entry(1_700_097_200, "2023-11-15 12:00:00", 13.0),
            ]
        });

        let parsed: OwForecastResponse = serde_json::from_value(json).unwrap();
        let series = parsed.into_series(FetchUnits::Metric);

        assert_eq!(series.city, "Paris");
        assert_eq!(series.len(), 2);
        assert_eq!(series.days[0].temperature.current, 12.0);
        assert_eq!(series.days[1].temperature.current, 13.0);
        assert_eq!(series.days[1].temperature.min, 12.0);
        assert_eq!(series.days[0].condition_code, "10d");
    }

    #[test]
    fn current_response_maps_all_fields() {
        let json = serde_json::json!({
            "name": "Paris",
            "dt": 1_700_000_000,
            "sys": { "country": "FR" },
            "main": { "temp": 15.0, "temp_min": 13.5, "temp_max": 16.2, "humidity": 81 },
            "weather": [{ "icon": "04d", "description": "broken clouds" }],
            "wind": { "speed": 4.1 }
        });

        let parsed: OwCurrentResponse = serde_json::from_value(json).unwrap();
        let snap = parsed.into_snapshot(FetchUnits::Imperial);

        assert_eq!(snap.city, "Paris");
        assert_eq!(snap.country, "FR");
        assert_eq!(snap.observed_at.timestamp(), 1_700_000_000);
        assert_eq!(snap.temperature, Temperature { min: 13.5, current: 15.0, max: 16.2 });
        assert_eq!(snap.humidity_pct, 81);
        assert_eq!(snap.wind_speed, 4.1);
        assert_eq!(snap.description, "broken clouds");
        assert_eq!(snap.unit, TemperatureUnit::Fahrenheit);
    }

    #[test]
    fn sparse_current_response_still_parses() {
        let json = serde_json::json!({ "name": "Paris", "main": { "temp": 15 } });

        let parsed: OwCurrentResponse = serde_json::from_value(json).unwrap();
        let snap = parsed.into_snapshot(FetchUnits::Metric);

        assert_eq!(snap.temperature.current, 15.0);
        assert_eq!(snap.temperature.min, 15.0);
        assert_eq!(snap.description, "Unknown");
        assert!(snap.condition_code.is_empty());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = OpenWeatherClient::with_base_url("KEY".into(), "http://localhost:1/").unwrap();
        assert_eq!(client.base_url, "http://localhost:1");
    }
}
