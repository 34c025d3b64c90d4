use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const MPS_PER_MPH: f64 = 0.44704;

/// A free-text location, trimmed and guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CityQuery(String);

impl CityQuery {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyCity);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for CityQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TemperatureUnit {
    #[default]
    #[serde(rename = "C")]
    Celsius,
    #[serde(rename = "F")]
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn glyph(&self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
        }
    }

    pub fn letter(&self) -> &'static str {
        match self {
            Self::Celsius => "C",
            Self::Fahrenheit => "F",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Celsius => Self::Fahrenheit,
            Self::Fahrenheit => Self::Celsius,
        }
    }

    /// Unit system to request from the provider so no local conversion is needed.
    pub fn fetch_units(self) -> FetchUnits {
        match self {
            Self::Celsius => FetchUnits::Metric,
            Self::Fahrenheit => FetchUnits::Imperial,
        }
    }

    /// Label for wind speed values fetched in this unit's system.
    pub fn wind_label(&self) -> &'static str {
        match self {
            Self::Celsius => "m/s",
            Self::Fahrenheit => "mph",
        }
    }
}

impl std::fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.letter())
    }
}

/// Provider-side unit system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchUnits {
    Metric,
    Imperial,
}

impl FetchUnits {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
        }
    }

    pub fn temperature_unit(self) -> TemperatureUnit {
        match self {
            Self::Metric => TemperatureUnit::Celsius,
            Self::Imperial => TemperatureUnit::Fahrenheit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

/// Persisted user preferences. Missing fields fall back to the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub unit: TemperatureUnit,
    pub theme: Theme,
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

fn convert_temperature(value: f64, from: TemperatureUnit, to: TemperatureUnit) -> f64 {
    match (from, to) {
        (TemperatureUnit::Celsius, TemperatureUnit::Fahrenheit) => celsius_to_fahrenheit(value),
        (TemperatureUnit::Fahrenheit, TemperatureUnit::Celsius) => fahrenheit_to_celsius(value),
        _ => value,
    }
}

fn convert_wind(value: f64, from: TemperatureUnit, to: TemperatureUnit) -> f64 {
    match (from, to) {
        (TemperatureUnit::Celsius, TemperatureUnit::Fahrenheit) => value / MPS_PER_MPH,
        (TemperatureUnit::Fahrenheit, TemperatureUnit::Celsius) => value * MPS_PER_MPH,
        _ => value,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    pub min: f64,
    pub current: f64,
    pub max: f64,
}

/// Current conditions for one city at one point in time.
///
/// Values are in `unit` (and the matching wind speed system); use
/// [`WeatherSnapshot::in_unit`] to re-display without fetching again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub city: String,
    pub country: String,
    pub observed_at: DateTime<Utc>,
    pub temperature: Temperature,
    pub humidity_pct: u8,
    pub wind_speed: f64,
    /// Provider condition code, e.g. `"01d"`.
    pub condition_code: String,
    pub description: String,
    pub unit: TemperatureUnit,
}

impl WeatherSnapshot {
    pub fn in_unit(&self, target: TemperatureUnit) -> Self {
        if self.unit == target {
            return self.clone();
        }

        let t = self.temperature;
        Self {
            temperature: Temperature {
                min: convert_temperature(t.min, self.unit, target),
                current: convert_temperature(t.current, self.unit, target),
                max: convert_temperature(t.max, self.unit, target),
            },
            wind_speed: convert_wind(self.wind_speed, self.unit, target),
            unit: target,
            ..self.clone()
        }
    }
}

/// One snapshot per calendar day, in chronological order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ForecastSeries {
    pub city: String,
    pub days: Vec<WeatherSnapshot>,
}

impl ForecastSeries {
    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteToggle {
    Added,
    Removed,
}

/// Ordered list of favorite cities without duplicates.
///
/// Equality is case-sensitive, exactly as the user typed the city.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Favorites(Vec<String>);

impl Favorites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, city: &str) -> bool {
        self.0.iter().any(|c| c == city)
    }

    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn toggle(&mut self, city: &str) -> FavoriteToggle {
        if self.remove(city) {
            FavoriteToggle::Removed
        } else {
            self.0.push(city.to_string());
            FavoriteToggle::Added
        }
    }

    /// Returns whether the city was present.
    pub fn remove(&mut self, city: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|c| c != city);
        self.0.len() != before
    }
}

impl From<Vec<String>> for Favorites {
    fn from(cities: Vec<String>) -> Self {
        let mut out: Vec<String> = Vec::with_capacity(cities.len());
        for city in cities {
            if !out.contains(&city) {
                out.push(city);
            }
        }
        Self(out)
    }
}
