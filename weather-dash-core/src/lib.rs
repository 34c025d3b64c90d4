//! Core library for the `weather-dash` dashboard.
//!
//! This crate defines:
//! - Configuration handling
//! - The OpenWeather client and the provider abstraction over it
//! - Persistence of favorites and settings
//! - Rendering of fetched data into a front-end agnostic screen model
//! - The controller that ties searches, favorites and auto-refresh together
//!
//! It is used by `weather-dash-cli`, but any front-end that can draw a [`Screen`]
//! and send [`Command`]s can drive it.

pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod provider;
pub mod render;
pub mod storage;

pub use config::Config;
pub use controller::{Command, Dashboard, DashboardOptions};
pub use error::{StorageError, ValidationError, WeatherError};
pub use model::{
    CityQuery, Favorites, FetchUnits, ForecastSeries, Settings, TemperatureUnit, Theme,
    WeatherSnapshot,
};
pub use provider::{OpenWeatherClient, WeatherProvider, fetch_batch};
pub use render::{Panel, Screen, StatusLevel};
pub use storage::{FileStore, KeyValueStore, MemoryStore, Persistence};
