use async_trait::async_trait;
use futures_util::future::join_all;
use std::fmt::Debug;
use tracing::{debug, warn};

use crate::{
    error::WeatherError,
    model::{FetchUnits, ForecastSeries, WeatherSnapshot},
};

pub mod openweather;

pub use openweather::OpenWeatherClient;

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch_current(
        &self,
        city: &str,
        units: FetchUnits,
    ) -> Result<WeatherSnapshot, WeatherError>;

    async fn fetch_forecast(
        &self,
        city: &str,
        units: FetchUnits,
    ) -> Result<ForecastSeries, WeatherError>;
}

/// Current conditions for many cities at once.
///
/// Requests run concurrently. A city whose request fails is logged and left out of
/// the result; the call itself never fails. No request is issued for an empty list.
pub async fn fetch_batch(
    provider: &dyn WeatherProvider,
    cities: &[String],
    units: FetchUnits,
) -> Vec<WeatherSnapshot> {
    if cities.is_empty() {
        return Vec::new();
    }

    debug!(count = cities.len(), units = units.as_str(), "fetching batch");

    let results = join_all(cities.iter().map(|city| async move {
        (city, provider.fetch_current(city, units).await)
    }))
    .await;

    results
        .into_iter()
        .filter_map(|(city, result)| match result {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(%city, kind = e.kind(), error = %e, "skipping failed fetch for favorite city");
                None
            }
        })
        .collect()
}
