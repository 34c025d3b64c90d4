//! Application controller: owns the session and wires fetches to the renderer.
//!
//! Fetches run on spawned tasks and come back as events through an internal channel,
//! so no handler waits on the network. Every search and favorites reload is tagged
//! with a generation number; a result whose generation has been superseded is
//! dropped, so the most recently *issued* request wins rather than the last one to
//! resolve.

use std::{sync::Arc, time::Duration};

use chrono::Local;
use tokio::{
    sync::{mpsc, watch},
    time::{Instant, Interval, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    error::WeatherError,
    model::{CityQuery, FavoriteToggle, Favorites, ForecastSeries, Settings, WeatherSnapshot},
    provider::{OpenWeatherClient, WeatherProvider, fetch_batch},
    render::{Renderer, Screen, StatusLevel},
    storage::{FileStore, Persistence},
};

/// User intents delivered to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Raw search box contents; trimmed before use.
    Search(String),
    Refresh,
    /// A favorites list entry was picked.
    SelectFavorite(String),
    ToggleFavorite(String),
    RemoveFavorite(String),
    ToggleUnit,
    ToggleTheme,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardOptions {
    pub default_city: String,
    pub refresh_interval: Duration,
}

impl From<&Config> for DashboardOptions {
    fn from(config: &Config) -> Self {
        Self {
            default_city: config.default_city.clone(),
            refresh_interval: config.refresh_interval(),
        }
    }
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

type SearchOutcome = Result<(WeatherSnapshot, ForecastSeries), WeatherError>;

#[derive(Debug)]
enum Event {
    Searched { generation: u64, city: String, outcome: SearchOutcome },
    FavoritesLoaded { generation: u64, snapshots: Vec<WeatherSnapshot> },
}

enum Step {
    Command(Command),
    Event(Event),
    Tick,
}

pub struct Dashboard {
    provider: Arc<dyn WeatherProvider>,
    persistence: Persistence,
    renderer: Renderer,
    settings: Settings,
    favorites: Favorites,
    options: DashboardOptions,

    active_city: Option<String>,
    timer: Option<Interval>,
    search_generation: u64,
    favorites_generation: u64,
    in_flight: usize,

    events_tx: mpsc::UnboundedSender<Event>,
    events_rx: mpsc::UnboundedReceiver<Event>,
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("active_city", &self.active_city)
            .field("settings", &self.settings)
            .field("favorites", &self.favorites)
            .field("timer_armed", &self.timer.is_some())
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

impl Dashboard {
    /// Loads favorites and settings once; nothing is fetched until [`Dashboard::start`].
    pub fn new(
        provider: Arc<dyn WeatherProvider>,
        persistence: Persistence,
        options: DashboardOptions,
    ) -> Self {
        let settings = persistence.load_settings();
        let favorites = persistence.load_favorites();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        debug!(?settings, favorites = favorites.len(), "dashboard state loaded");

        Self {
            provider,
            persistence,
            renderer: Renderer::new(&settings),
            settings,
            favorites,
            options,
            active_city: None,
            timer: None,
            search_generation: 0,
            favorites_generation: 0,
            in_flight: 0,
            events_tx,
            events_rx,
        }
    }

    /// OpenWeather client plus file-backed storage, both taken from `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api_key = config.api_key()?.to_string();
        let client = OpenWeatherClient::with_base_url(api_key, &config.base_url)?;
        let store = FileStore::new(config.storage_dir()?);

        Ok(Self::new(
            Arc::new(client),
            Persistence::new(store),
            DashboardOptions::from(config),
        ))
    }

    pub fn screen(&self) -> &Screen {
        self.renderer.screen()
    }

    pub fn subscribe(&self) -> watch::Receiver<Screen> {
        self.renderer.subscribe()
    }

    pub fn active_city(&self) -> Option<&str> {
        self.active_city.as_deref()
    }

    pub fn favorites(&self) -> &Favorites {
        &self.favorites
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn timer_armed(&self) -> bool {
        self.timer.is_some()
    }

    /// Picks the first favorite (or the default city), then loads it and the favorites panel.
    pub fn start(&mut self) {
        let initial = self
            .favorites
            .first()
            .unwrap_or(self.options.default_city.as_str())
            .to_string();

        info!(city = %initial, "starting dashboard");
        self.active_city = Some(initial.clone());
        self.reload_favorites();
        self.search(&initial);
    }

    /// Starts the session and processes commands until the sender side is dropped.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        self.start();

        loop {
            let step = tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(cmd) => Step::Command(cmd),
                    None => break,
                },
                Some(event) = self.events_rx.recv() => Step::Event(event),
                _ = next_tick(&mut self.timer) => Step::Tick,
            };

            match step {
                Step::Command(cmd) => self.dispatch(cmd),
                Step::Event(event) => self.on_event(event),
                Step::Tick => self.tick(),
            }
        }

        info!("dashboard stopped");
    }

    pub fn dispatch(&mut self, command: Command) {
        debug!(?command, "dispatch");
        match command {
            Command::Search(raw) => self.search(&raw),
            Command::Refresh => self.refresh(),
            Command::SelectFavorite(city) => self.search(&city),
            Command::ToggleFavorite(city) => self.toggle_favorite(&city),
            Command::RemoveFavorite(city) => self.remove_favorite(&city),
            Command::ToggleUnit => self.toggle_unit(),
            Command::ToggleTheme => self.toggle_theme(),
        }
    }

    /// Auto-refresh: reload the active city and the favorites panel.
    pub fn tick(&mut self) {
        info!(city = ?self.active_city, "auto-refreshing");
        if let Some(city) = self.active_city.clone() {
            self.search(&city);
        }
        self.reload_favorites();
    }

    /// Resolves when the armed refresh timer fires; never while unarmed.
    pub async fn next_refresh(&mut self) {
        next_tick(&mut self.timer).await;
    }

    /// Applies fetch results until nothing is in flight.
    pub async fn settle(&mut self) {
        while self.in_flight > 0 {
            match self.events_rx.recv().await {
                Some(event) => self.on_event(event),
                None => break,
            }
        }
    }

    /// Trimmed city name, or a warning banner and `None` when it is blank.
    fn city_query(&mut self, raw: &str) -> Option<String> {
        match CityQuery::parse(raw) {
            Ok(city) => Some(city.into_string()),
            Err(e) => {
                self.renderer.set_status(e.to_string(), StatusLevel::Warning);
                None
            }
        }
    }

    fn search(&mut self, raw: &str) {
        let Some(city) = self.city_query(raw) else { return };

        self.search_generation += 1;
        let generation = self.search_generation;
        let units = self.settings.unit.fetch_units();

        self.renderer
            .set_status(format!("Fetching weather for {city}..."), StatusLevel::Loading);

        let provider = Arc::clone(&self.provider);
        let tx = self.events_tx.clone();
        self.in_flight += 1;

        tokio::spawn(async move {
            let (current, forecast) = tokio::join!(
                provider.fetch_current(&city, units),
                provider.fetch_forecast(&city, units),
            );
            let outcome = current.and_then(|c| forecast.map(|f| (c, f)));

            if tx.send(Event::Searched { generation, city, outcome }).is_err() {
                debug!(generation, "dashboard gone; dropping search result");
            }
        });
    }

    fn reload_favorites(&mut self) {
        self.favorites_generation += 1;
        let generation = self.favorites_generation;
        let units = self.settings.unit.fetch_units();
        let cities = self.favorites.as_slice().to_vec();

        let provider = Arc::clone(&self.provider);
        let tx = self.events_tx.clone();
        self.in_flight += 1;

        tokio::spawn(async move {
            let snapshots = fetch_batch(provider.as_ref(), &cities, units).await;

            if tx.send(Event::FavoritesLoaded { generation, snapshots }).is_err() {
                debug!(generation, "dashboard gone; dropping favorites result");
            }
        });
    }

    fn refresh(&mut self) {
        match self.active_city.clone() {
            Some(city) => self.search(&city),
            None => self
                .renderer
                .set_status("Please search for a city first.", StatusLevel::Warning),
        }
    }

    fn toggle_favorite(&mut self, raw: &str) {
        let Some(city) = self.city_query(raw) else { return };
        let toggled = self.favorites.toggle(&city);
        self.persistence.save_favorites(&self.favorites);

        self.search(&city);
        self.reload_favorites();

        match toggled {
            FavoriteToggle::Added => self
                .renderer
                .set_status(format!("Added {city} to favorites."), StatusLevel::Success),
            FavoriteToggle::Removed => self
                .renderer
                .set_status(format!("Removed {city} from favorites."), StatusLevel::Info),
        }
    }

    fn remove_favorite(&mut self, raw: &str) {
        let Some(city) = self.city_query(raw) else { return };
        if self.favorites.remove(&city) {
            self.persistence.save_favorites(&self.favorites);
        }
        self.reload_favorites();

        if self.active_city.as_deref() == Some(city.as_str()) {
            let fallback = self
                .favorites
                .first()
                .unwrap_or(self.options.default_city.as_str())
                .to_string();

            info!(removed = %city, %fallback, "active city removed from favorites");
            self.active_city = Some(fallback.clone());
            self.search(&fallback);
        }

        self.renderer
            .set_status(format!("Removed {city} from favorites."), StatusLevel::Info);
    }

    fn toggle_unit(&mut self) {
        let unit = self.renderer.toggle_unit(&mut self.settings, &self.persistence);

        if let Some(city) = self.active_city.clone() {
            self.search(&city);
        }
        self.reload_favorites();

        self.renderer
            .set_status(format!("Temperature unit switched to {unit}."), StatusLevel::Info);
    }

    fn toggle_theme(&mut self) {
        let theme = self.renderer.toggle_theme(&mut self.settings, &self.persistence);
        info!(theme = theme.as_str(), "theme switched");
    }

    fn on_event(&mut self, event: Event) {
        self.in_flight = self.in_flight.saturating_sub(1);

        match event {
            Event::Searched { generation, city, outcome } => {
                if generation != self.search_generation {
                    debug!(generation, latest = self.search_generation, %city, "discarding stale search result");
                    return;
                }
                self.apply_search(city, outcome);
            }
            Event::FavoritesLoaded { generation, snapshots } => {
                if generation != self.favorites_generation {
                    debug!(generation, latest = self.favorites_generation, "discarding stale favorites result");
                    return;
                }
                self.renderer.render_favorites(snapshots);
            }
        }
    }

    fn apply_search(&mut self, city: String, outcome: SearchOutcome) {
        match outcome {
            Ok((current, forecast)) => {
                let is_favorite = self.favorites.contains(&city);
                self.renderer.render_current(current, is_favorite);
                self.renderer.render_forecast(forecast);

                self.renderer.set_status(
                    format!(
                        "Weather loaded successfully for {city}. Last updated: {}",
                        Local::now().format("%H:%M:%S")
                    ),
                    StatusLevel::Success,
                );
                self.active_city = Some(city);
                self.arm_timer();
            }
            Err(e) if e.is_not_found() => {
                info!(%city, kind = e.kind(), "city not known to the provider");
                self.renderer.set_status(format!("Error: {e}"), StatusLevel::Error);
            }
            Err(e) => {
                warn!(%city, kind = e.kind(), error = %e, "search failed");
                self.renderer.set_status(format!("Error: {e}"), StatusLevel::Error);
            }
        }
    }

    /// Replaces any armed timer, so at most one is ever pending.
    fn arm_timer(&mut self) {
        let period = self.options.refresh_interval;
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.timer = Some(interval);

        debug!(city = ?self.active_city, every_secs = period.as_secs(), "auto updates armed");
    }
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
