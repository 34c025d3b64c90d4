//! Presentation: turns fetched data into the view model a front-end draws.
//!
//! The [`Screen`] plays the role of the document. [`Renderer`] is the only writer and
//! publishes a copy of the screen on a watch channel after every change.

use chrono::Local;
use tokio::sync::watch;

use crate::{
    model::{ForecastSeries, Settings, TemperatureUnit, Theme, WeatherSnapshot},
    storage::Persistence,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icon {
    Sun,
    Moon,
    CloudSun,
    CloudMoon,
    CloudShowersHeavy,
    CloudRain,
    Bolt,
    Snowflake,
    Smog,
    Unknown,
}

impl Icon {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sun => "sun",
            Self::Moon => "moon",
            Self::CloudSun => "cloud-sun",
            Self::CloudMoon => "cloud-moon",
            Self::CloudShowersHeavy => "cloud-showers-heavy",
            Self::CloudRain => "cloud-rain",
            Self::Bolt => "bolt",
            Self::Snowflake => "snowflake",
            Self::Smog => "smog",
            Self::Unknown => "question",
        }
    }

    /// Single glyph for terminal output.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Sun => "☀",
            Self::Moon => "☾",
            Self::CloudSun | Self::CloudMoon => "⛅",
            Self::CloudShowersHeavy => "⛈",
            Self::CloudRain => "☂",
            Self::Bolt => "⚡",
            Self::Snowflake => "❄",
            Self::Smog => "≋",
            Self::Unknown => "?",
        }
    }
}

/// Provider condition code to icon. Unknown codes never fail.
pub fn icon_for(code: &str) -> Icon {
    match code {
        "01d" => Icon::Sun,
        "01n" => Icon::Moon,
        "02d" | "03d" | "04d" => Icon::CloudSun,
        "02n" | "03n" | "04n" => Icon::CloudMoon,
        "09d" | "09n" => Icon::CloudShowersHeavy,
        "10d" | "10n" => Icon::CloudRain,
        "11d" | "11n" => Icon::Bolt,
        "13d" | "13n" => Icon::Snowflake,
        "50d" | "50n" => Icon::Smog,
        _ => Icon::Unknown,
    }
}

pub fn format_temperature(value: f64, unit: TemperatureUnit) -> String {
    format!("{value:.1}{}", unit.glyph())
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrentView {
    /// City as the favorite toggle should receive it.
    pub city: String,
    pub title: String,
    pub icon: Icon,
    pub temperature: String,
    pub description: String,
    pub humidity: String,
    pub wind: String,
    pub min: String,
    pub max: String,
    pub updated: String,
    pub is_favorite: bool,
    pub favorite_label: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastCell {
    pub label: String,
    pub icon: Icon,
    pub description: String,
    pub min: String,
    pub max: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FavoriteItem {
    pub city: String,
    pub icon: Icon,
    pub temperature: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Loading,
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusBanner {
    pub message: String,
    pub level: StatusLevel,
}

/// Content state of one screen region.
#[derive(Debug, Clone, PartialEq)]
pub enum Panel<T> {
    /// Nothing to show; for the favorites list this is the "no favorites" state.
    Empty,
    Loading,
    Ready(T),
}

impl<T> Panel<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Screen {
    pub current: Panel<CurrentView>,
    pub forecast: Panel<Vec<ForecastCell>>,
    pub favorites: Panel<Vec<FavoriteItem>>,
    pub status: Option<StatusBanner>,
    pub theme: Theme,
    pub unit: TemperatureUnit,
}

impl Screen {
    fn new(settings: &Settings) -> Self {
        Self {
            current: Panel::Empty,
            forecast: Panel::Empty,
            favorites: Panel::Loading,
            status: None,
            theme: settings.theme,
            unit: settings.unit,
        }
    }

    /// Label for the unit toggle control.
    pub fn unit_toggle_label(&self) -> &'static str {
        match self.unit {
            TemperatureUnit::Celsius => "C / F",
            TemperatureUnit::Fahrenheit => "F / C",
        }
    }
}

pub fn current_view(snapshot: &WeatherSnapshot, is_favorite: bool, unit: TemperatureUnit) -> CurrentView {
    let s = snapshot.in_unit(unit);
    CurrentView {
        city: s.city.clone(),
        title: if s.country.is_empty() { s.city.clone() } else { format!("{}, {}", s.city, s.country) },
        icon: icon_for(&s.condition_code),
        temperature: format_temperature(s.temperature.current, unit),
        description: s.description.clone(),
        humidity: format!("{}%", s.humidity_pct),
        wind: format!("{:.1} {}", s.wind_speed, unit.wind_label()),
        min: format_temperature(s.temperature.min, unit),
        max: format_temperature(s.temperature.max, unit),
        updated: s.observed_at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
        is_favorite,
        favorite_label: if is_favorite { "Remove from Favorites" } else { "Add to Favorites" },
    }
}

pub fn forecast_view(series: &ForecastSeries, unit: TemperatureUnit) -> Vec<ForecastCell> {
    series
        .days
        .iter()
        .map(|day| {
            let d = day.in_unit(unit);
            ForecastCell {
                label: d.observed_at.with_timezone(&Local).format("%a %-d").to_string(),
                icon: icon_for(&d.condition_code),
                description: d.description,
                min: format_temperature(d.temperature.min, unit),
                max: format_temperature(d.temperature.max, unit),
            }
        })
        .collect()
}

pub fn favorites_view(snapshots: &[WeatherSnapshot], unit: TemperatureUnit) -> Panel<Vec<FavoriteItem>> {
    if snapshots.is_empty() {
        return Panel::Empty;
    }

    Panel::Ready(
        snapshots
            .iter()
            .map(|s| FavoriteItem {
                city: s.city.clone(),
                icon: icon_for(&s.condition_code),
                temperature: format_temperature(s.in_unit(unit).temperature.current, unit),
            })
            .collect(),
    )
}

pub fn status_banner(message: impl Into<String>, level: StatusLevel) -> StatusBanner {
    StatusBanner { message: message.into(), level }
}

/// Data currently on screen, kept so a unit change can re-display it.
#[derive(Debug, Default)]
struct Shown {
    current: Option<(WeatherSnapshot, bool)>,
    forecast: Option<ForecastSeries>,
    favorites: Option<Vec<WeatherSnapshot>>,
}

#[derive(Debug)]
pub struct Renderer {
    screen: Screen,
    shown: Shown,
    tx: watch::Sender<Screen>,
}

impl Renderer {
    pub fn new(settings: &Settings) -> Self {
        let screen = Screen::new(settings);
        let (tx, _rx) = watch::channel(screen.clone());
        Self { screen, shown: Shown::default(), tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<Screen> {
        self.tx.subscribe()
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn render_current(&mut self, snapshot: WeatherSnapshot, is_favorite: bool) {
        self.screen.current = Panel::Ready(current_view(&snapshot, is_favorite, self.screen.unit));
        self.shown.current = Some((snapshot, is_favorite));
        self.publish();
    }

    pub fn render_forecast(&mut self, series: ForecastSeries) {
        self.screen.forecast = Panel::Ready(forecast_view(&series, self.screen.unit));
        self.shown.forecast = Some(series);
        self.publish();
    }

    pub fn render_favorites(&mut self, snapshots: Vec<WeatherSnapshot>) {
        self.screen.favorites = favorites_view(&snapshots, self.screen.unit);
        self.shown.favorites = Some(snapshots);
        self.publish();
    }

    /// Loading also resets the current and forecast panels to their placeholder.
    pub fn set_status(&mut self, message: impl Into<String>, level: StatusLevel) {
        self.screen.status = Some(status_banner(message, level));
        if level == StatusLevel::Loading {
            self.screen.current = Panel::Loading;
            self.screen.forecast = Panel::Loading;
            self.shown.current = None;
            self.shown.forecast = None;
        }
        self.publish();
    }

    /// Flips the unit, persists it, and re-displays what is on screen in the new unit.
    pub fn toggle_unit(&mut self, settings: &mut Settings, persistence: &Persistence) -> TemperatureUnit {
        settings.unit = settings.unit.toggled();
        persistence.save_settings(settings);

        self.screen.unit = settings.unit;
        self.redisplay();
        settings.unit
    }

    pub fn toggle_theme(&mut self, settings: &mut Settings, persistence: &Persistence) -> Theme {
        settings.theme = settings.theme.toggled();
        persistence.save_settings(settings);

        self.screen.theme = settings.theme;
        self.publish();
        settings.theme
    }

    fn redisplay(&mut self) {
        let unit = self.screen.unit;
        if let Some((snapshot, is_favorite)) = &self.shown.current {
            self.screen.current = Panel::Ready(current_view(snapshot, *is_favorite, unit));
        }
        if let Some(series) = &self.shown.forecast {
            self.screen.forecast = Panel::Ready(forecast_view(series, unit));
        }
        if let Some(favorites) = &self.shown.favorites {
            self.screen.favorites = favorites_view(favorites, unit);
        }
        self.publish();
    }

    fn publish(&self) {
        self.tx.send_replace(self.screen.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Temperature;
    use crate::storage::MemoryStore;
    use chrono::DateTime;

    fn paris(temp: f64) -> WeatherSnapshot {
        WeatherSnapshot {
            city: "Paris".into(),
            country: "FR".into(),
            observed_at: DateTime::from_timestamp(1_700_049_600, 0).unwrap(),
            temperature: Temperature { min: temp - 1.0, current: temp, max: temp + 1.0 },
            humidity_pct: 81,
            wind_speed: 4.0,
            condition_code: "01d".into(),
            description: "clear sky".into(),
            unit: TemperatureUnit::Celsius,
        }
    }

    #[test]
    fn icon_table_covers_known_codes() {
        assert_eq!(icon_for("01d"), Icon::Sun);
        assert_eq!(icon_for("01n"), Icon::Moon);
        assert_eq!(icon_for("03d"), Icon::CloudSun);
        assert_eq!(icon_for("04n"), Icon::CloudMoon);
        assert_eq!(icon_for("09n"), Icon::CloudShowersHeavy);
        assert_eq!(icon_for("10d"), Icon::CloudRain);
        assert_eq!(icon_for("11d"), Icon::Bolt);
        assert_eq!(icon_for("13n"), Icon::Snowflake);
        assert_eq!(icon_for("50d"), Icon::Smog);
    }

    #[test]
    fn unknown_code_maps_to_unknown_icon() {
        assert_eq!(icon_for("99x"), Icon::Unknown);
        assert_eq!(icon_for(""), Icon::Unknown);
        assert_eq!(Icon::Unknown.as_str(), "question");
    }

    #[test]
    fn temperature_has_one_decimal_and_glyph() {
        assert_eq!(format_temperature(15.0, TemperatureUnit::Celsius), "15.0°C");
        assert_eq!(format_temperature(59.04, TemperatureUnit::Fahrenheit), "59.0°F");
        assert_eq!(format_temperature(-3.0, TemperatureUnit::Celsius), "-3.0°C");
    }

    #[test]
    fn current_view_reflects_favorite_state() {
        let view = current_view(&paris(15.0), true, TemperatureUnit::Celsius);
        assert_eq!(view.title, "Paris, FR");
        assert_eq!(view.temperature, "15.0°C");
        assert_eq!(view.min, "14.0°C");
        assert_eq!(view.humidity, "81%");
        assert_eq!(view.wind, "4.0 m/s");
        assert_eq!(view.favorite_label, "Remove from Favorites");

        let view = current_view(&paris(15.0), false, TemperatureUnit::Celsius);
        assert_eq!(view.favorite_label, "Add to Favorites");
    }

    #[test]
    fn forecast_has_one_cell_per_day() {
        let series = ForecastSeries { city: "Paris".into(), days: vec![paris(10.0), paris(12.0)] };
        let cells = forecast_view(&series, TemperatureUnit::Celsius);
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[1].max, "13.0°C");
    }

    #[test]
    fn forecast_labels_use_the_local_calendar_day() {
        let mut late = paris(10.0);
        late.observed_at = DateTime::from_timestamp(1_700_091_000, 0).unwrap(); // 23:30 UTC
        let series = ForecastSeries { city: "Paris".into(), days: vec![late.clone()] };

        let cells = forecast_view(&series, TemperatureUnit::Celsius);
        let local_day = late.observed_at.with_timezone(&Local).format("%a %-d").to_string();
        assert_eq!(cells[0].label, local_day);
    }

    #[test]
    fn empty_favorites_render_empty_state() {
        assert_eq!(favorites_view(&[], TemperatureUnit::Celsius), Panel::Empty);

        let panel = favorites_view(&[paris(15.0)], TemperatureUnit::Fahrenheit);
        let items = panel.ready().unwrap();
        assert_eq!(items[0].temperature, "59.0°F");
    }

    #[test]
    fn loading_status_resets_panels() {
        let mut r = Renderer::new(&Settings::default());
        r.render_current(paris(15.0), false);
        r.render_forecast(ForecastSeries { city: "Paris".into(), days: vec![paris(15.0)] });

        r.set_status("Fetching weather for Paris...", StatusLevel::Loading);

        assert!(r.screen().current.is_loading());
        assert!(r.screen().forecast.is_loading());
    }

    #[test]
    fn other_statuses_leave_panels_alone() {
        let mut r = Renderer::new(&Settings::default());
        r.render_current(paris(15.0), false);
        r.set_status("oops", StatusLevel::Error);

        assert!(r.screen().current.ready().is_some());
        assert_eq!(r.screen().status.as_ref().unwrap().level, StatusLevel::Error);
    }

    #[test]
    fn toggle_unit_persists_and_redisplays_cached_value() {
        let persistence = Persistence::new(MemoryStore::new());
        let mut settings = Settings::default();
        let mut r = Renderer::new(&settings);
        r.render_current(paris(15.0), false);

        let unit = r.toggle_unit(&mut settings, &persistence);

        assert_eq!(unit, TemperatureUnit::Fahrenheit);
        assert_eq!(persistence.load_settings().unit, TemperatureUnit::Fahrenheit);
        assert_eq!(r.screen().current.ready().unwrap().temperature, "59.0°F");
        assert_eq!(r.screen().unit_toggle_label(), "F / C");
    }

    #[test]
    fn toggle_theme_persists() {
        let persistence = Persistence::new(MemoryStore::new());
        let mut settings = Settings::default();
        let mut r = Renderer::new(&settings);

        assert_eq!(r.toggle_theme(&mut settings, &persistence), Theme::Dark);
        assert_eq!(persistence.load_settings().theme, Theme::Dark);
        assert_eq!(r.screen().theme, Theme::Dark);
    }

    #[test]
    fn subscribers_see_every_change() {
        let mut r = Renderer::new(&Settings::default());
        let mut rx = r.subscribe();

        r.set_status("hello", StatusLevel::Info);

        assert!(rx.has_changed().unwrap());
        let screen = rx.borrow_and_update();
        assert_eq!(screen.status.as_ref().unwrap().message, "hello");
    }
}
