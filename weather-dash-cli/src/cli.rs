use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{CustomType, Text};
use weather_dash_core::{Command as DashCommand, Config, Dashboard, Favorites, FileStore, Persistence};

use crate::{draw, interactive};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-dash", version, about = "Weather dashboard for the terminal")]
pub struct Cli {
    /// Defaults to `run` when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the API key, default city and refresh interval.
    Configure,

    /// Show current weather and the forecast for a city, then exit.
    Show {
        /// City name as understood by the provider.
        city: String,
    },

    /// Manage favorite cities without starting the dashboard.
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },

    /// Start the interactive dashboard.
    Run,
}

#[derive(Debug, Subcommand)]
pub enum FavoritesAction {
    List,
    Add { city: String },
    Remove { city: String },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = Config::load()?;

        match self.command.unwrap_or(Command::Run) {
            Command::Configure => configure(config),
            Command::Show { city } => show(&config, city).await,
            Command::Favorites { action } => favorites(&config, action),
            Command::Run => interactive::run(&config).await,
        }
    }
}

fn configure(mut config: Config) -> anyhow::Result<()> {
    let current_key = config.api_key.clone().unwrap_or_default();
    let api_key = Text::new("OpenWeather API key:")
        .with_default(&current_key)
        .prompt()
        .context("API key prompt aborted")?;

    let default_city = Text::new("Default city:")
        .with_default(&config.default_city)
        .prompt()
        .context("Default city prompt aborted")?;

    let refresh_interval_secs = CustomType::<u64>::new("Auto-refresh interval (seconds):")
        .with_default(config.refresh_interval_secs)
        .with_error_message("Please enter a whole number of seconds")
        .prompt()
        .context("Refresh interval prompt aborted")?;

    config.set_api_key(api_key.trim().to_string());
    config.default_city = default_city.trim().to_string();
    config.refresh_interval_secs = refresh_interval_secs;
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn show(config: &Config, city: String) -> anyhow::Result<()> {
    let mut dashboard = Dashboard::from_config(config)?;
    dashboard.dispatch(DashCommand::Search(city));
    dashboard.settle().await;

    let mut out = std::io::stdout();
    draw::draw_once(&mut out, dashboard.screen())?;
    Ok(())
}

fn favorites(config: &Config, action: FavoritesAction) -> anyhow::Result<()> {
    let persistence = Persistence::new(FileStore::new(config.storage_dir()?));
    let mut favs: Favorites = persistence.load_favorites();

    match action {
        FavoritesAction::List => {
            if favs.is_empty() {
                println!("No favorites saved yet.");
            }
            for (i, city) in favs.as_slice().iter().enumerate() {
                println!("{:>2}. {city}", i + 1);
            }
            return Ok(());
        }
        FavoritesAction::Add { city } => {
            let city = city.trim();
            if favs.contains(city) {
                println!("{city} is already a favorite.");
                return Ok(());
            }
            favs.toggle(city);
            println!("Added {city} to favorites.");
        }
        FavoritesAction::Remove { city } => {
            if !favs.remove(city.trim()) {
                println!("{} is not a favorite.", city.trim());
                return Ok(());
            }
            println!("Removed {} from favorites.", city.trim());
        }
    }

    persistence.save_favorites(&favs);
    Ok(())
}
