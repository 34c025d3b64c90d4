use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tracing::debug;
use weather_dash_core::{Command, Config, Dashboard, Screen};

use crate::draw;

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Command(Command),
    Quit,
    Invalid(String),
}

/// Resolves `n` (1-based position in the favorites panel) or a literal city name.
fn favorite_ref(arg: &str, screen: &Screen) -> Result<String, String> {
    match arg.parse::<usize>() {
        Ok(n) => screen
            .favorites
            .ready()
            .and_then(|items| n.checked_sub(1).and_then(|i| items.get(i)))
            .map(|item| item.city.clone())
            .ok_or_else(|| format!("No favorite #{n}.")),
        Err(_) => Ok(arg.to_string()),
    }
}

/// Maps one typed line to a dashboard command. Anything that is not a keyword is a search.
fn parse_input(line: &str, screen: &Screen) -> Input {
    let line = line.trim();
    let (word, arg) = match line.split_once(char::is_whitespace) {
        Some((word, arg)) => (word, arg.trim()),
        None => (line, ""),
    };

    match (word.to_lowercase().as_str(), arg) {
        ("q" | "quit" | "exit", "") => Input::Quit,
        ("r" | "refresh", "") => Input::Command(Command::Refresh),
        ("u" | "unit", "") => Input::Command(Command::ToggleUnit),
        ("t" | "theme", "") => Input::Command(Command::ToggleTheme),
        ("s" | "search", city) => Input::Command(Command::Search(city.to_string())),
        ("fav", "") => match screen.current.ready() {
            Some(view) => Input::Command(Command::ToggleFavorite(view.city.clone())),
            None => Input::Invalid("No city on screen to favorite.".to_string()),
        },
        ("fav", city) => Input::Command(Command::ToggleFavorite(city.to_string())),
        ("open" | "remove", "") => Input::Invalid(format!("Usage: {word} <n|city>")),
        ("open", arg) => match favorite_ref(arg, screen) {
            Ok(city) => Input::Command(Command::SelectFavorite(city)),
            Err(msg) => Input::Invalid(msg),
        },
        ("remove", arg) => match favorite_ref(arg, screen) {
            Ok(city) => Input::Command(Command::RemoveFavorite(city)),
            Err(msg) => Input::Invalid(msg),
        },
        _ => Input::Command(Command::Search(line.to_string())),
    }
}

/// Runs the dashboard until the user quits or stdin closes.
pub async fn run(config: &Config) -> anyhow::Result<()> {
    let dashboard = Dashboard::from_config(config)?;
    let mut screens = dashboard.subscribe();
    let (tx, rx) = mpsc::channel(16);
    let handle = tokio::spawn(dashboard.run(rx));

    let mut stdout = std::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut latest = screens.borrow_and_update().clone();
    let mut hint: Option<String> = None;
    draw::redraw(&mut stdout, &latest, None)?;

    loop {
        tokio::select! {
            changed = screens.changed() => {
                if changed.is_err() {
                    break;
                }
                latest = screens.borrow_and_update().clone();
                draw::redraw(&mut stdout, &latest, hint.as_deref())?;
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                hint = None;

                match parse_input(&line, &latest) {
                    Input::Quit => break,
                    Input::Invalid(msg) => {
                        hint = Some(msg);
                        draw::redraw(&mut stdout, &latest, hint.as_deref())?;
                    }
                    Input::Command(cmd) => {
                        debug!(?cmd, "sending command");
                        if tx.send(cmd).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    }

    drop(tx);
    handle.await?;
    Ok(())
}
