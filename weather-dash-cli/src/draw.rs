use std::io::{self, Write};

use crossterm::{
    cursor, queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use weather_dash_core::{
    Panel, Screen, StatusLevel, Theme,
    render::{CurrentView, FavoriteItem, ForecastCell},
};

struct Palette {
    text: Color,
    accent: Color,
    muted: Color,
}

fn palette(theme: Theme) -> Palette {
    match theme {
        Theme::Light => Palette { text: Color::Black, accent: Color::DarkBlue, muted: Color::DarkGrey },
        Theme::Dark => Palette { text: Color::White, accent: Color::Cyan, muted: Color::Grey },
    }
}

fn status_color(level: StatusLevel) -> Color {
    match level {
        StatusLevel::Loading | StatusLevel::Info => Color::Blue,
        StatusLevel::Success => Color::Green,
        StatusLevel::Warning => Color::Yellow,
        StatusLevel::Error => Color::Red,
    }
}

pub const HELP: &str = "commands: <city> | search <city> | refresh | fav [city] | open <n|city> | remove <n|city> | unit | theme | quit";

/// Clears the terminal and draws the whole screen.
pub fn redraw(out: &mut impl Write, screen: &Screen, hint: Option<&str>) -> io::Result<()> {
    queue!(out, Clear(ClearType::All), cursor::MoveTo(0, 0))?;
    draw_screen(out, screen)?;

    let p = palette(screen.theme);
    queue!(out, Print("\r\n"), SetForegroundColor(p.muted), Print(HELP), Print("\r\n"))?;
    if let Some(hint) = hint {
        queue!(out, SetForegroundColor(Color::Yellow), Print(hint), Print("\r\n"))?;
    }
    queue!(out, ResetColor, Print("> "))?;
    out.flush()
}

/// Draws the screen without clearing, for one-shot output.
pub fn draw_once(out: &mut impl Write, screen: &Screen) -> io::Result<()> {
    draw_screen(out, screen)?;
    out.flush()
}

fn draw_screen(out: &mut impl Write, screen: &Screen) -> io::Result<()> {
    let p = palette(screen.theme);

    if let Some(status) = &screen.status {
        queue!(
            out,
            SetForegroundColor(status_color(status.level)),
            SetAttribute(Attribute::Bold),
            Print(&status.message),
            SetAttribute(Attribute::Reset),
            Print("\r\n\r\n"),
        )?;
    }

    match &screen.current {
        Panel::Ready(view) => draw_current(out, view, &p)?,
        Panel::Loading => line(out, p.muted, "Loading weather data...")?,
        Panel::Empty => line(out, p.muted, "Search for a city to begin.")?,
    }

    queue!(out, Print("\r\n"))?;
    line(out, p.accent, "Forecast")?;
    match &screen.forecast {
        Panel::Ready(cells) => {
            for cell in cells {
                draw_forecast_cell(out, cell, &p)?;
            }
        }
        Panel::Loading => line(out, p.muted, "Loading forecast...")?,
        Panel::Empty => line(out, p.muted, "-")?,
    }

    queue!(out, Print("\r\n"))?;
    line(out, p.accent, "Favorites")?;
    match &screen.favorites {
        Panel::Ready(items) => {
            for (i, item) in items.iter().enumerate() {
                draw_favorite(out, i + 1, item, &p)?;
            }
        }
        Panel::Loading => line(out, p.muted, "Loading favorites...")?,
        Panel::Empty => line(out, p.muted, "No favorites saved yet.")?,
    }

    queue!(
        out,
        Print("\r\n"),
        SetForegroundColor(p.muted),
        Print(format!("[{}]  theme: {}", screen.unit_toggle_label(), screen.theme.as_str())),
        ResetColor,
        Print("\r\n"),
    )
}

fn line(out: &mut impl Write, color: Color, text: &str) -> io::Result<()> {
    queue!(out, SetForegroundColor(color), Print(text), ResetColor, Print("\r\n"))
}

fn draw_current(out: &mut impl Write, view: &CurrentView, p: &Palette) -> io::Result<()> {
    let heart = if view.is_favorite { "♥" } else { "♡" };

    queue!(
        out,
        SetForegroundColor(p.accent),
        SetAttribute(Attribute::Bold),
        Print(&view.title),
        SetAttribute(Attribute::Reset),
        Print("\r\n"),
        SetForegroundColor(p.text),
        Print(format!("{} {}  {}", view.icon.symbol(), view.temperature, view.description)),
        SetForegroundColor(p.muted),
        Print(format!("   {heart} {}", view.favorite_label)),
        Print("\r\n"),
        SetForegroundColor(p.text),
        Print(format!(
            "Humidity {}  Wind {}  Min {}  Max {}",
            view.humidity, view.wind, view.min, view.max
        )),
        Print("\r\n"),
        SetForegroundColor(p.muted),
        Print(format!("Last Updated: {}", view.updated)),
        ResetColor,
        Print("\r\n"),
    )
}

fn draw_forecast_cell(out: &mut impl Write, cell: &ForecastCell, p: &Palette) -> io::Result<()> {
    queue!(
        out,
        SetForegroundColor(p.text),
        Print(format!(
            "  {:<7} {} {:<20} Min: {:>8}  Max: {:>8}",
            cell.label,
            cell.icon.symbol(),
            cell.description,
            cell.min,
            cell.max
        )),
        ResetColor,
        Print("\r\n"),
    )
}

fn draw_favorite(out: &mut impl Write, n: usize, item: &FavoriteItem, p: &Palette) -> io::Result<()> {
    queue!(
        out,
        SetForegroundColor(p.text),
        Print(format!("  {n:>2}. {} {:<16} {}", item.icon.symbol(), item.city, item.temperature)),
        ResetColor,
        Print("\r\n"),
    )
}
