use colored::{ColoredString, Colorize};

use crate::domain::entities::threshold::DEFAULT_RATIO_LIMIT;

/// Fraction of the limit at which a value turns yellow.
const WARN_FRACTION: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Ok,
    Warn,
    Breach,
}

fn level(value: f64, limit: Option<f64>) -> Level {
    let limit = limit.unwrap_or(DEFAULT_RATIO_LIMIT);
    if value >= limit {
        Level::Breach
    } else if value >= limit * WARN_FRACTION {
        Level::Warn
    } else {
        Level::Ok
    }
}

fn paint(text: String, level: Level) -> ColoredString {
    match level {
        Level::Breach => text.red().bold(),
        Level::Warn => text.yellow(),
        Level::Ok => text.green(),
    }
}

/// Bar for a 0–100 value, coloured against `limit` (80 when unset).
#[must_use]
pub fn progress_bar(value: f64, width: usize, limit: Option<f64>) -> String {
    let ratio = (value / 100.0).clamp(0.0, 1.0);
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let filled = (ratio * width as f64).round() as usize;
    let empty = width.saturating_sub(filled);

    let colored_bar = paint("█".repeat(filled), level(value, limit));
    format!("{colored_bar}{}", "░".repeat(empty))
}

#[must_use]
pub fn colorize_percent(value: f64, limit: Option<f64>) -> ColoredString {
    paint(format!("{value:.1}%"), level(value, limit))
}

/// Absolute value coloured red once it reaches `limit`; plain without one.
#[must_use]
pub fn colorize_absolute(text: String, value: f64, limit: Option<f64>) -> ColoredString {
    match limit {
        Some(limit) if value >= limit => text.red().bold(),
        _ => text.normal(),
    }
}

/// Binary-prefixed size, e.g. `1.5 GiB`.
#[must_use]
pub fn format_bytes(bytes: f64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{value:.0} {}", UNITS[unit])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

pub fn print_section_header(title: &str) {
    println!("{}", title.bold().cyan());
    let display_width = title.chars().count();
    println!("{}", "─".repeat(display_width).cyan());
}
