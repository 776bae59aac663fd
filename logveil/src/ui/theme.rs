//! Colour theme for the `logveil` terminal summaries.
//!
//! Each logical element of the console output maps to a 16-colour ANSI
//! foreground. Colours are only applied when the target stream is a terminal.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use owo_colors::{AnsiColors, OwoColorize};

/// Type alias for the theme map.
pub type ThemeMap = HashMap<ThemeEntry, ThemeStyle>;

/// The parts of the console output that can be styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemeEntry {
    Header,
    Success,
    Info,
    Warn,
    Error,
    /// Field names in summary tables.
    SummaryField,
    /// Counts and metric values in summary tables.
    SummaryCount,
}

/// A named ANSI colour ("red", "brightgreen", ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeColor(String);

#[derive(Debug, Clone)]
pub struct ParseThemeColorError(String);

impl fmt::Display for ParseThemeColorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Invalid theme color '{}'; expected black, red, green, yellow, blue, magenta, cyan, white or their bright variants.",
            self.0
        )
    }
}

impl std::error::Error for ParseThemeColorError {}

impl FromStr for ThemeColor {
    type Err = ParseThemeColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        let base = lower.strip_prefix("bright").unwrap_or(&lower);
        match base {
            "black" | "red" | "green" | "yellow" | "blue" | "magenta" | "cyan" | "white" => Ok(ThemeColor(lower)),
            _ => Err(ParseThemeColorError(s.to_string())),
        }
    }
}

impl ThemeColor {
    pub fn to_ansi_color(&self) -> AnsiColors {
        match self.0.as_str() {
            "black" => AnsiColors::Black,
            "red" => AnsiColors::Red,
            "green" => AnsiColors::Green,
            "yellow" => AnsiColors::Yellow,
            "blue" => AnsiColors::Blue,
            "magenta" => AnsiColors::Magenta,
            "cyan" => AnsiColors::Cyan,
            "brightblack" => AnsiColors::BrightBlack,
            "brightred" => AnsiColors::BrightRed,
            "brightgreen" => AnsiColors::BrightGreen,
            "brightyellow" => AnsiColors::BrightYellow,
            "brightblue" => AnsiColors::BrightBlue,
            "brightmagenta" => AnsiColors::BrightMagenta,
            "brightcyan" => AnsiColors::BrightCyan,
            "brightwhite" => AnsiColors::BrightWhite,
            _ => AnsiColors::White,
        }
    }
}

/// Style of one theme entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemeStyle {
    pub fg: Option<ThemeColor>,
}

impl ThemeStyle {
    fn named(color: &str) -> Self {
        ThemeStyle {
            fg: Some(ThemeColor(color.to_string())),
        }
    }

    /// Returns the default theme map.
    pub fn default_theme_map() -> ThemeMap {
        HashMap::from([
            (ThemeEntry::Header, Self::named("brightcyan")),
            (ThemeEntry::Success, Self::named("green")),
            (ThemeEntry::Info, Self::named("white")),
            (ThemeEntry::Warn, Self::named("yellow")),
            (ThemeEntry::Error, Self::named("red")),
            (ThemeEntry::SummaryField, Self::named("cyan")),
            (ThemeEntry::SummaryCount, Self::named("brightwhite")),
        ])
    }
}

/// Applies the entry's colour to `text` when `enable_colors` is set.
pub fn paint(text: &str, entry: ThemeEntry, theme: &ThemeMap, enable_colors: bool) -> String {
    if !enable_colors {
        return text.to_string();
    }
    match theme.get(&entry).and_then(|style| style.fg.as_ref()) {
        Some(color) => text.color(color.to_ansi_color()).to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_named_colors() {
        assert!("red".parse::<ThemeColor>().is_ok());
        assert!("BrightGreen".parse::<ThemeColor>().is_ok());
        assert!("brightorange".parse::<ThemeColor>().is_err());
    }

    #[test]
    fn to_ansi_color_maps_bright_variants() {
        let tc: ThemeColor = "brightmagenta".parse().unwrap();
        assert_eq!(tc.to_ansi_color(), AnsiColors::BrightMagenta);
        let tc: ThemeColor = "blue".parse().unwrap();
        assert_eq!(tc.to_ansi_color(), AnsiColors::Blue);
    }

    #[test]
    fn paint_is_plain_without_colors() {
        let theme = ThemeStyle::default_theme_map();
        assert_eq!(paint("src_ip", ThemeEntry::SummaryField, &theme, false), "src_ip");
        let colored = paint("src_ip", ThemeEntry::SummaryField, &theme, true);
        assert!(colored.contains("src_ip"));
        assert!(colored.starts_with('\u{1b}'));
    }
}
