//! Colors for the blackout CLI output.
//!
//! Each logical kind of output ([`ThemeEntry`]) maps to an optional named
//! ANSI foreground color. A YAML theme file may override any subset of the
//! entries; the rest keep their defaults.

use anyhow::{Context, Result};
use owo_colors::AnsiColors;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub type ThemeMap = HashMap<ThemeEntry, ThemeStyle>;

/// The parts of the output that can be styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeEntry {
    Header,
    Success,
    Info,
    Warn,
    Error,
    /// Detector names in summary tables.
    SummaryDetector,
    /// Occurrence counts in summary tables.
    SummaryOccurrences,
    /// Page lists in summary tables.
    SummaryPages,
}

impl ThemeEntry {
    pub const ALL: [ThemeEntry; 8] = [
        ThemeEntry::Header,
        ThemeEntry::Success,
        ThemeEntry::Info,
        ThemeEntry::Warn,
        ThemeEntry::Error,
        ThemeEntry::SummaryDetector,
        ThemeEntry::SummaryOccurrences,
        ThemeEntry::SummaryPages,
    ];

    fn default_color(self) -> &'static str {
        match self {
            ThemeEntry::Header => "brightwhite",
            ThemeEntry::Success => "green",
            ThemeEntry::Info => "cyan",
            ThemeEntry::Warn => "yellow",
            ThemeEntry::Error => "red",
            ThemeEntry::SummaryDetector => "magenta",
            ThemeEntry::SummaryOccurrences => "brightyellow",
            ThemeEntry::SummaryPages => "white",
        }
    }
}

/// A named 16-color ANSI color, stored lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct ThemeColor(String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseThemeColorError(String);

impl fmt::Display for ParseThemeColorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "invalid theme color '{}'; expected black, red, green, yellow, blue, magenta, \
             cyan, white or one of their bright variants (e.g. brightred)",
            self.0
        )
    }
}

impl std::error::Error for ParseThemeColorError {}

const NAMED_COLORS: [(&str, AnsiColors); 16] = [
    ("black", AnsiColors::Black),
    ("red", AnsiColors::Red),
    ("green", AnsiColors::Green),
    ("yellow", AnsiColors::Yellow),
    ("blue", AnsiColors::Blue),
    ("magenta", AnsiColors::Magenta),
    ("cyan", AnsiColors::Cyan),
    ("white", AnsiColors::White),
    ("brightblack", AnsiColors::BrightBlack),
    ("brightred", AnsiColors::BrightRed),
    ("brightgreen", AnsiColors::BrightGreen),
    ("brightyellow", AnsiColors::BrightYellow),
    ("brightblue", AnsiColors::BrightBlue),
    ("brightmagenta", AnsiColors::BrightMagenta),
    ("brightcyan", AnsiColors::BrightCyan),
    ("brightwhite", AnsiColors::BrightWhite),
];

impl FromStr for ThemeColor {
    type Err = ParseThemeColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        if NAMED_COLORS.iter().any(|(name, _)| *name == lower) {
            Ok(ThemeColor(lower))
        } else {
            Err(ParseThemeColorError(s.to_string()))
        }
    }
}

impl TryFrom<String> for ThemeColor {
    type Error = ParseThemeColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ThemeColor> for String {
    fn from(color: ThemeColor) -> Self {
        color.0
    }
}

impl ThemeColor {
    pub fn to_ansi_color(&self) -> AnsiColors {
        NAMED_COLORS
            .iter()
            .find(|(name, _)| *name == self.0)
            .map(|(_, color)| *color)
            .unwrap_or(AnsiColors::White)
    }
}

/// Style for one [`ThemeEntry`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ThemeStyle {
    pub fg: Option<ThemeColor>,
}

/// Loads the theme at `theme_path`, or the default theme when none is given.
pub fn build_theme_map(theme_path: Option<&Path>) -> Result<ThemeMap> {
    match theme_path {
        Some(path) => load_theme_file(path),
        None => Ok(default_theme_map()),
    }
}

/// Reads a YAML theme and fills in every entry it leaves out.
pub fn load_theme_file(path: &Path) -> Result<ThemeMap> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read theme file {}", path.display()))?;
    let custom: ThemeMap = serde_yml::from_str(&text)
        .with_context(|| format!("Failed to parse theme file {}", path.display()))?;
    let mut theme = default_theme_map();
    theme.extend(custom);
    Ok(theme)
}

pub fn default_theme_map() -> ThemeMap {
    ThemeEntry::ALL
        .iter()
        .map(|entry| {
            let fg = entry.default_color().parse().ok();
            (*entry, ThemeStyle { fg })
        })
        .collect()
}
