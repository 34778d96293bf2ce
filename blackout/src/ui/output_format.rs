//! Themed, prefix-tagged status messages.

use std::io::{self, Write};

use owo_colors::OwoColorize;

use super::theme::{ThemeEntry, ThemeMap};

/// Writes `text` in the color configured for `entry`, or plain when color is off.
pub fn write_styled<W: Write + ?Sized>(
    writer: &mut W,
    text: &str,
    entry: ThemeEntry,
    theme: &ThemeMap,
    supports_color: bool,
) -> io::Result<()> {
    match theme.get(&entry).and_then(|style| style.fg.as_ref()) {
        Some(color) if supports_color => write!(writer, "{}", text.color(color.to_ansi_color())),
        _ => write!(writer, "{}", text),
    }
}

/// Returns `text` colored for `entry`, or unchanged when color is off.
pub fn styled(text: &str, entry: ThemeEntry, theme: &ThemeMap, supports_color: bool) -> String {
    let mut buf = Vec::new();
    let _ = write_styled(&mut buf, text, entry, theme, supports_color);
    String::from_utf8(buf).unwrap_or_else(|_| text.to_string())
}

fn print_tagged<W: Write + ?Sized>(
    writer: &mut W,
    tag: &str,
    message: &str,
    entry: ThemeEntry,
    theme: &ThemeMap,
    supports_color: bool,
) -> io::Result<()> {
    write_styled(writer, &format!("{tag} {message}"), entry, theme, supports_color)?;
    writeln!(writer)
}

pub fn print_info_message<W: Write + ?Sized>(writer: &mut W, message: &str, theme: &ThemeMap, supports_color: bool) -> io::Result<()> {
    print_tagged(writer, "[INFO]", message, ThemeEntry::Info, theme, supports_color)
}

pub fn print_success_message<W: Write + ?Sized>(writer: &mut W, message: &str, theme: &ThemeMap, supports_color: bool) -> io::Result<()> {
    print_tagged(writer, "[OK]", message, ThemeEntry::Success, theme, supports_color)
}

pub fn print_warn_message<W: Write + ?Sized>(writer: &mut W, message: &str, theme: &ThemeMap, supports_color: bool) -> io::Result<()> {
    print_tagged(writer, "[WARN]", message, ThemeEntry::Warn, theme, supports_color)
}

pub fn print_error_message<W: Write + ?Sized>(writer: &mut W, message: &str, theme: &ThemeMap, supports_color: bool) -> io::Result<()> {
    print_tagged(writer, "[ERROR]", message, ThemeEntry::Error, theme, supports_color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::theme::default_theme_map;

    #[test]
    fn plain_output_has_no_escape_codes() {
        let mut out = Vec::new();
        print_error_message(&mut out, "boom", &default_theme_map(), false).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "[ERROR] boom\n");
    }

    #[test]
    fn colored_output_wraps_the_message() {
        let text = styled("hello", ThemeEntry::Success, &default_theme_map(), true);
        assert!(text.contains("hello"));
        assert!(text.starts_with('\u{1b}'));
    }
}
