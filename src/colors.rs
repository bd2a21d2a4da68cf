//! Color attributes and bar color schemes.

use crate::terminal::Style;
use crossterm::event::KeyCode;
use crossterm::style::Color;

pub const ATTR_BOLD: u16 = 0x200;
pub const ATTR_UNDERLINE: u16 = 0x400;
pub const ATTR_REVERSE: u16 = 0x800;
const ATTR_MASK: u16 = 0x00ff | ATTR_BOLD | ATTR_UNDERLINE | ATTR_REVERSE;

/// Number of intensity tiers in a scheme.
pub const TIERS: usize = 4;

/// Parse a color attribute given in decimal or `0x` hex.
pub fn parse_attr(s: &str) -> Result<u16, String> {
    let s = s.trim();
    let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse::<u16>(),
    }
    .map_err(|e| format!("invalid color attribute {s:?}: {e}"))?;
    check_attr(value)
}

/// Reject bits outside the color byte and the attribute flags.
pub fn check_attr(value: u16) -> Result<u16, String> {
    if value & !ATTR_MASK != 0 {
        return Err(format!("unknown bits in color attribute {value:#x}"));
    }
    Ok(value)
}

/// Low byte: 0 is the terminal default, 1-8 the base colors, 9-255 a
/// 256-color palette index minus one.
pub fn attr_color(attr: u16) -> Option<Color> {
    match attr & 0xff {
        0 => None,
        1 => Some(Color::Black),
        2 => Some(Color::DarkRed),
        3 => Some(Color::DarkGreen),
        4 => Some(Color::DarkYellow),
        5 => Some(Color::DarkBlue),
        6 => Some(Color::DarkMagenta),
        7 => Some(Color::DarkCyan),
        8 => Some(Color::Grey),
        v => Some(Color::AnsiValue((v - 1) as u8)),
    }
}

/// Foreground style for an attribute.
pub fn attr_style(attr: u16) -> Style {
    Style {
        fg: attr_color(attr),
        bg: None,
        bold: attr & ATTR_BOLD != 0,
        underline: attr & ATTR_UNDERLINE != 0,
        reverse: attr & ATTR_REVERSE != 0,
    }
}

/// Bars drawn with `fg` on `bg`.
pub fn bar_style(fg: u16, bg: u16) -> Style {
    Style {
        bg: attr_color(bg),
        ..attr_style(fg)
    }
}

/// Scheme selected by Shift+digit.
pub fn scheme_for_key(code: KeyCode) -> Option<u8> {
    match code {
        KeyCode::Char(')') => Some(0),
        KeyCode::Char('!') => Some(1),
        KeyCode::Char('@') => Some(2),
        KeyCode::Char('#') => Some(3),
        KeyCode::Char('$') => Some(4),
        KeyCode::Char('%') => Some(5),
        KeyCode::Char('^') => Some(6),
        KeyCode::Char('&') => Some(7),
        KeyCode::Char('*') => Some(8),
        KeyCode::Char('(') => Some(9),
        _ => None,
    }
}

pub fn scheme_name(scheme: u8) -> &'static str {
    match scheme {
        1 => "fire",
        2 => "ice",
        3 => "pink",
        4 => "gold",
        5 => "electric",
        6 => "lava",
        7 => "mono",
        8 => "rainbow",
        9 => "neon",
        _ => "matrix",
    }
}

/// Color for `tier` (0 nearest the base line, `TIERS - 1` at the tips).
pub fn scheme_color(scheme: u8, tier: usize) -> Style {
    let tier = tier.min(TIERS - 1);
    let palette: [Color; TIERS] = match scheme {
        1 => [Color::DarkRed, Color::Red, Color::DarkYellow, Color::Yellow],
        2 => [Color::DarkBlue, Color::Blue, Color::DarkCyan, Color::Cyan],
        3 => [Color::DarkMagenta, Color::Magenta, Color::Red, Color::AnsiValue(13)],
        4 => [Color::DarkYellow, Color::Yellow, Color::AnsiValue(11), Color::White],
        5 => [Color::DarkCyan, Color::Cyan, Color::AnsiValue(14), Color::White],
        6 => [Color::DarkRed, Color::Red, Color::Magenta, Color::AnsiValue(9)],
        7 => [Color::DarkGrey, Color::Grey, Color::White, Color::White],
        8 => [Color::Red, Color::Yellow, Color::Green, Color::Cyan],
        9 => [Color::DarkBlue, Color::Blue, Color::Magenta, Color::AnsiValue(13)],
        _ => [Color::DarkGreen, Color::Green, Color::Green, Color::AnsiValue(10)],
    };
    Style {
        fg: Some(palette[tier]),
        bold: tier == TIERS - 1,
        ..Style::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_and_hex() {
        assert_eq!(parse_attr("0"), Ok(0));
        assert_eq!(parse_attr("3"), Ok(3));
        assert_eq!(parse_attr("0x203"), Ok(0x203));
        assert_eq!(parse_attr("0X0A00"), Ok(0xa00));
        assert!(parse_attr("0x1000").is_err());
        assert!(parse_attr("red").is_err());
        assert!(parse_attr("70000").is_err());
    }

    #[test]
    fn low_byte_maps_to_color() {
        assert_eq!(attr_color(0), None);
        assert_eq!(attr_color(1), Some(Color::Black));
        assert_eq!(attr_color(8), Some(Color::Grey));
        assert_eq!(attr_color(9), Some(Color::AnsiValue(8)));
        assert_eq!(attr_color(256), None);
    }

    #[test]
    fn attribute_bits() {
        let s = attr_style(0x200 | 0x800 | 4);
        assert!(s.bold && s.reverse && !s.underline);
        assert_eq!(s.fg, Some(Color::DarkYellow));
        let b = bar_style(2, 5);
        assert_eq!(b.bg, Some(Color::DarkBlue));
    }

    #[test]
    fn shift_digits_select_schemes() {
        assert_eq!(scheme_for_key(KeyCode::Char('!')), Some(1));
        assert_eq!(scheme_for_key(KeyCode::Char(')')), Some(0));
        assert_eq!(scheme_for_key(KeyCode::Char('1')), None);
    }

    #[test]
    fn tips_are_bold() {
        for scheme in 0..10 {
            assert!(scheme_color(scheme, TIERS - 1).bold);
            assert!(!scheme_color(scheme, 0).bold);
            assert_eq!(scheme_color(scheme, 99), scheme_color(scheme, TIERS - 1));
        }
    }
}
