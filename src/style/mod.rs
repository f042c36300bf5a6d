//! # Colors and Badge Themes
//!
//! The palette used by both layouts, and the status/priority theme tables.
//! Themes are immutable lookup tables keyed by the record's wire key; any
//! key that isn't in a table resolves to [`NEUTRAL_THEME`].

use crate::model::{Priority, Status};

/// An RGB color with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Build from a `0xRRGGBB` literal.
    pub const fn hex(v: u32) -> Self {
        Self {
            r: ((v >> 16) & 0xFF) as f64 / 255.0,
            g: ((v >> 8) & 0xFF) as f64 / 255.0,
            b: (v & 0xFF) as f64 / 255.0,
        }
    }
}

/// Shared palette.
pub mod palette {
    use super::Color;

    pub const INK: Color = Color::hex(0x1F2937);
    pub const MUTED: Color = Color::hex(0x6B7280);
    pub const RULE: Color = Color::hex(0xD1D5DB);
    pub const HEADER_BAR: Color = Color::hex(0x1E3A5F);
    pub const HEADER_TEXT: Color = Color::WHITE;
    pub const TABLE_HEAD: Color = Color::hex(0xE5E7EB);
    pub const ZEBRA: Color = Color::hex(0xF9FAFB);
    pub const CARD: Color = Color::hex(0xF8FAFC);
    pub const CARD_BORDER: Color = Color::hex(0xE2E8F0);
}

/// Background/foreground pair for a badge pill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BadgeTheme {
    pub background: Color,
    pub foreground: Color,
}

impl BadgeTheme {
    const fn new(background: u32, foreground: u32) -> Self {
        Self {
            background: Color::hex(background),
            foreground: Color::hex(foreground),
        }
    }
}

pub const NEUTRAL_THEME: BadgeTheme = BadgeTheme::new(0xE5E7EB, 0x374151);

const STATUS_THEMES: &[(&str, BadgeTheme)] = &[
    ("open", BadgeTheme::new(0xDBEAFE, 0x1D4ED8)),
    ("in_progress", BadgeTheme::new(0xFEF3C7, 0xB45309)),
    ("pending", BadgeTheme::new(0xEDE9FE, 0x6D28D9)),
    ("resolved", BadgeTheme::new(0xD1FAE5, 0x047857)),
    ("closed", BadgeTheme::new(0xE5E7EB, 0x4B5563)),
];

const PRIORITY_THEMES: &[(&str, BadgeTheme)] = &[
    ("low", BadgeTheme::new(0xECFDF5, 0x047857)),
    ("medium", BadgeTheme::new(0xEFF6FF, 0x1D4ED8)),
    ("high", BadgeTheme::new(0xFFF7ED, 0xC2410C)),
    ("urgent", BadgeTheme::new(0xFEE2E2, 0xB91C1C)),
];

fn lookup(table: &[(&str, BadgeTheme)], key: &str) -> BadgeTheme {
    table
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, theme)| *theme)
        .unwrap_or(NEUTRAL_THEME)
}

pub fn status_theme(status: &Status) -> BadgeTheme {
    lookup(STATUS_THEMES, status.key())
}

pub fn priority_theme(priority: &Priority) -> BadgeTheme {
    lookup(PRIORITY_THEMES, priority.key())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_color() {
        let c = Color::hex(0xFF8000);
        assert_eq!(c.r, 1.0);
        assert!((c.g - 128.0 / 255.0).abs() < 1e-12);
        assert_eq!(c.b, 0.0);
    }

    #[test]
    fn every_known_status_has_its_own_theme() {
        for s in [
            Status::Open,
            Status::InProgress,
            Status::Pending,
            Status::Resolved,
            Status::Closed,
        ] {
            assert!(STATUS_THEMES.iter().any(|(k, _)| *k == s.key()), "{s}");
        }
        assert_ne!(status_theme(&Status::Open), status_theme(&Status::Resolved));
    }

    #[test]
    fn unknown_values_fall_back_to_neutral() {
        assert_eq!(status_theme(&Status::Other("weird".into())), NEUTRAL_THEME);
        assert_eq!(priority_theme(&Priority::Other("".into())), NEUTRAL_THEME);
    }

    #[test]
    fn urgent_is_red() {
        let t = priority_theme(&Priority::Urgent);
        assert!(t.foreground.r > t.foreground.g);
    }
}
