//! # Font Handles and Text Metrics
//!
//! A [`FontHandle`] is either one of the built-in Helvetica faces (no
//! embedding needed, WinAnsi only) or a TrueType/OpenType face fetched by the
//! asset loader. Handles are cheap to clone and shared read-only by every
//! page of one build.
//!
//! All layout decisions go through [`FontHandle::width_of`]. Widths are the
//! left-to-right sum of per-character advances with no kerning, so measuring
//! a string and accumulating its characters one at a time always agree.

pub mod metrics;

pub use metrics::StandardFontMetrics;
use std::collections::HashMap;
use std::sync::Arc;

/// The built-in fallback faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
}

impl StandardFont {
    /// The PDF name for this font.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
        }
    }

    pub fn metrics(&self) -> StandardFontMetrics {
        match self {
            Self::Helvetica => metrics::HELVETICA,
            Self::HelveticaBold => metrics::HELVETICA_BOLD,
        }
    }
}

/// A parsed TrueType/OpenType face.
#[derive(Debug)]
pub struct CustomFont {
    /// Raw font file bytes, embedded as-is.
    pub data: Vec<u8>,
    pub units_per_em: u16,
    pub ascender: i16,
    pub descender: i16,
    pub cap_height: i16,
    pub bbox: [i16; 4],
    pub default_advance: u16,
    advance_widths: HashMap<char, u16>,
    glyph_ids: HashMap<char, u16>,
}

impl CustomFont {
    /// Parse a face with ttf-parser. Returns `None` for anything that isn't a
    /// usable font.
    pub fn parse(data: Vec<u8>) -> Option<Self> {
        let face = ttf_parser::Face::parse(&data, 0).ok()?;
        let units_per_em = face.units_per_em();
        if units_per_em == 0 {
            return None;
        }

        let mut advance_widths = HashMap::new();
        let mut glyph_ids = HashMap::new();
        let mut space_advance = 0u16;

        for code in 32u32..=0xFFFF {
            if let Some(ch) = char::from_u32(code) {
                if let Some(glyph_id) = face.glyph_index(ch) {
                    let advance = face.glyph_hor_advance(glyph_id).unwrap_or(0);
                    advance_widths.insert(ch, advance);
                    glyph_ids.insert(ch, glyph_id.0);
                    if ch == ' ' {
                        space_advance = advance;
                    }
                }
            }
        }

        let default_advance = face
            .glyph_hor_advance(ttf_parser::GlyphId(0))
            .filter(|a| *a > 0)
            .unwrap_or(if space_advance > 0 {
                space_advance
            } else {
                units_per_em / 2
            });

        let bb = face.global_bounding_box();
        let ascender = face.ascender();
        let cap_height = face.capital_height().unwrap_or(ascender);

        Some(CustomFont {
            units_per_em,
            ascender,
            descender: face.descender(),
            cap_height,
            bbox: [bb.x_min, bb.y_min, bb.x_max, bb.y_max],
            default_advance,
            advance_widths,
            glyph_ids,
            data,
        })
    }

    /// Glyph ID for a character; 0 (`.notdef`) when the face lacks it.
    pub fn glyph_id(&self, ch: char) -> u16 {
        self.glyph_ids.get(&ch).copied().unwrap_or(0)
    }

    /// Advance in font units.
    pub fn advance(&self, ch: char) -> u16 {
        self.advance_widths
            .get(&ch)
            .copied()
            .unwrap_or(self.default_advance)
    }

    /// Advance width of a character in points.
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        self.advance(ch) as f64 / self.units_per_em as f64 * font_size
    }
}

/// An opaque font resource shared by all pages of a build.
#[derive(Debug, Clone)]
pub enum FontHandle {
    Standard(StandardFont),
    Custom(Arc<CustomFont>),
}

impl FontHandle {
    pub fn helvetica() -> Self {
        FontHandle::Standard(StandardFont::Helvetica)
    }

    pub fn helvetica_bold() -> Self {
        FontHandle::Standard(StandardFont::HelveticaBold)
    }

    pub fn is_standard(&self) -> bool {
        matches!(self, FontHandle::Standard(_))
    }

    /// Advance width of a single character in points.
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        match self {
            FontHandle::Standard(f) => f.metrics().char_width(ch, font_size),
            FontHandle::Custom(f) => f.char_width(ch, font_size),
        }
    }

    /// Measure the width of a string in points.
    pub fn width_of(&self, text: &str, font_size: f64) -> f64 {
        text.chars()
            .fold(0.0, |acc, ch| acc + self.char_width(ch, font_size))
    }

    /// Ascent above the baseline in points, used to center text vertically.
    pub fn ascent(&self, font_size: f64) -> f64 {
        match self {
            FontHandle::Standard(_) => 0.718 * font_size,
            FontHandle::Custom(f) => f.cap_height as f64 / f.units_per_em as f64 * font_size,
        }
    }

    /// Stable identity used to deduplicate PDF font objects.
    pub(crate) fn key(&self) -> FontKey {
        match self {
            FontHandle::Standard(f) => FontKey::Standard(*f),
            FontHandle::Custom(f) => FontKey::Custom(Arc::as_ptr(f) as usize),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum FontKey {
    Standard(StandardFont),
    Custom(usize),
}

/// Which face a piece of text is set in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontRole {
    Regular,
    Bold,
}

/// The pair of faces one build draws with.
///
/// With only the fallback font available this is Helvetica and
/// Helvetica-Bold. A custom face has a single weight, so it serves both roles.
#[derive(Debug, Clone)]
pub struct Typeface {
    pub regular: FontHandle,
    pub bold: FontHandle,
}

impl Default for Typeface {
    fn default() -> Self {
        Self::standard()
    }
}

impl Typeface {
    pub fn standard() -> Self {
        Self {
            regular: FontHandle::helvetica(),
            bold: FontHandle::helvetica_bold(),
        }
    }

    /// Use one face for every role.
    pub fn single(font: FontHandle) -> Self {
        Self {
            regular: font.clone(),
            bold: font,
        }
    }

    pub fn get(&self, role: FontRole) -> &FontHandle {
        match role {
            FontRole::Regular => &self.regular,
            FontRole::Bold => &self.bold,
        }
    }

    pub fn width_of(&self, role: FontRole, text: &str, font_size: f64) -> f64 {
        self.get(role).width_of(text, font_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helvetica_space_width() {
        let f = FontHandle::helvetica();
        let w = f.char_width(' ', 12.0);
        assert!((w - 3.336).abs() < 0.001);
    }

    #[test]
    fn bold_is_wider() {
        let regular = FontHandle::helvetica().width_of("Ticket", 12.0);
        let bold = FontHandle::helvetica_bold().width_of("Ticket", 12.0);
        assert!(bold > regular, "Bold should be wider than regular");
    }

    #[test]
    fn width_of_is_sum_of_chars() {
        let f = FontHandle::helvetica();
        let sum: f64 = "Hello".chars().map(|c| f.char_width(c, 10.0)).sum();
        assert!((f.width_of("Hello", 10.0) - sum).abs() < 1e-12);
        assert_eq!(f.width_of("", 10.0), 0.0);
    }

    #[test]
    fn garbage_is_not_a_font() {
        assert!(CustomFont::parse(vec![0, 1, 2, 3, 4, 5]).is_none());
        assert!(CustomFont::parse(Vec::new()).is_none());
    }

    #[test]
    fn single_typeface_shares_face() {
        let t = Typeface::single(FontHandle::helvetica());
        assert_eq!(t.get(FontRole::Bold).key(), t.get(FontRole::Regular).key());
        let s = Typeface::standard();
        assert_ne!(s.get(FontRole::Bold).key(), s.get(FontRole::Regular).key());
    }
}
