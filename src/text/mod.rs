//! # Text Layout
//!
//! Character-granular wrapping and single-line clipping against a width
//! budget in points. Both operate on real glyph metrics from a
//! [`FontHandle`].
//!
//! Wrapping breaks between any two characters rather than at word
//! boundaries. That works the same for logographic scripts, which have no
//! spaces, and for Latin text in narrow table cells.

use crate::font::FontHandle;

pub const ELLIPSIS: char = '\u{2026}';

/// Wrap `text` into lines that each fit `max_width`.
///
/// Explicit line breaks (`\n`, `\r\n`, `\r`) are kept: each paragraph is
/// wrapped on its own and an empty paragraph produces one empty line. The
/// result always holds at least one line.
///
/// A single character wider than `max_width` still gets a line of its own.
pub fn wrap(text: &str, font: &FontHandle, font_size: f64, max_width: f64) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines = Vec::new();

    for paragraph in normalized.split('\n') {
        let mut line = String::new();
        let mut line_width = 0.0;

        for ch in paragraph.chars() {
            let char_width = font.char_width(ch, font_size);
            if line_width + char_width > max_width && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
                line_width = 0.0;
            }
            line.push(ch);
            line_width += char_width;
        }

        lines.push(line);
    }

    lines
}

/// Clip a single line to `max_width`, ending it with an ellipsis.
///
/// Text that already fits comes back unchanged. Otherwise this returns the
/// longest prefix for which `prefix + "…"` fits. Callers must give a budget
/// of at least the ellipsis width; below that the bare ellipsis is returned.
pub fn clip(text: &str, font: &FontHandle, font_size: f64, max_width: f64) -> String {
    if font.width_of(text, font_size) <= max_width {
        return text.to_string();
    }

    let chars: Vec<char> = text.chars().collect();
    let ellipsis_width = font.char_width(ELLIPSIS, font_size);

    // prefix_widths[k] = width of the first k chars
    let mut prefix_widths = Vec::with_capacity(chars.len() + 1);
    prefix_widths.push(0.0);
    let mut acc = 0.0;
    for &ch in &chars {
        acc += font.char_width(ch, font_size);
        prefix_widths.push(acc);
    }

    let fits = |k: usize| prefix_widths[k] + ellipsis_width <= max_width;

    // Largest k in 0..=len with fits(k). fits is monotone: longer is wider.
    let mut lo = 0usize;
    let mut hi = chars.len();
    while lo < hi {
        let mid = (lo + hi + 1) / 2;
        if fits(mid) {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }

    let mut clipped: String = chars[..lo].iter().collect();
    clipped.push(ELLIPSIS);
    clipped
}

/// Clip every line after the first `max_lines`, silently. Returns the kept
/// lines and how many were dropped.
pub fn truncate_lines(mut lines: Vec<String>, max_lines: usize) -> (Vec<String>, usize) {
    let dropped = lines.len().saturating_sub(max_lines);
    lines.truncate(max_lines);
    (lines, dropped)
}
