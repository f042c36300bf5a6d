//! # Page Layout
//!
//! Turns records into positioned draw commands, page by page. Nothing here
//! knows about PDF syntax; the serializer consumes [`LayoutPage`]s as-is.
//!
//! Every build runs in two passes:
//!
//! 1. The chosen layout strategy paginates the records. Pages are opened on
//!    demand by a [`page_break::Paginator`] whenever the next row or record
//!    doesn't fit, so the total page count is unknown until the end.
//! 2. Once the count is final, every page gets its footer ("page X / N").
//!    Footers are appended to finished pages; nothing is re-laid out.
//!
//! Coordinates are in points with the origin at the top-left corner of the
//! page and y growing downward. The serializer flips them.

pub mod columns;
pub mod detail;
pub mod list;
pub mod page_break;

use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::assets::{Assets, LoadedImage};
use crate::font::{FontRole, Typeface};
use crate::model::{LayoutMode, Record, RenderOptions};
use crate::style::{BadgeTheme, Color};
use crate::text;

/// A fully laid-out page ready for PDF serialization.
#[derive(Debug, Clone)]
pub struct LayoutPage {
    pub width: f64,
    pub height: f64,
    pub elements: Vec<LayoutElement>,
}

impl LayoutPage {
    /// Every text run on the page, in drawing order.
    pub fn text_runs(&self) -> Vec<&str> {
        self.elements
            .iter()
            .filter_map(|el| match &el.draw {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Number of images placed on the page.
    pub fn image_count(&self) -> usize {
        self.elements
            .iter()
            .filter(|el| matches!(el.draw, DrawCommand::Image { .. }))
            .count()
    }

    /// Same page with `extra` drawn on top.
    pub fn with_elements(mut self, extra: Vec<LayoutElement>) -> Self {
        self.elements.extend(extra);
        self
    }
}

/// A positioned element on a page.
#[derive(Debug, Clone)]
pub struct LayoutElement {
    /// Top-left corner. For text, `y` is the baseline.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub draw: DrawCommand,
}

/// What to actually draw for this element.
#[derive(Debug, Clone)]
pub enum DrawCommand {
    /// A filled and/or stroked rectangle, optionally with rounded corners.
    Rect {
        background: Option<Color>,
        border: Option<(f64, Color)>,
        radius: f64,
    },
    /// A horizontal rule along the element's top edge.
    Rule { thickness: f64, color: Color },
    /// One line of text. Never wraps; callers clip first.
    Text {
        text: String,
        role: FontRole,
        font_size: f64,
        color: Color,
    },
    /// An image scaled into the element box.
    Image { image: Arc<LoadedImage> },
}

/// Tracks where we are on the current page during layout.
#[derive(Debug, Clone)]
pub struct PageCursor {
    pub y: f64,
    bottom: f64,
    elements: Vec<LayoutElement>,
}

impl PageCursor {
    pub fn new(top: f64, bottom: f64) -> Self {
        Self {
            y: top,
            bottom,
            elements: Vec::new(),
        }
    }

    pub fn remaining_height(&self) -> f64 {
        (self.bottom - self.y).max(0.0)
    }

    pub fn advance(&mut self, height: f64) {
        self.y += height;
    }

    pub fn rect(&mut self, x: f64, y: f64, width: f64, height: f64, draw: DrawCommand) {
        self.elements.push(LayoutElement {
            x,
            y,
            width,
            height,
            draw,
        });
    }

    pub fn fill(&mut self, x: f64, y: f64, width: f64, height: f64, color: Color, radius: f64) {
        self.rect(
            x,
            y,
            width,
            height,
            DrawCommand::Rect {
                background: Some(color),
                border: None,
                radius,
            },
        );
    }

    pub fn rule(&mut self, x: f64, y: f64, width: f64, thickness: f64, color: Color) {
        self.rect(x, y, width, 0.0, DrawCommand::Rule { thickness, color });
    }

    /// Place a text run with its baseline at `baseline`.
    #[allow(clippy::too_many_arguments)]
    pub fn text(
        &mut self,
        typeface: &Typeface,
        x: f64,
        baseline: f64,
        text: impl Into<String>,
        role: FontRole,
        font_size: f64,
        color: Color,
    ) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        let width = typeface.width_of(role, &text, font_size);
        self.elements.push(LayoutElement {
            x,
            y: baseline,
            width,
            height: font_size,
            draw: DrawCommand::Text {
                text,
                role,
                font_size,
                color,
            },
        });
    }

    pub fn image(&mut self, image: &Arc<LoadedImage>, x: f64, y: f64, width: f64, height: f64) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        self.rect(
            x,
            y,
            width,
            height,
            DrawCommand::Image {
                image: Arc::clone(image),
            },
        );
    }

    pub fn finalize(self, width: f64, height: f64) -> LayoutPage {
        LayoutPage {
            width,
            height,
            elements: self.elements,
        }
    }
}

// ── Badges ──────────────────────────────────────────────────────

pub(crate) const BADGE_FONT_SIZE: f64 = 8.0;
pub(crate) const BADGE_HEIGHT: f64 = 12.0;
const BADGE_PADDING_X: f64 = 6.0;

/// Draw a status/priority pill vertically centered on `center_y`.
/// The label is clipped so the pill never exceeds `max_width`. Returns the
/// pill's width.
pub(crate) fn draw_badge(
    cursor: &mut PageCursor,
    typeface: &Typeface,
    x: f64,
    center_y: f64,
    label: &str,
    theme: BadgeTheme,
    max_width: f64,
) -> f64 {
    let font = typeface.get(FontRole::Bold);
    let label_budget = (max_width - 2.0 * BADGE_PADDING_X).max(0.0);
    let label = text::clip(label, font, BADGE_FONT_SIZE, label_budget);
    let width = (font.width_of(&label, BADGE_FONT_SIZE) + 2.0 * BADGE_PADDING_X).min(max_width);

    let top = center_y - BADGE_HEIGHT / 2.0;
    cursor.fill(x, top, width, BADGE_HEIGHT, theme.background, BADGE_HEIGHT / 2.0);
    let baseline = center_y + font.ascent(BADGE_FONT_SIZE) / 2.0;
    cursor.text(
        typeface,
        x + BADGE_PADDING_X,
        baseline,
        label,
        FontRole::Bold,
        BADGE_FONT_SIZE,
        theme.foreground,
    );
    width
}

/// Baseline that vertically centers text of `font_size` in a box.
pub(crate) fn centered_baseline(
    typeface: &Typeface,
    role: FontRole,
    top: f64,
    height: f64,
    font_size: f64,
) -> f64 {
    top + (height + typeface.get(role).ascent(font_size)) / 2.0
}

// ── Entry point ─────────────────────────────────────────────────

/// Lay out `records` into finished pages, footers included.
pub fn layout_document(
    records: &[Record],
    options: &RenderOptions,
    assets: &Assets,
    generated_at: NaiveDateTime,
) -> Vec<LayoutPage> {
    let draft = match options.layout {
        LayoutMode::List => list::paginate(records, options, assets, generated_at),
        LayoutMode::Detail => detail::paginate(records, options, assets),
    };
    let footer = match options.layout {
        LayoutMode::List => page_break::FooterSpec::for_list(generated_at),
        LayoutMode::Detail => page_break::FooterSpec::for_detail(generated_at),
    };
    draft.stamp_footers(&footer, &assets.typeface)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::NEUTRAL_THEME;

    #[test]
    fn cursor_tracks_remaining_height() {
        let mut c = PageCursor::new(100.0, 130.0);
        assert_eq!(c.remaining_height(), 30.0);
        c.advance(18.0);
        assert_eq!(c.remaining_height(), 12.0);
        c.advance(18.0);
        assert_eq!(c.remaining_height(), 0.0);
    }

    #[test]
    fn empty_text_is_not_drawn() {
        let t = Typeface::standard();
        let mut c = PageCursor::new(0.0, 100.0);
        c.text(&t, 0.0, 10.0, "", FontRole::Regular, 10.0, Color::BLACK);
        c.text(&t, 0.0, 10.0, "x", FontRole::Regular, 10.0, Color::BLACK);
        let page = c.finalize(100.0, 100.0);
        assert_eq!(page.text_runs(), vec!["x"]);
    }

    #[test]
    fn badge_respects_max_width() {
        let t = Typeface::standard();
        let mut c = PageCursor::new(0.0, 100.0);
        let w = draw_badge(
            &mut c,
            &t,
            0.0,
            50.0,
            "A rather long status label",
            NEUTRAL_THEME,
            40.0,
        );
        assert!(w <= 40.0);
        let page = c.finalize(100.0, 100.0);
        let label = page.text_runs()[0];
        assert!(label.ends_with(text::ELLIPSIS));
    }
}
