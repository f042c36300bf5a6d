//! # Page Break Decisions
//!
//! Decides when a row no longer fits and opens the next page, and runs the
//! second pass that stamps footers once the page count is known.
//!
//! A build moves through four phases, strictly in order:
//! `Empty → Paginating → Finalizing → Serialized`. The first two are the
//! [`Paginator`]'s state. [`Paginator::finish`] consumes it and yields a
//! [`DraftDocument`] (finalizing), whose [`DraftDocument::stamp_footers`]
//! in turn yields the pages handed to the PDF writer. Each step consumes
//! the previous one, so no phase can be re-entered and a footer can never
//! see a provisional page total.

use chrono::NaiveDateTime;

use super::{LayoutElement, LayoutPage, PageCursor};
use crate::font::{FontRole, Typeface};
use crate::model::{ListGeometry, DETAIL_GEOMETRY, LIST_GEOMETRY, PAGE_HEIGHT, PAGE_WIDTH};
use crate::style::palette;

const EPSILON: f64 = 1e-9;

/// Where a [`Paginator`] currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    /// No page opened yet.
    Empty,
    /// At least one page exists; the last one is still open.
    Paginating,
}

/// What to do with the next row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakDecision {
    /// It fits on the current page.
    Place,
    /// Open a new page and place it there.
    NewPage,
}

/// A row fits when the space left is at least its height.
pub fn decide_row(remaining_height: f64, row_height: f64) -> BreakDecision {
    if remaining_height + EPSILON < row_height {
        BreakDecision::NewPage
    } else {
        BreakDecision::Place
    }
}

/// How many list rows fit on every page.
pub fn rows_per_page(geometry: &ListGeometry) -> usize {
    let available = geometry.body_bottom() - geometry.body_top();
    if available <= 0.0 || geometry.row_height <= 0.0 {
        return 0;
    }
    (available / geometry.row_height + EPSILON).floor() as usize
}

/// Opens pages on demand and collects them in order.
#[derive(Debug)]
pub struct Paginator {
    phase: BuildPhase,
    body_top: f64,
    body_bottom: f64,
    pages: Vec<LayoutPage>,
    current: Option<PageCursor>,
}

impl Paginator {
    /// Every page's flowing content runs from `body_top` to `body_bottom`.
    pub fn new(body_top: f64, body_bottom: f64) -> Self {
        Self {
            phase: BuildPhase::Empty,
            body_top,
            body_bottom,
            pages: Vec::new(),
            current: None,
        }
    }

    pub fn phase(&self) -> BuildPhase {
        self.phase
    }

    /// Close the current page (if any) and open a fresh one.
    pub fn start_page(&mut self) -> &mut PageCursor {
        if let Some(done) = self.current.take() {
            self.pages.push(done.finalize(PAGE_WIDTH, PAGE_HEIGHT));
        }
        if self.phase == BuildPhase::Empty {
            log::debug!("build phase: Empty -> Paginating");
            self.phase = BuildPhase::Paginating;
        }
        self.current
            .insert(PageCursor::new(self.body_top, self.body_bottom))
    }

    /// Cursor with room for `height` more points, opening a new page when
    /// there is none. `chrome` draws the per-page furniture of a new page.
    pub fn cursor_for(
        &mut self,
        height: f64,
        chrome: impl FnOnce(&mut PageCursor),
    ) -> &mut PageCursor {
        let needs_page = self.current.as_ref().map_or(true, |c| {
            decide_row(c.remaining_height(), height) == BreakDecision::NewPage
        });
        if needs_page {
            chrome(self.start_page());
        }
        let (top, bottom) = (self.body_top, self.body_bottom);
        self.current.get_or_insert_with(|| PageCursor::new(top, bottom))
    }

    /// Stop paginating. The page count is final from here on.
    pub fn finish(mut self) -> DraftDocument {
        if let Some(done) = self.current.take() {
            self.pages.push(done.finalize(PAGE_WIDTH, PAGE_HEIGHT));
        }
        log::debug!("build phase: {:?} -> finalizing ({} pages)", self.phase, self.pages.len());
        DraftDocument { pages: self.pages }
    }
}

/// Fully paginated pages that still lack footers.
#[derive(Debug)]
pub struct DraftDocument {
    pages: Vec<LayoutPage>,
}

impl DraftDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Second pass: map every page to a copy carrying its footer.
    pub fn stamp_footers(self, footer: &FooterSpec, typeface: &Typeface) -> Vec<LayoutPage> {
        let total = self.pages.len();
        log::debug!("stamping footers on {} pages", total);
        self.pages
            .into_iter()
            .enumerate()
            .map(|(index, page)| {
                let extra = footer.elements(index + 1, total, typeface);
                page.with_elements(extra)
            })
            .collect()
    }
}

/// Placement and content of the footer line.
#[derive(Debug, Clone)]
pub struct FooterSpec {
    pub left: f64,
    pub right: f64,
    pub rule_y: f64,
    pub baseline: f64,
    pub font_size: f64,
    pub generated: String,
}

impl FooterSpec {
    pub fn for_list(generated_at: NaiveDateTime) -> Self {
        let g = LIST_GEOMETRY;
        Self::new(g.margin.left, PAGE_WIDTH - g.margin.right, g.body_bottom(), generated_at)
    }

    pub fn for_detail(generated_at: NaiveDateTime) -> Self {
        let g = DETAIL_GEOMETRY;
        Self::new(g.margin.left, PAGE_WIDTH - g.margin.right, g.content_bottom(), generated_at)
    }

    fn new(left: f64, right: f64, content_bottom: f64, generated_at: NaiveDateTime) -> Self {
        Self {
            left,
            right,
            rule_y: content_bottom + 8.0,
            baseline: content_bottom + 22.0,
            font_size: 8.0,
            generated: format!("Generated {}", generated_at.format("%Y-%m-%d %H:%M")),
        }
    }

    /// The 1-based page label.
    pub fn page_label(page: usize, total: usize) -> String {
        format!("page {} / {}", page, total)
    }

    fn elements(&self, page: usize, total: usize, typeface: &Typeface) -> Vec<LayoutElement> {
        let mut cursor = PageCursor::new(self.rule_y, self.baseline);
        cursor.rule(self.left, self.rule_y, self.right - self.left, 0.5, palette::RULE);
        cursor.text(
            typeface,
            self.left,
            self.baseline,
            self.generated.as_str(),
            FontRole::Regular,
            self.font_size,
            palette::MUTED,
        );
        let label = Self::page_label(page, total);
        let width = typeface.width_of(FontRole::Regular, &label, self.font_size);
        cursor.text(
            typeface,
            self.right - width,
            self.baseline,
            label,
            FontRole::Regular,
            self.font_size,
            palette::MUTED,
        );
        cursor.finalize(PAGE_WIDTH, PAGE_HEIGHT).elements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(9, 5, 0)
            .unwrap()
    }

    #[test]
    fn row_fits_exactly() {
        assert_eq!(decide_row(18.0, 18.0), BreakDecision::Place);
        assert_eq!(decide_row(17.99, 18.0), BreakDecision::NewPage);
        assert_eq!(decide_row(0.0, 18.0), BreakDecision::NewPage);
    }

    #[test]
    fn list_capacity_from_geometry() {
        // (789.89 - 138) / 18 = 36.2
        assert_eq!(rows_per_page(&LIST_GEOMETRY), 36);
    }

    #[test]
    fn paginator_opens_pages_on_demand() {
        let mut p = Paginator::new(0.0, 40.0);
        assert_eq!(p.phase(), BuildPhase::Empty);
        let mut chrome_calls = 0;
        for _ in 0..5 {
            let c = p.cursor_for(18.0, |_| chrome_calls += 1);
            c.advance(18.0);
        }
        assert_eq!(p.phase(), BuildPhase::Paginating);
        // 2 rows per page: 2 + 2 + 1
        assert_eq!(chrome_calls, 3);
        assert_eq!(p.finish().page_count(), 3);
    }

    #[test]
    fn unused_paginator_has_no_pages() {
        let p = Paginator::new(0.0, 40.0);
        assert_eq!(p.finish().page_count(), 0);
    }

    #[test]
    fn footers_carry_final_total() {
        let mut p = Paginator::new(0.0, 100.0);
        p.start_page();
        p.start_page();
        p.start_page();
        let pages = p
            .finish()
            .stamp_footers(&FooterSpec::for_list(at()), &Typeface::standard());
        assert_eq!(pages.len(), 3);
        for (i, page) in pages.iter().enumerate() {
            let runs = page.text_runs();
            assert!(runs.contains(&"Generated 2026-10-19 09:05"));
            assert!(runs.contains(&FooterSpec::page_label(i + 1, 3).as_str()));
        }
    }

    #[test]
    fn page_label_is_right_aligned() {
        let spec = FooterSpec::for_detail(at());
        let t = Typeface::standard();
        let els = spec.elements(2, 7, &t);
        let last = els.last().unwrap();
        assert!((last.x + last.width - spec.right).abs() < 1e-9);
    }
}
