//! # List Layout
//!
//! Many records per page as a table. Every page repeats the header band and
//! the column-heading row; rows have a fixed height and cell text is clipped,
//! never wrapped, so a page holds exactly [`rows_per_page`] rows.
//!
//! [`rows_per_page`]: super::page_break::rows_per_page

use chrono::NaiveDateTime;

use super::columns::{self, ColumnKey, ColumnSpec, BASE_COLUMNS};
use super::page_break::{DraftDocument, Paginator};
use super::{centered_baseline, draw_badge, PageCursor};
use crate::assets::Assets;
use crate::font::FontRole;
use crate::model::{Record, RenderOptions, LIST_GEOMETRY, PAGE_WIDTH};
use crate::style::{palette, priority_theme, status_theme};
use crate::text;

const TITLE_SIZE: f64 = 16.0;
const SUBTITLE_SIZE: f64 = 9.0;
const META_SIZE: f64 = 8.5;
const HEADING_SIZE: f64 = 8.5;
const LOGO_BOX: f64 = 44.0;

/// Per-build values every page's chrome needs.
struct ListChrome<'a> {
    assets: &'a Assets,
    columns: &'a [ColumnSpec],
    offsets: &'a [f64],
    title: &'a str,
    app_title: &'a str,
    meta: String,
}

impl ListChrome<'_> {
    fn draw(&self, cursor: &mut PageCursor) {
        let g = LIST_GEOMETRY;
        let left = g.margin.left;
        let right = PAGE_WIDTH - g.margin.right;
        let top = g.margin.top;
        let typeface = &self.assets.typeface;

        let mut text_right = right;
        if let Some(logo) = &self.assets.logo {
            let (w, h) = logo.fit_within(LOGO_BOX, LOGO_BOX);
            cursor.image(logo, right - w, top, w, h);
            text_right = right - LOGO_BOX - 12.0;
        }
        let text_width = text_right - left;

        let title = text::clip(self.title, typeface.get(FontRole::Bold), TITLE_SIZE, text_width);
        cursor.text(typeface, left, top + 18.0, title, FontRole::Bold, TITLE_SIZE, palette::INK);
        let app = text::clip(
            self.app_title,
            typeface.get(FontRole::Regular),
            SUBTITLE_SIZE,
            text_width,
        );
        cursor.text(
            typeface,
            left,
            top + 34.0,
            app,
            FontRole::Regular,
            SUBTITLE_SIZE,
            palette::MUTED,
        );
        cursor.text(
            typeface,
            left,
            top + 50.0,
            self.meta.as_str(),
            FontRole::Regular,
            META_SIZE,
            palette::MUTED,
        );
        cursor.rule(left, g.table_top() - 6.0, right - left, 0.75, palette::RULE);

        // Column headings
        let head_top = g.table_top();
        cursor.fill(left, head_top, g.usable_width(), g.row_height, palette::TABLE_HEAD, 0.0);
        let baseline = centered_baseline(
            typeface,
            FontRole::Bold,
            head_top,
            g.row_height,
            HEADING_SIZE,
        );
        for (col, &x) in self.columns.iter().zip(self.offsets) {
            let budget = (col.width - 2.0 * g.cell_padding).max(0.0);
            let label = text::clip(col.label, typeface.get(FontRole::Bold), HEADING_SIZE, budget);
            cursor.text(
                typeface,
                x + g.cell_padding,
                baseline,
                label,
                FontRole::Bold,
                HEADING_SIZE,
                palette::INK,
            );
        }
    }
}

fn cell_text(record: &Record, key: ColumnKey) -> String {
    match key {
        ColumnKey::No => record.id.to_string(),
        ColumnKey::Subject => record.subject.clone(),
        ColumnKey::CustomerName => record.customer_name.clone(),
        ColumnKey::Assignee => record.assignee_label().to_string(),
        ColumnKey::Status => record.status.label().to_string(),
        ColumnKey::Priority => record.priority.label().to_string(),
        ColumnKey::CreatedAt => record.created_at.clone(),
    }
}

fn draw_row(
    cursor: &mut PageCursor,
    assets: &Assets,
    columns: &[ColumnSpec],
    offsets: &[f64],
    record: &Record,
    index: usize,
) {
    let g = LIST_GEOMETRY;
    let typeface = &assets.typeface;
    let top = cursor.y;
    let left = g.margin.left;

    if index % 2 == 1 {
        cursor.fill(left, top, g.usable_width(), g.row_height, palette::ZEBRA, 0.0);
    }

    let baseline = centered_baseline(typeface, FontRole::Regular, top, g.row_height, g.font_size);
    let center_y = top + g.row_height / 2.0;
    for (col, &x) in columns.iter().zip(offsets) {
        let budget = (col.width - 2.0 * g.cell_padding).max(0.0);
        let cell_x = x + g.cell_padding;
        match col.key {
            ColumnKey::Status => {
                draw_badge(
                    cursor,
                    typeface,
                    cell_x,
                    center_y,
                    record.status.label(),
                    status_theme(&record.status),
                    budget,
                );
            }
            ColumnKey::Priority => {
                draw_badge(
                    cursor,
                    typeface,
                    cell_x,
                    center_y,
                    record.priority.label(),
                    priority_theme(&record.priority),
                    budget,
                );
            }
            key => {
                let value = cell_text(record, key);
                let clipped = text::clip(
                    &value,
                    typeface.get(FontRole::Regular),
                    g.font_size,
                    budget,
                );
                cursor.text(
                    typeface,
                    cell_x,
                    baseline,
                    clipped,
                    FontRole::Regular,
                    g.font_size,
                    palette::INK,
                );
            }
        }
    }

    cursor.rule(left, top + g.row_height, g.usable_width(), 0.5, palette::RULE);
}

/// Paginate `records` as a table. Always yields at least one page.
pub fn paginate(
    records: &[Record],
    options: &RenderOptions,
    assets: &Assets,
    generated_at: NaiveDateTime,
) -> DraftDocument {
    let g = LIST_GEOMETRY;
    let columns = columns::fit(&BASE_COLUMNS, g.usable_width());
    let offsets = columns::column_offsets(&columns, g.margin.left);

    let noun = if records.len() == 1 { "ticket" } else { "tickets" };
    let chrome = ListChrome {
        assets,
        columns: &columns,
        offsets: &offsets,
        title: options.resolved_title(),
        app_title: options.resolved_app_title(),
        meta: format!(
            "{} {}  |  Generated {}",
            records.len(),
            noun,
            generated_at.format("%Y-%m-%d %H:%M")
        ),
    };

    let mut pager = Paginator::new(g.body_top(), g.body_bottom());
    if records.is_empty() {
        chrome.draw(pager.start_page());
    }
    for (index, record) in records.iter().enumerate() {
        let cursor = pager.cursor_for(g.row_height, |c| chrome.draw(c));
        draw_row(cursor, assets, &columns, &offsets, record, index);
        cursor.advance(g.row_height);
    }

    log::debug!("list layout: {} records", records.len());
    pager.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::page_break::rows_per_page;
    use crate::layout::{DrawCommand, LayoutPage};
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn records(n: usize) -> Vec<Record> {
        (1..=n)
            .map(|i| Record {
                id: i as u64,
                subject: format!("Subject {i}"),
                customer_name: "Acme".into(),
                created_at: "2026-10-01".into(),
                ..Record::default()
            })
            .collect()
    }

    fn pages(n: usize) -> Vec<LayoutPage> {
        let draft = paginate(&records(n), &RenderOptions::list(), &Assets::default(), at());
        draft.stamp_footers(
            &crate::layout::page_break::FooterSpec::for_list(at()),
            &Assets::default().typeface,
        )
    }

    #[test]
    fn zero_records_still_one_page() {
        let p = pages(0);
        assert_eq!(p.len(), 1);
        let runs = p[0].text_runs();
        assert!(runs.contains(&"Ticket List"));
        assert!(runs.contains(&"Subject"));
    }

    #[test]
    fn page_count_is_ceil_of_capacity() {
        let cap = rows_per_page(&LIST_GEOMETRY);
        assert_eq!(pages(cap).len(), 1);
        assert_eq!(pages(cap + 1).len(), 2);
        assert_eq!(pages(2 * cap + 5).len(), 3);
    }

    #[test]
    fn headings_repeat_on_every_page() {
        for page in pages(80) {
            let runs = page.text_runs();
            assert!(runs.contains(&"Ticket List"));
            assert!(runs.contains(&"No."));
            assert!(runs.contains(&"Created"));
        }
    }

    #[test]
    fn rows_stay_inside_body() {
        let g = LIST_GEOMETRY;
        for page in pages(100) {
            for el in &page.elements {
                if let DrawCommand::Rule { .. } = el.draw {
                    continue;
                }
                if el.y > g.body_bottom() && matches!(el.draw, DrawCommand::Rect { .. }) {
                    panic!("row rect below body: {:?}", el);
                }
            }
        }
    }

    #[test]
    fn long_subject_is_clipped_to_cell() {
        let g = LIST_GEOMETRY;
        let mut recs = records(1);
        recs[0].subject =
            "An extremely long subject line that keeps going well past any reasonable cell width"
                .into();
        let draft = paginate(&recs, &RenderOptions::list(), &Assets::default(), at());
        let page = &draft.stamp_footers(
            &crate::layout::page_break::FooterSpec::for_list(at()),
            &Assets::default().typeface,
        )[0];

        let cols = columns::fit(&BASE_COLUMNS, g.usable_width());
        let subject_budget = cols[1].width - 2.0 * g.cell_padding;
        let cell = page
            .elements
            .iter()
            .find_map(|el| match &el.draw {
                DrawCommand::Text { text, .. } if text.starts_with("An extremely") => {
                    Some((el, text))
                }
                _ => None,
            })
            .unwrap();
        assert!(cell.1.ends_with(text::ELLIPSIS));
        assert!(cell.0.width <= subject_budget + 1e-9);
    }

    #[test]
    fn zebra_on_odd_rows() {
        let page = &pages(4)[0];
        let zebra = page
            .elements
            .iter()
            .filter(|el| match el.draw {
                DrawCommand::Rect { background, .. } => background == Some(palette::ZEBRA),
                _ => false,
            })
            .count();
        assert_eq!(zebra, 2);
    }
}
