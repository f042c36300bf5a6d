//! # Detail Layout
//!
//! One page per record: a header bar, a metadata card and a body card. The
//! body is wrapped to the card width and cut off silently at the card's
//! bottom edge; a record never continues onto a second page.

use super::page_break::{DraftDocument, Paginator};
use super::{draw_badge, DrawCommand, PageCursor, BADGE_HEIGHT};
use crate::assets::Assets;
use crate::font::FontRole;
use crate::model::{Record, RenderOptions, DETAIL_GEOMETRY};
use crate::style::{palette, priority_theme, status_theme, BadgeTheme};
use crate::text;

const CARD_RADIUS: f64 = 6.0;
const LOGO_BOX: f64 = 62.0;
const STAMP_BOX: f64 = 96.0;
const HEADER_INSET: f64 = 18.0;
const LABEL_SIZE: f64 = 8.0;
const VALUE_SIZE: f64 = 10.5;
const HEADING_SIZE: f64 = 10.0;
const ID_SIZE: f64 = 18.0;
/// Space between the body card's top padding and its first text line.
const BODY_HEADING_HEIGHT: f64 = 22.0;

enum MetaValue<'a> {
    Text(&'a str),
    Badge(&'a str, BadgeTheme),
}

fn card(cursor: &mut PageCursor, x: f64, y: f64, width: f64, height: f64) {
    cursor.rect(
        x,
        y,
        width,
        height,
        DrawCommand::Rect {
            background: Some(palette::CARD),
            border: Some((0.75, palette::CARD_BORDER)),
            radius: CARD_RADIUS,
        },
    );
}

fn draw_header(cursor: &mut PageCursor, assets: &Assets, options: &RenderOptions, record: &Record) {
    let g = DETAIL_GEOMETRY;
    let typeface = &assets.typeface;
    let left = g.margin.left;
    let top = g.margin.top;
    let width = g.usable_width();
    let right = left + width;

    cursor.fill(left, top, width, g.header_height, palette::HEADER_BAR, CARD_RADIUS);

    let mut text_x = left + HEADER_INSET;
    if let Some(logo) = &assets.logo {
        let (w, h) = logo.fit_within(LOGO_BOX, LOGO_BOX);
        let logo_y = top + (g.header_height - h) / 2.0;
        cursor.image(logo, text_x, logo_y, w, h);
        text_x += LOGO_BOX + 14.0;
    }
    let text_right = right - HEADER_INSET;

    // Top line: app label on the left, document title on the right.
    let doc_title = text::clip(
        options.resolved_title(),
        typeface.get(FontRole::Regular),
        LABEL_SIZE,
        (text_right - text_x) / 2.0,
    );
    let doc_title_width = typeface.width_of(FontRole::Regular, &doc_title, LABEL_SIZE);
    let app = text::clip(
        options.resolved_app_title(),
        typeface.get(FontRole::Regular),
        LABEL_SIZE,
        (text_right - text_x - doc_title_width - 12.0).max(0.0),
    );
    cursor.text(
        typeface,
        text_x,
        top + 24.0,
        app,
        FontRole::Regular,
        LABEL_SIZE,
        palette::HEADER_TEXT,
    );
    cursor.text(
        typeface,
        text_right - doc_title_width,
        top + 24.0,
        doc_title,
        FontRole::Regular,
        LABEL_SIZE,
        palette::HEADER_TEXT,
    );

    // "#id  subject" on one clipped line.
    let heading = if record.subject.is_empty() {
        format!("#{}", record.id)
    } else {
        format!("#{}  {}", record.id, record.subject)
    };
    let heading = text::clip(&heading, typeface.get(FontRole::Bold), ID_SIZE, text_right - text_x);
    cursor.text(
        typeface,
        text_x,
        top + 52.0,
        heading,
        FontRole::Bold,
        ID_SIZE,
        palette::HEADER_TEXT,
    );

    let badge_y = top + 76.0;
    let budget = (text_right - text_x) / 2.0 - 4.0;
    let used = draw_badge(
        cursor,
        typeface,
        text_x,
        badge_y,
        record.status.label(),
        status_theme(&record.status),
        budget,
    );
    draw_badge(
        cursor,
        typeface,
        text_x + used + 6.0,
        badge_y,
        record.priority.label(),
        priority_theme(&record.priority),
        budget,
    );
}

/// Three rows of two label/value blocks. Returns the card's bottom edge.
fn draw_metadata(cursor: &mut PageCursor, assets: &Assets, record: &Record, top: f64) -> f64 {
    let g = DETAIL_GEOMETRY;
    let typeface = &assets.typeface;
    let left = g.margin.left;
    let height = 2.0 * g.card_padding + 3.0 * g.meta_row_height;
    card(cursor, left, top, g.usable_width(), height);

    let rows: [[(&str, MetaValue); 2]; 3] = [
        [
            ("Customer", MetaValue::Text(&record.customer_name)),
            ("Assignee", MetaValue::Text(record.assignee_label())),
        ],
        [
            ("Status", MetaValue::Badge(record.status.label(), status_theme(&record.status))),
            (
                "Priority",
                MetaValue::Badge(record.priority.label(), priority_theme(&record.priority)),
            ),
        ],
        [
            ("Created", MetaValue::Text(&record.created_at)),
            ("Updated", MetaValue::Text(&record.updated_at)),
        ],
    ];

    let block_width = (g.usable_width() - 2.0 * g.card_padding) / 2.0;
    let value_budget = block_width - 8.0;
    for (r, row) in rows.iter().enumerate() {
        let row_top = top + g.card_padding + r as f64 * g.meta_row_height;
        for (b, (label, value)) in row.iter().enumerate() {
            let x = left + g.card_padding + b as f64 * block_width;
            cursor.text(
                typeface,
                x,
                row_top + 9.0,
                *label,
                FontRole::Regular,
                LABEL_SIZE,
                palette::MUTED,
            );
            match value {
                MetaValue::Text(v) => {
                    let v: &str = if v.is_empty() { "-" } else { v };
                    let clipped = text::clip(
                        v,
                        typeface.get(FontRole::Regular),
                        VALUE_SIZE,
                        value_budget,
                    );
                    cursor.text(
                        typeface,
                        x,
                        row_top + 26.0,
                        clipped,
                        FontRole::Regular,
                        VALUE_SIZE,
                        palette::INK,
                    );
                }
                MetaValue::Badge(label, theme) => {
                    let center = row_top + 14.0 + BADGE_HEIGHT / 2.0 + 1.0;
                    draw_badge(cursor, typeface, x, center, label, *theme, value_budget);
                }
            }
        }
    }
    top + height
}

/// Lines of body text that fit a body card spanning `top..bottom`.
pub fn body_line_capacity(top: f64, bottom: f64) -> usize {
    let g = DETAIL_GEOMETRY;
    let text_top = top + g.card_padding + BODY_HEADING_HEIGHT;
    let available = bottom - g.card_padding - text_top;
    if available <= 0.0 {
        return 0;
    }
    (available / g.body_line_height + 1e-9).floor() as usize
}

fn draw_body(cursor: &mut PageCursor, assets: &Assets, record: &Record, top: f64) {
    let g = DETAIL_GEOMETRY;
    let typeface = &assets.typeface;
    let left = g.margin.left;
    let width = g.usable_width();
    let bottom = g.content_bottom();
    card(cursor, left, top, width, bottom - top);

    let text_x = left + g.card_padding;
    cursor.text(
        typeface,
        text_x,
        top + g.card_padding + HEADING_SIZE,
        "Description",
        FontRole::Bold,
        HEADING_SIZE,
        palette::INK,
    );

    let font = typeface.get(FontRole::Regular);
    let lines = text::wrap(&record.body, font, g.body_font_size, width - 2.0 * g.card_padding);
    let (lines, dropped) = text::truncate_lines(lines, body_line_capacity(top, bottom));
    if dropped > 0 {
        log::debug!("record {}: body truncated by {} lines", record.id, dropped);
    }

    let text_top = top + g.card_padding + BODY_HEADING_HEIGHT;
    for (i, line) in lines.into_iter().enumerate() {
        let baseline = text_top + i as f64 * g.body_line_height + g.body_font_size;
        cursor.text(
            typeface,
            text_x,
            baseline,
            line,
            FontRole::Regular,
            g.body_font_size,
            palette::INK,
        );
    }

    if let Some(stamp) = &assets.stamp {
        let (w, h) = stamp.fit_within(STAMP_BOX, STAMP_BOX);
        cursor.image(
            stamp,
            left + width - g.card_padding - w,
            bottom - g.card_padding - h,
            w,
            h,
        );
    }
}

fn draw_record(cursor: &mut PageCursor, assets: &Assets, options: &RenderOptions, record: &Record) {
    let g = DETAIL_GEOMETRY;
    draw_header(cursor, assets, options, record);
    let meta_top = g.margin.top + g.header_height + g.card_gap;
    let meta_bottom = draw_metadata(cursor, assets, record, meta_top);
    draw_body(cursor, assets, record, meta_bottom + g.card_gap);
    cursor.y = g.content_bottom();
}

/// Paginate one page per record. Zero records yield zero pages.
pub fn paginate(records: &[Record], options: &RenderOptions, assets: &Assets) -> DraftDocument {
    let g = DETAIL_GEOMETRY;
    let mut pager = Paginator::new(g.margin.top, g.content_bottom());
    for record in records {
        draw_record(pager.start_page(), assets, options, record);
    }
    log::debug!("detail layout: {} records", records.len());
    pager.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(body: &str) -> Record {
        Record {
            id: 42,
            subject: "Printer on fire".into(),
            body: body.into(),
            customer_name: "Acme".into(),
            created_at: "2026-10-01".into(),
            updated_at: "2026-10-02".into(),
            ..Record::default()
        }
    }

    #[test]
    fn one_page_per_record() {
        let recs = vec![record("a"), record("b"), record("c")];
        let draft = paginate(&recs, &RenderOptions::detail(), &Assets::default());
        assert_eq!(draft.page_count(), 3);
        assert_eq!(paginate(&[], &RenderOptions::detail(), &Assets::default()).page_count(), 0);
    }

    #[test]
    fn body_capacity_matches_card() {
        // body card spans 302..785.89: (771.89 - 338) / 15 = 28.9
        assert_eq!(body_line_capacity(302.0, DETAIL_GEOMETRY.content_bottom()), 28);
        assert_eq!(body_line_capacity(700.0, 720.0), 0);
    }

    #[test]
    fn long_body_is_truncated_silently() {
        let body = (0..200).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let recs = vec![record(&body)];
        let draft = paginate(&recs, &RenderOptions::detail(), &Assets::default());
        assert_eq!(draft.page_count(), 1);
        let page = &draft.stamp_footers(
            &crate::layout::page_break::FooterSpec::for_detail(chrono::NaiveDateTime::default()),
            &Assets::default().typeface,
        )[0];
        let runs = page.text_runs();
        assert!(runs.contains(&"line 0"));
        assert!(runs.contains(&"line 27"));
        assert!(!runs.contains(&"line 28"));
        for el in &page.elements {
            if let DrawCommand::Text { text, .. } = &el.draw {
                if text.starts_with("line ") {
                    assert!(el.y < DETAIL_GEOMETRY.content_bottom());
                }
            }
        }
    }

    #[test]
    fn metadata_shows_labels_and_dash_for_missing_assignee() {
        let recs = vec![record("body")];
        let draft = paginate(&recs, &RenderOptions::detail(), &Assets::default());
        let page = &draft.stamp_footers(
            &crate::layout::page_break::FooterSpec::for_detail(chrono::NaiveDateTime::default()),
            &Assets::default().typeface,
        )[0];
        let runs = page.text_runs();
        for label in [
            "Customer",
            "Assignee",
            "Status",
            "Priority",
            "Created",
            "Updated",
            "Description",
        ] {
            assert!(runs.contains(&label), "{label}");
        }
        assert!(runs.contains(&"-"));
        assert!(runs.contains(&"#42  Printer on fire"));
        assert!(runs.contains(&"Open"));
        assert!(runs.contains(&"Medium"));
    }
}
