//! # Column Geometry
//!
//! Fits the list table's fixed column set to the usable page width. The
//! result always sums to the target width unless the target is smaller than
//! the sum of all column minimums, in which case columns clamp at their
//! minimums and the table overflows.
//!
//! Width pressure is absorbed in three phases:
//!
//! 1. The flexible column (subject) shrinks toward its minimum.
//! 2. Remaining overflow is taken from every column in proportion to its
//!    slack above its own minimum, then phase 1 runs again.
//! 3. Widths are rounded to whole points and the rounding drift is pushed
//!    onto the flexible column (clamped to its minimum).

/// Identifies a list column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKey {
    No,
    Subject,
    CustomerName,
    Assignee,
    Status,
    Priority,
    CreatedAt,
}

/// One column of the list table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnSpec {
    pub key: ColumnKey,
    pub label: &'static str,
    pub width: f64,
    pub min_width: f64,
}

impl ColumnSpec {
    const fn new(key: ColumnKey, label: &'static str, width: f64, min_width: f64) -> Self {
        Self {
            key,
            label,
            width,
            min_width,
        }
    }

    fn slack(&self) -> f64 {
        (self.width - self.min_width).max(0.0)
    }
}

/// The column absorbing width pressure first.
pub const FLEXIBLE_COLUMN: ColumnKey = ColumnKey::Subject;

/// Base column set, in display order.
pub const BASE_COLUMNS: [ColumnSpec; 7] = [
    ColumnSpec::new(ColumnKey::No, "No.", 36.0, 32.0),
    ColumnSpec::new(ColumnKey::Subject, "Subject", 180.0, 110.0),
    ColumnSpec::new(ColumnKey::CustomerName, "Customer", 90.0, 70.0),
    ColumnSpec::new(ColumnKey::Assignee, "Assignee", 70.0, 55.0),
    ColumnSpec::new(ColumnKey::Status, "Status", 64.0, 60.0),
    ColumnSpec::new(ColumnKey::Priority, "Priority", 52.0, 45.0),
    ColumnSpec::new(ColumnKey::CreatedAt, "Created", 72.0, 70.0),
];

const EPSILON: f64 = 1e-9;

fn total(columns: &[ColumnSpec]) -> f64 {
    columns.iter().map(|c| c.width).sum()
}

/// Shrink the flexible column by up to `overflow`. Returns what's left.
fn squeeze_flexible(columns: &mut [ColumnSpec], overflow: f64) -> f64 {
    if overflow <= EPSILON {
        return 0.0;
    }
    match columns.iter_mut().find(|c| c.key == FLEXIBLE_COLUMN) {
        Some(col) => {
            let take = overflow.min(col.slack());
            col.width -= take;
            overflow - take
        }
        None => overflow,
    }
}

/// Take `overflow` from all columns in proportion to their slack.
fn squeeze_proportional(columns: &mut [ColumnSpec], overflow: f64) -> f64 {
    let total_slack: f64 = columns.iter().map(ColumnSpec::slack).sum();
    if overflow <= EPSILON || total_slack <= EPSILON {
        return overflow.max(0.0);
    }

    let mut taken = 0.0;
    for col in columns.iter_mut() {
        let slack = col.slack();
        let take = (overflow * slack / total_slack).min(slack);
        col.width -= take;
        taken += take;
    }
    (overflow - taken).max(0.0)
}

fn reclaim_rounding(columns: &mut [ColumnSpec], mut excess: f64) {
    for col in columns.iter_mut().rev() {
        if excess <= EPSILON {
            break;
        }
        if col.key == FLEXIBLE_COLUMN {
            continue;
        }
        let take = excess.min(col.slack());
        col.width -= take;
        excess -= take;
    }
}

/// Fit `base` to exactly `target_width`.
///
/// Specs are copied; `base` itself is never modified.
pub fn fit(base: &[ColumnSpec], target_width: f64) -> Vec<ColumnSpec> {
    let mut columns = base.to_vec();

    let overflow = total(&columns) - target_width;
    if overflow > EPSILON {
        let remaining = squeeze_flexible(&mut columns, overflow);
        let remaining = squeeze_proportional(&mut columns, remaining);
        let remaining = squeeze_flexible(&mut columns, remaining);
        if remaining > EPSILON {
            log::warn!(
                "column minimums exceed target width {:.2} by {:.2}; table will overflow",
                target_width,
                remaining
            );
        }
    }

    for col in columns.iter_mut() {
        col.width = col.width.round().max(col.min_width);
    }

    let drift = target_width - total(&columns);
    if drift.abs() > EPSILON {
        if let Some(col) = columns.iter_mut().find(|c| c.key == FLEXIBLE_COLUMN) {
            col.width = (col.width + drift).max(col.min_width);
        }
    }

    // Rounding up near the minimums can leave more drift than the clamped
    // flexible column can give back; reclaim it from the other columns.
    let excess = total(&columns) - target_width;
    if excess > EPSILON {
        reclaim_rounding(&mut columns, excess);
    }

    log::debug!(
        "column widths: {:?}",
        columns.iter().map(|c| c.width).collect::<Vec<_>>()
    );
    columns
}

/// Left edge of each column, starting at `x`.
pub fn column_offsets(columns: &[ColumnSpec], x: f64) -> Vec<f64> {
    columns
        .iter()
        .scan(x, |acc, col| {
            let left = *acc;
            *acc += col.width;
            Some(left)
        })
        .collect()
}
