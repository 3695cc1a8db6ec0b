//! Bounded, date-ordered history windows over matched rows.

use std::cmp::Ordering;

use chrono::{Duration, NaiveDateTime};
use itertools::Itertools;

use crate::data::{Cell, Row};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowMode {
    /// Most recent `n` rows; undated rows fill in after dated ones.
    Count(usize),
    /// Rows dated within the duration before "now"; undated rows dropped.
    /// A cutoff earlier than the calendar can represent keeps every dated row.
    Since(Duration),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Descending,
    Ascending,
}

fn row_date(row: &Row, date_column: Option<usize>) -> Option<NaiveDateTime> {
    date_column
        .and_then(|idx| row.get(idx))
        .and_then(Cell::as_date)
}

/// Dated rows ordered by `order`, undated rows last; ties keep input order.
fn compare_dates(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>, order: SortOrder) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match order {
            SortOrder::Descending => b.cmp(&a),
            SortOrder::Ascending => a.cmp(&b),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn sort_by_date(rows: &[Row], date_column: Option<usize>, order: SortOrder) -> Vec<Row> {
    rows.iter()
        .map(|row| (row_date(row, date_column), row))
        .sorted_by(|(a, _), (b, _)| compare_dates(*a, *b, order))
        .map(|(_, row)| row.clone())
        .collect()
}

/// Extracts a history window. Rows are returned whole; projection happens
/// afterwards.
pub fn window(
    rows: &[Row],
    date_column: Option<usize>,
    mode: WindowMode,
    order: SortOrder,
    now: NaiveDateTime,
) -> Vec<Row> {
    match mode {
        WindowMode::Count(limit) => sort_by_date(rows, date_column, order)
            .into_iter()
            .take(limit)
            .collect(),
        WindowMode::Since(duration) => {
            let cutoff = now.checked_sub_signed(duration);
            let recent = rows
                .iter()
                .filter(|row| {
                    row_date(row, date_column)
                        .is_some_and(|date| cutoff.is_none_or(|cutoff| date >= cutoff))
                })
                .cloned()
                .collect::<Vec<_>>();
            sort_by_date(&recent, date_column, order)
        }
    }
}
