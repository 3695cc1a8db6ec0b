//! Record matching against the identifier column, and canonical record
//! selection when one identifier matches several rows.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{
    data::{Cell, RawTable, Row},
    error::{LookupError, Result},
    resolve::ResolvedColumnMap,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMode {
    /// Trimmed, case-folded cell equals the case-folded query.
    Exact,
    /// Case-folded cell contains the case-folded query.
    #[default]
    Substring,
}

/// What a blank query selects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmptyQuery {
    #[default]
    NoMatch,
    MatchAll,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchQuery {
    pub text: String,
    pub mode: MatchMode,
    pub empty: EmptyQuery,
}

impl MatchQuery {
    pub fn new(text: impl Into<String>, mode: MatchMode) -> Self {
        Self {
            text: text.into(),
            mode,
            empty: EmptyQuery::NoMatch,
        }
    }

    pub fn exact(text: impl Into<String>) -> Self {
        Self::new(text, MatchMode::Exact)
    }

    pub fn substring(text: impl Into<String>) -> Self {
        Self::new(text, MatchMode::Substring)
    }

    /// Lets a blank query list every row instead of none.
    pub fn match_all_when_empty(mut self) -> Self {
        self.empty = EmptyQuery::MatchAll;
        self
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Compares against the string form of the cell, so numeric cells match
    /// their rendered digits.
    pub fn matches(&self, cell: &Cell) -> bool {
        let needle = self.text.trim().to_lowercase();
        if needle.is_empty() {
            return self.empty == EmptyQuery::MatchAll;
        }
        let haystack = cell.as_text().trim().to_lowercase();
        match self.mode {
            MatchMode::Exact => haystack == needle,
            MatchMode::Substring => haystack.contains(&needle),
        }
    }
}

/// Data rows whose identifier cell matches `query`, in table order.
///
/// `id_column` of `None` means the identifier column did not resolve; that is
/// reported as [`LookupError::ColumnNotFound`] rather than scanning another
/// column.
pub fn match_rows(
    table: &RawTable,
    id_field: &str,
    id_column: Option<usize>,
    query: &MatchQuery,
) -> Result<Vec<Row>> {
    if query.is_blank() && query.empty == EmptyQuery::NoMatch {
        return Ok(Vec::new());
    }
    let Some(index) = id_column else {
        return Err(LookupError::ColumnNotFound {
            field: id_field.to_string(),
            headers: table.header().map(<[String]>::to_vec).unwrap_or_default(),
        });
    };
    Ok(table
        .data_rows()
        .iter()
        .filter(|row| row.get(index).is_some_and(|cell| query.matches(cell)))
        .cloned()
        .collect())
}

/// [`match_rows`] with the identifier column looked up in a resolved map.
pub fn find(
    table: &RawTable,
    columns: &ResolvedColumnMap,
    id_field: &str,
    query: &MatchQuery,
) -> Result<Vec<Row>> {
    match_rows(table, id_field, columns.get(id_field), query)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
    /// Latest parsed date wins; first row when no row carries a date.
    #[default]
    LatestDate,
    FirstRow,
}

pub fn select_canonical<'a>(
    rows: &'a [Row],
    date_column: Option<usize>,
    tie_break: TieBreak,
) -> Option<&'a Row> {
    let first = rows.first()?;
    let (TieBreak::LatestDate, Some(index)) = (tie_break, date_column) else {
        return Some(first);
    };
    let mut best: Option<(&Row, NaiveDateTime)> = None;
    for row in rows {
        let Some(date) = row.get(index).and_then(Cell::as_date) else {
            continue;
        };
        if best.is_none_or(|(_, top)| date > top) {
            best = Some((row, date));
        }
    }
    Some(best.map_or(first, |(row, _)| row))
}
