//! Untyped cells, rows and raw tables as fetched from a tabular source.
//!
//! A [`RawTable`] holds every record of a source exactly once, including
//! records whose cells are all empty (a spreadsheet export writes a blank
//! sheet row as `,,,`). Row positions, and so header row indices, count those
//! records. The header row (if any) is chosen after the fact with
//! [`RawTable::with_header_row`], which derives a new table rather than
//! editing the existing one. Blank records never appear among the data rows.

use std::{borrow::Cow, fmt};

use chrono::{DateTime, NaiveDate, NaiveDateTime};

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

pub type Row = Vec<Cell>;

impl Cell {
    /// Builds a text cell, trimming surrounding whitespace. Blank input yields
    /// [`Cell::Empty`].
    pub fn text(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(trimmed.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    /// String form of the cell. Integral numbers render without a fractional
    /// part so that `1401.0` compares equal to the text `"1401"`.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Cell::Empty => Cow::Borrowed(""),
            Cell::Text(s) => Cow::Borrowed(s.as_str()),
            Cell::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
                    Cow::Owned(format!("{}", *n as i64))
                } else {
                    Cow::Owned(n.to_string())
                }
            }
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => parse_number(s),
            Cell::Number(n) => n.is_finite().then_some(*n),
        }
    }

    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            Cell::Text(s) => parse_date(s),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_text())
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::text(value)
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::text(&value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

/// Parses a numeric cell, accepting a trailing percent sign. Non-finite
/// results (`nan`, `inf`) are rejected.
pub fn parse_number(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    let trimmed = trimmed.strip_suffix('%').unwrap_or(trimmed).trim_end();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Permissive date parser. Date-only values resolve to midnight.
/// Slash dates are read month-first, then day-first when month-first is
/// impossible.
pub fn parse_date(value: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
        "%d/%m/%Y %H:%M",
    ];
    const DATE_FORMATS: &[&str] = &[
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%m/%d/%Y",
        "%d/%m/%Y",
        "%d-%m-%Y",
        "%d.%m.%Y",
        "%m/%d/%y",
        "%d-%b-%Y",
        "%d %b %Y",
        "%d %B %Y",
        "%b %d, %Y",
        "%B %d, %Y",
    ];

    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_local());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(parsed);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, fmt) {
            return parsed.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Collapses embedded line breaks in a header cell to single spaces.
pub fn normalize_header(value: &str) -> String {
    value
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    rows: Vec<Row>,
    header_row: Option<usize>,
    header: Option<Vec<String>>,
    data: Vec<Row>,
}

fn is_blank_row(row: &Row) -> bool {
    row.iter().all(Cell::is_empty)
}

impl RawTable {
    /// Builds a table from fetched rows. Text cells are trimmed and short rows
    /// are padded to the widest row. Blank rows keep their position.
    pub fn new(rows: Vec<Row>) -> Self {
        let mut rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| match cell {
                        Cell::Text(s) => Cell::text(&s),
                        other => other,
                    })
                    .collect::<Row>()
            })
            .collect::<Vec<_>>();
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, Cell::Empty);
        }
        Self {
            rows,
            header_row: None,
            header: None,
            data: Vec::new(),
        }
        .with_header_row(None)
    }

    pub fn from_text_rows<I, R, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        RawTable::new(
            rows.into_iter()
                .map(|row| row.into_iter().map(|c| Cell::text(c.as_ref())).collect())
                .collect(),
        )
    }

    /// Derives a table whose header is the row at `index`, counted over every
    /// record including blank ones. Rows before the header are discarded as
    /// preamble. `None` treats every row as data.
    pub fn with_header_row(&self, index: Option<usize>) -> RawTable {
        let header = index.and_then(|idx| self.rows.get(idx)).map(|row| {
            row.iter()
                .map(|cell| normalize_header(&cell.as_text()))
                .collect::<Vec<_>>()
        });
        let body = match index {
            Some(idx) => self.rows.get(idx + 1..).unwrap_or(&[]),
            None => &self.rows,
        };
        RawTable {
            rows: self.rows.clone(),
            header_row: index,
            header,
            data: body.iter().filter(|row| !is_blank_row(row)).cloned().collect(),
        }
    }

    /// Every record, header, preamble and blank rows included.
    pub fn all_rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn header_row(&self) -> Option<usize> {
        self.header_row
    }

    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    /// Non-blank rows after the header row, or every non-blank row when there
    /// is no header.
    pub fn data_rows(&self) -> &[Row] {
        &self.data
    }

    pub fn width(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }
}
