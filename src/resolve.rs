//! Column resolution: logical field names to physical column indices.
//!
//! Each [`ColumnSpec`] is tried against the table in a fixed order:
//!
//! 1. **Name match**: header cells are scanned left to right and the first
//!    cell whose lowercase text contains one of its keywords (or is
//!    itself contained in a keyword, for truncated or merged headers) wins.
//! 2. **Positional fallback**: the fixed column index, when the table
//!    is wide enough to have it.
//! 3. **Omit**: the field is left out of the [`ResolvedColumnMap`].
//!
//! Resolution never fails; consumers decide whether a partial map is usable.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::data::RawTable;

/// Header text shorter than this is never treated as a truncated keyword.
const MIN_REVERSE_MATCH_LEN: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub field: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

impl ColumnSpec {
    pub fn new<I, S>(field: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field: field.into(),
            keywords: keywords.into_iter().map(Into::into).collect(),
            position: None,
        }
    }

    /// A column resolved purely by physical position.
    pub fn positional(field: impl Into<String>, position: usize) -> Self {
        Self {
            field: field.into(),
            keywords: Vec::new(),
            position: Some(position),
        }
    }

    pub fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    fn normalized_keywords(&self) -> impl Iterator<Item = String> + '_ {
        self.keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
    }

    /// Whether a header cell satisfies these keywords.
    pub fn matches_header(&self, header: &str) -> bool {
        let header = header.trim().to_lowercase();
        if header.is_empty() {
            return false;
        }
        self.normalized_keywords().any(|keyword| {
            header.contains(&keyword)
                || (header.chars().count() >= MIN_REVERSE_MATCH_LEN && keyword.contains(&header))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "via", rename_all = "kebab-case")]
pub enum Resolution {
    Name { header: String },
    Position,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedColumn {
    pub field: String,
    pub index: usize,
    #[serde(flatten)]
    pub resolution: Resolution,
}

/// Logical field to physical index, in declaration order. Fields that could not be
/// resolved are recorded in [`ResolvedColumnMap::omitted`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ResolvedColumnMap {
    columns: Vec<ResolvedColumn>,
    omitted: Vec<String>,
}

impl ResolvedColumnMap {
    pub fn get(&self, field: &str) -> Option<usize> {
        self.columns
            .iter()
            .find(|c| c.field == field)
            .map(|c| c.index)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn columns(&self) -> &[ResolvedColumn] {
        &self.columns
    }

    pub fn omitted(&self) -> &[String] {
        &self.omitted
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

pub fn resolve(table: &RawTable, specs: &[ColumnSpec]) -> ResolvedColumnMap {
    let mut map = ResolvedColumnMap::default();
    for spec in specs {
        if map.contains(&spec.field) || map.omitted.contains(&spec.field) {
            debug!("Ignoring duplicate column spec for '{}'", spec.field);
            continue;
        }
        match resolve_one(table, spec) {
            Some(column) => {
                debug!(
                    "Resolved '{}' to column {} ({:?})",
                    column.field, column.index, column.resolution
                );
                map.columns.push(column);
            }
            None => {
                debug!("Column '{}' could not be resolved; omitting", spec.field);
                map.omitted.push(spec.field.clone());
            }
        }
    }
    map
}

fn resolve_one(table: &RawTable, spec: &ColumnSpec) -> Option<ResolvedColumn> {
    if let Some(header) = table.header() {
        if let Some((index, name)) = header
            .iter()
            .enumerate()
            .find(|(_, name)| spec.matches_header(name))
        {
            return Some(ResolvedColumn {
                field: spec.field.clone(),
                index,
                resolution: Resolution::Name {
                    header: name.clone(),
                },
            });
        }
    }
    spec.position
        .filter(|&position| position < table.width())
        .map(|index| ResolvedColumn {
            field: spec.field.clone(),
            index,
            resolution: Resolution::Position,
        })
}

/// Picks the header row among the first `scan_rows` rows: the row whose cells
/// satisfy the most keyword-bearing specs, earliest row on ties. Returns
/// `None` when no row satisfies any spec.
pub fn detect_header_row(table: &RawTable, specs: &[ColumnSpec], scan_rows: usize) -> Option<usize> {
    let named = specs
        .iter()
        .filter(|spec| spec.normalized_keywords().next().is_some())
        .collect::<Vec<_>>();
    let mut best: Option<(usize, usize)> = None;
    for (row_idx, row) in table.all_rows().iter().take(scan_rows).enumerate() {
        let cells = row
            .iter()
            .map(|cell| crate::data::normalize_header(&cell.as_text()))
            .collect::<Vec<_>>();
        let score = named
            .iter()
            .filter(|spec| cells.iter().any(|cell| spec.matches_header(cell)))
            .count();
        if score > 0 && best.is_none_or(|(_, top)| score > top) {
            best = Some((row_idx, score));
        }
    }
    if let Some((row_idx, score)) = best {
        debug!("Detected header row {row_idx} ({score} field(s) matched)");
    }
    best.map(|(row_idx, _)| row_idx)
}
