//! Projection of matched rows onto display fields, with value formatting.
//!
//! Numeric fields render as fixed-point text (a missing numeric cell counts
//! as zero); text that does not parse as a number is passed through
//! unchanged. Date fields render as `%Y-%m-%d` and become `None` when they do
//! not parse. Neither case fails the projection: each degradation is reported
//! as a [`SoftCondition`].

use log::debug;
use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};

use crate::{
    data::{Cell, Row},
    resolve::ResolvedColumnMap,
};

pub const DEFAULT_PRECISION: usize = 1;
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldFormat {
    /// Copied as-is. Codes such as grades stay strings.
    #[default]
    Text,
    /// Fixed-point with the projection's precision.
    Decimal,
    /// Rounded to a whole number.
    Integer,
    Date,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayField {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "is_text")]
    pub format: FieldFormat,
}

fn is_text(format: &FieldFormat) -> bool {
    *format == FieldFormat::Text
}

impl DisplayField {
    pub fn new(field: impl Into<String>, format: FieldFormat) -> Self {
        Self {
            field: field.into(),
            label: None,
            format,
        }
    }

    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.field)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub fields: Vec<DisplayField>,
    pub precision: usize,
    pub date_format: String,
}

impl Projection {
    pub fn new(fields: Vec<DisplayField>, precision: usize) -> Self {
        Self {
            fields,
            precision,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }

    /// Display order with the listed fields formatted as decimals.
    pub fn from_order(display_order: &[&str], numeric_fields: &[&str], precision: usize) -> Self {
        let fields = display_order
            .iter()
            .map(|field| {
                let format = if numeric_fields.contains(field) {
                    FieldFormat::Decimal
                } else {
                    FieldFormat::Text
                };
                DisplayField::new(*field, format)
            })
            .collect();
        Self::new(fields, precision)
    }

    /// Labels of the fields that resolved, in display order.
    pub fn labels(&self, columns: &ResolvedColumnMap) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| columns.contains(&f.field))
            .map(|f| f.label().to_string())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputField {
    pub label: String,
    pub value: Option<String>,
}

/// One projected row. Serialises as a map in display order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutputRecord {
    fields: Vec<OutputField>,
}

impl OutputRecord {
    pub fn fields(&self) -> &[OutputField] {
        &self.fields
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.label == label)
            .and_then(|f| f.value.as_deref())
    }

    pub fn labels(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.label.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for OutputRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for field in &self.fields {
            map.serialize_entry(&field.label, &field.value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "condition", rename_all = "kebab-case")]
pub enum SoftCondition {
    FieldOmitted { field: String },
    ValueUnparsable { field: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projected {
    pub record: OutputRecord,
    pub conditions: Vec<SoftCondition>,
}

pub fn project(row: &Row, columns: &ResolvedColumnMap, projection: &Projection) -> Projected {
    let mut record = OutputRecord::default();
    let mut conditions = Vec::new();
    for display in &projection.fields {
        let Some(index) = columns.get(&display.field) else {
            conditions.push(SoftCondition::FieldOmitted {
                field: display.field.clone(),
            });
            continue;
        };
        let cell = row.get(index).unwrap_or(&Cell::Empty);
        let value = match display.format {
            FieldFormat::Text => Some(cell.as_text().into_owned()),
            FieldFormat::Decimal => Some(format_numeric(cell, Some(projection.precision))),
            FieldFormat::Integer => Some(format_numeric(cell, None)),
            FieldFormat::Date => format_date(cell, &projection.date_format),
        };
        let unparsable = match display.format {
            FieldFormat::Decimal | FieldFormat::Integer => {
                !cell.is_empty() && cell.as_number().is_none()
            }
            FieldFormat::Date => !cell.is_empty() && value.is_none(),
            FieldFormat::Text => false,
        };
        if unparsable {
            debug!(
                "Value '{}' in '{}' could not be parsed as {:?}",
                cell, display.field, display.format
            );
            conditions.push(SoftCondition::ValueUnparsable {
                field: display.field.clone(),
                value: cell.as_text().into_owned(),
            });
        }
        record.fields.push(OutputField {
            label: display.label().to_string(),
            value,
        });
    }
    Projected { record, conditions }
}

/// Formats a numeric cell with `precision` decimals, or as a whole number
/// when `precision` is `None`. Empty cells count as zero; unparsable text is
/// returned unchanged.
pub fn format_numeric(cell: &Cell, precision: Option<usize>) -> String {
    let number = if cell.is_empty() {
        0.0
    } else {
        match cell.as_number() {
            Some(n) => n,
            None => return cell.as_text().into_owned(),
        }
    };
    match precision {
        Some(digits) => format!("{number:.digits$}"),
        None => format!("{number:.0}"),
    }
}

pub fn format_date(cell: &Cell, format: &str) -> Option<String> {
    cell.as_date().map(|date| date.format(format).to_string())
}
