//! Plain-text and JSON rendering of lookup results.

use std::fmt::Write as _;

use anyhow::Result;
use itertools::Itertools;

use crate::{
    lookup::{LoadedSection, LookupReport, SectionOutcome, SectionReport},
    project::SoftCondition,
    resolve::Resolution,
    table::{Align, render_table},
};

pub const AWAITING_INPUT_MESSAGE: &str = "Ready for query. Please enter a valid Boar ID.";
pub const NOT_AVAILABLE: &str = "N/A";

pub fn render_section(report: &SectionReport) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "== {} ==", report.title.to_uppercase());
    match &report.outcome {
        SectionOutcome::AwaitingInput => {
            let _ = writeln!(output, "{AWAITING_INPUT_MESSAGE}");
        }
        SectionOutcome::NoMatch { message } => {
            let _ = writeln!(output, "{message}");
        }
        SectionOutcome::Failed { error } => {
            let _ = writeln!(output, "error: {error}");
        }
        SectionOutcome::Records {
            columns,
            records,
            conditions,
        } => {
            let rows = records
                .iter()
                .map(|record| {
                    record
                        .fields()
                        .iter()
                        .map(|f| f.value.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string()))
                        .collect::<Vec<_>>()
                })
                .collect::<Vec<_>>();
            output.push_str(&render_table(columns, &rows, Align::Center));
            let omitted = conditions
                .iter()
                .filter_map(|c| match c {
                    SoftCondition::FieldOmitted { field } => Some(field.as_str()),
                    SoftCondition::ValueUnparsable { .. } => None,
                })
                .collect::<Vec<_>>();
            if !omitted.is_empty() {
                let _ = writeln!(output, "(not in source: {})", omitted.join(", "));
            }
        }
    }
    output
}

pub fn render_report(report: &LookupReport) -> String {
    [&report.performance, &report.history]
        .into_iter()
        .map(render_section)
        .join("\n")
}

pub fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Header row and column resolution of a loaded section.
pub fn render_inspection(title: &str, loaded: &LoadedSection) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "== {} ==", title.to_uppercase());
    match (loaded.table.header_row(), loaded.table.header()) {
        (Some(idx), Some(header)) => {
            let _ = writeln!(output, "header row {idx}: {}", header.join(" | "));
        }
        _ => {
            let _ = writeln!(output, "no header row; positional columns only");
        }
    }
    let _ = writeln!(
        output,
        "{} data row(s), {} column(s)",
        loaded.table.data_rows().len(),
        loaded.table.width()
    );
    let rows = loaded
        .columns
        .columns()
        .iter()
        .map(|column| {
            let via = match &column.resolution {
                Resolution::Name { header } => format!("name '{header}'"),
                Resolution::Position => "position".to_string(),
            };
            vec![column.field.clone(), column.index.to_string(), via]
        })
        .chain(
            loaded
                .columns
                .omitted()
                .iter()
                .map(|field| vec![field.clone(), "-".to_string(), "omitted".to_string()]),
        )
        .collect::<Vec<_>>();
    let headers = ["Field", "Column", "Resolved by"].map(String::from);
    output.push_str(&render_table(&headers, &rows, Align::Left));
    output
}
