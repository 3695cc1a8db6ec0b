//! The per-query pipeline: fetch, resolve, match, select, project.
//!
//! Each section of a [`LookupReport`] succeeds or fails on its own. Hard
//! failures ([`LookupError`]) land in [`SectionOutcome::Failed`]; a blank
//! query never touches the source.

use chrono::NaiveDateTime;
use itertools::Itertools;
use log::{debug, info, warn};
use serde::{Serialize, Serializer};

use crate::{
    config::{DEFAULT_DETECT_ROWS, HeaderRow, LookupConfig, Reduction, SectionConfig},
    data::{RawTable, Row},
    error::{LookupError, Result},
    matcher::{self, MatchQuery, select_canonical},
    project::{OutputRecord, SoftCondition, project},
    resolve::{ResolvedColumnMap, detect_header_row, resolve},
    source::{SourceProvider, TabularSource},
    window::{SortOrder, window},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Section {
    Performance,
    History,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum SectionOutcome {
    /// No query was entered.
    AwaitingInput,
    NoMatch {
        message: String,
    },
    Records {
        columns: Vec<String>,
        records: Vec<OutputRecord>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        conditions: Vec<SoftCondition>,
    },
    Failed {
        #[serde(serialize_with = "serialize_error")]
        error: LookupError,
    },
}

fn serialize_error<S: Serializer>(error: &LookupError, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    #[derive(Serialize)]
    struct ErrorView<'a> {
        kind: &'a str,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        headers: Option<&'a [String]>,
    }
    let headers = match error {
        LookupError::ColumnNotFound { headers, .. } => Some(headers.as_slice()),
        LookupError::SourceUnavailable { .. } => None,
    };
    ErrorView {
        kind: error.kind(),
        message: error.to_string(),
        headers,
    }
    .serialize(serializer)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionReport {
    pub section: Section,
    pub title: String,
    pub outcome: SectionOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupReport {
    pub query: String,
    pub performance: SectionReport,
    pub history: SectionReport,
}

/// A section's table after header selection, with its resolved columns.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSection {
    pub table: RawTable,
    pub columns: ResolvedColumnMap,
}

pub struct LookupEngine<P> {
    source: TabularSource<P>,
    config: LookupConfig,
}

impl<P: SourceProvider> LookupEngine<P> {
    pub fn new(source: TabularSource<P>, config: LookupConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &LookupConfig {
        &self.config
    }

    pub fn section_config(&self, section: Section) -> &SectionConfig {
        match section {
            Section::Performance => &self.config.performance,
            Section::History => &self.config.history,
        }
    }

    /// Fetches a section's table, settles its header row and resolves its
    /// columns.
    pub fn load(&self, section: Section) -> Result<LoadedSection> {
        let config = self.section_config(section);
        let raw = self.source.fetch_raw(&config.source)?;
        let header_row = match config.header_row {
            HeaderRow::Detect => detect_header_row(&raw, &config.columns, DEFAULT_DETECT_ROWS),
            fixed => fixed.fixed(),
        };
        let table = raw.with_header_row(header_row);
        let columns = resolve(&table, &config.columns);
        if !columns.omitted().is_empty() {
            debug!(
                "{:?}: unresolved column(s): {}",
                section,
                columns.omitted().iter().join(", ")
            );
        }
        Ok(LoadedSection { table, columns })
    }

    pub fn run(&self, query: &str, now: NaiveDateTime) -> LookupReport {
        LookupReport {
            query: query.trim().to_string(),
            performance: self.run_section(Section::Performance, query, now),
            history: self.run_section(Section::History, query, now),
        }
    }

    pub fn run_section(&self, section: Section, query: &str, now: NaiveDateTime) -> SectionReport {
        let config = self.section_config(section);
        let outcome = self
            .evaluate(section, query, now)
            .unwrap_or_else(|error| {
                warn!("{:?} lookup failed: {error}", section);
                SectionOutcome::Failed { error }
            });
        SectionReport {
            section,
            title: config.title.clone(),
            outcome,
        }
    }

    fn evaluate(&self, section: Section, query: &str, now: NaiveDateTime) -> Result<SectionOutcome> {
        let config = self.section_config(section);
        let query = MatchQuery::new(query, config.match_mode);
        if query.is_blank() {
            return Ok(SectionOutcome::AwaitingInput);
        }
        let LoadedSection { table, columns } = self.load(section)?;
        let matches = matcher::find(&table, &columns, &config.id_field, &query)?;
        info!(
            "{:?}: {} row(s) match '{}'",
            section,
            matches.len(),
            query.text.trim()
        );

        let date_column = config
            .date_field
            .as_deref()
            .and_then(|field| columns.get(field));
        let selected: Vec<Row> = match config.select.reduction() {
            Reduction::Canonical(tie_break) => select_canonical(&matches, date_column, tie_break)
                .into_iter()
                .cloned()
                .collect(),
            Reduction::Window(mode) => window(&matches, date_column, mode, SortOrder::Descending, now),
        };
        if selected.is_empty() {
            return Ok(SectionOutcome::NoMatch {
                message: config.no_match_message(&query.text),
            });
        }

        let projection = config.projection();
        let mut records = Vec::with_capacity(selected.len());
        let mut conditions: Vec<SoftCondition> = Vec::new();
        for row in &selected {
            let projected = project(row, &columns, &projection);
            records.push(projected.record);
            for condition in projected.conditions {
                if !conditions.contains(&condition) {
                    conditions.push(condition);
                }
            }
        }
        Ok(SectionOutcome::Records {
            columns: projection.labels(&columns),
            records,
            conditions,
        })
    }
}
