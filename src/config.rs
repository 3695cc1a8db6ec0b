//! Lookup configuration: where each section's table lives and how its
//! columns resolve, match, select and display.
//!
//! Configuration is a YAML document (`boar-lookup config` writes the
//! built-in default). It is handed to the engine explicitly; nothing in the
//! core reads process-wide settings.

use std::{fmt, fs, path::Path, path::PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Duration;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    matcher::{MatchMode, TieBreak},
    project::{DEFAULT_PRECISION, DisplayField, FieldFormat, Projection},
    resolve::ColumnSpec,
    window::WindowMode,
};

pub const DEFAULT_URL_TEMPLATE: &str =
    "https://docs.google.com/spreadsheets/d/{sheet_id}/export?format=csv&gid={gid}";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 600;
pub const DEFAULT_DETECT_ROWS: usize = 10;

const GRADE_SHEET_ID: &str = "1vK71OXZum2NrDkAPktOVz01-sXoETcdxdrBgC4jtc-c";
const GRADE_GID: &str = "0";
const EXTRACTION_SHEET_ID: &str = "1qvo4INF0LZjA2u49grKW_cHeEPJO48_dk6gOlXoMgaM";
const EXTRACTION_GID: &str = "1428367761";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SourceLocation {
    /// A spreadsheet tab exported as CSV over HTTP.
    Sheet { sheet_id: String, gid: String },
    /// A local CSV file.
    File { path: PathBuf },
}

impl SourceLocation {
    pub fn source_id(&self) -> String {
        match self {
            SourceLocation::Sheet { sheet_id, .. } => sheet_id.clone(),
            SourceLocation::File { path } => path.display().to_string(),
        }
    }

    pub fn subset_id(&self) -> String {
        match self {
            SourceLocation::Sheet { gid, .. } => gid.clone(),
            SourceLocation::File { .. } => String::new(),
        }
    }

    pub fn cache_key(&self) -> (String, String) {
        (self.source_id(), self.subset_id())
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocation::Sheet { sheet_id, gid } => write!(f, "sheet {sheet_id} (gid {gid})"),
            SourceLocation::File { path } => write!(f, "{}", path.display()),
        }
    }
}

/// Which row of the source holds column names.
///
/// In YAML: `none`, a zero-based row index, or `detect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderRow {
    /// Every row is data; columns resolve by position only.
    None,
    Index(usize),
    /// The row within the first few that best matches the column keywords.
    Detect,
}

impl Default for HeaderRow {
    fn default() -> Self {
        HeaderRow::Index(0)
    }
}

impl HeaderRow {
    /// The fixed index, when not detected.
    pub fn fixed(self) -> Option<usize> {
        match self {
            HeaderRow::None | HeaderRow::Detect => None,
            HeaderRow::Index(idx) => Some(idx),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum HeaderRowRepr {
    Index(usize),
    Keyword(String),
}

impl Serialize for HeaderRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let repr = match self {
            HeaderRow::None => HeaderRowRepr::Keyword("none".to_string()),
            HeaderRow::Index(idx) => HeaderRowRepr::Index(*idx),
            HeaderRow::Detect => HeaderRowRepr::Keyword("detect".to_string()),
        };
        repr.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for HeaderRow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match HeaderRowRepr::deserialize(deserializer)? {
            HeaderRowRepr::Index(idx) => Ok(HeaderRow::Index(idx)),
            HeaderRowRepr::Keyword(word) => match word.trim().to_ascii_lowercase().as_str() {
                "none" => Ok(HeaderRow::None),
                "detect" => Ok(HeaderRow::Detect),
                other => Err(serde::de::Error::custom(format!(
                    "invalid header_row '{other}' (expected none, detect or a row index)"
                ))),
            },
        }
    }
}

/// How a section reduces its matches: one canonical record or a history
/// window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum Selection {
    Canonical {
        #[serde(default)]
        tie_break: TieBreak,
    },
    Count {
        limit: usize,
    },
    SinceDays {
        days: i64,
    },
}

/// What the engine does with a section's matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Canonical(TieBreak),
    Window(WindowMode),
}

impl Selection {
    pub fn reduction(self) -> Reduction {
        match self {
            Selection::Canonical { tie_break } => Reduction::Canonical(tie_break),
            Selection::Count { limit } => Reduction::Window(WindowMode::Count(limit)),
            Selection::SinceDays { days } => Reduction::Window(WindowMode::Since(
                Duration::try_days(days).unwrap_or(Duration::MAX),
            )),
        }
    }
}

fn default_precision() -> usize {
    DEFAULT_PRECISION
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionConfig {
    pub title: String,
    pub source: SourceLocation,
    #[serde(default)]
    pub header_row: HeaderRow,
    pub id_field: String,
    #[serde(default)]
    pub match_mode: MatchMode,
    pub columns: Vec<ColumnSpec>,
    pub display: Vec<DisplayField>,
    #[serde(default = "default_precision")]
    pub precision: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_field: Option<String>,
    /// Shown when nothing matches; `{query}` is replaced by the query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_message: Option<String>,
    pub select: Selection,
}

impl SectionConfig {
    pub fn projection(&self) -> Projection {
        Projection::new(self.display.clone(), self.precision)
    }

    pub fn no_match_message(&self, query: &str) -> String {
        self.empty_message
            .as_deref()
            .unwrap_or("No match found for ID: {query}")
            .replace("{query}", query.trim())
    }

    fn validate(&self, name: &str) -> Result<()> {
        let known = |field: &str| self.columns.iter().any(|c| c.field == field);
        if !known(&self.id_field) {
            bail!(
                "{name}: id_field '{}' has no entry in columns",
                self.id_field
            );
        }
        if let Some(date_field) = &self.date_field {
            if !known(date_field) {
                bail!("{name}: date_field '{date_field}' has no entry in columns");
            }
        }
        if let Some(spec) = self
            .columns
            .iter()
            .find(|c| c.keywords.iter().all(|k| k.trim().is_empty()) && c.position.is_none())
        {
            bail!(
                "{name}: column '{}' needs keywords or a position",
                spec.field
            );
        }
        if let Selection::SinceDays { days } = self.select {
            if days < 0 {
                bail!("{name}: days must not be negative");
            }
        }
        Ok(())
    }
}

fn default_cache_ttl() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

fn default_url_template() -> String {
    DEFAULT_URL_TEMPLATE.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupConfig {
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_url_template")]
    pub url_template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    pub performance: SectionConfig,
    pub history: SectionConfig,
}

impl LookupConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            fs::read_to_string(path).with_context(|| format!("Reading config file {path:?}"))?;
        let config = Self::from_yaml(&raw).with_context(|| format!("Parsing config {path:?}"))?;
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        let config: LookupConfig = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_yaml()?).with_context(|| format!("Writing config file {path:?}"))
    }

    pub fn validate(&self) -> Result<()> {
        self.performance.validate("performance")?;
        self.history.validate("history")
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            encoding: None,
            performance: grading_section(),
            history: extraction_section(),
        }
    }
}

fn grading_section() -> SectionConfig {
    let columns = vec![
        ColumnSpec::new("Tag ID", ["tag", "id"]),
        ColumnSpec::new("Grade", ["grade"]),
        ColumnSpec::new("Breed", ["breed"]),
        ColumnSpec::new("Index Score", ["index score", "index"]),
        ColumnSpec::new("Strategy", ["strategy"]),
        ColumnSpec::new("Avg TSO", ["avg tso", "tso"]),
        ColumnSpec::new("Mated", ["mated"]),
        ColumnSpec::new("CR %", ["cr %", "cr%"]),
    ];
    let display = vec![
        DisplayField::new("Grade", FieldFormat::Text),
        DisplayField::new("Breed", FieldFormat::Text),
        DisplayField::new("Tag ID", FieldFormat::Text),
        DisplayField::new("Index Score", FieldFormat::Decimal),
        DisplayField::new("Strategy", FieldFormat::Text),
        DisplayField::new("Avg TSO", FieldFormat::Decimal),
        DisplayField::new("Mated", FieldFormat::Decimal),
        DisplayField::new("CR %", FieldFormat::Decimal),
    ];
    SectionConfig {
        title: "I. Genetic performance & strategy".to_string(),
        source: SourceLocation::Sheet {
            sheet_id: GRADE_SHEET_ID.to_string(),
            gid: GRADE_GID.to_string(),
        },
        header_row: HeaderRow::Index(1),
        id_field: "Tag ID".to_string(),
        match_mode: MatchMode::Substring,
        columns,
        display,
        precision: DEFAULT_PRECISION,
        date_field: None,
        empty_message: None,
        select: Selection::Canonical {
            tie_break: TieBreak::LatestDate,
        },
    }
}

fn extraction_section() -> SectionConfig {
    const LAYOUT: &[(&str, FieldFormat)] = &[
        ("Date", FieldFormat::Date),
        ("Breed", FieldFormat::Text),
        ("ID", FieldFormat::Text),
        ("Vol(ml)", FieldFormat::Decimal),
        ("Odor", FieldFormat::Text),
        ("Color", FieldFormat::Text),
        ("Vit", FieldFormat::Decimal),
        ("Conc", FieldFormat::Decimal),
        ("Imp%", FieldFormat::Decimal),
        ("Diluted", FieldFormat::Decimal),
        ("Note", FieldFormat::Text),
    ];
    SectionConfig {
        title: "II. Recent 20 extraction logs".to_string(),
        source: SourceLocation::Sheet {
            sheet_id: EXTRACTION_SHEET_ID.to_string(),
            gid: EXTRACTION_GID.to_string(),
        },
        header_row: HeaderRow::Index(0),
        id_field: "ID".to_string(),
        match_mode: MatchMode::Substring,
        columns: LAYOUT
            .iter()
            .enumerate()
            .map(|(idx, (field, _))| ColumnSpec::positional(*field, idx))
            .collect(),
        display: LAYOUT
            .iter()
            .map(|(field, format)| DisplayField::new(*field, *format))
            .collect(),
        precision: DEFAULT_PRECISION,
        date_field: Some("Date".to_string()),
        empty_message: Some("No extraction history found.".to_string()),
        select: Selection::Count { limit: 20 },
    }
}
