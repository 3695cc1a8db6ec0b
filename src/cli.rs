use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{lookup::Section, matcher::MatchMode};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Look up boar grading and extraction history from shared spreadsheets",
    long_about = None
)]
pub struct Cli {
    /// YAML configuration file (defaults to the built-in sheet layout)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the performance summary and extraction history for a boar
    Lookup(QueryArgs),
    /// Show only the graded performance summary
    Summary(QueryArgs),
    /// Show only the extraction history
    History(QueryArgs),
    /// Show how a section's columns resolve against its current source
    Inspect(InspectArgs),
    /// Read one boar ID per line from stdin and look each up
    Interactive(InteractiveArgs),
    /// Write the default configuration as YAML
    Config(ConfigArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum MatchModeArg {
    Exact,
    Substring,
}

impl From<MatchModeArg> for MatchMode {
    fn from(value: MatchModeArg) -> Self {
        match value {
            MatchModeArg::Exact => MatchMode::Exact,
            MatchModeArg::Substring => MatchMode::Substring,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum SectionArg {
    Performance,
    History,
}

impl From<SectionArg> for Section {
    fn from(value: SectionArg) -> Self {
        match value {
            SectionArg::Performance => Section::Performance,
            SectionArg::History => Section::History,
        }
    }
}

/// Per-call overrides of the configured selection and matching.
#[derive(Debug, Clone, Args, Default)]
pub struct QueryOptions {
    /// How the ID is compared with the identifier column
    #[arg(long = "match-mode", value_enum)]
    pub match_mode: Option<MatchModeArg>,
    /// Show at most this many history rows (most recent first)
    #[arg(long, conflicts_with = "since_days")]
    pub limit: Option<usize>,
    /// Show history rows from the last N days only
    #[arg(long = "since-days")]
    pub since_days: Option<i64>,
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Boar ID to search for (blank means no query)
    pub query: String,
    #[command(flatten)]
    pub options: QueryOptions,
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Section to inspect
    #[arg(long, value_enum, default_value = "performance")]
    pub section: SectionArg,
}

#[derive(Debug, Args)]
pub struct InteractiveArgs {
    #[command(flatten)]
    pub options: QueryOptions,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Destination file (stdout if omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
