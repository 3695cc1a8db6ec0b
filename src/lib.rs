pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod io_utils;
pub mod lookup;
pub mod matcher;
pub mod project;
pub mod report;
pub mod resolve;
pub mod source;
pub mod table;
pub mod window;

use std::{
    env,
    io::{self, BufRead, Write},
    sync::OnceLock,
    time::Duration,
};

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands, OutputFormat, QueryOptions},
    config::{LookupConfig, SectionConfig, Selection},
    lookup::{LookupEngine, Section},
    source::{DefaultProvider, TabularSource},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("boar_lookup", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => LookupConfig::load(path)?,
        None => LookupConfig::default(),
    };
    match cli.command {
        Commands::Lookup(args) => handle_query(config, &args.query, &args.options, None),
        Commands::Summary(args) => {
            handle_query(config, &args.query, &args.options, Some(Section::Performance))
        }
        Commands::History(args) => {
            handle_query(config, &args.query, &args.options, Some(Section::History))
        }
        Commands::Inspect(args) => handle_inspect(config, args.section.into()),
        Commands::Interactive(args) => handle_interactive(config, &args.options),
        Commands::Config(args) => handle_config(&args),
    }
}

/// Applies command-line overrides on top of the loaded configuration.
pub fn apply_overrides(mut config: LookupConfig, options: &QueryOptions) -> LookupConfig {
    if let Some(mode) = options.match_mode {
        config.performance.match_mode = mode.into();
        config.history.match_mode = mode.into();
    }
    let history: &mut SectionConfig = &mut config.history;
    if let Some(limit) = options.limit {
        history.select = Selection::Count { limit };
    }
    if let Some(days) = options.since_days {
        history.select = Selection::SinceDays { days };
    }
    config
}

fn build_engine(config: LookupConfig) -> Result<LookupEngine<DefaultProvider>> {
    config.validate()?;
    let encoding = io_utils::resolve_encoding(config.encoding.as_deref())?;
    let provider = DefaultProvider::new(config.url_template.clone())?;
    let source = TabularSource::new(provider)
        .with_encoding(encoding)
        .with_cache(Duration::from_secs(config.cache_ttl_secs));
    Ok(LookupEngine::new(source, config))
}

fn render<T: serde::Serialize>(format: OutputFormat, value: &T, text: impl FnOnce() -> String) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(text()),
        OutputFormat::Json => report::to_json(value),
    }
}

fn handle_query(
    config: LookupConfig,
    query: &str,
    options: &QueryOptions,
    only: Option<Section>,
) -> Result<()> {
    let engine = build_engine(apply_overrides(config, options))?;
    let now = Local::now().naive_local();
    debug!("Looking up '{}' at {now}", query.trim());
    let output = match only {
        Some(section) => {
            let report = engine.run_section(section, query, now);
            render(options.format, &report, || report::render_section(&report))?
        }
        None => {
            let report = engine.run(query, now);
            render(options.format, &report, || report::render_report(&report))?
        }
    };
    print!("{output}");
    if options.format == OutputFormat::Json {
        println!();
    }
    Ok(())
}

fn handle_inspect(config: LookupConfig, section: Section) -> Result<()> {
    let engine = build_engine(config)?;
    let title = engine.section_config(section).title.clone();
    let loaded = engine
        .load(section)
        .with_context(|| format!("Loading {title}"))?;
    print!("{}", report::render_inspection(&title, &loaded));
    Ok(())
}

fn handle_interactive(config: LookupConfig, options: &QueryOptions) -> Result<()> {
    let engine = build_engine(apply_overrides(config, options))?;
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut served = 0usize;
    for line in stdin.lock().lines() {
        let line = line.context("Reading query from stdin")?;
        let query = line.trim();
        if query.eq_ignore_ascii_case("quit") || query.eq_ignore_ascii_case("exit") {
            break;
        }
        let report = engine.run(query, Local::now().naive_local());
        let output = render(options.format, &report, || report::render_report(&report))?;
        writeln!(stdout, "{output}")?;
        stdout.flush()?;
        served += 1;
    }
    info!("Answered {served} quer(ies)");
    Ok(())
}

fn handle_config(args: &cli::ConfigArgs) -> Result<()> {
    let config = LookupConfig::default();
    match &args.output {
        Some(path) => {
            config.save(path)?;
            info!("Default configuration written to {path:?}");
        }
        None => print!("{}", config.to_yaml()?),
    }
    Ok(())
}
