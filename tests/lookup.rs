mod common;

use std::{cell::RefCell, time::Duration};

use boar_lookup::{
    config::{HeaderRow, LookupConfig, Selection, SourceLocation},
    error::{LookupError, Result},
    lookup::{LookupEngine, Section, SectionOutcome},
    matcher::MatchMode,
    project::SoftCondition,
    report,
    source::TabularSource,
};
use common::{EXTRACTIONS_CSV, GRADES_CSV, TestWorkspace, fixed_now};

fn offline_provider(location: &SourceLocation) -> Result<Vec<u8>> {
    match location {
        SourceLocation::File { path } => std::fs::read(path)
            .map_err(|err| LookupError::source_unavailable(location.to_string(), err)),
        SourceLocation::Sheet { .. } => Err(LookupError::source_unavailable(
            location.to_string(),
            "offline",
        )),
    }
}

fn sample_engine() -> (
    TestWorkspace,
    LookupEngine<fn(&SourceLocation) -> Result<Vec<u8>>>,
) {
    let workspace = TestWorkspace::new();
    let config = LookupConfig::load(&workspace.with_sample_sources()).expect("load config");
    let provider: fn(&SourceLocation) -> Result<Vec<u8>> = offline_provider;
    (workspace, LookupEngine::new(TabularSource::new(provider), config))
}

fn records(outcome: &SectionOutcome) -> &[boar_lookup::project::OutputRecord] {
    match outcome {
        SectionOutcome::Records { records, .. } => records,
        other => panic!("expected records, got {other:?}"),
    }
}

#[test]
fn detected_header_feeds_summary_projection() {
    let (_workspace, engine) = sample_engine();
    let report = engine.run_section(Section::Performance, "1401", fixed_now());
    let SectionOutcome::Records { columns, records, .. } = &report.outcome else {
        panic!("expected records, got {:?}", report.outcome);
    };
    assert_eq!(columns, &["Grade", "Breed", "Tag ID", "Index Score", "CR %"]);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get("Index Score"), Some("87.5"));
    assert_eq!(records[0].get("CR %"), Some("85.0"));
}

#[test]
fn missing_numeric_cells_render_as_zero() {
    let (_workspace, engine) = sample_engine();
    let report = engine.run_section(Section::Performance, "d1402", fixed_now());
    let record = &records(&report.outcome)[0];
    assert_eq!(record.get("Tag ID"), Some("D1402"));
    assert_eq!(record.get("Index Score"), Some("71.0"));
    assert_eq!(record.get("CR %"), Some("0.0"));
}

#[test]
fn unparsable_numeric_cells_pass_through_with_condition() {
    let (_workspace, engine) = sample_engine();
    let report = engine.run_section(Section::Performance, "2207", fixed_now());
    let SectionOutcome::Records { records, conditions, .. } = &report.outcome else {
        panic!("expected records, got {:?}", report.outcome);
    };
    assert_eq!(records[0].get("Index Score"), Some("pending"));
    assert_eq!(
        conditions,
        &[SoftCondition::ValueUnparsable {
            field: "Index Score".to_string(),
            value: "pending".to_string(),
        }]
    );
}

#[test]
fn history_is_most_recent_first_with_undated_rows_last() {
    let (_workspace, engine) = sample_engine();
    let report = engine.run_section(Section::History, "1401", fixed_now());
    let records = records(&report.outcome);
    let dates = records.iter().map(|r| r.get("Date")).collect::<Vec<_>>();
    assert_eq!(
        dates,
        vec![Some("2024-03-20"), Some("2024-02-14"), Some("2024-01-05"), None]
    );
    assert_eq!(records[0].get("Vol(ml)"), Some("250.0"));
    assert_eq!(records[0].get("Conc"), Some("310.5"));
    assert_eq!(records[3].get("Note"), Some("date missing"));
}

#[test]
fn since_days_window_drops_old_and_undated_rows() {
    let workspace = TestWorkspace::new();
    let mut config = LookupConfig::load(&workspace.with_sample_sources()).unwrap();
    config.history.select = Selection::SinceDays { days: 30 };
    let engine = LookupEngine::new(
        TabularSource::new(offline_provider),
        config,
    );
    let report = engine.run_section(Section::History, "1401", fixed_now());
    let records = records(&report.outcome);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get("Date"), Some("2024-03-20"));
}

#[test]
fn since_days_past_calendar_range_keeps_every_dated_row() {
    let (_workspace, engine) = sample_engine();
    let mut config = engine.config().clone();
    config.history.select = Selection::SinceDays { days: 200_000_000 };
    config.validate().expect("valid config");
    let engine = LookupEngine::new(TabularSource::new(offline_provider), config);
    let report = engine.run_section(Section::History, "1401", fixed_now());
    let dates = records(&report.outcome)
        .iter()
        .map(|r| r.get("Date"))
        .collect::<Vec<_>>();
    assert_eq!(
        dates,
        vec![Some("2024-03-20"), Some("2024-02-14"), Some("2024-01-05")]
    );
}

#[test]
fn header_row_index_counts_comma_only_rows() {
    let provider = |_: &SourceLocation| -> Result<Vec<u8>> {
        Ok(b",,,\nGrade,Breed,Tag ID,Index Score\nA,Duroc,1401,87.5\n,,,\n".to_vec())
    };
    let mut config = LookupConfig::default();
    config.performance.header_row = HeaderRow::Index(1);
    let engine = LookupEngine::new(TabularSource::new(provider), config);
    let report = engine.run_section(Section::Performance, "1401", fixed_now());
    let records = records(&report.outcome);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get("Tag ID"), Some("1401"));
    assert_eq!(records[0].get("Index Score"), Some("87.5"));
}

#[test]
fn no_match_uses_section_message() {
    let (_workspace, engine) = sample_engine();
    let report = engine.run("9999", fixed_now());
    assert_eq!(
        report.performance.outcome,
        SectionOutcome::NoMatch {
            message: "No match found for ID: 9999".to_string()
        }
    );
    assert_eq!(
        report.history.outcome,
        SectionOutcome::NoMatch {
            message: "No extraction history found.".to_string()
        }
    );
}

#[test]
fn exact_mode_rejects_partial_ids() {
    let workspace = TestWorkspace::new();
    let mut config = LookupConfig::load(&workspace.with_sample_sources()).unwrap();
    config.performance.match_mode = MatchMode::Exact;
    let engine = LookupEngine::new(
        TabularSource::new(offline_provider),
        config,
    );
    let report = engine.run_section(Section::Performance, "140", fixed_now());
    assert!(matches!(report.outcome, SectionOutcome::NoMatch { .. }));
}

#[test]
fn unresolvable_id_column_reports_found_headers() {
    let workspace = TestWorkspace::new();
    let mut config = LookupConfig::load(&workspace.with_sample_sources()).unwrap();
    config.performance.header_row = HeaderRow::Index(0);
    config.performance.columns[0].keywords = vec!["ear notch".to_string()];
    let engine = LookupEngine::new(
        TabularSource::new(offline_provider),
        config,
    );
    let report = engine.run_section(Section::Performance, "1401", fixed_now());
    let SectionOutcome::Failed {
        error: LookupError::ColumnNotFound { field, headers },
    } = &report.outcome
    else {
        panic!("expected ColumnNotFound, got {:?}", report.outcome);
    };
    assert_eq!(field, "Tag ID");
    assert_eq!(headers[0], "Boar grading report");
}

#[test]
fn unavailable_source_does_not_block_other_section() {
    let (_workspace, engine) = sample_engine();
    let mut config = engine.config().clone();
    config.history.source = SourceLocation::Sheet {
        sheet_id: "private".to_string(),
        gid: "7".to_string(),
    };
    let engine = LookupEngine::new(TabularSource::new(offline_provider), config);
    let report = engine.run("1401", fixed_now());
    assert_eq!(records(&report.performance.outcome).len(), 1);
    assert_eq!(
        report.history.outcome,
        SectionOutcome::Failed {
            error: LookupError::SourceUnavailable {
                location: "sheet private (gid 7)".to_string(),
                reason: "offline".to_string(),
            }
        }
    );
    let rendered = report::render_report(&report);
    assert!(rendered.contains("error: source 'sheet private (gid 7)' unavailable: offline"));
}

#[test]
fn cached_engine_fetches_each_source_once() {
    let fetched = RefCell::new(Vec::new());
    let provider = |location: &SourceLocation| -> Result<Vec<u8>> {
        fetched.borrow_mut().push(location.subset_id());
        match location.subset_id().as_str() {
            "grades" => Ok(GRADES_CSV.as_bytes().to_vec()),
            _ => Ok(EXTRACTIONS_CSV.as_bytes().to_vec()),
        }
    };
    let mut config = LookupConfig::default();
    config.performance.source = SourceLocation::Sheet {
        sheet_id: "s".to_string(),
        gid: "grades".to_string(),
    };
    config.performance.header_row = HeaderRow::Detect;
    config.history.source = SourceLocation::Sheet {
        sheet_id: "s".to_string(),
        gid: "extractions".to_string(),
    };
    let engine = LookupEngine::new(
        TabularSource::new(provider).with_cache(Duration::from_secs(300)),
        config,
    );
    engine.run("1401", fixed_now());
    engine.run("D1402", fixed_now());
    assert_eq!(*fetched.borrow(), vec!["grades", "extractions"]);
}

#[test]
fn json_report_carries_statuses() {
    let (_workspace, engine) = sample_engine();
    let report = engine.run("1401", fixed_now());
    let json: serde_json::Value =
        serde_json::from_str(&report::to_json(&report).unwrap()).unwrap();
    assert_eq!(json["query"], "1401");
    assert_eq!(json["performance"]["outcome"]["status"], "records");
    assert_eq!(json["history"]["outcome"]["records"][0]["Date"], "2024-03-20");
    assert!(json["history"]["outcome"]["records"][3]["Date"].is_null());
}
