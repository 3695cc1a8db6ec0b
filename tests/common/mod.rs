#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use boar_lookup::data::RawTable;
use chrono::{NaiveDate, NaiveDateTime};
use tempfile::{TempDir, tempdir};

pub const GRADES_CSV: &str = "\
Boar grading report,,,,,,,
Grade,Breed,Tag ID,Index Score,Strategy,Avg TSO,Mated,CR %
A,Duroc,1401,87.5,Terminal,12.34,40,85%
B,Landrace,D1402,71,Maternal,,12,
C,Yorkshire,2207,pending,Cull,9.8,3,40.0
";

pub const EXTRACTIONS_CSV: &str = "\
Date,Breed,ID,Volume,Odor,Color,Motility,Concentration,Abnormal,Doses,Note
2024-03-20,Duroc,1401,250,Normal,White,85,310.456,5%,12,
2024-01-05,Duroc,1401,230,Normal,White,80,290,6%,11,cold day
N/A,Duroc,1401,200,Normal,White,70,250,8%,9,date missing
2024-03-28,Landrace,D1402,180,Normal,Cream,75,280,4%,10,
2024-02-14,Duroc,1401,240,Strong,White,82,300,5%,12,
";

/// Fixed clock for window tests.
pub fn fixed_now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 31)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

pub fn table(rows: &[&[&str]]) -> RawTable {
    RawTable::from_text_rows(rows.iter().map(|row| row.iter().copied()))
}

/// YAML config pointing both sections at local CSV files.
pub fn file_config(grades: &Path, extractions: &Path) -> String {
    format!(
        r#"cache_ttl_secs: 0
performance:
  title: Genetic performance
  source: {{ kind: file, path: "{grades}" }}
  header_row: detect
  id_field: Tag ID
  match_mode: substring
  columns:
    - {{ field: Tag ID, keywords: [tag, id] }}
    - {{ field: Grade, keywords: [grade] }}
    - {{ field: Breed, keywords: [breed] }}
    - {{ field: Index Score, keywords: [index score] }}
    - {{ field: CR %, keywords: ["cr %"] }}
  display:
    - {{ field: Grade }}
    - {{ field: Breed }}
    - {{ field: Tag ID }}
    - {{ field: Index Score, format: decimal }}
    - {{ field: CR %, format: decimal }}
  select: {{ mode: canonical, tie_break: first-row }}
history:
  title: Extraction logs
  source: {{ kind: file, path: "{extractions}" }}
  header_row: 0
  id_field: ID
  columns:
    - {{ field: Date, position: 0 }}
    - {{ field: ID, position: 2 }}
    - {{ field: Vol(ml), position: 3 }}
    - {{ field: Conc, position: 7 }}
    - {{ field: Note, position: 10 }}
  display:
    - {{ field: Date, format: date }}
    - {{ field: ID }}
    - {{ field: Vol(ml), format: decimal }}
    - {{ field: Conc, format: decimal }}
    - {{ field: Note }}
  date_field: Date
  empty_message: No extraction history found.
  select: {{ mode: count, limit: 20 }}
"#,
        grades = grades.display(),
        extractions = extractions.display(),
    )
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Writes the sample sheets plus a config referencing them; returns the
    /// config path.
    pub fn with_sample_sources(&self) -> PathBuf {
        let grades = self.write("grades.csv", GRADES_CSV);
        let extractions = self.write("extractions.csv", EXTRACTIONS_CSV);
        self.write("lookup.yaml", &file_config(&grades, &extractions))
    }
}
