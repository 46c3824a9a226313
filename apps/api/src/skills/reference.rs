//! Job-title → skills reference tables.
//!
//! Every `*_job_roles_skills.csv` file in the reference directory is read on each
//! `load_dir` call. Nothing is cached, so edits to the tables show up on the next
//! request and a failed read does not outlive the request that hit it.

use std::collections::{BTreeSet, HashSet};
use std::io::Read;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

/// Filename suffix that marks a reference table.
pub const REFERENCE_FILE_SUFFIX: &str = "_job_roles_skills.csv";

const JOB_TITLE_COLUMN: &str = "job_title";
const SKILLS_COLUMN: &str = "skills";

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("Invalid schema in {source_name}. Expected columns: job_title, skills. Found: {found:?}")]
    Schema {
        source_name: String,
        found: Vec<String>,
    },

    #[error("No *_job_roles_skills.csv files found in {0}")]
    NoData(String),

    #[error("Failed to read reference data at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed CSV in {source_name}: {source}")]
    Csv {
        source_name: String,
        #[source]
        source: csv::Error,
    },
}

/// One row of a reference table, normalized to trimmed lowercase.
/// `skills` keeps column order with duplicates removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillReferenceRow {
    pub job_title: String,
    pub skills: Vec<String>,
}

impl SkillReferenceRow {
    pub fn new(job_title: &str, skills: &str) -> Self {
        let mut seen = HashSet::new();
        let skills = split_skills(skills)
            .filter(|s| seen.insert(s.clone()))
            .collect();
        Self {
            job_title: normalize(job_title),
            skills,
        }
    }
}

/// In-memory union of all reference tables, in source then row order.
#[derive(Debug, Clone, Default)]
pub struct ReferenceStore {
    rows: Vec<SkillReferenceRow>,
}

impl ReferenceStore {
    /// Concatenates parsed sources. Zero sources is an error.
    pub fn from_sources(sources: Vec<Vec<SkillReferenceRow>>, origin: &str) -> Result<Self, ReferenceError> {
        if sources.is_empty() {
            return Err(ReferenceError::NoData(origin.to_string()));
        }
        Ok(Self {
            rows: sources.into_iter().flatten().collect(),
        })
    }

    /// Reads every reference table in `dir`, sorted by file name.
    pub fn load_dir(dir: &Path) -> Result<Self, ReferenceError> {
        let io_err = |source| ReferenceError::Io {
            path: dir.display().to_string(),
            source,
        };

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            let is_table = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(REFERENCE_FILE_SUFFIX));
            if is_table && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut sources = Vec::with_capacity(paths.len());
        for path in &paths {
            let bytes = std::fs::read(path).map_err(|source| ReferenceError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            sources.push(parse_table(&name, decode_text(bytes).as_bytes())?);
        }

        debug!(
            "Loaded {} reference tables from {}",
            sources.len(),
            dir.display()
        );
        Self::from_sources(sources, &dir.display().to_string())
    }

    /// Distinct job titles in order of first appearance.
    pub fn job_titles(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .filter(|r| seen.insert(r.job_title.as_str()))
            .map(|r| r.job_title.clone())
            .collect()
    }

    /// Distinct skills across all rows in order of first appearance.
    pub fn all_skills(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .flat_map(|r| r.skills.iter())
            .filter(|s| seen.insert(s.as_str()))
            .cloned()
            .collect()
    }

    /// Union of skills over every row whose title equals `job_title` after normalization.
    pub fn skills_for_job(&self, job_title: &str) -> BTreeSet<String> {
        let wanted = normalize(job_title);
        self.rows
            .iter()
            .filter(|r| r.job_title == wanted)
            .flat_map(|r| r.skills.iter().cloned())
            .collect()
    }

    pub fn skills_for_jobs<S: AsRef<str>>(&self, job_titles: &[S]) -> BTreeSet<String> {
        job_titles
            .iter()
            .flat_map(|t| self.skills_for_job(t.as_ref()))
            .collect()
    }
}

/// Parses one CSV table. Column names are trimmed, lowercased and have spaces
/// replaced by underscores before the schema check.
pub fn parse_table<R: Read>(source_name: &str, reader: R) -> Result<Vec<SkillReferenceRow>, ReferenceError> {
    let csv_err = |source| ReferenceError::Csv {
        source_name: source_name.to_string(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let columns: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(normalize_column)
        .collect();

    let position = |name: &str| columns.iter().position(|c| c == name);
    let (Some(title_idx), Some(skills_idx)) = (position(JOB_TITLE_COLUMN), position(SKILLS_COLUMN)) else {
        return Err(ReferenceError::Schema {
            source_name: source_name.to_string(),
            found: columns,
        });
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let row = SkillReferenceRow::new(
            record.get(title_idx).unwrap_or_default(),
            record.get(skills_idx).unwrap_or_default(),
        );
        if !row.job_title.is_empty() {
            rows.push(row);
        }
    }
    Ok(rows)
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

fn normalize_column(name: &str) -> String {
    name.trim_start_matches('\u{feff}')
        .trim()
        .to_lowercase()
        .replace(' ', "_")
}

fn split_skills(skills: &str) -> impl Iterator<Item = String> + '_ {
    skills.split(',').map(normalize).filter(|s| !s.is_empty())
}

/// UTF-8 first, Latin-1 otherwise.
fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => err.into_bytes().into_iter().map(char::from).collect(),
    }
}
