//! Locating and parsing the JSON run logs written by the training program
//!
//! The logger names its files
//! `run_logs_{attack_type}_{df_size}_{class1}_{class2}[_cf_{corrective_frac}].json`
//! and stores metrics as `results -> seed -> method -> metric`.
use std::{
    collections::HashMap,
    fmt, fs, io,
    path::{Path, PathBuf},
    time::SystemTime,
};

use globset::{escape, Glob};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::variant::Variant;
use crate::config::{py_float, ExperimentConfig};

/// Metrics of one variant taken from a run log.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantResult {
    pub forget_acc: f64,
    pub utility_acc: f64,
    pub forget_f1: f64,
    pub utility_f1: f64,
    pub time_taken: f64,
    pub variant: Variant,
    pub log_file: PathBuf,
}

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("failed to read class lookup '{path}': {source}")]
    ClassLookupRead { path: PathBuf, source: io::Error },

    #[error("malformed class lookup '{path}': {source}")]
    ClassLookupFormat {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("dataset '{0}' has no entry in the class lookup")]
    UnknownDataset(String),

    #[error("invalid log file pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: globset::Error,
    },

    #[error("no log files found for {variant} with pattern {pattern}")]
    NoLogFiles { variant: Variant, pattern: String },

    #[error("failed to read log file '{path}': {source}")]
    LogRead { path: PathBuf, source: io::Error },

    #[error("error parsing log file '{path}': {source}")]
    LogFormat {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("no results found for variant {variant} in log file '{path}'")]
    VariantMissing { variant: Variant, path: PathBuf },
}

/// Where the external programs keep their inputs and outputs.
#[derive(Debug, Clone)]
pub struct LogLocation {
    pub log_root: PathBuf,
    pub classes_file: PathBuf,
}

impl LogLocation {
    pub fn dataset_dir(&self, dataset: &str) -> PathBuf {
        self.log_root.join(dataset)
    }
}

/// Key fields that determine the log filename of a run.
#[derive(Debug, Clone)]
pub struct LogQuery {
    pub dataset: String,
    pub attack_type: String,
    pub df_size: f64,
    pub corrective_frac: Option<f64>,
}

impl LogQuery {
    pub fn from_config(config: &ExperimentConfig) -> Self {
        LogQuery {
            dataset: config.dataset.clone(),
            attack_type: config.attack_type.clone(),
            df_size: config.df_size,
            corrective_frac: Some(config.corrective_frac),
        }
    }

    /// Filename pattern the logger uses for this run.
    ///
    /// Interpolated values are escaped, so only literal file names match.
    pub fn pattern(&self, classes: &ClassPair) -> String {
        let mut pattern = format!(
            "run_logs_{}_{}_{}_{}",
            escape(&self.attack_type),
            escape(&py_float(self.df_size)),
            escape(&classes.class1.to_string()),
            escape(&classes.class2.to_string())
        );
        if let Some(cf) = self.corrective_frac.filter(|cf| *cf < 1.0) {
            pattern.push_str(&format!("_cf_{}", escape(&py_float(cf))));
        }
        pattern.push_str(".json");
        pattern
    }
}

/// Class label as stored in the lookup; either an index or a name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ClassLabel {
    Index(i64),
    Name(String),
    Float(f64),
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassLabel::Index(i) => write!(f, "{}", i),
            ClassLabel::Name(s) => f.write_str(s),
            ClassLabel::Float(v) => f.write_str(&py_float(*v)),
        }
    }
}

/// The pair of classes poisoned for a dataset.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClassPair {
    pub class1: ClassLabel,
    pub class2: ClassLabel,
}

pub fn load_class_pair(classes_file: &Path, dataset: &str) -> Result<ClassPair, LocateError> {
    let content = fs::read_to_string(classes_file).map_err(|source| LocateError::ClassLookupRead {
        path: classes_file.to_owned(),
        source,
    })?;
    let format_err = |source: serde_json::Error| LocateError::ClassLookupFormat {
        path: classes_file.to_owned(),
        source,
    };

    // only the requested entry has to be well formed
    let mut lookup: HashMap<String, Value> = serde_json::from_str(&content).map_err(format_err)?;
    let entry = lookup
        .remove(dataset)
        .ok_or_else(|| LocateError::UnknownDataset(dataset.to_owned()))?;
    serde_json::from_value(entry).map_err(format_err)
}

/// Files (or symlinks to files) in `dir` whose name matches the glob `pattern`, sorted by name.
///
/// A missing directory simply has no matches.
pub fn find_log_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, LocateError> {
    let matcher = Glob::new(pattern)
        .map_err(|source| LocateError::Pattern {
            pattern: pattern.to_owned(),
            source,
        })?
        .compile_matcher();

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("can't list log directory '{}': {}", dir.display(), e);
            return Ok(vec![]);
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        // follows symlinks, archived runs are often linked in
        .filter(|entry| entry.path().is_file())
        .filter(|entry| matcher.is_match(entry.file_name()))
        .map(|entry| entry.path())
        .collect();
    files.sort();
    Ok(files)
}

/// The most recently modified of `files`.
pub fn most_recent(files: &[PathBuf]) -> Option<&PathBuf> {
    files.iter().max_by_key(|path| {
        fs::metadata(path)
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH)
    })
}

#[derive(Debug, Deserialize)]
struct RunLog {
    #[serde(default)]
    results: Map<String, Value>,
}

fn metric(block: &Map<String, Value>, key: &str) -> f64 {
    block.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

/// Extract the metrics of `variant` from the contents of a run log.
pub fn parse_variant_result(
    content: &str,
    variant: Variant,
    log_file: &Path,
) -> Result<VariantResult, LocateError> {
    let log: RunLog = serde_json::from_str(content).map_err(|source| LocateError::LogFormat {
        path: log_file.to_owned(),
        source,
    })?;

    // first seed that ran this variant
    let block = log
        .results
        .values()
        .filter_map(Value::as_object)
        .find_map(|methods| methods.get(variant.as_str()))
        .and_then(Value::as_object)
        .filter(|block| !block.is_empty())
        .ok_or_else(|| LocateError::VariantMissing {
            variant,
            path: log_file.to_owned(),
        })?;

    Ok(VariantResult {
        forget_acc: metric(block, "forget"),
        utility_acc: metric(block, "utility"),
        forget_f1: metric(block, "forget_f1"),
        utility_f1: metric(block, "utility_f1"),
        time_taken: metric(block, "time_taken"),
        variant,
        log_file: log_file.to_owned(),
    })
}

/// Find the newest run log for `query` and read the metrics of `variant` from it.
pub fn locate_result(
    location: &LogLocation,
    query: &LogQuery,
    variant: Variant,
) -> Result<VariantResult, LocateError> {
    let classes = load_class_pair(&location.classes_file, &query.dataset)?;
    let pattern = query.pattern(&classes);

    let files = find_log_files(&location.dataset_dir(&query.dataset), &pattern)?;
    let log_file = most_recent(&files).ok_or(LocateError::NoLogFiles { variant, pattern })?;
    debug!("reading results of {} from '{}'", variant, log_file.display());

    let content = fs::read_to_string(log_file).map_err(|source| LocateError::LogRead {
        path: log_file.clone(),
        source,
    })?;
    parse_variant_result(&content, variant, log_file)
}

/// Like [`locate_result`], but a failure is only logged.
pub fn parse_results_from_logs(
    location: &LogLocation,
    query: &LogQuery,
    variant: Variant,
) -> Option<VariantResult> {
    locate_result(location, query, variant)
        .map_err(|e| warn!("{}", e))
        .ok()
}
