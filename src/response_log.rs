//! Recording of every LM exchange for later inspection.
//!
//! Entries are appended to `data/llm_responses.jsonl` in the workspace as
//! newline-delimited JSON:
//!
//! ```jsonl
//! {"schema_version":1,"ts":1707900000000,"key":"analysis_steps","data":{"prompt":"...","response":{...}}}
//! ```
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current schema version for recorded response entries.
pub const RESPONSE_LOG_SCHEMA_VERSION: u32 = 1;

/// Sink for prompt/response pairs.
///
/// Callers treat failures as non-fatal.
pub trait ResponseRecorder {
    fn record(&mut self, prompt: &str, response: &Value, label: &str) -> Result<()>;
}

/// Recorder that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRecorder;

impl ResponseRecorder for NullRecorder {
    fn record(&mut self, _prompt: &str, _response: &Value, _label: &str) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseData {
    pub prompt: String,
    pub response: Value,
}

/// A single recorded exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEntry {
    pub schema_version: u32,
    /// Unix timestamp in milliseconds.
    pub ts: u64,
    pub key: String,
    pub data: ResponseData,
}

/// Recorder appending entries to a JSONL file.
#[derive(Debug, Clone)]
pub struct JsonlRecorder {
    path: PathBuf,
}

impl JsonlRecorder {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl ResponseRecorder for JsonlRecorder {
    fn record(&mut self, prompt: &str, response: &Value, label: &str) -> Result<()> {
        let entry = ResponseEntry {
            schema_version: RESPONSE_LOG_SCHEMA_VERSION,
            ts: now_epoch_ms(),
            key: label.to_string(),
            data: ResponseData {
                prompt: prompt.to_string(),
                response: response.clone(),
            },
        };
        append_entry(&self.path, &entry)
    }
}

fn append_entry(path: &Path, entry: &ResponseEntry) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("create data directory for response log")?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open response log for append: {}", path.display()))?;

    let line = serde_json::to_string(entry).context("serialize response log entry")?;
    writeln!(file, "{}", line).context("write response log entry")?;
    Ok(())
}

/// Load all recorded entries, skipping corrupt lines.
pub fn load_records(path: &Path) -> Result<Vec<ResponseEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file =
        File::open(path).with_context(|| format!("open response log: {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut entries = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("read line {} of response log", line_num + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ResponseEntry>(&line) {
            Ok(entry) => entries.push(entry),
            Err(err) => {
                tracing::warn!(line = line_num + 1, error = %err, "skip corrupt response log entry");
            }
        }
    }

    Ok(entries)
}

fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}
