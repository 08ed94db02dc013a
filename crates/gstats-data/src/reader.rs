//! Dump discovery, sanitization and relaxed JSON parsing.
//!
//! Gerrit's REST dumps are not strict JSON: they start with an XSSI guard
//! line, may carry trailing commas, and sometimes embed raw control bytes
//! inside strings. This module turns such a payload into an ordered list of
//! generic change records ([`serde_json::Value`]).

use std::path::{Path, PathBuf};

use gstats_core::error::{Result, StatsError};
use serde_json::Value;
use tracing::{debug, warn};

/// Prefix Gerrit puts in front of every JSON response.
pub const XSSI_GUARD: &str = ")]}'";

/// Characters removed when the guard is present but no newline follows it.
const XSSI_FALLBACK_LEN: usize = 5;

/// Escape letters that are copied through untouched by [`sanitize`].
const KNOWN_ESCAPES: &[char] = &['n', '\'', '"', '&', 'r', 't', 'b', 'f'];

// ── Public API ────────────────────────────────────────────────────────────────

/// Find all `.json` dump files recursively under `dir`, sorted by path.
pub fn find_json_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        warn!("Dump directory does not exist: {}", dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext == "json")
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Read one dump file into memory.
pub fn read_payload(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| StatsError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

/// Clean `raw` and parse it into the ordered list of change records.
///
/// Fails with [`StatsError::EmptyInput`] when `raw` is `None` or empty and
/// with [`StatsError::Parse`] when the cleaned text is not relaxed JSON. A
/// single top-level object is accepted as a one-record batch.
pub fn parse_changes(raw: Option<&str>) -> Result<Vec<Value>> {
    let raw = match raw {
        Some(s) if !s.is_empty() => s,
        _ => return Err(StatsError::EmptyInput),
    };

    let cleaned = sanitize(strip_xssi_guard(raw));
    let value: Value = json5::from_str(&cleaned)?;

    let records = match value {
        Value::Array(items) => items,
        obj @ Value::Object(_) => vec![obj],
        other => {
            return Err(StatsError::InvalidPayload(format!(
                "expected an array of change records, found {}",
                json_kind(&other)
            )))
        }
    };

    debug!("Parsed {} change records", records.len());
    Ok(records)
}

/// Drop the XSSI guard line when present.
///
/// Everything up to and including the first newline goes; without a newline
/// a fixed number of characters is removed.
pub fn strip_xssi_guard(raw: &str) -> &str {
    if !raw.starts_with(XSSI_GUARD) {
        return raw;
    }
    match raw.find('\n') {
        Some(idx) => &raw[idx + 1..],
        None => raw
            .char_indices()
            .nth(XSSI_FALLBACK_LEN)
            .map_or("", |(idx, _)| &raw[idx..]),
    }
}

/// Remove characters U+0000..=U+0019 while copying known two-character
/// escape tokens (`\n`, `\'`, `\"`, `\&`, `\r`, `\t`, `\b`, `\f`) verbatim.
pub fn sanitize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if KNOWN_ESCAPES.contains(&next) {
                    out.push(c);
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        if is_stripped(c) {
            continue;
        }
        out.push(c);
    }

    out
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn is_stripped(c: char) -> bool {
    ('\u{0000}'..='\u{0019}').contains(&c)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
