//! Maps raw Gerrit `ChangeInfo` records into [`Changeset`]s and [`Event`]s
//! and feeds them into a [`ChangesStore`].

use std::ops::AddAssign;
use std::path::Path;

use gstats_core::error::Result;
use gstats_core::models::{ChangeStatus, Changeset, Event};
use gstats_core::settings::ExtractorConfig;
use gstats_core::time_utils::TimestampParser;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::reader::{find_json_files, parse_changes, read_payload};
use crate::store::ChangesStore;

/// Label names for the code-review vote.
pub const REVIEW_LABELS: &[&str] = &["Code-Review"];
/// Label names for the verification vote; deployments use either name.
pub const VERIFY_LABELS: &[&str] = &["Verified", "Presubmit-Verified"];
/// Label names for the priority vote.
pub const PRIORITY_LABELS: &[&str] = &["Priority"];

/// Boolean-flag sub-nodes Gerrit sets instead of a numeric `value`.
const LABEL_FLAGS: &[(&str, &str)] = &[
    ("approved", "2"),
    ("recommended", "1"),
    ("disliked", "-1"),
    ("rejected", "-2"),
];

// ── Field resolution ──────────────────────────────────────────────────────────

/// Username of a Gerrit account node.
///
/// Prefers `username`, then the local part of `email`, else `""`.
pub fn resolve_username(node: Option<&Value>) -> String {
    let Some(node) = node else {
        return String::new();
    };
    if let Some(username) = node.get("username").and_then(|v| v.as_str()) {
        return username.to_string();
    }
    if let Some(email) = node.get("email").and_then(|v| v.as_str()) {
        return email.split('@').next().unwrap_or_default().to_string();
    }
    String::new()
}

/// Score of the first label in `candidates` that the change carries.
///
/// An explicit numeric `value` wins; otherwise the `approved` /
/// `recommended` / `disliked` / `rejected` flags map to 2 / 1 / -1 / -2.
/// Only the first present candidate is inspected. Returns `""` when no
/// candidate is present or the label node has neither shape.
pub fn resolve_label_score(raw: &Value, candidates: &[&str]) -> String {
    let Some(labels) = raw.get("labels") else {
        return String::new();
    };
    let Some(node) = candidates.iter().find_map(|name| labels.get(*name)) else {
        return String::new();
    };

    if let Some(value) = node.get("value").and_then(score_to_string) {
        return value;
    }

    LABEL_FLAGS
        .iter()
        .find(|(flag, _)| node.get(*flag).is_some())
        .map(|(_, score)| score.to_string())
        .unwrap_or_default()
}

fn score_to_string(value: &Value) -> Option<String> {
    if let Some(n) = value.as_i64() {
        return Some(n.to_string());
    }
    let f = value.as_f64()?;
    if f.fract() == 0.0 {
        Some(format!("{}", f as i64))
    } else {
        Some(f.to_string())
    }
}

fn pick_str(raw: &Value, key: &str) -> Option<String> {
    raw.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

fn pick_bool(raw: &Value, key: &str) -> Option<bool> {
    raw.get(key).and_then(|v| v.as_bool())
}

// ── PatchSetParser ────────────────────────────────────────────────────────────

/// Mines the patch set number and Code-Review vote out of message text.
#[derive(Debug, Clone)]
pub struct PatchSetParser {
    vote: Regex,
    comment: Regex,
}

impl Default for PatchSetParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PatchSetParser {
    pub fn new() -> Self {
        Self {
            vote: Regex::new(r"^Patch Set (\d+): Code-Review([+-]?\d)").expect("regex is valid"),
            comment: Regex::new(r"^Patch Set (\d+):").expect("regex is valid"),
        }
    }

    /// Returns `(ps_number, review_score)`, either of which may be `""`.
    ///
    /// * `Patch Set 2: Code-Review+1 ...` → `("2", "1")`
    /// * `Patch Set 2:\n\n(4 comments)`   → `("2", "")`
    /// * `Uploaded patch set 1.`          → `("", "")`
    pub fn parse(&self, message: &str) -> (String, String) {
        if !message.starts_with("Patch Set ") {
            return (String::new(), String::new());
        }

        if message.contains(": Code-Review") {
            return match self.vote.captures(message) {
                Some(caps) => {
                    let score = &caps[2];
                    (
                        caps[1].to_string(),
                        score.strip_prefix('+').unwrap_or(score).to_string(),
                    )
                }
                None => (String::new(), String::new()),
            };
        }

        match self.comment.captures(message) {
            Some(caps) => (caps[1].to_string(), String::new()),
            None => (String::new(), String::new()),
        }
    }
}

// ── IngestSummary ─────────────────────────────────────────────────────────────

/// Counts reported by one ingestion call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Change records read from the payload.
    pub changes: usize,
    /// Events handed to the store.
    pub events: usize,
    /// Messages dropped by filtering: skip-list, own-message policy or a
    /// missing id.
    pub skipped_events: usize,
}

impl AddAssign for IngestSummary {
    fn add_assign(&mut self, rhs: Self) {
        self.changes += rhs.changes;
        self.events += rhs.events;
        self.skipped_events += rhs.skipped_events;
    }
}

// ── ChangesDataExtractor ──────────────────────────────────────────────────────

/// Extraction pipeline over a caller-supplied store.
pub struct ChangesDataExtractor<S: ChangesStore> {
    store: S,
    config: ExtractorConfig,
    timestamps: TimestampParser,
    patch_sets: PatchSetParser,
}

impl<S: ChangesStore> ChangesDataExtractor<S> {
    pub fn new(store: S, config: ExtractorConfig) -> Self {
        let timestamps = TimestampParser::new(&config.timezone);
        Self {
            store,
            config,
            timestamps,
            patch_sets: PatchSetParser::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Parse `raw`, extract every change and apply the batch to the store.
    ///
    /// Parsing and extraction finish before the store is touched, so a
    /// malformed payload leaves it unchanged. The store is loaded before and
    /// committed after the batch is applied; a load failure leaves it
    /// unchanged too. A failed commit keeps the batch in memory while the
    /// snapshot file keeps its previous content.
    pub fn from_json(&mut self, raw: Option<&str>) -> Result<IngestSummary> {
        let records = parse_changes(raw)?;

        let mut summary = IngestSummary::default();
        let mut batch = Vec::with_capacity(records.len());
        for record in &records {
            let changeset = self.extract_changeset(record);
            let events = self.extract_events(record);
            summary.changes += 1;
            summary.events += events.len();
            summary.skipped_events += message_count(record) - events.len();
            batch.push((changeset, events));
        }

        self.store.load()?;
        for (changeset, events) in batch {
            self.store.add_changeset(changeset);
            self.store.add_events(events);
        }
        self.store.commit()?;

        info!(
            "Ingested {} changes, {} events ({} skipped)",
            summary.changes, summary.events, summary.skipped_events
        );
        Ok(summary)
    }

    /// Ingest a single dump file.
    pub fn from_file(&mut self, path: &Path) -> Result<IngestSummary> {
        let payload = read_payload(path)?;
        debug!("Ingesting {}", path.display());
        self.from_json(Some(&payload))
    }

    /// Ingest every `.json` dump under `dir`, one call per file.
    pub fn from_dir(&mut self, dir: &Path) -> Result<IngestSummary> {
        let files = find_json_files(dir);
        if files.is_empty() {
            warn!("No JSON dumps found in {}", dir.display());
        }

        let mut total = IngestSummary::default();
        for file in &files {
            total += self.from_file(file)?;
        }
        Ok(total)
    }

    /// Normalize one raw change record.
    pub fn extract_changeset(&self, raw: &Value) -> Changeset {
        let status = pick_str(raw, "status").and_then(|s| match s.parse::<ChangeStatus>() {
            Ok(status) => Some(status),
            Err(e) => {
                warn!("{}", e);
                None
            }
        });

        Changeset {
            id: pick_str(raw, "id").unwrap_or_default(),
            number: change_number(raw),
            project: pick_str(raw, "project"),
            status,
            subject: pick_str(raw, "subject"),
            created: pick_str(raw, "created"),
            updated: pick_str(raw, "updated"),
            submittable: pick_bool(raw, "submittable"),
            mergeable: pick_bool(raw, "mergeable"),
            owner: resolve_username(raw.get("owner")),
            review_score: resolve_label_score(raw, REVIEW_LABELS),
            verify_score: resolve_label_score(raw, VERIFY_LABELS),
            priority_score: resolve_label_score(raw, PRIORITY_LABELS),
        }
    }

    /// One event per message on the change, in message order, minus the
    /// messages filtered out by the configured policy. Messages without an
    /// `id` are dropped with a warning.
    pub fn extract_events(&self, raw: &Value) -> Vec<Event> {
        let cs_number = change_number(raw);
        let cs_author = resolve_username(raw.get("owner"));

        let Some(messages) = raw.get("messages").and_then(|m| m.as_array()) else {
            return Vec::new();
        };

        messages
            .iter()
            .map(|msg| self.build_event(msg, cs_number, &cs_author))
            .filter(|event| self.keep_event(event))
            .map(|mut event| {
                if self.config.strip_messages {
                    event.message = None;
                }
                event
            })
            .collect()
    }

    /// Build the event for one change message, before any filtering.
    pub fn build_event(&self, msg: &Value, cs_number: i64, cs_author: &str) -> Event {
        let date = pick_str(msg, "date").unwrap_or_default();
        let message = pick_str(msg, "message");
        let (ps_number, review_score) = self.patch_sets.parse(message.as_deref().unwrap_or(""));

        Event {
            id: pick_str(msg, "id").unwrap_or_default(),
            epoch: self.timestamps.epoch_millis(&date),
            date,
            username: resolve_username(msg.get("author")),
            message,
            ps_number,
            review_score,
            cs_number,
            cs_author: cs_author.to_string(),
        }
    }

    fn keep_event(&self, event: &Event) -> bool {
        // Events are keyed by id in the indexed store.
        if event.id.is_empty() {
            warn!(
                "Dropping message without id from {} on change {}",
                event.username, event.cs_number
            );
            return false;
        }
        if self.config.is_skipped(&event.username) {
            debug!("Skipping message {} from {}", event.id, event.username);
            return false;
        }
        if self.config.drop_own_messages && event.is_own_change() {
            return false;
        }
        true
    }
}

fn change_number(raw: &Value) -> i64 {
    raw.get("_number").and_then(|v| v.as_i64()).unwrap_or_default()
}

fn message_count(raw: &Value) -> usize {
    raw.get("messages")
        .and_then(|m| m.as_array())
        .map(Vec::len)
        .unwrap_or_default()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
