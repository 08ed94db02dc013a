use chrono_tz::Tz;
use clap::Parser;
use std::path::PathBuf;

use crate::error::{Result, StatsError};
use crate::time_utils::resolve_timezone_name;

/// Bot and service accounts whose messages are not review activity.
pub const DEFAULT_SKIPPED_USERS: &[&str] = &["builder", "bot", "sonar", "treehugger-gerrit"];

/// Environment variable naming the persisted store file.
pub const DB_PATH_ENV: &str = "GERRIT_STATS_DB_PATH";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Per-user review activity statistics from Gerrit change dumps
#[derive(Parser, Debug, Clone)]
#[command(
    name = "gerrit-stats",
    about = "Per-user review activity statistics from Gerrit change dumps",
    version
)]
pub struct Settings {
    /// Gerrit changes dump (JSON) or a directory of dumps
    pub input: PathBuf,

    /// Persisted store file; persistence is disabled when unset
    #[arg(long, env = "GERRIT_STATS_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Store variant
    #[arg(long, default_value = "indexed", value_parser = ["indexed", "list"])]
    pub store: String,

    /// CSV report path
    #[arg(long, default_value = "usersStats.csv")]
    pub output: PathBuf,

    /// Usernames whose messages are ignored (comma separated)
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "builder,bot,sonar,treehugger-gerrit"
    )]
    pub skip_users: Vec<String>,

    /// Drop messages written by the owner of the change
    #[arg(long)]
    pub drop_own_messages: bool,

    /// Do not keep message bodies in the store
    #[arg(long)]
    pub strip_messages: bool,

    /// Timezone used to read zone-less timestamps (auto-detected if not specified)
    #[arg(long, default_value = "auto")]
    pub timezone: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Settings {
    /// Parse process arguments and resolve sentinel values.
    pub fn load() -> Self {
        Self::resolve(Settings::parse())
    }

    /// Same as [`Settings::load`] with an explicit argument list.
    pub fn load_from_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::resolve(Settings::parse_from(args))
    }

    /// Resolve `"auto"` timezone and apply the `--debug` flag.
    fn resolve(mut settings: Settings) -> Settings {
        settings.timezone = resolve_timezone_name(&settings.timezone);

        // --debug overrides log level.
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        settings
    }

    /// Reject values clap cannot check on its own.
    pub fn validate(&self) -> Result<()> {
        if self.timezone.parse::<Tz>().is_err() {
            return Err(StatsError::Config(format!(
                "unknown timezone \"{}\"",
                self.timezone
            )));
        }
        Ok(())
    }

    pub fn store_kind(&self) -> StoreKind {
        match self.store.as_str() {
            "list" => StoreKind::List,
            _ => StoreKind::Indexed,
        }
    }
}

// ── StoreKind ──────────────────────────────────────────────────────────────────

/// Which change store backs an ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// Index by id, upsert on re-ingestion, optional persistence.
    Indexed,
    /// Append-only, in memory.
    List,
}

// ── ExtractorConfig ────────────────────────────────────────────────────────────

/// Immutable extraction policy handed to the extractor at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorConfig {
    /// Messages authored by these usernames are discarded.
    pub skipped_users: Vec<String>,
    /// Discard messages written by the change owner.
    pub drop_own_messages: bool,
    /// Remove message bodies once the patch-set fields are derived.
    pub strip_messages: bool,
    /// IANA timezone for zone-less timestamps.
    pub timezone: String,
}

impl ExtractorConfig {
    pub fn is_skipped(&self, username: &str) -> bool {
        self.skipped_users.iter().any(|u| u == username)
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            skipped_users: DEFAULT_SKIPPED_USERS.iter().map(|s| s.to_string()).collect(),
            drop_own_messages: false,
            strip_messages: false,
            timezone: "UTC".to_string(),
        }
    }
}

impl From<&Settings> for ExtractorConfig {
    fn from(s: &Settings) -> Self {
        ExtractorConfig {
            skipped_users: s
                .skip_users
                .iter()
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty())
                .collect(),
            drop_own_messages: s.drop_own_messages,
            strip_messages: s.strip_messages,
            timezone: s.timezone.clone(),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
