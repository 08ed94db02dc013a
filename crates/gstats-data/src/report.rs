//! CSV rendering of per-user statistics.

use std::path::Path;

use gstats_core::error::{Result, StatsError};
use gstats_core::models::UserStats;
use tracing::info;

/// Header plus one row per user, in the given order.
pub fn render_csv(users: &[UserStats]) -> String {
    let mut out = String::from(UserStats::csv_header());
    for user in users {
        out.push_str(&user.to_csv_row());
    }
    out
}

/// Render `users` and write the CSV to `path`, creating parent directories.
pub fn write_csv(path: &Path, users: &[UserStats]) -> Result<()> {
    let write_err = |source| StatsError::FileWrite {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    std::fs::write(path, render_csv(users)).map_err(write_err)?;

    info!("Wrote stats for {} users to {}", users.len(), path.display());
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
