mod bootstrap;

use anyhow::{Context, Result};
use gstats_core::settings::{ExtractorConfig, Settings};
use gstats_data::aggregator::UserStatsBuilder;
use gstats_data::extractor::{ChangesDataExtractor, IngestSummary};
use gstats_data::report::write_csv;
use gstats_data::store::{open_store, ChangesStore};

fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_deref())?;

    tracing::info!("gerrit-stats v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Input: {}, Store: {}, Timezone: {}",
        settings.input.display(),
        settings.store,
        settings.timezone
    );

    let summary = run(&settings)?;
    tracing::info!(
        "Done: {} changes, {} events kept, {} skipped",
        summary.changes,
        summary.events,
        summary.skipped_events
    );
    Ok(())
}

/// Ingest the configured input, aggregate and write the CSV report.
fn run(settings: &Settings) -> Result<IngestSummary> {
    settings.validate()?;

    let store = open_store(settings.store_kind(), settings.db_path.clone());
    let mut extractor = ChangesDataExtractor::new(store, ExtractorConfig::from(settings));

    let summary = if settings.input.is_dir() {
        extractor.from_dir(&settings.input)
    } else {
        extractor.from_file(&settings.input)
    }
    .with_context(|| format!("ingesting {}", settings.input.display()))?;

    let store = extractor.into_store();
    let stats = UserStatsBuilder::build(store.events(), store.changesets());

    write_csv(&settings.output, stats.users())
        .with_context(|| format!("writing report {}", settings.output.display()))?;

    Ok(summary)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
