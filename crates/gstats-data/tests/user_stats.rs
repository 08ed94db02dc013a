use std::path::PathBuf;

use gstats_core::settings::ExtractorConfig;
use gstats_data::aggregator::UserStatsBuilder;
use gstats_data::extractor::ChangesDataExtractor;
use gstats_data::report::{render_csv, write_csv};
use gstats_data::store::{ChangesStore, IndexedStore};
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn stats_for(path: &std::path::Path) -> UserStatsBuilder {
    let mut ex = ChangesDataExtractor::new(IndexedStore::in_memory(), ExtractorConfig::default());
    if path.is_dir() {
        ex.from_dir(path).unwrap();
    } else {
        ex.from_file(path).unwrap();
    }
    let store = ex.into_store();
    UserStatsBuilder::build(store.events(), store.changesets())
}

#[test]
fn test_x1_user_stats() {
    let stats = stats_for(&fixture("changes-aosp-system-x1.json"));
    assert_eq!(stats.len(), 3);

    let enh = stats.get("enh").unwrap();
    assert_eq!(enh.nb_changes, 1);
    assert_eq!(enh.nb_changes_merged, 1);
    assert_eq!(enh.nb_events, 13);
    assert_eq!(enh.nb_own_change_events, 13);
    assert_eq!(enh.nb_3rd_party_change_events, 0);

    let cferris = stats.get("cferris").unwrap();
    assert_eq!(cferris.nb_changes, 0);
    assert_eq!(cferris.nb_events, 2);
    assert_eq!(cferris.nb_3rd_party_change_events, 2);

    let ccraik = stats.get("ccraik").unwrap();
    assert_eq!(ccraik.nb_events, 1);
    assert_eq!(ccraik.nb_3rd_party_change_events, 1);
}

#[test]
fn test_x1_csv() {
    let stats = stats_for(&fixture("changes-aosp-system-x1.json"));
    let csv = render_csv(stats.users());
    let rows: Vec<&str> = csv.lines().skip(1).collect();
    assert_eq!(
        rows,
        vec![
            "enh,1,1,0,0,13,13,0,0.000,0.000,",
            "cferris,0,0,0,0,2,0,2,0,1.000,",
            "ccraik,0,0,0,0,1,0,1,0,1.000,",
        ]
    );
}

#[test]
fn test_multi_csv() {
    let stats = stats_for(&fixture("changes-aosp-multi.json"));
    let csv = render_csv(stats.users());
    let rows: Vec<&str> = csv.lines().skip(1).collect();
    assert_eq!(
        rows,
        vec![
            "cferris,1,0,1,1,3,2,1,1.000,0.333,",
            "enh,1,0,1,1,3,1,2,2.000,0.667,",
            "ccraik,1,0,0,0,2,2,0,0.000,0.000,",
        ]
    );
}

#[test]
fn test_directory_end_to_end_csv_file() {
    let stats = stats_for(&fixture(""));
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("usersStats.csv");
    write_csv(&out, stats.users()).unwrap();

    let content = std::fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(
        lines,
        vec![
            "username,nbChanges,nbChangesMerged,nbChangesOpenReadyForReview,nbChangesOpenVerifyPlus2,nbEvents,nbOwnChangeEvents,nb3rdPartyChangeEvents,eventsTowards3PartyOverOwnChangesCountRatio,eventsTowards3PartyOverEventsCount,",
            "cferris,1,0,1,1,5,2,3,3.000,0.600,",
            "enh,2,1,1,1,16,14,2,1.000,0.125,",
            "ccraik,1,0,0,0,3,2,1,1.000,0.333,",
        ]
    );
}
