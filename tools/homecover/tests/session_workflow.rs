use homecover::errors::HomecoverError;
use homecover::record_store::RecordStore;
use homecover::runtime::ProductionFileSystem;
use homecover::session::{AuthOutcome, SessionState, SessionWorkflow};
use homecover::types::PolicyStatus;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const FIXTURE: &str = include_str!("fixtures/home_insurance_data.json");

fn seeded_store(dir: &Path) -> PathBuf {
    let path = dir.join("home_insurance_data.json");
    std::fs::write(&path, FIXTURE).expect("seed store");
    path
}

fn open(path: &Path) -> RecordStore {
    RecordStore::load(path, Arc::new(ProductionFileSystem)).expect("load")
}

#[test]
fn first_run_without_data_file_starts_empty_and_persist_creates_it() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested/home_insurance_data.json");

    let store = open(&path);
    assert!(store.is_empty());
    store.persist().expect("persist");

    let disk: Value = serde_json::from_str(&std::fs::read_to_string(&path).expect("read"))
        .expect("json");
    assert_eq!(disk, Value::Array(Vec::new()));
}

#[test]
fn login_is_case_and_whitespace_insensitive() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open(&seeded_store(dir.path()));

    let mut session = SessionWorkflow::new();
    let outcome = session.authenticate(&store, "h-99887766 ox12jd please");
    assert!(matches!(outcome, AuthOutcome::Success { ref policy_number, .. } if policy_number == "H-99887766"));

    let mut other = SessionWorkflow::new();
    assert_eq!(other.authenticate(&store, "H99887766"), AuthOutcome::Failed);
    assert_eq!(other.state(), &SessionState::Unauthenticated);
}

#[test]
fn cover_update_survives_a_fresh_reload() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = seeded_store(dir.path());
    let mut store = open(&path);
    let mut session = SessionWorkflow::new();
    session.authenticate(&store, "Jane Smith, OX1 2JD");

    session
        .update_cover(&mut store, "building cover", 5000)
        .expect("update");
    assert_eq!(
        session.get_details(&store).expect("details").cover_details["building_cover"],
        Value::from(5000u64)
    );

    let reloaded = open(&path);
    let record = reloaded.lookup_by_identifier("H-99887766").expect("record");
    assert_eq!(record.cover_details["building_cover"], Value::from(5000u64));
    assert_eq!(record.extra["annual_premium"], serde_json::json!(412.5));
}

#[test]
fn cancel_then_renew_persists_the_last_status() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = seeded_store(dir.path());
    let mut store = open(&path);
    let mut session = SessionWorkflow::new();
    session.authenticate(&store, "policy H-55554444 postcode LS2 9JT");

    session.cancel(&mut store).expect("cancel");
    assert_eq!(
        open(&path).lookup_by_identifier("H-55554444").expect("kept").status,
        PolicyStatus::Cancelled
    );

    session.renew(&mut store).expect("renew");
    let reloaded = open(&path);
    assert_eq!(reloaded.len(), 2);
    assert_eq!(
        reloaded.lookup_by_identifier("H-55554444").expect("kept").status,
        PolicyStatus::Renewed
    );
}

#[test]
fn unauthenticated_mutations_leave_the_file_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = seeded_store(dir.path());
    let mut store = open(&path);
    let session = SessionWorkflow::new();

    assert!(matches!(
        session.update_cover(&mut store, "building cover", 1),
        Err(HomecoverError::NotAuthenticated)
    ));
    assert!(matches!(session.renew(&mut store), Err(HomecoverError::NotAuthenticated)));
    assert!(matches!(session.cancel(&mut store), Err(HomecoverError::NotAuthenticated)));

    assert_eq!(std::fs::read_to_string(&path).expect("read"), FIXTURE);
}

#[test]
fn unknown_cover_type_is_rejected_without_write() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = seeded_store(dir.path());
    let mut store = open(&path);
    let mut session = SessionWorkflow::new();
    session.authenticate(&store, "omar reyes");

    let err = session
        .update_cover(&mut store, "garden cover", 900)
        .expect_err("unknown key");
    assert!(matches!(err, HomecoverError::UnknownCoverType { .. }));
    assert_eq!(std::fs::read_to_string(&path).expect("read"), FIXTURE);
}

#[test]
fn two_sessions_share_one_store_independently() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut store = open(&seeded_store(dir.path()));
    let mut jane = SessionWorkflow::new();
    let mut omar = SessionWorkflow::new();
    jane.authenticate(&store, "jane smith");
    omar.authenticate(&store, "omar reyes");

    omar.cancel(&mut store).expect("cancel");
    assert_eq!(
        jane.get_details(&store).expect("jane").status,
        PolicyStatus::Active
    );
    assert_eq!(
        omar.get_details(&store).expect("omar").status,
        PolicyStatus::Cancelled
    );
}

#[test]
fn persistence_failure_is_returned_and_memory_diverges() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = seeded_store(dir.path());
    let mut store = open(&path);
    let mut session = SessionWorkflow::new();
    session.authenticate(&store, "jane smith");

    // Replacing the file with a directory makes the rewrite fail.
    std::fs::remove_file(&path).expect("remove");
    std::fs::create_dir(&path).expect("dir in the way");

    let err = session.renew(&mut store).expect_err("write fails");
    assert!(matches!(err, HomecoverError::Persistence(_)));
    assert_eq!(
        session.get_details(&store).expect("details").status,
        PolicyStatus::Renewed
    );
}
