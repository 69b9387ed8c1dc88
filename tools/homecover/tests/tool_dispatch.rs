use homecover::errors::HomecoverError;
use homecover::record_store::RecordStore;
use homecover::runtime::FakeFileSystem;
use homecover::tools::{catalog, PolicyDesk, ToolCall, AUTH_FAILED_TEXT};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

const STORE_PATH: &str = "/desk/home_insurance_data.json";

fn desk() -> (FakeFileSystem, PolicyDesk) {
    let fs = FakeFileSystem::with_file(
        STORE_PATH,
        include_str!("fixtures/home_insurance_data.json"),
    );
    let store = RecordStore::load(STORE_PATH, Arc::new(fs.clone())).expect("load");
    (fs, PolicyDesk::new(store))
}

fn call(desk: &mut PolicyDesk, tool: &str, args: serde_json::Value) -> String {
    desk.dispatch(&ToolCall::new(tool, args)).text
}

#[test]
fn login_replies_with_welcome_or_failure() {
    let (_fs, mut desk) = desk();
    assert_eq!(
        call(&mut desk, "login_user", json!({"search_query": "nobody"})),
        AUTH_FAILED_TEXT
    );
    assert_eq!(
        call(
            &mut desk,
            "login_user",
            json!({"search_query": "It's H-99887766, postcode OX1 2JD"})
        ),
        "AUTH_SUCCESS: Welcome Jane Smith. I've accessed your policy."
    );
    assert_eq!(desk.session().current_policy(), Some("H-99887766"));
}

#[test]
fn operations_before_login_ask_for_login() {
    let (fs, mut desk) = desk();
    for tool in [
        "get_policy_details",
        "renew_policy",
        "cancel_policy",
        "download_policy_summary",
    ] {
        assert_eq!(call(&mut desk, tool, json!({})), "ERROR: Log in first.");
    }
    assert_eq!(
        call(
            &mut desk,
            "update_policy_cover",
            json!({"cover_type": "building cover", "new_limit": 10})
        ),
        "ERROR: Log in first."
    );
    assert_eq!(fs.write_count(), 0);
}

#[test]
fn full_conversation_updates_and_persists() {
    let (fs, mut desk) = desk();
    call(&mut desk, "login_user", json!({"search_query": "Omar Reyes"}));

    let details = call(&mut desk, "get_policy_details", serde_json::Value::Null);
    let parsed: serde_json::Value = serde_json::from_str(&details).expect("details json");
    assert_eq!(parsed["policy_number"], "H-55554444");
    assert_eq!(parsed["annual_premium"], json!(298.0));

    assert_eq!(
        call(
            &mut desk,
            "update_policy_cover",
            json!({"cover_type": "Contents Cover", "new_limit": 30000})
        ),
        "SUCCESS: Contents_cover updated to £30000."
    );
    assert_eq!(
        call(&mut desk, "renew_policy", json!({})),
        "SUCCESS: Policy H-55554444 is now Renewed."
    );
    assert_eq!(
        call(&mut desk, "cancel_policy", json!({})),
        "SUCCESS: Policy H-55554444 is now Cancelled."
    );
    assert_eq!(fs.write_count(), 3);

    let disk = fs.file_contents(Path::new(STORE_PATH)).expect("store");
    let reloaded: serde_json::Value = serde_json::from_str(&disk).expect("json");
    assert_eq!(reloaded[1]["cover_details"]["contents_cover"], 30000);
    assert_eq!(reloaded[1]["status"], "Cancelled");
    assert_eq!(reloaded[0]["status"], "Active");
}

#[test]
fn unknown_cover_lists_known_keys() {
    let (_fs, mut desk) = desk();
    call(&mut desk, "login_user", json!({"search_query": "jane smith"}));
    assert_eq!(
        call(
            &mut desk,
            "update_policy_cover",
            json!({"cover_type": "buildings", "new_limit": 1})
        ),
        "ERROR: Could not find cover type 'buildings'. Known keys: [\"building_cover\", \"contents_cover\", \"excess\"]"
    );
}

#[test]
fn bad_arguments_and_unknown_tools_become_error_strings() {
    let (_fs, mut desk) = desk();
    call(&mut desk, "login_user", json!({"search_query": "jane smith"}));

    let negative = call(
        &mut desk,
        "update_policy_cover",
        json!({"cover_type": "excess", "new_limit": -5}),
    );
    assert!(negative.starts_with("ERROR: invalid tool arguments"));

    let missing = call(&mut desk, "login_user", json!({}));
    assert!(missing.starts_with("ERROR: invalid tool arguments"));

    assert_eq!(
        call(&mut desk, "book_holiday", json!({})),
        "ERROR: unknown tool: book_holiday"
    );

    let malformed = desk.dispatch_json("{not json");
    assert!(malformed.text.starts_with("ERROR: invalid tool arguments: malformed tool call"));
    assert_eq!(desk.session().current_policy(), Some("H-99887766"));
}

#[test]
fn structured_identity_check_requires_exact_pairs() {
    let (_fs, mut desk) = desk();
    assert_eq!(
        call(
            &mut desk,
            "verify_identity",
            json!({"full_name": "Jane Smith", "dob": "1985-04-13"})
        ),
        AUTH_FAILED_TEXT
    );
    assert_eq!(
        call(
            &mut desk,
            "verify_identity",
            json!({"policy_number": "h-55554444", "postcode": "ls2 9jt"})
        ),
        "AUTH_SUCCESS: Welcome Omar Reyes. I've accessed your policy."
    );
}

#[test]
fn summary_download_returns_artifact() {
    let (_fs, mut desk) = desk();
    desk.dispatch_json(r#"{"tool": "login_user", "args": {"search_query": "jane smith"}}"#);
    let reply = desk.dispatch_json(r#"{"tool": "download_policy_summary"}"#);
    let artifact = reply.artifact.expect("artifact");
    assert_eq!(artifact.file_name, "policy-summary-H-99887766.txt");
    assert_eq!(
        reply.text,
        format!(
            "SUCCESS: Summary ready as policy-summary-H-99887766.txt ({} bytes).",
            artifact.bytes.len()
        )
    );
    let text = String::from_utf8(artifact.bytes).expect("utf8");
    assert!(text.starts_with("POLICY SUMMARY\nPolicy: H-99887766\nName: Jane Smith\nStatus: Active\n"));
}

#[test]
fn persistence_failure_is_relayed() {
    let (fs, mut desk) = desk();
    call(&mut desk, "login_user", json!({"search_query": "jane smith"}));
    fs.set_fail_next(HomecoverError::Io("disk full".to_string()));

    let reply = call(&mut desk, "renew_policy", json!({}));
    assert_eq!(reply, "ERROR: Could not save changes: io error: disk full");
}

#[test]
fn catalog_covers_every_dispatchable_tool() {
    let (_fs, mut desk) = desk();
    for spec in catalog() {
        let reply = call(&mut desk, spec.name, json!({}));
        assert!(
            !reply.starts_with("ERROR: unknown tool"),
            "{} is in the catalog but not dispatchable",
            spec.name
        );
    }
}
