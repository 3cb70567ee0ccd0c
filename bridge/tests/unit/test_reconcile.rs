//! Reconciliation unit tests

use lockbridge::models::{LockRecord, LockState};
use lockbridge::records::{classify, describe, reconcile, reconcile_for_lock, RecordAction, Reconciliation};

fn create_test_record(record_type: i64, lock_date: i64, username: &str) -> LockRecord {
    LockRecord {
        lock_id: 1,
        record_type,
        lock_date,
        username: username.to_string(),
        success: 1,
    }
}

#[test]
fn test_alice_unlocked_after_bob_locked() {
    let records = vec![
        create_test_record(1, 200, "alice"),
        create_test_record(11, 100, "bob"),
    ];

    let result = reconcile(&records);
    assert_eq!(result.state, LockState::Unlocked);
    assert_eq!(result.changed_by, "alice");
}

#[test]
fn test_webhook_batch_decoded_from_json() {
    let records: Vec<LockRecord> = serde_json::from_str(
        r#"[
            {"lockId":1,"recordType":47,"lockDate":1700000000500,"username":"keypad","success":1,"electricQuantity":80},
            {"lockId":1,"recordType":8,"lockDate":1700000000100,"username":"carol","success":1},
            {"lockId":1,"recordType":31,"lockDate":1700000000900,"username":"","success":1}
        ]"#,
    )
    .unwrap();

    assert_eq!(reconcile(&records), Reconciliation::new(LockState::Locked, "keypad"));
}

#[test]
fn test_failed_latest_record_is_ignored() {
    let mut failed = create_test_record(1, 900, "mallory");
    failed.success = 0;
    let records = vec![failed, create_test_record(34, 100, "bob")];

    assert_eq!(reconcile(&records), Reconciliation::new(LockState::Locked, "bob"));
}

#[test]
fn test_records_of_other_locks_are_ignored() {
    let mut other = create_test_record(1, 900, "neighbour");
    other.lock_id = 2;
    let records = vec![other, create_test_record(11, 100, "bob")];

    assert_eq!(
        reconcile_for_lock(1, &records),
        Reconciliation::new(LockState::Locked, "bob")
    );
}

#[test]
fn test_every_code_classifies_and_describes() {
    for code in -100..200 {
        let action = classify(code);
        let text = describe(code);
        if action != RecordAction::Other {
            assert!(!text.is_empty(), "code {} has no description", code);
        }
    }
}
