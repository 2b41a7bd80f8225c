use super::*;
use crate::RouteError;

const TIMEOUT: std::time::Duration = std::time::Duration::from_secs(15);

fn table() -> MembershipTable {
    MembershipTable::new(std::time::Duration::from_secs(60))
}

#[test]
fn heartbeat_refreshes_registered_node() {
    let table = table();
    table.insert("10.0.0.1", 3).unwrap();

    let past = (Timestamp::now() - std::time::Duration::from_secs(20))
        .expect("now is well past the epoch");
    table.set_last_seen("10.0.0.1", past);
    assert!(table.is_stale("10.0.0.1", TIMEOUT, Timestamp::now()));

    table.heartbeat("10.0.0.1").unwrap();
    assert!(!table.is_stale("10.0.0.1", TIMEOUT, Timestamp::now()));
}

#[test]
fn heartbeat_never_registers() {
    let table = table();
    assert_eq!(
        Err(RouteError::unknown_node("10.0.0.1")),
        table.heartbeat("10.0.0.1"),
    );
    assert!(table.node_ids().is_empty());
}

#[test]
fn registration_grace_counts_as_fresh() {
    let table = table();
    table.insert("10.0.0.1", 3).unwrap();

    // last_seen sits in the future, so even a "now" slightly beyond the
    // timeout window is not stale yet
    let later = Timestamp::now() + std::time::Duration::from_secs(30);
    assert!(!table.is_stale("10.0.0.1", TIMEOUT, later));

    // but past the grace plus the timeout it is
    let much_later = Timestamp::now() + std::time::Duration::from_secs(90);
    assert!(table.is_stale("10.0.0.1", TIMEOUT, much_later));
}

#[test]
fn missing_node_is_stale() {
    let table = table();
    assert!(table.is_stale("10.0.0.1", TIMEOUT, Timestamp::now()));
}

#[test]
fn reinsert_updates_replica_count_only() {
    let table = table();
    table.insert("10.0.0.1", 3).unwrap();

    let past = (Timestamp::now() - std::time::Duration::from_secs(60))
        .expect("now is well past the epoch");
    table.set_last_seen("10.0.0.1", past);

    table.insert("10.0.0.1", 8).unwrap();
    assert_eq!(Some(8), table.replica_count("10.0.0.1"));

    // re-registration is not a liveness proof
    assert!(table.is_stale("10.0.0.1", TIMEOUT, Timestamp::now()));
}

#[test]
fn reject_zero_replicas() {
    let table = table();
    assert!(matches!(
        table.insert("10.0.0.1", 0),
        Err(RouteError::InvalidParameter(_)),
    ));
    assert!(table.node_ids().is_empty());
}

#[test]
fn delete_returns_final_record() {
    let table = table();
    table.insert("10.0.0.1", 3).unwrap();

    let node = table.delete("10.0.0.1").unwrap();
    assert_eq!("10.0.0.1", &*node.node_id);
    assert_eq!(3, node.replica_count);

    assert_eq!(
        Err(RouteError::unknown_node("10.0.0.1")),
        table.delete("10.0.0.1"),
    );
}

#[test]
fn snapshot_is_a_copy() {
    let table = table();
    table.insert("10.0.0.1", 3).unwrap();
    table.insert("10.0.0.2", 5).unwrap();

    let snapshot = table.snapshot();
    table.delete("10.0.0.1").unwrap();

    assert_eq!(2, snapshot.len());
    assert_eq!(1, table.node_ids().len());
}
