//! PersistScheduler tests

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tablekit::store::{PersistEntry, PersistScheduler, StorageBackend};

use crate::common::CountingStorage;

fn setup(delay_ms: u64) -> (Arc<CountingStorage>, PersistScheduler) {
    let storage = Arc::new(CountingStorage::new());
    let backend: Arc<dyn StorageBackend> = storage.clone();
    let scheduler = PersistScheduler::new(backend, Duration::from_millis(delay_ms)).unwrap();
    (storage, scheduler)
}

#[test]
fn test_burst_coalesces_into_one_write_of_last_value() {
    let (storage, scheduler) = setup(50);

    for i in 0..20 {
        scheduler.schedule([PersistEntry::new("ns-custom-filters", format!("[{}]", i))]);
    }
    assert_eq!(storage.writes_for("ns-custom-filters"), 0);

    thread::sleep(Duration::from_millis(300));

    assert_eq!(storage.writes_for("ns-custom-filters"), 1);
    assert_eq!(storage.raw("ns-custom-filters").as_deref(), Some("[19]"));
    assert_eq!(scheduler.pending_len(), 0);
}

#[test]
fn test_nothing_written_before_window_elapses() {
    let (storage, scheduler) = setup(5_000);

    scheduler.schedule([PersistEntry::new("k", "1")]);
    thread::sleep(Duration::from_millis(50));

    assert_eq!(storage.total_writes(), 0);
    assert_eq!(scheduler.pending_len(), 1);
}

#[test]
fn test_flush_writes_immediately() {
    let (storage, scheduler) = setup(5_000);

    scheduler.schedule([PersistEntry::new("a", "1"), PersistEntry::new("b", "2")]);
    let report = scheduler.flush();

    assert_eq!(report.written, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(storage.raw("a").as_deref(), Some("1"));
    assert_eq!(storage.raw("b").as_deref(), Some("2"));
    assert_eq!(scheduler.pending_len(), 0);
}

#[test]
fn test_flush_with_nothing_pending_is_noop() {
    let (storage, scheduler) = setup(100);

    let report = scheduler.flush();

    assert_eq!(report.written, 0);
    assert_eq!(storage.total_writes(), 0);
}

#[test]
fn test_close_flushes_pending_writes() {
    let (storage, scheduler) = setup(5_000);

    scheduler.schedule([PersistEntry::new("k", "\"latest\"")]);
    let report = scheduler.close().unwrap();

    assert_eq!(report.written, 1);
    assert_eq!(storage.raw("k").as_deref(), Some("\"latest\""));
}

#[test]
fn test_drop_flushes_pending_writes() {
    let (storage, scheduler) = setup(5_000);

    scheduler.schedule([PersistEntry::new("k", "\"kept\"")]);
    drop(scheduler);

    assert_eq!(storage.writes_for("k"), 1);
    assert_eq!(storage.raw("k").as_deref(), Some("\"kept\""));
}

#[test]
fn test_zero_delay_writes_through() {
    let (storage, scheduler) = setup(0);

    scheduler.schedule([PersistEntry::new("k", "1")]);
    scheduler.schedule([PersistEntry::new("k", "2")]);

    assert_eq!(storage.writes_for("k"), 2);
    assert_eq!(storage.raw("k").as_deref(), Some("2"));
}

#[test]
fn test_write_failure_is_reported_not_fatal() {
    let (storage, scheduler) = setup(5_000);
    storage.set_fail_writes(true);

    scheduler.schedule([PersistEntry::new("k", "1")]);
    let report = scheduler.flush();

    assert_eq!(report.failed, 1);
    assert_eq!(report.written, 0);
    assert_eq!(storage.total_writes(), 0);

    // Kept for the next write, but no timer is armed for it
    assert_eq!(scheduler.pending_len(), 1);
}

#[test]
fn test_failed_key_is_written_with_next_schedule() {
    let (storage, scheduler) = setup(0);
    storage.set_fail_writes(true);
    scheduler.schedule([PersistEntry::new("ns-hidden-columns", r#"["age"]"#)]);
    assert_eq!(storage.total_writes(), 0);

    storage.set_fail_writes(false);
    scheduler.schedule([PersistEntry::new("ns-sort-config", r#"{"direction":"asc"}"#)]);

    assert_eq!(storage.raw("ns-hidden-columns").as_deref(), Some(r#"["age"]"#));
    assert_eq!(storage.writes_for("ns-sort-config"), 1);
    assert_eq!(scheduler.pending_len(), 0);
}

#[test]
fn test_failed_key_does_not_override_newer_value() {
    let (storage, scheduler) = setup(0);
    storage.set_fail_writes(true);
    scheduler.schedule([PersistEntry::new("k", "\"old\"")]);

    storage.set_fail_writes(false);
    scheduler.schedule([PersistEntry::new("k", "\"new\"")]);

    assert_eq!(storage.writes_for("k"), 1);
    assert_eq!(storage.raw("k").as_deref(), Some("\"new\""));
}

#[test]
fn test_close_retries_failed_keys() {
    let (storage, scheduler) = setup(5_000);
    storage.set_fail_writes(true);
    scheduler.schedule([PersistEntry::new("k", "1")]);
    assert_eq!(scheduler.flush().failed, 1);

    storage.set_fail_writes(false);
    let report = scheduler.close().unwrap();

    assert_eq!(report.written, 1);
    assert_eq!(storage.raw("k").as_deref(), Some("1"));
}

#[test]
fn test_json_entry_serializes_value() {
    let entry = PersistEntry::json("ns-hidden-columns", &vec!["a", "b"]).unwrap();
    assert_eq!(entry.value, r#"["a","b"]"#);
}
