//! Table engine tests

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{many_people, names, person, person_columns, three_people, CountingStorage, Person};
use tablekit::store::{FileStorage, Hydration, StorageBackend, VersionCheck};
use tablekit::{
    ColumnLayout, EngineConfig, EngineState, FilterCondition, FilterPatch, Operator, SortConfig, SortDirection,
    TableEngine, TableError,
};
use tempfile::TempDir;

// =============================================================================
// Helpers
// =============================================================================

fn write_through() -> EngineConfig {
    EngineConfig::builder().persist_delay(Duration::ZERO).build()
}

fn engine_with(storage: &Arc<CountingStorage>, config: EngineConfig, records: Vec<Person>) -> TableEngine<Person> {
    let backend: Arc<dyn StorageBackend> = storage.clone();
    TableEngine::builder(person_columns())
        .config(config)
        .records(records)
        .storage(backend)
        .build()
        .unwrap()
}

fn engine(records: Vec<Person>) -> TableEngine<Person> {
    TableEngine::builder(person_columns())
        .config(write_through())
        .records(records)
        .build()
        .unwrap()
}

fn filter(id: &str, column: &str, operator: Operator, value: &str) -> FilterCondition {
    FilterCondition::new(id, column, operator, value)
}

// =============================================================================
// Build
// =============================================================================

#[test]
fn test_build_is_ready_with_full_view() {
    let engine = engine(three_people());

    assert_eq!(engine.state(), EngineState::Ready);
    assert_eq!(names(&engine.view()), vec!["Charlie", "Alice", "Bob"]);
    assert_eq!(engine.visible_count(), 3);
    assert_eq!(engine.total_count(), 3);
    assert_eq!(engine.hydration(), &Hydration::Defaults(VersionCheck::Missing));
}

#[test]
fn test_build_rejects_empty_namespace() {
    let result = TableEngine::builder(person_columns())
        .config(EngineConfig::builder().namespace("  ").build())
        .build();

    assert!(matches!(result, Err(TableError::Config(_))));
}

#[test]
fn test_build_rejects_invalid_default_layout() {
    let unknown = EngineConfig::builder()
        .default_layout(ColumnLayout::new(["name", "salary"]))
        .build();
    let duplicate = EngineConfig::builder()
        .default_layout(ColumnLayout::new(["name", "name"]))
        .build();
    let stray_hidden = EngineConfig::builder()
        .default_layout(ColumnLayout::new(["name"]).with_hidden(["age"]))
        .build();

    for config in [unknown, duplicate, stray_hidden] {
        let result = TableEngine::<Person>::builder(person_columns()).config(config).build();
        assert!(matches!(result, Err(TableError::Config(_))));
    }
}

#[test]
fn test_default_layout_is_applied() {
    let config = EngineConfig::builder()
        .persist_delay(Duration::ZERO)
        .default_layout(ColumnLayout::new(["status", "name", "age"]).with_hidden(["age"]))
        .build();
    let engine = TableEngine::builder(person_columns()).config(config).build().unwrap();

    assert_eq!(engine.visible_columns(), vec!["status", "name"]);
    assert_eq!(engine.column_order(), ["status", "name", "age"]);
    assert!(!engine.is_column_visible("joined"));
}

// =============================================================================
// Search & Filters
// =============================================================================

#[test]
fn test_search_then_filters() {
    let mut engine = engine(three_people());

    engine.set_search_term("LI");
    assert_eq!(names(&engine.view()), vec!["Charlie", "Alice"]);

    engine.add_custom_filter(filter("f1", "status", Operator::Equals, "done"));
    assert_eq!(names(&engine.view()), vec!["Alice"]);
    assert!(engine.has_active_filters());
}

#[test]
fn test_filter_lifecycle() {
    let mut engine = engine(three_people());

    assert!(engine.add_custom_filter(filter("f1", "status", Operator::Equals, "open")));
    assert!(!engine.add_custom_filter(filter("f1", "name", Operator::Contains, "x")));
    assert_eq!(engine.custom_filters().len(), 1);
    assert_eq!(names(&engine.view()), vec!["Charlie"]);

    assert!(engine.update_custom_filter("f1", FilterPatch::default().value("done")));
    assert_eq!(names(&engine.view()), vec!["Alice"]);
    assert!(!engine.update_custom_filter("missing", FilterPatch::default().value("x")));

    assert!(engine.remove_custom_filter("f1"));
    assert!(!engine.remove_custom_filter("f1"));
    assert_eq!(engine.visible_count(), 3);
}

#[test]
fn test_inactive_filters_are_kept_but_ignored() {
    let mut engine = engine(three_people());

    engine.add_custom_filter(filter("draft", "name", Operator::Contains, ""));

    assert_eq!(engine.custom_filters().len(), 1);
    assert_eq!(engine.active_filter_count(), 0);
    assert!(!engine.has_active_filters());
    assert_eq!(engine.visible_count(), 3);
}

#[test]
fn test_clear_all_filters_clears_search() {
    let mut engine = engine(three_people());
    engine.set_search_term("alice");
    engine.add_custom_filter(filter("f1", "status", Operator::IsNotEmpty, ""));

    engine.clear_all_filters();

    assert!(engine.custom_filters().is_empty());
    assert_eq!(engine.search_term(), "");
    assert_eq!(engine.visible_count(), 3);
}

#[test]
fn test_search_term_is_not_persisted() {
    let storage = Arc::new(CountingStorage::new());
    let debounced = EngineConfig::builder().persist_delay_ms(5_000).build();
    let mut engine = engine_with(&storage, debounced, three_people());
    let baseline = storage.total_writes();

    engine.set_search_term("bob");

    assert_eq!(engine.pending_writes(), 0);
    engine.flush();
    assert_eq!(storage.total_writes(), baseline);
}

// =============================================================================
// Sorting
// =============================================================================

#[test]
fn test_header_sort_toggles_asc_desc_asc() {
    let mut engine = engine(three_people());

    engine.handle_column_sort("name");
    assert_eq!(engine.sort_config(), &SortConfig::asc("name"));
    assert_eq!(names(&engine.view()), vec!["Alice", "Bob", "Charlie"]);

    engine.handle_column_sort("name");
    assert_eq!(engine.sort_config().direction, SortDirection::Desc);
    assert_eq!(names(&engine.view()), vec!["Charlie", "Bob", "Alice"]);

    engine.handle_column_sort("name");
    assert_eq!(engine.sort_config(), &SortConfig::asc("name"));
}

#[test]
fn test_header_sort_new_field_starts_ascending() {
    let mut engine = engine(three_people());
    engine.handle_column_sort("name");
    engine.handle_column_sort("name");

    engine.handle_column_sort("age");

    assert_eq!(engine.sort_config(), &SortConfig::asc("age"));
    assert_eq!(names(&engine.view()), vec!["Bob", "Charlie", "Alice"]);
}

#[test]
fn test_sort_on_unknown_column_is_ignored() {
    let mut engine = engine(three_people());
    engine.set_sort_config(SortConfig::desc("age"));

    engine.handle_column_sort("salary");
    engine.set_sort_config(SortConfig::asc("salary"));

    assert_eq!(engine.sort_config(), &SortConfig::desc("age"));
}

#[test]
fn test_clearing_sort_restores_input_order() {
    let mut engine = engine(three_people());
    engine.set_sort_config(SortConfig::asc("name"));

    engine.set_sort_config(SortConfig::default());

    assert_eq!(names(&engine.view()), vec!["Charlie", "Alice", "Bob"]);
}

// =============================================================================
// Columns
// =============================================================================

#[test]
fn test_column_mutations() {
    let mut engine = engine(three_people());

    assert!(engine.toggle_column_visibility("age"));
    assert_eq!(engine.hidden_columns(), ["age"]);

    let reversed: Vec<String> = engine.column_order().iter().rev().cloned().collect();
    assert!(engine.handle_column_reorder(reversed.clone()));
    assert_eq!(engine.column_order(), reversed.as_slice());
    assert!(!engine.handle_column_reorder(vec!["name".to_string()]));

    engine.reset_columns();
    assert!(engine.hidden_columns().is_empty());
    assert_eq!(engine.visible_columns(), vec!["name", "age", "status", "joined", "nickname"]);
}

#[test]
fn test_rejected_column_change_schedules_nothing() {
    let storage = Arc::new(CountingStorage::new());
    let debounced = EngineConfig::builder().persist_delay_ms(5_000).build();
    let mut engine = engine_with(&storage, debounced, three_people());

    assert!(!engine.toggle_column_visibility("salary"));
    assert!(!engine.handle_column_reorder(vec!["age".to_string()]));

    assert_eq!(engine.pending_writes(), 0);
}

// =============================================================================
// Selection
// =============================================================================

#[test]
fn test_select_all_uses_filtered_view() {
    let mut engine = engine(three_people());
    engine.set_search_term("li");

    assert!(engine.select_all(Some(true)));
    assert_eq!(engine.selected_ids(), vec!["1", "2"]);
    assert!(engine.is_all_selected());

    engine.set_search_term("");
    assert!(engine.is_indeterminate());
    assert!(!engine.is_all_selected());
    // selection survives the filter change
    assert_eq!(engine.selected_ids(), vec!["1", "2"]);
}

#[test]
fn test_select_all_respects_max_selection() {
    let config = EngineConfig::builder()
        .persist_delay(Duration::ZERO)
        .max_selection(10)
        .build();
    let mut engine = TableEngine::builder(person_columns())
        .config(config)
        .records(many_people(25))
        .build()
        .unwrap();

    assert!(!engine.select_all(Some(true)));
    assert!(engine.selected_ids().is_empty());

    engine.set_search_term("Person 1");
    // "Person 1" and "Person 10".."Person 19"
    assert_eq!(engine.visible_count(), 11);
    assert!(!engine.select_all(Some(true)));

    engine.add_custom_filter(filter("f1", "age", Operator::StartsWith, "1"));
    engine.add_custom_filter(filter("f2", "age", Operator::NotEquals, "1"));
    assert_eq!(engine.visible_count(), 10);
    assert!(engine.select_all(Some(true)));
    assert_eq!(engine.selected_ids().len(), 10);
}

#[test]
fn test_single_select_mode() {
    let config = EngineConfig::builder()
        .persist_delay(Duration::ZERO)
        .multi_select(false)
        .build();
    let mut engine = TableEngine::builder(person_columns())
        .config(config)
        .records(three_people())
        .build()
        .unwrap();

    engine.select_item("1", None);
    engine.select_item("3", None);

    assert_eq!(engine.selected_ids(), vec!["3"]);
    assert!(!engine.select_all(Some(true)));
}

#[test]
fn test_set_records_prunes_selection() {
    let mut engine = engine(three_people());
    engine.select_item("1", None);
    engine.select_item("2", None);

    engine.set_records(vec![
        person("1", "Charlie", Some(25), "open", "2024-03-01"),
        person("4", "Dana", Some(41), "open", "2022-06-30"),
    ]);

    assert_eq!(engine.selected_ids(), vec!["1"]);
    assert_eq!(names(&engine.selected_items()), vec!["Charlie"]);
    assert_eq!(engine.total_count(), 2);
}

#[test]
fn test_set_records_reapplies_pipeline() {
    let mut engine = engine(three_people());
    engine.set_sort_config(SortConfig::asc("age"));
    engine.add_custom_filter(filter("f1", "status", Operator::Equals, "open"));

    let mut records = three_people();
    records.push(person("4", "Dana", Some(18), "open", "2022-06-30"));
    engine.set_records(records);

    assert_eq!(names(&engine.view()), vec!["Dana", "Charlie"]);
}

// =============================================================================
// Persistence
// =============================================================================

#[test]
fn test_rapid_filter_changes_coalesce_into_one_write() {
    let storage = Arc::new(CountingStorage::new());
    let mut engine = engine_with(&storage, EngineConfig::builder().persist_delay_ms(50).build(), three_people());
    engine.flush();
    let key = "table-custom-filters";
    let baseline = storage.writes_for(key);

    engine.add_custom_filter(filter("f1", "status", Operator::Equals, "open"));
    engine.add_custom_filter(filter("f2", "name", Operator::Contains, "c"));
    engine.add_custom_filter(filter("f3", "age", Operator::IsNotEmpty, ""));

    assert_eq!(storage.writes_for(key), baseline);
    thread::sleep(Duration::from_millis(300));

    assert_eq!(storage.writes_for(key), baseline + 1);
    let stored: Vec<FilterCondition> = serde_json::from_str(&storage.raw(key).unwrap()).unwrap();
    assert_eq!(stored.len(), 3);
}

#[test]
fn test_close_flushes_pending_writes() {
    let storage = Arc::new(CountingStorage::new());
    let mut engine = engine_with(&storage, EngineConfig::builder().persist_delay_ms(10_000).build(), three_people());
    engine.toggle_column_visibility("age");
    assert!(engine.pending_writes() > 0);

    let report = engine.close().unwrap();

    assert!(report.written > 0);
    assert_eq!(storage.raw("table-hidden-columns").as_deref(), Some(r#"["age"]"#));
}

#[test]
fn test_failed_writes_keep_in_memory_state() {
    let storage = Arc::new(CountingStorage::new());
    storage.set_fail_writes(true);
    let mut engine = engine_with(&storage, write_through(), three_people());

    engine.toggle_column_visibility("age");
    engine.set_sort_config(SortConfig::desc("age"));

    assert_eq!(engine.hidden_columns(), ["age"]);
    assert_eq!(names(&engine.view()), vec!["Alice", "Charlie", "Bob"]);
}

#[test]
fn test_failed_column_write_lands_with_later_sort_change() {
    let storage = Arc::new(CountingStorage::new());
    let mut engine = engine_with(&storage, write_through(), three_people());

    storage.set_fail_writes(true);
    engine.toggle_column_visibility("age");
    storage.set_fail_writes(false);
    engine.set_sort_config(SortConfig::desc("name"));
    engine.close().unwrap();

    let reloaded = engine_with(&storage, write_through(), three_people());
    assert_eq!(reloaded.hidden_columns(), ["age"]);
    assert_eq!(reloaded.sort_config(), &SortConfig::desc("name"));
}

#[test]
fn test_failed_write_lands_on_close() {
    let storage = Arc::new(CountingStorage::new());
    let debounced = EngineConfig::builder().persist_delay_ms(5_000).build();
    let mut engine = engine_with(&storage, debounced, three_people());

    storage.set_fail_writes(true);
    engine.add_custom_filter(filter("f1", "status", Operator::Equals, "open"));
    assert!(engine.flush().failed > 0);
    storage.set_fail_writes(false);
    engine.close().unwrap();

    let reloaded = engine_with(&storage, write_through(), three_people());
    assert_eq!(reloaded.custom_filters().len(), 1);
    assert_eq!(names(&reloaded.view()), vec!["Charlie"]);
}

#[test]
fn test_hydrates_from_stored_config() {
    let storage = Arc::new(CountingStorage::new());
    storage.seed("table-config-version", "\"1.0\"");
    storage.seed("table-sort-config", r#"{"field":"age","direction":"desc"}"#);
    storage.seed("table-hidden-columns", r#"["status"]"#);
    storage.seed(
        "table-custom-filters",
        r#"[{"id":"f1","column":"joined","operator":"starts_with","value":"2024"}]"#,
    );

    let engine = engine_with(&storage, write_through(), three_people());

    assert_eq!(engine.hydration(), &Hydration::Stored);
    assert_eq!(names(&engine.view()), vec!["Charlie", "Bob"]);
    assert!(!engine.is_column_visible("status"));
    assert_eq!(engine.sort_config(), &SortConfig::desc("age"));
}

#[test]
fn test_version_change_discards_stored_config() {
    let storage = Arc::new(CountingStorage::new());
    storage.seed("table-config-version", "\"1.0\"");
    storage.seed("table-hidden-columns", r#"["status"]"#);
    storage.seed(
        "table-custom-filters",
        r#"[{"id":"f1","column":"status","operator":"equals","value":"done"}]"#,
    );

    let config = EngineConfig::builder()
        .persist_delay_ms(5_000)
        .config_version("2.0")
        .build();
    let engine = engine_with(&storage, config, three_people());

    assert!(engine.custom_filters().is_empty());
    assert!(engine.hidden_columns().is_empty());
    assert_eq!(engine.visible_count(), 3);
    assert_eq!(
        engine.hydration(),
        &Hydration::Defaults(VersionCheck::Mismatch {
            found: "1.0".to_string()
        })
    );

    engine.close().unwrap();
    assert_eq!(storage.raw("table-config-version").as_deref(), Some("\"2.0\""));
    assert_eq!(storage.raw("table-custom-filters").as_deref(), Some("[]"));
}

#[test]
fn test_namespaces_are_isolated() {
    let storage = Arc::new(CountingStorage::new());
    let mut first = engine_with(
        &storage,
        EngineConfig::builder().namespace("left").persist_delay(Duration::ZERO).build(),
        three_people(),
    );
    first.toggle_column_visibility("age");

    let second = engine_with(
        &storage,
        EngineConfig::builder().namespace("right").persist_delay(Duration::ZERO).build(),
        three_people(),
    );

    assert!(second.hidden_columns().is_empty());
    assert_eq!(storage.raw("left-hidden-columns").as_deref(), Some(r#"["age"]"#));
}

#[test]
fn test_file_storage_survives_restart() {
    let dir = TempDir::new().unwrap();

    let build = || {
        let backend: Arc<dyn StorageBackend> = Arc::new(FileStorage::open(dir.path()).unwrap());
        TableEngine::builder(person_columns())
            .config(EngineConfig::builder().namespace("people").persist_delay_ms(20).build())
            .records(three_people())
            .storage(backend)
            .build()
            .unwrap()
    };

    let mut first = build();
    first.add_custom_filter(filter("f1", "joined", Operator::StartsWith, "2024"));
    first.handle_column_sort("name");
    first.toggle_column_visibility("nickname");
    let saved = first.persisted_config();
    first.close().unwrap();

    let second = build();

    assert_eq!(second.hydration(), &Hydration::Stored);
    assert_eq!(second.persisted_config(), saved);
    assert_eq!(names(&second.view()), vec!["Bob", "Charlie"]);
    assert!(!second.is_column_visible("nickname"));
}
