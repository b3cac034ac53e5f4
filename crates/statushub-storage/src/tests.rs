use crate::store::SqliteSyncStore;
use crate::SyncStore;
use statushub_common::types::{
    ComponentStatus, CreateDataSourceRequest, Incident, IncidentSeverity, IncidentStatus,
    ServiceComponent,
};
use std::time::Duration;
use tempfile::TempDir;

fn setup() -> (TempDir, SqliteSyncStore) {
    statushub_common::id::init(1, 1);
    let dir = TempDir::new().unwrap();
    let store = SqliteSyncStore::new(dir.path()).unwrap();
    (dir, store)
}

fn make_source(store: &SqliteSyncStore, name: &str) -> String {
    store
        .create_data_source(&CreateDataSourceRequest {
            name: name.to_string(),
            source_type: "statuspage".to_string(),
            base_url: format!("https://{name}.example.com"),
            credentials: None,
            sync_interval_secs: None,
        })
        .unwrap()
        .id
}

fn make_incident(source_id: &str, external_id: &str, title: &str) -> Incident {
    Incident {
        external_id: external_id.to_string(),
        data_source_id: source_id.to_string(),
        system_name: "Example".to_string(),
        title: title.to_string(),
        description: Some("Elevated error rates.".to_string()),
        status: IncidentStatus::Monitoring,
        severity: IncidentSeverity::Critical,
        impact: Some("major".to_string()),
        started_at: Some(chrono::Utc::now() - chrono::Duration::hours(1)),
        resolved_at: None,
        updated_at: Some(chrono::Utc::now()),
        external_url: Some("https://stspg.io/x".to_string()),
        affected_services: vec!["API".to_string()],
        tags: vec!["incident".to_string()],
        metadata: serde_json::json!({ "impact": "major" }),
        is_active: true,
    }
}

#[test]
fn create_and_list_data_sources() {
    let (_dir, store) = setup();
    assert!(store.list_data_sources().unwrap().is_empty());

    let id = make_source(&store, "github");
    let sources = store.list_data_sources().unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].id, id);
    assert_eq!(sources[0].source_type, "statuspage");
    assert!(sources[0].is_active);
    assert_eq!(sources[0].retry_count, 0);
    assert!(sources[0].last_sync_at.is_none());

    let fetched = store.get_data_source(&id).unwrap().unwrap();
    assert_eq!(fetched.name, "github");
    assert!(store.get_data_source("missing").unwrap().is_none());
}

#[test]
fn deactivated_source_keeps_row_but_flips_flag() {
    let (_dir, store) = setup();
    let id = make_source(&store, "github");

    store.set_data_source_active(&id, false).unwrap();
    let source = store.get_data_source(&id).unwrap().unwrap();
    assert!(!source.is_active);

    assert!(store.set_data_source_active("missing", false).is_err());
}

#[test]
fn upserting_same_incident_twice_keeps_one_row_and_refreshes_updated_at() {
    let (_dir, store) = setup();
    let source_id = make_source(&store, "github");
    let incident = make_incident(&source_id, "inc-1", "Elevated API errors");

    store.upsert_incident(&incident).unwrap();
    let first = store.list_incidents(None, false).unwrap();
    assert_eq!(first.len(), 1);

    std::thread::sleep(Duration::from_millis(10));
    store.upsert_incident(&incident).unwrap();

    let second = store.list_incidents(None, false).unwrap();
    assert_eq!(second.len(), 1, "re-running an upsert must not duplicate rows");
    assert_eq!(second[0].id, first[0].id);
    assert_eq!(second[0].created_at, first[0].created_at);
    assert!(second[0].updated_at > first[0].updated_at);
}

#[test]
fn second_poll_with_changed_title_overwrites_in_place() {
    let (_dir, store) = setup();
    let source_id = make_source(&store, "github");

    store
        .upsert_incident(&make_incident(&source_id, "inc-1", "Initial title"))
        .unwrap();
    let first = store.list_incidents(None, false).unwrap();

    std::thread::sleep(Duration::from_millis(10));
    store
        .upsert_incident(&make_incident(&source_id, "inc-1", "Corrected title"))
        .unwrap();

    let rows = store.list_incidents(None, false).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].title, "Corrected title");
    assert!(rows[0].updated_at > first[0].updated_at);
}

#[test]
fn same_external_id_under_different_sources_stays_distinct() {
    let (_dir, store) = setup();
    let source_a = make_source(&store, "github");
    let source_b = make_source(&store, "cloudflare");

    store
        .upsert_incident(&make_incident(&source_a, "inc-1", "A incident"))
        .unwrap();
    store
        .upsert_incident(&make_incident(&source_b, "inc-1", "B incident"))
        .unwrap();

    assert_eq!(store.list_incidents(None, false).unwrap().len(), 2);
    let only_a = store.list_incidents(Some(&source_a), false).unwrap();
    assert_eq!(only_a.len(), 1);
    assert_eq!(only_a[0].title, "A incident");
}

#[test]
fn incident_fields_round_trip_through_storage() {
    let (_dir, store) = setup();
    let source_id = make_source(&store, "github");
    store
        .upsert_incident(&make_incident(&source_id, "inc-1", "Elevated API errors"))
        .unwrap();

    let row = store.list_incidents(None, false).unwrap().remove(0);
    assert_eq!(row.external_id, "inc-1");
    assert_eq!(row.status, IncidentStatus::Monitoring);
    assert_eq!(row.severity, IncidentSeverity::Critical);
    assert_eq!(row.impact.as_deref(), Some("major"));
    assert_eq!(row.affected_services, vec!["API"]);
    assert_eq!(row.tags, vec!["incident"]);
    assert_eq!(row.metadata["impact"], "major");
    assert!(row.is_active);
    assert!(row.started_at.is_some());
    assert!(row.resolved_at.is_none());
}

#[test]
fn active_only_filter_hides_resolved_incidents() {
    let (_dir, store) = setup();
    let source_id = make_source(&store, "github");

    let mut resolved = make_incident(&source_id, "inc-old", "Old outage");
    resolved.status = IncidentStatus::Resolved;
    resolved.is_active = false;
    store.upsert_incident(&resolved).unwrap();
    store
        .upsert_incident(&make_incident(&source_id, "inc-new", "Ongoing outage"))
        .unwrap();

    assert_eq!(store.list_incidents(None, false).unwrap().len(), 2);
    let active = store.list_incidents(None, true).unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].external_id, "inc-new");
}

#[test]
fn upserting_component_twice_keeps_one_row() {
    let (_dir, store) = setup();
    let source_id = make_source(&store, "github");
    let component = ServiceComponent {
        external_id: "comp-1".to_string(),
        data_source_id: source_id.clone(),
        name: "API Requests".to_string(),
        status: ComponentStatus::PartialOutage,
        group_name: Some("core".to_string()),
        position: Some(1),
        show_uptime: true,
    };

    store.upsert_service_component(&component).unwrap();
    let mut renamed = component.clone();
    renamed.name = "API".to_string();
    renamed.status = ComponentStatus::Operational;
    store.upsert_service_component(&renamed).unwrap();

    let rows = store.list_service_components(Some(&source_id)).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "API");
    assert_eq!(rows[0].status, ComponentStatus::Operational);
    assert_eq!(rows[0].group_name.as_deref(), Some("core"));
}

#[test]
fn sync_outcome_failure_increments_and_success_resets() {
    let (_dir, store) = setup();
    let id = make_source(&store, "github");

    store
        .record_sync_outcome(&id, Some("connect timeout"))
        .unwrap();
    store
        .record_sync_outcome(&id, Some("connect timeout"))
        .unwrap();
    let source = store.get_data_source(&id).unwrap().unwrap();
    assert_eq!(source.retry_count, 2);
    assert_eq!(source.last_error.as_deref(), Some("connect timeout"));
    assert!(source.last_sync_at.is_some());

    store.record_sync_outcome(&id, None).unwrap();
    let source = store.get_data_source(&id).unwrap().unwrap();
    assert_eq!(source.retry_count, 0);
    assert!(source.last_error.is_none());

    assert!(store.record_sync_outcome("missing", None).is_err());
}
