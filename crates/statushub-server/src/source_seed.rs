use statushub_common::types::CreateDataSourceRequest;
use statushub_storage::SyncStore;

/// Default data source definitions for first-time startup. All defaults are
/// public Statuspage feeds, so a fresh install syncs real data without any
/// credential configuration.
struct SourceDef {
    name: &'static str,
    source_type: &'static str,
    base_url: &'static str,
}

const DEFAULT_SOURCES: &[SourceDef] = &[
    SourceDef {
        name: "GitHub",
        source_type: "statuspage",
        base_url: "https://www.githubstatus.com",
    },
    SourceDef {
        name: "Cloudflare",
        source_type: "statuspage",
        base_url: "https://www.cloudflarestatus.com",
    },
    SourceDef {
        name: "Dropbox",
        source_type: "statuspage",
        base_url: "https://status.dropbox.com",
    },
];

/// Create the default data sources if the store has none yet.
///
/// Individual creation failures are logged and skipped; an error from the
/// initial listing propagates to the caller, since it means the engine
/// cannot start at all.
pub fn init_default_sources(store: &dyn SyncStore) -> anyhow::Result<usize> {
    let existing = store.list_data_sources()?;
    if !existing.is_empty() {
        tracing::debug!("Data sources already exist, skipping seed initialization");
        return Ok(0);
    }

    let mut created = 0;
    for def in DEFAULT_SOURCES {
        let request = CreateDataSourceRequest {
            name: def.name.to_string(),
            source_type: def.source_type.to_string(),
            base_url: def.base_url.to_string(),
            credentials: None,
            sync_interval_secs: None,
        };
        match store.create_data_source(&request) {
            Ok(source) => {
                tracing::info!(
                    name = def.name,
                    source_type = def.source_type,
                    id = %source.id,
                    "Created default data source"
                );
                created += 1;
            }
            Err(e) => {
                tracing::error!(
                    name = def.name,
                    error = %e,
                    "Failed to create default data source"
                );
            }
        }
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use statushub_storage::SqliteSyncStore;
    use tempfile::TempDir;

    fn setup() -> (TempDir, SqliteSyncStore) {
        statushub_common::id::init(1, 1);
        let dir = TempDir::new().unwrap();
        let store = SqliteSyncStore::new(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn seeds_exactly_once_on_empty_store() {
        let (_dir, store) = setup();

        let created = init_default_sources(&store).unwrap();
        assert_eq!(created, DEFAULT_SOURCES.len());

        let sources = store.list_data_sources().unwrap();
        assert_eq!(sources.len(), DEFAULT_SOURCES.len());
        assert!(sources.iter().all(|s| s.source_type == "statuspage"));
        assert!(sources.iter().all(|s| s.is_active));

        // A second bootstrap must be a no-op.
        let created = init_default_sources(&store).unwrap();
        assert_eq!(created, 0);
        assert_eq!(store.list_data_sources().unwrap().len(), DEFAULT_SOURCES.len());
    }

    #[test]
    fn does_not_seed_when_sources_already_exist() {
        let (_dir, store) = setup();
        store
            .create_data_source(&CreateDataSourceRequest {
                name: "Existing".to_string(),
                source_type: "statuspage".to_string(),
                base_url: "https://status.example.com".to_string(),
                credentials: None,
                sync_interval_secs: None,
            })
            .unwrap();

        let created = init_default_sources(&store).unwrap();
        assert_eq!(created, 0);
        assert_eq!(store.list_data_sources().unwrap().len(), 1);
    }
}
