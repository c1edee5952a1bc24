//! One-shot `create` and `delete` commands.
//!
//! Setup is idempotent: an existing collection or graph is left alone
//! unless a drop was asked for.

pub mod parts;
pub mod tenants;

pub use parts::SmartGraphParts;
pub use tenants::TenantPaths;

use crate::{
    driver::{DriverReport, WorkloadDriver},
    error::SetupError,
};
use connectors::api::{ClusterApi, CollectionOptions, DatabaseApi, EdgeDefinition, GraphOptions};
use engine_config::settings::{
    collection::{CollectionSettings, FillCollectionSettings, FillSource},
    graph::{SmartGraphSettings, TenantGraphSettings},
};
use engine_core::{
    creator::CollectionCreator,
    error::WorkloadError,
    metrics::Metrics,
    progress::ProgressSender,
    random::RandomSource,
    source::{DocumentSource, EqualLength, FilePairs, KeyedDocuments},
    workload::{edges::EDGE_COLLECTION, graph},
};
use std::sync::Arc;
use tracing::info;

pub const TENANT_GRAPH: &str = "G";
pub const SMART_GRAPH: &str = "SmartGraph";
pub const SMART_VERTICES: &str = "vertices";
pub const SMART_LINKS: &str = "links";

/// Indexed attributes of the `edges` collection.
pub const EDGE_INDEXES: [&str; 3] = ["fromUid", "toUid", "score"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prepared {
    Created,
    /// Found and kept; nothing was changed.
    Existing,
}

/// Creates `name` unless it exists; with `drop` an existing one is removed
/// first.
pub async fn ensure_collection(
    db: &dyn DatabaseApi,
    name: &str,
    options: &CollectionOptions,
    drop: bool,
    progress: &ProgressSender,
) -> Result<Prepared, SetupError> {
    let exists = db
        .collection_exists(name)
        .await
        .map_err(SetupError::client("look for collection", name))?;
    if exists {
        if !drop {
            progress
                .line(format!(
                    "Found collection '{name}' already, setup is already done."
                ))
                .await;
            return Ok(Prepared::Existing);
        }
        db.remove_collection(name)
            .await
            .map_err(SetupError::client("drop collection", name))?;
        info!(collection = name, "Dropped collection");
    }

    db.create_collection(name, options)
        .await
        .map_err(SetupError::client("create collection", name))?;
    info!(collection = name, kind = ?options.kind, shards = options.number_of_shards, "Created collection");
    Ok(Prepared::Created)
}

/// `create edgecol`: the `edges` collection with its persistent indexes.
pub async fn create_edge_collection(
    db: &dyn DatabaseApi,
    settings: &CollectionSettings,
    progress: &ProgressSender,
) -> Result<Prepared, SetupError> {
    let options = CollectionOptions::edges(settings.number_of_shards, settings.replication_factor);
    let prepared = ensure_collection(db, EDGE_COLLECTION, &options, settings.drop, progress).await?;
    if prepared == Prepared::Created {
        for field in EDGE_INDEXES {
            db.ensure_persistent_index(EDGE_COLLECTION, &[field])
                .await
                .map_err(SetupError::client("create index on", field))?;
        }
    }
    Ok(prepared)
}

/// `create graphcols`: plain `instances` and `steps` collections.
pub async fn create_graph_collections(
    db: &dyn DatabaseApi,
    settings: &CollectionSettings,
    progress: &ProgressSender,
) -> Result<(), SetupError> {
    let (shards, replication) = (settings.number_of_shards, settings.replication_factor);
    ensure_collection(
        db,
        graph::VERTEX_COLLECTION,
        &CollectionOptions::documents(shards, replication),
        settings.drop,
        progress,
    )
    .await?;
    ensure_collection(
        db,
        graph::EDGE_COLLECTION,
        &CollectionOptions::edges(shards, replication),
        settings.drop,
        progress,
    )
    .await?;
    Ok(())
}

/// `create batchimport`.
pub async fn create_batchimport_collection(
    db: &dyn DatabaseApi,
    settings: &CollectionSettings,
    progress: &ProgressSender,
) -> Result<Prepared, SetupError> {
    let options = CollectionOptions::documents(settings.number_of_shards, settings.replication_factor);
    ensure_collection(db, &settings.name, &options, settings.drop, progress).await
}

/// The disjoint smart graph of tenant paths.
pub fn tenant_graph() -> GraphOptions {
    GraphOptions {
        name: TENANT_GRAPH.to_string(),
        edge_definitions: vec![EdgeDefinition {
            collection: graph::EDGE_COLLECTION.to_string(),
            from: vec![graph::VERTEX_COLLECTION.to_string()],
            to: vec![graph::VERTEX_COLLECTION.to_string()],
        }],
        is_smart: true,
        smart_graph_attribute: Some("tenantId".to_string()),
        number_of_shards: 3,
        replication_factor: 3,
        is_disjoint: true,
    }
}

/// The disjoint smart graph of connected components.
pub fn smart_graph(shards: u32) -> GraphOptions {
    GraphOptions {
        name: SMART_GRAPH.to_string(),
        edge_definitions: vec![EdgeDefinition {
            collection: SMART_LINKS.to_string(),
            from: vec![SMART_VERTICES.to_string()],
            to: vec![SMART_VERTICES.to_string()],
        }],
        is_smart: true,
        smart_graph_attribute: Some("smartPart".to_string()),
        number_of_shards: shards,
        replication_factor: 3,
        is_disjoint: true,
    }
}

/// Creates the graph unless it exists. Dropping removes the graph and then
/// its edge and vertex collections.
pub async fn ensure_graph(
    db: &dyn DatabaseApi,
    options: &GraphOptions,
    drop: bool,
    progress: &ProgressSender,
) -> Result<Prepared, SetupError> {
    let name = options.name.as_str();
    let exists = db
        .graph_exists(name)
        .await
        .map_err(SetupError::client("look for graph", name))?;
    if exists {
        if !drop {
            progress
                .line(format!(
                    "Found smart graph '{name}' already, setup is already done."
                ))
                .await;
            return Ok(Prepared::Existing);
        }
        db.remove_graph(name)
            .await
            .map_err(SetupError::client("drop graph", name))?;
        for collection in options.collections() {
            db.remove_collection(&collection)
                .await
                .map_err(SetupError::client("drop collection", collection.as_str()))?;
        }
        info!(graph = name, "Dropped graph and its collections");
    }

    db.create_graph(options)
        .await
        .map_err(SetupError::client("create graph", name))?;
    info!(graph = name, shards = options.number_of_shards, "Created graph");
    Ok(Prepared::Created)
}

/// `create graph`: graph `G` plus the paths of every tenant.
pub async fn create_tenant_graph(
    db: Arc<dyn DatabaseApi>,
    settings: TenantGraphSettings,
    progress: ProgressSender,
    seed: u64,
) -> Result<DriverReport, SetupError> {
    ensure_graph(db.as_ref(), &tenant_graph(), settings.drop, &progress).await?;
    let driver = WorkloadDriver::new(progress, seed);
    Ok(driver.run(Arc::new(TenantPaths::new(db, settings))).await?)
}

/// `create smartgraph`: graph `SmartGraph` plus its parts.
pub async fn create_smart_graph(
    db: Arc<dyn DatabaseApi>,
    settings: SmartGraphSettings,
    progress: ProgressSender,
    seed: u64,
) -> Result<DriverReport, SetupError> {
    ensure_graph(db.as_ref(), &smart_graph(settings.shards), settings.drop, &progress).await?;
    let driver = WorkloadDriver::new(progress, seed);
    Ok(driver.run(Arc::new(SmartGraphParts::new(db, settings))).await?)
}

/// Database and collection, each created when missing.
pub async fn open_collection(
    cluster: &dyn ClusterApi,
    database: &str,
    collection: &str,
    shards: u32,
) -> Result<Arc<dyn DatabaseApi>, SetupError> {
    let names = cluster
        .database_names()
        .await
        .map_err(SetupError::client("list databases of", database))?;
    if !names.iter().any(|name| name == database) {
        cluster
            .create_database(database)
            .await
            .map_err(SetupError::client("create database", database))?;
        info!(database, "Created database");
    }

    let db = cluster.database(database);
    let exists = db
        .collection_exists(collection)
        .await
        .map_err(SetupError::client("look for collection", collection))?;
    if !exists {
        db.create_collection(collection, &CollectionOptions::documents(shards, 1))
            .await
            .map_err(SetupError::client("create collection", collection))?;
        info!(database, collection, shards, "Created collection");
    }
    Ok(db)
}

/// `create collection`: fills a collection up to the size the source asks
/// for. Returns the final document count.
pub async fn fill_collection(
    cluster: &dyn ClusterApi,
    settings: &FillCollectionSettings,
    progress: ProgressSender,
    seed: u64,
) -> Result<u64, SetupError> {
    let db = open_collection(cluster, &settings.database, &settings.collection, settings.shards).await?;
    let random = RandomSource::new(seed);
    let source = match &settings.source {
        FillSource::EqualLength { count, size } => {
            DocumentSource::EqualLength(EqualLength::new(*count, *size, random))
        }
        FillSource::File(path) => {
            DocumentSource::FromFile(FilePairs::open(path, random).map_err(WorkloadError::from)?)
        }
        FillSource::Keyed {
            first_seq,
            count,
            payload_size,
            with_geo,
            words,
        } => DocumentSource::Keyed(KeyedDocuments::new(
            *first_seq,
            *count,
            *payload_size,
            *with_geo,
            *words,
            random,
        )),
    };
    let count = CollectionCreator::new(db, &settings.collection, source, Metrics::new(), progress)
        .run()
        .await?;
    Ok(count)
}

/// `delete database`: removes every database whose name does not start
/// with `_`. Returns the removed names.
pub async fn delete_databases(cluster: &dyn ClusterApi) -> Result<Vec<String>, SetupError> {
    let names = cluster
        .database_names()
        .await
        .map_err(SetupError::client("list databases of", "cluster"))?;

    let mut removed = Vec::new();
    for name in names.into_iter().filter(|name| !name.starts_with('_')) {
        cluster
            .remove_database(&name)
            .await
            .map_err(SetupError::client("remove database", name.as_str()))?;
        info!(database = %name, "Removed database");
        removed.push(name);
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::memory::MemoryCluster;
    use engine_config::settings::graph::TenantRange;
    use engine_core::progress::{self, ProgressEvent};
    use serde_json::json;
    use std::io::Write;

    fn drain(rx: &mut tokio::sync::mpsc::Receiver<ProgressEvent>) -> Vec<String> {
        std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.to_string())
            .collect()
    }

    #[tokio::test]
    async fn existing_collection_is_kept_without_drop() {
        let cluster = MemoryCluster::new();
        let db = cluster.database("_system");
        let (progress, mut rx) = progress::channel(16);
        let settings = CollectionSettings::batchimport();

        assert_eq!(
            create_batchimport_collection(db.as_ref(), &settings, &progress)
                .await
                .unwrap(),
            Prepared::Created
        );
        db.create_document("batchimport", &json!({"_key": "a"}), &Default::default())
            .await
            .unwrap();
        assert_eq!(
            create_batchimport_collection(db.as_ref(), &settings, &progress)
                .await
                .unwrap(),
            Prepared::Existing
        );

        assert_eq!(db.count("batchimport").await.unwrap(), 1);
        assert_eq!(
            drain(&mut rx),
            vec!["Found collection 'batchimport' already, setup is already done."]
        );
    }

    #[tokio::test]
    async fn drop_recreates_collection() {
        let cluster = MemoryCluster::new();
        let db = cluster.database("_system");
        let mut settings = CollectionSettings::batchimport();
        let progress = ProgressSender::disabled();

        create_batchimport_collection(db.as_ref(), &settings, &progress)
            .await
            .unwrap();
        db.create_document("batchimport", &json!({}), &Default::default())
            .await
            .unwrap();
        settings.drop = true;
        let prepared = create_batchimport_collection(db.as_ref(), &settings, &progress)
            .await
            .unwrap();

        assert_eq!(prepared, Prepared::Created);
        assert_eq!(db.count("batchimport").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn edge_collection_gets_indexes() {
        let cluster = MemoryCluster::new();
        let db = cluster.database("_system");

        create_edge_collection(
            db.as_ref(),
            &CollectionSettings::edgecol(),
            &ProgressSender::disabled(),
        )
        .await
        .unwrap();

        assert_eq!(
            cluster.indexes("_system", "edges").await,
            vec![vec!["fromUid"], vec!["toUid"], vec!["score"]]
        );
    }

    #[tokio::test]
    async fn graph_collections_are_created() {
        let cluster = MemoryCluster::new();
        let db = cluster.database("_system");

        create_graph_collections(
            db.as_ref(),
            &CollectionSettings::graphcols(),
            &ProgressSender::disabled(),
        )
        .await
        .unwrap();

        assert!(db.collection_exists("instances").await.unwrap());
        assert!(db.collection_exists("steps").await.unwrap());
    }

    #[tokio::test]
    async fn graph_setup_is_idempotent() {
        let cluster = MemoryCluster::new();
        let db = cluster.database("_system");
        let progress = ProgressSender::disabled();

        let first = ensure_graph(db.as_ref(), &tenant_graph(), false, &progress)
            .await
            .unwrap();
        let second = ensure_graph(db.as_ref(), &tenant_graph(), false, &progress)
            .await
            .unwrap();
        let dropped = ensure_graph(db.as_ref(), &tenant_graph(), true, &progress)
            .await
            .unwrap();

        assert_eq!(
            (first, second, dropped),
            (Prepared::Created, Prepared::Existing, Prepared::Created)
        );
        let graph = cluster.graph("_system", "G").await.unwrap();
        assert!(graph.is_disjoint);
        assert_eq!(graph.smart_graph_attribute.as_deref(), Some("tenantId"));
    }

    #[tokio::test]
    async fn tenant_graph_holds_every_path() {
        let cluster = MemoryCluster::new();
        let settings = TenantGraphSettings {
            tenants: TenantRange {
                first: 4,
                last: 5,
                paths_per_tenant: 3,
            },
            parallelism: 2,
            drop: false,
        };

        let report = create_tenant_graph(
            cluster.database("_system"),
            settings,
            ProgressSender::disabled(),
            7,
        )
        .await
        .unwrap();

        assert_eq!(report.jobs, 2);
        let db = cluster.database("_system");
        assert_eq!(db.count("instances").await.unwrap(), 18);
        assert_eq!(db.count("steps").await.unwrap(), 12);
        let stored = db
            .read_document("instances", "ten5:M3", &Default::default())
            .await
            .unwrap();
        assert_eq!(stored["tenantId"], "ten5");
    }

    #[tokio::test]
    async fn fill_creates_database_and_collection() {
        let cluster = MemoryCluster::new();
        let settings = FillCollectionSettings {
            database: "bench".into(),
            collection: "docs".into(),
            shards: 2,
            source: FillSource::EqualLength { count: 10, size: 100 },
        };

        let count = fill_collection(&cluster, &settings, ProgressSender::disabled(), 1)
            .await
            .unwrap();

        assert_eq!(count, 10);
        assert_eq!(cluster.documents("bench", "docs").await.len(), 10);
    }

    #[tokio::test]
    async fn fill_from_file_reads_pairs() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "2 10\n3 5").unwrap();
        let cluster = MemoryCluster::new();
        let mut settings = FillCollectionSettings::new(FillSource::File(file.path().into()));
        settings.collection = "sized".into();

        let count = fill_collection(&cluster, &settings, ProgressSender::disabled(), 1)
            .await
            .unwrap();

        assert_eq!(count, 5);
    }

    #[tokio::test]
    async fn keyed_fill_resumes_without_duplicates() {
        let cluster = MemoryCluster::new();
        let mut settings = FillCollectionSettings::new(FillSource::Keyed {
            first_seq: 100,
            count: 6,
            payload_size: 16,
            with_geo: true,
            words: 2,
        });
        settings.collection = "keyed".into();

        for _ in 0..2 {
            let count = fill_collection(&cluster, &settings, ProgressSender::disabled(), 1)
                .await
                .unwrap();
            assert_eq!(count, 6);
        }

        assert_eq!(cluster.bulk_calls("_system", "keyed").await, vec![6]);
        let db = cluster.database("_system");
        let stored = db
            .read_document("keyed", &engine_core::keys::document_key(100), &Default::default())
            .await
            .unwrap();
        assert_eq!(stored["sha"], engine_core::keys::document_sha(100));
        assert!(stored.get("geo").is_some());
    }

    #[tokio::test]
    async fn delete_keeps_system_databases() {
        let cluster = MemoryCluster::new();
        cluster.create_database("bench").await.unwrap();
        cluster.create_database("other").await.unwrap();

        let removed = delete_databases(&cluster).await.unwrap();

        assert_eq!(removed, vec!["bench", "other"]);
        assert_eq!(cluster.database_names().await.unwrap(), vec!["_system"]);
    }
}
