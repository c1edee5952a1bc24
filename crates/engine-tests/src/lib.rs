#![allow(dead_code)]

use connectors::{api::CollectionOptions, memory::MemoryCluster};
use engine_config::settings::{
    checksum::ChecksumSettings,
    connection::{ConnectionSettings, Credentials},
};

pub mod utils;

const SYSTEM: &str = "_system";

/// Checksum settings for two in-memory clusters; endpoints are never dialed.
fn checksum_settings() -> ChecksumSettings {
    let conn = ConnectionSettings::new(
        &["http://localhost:8529".to_string()],
        Credentials::Jwt("superuser".into()),
    );
    ChecksumSettings::new(conn.clone(), conn)
}

/// A cluster whose collections carry fixed shard checksums, given as
/// `(database, collection, [(shard, checksum)])`.
async fn cluster_with(collections: &[(&str, &str, &[(&str, &str)])]) -> MemoryCluster {
    let cluster = MemoryCluster::new();
    for (db, name, shards) in collections {
        cluster
            .add_collection(db, name, CollectionOptions::default())
            .await
            .expect("add collection");
        cluster
            .set_shard_checksums(db, name, shards)
            .await
            .expect("set shard checksums");
    }
    cluster
}
