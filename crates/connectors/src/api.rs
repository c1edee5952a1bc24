use crate::error::ClientError;
use async_trait::async_trait;
use model::inventory::{ClusterHealth, CollectionType, InventoryCollection};
use serde::Serialize;
use serde_json::Value;
use std::{sync::Arc, time::Duration};

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionOptions {
    pub kind: CollectionType,
    pub number_of_shards: u32,
    pub replication_factor: u32,
}

impl Default for CollectionOptions {
    fn default() -> Self {
        Self {
            kind: CollectionType::Document,
            number_of_shards: 1,
            replication_factor: 1,
        }
    }
}

impl CollectionOptions {
    pub fn documents(number_of_shards: u32, replication_factor: u32) -> Self {
        Self {
            kind: CollectionType::Document,
            number_of_shards,
            replication_factor,
        }
    }

    pub fn edges(number_of_shards: u32, replication_factor: u32) -> Self {
        Self {
            kind: CollectionType::Edge,
            number_of_shards,
            replication_factor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeDefinition {
    pub collection: String,
    pub from: Vec<String>,
    pub to: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphOptions {
    pub name: String,
    pub edge_definitions: Vec<EdgeDefinition>,
    pub is_smart: bool,
    pub smart_graph_attribute: Option<String>,
    pub number_of_shards: u32,
    pub replication_factor: u32,
    pub is_disjoint: bool,
}

impl GraphOptions {
    /// Collections (edge and vertex) the graph definition refers to.
    pub fn collections(&self) -> Vec<String> {
        let mut names = Vec::new();
        for def in &self.edge_definitions {
            for name in std::iter::once(&def.collection)
                .chain(def.from.iter())
                .chain(def.to.iter())
            {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionId(pub String);

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Keep the stored document when a key already exists instead of failing.
    pub overwrite_ignore: bool,
    pub transaction: Option<TransactionId>,
    pub timeout: Option<Duration>,
}

impl WriteOptions {
    pub fn ignore_existing() -> Self {
        Self {
            overwrite_ignore: true,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn in_transaction(mut self, id: TransactionId) -> Self {
        self.transaction = Some(id);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Allow the coordinator to answer from a follower.
    pub allow_dirty_read: bool,
    pub timeout: Option<Duration>,
}

/// One cluster, as seen through its coordinators.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn database_names(&self) -> Result<Vec<String>, ClientError>;

    /// Handle to a database; no round trip is made.
    fn database(&self, name: &str) -> Arc<dyn DatabaseApi>;

    async fn create_database(&self, name: &str) -> Result<(), ClientError>;
    async fn remove_database(&self, name: &str) -> Result<(), ClientError>;

    async fn health(&self) -> Result<ClusterHealth, ClientError>;

    /// Checksum of one shard, asked directly from the DB server at `endpoint`.
    async fn shard_checksum(
        &self,
        endpoint: &str,
        database: &str,
        shard: &str,
        timeout: Duration,
    ) -> Result<String, ClientError>;
}

/// One database of a cluster.
#[async_trait]
pub trait DatabaseApi: Send + Sync {
    fn name(&self) -> &str;

    // Collections
    async fn collection_exists(&self, name: &str) -> Result<bool, ClientError>;
    async fn create_collection(
        &self,
        name: &str,
        options: &CollectionOptions,
    ) -> Result<(), ClientError>;
    async fn remove_collection(&self, name: &str) -> Result<(), ClientError>;
    async fn ensure_persistent_index(
        &self,
        collection: &str,
        fields: &[&str],
    ) -> Result<(), ClientError>;
    async fn count(&self, collection: &str) -> Result<u64, ClientError>;

    // Graphs
    async fn graph_exists(&self, name: &str) -> Result<bool, ClientError>;
    async fn create_graph(&self, options: &GraphOptions) -> Result<(), ClientError>;
    async fn remove_graph(&self, name: &str) -> Result<(), ClientError>;

    // Documents
    async fn create_documents(
        &self,
        collection: &str,
        docs: &[Value],
        options: &WriteOptions,
    ) -> Result<(), ClientError>;
    async fn import_documents(
        &self,
        collection: &str,
        docs: &[Value],
        options: &WriteOptions,
    ) -> Result<(), ClientError>;
    async fn create_document(
        &self,
        collection: &str,
        doc: &Value,
        options: &WriteOptions,
    ) -> Result<(), ClientError>;
    async fn replace_document(
        &self,
        collection: &str,
        key: &str,
        doc: &Value,
        options: &WriteOptions,
    ) -> Result<(), ClientError>;
    async fn read_document(
        &self,
        collection: &str,
        key: &str,
        options: &ReadOptions,
    ) -> Result<Value, ClientError>;

    // Stream transactions
    async fn begin_transaction(&self, write: &[&str]) -> Result<TransactionId, ClientError>;
    async fn commit_transaction(&self, id: &TransactionId) -> Result<(), ClientError>;
    async fn abort_transaction(&self, id: &TransactionId) -> Result<(), ClientError>;

    /// Runs an AQL query and drains the cursor.
    async fn query(&self, aql: &str) -> Result<Vec<Value>, ClientError>;

    async fn inventory(&self) -> Result<Vec<InventoryCollection>, ClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_collections_are_deduplicated() {
        let options = GraphOptions {
            name: "G".into(),
            edge_definitions: vec![EdgeDefinition {
                collection: "steps".into(),
                from: vec!["instances".into()],
                to: vec!["instances".into()],
            }],
            is_smart: true,
            smart_graph_attribute: Some("tenantId".into()),
            number_of_shards: 3,
            replication_factor: 3,
            is_disjoint: true,
        };

        assert_eq!(options.collections(), vec!["steps", "instances"]);
    }
}
