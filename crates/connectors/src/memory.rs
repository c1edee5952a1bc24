//! In-process cluster used by tests and dry runs.
//!
//! Collections keep their documents in memory, shards are virtual and their
//! checksums are derived from the documents unless set explicitly. Failures
//! can be injected per operation.

use crate::{
    api::{
        ClusterApi, CollectionOptions, DatabaseApi, GraphOptions, ReadOptions, TransactionId,
        WriteOptions,
    },
    error::ClientError,
};
use async_trait::async_trait;
use model::inventory::{
    ClusterHealth, CollectionParameters, CollectionType, InventoryCollection, ServerHealth,
    ServerRole,
};
use serde_json::Value;
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    hash::{DefaultHasher, Hash, Hasher},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::sync::Mutex;

const SERVERS: [&str; 3] = ["PRMR-1", "PRMR-2", "PRMR-3"];

pub type QueryHandler = Arc<dyn Fn(&str) -> Vec<Value> + Send + Sync>;

#[derive(Debug, Clone)]
struct Shard {
    id: String,
    server: String,
    checksum: Option<String>,
}

#[derive(Debug)]
struct CollectionState {
    kind: CollectionType,
    is_smart: bool,
    docs: BTreeMap<String, Value>,
    shards: Vec<Shard>,
    bulk_calls: Vec<usize>,
    indexes: Vec<Vec<String>>,
}

impl CollectionState {
    fn shard_of(&self, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.shards.len().max(1) as u64) as usize
    }

    fn computed_checksum(&self, shard_index: usize) -> String {
        let mut hasher = DefaultHasher::new();
        for (key, doc) in &self.docs {
            if self.shard_of(key) == shard_index {
                key.hash(&mut hasher);
                doc.to_string().hash(&mut hasher);
            }
        }
        hasher.finish().to_string()
    }
}

#[derive(Debug, Default)]
struct DatabaseState {
    collections: BTreeMap<String, CollectionState>,
    graphs: BTreeMap<String, GraphOptions>,
}

#[derive(Default)]
struct ClusterState {
    databases: BTreeMap<String, DatabaseState>,
    next_shard: u64,
    next_key: u64,
    next_trx: u64,
    transactions: HashMap<String, Vec<(String, Value)>>,
    fail_database_listing: bool,
    fail_inventory: HashSet<String>,
    fail_bulk: HashMap<String, usize>,
    fail_checksums: HashSet<String>,
    checksum_delay: Duration,
    shard_delays: HashMap<String, Duration>,
    query_handler: Option<QueryHandler>,
    queries: Vec<String>,
}

impl ClusterState {
    fn db(&mut self, name: &str) -> Result<&mut DatabaseState, ClientError> {
        self.databases
            .get_mut(name)
            .ok_or_else(|| ClientError::NotFound(format!("database '{name}'")))
    }

    fn collection(
        &mut self,
        db: &str,
        name: &str,
    ) -> Result<&mut CollectionState, ClientError> {
        self.db(db)?
            .collections
            .get_mut(name)
            .ok_or_else(|| ClientError::NotFound(format!("collection '{db}.{name}'")))
    }

    fn create_collection(
        &mut self,
        db: &str,
        name: &str,
        options: &CollectionOptions,
    ) -> Result<(), ClientError> {
        let mut shards = Vec::new();
        for i in 0..options.number_of_shards.max(1) as usize {
            self.next_shard += 1;
            shards.push(Shard {
                id: format!("s{}", self.next_shard),
                server: SERVERS[i % SERVERS.len()].to_string(),
                checksum: None,
            });
        }

        let database = self.db(db)?;
        if database.collections.contains_key(name) {
            return Err(ClientError::Conflict(format!("duplicate name '{name}'")));
        }
        database.collections.insert(
            name.to_string(),
            CollectionState {
                kind: options.kind,
                is_smart: false,
                docs: BTreeMap::new(),
                shards,
                bulk_calls: Vec::new(),
                indexes: Vec::new(),
            },
        );
        Ok(())
    }

    fn key_for(&mut self, doc: &Value) -> String {
        match doc.get("_key").and_then(Value::as_str) {
            Some(key) => key.to_string(),
            None => {
                self.next_key += 1;
                self.next_key.to_string()
            }
        }
    }

    /// Inserts documents; conflicting keys are skipped. Returns rejected count.
    fn insert(
        &mut self,
        db: &str,
        collection: &str,
        docs: &[Value],
    ) -> Result<usize, ClientError> {
        let keyed: Vec<(String, Value)> = docs
            .iter()
            .map(|doc| {
                let key = self.key_for(doc);
                let mut doc = doc.clone();
                if let Value::Object(map) = &mut doc {
                    map.insert("_key".into(), Value::String(key.clone()));
                }
                (key, doc)
            })
            .collect();

        let state = self.collection(db, collection)?;
        let mut rejected = 0;
        for (key, doc) in keyed {
            if state.docs.contains_key(&key) {
                rejected += 1;
            } else {
                state.docs.insert(key, doc);
            }
        }
        Ok(rejected)
    }

    fn bulk(
        &mut self,
        db: &str,
        collection: &str,
        docs: &[Value],
        options: &WriteOptions,
    ) -> Result<(), ClientError> {
        let calls = {
            let state = self.collection(db, collection)?;
            state.bulk_calls.push(docs.len());
            state.bulk_calls.len()
        };
        if self.fail_bulk.get(collection) == Some(&calls) {
            return Err(ClientError::Server {
                status: 503,
                error_num: 503,
                message: format!("injected failure on bulk call {calls}"),
            });
        }

        match &options.transaction {
            Some(id) => {
                let pending = self
                    .transactions
                    .get_mut(&id.0)
                    .ok_or_else(|| ClientError::NotFound(format!("transaction {id}")))?;
                pending.extend(docs.iter().map(|d| (collection.to_string(), d.clone())));
            }
            None => {
                self.insert(db, collection, docs)?;
            }
        }
        Ok(())
    }
}

/// A cluster living in process memory.
#[derive(Clone)]
pub struct MemoryCluster {
    state: Arc<Mutex<ClusterState>>,
    checksum_calls: Arc<InFlight>,
}

/// Concurrent shard checksum calls, current and highest seen.
#[derive(Debug, Default)]
struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

struct InFlightGuard(Arc<InFlight>);

impl InFlight {
    fn enter(self: &Arc<Self>) -> InFlightGuard {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        InFlightGuard(self.clone())
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MemoryCluster {
    /// New cluster holding only the `_system` database.
    pub fn new() -> Self {
        let mut state = ClusterState::default();
        state
            .databases
            .insert("_system".to_string(), DatabaseState::default());
        Self {
            state: Arc::new(Mutex::new(state)),
            checksum_calls: Arc::default(),
        }
    }

    /// Creates database and collection when missing.
    pub async fn add_collection(
        &self,
        db: &str,
        name: &str,
        options: CollectionOptions,
    ) -> Result<(), ClientError> {
        let mut state = self.state.lock().await;
        state.databases.entry(db.to_string()).or_default();
        state.create_collection(db, name, &options)
    }

    /// Replaces the shard layout of a collection with fixed checksums.
    pub async fn set_shard_checksums(
        &self,
        db: &str,
        collection: &str,
        shards: &[(&str, &str)],
    ) -> Result<(), ClientError> {
        let mut state = self.state.lock().await;
        let col = state.collection(db, collection)?;
        col.shards = shards
            .iter()
            .enumerate()
            .map(|(i, (id, checksum))| Shard {
                id: id.to_string(),
                server: SERVERS[i % SERVERS.len()].to_string(),
                checksum: Some(checksum.to_string()),
            })
            .collect();
        Ok(())
    }

    pub async fn mark_smart(&self, db: &str, collection: &str) -> Result<(), ClientError> {
        let mut state = self.state.lock().await;
        state.collection(db, collection)?.is_smart = true;
        Ok(())
    }

    pub async fn fail_database_listing(&self) {
        self.state.lock().await.fail_database_listing = true;
    }

    pub async fn fail_inventory(&self, db: &str) {
        self.state.lock().await.fail_inventory.insert(db.to_string());
    }

    /// The `nth` (1-based) bulk write into `collection` fails.
    pub async fn fail_bulk_call(&self, collection: &str, nth: usize) {
        self.state
            .lock()
            .await
            .fail_bulk
            .insert(collection.to_string(), nth);
    }

    /// Every shard checksum call sleeps for `delay` before answering.
    pub async fn delay_checksums(&self, delay: Duration) {
        self.state.lock().await.checksum_delay = delay;
    }

    /// Calls for `shard` sleep for `delay` instead of the common delay.
    pub async fn delay_shard_checksum(&self, shard: &str, delay: Duration) {
        self.state
            .lock()
            .await
            .shard_delays
            .insert(shard.to_string(), delay);
    }

    /// Most shard checksum calls that were running at the same time.
    pub fn peak_checksum_calls(&self) -> usize {
        self.checksum_calls.peak.load(Ordering::SeqCst)
    }

    pub async fn fail_shard_checksum(&self, shard: &str) {
        self.state
            .lock()
            .await
            .fail_checksums
            .insert(shard.to_string());
    }

    pub async fn set_query_handler<F>(&self, handler: F)
    where
        F: Fn(&str) -> Vec<Value> + Send + Sync + 'static,
    {
        self.state.lock().await.query_handler = Some(Arc::new(handler));
    }

    /// Sizes of the bulk writes issued against a collection, in order.
    pub async fn bulk_calls(&self, db: &str, collection: &str) -> Vec<usize> {
        let mut state = self.state.lock().await;
        state
            .collection(db, collection)
            .map(|c| c.bulk_calls.clone())
            .unwrap_or_default()
    }

    pub async fn documents(&self, db: &str, collection: &str) -> Vec<Value> {
        let mut state = self.state.lock().await;
        state
            .collection(db, collection)
            .map(|c| c.docs.values().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn indexes(&self, db: &str, collection: &str) -> Vec<Vec<String>> {
        let mut state = self.state.lock().await;
        state
            .collection(db, collection)
            .map(|c| c.indexes.clone())
            .unwrap_or_default()
    }

    pub async fn graph(&self, db: &str, name: &str) -> Option<GraphOptions> {
        let state = self.state.lock().await;
        state
            .databases
            .get(db)
            .and_then(|d| d.graphs.get(name).cloned())
    }

    pub async fn queries(&self) -> Vec<String> {
        self.state.lock().await.queries.clone()
    }

    pub async fn open_transactions(&self) -> usize {
        self.state.lock().await.transactions.len()
    }
}

impl Default for MemoryCluster {
    fn default() -> Self {
        Self::new()
    }
}

fn server_endpoint(server: &str) -> String {
    format!("tcp://{}:8530", server.to_lowercase())
}

#[async_trait]
impl ClusterApi for MemoryCluster {
    async fn database_names(&self) -> Result<Vec<String>, ClientError> {
        let state = self.state.lock().await;
        if state.fail_database_listing {
            return Err(ClientError::Server {
                status: 503,
                error_num: 503,
                message: "injected failure listing databases".into(),
            });
        }
        Ok(state.databases.keys().cloned().collect())
    }

    fn database(&self, name: &str) -> Arc<dyn DatabaseApi> {
        Arc::new(MemoryDatabase {
            cluster: self.clone(),
            name: name.to_string(),
        })
    }

    async fn create_database(&self, name: &str) -> Result<(), ClientError> {
        let mut state = self.state.lock().await;
        if state.databases.contains_key(name) {
            return Err(ClientError::Conflict(format!("duplicate database '{name}'")));
        }
        state
            .databases
            .insert(name.to_string(), DatabaseState::default());
        Ok(())
    }

    async fn remove_database(&self, name: &str) -> Result<(), ClientError> {
        let mut state = self.state.lock().await;
        state
            .databases
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ClientError::NotFound(format!("database '{name}'")))
    }

    async fn health(&self) -> Result<ClusterHealth, ClientError> {
        let mut health = HashMap::new();
        for server in SERVERS {
            health.insert(
                server.to_string(),
                ServerHealth {
                    role: ServerRole::DBServer,
                    endpoint: server_endpoint(server),
                },
            );
        }
        health.insert(
            "CRDN-1".to_string(),
            ServerHealth {
                role: ServerRole::Coordinator,
                endpoint: "tcp://crdn-1:8529".to_string(),
            },
        );
        Ok(ClusterHealth { health })
    }

    async fn shard_checksum(
        &self,
        endpoint: &str,
        database: &str,
        shard: &str,
        _timeout: Duration,
    ) -> Result<String, ClientError> {
        let _running = self.checksum_calls.enter();
        let delay = {
            let state = self.state.lock().await;
            state
                .shard_delays
                .get(shard)
                .copied()
                .unwrap_or(state.checksum_delay)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().await;
        if state.fail_checksums.contains(shard) {
            return Err(ClientError::Server {
                status: 500,
                error_num: 500,
                message: format!("injected checksum failure for shard {shard}"),
            });
        }

        let db = state.db(database)?;
        for collection in db.collections.values() {
            if let Some(pos) = collection.shards.iter().position(|s| s.id == shard) {
                let found = &collection.shards[pos];
                if server_endpoint(&found.server) != endpoint {
                    return Err(ClientError::NotFound(format!(
                        "shard {shard} is not on {endpoint}"
                    )));
                }
                return Ok(found
                    .checksum
                    .clone()
                    .unwrap_or_else(|| collection.computed_checksum(pos)));
            }
        }
        Err(ClientError::NotFound(format!("shard {shard}")))
    }
}

pub struct MemoryDatabase {
    cluster: MemoryCluster,
    name: String,
}

#[async_trait]
impl DatabaseApi for MemoryDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    async fn collection_exists(&self, name: &str) -> Result<bool, ClientError> {
        let mut state = self.cluster.state.lock().await;
        Ok(state.db(&self.name)?.collections.contains_key(name))
    }

    async fn create_collection(
        &self,
        name: &str,
        options: &CollectionOptions,
    ) -> Result<(), ClientError> {
        let mut state = self.cluster.state.lock().await;
        state.create_collection(&self.name, name, options)
    }

    async fn remove_collection(&self, name: &str) -> Result<(), ClientError> {
        let mut state = self.cluster.state.lock().await;
        state
            .db(&self.name)?
            .collections
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ClientError::NotFound(format!("collection '{name}'")))
    }

    async fn ensure_persistent_index(
        &self,
        collection: &str,
        fields: &[&str],
    ) -> Result<(), ClientError> {
        let mut state = self.cluster.state.lock().await;
        let col = state.collection(&self.name, collection)?;
        let fields: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
        if !col.indexes.contains(&fields) {
            col.indexes.push(fields);
        }
        Ok(())
    }

    async fn count(&self, collection: &str) -> Result<u64, ClientError> {
        let mut state = self.cluster.state.lock().await;
        Ok(state.collection(&self.name, collection)?.docs.len() as u64)
    }

    async fn graph_exists(&self, name: &str) -> Result<bool, ClientError> {
        let mut state = self.cluster.state.lock().await;
        Ok(state.db(&self.name)?.graphs.contains_key(name))
    }

    async fn create_graph(&self, options: &GraphOptions) -> Result<(), ClientError> {
        let mut state = self.cluster.state.lock().await;
        if state.db(&self.name)?.graphs.contains_key(&options.name) {
            return Err(ClientError::Conflict(format!("graph '{}'", options.name)));
        }

        for def in &options.edge_definitions {
            let edge_options = CollectionOptions::edges(
                options.number_of_shards,
                options.replication_factor,
            );
            let vertex_options = CollectionOptions::documents(
                options.number_of_shards,
                options.replication_factor,
            );
            let wanted = std::iter::once((&def.collection, edge_options)).chain(
                def.from
                    .iter()
                    .chain(def.to.iter())
                    .map(|v| (v, vertex_options.clone())),
            );
            for (name, col_options) in wanted {
                if !state.db(&self.name)?.collections.contains_key(name) {
                    state.create_collection(&self.name, name, &col_options)?;
                    state.collection(&self.name, name)?.is_smart = options.is_smart;
                }
            }
        }

        state
            .db(&self.name)?
            .graphs
            .insert(options.name.clone(), options.clone());
        Ok(())
    }

    async fn remove_graph(&self, name: &str) -> Result<(), ClientError> {
        let mut state = self.cluster.state.lock().await;
        state
            .db(&self.name)?
            .graphs
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ClientError::NotFound(format!("graph '{name}'")))
    }

    async fn create_documents(
        &self,
        collection: &str,
        docs: &[Value],
        options: &WriteOptions,
    ) -> Result<(), ClientError> {
        let mut state = self.cluster.state.lock().await;
        state.bulk(&self.name, collection, docs, options)
    }

    async fn import_documents(
        &self,
        collection: &str,
        docs: &[Value],
        options: &WriteOptions,
    ) -> Result<(), ClientError> {
        let mut state = self.cluster.state.lock().await;
        state.bulk(&self.name, collection, docs, options)
    }

    async fn create_document(
        &self,
        collection: &str,
        doc: &Value,
        options: &WriteOptions,
    ) -> Result<(), ClientError> {
        let mut state = self.cluster.state.lock().await;
        let rejected = state.insert(&self.name, collection, std::slice::from_ref(doc))?;
        if rejected > 0 && !options.overwrite_ignore {
            return Err(ClientError::Conflict("unique constraint violated".into()));
        }
        Ok(())
    }

    async fn replace_document(
        &self,
        collection: &str,
        key: &str,
        doc: &Value,
        _options: &WriteOptions,
    ) -> Result<(), ClientError> {
        let mut state = self.cluster.state.lock().await;
        let col = state.collection(&self.name, collection)?;
        let Some(stored) = col.docs.get_mut(key) else {
            return Err(ClientError::NotFound(format!("document '{collection}/{key}'")));
        };
        let mut doc = doc.clone();
        if let Value::Object(map) = &mut doc {
            map.insert("_key".into(), Value::String(key.to_string()));
        }
        *stored = doc;
        Ok(())
    }

    async fn read_document(
        &self,
        collection: &str,
        key: &str,
        _options: &ReadOptions,
    ) -> Result<Value, ClientError> {
        let mut state = self.cluster.state.lock().await;
        state
            .collection(&self.name, collection)?
            .docs
            .get(key)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("document '{collection}/{key}'")))
    }

    async fn begin_transaction(&self, write: &[&str]) -> Result<TransactionId, ClientError> {
        let mut state = self.cluster.state.lock().await;
        for name in write {
            state.collection(&self.name, name)?;
        }
        state.next_trx += 1;
        let id = state.next_trx.to_string();
        state.transactions.insert(id.clone(), Vec::new());
        Ok(TransactionId(id))
    }

    async fn commit_transaction(&self, id: &TransactionId) -> Result<(), ClientError> {
        let mut state = self.cluster.state.lock().await;
        let pending = state
            .transactions
            .remove(&id.0)
            .ok_or_else(|| ClientError::NotFound(format!("transaction {id}")))?;
        for (collection, doc) in pending {
            state.insert(&self.name, &collection, std::slice::from_ref(&doc))?;
        }
        Ok(())
    }

    async fn abort_transaction(&self, id: &TransactionId) -> Result<(), ClientError> {
        let mut state = self.cluster.state.lock().await;
        state
            .transactions
            .remove(&id.0)
            .map(|_| ())
            .ok_or_else(|| ClientError::NotFound(format!("transaction {id}")))
    }

    async fn query(&self, aql: &str) -> Result<Vec<Value>, ClientError> {
        let mut state = self.cluster.state.lock().await;
        state.queries.push(aql.to_string());
        Ok(state
            .query_handler
            .as_ref()
            .map(|handler| handler(aql))
            .unwrap_or_default())
    }

    async fn inventory(&self) -> Result<Vec<InventoryCollection>, ClientError> {
        let mut state = self.cluster.state.lock().await;
        if state.fail_inventory.contains(&self.name) {
            return Err(ClientError::Server {
                status: 503,
                error_num: 503,
                message: format!("injected inventory failure for '{}'", self.name),
            });
        }

        let db = state.db(&self.name)?;
        Ok(db
            .collections
            .iter()
            .map(|(name, col)| InventoryCollection {
                parameters: CollectionParameters {
                    name: name.clone(),
                    is_system: name.starts_with('_'),
                    kind: col.kind,
                    is_smart: col.is_smart,
                    shards: col
                        .shards
                        .iter()
                        .map(|s| (s.id.clone(), vec![s.server.clone()]))
                        .collect(),
                },
            })
            .collect())
    }
}
