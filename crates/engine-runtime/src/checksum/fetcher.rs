use super::rules::matching_name;
use crate::error::ChecksumError;
use connectors::api::ClusterApi;
use model::{
    checksum::{CollectionChecksum, ShardChecksum, Side},
    inventory::{InventoryCollection, ServerRole},
};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{
    sync::{Semaphore, mpsc},
    task::JoinSet,
    time,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Collects the shard checksums of one cluster and sends one record per
/// collection.
#[derive(Clone)]
pub struct ChecksumFetcher {
    cluster: Arc<dyn ClusterApi>,
    side: Side,
    throttle: Arc<Semaphore>,
    shard_timeout: Duration,
    cancel: CancellationToken,
}

impl ChecksumFetcher {
    pub fn new(
        cluster: Arc<dyn ClusterApi>,
        side: Side,
        throttle: Arc<Semaphore>,
        shard_timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            cluster,
            side,
            throttle,
            shard_timeout,
            cancel,
        }
    }

    /// Scans all databases (or only `database`). A failure to enumerate
    /// cancels the whole run; shard failures end up in the records.
    pub async fn fetch_all(
        self,
        database: Option<String>,
        tx: mpsc::Sender<CollectionChecksum>,
    ) -> Result<(), ChecksumError> {
        let result = self.scan(database, tx).await;
        if let Err(err) = &result {
            warn!(side = %self.side, error = %err, "Checksum scan failed, cancelling");
            self.cancel.cancel();
        }
        result
    }

    async fn scan(
        &self,
        database: Option<String>,
        tx: mpsc::Sender<CollectionChecksum>,
    ) -> Result<(), ChecksumError> {
        let side = self.side;
        let names = self
            .cluster
            .database_names()
            .await
            .map_err(|source| ChecksumError::Databases { side, source })?;
        let health = self
            .cluster
            .health()
            .await
            .map_err(|source| ChecksumError::Health { side, source })?;
        let servers: Arc<HashMap<String, String>> = Arc::new(
            health
                .health
                .into_iter()
                .filter(|(_, server)| server.role == ServerRole::DBServer)
                .map(|(id, server)| (id, server.endpoint))
                .collect(),
        );
        debug!(side = %side, databases = names.len(), servers = servers.len(), "Scanning cluster");

        let mut tasks = JoinSet::new();
        for name in names {
            if self.cancel.is_cancelled() {
                break;
            }
            if database.as_ref().is_some_and(|only| *only != name) {
                continue;
            }

            let inventory = self
                .cluster
                .database(&name)
                .inventory()
                .await
                .map_err(|source| ChecksumError::Inventory {
                    side,
                    database: name.clone(),
                    source,
                })?;

            for collection in inventory {
                let Some(matched) = matching_name(&collection, side) else {
                    continue;
                };
                if self.cancel.is_cancelled() {
                    break;
                }
                let fetcher = self.clone();
                let servers = servers.clone();
                let tx = tx.clone();
                let database = name.clone();
                tasks.spawn(async move {
                    let Ok(_permit) = fetcher.throttle.clone().acquire_owned().await else {
                        return;
                    };
                    if let Some(record) = fetcher
                        .collection_checksum(&database, matched, &collection, &servers)
                        .await
                    {
                        let _ = tx.send(record).await;
                    }
                });
            }
        }

        while let Some(joined) = tasks.join_next().await {
            joined?;
        }
        info!(side = %side, "Checksum scan finished");
        Ok(())
    }

    /// `None` when cancelled halfway through.
    async fn collection_checksum(
        &self,
        database: &str,
        matched: String,
        collection: &InventoryCollection,
        servers: &HashMap<String, String>,
    ) -> Option<CollectionChecksum> {
        let mut shards = Vec::with_capacity(collection.parameters.shards.len());
        for shard in collection.parameters.shards.keys() {
            let Some(leader) = collection.leader(shard) else {
                shards.push(ShardChecksum::failed(shard, "no DB server"));
                continue;
            };
            let Some(endpoint) = servers.get(leader) else {
                shards.push(ShardChecksum::failed(
                    shard,
                    format!("DB server {leader} is not known to the cluster"),
                ));
                continue;
            };

            let call = self
                .cluster
                .shard_checksum(endpoint, database, shard, self.shard_timeout);
            let fetched = tokio::select! {
                _ = self.cancel.cancelled() => return None,
                result = time::timeout(self.shard_timeout, call) => result,
            };
            shards.push(match fetched {
                Ok(Ok(checksum)) => ShardChecksum::ok(shard, checksum),
                Ok(Err(err)) => {
                    debug!(side = %self.side, shard = %shard, error = %err, "Shard checksum failed");
                    ShardChecksum::failed(shard, err.to_string())
                }
                Err(_) => {
                    warn!(side = %self.side, shard = %shard, timeout = ?self.shard_timeout, "Shard checksum timed out");
                    ShardChecksum::failed(
                        shard,
                        format!("timed out after {:?}", self.shard_timeout),
                    )
                }
            });
        }
        Some(CollectionChecksum::new(database, matched, self.side, shards))
    }
}
