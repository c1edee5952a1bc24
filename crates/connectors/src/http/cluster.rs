use super::{
    database::HttpDatabase,
    transport::{Auth, Transport},
};
use crate::{
    api::{ClusterApi, DatabaseApi},
    error::ClientError,
};
use async_trait::async_trait;
use model::inventory::ClusterHealth;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Value, json};
use std::{sync::Arc, time::Duration};
use tracing::info;

#[derive(Deserialize)]
struct DatabaseList {
    result: Vec<String>,
}

#[derive(Deserialize)]
struct ChecksumBody {
    checksum: Value,
}

/// Cluster reached over the REST API of its coordinators.
#[derive(Clone)]
pub struct HttpCluster {
    transport: Transport,
}

impl HttpCluster {
    pub fn connect(endpoints: &[String], auth: Auth) -> Result<Self, ClientError> {
        let transport = Transport::new(endpoints, auth)?;
        for (i, endpoint) in transport.endpoints().iter().enumerate() {
            info!(index = i, endpoint = %endpoint, "Using coordinator endpoint");
        }
        Ok(Self { transport })
    }
}

#[async_trait]
impl ClusterApi for HttpCluster {
    async fn database_names(&self) -> Result<Vec<String>, ClientError> {
        let req = self.transport.request(Method::GET, "/_api/database");
        let list: DatabaseList = self.transport.json(req, None).await?;
        Ok(list.result)
    }

    fn database(&self, name: &str) -> Arc<dyn DatabaseApi> {
        Arc::new(HttpDatabase::new(self.transport.clone(), name))
    }

    async fn create_database(&self, name: &str) -> Result<(), ClientError> {
        let req = self
            .transport
            .request(Method::POST, "/_api/database")
            .json(&json!({ "name": name }));
        self.transport.empty(req, None).await
    }

    async fn remove_database(&self, name: &str) -> Result<(), ClientError> {
        let req = self
            .transport
            .request(Method::DELETE, &format!("/_api/database/{name}"));
        self.transport.empty(req, None).await
    }

    async fn health(&self) -> Result<ClusterHealth, ClientError> {
        let req = self.transport.request(Method::GET, "/_admin/cluster/health");
        self.transport.json(req, None).await
    }

    async fn shard_checksum(
        &self,
        endpoint: &str,
        database: &str,
        shard: &str,
        timeout: Duration,
    ) -> Result<String, ClientError> {
        let path = format!("/_db/{database}/_api/collection/{shard}/checksum");
        let req = self.transport.request_at(endpoint, Method::GET, &path)?;
        let body: ChecksumBody = self.transport.json(req, Some(timeout)).await?;
        match body.checksum {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(ClientError::Other(format!(
                "unexpected checksum value for shard {shard}: {other}"
            ))),
        }
    }
}
