use super::transport::Transport;
use crate::{
    api::{CollectionOptions, DatabaseApi, GraphOptions, ReadOptions, TransactionId, WriteOptions},
    error::ClientError,
};
use async_trait::async_trait;
use model::inventory::{Inventory, InventoryCollection};
use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

const TRX_HEADER: &str = "x-arango-trx-id";
const DIRTY_READ_HEADER: &str = "x-arango-allow-dirty-read";
const ERROR_CODES_HEADER: &str = "x-arango-error-codes";

#[derive(Deserialize)]
struct CountBody {
    count: u64,
}

#[derive(Deserialize)]
struct TransactionBody {
    result: TransactionResult,
}

#[derive(Deserialize)]
struct TransactionResult {
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CursorBody {
    #[serde(default)]
    result: Vec<Value>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    id: Option<String>,
}

pub struct HttpDatabase {
    transport: Transport,
    name: String,
}

impl HttpDatabase {
    pub fn new(transport: Transport, name: &str) -> Self {
        Self {
            transport,
            name: name.to_string(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.transport
            .request(method, &format!("/_db/{}{}", self.name, path))
    }

    fn write_request(&self, method: Method, path: &str, options: &WriteOptions) -> RequestBuilder {
        let req = self.request(method, path);
        match &options.transaction {
            Some(id) => req.header(TRX_HEADER, id.0.as_str()),
            None => req,
        }
    }

    /// Bulk answers carry per-document failures in a header rather than the status.
    async fn bulk(
        &self,
        req: RequestBuilder,
        collection: &str,
        options: &WriteOptions,
    ) -> Result<(), ClientError> {
        let response = self.transport.execute(req, options.timeout).await?;
        if let Some(codes) = response.headers().get(ERROR_CODES_HEADER) {
            warn!(
                database = %self.name,
                collection = %collection,
                codes = ?codes,
                "Some documents were rejected"
            );
        }
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool, ClientError> {
        let req = self.request(Method::GET, path);
        match self.transport.empty(req, None).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl DatabaseApi for HttpDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    async fn collection_exists(&self, name: &str) -> Result<bool, ClientError> {
        self.exists(&format!("/_api/collection/{name}")).await
    }

    async fn create_collection(
        &self,
        name: &str,
        options: &CollectionOptions,
    ) -> Result<(), ClientError> {
        let body = json!({
            "name": name,
            "type": u32::from(options.kind),
            "numberOfShards": options.number_of_shards,
            "replicationFactor": options.replication_factor,
        });
        let req = self.request(Method::POST, "/_api/collection").json(&body);
        self.transport.empty(req, None).await
    }

    async fn remove_collection(&self, name: &str) -> Result<(), ClientError> {
        let req = self.request(Method::DELETE, &format!("/_api/collection/{name}"));
        self.transport.empty(req, None).await
    }

    async fn ensure_persistent_index(
        &self,
        collection: &str,
        fields: &[&str],
    ) -> Result<(), ClientError> {
        let body = json!({ "type": "persistent", "fields": fields, "unique": false });
        let req = self
            .request(Method::POST, "/_api/index")
            .query(&[("collection", collection)])
            .json(&body);
        self.transport.empty(req, None).await
    }

    async fn count(&self, collection: &str) -> Result<u64, ClientError> {
        let req = self.request(Method::GET, &format!("/_api/collection/{collection}/count"));
        let body: CountBody = self.transport.json(req, None).await?;
        Ok(body.count)
    }

    async fn graph_exists(&self, name: &str) -> Result<bool, ClientError> {
        self.exists(&format!("/_api/gharial/{name}")).await
    }

    async fn create_graph(&self, options: &GraphOptions) -> Result<(), ClientError> {
        let mut graph_options = json!({
            "numberOfShards": options.number_of_shards,
            "replicationFactor": options.replication_factor,
        });
        if let Some(attribute) = &options.smart_graph_attribute {
            graph_options["smartGraphAttribute"] = json!(attribute);
        }
        let body = json!({
            "name": options.name,
            "edgeDefinitions": options.edge_definitions,
            "isSmart": options.is_smart,
            "isDisjoint": options.is_disjoint,
            "options": graph_options,
        });
        let req = self.request(Method::POST, "/_api/gharial").json(&body);
        self.transport.empty(req, None).await
    }

    async fn remove_graph(&self, name: &str) -> Result<(), ClientError> {
        let req = self.request(Method::DELETE, &format!("/_api/gharial/{name}"));
        self.transport.empty(req, None).await
    }

    async fn create_documents(
        &self,
        collection: &str,
        docs: &[Value],
        options: &WriteOptions,
    ) -> Result<(), ClientError> {
        let mut req =
            self.write_request(Method::POST, &format!("/_api/document/{collection}"), options);
        if options.overwrite_ignore {
            req = req.query(&[("overwriteMode", "ignore")]);
        }
        self.bulk(req.json(docs), collection, options).await
    }

    async fn import_documents(
        &self,
        collection: &str,
        docs: &[Value],
        options: &WriteOptions,
    ) -> Result<(), ClientError> {
        let mut req = self
            .write_request(Method::POST, "/_api/import", options)
            .query(&[("collection", collection), ("type", "list")]);
        if options.overwrite_ignore {
            req = req.query(&[("onDuplicate", "ignore")]);
        }
        self.bulk(req.json(docs), collection, options).await
    }

    async fn create_document(
        &self,
        collection: &str,
        doc: &Value,
        options: &WriteOptions,
    ) -> Result<(), ClientError> {
        let mut req =
            self.write_request(Method::POST, &format!("/_api/document/{collection}"), options);
        if options.overwrite_ignore {
            req = req.query(&[("overwriteMode", "ignore")]);
        }
        self.transport.empty(req.json(doc), options.timeout).await
    }

    async fn replace_document(
        &self,
        collection: &str,
        key: &str,
        doc: &Value,
        options: &WriteOptions,
    ) -> Result<(), ClientError> {
        let req = self
            .write_request(
                Method::PUT,
                &format!("/_api/document/{collection}/{key}"),
                options,
            )
            .json(doc);
        self.transport.empty(req, options.timeout).await
    }

    async fn read_document(
        &self,
        collection: &str,
        key: &str,
        options: &ReadOptions,
    ) -> Result<Value, ClientError> {
        let mut req = self.request(Method::GET, &format!("/_api/document/{collection}/{key}"));
        if options.allow_dirty_read {
            req = req.header(DIRTY_READ_HEADER, "true");
        }
        self.transport.json(req, options.timeout).await
    }

    async fn begin_transaction(&self, write: &[&str]) -> Result<TransactionId, ClientError> {
        let body = json!({ "collections": { "write": write } });
        let req = self
            .request(Method::POST, "/_api/transaction/begin")
            .json(&body);
        let body: TransactionBody = self.transport.json(req, None).await?;
        Ok(TransactionId(body.result.id))
    }

    async fn commit_transaction(&self, id: &TransactionId) -> Result<(), ClientError> {
        let req = self.request(Method::PUT, &format!("/_api/transaction/{id}"));
        self.transport.empty(req, None).await
    }

    async fn abort_transaction(&self, id: &TransactionId) -> Result<(), ClientError> {
        let req = self.request(Method::DELETE, &format!("/_api/transaction/{id}"));
        self.transport.empty(req, None).await
    }

    async fn query(&self, aql: &str) -> Result<Vec<Value>, ClientError> {
        let req = self
            .request(Method::POST, "/_api/cursor")
            .json(&json!({ "query": aql }));
        let mut cursor: CursorBody = self.transport.json(req, None).await?;
        let mut rows = std::mem::take(&mut cursor.result);

        while cursor.has_more {
            let Some(id) = cursor.id.take() else {
                break;
            };
            let req = self.request(Method::PUT, &format!("/_api/cursor/{id}"));
            cursor = self.transport.json(req, None).await?;
            rows.append(&mut cursor.result);
            if cursor.id.is_none() {
                cursor.id = Some(id);
            }
        }

        Ok(rows)
    }

    async fn inventory(&self) -> Result<Vec<InventoryCollection>, ClientError> {
        let req = self.request(Method::GET, "/_api/replication/clusterInventory");
        let inventory: Inventory = self.transport.json(req, None).await?;
        Ok(inventory.collections)
    }
}
