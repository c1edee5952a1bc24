use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InventoryError {
    #[error("Unknown collection type: {0}")]
    UnknownCollectionType(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum CollectionType {
    Document,
    Edge,
}

impl TryFrom<u32> for CollectionType {
    type Error = InventoryError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(CollectionType::Document),
            3 => Ok(CollectionType::Edge),
            other => Err(InventoryError::UnknownCollectionType(other)),
        }
    }
}

impl From<CollectionType> for u32 {
    fn from(value: CollectionType) -> Self {
        match value {
            CollectionType::Document => 2,
            CollectionType::Edge => 3,
        }
    }
}

/// Collection properties as reported by the cluster inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionParameters {
    pub name: String,
    #[serde(default)]
    pub is_system: bool,
    #[serde(rename = "type")]
    pub kind: CollectionType,
    #[serde(default)]
    pub is_smart: bool,
    /// Shard id to the list of servers holding it; the leader comes first.
    #[serde(default)]
    pub shards: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryCollection {
    pub parameters: CollectionParameters,
}

impl InventoryCollection {
    pub fn name(&self) -> &str {
        &self.parameters.name
    }

    /// Virtual edge collection of a smart graph; its data lives in the
    /// hidden `_local_`/`_from_`/`_to_` collections.
    pub fn is_smart_edge(&self) -> bool {
        self.parameters.is_smart && self.parameters.kind == CollectionType::Edge
    }

    /// Leader server id for a shard.
    pub fn leader(&self, shard: &str) -> Option<&str> {
        self.parameters
            .shards
            .get(shard)
            .and_then(|servers| servers.first())
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub collections: Vec<InventoryCollection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerRole {
    DBServer,
    Coordinator,
    Agent,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerHealth {
    #[serde(rename = "Role")]
    pub role: ServerRole,
    #[serde(rename = "Endpoint", default)]
    pub endpoint: String,
}

/// Health of every server in a cluster, keyed by server id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterHealth {
    #[serde(rename = "Health", default)]
    pub health: HashMap<String, ServerHealth>,
}

impl ClusterHealth {
    /// Endpoint of a DB server by id, if it is known and actually a DB server.
    pub fn db_server_endpoint(&self, server_id: &str) -> Option<&str> {
        self.health
            .get(server_id)
            .filter(|s| s.role == ServerRole::DBServer)
            .map(|s| s.endpoint.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_inventory_entry() {
        let raw = json!({
            "collections": [{
                "parameters": {
                    "name": "edges",
                    "isSystem": false,
                    "type": 3,
                    "isSmart": true,
                    "shards": {"s2": ["PRMR-2", "PRMR-1"], "s1": ["PRMR-1"]}
                }
            }]
        });

        let inventory: Inventory = serde_json::from_value(raw).unwrap();
        let collection = &inventory.collections[0];
        assert_eq!(collection.name(), "edges");
        assert!(collection.is_smart_edge());
        assert_eq!(collection.leader("s2"), Some("PRMR-2"));
        assert_eq!(collection.leader("s9"), None);
    }

    #[test]
    fn rejects_unknown_collection_type() {
        let raw = json!({"name": "x", "type": 7});
        assert!(serde_json::from_value::<CollectionParameters>(raw).is_err());
    }

    #[test]
    fn resolves_db_server_endpoints_only() {
        let raw = json!({
            "Health": {
                "PRMR-1": {"Role": "DBServer", "Endpoint": "tcp://10.0.0.1:8530"},
                "CRDN-1": {"Role": "Coordinator", "Endpoint": "tcp://10.0.0.1:8529"},
                "AGNT-1": {"Role": "Agent"}
            }
        });

        let health: ClusterHealth = serde_json::from_value(raw).unwrap();
        assert_eq!(health.db_server_endpoint("PRMR-1"), Some("tcp://10.0.0.1:8530"));
        assert_eq!(health.db_server_endpoint("CRDN-1"), None);
        assert_eq!(health.db_server_endpoint("PRMR-9"), None);
    }
}
