use crate::env::{self, EnvManager};
use clap::{Args, Parser, Subcommand};
use engine_config::settings::{
    checksum::{ChecksumSettings, DEFAULT_SHARD_TIMEOUT, DEFAULT_THROTTLE},
    collection::{CollectionSettings, FillCollectionSettings, FillSource, SYSTEM_DATABASE},
    connection::{ConnectionSettings, Credentials, DEFAULT_ENDPOINT},
    error::SettingsError,
    graph::{GraphTestSettings, SmartGraphSettings, TenantGraphSettings, TenantRange},
    workload::{
        ReadBatchesSettings, WriteBatchesSettings, WriteEdgesSettings, WriteGraphSettings,
    },
};
use std::{path::PathBuf, time::Duration};

#[derive(Parser, Debug)]
#[command(
    name = "collectionmaker",
    version = "0.1.0",
    about = "Creates, loads and checks data sets on an ArangoDB cluster"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Coordinator endpoint; repeat or separate with commas for several.
    #[arg(long = "endpoint", global = true, default_value = DEFAULT_ENDPOINT)]
    pub endpoints: Vec<String>,

    /// Bearer token; wins over username and password.
    #[arg(long, global = true)]
    pub jwt: Option<String>,

    #[arg(long, global = true)]
    pub username: Option<String>,

    #[arg(long, global = true)]
    pub password: Option<String>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// KEY=VALUE file with credentials, defaults to ~/.collectionmaker/env.
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    /// Write a JSON summary of the run to this file.
    #[arg(long, global = true)]
    pub report: Option<PathBuf>,
}

impl GlobalArgs {
    pub fn connection(&self, env: &EnvManager) -> ConnectionSettings {
        let credentials = Credentials::resolve(
            env.or_flag(self.jwt.clone(), env::JWT),
            env.or_flag(self.username.clone(), env::USERNAME),
            env.or_flag(self.password.clone(), env::PASSWORD),
        );
        ConnectionSettings::new(&self.endpoints, credentials)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create collections, graphs and data sets
    Create {
        #[command(subcommand)]
        command: CreateCommand,
    },

    /// Run a parallel write workload
    Write {
        #[command(subcommand)]
        command: WriteCommand,
    },

    /// Run a parallel read workload
    Read {
        #[command(subcommand)]
        command: ReadCommand,
    },

    /// Check data on one or two clusters
    Test {
        #[command(subcommand)]
        command: TestCommand,
    },

    /// Remove data from the cluster
    Delete {
        #[command(subcommand)]
        command: DeleteCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum CreateCommand {
    /// Fill a collection to a number of documents and a total size
    Collection(FillArgs),
    /// Create the `edges` collection with its indexes
    Edgecol(CollectionArgs),
    /// Create the `instances` and `steps` collections
    Graphcols(CollectionArgs),
    /// Create the batch import collection
    Batchimport(BatchImportCollectionArgs),
    /// Create the tenant graph `G` and its paths
    Graph(TenantGraphArgs),
    /// Create the connected components graph `SmartGraph`
    Smartgraph(SmartGraphArgs),
}

#[derive(Subcommand, Debug)]
pub enum WriteCommand {
    /// Import edges in batches of 1000
    Edges(WorkerArgs),
    /// Import edges in batches of 1000, each inside a transaction
    Elcheapo(WorkerArgs),
    /// Import documents into the batch import collection
    Batchimport(WriteBatchArgs),
    /// Insert and replace single vertices and edges
    Graph(WorkerArgs),
}

#[derive(Subcommand, Debug)]
pub enum ReadCommand {
    /// Read random documents of the batch import collection
    Batchimport(ReadBatchArgs),
}

#[derive(Subcommand, Debug)]
pub enum TestCommand {
    /// Run random traversals against the tenant graph
    Graph(GraphTestArgs),
    /// Compare shard checksums of two clusters
    Checksum(ChecksumArgs),
}

#[derive(Subcommand, Debug)]
pub enum DeleteCommand {
    /// Remove every database whose name does not start with `_`
    Database,
}

#[derive(Args, Debug)]
pub struct FillArgs {
    /// Number of documents
    #[arg(long, conflicts_with = "file")]
    pub count: Option<u64>,

    /// Size in bytes of all documents together
    #[arg(long, requires = "count", conflicts_with_all = ["file", "keyed"])]
    pub size: Option<u64>,

    /// File of whitespace separated `count size` pairs
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Write `--count` batch import documents with deterministic keys
    #[arg(long, requires = "count", conflicts_with = "file")]
    pub keyed: bool,

    /// First sequence number of a keyed fill
    #[arg(long = "first-seq", default_value_t = 0, requires = "keyed")]
    pub first_seq: u64,

    /// Size in bytes of the payload of each keyed document
    #[arg(long = "payload-size", default_value_t = 100, requires = "keyed")]
    pub payload_size: usize,

    /// Add a random polygon in the `geo` attribute of keyed documents
    #[arg(long = "with-geo", requires = "keyed")]
    pub with_geo: bool,

    /// Number of words in the `words` attribute of keyed documents
    #[arg(long = "with-words", default_value_t = 0, requires = "keyed")]
    pub with_words: usize,

    #[arg(long, default_value = SYSTEM_DATABASE)]
    pub database: String,

    #[arg(long, default_value = "test")]
    pub collection: String,

    #[arg(long, default_value_t = 1)]
    pub shards: u32,
}

impl FillArgs {
    pub fn settings(self) -> Result<FillCollectionSettings, SettingsError> {
        let source = match (self.file, self.count, self.size) {
            (Some(path), _, _) => FillSource::File(path),
            (None, Some(count), _) if self.keyed => FillSource::Keyed {
                first_seq: self.first_seq,
                count,
                payload_size: self.payload_size,
                with_geo: self.with_geo,
                words: self.with_words,
            },
            (None, Some(count), Some(size)) => FillSource::EqualLength { count, size },
            _ => {
                return Err(SettingsError::Missing(
                    "--count and --size, --count and --keyed, or --file".into(),
                ));
            }
        };
        Ok(FillCollectionSettings {
            database: self.database,
            collection: self.collection,
            shards: self.shards,
            source,
        })
    }
}

#[derive(Args, Debug)]
pub struct CollectionArgs {
    /// Drop existing data before creating
    #[arg(long)]
    pub drop: bool,

    #[arg(long = "numberOfShards")]
    pub number_of_shards: Option<u32>,

    #[arg(long = "replicationFactor")]
    pub replication_factor: Option<u32>,
}

impl CollectionArgs {
    /// Flags given on the command line override `preset`.
    pub fn settings(self, preset: CollectionSettings) -> CollectionSettings {
        CollectionSettings {
            number_of_shards: self.number_of_shards.unwrap_or(preset.number_of_shards),
            replication_factor: self.replication_factor.unwrap_or(preset.replication_factor),
            drop: self.drop,
            ..preset
        }
    }
}

#[derive(Args, Debug)]
pub struct BatchImportCollectionArgs {
    #[command(flatten)]
    pub collection: CollectionArgs,

    /// Name of the batch import collection
    #[arg(long = "collection")]
    pub name: Option<String>,
}

impl BatchImportCollectionArgs {
    pub fn settings(self) -> CollectionSettings {
        let mut settings = self.collection.settings(CollectionSettings::batchimport());
        if let Some(name) = self.name {
            settings.name = name;
        }
        settings
    }
}

#[derive(Args, Debug)]
pub struct TenantArgs {
    /// Index of the first tenant
    #[arg(long = "firstTenant")]
    pub first_tenant: Option<u64>,

    /// Index of the last tenant
    #[arg(long = "lastTenant")]
    pub last_tenant: Option<u64>,

    #[arg(long = "nrPathsPerTenant")]
    pub paths_per_tenant: Option<u64>,
}

impl TenantArgs {
    fn range(self) -> TenantRange {
        let defaults = TenantRange::default();
        TenantRange {
            first: self.first_tenant.unwrap_or(defaults.first),
            last: self.last_tenant.unwrap_or(defaults.last),
            paths_per_tenant: self.paths_per_tenant.unwrap_or(defaults.paths_per_tenant),
        }
    }
}

#[derive(Args, Debug)]
pub struct TenantGraphArgs {
    #[command(flatten)]
    pub tenants: TenantArgs,

    #[arg(long)]
    pub parallelism: Option<usize>,

    /// Drop the graph and its collections first
    #[arg(long)]
    pub drop: bool,
}

impl TenantGraphArgs {
    pub fn settings(self) -> TenantGraphSettings {
        let defaults = TenantGraphSettings::default();
        TenantGraphSettings {
            tenants: self.tenants.range(),
            parallelism: self.parallelism.unwrap_or(defaults.parallelism),
            drop: self.drop,
        }
    }
}

#[derive(Args, Debug)]
pub struct SmartGraphArgs {
    #[arg(long = "numberOfParts")]
    pub number_of_parts: Option<u64>,

    /// Size in bytes of the vertex payload
    #[arg(long = "vertexPayloadLength")]
    pub vertex_payload: Option<usize>,

    /// Size in bytes of the edge payload
    #[arg(long = "edgePayloadLength")]
    pub edge_payload: Option<usize>,

    /// Log 2 of the number of vertices in each part
    #[arg(long = "log2NumberOfVertices")]
    pub log2_vertices: Option<u32>,

    #[arg(long)]
    pub parallelism: Option<usize>,

    #[arg(long)]
    pub shards: Option<u32>,

    #[arg(long)]
    pub drop: bool,
}

impl SmartGraphArgs {
    pub fn settings(self) -> SmartGraphSettings {
        let defaults = SmartGraphSettings::default();
        SmartGraphSettings {
            number_of_parts: self.number_of_parts.unwrap_or(defaults.number_of_parts),
            vertex_payload: self.vertex_payload.unwrap_or(defaults.vertex_payload),
            edge_payload: self.edge_payload.unwrap_or(defaults.edge_payload),
            log2_vertices: self.log2_vertices.unwrap_or(defaults.log2_vertices),
            parallelism: self.parallelism.unwrap_or(defaults.parallelism),
            shards: self.shards.unwrap_or(defaults.shards),
            drop: self.drop,
        }
    }
}

/// Flags shared by every parallel workload.
#[derive(Args, Debug)]
pub struct WorkerArgs {
    /// Number of concurrent workers
    #[arg(long)]
    pub parallelism: Option<usize>,

    /// Units of work per worker
    #[arg(long)]
    pub number: Option<u64>,

    /// Delay in milliseconds between two worker starts
    #[arg(long = "start-delay")]
    pub start_delay: Option<u64>,
}

impl WorkerArgs {
    fn apply(&self, parallelism: &mut usize, number: &mut u64, start_delay: &mut Duration) {
        if let Some(p) = self.parallelism {
            *parallelism = p;
        }
        if let Some(n) = self.number {
            *number = n;
        }
        if let Some(ms) = self.start_delay {
            *start_delay = Duration::from_millis(ms);
        }
    }

    pub fn edges(&self, transactional: bool) -> WriteEdgesSettings {
        let mut settings = WriteEdgesSettings {
            transactional,
            ..Default::default()
        };
        self.apply(&mut settings.parallelism, &mut settings.number, &mut settings.start_delay);
        settings
    }

    pub fn graph(&self) -> WriteGraphSettings {
        let mut settings = WriteGraphSettings::default();
        self.apply(&mut settings.parallelism, &mut settings.number, &mut settings.start_delay);
        settings
    }
}

#[derive(Args, Debug)]
pub struct WriteBatchArgs {
    #[command(flatten)]
    pub workers: WorkerArgs,

    /// Size in bytes of the payload of each document
    #[arg(long = "payload-size")]
    pub payload_size: Option<usize>,

    /// Documents per import batch
    #[arg(long = "batch-size")]
    pub batch_size: Option<usize>,

    #[arg(long)]
    pub collection: Option<String>,

    /// Add a random polygon in the `geo` attribute
    #[arg(long = "with-geo", num_args = 0..=1, default_missing_value = "true")]
    pub with_geo: Option<bool>,

    /// Number of words in the `words` attribute
    #[arg(long = "with-words")]
    pub with_words: Option<usize>,
}

impl WriteBatchArgs {
    pub fn settings(self) -> WriteBatchesSettings {
        let mut settings = WriteBatchesSettings::default();
        self.workers
            .apply(&mut settings.parallelism, &mut settings.number, &mut settings.start_delay);
        settings.payload_size = self.payload_size.unwrap_or(settings.payload_size);
        settings.batch_size = self.batch_size.unwrap_or(settings.batch_size);
        settings.collection = self.collection.unwrap_or(settings.collection);
        settings.with_geo = self.with_geo.unwrap_or(settings.with_geo);
        settings.with_words = self.with_words.unwrap_or(settings.with_words);
        settings
    }
}

#[derive(Args, Debug)]
pub struct ReadBatchArgs {
    #[command(flatten)]
    pub workers: WorkerArgs,

    /// Documents in the collection; keys are drawn below this number
    #[arg(long = "total-number")]
    pub total_number: Option<u64>,

    #[arg(long)]
    pub collection: Option<String>,

    /// Allow dirty reads from followers
    #[arg(long = "read-from-follower")]
    pub read_from_follower: bool,
}

impl ReadBatchArgs {
    pub fn settings(self) -> ReadBatchesSettings {
        let mut settings = ReadBatchesSettings::default();
        self.workers
            .apply(&mut settings.parallelism, &mut settings.number, &mut settings.start_delay);
        settings.total_number = self.total_number.unwrap_or(settings.total_number);
        settings.collection = self.collection.unwrap_or(settings.collection);
        settings.read_from_follower = self.read_from_follower;
        settings
    }
}

#[derive(Args, Debug)]
pub struct GraphTestArgs {
    #[command(flatten)]
    pub tenants: TenantArgs,

    #[arg(long)]
    pub parallelism: Option<usize>,

    /// Run time in seconds
    #[arg(long = "runTime")]
    pub run_time: Option<u64>,
}

impl GraphTestArgs {
    pub fn settings(self) -> GraphTestSettings {
        let defaults = GraphTestSettings::default();
        GraphTestSettings {
            tenants: self.tenants.range(),
            parallelism: self.parallelism.unwrap_or(defaults.parallelism),
            run_time: self.run_time.map_or(defaults.run_time, Duration::from_secs),
            batch: defaults.batch,
        }
    }
}

#[derive(Args, Debug)]
pub struct ChecksumArgs {
    /// Endpoint of the target cluster
    #[arg(long = "endpoint-target")]
    pub endpoint_target: Vec<String>,

    /// Bearer token of the target cluster
    #[arg(long = "jwt-target")]
    pub jwt_target: Option<String>,

    /// Check only this database
    #[arg(long)]
    pub database: Option<String>,

    /// Collection checksums fetched at the same time
    #[arg(long, default_value_t = DEFAULT_THROTTLE)]
    pub throttle: usize,

    /// Per shard timeout in seconds
    #[arg(long = "shard-timeout", default_value_t = DEFAULT_SHARD_TIMEOUT.as_secs())]
    pub shard_timeout: u64,
}

impl ChecksumArgs {
    /// The source is the global connection; the target reuses its username
    /// and password unless a target token is known.
    pub fn settings(
        self,
        source: ConnectionSettings,
        global: &GlobalArgs,
        env: &EnvManager,
    ) -> ChecksumSettings {
        let credentials = Credentials::resolve(
            env.or_flag(self.jwt_target, env::JWT_TARGET),
            env.or_flag(global.username.clone(), env::USERNAME),
            env.or_flag(global.password.clone(), env::PASSWORD),
        );
        let target = ConnectionSettings::new(&self.endpoint_target, credentials);
        let mut settings = ChecksumSettings::new(source, target);
        settings.database = self.database.filter(|d| !d.is_empty());
        settings.verbose = global.verbose;
        settings.throttle = self.throttle;
        settings.shard_timeout = Duration::from_secs(self.shard_timeout);
        settings
    }
}
