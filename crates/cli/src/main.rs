use crate::{
    commands::{
        Cli, Commands, CreateCommand, DeleteCommand, GlobalArgs, ReadCommand, TestCommand,
        WriteCommand,
    },
    conn::{ClusterPinger, ConnectionPinger},
    env::EnvManager,
    error::CliError,
    output::{Output, RunSummary},
    shutdown::{ExitCode, Shutdown},
};
use clap::Parser;
use connectors::api::ClusterApi;
use engine_config::settings::{
    checksum::ChecksumSettings,
    collection::{CollectionSettings, SYSTEM_DATABASE},
    connection::ConnectionSettings,
    validated,
};
use engine_core::{
    random::base_seed,
    workload::{
        Workload,
        batch_import::WriteBatches,
        edges::WriteEdges,
        graph::{EDGE_COLLECTION as STEP_COLLECTION, VERTEX_COLLECTION, WriteGraph},
        read::ReadBatches,
    },
};
use engine_runtime::{
    checksum::ChecksumEngine, driver::WorkloadDriver, error::ChecksumError,
    graph_test::RandomWalkTest, setup,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod conn;
mod env;
mod error;
mod output;
mod shutdown;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    let shutdown = Shutdown::default();
    shutdown.listen();

    let result = run(cli, &shutdown).await;
    if let Err(e) = &result
        && !matches!(e, CliError::ShutdownRequested)
    {
        error!("{e}");
        eprintln!("Error: {e}");
    }
    std::process::exit(ExitCode::of(&result).as_i32());
}

/// `RUST_LOG` wins; otherwise `info`, or `debug` with `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli, shutdown: &Shutdown) -> Result<(), CliError> {
    let mut env = EnvManager::new();
    env.load(cli.global.env_file.as_deref())?;
    let connection = validated(cli.global.connection(&env))?;

    let output = Output::stdout();
    let result = dispatch(cli.command, &cli.global, &env, connection, &output, shutdown).await;
    output.finish().await?;

    let summary = result?;
    if let Some(path) = &cli.global.report {
        output::write_report(&summary, path).await?;
        info!(path = %path.display(), "Wrote run summary");
    }
    Ok(())
}

async fn dispatch(
    command: Commands,
    global: &GlobalArgs,
    env: &EnvManager,
    connection: ConnectionSettings,
    output: &Output,
    shutdown: &Shutdown,
) -> Result<RunSummary, CliError> {
    match command {
        Commands::Create { command } => {
            let cluster = conn::connect(&connection)?;
            shutdown.guard(create(command, cluster, output)).await
        }
        Commands::Write { command } => {
            let cluster = conn::connect(&connection)?;
            shutdown.guard(write(command, cluster, output)).await
        }
        Commands::Read {
            command: ReadCommand::Batchimport(args),
        } => {
            let settings = validated(args.settings())?;
            let db = conn::connect(&connection)?.database(SYSTEM_DATABASE);
            shutdown.guard(run_workload(Arc::new(ReadBatches::new(db, settings)), output)).await
        }
        Commands::Test {
            command: TestCommand::Graph(args),
        } => {
            let settings = validated(args.settings())?;
            let db = conn::connect(&connection)?.database(SYSTEM_DATABASE);
            shutdown.guard(run_workload(Arc::new(RandomWalkTest::new(db, settings)), output)).await
        }
        Commands::Test {
            command: TestCommand::Checksum(args),
        } => {
            let settings = validated(args.settings(connection, global, env))?;
            test_checksum(settings, output, shutdown).await
        }
        Commands::Delete {
            command: DeleteCommand::Database,
        } => {
            let cluster = conn::connect(&connection)?;
            shutdown.guard(delete(cluster, output)).await
        }
    }
}

async fn run_workload(workload: Arc<dyn Workload>, output: &Output) -> Result<RunSummary, CliError> {
    let name = workload.name();
    let report = WorkloadDriver::new(output.progress(), base_seed())
        .run(workload)
        .await?;
    Ok(RunSummary::workload(name, &report))
}

async fn create(
    command: CreateCommand,
    cluster: Arc<dyn ClusterApi>,
    output: &Output,
) -> Result<RunSummary, CliError> {
    let progress = output.progress();
    match command {
        CreateCommand::Collection(args) => {
            let settings = validated(args.settings()?)?;
            let count = setup::fill_collection(cluster.as_ref(), &settings, progress, base_seed()).await?;
            Ok(RunSummary::Fill {
                collection: format!("{}.{}", settings.database, settings.collection),
                count,
            })
        }
        CreateCommand::Edgecol(args) => {
            let settings = validated(args.settings(CollectionSettings::edgecol()))?;
            let db = cluster.database(&settings.database);
            setup::create_edge_collection(db.as_ref(), &settings, &progress).await?;
            Ok(RunSummary::Created {
                names: vec![settings.name],
            })
        }
        CreateCommand::Graphcols(args) => {
            let settings = validated(args.settings(CollectionSettings::graphcols()))?;
            let db = cluster.database(&settings.database);
            setup::create_graph_collections(db.as_ref(), &settings, &progress).await?;
            Ok(RunSummary::Created {
                names: vec![VERTEX_COLLECTION.to_string(), STEP_COLLECTION.to_string()],
            })
        }
        CreateCommand::Batchimport(args) => {
            let settings = validated(args.settings())?;
            let db = cluster.database(&settings.database);
            setup::create_batchimport_collection(db.as_ref(), &settings, &progress).await?;
            Ok(RunSummary::Created {
                names: vec![settings.name],
            })
        }
        CreateCommand::Graph(args) => {
            let settings = validated(args.settings())?;
            let db = cluster.database(SYSTEM_DATABASE);
            let report = setup::create_tenant_graph(db, settings, progress, base_seed()).await?;
            Ok(RunSummary::workload("create graph", &report))
        }
        CreateCommand::Smartgraph(args) => {
            let settings = validated(args.settings())?;
            let db = cluster.database(SYSTEM_DATABASE);
            let report = setup::create_smart_graph(db, settings, progress, base_seed()).await?;
            Ok(RunSummary::workload("create smartgraph", &report))
        }
    }
}

async fn write(
    command: WriteCommand,
    cluster: Arc<dyn ClusterApi>,
    output: &Output,
) -> Result<RunSummary, CliError> {
    let db = cluster.database(SYSTEM_DATABASE);
    let workload: Arc<dyn Workload> = match command {
        WriteCommand::Edges(args) => Arc::new(WriteEdges::new(db, validated(args.edges(false))?)),
        WriteCommand::Elcheapo(args) => Arc::new(WriteEdges::new(db, validated(args.edges(true))?)),
        WriteCommand::Batchimport(args) => Arc::new(WriteBatches::new(db, validated(args.settings())?)),
        WriteCommand::Graph(args) => Arc::new(WriteGraph::new(db, validated(args.graph())?)),
    };
    run_workload(workload, output).await
}

async fn delete(cluster: Arc<dyn ClusterApi>, output: &Output) -> Result<RunSummary, CliError> {
    let databases = setup::delete_databases(cluster.as_ref()).await?;
    for name in &databases {
        output.line(format!("Removed database '{name}'.")).await;
    }
    Ok(RunSummary::Deleted { databases })
}

async fn test_checksum(
    settings: ChecksumSettings,
    output: &Output,
    shutdown: &Shutdown,
) -> Result<RunSummary, CliError> {
    let source = conn::connect(&settings.source)?;
    let target = conn::connect(&settings.target)?;
    for (label, cluster) in [("source", &source), ("target", &target)] {
        ClusterPinger {
            label,
            cluster: cluster.clone(),
        }
        .ping()
        .await?;
    }

    let report = ChecksumEngine::new(source, target, &settings, output.progress())
        .with_cancellation(shutdown.token())
        .run()
        .await
        .map_err(|e| match e {
            ChecksumError::Cancelled if shutdown.requested() => {
                CliError::ShutdownRequested
            }
            e => e.into(),
        })?;
    Ok(RunSummary::checksum(&report))
}
