use clap::Parser;
use lineagegraph::Config;
use lineagegraph::db::{Db, migrate};
use lineagegraph::graph::SqliteGraphStore;
use lineagegraph::taxonomy::TaxonomyRegistry;
use lineagegraph::traversal::{CancelFlag, HopCollapser, TraversalEngine, TraverseRequest};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use anyhow::Result;

#[derive(Parser, Debug)]
#[command(name = "traverse")]
#[command(about = "Run a lineage traversal from the command line")]
struct Args {
    /// Start node id (e.g. ds-002)
    start_node_id: String,

    /// Axes to traverse, comma separated (x,y,z)
    #[arg(long, value_delimiter = ',', default_values_t = vec!["x".to_string(), "y".to_string(), "z".to_string()])]
    axes: Vec<String>,

    /// X-axis direction: upstream, downstream, both
    #[arg(long, default_value = "both")]
    x_direction: String,

    /// Y-axis direction: up, down, both
    #[arg(long, default_value = "both")]
    y_direction: String,

    /// Maximum association hops per path
    #[arg(long)]
    max_z_hops: Option<i64>,

    /// Maximum traversal depth
    #[arg(long)]
    max_depth: Option<i64>,

    /// Drop transformer nodes from the output node list
    #[arg(long)]
    hide_transformers: bool,

    /// Print the full JSON response instead of a summary
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    let config = Config::load()?;
    let db = Db::new(config.db_path());
    let migrations_dir = Path::new("migrations").to_path_buf();
    db.with_connection(move |conn| migrate::run_migrations(conn, &migrations_dir))
        .await?;

    let registry = Arc::new(TaxonomyRegistry::load(config.taxonomy_path())?);

    let request = TraverseRequest {
        start_node_id: args.start_node_id.clone(),
        axes: Some(args.axes.clone()),
        x_direction: Some(args.x_direction.clone()),
        y_direction: Some(args.y_direction.clone()),
        max_z_hops: args.max_z_hops,
        max_depth: args.max_depth,
        include_transformers: !args.hide_transformers,
    };
    let params = request.validate(&config.traversal)?;

    let start = Instant::now();
    let registry_ref = Arc::clone(&registry);
    let engine_params = params.clone();
    let response = db
        .with_connection(move |conn| {
            let store = SqliteGraphStore::new(conn);
            let engine = TraversalEngine::new(&registry_ref);
            let raw = engine.traverse(&store, &engine_params, &CancelFlag::new())?;
            HopCollapser::new(&registry_ref).collapse(&raw, engine_params.include_transformers)
        })
        .await?;
    let elapsed = start.elapsed();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!(
        "Start: {} ({}){}",
        response.start_node.id,
        response.start_node.node_type,
        response
            .start_node
            .name
            .as_deref()
            .map(|n| format!(" - {}", n))
            .unwrap_or_default()
    );
    println!(
        "Visited {} nodes, {} edges, {} paths in {:.1?}",
        response.traversal_metadata.total_nodes_visited,
        response.edges.len(),
        response.paths.len(),
        elapsed
    );
    println!(
        "Z hops taken: {}, blocked Z-of-Z continuations: {}",
        response.traversal_metadata.z_hops_taken,
        response.traversal_metadata.blocked_z_of_z_paths
    );

    let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
    for node in &response.nodes {
        *by_type.entry(node.node_type.as_str()).or_insert(0) += 1;
    }
    println!("\nNodes by type:");
    for (node_type, count) in by_type {
        println!("  {}: {}", node_type, count);
    }

    println!("\nPaths:");
    for path in &response.paths {
        let mut rendered = Vec::new();
        for step in &path.logical_steps {
            if rendered.is_empty() {
                if let Some(from) = &step.from {
                    rendered.push(from.id.clone());
                }
            }
            if let Some(via) = &step.via {
                rendered.push(format!("({})", via.id));
            }
            match &step.to {
                Some(to) => rendered.push(to.id.clone()),
                None => rendered.push("…".to_string()),
            }
        }
        println!("  {}", rendered.join(" -> "));
    }

    Ok(())
}
