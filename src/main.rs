use lineagegraph::Config;
use lineagegraph::db::{Db, migrate};
use lineagegraph::graph::seed;
use lineagegraph::http::HttpServer;
use lineagegraph::taxonomy::TaxonomyRegistry;
use std::path::{Path, PathBuf};
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger from environment variable or default to info level
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    // Parse command-line arguments
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("verify");

    match command {
        "serve" => {
            run_server().await?;
        }
        "seed" => {
            let fixture = args.get(2)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("seed/fraud_detection.yaml"));
            run_seed(fixture).await?;
        }
        "verify" | _ => {
            // Default: verify database schema and taxonomy
            run_verification().await?;
        }
    }

    Ok(())
}

/// Open the database and bring the schema up to date.
async fn init_db(config: &Config) -> Result<Db> {
    let db = Db::new(config.db_path());

    let migrations_dir = Path::new("migrations");
    db.with_connection({
        let migrations_dir = migrations_dir.to_path_buf();
        move |conn| migrate::run_migrations(conn, &migrations_dir)
    }).await?;

    Ok(db)
}

/// Run the HTTP traversal server
async fn run_server() -> Result<()> {
    log::info!("Starting lineagegraph v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    let db = init_db(&config).await?;
    log::info!("Database initialized successfully");

    // Taxonomy misconfiguration must fail startup, never a request
    let registry = TaxonomyRegistry::load(config.taxonomy_path())?;
    log::info!("Taxonomy loaded from {}", config.taxonomy_path().display());

    let server = HttpServer::new(db, registry, config.clone());
    server.run(config.http_server.port).await?;

    Ok(())
}

/// Load a seed fixture into the graph tables
async fn run_seed(fixture: PathBuf) -> Result<()> {
    let config = Config::load()?;
    let db = init_db(&config).await?;

    log::info!("Loading seed fixture {}", fixture.display());
    let stats = db.with_connection(move |conn| {
        seed::load_seed(conn, &fixture)
    }).await?;

    log::info!("Seed loaded: {} nodes, {} edges", stats.nodes, stats.edges);
    Ok(())
}

/// Verify that the schema, taxonomy, and graph content are in shape
async fn run_verification() -> Result<()> {
    log::info!("Starting lineagegraph v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    log::info!("Configuration loaded successfully");
    log::info!("Database path: {}", config.db_path().display());
    log::info!("Taxonomy path: {}", config.taxonomy_path().display());

    let db = init_db(&config).await?;
    log::info!("Database initialized successfully");

    // The registry validates itself on load
    TaxonomyRegistry::load(config.taxonomy_path())?;
    log::info!("✓ Taxonomy validates");

    verify_database_schema(&db).await?;

    Ok(())
}

/// Verify that all expected database objects exist
async fn verify_database_schema(db: &Db) -> Result<()> {
    use lineagegraph::error::LineageError;

    db.with_connection(|conn| {
        // Check tables
        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
        let tables: Vec<String> = stmt.query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        let expected_tables = vec!["edges", "nodes", "query_logs", "schema_migrations"];
        for table in &expected_tables {
            if !tables.iter().any(|t| t == table) {
                return Err(LineageError::Config(format!("Missing table: {}", table)));
            }
            log::debug!("✓ Table exists: {}", table);
        }

        // Check adjacency indexes
        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%' ORDER BY name")?;
        let indexes: Vec<String> = stmt.query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        for index_name in ["idx_edges_source", "idx_edges_target", "idx_edges_identity"] {
            if !indexes.iter().any(|i| i == index_name) {
                return Err(LineageError::Config(format!("Missing index: {}", index_name)));
            }
            log::debug!("✓ Index exists: {}", index_name);
        }

        // Check pragmas
        let journal_mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
        if journal_mode.to_uppercase() != "WAL" {
            return Err(LineageError::Config(format!("Journal mode is not WAL: {}", journal_mode)));
        }
        log::debug!("✓ Journal mode: WAL");

        let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        if integrity != "ok" {
            return Err(LineageError::Config(format!("Database integrity check failed: {}", integrity)));
        }
        log::info!("✓ Database integrity: OK");

        // Report graph content
        let node_count: i64 = conn.query_row("SELECT count(*) FROM nodes", [], |row| row.get(0))?;
        let edge_count: i64 = conn.query_row("SELECT count(*) FROM edges", [], |row| row.get(0))?;
        log::info!("Graph content: {} nodes, {} edges", node_count, edge_count);
        if node_count == 0 {
            log::warn!("Graph is empty. Load a fixture with: lineagegraph seed seed/fraud_detection.yaml");
        }

        Ok(())
    }).await?;

    log::info!("✓ Schema verification complete");
    Ok(())
}
