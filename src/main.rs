use axum::Router;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cardbase::config::Config;
use cardbase::db::{create_pool, init_db, queries, AppState};
use cardbase::handlers;
use cardbase::middleware::sweep_expired_plans;
use cardbase::models::{CreateApiKey, CreateCompany, CreateUser, UserRole};

#[derive(Parser, Debug)]
#[command(name = "cardbase")]
#[command(about = "Multi-tenant digital visiting card and lead management backend")]
struct Cli {
    /// Seed the database with dev data (company, admin user, API key)
    #[arg(long)]
    seed: bool,

    /// Delete the database on exit (dev mode only, useful for fresh starts)
    #[arg(long)]
    ephemeral: bool,
}

/// Seeds the database with dev data for testing.
/// Creates: a company, a company-admin user, and a lead-ingestion API key.
/// Only runs in dev mode and when the database is empty.
fn seed_dev_data(state: &AppState) {
    let conn = state.db.get().expect("Failed to get db connection for seeding");

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM companies", [], |row| row.get(0))
        .expect("Failed to count companies");
    if count > 0 {
        tracing::info!("Database already has data, skipping seed");
        return;
    }

    tracing::info!("============================================");
    tracing::info!("SEEDING DEV DATA");
    tracing::info!("============================================");

    let company = queries::create_company(
        &conn,
        &CreateCompany {
            name: "Dev Company".to_string(),
            slug: "dev-company".to_string(),
            email: Some("dev@cardbase.local".to_string()),
            phone: Some("9999999999".to_string()),
        },
    )
    .expect("Failed to create dev company");

    tracing::info!("Company: {} (id: {})", company.name, company.id);

    let admin = queries::create_user(
        &conn,
        &CreateUser {
            username: "dev-admin".to_string(),
            email: "admin@cardbase.local".to_string(),
            role: UserRole::CompanyAdmin,
            company_id: Some(company.id),
        },
    )
    .expect("Failed to create dev admin");

    tracing::info!("Admin user: {} ({})", admin.username, admin.email);

    let (_, raw_key) = queries::create_api_key(
        &conn,
        company.id,
        &CreateApiKey {
            name: Some("Dev ingestion key".to_string()),
            source_type: Some("website".to_string()),
        },
    )
    .expect("Failed to create dev API key");

    tracing::info!("============================================");
    tracing::info!("DEV DATA SEEDED SUCCESSFULLY");
    tracing::info!("============================================");

    // Copy-paste friendly output (no log formatting)
    println!();
    println!("--- COPY FROM HERE ---");
    println!("  company_id: {}", company.id);
    println!("  api_key: {}", raw_key);
    println!("--- END COPY ---");
    println!();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cardbase=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    if !config.gateway.is_configured() {
        tracing::warn!(
            "Payment gateway credentials not configured - plan upgrades will be rejected"
        );
    }

    // Create database connection pool and initialize schema
    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }

    let state = AppState {
        db: db_pool,
        base_url: config.base_url.clone(),
        gateway: config.gateway.clone(),
    };

    // Seed dev data if --seed flag is passed (only in dev mode)
    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set CARDBASE_ENV=dev)");
        } else {
            seed_dev_data(&state);
        }
    }

    // Build the application router. The plan expiry sweep runs before
    // every request.
    let app = Router::new()
        .merge(handlers::router(config.rate_limit))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            sweep_expired_plans,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start the server
    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    let cleanup_on_exit = cli.ephemeral && config.dev_mode;
    let db_path = config.database_path.clone();

    if cleanup_on_exit {
        tracing::info!("EPHEMERAL MODE: database will be deleted on exit");
    }

    tracing::info!("Cardbase server listening on {}", addr);

    // Use into_make_service_with_connect_info to enable IP-based rate limiting
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Failed to start server");

    if cleanup_on_exit {
        tracing::info!("Cleaning up ephemeral database...");
        if let Err(e) = std::fs::remove_file(&db_path) {
            tracing::warn!("Failed to remove {}: {}", db_path, e);
        } else {
            tracing::info!("Removed {}", db_path);
        }
        let _ = std::fs::remove_file(format!("{}-wal", db_path));
        let _ = std::fs::remove_file(format!("{}-shm", db_path));
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
