//! Docflow Server - document catalog and sharing workflow
//!
//! Serves the docflow API over HTTP. Caller identity is taken from trusted
//! headers set by an upstream identity provider.

mod auth;
mod config;
mod state;

use anyhow::Result;
use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::Json,
    routing::get,
    Router,
};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docflow::catalog::{CatalogStore, MemoryCatalog, MongoCatalog};
use docflow::models::Employee;
use docflow::storage::{CapabilitySigner, LocalObjectStore, ObjectStore};
use docflow::{DocflowError, DocumentWorkflow, MongoDb};

use crate::auth::middleware::identity_middleware;
use crate::config::{CatalogBackend, Config};
use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "docflow-server", version, about = "Document catalog and sharing server")]
struct Cli {
    /// TOML configuration file; environment variables are used when absent
    #[arg(short, long, env = "DOCFLOW_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docflow_server=info,docflow=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    info!("Starting Docflow Server on {}:{}", config.host, config.port);

    let objects = build_object_store(&config)?;
    let catalog = build_catalog(&config).await?;
    let workflow = DocumentWorkflow::with_config(objects, catalog, config.workflow.clone());

    let state = Arc::new(AppState {
        workflow,
        config: config.clone(),
    });

    let app = build_router(state);

    let addr = SocketAddr::new(config.host.parse()?, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn build_object_store(config: &Config) -> Result<Arc<dyn ObjectStore>, DocflowError> {
    let secret = config
        .capability_secret
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| DocflowError::StorageConfig("CAPABILITY_SECRET is not set".to_string()))?;
    let signer = CapabilitySigner::new(secret, config.base_url())
        .map_err(|e| DocflowError::StorageConfig(e.to_string()))?;
    let store = LocalObjectStore::new(config.storage_root.trim(), signer)
        .map_err(|e| DocflowError::StorageConfig(e.to_string()))?;
    Ok(Arc::new(store))
}

async fn build_catalog(config: &Config) -> Result<Arc<dyn CatalogStore>> {
    match config.catalog_backend {
        CatalogBackend::MongoDB => {
            info!("Connecting to MongoDB: {}", config.database_name);
            let db = MongoDb::connect(&config.database_url, &config.database_name).await?;
            Ok(Arc::new(MongoCatalog::new(db)))
        }
        CatalogBackend::Memory => {
            warn!("Using in-memory catalog; records are lost on restart");
            let catalog = MemoryCatalog::new();
            if let Some(path) = &config.seed_employees {
                let content = std::fs::read_to_string(path)?;
                let employees: Vec<Employee> = serde_json::from_str(&content)?;
                info!("Seeded {} employee(s) from {}", employees.len(), path);
                for employee in employees {
                    catalog.put_employee(employee);
                }
            }
            Ok(Arc::new(catalog))
        }
    }
}

fn build_cors(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins()
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

fn build_router(state: Arc<AppState>) -> Router {
    let cors = build_cors(&state.config);
    let docs_state = Arc::new(docflow::routes::AppState::new(state.workflow.clone()));

    // Public routes (no identity required)
    let public_routes = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .with_state(state.clone());

    // Document routes, wrapped with the identity middleware
    let protected_routes = docflow::routes::configure(docs_state.clone())
        .layer(axum::middleware::from_fn(identity_middleware));

    let api = protected_routes.merge(docflow::routes::public_routes(docs_state));

    Router::new()
        .merge(public_routes)
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn root() -> &'static str {
    "Docflow Server"
}

async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let catalog = state.workflow.catalog().ping().await;
    let objects = state.workflow.objects().health_check().await;

    match (catalog, objects) {
        (Ok(()), Ok(())) => Ok(Json(serde_json::json!({
            "status": "healthy",
            "catalog": "connected",
            "objectStore": "available",
            "version": env!("CARGO_PKG_VERSION")
        }))),
        (catalog, objects) => {
            if let Err(e) = catalog {
                warn!("Health check: catalog unavailable: {}", e);
            }
            if let Err(e) = objects {
                warn!("Health check: object store unavailable: {}", e);
            }
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
