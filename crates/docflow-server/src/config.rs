//! Configuration management for the docflow server

use anyhow::{Context, Result};
use docflow::DocflowConfig;
use serde::Deserialize;
use std::str::FromStr;

/// Catalog backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogBackend {
    #[default]
    MongoDB,
    Memory,
}

impl FromStr for CatalogBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(CatalogBackend::MongoDB),
            "memory" | "mem" => Ok(CatalogBackend::Memory),
            _ => Err(format!("Unknown catalog backend: {}", s)),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server host (default: 0.0.0.0)
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port (default: 8080)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Catalog backend (default: mongodb)
    #[serde(default)]
    pub catalog_backend: CatalogBackend,

    /// Database URL (default: mongodb://localhost:27017)
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Database name (default: docflow)
    #[serde(default = "default_database_name")]
    pub database_name: String,

    /// Root directory of the filesystem object store
    #[serde(default = "default_storage_root")]
    pub storage_root: String,

    /// Public base URL that capability links point at.
    /// Falls back to http://{host}:{port}.
    pub public_base_url: Option<String>,

    /// Secret used to sign capability links (required)
    pub capability_secret: Option<String>,

    /// CORS allowed origins (comma-separated). If empty, any origin is allowed.
    pub cors_allowed_origins: Option<String>,

    /// JSON file of employee records loaded into the memory catalog
    pub seed_employees: Option<String>,

    /// Workflow limits
    #[serde(default)]
    pub workflow: DocflowConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_database_url() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_database_name() -> String {
    "docflow".to_string()
}

fn default_storage_root() -> String {
    "./data/objects".to_string()
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let catalog_backend = match std::env::var("CATALOG_BACKEND") {
            Ok(s) => s.parse().map_err(anyhow::Error::msg)?,
            Err(_) => CatalogBackend::default(),
        };
        let host = std::env::var("DOCFLOW_HOST").unwrap_or_else(|_| default_host());
        let port = env_parse("DOCFLOW_PORT").unwrap_or_else(default_port);
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("MONGODB_URL"))
            .unwrap_or_else(|_| default_database_url());
        let database_name = std::env::var("DATABASE_NAME")
            .or_else(|_| std::env::var("MONGODB_DATABASE"))
            .unwrap_or_else(|_| default_database_name());
        let storage_root = std::env::var("STORAGE_ROOT").unwrap_or_else(|_| default_storage_root());
        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .or_else(|_| std::env::var("BASE_URL"))
            .ok();
        let capability_secret = std::env::var("CAPABILITY_SECRET").ok();
        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS").ok();
        let seed_employees = std::env::var("SEED_EMPLOYEES").ok();

        let mut workflow = DocflowConfig::default();
        if let Some(v) = env_parse("MAX_UPLOAD_BYTES") {
            workflow.max_upload_bytes = v;
        }
        if let Some(v) = env_parse("CAPABILITY_TTL_DAYS") {
            workflow.capability_ttl_days = v;
        }
        if let Some(v) = env_parse("LIST_LIMIT") {
            workflow.list_limit = v;
        }
        workflow.validate()?;

        Ok(Self {
            host,
            port,
            catalog_backend,
            database_url,
            database_name,
            storage_root,
            public_base_url,
            capability_secret,
            cors_allowed_origins,
            seed_employees,
            workflow,
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;
        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file")?;
        config
            .workflow
            .validate()
            .with_context(|| format!("Invalid [workflow] section in {}", path))?;
        Ok(config)
    }

    /// Base URL for capability links
    pub fn base_url(&self) -> String {
        match &self.public_base_url {
            Some(url) if !url.trim().is_empty() => url.trim().to_string(),
            _ => {
                let host = if self.host == "0.0.0.0" {
                    "localhost"
                } else {
                    self.host.as_str()
                };
                format!("http://{}:{}", host, self.port)
            }
        }
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            catalog_backend: CatalogBackend::default(),
            database_url: default_database_url(),
            database_name: default_database_name(),
            storage_root: default_storage_root(),
            public_base_url: None,
            capability_secret: None,
            cors_allowed_origins: None,
            seed_employees: None,
            workflow: DocflowConfig::default(),
        }
    }
}
