use anyhow::{Context, Result};
use std::env;

/// Runtime configuration, resolved once at startup and handed to each
/// service at construction instead of being read from the environment at
/// call sites.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    /// External workflow-engine webhook. Optional: when unset, todo-create
    /// notifications are skipped and chat relay reports "not configured".
    pub webhook_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let webhook_url = env::var("N8N_WEBHOOK_URL").ok().filter(|v| !v.is_empty());

        Ok(Self {
            database_url,
            bind_addr,
            webhook_url,
        })
    }
}
