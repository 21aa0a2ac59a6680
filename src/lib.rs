//! spacetraveling: a statically generated blog over a headless content API
//!
//! Posts live in a remote content repository. This crate pages through them,
//! reduces raw documents to display-ready summaries and details, estimates
//! reading time, resolves previous/next posts, and renders everything with
//! embedded Tera templates, either to static files or live from a server
//! that also supports preview sessions.

pub mod cache;
pub mod client;
pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod generator;
pub mod helpers;
pub mod pagination;
pub mod preview;
pub mod server;
pub mod templates;

#[cfg(test)]
mod testing;

use anyhow::Result;
use std::path::{Path, PathBuf};

use client::HttpContentClient;

/// The main spacetraveling application
#[derive(Clone)]
pub struct Spacetraveling {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
}

impl Spacetraveling {
    /// Create a new instance from a directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };

        let public_dir = base_dir.join(&config.public_dir);

        Ok(Self {
            config,
            base_dir,
            public_dir,
        })
    }

    /// HTTP client for the configured content repository
    pub fn client(&self) -> Result<HttpContentClient> {
        Ok(HttpContentClient::from_config(&self.config)?)
    }

    /// Initialize a new site
    pub fn init(&self) -> Result<()> {
        commands::init::run(self)
    }

    /// Generate the static site
    pub async fn generate(&self) -> Result<()> {
        commands::generate::run(self).await
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
