//! Site configuration (_config.yml)

use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub language: String,
    pub timezone: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub public_dir: String,

    // Content repository
    pub api_endpoint: String,
    pub access_token: Option<String>,
    pub document_type: String,

    // Pagination
    pub page_size: u32,

    // Fetching
    /// Seconds a rendered page stays fresh in the server cache
    pub revalidate: u64,
    /// Rendered pages kept in the server cache at most
    pub cache_capacity: u64,
    /// Seconds before a repository request is abandoned
    pub request_timeout: u64,
    /// Seconds the master ref is reused before it is looked up again
    pub ref_ttl: u64,
    /// Posts rendered in parallel during generation
    pub concurrency: usize,

    // Reading time
    pub words_per_minute: usize,

    // Comments
    #[serde(default)]
    pub comments: CommentsConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Spacetraveling".to_string(),
            language: "pt-BR".to_string(),
            timezone: "America/Sao_Paulo".to_string(),

            url: "http://localhost:3000".to_string(),
            root: "/".to_string(),

            public_dir: "public".to_string(),

            api_endpoint: "https://your-repo-name.cdn.prismic.io/api/v2".to_string(),
            access_token: None,
            document_type: "post".to_string(),

            page_size: 10,

            revalidate: 60 * 60,
            cache_capacity: 1000,
            request_timeout: 10,
            ref_ttl: 5,
            concurrency: 4,

            words_per_minute: 200,

            comments: CommentsConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config: SiteConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        Ok(config)
    }

    /// Configured timezone, falling back to UTC for unknown names
    pub fn tz(&self) -> Tz {
        match self.timezone.parse::<Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                if !self.timezone.is_empty() {
                    tracing::warn!("Unknown timezone {:?}, using UTC", self.timezone);
                }
                Tz::UTC
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout.max(1))
    }

    pub fn revalidate(&self) -> Duration {
        Duration::from_secs(self.revalidate)
    }

    /// Fields fetched for listing pages
    pub fn summary_fields(&self) -> Vec<String> {
        ["title", "subtitle", "author"]
            .iter()
            .map(|field| format!("{}.{}", self.document_type, field))
            .collect()
    }
}

/// Comment widget (utterances) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentsConfig {
    pub enable: bool,
    pub repo: String,
    pub issue_term: String,
    pub label: String,
    pub theme: String,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            enable: true,
            repo: "caiulucas/ignite-spacetraveling".to_string(),
            issue_term: "pathname".to_string(),
            label: "blog-comment".to_string(),
            theme: "photon-dark".to_string(),
        }
    }
}
