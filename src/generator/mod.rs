//! Generator module - renders the listing and every post to static HTML

use anyhow::Result;
use futures::stream::{self, StreamExt};
use std::fs;
use std::path::{Path, PathBuf};

use crate::client::ContentSource;
use crate::config::SiteConfig;
use crate::content::{fetch_post, resolve_neighbors};
use crate::pagination::{listing_query, LoadOutcome, PaginationController, PaginationState};
use crate::templates::{TemplateRenderer, ViewOptions, ASSETS};

/// What a generation run produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateReport {
    /// Listing pages written (`index.html` included)
    pub listing_pages: usize,
    /// Post pages written
    pub posts: usize,
    /// Posts that could not be rendered
    pub failed: usize,
}

/// Static site generator over a content source
pub struct Generator<S> {
    config: SiteConfig,
    public_dir: PathBuf,
    source: S,
    renderer: TemplateRenderer,
}

impl<S: ContentSource> Generator<S> {
    /// Create a new generator
    pub fn new(config: &SiteConfig, public_dir: impl Into<PathBuf>, source: S) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            public_dir: public_dir.into(),
            source,
            renderer: TemplateRenderer::new(config)?,
        })
    }

    /// Generate the entire site
    pub async fn generate(&self) -> Result<GenerateReport> {
        // Ensure public directory exists
        fs::create_dir_all(&self.public_dir)?;

        self.write_assets()?;

        let (listing_pages, uids) = self.generate_listing_pages().await?;
        tracing::info!("Generated {} listing pages", listing_pages);

        let (posts, failed) = self.generate_post_pages(uids).await;
        tracing::info!("Generated {} posts", posts);

        self.generate_not_found()?;

        Ok(GenerateReport {
            listing_pages,
            posts,
            failed,
        })
    }

    /// Walk the listing page by page; returns the page count and every uid seen
    async fn generate_listing_pages(&self) -> Result<(usize, Vec<String>)> {
        let controller = PaginationController::new(&self.source, self.config.request_timeout());
        let (predicates, options) = listing_query(&self.config, None);

        let mut state = controller.load_first(&predicates, &options).await?;
        let mut page = 1;
        self.write_listing_page(&state, page)?;

        loop {
            match controller.load_next(&mut state).await? {
                LoadOutcome::Appended(_) => {
                    page += 1;
                    self.write_listing_page(&state, page)?;
                }
                LoadOutcome::Exhausted | LoadOutcome::Ignored | LoadOutcome::Discarded => break,
            }
        }

        let uids = state.items().map(|s| s.uid.clone()).collect();
        Ok((page, uids))
    }

    fn write_listing_page(&self, state: &PaginationState, page: usize) -> Result<()> {
        let html = self.renderer.render_home(state, page, ViewOptions::default())?;
        let path = if page == 1 {
            "index.html".to_string()
        } else {
            format!("page/{}/index.html", page)
        };
        self.write_file(&path, &html)
    }

    /// Render every post with bounded concurrency; returns (written, failed)
    async fn generate_post_pages(&self, uids: Vec<String>) -> (usize, usize) {
        let concurrency = self.config.concurrency.max(1);

        let results: Vec<(String, Result<()>)> = stream::iter(uids)
            .map(|uid| async move {
                let result = self.generate_post(&uid).await;
                (uid, result)
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut written = 0;
        let mut failed = 0;
        for (uid, result) in results {
            match result {
                Ok(()) => written += 1,
                Err(e) => {
                    tracing::error!("Failed to generate post {}: {:#}", uid, e);
                    failed += 1;
                }
            }
        }
        (written, failed)
    }

    /// Render a single post page with its neighbors
    async fn generate_post(&self, uid: &str) -> Result<()> {
        if !is_safe_segment(uid) {
            anyhow::bail!("refusing to write post with uid {:?}", uid);
        }

        let doc_type = &self.config.document_type;
        let post = fetch_post(&self.source, doc_type, uid, None).await?;
        let neighbors = resolve_neighbors(&self.source, doc_type, &post, None).await?;

        let html = self
            .renderer
            .render_post(&post, Some(&neighbors), ViewOptions::new(false, true))?;
        self.write_file(&format!("post/{}/index.html", uid), &html)?;
        tracing::debug!("Generated post: {}", uid);
        Ok(())
    }

    fn generate_not_found(&self) -> Result<()> {
        let html = self.renderer.render_not_found(ViewOptions::default())?;
        self.write_file("404.html", &html)
    }

    fn write_assets(&self) -> Result<()> {
        for (path, _, content) in ASSETS {
            self.write_file(path, content)?;
        }
        Ok(())
    }

    fn write_file(&self, relative: &str, content: &str) -> Result<()> {
        let output_path = self.public_dir.join(relative);
        write_file(&output_path, content)?;
        tracing::debug!("Generated: {:?}", output_path);
        Ok(())
    }
}

fn write_file(output_path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| anyhow::anyhow!("Failed to create dir {:?}: {}", parent, e))?;
    }
    fs::write(output_path, content)
        .map_err(|e| anyhow::anyhow!("Failed to write {:?}: {}", output_path, e))
}

/// A uid usable as a single directory name
fn is_safe_segment(uid: &str) -> bool {
    !uid.is_empty() && uid != "." && uid != ".." && !uid.contains(['/', '\\'])
}
