//! List site content

use anyhow::Result;
use std::io::Write;

use crate::client::ContentSource;
use crate::config::SiteConfig;
use crate::helpers::post_date;
use crate::pagination::{listing_query, PaginationController};
use crate::Spacetraveling;

/// List site content by type
pub async fn run(site: &Spacetraveling, content_type: &str) -> Result<()> {
    match content_type {
        "post" | "posts" => {
            let client = site.client()?;
            let stdout = std::io::stdout();
            list_posts(&client, &site.config, &mut stdout.lock()).await
        }
        _ => {
            anyhow::bail!("Unknown type: {}. Available: post", content_type);
        }
    }
}

/// Page through every published post, newest first
pub async fn list_posts<S, W>(source: &S, config: &SiteConfig, out: &mut W) -> Result<()>
where
    S: ContentSource,
    W: Write,
{
    let controller = PaginationController::new(source, config.request_timeout());
    let (predicates, options) = listing_query(config, None);

    let mut state = controller.load_first(&predicates, &options).await?;
    controller.load_all(&mut state, None).await?;

    let tz = config.tz();
    writeln!(out, "Posts ({}):", state.len())?;
    for post in state.items() {
        let date = post
            .publication_date
            .as_ref()
            .map(|d| post_date(d, tz))
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            out,
            "  {} - {} [{}] ({})",
            date, post.title, post.uid, post.author
        )?;
    }

    Ok(())
}
