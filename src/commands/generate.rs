//! Generate static files

use anyhow::Result;

use crate::generator::Generator;
use crate::Spacetraveling;

/// Generate the static site from the published content
pub async fn run(site: &Spacetraveling) -> Result<()> {
    let start = std::time::Instant::now();

    let client = site.client()?;
    tracing::info!("Fetching content from {}", client.endpoint());

    let generator = Generator::new(&site.config, &site.public_dir, client)?;
    let report = generator.generate().await?;

    let duration = start.elapsed();
    tracing::info!(
        "Generated {} listing pages and {} posts in {:.2}s",
        report.listing_pages,
        report.posts,
        duration.as_secs_f64()
    );

    if report.failed > 0 {
        anyhow::bail!("{} posts failed to generate", report.failed);
    }

    Ok(())
}
