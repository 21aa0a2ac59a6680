//! Initialize a new spacetraveling site

use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::Spacetraveling;

const DEFAULT_CONFIG: &str = r#"# spacetraveling configuration

# Site
title: Spacetraveling
language: pt-BR
timezone: America/Sao_Paulo

# URL
url: http://localhost:3000
root: /

# Directory
public_dir: public

# Content repository
api_endpoint: https://your-repo-name.cdn.prismic.io/api/v2
# access_token: ''
document_type: post

# Pagination
page_size: 10

# Fetching (seconds)
revalidate: 3600
request_timeout: 10
ref_ttl: 5
concurrency: 4

# Server cache (rendered pages)
cache_capacity: 1000

# Reading time
words_per_minute: 200

# Comments (utterances)
comments:
  enable: true
  repo: caiulucas/ignite-spacetraveling
  issue_term: pathname
  label: blog-comment
  theme: photon-dark
"#;

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    fs::create_dir_all(target_dir)?;

    let config_path = target_dir.join("_config.yml");
    if config_path.exists() {
        anyhow::bail!("{:?} already exists", config_path);
    }

    fs::write(&config_path, DEFAULT_CONFIG)?;
    tracing::info!("Created {:?}", config_path);

    Ok(())
}

/// Run the init command with an existing site
pub fn run(site: &Spacetraveling) -> Result<()> {
    init_site(&site.base_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_default_config() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("blog");

        init_site(&target).unwrap();
        let config = SiteConfig::load(target.join("_config.yml")).unwrap();
        let defaults = SiteConfig::default();

        assert_eq!(config.title, defaults.title);
        assert_eq!(config.api_endpoint, defaults.api_endpoint);
        assert_eq!(config.access_token, None);
        assert_eq!(config.page_size, defaults.page_size);
        assert_eq!(config.comments.repo, defaults.comments.repo);
    }

    #[test]
    fn test_init_keeps_existing_config() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("_config.yml"), "title: Mine\n").unwrap();

        assert!(init_site(tmp.path()).is_err());
        let content = fs::read_to_string(tmp.path().join("_config.yml")).unwrap();
        assert_eq!(content, "title: Mine\n");
    }
}
