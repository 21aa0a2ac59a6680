//! Built-in spacetraveling templates using Tera template engine
//!
//! Listing and detail pages share one renderer; what differs between the
//! published site and a preview session is carried by [`ViewOptions`].

use anyhow::Result;
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::client::parse_timestamp;
use crate::config::{CommentsConfig, SiteConfig};
use crate::content::rich_text::as_html;
use crate::content::{Neighbors, NavigablePost, PostDetail, PostSummary, ReadingTimeEstimator};
use crate::helpers::{date_xml, format_date, html_escape, listing_path, post_path};
use crate::helpers::{DATE_PATTERN, DATE_TIME_PATTERN};
use crate::pagination::PaginationState;

/// Static files shipped with the templates, by site-relative path
pub const ASSETS: &[(&str, &str, &str)] = &[
    (
        "css/style.css",
        "text/css; charset=utf-8",
        include_str!("spacetraveling/style.css"),
    ),
    (
        "images/logo.svg",
        "image/svg+xml",
        include_str!("spacetraveling/logo.svg"),
    ),
];

/// What a rendered view shows besides its content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ViewOptions {
    /// Rendered against a preview ref; shows the exit-preview link instead of the enter one
    pub preview: bool,
    /// Show previous/next post navigation
    pub neighbors: bool,
}

impl ViewOptions {
    pub fn new(preview: bool, neighbors: bool) -> Self {
        Self { preview, neighbors }
    }
}

/// Template renderer with embedded spacetraveling templates
pub struct TemplateRenderer {
    tera: Tera,
    config: SiteConfig,
    site: SiteData,
    estimator: ReadingTimeEstimator,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new(config: &SiteConfig) -> Result<Self> {
        let mut tera = Tera::default();

        // Content is escaped while building view data
        tera.autoescape_on(vec![]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("spacetraveling/layout.html")),
            ("home.html", include_str!("spacetraveling/home.html")),
            ("post.html", include_str!("spacetraveling/post.html")),
            ("not_found.html", include_str!("spacetraveling/not_found.html")),
            ("error.html", include_str!("spacetraveling/error.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("spacetraveling/partials/header.html"),
            ),
            (
                "partials/post_info.html",
                include_str!("spacetraveling/partials/post_info.html"),
            ),
            (
                "partials/preview.html",
                include_str!("spacetraveling/partials/preview.html"),
            ),
            (
                "partials/comments.html",
                include_str!("spacetraveling/partials/comments.html"),
            ),
        ])?;

        let tz = config.tz();
        tera.register_filter(
            "date_format",
            move |value: &tera::Value, args: &HashMap<String, tera::Value>| {
                date_format_filter(value, args, tz)
            },
        );

        Ok(Self {
            tera,
            config: config.clone(),
            site: SiteData::from_config(config),
            estimator: ReadingTimeEstimator::new(config.words_per_minute),
        })
    }

    /// Render the listing accumulated through page `page` (1-based)
    pub fn render_home(
        &self,
        state: &PaginationState,
        page: usize,
        options: ViewOptions,
    ) -> Result<String> {
        let posts: Vec<SummaryData> = state
            .items()
            .map(|summary| SummaryData::new(&self.config, summary))
            .collect();
        let next_link = state
            .has_more()
            .then(|| listing_path(&self.config, page + 1));

        let mut context = self.base_context("Página Inicial", options);
        context.insert("posts", &posts);
        context.insert("next_link", &next_link);
        self.render("home.html", &context)
    }

    /// Render a post detail page
    pub fn render_post(
        &self,
        post: &PostDetail,
        neighbors: Option<&Neighbors>,
        options: ViewOptions,
    ) -> Result<String> {
        let data = PostData::new(post, &self.estimator);
        let nav = |p: &Option<NavigablePost>| p.as_ref().map(|p| NavData::new(&self.config, p));
        let (prev, next) = match neighbors {
            Some(n) if options.neighbors => (nav(&n.prev), nav(&n.next)),
            _ => (None, None),
        };

        let mut context = self.base_context(&data.title, options);
        context.insert("post", &data);
        context.insert("prev", &prev);
        context.insert("next", &next);
        self.render("post.html", &context)
    }

    pub fn render_not_found(&self, options: ViewOptions) -> Result<String> {
        let context = self.base_context("Não encontrado", options);
        self.render("not_found.html", &context)
    }

    pub fn render_error(&self, message: &str, retry_link: &str, options: ViewOptions) -> Result<String> {
        let mut context = self.base_context("Erro", options);
        context.insert("message", &html_escape(message));
        context.insert("retry_link", &html_escape(retry_link));
        self.render("error.html", &context)
    }

    fn base_context(&self, page_title: &str, options: ViewOptions) -> Context {
        let mut context = Context::new();
        context.insert("site", &self.site);
        context.insert("options", &options);
        context.insert("page_title", &html_escape(page_title));
        context
    }

    /// Render a template with given context
    fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Tera filter: format an RFC 3339 timestamp in the site timezone
///
/// `format` is `date` (default), `datetime`, or a strftime pattern.
fn date_format_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
    tz: Tz,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("date_format", "value", String, value);
    let format = match args.get("format") {
        Some(val) => tera::try_get_value!("date_format", "format", String, val),
        None => "date".to_string(),
    };
    let pattern = match format.as_str() {
        "date" => DATE_PATTERN,
        "datetime" => DATE_TIME_PATTERN,
        custom => custom,
    };

    match parse_timestamp(&s) {
        Some(date) => Ok(tera::Value::String(format_date(
            &date.with_timezone(&tz),
            pattern,
        ))),
        None => Ok(tera::Value::String(s)),
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub language: String,
    pub root: String,
    pub comments: CommentsConfig,
}

impl SiteData {
    fn from_config(config: &SiteConfig) -> Self {
        Self {
            title: html_escape(&config.title),
            language: config.language.clone(),
            root: format!("{}/", config.root.trim_end_matches('/')),
            comments: config.comments.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryData {
    pub path: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub date: Option<String>,
}

impl SummaryData {
    fn new(config: &SiteConfig, summary: &PostSummary) -> Self {
        Self {
            path: post_path(config, &summary.uid),
            title: html_escape(&summary.title),
            subtitle: html_escape(&summary.subtitle),
            author: html_escape(&summary.author),
            date: summary.publication_date.as_ref().map(date_xml),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostData {
    pub title: String,
    pub author: String,
    pub banner_url: Option<String>,
    pub date: Option<String>,
    pub edited: Option<String>,
    pub reading_time: String,
    pub sections: Vec<SectionData>,
}

impl PostData {
    fn new(post: &PostDetail, estimator: &ReadingTimeEstimator) -> Self {
        let edited = if post.was_edited() {
            post.last_modified.as_ref().map(date_xml)
        } else {
            None
        };

        Self {
            title: html_escape(&post.title),
            author: html_escape(&post.author),
            banner_url: post.banner_url.as_deref().map(html_escape),
            date: post.publication_date.as_ref().map(date_xml),
            edited,
            reading_time: estimator.estimate(&post.content).to_string(),
            sections: post
                .content
                .iter()
                .map(|s| SectionData {
                    heading: html_escape(&s.heading),
                    html: as_html(&s.body),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionData {
    pub heading: String,
    pub html: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NavData {
    pub title: String,
    pub path: String,
}

impl NavData {
    fn new(config: &SiteConfig, post: &NavigablePost) -> Self {
        Self {
            title: html_escape(&post.title),
            path: post_path(config, &post.uid),
        }
    }
}
