//! Server rendering pages live from the content repository
//!
//! Published pages are cached for the revalidation window. A visitor holding
//! the preview cookie gets every query pinned to the preview ref and bypasses
//! the cache.

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;

use crate::cache::RenderCache;
use crate::client::ContentSource;
use crate::config::SiteConfig;
use crate::content::{fetch_post, resolve_neighbors};
use crate::error::ContentError;
use crate::helpers::url_for;
use crate::pagination::{listing_query, PaginationController};
use crate::preview::{resolve_preview, PreviewSession, PREVIEW_COOKIE};
use crate::templates::{TemplateRenderer, ViewOptions, ASSETS};
use crate::Spacetraveling;

/// Shared server state
pub struct AppState<S> {
    config: SiteConfig,
    source: S,
    renderer: TemplateRenderer,
    cache: RenderCache,
}

impl<S: ContentSource> AppState<S> {
    pub fn new(config: &SiteConfig, source: S) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            source,
            renderer: TemplateRenderer::new(config)?,
            cache: RenderCache::new(config.revalidate(), config.cache_capacity),
        })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn cache(&self) -> &RenderCache {
        &self.cache
    }

    /// Render listing pages 1..=`page` accumulated through the controller
    async fn render_listing(&self, page: usize, preview: Option<&PreviewSession>) -> PageResult {
        let controller = PaginationController::new(&self.source, self.config.request_timeout());
        let (predicates, options) = listing_query(&self.config, preview.map(|p| p.reference()));

        let (state, loaded) = controller
            .load_through(&predicates, &options, page)
            .await?;
        if loaded < page {
            return Err(PageError::Content(ContentError::NotFound {
                doc_type: "page".to_string(),
                uid: page.to_string(),
            }));
        }

        let options = ViewOptions::new(preview.is_some(), false);
        Ok(self.renderer.render_home(&state, page, options)?)
    }

    async fn render_post(&self, uid: &str, preview: Option<&PreviewSession>) -> PageResult {
        let reference = preview.map(|p| p.reference());
        let doc_type = &self.config.document_type;

        let post = fetch_post(&self.source, doc_type, uid, reference).await?;
        let neighbors = resolve_neighbors(&self.source, doc_type, &post, reference).await?;

        let options = ViewOptions::new(preview.is_some(), true);
        Ok(self.renderer.render_post(&post, Some(&neighbors), options)?)
    }

    /// Turn a render result into a page, caching it when published
    async fn finish(
        &self,
        path: &str,
        preview: Option<&PreviewSession>,
        result: PageResult,
    ) -> Page {
        let options = ViewOptions::new(preview.is_some(), false);
        let page = match result {
            Ok(html) => Page::new(StatusCode::OK, html),
            Err(PageError::Content(ContentError::NotFound { doc_type, uid })) => {
                tracing::debug!("Not found: {} {}", doc_type, uid);
                self.not_found(options)
            }
            Err(PageError::Content(e @ ContentError::MalformedDocument { .. })) => {
                tracing::warn!("Cannot render {}: {}", path, e);
                self.not_found(options)
            }
            Err(e) => {
                tracing::error!("Failed to render {}: {:#}", path, e);
                self.error_page(&e, path, options)
            }
        };

        let cacheable = matches!(page.status, StatusCode::OK | StatusCode::NOT_FOUND);
        if preview.is_none() && cacheable {
            self.cache.insert(path, page.status.as_u16(), &page.html).await;
        }
        page
    }

    async fn cached(&self, path: &str, preview: Option<&PreviewSession>) -> Option<Page> {
        if preview.is_some() {
            return None;
        }
        let cached = self.cache.get(path).await?;
        Some(Page::new(StatusCode::from_u16(cached.status).ok()?, cached.html))
    }

    fn not_found(&self, options: ViewOptions) -> Page {
        match self.renderer.render_not_found(options) {
            Ok(html) => Page::new(StatusCode::NOT_FOUND, html),
            Err(e) => {
                tracing::error!("Failed to render not-found page: {:#}", e);
                Page::new(StatusCode::NOT_FOUND, "Not found".to_string())
            }
        }
    }

    fn error_page(&self, error: &PageError, retry: &str, options: ViewOptions) -> Page {
        let status = match error {
            PageError::Content(ContentError::FetchFailure(_)) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        match self.renderer.render_error(&error.to_string(), retry, options) {
            Ok(html) => Page::new(status, html),
            Err(e) => {
                tracing::error!("Failed to render error page: {:#}", e);
                Page::new(status, "Server error".to_string())
            }
        }
    }
}

type SharedState<S> = Arc<AppState<S>>;
type PageResult = std::result::Result<String, PageError>;

/// Why a page could not be rendered
#[derive(Debug, Error)]
enum PageError {
    #[error(transparent)]
    Content(#[from] ContentError),

    #[error(transparent)]
    Render(#[from] anyhow::Error),
}

/// A rendered HTML response
#[derive(Debug)]
pub struct Page {
    status: StatusCode,
    html: String,
}

impl Page {
    fn new(status: StatusCode, html: String) -> Self {
        Self { status, html }
    }
}

impl IntoResponse for Page {
    fn into_response(self) -> Response {
        (self.status, Html(self.html)).into_response()
    }
}

/// Build the application router
pub fn router<S: ContentSource + 'static>(state: SharedState<S>) -> Router {
    let mut app = Router::new()
        .route("/", get(home::<S>))
        .route("/page/:page", get(listing_page::<S>))
        .route("/page/:page/", get(listing_page::<S>))
        .route("/post/:slug", get(post::<S>))
        .route("/post/:slug/", get(post::<S>))
        .route("/api/preview", get(preview::<S>))
        .route("/api/exit-preview", get(exit_preview::<S>));

    for (path, content_type, body) in ASSETS {
        let (content_type, body) = (*content_type, *body);
        app = app.route(
            &format!("/{}", path),
            get(move || async move { ([(header::CONTENT_TYPE, content_type)], body) }),
        );
    }

    app.fallback(fallback::<S>)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server
pub async fn start(site: &Spacetraveling, ip: &str, port: u16, open: bool) -> Result<()> {
    let client = site.client()?;
    let state = Arc::new(AppState::new(&site.config, client)?);

    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}", ip, port);
    println!("Server running at {}", url);
    println!("Press Ctrl+C to stop.");

    // Open browser if requested
    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn preview_session(jar: &CookieJar) -> Option<PreviewSession> {
    jar.get(PREVIEW_COOKIE)
        .and_then(|cookie| PreviewSession::from_cookie_value(cookie.value()))
}

async fn home<S: ContentSource + 'static>(
    State(state): State<SharedState<S>>,
    jar: CookieJar,
) -> Response {
    render_listing_at(&state, &jar, 1, "/").await
}

async fn listing_page<S: ContentSource + 'static>(
    State(state): State<SharedState<S>>,
    Path(page): Path<String>,
    jar: CookieJar,
) -> Response {
    let Ok(page) = page.parse::<usize>() else {
        let preview = preview_session(&jar).is_some();
        return state
            .not_found(ViewOptions::new(preview, false))
            .into_response();
    };
    if page <= 1 {
        return redirect(&url_for(&state.config, "/"));
    }
    let path = format!("/page/{}/", page);
    render_listing_at(&state, &jar, page, &path).await
}

async fn render_listing_at<S: ContentSource>(
    state: &AppState<S>,
    jar: &CookieJar,
    page: usize,
    path: &str,
) -> Response {
    let session = preview_session(jar);
    if let Some(cached) = state.cached(path, session.as_ref()).await {
        return cached.into_response();
    }
    let result = state.render_listing(page, session.as_ref()).await;
    state.finish(path, session.as_ref(), result).await.into_response()
}

async fn post<S: ContentSource + 'static>(
    State(state): State<SharedState<S>>,
    Path(slug): Path<String>,
    jar: CookieJar,
) -> Response {
    let session = preview_session(&jar);
    let path = format!("/post/{}/", slug);
    if let Some(cached) = state.cached(&path, session.as_ref()).await {
        return cached.into_response();
    }
    let result = state.render_post(&slug, session.as_ref()).await;
    state.finish(&path, session.as_ref(), result).await.into_response()
}

#[derive(Debug, Deserialize)]
struct PreviewParams {
    token: Option<String>,
    #[serde(rename = "documentId")]
    document_id: Option<String>,
}

/// Enter preview mode and redirect to the previewed document
async fn preview<S: ContentSource + 'static>(
    State(state): State<SharedState<S>>,
    Query(params): Query<PreviewParams>,
    jar: CookieJar,
) -> Response {
    let result = resolve_preview(
        &state.source,
        &state.config.document_type,
        params.token.as_deref(),
        params.document_id.as_deref(),
    )
    .await;

    match result {
        Ok(redirect_to) => {
            let cookie = Cookie::build((PREVIEW_COOKIE, redirect_to.session.to_cookie_value()))
                .path("/")
                .http_only(true);
            let location = url_for(&state.config, &redirect_to.location);
            (jar.add(cookie), redirect(&location)).into_response()
        }
        Err(ContentError::InvalidPreviewToken) => (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "message": "Invalid token" })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Preview failed: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({ "message": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Leave preview mode
async fn exit_preview<S: ContentSource + 'static>(
    State(state): State<SharedState<S>>,
    jar: CookieJar,
) -> Response {
    let jar = jar.remove(Cookie::build(PREVIEW_COOKIE).path("/"));
    (jar, redirect(&url_for(&state.config, "/"))).into_response()
}

async fn fallback<S: ContentSource + 'static>(
    State(state): State<SharedState<S>>,
    jar: CookieJar,
) -> Response {
    let preview = preview_session(&jar).is_some();
    state
        .not_found(ViewOptions::new(preview, false))
        .into_response()
}

fn redirect(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}
