//! Preview mode - pins content queries to an unpublished content version
//!
//! The repository hands the site a `(token, documentId)` pair. The token is
//! the ref of the draft version; it is validated by resolving the document
//! under it, and on success the caller stores it in the visitor's session.

use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};

use crate::client::{ContentSource, Document};
use crate::error::{ContentError, Result};

/// Cookie carrying the preview ref
pub const PREVIEW_COOKIE: &str = "spacetraveling.preview";

/// Where a resolved document lives on the site
pub fn link_resolver(doc: &Document, post_type: &str) -> String {
    match doc.uid.as_deref() {
        Some(uid) if doc.doc_type == post_type => format!("/post/{}", uid),
        _ => "/".to_string(),
    }
}

/// A validated preview: the redirect target and the ref to pin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewRedirect {
    pub location: String,
    pub session: PreviewSession,
}

/// Preview state stored in the visitor's session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewSession {
    reference: String,
}

impl PreviewSession {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
        }
    }

    /// The ref every content query must be pinned to
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Encode for storage in a cookie
    pub fn to_cookie_value(&self) -> String {
        utf8_percent_encode(&self.reference, NON_ALPHANUMERIC).to_string()
    }

    /// Decode a stored cookie value; empty or undecodable values are ignored
    pub fn from_cookie_value(value: &str) -> Option<Self> {
        let decoded = percent_decode_str(value).decode_utf8().ok()?;
        let reference = decoded.trim();
        if reference.is_empty() {
            None
        } else {
            Some(Self::new(reference))
        }
    }
}

/// Validate a preview token and work out where to send the visitor
///
/// A missing token, or one the repository rejects, is an
/// [`ContentError::InvalidPreviewToken`]. Without a document id, or when the
/// document cannot be found under the token, the visitor lands on `/`.
pub async fn resolve_preview<S>(
    source: &S,
    post_type: &str,
    token: Option<&str>,
    document_id: Option<&str>,
) -> Result<PreviewRedirect>
where
    S: ContentSource + ?Sized,
{
    let token = token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ContentError::InvalidPreviewToken)?;
    let session = PreviewSession::new(token);

    let Some(document_id) = document_id.filter(|id| !id.is_empty()) else {
        return Ok(PreviewRedirect {
            location: "/".to_string(),
            session,
        });
    };

    let doc = match source.get_by_id(document_id, Some(token)).await {
        Ok(doc) => doc,
        Err(e) if e.is_client_error() => {
            tracing::warn!("Preview token rejected: {}", e);
            return Err(ContentError::InvalidPreviewToken);
        }
        Err(e) => return Err(e.into()),
    };

    let location = match &doc {
        Some(doc) => link_resolver(doc, post_type),
        None => "/".to_string(),
    };
    tracing::info!("Preview of {} resolved to {}", document_id, location);

    Ok(PreviewRedirect { location, session })
}
