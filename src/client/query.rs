//! Query building blocks: predicates, orderings and search options

use std::fmt;

/// A single query predicate, e.g. `[at(document.type, "post")]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate(String);

impl Predicate {
    /// Exact match of a field path against a value
    pub fn at(path: &str, value: &str) -> Self {
        Self(format!("[at({}, {})]", path, quote(value)))
    }

    /// Match on the document type
    pub fn document_type(doc_type: &str) -> Self {
        Self::at("document.type", doc_type)
    }

    /// Match on the document id
    pub fn document_id(id: &str) -> Self {
        Self::at("document.id", id)
    }

    /// Match on the uid field of a custom type
    pub fn uid(doc_type: &str, uid: &str) -> Self {
        Self::at(&format!("my.{}.uid", doc_type), uid)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Render a predicate list into the `q` query parameter
pub fn render_q(predicates: &[Predicate]) -> String {
    let joined: String = predicates.iter().map(Predicate::as_str).collect();
    format!("[{}]", joined)
}

/// Quote a predicate value the way the repository expects (JSON string syntax)
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Sort order for a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    pub field: String,
    pub descending: bool,
}

impl Ordering {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: false,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: true,
        }
    }

    /// Order by last publication date, the field neighbor resolution walks
    pub fn last_publication(descending: bool) -> Self {
        let field = "document.last_publication_date";
        if descending {
            Self::desc(field)
        } else {
            Self::asc(field)
        }
    }
}

impl fmt::Display for Ordering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(f, "[{} desc]", self.field)
        } else {
            write!(f, "[{}]", self.field)
        }
    }
}

/// Options accepted by a search query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Restrict returned data to these fields (`post.title`, ...)
    pub fetch: Vec<String>,
    pub page_size: Option<u32>,
    /// Content version to query; `None` means the master ref
    pub reference: Option<String>,
    /// Return documents after this document id
    pub after: Option<String>,
    pub orderings: Option<Ordering>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fetch<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fetch = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn reference(mut self, reference: Option<&str>) -> Self {
        self.reference = reference.map(str::to_string);
        self
    }

    pub fn after(mut self, id: &str) -> Self {
        self.after = Some(id.to_string());
        self
    }

    pub fn orderings(mut self, ordering: Ordering) -> Self {
        self.orderings = Some(ordering);
        self
    }
}
