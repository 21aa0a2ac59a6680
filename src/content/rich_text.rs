//! Rich-text blocks: plain-text flattening and HTML rendering

use serde::{Deserialize, Serialize};

use crate::helpers::html_escape;

/// A structured paragraph/heading/list unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichTextBlock {
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,

    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub spans: Vec<Span>,

    /// Image source, for `image` blocks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

fn default_kind() -> String {
    "paragraph".to_string()
}

impl RichTextBlock {
    pub fn new(kind: &str, text: &str) -> Self {
        Self {
            kind: kind.to_string(),
            text: text.to_string(),
            spans: Vec::new(),
            url: None,
            alt: None,
        }
    }

    pub fn paragraph(text: &str) -> Self {
        Self::new("paragraph", text)
    }
}

/// Inline formatting over a range of a block's text
///
/// Offsets count UTF-16 code units, as the repository reports them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Span {
    fn open_tag(&self) -> String {
        match self.kind.as_str() {
            "strong" => "<strong>".to_string(),
            "em" => "<em>".to_string(),
            "hyperlink" => {
                let href = self
                    .data
                    .as_ref()
                    .and_then(|d| d.get("url"))
                    .and_then(|u| u.as_str())
                    .unwrap_or("#");
                let target = self
                    .data
                    .as_ref()
                    .and_then(|d| d.get("target"))
                    .and_then(|t| t.as_str());
                match target {
                    Some(target) => format!(
                        r#"<a href="{}" target="{}" rel="noopener">"#,
                        html_escape(href),
                        html_escape(target)
                    ),
                    None => format!(r#"<a href="{}">"#, html_escape(href)),
                }
            }
            _ => {
                let label = self
                    .data
                    .as_ref()
                    .and_then(|d| d.get("label"))
                    .and_then(|l| l.as_str())
                    .unwrap_or_default();
                format!(r#"<span class="{}">"#, html_escape(label))
            }
        }
    }

    fn close_tag(&self) -> &'static str {
        match self.kind.as_str() {
            "strong" => "</strong>",
            "em" => "</em>",
            "hyperlink" => "</a>",
            _ => "</span>",
        }
    }

    fn is_supported(&self) -> bool {
        matches!(self.kind.as_str(), "strong" | "em" | "hyperlink" | "label")
    }
}

/// Flatten blocks to plain text, space-joined in document order
pub fn as_text(blocks: &[RichTextBlock]) -> String {
    blocks
        .iter()
        .map(|b| b.text.as_str())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render blocks to HTML, grouping consecutive list items
pub fn as_html(blocks: &[RichTextBlock]) -> String {
    let mut html = String::new();
    let mut list: Option<&'static str> = None;

    for block in blocks {
        let wrapper = match block.kind.as_str() {
            "list-item" => Some("ul"),
            "o-list-item" => Some("ol"),
            _ => None,
        };

        if list != wrapper {
            if let Some(tag) = list {
                html.push_str(&format!("</{}>", tag));
            }
            if let Some(tag) = wrapper {
                html.push_str(&format!("<{}>", tag));
            }
            list = wrapper;
        }

        html.push_str(&block_html(block));
    }

    if let Some(tag) = list {
        html.push_str(&format!("</{}>", tag));
    }

    html
}

fn block_html(block: &RichTextBlock) -> String {
    let inner = || render_spans(&block.text, &block.spans);

    match block.kind.as_str() {
        kind @ ("heading1" | "heading2" | "heading3" | "heading4" | "heading5" | "heading6") => {
            let level = &kind["heading".len()..];
            format!("<h{}>{}</h{}>", level, inner(), level)
        }
        "preformatted" => format!("<pre>{}</pre>", inner()),
        "list-item" | "o-list-item" => format!("<li>{}</li>", inner()),
        "image" => match &block.url {
            Some(url) => format!(
                r#"<img src="{}" alt="{}">"#,
                html_escape(url),
                html_escape(block.alt.as_deref().unwrap_or(""))
            ),
            None => String::new(),
        },
        _ => format!("<p>{}</p>", inner()),
    }
}

/// Apply spans to text, keeping the produced tags properly nested
fn render_spans(text: &str, spans: &[Span]) -> String {
    let mut pending: Vec<&Span> = spans
        .iter()
        .filter(|s| s.start < s.end && s.is_supported())
        .collect();
    if pending.is_empty() {
        return html_escape(text);
    }
    // Outer spans first when they start together
    pending.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut out = String::with_capacity(text.len() + pending.len() * 16);
    let mut open: Vec<&Span> = Vec::new();
    let mut next = 0;
    let mut pos = 0;
    let mut buf = [0u8; 4];

    for c in text.chars() {
        close_ended(&mut out, &mut open, pos);
        while next < pending.len() && pending[next].start <= pos {
            out.push_str(&pending[next].open_tag());
            open.push(pending[next]);
            next += 1;
        }
        out.push_str(&html_escape(c.encode_utf8(&mut buf)));
        pos += c.len_utf16();
    }

    for span in open.iter().rev() {
        out.push_str(span.close_tag());
    }

    out
}

/// Close every span ending at `pos`, reopening inner spans that continue
fn close_ended(out: &mut String, open: &mut Vec<&Span>, pos: usize) {
    let Some(idx) = open.iter().position(|s| s.end <= pos) else {
        return;
    };

    let tail: Vec<&Span> = open.drain(idx..).collect();
    for span in tail.iter().rev() {
        out.push_str(span.close_tag());
    }
    for span in tail {
        if span.end > pos {
            out.push_str(&span.open_tag());
            open.push(span);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize, kind: &str) -> Span {
        Span {
            start,
            end,
            kind: kind.to_string(),
            data: None,
        }
    }

    #[test]
    fn test_as_text_joins_blocks() {
        let blocks = vec![
            RichTextBlock::paragraph("Hello world."),
            RichTextBlock::new("image", ""),
            RichTextBlock::new("heading2", "Second part"),
        ];
        assert_eq!(as_text(&blocks), "Hello world. Second part");
        assert_eq!(as_text(&[]), "");
    }

    #[test]
    fn test_as_html_block_types() {
        let blocks = vec![
            RichTextBlock::new("heading3", "Title"),
            RichTextBlock::paragraph("a < b"),
            RichTextBlock::new("preformatted", "let x = 1;"),
        ];
        assert_eq!(
            as_html(&blocks),
            "<h3>Title</h3><p>a &lt; b</p><pre>let x = 1;</pre>"
        );
    }

    #[test]
    fn test_as_html_groups_lists() {
        let blocks = vec![
            RichTextBlock::new("list-item", "one"),
            RichTextBlock::new("list-item", "two"),
            RichTextBlock::new("o-list-item", "first"),
            RichTextBlock::paragraph("after"),
        ];
        assert_eq!(
            as_html(&blocks),
            "<ul><li>one</li><li>two</li></ul><ol><li>first</li></ol><p>after</p>"
        );
    }

    #[test]
    fn test_spans() {
        let mut block = RichTextBlock::paragraph("bold and link");
        block.spans = vec![
            span(0, 4, "strong"),
            Span {
                start: 9,
                end: 13,
                kind: "hyperlink".to_string(),
                data: Some(serde_json::json!({"link_type": "Web", "url": "https://example.com"})),
            },
        ];
        assert_eq!(
            as_html(&[block]),
            r#"<p><strong>bold</strong> and <a href="https://example.com">link</a></p>"#
        );
    }

    #[test]
    fn test_overlapping_spans_stay_nested() {
        let mut block = RichTextBlock::paragraph("abcdef");
        block.spans = vec![span(0, 4, "strong"), span(2, 6, "em")];
        assert_eq!(
            as_html(&[block]),
            "<p><strong>ab<em>cd</em></strong><em>ef</em></p>"
        );
    }

    #[test]
    fn test_span_offsets_are_utf16() {
        let mut block = RichTextBlock::paragraph("🚀 go");
        // The rocket is two UTF-16 units
        block.spans = vec![span(3, 5, "em")];
        assert_eq!(as_html(&[block]), "<p>🚀 <em>go</em></p>");
    }

    #[test]
    fn test_deserialize_block() {
        let block: RichTextBlock = serde_json::from_str(
            r#"{"type": "paragraph", "text": "Olá", "spans": [{"start": 0, "end": 3, "type": "em"}]}"#,
        )
        .unwrap();
        assert_eq!(block.text, "Olá");
        assert_eq!(block.spans.len(), 1);
    }
}
