use html_escape::{encode_single_quoted_attribute, encode_text};

/// Emitted when neither a content container nor a `<body>` could be found.
pub const CONTENT_UNAVAILABLE: &str = "<p>(content unavailable)</p>";

/// Present in every failure placeholder.
pub const FETCH_ERROR_MARKER: &str = "Error fetching content";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnippetKind {
    Content,
    Placeholder { reason: String },
}

/// Rendered HTML fragment for one source item. Only `html` is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    pub html: String,
    pub kind: SnippetKind,
}

impl Snippet {
    pub fn is_placeholder(&self) -> bool {
        matches!(self.kind, SnippetKind::Placeholder { .. })
    }
}

pub fn render_post(title: &str, url: &str, content_html: &str) -> Snippet {
    Snippet {
        html: wrap_post(title, url, content_html),
        kind: SnippetKind::Content,
    }
}

pub fn render_failure(title: &str, url: &str, reason: &str) -> Snippet {
    let body = format!("<p>({FETCH_ERROR_MARKER}: {})</p>", encode_text(reason));
    Snippet {
        html: wrap_post(title, url, &body),
        kind: SnippetKind::Placeholder {
            reason: reason.to_string(),
        },
    }
}

/// Stand-in used by the assembler for urls missing from the store.
pub fn not_fetched_placeholder(url: &str) -> String {
    let href = encode_single_quoted_attribute(url);
    let text = encode_text(url);
    format!(
        "<div class='post pending'><h2>(Not fetched yet)</h2><p>Link: <a href='{href}'>{text}</a></p></div>\n"
    )
}

fn wrap_post(title: &str, url: &str, body: &str) -> String {
    let title = if title.trim().is_empty() {
        "Untitled"
    } else {
        title.trim()
    };
    format!(
        "<div class='post'><h2>{}</h2>{}<a class='source' href='{}' target='_blank'>View original</a></div>\n",
        encode_text(title),
        body,
        encode_single_quoted_attribute(url),
    )
}
