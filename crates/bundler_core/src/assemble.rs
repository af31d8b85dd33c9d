use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::snippet::not_fetched_placeholder;
use crate::ContentStore;

/// One output document. `index` is 1-based; `urls` and `snippets` are parallel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPage {
    pub index: usize,
    pub urls: Vec<String>,
    pub snippets: Vec<String>,
    pub missing: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTemplate {
    pub site_title: String,
    pub file_prefix: String,
    pub extension: String,
    pub index_filename: String,
}

impl Default for PageTemplate {
    fn default() -> Self {
        Self {
            site_title: "Collected Posts".to_string(),
            file_prefix: "part".to_string(),
            extension: "html".to_string(),
            index_filename: "index.html".to_string(),
        }
    }
}

const STYLE: &str = "body{font-family:'Segoe UI',sans-serif;background:#f7f9ff;color:#222;max-width:90%;margin:auto;padding:15px;}\
h2{border-left:4px solid #7aa5ff;padding-left:8px;}\
.post{margin-bottom:18px;background:white;border-radius:10px;padding:14px;box-shadow:0 3px 8px rgba(0,0,0,0.06);}\
.pending{opacity:0.6;}\
a.source{display:inline-block;margin-top:8px;color:#2a5dff;text-decoration:none;}\
nav.pager{margin:12px 0;}nav.pager a{margin-right:12px;}";

/// `<prefix><index>.<ext>`
pub fn page_file_name(prefix: &str, index: usize, extension: &str) -> String {
    format!("{prefix}{index}.{extension}")
}

/// Page N holds urls `[(N-1)*size, N*size)` of `ordered_urls`; a zero size is treated as 1.
///
/// Never fetches. Urls missing from the store get a "not fetched yet" stand-in,
/// so this is safe to run against a partially populated store.
pub fn paginate(ordered_urls: &[String], store: &ContentStore, page_size: usize) -> Vec<OutputPage> {
    let size = page_size.max(1);
    ordered_urls
        .chunks(size)
        .enumerate()
        .map(|(i, chunk)| {
            let mut missing = 0;
            let snippets: Vec<String> = chunk
                .iter()
                .map(|url| match store.get(url) {
                    Some(html) => html.to_string(),
                    None => {
                        missing += 1;
                        not_fetched_placeholder(url)
                    }
                })
                .collect();
            OutputPage {
                index: i + 1,
                urls: chunk.to_vec(),
                snippets,
                missing,
            }
        })
        .collect()
}

pub fn render_page(page: &OutputPage, page_count: usize, template: &PageTemplate) -> String {
    let title = format!("{} - Part {} of {}", template.site_title, page.index, page_count);
    let mut out = document_head(&title);
    out.push_str(&format!("<h1>{}</h1>\n", encode_text(&title)));
    out.push_str(&pager(page.index, page_count, template));
    for snippet in &page.snippets {
        out.push_str(snippet);
    }
    out.push_str(&pager(page.index, page_count, template));
    out.push_str("</body></html>\n");
    out
}

pub fn render_index(pages: &[OutputPage], template: &PageTemplate) -> String {
    let mut out = document_head(&template.site_title);
    out.push_str(&format!("<h1>{}</h1>\n", encode_text(&template.site_title)));
    out.push_str("<h2>Parts</h2>\n<ul>\n");
    for page in pages {
        let name = page_file_name(&template.file_prefix, page.index, &template.extension);
        let fetched = page.urls.len() - page.missing;
        out.push_str(&format!(
            "<li><a href=\"{}\">{}</a> ({} of {} posts)</li>\n",
            encode_double_quoted_attribute(&name),
            encode_text(&name),
            fetched,
            page.urls.len()
        ));
    }
    out.push_str("</ul>\n</body></html>\n");
    out
}

fn document_head(title: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{}</title>\n<style>{}</style></head>\n<body>\n",
        encode_text(title),
        STYLE
    )
}

fn pager(index: usize, page_count: usize, template: &PageTemplate) -> String {
    let link = |i: usize, label: &str| {
        format!(
            "<a href=\"{}\">{}</a>",
            encode_double_quoted_attribute(&page_file_name(
                &template.file_prefix,
                i,
                &template.extension
            )),
            label
        )
    };
    let mut nav = String::from("<nav class=\"pager\">");
    if index > 1 {
        nav.push_str(&link(index - 1, "&laquo; Previous"));
    }
    nav.push_str(&format!(
        "<a href=\"{}\">Index</a>",
        encode_double_quoted_attribute(&template.index_filename)
    ));
    if index < page_count {
        nav.push_str(&link(index + 1, "Next &raquo;"));
    }
    nav.push_str("</nav>\n");
    nav
}
