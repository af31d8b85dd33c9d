use std::fs;
use std::path::{Path, PathBuf};

use bundler_core::{page_file_name, paginate, render_index, render_page, ContentStore, PageTemplate};
use bundler_logging::{bundler_debug, bundler_info};

use crate::persist::{ensure_output_dir, AtomicFileWriter, PersistError};

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub template: PageTemplate,
    pub page_size: usize,
    pub write_index: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            template: PageTemplate::default(),
            page_size: 500,
            write_index: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub page_count: usize,
    pub item_count: usize,
    pub missing: usize,
    pub page_paths: Vec<PathBuf>,
    pub index_path: Option<PathBuf>,
    pub removed_stale: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

/// Regenerate every page (and the index) from scratch.
///
/// Page files left over from an earlier export with more pages are removed so
/// the directory always reflects exactly the current ordering.
pub fn export_pages(
    output_dir: &Path,
    ordered_urls: &[String],
    store: &ContentStore,
    options: &ExportOptions,
) -> Result<ExportSummary, ExportError> {
    ensure_output_dir(output_dir)?;
    let template = &options.template;
    let pages = paginate(ordered_urls, store, options.page_size);
    let writer = AtomicFileWriter::new(output_dir.to_path_buf());

    let mut page_paths = Vec::with_capacity(pages.len());
    for page in &pages {
        let name = page_file_name(&template.file_prefix, page.index, &template.extension);
        let doc = render_page(page, pages.len(), template);
        page_paths.push(writer.write(&name, &doc)?);
    }

    let index_path = if options.write_index {
        Some(writer.write(&template.index_filename, &render_index(&pages, template))?)
    } else {
        None
    };

    let removed_stale = remove_stale_pages(output_dir, template, pages.len())?;
    let missing = pages.iter().map(|p| p.missing).sum();
    bundler_info!(
        "Exported {} pages ({} items, {} not yet fetched) to {:?}",
        pages.len(),
        ordered_urls.len(),
        missing,
        output_dir
    );

    Ok(ExportSummary {
        page_count: pages.len(),
        item_count: ordered_urls.len(),
        missing,
        page_paths,
        index_path,
        removed_stale,
    })
}

fn remove_stale_pages(
    output_dir: &Path,
    template: &PageTemplate,
    page_count: usize,
) -> Result<usize, ExportError> {
    let suffix = format!(".{}", template.extension);
    let mut removed = 0;
    for entry in fs::read_dir(output_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let index = name
            .strip_prefix(template.file_prefix.as_str())
            .and_then(|rest| rest.strip_suffix(suffix.as_str()))
            .and_then(|digits| digits.parse::<usize>().ok());
        if matches!(index, Some(i) if i > page_count || i == 0) {
            bundler_debug!("Removing stale page {:?}", entry.path());
            fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}
