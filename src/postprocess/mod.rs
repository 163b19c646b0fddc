//! HTML post-processor: rewrites doxygen's class pages in place.

pub mod dom;
pub mod repair;
pub mod rewrite;

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Only per-class pages are rewritten.
pub const PAGE_PATTERN: &str = "class_*.html";

/// Repair, parse, rewrite and overwrite a single page.
pub fn process_page(path: &Path) -> Result<()> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let repaired = repair::repair(&raw);

    let dom = dom::parse(path, &repaired)?;
    rewrite::rewrite_page(&dom.document).with_context(|| format!("while rewriting {}", path.display()))?;
    let html = dom::serialize_document(&dom)?;

    fs::write(path, html).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Class pages directly inside `html_dir`, sorted.
pub fn class_pages(html_dir: &Path) -> Result<Vec<PathBuf>> {
    let dir = html_dir.to_string_lossy();
    let pattern = format!("{}/{}", glob::Pattern::escape(&dir), PAGE_PATTERN);
    let mut pages: Vec<PathBuf> = glob::glob(&pattern)
        .with_context(|| format!("invalid page pattern: {}", pattern))?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .collect();
    pages.sort();
    Ok(pages)
}

/// Rewrite every class page. The first malformed page stops the run.
pub fn process_dir(html_dir: &Path) -> Result<usize> {
    if !html_dir.is_dir() {
        anyhow::bail!("HTML directory not found: {}", html_dir.display());
    }
    let pages = class_pages(html_dir)?;
    if pages.is_empty() {
        info!("no class pages in {}", html_dir.display());
        return Ok(0);
    }

    info!("fixing doxygen output in {}", html_dir.display());
    for page in &pages {
        debug!("rewriting {}", page.display());
        process_page(page)?;
        info!("fixed {}", page.display());
    }
    Ok(pages.len())
}
