//! Writes the synthetic headers doxygen is pointed at.

use crate::model::{Accumulators, FileFragments};
use crate::synth;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the file holding the aggregated main page and enum groups.
pub const MAIN_PAGE_FILE: &str = "main_page_content.h";

const BANNER: &str =
    "// This file was generated automatically from the C++ source to feed doxygen.  It will be overwritten.\n\n";

/// Current local time, as stamped into every generated file.
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

/// "zap/ship.cpp" → "ship__cpp.h"
pub fn output_name(source: &Path) -> String {
    let base = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = source
        .extension()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    format!("{}__{}.h", base, ext)
}

fn header(generated: &str) -> String {
    format!("{}// Generated {}\n\n", BANNER, generated)
}

/// Classes, then the global namespace, then the raw comment stream.
pub fn render_fragments(frags: &FileFragments, generated: &str) -> String {
    let mut out = header(generated);

    for (name, class) in &frags.classes {
        out.push_str(&class.header);
        out.push_str(&class.body.concat());
        out.push_str(&synth::class_closing(name));
    }

    out.push_str("\n\n// What follows is a dump of the globalfunctions list\n\n");
    out.push_str("namespace global {\n");
    out.push_str(&frags.global_functions.join("\n"));
    out.push_str("}\n");

    out.push_str("\n\n// What follows is a dump of the comments list\n\n");
    out.push_str(&frags.comments.concat());
    out
}

/// Main page text in its own comment block; enum groups carry their own.
pub fn render_main_page(acc: &Accumulators, generated: &str) -> String {
    let mut out = header(generated);
    out.push_str("/**\n");
    out.push_str(&acc.mainpage.concat());
    out.push('\n');
    out.push_str("*/\n");
    out.push_str(&acc.enums.concat());
    out
}

/// Write the synthetic header for `source` into `dir`.
pub fn write_fragments(
    dir: &Path,
    source: &Path,
    frags: &FileFragments,
    generated: &str,
) -> Result<PathBuf> {
    let path = dir.join(output_name(source));
    fs::write(&path, render_fragments(frags, generated))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

pub fn write_main_page(dir: &Path, acc: &Accumulators, generated: &str) -> Result<PathBuf> {
    let path = dir.join(MAIN_PAGE_FILE);
    fs::write(&path, render_main_page(acc, generated))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}
