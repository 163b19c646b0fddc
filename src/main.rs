//! luadoc: build doxygen input from Lua binding annotations and tidy the
//! resulting HTML.
//!
//! The pipeline has three stages, each of which can be skipped:
//!
//! 1. scan annotated C++/Lua/text sources and write synthetic headers
//! 2. run doxygen over them
//! 3. rewrite the generated class pages in place

mod config;
mod doxygen;
mod emit;
mod error;
mod logging;
mod model;
mod postprocess;
mod scanner;
mod synth;

use anyhow::{Context, Result};
use clap::Parser;
use config::Config;
use model::{Accumulators, Dialect};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(
    name = "luadoc",
    about = "Generate doxygen input from Lua binding annotations and post-process the HTML"
)]
struct Cli {
    /// Input files (glob patterns supported). Defaults to the configured inputs.
    files: Vec<String>,

    /// Configuration file [default: luadoc.toml, if present]
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Directory for the generated headers
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Directory holding doxygen's HTML output
    #[arg(long)]
    html_dir: Option<PathBuf>,

    /// Renderer command
    #[arg(long)]
    doxygen: Option<String>,

    /// Renderer configuration file, relative to the documentation directory
    #[arg(long)]
    doxyfile: Option<PathBuf>,

    /// Renderer timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Do not run doxygen
    #[arg(long)]
    skip_render: bool,

    /// Leave the HTML untouched
    #[arg(long)]
    skip_postprocess: bool,

    /// Only rewrite existing HTML
    #[arg(long, conflicts_with_all = ["skip_postprocess", "skip_render", "files"])]
    postprocess_only: bool,

    /// Debug output
    #[arg(short = 'v', long, conflicts_with = "quiet")]
    verbose: bool,

    /// Errors only
    #[arg(short = 'q', long)]
    quiet: bool,
}

impl Cli {
    /// Command-line values win over the configuration file.
    fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.output {
            config.output_dir = dir.clone();
        }
        if let Some(dir) = &self.html_dir {
            config.html_dir = dir.clone();
        }
        if let Some(cmd) = &self.doxygen {
            config.doxygen.command = cmd.clone();
        }
        if let Some(file) = &self.doxyfile {
            config.doxygen.config = file.clone();
        }
        if let Some(secs) = self.timeout {
            config.doxygen.timeout_secs = secs;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config);

    if !cli.postprocess_only {
        check_setup(&config)?;

        let patterns = if cli.files.is_empty() {
            &config.inputs
        } else {
            &cli.files
        };
        let input_files = expand_inputs(patterns)?;
        generate(&input_files, &config.output_dir)?;

        if !cli.skip_render {
            doxygen::run(
                &config.doxygen.command,
                &config.doxygen.config,
                &config.doc_dir,
                config.doxygen.timeout(),
            )?;
        }
    }

    if !cli.skip_postprocess {
        let pages = postprocess::process_dir(&config.html_dir)?;
        info!("post-processed {} page(s)", pages);
    }
    Ok(())
}

/// The documentation directory must exist; the output directory is created.
fn check_setup(config: &Config) -> Result<()> {
    if !config.doc_dir.is_dir() {
        anyhow::bail!(
            "documentation directory not found: {}",
            config.doc_dir.display()
        );
    }
    fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "failed to create output directory: {}",
            config.output_dir.display()
        )
    })?;
    Ok(())
}

/// Scan every input in order and write one header per productive file,
/// then the shared main page.
fn generate(input_files: &[PathBuf], output_dir: &Path) -> Result<()> {
    let generated = emit::timestamp();
    let mut acc = Accumulators::default();

    for path in input_files {
        let Some(dialect) = Dialect::from_path(path) else {
            warn!("skipping {}: unsupported file type", path.display());
            continue;
        };
        info!("processing {}", path.display());

        let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let content = String::from_utf8_lossy(&bytes);
        let frags = scanner::scan(&content, dialect, &mut acc)
            .with_context(|| format!("in {}", path.display()))?;

        if frags.is_empty() {
            info!("nothing to do for {}", path.display());
            continue;
        }
        let out = emit::write_fragments(output_dir, path, &frags, &generated)?;
        info!("wrote {}", out.display());
    }

    let main_page = emit::write_main_page(output_dir, &acc, &generated)?;
    info!("wrote {}", main_page.display());
    Ok(())
}

/// Resolve input arguments to source files, in path order.
///
/// An argument names a file, a directory (its scannable files, without
/// recursing) or a glob. An argument that resolves to nothing only warns.
fn expand_inputs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = BTreeSet::new();
    for pattern in patterns {
        let path = Path::new(pattern);
        let found: Vec<PathBuf> = if path.is_file() {
            vec![path.to_path_buf()]
        } else if path.is_dir() {
            scannable_in(path)?
        } else {
            glob::glob(pattern)
                .with_context(|| format!("invalid glob pattern: {}", pattern))?
                .filter_map(Result::ok)
                .filter(|p| p.is_file())
                .collect()
        };
        if found.is_empty() {
            warn!("no files matched: {}", pattern);
        }
        debug!("{}: {} file(s)", pattern, found.len());
        files.extend(found);
    }
    // The main page and enum text accumulate in this order
    Ok(files.into_iter().collect())
}

/// Files directly inside `dir` that some dialect can scan.
fn scannable_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to read directory: {}", dir.display()))?;
    Ok(entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && Dialect::from_path(p).is_some())
        .collect())
}
