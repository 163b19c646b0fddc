//! Run configuration: a TOML file layered under command-line overrides.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "luadoc.toml";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Documentation root; must already exist.
    pub doc_dir: PathBuf,
    /// Where the synthetic headers are written.
    pub output_dir: PathBuf,
    /// Doxygen's HTML output, rewritten in place.
    pub html_dir: PathBuf,
    /// Input globs, used when no files are given on the command line.
    pub inputs: Vec<String>,
    pub doxygen: DoxygenConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DoxygenConfig {
    pub command: String,
    /// Doxyfile, relative to `doc_dir` unless absolute.
    pub config: PathBuf,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            doc_dir: PathBuf::from("doc"),
            output_dir: PathBuf::from("doc/temp-doxygen"),
            html_dir: PathBuf::from("doc/html"),
            inputs: vec![
                "zap/*.cpp".into(),
                "zap/*.h".into(),
                "lua/lua-vec/src/*.c".into(),
                "resource/scripts/*.lua".into(),
                "doc/static/*.txt".into(),
            ],
            doxygen: DoxygenConfig::default(),
        }
    }
}

impl Default for DoxygenConfig {
    fn default() -> Self {
        DoxygenConfig {
            command: "doxygen".into(),
            config: PathBuf::from("luadocs.doxygen"),
            timeout_secs: 600,
        }
    }
}

impl DoxygenConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid configuration")
    }

    /// Load `path`, or `luadoc.toml` if present, or the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let candidate = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !candidate.is_file() {
                    return Ok(Config::default());
                }
                candidate
            }
        };
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("in {}", path.display()))
    }
}
