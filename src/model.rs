//! Data model shared by the scanner, the emitter and the post-processor.

use indexmap::IndexMap;
use std::path::Path;

/// Name of the dummy method injected by `@luafuncsheader`. The post-processor
/// looks for it in the rendered page and moves its documentation to the top
/// of the member table.
pub const FUNCS_HEADER_MARKER: &str = "DummyConstructor";

/// Comment convention of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// C/C++ sources: `/** ... */`, `Class::method`.
    Block,
    /// Lua scripts: `--[[ ... --]]`, `Class.method` or `Class:method`.
    Bracketed,
    /// Static pages; tokenized like C++ sources.
    Plain,
}

impl Dialect {
    /// Pick the dialect from a file extension. `None` for unsupported files.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("cpp" | "cc" | "c" | "h" | "hpp") => Some(Dialect::Block),
            Some("lua") => Some(Dialect::Bracketed),
            Some("txt") => Some(Dialect::Plain),
            _ => None,
        }
    }

    pub fn comment_open(self) -> &'static str {
        match self {
            Dialect::Bracketed => "--[[",
            Dialect::Block | Dialect::Plain => "/**",
        }
    }

    pub fn comment_close(self) -> &'static str {
        match self {
            Dialect::Bracketed => "--]]",
            Dialect::Block | Dialect::Plain => "*/",
        }
    }
}

/// Synthetic declaration of one class.
///
/// The opening `class X { public:` line lives in its own slot so that a
/// registration macro found after the members were collected does not need
/// to splice it in front of them.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ClassFragments {
    pub header: String,
    pub body: Vec<String>,
}

impl ClassFragments {
    /// Set the opening line unless one is already present.
    pub fn open_if_unset(&mut self, header: String) {
        if self.header.is_empty() {
            self.header = header;
        }
    }

    /// Remove the first body fragment equal to `fragment`. Returns whether
    /// anything was removed.
    pub fn remove_fragment(&mut self, fragment: &str) -> bool {
        match self.body.iter().position(|f| f == fragment) {
            Some(pos) => {
                self.body.remove(pos);
                true
            }
            None => false,
        }
    }
}

/// Everything one input file contributes to its synthetic header.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FileFragments {
    /// Classes in first-reference order.
    pub classes: IndexMap<String, ClassFragments>,
    pub global_functions: Vec<String>,
    pub comments: Vec<String>,
}

impl FileFragments {
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.global_functions.is_empty() && self.comments.is_empty()
    }

    /// Fragments for `name`, created empty on first reference.
    pub fn class_mut(&mut self, name: &str) -> &mut ClassFragments {
        self.classes.entry(name.to_string()).or_default()
    }
}

/// Streams aggregated over every file of a run and written once at the end.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Accumulators {
    pub mainpage: Vec<String>,
    pub enums: Vec<String>,
}

/// Column layout parsed from `@luaenum Name(value[, descr[, include]])`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumSpec {
    pub name: String,
    /// Zero-based column holding the Lua-visible symbol.
    pub value_column: usize,
    pub descr_column: Option<usize>,
    /// Column holding a `true`/`false` "expose to Lua" flag.
    pub include_column: Option<usize>,
}
