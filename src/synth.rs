//! Declaration synthesizer: turns annotation payloads into the fake C++
//! doxygen reads.

use crate::error::ScanError;
use crate::model::{Dialect, EnumSpec, FUNCS_HEADER_MARKER};
use regex::Regex;
use std::sync::LazyLock;

// `@luafunc [static] [rettype] [Class<sep>]method(args)`
static RE_LUAFUNC_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@luafunc\s+(static\s+)?(\w+\s+)?(?:(\w+)::)?(.+?)\((.*)\)").unwrap()
});

static RE_LUAFUNC_BRACKETED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@luafunc\s+(static\s+)?(\w+\s+)?(?:(\w+)[.:])?(.+?)\((.*)\)").unwrap()
});

/// Opening line of a class, optionally with a parent.
pub fn class_opening(name: &str, parent: Option<&str>) -> String {
    match parent {
        Some(parent) => format!("class {} : public {} {{ \n public:\n", name, parent),
        None => format!("class {} {{ \n public:\n", name),
    }
}

/// Closing line written after a class body.
pub fn class_closing(name: &str) -> String {
    format!("}}; // {}\n", name)
}

/// Stub for a method listed in a `LUA_METHODS` table.
pub fn method_stub(name: &str) -> String {
    format!("void {}() {{ }}\n", name)
}

pub fn static_method_stub(name: &str) -> String {
    format!("static void {}() {{ }}\n", name)
}

/// True when any fragment already declares `name(`.
pub fn declares_method(fragments: &[String], name: &str) -> bool {
    let re = match Regex::new(&format!(r"\s{}\(", regex::escape(name))) {
        Ok(re) => re,
        Err(_) => return false,
    };
    fragments.iter().any(|f| re.is_match(f))
}

pub fn marker_stub() -> String {
    method_stub(FUNCS_HEADER_MARKER)
}

/// Doxygen target for the free text following `@luafuncsheader Class`.
pub fn marker_doc_target(class: &str) -> String {
    format!("\\fn {}::{}\n", class, FUNCS_HEADER_MARKER)
}

pub fn class_doc_target(class: &str) -> String {
    format!(" \\class {}\n", class)
}

pub fn geometry_paragraph(body: &str) -> String {
    format!("\\par Geometry\n{}\n", body)
}

pub fn description_paragraph(text: &str) -> String {
    format!("\n {}\n", text)
}

/// A parsed `@luafunc` annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LuaFunc {
    pub is_static: bool,
    /// Return type as written; `None` when omitted.
    pub ret: Option<String>,
    /// Owning class; `None` for global functions.
    pub class: Option<String>,
    pub method: String,
    pub args: String,
}

impl LuaFunc {
    /// Parse the annotation on `text` (line `line` of its file).
    pub fn parse(text: &str, dialect: Dialect, line: usize) -> Result<Self, ScanError> {
        let re = match dialect {
            Dialect::Bracketed => &RE_LUAFUNC_BRACKETED,
            Dialect::Block | Dialect::Plain => &RE_LUAFUNC_BLOCK,
        };
        let missing = || ScanError::MissingMethodName {
            line,
            text: text.trim().to_string(),
        };
        let caps = re.captures(text).ok_or_else(missing)?;

        let method = caps[4].trim().to_string();
        if method.is_empty() {
            return Err(missing());
        }

        Ok(LuaFunc {
            is_static: caps.get(1).is_some(),
            ret: caps.get(2).map(|m| m.as_str().trim().to_string()),
            class: caps.get(3).map(|m| m.as_str().to_string()),
            method,
            args: caps[5].to_string(),
        })
    }

    /// Constructors are written `Class::Class(...)`.
    pub fn is_constructor(&self) -> bool {
        self.class.as_deref() == Some(self.method.as_str())
    }

    /// `\fn` line that attaches the following comment text to this function.
    /// An omitted return type stays omitted so doxygen doesn't print `void`.
    pub fn doc_target(&self) -> String {
        format!(
            " \\fn {} {}::{}({})\n",
            self.ret.as_deref().unwrap_or(""),
            self.class.as_deref().unwrap_or("global"),
            self.method,
            self.args
        )
    }

    /// Declaration placed in the class body (or the global namespace),
    /// carrying the annotation it came from.
    pub fn declaration(&self, source: &str) -> String {
        let mut decl = String::new();
        if self.is_static {
            decl.push_str("static ");
        }
        decl.push_str(self.ret.as_deref().unwrap_or("void"));
        decl.push(' ');
        decl.push_str(&format!(
            "{}({}) {{ /* From '{}' */ }}\n",
            self.method,
            self.args,
            source.trim().replace("*/", "* /")
        ));
        decl
    }

    /// Usage snippet appended to a constructor's documentation.
    pub fn constructor_example(&self) -> String {
        let class = self.class.as_deref().unwrap_or(&self.method);
        let var = class.to_lowercase();
        format!(
            "\\brief Constructor.\n\nExample:\n@code\n{var} = {class}.new({args})\n...\nlevelgen:addItem({var})\n@endcode\n\n",
            var = var,
            class = class,
            args = self.args
        )
    }
}

// -- Enum groups --------------------------------------------------------------

pub fn enum_group_open(spec: &EnumSpec) -> String {
    format!("/**\n  * @defgroup {0}Enum {0}\n", spec.name)
}

/// Written when the table `#define` is reached.
pub fn enum_table_start(spec: &EnumSpec) -> Vec<String> {
    vec!["@{\n".to_string(), format!("# {}\n", spec.name)]
}

pub fn enum_row(spec: &EnumSpec, value: &str, descr: &str) -> String {
    if descr.is_empty() {
        format!(" * * %{}.%{} <br>\n", spec.name, value)
    } else {
        format!(" * * %{}.%{} <br>\n `{}` <br>\n", spec.name, value, descr)
    }
}

pub fn enum_table_end() -> Vec<String> {
    vec!["@}\n".to_string(), "*/\n\n".to_string()]
}

/// Closes a group whose table never showed up.
pub fn enum_group_abandon() -> String {
    "*/\n\n".to_string()
}
