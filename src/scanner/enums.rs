//! `@luaenum` tags and the macro tables they describe.
//!
//! ```text
//! /**
//!  * @luaenum Weapon(2)
//!  * The Weapon enum can be used to represent a weapon in some functions.
//!  */
//! #define WEAPON_ITEM_TABLE \
//!   WEAPON_ITEM(WeaponPhaser, "Phaser", "Phaser", 100, ... ) \
//!   WEAPON_ITEM(WeaponBounce, "Bouncer", "Bouncer", 100, ... ) \
//! ```
//!
//! Columns are zero-based positions inside the row macro's argument list.

use crate::model::EnumSpec;
use crate::synth;
use regex::Regex;
use std::sync::LazyLock;

// "@luaenum ObjType(2)" or "@luaenum ObjType(2,1,4)"
static RE_LUAENUM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@luaenum\s+(\w+)\s*\((\d+)\s*(?:,\s*(\d+)\s*(?:,\s*(\d+)\s*)?)?\)").unwrap()
});

pub(super) static RE_DEFINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\s*define").unwrap());

static RE_EMBEDDED_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/\*.*?\*/").unwrap());

// Nothing but punctuation and the trailing backslash
static RE_BARE_CONTINUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\W*\\\s*$").unwrap());

static RE_BLANK_OR_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:$|//|/\*)").unwrap());

static RE_CONTINUED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\\s*$").unwrap());

/// Parse the column layout from a `@luaenum` tag.
pub fn parse_tag(line: &str) -> Option<EnumSpec> {
    let caps = RE_LUAENUM.captures(line)?;
    let column = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<usize>().ok());
    Some(EnumSpec {
        name: caps[1].to_string(),
        value_column: column(2)?,
        descr_column: column(3),
        include_column: column(4),
    })
}

/// Whether the table goes on after the current row.
#[derive(Debug, PartialEq, Eq)]
pub enum RowOutcome {
    More,
    Last,
}

/// Mine one line of the table body, appending a bullet to `enums` when the
/// row is visible to Lua.
pub fn consume_row(spec: &EnumSpec, line: &str, enums: &mut Vec<String>) -> RowOutcome {
    let line = RE_EMBEDDED_COMMENT.replace_all(line, "");

    if RE_BARE_CONTINUATION.is_match(&line) {
        return RowOutcome::More;
    }

    if !RE_BLANK_OR_COMMENT.is_match(&line) {
        let columns = split_columns(&line);
        let cell = |i: usize| columns.get(i).map(String::as_str).unwrap_or("");

        let hidden = spec
            .include_column
            .is_some_and(|i| trim_junk(cell(i)) == "false");

        if !hidden {
            // TODO: prefix each word of the description with `%` so doxygen
            // stops auto-linking class names that happen to appear in it.
            let descr = spec.descr_column.map(|i| trim_junk(cell(i))).unwrap_or("");
            let value = strip_value(cell(spec.value_column));
            enums.push(synth::enum_row(spec, &value, descr));
        }
    }

    if RE_CONTINUED.is_match(&line) {
        RowOutcome::More
    } else {
        RowOutcome::Last
    }
}

/// Split a row macro's arguments on top-level commas.
///
/// Text before the first `(` (the row macro's name) is dropped, as is
/// everything after the matching `)`. Quoted segments are atomic and nested
/// brackets keep their commas.
pub fn split_columns(line: &str) -> Vec<String> {
    let args = match open_paren(line) {
        Some(pos) => &line[pos + 1..],
        None => line,
    };

    let mut columns = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_quote = false;

    for c in args.chars() {
        if in_quote {
            current.push(c);
            if c == '"' {
                in_quote = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_quote = true;
                current.push(c);
            }
            '(' | '{' | '[' => {
                depth += 1;
                current.push(c);
            }
            ')' | '}' | ']' => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => columns.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    columns.push(current);
    columns
}

/// First `(` that isn't inside a quoted string.
fn open_paren(line: &str) -> Option<usize> {
    let mut in_quote = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_quote = !in_quote,
            '(' if !in_quote => return Some(i),
            _ => {}
        }
    }
    None
}

fn trim_junk(cell: &str) -> &str {
    cell.trim_matches(|c: char| c.is_whitespace() || c == '"' || c == '\\')
}

/// Lua symbols never contain quotes, spaces or stray macro punctuation.
fn strip_value(cell: &str) -> String {
    cell.chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '"' | ')' | '\\'))
        .collect()
}
