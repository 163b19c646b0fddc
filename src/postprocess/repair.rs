//! Line-level fixes applied to raw pages before strict parsing.

use regex::Regex;
use std::sync::LazyLock;

// Trailing &#160; inside a parameter-type cell pushes the following ")" out of place
static RE_PARAMTYPE_NBSP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(<td class="paramtype">.+)&#160;(</td>)"#).unwrap());
static RE_LICENSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/\* @license.*?\*/").unwrap());

pub fn repair_line(line: &str) -> String {
    let line = line.replace("&nbsp;", "&#160;").replace("&ndash;", "\u{2013}");
    let line = RE_PARAMTYPE_NBSP.replace(&line, "${1}${2}");
    RE_LICENSE.replace_all(&line, "").into_owned()
}

/// Repair a whole page, preserving its line structure.
pub fn repair(text: &str) -> String {
    text.split_inclusive('\n').map(repair_line).collect()
}
