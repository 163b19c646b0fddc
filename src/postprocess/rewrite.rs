//! Tree rewrites for doxygen class pages.
//!
//! Each function matches one fixed shape of doxygen's output. They are run
//! in order by [`rewrite_page`]; removals found early are deferred until the
//! end so later steps still see the original structure.

use super::dom;
use crate::error::PostProcessError;
use crate::model::FUNCS_HEADER_MARKER;
use markup5ever_rcdom::Handle;
use std::collections::HashMap;
use tracing::debug;

const NBSP: char = '\u{a0}';

/// Apply every rewrite to a parsed page.
pub fn rewrite_page(root: &Handle) -> Result<(), PostProcessError> {
    remove_more_links(root, 2);
    dom::replace_text(root, "Public Member Function", "Member Function");
    dom::replace_text(root, "More...", "[details]");

    let doomed = find_marker_nodes(root);
    promote_marker_content(root);

    let class_urls = class_urls(root);
    label_inherited_members(root, &class_urls)?;
    clean_up_signatures(root);

    for node in &doomed {
        dom::detach(node);
    }
    Ok(())
}

// -- Disclosure links -----------------------------------------------------

/// Drop the first `limit` "More..." links.
pub fn remove_more_links(root: &Handle, limit: usize) {
    let links: Vec<Handle> = dom::elements(root, "a")
        .into_iter()
        .filter(|a| dom::direct_texts(a).concat() == "More...")
        .take(limit)
        .collect();
    for link in &links {
        dom::detach(link);
    }
}

// -- Marker stub ----------------------------------------------------------

fn mentions_marker(node: &Handle) -> bool {
    dom::direct_texts(node).concat().contains(FUNCS_HEADER_MARKER)
}

/// A row with a `<td><a>…DummyConstructor…</a></td>` somewhere inside.
fn is_marker_row(tr: &Handle) -> bool {
    dom::elements(tr, "td").iter().any(|td| {
        dom::element_children(td)
            .iter()
            .any(|a| dom::is_element(a, "a") && mentions_marker(a))
    })
}

fn in_memberdecls(node: &Handle) -> bool {
    let mut current = dom::parent(node);
    while let Some(p) = current {
        if dom::has_class(&p, "table", "memberdecls") {
            return true;
        }
        current = dom::parent(&p);
    }
    false
}

/// The marker's summary row, the row after it, its heading and the block
/// after that heading. Returned for deletion once everything else is done.
pub fn find_marker_nodes(root: &Handle) -> Vec<Handle> {
    let mut doomed = Vec::new();

    let rows = dom::elements(root, "tr");
    if let Some(row) = rows.iter().find(|tr| in_memberdecls(tr) && is_marker_row(tr)) {
        doomed.push(row.clone());
    }

    // The row whose nearest preceding row (ancestors excluded) is a marker row
    let following = rows.iter().enumerate().skip(1).find_map(|(i, tr)| {
        if !in_memberdecls(tr) {
            return None;
        }
        let previous = rows[..i].iter().rev().find(|p| !dom::is_descendant(tr, p))?;
        is_marker_row(previous).then(|| tr.clone())
    });
    if let Some(row) = following {
        doomed.push(row);
    }

    let all = dom::descendants(root);
    let heading = all
        .iter()
        .position(|n| dom::has_class(n, "h2", "memtitle") && mentions_marker(n));
    if let Some(at) = heading {
        let h2 = all[at].clone();
        let block = all[at + 1..]
            .iter()
            .find(|n| dom::is_element(n, "div") && !dom::is_descendant(n, &h2))
            .cloned();
        doomed.push(h2);
        doomed.extend(block);
    }

    debug!("{} marker node(s) scheduled for removal", doomed.len());
    doomed
}

/// Move the marker's documentation to the top of the member table.
///
/// The text lives in the first child of the block that follows the
/// `Class::DummyConstructor` signature cell. It is copied into two new rows
/// inserted right after the first member table's heading row.
pub fn promote_marker_content(root: &Handle) -> bool {
    let qualified = format!("::{}", FUNCS_HEADER_MARKER);
    let all = dom::descendants(root);

    let Some(at) = all
        .iter()
        .position(|n| dom::is_element(n, "td") && dom::direct_texts(n).concat().contains(&qualified))
    else {
        return false;
    };
    let td = all[at].clone();

    let content = all[at + 1..]
        .iter()
        .filter(|n| dom::is_element(n, "div") && !dom::is_descendant(n, &td))
        .find_map(|div| dom::element_children(div).into_iter().next());
    let Some(content) = content else {
        return false;
    };
    let Some(table) = dom::elements(root, "table")
        .into_iter()
        .find(|t| dom::has_class(t, "table", "memberdecls"))
    else {
        return false;
    };

    let text_row = dom::create_element("tr", &[]);
    let text_cell = dom::create_element("td", &[("colspan", "2"), ("class", "memItemRight")]);
    dom::append(&text_cell, dom::deep_clone(&content));
    dom::append(&text_row, text_cell);

    let separator = dom::create_element("tr", &[]);
    dom::append(
        &separator,
        dom::create_text_element("td", &[("class", "memSeparator"), ("colspan", "2")], &NBSP.to_string()),
    );

    dom::insert_after_first_element(&dom::row_container(&table), vec![text_row, separator]);
    true
}

// -- Inherited members ----------------------------------------------------

/// Class short name → page, from the inheritance diagram's image map.
pub fn class_urls(root: &Handle) -> HashMap<String, String> {
    dom::elements(root, "area")
        .iter()
        .filter(|area| dom::parent(area).is_some_and(|p| dom::is_element(&p, "map")))
        .filter_map(|area| Some((dom::attr(area, "alt")?, dom::attr(area, "href")?)))
        .collect()
}

/// Text nodes directly inside `<td class="memname">` cells under `table`.
fn signature_names(table: &Handle) -> Vec<String> {
    dom::elements(table, "td")
        .iter()
        .filter(|td| dom::has_class(td, "td", "memname"))
        .flat_map(dom::direct_texts)
        .collect()
}

/// `"int BfObject::doMath"` → `("int", "BfObject", "doMath")`.
///
/// Return type may be empty; `None` when the name is not qualified.
pub fn parse_member_name(memname: &str) -> Option<(String, String, String)> {
    let (qualifier, member) = memname.trim().rsplit_once("::")?;
    let (ret, class) = match qualifier.trim().rsplit_once(char::is_whitespace) {
        Some((ret, class)) => (ret.trim(), class),
        None => ("", qualifier.trim()),
    };
    Some((ret.to_string(), class.to_string(), member.trim().to_string()))
}

/// Turn each "inherited" label into "inherited from Class", linked to the
/// class page when the diagram knows it.
pub fn label_inherited_members(
    root: &Handle,
    class_urls: &HashMap<String, String>,
) -> Result<usize, PostProcessError> {
    let mut labelled = 0;
    for table in dom::elements(root, "table") {
        if !dom::text_content(&table).contains("inherited") {
            continue;
        }
        let names = signature_names(&table);
        match names.len() {
            0 => continue,
            1 => {}
            found => return Err(PostProcessError::AmbiguousSignature { found }),
        }
        let Some((_, class, member)) = parse_member_name(&names[0]) else {
            continue;
        };

        let labels: Vec<Handle> = dom::elements(&table, "span")
            .into_iter()
            .filter(|s| dom::has_class(s, "span", "mlabel") && dom::direct_texts(s).concat() == "inherited")
            .collect();
        let label = match labels.as_slice() {
            [] => continue,
            [label] => label,
            _ => {
                return Err(PostProcessError::InheritedLabel {
                    member,
                    found: labels.len(),
                })
            }
        };

        let text = format!("inherited from {}", class);
        let replacement = match class_urls.get(&class) {
            Some(url) => dom::create_text_element("a", &[("href", url.as_str())], &text),
            None => dom::create_text(&text),
        };
        dom::clear_children(label);
        dom::append(label, replacement);
        labelled += 1;
    }
    Ok(labelled)
}

// -- Signatures -----------------------------------------------------------

fn argument_pair(cell: &Handle, row: &Handle, class: &str) {
    let text = dom::text_content(cell).replace(',', "");
    dom::append(row, dom::create_text_element("span", &[("class", class)], text.trim()));
}

/// Strip the class and return type from each signature and add an
/// "Arg types" summary row.
pub fn clean_up_signatures(root: &Handle) -> usize {
    let mut cleaned = 0;
    let tables: Vec<Handle> = dom::elements(root, "table")
        .into_iter()
        .filter(|t| dom::has_class(t, "table", "memname"))
        .collect();

    for table in &tables {
        let sigs = signature_names(table);
        let [sig] = sigs.as_slice() else {
            continue;
        };
        let Some((ret, _, member)) = parse_member_name(sig) else {
            continue;
        };

        let cells = dom::elements(table, "td");
        if let Some(first) = cells.first() {
            dom::clear_children(first);
            dom::append(first, dom::create_text(&member));
        }

        let types: Vec<Handle> = cells
            .iter()
            .filter(|td| dom::has_class(td, "td", "paramtype"))
            .cloned()
            .collect();
        let names: Vec<Handle> = cells
            .iter()
            .filter(|td| dom::has_class(td, "td", "paramname"))
            .cloned()
            .collect();
        // Zero-argument signatures carry a lone empty paramname cell
        if types.len() != names.len() {
            cleaned += 1;
            continue;
        }

        let colspan = cells.len().to_string();
        let summary = dom::create_element("td", &[("colspan", colspan.as_str())]);
        dom::append(
            &summary,
            dom::create_text_element("span", &[("class", "argtypes")], "Arg types:"),
        );
        dom::append(&summary, dom::create_text(" "));
        for (i, (ty, name)) in types.iter().zip(&names).enumerate() {
            if i > 0 {
                dom::append(&summary, dom::create_text(", "));
            }
            argument_pair(name, &summary, "paramname");
            dom::append(&summary, dom::create_text(": "));
            argument_pair(ty, &summary, "paramtype");
        }
        for ty in &types {
            dom::detach(ty);
        }

        let ret = if ret.is_empty() { "nil" } else { ret.as_str() };
        dom::append(
            &summary,
            dom::create_text(&format!("{NBSP}{NBSP}|{NBSP}{NBSP}returns ")),
        );
        dom::append(
            &summary,
            dom::create_text_element("span", &[("class", "returntype")], ret),
        );

        let row = dom::create_element("tr", &[("class", "nofloat argline")]);
        dom::append(&row, summary);
        dom::append(&dom::row_container(table), row);
        cleaned += 1;
    }
    debug!("cleaned {} signature(s)", cleaned);
    cleaned
}
