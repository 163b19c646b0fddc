//! Thin helpers over `markup5ever_rcdom` for the page rewrites.
//!
//! Pages must be well-formed XML. Once that is established they are built
//! into a tree by the HTML parser and written back with the HTML serializer.

use crate::error::PostProcessError;
use html5ever::serialize::{SerializeOpts, TraversalScope};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{ns, parse_document, serialize, Attribute, LocalName, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::cell::{Cell, RefCell};
use std::path::Path;
use std::rc::Rc;
use tracing::debug;

// -- Parse / serialize ----------------------------------------------------

/// Parse a page that must be well-formed XHTML.
pub fn parse(page: &Path, text: &str) -> Result<RcDom, PostProcessError> {
    check_well_formed(text).map_err(|error| PostProcessError::Malformed {
        page: page.to_path_buf(),
        errors: vec![error],
    })?;

    let dom = parse_document(RcDom::default(), ParseOpts::default()).one(text);
    let recovered = dom.errors.borrow().len();
    if recovered > 0 {
        debug!("{}: {} html parser note(s)", page.display(), recovered);
    }
    Ok(dom)
}

/// Tags must nest and close, and text may only use the XML entities.
fn check_well_formed(text: &str) -> Result<(), String> {
    let mut reader = Reader::from_str(text);
    let mut open: Vec<String> = Vec::new();
    loop {
        let at = reader.buffer_position();
        match reader.read_event() {
            Ok(Event::Start(tag)) => open.push(String::from_utf8_lossy(tag.name().as_ref()).into_owned()),
            Ok(Event::End(_)) => {
                open.pop();
            }
            Ok(Event::Text(content)) => {
                content
                    .unescape()
                    .map_err(|e| format!("at byte {}: {}", at, e))?;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(format!("at byte {}: {}", reader.buffer_position(), e)),
        }
    }
    match open.pop() {
        Some(tag) => Err(format!("<{}> is never closed", tag)),
        None => Ok(()),
    }
}

/// Everything under the document node, doctype included.
pub fn serialize_document(dom: &RcDom) -> Result<String, PostProcessError> {
    let mut output = Vec::new();
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::ChildrenOnly(None),
        ..Default::default()
    };
    serialize(&mut output, &SerializableHandle::from(dom.document.clone()), opts)?;
    Ok(String::from_utf8_lossy(&output).into_owned())
}

// -- Queries --------------------------------------------------------------

pub fn local_name(node: &Node) -> Option<&str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(&*name.local),
        _ => None,
    }
}

pub fn is_element(node: &Node, tag: &str) -> bool {
    local_name(node) == Some(tag)
}

pub fn attr(node: &Node, key: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| &*a.name.local == key)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

/// `<tag class="class">`, compared exactly rather than per class token.
pub fn has_class(node: &Node, tag: &str, class: &str) -> bool {
    is_element(node, tag) && attr(node, "class").as_deref() == Some(class)
}

/// Every node below `root` in document order.
pub fn descendants(root: &Handle) -> Vec<Handle> {
    let mut out = Vec::new();
    let mut stack: Vec<Handle> = root.children.borrow().iter().rev().cloned().collect();
    while let Some(node) = stack.pop() {
        stack.extend(node.children.borrow().iter().rev().cloned());
        out.push(node);
    }
    out
}

/// Elements named `tag` below `root`, in document order.
pub fn elements(root: &Handle, tag: &str) -> Vec<Handle> {
    descendants(root)
        .into_iter()
        .filter(|n| is_element(n, tag))
        .collect()
}

pub fn element_children(node: &Handle) -> Vec<Handle> {
    node.children
        .borrow()
        .iter()
        .filter(|c| matches!(c.data, NodeData::Element { .. }))
        .cloned()
        .collect()
}

/// Concatenated text of the whole subtree.
pub fn text_content(node: &Handle) -> String {
    let mut out = String::new();
    if let NodeData::Text { contents } = &node.data {
        out.push_str(&contents.borrow());
    }
    for node in descendants(node) {
        if let NodeData::Text { contents } = &node.data {
            out.push_str(&contents.borrow());
        }
    }
    out
}

/// Text nodes that are direct children of `node`.
pub fn direct_texts(node: &Handle) -> Vec<String> {
    node.children
        .borrow()
        .iter()
        .filter_map(|c| match &c.data {
            NodeData::Text { contents } => Some(contents.borrow().to_string()),
            _ => None,
        })
        .collect()
}

pub fn parent(node: &Handle) -> Option<Handle> {
    let weak = node.parent.take()?;
    let parent = weak.upgrade();
    node.parent.set(Some(weak));
    parent
}

pub fn is_descendant(node: &Handle, ancestor: &Handle) -> bool {
    let mut current = parent(node);
    while let Some(p) = current {
        if Rc::ptr_eq(&p, ancestor) {
            return true;
        }
        current = parent(&p);
    }
    false
}

// -- Mutation -------------------------------------------------------------

/// Remove `node` from its parent; a no-op for detached nodes.
pub fn detach(node: &Handle) {
    if let Some(parent) = parent(node) {
        parent.children.borrow_mut().retain(|c| !Rc::ptr_eq(c, node));
    }
    node.parent.set(None);
}

pub fn append(parent: &Handle, child: Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}

/// Insert `nodes` right after the first element child of `parent`.
pub fn insert_after_first_element(parent: &Handle, nodes: Vec<Handle>) {
    let at = parent
        .children
        .borrow()
        .iter()
        .position(|c| matches!(c.data, NodeData::Element { .. }))
        .map_or(0, |i| i + 1);
    for node in &nodes {
        node.parent.set(Some(Rc::downgrade(parent)));
    }
    let mut children = parent.children.borrow_mut();
    children.splice(at..at, nodes);
}

/// Where a table keeps its rows: the implied `<tbody>` if there is one.
pub fn row_container(table: &Handle) -> Handle {
    element_children(table)
        .into_iter()
        .find(|c| is_element(c, "tbody"))
        .unwrap_or_else(|| table.clone())
}

pub fn clear_children(node: &Handle) {
    for child in node.children.borrow_mut().drain(..) {
        child.parent.set(None);
    }
}

/// Rewrite every text node under `root`.
pub fn replace_text(root: &Handle, from: &str, to: &str) {
    for node in descendants(root) {
        if let NodeData::Text { contents } = &node.data {
            let current = contents.borrow().to_string();
            if current.contains(from) {
                *contents.borrow_mut() = StrTendril::from(current.replace(from, to));
            }
        }
    }
}

// -- Construction ---------------------------------------------------------

fn new_node(data: NodeData) -> Handle {
    Rc::new(Node {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data,
    })
}

pub fn create_element(tag: &str, attrs: &[(&str, &str)]) -> Handle {
    let attributes = attrs
        .iter()
        .map(|(name, value)| Attribute {
            name: QualName::new(None, ns!(), LocalName::from(*name)),
            value: StrTendril::from(*value),
        })
        .collect();

    new_node(NodeData::Element {
        name: QualName::new(None, ns!(html), LocalName::from(tag)),
        attrs: RefCell::new(attributes),
        template_contents: Default::default(),
        mathml_annotation_xml_integration_point: false,
    })
}

pub fn create_text(text: &str) -> Handle {
    new_node(NodeData::Text {
        contents: RefCell::new(StrTendril::from(text)),
    })
}

/// Element with a single text child.
pub fn create_text_element(tag: &str, attrs: &[(&str, &str)], text: &str) -> Handle {
    let el = create_element(tag, attrs);
    append(&el, create_text(text));
    el
}

/// Detached copy of `node` and its subtree.
pub fn deep_clone(node: &Handle) -> Handle {
    let data = match &node.data {
        NodeData::Document => NodeData::Document,
        NodeData::Doctype {
            name,
            public_id,
            system_id,
        } => NodeData::Doctype {
            name: name.clone(),
            public_id: public_id.clone(),
            system_id: system_id.clone(),
        },
        NodeData::Text { contents } => NodeData::Text {
            contents: RefCell::new(contents.borrow().clone()),
        },
        NodeData::Comment { contents } => NodeData::Comment {
            contents: contents.clone(),
        },
        NodeData::Element {
            name,
            attrs,
            mathml_annotation_xml_integration_point,
            ..
        } => NodeData::Element {
            name: name.clone(),
            attrs: RefCell::new(attrs.borrow().clone()),
            template_contents: Default::default(),
            mathml_annotation_xml_integration_point: *mathml_annotation_xml_integration_point,
        },
        NodeData::ProcessingInstruction { target, contents } => NodeData::ProcessingInstruction {
            target: target.clone(),
            contents: contents.clone(),
        },
    };
    let copy = new_node(data);
    for child in node.children.borrow().iter() {
        append(&copy, deep_clone(child));
    }
    copy
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN" "https://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd">
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>Ship</title></head>
<body><div class="a"><p>one <b>two</b> three</p><br/></div></body>
</html>
"#;

    fn body(dom: &RcDom) -> Handle {
        elements(&dom.document, "body").remove(0)
    }

    #[test]
    fn parses_and_walks_in_document_order() {
        let dom = parse(Path::new("p.html"), PAGE).unwrap();
        let names: Vec<String> = descendants(&body(&dom))
            .iter()
            .filter_map(|n| local_name(n).map(str::to_string))
            .collect();
        assert_eq!(names, vec!["div", "p", "b", "br"]);
    }

    #[test]
    fn text_helpers() {
        let dom = parse(Path::new("p.html"), PAGE).unwrap();
        let p = elements(&dom.document, "p").remove(0);
        assert_eq!(text_content(&p), "one two three");
        assert_eq!(direct_texts(&p), vec!["one ", " three"]);
    }

    fn malformed(text: &str) -> Vec<String> {
        match parse(Path::new("bad.html"), text) {
            Err(PostProcessError::Malformed { errors, .. }) => errors,
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("parsed a malformed page"),
        }
    }

    #[test]
    fn mismatched_tags_are_malformed() {
        assert_eq!(malformed("<html><body><p>x</b></body></html>").len(), 1);
    }

    #[test]
    fn unclosed_and_html_entities_are_malformed() {
        let errors = malformed("<html><body><p>x</p>");
        assert!(errors[0].contains("<body> is never closed"), "{:?}", errors);
        malformed("<html><body><p>a&nbsp;b</p></body></html>");
    }

    #[test]
    fn body_survives_doxygen_head() {
        let page = r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN" "https://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd">
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
<meta http-equiv="Content-Type" content="text/xhtml;charset=UTF-8"/>
<meta name="generator" content="Doxygen 1.9.8"/>
<title>Ship Class Reference</title>
<link href="tabs.css" rel="stylesheet" type="text/css"/>
<script type="text/javascript" src="jquery.js"></script>
<script type="text/javascript" src="dynsections.js"></script>
<script type="text/javascript">
$(document).ready(function() { init_search(); });
</script>
<link href="doxygen.css" rel="stylesheet" type="text/css"/>
</head>
<body>
<div class="contents"><table class="memberdecls"><tr class="heading"><td>x</td></tr></table></div>
</body>
</html>
"#;
        let dom = parse(Path::new("class_ship.html"), page).unwrap();
        assert_eq!(elements(&dom.document, "script").len(), 3);
        let table = elements(&dom.document, "table").remove(0);
        assert_eq!(text_content(&table), "x");
        assert!(is_element(&row_container(&table), "tbody"));

        let html = serialize_document(&dom).unwrap();
        assert!(html.contains(r#"<div class="contents"><table class="memberdecls">"#));
        assert!(html.contains(r#"<link href="doxygen.css" rel="stylesheet" type="text/css">"#));
    }

    #[test]
    fn serializes_as_html() {
        let dom = parse(Path::new("p.html"), PAGE).unwrap();
        let html = serialize_document(&dom).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<br>"));
        assert!(!html.contains("</br>"));
        assert!(html.contains(r#"<div class="a"><p>one <b>two</b> three</p>"#));
    }

    #[test]
    fn insert_detach_and_clone() {
        let dom = parse(Path::new("p.html"), PAGE).unwrap();
        let div = elements(&dom.document, "div").remove(0);
        let p = elements(&dom.document, "p").remove(0);

        let copy = deep_clone(&p);
        assert!(parent(&copy).is_none());

        insert_after_first_element(&div, vec![create_text_element("span", &[("class", "x")], "new")]);
        let kids: Vec<String> = element_children(&div)
            .iter()
            .filter_map(|n| local_name(n).map(str::to_string))
            .collect();
        assert_eq!(kids, vec!["p", "span", "br"]);

        detach(&p);
        assert!(!is_descendant(&p, &div));
        assert_eq!(text_content(&copy), "one two three");
        assert!(serialize_document(&dom)
            .unwrap()
            .contains(r#"<div class="a"><span class="x">new</span><br></div>"#));
    }

    #[test]
    fn replace_text_touches_every_text_node() {
        let dom = parse(Path::new("p.html"), PAGE).unwrap();
        replace_text(&dom.document, "t", "T");
        let p = elements(&dom.document, "p").remove(0);
        assert_eq!(text_content(&p), "one Two Three");
    }
}
