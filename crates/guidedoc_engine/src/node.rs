use ego_tree::NodeRef;
use scraper::node::Node as DomNode;
use scraper::{ElementRef, Html};

/// Owned, closed view of the parse tree the builder walks.
///
/// The scraper DOM keeps nodes behind arena references tied to the `Html`
/// document. Converting to this two-case sum up front lets the builder and the
/// engine pass subtrees around freely, and drops node kinds (comments,
/// doctypes, processing instructions) that never contribute content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Element(Element),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub classes: Vec<String>,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            classes: Vec::new(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.classes.iter().any(|class| class == name)
    }

    /// All descendant text concatenated in document order.
    pub fn flattened_text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    /// First descendant element with the given tag, pre-order.
    pub fn find_descendant(&self, tag: &str) -> Option<&Element> {
        for child in &self.children {
            if let Node::Element(el) = child {
                if el.tag == tag {
                    return Some(el);
                }
                if let Some(found) = el.find_descendant(tag) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// All descendant elements matching the tag and carrying any of the given
    /// classes, in document order. Used by the table handler to locate rows
    /// and cells wherever the markup generator nested them.
    pub fn find_all_by_class<'a>(&'a self, tag: &str, classes: &[&str]) -> Vec<&'a Element> {
        let mut found = Vec::new();
        collect_by_class(&self.children, tag, classes, &mut found);
        found
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => collect_text(&el.children, out),
        }
    }
}

fn collect_by_class<'a>(
    nodes: &'a [Node],
    tag: &str,
    classes: &[&str],
    found: &mut Vec<&'a Element>,
) {
    for node in nodes {
        if let Node::Element(el) = node {
            if el.tag == tag && classes.iter().any(|class| el.has_class(class)) {
                found.push(el);
            }
            collect_by_class(&el.children, tag, classes, found);
        }
    }
}

/// Parses an HTML fragment and returns its top-level nodes.
pub fn nodes_from_fragment(html: &str) -> Vec<Node> {
    let fragment = Html::parse_fragment(html);
    fragment
        .root_element()
        .children()
        .filter_map(from_dom_node)
        .collect()
}

/// Converts one scraper DOM node into an owned [`Node`].
///
/// Returns `None` for node kinds with no content value (comments, doctypes).
pub fn from_dom_node(node: NodeRef<'_, DomNode>) -> Option<Node> {
    match node.value() {
        DomNode::Text(text) => Some(Node::Text(text.to_string())),
        DomNode::Element(_) => ElementRef::wrap(node).map(from_element),
        _ => None,
    }
}

fn from_element(element: ElementRef<'_>) -> Node {
    let value = element.value();
    let tag = value.name().to_ascii_lowercase();
    let classes = value
        .attr("class")
        .map(|raw| raw.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();
    let attrs = value
        .attrs()
        .map(|(key, val)| (key.to_string(), val.to_string()))
        .collect();
    let children = element.children().filter_map(from_dom_node).collect();

    Node::Element(Element {
        tag,
        classes,
        attrs,
        children,
    })
}

#[cfg(test)]
mod tests {
    use super::{nodes_from_fragment, Node};

    #[test]
    fn fragment_parse_keeps_document_order() {
        let nodes = nodes_from_fragment("<p>one</p>two<br>");
        assert_eq!(nodes.len(), 3);
        assert!(matches!(&nodes[0], Node::Element(el) if el.tag == "p"));
        assert!(matches!(&nodes[1], Node::Text(t) if t == "two"));
        assert!(matches!(&nodes[2], Node::Element(el) if el.tag == "br"));
    }

    #[test]
    fn classes_and_attrs_are_captured() {
        let nodes = nodes_from_fragment(r#"<div class="bb_h1 wide" src="x">hi</div>"#);
        let Node::Element(el) = &nodes[0] else {
            panic!("expected element");
        };
        assert!(el.has_class("bb_h1"));
        assert!(el.has_class("wide"));
        assert_eq!(el.attr("src"), Some("x"));
        assert_eq!(el.flattened_text(), "hi");
    }

    #[test]
    fn comments_are_dropped() {
        let nodes = nodes_from_fragment("<!-- hidden --><p>kept</p>");
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn descendant_search_is_preorder() {
        let nodes = nodes_from_fragment(r#"<a><span><img src="first"></span><img src="second"></a>"#);
        let Node::Element(anchor) = &nodes[0] else {
            panic!("expected element");
        };
        let img = anchor.find_descendant("img").expect("img");
        assert_eq!(img.attr("src"), Some("first"));
    }
}
