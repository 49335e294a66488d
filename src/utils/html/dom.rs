//! Arena tree over the token stream.
//!
//! Nodes keep their source text (start tag, end tag, text, comments), so a
//! tree nobody touched serializes back to the exact input. Mutation is
//! limited to what injection needs: detaching nodes and splicing in parsed
//! fragments.

use super::{
    HtmlError,
    reader::{HtmlReader, Token},
    text::decode_entities,
};
use quick_xml::events::BytesStart;

pub type NodeId = usize;

/// The document root. Always present, never an element.
pub const ROOT: NodeId = 0;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Start tags that close an open `<p>`.
const CLOSES_P: &[&str] = &[
    "address", "article", "aside", "blockquote", "details", "div", "dl", "fieldset", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "main",
    "menu", "nav", "ol", "p", "pre", "section", "table", "ul",
];

#[derive(Debug, Clone)]
pub enum Node {
    Root,
    Element(Element),
    Text(String),
    /// Comments, doctype, stray end tags: written back untouched.
    Raw(String),
}

#[derive(Debug, Clone)]
pub struct Element {
    name: String,
    start_tag: String,
    self_closing: bool,
    /// `None` for void elements and elements closed implicitly.
    end_tag: Option<String>,
}

impl Element {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    /// Tag content between `<` and `>` (or `/>`).
    fn inner(&self) -> &str {
        let inner = self.start_tag.strip_prefix('<').unwrap_or(&self.start_tag);
        let inner = inner.strip_suffix('>').unwrap_or(inner);
        if self.self_closing {
            inner.strip_suffix('/').unwrap_or(inner)
        } else {
            inner
        }
    }

    fn bytes_start(&self) -> BytesStart<'_> {
        let inner = self.inner();
        let name_len = inner
            .find(|c: char| c.is_ascii_whitespace())
            .unwrap_or(inner.len());
        BytesStart::from_content(inner, name_len)
    }

    /// Decoded value of attribute `key` (ASCII case-insensitive).
    /// Valueless attributes yield an empty string.
    pub fn attr(&self, key: &str) -> Option<String> {
        self.bytes_start()
            .html_attributes()
            .flatten()
            .find(|a| a.key.as_ref().eq_ignore_ascii_case(key.as_bytes()))
            .map(|a| decode_entities(&String::from_utf8_lossy(&a.value)).into_owned())
    }

    #[inline]
    pub fn has_attr(&self, key: &str) -> bool {
        self.attr(key).is_some()
    }

    pub fn classes(&self) -> Vec<String> {
        self.attr("class")
            .map(|c| c.split_ascii_whitespace().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().iter().any(|c| c == class)
    }

    /// Heading level for `h1`..`h6`.
    pub fn heading_level(&self) -> Option<u8> {
        match self.name.as_bytes() {
            [b'h', d @ b'1'..=b'6'] => Some(d - b'0'),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    node: Node,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Dom {
    slots: Vec<Slot>,
}

impl Dom {
    pub fn parse(src: &str) -> Result<Self, HtmlError> {
        let mut dom = Self {
            slots: vec![Slot {
                node: Node::Root,
                parent: None,
                children: Vec::new(),
            }],
        };
        dom.build(ROOT, src)?;
        Ok(dom)
    }

    fn push(&mut self, parent: Option<NodeId>, node: Node) -> NodeId {
        let id = self.slots.len();
        self.slots.push(Slot {
            node,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.slots[parent].children.push(id);
        }
        id
    }

    fn build(&mut self, scope: NodeId, src: &str) -> Result<(), HtmlError> {
        let mut reader = HtmlReader::new(src);
        // stack[0] is the scope itself and is never popped
        let mut stack = vec![scope];

        loop {
            let (token, span) = reader.next_token()?;
            match token {
                Token::Eof => break,
                Token::Start(name) => {
                    self.close_implied(&mut stack, &name);
                    let open = !VOID_ELEMENTS.contains(&name.as_str());
                    let id = self.push(
                        stack.last().copied(),
                        Node::Element(Element {
                            name,
                            start_tag: span.to_owned(),
                            self_closing: false,
                            end_tag: None,
                        }),
                    );
                    if open {
                        stack.push(id);
                    }
                }
                Token::Empty(name) => {
                    self.close_implied(&mut stack, &name);
                    self.push(
                        stack.last().copied(),
                        Node::Element(Element {
                            name,
                            start_tag: span.to_owned(),
                            self_closing: true,
                            end_tag: None,
                        }),
                    );
                }
                Token::End(name) => {
                    let matched = stack
                        .iter()
                        .skip(1)
                        .rposition(|&id| self.element(id).is_some_and(|e| e.is(&name)));
                    match matched {
                        Some(pos) => {
                            let idx = pos + 1;
                            if let Node::Element(e) = &mut self.slots[stack[idx]].node {
                                e.end_tag = Some(span.to_owned());
                            }
                            stack.truncate(idx);
                        }
                        None => {
                            self.push(stack.last().copied(), Node::Raw(span.to_owned()));
                        }
                    }
                }
                Token::Text | Token::RawText => {
                    if !span.is_empty() {
                        self.append_text(stack[stack.len() - 1], span);
                    }
                }
                Token::Other => {
                    self.push(stack.last().copied(), Node::Raw(span.to_owned()));
                }
            }
        }
        Ok(())
    }

    fn close_implied(&self, stack: &mut Vec<NodeId>, opening: &str) {
        let Some(&top) = stack.last() else { return };
        if stack.len() == 1 {
            return;
        }
        let Some(open) = self.element(top) else { return };
        let implied = match open.name() {
            "p" => CLOSES_P.contains(&opening),
            "li" => opening == "li",
            "dt" | "dd" => matches!(opening, "dt" | "dd"),
            _ => false,
        };
        if implied {
            stack.pop();
        }
    }

    fn append_text(&mut self, parent: NodeId, span: &str) {
        if let Some(&last) = self.slots[parent].children.last()
            && let Node::Text(text) = &mut self.slots[last].node
        {
            text.push_str(span);
            return;
        }
        self.push(Some(parent), Node::Text(span.to_owned()));
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.slots[id].node
    }

    #[inline]
    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.slots[id].node {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    #[inline]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.slots[id].children
    }

    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slots[id].parent
    }

    /// Parent chain, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), |&p| self.parent(p))
    }

    /// Pre-order walk below `id`, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(id).to_vec();
        stack.reverse();
        Descendants { dom: self, stack }
    }

    /// First element below `id` in document order matching `pred`.
    pub fn find(&self, id: NodeId, pred: impl Fn(&Element) -> bool) -> Option<NodeId> {
        self.descendants(id)
            .find(|&n| self.element(n).is_some_and(&pred))
    }

    /// Decoded text below `id`, skipping `script`/`style` and any element
    /// for which `skip` returns true.
    pub fn text_content(&self, id: NodeId, skip: impl Fn(&Element) -> bool) -> String {
        let mut out = String::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            match &self.slots[n].node {
                Node::Text(t) => out.push_str(&decode_entities(t)),
                Node::Element(e) if matches!(e.name(), "script" | "style") || skip(e) => {}
                Node::Root | Node::Element(_) => {
                    stack.extend(self.children(n).iter().rev());
                }
                Node::Raw(_) => {}
            }
        }
        out
    }

    // ------------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------------

    /// Unlink `id` from its parent. The slot stays allocated but unreachable.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.slots[id].parent.take() {
            self.slots[parent].children.retain(|&c| c != id);
        }
    }

    /// Parse `src` into detached nodes owned by this tree.
    pub fn parse_fragment(&mut self, src: &str) -> Result<Vec<NodeId>, HtmlError> {
        let holder = self.push(None, Node::Root);
        self.build(holder, src)?;
        let nodes = std::mem::take(&mut self.slots[holder].children);
        for &n in &nodes {
            self.slots[n].parent = None;
        }
        Ok(nodes)
    }

    pub fn append(&mut self, parent: NodeId, nodes: &[NodeId]) {
        for &n in nodes {
            self.slots[n].parent = Some(parent);
        }
        self.slots[parent].children.extend_from_slice(nodes);
    }

    /// Insert `nodes` right before `sibling`; appends to the root when
    /// `sibling` is detached.
    pub fn insert_before(&mut self, sibling: NodeId, nodes: &[NodeId]) {
        let Some(parent) = self.parent(sibling) else {
            return self.append(ROOT, nodes);
        };
        let at = self.slots[parent]
            .children
            .iter()
            .position(|&c| c == sibling)
            .unwrap_or(self.slots[parent].children.len());
        for &n in nodes {
            self.slots[n].parent = Some(parent);
        }
        self.slots[parent]
            .children
            .splice(at..at, nodes.iter().copied());
    }

    /// Insert `nodes` right after `sibling`.
    pub fn insert_after(&mut self, sibling: NodeId, nodes: &[NodeId]) {
        let Some(parent) = self.parent(sibling) else {
            return self.append(ROOT, nodes);
        };
        let next = self.slots[parent]
            .children
            .iter()
            .position(|&c| c == sibling)
            .map_or(self.slots[parent].children.len(), |i| i + 1);
        for &n in nodes {
            self.slots[n].parent = Some(parent);
        }
        self.slots[parent]
            .children
            .splice(next..next, nodes.iter().copied());
    }

    // ------------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------------

    pub fn to_html(&self) -> String {
        self.html_of(ROOT)
    }

    /// Serialize `id` and everything below it.
    pub fn html_of(&self, id: NodeId) -> String {
        enum Visit {
            Enter(NodeId),
            Exit(NodeId),
        }

        let mut out = String::new();
        let mut stack = vec![Visit::Enter(id)];
        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(n) => {
                    match &self.slots[n].node {
                        Node::Root => {}
                        Node::Element(e) => out.push_str(&e.start_tag),
                        Node::Text(t) | Node::Raw(t) => out.push_str(t),
                    }
                    stack.push(Visit::Exit(n));
                    stack.extend(self.children(n).iter().rev().map(|&c| Visit::Enter(c)));
                }
                Visit::Exit(n) => {
                    if let Node::Element(e) = &self.slots[n].node
                        && let Some(end) = &e.end_tag
                    {
                        out.push_str(end);
                    }
                }
            }
        }
        out
    }
}

pub struct Descendants<'a> {
    dom: &'a Dom,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.dom.children(id).iter().rev().copied());
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>Guide &amp; Notes</title></head>
<body>
<p>First<p>Second
<ul><li>one<li>two</ul>
<img src="a.png" alt=x>
<script>if (a < b) { document.write("</p>"); }</script>
</body>
</html>
"#;

    #[test]
    fn test_roundtrip_is_lossless() {
        let dom = Dom::parse(PAGE).unwrap();
        assert_eq!(dom.to_html(), PAGE);
    }

    #[test]
    fn test_implied_paragraph_close() {
        let dom = Dom::parse(PAGE).unwrap();
        let body = dom.find(ROOT, |e| e.is("body")).unwrap();
        let paragraphs: Vec<_> = dom
            .children(body)
            .iter()
            .filter(|&&n| dom.element(n).is_some_and(|e| e.is("p")))
            .collect();
        assert_eq!(paragraphs.len(), 2);
    }

    #[test]
    fn test_list_items_are_siblings() {
        let dom = Dom::parse(PAGE).unwrap();
        let ul = dom.find(ROOT, |e| e.is("ul")).unwrap();
        assert_eq!(dom.children(ul).len(), 2);
    }

    #[test]
    fn test_void_elements_do_not_nest() {
        let dom = Dom::parse(r#"<div><img src="x"><p>after</p></div>"#).unwrap();
        let img = dom.find(ROOT, |e| e.is("img")).unwrap();
        assert!(dom.children(img).is_empty());
        let p = dom.find(ROOT, |e| e.is("p")).unwrap();
        assert_eq!(dom.element(dom.parent(p).unwrap()).unwrap().name(), "div");
    }

    #[test]
    fn test_stray_end_tag_is_kept() {
        let src = "<div>a</span>b</div>";
        let dom = Dom::parse(src).unwrap();
        assert_eq!(dom.to_html(), src);
    }

    #[test]
    fn test_attributes() {
        let dom = Dom::parse(r#"<a HREF="x?a=1&amp;b=2" class="one  two" hidden>t</a>"#).unwrap();
        let a = dom.element(dom.find(ROOT, |e| e.is("a")).unwrap()).unwrap();
        assert_eq!(a.attr("href").as_deref(), Some("x?a=1&b=2"));
        assert_eq!(a.classes(), vec!["one", "two"]);
        assert!(a.has_class("two"));
        assert_eq!(a.attr("hidden").as_deref(), Some(""));
        assert_eq!(a.attr("missing"), None);
    }

    #[test]
    fn test_self_closing_attributes() {
        let dom = Dom::parse(r#"<meta name="x" content="y"/>"#).unwrap();
        let meta = dom.element(dom.find(ROOT, |e| e.is("meta")).unwrap()).unwrap();
        assert_eq!(meta.attr("content").as_deref(), Some("y"));
    }

    #[test]
    fn test_text_content_skips_script() {
        let dom = Dom::parse(PAGE).unwrap();
        let body = dom.find(ROOT, |e| e.is("body")).unwrap();
        let text = dom.text_content(body, |_| false);
        assert!(text.contains("First"));
        assert!(!text.contains("document.write"));

        let title = dom.find(ROOT, |e| e.is("title")).unwrap();
        assert_eq!(dom.text_content(title, |_| false), "Guide & Notes");
    }

    #[test]
    fn test_text_content_skip_predicate() {
        let dom = Dom::parse(r#"<h2>Title<a class="headerlink">¶</a></h2>"#).unwrap();
        let h2 = dom.find(ROOT, |e| e.is("h2")).unwrap();
        assert_eq!(dom.text_content(h2, |e| e.has_class("headerlink")), "Title");
    }

    #[test]
    fn test_fragment_splice_and_detach() {
        let src = "<head><title>t</title></head>";
        let mut dom = Dom::parse(src).unwrap();
        let head = dom.find(ROOT, |e| e.is("head")).unwrap();
        let title = dom.find(ROOT, |e| e.is("title")).unwrap();

        let nodes = dom.parse_fragment(r#"<meta name="a" content="b"/>"#).unwrap();
        dom.append(head, &nodes);
        assert_eq!(
            dom.to_html(),
            r#"<head><title>t</title><meta name="a" content="b"/></head>"#
        );

        let before = dom.parse_fragment("<!-- x -->").unwrap();
        dom.insert_before(title, &before);
        assert_eq!(
            dom.to_html(),
            r#"<head><!-- x --><title>t</title><meta name="a" content="b"/></head>"#
        );

        for n in nodes.iter().chain(&before) {
            dom.detach(*n);
        }
        assert_eq!(dom.to_html(), src);
    }

    #[test]
    fn test_heading_level() {
        let dom = Dom::parse("<h3>x</h3><hr>").unwrap();
        let h3 = dom.element(dom.find(ROOT, |e| e.is("h3")).unwrap()).unwrap();
        assert_eq!(h3.heading_level(), Some(3));
        let hr = dom.element(dom.find(ROOT, |e| e.is("hr")).unwrap()).unwrap();
        assert_eq!(hr.heading_level(), None);
    }

    #[test]
    fn test_bare_less_than_does_not_swallow_siblings() {
        let src = "<div><p>a < b</p><p>next</p></div>";
        let dom = Dom::parse(src).unwrap();
        let div = dom.find(ROOT, |e| e.is("div")).unwrap();
        assert_eq!(dom.children(div).len(), 2);
        assert_eq!(dom.text_content(div, |_| false), "a < bnext");
        assert_eq!(dom.to_html(), src);
    }

    #[test]
    fn test_unterminated_tag_is_an_error() {
        assert!(Dom::parse("<p>text <a href=\"x\"").is_err());
    }
}
