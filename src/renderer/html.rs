//! HTML tree builder
//!
//! A single left-to-right scan over the markup that keeps a stack of open
//! elements. Malformed input never fails: implicit `html`/`head`/`body`
//! insertion, unnestable tags and misnested formatting tags are recovered in
//! place, and the result always has an `html` root with `head` and `body`.

use super::dom::{Attributes, Document, ElementData, NodeId, NodeType};
use super::MAX_TREE_DEPTH;

/// Formatting tags that get closed and reopened around a misnested closer
pub const TEXT_FORMATTING_TAGS: &[&str] = &["b", "i", "small", "big"];

/// Tags that close an open sibling of the same name instead of nesting
pub const UNNESTABLE_TAGS: &[&str] = &["p", "li"];

/// Void elements; never pushed onto the open stack
pub const SELF_CLOSING_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Tags that belong in `<head>`
pub const HEAD_TAGS: &[&str] = &[
    "base", "basefont", "bgsound", "noscript", "link", "meta", "title", "style", "script",
];

/// Elements whose content is opaque text up to the matching closer
const RAW_TEXT_TAGS: &[&str] = &["script", "style"];

/// Soft hyphen, decoded from `&shy;`
pub const SOFT_HYPHEN: char = '\u{ad}';

/// HTML tree builder
pub struct HtmlParser {}

impl HtmlParser {
    /// Create a new HTML parser
    pub fn new() -> Self {
        Self {}
    }

    /// Parse markup into a document. Never fails.
    pub fn parse(&self, content: &str) -> Document {
        TreeBuilder::new(content).run()
    }

    /// Parse markup and render the resulting tree as indented source inside a
    /// `<pre>`, with text content in bold
    pub fn parse_source(&self, content: &str) -> Document {
        let parsed = self.parse(content);
        let mut builder = TreeBuilder::new("");
        builder.add_tag("pre");
        builder.source_node(&parsed, parsed.root(), 0);
        builder.add_tag("/pre");
        builder.finish()
    }
}

impl Default for HtmlParser {
    fn default() -> Self {
        Self::new()
    }
}

struct TreeBuilder<'a> {
    input: &'a str,
    document: Document,
    /// Open elements, outermost first
    stack: Vec<NodeId>,
    in_pre: bool,
    depth_warned: bool,
}

impl<'a> TreeBuilder<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            document: Document::new(),
            stack: Vec::new(),
            in_pre: false,
            depth_warned: false,
        }
    }

    fn run(mut self) -> Document {
        let input = self.input;
        let mut text = String::new();
        let mut pos = 0;

        while let Some(c) = input[pos..].chars().next() {
            let rest = &input[pos..];
            if c == '<' {
                self.flush_text(&mut text);
                if let Some(comment) = rest.strip_prefix("<!--") {
                    pos = match comment.find("-->") {
                        Some(end) => pos + 4 + end + 3,
                        None => input.len(),
                    };
                    continue;
                }
                match rest[1..].find('>') {
                    Some(end) => {
                        pos += end + 2;
                        if let Some(raw) = self.add_tag(&rest[1..1 + end]) {
                            pos = self.consume_raw_text(&raw, pos);
                        }
                    }
                    // Unterminated tag: the rest of the input is tag soup
                    None => pos = input.len(),
                }
                continue;
            }
            if !c.is_ascii() && !c.is_alphanumeric() {
                // Pictographs get their own text node
                self.flush_text(&mut text);
                self.add_text(c.to_string());
            } else {
                text.push(c);
            }
            pos += c.len_utf8();
        }
        self.flush_text(&mut text);
        self.finish()
    }

    fn flush_text(&mut self, text: &mut String) {
        if !text.is_empty() {
            let decoded = decode_entities(text);
            self.add_text(decoded);
            text.clear();
        }
    }

    fn current(&self) -> NodeId {
        self.stack.last().copied().unwrap_or(self.document.root())
    }

    fn tag_of(&self, id: NodeId) -> &str {
        self.document.node(id).tag_name().unwrap_or("")
    }

    fn add_text(&mut self, text: String) {
        if text.is_empty() || (!self.in_pre && text.chars().all(char::is_whitespace)) {
            return;
        }
        self.implicit_tags(None);
        let parent = self.current();
        let node = self.document.create_text(text);
        self.document.attach(parent, node);
    }

    /// Handle the inside of `<...>`. Returns the tag name when a raw-text
    /// element was opened.
    fn add_tag(&mut self, tag_text: &str) -> Option<String> {
        let (tag, attributes) = parse_tag(tag_text);
        if tag.is_empty() || tag.starts_with('!') || tag.starts_with('?') {
            return None;
        }
        match tag.as_str() {
            "pre" => self.in_pre = true,
            "/pre" => self.in_pre = false,
            _ => {}
        }
        self.implicit_tags(Some(&tag));
        match tag.strip_prefix('/') {
            Some(name) => {
                self.close_tag(name);
                None
            }
            None => self.open_tag(tag, attributes),
        }
    }

    fn implicit_tags(&mut self, tag: Option<&str>) {
        let is_head_tag = tag.is_some_and(|t| HEAD_TAGS.contains(&t));
        loop {
            let open: Vec<&str> = self.stack.iter().map(|id| self.tag_of(*id)).collect();
            if open.is_empty() && tag != Some("html") {
                self.stack.push(self.document.root());
            } else if open == ["html"] && !matches!(tag, Some("head" | "body" | "/html")) {
                let section = if is_head_tag { "head" } else { "body" };
                self.open_section(section);
            } else if open == ["html", "head"] && tag != Some("/head") && !is_head_tag {
                self.stack.pop();
            } else {
                break;
            }
        }
    }

    /// Push `head` or `body`, reusing an existing one
    fn open_section(&mut self, tag: &str) {
        let root = self.document.root();
        let section = match self.document.find_child_by_tag(root, tag) {
            Some(existing) => existing,
            None => {
                let created = self.document.create_element(tag);
                self.document.attach(root, created);
                created
            }
        };
        self.stack.push(section);
    }

    fn open_tag(&mut self, tag: String, attributes: Attributes) -> Option<String> {
        let root = self.document.root();
        match tag.as_str() {
            "html" => {
                if self.stack.is_empty() {
                    self.merge_attributes(root, attributes);
                    self.stack.push(root);
                }
                return None;
            }
            "head" | "body" => {
                if self.document.find_child_by_tag(root, &tag).is_some() {
                    return None;
                }
                self.open_section(&tag);
                let section = self.current();
                self.merge_attributes(section, attributes);
                return None;
            }
            _ => {}
        }
        if UNNESTABLE_TAGS.contains(&tag.as_str()) {
            self.close_unnestable(&tag);
        }

        let parent = self.current();
        let node = self.document.create_element(&tag);
        self.merge_attributes(node, attributes);
        self.document.attach(parent, node);

        if SELF_CLOSING_TAGS.contains(&tag.as_str()) {
            return None;
        }
        if self.stack.len() >= MAX_TREE_DEPTH {
            if !self.depth_warned {
                log::warn!("markup nests deeper than {MAX_TREE_DEPTH} elements; flattening");
                self.depth_warned = true;
            }
            return None;
        }
        self.stack.push(node);
        RAW_TEXT_TAGS.contains(&tag.as_str()).then_some(tag)
    }

    fn merge_attributes(&mut self, node: NodeId, attributes: Attributes) {
        if let Some(element) = self.document.element_mut(node) {
            for (key, value) in attributes.iter() {
                element.set_attribute(key, value);
            }
        }
    }

    fn close_tag(&mut self, name: &str) {
        if self.stack.len() <= 1 || matches!(name, "html" | "body") {
            return;
        }
        let Some(pos) = self.stack.iter().rposition(|id| self.tag_of(*id) == name) else {
            return;
        };
        if pos == 0 {
            return;
        }
        // Formatting elements opened after a misnested formatting closer are
        // closed with it and reopened right after
        let reopen: Vec<ElementData> = if TEXT_FORMATTING_TAGS.contains(&name) {
            self.stack[pos + 1..]
                .iter()
                .filter_map(|id| self.document.element(*id))
                .filter(|e| TEXT_FORMATTING_TAGS.contains(&e.tag_name.as_str()))
                .cloned()
                .collect()
        } else {
            Vec::new()
        };
        self.stack.truncate(pos);
        for element in reopen {
            self.open_tag(element.tag_name, element.attributes);
        }
    }

    /// Close an open `tag` if only formatting elements sit above it
    fn close_unnestable(&mut self, tag: &str) {
        for i in (1..self.stack.len()).rev() {
            let open = self.tag_of(self.stack[i]);
            if open == tag {
                self.stack.truncate(i);
                return;
            }
            if !TEXT_FORMATTING_TAGS.contains(&open) {
                return;
            }
        }
    }

    /// Consume raw text up to `</tag`, returning the position after its `>`
    fn consume_raw_text(&mut self, tag: &str, start: usize) -> usize {
        let input = self.input;
        let rest = &input[start..];
        let closing = format!("</{tag}");
        let (content, next) = match rest.to_ascii_lowercase().find(&closing) {
            Some(idx) => {
                let after = rest[idx..]
                    .find('>')
                    .map(|end| start + idx + end + 1)
                    .unwrap_or(input.len());
                (&rest[..idx], after)
            }
            None => (rest, input.len()),
        };
        if !content.trim().is_empty() {
            let parent = self.current();
            let node = self.document.create_text(content);
            self.document.attach(parent, node);
        }
        self.close_tag(tag);
        next
    }

    fn finish(mut self) -> Document {
        if self.stack.is_empty() {
            self.implicit_tags(None);
        }
        self.stack.clear();

        let root = self.document.root();
        if self.document.head().is_none() {
            let head = self.document.create_element("head");
            self.document.insert_child(root, 0, head);
        }
        if self.document.body().is_none() {
            let body = self.document.create_element("body");
            self.document.attach(root, body);
        }
        self.document
    }

    fn source_node(&mut self, parsed: &Document, id: NodeId, indent: usize) {
        let pad = " ".repeat(indent);
        let node = parsed.node(id);
        match &node.node_type {
            NodeType::Element(element) => {
                self.add_text(format!("{pad}{}\n", element_source(element)));
            }
            NodeType::Text(text) => {
                self.add_tag("b");
                let lines: String = text
                    .split('\n')
                    .map(|line| format!("{pad}{}\n", line.trim()))
                    .collect();
                self.add_text(lines);
                self.add_tag("/b");
            }
        }
        for child in &node.children {
            self.source_node(parsed, *child, indent + 1);
        }
        if let NodeType::Element(element) = &node.node_type {
            if !SELF_CLOSING_TAGS.contains(&element.tag_name.as_str()) {
                self.add_text(format!("{pad}</{}>\n", element.tag_name));
            }
        }
    }
}

/// Split `<...>` contents into a lowercase tag name and its attributes
fn parse_tag(text: &str) -> (String, Attributes) {
    let text = text.trim();
    let text = text.strip_suffix('/').unwrap_or(text).trim_end();
    let (tag, attr_str) = match text.find(char::is_whitespace) {
        Some(i) => (&text[..i], &text[i..]),
        None => (text, ""),
    };
    (tag.to_ascii_lowercase(), parse_attributes(attr_str))
}

fn parse_attributes(attr_str: &str) -> Attributes {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut buffer = String::new();
    for c in attr_str.chars() {
        match quote {
            None if c == '"' || c == '\'' => quote = Some(c),
            Some(q) if c == q => {
                parts.push(std::mem::take(&mut buffer));
                quote = None;
            }
            None if c.is_whitespace() => parts.push(std::mem::take(&mut buffer)),
            _ => buffer.push(c),
        }
    }
    if !buffer.is_empty() {
        parts.push(buffer);
    }

    let mut attributes = Attributes::new();
    for part in parts.into_iter().filter(|p| !p.is_empty()) {
        match part.split_once('=') {
            Some((key, value)) => attributes.set(key.trim(), value),
            None => attributes.set(part, ""),
        }
    }
    attributes
}

/// Decode the character references this engine understands
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        rest = &rest[idx..];
        let decoded = rest
            .find(';')
            .filter(|end| *end <= 10)
            .and_then(|end| decode_entity(&rest[1..end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "amp" => Some('&'),
        "shy" => Some(SOFT_HYPHEN),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let number = name.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Start-tag rendering of an element, as shown by view-source
fn element_source(element: &ElementData) -> String {
    let mut out = format!("<{}", element.tag_name);
    for (key, value) in element.attributes.iter() {
        if value.is_empty() {
            out.push_str(&format!(" {key}"));
        } else {
            let q = if value.contains('"') { '\'' } else { '"' };
            out.push_str(&format!(" {key}={q}{value}{q}"));
        }
    }
    out.push('>');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Compact dump of the element/text structure for assertions
    fn outline(doc: &Document, id: NodeId) -> String {
        let node = doc.node(id);
        match &node.node_type {
            NodeType::Text(text) => format!("{text:?}"),
            NodeType::Element(element) => {
                let children: Vec<String> = node.children.iter().map(|c| outline(doc, *c)).collect();
                if children.is_empty() {
                    element.tag_name.clone()
                } else {
                    format!("{}({})", element.tag_name, children.join(" "))
                }
            }
        }
    }

    fn parse(markup: &str) -> String {
        let doc = HtmlParser::new().parse(markup);
        outline(&doc, doc.root())
    }

    #[test]
    fn test_parse_empty_html() {
        assert_eq!(parse(""), "html(head body)");
    }

    #[test]
    fn test_parse_simple_html() {
        assert_eq!(
            parse("<html><body>Hello</body></html>"),
            r#"html(head body("Hello"))"#
        );
    }

    #[test]
    fn test_implicit_head_and_body() {
        assert_eq!(
            parse("<title>T</title><p>x</p>"),
            r#"html(head(title("T")) body(p("x")))"#
        );
    }

    #[test]
    fn test_parse_with_attributes() {
        let doc = HtmlParser::new().parse(r#"<div id="main" class='a b' hidden data-x=1>C</div>"#);
        let div = doc.query_selector("div").unwrap().unwrap();
        let element = doc.element(div).unwrap();
        assert_eq!(element.id(), Some("main"));
        assert_eq!(element.classes(), vec!["a", "b"]);
        assert_eq!(element.get_attribute("hidden"), Some(""));
        assert_eq!(element.get_attribute("data-x"), Some("1"));
    }

    #[test]
    fn test_uppercase_tags_are_folded() {
        assert_eq!(parse("<DIV CLASS=x>a</DIV>"), r#"html(head body(div("a")))"#);
    }

    #[test]
    fn test_whitespace_runs_dropped_outside_pre() {
        assert_eq!(
            parse("<div>  </div><pre>  </pre>"),
            r#"html(head body(div pre("  ")))"#
        );
    }

    #[test]
    fn test_comments_and_doctype_discarded() {
        assert_eq!(
            parse("<!DOCTYPE html><!-- <p>no</p> --><p>yes</p>"),
            r#"html(head body(p("yes")))"#
        );
    }

    #[test]
    fn test_self_closing_tags() {
        assert_eq!(
            parse("<p>a<br>b<img src=x.png/>c</p>"),
            r#"html(head body(p("a" br "b" img "c")))"#
        );
    }

    #[test]
    fn test_unnestable_paragraphs() {
        assert_eq!(parse("<p>a<p>b"), r#"html(head body(p("a") p("b")))"#);
        assert_eq!(
            parse("<ul><li>a<li>b</ul>"),
            r#"html(head body(ul(li("a") li("b"))))"#
        );
        assert_eq!(
            parse("<p><b>a<p>b"),
            r#"html(head body(p(b("a")) p("b")))"#
        );
    }

    #[test]
    fn test_nested_lists_keep_outer_item_open() {
        assert_eq!(
            parse("<ul><li>a<ul><li>b</ul></ul>"),
            r#"html(head body(ul(li("a" ul(li("b"))))))"#
        );
    }

    #[test]
    fn test_misnested_formatting_tags() {
        assert_eq!(
            parse("<b>1<i>2</b>3</i>"),
            r#"html(head body(b("1" i("2")) i("3")))"#
        );
    }

    #[test]
    fn test_unmatched_closers_ignored() {
        assert_eq!(parse("</div>a</span>"), r#"html(head body("a"))"#);
        assert_eq!(
            parse("<body>a</body>b</html>c"),
            r#"html(head body("a" "b" "c"))"#
        );
    }

    #[test]
    fn test_script_is_opaque() {
        let doc = HtmlParser::new().parse("<script>if (a < b) { x = '<p>'; }</script><p>t</p>");
        let script = doc.query_selector("script").unwrap().unwrap();
        assert_eq!(doc.text_content(script), "if (a < b) { x = '<p>'; }");
        assert_eq!(doc.query_selector_all("p").unwrap().len(), 1);
    }

    #[test]
    fn test_style_is_opaque() {
        let doc = HtmlParser::new().parse("<style>a > b { color: red }</style>");
        let style = doc.query_selector("style").unwrap().unwrap();
        assert_eq!(doc.text_content(style), "a > b { color: red }");
        assert_eq!(doc.parent(style), doc.head());
    }

    #[test]
    fn test_entities_decoded() {
        assert_eq!(
            decode_entities("a &lt;b&gt; &amp;amp; &quot;q&quot; &#65;&#x42; &bogus; &"),
            "a <b> &amp; \"q\" AB &bogus; &"
        );
        assert_eq!(decode_entities("hy&shy;phen"), "hy\u{ad}phen");
    }

    #[test]
    fn test_pictographs_split() {
        assert_eq!(parse("<p>hi😀there</p>"), r#"html(head body(p("hi" "😀" "there")))"#);
        assert_eq!(parse("<p>café</p>"), r#"html(head body(p("café")))"#);
    }

    #[test]
    fn test_unterminated_tag() {
        assert_eq!(parse("<p>text<div"), r#"html(head body(p("text")))"#);
    }

    #[test]
    fn test_depth_is_bounded() {
        let markup = "<div>".repeat(MAX_TREE_DEPTH * 2) + "x";
        let doc = HtmlParser::new().parse(&markup);
        let deepest = doc
            .descendants(doc.root())
            .into_iter()
            .map(|n| doc.depth(n))
            .max()
            .unwrap();
        assert!(deepest <= MAX_TREE_DEPTH + 1);
    }

    #[test]
    fn test_parse_source() {
        let doc = HtmlParser::new().parse_source("<p class=x>hi</p>");
        let pre = doc.query_selector("pre").unwrap().unwrap();
        let text = doc.text_content(pre);
        assert!(text.contains("<p class=\"x\">"));
        assert!(text.contains("</p>"));
        assert!(doc.query_selector("pre b").unwrap().is_some());
    }
}
