//! Style computation and cascade
//!
//! Each node's style is rebuilt from scratch: inherited properties from the
//! parent, matching rules in ascending priority, the inline `style`
//! attribute, shorthand expansion, then relative font sizes.

use super::css::{CssParser, Length, Rule, Stylesheet};
use super::dom::{Document, NodeId};
use super::MAX_TREE_DEPTH;
use std::collections::HashMap;

/// Properties copied from the parent, with their values at the root
pub const INHERITED_PROPERTIES: &[(&str, &str)] = &[
    ("font-size", "16px"),
    ("font-style", "normal"),
    ("font-weight", "normal"),
    ("color", "black"),
    ("font-family", "Arial"),
    ("text-align", "left"),
    ("vertical-align", "baseline"),
    ("font-variant", "normal"),
    ("white-space", "normal"),
];

/// Font size used when no ancestor has a pixel size
pub const DEFAULT_FONT_SIZE_PX: f32 = 16.0;

const USER_AGENT_CSS: &str = include_str!("user_agent.css");

/// Computed styles for a node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComputedStyle {
    properties: HashMap<String, String>,
}

impl ComputedStyle {
    /// Get a property value
    pub fn get(&self, property: &str) -> Option<&str> {
        self.properties.get(property).map(String::as_str)
    }

    /// Get a property value or a default
    pub fn get_or<'a>(&'a self, property: &str, default: &'a str) -> &'a str {
        self.get(property).unwrap_or(default)
    }

    /// Set a property value
    pub fn set(&mut self, property: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(property.into(), value.into());
    }

    pub fn remove(&mut self, property: &str) -> Option<String> {
        self.properties.remove(property)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Value of a property given in absolute pixels
    pub fn px(&self, property: &str) -> Option<f32> {
        match self.get(property).and_then(Length::parse) {
            Some(Length::Px(px)) => Some(px),
            _ => None,
        }
    }

    /// Resolved font size in pixels
    pub fn font_size_px(&self) -> Option<f32> {
        self.px("font-size")
    }
}

/// One positional slot of a shorthand property
struct ShorthandSlot {
    longhand: &'static str,
    /// Accepted keywords; empty accepts anything
    literals: &'static [&'static str],
    required: bool,
}

const fn slot(
    longhand: &'static str,
    literals: &'static [&'static str],
    required: bool,
) -> ShorthandSlot {
    ShorthandSlot {
        longhand,
        literals,
        required,
    }
}

const FONT_SLOTS: &[ShorthandSlot] = &[
    slot("font-style", &["normal", "italic", "oblique"], false),
    slot("font-variant", &["normal", "small-caps"], false),
    slot(
        "font-weight",
        &[
            "normal", "bold", "bolder", "lighter", "100", "200", "300", "400", "500", "600", "700",
            "800", "900",
        ],
        false,
    ),
    slot("font-size", &[], true),
    slot("font-family", &[], true),
];

const BACKGROUND_SLOTS: &[ShorthandSlot] = &[slot("background-color", &[], true)];

const SHORTHANDS: &[(&str, &[ShorthandSlot])] = &[("font", FONT_SLOTS), ("background", BACKGROUND_SLOTS)];

/// Split a shorthand value over its slots. The last slot absorbs the rest.
fn expand_shorthand(slots: &[ShorthandSlot], value: &str) -> Option<Vec<(&'static str, String)>> {
    let tokens: Vec<&str> = value.split_whitespace().collect();
    let mut expanded = Vec::new();
    let mut next = 0;
    for (index, slot) in slots.iter().enumerate() {
        let Some(token) = tokens.get(next) else {
            if slot.required {
                return None;
            }
            continue;
        };
        if index == slots.len() - 1 {
            expanded.push((slot.longhand, tokens[next..].join(" ")));
            next = tokens.len();
        } else if slot.literals.is_empty() || slot.literals.contains(&token.to_ascii_lowercase().as_str()) {
            expanded.push((slot.longhand, token.to_string()));
            next += 1;
        } else if slot.required {
            return None;
        }
    }
    (next == tokens.len()).then_some(expanded)
}

fn expand_shorthands(style: &mut ComputedStyle) {
    for (name, slots) in SHORTHANDS {
        let Some(value) = style.remove(name) else {
            continue;
        };
        match expand_shorthand(slots, &value) {
            Some(longhands) => {
                for (longhand, value) in longhands {
                    let value = match longhand {
                        // `12px/1.5`: line height is not supported
                        "font-size" => value.split('/').next().unwrap_or_default().to_string(),
                        _ => value,
                    };
                    style.set(longhand, value);
                }
            }
            None => log::trace!("ignoring unparseable {name} shorthand {value:?}"),
        }
    }
}

/// Resolve `%` and `em` font sizes against the parent's pixel size
fn resolve_font_size(style: &mut ComputedStyle, parent: Option<&ComputedStyle>) {
    let parent_px = parent
        .and_then(ComputedStyle::font_size_px)
        .unwrap_or(DEFAULT_FONT_SIZE_PX);
    let Some(value) = style.get("font-size").map(str::to_string) else {
        return;
    };
    match Length::parse(&value) {
        Some(length) => {
            let px = length.to_px(parent_px);
            style.set("font-size", format!("{px}px"));
        }
        None => log::trace!("unresolvable font-size {value:?}"),
    }
}

/// Style engine for computing styles
pub struct StyleEngine {
    user_agent_stylesheet: Stylesheet,
    css_parser: CssParser,
}

impl StyleEngine {
    /// Create a new style engine with the built-in user-agent sheet
    pub fn new() -> Self {
        let css_parser = CssParser::new();
        Self {
            user_agent_stylesheet: css_parser.parse(USER_AGENT_CSS),
            css_parser,
        }
    }

    /// The sheet cascaded before every author sheet
    pub fn user_agent_stylesheet(&self) -> &Stylesheet {
        &self.user_agent_stylesheet
    }

    /// Recompute every node's style. Author sheets come after the
    /// user-agent sheet in source order.
    pub fn compute_styles(&self, document: &mut Document, stylesheets: &[Stylesheet]) {
        let mut rules: Vec<&Rule> = self
            .user_agent_stylesheet
            .rules
            .iter()
            .chain(stylesheets.iter().flat_map(|sheet| sheet.rules.iter()))
            .collect();
        rules.sort_by_key(|rule| rule.priority);

        for index in 0..document.len() {
            document.node_mut(NodeId::from_index(index)).style = ComputedStyle::default();
        }
        let root = document.root();
        self.style_node(document, root, &rules, 0);
    }

    fn style_node(&self, document: &mut Document, id: NodeId, rules: &[&Rule], depth: usize) {
        let style = self.compute_node_style(document, id, rules);
        document.node_mut(id).style = style;
        if depth >= MAX_TREE_DEPTH {
            return;
        }
        for child in document.children(id).to_vec() {
            self.style_node(document, child, rules, depth + 1);
        }
    }

    /// Compute style for a single node whose parent is already styled
    fn compute_node_style(&self, document: &Document, id: NodeId, rules: &[&Rule]) -> ComputedStyle {
        let node = document.node(id);
        let parent = node.parent.map(|p| &document.node(p).style);

        let mut style = ComputedStyle::default();
        for (property, default) in INHERITED_PROPERTIES {
            let value = parent.and_then(|p| p.get(property)).unwrap_or(*default);
            style.set(*property, value);
        }

        if let Some(element) = node.as_element() {
            for rule in rules.iter().filter(|rule| rule.selector.matches(document, id)) {
                for declaration in &rule.declarations {
                    style.set(declaration.property.as_str(), declaration.value.as_str());
                }
            }
            if let Some(inline) = element.get_attribute("style") {
                for declaration in self.css_parser.parse_declarations(inline) {
                    style.set(declaration.property, declaration.value);
                }
            }
        }

        expand_shorthands(&mut style);
        resolve_font_size(&mut style, parent);
        style
    }
}

impl Default for StyleEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::html::HtmlParser;
    use pretty_assertions::assert_eq;

    fn styled(markup: &str, css: &str) -> Document {
        let mut doc = HtmlParser::new().parse(markup);
        let sheet = CssParser::new().parse(css);
        StyleEngine::new().compute_styles(&mut doc, &[sheet]);
        doc
    }

    fn style_of<'a>(doc: &'a Document, selector: &str) -> &'a ComputedStyle {
        let id = doc.query_selector(selector).unwrap().unwrap();
        &doc.node(id).style
    }

    #[test]
    fn test_root_gets_defaults() {
        let doc = styled("", "");
        let style = &doc.node(doc.root()).style;
        for (property, default) in INHERITED_PROPERTIES {
            assert_eq!(style.get(property), Some(*default));
        }
    }

    #[test]
    fn test_inheritance_reaches_text() {
        let doc = styled("<div><span>hi</span></div>", "div { color: blue; width: 10px }");
        let span = doc.query_selector("span").unwrap().unwrap();
        let text = doc.children(span)[0];
        assert_eq!(doc.node(span).style.get("color"), Some("blue"));
        assert_eq!(doc.node(text).style.get("color"), Some("blue"));
        assert_eq!(doc.node(span).style.get("width"), None);
    }

    #[test]
    fn test_specificity_ordering() {
        let doc = styled(
            r#"<p id="y" class="x">t</p>"#,
            "#y { color: green } .x { color: blue } p { color: red }",
        );
        assert_eq!(style_of(&doc, "p").get("color"), Some("green"));
    }

    #[test]
    fn test_source_order_breaks_ties() {
        let doc = styled("<p>t</p>", "p { color: red } p { color: blue }");
        assert_eq!(style_of(&doc, "p").get("color"), Some("blue"));
    }

    #[test]
    fn test_important_beats_id() {
        let doc = styled(
            r#"<p id="y">t</p>"#,
            "p { color: red !important } #y { color: green }",
        );
        assert_eq!(style_of(&doc, "p").get("color"), Some("red"));
    }

    #[test]
    fn test_inline_style_applied_last() {
        let doc = styled(
            r#"<p id="y" style="color: purple; font-weight: bold">t</p>"#,
            "#y { color: green !important }",
        );
        let style = style_of(&doc, "p");
        assert_eq!(style.get("color"), Some("purple"));
        assert_eq!(style.get("font-weight"), Some("bold"));
    }

    #[test]
    fn test_percentage_and_em_font_size() {
        let doc = styled(
            r#"<div><p>a<span>b</span></p></div>"#,
            "div { font-size: 20px } p { font-size: 150% } span { font-size: 0.5em }",
        );
        assert_eq!(style_of(&doc, "p").get("font-size"), Some("30px"));
        assert_eq!(style_of(&doc, "span").get("font-size"), Some("15px"));
    }

    #[test]
    fn test_percentage_at_root_uses_default() {
        let doc = styled("", "html { font-size: 50% }");
        assert_eq!(doc.node(doc.root()).style.get("font-size"), Some("8px"));
    }

    #[test]
    fn test_font_shorthand() {
        let doc = styled(
            "<p>t</p>",
            "p { font: italic bold 12px/1.5 Times New Roman }",
        );
        let style = style_of(&doc, "p");
        assert_eq!(style.get("font"), None);
        assert_eq!(style.get("font-style"), Some("italic"));
        assert_eq!(style.get("font-variant"), Some("normal"));
        assert_eq!(style.get("font-weight"), Some("bold"));
        assert_eq!(style.get("font-size"), Some("12px"));
        assert_eq!(style.get("font-family"), Some("Times New Roman"));
    }

    #[test]
    fn test_font_shorthand_without_size_is_dropped() {
        let doc = styled("<p>t</p>", "p { font: bold }");
        let style = style_of(&doc, "p");
        assert_eq!(style.get("font"), None);
        assert_eq!(style.get("font-weight"), Some("normal"));
    }

    #[test]
    fn test_background_shorthand() {
        let doc = styled("<div>t</div>", "div { background: red }");
        assert_eq!(style_of(&doc, "div").get("background-color"), Some("red"));
    }

    #[test]
    fn test_user_agent_sheet() {
        let doc = styled("<title>x</title><b>y</b>", "");
        assert_eq!(style_of(&doc, "head").get("display"), Some("none"));
        assert_eq!(style_of(&doc, "body").get("display"), Some("block"));
        assert_eq!(style_of(&doc, "b").get("font-weight"), Some("bold"));
    }

    #[test]
    fn test_cascade_is_deterministic() {
        let markup = r#"<div class="a"><p id="b" style="color: red">x <i>y</i></p></div>"#;
        let css = ".a p { font-size: 120% } #b { color: blue } i { font: italic 10px serif }";
        let first = styled(markup, css);
        let second = styled(markup, css);
        for id in first.descendants(first.root()) {
            assert_eq!(first.node(id).style, second.node(id).style);
        }
    }

    #[test]
    fn test_restyle_clears_stale_properties() {
        let mut doc = styled("<p>t</p>", "p { width: 10px }");
        StyleEngine::new().compute_styles(&mut doc, &[]);
        assert_eq!(style_of(&doc, "p").get("width"), None);
    }
}
