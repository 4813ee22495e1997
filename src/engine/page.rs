//! Page representation
//!
//! A page owns its document, the author style sheets, the font cache and the
//! results of the last render. Every mutation goes through [`Page::mutate`]
//! or an interaction entry point, which re-run the whole pipeline.

use crate::compositor::{self, DrawCommand, Frame, Painter};
use crate::renderer::layout::InputType;
use crate::renderer::{
    Document, FontBackend, FontCache, LayoutId, LayoutTree, NodeId, Rect, Renderer, Stylesheet, Viewport,
};
use crate::utils::{QuireError, RenderError, Result};
use std::rc::Rc;
use url::Url;

/// Width of the scrollbar thumb
pub const SCROLLBAR_WIDTH: i32 = 8;

/// What a click resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Nothing interactive under the point
    Nothing,
    /// A link was followed; loading it is up to the caller
    Navigate(Url),
    /// A text or password input received focus
    Focused(NodeId),
    /// A checkbox changed state
    Toggled { node: NodeId, checked: bool },
    /// A button was pressed
    Pressed(NodeId),
}

/// A loaded, rendered web page
pub struct Page {
    /// The page URL, absent for markup loaded without one
    url: Option<Url>,
    /// The DOM document
    document: Document,
    /// Sheets added by the embedder, cascaded after `<style>` elements
    stylesheets: Vec<Stylesheet>,
    renderer: Renderer,
    painter: Painter,
    fonts: FontCache,
    layout: Option<LayoutTree>,
    display_list: Vec<DrawCommand>,
    scroll: i32,
    focus: Option<NodeId>,
}

impl Page {
    /// Create an empty page measuring text with the approximate backend
    pub fn new(viewport: Viewport) -> Self {
        Self::with_fonts(viewport, FontCache::approximate())
    }

    /// Create an empty page measuring text with `backend`
    pub fn with_backend(viewport: Viewport, backend: Rc<dyn FontBackend>) -> Self {
        Self::with_fonts(viewport, FontCache::new(backend))
    }

    fn with_fonts(viewport: Viewport, fonts: FontCache) -> Self {
        Self {
            url: None,
            document: Document::new(),
            stylesheets: Vec::new(),
            renderer: Renderer::new(viewport),
            painter: Painter::new(viewport),
            fonts,
            layout: None,
            display_list: Vec::new(),
            scroll: 0,
            focus: None,
        }
    }

    /// Load markup fetched from `url` and render it
    pub fn load(&mut self, url: &str, html: &str) -> Result<()> {
        let url = Url::parse(url)?;
        log::debug!("loading {url}");
        self.url = Some(url);
        self.replace_document(html);
        Ok(())
    }

    /// Load markup that has no URL and render it
    pub fn load_html(&mut self, html: &str) {
        self.url = None;
        self.replace_document(html);
    }

    fn replace_document(&mut self, html: &str) {
        self.document = self.renderer.parse_html(html);
        self.stylesheets.clear();
        self.scroll = 0;
        self.focus = None;
        self.render();
    }

    /// Get the page URL
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Get the DOM document
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn viewport(&self) -> &Viewport {
        self.renderer.viewport()
    }

    pub fn fonts(&self) -> &FontCache {
        &self.fonts
    }

    /// Resolve a possibly relative URL against the page URL
    pub fn resolve_url(&self, href: &str) -> Option<Url> {
        match &self.url {
            Some(base) => base.join(href).ok(),
            None => Url::parse(href).ok(),
        }
    }

    /// `<link rel="stylesheet">` targets for the embedder to fetch
    pub fn stylesheet_links(&self) -> Vec<Url> {
        let links = self.document.query_selector_all("link").unwrap_or_default();
        links
            .into_iter()
            .filter_map(|link| {
                let element = self.document.element(link)?;
                let rel = element.get_attribute("rel")?;
                if !rel.eq_ignore_ascii_case("stylesheet") {
                    return None;
                }
                let href = element.get_attribute("href")?;
                let resolved = self.resolve_url(href);
                if resolved.is_none() {
                    log::debug!("unresolvable stylesheet link {href:?}");
                }
                resolved
            })
            .collect()
    }

    /// Cascade a fetched style sheet after the page's own and re-render
    pub fn add_stylesheet(&mut self, css: &str) {
        let sheet = self.renderer.parse_css(css);
        self.stylesheets.push(sheet);
        self.render();
    }

    /// Restyle, lay out and paint the whole document
    pub fn render(&mut self) {
        let mut sheets: Vec<Stylesheet> = self
            .document
            .query_selector_all("style")
            .unwrap_or_default()
            .into_iter()
            .map(|style| self.renderer.parse_css(&self.document.text_content(style)))
            .collect();
        sheets.extend(self.stylesheets.iter().cloned());

        self.renderer.compute_styles(&mut self.document, &sheets);
        let tree = self.renderer.layout(&self.document, &self.fonts);
        self.display_list = self.painter.paint(&tree, &self.document, &self.fonts);
        log::debug!(
            "rendered {} nodes into {} boxes and {} draw commands",
            self.document.len(),
            tree.len(),
            self.display_list.len()
        );
        self.layout = Some(tree);
        self.scroll = self.scroll.clamp(0, self.max_scroll());
    }

    /// Run a batch of DOM changes, then re-render
    pub fn mutate<T, E>(&mut self, change: impl FnOnce(&mut Document) -> std::result::Result<T, E>) -> Result<T>
    where
        E: Into<QuireError>,
    {
        let result = change(&mut self.document);
        self.render();
        result.map_err(Into::into)
    }

    /// Change the viewport and re-render
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.renderer.set_viewport(viewport);
        self.painter.set_viewport(viewport);
        if self.layout.is_some() {
            self.render();
        }
    }

    pub fn layout_tree(&self) -> Result<&LayoutTree> {
        self.layout
            .as_ref()
            .ok_or_else(|| RenderError::LayoutNotComputed.into())
    }

    pub fn display_list(&self) -> Result<&[DrawCommand]> {
        self.layout_tree()?;
        Ok(&self.display_list)
    }

    /// Deepest box under a point in document coordinates
    pub fn hit_test(&self, x: i32, y: i32) -> Result<Option<LayoutId>> {
        let tree = self.layout_tree()?;
        Ok(compositor::hit_test(&self.display_list, tree, x, y))
    }

    /// Node under a point in document coordinates
    pub fn node_at(&self, x: i32, y: i32) -> Result<Option<NodeId>> {
        let tree = self.layout_tree()?;
        Ok(self.hit_test(x, y)?.and_then(|id| tree.node_of(id)))
    }

    /// Bounds of a node's boxes in document coordinates
    pub fn node_rect(&self, node: NodeId) -> Result<Option<Rect>> {
        Ok(self.layout_tree()?.node_rect(&self.document, node))
    }

    /// Replay the display list on a software canvas at the current scroll
    pub fn rasterize(&self) -> Result<Frame> {
        let commands = self.display_list()?;
        Ok(compositor::rasterize(commands, self.viewport(), self.scroll))
    }

    /// Handle a click at a point in viewport coordinates
    pub fn click(&mut self, x: i32, y: i32) -> Result<ClickOutcome> {
        let target = self.node_at(x, y.saturating_add(self.scroll))?;
        self.blur();

        let outcome = std::iter::successors(target, |n| self.document.parent(*n))
            .find_map(|node| self.activation(node))
            .unwrap_or(ClickOutcome::Nothing);
        match &outcome {
            ClickOutcome::Focused(node) => {
                if let Some(element) = self.document.element_mut(*node) {
                    element.is_focused = true;
                    self.focus = Some(*node);
                }
            }
            ClickOutcome::Toggled { node, checked } => {
                if let Some(element) = self.document.element_mut(*node) {
                    if *checked {
                        element.set_attribute("checked", "");
                    } else {
                        element.attributes.remove("checked");
                    }
                }
            }
            _ => {}
        }
        self.render();
        Ok(outcome)
    }

    /// What clicking directly on `node` does, if anything
    fn activation(&self, node: NodeId) -> Option<ClickOutcome> {
        let element = self.document.element(node)?;
        match element.tag_name.as_str() {
            "a" => element
                .get_attribute("href")
                .and_then(|href| self.resolve_url(href))
                .map(ClickOutcome::Navigate),
            "button" => Some(ClickOutcome::Pressed(node)),
            "input" => match InputType::from_element(element) {
                InputType::Text | InputType::Password => Some(ClickOutcome::Focused(node)),
                InputType::Checkbox => Some(ClickOutcome::Toggled {
                    node,
                    checked: !element.attributes.contains("checked"),
                }),
                InputType::Button => Some(ClickOutcome::Pressed(node)),
                InputType::Hidden => None,
            },
            _ => None,
        }
    }

    /// The input currently receiving keystrokes
    pub fn focused(&self) -> Option<NodeId> {
        self.focus
            .filter(|node| self.document.element(*node).is_some_and(|e| e.is_focused))
    }

    fn blur(&mut self) {
        if let Some(node) = self.focus.take() {
            if let Some(element) = self.document.element_mut(node) {
                element.is_focused = false;
            }
        }
    }

    /// Append a character to the focused input's value
    pub fn type_char(&mut self, c: char) -> bool {
        self.edit_value(|value| value.push(c))
    }

    /// Delete the last character of the focused input's value
    pub fn backspace(&mut self) -> bool {
        self.edit_value(|value| {
            value.pop();
        })
    }

    fn edit_value(&mut self, edit: impl FnOnce(&mut String)) -> bool {
        let Some(node) = self.focused() else {
            return false;
        };
        let Some(element) = self.document.element_mut(node) else {
            return false;
        };
        let mut value = element.get_attribute("value").unwrap_or_default().to_string();
        edit(&mut value);
        element.set_attribute("value", value);
        self.render();
        true
    }

    /// Current vertical scroll offset
    pub fn scroll(&self) -> i32 {
        self.scroll
    }

    fn document_height(&self) -> i32 {
        self.layout
            .as_ref()
            .map_or(0, |tree| tree.rect(tree.root()).height.saturating_add(2 * self.viewport().vstep))
    }

    fn max_scroll(&self) -> i32 {
        self.document_height().saturating_sub(self.viewport().height).max(0)
    }

    /// Scroll by `delta` pixels, clamped to the document
    pub fn scroll_by(&mut self, delta: i32) {
        self.scroll = self.scroll.saturating_add(delta).clamp(0, self.max_scroll());
    }

    pub fn scroll_down(&mut self) {
        self.scroll_by(self.viewport().scroll_step);
    }

    pub fn scroll_up(&mut self) {
        self.scroll_by(-self.viewport().scroll_step);
    }

    /// Scrollbar thumb in viewport coordinates, when the document overflows
    pub fn scrollbar(&self) -> Option<Rect> {
        let total = self.document_height();
        let viewport = self.viewport();
        if viewport.height <= 0 || total <= viewport.height {
            return None;
        }
        Some(Rect::new(
            viewport.width - SCROLLBAR_WIDTH,
            (i64::from(self.scroll) * i64::from(viewport.height) / i64::from(total)) as i32,
            SCROLLBAR_WIDTH,
            (i64::from(viewport.height) * i64::from(viewport.height) / i64::from(total)) as i32,
        ))
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(Viewport::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::DrawOp;
    use crate::renderer::LayoutKind;
    use crate::utils::DomError;
    use pretty_assertions::assert_eq;

    fn page(html: &str) -> Page {
        let mut page = Page::default();
        page.load("https://example.org/dir/index.html", html).unwrap();
        page
    }

    fn center(rect: Rect) -> (i32, i32) {
        (rect.x + rect.width / 2, rect.y + rect.height / 2)
    }

    #[test]
    fn test_geometry_before_render_is_an_error() {
        let page = Page::default();
        assert!(matches!(
            page.layout_tree(),
            Err(QuireError::Render(RenderError::LayoutNotComputed))
        ));
        assert!(page.display_list().is_err());
        assert!(page.hit_test(0, 0).is_err());
        assert!(page.rasterize().is_err());
    }

    #[test]
    fn test_bad_url_is_rejected() {
        let mut page = Page::default();
        assert!(matches!(page.load("::", "<p>x</p>"), Err(QuireError::InvalidUrl(_))));
    }

    #[test]
    fn test_style_elements_cascade() {
        let page = page("<style>p { color: green }</style><p>x</p>");
        let p = page.document().query_selector("p").unwrap().unwrap();
        assert_eq!(page.document().node(p).style.get("color"), Some("green"));
    }

    #[test]
    fn test_added_stylesheet_wins_ties() {
        let mut page = page("<style>p { color: green }</style><p>x</p>");
        page.add_stylesheet("p { color: blue }");
        let p = page.document().query_selector("p").unwrap().unwrap();
        assert_eq!(page.document().node(p).style.get("color"), Some("blue"));
    }

    #[test]
    fn test_stylesheet_links_resolved() {
        let page = page(
            "<link rel=stylesheet href=\"../a.css\"><link rel=icon href=b.ico><link rel=StyleSheet href=\"/c.css\">",
        );
        let links: Vec<String> = page.stylesheet_links().iter().map(Url::to_string).collect();
        assert_eq!(links, vec!["https://example.org/a.css", "https://example.org/c.css"]);
    }

    #[test]
    fn test_mutate_rerenders() {
        let mut page = page("<p>one</p>");
        let before = page.display_list().unwrap().len();
        page.mutate(|doc| {
            let body = doc.body().ok_or(DomError::InvalidNode(doc.root()))?;
            let p = doc.create_element("p");
            let text = doc.create_text("two three");
            doc.append_child(p, text)?;
            doc.append_child(body, p)
        })
        .unwrap();
        assert_eq!(page.display_list().unwrap().len(), before + 2);
    }

    #[test]
    fn test_mutate_error_still_renders() {
        let mut page = page("<p>one</p>");
        let result = page.mutate(|doc| {
            let root = doc.root();
            doc.append_child(root, root)
        });
        assert!(matches!(result, Err(QuireError::Dom(_))));
        assert!(page.layout_tree().is_ok());
    }

    #[test]
    fn test_click_link_navigates() {
        let mut page = page("<p><a href=\"next.html\">go</a></p>");
        let a = page.document().query_selector("a").unwrap().unwrap();
        let (x, y) = center(page.node_rect(a).unwrap().unwrap());
        let outcome = page.click(x, y).unwrap();
        assert_eq!(
            outcome,
            ClickOutcome::Navigate(Url::parse("https://example.org/dir/next.html").unwrap())
        );
    }

    #[test]
    fn test_click_focus_and_typing() {
        let mut page = page("<input name=q value=ab>");
        let input = page.document().query_selector("input").unwrap().unwrap();
        let (x, y) = center(page.node_rect(input).unwrap().unwrap());
        assert_eq!(page.click(x, y).unwrap(), ClickOutcome::Focused(input));
        assert_eq!(page.focused(), Some(input));

        assert!(page.type_char('c'));
        assert!(page.backspace());
        assert!(page.type_char('d'));
        assert_eq!(page.document().get_attribute(input, "value"), Some("abd"));
        let has_caret = page
            .display_list()
            .unwrap()
            .iter()
            .any(|c| matches!(c.op, DrawOp::Line { .. }));
        assert!(has_caret);

        // Clicking elsewhere blurs
        assert_eq!(page.click(700, 500).unwrap(), ClickOutcome::Nothing);
        assert_eq!(page.focused(), None);
        assert!(!page.type_char('x'));
    }

    #[test]
    fn test_click_toggles_checkbox() {
        let mut page = page("<input type=checkbox>");
        let input = page.document().query_selector("input").unwrap().unwrap();
        let (x, y) = center(page.node_rect(input).unwrap().unwrap());
        assert_eq!(
            page.click(x, y).unwrap(),
            ClickOutcome::Toggled {
                node: input,
                checked: true
            }
        );
        assert!(page.document().element(input).unwrap().attributes.contains("checked"));
        page.click(x, y).unwrap();
        assert!(!page.document().element(input).unwrap().attributes.contains("checked"));
    }

    #[test]
    fn test_scroll_is_clamped() {
        let mut page = page(&"<p>line</p>".repeat(100));
        page.scroll_up();
        assert_eq!(page.scroll(), 0);
        page.scroll_down();
        assert_eq!(page.scroll(), 100);
        page.scroll_by(1_000_000);
        let tree = page.layout_tree().unwrap();
        let expected = tree.rect(tree.root()).height + 2 * 18 - 600;
        assert_eq!(page.scroll(), expected);
        let bar = page.scrollbar().unwrap();
        assert_eq!(bar.x, 800 - SCROLLBAR_WIDTH);
        assert!(bar.bottom() <= 600);
    }

    #[test]
    fn test_short_page_has_no_scrollbar() {
        let mut page = page("<p>short</p>");
        page.scroll_down();
        assert_eq!(page.scroll(), 0);
        assert_eq!(page.scrollbar(), None);
    }

    #[test]
    fn test_set_viewport_relayouts() {
        let mut page = page("<p>aaaaaaaaaa bbbbbbbbbb</p>");
        let lines = |page: &Page| {
            let tree = page.layout_tree().unwrap();
            tree.descendants(tree.root())
                .into_iter()
                .filter(|id| matches!(tree.get(*id).kind, LayoutKind::Line))
                .count()
        };
        assert_eq!(lines(&page), 1);
        page.set_viewport(Viewport::new(100 + 26, 600));
        assert_eq!(lines(&page), 2);
    }

    #[test]
    fn test_rasterize_draws_backgrounds() {
        let page = page("<div style=\"background-color: red; height: 20px\"></div>");
        let frame = page.rasterize().unwrap();
        assert_eq!(frame.get_pixel(20, 25), Some([255, 0, 0, 255]));
        assert_eq!(frame.get_pixel(5, 5), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_rasterize_tall_page() {
        let mut page = page("<div style=\"height: 20000000px; background-color: red\"></div>");
        page.scroll_by(i32::MAX);
        let frame = page.rasterize().unwrap();
        assert_eq!(frame.get_pixel(20, 300), Some([255, 0, 0, 255]));
        assert!(page.scrollbar().is_some());
    }
}
