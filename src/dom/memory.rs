//! In-process document host.
//!
//! The document is parsed once with `scraper` and then kept as a small node
//! arena so it can be mutated. Selector queries mirror the tree holding the
//! queried node into a scraper tree node for node, so matching sees exactly
//! the arena's structure, detached subtrees included.
//!
//! Removed elements and replaced text are released back to the arena. Their
//! handles carry a generation, so a stale handle reports `Detached` instead of
//! aliasing whatever reuses the slot.

use crate::core::{HostCapabilities, HostTrait};
use crate::errors::{DomError, Result};
use crate::types::{
    Capability, ElementInfo, ElementRect, ScrollBehavior, ScrollOptions, ScrollPosition, Viewport,
};
use async_trait::async_trait;
use html5ever::{Attribute, LocalName, Namespace, QualName};
use scraper::node::{Element, Text};
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Oldest scroll records are dropped past this many.
pub const SCROLL_LOG_LIMIT: usize = 256;

const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

/// A scroll the host was asked to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrollRecord {
    IntoView {
        node: NodeId,
        options: ScrollOptions,
    },
    To {
        position: ScrollPosition,
        behavior: ScrollBehavior,
    },
}

#[derive(Debug, Clone)]
enum NodeKind {
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<usize>,
    children: Vec<usize>,
}

impl NodeData {
    fn new(kind: NodeKind, parent: Option<usize>) -> Self {
        Self {
            kind,
            parent,
            children: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct DocumentState {
    nodes: Vec<NodeData>,
    generations: Vec<u32>,
    free: Vec<usize>,
    root: usize,
    active: Option<usize>,
    scroll_position: ScrollPosition,
    scroll_log: VecDeque<ScrollRecord>,
    rects: HashMap<usize, ElementRect>,
    media: HashMap<String, bool>,
}

pub struct MemoryHost {
    state: RwLock<DocumentState>,
    capabilities: HostCapabilities,
    viewport: Viewport,
    fail_smooth_scroll: bool,
    frames: AtomicUsize,
}

impl MemoryHost {
    /// Parse a full HTML document.
    pub fn parse(html: &str) -> Self {
        Self {
            state: RwLock::new(DocumentState::from_html(html)),
            capabilities: HostCapabilities::default(),
            viewport: Viewport::default(),
            fail_smooth_scroll: false,
            frames: AtomicUsize::new(0),
        }
    }

    /// An empty `<html><head></head><body></body></html>` document.
    pub fn new() -> Self {
        Self::parse("")
    }

    pub fn with_capabilities(mut self, capabilities: HostCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn with_media(mut self, query: &str, matches: bool) -> Self {
        self.state
            .get_mut()
            .media
            .insert(normalize_media_query(query), matches);
        self
    }

    pub fn with_reduced_motion(self, reduce: bool) -> Self {
        self.with_media("(prefers-reduced-motion: reduce)", reduce)
    }

    /// Make every smooth scroll request fail, as older engines do when handed
    /// a scroll options object.
    pub fn with_smooth_scroll_failure(mut self) -> Self {
        self.fail_smooth_scroll = true;
        self
    }

    /// Give the element with `element_id` a layout box.
    pub fn with_rect(mut self, element_id: &str, rect: ElementRect) -> Self {
        let state = self.state.get_mut();
        match state.find_by_id(element_id) {
            Some(node) => {
                state.rects.insert(node, rect);
            }
            None => tracing::warn!("no element with id {:?} to attach a rect to", element_id),
        }
        self
    }

    /// Number of rendering opportunities that have been awaited.
    pub fn frame_count(&self) -> usize {
        self.frames.load(Ordering::SeqCst)
    }

    /// Most recent scrolls, oldest first.
    pub async fn scroll_log(&self) -> Vec<ScrollRecord> {
        self.state.read().await.scroll_log.iter().cloned().collect()
    }

    pub async fn scroll_position(&self) -> ScrollPosition {
        self.state.read().await.scroll_position
    }

    pub async fn text_content(&self, node: &NodeId) -> Result<String> {
        let state = self.state.read().await;
        let index = state.resolve(node)?;
        Ok(state.text_of(index))
    }

    pub async fn is_attached(&self, node: &NodeId) -> bool {
        let state = self.state.read().await;
        state
            .resolve(node)
            .is_ok_and(|index| state.is_attached(index))
    }

    /// Live nodes held by the arena, attached or not.
    pub async fn node_count(&self) -> usize {
        let state = self.state.read().await;
        state.nodes.len() - state.free.len()
    }

    /// Serialise the attached document.
    pub async fn to_html(&self) -> String {
        let state = self.state.read().await;
        let mut out = String::new();
        state.write_node(state.root, &mut out);
        out
    }

    fn parse_selector(selector: &str) -> Result<Selector> {
        Selector::parse(selector)
            .map_err(|e| DomError::InvalidSelector(format!("{}: {:?}", selector, e)))
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentState {
    fn from_html(html: &str) -> Self {
        let parsed = Html::parse_document(html);
        let mut state = Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free: Vec::new(),
            root: 0,
            active: None,
            scroll_position: ScrollPosition::default(),
            scroll_log: VecDeque::new(),
            rects: HashMap::new(),
            media: HashMap::new(),
        };
        state.root = state.import(parsed.root_element(), None);
        state
    }

    fn import(&mut self, element: ElementRef<'_>, parent: Option<usize>) -> usize {
        let value = element.value();
        let attributes = value
            .attrs()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        let id = self.push(
            NodeKind::Element {
                tag: value.name().to_string(),
                attributes,
            },
            parent,
        );

        for child in element.children() {
            if let Some(child_element) = ElementRef::wrap(child) {
                let child_id = self.import(child_element, Some(id));
                self.nodes[id].children.push(child_id);
            } else if let Some(text) = child.value().as_text() {
                let content: &str = &text.text;
                let child_id = self.push(NodeKind::Text(content.to_string()), Some(id));
                self.nodes[id].children.push(child_id);
            }
        }

        id
    }

    fn push(&mut self, kind: NodeKind, parent: Option<usize>) -> usize {
        let data = NodeData::new(kind, parent);
        match self.free.pop() {
            Some(index) => {
                self.nodes[index] = data;
                index
            }
            None => {
                self.nodes.push(data);
                self.generations.push(0);
                self.nodes.len() - 1
            }
        }
    }

    fn handle(&self, index: usize) -> NodeId {
        NodeId {
            index,
            generation: self.generations[index],
        }
    }

    /// Arena index of a live element handle.
    fn resolve(&self, node: &NodeId) -> Result<usize> {
        match self.generations.get(node.index) {
            Some(&generation) if generation == node.generation => {}
            Some(_) => return Err(DomError::Detached),
            None => return Err(DomError::ElementNotFound(format!("node {}", node.index))),
        }
        match self.nodes[node.index].kind {
            NodeKind::Element { .. } => Ok(node.index),
            NodeKind::Text(_) => Err(DomError::ElementNotFound(format!("node {}", node.index))),
        }
    }

    /// Drop `node` and everything below it, bumping generations so old
    /// handles go stale.
    fn release(&mut self, node: usize) {
        self.detach(node);
        let mut pending = vec![node];
        while let Some(index) = pending.pop() {
            let data = std::mem::replace(
                &mut self.nodes[index],
                NodeData::new(NodeKind::Text(String::new()), None),
            );
            pending.extend(data.children);
            self.generations[index] = self.generations[index].wrapping_add(1);
            self.rects.remove(&index);
            if self.active == Some(index) {
                self.active = None;
            }
            self.free.push(index);
        }
    }

    fn replace_children_with_text(&mut self, element: usize, text: &str) -> Result<()> {
        for child in std::mem::take(&mut self.nodes[element].children) {
            self.nodes[child].parent = None;
            self.release(child);
        }
        if !text.is_empty() {
            let node = self.push(NodeKind::Text(text.to_string()), None);
            self.append(element, node)?;
        }
        Ok(())
    }

    fn record_scroll(&mut self, record: ScrollRecord) {
        if self.scroll_log.len() == SCROLL_LOG_LIMIT {
            self.scroll_log.pop_front();
        }
        self.scroll_log.push_back(record);
    }

    fn tag(&self, node: usize) -> Option<&str> {
        match &self.nodes.get(node)?.kind {
            NodeKind::Element { tag, .. } => Some(tag),
            NodeKind::Text(_) => None,
        }
    }

    fn attr(&self, node: usize, name: &str) -> Option<&str> {
        match &self.nodes.get(node)?.kind {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    fn set_attr(&mut self, node: usize, name: &str, value: &str) {
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[node].kind {
            match attributes.iter_mut().find(|(key, _)| key == name) {
                Some((_, existing)) => *existing = value.to_string(),
                None => attributes.push((name.to_string(), value.to_string())),
            }
        }
    }

    fn is_attached(&self, node: usize) -> bool {
        self.top_of(node) == self.root
    }

    fn top_of(&self, node: usize) -> usize {
        let mut current = node;
        while let Some(parent) = self.nodes[current].parent {
            current = parent;
        }
        current
    }

    fn is_descendant(&self, node: usize, ancestor: usize) -> bool {
        let mut current = self.nodes.get(node).and_then(|n| n.parent);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes[id].parent;
        }
        false
    }

    /// Attached elements in document order.
    fn elements(&self) -> Vec<usize> {
        let mut order = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if let NodeKind::Element { .. } = self.nodes[id].kind {
                order.push(id);
                stack.extend(self.nodes[id].children.iter().rev());
            }
        }
        order
    }

    fn find_by_id(&self, element_id: &str) -> Option<usize> {
        self.elements()
            .into_iter()
            .find(|&id| self.attr(id, "id") == Some(element_id))
    }

    fn find_by_tag(&self, tag: &str) -> Option<usize> {
        self.elements()
            .into_iter()
            .find(|&id| self.tag(id) == Some(tag))
    }

    /// Elements matching `selector` in the tree that holds `node`, in tree
    /// order. The attached document hangs off a document node so `:root`
    /// applies; detached subtrees hang off a fragment.
    fn matching(&self, selector: &Selector, node: usize) -> Vec<usize> {
        let top = self.top_of(node);
        let mut snapshot = if top == self.root {
            Html::new_document()
        } else {
            Html::new_fragment()
        };

        let mut arena_of = HashMap::new();
        let mut pending = vec![(top, snapshot.tree.root().id())];
        while let Some((index, parent)) = pending.pop() {
            let Some(mut parent_node) = snapshot.tree.get_mut(parent) else {
                continue;
            };
            let id = parent_node.append(self.mirror(index)).id();
            arena_of.insert(id, index);
            // Reversed so the stack appends siblings in order.
            for &child in self.nodes[index].children.iter().rev() {
                pending.push((child, id));
            }
        }

        snapshot
            .tree
            .root()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|element| selector.matches(element))
            .filter_map(|element| arena_of.get(&element.id()).copied())
            .collect()
    }

    fn mirror(&self, node: usize) -> Node {
        match &self.nodes[node].kind {
            NodeKind::Element { tag, attributes } => {
                let attributes = attributes
                    .iter()
                    .map(|(name, value)| Attribute {
                        name: QualName::new(None, Namespace::from(""), LocalName::from(name.as_str())),
                        value: value.as_str().into(),
                    })
                    .collect();
                let name = QualName::new(
                    None,
                    Namespace::from(HTML_NAMESPACE),
                    LocalName::from(tag.as_str()),
                );
                Node::Element(Element::new(name, attributes))
            }
            NodeKind::Text(content) => Node::Text(Text {
                text: content.as_str().into(),
            }),
        }
    }

    fn text_of(&self, node: usize) -> String {
        let mut text = String::new();
        self.collect_text(node, &mut text);
        text
    }

    fn collect_text(&self, node: usize, out: &mut String) {
        match &self.nodes[node].kind {
            NodeKind::Text(content) => out.push_str(content),
            NodeKind::Element { .. } => {
                for &child in &self.nodes[node].children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    fn detach(&mut self, node: usize) {
        if let Some(parent) = self.nodes[node].parent.take() {
            self.nodes[parent].children.retain(|&child| child != node);
        }
    }

    fn append(&mut self, parent: usize, child: usize) -> Result<()> {
        if child == parent || self.is_descendant(parent, child) {
            return Err(DomError::script("cannot append an element into itself"));
        }
        self.detach(child);
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
        Ok(())
    }

    fn is_focusable(&self, node: usize) -> bool {
        if !self.is_attached(node) {
            return false;
        }
        if self
            .attr(node, "tabindex")
            .is_some_and(|value| value.trim().parse::<i32>().is_ok())
        {
            return true;
        }
        if self
            .attr(node, "contenteditable")
            .is_some_and(|value| !value.eq_ignore_ascii_case("false"))
        {
            return true;
        }

        let disabled = self.attr(node, "disabled").is_some();
        match self.tag(node) {
            Some("a") | Some("area") => self.attr(node, "href").is_some(),
            Some("button") | Some("select") | Some("textarea") => !disabled,
            Some("input") => {
                !disabled
                    && !self
                        .attr(node, "type")
                        .is_some_and(|kind| kind.eq_ignore_ascii_case("hidden"))
            }
            Some("body") | Some("iframe") | Some("summary") => true,
            _ => false,
        }
    }

    fn write_node(&self, node: usize, out: &mut String) {
        match &self.nodes[node].kind {
            NodeKind::Text(content) => out.push_str(&escape_text(content)),
            NodeKind::Element { tag, attributes } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attributes {
                    out.push_str(&format!(" {}=\"{}\"", name, escape_attribute(value)));
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    return;
                }
                for &child in &self.nodes[node].children {
                    self.write_node(child, out);
                }
                out.push_str(&format!("</{}>", tag));
            }
        }
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

fn normalize_media_query(query: &str) -> String {
    query
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase()
}

#[async_trait]
impl HostTrait for MemoryHost {
    type ElementHandle = NodeId;

    fn capabilities(&self) -> &HostCapabilities {
        &self.capabilities
    }

    async fn document_element(&self) -> Result<NodeId> {
        let state = self.state.read().await;
        Ok(state.handle(state.root))
    }

    async fn body(&self) -> Result<Option<NodeId>> {
        let state = self.state.read().await;
        Ok(state.find_by_tag("body").map(|id| state.handle(id)))
    }

    async fn element_by_id(&self, id: &str) -> Result<Option<NodeId>> {
        let state = self.state.read().await;
        Ok(state.find_by_id(id).map(|found| state.handle(found)))
    }

    async fn query_selector(
        &self,
        selector: &str,
        scope: Option<&NodeId>,
    ) -> Result<Option<NodeId>> {
        let parsed = Self::parse_selector(selector)?;
        let state = self.state.read().await;
        let scope = match scope {
            Some(scope) => Some(state.resolve(scope)?),
            None => None,
        };

        Ok(state
            .matching(&parsed, scope.unwrap_or(state.root))
            .into_iter()
            .find(|&id| scope.map_or(true, |scope| state.is_descendant(id, scope)))
            .map(|id| state.handle(id)))
    }

    async fn closest(&self, element: &NodeId, selector: &str) -> Result<Option<NodeId>> {
        if !self.capabilities.supports_closest {
            return Err(DomError::Unsupported(Capability::Closest));
        }
        let parsed = Self::parse_selector(selector)?;
        let state = self.state.read().await;
        let index = state.resolve(element)?;

        let matches: HashSet<usize> = state.matching(&parsed, index).into_iter().collect();
        let mut current = Some(index);
        while let Some(id) = current {
            if matches.contains(&id) {
                return Ok(Some(state.handle(id)));
            }
            current = state.nodes[id].parent;
        }
        Ok(None)
    }

    async fn get_attribute(&self, element: &NodeId, name: &str) -> Result<Option<String>> {
        let state = self.state.read().await;
        let index = state.resolve(element)?;
        Ok(state.attr(index, name).map(str::to_string))
    }

    async fn set_attribute(&self, element: &NodeId, name: &str, value: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let index = state.resolve(element)?;
        state.set_attr(index, name, value);
        Ok(())
    }

    async fn is_focusable(&self, element: &NodeId) -> Result<bool> {
        let state = self.state.read().await;
        let index = state.resolve(element)?;
        Ok(state.is_focusable(index))
    }

    async fn focus(&self, element: &NodeId, _prevent_scroll: bool) -> Result<()> {
        let mut state = self.state.write().await;
        let index = state.resolve(element)?;
        // Like the DOM, focusing something unfocusable is silently ignored.
        if state.is_focusable(index) {
            state.active = Some(index);
        }
        Ok(())
    }

    async fn active_element(&self) -> Result<Option<NodeId>> {
        let state = self.state.read().await;
        let active = match state.active {
            Some(id) if state.is_attached(id) => Some(id),
            _ => state.find_by_tag("body"),
        };
        Ok(active.map(|id| state.handle(id)))
    }

    async fn scroll_into_view(&self, element: &NodeId, options: ScrollOptions) -> Result<()> {
        if options.behavior == ScrollBehavior::Smooth && self.fail_smooth_scroll {
            return Err(DomError::SmoothScrollFailed(
                "scrollIntoView options are not supported".to_string(),
            ));
        }
        let mut state = self.state.write().await;
        state.resolve(element)?;
        state.record_scroll(ScrollRecord::IntoView {
            node: *element,
            options,
        });
        Ok(())
    }

    async fn scroll_to(&self, position: ScrollPosition, behavior: ScrollBehavior) -> Result<()> {
        if behavior == ScrollBehavior::Smooth && self.fail_smooth_scroll {
            return Err(DomError::SmoothScrollFailed(
                "scrollTo options are not supported".to_string(),
            ));
        }
        let mut state = self.state.write().await;
        state.scroll_position = position;
        state.record_scroll(ScrollRecord::To { position, behavior });
        Ok(())
    }

    async fn bounding_rect(&self, element: &NodeId) -> Result<ElementRect> {
        let state = self.state.read().await;
        let index = state.resolve(element)?;
        Ok(state.rects.get(&index).copied().unwrap_or_default())
    }

    async fn viewport(&self) -> Result<Viewport> {
        Ok(self.viewport)
    }

    async fn title(&self) -> Result<String> {
        let state = self.state.read().await;
        Ok(state
            .find_by_tag("title")
            .map(|id| {
                state
                    .text_of(id)
                    .split_ascii_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default())
    }

    async fn set_title(&self, title: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let element = match state.find_by_tag("title") {
            Some(id) => id,
            None => {
                let parent = state.find_by_tag("head").unwrap_or(state.root);
                let id = state.push(
                    NodeKind::Element {
                        tag: "title".to_string(),
                        attributes: Vec::new(),
                    },
                    None,
                );
                state.append(parent, id)?;
                id
            }
        };
        state.replace_children_with_text(element, title)
    }

    async fn match_media(&self, query: &str) -> Result<bool> {
        if !self.capabilities.supports_match_media {
            return Err(DomError::Unsupported(Capability::MatchMedia));
        }
        let state = self.state.read().await;
        Ok(state
            .media
            .get(&normalize_media_query(query))
            .copied()
            .unwrap_or(false))
    }

    async fn create_element(&self, tag_name: &str) -> Result<NodeId> {
        let mut state = self.state.write().await;
        let id = state.push(
            NodeKind::Element {
                tag: tag_name.to_ascii_lowercase(),
                attributes: Vec::new(),
            },
            None,
        );
        Ok(state.handle(id))
    }

    async fn append_child(&self, parent: &NodeId, child: &NodeId) -> Result<()> {
        let mut state = self.state.write().await;
        let parent = state.resolve(parent)?;
        let child = state.resolve(child)?;
        state.append(parent, child)
    }

    /// Replaced children are released; handles to them go stale.
    async fn set_text_content(&self, element: &NodeId, text: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let index = state.resolve(element)?;
        state.replace_children_with_text(index, text)
    }

    /// The element and its subtree are released; handles to them go stale.
    async fn remove_element(&self, element: &NodeId) -> Result<()> {
        let mut state = self.state.write().await;
        let index = state.resolve(element)?;
        if index == state.root {
            return Err(DomError::script("cannot remove the document element"));
        }
        state.release(index);
        Ok(())
    }

    async fn element_info(&self, element: &NodeId) -> Result<ElementInfo> {
        let state = self.state.read().await;
        let index = state.resolve(element)?;

        let attributes: HashMap<String, String> = match &state.nodes[index].kind {
            NodeKind::Element { attributes, .. } => attributes.iter().cloned().collect(),
            NodeKind::Text(_) => HashMap::new(),
        };
        let text = state.text_of(index);
        let text = text.trim();

        Ok(ElementInfo {
            tag_name: state.tag(index).unwrap_or_default().to_string(),
            element_id: attributes.get("id").cloned(),
            class_name: attributes.get("class").cloned(),
            text_content: (!text.is_empty()).then(|| text.to_string()),
            attributes,
            rect: Some(state.rects.get(&index).copied().unwrap_or_default()),
        })
    }

    async fn next_frame(&self) -> Result<()> {
        self.frames.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html>
          <head><title>  Home
            page </title></head>
          <body>
            <main id="main">
              <form id="signup">
                <div class="form-group"><input id="email" aria-invalid="true"></div>
              </form>
              <a id="link" href="/next">next</a>
              <a id="anchor">no href</a>
            </main>
          </body>
        </html>
    "#;

    #[tokio::test]
    async fn test_query_selector_returns_first_in_document_order() {
        let host = MemoryHost::parse(PAGE);
        let found = host.query_selector("a", None).await.unwrap().unwrap();
        assert_eq!(host.element_by_id("link").await.unwrap(), Some(found));
    }

    #[tokio::test]
    async fn test_query_selector_rejects_malformed_selector() {
        let host = MemoryHost::parse(PAGE);
        let err = host.query_selector("a[", None).await.unwrap_err();
        assert!(matches!(err, DomError::InvalidSelector(_)));
    }

    #[tokio::test]
    async fn test_scoped_query_only_sees_descendants() {
        let host = MemoryHost::parse(PAGE);
        let form = host.element_by_id("signup").await.unwrap().unwrap();
        let link = host.element_by_id("link").await.unwrap().unwrap();

        assert!(host.query_selector("a", Some(&form)).await.unwrap().is_none());
        assert!(host.query_selector("form", Some(&form)).await.unwrap().is_none());
        assert!(host.query_selector("a", Some(&link)).await.unwrap().is_none());
        assert!(host.query_selector("input", Some(&form)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_closest_includes_the_element_itself() {
        let host = MemoryHost::parse(PAGE);
        let email = host.element_by_id("email").await.unwrap().unwrap();

        let group = host.closest(&email, ".form-group").await.unwrap().unwrap();
        assert_eq!(host.element_info(&group).await.unwrap().tag_name, "div");
        assert_eq!(host.closest(&email, "input").await.unwrap(), Some(email));
        assert_eq!(host.closest(&email, "table").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_closest_reports_missing_capability() {
        let host = MemoryHost::parse(PAGE).with_capabilities(HostCapabilities {
            supports_closest: false,
            ..Default::default()
        });
        let email = host.element_by_id("email").await.unwrap().unwrap();
        let err = host.closest(&email, "form").await.unwrap_err();
        assert!(err.is_unsupported());
    }

    #[tokio::test]
    async fn test_focusability_follows_html_rules() {
        let host = MemoryHost::parse(PAGE);
        let link = host.element_by_id("link").await.unwrap().unwrap();
        let anchor = host.element_by_id("anchor").await.unwrap().unwrap();
        let main = host.element_by_id("main").await.unwrap().unwrap();

        assert!(host.is_focusable(&link).await.unwrap());
        assert!(!host.is_focusable(&anchor).await.unwrap());
        assert!(!host.is_focusable(&main).await.unwrap());

        host.set_attribute(&main, "tabindex", "-1").await.unwrap();
        assert!(host.is_focusable(&main).await.unwrap());
    }

    #[tokio::test]
    async fn test_focus_ignores_unfocusable_elements() {
        let host = MemoryHost::parse(PAGE);
        let body = host.body().await.unwrap();
        let main = host.element_by_id("main").await.unwrap().unwrap();

        host.focus(&main, false).await.unwrap();
        assert_eq!(host.active_element().await.unwrap(), body);
    }

    #[tokio::test]
    async fn test_title_is_whitespace_collapsed_and_settable() {
        let host = MemoryHost::parse(PAGE);
        assert_eq!(host.title().await.unwrap(), "Home page");

        host.set_title("Checkout").await.unwrap();
        assert_eq!(host.title().await.unwrap(), "Checkout");

        host.set_title("").await.unwrap();
        assert_eq!(host.title().await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_set_title_creates_title_element() {
        let host = MemoryHost::new();
        host.set_title("Fresh").await.unwrap();
        assert_eq!(host.title().await.unwrap(), "Fresh");
        assert!(host.to_html().await.contains("<head><title>Fresh</title></head>"));
    }

    #[tokio::test]
    async fn test_created_elements_are_queryable_once_attached() {
        let host = MemoryHost::new();
        let div = host.create_element("DIV").await.unwrap();
        host.set_attribute(&div, "id", "late").await.unwrap();
        assert!(host.element_by_id("late").await.unwrap().is_none());

        let body = host.body().await.unwrap().unwrap();
        host.append_child(&body, &div).await.unwrap();
        assert_eq!(host.element_by_id("late").await.unwrap(), Some(div));
        assert_eq!(host.query_selector("body > div", None).await.unwrap(), Some(div));

        host.remove_element(&div).await.unwrap();
        assert!(!host.is_attached(&div).await);
        assert!(host.query_selector("#late", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_text_content_is_never_parsed_as_markup() {
        let host = MemoryHost::new();
        let body = host.body().await.unwrap().unwrap();
        let p = host.create_element("p").await.unwrap();
        host.append_child(&body, &p).await.unwrap();
        host.set_text_content(&p, "<b>&</b>").await.unwrap();

        assert_eq!(host.text_content(&p).await.unwrap(), "<b>&</b>");
        assert!(host.query_selector("b", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_match_media_uses_normalized_queries() {
        let host = MemoryHost::new().with_media("(prefers-color-scheme: dark)", true);
        assert!(host.match_media("(prefers-color-scheme:dark)").await.unwrap());
        assert!(!host.match_media("(prefers-reduced-motion: reduce)").await.unwrap());
    }

    #[tokio::test]
    async fn test_smooth_scroll_failure_is_reported() {
        let host = MemoryHost::new().with_smooth_scroll_failure();
        let err = host
            .scroll_to(ScrollPosition::new(0.0, 10.0), ScrollBehavior::Smooth)
            .await
            .unwrap_err();
        assert!(matches!(err, DomError::SmoothScrollFailed(_)));

        host.scroll_to(ScrollPosition::new(0.0, 10.0), ScrollBehavior::Auto)
            .await
            .unwrap();
        assert_eq!(host.scroll_position().await, ScrollPosition::new(0.0, 10.0));
    }

    #[tokio::test]
    async fn test_selectors_see_the_tree_as_mutated() {
        let host = MemoryHost::parse(r#"<p id="para">x</p>"#);
        let para = host.element_by_id("para").await.unwrap().unwrap();
        let div = host.create_element("div").await.unwrap();
        host.append_child(&para, &div).await.unwrap();

        assert_eq!(host.query_selector("p > div", None).await.unwrap(), Some(div));
        assert_eq!(host.query_selector("#para div", None).await.unwrap(), Some(div));
        assert_eq!(host.query_selector("div", Some(&para)).await.unwrap(), Some(div));
        assert_eq!(host.closest(&div, "p").await.unwrap(), Some(para));
        assert!(host.to_html().await.contains("<p id=\"para\">x<div></div></p>"));
    }

    #[tokio::test]
    async fn test_root_selector_only_matches_attached_document() {
        let host = MemoryHost::parse(PAGE);
        let root = host.document_element().await.unwrap();
        assert_eq!(host.query_selector(":root", None).await.unwrap(), Some(root));

        let form = host.create_element("form").await.unwrap();
        let input = host.create_element("input").await.unwrap();
        host.append_child(&form, &input).await.unwrap();
        assert_eq!(host.closest(&input, ":root").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_detached_subtrees_support_scoped_queries_and_closest() {
        let host = MemoryHost::new();
        let form = host.create_element("form").await.unwrap();
        let group = host.create_element("div").await.unwrap();
        let input = host.create_element("input").await.unwrap();
        host.set_attribute(&group, "class", "form-group").await.unwrap();
        host.set_attribute(&input, "aria-invalid", "true").await.unwrap();
        host.append_child(&form, &group).await.unwrap();
        host.append_child(&group, &input).await.unwrap();

        assert_eq!(
            host.query_selector("[aria-invalid=true]", Some(&form)).await.unwrap(),
            Some(input)
        );
        assert_eq!(host.closest(&input, ".form-group").await.unwrap(), Some(group));
        assert_eq!(host.closest(&input, "form").await.unwrap(), Some(form));
        assert!(host.query_selector("input", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_removed_elements_go_stale() {
        let host = MemoryHost::new();
        let body = host.body().await.unwrap().unwrap();
        let first = host.create_element("div").await.unwrap();
        host.append_child(&body, &first).await.unwrap();
        host.set_text_content(&first, "first").await.unwrap();
        host.remove_element(&first).await.unwrap();

        let second = host.create_element("span").await.unwrap();
        assert_ne!(first, second);
        assert!(matches!(
            host.get_attribute(&first, "id").await.unwrap_err(),
            DomError::Detached
        ));
        assert!(matches!(
            host.remove_element(&first).await.unwrap_err(),
            DomError::Detached
        ));
        assert_eq!(host.element_info(&second).await.unwrap().tag_name, "span");
    }

    #[tokio::test]
    async fn test_document_element_cannot_be_removed() {
        let host = MemoryHost::new();
        let root = host.document_element().await.unwrap();
        assert!(host.remove_element(&root).await.is_err());
        assert!(host.is_attached(&root).await);
    }

    #[tokio::test]
    async fn test_arena_stays_bounded_under_repeated_updates() {
        let host = MemoryHost::new();
        let body = host.body().await.unwrap().unwrap();
        host.set_title("start").await.unwrap();
        let baseline = host.node_count().await;

        for round in 0..200 {
            host.set_title(&format!("Page {}", round)).await.unwrap();
            let region = host.create_element("div").await.unwrap();
            host.append_child(&body, &region).await.unwrap();
            host.set_text_content(&region, "update").await.unwrap();
            host.set_text_content(&region, "again").await.unwrap();
            host.remove_element(&region).await.unwrap();
        }

        assert_eq!(host.node_count().await, baseline);
        assert_eq!(host.title().await.unwrap(), "Page 199");
    }

    #[tokio::test]
    async fn test_scroll_log_keeps_recent_records() {
        let host = MemoryHost::new();
        for step in 0..(SCROLL_LOG_LIMIT + 10) {
            host.scroll_to(ScrollPosition::new(0.0, step as f64), ScrollBehavior::Auto)
                .await
                .unwrap();
        }

        let log = host.scroll_log().await;
        assert_eq!(log.len(), SCROLL_LOG_LIMIT);
        assert_eq!(
            log.last(),
            Some(&ScrollRecord::To {
                position: ScrollPosition::new(0.0, (SCROLL_LOG_LIMIT + 9) as f64),
                behavior: ScrollBehavior::Auto,
            })
        );
    }
}
