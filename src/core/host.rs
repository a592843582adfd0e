use crate::errors::Result;
use crate::types::{
    Capability, ElementInfo, ElementRect, ScrollBehavior, ScrollOptions, ScrollPosition, Viewport,
};
use async_trait::async_trait;
use std::fmt::Debug;

/// A live document plus the window around it.
///
/// Implementations own all document state; the helpers in [`crate::a11y`]
/// only hold element handles for the duration of a single call.
#[async_trait]
pub trait HostTrait: Send + Sync {
    type ElementHandle: Clone + PartialEq + Debug + Send + Sync + 'static;

    /// Optional features this host provides
    fn capabilities(&self) -> &HostCapabilities;

    /// `document.documentElement`
    async fn document_element(&self) -> Result<Self::ElementHandle>;

    /// `document.body`
    async fn body(&self) -> Result<Option<Self::ElementHandle>>;

    async fn element_by_id(&self, id: &str) -> Result<Option<Self::ElementHandle>>;

    /// First match in document order, searching descendants of `scope` when
    /// given. Fails with `InvalidSelector` when the selector does not parse.
    async fn query_selector(
        &self,
        selector: &str,
        scope: Option<&Self::ElementHandle>,
    ) -> Result<Option<Self::ElementHandle>>;

    /// Nearest inclusive ancestor matching `selector`.
    async fn closest(
        &self,
        element: &Self::ElementHandle,
        selector: &str,
    ) -> Result<Option<Self::ElementHandle>>;

    async fn get_attribute(
        &self,
        element: &Self::ElementHandle,
        name: &str,
    ) -> Result<Option<String>>;

    async fn set_attribute(&self, element: &Self::ElementHandle, name: &str, value: &str)
        -> Result<()>;

    /// Whether `focus()` would move focus to the element as it stands.
    async fn is_focusable(&self, element: &Self::ElementHandle) -> Result<bool>;

    async fn focus(&self, element: &Self::ElementHandle, prevent_scroll: bool) -> Result<()>;

    async fn active_element(&self) -> Result<Option<Self::ElementHandle>>;

    async fn scroll_into_view(
        &self,
        element: &Self::ElementHandle,
        options: ScrollOptions,
    ) -> Result<()>;

    async fn scroll_to(&self, position: ScrollPosition, behavior: ScrollBehavior) -> Result<()>;

    async fn bounding_rect(&self, element: &Self::ElementHandle) -> Result<ElementRect>;

    async fn viewport(&self) -> Result<Viewport>;

    async fn title(&self) -> Result<String>;

    async fn set_title(&self, title: &str) -> Result<()>;

    /// Evaluate a media query. Fails with `Unsupported` when the host has no
    /// media query support.
    async fn match_media(&self, query: &str) -> Result<bool>;

    /// Create a detached element.
    async fn create_element(&self, tag_name: &str) -> Result<Self::ElementHandle>;

    async fn append_child(
        &self,
        parent: &Self::ElementHandle,
        child: &Self::ElementHandle,
    ) -> Result<()>;

    async fn set_text_content(&self, element: &Self::ElementHandle, text: &str) -> Result<()>;

    async fn remove_element(&self, element: &Self::ElementHandle) -> Result<()>;

    async fn element_info(&self, element: &Self::ElementHandle) -> Result<ElementInfo>;

    /// Resolve after the host's next rendering opportunity.
    async fn next_frame(&self) -> Result<()>;
}

/// Host capabilities that can be queried
#[derive(Debug, Clone)]
pub struct HostCapabilities {
    pub supports_closest: bool,
    pub supports_match_media: bool,
    pub supports_smooth_scroll: bool,
}

impl HostCapabilities {
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Closest => self.supports_closest,
            Capability::MatchMedia => self.supports_match_media,
            Capability::SmoothScroll => self.supports_smooth_scroll,
        }
    }
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self {
            supports_closest: true,
            supports_match_media: true,
            supports_smooth_scroll: true,
        }
    }
}
