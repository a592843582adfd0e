use crate::a11y::DomContext;
use crate::core::{Config, HostTrait};
use crate::dom::{MemoryHost, NodeId};
use crate::types::ElementInfo;

/// Fixtures for exercising the helpers against an in-memory document.
pub struct TestHelper;

impl TestHelper {
    pub fn context(html: &str) -> DomContext<MemoryHost> {
        Self::context_with(MemoryHost::parse(html))
    }

    pub fn context_with(host: MemoryHost) -> DomContext<MemoryHost> {
        DomContext::new(host, Config::default())
    }

    pub async fn by_id(ctx: &DomContext<MemoryHost>, id: &str) -> Option<NodeId> {
        ctx.host().element_by_id(id).await.ok().flatten()
    }

    /// `id` attribute of the focused element, if it has one.
    pub async fn active_id(ctx: &DomContext<MemoryHost>) -> Option<String> {
        let active = ctx.host().active_element().await.ok()??;
        ctx.host().get_attribute(&active, "id").await.ok()?
    }

    /// Text of the first live region in the document.
    pub async fn live_region_text(ctx: &DomContext<MemoryHost>) -> Option<String> {
        let region = ctx.host().query_selector("[aria-live]", None).await.ok()??;
        ctx.host().text_content(&region).await.ok()
    }

    pub async fn describe(ctx: &DomContext<MemoryHost>, selector: &str) -> Option<ElementInfo> {
        let element = ctx.element_from_target(selector).await?;
        ctx.host().element_info(&element).await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <nav id="nav" class="site-nav primary">  Menu  </nav>
    </body></html>"#;

    #[test]
    fn test_fixture_context_is_usable_outside_async_tests() {
        let ctx = TestHelper::context(PAGE);
        let found = tokio_test::block_on(TestHelper::by_id(&ctx, "nav"));
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_describe_reports_element_info() {
        let ctx = TestHelper::context(PAGE);
        let info = TestHelper::describe(&ctx, "nav").await.unwrap();

        assert_eq!(info.tag_name, "nav");
        assert_eq!(info.element_id.as_deref(), Some("nav"));
        assert_eq!(info.class_name.as_deref(), Some("site-nav primary"));
        assert_eq!(info.text_content.as_deref(), Some("Menu"));
        assert_eq!(info.attributes.len(), 2);
    }

    #[tokio::test]
    async fn test_active_id_defaults_to_body_without_id() {
        let ctx = TestHelper::context(PAGE);
        assert_eq!(TestHelper::active_id(&ctx).await, None);
        assert_eq!(TestHelper::live_region_text(&ctx).await, None);
    }
}
