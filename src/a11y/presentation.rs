use super::coerce::to_js_string;
use super::DomContext;
use crate::core::HostTrait;
use crate::errors::Result;
use crate::types::{Outcome, Politeness, SkipReason};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub const REDUCED_MOTION_QUERY: &str = "(prefers-reduced-motion: reduce)";

const VISUALLY_HIDDEN: &str = "position:absolute;width:1px;height:1px;margin:-1px;padding:0;\
overflow:hidden;clip:rect(0,0,0,0);white-space:nowrap;border:0";

impl<B: HostTrait + 'static> DomContext<B> {
    pub async fn set_title(&self, title: &str) -> Outcome {
        match self.host().set_title(title).await {
            Ok(()) => Outcome::Applied,
            Err(e) => {
                warn!("setting document title suppressed: {}", e);
                Outcome::suppressed(e)
            }
        }
    }

    /// Set the title from untyped input using JavaScript string coercion.
    pub async fn set_title_value(&self, value: Option<&Value>) -> Outcome {
        self.set_title(&to_js_string(value)).await
    }

    pub async fn prefers_reduced_motion(&self) -> bool {
        if !self.host().capabilities().supports_match_media {
            debug!("host has no matchMedia, assuming motion is fine");
            return false;
        }
        match self.host().match_media(REDUCED_MOTION_QUERY).await {
            Ok(matches) => matches,
            Err(e) => {
                debug!("reduced motion query failed: {}", e);
                false
            }
        }
    }

    /// Announce with the configured politeness.
    pub async fn announce(&self, text: &str) -> Outcome {
        self.announce_with(text, self.config().announce.politeness)
            .await
    }

    /// Expose `text` to assistive technology through a transient live region.
    ///
    /// The region is inserted empty and filled after the next frame so screen
    /// readers see a change. Returns once the text is in place; the region is
    /// removed after `announce.clear_after_ms`.
    pub async fn announce_with(&self, text: &str, politeness: Politeness) -> Outcome {
        let body = match self.host().body().await {
            Ok(Some(body)) => body,
            Ok(None) => {
                debug!("no body to host a live region");
                return Outcome::skipped(SkipReason::NoBody);
            }
            Err(e) => {
                warn!("announcement suppressed: {}", e);
                return Outcome::suppressed(e);
            }
        };

        let region = match self.insert_live_region(&body, politeness).await {
            Ok(region) => region,
            Err(e) => {
                warn!("could not create live region: {}", e);
                return Outcome::suppressed(e);
            }
        };

        if let Err(e) = self.host().next_frame().await {
            debug!("frame wait failed before announcing: {}", e);
        }

        if let Err(e) = self.host().set_text_content(&region, text).await {
            warn!("announcement suppressed: {}", e);
            if let Err(e) = self.host().remove_element(&region).await {
                debug!("could not remove live region: {}", e);
            }
            return Outcome::suppressed(e);
        }

        self.schedule_region_removal(region);
        Outcome::Applied
    }

    async fn insert_live_region(
        &self,
        body: &B::ElementHandle,
        politeness: Politeness,
    ) -> Result<B::ElementHandle> {
        let host = self.host();
        let region = host.create_element("div").await?;
        host.set_attribute(&region, "role", politeness.role()).await?;
        host.set_attribute(&region, "aria-live", politeness.aria_live())
            .await?;
        host.set_attribute(&region, "aria-atomic", "true").await?;
        host.set_attribute(&region, "style", VISUALLY_HIDDEN).await?;
        host.append_child(body, &region).await?;
        Ok(region)
    }

    fn schedule_region_removal(&self, region: B::ElementHandle) {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                debug!("no runtime to clear live region {:?}, leaving it", region);
                return;
            }
        };
        let host = self.shared_host();
        let delay = Duration::from_millis(self.config().announce.clear_after_ms);

        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = host.remove_element(&region).await {
                debug!("could not remove live region {:?}: {}", region, e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::HostCapabilities;
    use crate::dom::MemoryHost;
    use crate::testing::TestHelper;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_title_coerces_values() {
        let ctx = TestHelper::context("<title>Start</title>");
        let cases = [
            (Some(json!("hello")), "hello"),
            (Some(json!("")), ""),
            (Some(json!(null)), "null"),
            (None, "undefined"),
            (Some(json!(true)), "true"),
            (Some(json!(1)), "1"),
            (Some(json!({})), "[object Object]"),
            (Some(json!([])), ""),
        ];

        for (value, expected) in cases {
            assert!(ctx.set_title_value(value.as_ref()).await.is_applied());
            assert_eq!(ctx.host().title().await.unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn test_set_title_plain_text() {
        let ctx = TestHelper::context("");
        assert!(ctx.set_title("Search results").await.is_applied());
        assert_eq!(ctx.host().title().await.unwrap(), "Search results");
    }

    #[tokio::test]
    async fn test_reduced_motion_without_match_media_is_false() {
        let host = MemoryHost::new()
            .with_reduced_motion(true)
            .with_capabilities(HostCapabilities {
                supports_match_media: false,
                ..Default::default()
            });
        let ctx = TestHelper::context_with(host);
        assert!(!ctx.prefers_reduced_motion().await);
    }

    #[tokio::test]
    async fn test_reduced_motion_mirrors_media_query() {
        let ctx = TestHelper::context_with(MemoryHost::new().with_reduced_motion(true));
        assert!(ctx.prefers_reduced_motion().await);

        let ctx = TestHelper::context_with(MemoryHost::new());
        assert!(!ctx.prefers_reduced_motion().await);
    }

    #[tokio::test]
    async fn test_announce_fills_polite_live_region() {
        let ctx = TestHelper::context("");

        assert!(ctx.announce("hello").await.is_applied());
        assert_eq!(TestHelper::live_region_text(&ctx).await.as_deref(), Some("hello"));
        assert_eq!(ctx.host().frame_count(), 1);

        let region = ctx.element_from_target("[aria-live]").await.unwrap();
        let host = ctx.host();
        assert_eq!(
            host.get_attribute(&region, "role").await.unwrap().as_deref(),
            Some("status")
        );
        assert_eq!(
            host.get_attribute(&region, "aria-atomic").await.unwrap().as_deref(),
            Some("true")
        );
    }

    #[tokio::test]
    async fn test_assertive_announcement_uses_alert_role() {
        let ctx = TestHelper::context("");
        assert!(ctx.announce_with("Saved", Politeness::Assertive).await.is_applied());

        let region = ctx.element_from_target("[aria-live=assertive]").await.unwrap();
        assert_eq!(
            ctx.host().get_attribute(&region, "role").await.unwrap().as_deref(),
            Some("alert")
        );
    }

    #[tokio::test]
    async fn test_live_region_is_removed_after_delay() {
        let mut ctx = TestHelper::context("");
        ctx.config_mut().announce.clear_after_ms = 0;

        assert!(ctx.announce("gone soon").await.is_applied());
        let region = ctx.element_from_target("[aria-live]").await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!ctx.host().is_attached(&region).await);
    }
}
