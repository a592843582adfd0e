use super::DomContext;
use crate::core::HostTrait;
use crate::types::{Outcome, ScrollBehavior, ScrollOptions, ScrollPosition, SkipReason};
use tracing::{debug, warn};

/// Geometric viewport check: the element's box lies fully inside the
/// viewport. Missing geometry counts as not visible.
pub async fn is_in_viewport<B: HostTrait>(host: &B, element: &B::ElementHandle) -> bool {
    let rect = match host.bounding_rect(element).await {
        Ok(rect) => rect,
        Err(e) => {
            debug!("no bounding rect for {:?}: {}", element, e);
            return false;
        }
    };
    match host.viewport().await {
        Ok(viewport) => rect.is_within(&viewport),
        Err(e) => {
            debug!("no viewport size: {}", e);
            false
        }
    }
}

impl<B: HostTrait + 'static> DomContext<B> {
    pub async fn scroll_into_view(&self, element: &B::ElementHandle, smooth: bool) -> Outcome {
        let options = ScrollOptions {
            behavior: self.scroll_behavior(smooth).await,
            block: self.config().scroll.block,
        };

        match self.host().scroll_into_view(element, options).await {
            Ok(()) => Outcome::Applied,
            Err(e) => {
                warn!("scroll into view of {:?} suppressed: {}", element, e);
                Outcome::suppressed(e)
            }
        }
    }

    pub async fn set_scroll_position(&self, position: ScrollPosition, smooth: bool) -> Outcome {
        let behavior = self.scroll_behavior(smooth).await;
        match self.host().scroll_to(position, behavior).await {
            Ok(()) => Outcome::Applied,
            Err(e) => {
                warn!("scroll to {:?} suppressed: {}", position, e);
                Outcome::suppressed(e)
            }
        }
    }

    pub async fn scroll_into_view_if_required(
        &self,
        element: &B::ElementHandle,
        smooth: bool,
    ) -> Outcome {
        if is_in_viewport(self.host(), element).await {
            return Outcome::skipped(SkipReason::AlreadyInView);
        }
        self.scroll_into_view(element, smooth).await
    }

    /// [`scroll_into_view_if_required`](Self::scroll_into_view_if_required)
    /// with a caller supplied visibility predicate.
    pub async fn scroll_into_view_if_required_with<F>(
        &self,
        element: &B::ElementHandle,
        smooth: bool,
        is_in_viewport: F,
    ) -> Outcome
    where
        F: Fn(&B::ElementHandle) -> bool,
    {
        if is_in_viewport(element) {
            return Outcome::skipped(SkipReason::AlreadyInView);
        }
        self.scroll_into_view(element, smooth).await
    }

    /// Smooth only when asked for, supported and not vetoed by a reduced
    /// motion preference.
    pub(crate) async fn scroll_behavior(&self, smooth: bool) -> ScrollBehavior {
        if !smooth {
            return ScrollBehavior::Auto;
        }
        if !self.host().capabilities().supports_smooth_scroll {
            debug!("host cannot scroll smoothly, scrolling instantly");
            return ScrollBehavior::Auto;
        }
        if self.config().scroll.respect_reduced_motion && self.prefers_reduced_motion().await {
            debug!("reduced motion preferred, scrolling instantly");
            return ScrollBehavior::Auto;
        }
        ScrollBehavior::Smooth
    }
}
