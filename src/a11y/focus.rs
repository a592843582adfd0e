use super::DomContext;
use crate::core::{HostTrait, Target};
use crate::types::{Capability, FocusScrollOutcome, Outcome, SkipReason};
use tracing::{debug, warn};

impl<B: HostTrait + 'static> DomContext<B> {
    /// Focus the element `target` resolves to after the next frame.
    ///
    /// Returns whether an element was found and focus was attempted.
    pub async fn focus_element(&self, target: impl Into<Target<B::ElementHandle>>) -> bool {
        let target = target.into();
        self.wait_for_frame().await;

        match self.element_from_target(target).await {
            Some(element) => {
                self.focus_resolved(&element, self.config().focus.prevent_scroll)
                    .await;
                true
            }
            None => {
                debug!("nothing to focus");
                false
            }
        }
    }

    /// Restore focus after the view changed underneath it: `focus_target`
    /// when it resolves, otherwise `primary`.
    pub async fn reset_focus(
        &self,
        primary: impl Into<Target<B::ElementHandle>>,
        focus_target: Option<Target<B::ElementHandle>>,
    ) -> FocusScrollOutcome {
        let primary = primary.into();
        self.wait_for_frame().await;

        let mut element = None;
        if let Some(target) = focus_target {
            element = self.element_from_target(target).await;
        }
        if element.is_none() {
            element = self.element_from_target(primary).await;
        }
        self.focus_then_scroll(element.as_ref(), element.as_ref(), false)
            .await
    }

    /// [`reset_focus`](Self::reset_focus) aimed at the element a location's
    /// fragment names. `location` is a bare hash or an absolute URL; an empty
    /// location means there is no fragment to honour.
    pub async fn reset_focus_for_location(
        &self,
        primary: impl Into<Target<B::ElementHandle>>,
        location: &str,
    ) -> FocusScrollOutcome {
        let primary = primary.into();
        self.wait_for_frame().await;

        let from_location = if location.is_empty() {
            None
        } else if location.starts_with('#') {
            self.element_from_hash(location).await
        } else {
            self.element_from_url(location).await
        };

        let element = match from_location {
            Some(element) => Some(element),
            None => self.element_from_target(primary).await,
        };
        self.focus_then_scroll(element.as_ref(), element.as_ref(), false)
            .await
    }

    /// Move focus to the first invalid control of a form and bring its field
    /// group into view.
    pub async fn focus_invalid_form(
        &self,
        form: impl Into<Target<B::ElementHandle>>,
        invalid_selector: &str,
        group_selector: &str,
    ) -> Outcome {
        let form = form.into();
        self.wait_for_frame().await;

        let form = match self.element_from_target(form).await {
            Some(form) => form,
            None => return Outcome::skipped(SkipReason::FormNotFound),
        };

        let invalid = match self
            .host()
            .query_selector(invalid_selector, Some(&form))
            .await
        {
            Ok(Some(invalid)) => invalid,
            Ok(None) => return Outcome::skipped(SkipReason::InvalidElementNotFound),
            Err(e) => {
                debug!("invalid selector {:?} did not resolve: {}", invalid_selector, e);
                return Outcome::skipped(SkipReason::InvalidElementNotFound);
            }
        };

        if !self.host().capabilities().supports_closest {
            debug!("host cannot look up ancestors, leaving focus alone");
            return Outcome::skipped(SkipReason::CapabilityMissing(Capability::Closest));
        }
        let group = match self.host().closest(&invalid, group_selector).await {
            Ok(group) => group,
            Err(e) if e.is_unsupported() => {
                return Outcome::skipped(SkipReason::CapabilityMissing(Capability::Closest));
            }
            Err(e) => {
                debug!("group selector {:?} did not resolve: {}", group_selector, e);
                None
            }
        };

        let scroll_target = group.unwrap_or_else(|| invalid.clone());
        self.focus_then_scroll(Some(&invalid), Some(&scroll_target), false)
            .await
            .focus
    }

    /// Focus one element and scroll another (or the same) into view when it
    /// is off screen. Both targets resolve independently.
    pub async fn focus_and_scroll_into_view_if_required(
        &self,
        focus_target: impl Into<Target<B::ElementHandle>>,
        scroll_target: impl Into<Target<B::ElementHandle>>,
        smooth: bool,
    ) -> FocusScrollOutcome {
        let focus_target = focus_target.into();
        let scroll_target = scroll_target.into();
        self.wait_for_frame().await;

        let focus = self.element_from_target(focus_target).await;
        let scroll = self.element_from_target(scroll_target).await;
        self.focus_then_scroll(focus.as_ref(), scroll.as_ref(), smooth)
            .await
    }

    async fn focus_then_scroll(
        &self,
        focus: Option<&B::ElementHandle>,
        scroll: Option<&B::ElementHandle>,
        smooth: bool,
    ) -> FocusScrollOutcome {
        // Scrolling is handled below, so focus must not jump the page.
        let focus = match focus {
            Some(element) => self.focus_resolved(element, true).await,
            None => Outcome::skipped(SkipReason::TargetNotFound),
        };
        let scroll = match scroll {
            Some(element) => self.scroll_into_view_if_required(element, smooth).await,
            None => Outcome::skipped(SkipReason::TargetNotFound),
        };
        FocusScrollOutcome { focus, scroll }
    }

    async fn focus_resolved(&self, element: &B::ElementHandle, prevent_scroll: bool) -> Outcome {
        if self.config().focus.make_focusable {
            self.ensure_focusable(element).await;
        }
        match self.host().focus(element, prevent_scroll).await {
            Ok(()) => Outcome::Applied,
            Err(e) => {
                warn!("focusing {:?} suppressed: {}", element, e);
                Outcome::suppressed(e)
            }
        }
    }

    /// Give a non-focusable element `tabindex="-1"` so script can focus it.
    /// An author supplied tabindex is left untouched.
    async fn ensure_focusable(&self, element: &B::ElementHandle) {
        let host = self.host();
        match host.is_focusable(element).await {
            Ok(true) => return,
            Ok(false) => {}
            Err(e) => {
                debug!("focusability of {:?} unknown: {}", element, e);
                return;
            }
        }

        match host.get_attribute(element, "tabindex").await {
            Ok(None) => {
                if let Err(e) = host.set_attribute(element, "tabindex", "-1").await {
                    debug!("could not make {:?} focusable: {}", element, e);
                }
            }
            Ok(Some(_)) => {}
            Err(e) => debug!("could not read tabindex of {:?}: {}", element, e),
        }
    }

    async fn wait_for_frame(&self) {
        if let Err(e) = self.host().next_frame().await {
            debug!("frame wait failed, continuing: {}", e);
        }
    }
}
