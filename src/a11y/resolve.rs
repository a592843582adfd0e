use super::DomContext;
use crate::core::{HostTrait, Target};
use percent_encoding::percent_decode_str;
use serde_json::Value;
use tracing::debug;
use url::Url;

impl<B: HostTrait + 'static> DomContext<B> {
    /// Resolve a URL fragment the way fragment navigation does.
    ///
    /// `""`, `"#"` and `"#top"` name the document root. Anything else must
    /// start with `#`; the rest is looked up as an element id, first verbatim
    /// and then percent-decoded.
    pub async fn element_from_hash(&self, hash: &str) -> Option<B::ElementHandle> {
        if hash.is_empty() {
            return self.document_root().await;
        }
        let fragment = hash.strip_prefix('#')?;
        if fragment.is_empty() || fragment.eq_ignore_ascii_case("top") {
            return self.document_root().await;
        }

        if let Some(element) = self.element_with_id(fragment).await {
            return Some(element);
        }

        let decoded = percent_decode_str(fragment).decode_utf8().ok()?;
        if decoded == fragment {
            return None;
        }
        if decoded.eq_ignore_ascii_case("top") {
            return self.document_root().await;
        }
        self.element_with_id(&decoded).await
    }

    /// Like [`element_from_hash`](Self::element_from_hash) for untyped input.
    /// `None` stands for an undefined value; anything but a string resolves
    /// to nothing.
    pub async fn element_from_hash_value(&self, value: Option<&Value>) -> Option<B::ElementHandle> {
        match value {
            Some(Value::String(hash)) => self.element_from_hash(hash).await,
            _ => None,
        }
    }

    /// Resolve the fragment of an absolute URL.
    pub async fn element_from_url(&self, href: &str) -> Option<B::ElementHandle> {
        let url = match Url::parse(href) {
            Ok(url) => url,
            Err(e) => {
                debug!("not resolving fragment of unparseable url {:?}: {}", href, e);
                return None;
            }
        };
        let fragment = url.fragment()?;
        self.element_from_hash(&format!("#{}", fragment)).await
    }

    pub async fn element_from_target(
        &self,
        target: impl Into<Target<B::ElementHandle>>,
    ) -> Option<B::ElementHandle> {
        match target.into() {
            Target::Element(element) => Some(element),
            Target::Selector(selector) => match self.host().query_selector(&selector, None).await
            {
                Ok(found) => found,
                Err(e) => {
                    debug!("selector {:?} did not resolve: {}", selector, e);
                    None
                }
            },
        }
    }

    pub(crate) async fn document_root(&self) -> Option<B::ElementHandle> {
        match self.host().document_element().await {
            Ok(root) => Some(root),
            Err(e) => {
                debug!("host has no document element: {}", e);
                None
            }
        }
    }

    async fn element_with_id(&self, id: &str) -> Option<B::ElementHandle> {
        self.host().element_by_id(id).await.unwrap_or_else(|e| {
            debug!("id lookup for {:?} failed: {}", id, e);
            None
        })
    }
}
