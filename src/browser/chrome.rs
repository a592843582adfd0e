use super::scripts;
use crate::core::config::HostConfig;
use crate::core::{HostCapabilities, HostTrait};
use crate::errors::{DomError, Result};
use crate::types::{
    Capability, ElementInfo, ElementRect, ScrollBehavior, ScrollOptions, ScrollPosition, Viewport,
};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Deserialize;
use serde_json::Value;
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Element handle inside a Chrome tab: the value of the marker attribute the
/// host stamps on every element it hands out.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChromeElement(String);

impl ChromeElement {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Document host backed by a headless Chrome tab
pub struct ChromeHost {
    _browser: Browser,
    tab: Arc<Tab>,
    capabilities: HostCapabilities,
    prelude: String,
}

#[derive(Debug, Deserialize)]
struct ScriptReply {
    ok: bool,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ChromeHost {
    pub async fn launch(config: &HostConfig) -> Result<Self> {
        let window_size_arg = format!(
            "--window-size={},{}",
            config.viewport.width, config.viewport.height
        );
        let user_agent_arg = config
            .user_agent
            .as_ref()
            .map(|ua| format!("--user-agent={}", ua));

        let mut args = vec![
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new(&window_size_arg),
        ];
        if let Some(ref ua_arg) = user_agent_arg {
            args.push(OsStr::new(ua_arg));
        }
        for arg in &config.args {
            args.push(OsStr::new(arg));
        }

        let launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .args(args)
            .idle_browser_timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| DomError::LaunchFailed(e.to_string()))?;

        let browser =
            Browser::new(launch_options).map_err(|e| DomError::LaunchFailed(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| DomError::LaunchFailed(e.to_string()))?;

        let mut host = Self {
            _browser: browser,
            tab,
            capabilities: HostCapabilities::default(),
            prelude: scripts::prelude(&uuid::Uuid::new_v4().simple().to_string()),
        };
        host.capabilities = host.detect_capabilities().await?;
        Ok(host)
    }

    pub async fn navigate(&self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| DomError::NavigationFailed(e.to_string()))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| DomError::NavigationFailed(e.to_string()))?;
        Ok(())
    }

    /// Load an HTML document straight into the tab.
    pub async fn set_content(&self, html: &str) -> Result<()> {
        let url = format!(
            "data:text/html;charset=utf-8,{}",
            utf8_percent_encode(html, NON_ALPHANUMERIC)
        );
        self.navigate(&url).await
    }

    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }

    async fn detect_capabilities(&self) -> Result<HostCapabilities> {
        let value = self.call(scripts::DETECT_CAPABILITIES, false).await?;
        Ok(HostCapabilities {
            supports_closest: flag(&value, "closest"),
            supports_match_media: flag(&value, "matchMedia"),
            supports_smooth_scroll: flag(&value, "smoothScroll"),
        })
    }

    /// Run `body` as a function in the page. Page-side exceptions come back as
    /// typed errors.
    async fn call(&self, body: &str, await_promise: bool) -> Result<Value> {
        let script = scripts::wrap(&self.prelude, body, await_promise);
        let result = self
            .tab
            .evaluate(&script, await_promise)
            .map_err(DomError::script)?;

        let raw = result
            .value
            .as_ref()
            .and_then(Value::as_str)
            .ok_or_else(|| DomError::script("page script returned no reply"))?;
        let reply: ScriptReply = serde_json::from_str(raw)?;
        if reply.ok {
            return Ok(reply.value);
        }

        let message = reply.message.unwrap_or_default();
        Err(match reply.name.as_deref() {
            Some("SyntaxError") => DomError::InvalidSelector(message),
            Some("NotFound") => DomError::ElementNotFound(message),
            Some("SmoothScroll") => DomError::SmoothScrollFailed(message),
            Some("Unsupported") => match message.as_str() {
                "closest" => DomError::Unsupported(Capability::Closest),
                "matchMedia" => DomError::Unsupported(Capability::MatchMedia),
                _ => DomError::Unsupported(Capability::SmoothScroll),
            },
            _ => DomError::ScriptFailed(message),
        })
    }

    async fn call_for_handle(&self, body: &str) -> Result<Option<ChromeElement>> {
        match self.call(body, false).await? {
            Value::Null => Ok(None),
            Value::String(handle) => Ok(Some(ChromeElement(handle))),
            other => Err(DomError::script(format!("expected element handle, got {}", other))),
        }
    }
}

fn flag(value: &Value, key: &str) -> bool {
    value.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn js(value: &str) -> String {
    // A JSON string literal is a valid JavaScript string literal.
    Value::String(value.to_string()).to_string()
}

#[async_trait]
impl HostTrait for ChromeHost {
    type ElementHandle = ChromeElement;

    fn capabilities(&self) -> &HostCapabilities {
        &self.capabilities
    }

    async fn document_element(&self) -> Result<ChromeElement> {
        self.call_for_handle("return handleOf(document.documentElement);")
            .await?
            .ok_or_else(|| DomError::ElementNotFound("document element".to_string()))
    }

    async fn body(&self) -> Result<Option<ChromeElement>> {
        self.call_for_handle("return handleOf(document.body);").await
    }

    async fn element_by_id(&self, id: &str) -> Result<Option<ChromeElement>> {
        self.call_for_handle(&format!(
            "return handleOf(document.getElementById({}));",
            js(id)
        ))
        .await
    }

    async fn query_selector(
        &self,
        selector: &str,
        scope: Option<&ChromeElement>,
    ) -> Result<Option<ChromeElement>> {
        let root = match scope {
            Some(scope) => format!("find({})", js(scope.as_str())),
            None => "document".to_string(),
        };
        self.call_for_handle(&format!(
            "return handleOf({}.querySelector({}));",
            root,
            js(selector)
        ))
        .await
    }

    async fn closest(&self, element: &ChromeElement, selector: &str) -> Result<Option<ChromeElement>> {
        self.call_for_handle(&format!(
            r#"const el = find({});
            if (typeof el.closest !== 'function') throw failure('Unsupported', 'closest');
            return handleOf(el.closest({}));"#,
            js(element.as_str()),
            js(selector)
        ))
        .await
    }

    async fn get_attribute(&self, element: &ChromeElement, name: &str) -> Result<Option<String>> {
        let value = self
            .call(
                &format!(
                    "return find({}).getAttribute({});",
                    js(element.as_str()),
                    js(name)
                ),
                false,
            )
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn set_attribute(&self, element: &ChromeElement, name: &str, value: &str) -> Result<()> {
        self.call(
            &format!(
                "find({}).setAttribute({}, {}); return null;",
                js(element.as_str()),
                js(name),
                js(value)
            ),
            false,
        )
        .await?;
        Ok(())
    }

    async fn is_focusable(&self, element: &ChromeElement) -> Result<bool> {
        let value = self
            .call(
                &format!(
                    r#"const el = find({});
                    if (!el.isConnected || el.disabled) return false;
                    return el === document.body || el.tabIndex >= 0 || el.hasAttribute('tabindex');"#,
                    js(element.as_str())
                ),
                false,
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn focus(&self, element: &ChromeElement, prevent_scroll: bool) -> Result<()> {
        self.call(
            &format!(
                "find({}).focus({{ preventScroll: {} }}); return null;",
                js(element.as_str()),
                prevent_scroll
            ),
            false,
        )
        .await?;
        Ok(())
    }

    async fn active_element(&self) -> Result<Option<ChromeElement>> {
        self.call_for_handle("return handleOf(document.activeElement);")
            .await
    }

    async fn scroll_into_view(&self, element: &ChromeElement, options: ScrollOptions) -> Result<()> {
        self.call(
            &format!(
                r#"const el = find({});
                try {{
                    el.scrollIntoView({{ behavior: {}, block: {} }});
                }} catch (e) {{
                    throw failure({}, String(e && e.message || e));
                }}
                return null;"#,
                js(element.as_str()),
                js(options.behavior.as_str()),
                js(options.block.as_str()),
                js(failure_name(options.behavior))
            ),
            false,
        )
        .await?;
        Ok(())
    }

    async fn scroll_to(&self, position: ScrollPosition, behavior: ScrollBehavior) -> Result<()> {
        self.call(
            &format!(
                r#"try {{
                    window.scrollTo({{ left: {}, top: {}, behavior: {} }});
                }} catch (e) {{
                    throw failure({}, String(e && e.message || e));
                }}
                return null;"#,
                position.x,
                position.y,
                js(behavior.as_str()),
                js(failure_name(behavior))
            ),
            false,
        )
        .await?;
        Ok(())
    }

    async fn bounding_rect(&self, element: &ChromeElement) -> Result<ElementRect> {
        let value = self
            .call(
                &format!(
                    r#"const r = find({}).getBoundingClientRect();
                    return {{ x: r.x, y: r.y, width: r.width, height: r.height }};"#,
                    js(element.as_str())
                ),
                false,
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn viewport(&self) -> Result<Viewport> {
        let value = self
            .call(
                "return { width: window.innerWidth, height: window.innerHeight };",
                false,
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn title(&self) -> Result<String> {
        let value = self.call("return document.title;", false).await?;
        Ok(value.as_str().unwrap_or("").to_string())
    }

    async fn set_title(&self, title: &str) -> Result<()> {
        self.call(
            &format!("document.title = {}; return null;", js(title)),
            false,
        )
        .await?;
        Ok(())
    }

    async fn match_media(&self, query: &str) -> Result<bool> {
        let value = self
            .call(
                &format!(
                    r#"if (typeof window.matchMedia !== 'function') throw failure('Unsupported', 'matchMedia');
                    return window.matchMedia({}).matches;"#,
                    js(query)
                ),
                false,
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn create_element(&self, tag_name: &str) -> Result<ChromeElement> {
        self.call_for_handle(&format!(
            r#"const el = document.createElement({});
            const handle = handleOf(el);
            created().set(handle, el);
            return handle;"#,
            js(tag_name)
        ))
        .await?
        .ok_or_else(|| DomError::script("createElement returned nothing"))
    }

    async fn append_child(&self, parent: &ChromeElement, child: &ChromeElement) -> Result<()> {
        self.call(
            &format!(
                "find({}).appendChild(find({})); return null;",
                js(parent.as_str()),
                js(child.as_str())
            ),
            false,
        )
        .await?;
        Ok(())
    }

    async fn set_text_content(&self, element: &ChromeElement, text: &str) -> Result<()> {
        self.call(
            &format!(
                "find({}).textContent = {}; return null;",
                js(element.as_str()),
                js(text)
            ),
            false,
        )
        .await?;
        Ok(())
    }

    async fn remove_element(&self, element: &ChromeElement) -> Result<()> {
        self.call(
            &format!(
                r#"const handle = {};
                find(handle).remove();
                created().delete(handle);
                return null;"#,
                js(element.as_str())
            ),
            false,
        )
        .await?;
        Ok(())
    }

    async fn element_info(&self, element: &ChromeElement) -> Result<ElementInfo> {
        let value = self
            .call(
                &format!("return describe(find({}));", js(element.as_str())),
                false,
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn next_frame(&self) -> Result<()> {
        self.call(scripts::NEXT_FRAME, true).await?;
        debug!("frame rendered");
        Ok(())
    }
}

fn failure_name(behavior: ScrollBehavior) -> &'static str {
    match behavior {
        ScrollBehavior::Smooth => "SmoothScroll",
        ScrollBehavior::Auto => "Error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a11y::DomContext;
    use crate::core::Config;

    #[test]
    fn test_js_literals_are_escaped() {
        assert_eq!(js("a'b\"c"), r#""a'b\"c""#);
        assert_eq!(js("line\nbreak"), r#""line\nbreak""#);
    }

    #[test]
    fn test_failure_names_follow_behavior() {
        assert_eq!(failure_name(ScrollBehavior::Smooth), "SmoothScroll");
        assert_eq!(failure_name(ScrollBehavior::Auto), "Error");
    }

    #[tokio::test]
    #[ignore = "requires a local Chrome"]
    async fn test_chrome_focus_round_trip() {
        let config = Config::default();
        let host = ChromeHost::launch(&config.host).await.unwrap();
        host.set_content(r#"<main id="main"><h1>Hi</h1></main><form id="f"><input id="bad" aria-invalid="true"></form>"#)
            .await
            .unwrap();
        let ctx = DomContext::new(host, config);

        assert!(ctx.element_from_target("a[").await.is_none());
        assert!(ctx.focus_element("#main").await);
        let active = ctx.host().active_element().await.unwrap().unwrap();
        let info = ctx.host().element_info(&active).await.unwrap();
        assert_eq!(info.element_id.as_deref(), Some("main"));

        let outcome = ctx
            .focus_invalid_form("#f", "[aria-invalid=true]", ".group")
            .await;
        assert!(outcome.is_applied());
        assert!(ctx.announce("done").await.is_applied());
    }
}
