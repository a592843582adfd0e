//! Page-side JavaScript used by the Chrome host.
//!
//! Every call is wrapped so the page replies with a JSON string of the form
//! `{ ok, value }` or `{ ok: false, name, message }`.

pub const HANDLE_ATTRIBUTE: &str = "data-dom-a11y-handle";

pub const DETECT_CAPABILITIES: &str = r#"return {
    closest: typeof Element.prototype.closest === 'function',
    matchMedia: typeof window.matchMedia === 'function',
    smoothScroll: 'scrollBehavior' in document.documentElement.style
};"#;

// Headless tabs can throttle animation frames, so a short timer also resolves.
pub const NEXT_FRAME: &str = r#"return new Promise((resolve) => {
    requestAnimationFrame(() => resolve(true));
    setTimeout(() => resolve(true), 100);
});"#;

/// Helpers shared by every call. `session` namespaces handles so two hosts
/// driving the same page never collide.
pub fn prelude(session: &str) -> String {
    format!(
        r#"const ATTR = '{attr}';
        const failure = (name, message) => Object.assign(new Error(message), {{ name }});
        const created = () => (window.__domA11yCreated = window.__domA11yCreated || new Map());
        const handleOf = (el) => {{
            if (!el) return null;
            let handle = el.getAttribute(ATTR);
            if (!handle) {{
                window.__domA11yNext = (window.__domA11yNext || 0) + 1;
                handle = '{session}-' + window.__domA11yNext;
                el.setAttribute(ATTR, handle);
            }}
            return handle;
        }};
        const find = (handle) => {{
            const el = document.querySelector('[' + ATTR + '="' + CSS.escape(handle) + '"]')
                || created().get(handle);
            if (!el) throw failure('NotFound', handle);
            return el;
        }};
        const describe = (el) => {{
            const attributes = {{}};
            for (const attr of el.attributes) {{
                if (attr.name !== ATTR) attributes[attr.name] = attr.value;
            }}
            const text = (el.textContent || '').trim();
            const r = el.getBoundingClientRect();
            return {{
                tag_name: el.tagName.toLowerCase(),
                element_id: el.getAttribute('id'),
                class_name: el.getAttribute('class'),
                text_content: text.length ? text : null,
                attributes,
                rect: {{ x: r.x, y: r.y, width: r.width, height: r.height }}
            }};
        }};"#,
        attr = HANDLE_ATTRIBUTE,
        session = session
    )
}

pub fn wrap(prelude: &str, body: &str, await_promise: bool) -> String {
    let (keyword, call) = if await_promise {
        ("async ", "await (async function() { BODY })()")
    } else {
        ("", "(function() { BODY })()")
    };
    format!(
        r#"({keyword}function() {{
            {prelude}
            try {{
                const value = {call};
                return JSON.stringify({{ ok: true, value: value === undefined ? null : value }});
            }} catch (e) {{
                return JSON.stringify({{
                    ok: false,
                    name: e && e.name ? String(e.name) : 'Error',
                    message: String(e && e.message !== undefined ? e.message : e)
                }});
            }}
        }})()"#,
        keyword = keyword,
        prelude = prelude,
        call = call.replace("BODY", body)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_namespaces_handles() {
        let prelude = prelude("abc123");
        assert!(prelude.contains("'abc123-'"));
        assert!(prelude.contains(HANDLE_ATTRIBUTE));
    }

    #[test]
    fn test_wrap_awaits_only_when_asked() {
        let sync = wrap("", "return 1;", false);
        assert!(sync.starts_with("(function()"));
        assert!(!sync.contains("await"));

        let promised = wrap("", NEXT_FRAME, true);
        assert!(promised.starts_with("(async function()"));
        assert!(promised.contains("await (async function() { return new Promise"));
    }
}
