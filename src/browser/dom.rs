//! Small injected-JS helpers over a live page.
//!
//! The target UI has no stable identifiers and intercepts native events
//! unpredictably, so interaction goes through evaluated JS: query, check
//! visibility, click. Every helper here is advisory — a miss returns a
//! falsy/empty value and the caller decides whether that matters.

use chromiumoxide::Page;
use tracing::debug;

/// Evaluate JS that yields a boolean. Any evaluation failure reads as `false`.
pub async fn eval_bool(page: &Page, js: impl Into<String>) -> bool {
    page.evaluate(js.into())
        .await
        .ok()
        .and_then(|v| v.into_value::<bool>().ok())
        .unwrap_or(false)
}

/// Evaluate JS that yields a number. Failure reads as 0.
pub async fn eval_u32(page: &Page, js: impl Into<String>) -> u32 {
    page.evaluate(js.into())
        .await
        .ok()
        .and_then(|v| v.into_value::<u32>().ok())
        .unwrap_or(0)
}

/// Click every currently-visible element matching `selector`; returns how
/// many were clicked.
pub async fn click_all_visible(page: &Page, selector: &str) -> u32 {
    let js = format!(
        r#"(() => {{
            let clicked = 0;
            for (const el of document.querySelectorAll({sel})) {{
                const style = window.getComputedStyle(el);
                if (style.display === 'none' || style.visibility === 'hidden') continue;
                if (el.offsetParent === null && style.position !== 'fixed') continue;
                el.click();
                clicked++;
            }}
            return clicked;
        }})()"#,
        sel = js_str(selector)
    );
    eval_u32(page, js).await
}

/// Click the first button/link whose trimmed text equals `label`.
pub async fn click_button_with_text(page: &Page, label: &str) -> bool {
    let js = format!(
        r#"(() => {{
            const nodes = document.querySelectorAll("button, a.button--wide.button--lg, a[role='button']");
            for (const el of nodes) {{
                if ((el.textContent || '').trim() === {label}) {{ el.click(); return true; }}
            }}
            return false;
        }})()"#,
        label = js_str(label)
    );
    eval_bool(page, js).await
}

/// True when at least one element matches `selector`.
pub async fn element_exists(page: &Page, selector: &str) -> bool {
    let js = format!("!!document.querySelector({})", js_str(selector));
    eval_bool(page, js).await
}

/// Outer HTML of the first element matching `selector`.
pub async fn outer_html(page: &Page, selector: &str) -> Option<String> {
    let js = format!(
        "(() => {{ const el = document.querySelector({}); return el ? el.outerHTML : null; }})()",
        js_str(selector)
    );
    page.evaluate(js)
        .await
        .ok()
        .and_then(|v| v.into_value::<Option<String>>().ok())
        .flatten()
}

/// Visible text of the first element matching any of `selectors`, in order.
pub async fn text_of_first(page: &Page, selectors: &[&str]) -> Option<String> {
    for selector in selectors {
        let js = format!(
            "(() => {{ const el = document.querySelector({}); return el ? el.innerText : null; }})()",
            js_str(selector)
        );
        let text = page
            .evaluate(js)
            .await
            .ok()
            .and_then(|v| v.into_value::<Option<String>>().ok())
            .flatten();
        if let Some(t) = text {
            let t = t.trim().to_string();
            if !t.is_empty() {
                return Some(t);
            }
        }
    }
    None
}

/// Click `inner` inside the `idx`-th element matching `container`.
/// Used to expand one result row at a time.
pub async fn click_nth_inner(page: &Page, container: &str, idx: usize, inner: &str) -> bool {
    let js = format!(
        r#"(() => {{
            const rows = document.querySelectorAll({container});
            if ({idx} >= rows.length) return false;
            const btn = rows[{idx}].querySelector({inner});
            if (!btn) return false;
            btn.click();
            return true;
        }})()"#,
        container = js_str(container),
        inner = js_str(inner),
        idx = idx
    );
    eval_bool(page, js).await
}

/// Fill the first input matching any selector in `selectors`, falling back to
/// the document's `fallback_index`-th input. Dispatches input/change events so
/// framework-bound fields pick the value up.
pub async fn fill_input(
    page: &Page,
    selectors: &[&str],
    fallback_index: usize,
    value: &str,
) -> bool {
    let selector_list = selectors
        .iter()
        .map(|s| js_str(s))
        .collect::<Vec<_>>()
        .join(", ");
    let js = format!(
        r#"(() => {{
            let el = null;
            for (const sel of [{selector_list}]) {{
                el = document.querySelector(sel);
                if (el) break;
            }}
            if (!el) el = document.querySelectorAll('input')[{fallback_index}] || null;
            if (!el) return false;
            el.focus();
            el.value = {value};
            el.dispatchEvent(new Event('input', {{ bubbles: true }}));
            el.dispatchEvent(new Event('change', {{ bubbles: true }}));
            return true;
        }})()"#,
        selector_list = selector_list,
        fallback_index = fallback_index,
        value = js_str(value)
    );
    let ok = eval_bool(page, js).await;
    if !ok {
        debug!("no input matched {:?} (fallback #{})", selectors, fallback_index);
    }
    ok
}

/// Click the page body — nudges client-side validation on forms that only
/// re-check on blur.
pub async fn click_body(page: &Page) {
    let _ = page.evaluate("document.body && document.body.click()").await;
}

/// Dispatch an Escape keydown at the document. Fallback for closing a modal
/// whose close control has gone missing.
pub async fn press_escape(page: &Page) {
    let js = "document.dispatchEvent(new KeyboardEvent('keydown', \
              { key: 'Escape', keyCode: 27, bubbles: true }))";
    let _ = page.evaluate(js).await;
}

/// JSON-escape a string for embedding into evaluated JS.
fn js_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_str_escapes_quotes_and_unicode() {
        assert_eq!(js_str("a'b\"c"), r#""a'b\"c""#);
        assert_eq!(js_str("Найти"), "\"Найти\"");
    }
}
