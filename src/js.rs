//! JavaScript snippets evaluated in the page. Everything goes through
//! [`lookup_expr`] so CSS-rendered and XPath locators share one code path.

use crate::locator::{LocatorEntry, Selector};

pub fn escape_js(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Expression evaluating to the located element, or null when absent.
pub fn lookup_expr(entry: &LocatorEntry) -> String {
    match entry.selector() {
        Selector::Css(css) => format!("document.querySelector('{}')", escape_js(&css)),
        Selector::Xpath(xpath) => format!(
            "document.evaluate('{}',document,null,XPathResult.FIRST_ORDERED_NODE_TYPE,null).singleNodeValue",
            escape_js(&xpath)
        ),
    }
}

/// Visibility probe: false when the element is absent or not rendered.
pub fn visibility_check(entry: &LocatorEntry) -> String {
    format!(
        r#"(function(){{const el={};if(!el)return false;const style=window.getComputedStyle(el);const rect=el.getBoundingClientRect();return style.display!=='none'&&style.visibility!=='hidden'&&parseFloat(style.opacity||'1')>0&&rect.width>0&&rect.height>0}})()"#,
        lookup_expr(entry)
    )
}

/// Text probe: null when the element is absent.
pub fn text_content(entry: &LocatorEntry) -> String {
    format!(
        r#"(function(){{const el={};if(!el)return null;return el.textContent}})()"#,
        lookup_expr(entry)
    )
}

pub fn click_element(entry: &LocatorEntry) -> String {
    format!(
        r#"(function(){{const el={};if(!el)return{{found:false}};el.scrollIntoView({{block:'center',behavior:'instant'}});el.click();return{{found:true}}}})()"#,
        lookup_expr(entry)
    )
}

pub fn fill_element(entry: &LocatorEntry, text: &str) -> String {
    format!(
        r#"(function(){{const el={};if(!el)return{{found:false}};el.scrollIntoView({{block:'center',behavior:'instant'}});el.focus();el.value='{}';el.dispatchEvent(new Event('input',{{bubbles:true}}));el.dispatchEvent(new Event('change',{{bubbles:true}}));return{{found:true}}}})()"#,
        lookup_expr(entry),
        escape_js(text)
    )
}

pub fn clear_value(entry: &LocatorEntry) -> String {
    format!(
        r#"(function(){{const el={};if(el)el.value=''}})()"#,
        lookup_expr(entry)
    )
}

/// Select an option by value. `found` reports the select element, `selected`
/// whether the option matched.
pub fn select_option(entry: &LocatorEntry, value: &str) -> String {
    format!(
        r#"(function(){{const el={};if(!el)return{{found:false,selected:false}};const opt=Array.from(el.options||[]).find(o=>o.value==='{}');if(!opt)return{{found:true,selected:false}};el.value=opt.value;el.dispatchEvent(new Event('change',{{bubbles:true}}));return{{found:true,selected:true}}}})()"#,
        lookup_expr(entry),
        escape_js(value)
    )
}

pub const READY_STATE: &str = "document.readyState";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::Strategy;

    fn entry(strategy: Strategy, value: &str) -> LocatorEntry {
        LocatorEntry {
            key: "k".into(),
            strategy,
            value: value.into(),
        }
    }

    #[test]
    fn test_escape_js() {
        assert_eq!(escape_js("div"), "div");
        assert_eq!(escape_js("div's"), "div\\'s");
        assert_eq!(escape_js("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_lookup_expr_css() {
        let script = lookup_expr(&entry(Strategy::Id, "go"));
        assert_eq!(script, "document.querySelector('#go')");
    }

    #[test]
    fn test_lookup_expr_xpath() {
        let script = lookup_expr(&entry(Strategy::Xpath, "//button[@id='go']"));
        assert!(script.contains("document.evaluate"));
        assert!(script.contains("\\'go\\'"));
    }

    #[test]
    fn test_visibility_check_defaults_false() {
        let script = visibility_check(&entry(Strategy::Css, ".btn"));
        assert!(script.contains("if(!el)return false"));
    }

    #[test]
    fn test_text_content_defaults_null() {
        let script = text_content(&entry(Strategy::Css, ".msg"));
        assert!(script.contains("if(!el)return null"));
    }

    #[test]
    fn test_select_option_escapes_value() {
        let script = select_option(&entry(Strategy::Id, "country"), "it's");
        assert!(script.contains("o.value==='it\\'s'"));
    }
}
