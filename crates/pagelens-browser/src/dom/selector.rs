//! CSS selector synthesis for re-locating snapshot elements.

use std::sync::LazyLock;

use regex::Regex;

use super::node::{DomTree, ElementData, NodeId};

/// Attributes stable enough to narrow a structural selector.
const STABLE_ATTRIBUTES: &[&str] = &[
    "id",
    "name",
    "type",
    "placeholder",
    "aria-label",
    "aria-labelledby",
    "aria-describedby",
    "role",
    "for",
    "autocomplete",
    "required",
    "readonly",
    "alt",
    "title",
    "src",
    "href",
    "target",
];

/// Test hooks, only used on request.
const DYNAMIC_ATTRIBUTES: &[&str] = &["data-id", "data-qa", "data-cy", "data-testid"];

static VALID_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_-]*$").expect("static regex"));

/// Ids minted by frameworks on every render.
static GENERATED_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(ember\d+|:r[0-9a-z]*:|react-|radix-|headlessui-|mui-\d|yui_|ext-gen|rc[-_]\w*\d)|\d{5,}|^[0-9a-f]{8}-[0-9a-f]{4}-",
    )
    .expect("static regex")
});

/// Whether an id looks framework-generated.
pub fn is_generated_id(id: &str) -> bool {
    id.chars().all(|c| c.is_ascii_digit()) || GENERATED_ID.is_match(id)
}

/// Turn a positional xpath into an equivalent child-combinator CSS selector.
///
/// `/html/body/div[2]/a` becomes `html > body > div:nth-of-type(2) > a`.
pub fn convert_simple_xpath_to_css_selector(xpath: &str) -> String {
    let mut parts = Vec::new();

    for part in xpath.trim_start_matches('/').split('/') {
        if part.is_empty() {
            continue;
        }

        let (base, predicates) = match part.find('[') {
            Some(pos) => part.split_at(pos),
            None => (part, ""),
        };
        let mut css = base.rsplit(':').next().unwrap_or(base).to_string();

        for predicate in predicates.split(']') {
            let predicate = predicate.trim_start_matches('[').trim();
            if predicate.is_empty() {
                continue;
            }
            if let Ok(position) = predicate.parse::<usize>() {
                css.push_str(&format!(":nth-of-type({})", position));
            } else if predicate == "last()" {
                css.push_str(":last-of-type");
            } else if predicate.contains("position()") && predicate.contains(">1") {
                css.push_str(":nth-of-type(n+2)");
            }
        }

        parts.push(css);
    }

    parts.join(" > ")
}

/// Structural selector narrowed by classes and stable attributes.
///
/// Falls back to `tag[highlight_index='N']` when no structural path exists.
pub fn enhanced_css_selector_for_element(
    tree: &DomTree,
    id: NodeId,
    include_dynamic_attributes: bool,
) -> String {
    match tree.element(id) {
        Some(element) => selector_for(element, include_dynamic_attributes),
        None => "*".to_string(),
    }
}

pub(crate) fn selector_for(element: &ElementData, include_dynamic_attributes: bool) -> String {
    let mut selector = convert_simple_xpath_to_css_selector(&element.xpath);
    if selector.is_empty() {
        return fallback(element);
    }

    if let Some(classes) = element.attribute("class") {
        for class in classes.split_whitespace() {
            if VALID_CLASS.is_match(class) {
                selector.push('.');
                selector.push_str(class);
            }
        }
    }

    let dynamic: &[&str] = if include_dynamic_attributes {
        DYNAMIC_ATTRIBUTES
    } else {
        &[]
    };

    for &name in STABLE_ATTRIBUTES.iter().chain(dynamic) {
        let Some(value) = element.attribute(name) else {
            continue;
        };
        if name == "id" && is_generated_id(value) {
            continue;
        }

        let name = name.replace(':', r"\:");
        if value.is_empty() {
            selector.push_str(&format!("[{}]", name));
        } else if value.contains(['\n', '\r', '\t']) {
            let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
            selector.push_str(&format!("[{}*=\"{}\"]", name, escape(&collapsed)));
        } else {
            selector.push_str(&format!("[{}=\"{}\"]", name, escape(value)));
        }
    }

    selector
}

fn escape(value: &str) -> String {
    value.replace('\\', r"\\").replace('"', "\\\"")
}

fn fallback(element: &ElementData) -> String {
    let tag = if element.tag_name.is_empty() {
        "*"
    } else {
        element.tag_name.as_str()
    };
    match element.highlight_index {
        Some(index) => format!("{}[highlight_index='{}']", tag, index),
        None => tag.to_string(),
    }
}

#[cfg(test)]
#[path = "selector_tests.rs"]
mod tests;
