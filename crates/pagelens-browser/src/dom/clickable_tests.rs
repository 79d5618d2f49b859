use super::*;
use crate::dom::node::{ElementData, NodeKind};

fn interactive(tag: &str, xpath: &str, attrs: &[(&str, &str)]) -> NodeKind {
    let mut el = ElementData::new(tag, xpath);
    el.is_interactive = true;
    el.attributes = attrs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    NodeKind::Element(el)
}

fn plain(tag: &str, xpath: &str) -> NodeKind {
    NodeKind::Element(ElementData::new(tag, xpath))
}

/// html > body > form > (input, button)
fn form_tree() -> (DomTree, NodeId, NodeId) {
    let mut tree = DomTree::new();
    let html = tree.push(None, plain("html", "/html"));
    let body = tree.push(Some(html), plain("body", "/html/body"));
    let form = tree.push(Some(body), plain("form", "/html/body/form"));
    let input = tree.push(
        Some(form),
        interactive("input", "/html/body/form/input", &[("name", "q"), ("value", "")]),
    );
    let button = tree.push(
        Some(form),
        interactive("button", "/html/body/form/button", &[("type", "submit")]),
    );
    (tree, input, button)
}

fn set_attr(tree: &mut DomTree, id: NodeId, key: &str, value: &str) {
    tree.element_mut(id)
        .unwrap()
        .attributes
        .insert(key.to_string(), value.to_string());
}

#[test]
fn test_hash_is_deterministic() {
    let (tree, input, _) = form_tree();
    let processor = ClickableElementProcessor::default();
    let first = processor.hash_dom_element(&tree, input);
    assert_eq!(first, processor.hash_dom_element(&tree, input));
    assert_eq!(first.len(), 64);
}

#[test]
fn test_any_admitted_attribute_changes_hash() {
    let (mut tree, input, _) = form_tree();
    let processor = ClickableElementProcessor::default();
    let before = processor.hash_dom_element(&tree, input);

    for (key, value) in [("value", "typed"), ("disabled", ""), ("aria-checked", "true")] {
        let mut changed = tree.clone();
        set_attr(&mut changed, input, key, value);
        assert_ne!(before, processor.hash_dom_element(&changed, input), "{}", key);
    }

    set_attr(&mut tree, input, "style", "color: red");
    assert_eq!(before, processor.hash_dom_element(&tree, input));
}

#[test]
fn test_highlight_attribute_is_volatile() {
    let (mut tree, input, _) = form_tree();
    let processor = ClickableElementProcessor::default();
    let before = processor.hash_dom_element(&tree, input);

    set_attr(&mut tree, input, "data-highlight-index", "4");
    set_attr(&mut tree, input, "pagelens-highlight-id", "4");
    assert_eq!(before, processor.hash_dom_element(&tree, input));
}

#[test]
fn test_same_element_under_different_branch_differs() {
    let (mut tree, _, _) = form_tree();
    let body = NodeId(1);
    let div = tree.push(Some(body), plain("div", "/html/body/div"));
    let twin = tree.push(
        Some(div),
        interactive("input", "/html/body/form/input", &[("name", "q"), ("value", "")]),
    );

    let processor = ClickableElementProcessor::default();
    assert_ne!(
        processor.hash_dom_element(&tree, NodeId(3)),
        processor.hash_dom_element(&tree, twin)
    );
}

#[test]
fn test_included_attributes_restrict_scope() {
    let (mut tree, input, _) = form_tree();
    let processor = ClickableElementProcessor::new(HashPolicy {
        excluded_attributes: vec![],
        included_attributes: Some(vec!["name".to_string()]),
    });
    let before = processor.hash_dom_element(&tree, input);

    set_attr(&mut tree, input, "value", "typed");
    assert_eq!(before, processor.hash_dom_element(&tree, input));

    set_attr(&mut tree, input, "name", "query");
    assert_ne!(before, processor.hash_dom_element(&tree, input));
}

#[test]
fn test_hash_of_text_node_is_empty() {
    let (mut tree, _, button) = form_tree();
    let label = tree.push(
        Some(button),
        NodeKind::Text(crate::dom::node::TextData {
            text: "Go".to_string(),
            is_visible: true,
        }),
    );
    assert!(ClickableElementProcessor::default()
        .hash_dom_element(&tree, label)
        .is_empty());
}

#[test]
fn test_clickable_elements_in_document_order() {
    let (tree, input, button) = form_tree();
    let processor = ClickableElementProcessor::default();
    assert_eq!(processor.get_clickable_elements(&tree), vec![input, button]);
    assert_eq!(processor.get_clickable_elements_hashes(&tree).len(), 2);
}

#[test]
fn test_mark_new_flags_exactly_the_added_element() {
    let (tree, _, _) = form_tree();
    let processor = ClickableElementProcessor::default();
    let previous = ClickableHashSet {
        url: "https://example.com/".to_string(),
        hashes: processor.get_clickable_elements_hashes(&tree),
    };

    let mut next = tree.clone();
    let form = NodeId(2);
    let added = next.push(
        Some(form),
        interactive("a", "/html/body/form/a", &[("href", "/help")]),
    );

    let flagged = processor.mark_new_elements(&mut next, "https://example.com/", Some(&previous));
    assert_eq!(flagged, 1);
    assert_eq!(next.element(added).unwrap().is_new, Some(true));
    assert_eq!(next.element(NodeId(3)).unwrap().is_new, Some(false));
    assert_eq!(next.element(NodeId(4)).unwrap().is_new, Some(false));
}

#[test]
fn test_mark_new_skips_on_url_mismatch() {
    let (tree, _, _) = form_tree();
    let processor = ClickableElementProcessor::default();
    let previous = ClickableHashSet {
        url: "https://a.example/".to_string(),
        hashes: HashSet::new(),
    };

    let mut next = tree.clone();
    let flagged = processor.mark_new_elements(&mut next, "https://b.example/", Some(&previous));
    assert_eq!(flagged, 0);
    assert!(next.iter().all(|(id, _)| {
        next.element(id).is_none_or(|el| el.is_new.is_none())
    }));
}

#[test]
fn test_mark_new_without_previous_flags_nothing() {
    let (mut tree, input, _) = form_tree();
    let processor = ClickableElementProcessor::default();
    assert_eq!(processor.mark_new_elements(&mut tree, "https://a.example/", None), 0);
    assert_eq!(tree.element(input).unwrap().is_new, None);
}

#[test]
fn test_policy_from_config() {
    let policy = HashPolicy::from_config(&HashingConfig {
        excluded_attributes: vec!["style".to_string()],
        included_attributes: None,
    });
    assert!(!policy.admits("style"));
    assert!(policy.admits("value"));
}
