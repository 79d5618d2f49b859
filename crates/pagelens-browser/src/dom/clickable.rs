//! Content hashes of interactive elements and new-element detection.

use std::collections::HashSet;

use pagelens_config::HashingConfig;
use sha2::{Digest, Sha256};

use super::node::{DomTree, NodeId};

/// Hashes of the interactive elements seen on one URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickableHashSet {
    pub url: String,
    pub hashes: HashSet<String>,
}

/// Which attributes contribute to an element hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashPolicy {
    pub excluded_attributes: Vec<String>,
    /// When set, only these attributes are hashed. Exclusions still apply.
    pub included_attributes: Option<Vec<String>>,
}

impl Default for HashPolicy {
    fn default() -> Self {
        Self::from_config(&HashingConfig::default())
    }
}

impl HashPolicy {
    pub fn from_config(config: &HashingConfig) -> Self {
        Self {
            excluded_attributes: config.excluded_attributes.clone(),
            included_attributes: config.included_attributes.clone(),
        }
    }

    pub fn admits(&self, attribute: &str) -> bool {
        if self.excluded_attributes.iter().any(|a| a == attribute) {
            return false;
        }
        match &self.included_attributes {
            Some(included) => included.iter().any(|a| a == attribute),
            None => true,
        }
    }
}

/// Hashes interactive elements and flags the ones not seen before.
#[derive(Debug, Clone, Default)]
pub struct ClickableElementProcessor {
    policy: HashPolicy,
}

impl ClickableElementProcessor {
    pub fn new(policy: HashPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &HashPolicy {
        &self.policy
    }

    /// Interactive elements in document order.
    pub fn get_clickable_elements(&self, tree: &DomTree) -> Vec<NodeId> {
        tree.interactive_elements()
    }

    pub fn get_clickable_elements_hashes(&self, tree: &DomTree) -> HashSet<String> {
        self.get_clickable_elements(tree)
            .into_iter()
            .map(|id| self.hash_dom_element(tree, id))
            .collect()
    }

    /// SHA-256 over ancestry, xpath, tag and admitted attributes.
    ///
    /// Returns an empty string for nodes that are not elements.
    pub fn hash_dom_element(&self, tree: &DomTree, id: NodeId) -> String {
        let Some(element) = tree.element(id) else {
            return String::new();
        };

        let mut branch: Vec<&str> = tree
            .ancestors(id)
            .filter_map(|a| tree.element(a).map(|el| el.tag_name.as_str()))
            .collect();
        branch.reverse();

        let mut attributes: Vec<(&String, &String)> = element
            .attributes
            .iter()
            .filter(|(k, _)| self.policy.admits(k))
            .collect();
        attributes.sort();

        let mut hasher = Sha256::new();
        hasher.update(branch.join("/").as_bytes());
        hasher.update(b"\x1f");
        hasher.update(element.xpath.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(element.tag_name.as_bytes());
        for (key, value) in attributes {
            hasher.update(b"\x1f");
            hasher.update(key.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    /// Set `is_new` on every interactive element when `previous` was taken on `url`.
    ///
    /// Returns how many elements were flagged new. With no previous set, or one
    /// from a different URL, nothing is flagged.
    pub fn mark_new_elements(
        &self,
        tree: &mut DomTree,
        url: &str,
        previous: Option<&ClickableHashSet>,
    ) -> usize {
        let Some(previous) = previous.filter(|p| p.url == url) else {
            return 0;
        };

        let mut flagged = 0;
        for id in self.get_clickable_elements(tree) {
            let is_new = !previous.hashes.contains(&self.hash_dom_element(tree, id));
            if let Some(element) = tree.element_mut(id) {
                element.is_new = Some(is_new);
            }
            if is_new {
                flagged += 1;
            }
        }
        flagged
    }
}

#[cfg(test)]
#[path = "clickable_tests.rs"]
mod tests;
