use sha2::{Digest, Sha256};
use url::Url;

use scout_core_types::{DomNode, PageSnapshot};

/// Breadth-first cap on the number of tag names folded into a signature.
/// Deep trees beyond this contribute nothing, which keeps the hash stable
/// against content growth further down the page.
const TAG_LIMIT: usize = 256;

/// Deterministic structural+route hash of one snapshot.
///
/// Combines a capped breadth-first walk of DOM tag names (text and attributes
/// ignored) with the URL path and query string, so same-shaped pages at
/// different routes stay apart. Pure function of its input.
pub fn signature(snapshot: &PageSnapshot) -> String {
    let mut tags = Vec::with_capacity(TAG_LIMIT);
    collect_tags(&snapshot.dom, &mut tags);

    let mut combined = tags.join(",");
    combined.push('|');
    combined.push_str(&route_component(&snapshot.url));

    let mut hasher = Sha256::new();
    hasher.update(combined.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// First 16 hex chars; used as the equivalence-cache key component.
pub fn short_signature(snapshot: &PageSnapshot) -> String {
    let mut sig = signature(snapshot);
    sig.truncate(16);
    sig
}

fn collect_tags(root: &DomNode, acc: &mut Vec<String>) {
    let mut queue = std::collections::VecDeque::new();
    queue.push_back(root);
    while let Some(node) = queue.pop_front() {
        if acc.len() >= TAG_LIMIT {
            return;
        }
        if !node.tag.is_empty() {
            acc.push(node.tag.clone());
        }
        for child in &node.children {
            queue.push_back(child);
        }
    }
}

/// Path plus `?query` when present; falls back to the raw string for inputs
/// that do not parse as absolute URLs.
fn route_component(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(url) => {
            let mut route = url.path().to_string();
            if let Some(query) = url.query() {
                route.push('?');
                route.push_str(query);
            }
            route
        }
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(url: &str, dom: DomNode) -> PageSnapshot {
        PageSnapshot::new(url, dom)
    }

    fn list_dom(items: usize) -> DomNode {
        let children = (0..items).map(|_| DomNode::new("li")).collect();
        DomNode::with_children("html", vec![DomNode::with_children("ul", children)])
    }

    #[test]
    fn signature_is_pure_and_deterministic() {
        let snap = page("https://shop.test/items?page=2", list_dom(4));
        assert_eq!(signature(&snap), signature(&snap));
        assert_eq!(signature(&snap), signature(&snap.clone()));
    }

    #[test]
    fn route_separates_same_shaped_pages() {
        let a = page("https://shop.test/items", list_dom(4));
        let b = page("https://shop.test/cart", list_dom(4));
        assert_ne!(signature(&a), signature(&b));
    }

    #[test]
    fn query_string_participates_in_the_route() {
        let a = page("https://shop.test/items?page=1", list_dom(4));
        let b = page("https://shop.test/items?page=2", list_dom(4));
        assert_ne!(signature(&a), signature(&b));
    }

    #[test]
    fn structure_beyond_the_cap_is_ignored() {
        let a = page("https://shop.test/items", list_dom(300));
        let b = page("https://shop.test/items", list_dom(400));
        assert_eq!(signature(&a), signature(&b));
    }

    #[test]
    fn host_is_not_part_of_the_route() {
        // Only path and query matter; mirrors of the same app hash together.
        let a = page("https://shop.test/items", list_dom(4));
        let b = page("https://www.shop.test/items", list_dom(4));
        assert_eq!(signature(&a), signature(&b));
    }

    #[test]
    fn short_signature_is_a_prefix() {
        let snap = page("https://shop.test/", list_dom(2));
        assert!(signature(&snap).starts_with(&short_signature(&snap)));
        assert_eq!(short_signature(&snap).len(), 16);
    }
}
