use sift_types::{Fragment, PathSegment, ThreadNode};
use tracing::warn;

/// Author shown when a comment has no usable author
pub const DELETED_AUTHOR: &str = "[deleted]";

/// Nodes nested deeper than this below the starting node are skipped
pub const MAX_DEPTH: usize = 512;

/// Field names read from comment mappings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlattenFields {
    pub text: String,
    pub author: String,
}

impl Default for FlattenFields {
    fn default() -> Self {
        Self {
            text: "body".to_string(),
            author: "author".to_string(),
        }
    }
}

/// Lazily walk `node` in pre-order, yielding one fragment per comment body
pub fn flatten(node: &ThreadNode, path: Vec<PathSegment>) -> Flatten<'_> {
    flatten_with(node, path, FlattenFields::default())
}

pub fn flatten_with(node: &ThreadNode, path: Vec<PathSegment>, fields: FlattenFields) -> Flatten<'_> {
    let base_depth = path.len();
    Flatten {
        stack: vec![(path, node)],
        fields,
        base_depth,
    }
}

/// Iterator returned by [`flatten`]
pub struct Flatten<'a> {
    stack: Vec<(Vec<PathSegment>, &'a ThreadNode)>,
    fields: FlattenFields,
    base_depth: usize,
}

impl<'a> Flatten<'a> {
    fn comment_text(&self, node: &ThreadNode) -> Option<String> {
        let body = node.get(&self.fields.text)?.as_str()?;
        if body.is_empty() {
            return None;
        }
        let author = node
            .get(&self.fields.author)
            .and_then(ThreadNode::as_str)
            .unwrap_or(DELETED_AUTHOR);
        Some(format!("[{}] {}", author, body))
    }
}

impl<'a> Iterator for Flatten<'a> {
    type Item = Fragment;

    fn next(&mut self) -> Option<Fragment> {
        while let Some((path, node)) = self.stack.pop() {
            if path.len() - self.base_depth > MAX_DEPTH {
                warn!(depth = path.len(), "Skipping thread node nested too deeply");
                continue;
            }

            match node {
                ThreadNode::Mapping(entries) => {
                    // Reverse push keeps children in document order
                    for (key, child) in entries.iter().rev() {
                        let mut child_path = path.clone();
                        child_path.push(PathSegment::Key(key.clone()));
                        self.stack.push((child_path, child));
                    }
                    if let Some(text) = self.comment_text(node) {
                        return Some(Fragment::new(path, text));
                    }
                }
                ThreadNode::Sequence(items) => {
                    for (index, child) in items.iter().enumerate().rev() {
                        let mut child_path = path.clone();
                        child_path.push(PathSegment::Index(index));
                        self.stack.push((child_path, child));
                    }
                }
                ThreadNode::Scalar(_) => {}
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn texts(node: &ThreadNode) -> Vec<String> {
        flatten(node, vec![]).map(|f| f.text).collect()
    }

    #[test]
    fn test_flatten_list_of_comments() {
        let node = ThreadNode::from(json!({
            "list": [
                {"author": "a1", "body": "Hi"},
                {"author": "a2", "body": "Bye"}
            ]
        }));
        let fragments: Vec<_> = flatten(&node, vec![])
            .map(|f| (f.path_string(), f.text))
            .collect();

        assert_eq!(
            fragments,
            vec![
                ("list/0".to_string(), "[a1] Hi".to_string()),
                ("list/1".to_string(), "[a2] Bye".to_string()),
            ]
        );
    }

    #[test]
    fn test_parent_emitted_before_replies() {
        let node = ThreadNode::from(json!({
            "author": "op",
            "body": "parent",
            "replies": {"data": {"children": [
                {"data": {"author": "r1", "body": "child"}},
                {"data": {"author": "r2", "body": "sibling"}}
            ]}}
        }));
        assert_eq!(texts(&node), vec!["[op] parent", "[r1] child", "[r2] sibling"]);
    }

    #[test]
    fn test_missing_or_non_string_author_is_deleted() {
        let node = ThreadNode::from(json!([
            {"body": "no author"},
            {"author": null, "body": "null author"}
        ]));
        assert_eq!(texts(&node), vec!["[[deleted]] no author", "[[deleted]] null author"]);
    }

    #[test]
    fn test_empty_and_non_string_bodies_skipped() {
        let node = ThreadNode::from(json!([
            {"author": "a", "body": ""},
            {"author": "b", "body": 42},
            {"author": "c", "body": null},
            {"author": "d", "body": "kept"}
        ]));
        assert_eq!(texts(&node), vec!["[d] kept"]);
    }

    #[test]
    fn test_scalar_yields_nothing() {
        let node = ThreadNode::from(json!("just text"));
        assert_eq!(flatten(&node, vec![]).count(), 0);
    }

    #[test]
    fn test_custom_fields() {
        let node = ThreadNode::from(json!([{"user": "u", "text": "hello"}]));
        let fields = FlattenFields {
            text: "text".to_string(),
            author: "user".to_string(),
        };
        let out: Vec<_> = flatten_with(&node, vec![], fields).map(|f| f.text).collect();
        assert_eq!(out, vec!["[u] hello"]);
    }

    #[test]
    fn test_path_prefix_is_kept() {
        let node = ThreadNode::from(json!([{"author": "a", "body": "x"}]));
        let fragment = flatten(&node, vec!["root".into()]).next().unwrap();
        assert_eq!(fragment.path_string(), "root/0");
    }
}
