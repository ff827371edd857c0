use serde::{Deserialize, Serialize};
use std::fmt;

/// Leaf value of a thread document
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

/// A node of a nested comment-thread document
///
/// Mappings keep their keys in document order, so traversal order matches the
/// order fields appear in the source JSON.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "serde_json::Value")]
pub enum ThreadNode {
    Mapping(Vec<(String, ThreadNode)>),
    Sequence(Vec<ThreadNode>),
    Scalar(Scalar),
}

impl ThreadNode {
    /// Look up a field of a mapping node
    pub fn get(&self, key: &str) -> Option<&ThreadNode> {
        match self {
            ThreadNode::Mapping(entries) => entries
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Look up an element of a sequence node
    pub fn at(&self, index: usize) -> Option<&ThreadNode> {
        match self {
            ThreadNode::Sequence(items) => items.get(index),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ThreadNode::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Follow a path of keys and indices from this node
    pub fn walk(&self, path: &[PathSegment]) -> Option<&ThreadNode> {
        path.iter().try_fold(self, |node, segment| match segment {
            PathSegment::Key(key) => node.get(key),
            PathSegment::Index(index) => node.at(*index),
        })
    }
}

impl From<serde_json::Value> for ThreadNode {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Object(map) => {
                ThreadNode::Mapping(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
            Value::Array(items) => {
                ThreadNode::Sequence(items.into_iter().map(ThreadNode::from).collect())
            }
            Value::String(s) => ThreadNode::Scalar(Scalar::String(s)),
            Value::Number(n) => ThreadNode::Scalar(Scalar::Number(n)),
            Value::Bool(b) => ThreadNode::Scalar(Scalar::Bool(b)),
            Value::Null => ThreadNode::Scalar(Scalar::Null),
        }
    }
}

/// One step of a traversal route
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Index(index) => write!(f, "{}", index),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// Text extracted from one comment node, tagged with where it was found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub path: Vec<PathSegment>,
    pub text: String,
}

impl Fragment {
    pub fn new(path: Vec<PathSegment>, text: impl Into<String>) -> Self {
        Self {
            path,
            text: text.into(),
        }
    }

    /// Path joined with `/`, e.g. `list/0`
    pub fn path_string(&self) -> String {
        self.path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("/")
    }
}
