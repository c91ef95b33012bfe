//! Source locations recorded by the compiler, indexed by descriptor path.
//!
//! The compiler identifies each declaration by the sequence of field numbers
//! and indexes leading from the file root to it (`[4, 0, 2, 1]` is the second
//! field of the first message). [`PathNode`] replays that sequence as a tree so
//! the builder can descend alongside the declarations it constructs.

use protobuf::descriptor::SourceCodeInfo as RawSourceCodeInfo;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub(crate) const FILE_MESSAGE_TYPE: i32 = 4;
pub(crate) const FILE_ENUM_TYPE: i32 = 5;
pub(crate) const FILE_SERVICE: i32 = 6;
pub(crate) const MESSAGE_FIELD: i32 = 2;
pub(crate) const MESSAGE_NESTED_TYPE: i32 = 3;
pub(crate) const MESSAGE_ENUM_TYPE: i32 = 4;
pub(crate) const MESSAGE_ONEOF_DECL: i32 = 8;
pub(crate) const ENUM_VALUE: i32 = 2;
pub(crate) const SERVICE_METHOD: i32 = 2;

/// Where a declaration lives in its file, with 1-based positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCodeInfo {
    pub file_path: String,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
    pub leading_comments: Option<String>,
    pub trailing_comments: Option<String>,
    pub leading_detached_comments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RawLocation {
    span: Vec<i32>,
    leading_comments: Option<String>,
    trailing_comments: Option<String>,
    leading_detached_comments: Vec<String>,
}

/// One level of the location tree.
#[derive(Debug, Default)]
pub struct PathNode {
    location: Option<RawLocation>,
    children: BTreeMap<i32, PathNode>,
}

impl PathNode {
    /// Builds the tree for a file's raw source info.
    pub fn from_raw(info: &RawSourceCodeInfo) -> Self {
        let mut root = PathNode::default();
        for location in &info.location {
            let mut node = &mut root;
            for segment in &location.path {
                node = node.children.entry(*segment).or_default();
            }
            // The compiler may emit several locations for one path (e.g. a
            // field's declaration and its options); the first one is the
            // declaration itself.
            if node.location.is_none() {
                node.location = Some(RawLocation {
                    span: location.span.clone(),
                    leading_comments: location
                        .has_leading_comments()
                        .then(|| location.leading_comments().to_string()),
                    trailing_comments: location
                        .has_trailing_comments()
                        .then(|| location.trailing_comments().to_string()),
                    leading_detached_comments: location.leading_detached_comments.clone(),
                });
            }
        }
        root
    }

    pub fn child(&self, segment: i32) -> Option<&PathNode> {
        self.children.get(&segment)
    }

    /// Descends by a declaration list tag followed by an index.
    pub fn descend(&self, tag: i32, index: usize) -> Option<&PathNode> {
        let index = i32::try_from(index).ok()?;
        self.child(tag).and_then(|list| list.child(index))
    }

    /// Resolves this node's location, if the compiler recorded a usable one.
    pub fn source_info(&self, file_path: &str) -> Option<SourceCodeInfo> {
        let raw = self.location.as_ref()?;
        let (start_line, start_column, end_line, end_column) = match raw.span.as_slice() {
            [line, start, end] => (*line, *start, *line, *end),
            [start_line, start, end_line, end] => (*start_line, *start, *end_line, *end),
            _ => return None,
        };
        Some(SourceCodeInfo {
            file_path: file_path.to_string(),
            start_line: one_based(start_line),
            start_column: one_based(start_column),
            end_line: one_based(end_line),
            end_column: one_based(end_column),
            leading_comments: raw.leading_comments.clone(),
            trailing_comments: raw.trailing_comments.clone(),
            leading_detached_comments: raw.leading_detached_comments.clone(),
        })
    }
}

fn one_based(value: i32) -> u32 {
    u32::try_from(value).map(|v| v + 1).unwrap_or(0)
}
