//! Comments captured by the round-trip scanner.
//!
//! Full-line comments and blank lines that precede a node are kept in `pre`,
//! a comment on the same line after a node is kept in `post`. Each comment
//! remembers its source column so the emitter can put it back where it was.

use smallvec::SmallVec;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentLine {
    pub column: usize,
    /// Text starting at `#`, without the line break. Empty for a blank line.
    pub text: String,
}

impl CommentLine {
    pub fn new(column: usize, text: impl Into<String>) -> Self {
        Self {
            column,
            text: text.into(),
        }
    }

    pub fn blank() -> Self {
        Self {
            column: 0,
            text: String::new(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comments {
    pub pre: SmallVec<[CommentLine; 2]>,
    pub post: Option<CommentLine>,
}

impl Comments {
    pub fn is_empty(&self) -> bool {
        self.pre.is_empty() && self.post.is_none()
    }

    /// Comment lines written on their own line before the node.
    pub fn with_pre(mut self, lines: impl IntoIterator<Item = CommentLine>) -> Self {
        self.pre.extend(lines);
        self
    }

    /// End-of-line comment written after the node, `#` included.
    pub fn with_post(mut self, column: usize, text: impl Into<String>) -> Self {
        self.post = Some(CommentLine::new(column, text));
        self
    }

    /// Move everything from `other` into `self`, keeping `other`'s pre
    /// comments in front.
    pub(crate) fn absorb_front(&mut self, other: Comments) {
        if !other.pre.is_empty() {
            let mut merged = other.pre;
            merged.extend(self.pre.drain(..));
            self.pre = merged;
        }
        if self.post.is_none() {
            self.post = other.post;
        }
    }
}

/// Convenience for the optional boxed comment slot carried by tokens,
/// events, nodes and values.
pub(crate) fn take_boxed(slot: &mut Option<Box<Comments>>) -> Comments {
    slot.take().map(|boxed| *boxed).unwrap_or_default()
}

pub(crate) fn boxed(comments: Comments) -> Option<Box<Comments>> {
    if comments.is_empty() {
        None
    } else {
        Some(Box::new(comments))
    }
}
