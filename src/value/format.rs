//! Formatting details a round-trip load attaches to values so that a dump
//! can write them back the way they were read.

use std::rc::Rc;

use smol_str::SmolStr;

use crate::comments::Comments;
use crate::event::ScalarStyle;
use crate::num::{FloatFormat, IntFormat};
use crate::value::timestamp::TimestampFormat;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Format {
    pub anchor: Option<SmolStr>,
    /// Explicit tag to write back: a tag the loader had no constructor for,
    /// or the `omap`/`pairs`/`set` marker of a collection.
    pub tag: Option<String>,
    pub style: Option<ScalarStyle>,
    /// Positions of the spaces in a folded scalar where the source line was
    /// folded.
    pub fold_positions: Vec<usize>,
    /// Source text of a scalar that resolved to something other than a
    /// string.
    pub spelling: Option<SmolStr>,
    pub int: Option<IntFormat>,
    pub float: Option<FloatFormat>,
    pub timestamp: Option<TimestampFormat>,
    pub flow_style: Option<bool>,
    pub comments: Option<Box<Comments>>,
    /// Comments after the closing bracket of a flow collection.
    pub end_comments: Option<Box<Comments>>,
    /// Set on the root value of a round-trip document.
    pub document: Option<Box<DocumentFormat>>,
}

impl Format {
    pub fn is_default(&self) -> bool {
        *self == Format::default()
    }

    pub fn with_anchor(mut self, anchor: impl Into<SmolStr>) -> Self {
        self.anchor = Some(anchor.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_style(mut self, style: ScalarStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn with_flow_style(mut self, flow_style: bool) -> Self {
        self.flow_style = Some(flow_style);
        self
    }

    pub fn with_comments(mut self, comments: Option<Box<Comments>>) -> Self {
        self.comments = comments;
        self
    }
}

/// Document-level details of a round-trip load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentFormat {
    pub explicit_start: bool,
    pub explicit_end: bool,
    pub version: Option<(u32, u32)>,
    pub tags: Vec<(String, String)>,
    pub start_comments: Option<Box<Comments>>,
    pub end_comments: Option<Box<Comments>>,
    /// Whether block sequences under a mapping key were written at the
    /// key's column. `None` when the document had no such sequence.
    pub indentless_sequences: Option<bool>,
}

/// Formatting handle carried by scalar values.
///
/// Clones share the handle, and a scalar that came from an anchored node
/// keeps the identity of that handle through every alias, which is what the
/// representer uses to write the alias back.
#[derive(Debug, Clone, Default)]
pub struct Meta(Option<Rc<Format>>);

impl Meta {
    pub fn none() -> Self {
        Meta(None)
    }

    pub fn new(format: Format) -> Self {
        if format.is_default() {
            Meta(None)
        } else {
            Meta(Some(Rc::new(format)))
        }
    }

    pub fn get(&self) -> Option<&Format> {
        self.0.as_deref()
    }

    pub fn anchor(&self) -> Option<&str> {
        self.get().and_then(|format| format.anchor.as_deref())
    }

    pub fn identity(&self) -> Option<usize> {
        self.0.as_ref().map(|format| Rc::as_ptr(format) as usize)
    }

    /// Edits the format in place, detaching it from other clones first.
    pub fn update(&mut self, edit: impl FnOnce(&mut Format)) {
        let format = self.0.get_or_insert_with(Rc::default);
        edit(Rc::make_mut(format));
        if format.is_default() {
            self.0 = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_default_format_is_not_allocated() {
        assert!(Meta::new(Format::default()).get().is_none());
        let meta = Meta::new(Format::default().with_anchor("a"));
        assert_eq!(meta.anchor(), Some("a"));
    }

    #[rstest]
    fn test_clones_share_identity_until_updated() {
        let meta = Meta::new(Format::default().with_anchor("x"));
        let mut copy = meta.clone();
        assert_eq!(meta.identity(), copy.identity());
        copy.update(|format| format.anchor = Some("y".into()));
        assert_ne!(meta.identity(), copy.identity());
        assert_eq!(meta.anchor(), Some("x"));
        copy.update(|format| format.anchor = None);
        assert!(copy.get().is_none());
    }
}
