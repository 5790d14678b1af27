//! The event stream that sits between the parser and the composer on load,
//! and between the serializer and the emitter on dump.

use smol_str::SmolStr;

use crate::comments::Comments;
use crate::error::Mark;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarStyle {
    Plain,
    SingleQuoted,
    DoubleQuoted,
    Literal,
    Folded,
}

impl ScalarStyle {
    pub fn indicator(self) -> Option<char> {
        match self {
            ScalarStyle::Plain => None,
            ScalarStyle::SingleQuoted => Some('\''),
            ScalarStyle::DoubleQuoted => Some('"'),
            ScalarStyle::Literal => Some('|'),
            ScalarStyle::Folded => Some('>'),
        }
    }

    pub fn is_block(self) -> bool {
        matches!(self, ScalarStyle::Literal | ScalarStyle::Folded)
    }

    pub fn is_quoted(self) -> bool {
        matches!(self, ScalarStyle::SingleQuoted | ScalarStyle::DoubleQuoted)
    }
}

/// `plain`: the scalar may be resolved implicitly when written plain.
/// `quoted`: it may be resolved implicitly when written in any other style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Implicit {
    pub plain: bool,
    pub quoted: bool,
}

impl Implicit {
    pub const NONE: Implicit = Implicit {
        plain: false,
        quoted: false,
    };

    pub fn new(plain: bool, quoted: bool) -> Self {
        Self { plain, quoted }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    StreamStart,
    StreamEnd,
    DocumentStart {
        explicit: bool,
        version: Option<(u32, u32)>,
        tags: Vec<(String, String)>,
    },
    DocumentEnd {
        explicit: bool,
    },
    Alias {
        anchor: SmolStr,
    },
    Scalar {
        anchor: Option<SmolStr>,
        tag: Option<String>,
        implicit: Implicit,
        value: String,
        style: Option<ScalarStyle>,
        /// Source line folds of a folded scalar, as positions of the
        /// folding spaces in `value`.
        fold_positions: Option<Vec<usize>>,
    },
    SequenceStart {
        anchor: Option<SmolStr>,
        tag: Option<String>,
        implicit: bool,
        flow_style: bool,
    },
    SequenceEnd,
    MappingStart {
        anchor: Option<SmolStr>,
        tag: Option<String>,
        implicit: bool,
        flow_style: bool,
    },
    MappingEnd,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::StreamStart => "StreamStartEvent",
            EventKind::StreamEnd => "StreamEndEvent",
            EventKind::DocumentStart { .. } => "DocumentStartEvent",
            EventKind::DocumentEnd { .. } => "DocumentEndEvent",
            EventKind::Alias { .. } => "AliasEvent",
            EventKind::Scalar { .. } => "ScalarEvent",
            EventKind::SequenceStart { .. } => "SequenceStartEvent",
            EventKind::SequenceEnd => "SequenceEndEvent",
            EventKind::MappingStart { .. } => "MappingStartEvent",
            EventKind::MappingEnd => "MappingEndEvent",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub start_mark: Option<Mark>,
    pub end_mark: Option<Mark>,
    pub comments: Option<Box<Comments>>,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            start_mark: None,
            end_mark: None,
            comments: None,
        }
    }

    pub fn with_marks(mut self, start_mark: Mark, end_mark: Mark) -> Self {
        self.start_mark = Some(start_mark);
        self.end_mark = Some(end_mark);
        self
    }

    pub fn with_comments(mut self, comments: Option<Box<Comments>>) -> Self {
        self.comments = comments;
        self
    }

    pub fn is_collection_end(&self) -> bool {
        matches!(self.kind, EventKind::SequenceEnd | EventKind::MappingEnd)
    }

    pub(crate) fn pre_comments(&self) -> &[crate::comments::CommentLine] {
        self.comments
            .as_deref()
            .map(|comments| comments.pre.as_slice())
            .unwrap_or(&[])
    }

    pub(crate) fn post_comment(&self) -> Option<&crate::comments::CommentLine> {
        self.comments
            .as_deref()
            .and_then(|comments| comments.post.as_ref())
    }
}
