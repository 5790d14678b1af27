use smol_str::SmolStr;

use crate::comments::Comments;
use crate::error::Mark;
use crate::event::ScalarStyle;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    StreamStart,
    StreamEnd,
    VersionDirective { major: u32, minor: u32 },
    TagDirective { handle: String, prefix: String },
    /// A directive other than `%YAML` or `%TAG`; it is skipped.
    ReservedDirective { name: String },
    DocumentStart,
    DocumentEnd,
    BlockSequenceStart,
    BlockMappingStart,
    BlockEnd,
    FlowSequenceStart,
    FlowSequenceEnd,
    FlowMappingStart,
    FlowMappingEnd,
    BlockEntry,
    FlowEntry,
    Key,
    Value,
    Alias(SmolStr),
    Anchor(SmolStr),
    Tag {
        handle: Option<SmolStr>,
        suffix: String,
    },
    Scalar {
        value: String,
        style: ScalarStyle,
        /// Positions in `value` where a folded scalar had a source line break.
        fold_positions: Vec<usize>,
    },
}

impl TokenKind {
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::StreamStart => "<stream start>",
            TokenKind::StreamEnd => "<stream end>",
            TokenKind::VersionDirective { .. }
            | TokenKind::TagDirective { .. }
            | TokenKind::ReservedDirective { .. } => "<directive>",
            TokenKind::DocumentStart => "<document start>",
            TokenKind::DocumentEnd => "<document end>",
            TokenKind::BlockSequenceStart => "<block sequence start>",
            TokenKind::BlockMappingStart => "<block mapping start>",
            TokenKind::BlockEnd => "<block end>",
            TokenKind::FlowSequenceStart => "'['",
            TokenKind::FlowSequenceEnd => "']'",
            TokenKind::FlowMappingStart => "'{'",
            TokenKind::FlowMappingEnd => "'}'",
            TokenKind::BlockEntry => "'-'",
            TokenKind::FlowEntry => "','",
            TokenKind::Key => "'?'",
            TokenKind::Value => "':'",
            TokenKind::Alias(_) => "<alias>",
            TokenKind::Anchor(_) => "<anchor>",
            TokenKind::Tag { .. } => "<tag>",
            TokenKind::Scalar { .. } => "<scalar>",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub start_mark: Mark,
    pub end_mark: Mark,
    pub comments: Option<Box<Comments>>,
}

impl Token {
    pub fn new(kind: TokenKind, start_mark: Mark, end_mark: Mark) -> Self {
        Self {
            kind,
            start_mark,
            end_mark,
            comments: None,
        }
    }

    pub(crate) fn comments_mut(&mut self) -> &mut Comments {
        self.comments.get_or_insert_with(Default::default)
    }
}
