use std::collections::HashMap;

use log::warn;
use smol_str::SmolStr;

use crate::arena::{Arena, Document, Node, NodeData, NodeId};
use crate::constants::DEFAULT_MAX_DEPTH;
use crate::decode::parser::Parser;
use crate::decode::resolver::Resolver;
use crate::error::{Error, Mark, MarkedError, Warning, WarningKind};
use crate::event::{Event, EventKind};
use crate::Result;

/// Builds one node graph per document from the event stream.
pub struct Composer {
    parser: Parser,
    anchors: HashMap<SmolStr, (NodeId, Option<Mark>)>,
    warnings: Vec<Warning>,
    stream_started: bool,
    depth: usize,
    max_depth: usize,
}

impl Composer {
    pub fn new(parser: Parser) -> Self {
        Self {
            parser,
            anchors: HashMap::new(),
            warnings: Vec::new(),
            stream_started: false,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Rejects documents with more than `max_depth` nested collections.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    pub fn parser_mut(&mut self) -> &mut Parser {
        &mut self.parser
    }

    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    /// True while another document follows.
    pub fn check_document(&mut self) -> Result<bool> {
        self.skip_stream_start()?;
        self.parser
            .check_event(|kind| !matches!(kind, EventKind::StreamEnd))
    }

    /// Next document of the stream, or `None` at the end of the stream.
    pub fn compose_document(&mut self) -> Result<Option<Document>> {
        self.skip_stream_start()?;
        let Some(start) = self.parser.get_event()? else {
            return Ok(None);
        };
        let (explicit_start, version, tags) = match start.kind {
            EventKind::StreamEnd => return Ok(None),
            EventKind::DocumentStart {
                explicit,
                version,
                tags,
            } => (explicit, version, tags),
            other => {
                return Err(Error::composer(
                    None,
                    None,
                    format!("expected a document start, but found {}", other.name()),
                    start.start_mark,
                ))
            }
        };
        let resolver = Resolver::new(self.parser.document_version());
        let mut arena = Arena::new();
        self.depth = 0;
        let root = self.compose_node(&mut arena, &resolver)?;
        let end = self.expect_event()?;
        let explicit_end = matches!(end.kind, EventKind::DocumentEnd { explicit: true });
        self.anchors.clear();
        Ok(Some(Document {
            arena,
            root: Some(root),
            explicit_start,
            explicit_end,
            version,
            tags,
            start_comments: start.comments,
            end_comments: end.comments,
            indentless_sequences: None,
        }))
    }

    fn skip_stream_start(&mut self) -> Result<()> {
        if !self.stream_started {
            self.stream_started = true;
            if self.parser.check_event(|kind| matches!(kind, EventKind::StreamStart))? {
                self.parser.get_event()?;
            }
        }
        Ok(())
    }

    fn expect_event(&mut self) -> Result<Event> {
        match self.parser.get_event()? {
            Some(event) => Ok(event),
            None => Err(Error::composer(
                None,
                None,
                "found unexpected end of stream",
                None,
            )),
        }
    }

    fn register_anchor(&mut self, anchor: &SmolStr, id: NodeId, mark: Option<Mark>) {
        if let Some((_, first_mark)) = self.anchors.get(anchor) {
            let detail = MarkedError::new(
                Some(format!("found duplicate anchor '{anchor}'; first occurrence").as_str()),
                first_mark.clone(),
                "second occurrence",
                mark.clone(),
            );
            warn!("{detail}");
            self.warnings
                .push(Warning::new(WarningKind::ReusedAnchor, detail));
        }
        self.anchors.insert(anchor.clone(), (id, mark));
    }

    fn compose_node(&mut self, arena: &mut Arena, resolver: &Resolver) -> Result<NodeId> {
        let event = self.expect_event()?;
        let Event {
            kind,
            start_mark,
            end_mark,
            comments,
        } = event;
        match kind {
            EventKind::Alias { anchor } => match self.anchors.get(&anchor) {
                Some((id, _)) => Ok(*id),
                None => Err(Error::composer(
                    None,
                    None,
                    format!("found undefined alias '{anchor}'"),
                    start_mark,
                )),
            },
            EventKind::Scalar {
                anchor,
                tag,
                implicit,
                value,
                style,
                fold_positions,
            } => {
                let explicit_tag = matches!(&tag, Some(tag) if tag != "!");
                let tag = match tag {
                    Some(tag) if tag != "!" => tag,
                    _ => resolver.resolve_scalar(&value, implicit).to_owned(),
                };
                let node = Node {
                    tag,
                    explicit_tag,
                    data: NodeData::Scalar {
                        value,
                        style,
                        fold_positions,
                    },
                    anchor: anchor.clone(),
                    start_mark: start_mark.clone(),
                    end_mark,
                    comments,
                    end_comments: None,
                };
                let id = arena.push(node);
                if let Some(anchor) = &anchor {
                    self.register_anchor(anchor, id, start_mark);
                }
                Ok(id)
            }
            EventKind::SequenceStart {
                anchor,
                tag,
                flow_style,
                ..
            } => {
                let explicit_tag = matches!(&tag, Some(tag) if tag != "!");
                let tag = match tag {
                    Some(tag) if tag != "!" => tag,
                    _ => resolver.resolve_sequence().to_owned(),
                };
                self.descend(start_mark.as_ref())?;
                let node = Node::sequence(tag, Some(flow_style))
                    .with_explicit_tag(explicit_tag)
                    .with_anchor(anchor.clone())
                    .with_comments(comments)
                    .with_marks(start_mark.clone(), end_mark);
                let id = arena.push(node);
                if let Some(anchor) = &anchor {
                    self.register_anchor(anchor, id, start_mark);
                }
                while !self.parser.check_event(|kind| matches!(kind, EventKind::SequenceEnd))? {
                    let item = self.compose_node(arena, resolver)?;
                    arena.push_item(id, item);
                }
                self.close_collection(arena, id)?;
                Ok(id)
            }
            EventKind::MappingStart {
                anchor,
                tag,
                flow_style,
                ..
            } => {
                let explicit_tag = matches!(&tag, Some(tag) if tag != "!");
                let tag = match tag {
                    Some(tag) if tag != "!" => tag,
                    _ => resolver.resolve_mapping().to_owned(),
                };
                self.descend(start_mark.as_ref())?;
                let node = Node::mapping(tag, Some(flow_style))
                    .with_explicit_tag(explicit_tag)
                    .with_anchor(anchor.clone())
                    .with_comments(comments)
                    .with_marks(start_mark.clone(), end_mark);
                let id = arena.push(node);
                if let Some(anchor) = &anchor {
                    self.register_anchor(anchor, id, start_mark);
                }
                while !self.parser.check_event(|kind| matches!(kind, EventKind::MappingEnd))? {
                    let key = self.compose_node(arena, resolver)?;
                    let value = self.compose_node(arena, resolver)?;
                    arena.push_pair(id, key, value);
                }
                self.close_collection(arena, id)?;
                Ok(id)
            }
            other => Err(Error::composer(
                None,
                None,
                format!("expected a node, but found {}", other.name()),
                start_mark,
            )),
        }
    }

    fn descend(&mut self, mark: Option<&Mark>) -> Result<()> {
        if self.depth >= self.max_depth {
            return Err(Error::composer(
                Some("while composing a collection"),
                None,
                format!("exceeded the maximum nesting depth of {}", self.max_depth),
                mark.cloned(),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn close_collection(&mut self, arena: &mut Arena, id: NodeId) -> Result<()> {
        let end = self.expect_event()?;
        self.depth -= 1;
        let node = &mut arena[id];
        if end.end_mark.is_some() {
            node.end_mark = end.end_mark;
        }
        node.end_comments = end.comments;
        Ok(())
    }
}
