use std::collections::HashMap;

use log::trace;
use smol_str::SmolStr;

use crate::comments::{boxed, take_boxed, Comments};
use crate::constants::DEFAULT_TAG_HANDLES;
use crate::decode::scanner::Scanner;
use crate::decode::token::{Token, TokenKind};
use crate::error::{Error, Mark};
use crate::event::{Event, EventKind, Implicit, ScalarStyle};
use crate::options::YamlVersion;
use crate::Result;

/// `!!suffix` tags the round-trip parser still expands to their full URI;
/// any other shorthand is kept as written so it can be emitted unchanged.
const STANDARD_SUFFIXES: &[&str] = &[
    "null",
    "bool",
    "int",
    "float",
    "binary",
    "timestamp",
    "omap",
    "pairs",
    "set",
    "str",
    "seq",
    "map",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    StreamStart,
    ImplicitDocumentStart,
    DocumentStart,
    DocumentEnd,
    DocumentContent,
    BlockNode,
    BlockSequenceFirstEntry,
    BlockSequenceEntry,
    IndentlessSequenceEntry,
    BlockMappingFirstKey,
    BlockMappingKey,
    BlockMappingValue,
    FlowSequenceFirstEntry,
    FlowSequenceEntry,
    FlowSequenceEntryMappingKey,
    FlowSequenceEntryMappingValue,
    FlowSequenceEntryMappingEnd,
    FlowMappingFirstKey,
    FlowMappingKey,
    FlowMappingValue,
    FlowMappingEmptyValue,
    End,
}

/// Turns tokens into events with a pushdown automaton.
///
/// In round-trip mode the comments a token carries are moved onto the event
/// of the node they belong to: comments on `-`, `?` and `:` indicators travel
/// to the following node, comments before the end of the stream land on the
/// closing document event.
pub struct Parser {
    scanner: Scanner,
    current: Option<Event>,
    state: State,
    states: Vec<State>,
    marks: Vec<Mark>,
    tag_handles: HashMap<String, String>,
    document_version: YamlVersion,
    round_trip: bool,
    carry: Comments,
}

impl Parser {
    pub fn new(scanner: Scanner) -> Self {
        Self {
            scanner,
            current: None,
            state: State::StreamStart,
            states: Vec::new(),
            marks: Vec::new(),
            tag_handles: HashMap::new(),
            document_version: YamlVersion::default(),
            round_trip: false,
            carry: Comments::default(),
        }
    }

    pub fn with_round_trip(mut self, round_trip: bool) -> Self {
        self.round_trip = round_trip;
        self
    }

    /// Dialect of the document currently being parsed.
    pub fn document_version(&self) -> YamlVersion {
        self.document_version
    }

    pub fn check_event(&mut self, predicate: impl FnOnce(&EventKind) -> bool) -> Result<bool> {
        Ok(self.peek_event()?.is_some_and(|event| predicate(&event.kind)))
    }

    pub fn peek_event(&mut self) -> Result<Option<&Event>> {
        if self.current.is_none() && self.state != State::End {
            self.current = Some(self.produce()?);
        }
        Ok(self.current.as_ref())
    }

    pub fn get_event(&mut self) -> Result<Option<Event>> {
        self.peek_event()?;
        Ok(self.current.take())
    }

    fn produce(&mut self) -> Result<Event> {
        match self.state {
            State::StreamStart => self.parse_stream_start(),
            State::ImplicitDocumentStart => self.parse_implicit_document_start(),
            State::DocumentStart => self.parse_document_start(),
            State::DocumentEnd => self.parse_document_end(),
            State::DocumentContent => self.parse_document_content(),
            State::BlockNode => self.parse_node(true, false),
            State::BlockSequenceFirstEntry => {
                let token = self.next_token()?;
                self.marks.push(token.start_mark);
                self.parse_block_sequence_entry()
            }
            State::BlockSequenceEntry => self.parse_block_sequence_entry(),
            State::IndentlessSequenceEntry => self.parse_indentless_sequence_entry(),
            State::BlockMappingFirstKey => {
                let token = self.next_token()?;
                self.marks.push(token.start_mark);
                self.parse_block_mapping_key()
            }
            State::BlockMappingKey => self.parse_block_mapping_key(),
            State::BlockMappingValue => self.parse_block_mapping_value(),
            State::FlowSequenceFirstEntry => {
                let token = self.next_token()?;
                self.marks.push(token.start_mark);
                self.parse_flow_sequence_entry(true)
            }
            State::FlowSequenceEntry => self.parse_flow_sequence_entry(false),
            State::FlowSequenceEntryMappingKey => self.parse_flow_sequence_entry_mapping_key(),
            State::FlowSequenceEntryMappingValue => {
                self.parse_flow_sequence_entry_mapping_value()
            }
            State::FlowSequenceEntryMappingEnd => {
                self.state = State::FlowSequenceEntry;
                let (mark, _, _) = self.peek_info()?;
                Ok(Event::new(EventKind::MappingEnd).with_marks(mark.clone(), mark))
            }
            State::FlowMappingFirstKey => {
                let token = self.next_token()?;
                self.marks.push(token.start_mark);
                self.parse_flow_mapping_key(true)
            }
            State::FlowMappingKey => self.parse_flow_mapping_key(false),
            State::FlowMappingValue => self.parse_flow_mapping_value(),
            State::FlowMappingEmptyValue => {
                self.state = State::FlowMappingKey;
                let (mark, _, _) = self.peek_info()?;
                Ok(self.empty_scalar(mark))
            }
            State::End => Err(Error::parser(
                None,
                None,
                "no more events after the end of the stream",
                None,
            )),
        }
    }

    // Token helpers

    fn check(&mut self, predicate: impl FnOnce(&TokenKind) -> bool) -> Result<bool> {
        self.scanner.check_token(predicate)
    }

    fn next_token(&mut self) -> Result<Token> {
        match self.scanner.get_token()? {
            Some(token) => Ok(token),
            None => Err(self.unexpected_end()),
        }
    }

    /// Start mark, end mark and printable name of the next token.
    fn peek_info(&mut self) -> Result<(Mark, Mark, String)> {
        let info = self.scanner.peek_token()?.map(|token| {
            (
                token.start_mark.clone(),
                token.end_mark.clone(),
                token_repr(&token.kind),
            )
        });
        info.ok_or_else(|| self.unexpected_end())
    }

    fn unexpected_end(&self) -> Error {
        Error::parser(
            None,
            None,
            "found unexpected end of stream",
            Some(self.scanner.mark()),
        )
    }

    fn pop_state(&mut self) -> State {
        self.states.pop().unwrap_or(State::End)
    }

    // Comment routing

    fn carry_comments(&mut self, token: &mut Token) {
        if !self.round_trip {
            return;
        }
        let comments = take_boxed(&mut token.comments);
        self.carry.pre.extend(comments.pre);
        if self.carry.post.is_none() {
            self.carry.post = comments.post;
        }
    }

    fn node_comments(&mut self, own: Option<Box<Comments>>) -> Option<Box<Comments>> {
        if !self.round_trip {
            self.carry = Comments::default();
            return None;
        }
        let mut own = own.map(|boxed| *boxed).unwrap_or_default();
        own.absorb_front(std::mem::take(&mut self.carry));
        boxed(own)
    }

    fn take_front_comments(&mut self) -> Result<Option<Box<Comments>>> {
        Ok(self
            .scanner
            .peek_token_mut()?
            .and_then(|token| token.comments.take()))
    }

    // Stream and documents

    fn parse_stream_start(&mut self) -> Result<Event> {
        let token = self.next_token()?;
        self.state = State::ImplicitDocumentStart;
        Ok(Event::new(EventKind::StreamStart).with_marks(token.start_mark, token.end_mark))
    }

    fn parse_implicit_document_start(&mut self) -> Result<Event> {
        let explicit = self.check(|kind| {
            matches!(
                kind,
                TokenKind::VersionDirective { .. }
                    | TokenKind::TagDirective { .. }
                    | TokenKind::ReservedDirective { .. }
                    | TokenKind::DocumentStart
                    | TokenKind::StreamEnd
            )
        })?;
        if explicit {
            return self.parse_document_start();
        }
        self.tag_handles = default_tag_handles();
        self.document_version = self.scanner.processing_version();
        trace!("implicit document start, YAML {}", self.document_version);
        let (mark, _, _) = self.peek_info()?;
        self.states.push(State::DocumentEnd);
        self.state = State::BlockNode;
        Ok(Event::new(EventKind::DocumentStart {
            explicit: false,
            version: None,
            tags: Vec::new(),
        })
        .with_marks(mark.clone(), mark))
    }

    fn parse_document_start(&mut self) -> Result<Event> {
        while self.check(|kind| *kind == TokenKind::DocumentEnd)? {
            self.next_token()?;
        }
        if self.check(|kind| *kind == TokenKind::StreamEnd)? {
            let mut token = self.next_token()?;
            let comments = self.node_comments(token.comments.take());
            self.state = State::End;
            return Ok(Event::new(EventKind::StreamEnd)
                .with_marks(token.start_mark, token.end_mark)
                .with_comments(comments));
        }
        let (start_mark, _, _) = self.peek_info()?;
        let (version, tags) = self.process_directives()?;
        if !self.check(|kind| *kind == TokenKind::DocumentStart)? {
            let (mark, _, name) = self.peek_info()?;
            return Err(Error::parser(
                None,
                None,
                format!("expected '<document start>', but found {name}"),
                Some(mark),
            ));
        }
        let mut token = self.next_token()?;
        self.document_version = self.scanner.processing_version();
        trace!("explicit document start, YAML {}", self.document_version);
        let comments = self.node_comments(token.comments.take());
        self.states.push(State::DocumentEnd);
        self.state = State::DocumentContent;
        Ok(Event::new(EventKind::DocumentStart {
            explicit: true,
            version,
            tags,
        })
        .with_marks(start_mark, token.end_mark)
        .with_comments(comments))
    }

    fn parse_document_end(&mut self) -> Result<Event> {
        let (start_mark, mut end_mark, _) = self.peek_info()?;
        let mut explicit = false;
        let own = if self.check(|kind| *kind == TokenKind::DocumentEnd)? {
            let mut token = self.next_token()?;
            end_mark = token.end_mark;
            explicit = true;
            token.comments.take()
        } else if self.check(|kind| *kind == TokenKind::StreamEnd)? {
            self.take_front_comments()?
        } else {
            None
        };
        let comments = self.node_comments(own);
        self.state = if self.document_version == YamlVersion::V1_1 {
            State::DocumentStart
        } else {
            State::ImplicitDocumentStart
        };
        Ok(Event::new(EventKind::DocumentEnd { explicit })
            .with_marks(start_mark, end_mark)
            .with_comments(comments))
    }

    fn parse_document_content(&mut self) -> Result<Event> {
        let empty = self.check(|kind| {
            matches!(
                kind,
                TokenKind::VersionDirective { .. }
                    | TokenKind::TagDirective { .. }
                    | TokenKind::ReservedDirective { .. }
                    | TokenKind::DocumentStart
                    | TokenKind::DocumentEnd
                    | TokenKind::StreamEnd
            )
        })?;
        if empty {
            let (mark, _, _) = self.peek_info()?;
            self.state = self.pop_state();
            return Ok(self.empty_scalar(mark));
        }
        self.parse_node(true, false)
    }

    fn process_directives(&mut self) -> Result<(Option<(u32, u32)>, Vec<(String, String)>)> {
        let mut version = None;
        let mut declared: Vec<(String, String)> = Vec::new();
        loop {
            let is_directive = self.check(|kind| {
                matches!(
                    kind,
                    TokenKind::VersionDirective { .. }
                        | TokenKind::TagDirective { .. }
                        | TokenKind::ReservedDirective { .. }
                )
            })?;
            if !is_directive {
                break;
            }
            let token = self.next_token()?;
            match token.kind {
                TokenKind::VersionDirective { major, minor } => {
                    if version.is_some() {
                        return Err(Error::parser(
                            None,
                            None,
                            "found duplicate YAML directive",
                            Some(token.start_mark),
                        ));
                    }
                    if major != 1 {
                        return Err(Error::parser(
                            None,
                            None,
                            "found incompatible YAML document (version 1.* is required)",
                            Some(token.start_mark),
                        ));
                    }
                    trace!("%YAML {major}.{minor}");
                    version = Some((major, minor));
                }
                TokenKind::TagDirective { handle, prefix } => {
                    if declared.iter().any(|(known, _)| *known == handle) {
                        return Err(Error::parser(
                            None,
                            None,
                            format!("duplicate tag handle '{handle}'"),
                            Some(token.start_mark),
                        ));
                    }
                    trace!("%TAG {handle} {prefix}");
                    declared.push((handle, prefix));
                }
                TokenKind::ReservedDirective { name } => {
                    trace!("skipping reserved directive %{name}");
                }
                _ => {}
            }
        }
        self.tag_handles = declared.iter().cloned().collect();
        for (handle, prefix) in DEFAULT_TAG_HANDLES {
            self.tag_handles
                .entry((*handle).to_owned())
                .or_insert_with(|| (*prefix).to_owned());
        }
        Ok((version, declared))
    }

    // Nodes

    fn parse_node(&mut self, block: bool, indentless_sequence: bool) -> Result<Event> {
        if self.check(|kind| matches!(kind, TokenKind::Alias(_)))? {
            let mut token = self.next_token()?;
            let comments = self.node_comments(token.comments.take());
            self.state = self.pop_state();
            let TokenKind::Alias(anchor) = token.kind else {
                unreachable!("checked alias token")
            };
            return Ok(Event::new(EventKind::Alias { anchor })
                .with_marks(token.start_mark, token.end_mark)
                .with_comments(comments));
        }

        let mut anchor: Option<SmolStr> = None;
        let mut raw_tag: Option<(Option<SmolStr>, String)> = None;
        let mut start_mark: Option<Mark> = None;
        let mut end_mark: Option<Mark> = None;
        let mut tag_mark: Option<Mark> = None;
        for _ in 0..2 {
            let mut token = if anchor.is_none()
                && self.check(|kind| matches!(kind, TokenKind::Anchor(_)))?
            {
                self.next_token()?
            } else if raw_tag.is_none() && self.check(|kind| matches!(kind, TokenKind::Tag { .. }))? {
                self.next_token()?
            } else {
                break;
            };
            self.carry_comments(&mut token);
            if start_mark.is_none() {
                start_mark = Some(token.start_mark.clone());
            }
            end_mark = Some(token.end_mark.clone());
            match token.kind {
                TokenKind::Anchor(name) => anchor = Some(name),
                TokenKind::Tag { handle, suffix } => {
                    tag_mark = Some(token.start_mark);
                    raw_tag = Some((handle, suffix));
                }
                _ => {}
            }
        }

        let tag = match raw_tag {
            Some((Some(handle), suffix)) => Some(self.transform_tag(
                &handle,
                &suffix,
                start_mark.as_ref(),
                tag_mark,
            )?),
            Some((None, suffix)) => Some(suffix),
            None => None,
        };

        let (peek_start, peek_end, peek_name) = self.peek_info()?;
        let start_mark = start_mark.unwrap_or_else(|| peek_start.clone());
        let end_mark = end_mark.unwrap_or_else(|| peek_start.clone());
        let implicit = tag.as_deref().map_or(true, |tag| tag == "!");

        if indentless_sequence && self.check(|kind| *kind == TokenKind::BlockEntry)? {
            let comments = self.node_comments(None);
            self.state = State::IndentlessSequenceEntry;
            return Ok(Event::new(EventKind::SequenceStart {
                anchor,
                tag,
                implicit,
                flow_style: false,
            })
            .with_marks(start_mark, peek_end)
            .with_comments(comments));
        }

        if self.check(|kind| matches!(kind, TokenKind::Scalar { .. }))? {
            let mut token = self.next_token()?;
            let comments = self.node_comments(token.comments.take());
            self.state = self.pop_state();
            let TokenKind::Scalar {
                value,
                style,
                fold_positions,
            } = token.kind
            else {
                unreachable!("checked scalar token")
            };
            let implicit = match tag.as_deref() {
                Some("!") => Implicit::new(true, false),
                None if style == ScalarStyle::Plain => Implicit::new(true, false),
                None => Implicit::new(false, true),
                Some(_) => Implicit::NONE,
            };
            let fold_positions = (!fold_positions.is_empty()).then_some(fold_positions);
            return Ok(Event::new(EventKind::Scalar {
                anchor,
                tag,
                implicit,
                value,
                style: Some(style),
                fold_positions,
            })
            .with_marks(start_mark, token.end_mark)
            .with_comments(comments));
        }

        let flow_sequence = self.check(|kind| *kind == TokenKind::FlowSequenceStart)?;
        if flow_sequence || self.check(|kind| *kind == TokenKind::FlowMappingStart)? {
            let own = self.take_front_comments()?;
            let comments = self.node_comments(own);
            let kind = if flow_sequence {
                self.state = State::FlowSequenceFirstEntry;
                EventKind::SequenceStart {
                    anchor,
                    tag,
                    implicit,
                    flow_style: true,
                }
            } else {
                self.state = State::FlowMappingFirstKey;
                EventKind::MappingStart {
                    anchor,
                    tag,
                    implicit,
                    flow_style: true,
                }
            };
            return Ok(Event::new(kind)
                .with_marks(start_mark, peek_end)
                .with_comments(comments));
        }

        if block {
            let block_sequence = self.check(|kind| *kind == TokenKind::BlockSequenceStart)?;
            if block_sequence || self.check(|kind| *kind == TokenKind::BlockMappingStart)? {
                let comments = self.node_comments(None);
                let kind = if block_sequence {
                    self.state = State::BlockSequenceFirstEntry;
                    EventKind::SequenceStart {
                        anchor,
                        tag,
                        implicit,
                        flow_style: false,
                    }
                } else {
                    self.state = State::BlockMappingFirstKey;
                    EventKind::MappingStart {
                        anchor,
                        tag,
                        implicit,
                        flow_style: false,
                    }
                };
                return Ok(Event::new(kind)
                    .with_marks(start_mark, peek_start)
                    .with_comments(comments));
            }
        }

        if anchor.is_some() || tag.is_some() {
            let comments = self.node_comments(None);
            self.state = self.pop_state();
            return Ok(Event::new(EventKind::Scalar {
                anchor,
                tag,
                implicit: Implicit::new(implicit, false),
                value: String::new(),
                style: None,
                fold_positions: None,
            })
            .with_marks(start_mark, end_mark)
            .with_comments(comments));
        }

        let context = if block {
            "while parsing a block node"
        } else {
            "while parsing a flow node"
        };
        Err(Error::parser(
            Some(context),
            Some(start_mark),
            format!("expected the node content, but found {peek_name}"),
            Some(peek_start),
        ))
    }

    fn transform_tag(
        &self,
        handle: &str,
        suffix: &str,
        start_mark: Option<&Mark>,
        tag_mark: Option<Mark>,
    ) -> Result<String> {
        let Some(prefix) = self.tag_handles.get(handle) else {
            return Err(Error::parser(
                Some("while parsing a node"),
                start_mark.cloned(),
                format!("found undefined tag handle '{handle}'"),
                tag_mark,
            ));
        };
        if self.round_trip && !(handle == "!!" && STANDARD_SUFFIXES.contains(&suffix)) && handle != "!" {
            return Ok(format!("{handle}{suffix}"));
        }
        Ok(format!("{prefix}{suffix}"))
    }

    fn empty_scalar(&mut self, mark: Mark) -> Event {
        let comments = self.node_comments(None);
        Event::new(EventKind::Scalar {
            anchor: None,
            tag: None,
            implicit: Implicit::new(true, false),
            value: String::new(),
            style: None,
            fold_positions: None,
        })
        .with_marks(mark.clone(), mark)
        .with_comments(comments)
    }

    fn collection_end(&mut self, kind: EventKind) -> Result<Event> {
        let mut token = self.next_token()?;
        let comments = self.node_comments(token.comments.take());
        self.state = self.pop_state();
        self.marks.pop();
        Ok(Event::new(kind)
            .with_marks(token.start_mark, token.end_mark)
            .with_comments(comments))
    }

    fn open_mark(&self) -> Option<Mark> {
        self.marks.last().cloned()
    }

    // Block collections

    fn parse_block_sequence_entry(&mut self) -> Result<Event> {
        if self.check(|kind| *kind == TokenKind::BlockEntry)? {
            let mut token = self.next_token()?;
            self.carry_comments(&mut token);
            if !self.check(|kind| matches!(kind, TokenKind::BlockEntry | TokenKind::BlockEnd))? {
                self.states.push(State::BlockSequenceEntry);
                return self.parse_node(true, false);
            }
            self.state = State::BlockSequenceEntry;
            return Ok(self.empty_scalar(token.end_mark));
        }
        if !self.check(|kind| *kind == TokenKind::BlockEnd)? {
            let (mark, _, name) = self.peek_info()?;
            return Err(Error::parser(
                Some("while parsing a block collection"),
                self.open_mark(),
                format!("expected <block end>, but found {name}"),
                Some(mark),
            ));
        }
        self.collection_end(EventKind::SequenceEnd)
    }

    fn parse_indentless_sequence_entry(&mut self) -> Result<Event> {
        if self.check(|kind| *kind == TokenKind::BlockEntry)? {
            let mut token = self.next_token()?;
            self.carry_comments(&mut token);
            let ends_entry = self.check(|kind| {
                matches!(
                    kind,
                    TokenKind::BlockEntry | TokenKind::Key | TokenKind::Value | TokenKind::BlockEnd
                )
            })?;
            if !ends_entry {
                self.states.push(State::IndentlessSequenceEntry);
                return self.parse_node(true, false);
            }
            self.state = State::IndentlessSequenceEntry;
            return Ok(self.empty_scalar(token.end_mark));
        }
        let (mark, _, _) = self.peek_info()?;
        self.state = self.pop_state();
        Ok(Event::new(EventKind::SequenceEnd).with_marks(mark.clone(), mark))
    }

    fn parse_block_mapping_key(&mut self) -> Result<Event> {
        if self.check(|kind| *kind == TokenKind::Key)? {
            let mut token = self.next_token()?;
            self.carry_comments(&mut token);
            if !self.check(|kind| {
                matches!(kind, TokenKind::Key | TokenKind::Value | TokenKind::BlockEnd)
            })? {
                self.states.push(State::BlockMappingValue);
                return self.parse_node(true, true);
            }
            self.state = State::BlockMappingValue;
            return Ok(self.empty_scalar(token.end_mark));
        }
        if self.document_version != YamlVersion::V1_1
            && self.check(|kind| *kind == TokenKind::Value)?
        {
            let (mark, _, _) = self.peek_info()?;
            self.state = State::BlockMappingValue;
            return Ok(self.empty_scalar(mark));
        }
        if !self.check(|kind| *kind == TokenKind::BlockEnd)? {
            let (mark, _, name) = self.peek_info()?;
            return Err(Error::parser(
                Some("while parsing a block mapping"),
                self.open_mark(),
                format!("expected <block end>, but found {name}"),
                Some(mark),
            ));
        }
        self.collection_end(EventKind::MappingEnd)
    }

    fn parse_block_mapping_value(&mut self) -> Result<Event> {
        if self.check(|kind| *kind == TokenKind::Value)? {
            let mut token = self.next_token()?;
            self.carry_comments(&mut token);
            if !self.check(|kind| {
                matches!(kind, TokenKind::Key | TokenKind::Value | TokenKind::BlockEnd)
            })? {
                self.states.push(State::BlockMappingKey);
                return self.parse_node(true, true);
            }
            self.state = State::BlockMappingKey;
            return Ok(self.empty_scalar(token.end_mark));
        }
        self.state = State::BlockMappingKey;
        let (mark, _, _) = self.peek_info()?;
        Ok(self.empty_scalar(mark))
    }

    // Flow collections

    fn parse_flow_sequence_entry(&mut self, first: bool) -> Result<Event> {
        if !self.check(|kind| *kind == TokenKind::FlowSequenceEnd)? {
            if !first {
                if self.check(|kind| *kind == TokenKind::FlowEntry)? {
                    let mut token = self.next_token()?;
                    self.carry_comments(&mut token);
                } else {
                    let (mark, _, name) = self.peek_info()?;
                    return Err(Error::parser(
                        Some("while parsing a flow sequence"),
                        self.open_mark(),
                        format!("expected ',' or ']', but got {name}"),
                        Some(mark),
                    ));
                }
            }
            if self.check(|kind| *kind == TokenKind::Key)? {
                let (start_mark, end_mark, _) = self.peek_info()?;
                self.state = State::FlowSequenceEntryMappingKey;
                return Ok(Event::new(EventKind::MappingStart {
                    anchor: None,
                    tag: None,
                    implicit: true,
                    flow_style: true,
                })
                .with_marks(start_mark, end_mark));
            }
            if !self.check(|kind| *kind == TokenKind::FlowSequenceEnd)? {
                self.states.push(State::FlowSequenceEntry);
                return self.parse_node(false, false);
            }
        }
        self.collection_end(EventKind::SequenceEnd)
    }

    fn parse_flow_sequence_entry_mapping_key(&mut self) -> Result<Event> {
        let token = self.next_token()?;
        if !self.check(|kind| {
            matches!(
                kind,
                TokenKind::Value | TokenKind::FlowEntry | TokenKind::FlowSequenceEnd
            )
        })? {
            self.states.push(State::FlowSequenceEntryMappingValue);
            return self.parse_node(false, false);
        }
        self.state = State::FlowSequenceEntryMappingValue;
        Ok(self.empty_scalar(token.end_mark))
    }

    fn parse_flow_sequence_entry_mapping_value(&mut self) -> Result<Event> {
        if self.check(|kind| *kind == TokenKind::Value)? {
            let token = self.next_token()?;
            if !self.check(|kind| {
                matches!(kind, TokenKind::FlowEntry | TokenKind::FlowSequenceEnd)
            })? {
                self.states.push(State::FlowSequenceEntryMappingEnd);
                return self.parse_node(false, false);
            }
            self.state = State::FlowSequenceEntryMappingEnd;
            return Ok(self.empty_scalar(token.end_mark));
        }
        self.state = State::FlowSequenceEntryMappingEnd;
        let (mark, _, _) = self.peek_info()?;
        Ok(self.empty_scalar(mark))
    }

    fn parse_flow_mapping_key(&mut self, first: bool) -> Result<Event> {
        if !self.check(|kind| *kind == TokenKind::FlowMappingEnd)? {
            if !first {
                if self.check(|kind| *kind == TokenKind::FlowEntry)? {
                    let mut token = self.next_token()?;
                    self.carry_comments(&mut token);
                } else {
                    let (mark, _, name) = self.peek_info()?;
                    return Err(Error::parser(
                        Some("while parsing a flow mapping"),
                        self.open_mark(),
                        format!("expected ',' or '}}', but got {name}"),
                        Some(mark),
                    ));
                }
            }
            if self.check(|kind| *kind == TokenKind::Key)? {
                let token = self.next_token()?;
                if !self.check(|kind| {
                    matches!(
                        kind,
                        TokenKind::Value | TokenKind::FlowEntry | TokenKind::FlowMappingEnd
                    )
                })? {
                    self.states.push(State::FlowMappingValue);
                    return self.parse_node(false, false);
                }
                self.state = State::FlowMappingValue;
                return Ok(self.empty_scalar(token.end_mark));
            }
            if self.document_version != YamlVersion::V1_1
                && self.check(|kind| *kind == TokenKind::Value)?
            {
                let (_, mark, _) = self.peek_info()?;
                self.state = State::FlowMappingValue;
                return Ok(self.empty_scalar(mark));
            }
            if !self.check(|kind| *kind == TokenKind::FlowMappingEnd)? {
                self.states.push(State::FlowMappingEmptyValue);
                return self.parse_node(false, false);
            }
        }
        self.collection_end(EventKind::MappingEnd)
    }

    fn parse_flow_mapping_value(&mut self) -> Result<Event> {
        if self.check(|kind| *kind == TokenKind::Value)? {
            let token = self.next_token()?;
            if !self.check(|kind| matches!(kind, TokenKind::FlowEntry | TokenKind::FlowMappingEnd))?
            {
                self.states.push(State::FlowMappingKey);
                return self.parse_node(false, false);
            }
            self.state = State::FlowMappingKey;
            return Ok(self.empty_scalar(token.end_mark));
        }
        self.state = State::FlowMappingKey;
        let (mark, _, _) = self.peek_info()?;
        Ok(self.empty_scalar(mark))
    }
}

impl Iterator for Parser {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        self.get_event().transpose()
    }
}

fn default_tag_handles() -> HashMap<String, String> {
    DEFAULT_TAG_HANDLES
        .iter()
        .map(|(handle, prefix)| ((*handle).to_owned(), (*prefix).to_owned()))
        .collect()
}

/// Token name as it appears in error messages, always quoted.
fn token_repr(kind: &TokenKind) -> String {
    let name = kind.name();
    if name.starts_with('\'') {
        name.to_owned()
    } else {
        format!("'{name}'")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comments::CommentLine;
    use crate::constants::TAG_STR;
    use crate::decode::reader::Reader;
    use rstest::rstest;

    fn parser(input: &str, round_trip: bool) -> Parser {
        let reader = Reader::from_str(input, "<test>").unwrap();
        Parser::new(Scanner::new(reader).with_round_trip(round_trip)).with_round_trip(round_trip)
    }

    fn events(input: &str) -> Vec<Event> {
        parser(input, false).map(|event| event.unwrap()).collect()
    }

    fn names(input: &str) -> Vec<&'static str> {
        events(input).iter().map(|event| event.kind.name()).collect()
    }

    fn parse_error(input: &str) -> Error {
        parser(input, false)
            .find_map(|event| event.err())
            .expect("parser error")
    }

    #[rstest]
    fn test_block_mapping_events() {
        assert_eq!(
            names("a: 1\nb: [x]\n"),
            vec![
                "StreamStartEvent",
                "DocumentStartEvent",
                "MappingStartEvent",
                "ScalarEvent",
                "ScalarEvent",
                "ScalarEvent",
                "SequenceStartEvent",
                "ScalarEvent",
                "SequenceEndEvent",
                "MappingEndEvent",
                "DocumentEndEvent",
                "StreamEndEvent",
            ]
        );
    }

    #[rstest]
    fn test_indentless_sequence_under_key() {
        let names = names("a:\n- 1\n- 2\nb: 3\n");
        assert_eq!(
            names[3..9],
            [
                "ScalarEvent",
                "SequenceStartEvent",
                "ScalarEvent",
                "ScalarEvent",
                "SequenceEndEvent",
                "ScalarEvent",
            ]
        );
    }

    #[rstest]
    fn test_scalar_implicit_flags() {
        let events = events("- plain\n- 'quoted'\n- !!str tagged\n- ! bang\n");
        let flags: Vec<Implicit> = events
            .iter()
            .filter_map(|event| match &event.kind {
                EventKind::Scalar { implicit, .. } => Some(*implicit),
                _ => None,
            })
            .collect();
        assert_eq!(
            flags,
            vec![
                Implicit::new(true, false),
                Implicit::new(false, true),
                Implicit::NONE,
                Implicit::new(true, false),
            ]
        );
        let tagged = events.iter().find_map(|event| match &event.kind {
            EventKind::Scalar { tag: Some(tag), value, .. } if value == "tagged" => Some(tag.clone()),
            _ => None,
        });
        assert_eq!(tagged.as_deref(), Some(TAG_STR));
    }

    #[rstest]
    fn test_empty_values_and_explicit_documents() {
        let events = events("--- \na:\n...\n---\n");
        let scalars: Vec<&str> = events
            .iter()
            .filter_map(|event| match &event.kind {
                EventKind::Scalar { value, .. } => Some(value.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(scalars, vec!["a", "", ""]);
        let explicit_ends: Vec<bool> = events
            .iter()
            .filter_map(|event| match event.kind {
                EventKind::DocumentEnd { explicit } => Some(explicit),
                _ => None,
            })
            .collect();
        assert_eq!(explicit_ends, vec![true, false]);
    }

    #[rstest]
    fn test_single_pair_mapping_in_flow_sequence() {
        assert_eq!(
            names("[a: 1, b]")[2..8],
            [
                "SequenceStartEvent",
                "MappingStartEvent",
                "ScalarEvent",
                "ScalarEvent",
                "MappingEndEvent",
                "ScalarEvent",
            ]
        );
    }

    #[rstest]
    fn test_directives_reported_on_document_start() {
        let events = events("%YAML 1.1\n%TAG !e! tag:example.com,2000:\n--- !e!x a\n");
        let EventKind::DocumentStart {
            explicit,
            version,
            tags,
        } = &events[1].kind
        else {
            panic!("expected document start");
        };
        assert!(explicit);
        assert_eq!(*version, Some((1, 1)));
        assert_eq!(tags, &[("!e!".to_owned(), "tag:example.com,2000:".to_owned())]);
        let EventKind::Scalar { tag, .. } = &events[2].kind else {
            panic!("expected scalar");
        };
        assert_eq!(tag.as_deref(), Some("tag:example.com,2000:x"));
    }

    #[rstest]
    #[case("%YAML 1.1\n%YAML 1.1\n--- a", "found duplicate YAML directive")]
    #[case("%YAML 2.0\n--- a", "found incompatible YAML document (version 1.* is required)")]
    #[case("%TAG !a! x\n%TAG !a! y\n--- a", "duplicate tag handle '!a!'")]
    #[case("!u!x a", "found undefined tag handle '!u!'")]
    #[case("[a, b", "expected ',' or ']', but got '<stream end>'")]
    #[case("{a: 1 [b]}", "expected ',' or '}', but got '['")]
    #[case("- a\nb: c", "expected <block end>, but found '?'")]
    fn test_parser_errors(#[case] input: &str, #[case] problem: &str) {
        let err = parse_error(input);
        assert_eq!(err.problem(), Some(problem), "{err}");
    }

    #[rstest]
    fn test_round_trip_keeps_local_shorthand_tags() {
        let events: Vec<Event> = parser("- !!omap []\n- !!custom x\n", true)
            .map(|event| event.unwrap())
            .collect();
        let tags: Vec<String> = events
            .iter()
            .filter_map(|event| match &event.kind {
                EventKind::Scalar { tag, .. }
                | EventKind::SequenceStart { tag, .. } => tag.clone(),
                _ => None,
            })
            .collect();
        assert_eq!(tags, vec!["tag:yaml.org,2002:omap", "!!custom"]);
    }

    #[rstest]
    fn test_round_trip_comment_routing() {
        let events: Vec<Event> = parser("a:  # on key line\n  b: 1\n# trailing\n", true)
            .map(|event| event.unwrap())
            .collect();
        let nested = events
            .iter()
            .filter(|event| matches!(event.kind, EventKind::MappingStart { .. }))
            .nth(1)
            .unwrap();
        assert_eq!(nested.post_comment(), Some(&CommentLine::new(4, "# on key line")));
        let end = events
            .iter()
            .find(|event| matches!(event.kind, EventKind::DocumentEnd { .. }))
            .unwrap();
        assert_eq!(end.pre_comments(), &[CommentLine::new(0, "# trailing")]);
    }
}
