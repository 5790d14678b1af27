//! Turns an event stream back into YAML text.

use std::collections::VecDeque;

use log::trace;
use smol_str::SmolStr;

use crate::comments::CommentLine;
use crate::constants::{
    is_anchor_char, DEFAULT_INDENT, DEFAULT_TAG_HANDLES, DEFAULT_WIDTH, MAX_SIMPLE_KEY_LENGTH,
    TAG_SET,
};
use crate::encode::analysis::{analyze_scalar, ScalarAnalysis};
use crate::encode::writer::Writer;
use crate::error::Error;
use crate::event::{Event, EventKind, ScalarStyle};
use crate::options::{DumpOptions, YamlVersion};
use crate::Result;

const ESCAPES: &[(char, char)] = &[
    ('\0', '0'),
    ('\u{7}', 'a'),
    ('\u{8}', 'b'),
    ('\t', 't'),
    ('\n', 'n'),
    ('\u{b}', 'v'),
    ('\u{c}', 'f'),
    ('\r', 'r'),
    ('\u{1b}', 'e'),
    ('"', '"'),
    ('\\', '\\'),
    ('\u{85}', 'N'),
    ('\u{a0}', '_'),
    ('\u{2028}', 'L'),
    ('\u{2029}', 'P'),
];

const URI_PUNCTUATION: &str = "-;/?:@&=+$,_.~*'()[]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    StreamStart,
    FirstDocumentStart,
    DocumentStart,
    DocumentEnd,
    DocumentRoot,
    FirstFlowSequenceItem,
    FlowSequenceItem,
    FirstFlowMappingKey,
    FlowMappingKey,
    FlowMappingSimpleValue,
    FlowMappingValue,
    FlowSetValue,
    FirstBlockSequenceItem,
    BlockSequenceItem,
    FirstBlockMappingKey,
    BlockMappingKey,
    BlockMappingSimpleValue,
    BlockMappingValue,
    BlockSetValue,
    Nothing,
}

/// Where the node being written sits in its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Root,
    Sequence,
    Mapping,
    SimpleKey,
}

fn is_line_break(ch: char) -> bool {
    matches!(ch, '\n' | '\u{85}' | '\u{2028}' | '\u{2029}')
}

fn event_anchor(event: &Event) -> Option<&SmolStr> {
    match &event.kind {
        EventKind::Scalar { anchor, .. }
        | EventKind::SequenceStart { anchor, .. }
        | EventKind::MappingStart { anchor, .. } => anchor.as_ref(),
        _ => None,
    }
}

fn event_tag(event: &Event) -> Option<&str> {
    match &event.kind {
        EventKind::Scalar { tag, .. }
        | EventKind::SequenceStart { tag, .. }
        | EventKind::MappingStart { tag, .. } => tag.as_deref(),
        _ => None,
    }
}

/// The null value of a `!!set` entry, which is left out of the output.
fn is_empty_null(event: &Event) -> bool {
    matches!(
        &event.kind,
        EventKind::Scalar { anchor: None, implicit, value, .. } if implicit.plain && value.is_empty()
    ) && event.comments.is_none()
}

fn prepare_version(major: u32, minor: u32) -> Result<String> {
    if major != 1 {
        return Err(Error::emitter(format!(
            "unsupported YAML version: {major}.{minor}"
        )));
    }
    Ok(format!("{major}.{minor}"))
}

fn prepare_tag_handle(handle: &str) -> Result<String> {
    if handle.is_empty() {
        return Err(Error::emitter("tag handle must not be empty"));
    }
    if !handle.starts_with('!') || !handle.ends_with('!') {
        return Err(Error::emitter(format!(
            "tag handle must start and end with '!': {handle:?}"
        )));
    }
    let inner = &handle[1..handle.len().saturating_sub(1).max(1)];
    if let Some(ch) = inner
        .chars()
        .find(|ch| !(ch.is_ascii_alphanumeric() || *ch == '-' || *ch == '_'))
    {
        return Err(Error::emitter(format!(
            "invalid character {ch:?} in the tag handle: {handle:?}"
        )));
    }
    Ok(handle.to_owned())
}

fn prepare_anchor(anchor: &str) -> Result<String> {
    if anchor.is_empty() {
        return Err(Error::emitter("anchor must not be empty"));
    }
    if let Some(ch) = anchor.chars().find(|ch| !is_anchor_char(*ch)) {
        return Err(Error::emitter(format!(
            "invalid character {ch:?} in the anchor: {anchor:?}"
        )));
    }
    Ok(anchor.to_owned())
}

/// Percent-encodes the characters a tag URI cannot carry as they are.
fn escape_uri(text: &str, version: YamlVersion, allow: impl Fn(char) -> bool) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric()
            || URI_PUNCTUATION.contains(ch)
            || (ch == '#' && version == YamlVersion::V1_2)
            || allow(ch)
        {
            escaped.push(ch);
        } else {
            let mut buffer = [0u8; 4];
            for byte in ch.encode_utf8(&mut buffer).bytes() {
                escaped.push_str(&format!("%{byte:02X}"));
            }
        }
    }
    escaped
}

fn escape_char(ch: char) -> String {
    if let Some((_, code)) = ESCAPES.iter().find(|(raw, _)| *raw == ch) {
        return format!("\\{code}");
    }
    let code = ch as u32;
    if code <= 0xff {
        format!("\\x{code:02X}")
    } else if code <= 0xffff {
        format!("\\u{code:04X}")
    } else {
        format!("\\U{code:08X}")
    }
}

/// Writes events as YAML text.
///
/// Events are buffered until enough of them are known to make a layout
/// decision: one after a document start, two after a sequence start and
/// three after a mapping start, which is how an empty collection is told
/// apart from one that needs a block.
pub struct Emitter {
    writer: Writer,
    events: VecDeque<Event>,
    state: State,
    states: Vec<State>,
    indent: Option<usize>,
    /// Previous indentation, and whether the collection that replaced it is
    /// a sequence.
    indents: Vec<(Option<usize>, bool)>,
    flow_level: usize,
    /// One entry per open mapping, true for a `!!set`.
    sets: Vec<bool>,
    root_context: bool,
    sequence_context: bool,
    mapping_context: bool,
    simple_key_context: bool,
    open_ended: bool,
    canonical: bool,
    allow_unicode: bool,
    best_indent: usize,
    best_map_indent: usize,
    best_sequence_indent: usize,
    dash_offset: usize,
    best_width: usize,
    default_version: YamlVersion,
    version: YamlVersion,
    indentless_sequences: bool,
    pending_indentless: Option<bool>,
    /// Prefix to handle, in directive order.
    tag_prefixes: Vec<(String, String)>,
    prepared_anchor: Option<String>,
    prepared_tag: Option<String>,
    analysis: Option<ScalarAnalysis>,
    style: Option<ScalarStyle>,
}

impl Emitter {
    pub fn new(options: &DumpOptions) -> Self {
        let valid = |spaces: usize| (1..=9).contains(&spaces);
        let best_indent = Some(options.indent.get_spaces())
            .filter(|spaces| valid(*spaces))
            .unwrap_or(DEFAULT_INDENT);
        let best_map_indent = Some(options.effective_map_indent())
            .filter(|spaces| valid(*spaces))
            .unwrap_or(best_indent);
        let best_sequence_indent = Some(options.effective_sequence_indent())
            .filter(|spaces| valid(*spaces))
            .unwrap_or(best_indent);
        let best_width = if options.width > best_indent * 2 {
            options.width
        } else {
            DEFAULT_WIDTH
        };
        let default_version = options.version.unwrap_or_default();
        Self {
            writer: Writer::new(options.line_break, options.encoding),
            events: VecDeque::new(),
            state: State::StreamStart,
            states: Vec::new(),
            indent: None,
            indents: Vec::new(),
            flow_level: 0,
            sets: Vec::new(),
            root_context: false,
            sequence_context: false,
            mapping_context: false,
            simple_key_context: false,
            open_ended: false,
            canonical: options.canonical,
            allow_unicode: options.allow_unicode,
            best_indent,
            best_map_indent,
            best_sequence_indent,
            dash_offset: options
                .sequence_dash_offset
                .min(best_sequence_indent.saturating_sub(2)),
            best_width,
            default_version,
            version: default_version,
            indentless_sequences: false,
            pending_indentless: None,
            tag_prefixes: default_tag_prefixes(),
            prepared_anchor: None,
            prepared_tag: None,
            analysis: None,
            style: None,
        }
    }

    /// Write block sequences under a mapping key at the key's column,
    /// starting with the next document.
    pub fn set_indentless_sequences(&mut self, indentless: bool) {
        self.pending_indentless = Some(indentless);
    }

    pub fn emit(&mut self, event: Event) -> Result<()> {
        self.events.push_back(event);
        while !self.need_more_events() {
            let Some(event) = self.events.pop_front() else {
                break;
            };
            self.dispatch(&event)?;
        }
        Ok(())
    }

    /// True while the head of the buffer cannot be written yet.
    pub fn need_more_events(&self) -> bool {
        let Some(first) = self.events.front() else {
            return true;
        };
        match first.kind {
            EventKind::DocumentStart { .. } => self.need_events(1),
            EventKind::SequenceStart { .. } => self.need_events(2),
            EventKind::MappingStart { .. } => self.need_events(3),
            _ => false,
        }
    }

    fn need_events(&self, count: usize) -> bool {
        let mut level: isize = 0;
        for event in self.events.iter().skip(1) {
            match event.kind {
                EventKind::DocumentStart { .. }
                | EventKind::SequenceStart { .. }
                | EventKind::MappingStart { .. } => level += 1,
                EventKind::DocumentEnd { .. }
                | EventKind::SequenceEnd
                | EventKind::MappingEnd => level -= 1,
                EventKind::StreamEnd => level = -1,
                _ => {}
            }
            if level < 0 {
                return false;
            }
        }
        self.events.len() < count + 1
    }

    pub fn as_str(&self) -> &str {
        self.writer.as_str()
    }

    pub fn finish(self) -> String {
        self.writer.finish()
    }

    /// The output in the configured encoding.
    pub fn finish_bytes(self) -> Vec<u8> {
        self.writer.finish_bytes()
    }

    fn dispatch(&mut self, event: &Event) -> Result<()> {
        match self.state {
            State::StreamStart => self.expect_stream_start(event),
            State::FirstDocumentStart => self.expect_document_start(event, true),
            State::DocumentStart => self.expect_document_start(event, false),
            State::DocumentEnd => self.expect_document_end(event),
            State::DocumentRoot => self.expect_document_root(event),
            State::FirstFlowSequenceItem => self.expect_flow_sequence_item(event, true),
            State::FlowSequenceItem => self.expect_flow_sequence_item(event, false),
            State::FirstFlowMappingKey => self.expect_flow_mapping_key(event, true),
            State::FlowMappingKey => self.expect_flow_mapping_key(event, false),
            State::FlowMappingSimpleValue => self.expect_flow_mapping_simple_value(event),
            State::FlowMappingValue => self.expect_flow_mapping_value(event),
            State::FlowSetValue => self.expect_flow_set_value(event),
            State::FirstBlockSequenceItem => self.expect_block_sequence_item(event, true),
            State::BlockSequenceItem => self.expect_block_sequence_item(event, false),
            State::FirstBlockMappingKey => self.expect_block_mapping_key(event, true),
            State::BlockMappingKey => self.expect_block_mapping_key(event, false),
            State::BlockMappingSimpleValue => self.expect_block_mapping_simple_value(event),
            State::BlockMappingValue => self.expect_block_mapping_value(event),
            State::BlockSetValue => self.expect_block_set_value(event),
            State::Nothing => Err(Error::emitter(format!(
                "expected nothing, but got {}",
                event.kind.name()
            ))),
        }
    }

    fn pop_state(&mut self) -> State {
        self.states.pop().unwrap_or(State::Nothing)
    }

    fn pop_indent(&mut self) {
        self.indent = self.indents.pop().and_then(|(indent, _)| indent);
    }

    fn increase_indent(&mut self, flow: bool, sequence: bool, indentless: bool) {
        self.indents.push((self.indent, sequence));
        self.indent = match self.indent {
            None if flow => Some(self.best_indent),
            None => Some(0),
            Some(indent) if indentless => Some(indent),
            Some(indent) => {
                let parent_is_sequence = self.indents.len() >= 2
                    && self.indents[self.indents.len() - 2].1;
                let step = if parent_is_sequence {
                    self.best_sequence_indent
                } else {
                    self.best_map_indent
                };
                Some(indent + step)
            }
        };
    }

    fn current_indent(&self) -> usize {
        self.indent.unwrap_or(0)
    }

    fn in_set(&self) -> bool {
        self.sets.last().copied().unwrap_or(false)
    }

    // Stream and documents

    fn expect_stream_start(&mut self, event: &Event) -> Result<()> {
        match event.kind {
            EventKind::StreamStart => {
                self.state = State::FirstDocumentStart;
                Ok(())
            }
            ref other => Err(Error::emitter(format!(
                "expected StreamStartEvent, but got {}",
                other.name()
            ))),
        }
    }

    fn expect_document_start(&mut self, event: &Event, first: bool) -> Result<()> {
        match &event.kind {
            EventKind::DocumentStart {
                explicit,
                version,
                tags,
            } => {
                if (version.is_some() || !tags.is_empty()) && self.open_ended {
                    self.write_indicator("...", true, false, false);
                    self.writer.write_indent(0);
                }
                if let Some(indentless) = self.pending_indentless.take() {
                    self.indentless_sequences = indentless;
                }
                self.version = self.default_version;
                if let Some((major, minor)) = *version {
                    let text = prepare_version(major, minor)?;
                    self.version =
                        YamlVersion::from_numbers(major, minor).unwrap_or(self.default_version);
                    self.write_directive(&format!("%YAML {text}"));
                }
                trace!("emitting document, YAML {}", self.version);
                self.tag_prefixes = default_tag_prefixes();
                for (handle, prefix) in tags {
                    let handle_text = prepare_tag_handle(handle)?;
                    let prefix_text = self.prepare_tag_prefix(prefix)?;
                    self.tag_prefixes.push((prefix.clone(), handle.clone()));
                    self.write_directive(&format!("%TAG {handle_text} {prefix_text}"));
                }
                let implicit = first
                    && !explicit
                    && !self.canonical
                    && version.is_none()
                    && tags.is_empty()
                    && !self.check_empty_document();
                self.write_pre_comments(event.pre_comments());
                if !implicit {
                    self.writer.write_indent(0);
                    self.write_indicator("---", true, false, false);
                    if let Some(post) = event.post_comment() {
                        self.write_post_comment(post);
                    }
                    if self.canonical {
                        self.writer.write_indent(0);
                    }
                }
                self.state = State::DocumentRoot;
                Ok(())
            }
            EventKind::StreamEnd => {
                self.state = State::Nothing;
                Ok(())
            }
            other => Err(Error::emitter(format!(
                "expected DocumentStartEvent, but got {}",
                other.name()
            ))),
        }
    }

    fn expect_document_end(&mut self, event: &Event) -> Result<()> {
        let EventKind::DocumentEnd { explicit } = event.kind else {
            return Err(Error::emitter(format!(
                "expected DocumentEndEvent, but got {}",
                event.kind.name()
            )));
        };
        self.writer.write_indent(0);
        self.write_pre_comments(event.pre_comments());
        if explicit {
            self.write_indicator("...", true, false, false);
            match event.post_comment() {
                Some(post) => self.write_post_comment(post),
                None => self.writer.write_indent(0),
            }
        }
        self.state = State::DocumentStart;
        Ok(())
    }

    fn expect_document_root(&mut self, event: &Event) -> Result<()> {
        self.states.push(State::DocumentEnd);
        self.write_pre_comments(event.pre_comments());
        self.expect_node(event, Context::Root)
    }

    fn check_empty_document(&self) -> bool {
        matches!(
            self.events.front().map(|event| &event.kind),
            Some(EventKind::Scalar { anchor: None, tag: None, implicit, value, .. })
                if implicit.plain && value.is_empty()
        )
    }

    fn check_empty_sequence(&self) -> bool {
        matches!(
            self.events.front().map(|event| &event.kind),
            Some(EventKind::SequenceEnd)
        )
    }

    fn check_empty_mapping(&self) -> bool {
        matches!(
            self.events.front().map(|event| &event.kind),
            Some(EventKind::MappingEnd)
        )
    }

    // Nodes

    fn expect_node(&mut self, event: &Event, context: Context) -> Result<()> {
        self.root_context = context == Context::Root;
        self.sequence_context = context == Context::Sequence;
        self.mapping_context = matches!(context, Context::Mapping | Context::SimpleKey);
        self.simple_key_context = context == Context::SimpleKey;
        match &event.kind {
            EventKind::Alias { anchor } => self.expect_alias(event, anchor),
            EventKind::Scalar { .. } => {
                self.process_anchor(event, "&")?;
                self.process_tag(event)?;
                self.expect_scalar(event)
            }
            EventKind::SequenceStart { flow_style, .. } => {
                self.process_anchor(event, "&")?;
                self.process_tag(event)?;
                if self.flow_level > 0
                    || self.canonical
                    || *flow_style
                    || self.check_empty_sequence()
                {
                    self.write_start_comment(event, true);
                    self.expect_flow_sequence();
                } else {
                    self.write_start_comment(event, false);
                    self.expect_block_sequence();
                }
                Ok(())
            }
            EventKind::MappingStart { tag, flow_style, .. } => {
                self.process_anchor(event, "&")?;
                self.process_tag(event)?;
                let is_set = tag.as_deref() == Some(TAG_SET);
                if self.flow_level > 0
                    || self.canonical
                    || *flow_style
                    || self.check_empty_mapping()
                {
                    self.write_start_comment(event, true);
                    self.expect_flow_mapping(is_set);
                } else {
                    self.write_start_comment(event, false);
                    self.expect_block_mapping(is_set);
                }
                Ok(())
            }
            other => Err(Error::emitter(format!(
                "expected NodeEvent, but got {}",
                other.name()
            ))),
        }
    }

    fn expect_alias(&mut self, event: &Event, anchor: &str) -> Result<()> {
        let prepared = prepare_anchor(anchor)?;
        self.write_indicator(&format!("*{prepared}"), true, false, false);
        if self.simple_key_context {
            // A `:` right after the name would be read as part of it.
            self.writer.write_char(' ');
        } else if self.flow_level == 0 {
            if let Some(post) = event.post_comment() {
                self.write_post_comment(post);
            }
        }
        self.state = self.pop_state();
        Ok(())
    }

    fn expect_scalar(&mut self, event: &Event) -> Result<()> {
        self.increase_indent(true, false, false);
        self.process_scalar(event);
        self.pop_indent();
        self.state = self.pop_state();
        Ok(())
    }

    // Flow collections

    fn expect_flow_sequence(&mut self) {
        self.write_indicator("[", true, true, false);
        self.flow_level += 1;
        self.increase_indent(true, true, false);
        self.state = State::FirstFlowSequenceItem;
    }

    fn expect_flow_sequence_item(&mut self, event: &Event, first: bool) -> Result<()> {
        if let EventKind::SequenceEnd = event.kind {
            self.pop_indent();
            self.flow_level -= 1;
            if self.canonical && !first {
                self.write_indicator(",", false, false, false);
                self.writer.write_indent(self.current_indent());
            }
            self.write_indicator("]", false, false, false);
            self.write_end_comment(event);
            self.state = self.pop_state();
            return Ok(());
        }
        if !first {
            self.write_indicator(",", false, false, false);
        }
        if self.canonical || self.writer.column > self.best_width {
            self.writer.write_indent(self.current_indent());
        }
        self.states.push(State::FlowSequenceItem);
        self.expect_node(event, Context::Sequence)
    }

    fn expect_flow_mapping(&mut self, is_set: bool) {
        self.write_indicator("{", true, true, false);
        self.flow_level += 1;
        self.increase_indent(true, false, false);
        self.sets.push(is_set);
        self.state = State::FirstFlowMappingKey;
    }

    fn expect_flow_mapping_key(&mut self, event: &Event, first: bool) -> Result<()> {
        if let EventKind::MappingEnd = event.kind {
            self.pop_indent();
            self.flow_level -= 1;
            self.sets.pop();
            if self.canonical && !first {
                self.write_indicator(",", false, false, false);
                self.writer.write_indent(self.current_indent());
            }
            self.write_indicator("}", false, false, false);
            self.write_end_comment(event);
            self.state = self.pop_state();
            return Ok(());
        }
        if !first {
            self.write_indicator(",", false, false, false);
        }
        if self.canonical || self.writer.column > self.best_width {
            self.writer.write_indent(self.current_indent());
        }
        if self.in_set() {
            self.write_indicator("?", true, false, false);
            self.states.push(State::FlowSetValue);
            self.expect_node(event, Context::Mapping)
        } else if !self.canonical && self.check_simple_key(event)? {
            self.states.push(State::FlowMappingSimpleValue);
            self.expect_node(event, Context::SimpleKey)
        } else {
            self.write_indicator("?", true, false, false);
            self.states.push(State::FlowMappingValue);
            self.expect_node(event, Context::Mapping)
        }
    }

    fn expect_flow_mapping_simple_value(&mut self, event: &Event) -> Result<()> {
        self.write_indicator(":", false, false, false);
        self.states.push(State::FlowMappingKey);
        self.expect_node(event, Context::Mapping)
    }

    fn expect_flow_mapping_value(&mut self, event: &Event) -> Result<()> {
        if self.canonical || self.writer.column > self.best_width {
            self.writer.write_indent(self.current_indent());
        }
        self.write_indicator(":", true, false, false);
        self.states.push(State::FlowMappingKey);
        self.expect_node(event, Context::Mapping)
    }

    fn expect_flow_set_value(&mut self, event: &Event) -> Result<()> {
        if !self.canonical && is_empty_null(event) {
            self.state = State::FlowMappingKey;
            return Ok(());
        }
        self.expect_flow_mapping_value(event)
    }

    // Block collections

    fn expect_block_sequence(&mut self) {
        let indentless =
            self.mapping_context && !self.writer.indention && self.indentless_sequences;
        self.increase_indent(false, true, indentless);
        self.state = State::FirstBlockSequenceItem;
    }

    fn expect_block_sequence_item(&mut self, event: &Event, first: bool) -> Result<()> {
        if !first {
            if let EventKind::SequenceEnd = event.kind {
                self.write_pre_comments(event.pre_comments());
                self.pop_indent();
                self.state = self.pop_state();
                return Ok(());
            }
        }
        self.write_pre_comments(event.pre_comments());
        self.writer.write_indent(self.current_indent());
        let dash = format!("{:width$}-", "", width = self.dash_offset);
        self.write_indicator(&dash, true, false, true);
        self.states.push(State::BlockSequenceItem);
        self.expect_node(event, Context::Sequence)
    }

    fn expect_block_mapping(&mut self, is_set: bool) {
        self.increase_indent(false, false, false);
        self.sets.push(is_set);
        self.state = State::FirstBlockMappingKey;
    }

    fn expect_block_mapping_key(&mut self, event: &Event, first: bool) -> Result<()> {
        if !first {
            if let EventKind::MappingEnd = event.kind {
                self.write_pre_comments(event.pre_comments());
                self.pop_indent();
                self.sets.pop();
                self.state = self.pop_state();
                return Ok(());
            }
        }
        self.write_pre_comments(event.pre_comments());
        self.writer.write_indent(self.current_indent());
        if self.in_set() {
            self.write_indicator("?", true, false, true);
            self.states.push(State::BlockSetValue);
            self.expect_node(event, Context::Mapping)
        } else if self.check_simple_key(event)? {
            self.states.push(State::BlockMappingSimpleValue);
            self.expect_node(event, Context::SimpleKey)
        } else {
            self.write_indicator("?", true, false, true);
            self.states.push(State::BlockMappingValue);
            self.expect_node(event, Context::Mapping)
        }
    }

    fn expect_block_mapping_simple_value(&mut self, event: &Event) -> Result<()> {
        self.write_indicator(":", false, false, false);
        self.write_value_comments(event);
        self.states.push(State::BlockMappingKey);
        self.expect_node(event, Context::Mapping)
    }

    fn expect_block_mapping_value(&mut self, event: &Event) -> Result<()> {
        self.writer.write_indent(self.current_indent());
        self.write_indicator(":", true, false, true);
        self.write_value_comments(event);
        self.states.push(State::BlockMappingKey);
        self.expect_node(event, Context::Mapping)
    }

    fn expect_block_set_value(&mut self, event: &Event) -> Result<()> {
        if is_empty_null(event) {
            self.state = State::BlockMappingKey;
            return Ok(());
        }
        self.expect_block_mapping_value(event)
    }

    fn check_simple_key(&mut self, event: &Event) -> Result<bool> {
        let mut length = 0;
        if let Some(anchor) = event_anchor(event) {
            if self.prepared_anchor.is_none() {
                self.prepared_anchor = Some(prepare_anchor(anchor)?);
            }
            length += self.prepared_anchor.as_ref().map_or(0, |anchor| anchor.chars().count());
        }
        if let Some(tag) = event_tag(event) {
            if self.prepared_tag.is_none() {
                self.prepared_tag = Some(self.prepare_tag(tag)?);
            }
            length += self.prepared_tag.as_ref().map_or(0, |tag| tag.chars().count());
        }
        let simple = match &event.kind {
            EventKind::Alias { .. } => true,
            EventKind::Scalar { value, style, .. } => {
                let analysis = self.analysis_for(value);
                length += value.chars().count();
                !analysis.multiline
                    && !(analysis.empty && style.is_some_and(ScalarStyle::is_block))
            }
            EventKind::SequenceStart { .. } => self.check_empty_sequence(),
            EventKind::MappingStart { .. } => self.check_empty_mapping(),
            _ => false,
        };
        Ok(simple && length < MAX_SIMPLE_KEY_LENGTH)
    }

    // Anchors and tags

    fn process_anchor(&mut self, event: &Event, indicator: &str) -> Result<()> {
        let Some(anchor) = event_anchor(event) else {
            self.prepared_anchor = None;
            return Ok(());
        };
        let prepared = match self.prepared_anchor.take() {
            Some(prepared) => prepared,
            None => prepare_anchor(anchor)?,
        };
        self.write_indicator(&format!("{indicator}{prepared}"), true, false, false);
        Ok(())
    }

    fn process_tag(&mut self, event: &Event) -> Result<()> {
        let mut tag = event_tag(event);
        match &event.kind {
            EventKind::Scalar { implicit, .. } => {
                let style = match self.style {
                    Some(style) => style,
                    None => {
                        let style = self.choose_scalar_style(event);
                        self.style = Some(style);
                        style
                    }
                };
                let plain = style == ScalarStyle::Plain;
                if (!self.canonical || tag.is_none())
                    && ((plain && implicit.plain) || (!plain && implicit.quoted))
                {
                    self.prepared_tag = None;
                    return Ok(());
                }
                if implicit.plain && tag.is_none() {
                    tag = Some("!");
                    self.prepared_tag = None;
                }
            }
            EventKind::SequenceStart { implicit, .. } | EventKind::MappingStart { implicit, .. } => {
                if (!self.canonical || tag.is_none()) && *implicit {
                    self.prepared_tag = None;
                    return Ok(());
                }
            }
            _ => {}
        }
        let Some(tag) = tag else {
            return Err(Error::emitter("tag is not specified"));
        };
        let prepared = match self.prepared_tag.take() {
            Some(prepared) => prepared,
            None => self.prepare_tag(tag)?,
        };
        if !prepared.is_empty() {
            self.write_indicator(&prepared, true, false, false);
        }
        Ok(())
    }

    /// Shortens `tag` with the longest matching `%TAG` prefix, or writes it
    /// verbatim. Tags kept in their `!handle!suffix` form reuse a declared
    /// handle; every other `!` tag is local and goes through the `!` handle.
    fn prepare_tag(&self, tag: &str) -> Result<String> {
        if tag.is_empty() {
            return Err(Error::emitter("tag must not be empty"));
        }
        if tag == "!" {
            return Ok(tag.to_owned());
        }
        if let Some(local) = tag.strip_prefix('!') {
            if let Some((handle, suffix)) = self.split_declared_handle(tag) {
                let suffix = escape_uri(suffix, self.version, |ch| ch == '!');
                return Ok(format!("{handle}{suffix}"));
            }
            let suffix = escape_uri(local, self.version, |_| false);
            let primary = self
                .tag_prefixes
                .iter()
                .any(|(prefix, handle)| prefix == "!" && handle == "!");
            return Ok(if primary {
                format!("!{suffix}")
            } else {
                format!("!<!{suffix}>")
            });
        }
        let mut best: Option<(&str, &str)> = None;
        for (prefix, handle) in &self.tag_prefixes {
            let matches = tag.starts_with(prefix.as_str()) && prefix.len() < tag.len();
            if matches && best.map_or(true, |(current, _)| prefix.len() >= current.len()) {
                best = Some((prefix.as_str(), handle.as_str()));
            }
        }
        Ok(match best {
            Some((prefix, handle)) => {
                let suffix = escape_uri(&tag[prefix.len()..], self.version, |ch| {
                    ch == '!' && handle != "!"
                });
                format!("{handle}{suffix}")
            }
            None => format!("!<{}>", escape_uri(tag, self.version, |_| false)),
        })
    }

    /// Splits `!name!suffix` (or `!!suffix`) when that handle is declared for
    /// the current document.
    fn split_declared_handle<'t>(&self, tag: &'t str) -> Option<(&'t str, &'t str)> {
        let end = tag[1..].find('!')? + 2;
        let handle = &tag[..end];
        let declared = self.tag_prefixes.iter().any(|(_, known)| known == handle);
        (declared && end < tag.len()).then(|| (handle, &tag[end..]))
    }

    fn prepare_tag_prefix(&self, prefix: &str) -> Result<String> {
        if prefix.is_empty() {
            return Err(Error::emitter("tag prefix must not be empty"));
        }
        Ok(match prefix.strip_prefix('!') {
            Some(rest) => format!("!{}", escape_uri(rest, self.version, |_| false)),
            None => escape_uri(prefix, self.version, |_| false),
        })
    }

    // Scalars

    fn analysis_for(&mut self, value: &str) -> ScalarAnalysis {
        if let Some(analysis) = self.analysis {
            return analysis;
        }
        let analysis = analyze_scalar(value, self.allow_unicode, self.version);
        self.analysis = Some(analysis);
        analysis
    }

    fn choose_scalar_style(&mut self, event: &Event) -> ScalarStyle {
        let EventKind::Scalar {
            tag,
            implicit,
            value,
            style,
            ..
        } = &event.kind
        else {
            return ScalarStyle::Plain;
        };
        let analysis = self.analysis_for(value);
        let requested = *style;
        if requested == Some(ScalarStyle::DoubleQuoted) || self.canonical {
            return ScalarStyle::DoubleQuoted;
        }
        let plain_requested = matches!(requested, None | Some(ScalarStyle::Plain));
        // With both implicit flags off the tag is written, so a plain
        // scalar cannot be misread.
        let tagged = !implicit.plain && !implicit.quoted && tag.is_some();
        if plain_requested && (implicit.plain || tagged) {
            let fits = if self.flow_level > 0 {
                analysis.allow_flow_plain
            } else {
                analysis.allow_block_plain
            };
            if fits && !(self.simple_key_context && (analysis.empty || analysis.multiline)) {
                return ScalarStyle::Plain;
            }
        }
        if let Some(block) = requested.filter(|style| style.is_block()) {
            if self.flow_level == 0 && !self.simple_key_context && analysis.allow_block {
                return block;
            }
        }
        if plain_requested
            && analysis.allow_double_quoted
            && (value.contains('\'') || value.contains('\n'))
        {
            return ScalarStyle::DoubleQuoted;
        }
        if matches!(
            requested,
            None | Some(ScalarStyle::Plain) | Some(ScalarStyle::SingleQuoted)
        ) && analysis.allow_single_quoted
            && !(self.simple_key_context && analysis.multiline)
        {
            return ScalarStyle::SingleQuoted;
        }
        ScalarStyle::DoubleQuoted
    }

    fn process_scalar(&mut self, event: &Event) {
        let EventKind::Scalar {
            value,
            fold_positions,
            ..
        } = &event.kind
        else {
            return;
        };
        self.analysis_for(value);
        let style = match self.style {
            Some(style) => style,
            None => self.choose_scalar_style(event),
        };
        let split = !self.simple_key_context;
        let header = event.post_comment();
        match style {
            ScalarStyle::DoubleQuoted => self.write_double_quoted(value, split),
            ScalarStyle::SingleQuoted => self.write_single_quoted(value, split),
            ScalarStyle::Folded => self.write_folded(value, fold_positions.as_deref(), header),
            ScalarStyle::Literal => self.write_literal(value, header),
            ScalarStyle::Plain => self.write_plain(value, split),
        }
        self.analysis = None;
        self.style = None;
        if !style.is_block() && self.flow_level == 0 && !self.simple_key_context {
            if let Some(post) = event.post_comment() {
                self.write_post_comment(post);
            }
        }
    }

    // Comments

    fn write_pre_comments(&mut self, lines: &[CommentLine]) {
        if self.flow_level > 0 {
            return;
        }
        for line in lines {
            if self.writer.column != 0 {
                self.writer.write_line_break(None);
            }
            if !line.is_blank() {
                self.writer.write_spaces(line.column);
                self.writer.write_str(&line.text);
            }
            self.writer.write_line_break(None);
        }
    }

    /// Comment at the end of the current line, at its source column when the
    /// line is still short enough.
    fn write_post_comment(&mut self, line: &CommentLine) {
        if line.is_blank() {
            return;
        }
        self.write_comment_text(line);
        self.writer.write_line_break(None);
    }

    fn write_comment_text(&mut self, line: &CommentLine) {
        if self.writer.column < line.column {
            let padding = line.column - self.writer.column;
            self.writer.write_spaces(padding);
        } else if self.writer.column > 0 {
            self.writer.write_char(' ');
        }
        self.writer.write_str(&line.text);
    }

    fn write_value_comments(&mut self, event: &Event) {
        let lines = event.pre_comments();
        if lines.is_empty() || self.flow_level > 0 {
            return;
        }
        self.write_pre_comments(lines);
        self.writer
            .pad_to(self.current_indent() + self.best_map_indent);
    }

    /// End-of-line comment carried by a collection start, written before the
    /// collection body.
    fn write_start_comment(&mut self, event: &Event, flow: bool) {
        if self.flow_level > 0 || self.simple_key_context {
            return;
        }
        let Some(post) = event.post_comment() else {
            return;
        };
        self.write_post_comment(post);
        if flow {
            let step = if self.sequence_context {
                self.best_sequence_indent
            } else {
                self.best_map_indent
            };
            let column = self.indent.map_or(0, |indent| indent + step);
            self.writer.pad_to(column);
        }
    }

    fn write_end_comment(&mut self, event: &Event) {
        if self.flow_level > 0 {
            return;
        }
        if let Some(post) = event.post_comment() {
            self.write_post_comment(post);
        }
    }

    // Writing

    fn write_indicator(
        &mut self,
        indicator: &str,
        need_whitespace: bool,
        whitespace: bool,
        indention: bool,
    ) {
        self.writer
            .write_indicator(indicator, need_whitespace, whitespace, indention);
        self.open_ended = false;
    }

    fn write_directive(&mut self, text: &str) {
        self.writer.write_str(text);
        self.writer.write_line_break(None);
    }

    fn write_chars(&mut self, chars: &[char]) {
        if !chars.is_empty() {
            let text: String = chars.iter().collect();
            self.writer.write_str(&text);
        }
    }

    fn write_plain(&mut self, text: &str, split: bool) {
        if self.root_context {
            self.open_ended = true;
        }
        if text.is_empty() {
            return;
        }
        if !self.writer.whitespace {
            self.writer.write_char(' ');
        }
        self.writer.whitespace = false;
        self.writer.indention = false;
        let indent = self.current_indent();
        let chars: Vec<char> = text.chars().collect();
        let mut spaces = false;
        let mut breaks = false;
        let (mut start, mut end) = (0, 0);
        while end <= chars.len() {
            let ch = chars.get(end).copied();
            if spaces {
                if ch != Some(' ') {
                    if start + 1 == end && self.writer.column > self.best_width && split {
                        self.writer.write_indent(indent);
                        self.writer.whitespace = false;
                        self.writer.indention = false;
                    } else {
                        self.write_chars(&chars[start..end]);
                    }
                    start = end;
                }
            } else if breaks {
                if ch.map_or(true, |ch| !is_line_break(ch)) {
                    if chars[start] == '\n' {
                        self.writer.write_line_break(None);
                    }
                    for &line_break in &chars[start..end] {
                        self.writer.write_line_break(Some(line_break));
                    }
                    self.writer.write_indent(indent);
                    self.writer.whitespace = false;
                    self.writer.indention = false;
                    start = end;
                }
            } else if ch.map_or(true, |ch| ch == ' ' || is_line_break(ch)) {
                self.write_chars(&chars[start..end]);
                start = end;
            }
            if let Some(ch) = ch {
                spaces = ch == ' ';
                breaks = is_line_break(ch);
            }
            end += 1;
        }
    }

    fn write_single_quoted(&mut self, text: &str, split: bool) {
        self.write_indicator("'", true, false, false);
        let indent = self.current_indent();
        let chars: Vec<char> = text.chars().collect();
        let mut spaces = false;
        let mut breaks = false;
        let (mut start, mut end) = (0, 0);
        while end <= chars.len() {
            let ch = chars.get(end).copied();
            if spaces {
                if ch != Some(' ') {
                    if start + 1 == end
                        && self.writer.column > self.best_width
                        && split
                        && start != 0
                        && end != chars.len()
                    {
                        self.writer.write_indent(indent);
                    } else {
                        self.write_chars(&chars[start..end]);
                    }
                    start = end;
                }
            } else if breaks {
                if ch.map_or(true, |ch| !is_line_break(ch)) {
                    if chars[start] == '\n' {
                        self.writer.write_line_break(None);
                    }
                    for &line_break in &chars[start..end] {
                        self.writer.write_line_break(Some(line_break));
                    }
                    self.writer.write_indent(indent);
                    start = end;
                }
            } else if ch.map_or(true, |ch| ch == ' ' || ch == '\'' || is_line_break(ch))
                && start < end
            {
                self.write_chars(&chars[start..end]);
                start = end;
            }
            if ch == Some('\'') {
                self.writer.write_str("''");
                start = end + 1;
            }
            if let Some(ch) = ch {
                spaces = ch == ' ';
                breaks = is_line_break(ch);
            }
            end += 1;
        }
        self.write_indicator("'", false, false, false);
    }

    fn is_unescaped(&self, ch: char) -> bool {
        if (' '..='~').contains(&ch) {
            return true;
        }
        self.allow_unicode
            && matches!(ch,
                '\u{a0}'..='\u{d7ff}'
                | '\u{e000}'..='\u{fffd}'
                | '\u{10000}'..='\u{10ffff}')
    }

    fn write_double_quoted(&mut self, text: &str, split: bool) {
        self.write_indicator("\"", true, false, false);
        let indent = self.current_indent();
        let chars: Vec<char> = text.chars().collect();
        let (mut start, mut end) = (0, 0);
        while end <= chars.len() {
            let ch = chars.get(end).copied();
            let escape = match ch {
                None => true,
                Some(ch) => {
                    matches!(ch, '"' | '\\' | '\u{85}' | '\u{2028}' | '\u{2029}' | '\u{feff}')
                        || !self.is_unescaped(ch)
                }
            };
            if escape {
                if start < end {
                    self.write_chars(&chars[start..end]);
                    start = end;
                }
                if let Some(ch) = ch {
                    self.writer.write_str(&escape_char(ch));
                    start = end + 1;
                }
            }
            let pending = end.saturating_sub(start);
            if 0 < end
                && end + 1 < chars.len()
                && (ch == Some(' ') || start >= end)
                && self.writer.column + pending > self.best_width
                && split
            {
                if start < end {
                    self.write_chars(&chars[start..end]);
                    start = end;
                }
                self.writer.write_char('\\');
                self.writer.write_indent(indent);
                self.writer.whitespace = false;
                self.writer.indention = false;
                if chars.get(start) == Some(&' ') {
                    self.writer.write_char('\\');
                }
            }
            end += 1;
        }
        self.write_indicator("\"", false, false, false);
    }

    /// Indentation and chomping indicators of a block scalar.
    fn block_hints(&self, chars: &[char]) -> String {
        let mut hints = String::new();
        let (Some(&first), Some(&last)) = (chars.first(), chars.last()) else {
            return hints;
        };
        if first == ' ' || is_line_break(first) {
            let parent = self
                .indents
                .last()
                .and_then(|(indent, _)| *indent)
                .unwrap_or(0);
            let increment = self.current_indent().saturating_sub(parent).max(1);
            hints.push_str(&increment.to_string());
        }
        if !is_line_break(last) {
            hints.push('-');
        } else if chars.len() == 1 || is_line_break(chars[chars.len() - 2]) {
            hints.push('+');
        }
        hints
    }

    fn write_block_header(&mut self, indicator: char, chars: &[char], header: Option<&CommentLine>) {
        let hints = self.block_hints(chars);
        self.write_indicator(&format!("{indicator}{hints}"), true, false, false);
        if hints.ends_with('+') {
            self.open_ended = true;
        }
        if let Some(comment) = header.filter(|comment| !comment.is_blank()) {
            self.write_comment_text(comment);
        }
        self.writer.write_line_break(None);
    }

    /// Writes a folded scalar. `folds` are the positions of the spaces that
    /// were line folds in the source; without them long lines are folded at
    /// the configured width.
    fn write_folded(&mut self, text: &str, folds: Option<&[usize]>, header: Option<&CommentLine>) {
        let chars: Vec<char> = text.chars().collect();
        self.write_block_header('>', &chars, header);
        let indent = self.current_indent();
        let mut leading_space = true;
        let mut spaces = false;
        let mut breaks = true;
        let (mut start, mut end) = (0, 0);
        while end <= chars.len() {
            let ch = chars.get(end).copied();
            if breaks {
                if ch.map_or(true, |ch| !is_line_break(ch)) {
                    if !leading_space
                        && ch.is_some_and(|ch| ch != ' ')
                        && chars.get(start) == Some(&'\n')
                    {
                        self.writer.write_line_break(None);
                    }
                    leading_space = ch == Some(' ');
                    for &line_break in &chars[start..end] {
                        self.writer.write_line_break(Some(line_break));
                    }
                    if ch.is_some() {
                        self.writer.write_indent(indent);
                    }
                    start = end;
                }
            } else if spaces {
                if ch != Some(' ') {
                    let single = start + 1 == end;
                    let fold = match folds {
                        Some(positions) => {
                            single
                                && ch.is_some_and(|ch| !is_line_break(ch))
                                && positions.binary_search(&start).is_ok()
                        }
                        None => single && self.writer.column > self.best_width,
                    };
                    if fold {
                        self.writer.write_indent(indent);
                    } else {
                        self.write_chars(&chars[start..end]);
                    }
                    start = end;
                }
            } else if ch.map_or(true, |ch| ch == ' ' || is_line_break(ch)) {
                self.write_chars(&chars[start..end]);
                if ch.is_none() {
                    self.writer.write_line_break(None);
                }
                start = end;
            }
            if let Some(ch) = ch {
                breaks = is_line_break(ch);
                spaces = ch == ' ';
            }
            end += 1;
        }
    }

    fn write_literal(&mut self, text: &str, header: Option<&CommentLine>) {
        let chars: Vec<char> = text.chars().collect();
        self.write_block_header('|', &chars, header);
        let indent = self.current_indent();
        let mut breaks = true;
        let (mut start, mut end) = (0, 0);
        while end <= chars.len() {
            let ch = chars.get(end).copied();
            if breaks {
                if ch.map_or(true, |ch| !is_line_break(ch)) {
                    for &line_break in &chars[start..end] {
                        self.writer.write_line_break(Some(line_break));
                    }
                    if ch.is_some() {
                        self.writer.write_indent(indent);
                    }
                    start = end;
                }
            } else if ch.map_or(true, is_line_break) {
                self.write_chars(&chars[start..end]);
                if ch.is_none() {
                    self.writer.write_line_break(None);
                }
                start = end;
            }
            if let Some(ch) = ch {
                breaks = is_line_break(ch);
            }
            end += 1;
        }
    }
}

fn default_tag_prefixes() -> Vec<(String, String)> {
    DEFAULT_TAG_HANDLES
        .iter()
        .map(|(handle, prefix)| ((*prefix).to_owned(), (*handle).to_owned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comments::Comments;
    use crate::constants::{TAG_NULL, TAG_SEQ, TAG_STR};
    use crate::error::ErrorKind;
    use crate::event::Implicit;
    use rstest::rstest;

    fn scalar(value: &str) -> Event {
        Event::new(EventKind::Scalar {
            anchor: None,
            tag: None,
            implicit: Implicit::new(true, true),
            value: value.to_owned(),
            style: None,
            fold_positions: None,
        })
    }

    fn styled(value: &str, style: ScalarStyle) -> Event {
        Event::new(EventKind::Scalar {
            anchor: None,
            tag: None,
            implicit: Implicit::new(true, true),
            value: value.to_owned(),
            style: Some(style),
            fold_positions: None,
        })
    }

    fn sequence_start(flow_style: bool) -> Event {
        Event::new(EventKind::SequenceStart {
            anchor: None,
            tag: None,
            implicit: true,
            flow_style,
        })
    }

    fn mapping_start(flow_style: bool) -> Event {
        Event::new(EventKind::MappingStart {
            anchor: None,
            tag: None,
            implicit: true,
            flow_style,
        })
    }

    fn document(body: Vec<Event>) -> Vec<Event> {
        let mut events = vec![
            Event::new(EventKind::StreamStart),
            Event::new(EventKind::DocumentStart {
                explicit: false,
                version: None,
                tags: Vec::new(),
            }),
        ];
        events.extend(body);
        events.push(Event::new(EventKind::DocumentEnd { explicit: false }));
        events.push(Event::new(EventKind::StreamEnd));
        events
    }

    fn emit_with(options: &DumpOptions, events: Vec<Event>) -> Result<String> {
        let mut emitter = Emitter::new(options);
        for event in events {
            emitter.emit(event)?;
        }
        Ok(emitter.finish())
    }

    fn emit(body: Vec<Event>) -> String {
        emit_with(&DumpOptions::default(), document(body)).unwrap()
    }

    #[rstest]
    fn test_block_mapping_with_nested_sequence() {
        let output = emit(vec![
            mapping_start(false),
            scalar("a"),
            scalar("1"),
            scalar("b"),
            sequence_start(false),
            scalar("2"),
            scalar("3"),
            Event::new(EventKind::SequenceEnd),
            Event::new(EventKind::MappingEnd),
        ]);
        assert_eq!(output, "a: 1\nb:\n  - 2\n  - 3\n");
    }

    #[rstest]
    fn test_indentless_sequences() {
        let mut emitter = Emitter::new(&DumpOptions::default());
        emitter.set_indentless_sequences(true);
        for event in document(vec![
            mapping_start(false),
            scalar("a"),
            sequence_start(false),
            scalar("1"),
            Event::new(EventKind::SequenceEnd),
            Event::new(EventKind::MappingEnd),
        ]) {
            emitter.emit(event).unwrap();
        }
        assert_eq!(emitter.finish(), "a:\n- 1\n");
    }

    #[rstest]
    fn test_flow_collections_and_empty_ones() {
        let output = emit(vec![
            mapping_start(false),
            scalar("flow"),
            sequence_start(true),
            scalar("a"),
            scalar("b"),
            Event::new(EventKind::SequenceEnd),
            scalar("empty"),
            mapping_start(false),
            Event::new(EventKind::MappingEnd),
            Event::new(EventKind::MappingEnd),
        ]);
        assert_eq!(output, "flow: [a, b]\nempty: {}\n");
    }

    #[rstest]
    #[case("@handle", "'@handle'\n")]
    #[case("it's", "it's\n")]
    #[case("'lead it's", "\"'lead it's\"\n")]
    #[case("a\tb", "\"a\\tb\"\n")]
    #[case("bell\u{7}", "\"bell\\a\"\n")]
    #[case("plain text", "plain text\n")]
    fn test_scalar_quoting(#[case] value: &str, #[case] expected: &str) {
        assert_eq!(emit(vec![scalar(value)]), expected);
    }

    #[rstest]
    fn test_non_implicit_scalar_is_quoted() {
        let output = emit(vec![Event::new(EventKind::Scalar {
            anchor: None,
            tag: Some(TAG_STR.to_owned()),
            implicit: Implicit::new(false, true),
            value: "123".to_owned(),
            style: None,
            fold_positions: None,
        })]);
        assert_eq!(output, "'123'\n");
    }

    #[rstest]
    fn test_literal_block_under_key() {
        let output = emit(vec![
            mapping_start(false),
            scalar("t"),
            styled("one\ntwo\n", ScalarStyle::Literal),
            scalar("k"),
            styled("keep\n\n", ScalarStyle::Literal),
            scalar("s"),
            styled("strip", ScalarStyle::Literal),
            Event::new(EventKind::MappingEnd),
        ]);
        assert_eq!(
            output,
            "t: |\n  one\n  two\nk: |+\n  keep\n\ns: |-\n  strip\n"
        );
    }

    #[rstest]
    fn test_folded_keeps_source_folds() {
        let mut event = styled("ab cd ef\n", ScalarStyle::Folded);
        if let EventKind::Scalar { fold_positions, .. } = &mut event.kind {
            *fold_positions = Some(vec![2]);
        }
        assert_eq!(emit(vec![event]), ">\n  ab\n  cd ef\n");
    }

    #[rstest]
    fn test_plain_folds_at_width() {
        let options = DumpOptions::default().with_width(20);
        let output = emit_with(
            &options,
            document(vec![
                mapping_start(false),
                scalar("key"),
                scalar("aaaa bbbb cccc dddd eeee ffff"),
                Event::new(EventKind::MappingEnd),
            ]),
        )
        .unwrap();
        assert_eq!(output, "key: aaaa bbbb cccc dddd\n  eeee ffff\n");
    }

    #[rstest]
    fn test_anchor_and_alias() {
        let mut anchored = scalar("v");
        if let EventKind::Scalar { anchor, .. } = &mut anchored.kind {
            *anchor = Some("x".into());
        }
        let output = emit(vec![
            sequence_start(false),
            anchored,
            Event::new(EventKind::Alias { anchor: "x".into() }),
            Event::new(EventKind::SequenceEnd),
        ]);
        assert_eq!(output, "- &x v\n- *x\n");
    }

    #[rstest]
    fn test_comments_return_to_their_lines() {
        let key_a = scalar("a").with_comments(Some(Box::new(
            Comments::default().with_pre([CommentLine::new(0, "# head")]),
        )));
        let one = scalar("1").with_comments(Some(Box::new(Comments::default().with_post(6, "# eol"))));
        let key_b = scalar("b").with_comments(Some(Box::new(
            Comments::default().with_pre([CommentLine::blank()]),
        )));
        let mut events = document(vec![
            mapping_start(false),
            key_a,
            one,
            key_b,
            scalar("2"),
            Event::new(EventKind::MappingEnd),
        ]);
        let end = events.len() - 2;
        events[end] = Event::new(EventKind::DocumentEnd { explicit: false }).with_comments(Some(
            Box::new(Comments::default().with_pre([CommentLine::new(0, "# tail")])),
        ));
        let output = emit_with(&DumpOptions::default(), events).unwrap();
        assert_eq!(output, "# head\na: 1  # eol\n\nb: 2\n# tail\n");
    }

    #[rstest]
    fn test_set_is_written_with_explicit_keys() {
        let null = Event::new(EventKind::Scalar {
            anchor: None,
            tag: Some(TAG_NULL.to_owned()),
            implicit: Implicit::new(true, false),
            value: String::new(),
            style: None,
            fold_positions: None,
        });
        let output = emit(vec![
            Event::new(EventKind::MappingStart {
                anchor: None,
                tag: Some(TAG_SET.to_owned()),
                implicit: false,
                flow_style: false,
            }),
            scalar("a"),
            null.clone(),
            scalar("b"),
            null,
            Event::new(EventKind::MappingEnd),
        ]);
        assert_eq!(output, "!!set\n? a\n? b\n");
    }

    #[rstest]
    #[case("!a b", "!a%20b x\n")]
    #[case("!x{y}", "!x%7By%7D x\n")]
    #[case("!x!y", "!x%21y x\n")]
    #[case("!!python/name", "!!python/name x\n")]
    fn test_local_tags_are_percent_encoded(#[case] tag: &str, #[case] expected: &str) {
        let output = emit(vec![Event::new(EventKind::Scalar {
            anchor: None,
            tag: Some(tag.to_owned()),
            implicit: Implicit::NONE,
            value: "x".to_owned(),
            style: None,
            fold_positions: None,
        })]);
        assert_eq!(output, expected);
    }

    #[rstest]
    fn test_directives_and_tag_handles() {
        let events = vec![
            Event::new(EventKind::StreamStart),
            Event::new(EventKind::DocumentStart {
                explicit: true,
                version: Some((1, 2)),
                tags: vec![("!e!".to_owned(), "tag:example.com,2000:".to_owned())],
            }),
            Event::new(EventKind::Scalar {
                anchor: None,
                tag: Some("tag:example.com,2000:foo".to_owned()),
                implicit: Implicit::NONE,
                value: "x".to_owned(),
                style: None,
                fold_positions: None,
            }),
            Event::new(EventKind::DocumentEnd { explicit: true }),
            Event::new(EventKind::StreamEnd),
        ];
        let output = emit_with(&DumpOptions::default(), events).unwrap();
        assert_eq!(
            output,
            "%YAML 1.2\n%TAG !e! tag:example.com,2000:\n--- !e!foo x\n...\n"
        );
    }

    #[rstest]
    fn test_canonical_output() {
        let options = DumpOptions::default().with_canonical(true);
        let output = emit_with(
            &options,
            document(vec![
                Event::new(EventKind::SequenceStart {
                    anchor: None,
                    tag: Some(TAG_SEQ.to_owned()),
                    implicit: true,
                    flow_style: false,
                }),
                Event::new(EventKind::Scalar {
                    anchor: None,
                    tag: Some(TAG_STR.to_owned()),
                    implicit: Implicit::new(true, true),
                    value: "a".to_owned(),
                    style: None,
                    fold_positions: None,
                }),
                Event::new(EventKind::SequenceEnd),
            ]),
        )
        .unwrap();
        assert_eq!(output, "---\n!!seq [\n  !!str \"a\",\n]\n");
    }

    #[rstest]
    fn test_unsupported_version_is_an_error() {
        let events = vec![
            Event::new(EventKind::StreamStart),
            Event::new(EventKind::DocumentStart {
                explicit: true,
                version: Some((2, 0)),
                tags: Vec::new(),
            }),
            scalar("x"),
        ];
        let err = emit_with(&DumpOptions::default(), events).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Emitter);
        assert_eq!(err.problem(), Some("unsupported YAML version: 2.0"));
    }

    #[rstest]
    fn test_invalid_anchor_is_an_error() {
        let mut event = scalar("v");
        if let EventKind::Scalar { anchor, .. } = &mut event.kind {
            *anchor = Some("a b".into());
        }
        let err = emit_with(&DumpOptions::default(), document(vec![event])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Emitter);
        assert!(err.problem().unwrap().starts_with("invalid character ' '"));
    }

    #[rstest]
    fn test_out_of_order_event_is_an_error() {
        let err = emit_with(&DumpOptions::default(), vec![scalar("x")]).unwrap_err();
        assert_eq!(
            err.problem(),
            Some("expected StreamStartEvent, but got ScalarEvent")
        );
    }

    #[rstest]
    fn test_second_document_gets_a_marker() {
        let events = vec![
            Event::new(EventKind::StreamStart),
            Event::new(EventKind::DocumentStart {
                explicit: false,
                version: None,
                tags: Vec::new(),
            }),
            scalar("a"),
            Event::new(EventKind::DocumentEnd { explicit: false }),
            Event::new(EventKind::DocumentStart {
                explicit: false,
                version: None,
                tags: Vec::new(),
            }),
            scalar("b"),
            Event::new(EventKind::DocumentEnd { explicit: false }),
            Event::new(EventKind::StreamEnd),
        ];
        let output = emit_with(&DumpOptions::default(), events).unwrap();
        assert_eq!(output, "a\n--- b\n");
    }

    #[rstest]
    fn test_need_more_events_waits_for_collection_contents() {
        let mut emitter = Emitter::new(&DumpOptions::default());
        emitter.emit(Event::new(EventKind::StreamStart)).unwrap();
        emitter
            .emit(Event::new(EventKind::DocumentStart {
                explicit: false,
                version: None,
                tags: Vec::new(),
            }))
            .unwrap();
        emitter.emit(sequence_start(false)).unwrap();
        assert!(emitter.need_more_events());
        emitter.emit(scalar("x")).unwrap();
        assert!(emitter.need_more_events());
        emitter.emit(Event::new(EventKind::SequenceEnd)).unwrap();
        assert!(emitter.need_more_events());
        assert_eq!(emitter.as_str(), "- x");
    }
}
