use std::collections::{BTreeMap, VecDeque};

use smallvec::SmallVec;
use smol_str::SmolStr;

use crate::comments::CommentLine;
use crate::constants::{
    is_anchor_char, is_blank_or_end, is_break, is_break_or_end, SIMPLE_KEY_LOOKAHEAD,
};
use crate::decode::reader::Reader;
use crate::decode::token::{Token, TokenKind};
use crate::error::{Error, Mark};
use crate::event::ScalarStyle;
use crate::options::YamlVersion;
use crate::Result;

const BOM: char = '\u{feff}';

const WHILE_DIRECTIVE: &str = "while scanning a directive";
const WHILE_BLOCK_SCALAR: &str = "while scanning a block scalar";
const WHILE_QUOTED: &str = "while scanning a quoted scalar";
const WHILE_SIMPLE_KEY: &str = "while scanning a simple key";

#[derive(Debug, Clone)]
struct SimpleKey {
    token_number: usize,
    required: bool,
    index: usize,
    line: usize,
    mark: Mark,
}

/// Result of consuming the blanks that follow a piece of a plain scalar.
#[derive(Default)]
struct PlainSpaces {
    chunks: Vec<String>,
    breaks: usize,
    crossed_line: bool,
    at_document_marker: bool,
}

/// Scalar text plus a running character count, so fold positions can be
/// recorded without rescanning.
#[derive(Default)]
struct ScalarBuf {
    text: String,
    chars: usize,
}

impl ScalarBuf {
    fn push(&mut self, ch: char) {
        self.text.push(ch);
        self.chars += 1;
    }

    fn push_str(&mut self, s: &str) {
        self.text.push_str(s);
        self.chars += s.chars().count();
    }
}

/// Turns a character stream into tokens.
///
/// Tokens are produced lazily into a small queue. A token is only handed out
/// once no pending simple key could still insert a `Key` token in front of
/// it. In round-trip mode the scanner also records comments and blank lines
/// and attaches them to the neighbouring tokens.
pub struct Scanner {
    reader: Reader,
    done: bool,
    flow_context: SmallVec<[char; 8]>,
    tokens: VecDeque<Token>,
    tokens_taken: usize,
    indent: isize,
    indents: SmallVec<[isize; 16]>,
    allow_simple_key: bool,
    possible_simple_keys: BTreeMap<usize, SimpleKey>,
    forced_version: Option<YamlVersion>,
    directive_version: Option<YamlVersion>,
    round_trip: bool,
    pending_comments: Vec<CommentLine>,
    line_open: bool,
}

impl Scanner {
    pub fn new(reader: Reader) -> Self {
        let mut scanner = Self {
            reader,
            done: false,
            flow_context: SmallVec::new(),
            tokens: VecDeque::new(),
            tokens_taken: 0,
            indent: -1,
            indents: SmallVec::new(),
            allow_simple_key: true,
            possible_simple_keys: BTreeMap::new(),
            forced_version: None,
            directive_version: None,
            round_trip: false,
            pending_comments: Vec::new(),
            line_open: false,
        };
        scanner.fetch_stream_start();
        scanner
    }

    pub fn with_round_trip(mut self, round_trip: bool) -> Self {
        self.round_trip = round_trip;
        self
    }

    pub fn with_version(mut self, version: Option<YamlVersion>) -> Self {
        self.forced_version = version;
        self
    }

    pub fn processing_version(&self) -> YamlVersion {
        self.forced_version
            .or(self.directive_version)
            .unwrap_or_default()
    }

    pub fn mark(&self) -> Mark {
        self.reader.get_mark()
    }

    pub fn check_token(&mut self, predicate: impl FnOnce(&TokenKind) -> bool) -> Result<bool> {
        self.fill()?;
        Ok(self.tokens.front().is_some_and(|token| predicate(&token.kind)))
    }

    pub fn peek_token(&mut self) -> Result<Option<&Token>> {
        self.fill()?;
        Ok(self.tokens.front())
    }

    pub(crate) fn peek_token_mut(&mut self) -> Result<Option<&mut Token>> {
        self.fill()?;
        Ok(self.tokens.front_mut())
    }

    pub fn get_token(&mut self) -> Result<Option<Token>> {
        self.fill()?;
        let token = self.tokens.pop_front();
        if token.is_some() {
            self.tokens_taken += 1;
        }
        Ok(token)
    }

    fn fill(&mut self) -> Result<()> {
        while self.need_more_tokens()? {
            self.fetch_more_tokens()?;
        }
        Ok(())
    }

    #[inline]
    fn flow_level(&self) -> usize {
        self.flow_context.len()
    }

    fn need_more_tokens(&mut self) -> Result<bool> {
        if self.done {
            return Ok(false);
        }
        if self.tokens.is_empty() {
            return Ok(true);
        }
        // Keep one token of lookahead so a trailing comment on the same line
        // is attached before the token leaves the queue.
        if self.round_trip && self.tokens.len() < 2 {
            return Ok(true);
        }
        self.stale_possible_simple_keys()?;
        Ok(self.next_possible_simple_key() == Some(self.tokens_taken))
    }

    fn fetch_more_tokens(&mut self) -> Result<()> {
        self.scan_to_next_token();
        self.stale_possible_simple_keys()?;
        self.unwind_indent(self.reader.column() as isize);

        let ch = self.reader.peek(0);
        match ch {
            '\0' => return self.fetch_stream_end(),
            '%' if self.check_directive() => return self.fetch_directive(),
            '-' if self.check_document_start() => {
                return self.fetch_document_indicator(TokenKind::DocumentStart)
            }
            '.' if self.check_document_end() => {
                return self.fetch_document_indicator(TokenKind::DocumentEnd)
            }
            '[' => return self.fetch_flow_collection_start(TokenKind::FlowSequenceStart, '['),
            '{' => return self.fetch_flow_collection_start(TokenKind::FlowMappingStart, '{'),
            ']' => return self.fetch_flow_collection_end(TokenKind::FlowSequenceEnd),
            '}' => return self.fetch_flow_collection_end(TokenKind::FlowMappingEnd),
            ',' => return self.fetch_flow_entry(),
            '-' if self.check_block_entry() => return self.fetch_block_entry(),
            '?' if self.check_key() => return self.fetch_key(),
            ':' if self.check_value() => return self.fetch_value(),
            '*' => return self.fetch_anchor_or_alias(true),
            '&' => return self.fetch_anchor_or_alias(false),
            '!' => return self.fetch_tag(),
            '|' if self.flow_level() == 0 => return self.fetch_block_scalar(ScalarStyle::Literal),
            '>' if self.flow_level() == 0 => return self.fetch_block_scalar(ScalarStyle::Folded),
            '\'' => return self.fetch_flow_scalar(ScalarStyle::SingleQuoted),
            '"' => return self.fetch_flow_scalar(ScalarStyle::DoubleQuoted),
            _ => {}
        }
        if self.check_plain() {
            return self.fetch_plain();
        }
        Err(Error::scanner(
            Some("while scanning for the next token"),
            None,
            format!(
                "found character {} that cannot start any token",
                repr_char(ch)
            ),
            Some(self.reader.get_mark()),
        ))
    }

    fn push_token(&mut self, mut token: Token) {
        if self.round_trip
            && !self.pending_comments.is_empty()
            && token.kind != TokenKind::BlockEnd
        {
            token
                .comments_mut()
                .pre
                .extend(self.pending_comments.drain(..));
        }
        self.tokens.push_back(token);
        self.line_open = true;
    }

    /// Collection starts never own comments; pending ones go to the entry or
    /// key that follows.
    fn push_structural(&mut self, token: Token) {
        self.tokens.push_back(token);
    }

    fn simple_token(&mut self, kind: TokenKind) {
        let start_mark = self.reader.get_mark();
        self.reader.forward(1);
        let end_mark = self.reader.get_mark();
        self.push_token(Token::new(kind, start_mark, end_mark));
    }

    // Simple keys

    fn next_possible_simple_key(&self) -> Option<usize> {
        self.possible_simple_keys
            .values()
            .map(|key| key.token_number)
            .min()
    }

    fn stale_possible_simple_keys(&mut self) -> Result<()> {
        let line = self.reader.line();
        let index = self.reader.index();
        let mut stale: SmallVec<[usize; 4]> = SmallVec::new();
        for (level, key) in &self.possible_simple_keys {
            if key.line != line || index - key.index > SIMPLE_KEY_LOOKAHEAD {
                if key.required {
                    return Err(Error::scanner(
                        Some(WHILE_SIMPLE_KEY),
                        Some(key.mark.clone()),
                        "could not find expected ':'",
                        Some(self.reader.get_mark()),
                    ));
                }
                stale.push(*level);
            }
        }
        for level in stale {
            self.possible_simple_keys.remove(&level);
        }
        Ok(())
    }

    fn save_possible_simple_key(&mut self) -> Result<()> {
        let required = self.flow_level() == 0 && self.indent == self.reader.column() as isize;
        if self.allow_simple_key {
            self.remove_possible_simple_key()?;
            let key = SimpleKey {
                token_number: self.tokens_taken + self.tokens.len(),
                required,
                index: self.reader.index(),
                line: self.reader.line(),
                mark: self.reader.get_mark(),
            };
            self.possible_simple_keys.insert(self.flow_level(), key);
        }
        Ok(())
    }

    fn remove_possible_simple_key(&mut self) -> Result<()> {
        if let Some(key) = self.possible_simple_keys.remove(&self.flow_level()) {
            if key.required {
                return Err(Error::scanner(
                    Some(WHILE_SIMPLE_KEY),
                    Some(key.mark),
                    "could not find expected ':'",
                    Some(self.reader.get_mark()),
                ));
            }
        }
        Ok(())
    }

    // Indentation

    fn unwind_indent(&mut self, column: isize) {
        if self.flow_level() > 0 {
            return;
        }
        while self.indent > column {
            let mark = self.reader.get_mark();
            self.indent = self.indents.pop().unwrap_or(-1);
            self.tokens
                .push_back(Token::new(TokenKind::BlockEnd, mark.clone(), mark));
        }
    }

    fn add_indent(&mut self, column: isize) -> bool {
        if self.indent < column {
            self.indents.push(self.indent);
            self.indent = column;
            return true;
        }
        false
    }

    // Fetchers

    fn fetch_stream_start(&mut self) {
        let mark = self.reader.get_mark();
        self.tokens
            .push_back(Token::new(TokenKind::StreamStart, mark.clone(), mark));
    }

    fn fetch_stream_end(&mut self) -> Result<()> {
        self.unwind_indent(-1);
        self.remove_possible_simple_key()?;
        self.allow_simple_key = false;
        self.possible_simple_keys.clear();
        let mark = self.reader.get_mark();
        self.push_token(Token::new(TokenKind::StreamEnd, mark.clone(), mark));
        self.done = true;
        Ok(())
    }

    fn fetch_directive(&mut self) -> Result<()> {
        self.unwind_indent(-1);
        self.remove_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_directive()?;
        self.push_token(token);
        self.line_open = false;
        Ok(())
    }

    fn fetch_document_indicator(&mut self, kind: TokenKind) -> Result<()> {
        self.unwind_indent(-1);
        self.remove_possible_simple_key()?;
        self.allow_simple_key = false;
        if kind == TokenKind::DocumentEnd {
            self.directive_version = None;
        }
        let start_mark = self.reader.get_mark();
        self.reader.forward(3);
        let end_mark = self.reader.get_mark();
        self.push_token(Token::new(kind, start_mark, end_mark));
        Ok(())
    }

    fn fetch_flow_collection_start(&mut self, kind: TokenKind, bracket: char) -> Result<()> {
        self.save_possible_simple_key()?;
        self.flow_context.push(bracket);
        self.allow_simple_key = true;
        self.simple_token(kind);
        Ok(())
    }

    fn fetch_flow_collection_end(&mut self, kind: TokenKind) -> Result<()> {
        self.remove_possible_simple_key()?;
        self.flow_context.pop();
        self.allow_simple_key = false;
        self.simple_token(kind);
        Ok(())
    }

    fn fetch_flow_entry(&mut self) -> Result<()> {
        self.allow_simple_key = true;
        self.remove_possible_simple_key()?;
        self.simple_token(TokenKind::FlowEntry);
        Ok(())
    }

    fn fetch_block_entry(&mut self) -> Result<()> {
        if self.flow_level() == 0 {
            if !self.allow_simple_key {
                return Err(Error::scanner(
                    None,
                    None,
                    "sequence entries are not allowed here",
                    Some(self.reader.get_mark()),
                ));
            }
            if self.add_indent(self.reader.column() as isize) {
                let mark = self.reader.get_mark();
                self.push_structural(Token::new(TokenKind::BlockSequenceStart, mark.clone(), mark));
            }
        }
        self.allow_simple_key = true;
        self.remove_possible_simple_key()?;
        self.simple_token(TokenKind::BlockEntry);
        Ok(())
    }

    fn fetch_key(&mut self) -> Result<()> {
        if self.flow_level() == 0 {
            if !self.allow_simple_key {
                return Err(Error::scanner(
                    None,
                    None,
                    "mapping keys are not allowed here",
                    Some(self.reader.get_mark()),
                ));
            }
            if self.add_indent(self.reader.column() as isize) {
                let mark = self.reader.get_mark();
                self.push_structural(Token::new(TokenKind::BlockMappingStart, mark.clone(), mark));
            }
        }
        self.allow_simple_key = self.flow_level() == 0;
        self.remove_possible_simple_key()?;
        self.simple_token(TokenKind::Key);
        Ok(())
    }

    fn fetch_value(&mut self) -> Result<()> {
        if let Some(key) = self.possible_simple_keys.remove(&self.flow_level()) {
            let position = key.token_number - self.tokens_taken;
            self.tokens.insert(
                position,
                Token::new(TokenKind::Key, key.mark.clone(), key.mark.clone()),
            );
            if self.flow_level() == 0 && self.add_indent(key.mark.column as isize) {
                self.tokens.insert(
                    position,
                    Token::new(TokenKind::BlockMappingStart, key.mark.clone(), key.mark),
                );
            }
            self.allow_simple_key = false;
        } else {
            if self.flow_level() == 0 {
                if !self.allow_simple_key {
                    return Err(Error::scanner(
                        None,
                        None,
                        "mapping values are not allowed here",
                        Some(self.reader.get_mark()),
                    ));
                }
                if self.add_indent(self.reader.column() as isize) {
                    let mark = self.reader.get_mark();
                    self.push_structural(Token::new(TokenKind::BlockMappingStart, mark.clone(), mark));
                }
            }
            self.allow_simple_key = self.flow_level() == 0;
            self.remove_possible_simple_key()?;
        }
        self.simple_token(TokenKind::Value);
        Ok(())
    }

    fn fetch_anchor_or_alias(&mut self, alias: bool) -> Result<()> {
        self.save_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_anchor(alias)?;
        self.push_token(token);
        Ok(())
    }

    fn fetch_tag(&mut self) -> Result<()> {
        self.save_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_tag()?;
        self.push_token(token);
        Ok(())
    }

    fn fetch_block_scalar(&mut self, style: ScalarStyle) -> Result<()> {
        self.allow_simple_key = true;
        self.remove_possible_simple_key()?;
        let (token, trailing_blank_lines) = self.scan_block_scalar(style)?;
        self.push_token(token);
        self.line_open = false;
        self.push_blank_lines(trailing_blank_lines);
        Ok(())
    }

    fn fetch_flow_scalar(&mut self, style: ScalarStyle) -> Result<()> {
        self.save_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_flow_scalar(style)?;
        self.push_token(token);
        Ok(())
    }

    fn fetch_plain(&mut self) -> Result<()> {
        self.save_possible_simple_key()?;
        self.allow_simple_key = false;
        let (token, trailing) = self.scan_plain()?;
        self.push_token(token);
        if trailing.crossed_line {
            self.line_open = false;
            self.push_blank_lines(trailing.breaks);
        }
        Ok(())
    }

    fn push_blank_lines(&mut self, count: usize) {
        if self.round_trip {
            self.pending_comments
                .extend(std::iter::repeat_with(CommentLine::blank).take(count));
        }
    }

    // Checkers

    fn check_directive(&self) -> bool {
        self.reader.column() == 0
    }

    fn check_document_start(&self) -> bool {
        self.reader.column() == 0
            && self.reader.prefix_matches("---")
            && is_blank_or_end(self.reader.peek(3))
    }

    fn check_document_end(&self) -> bool {
        self.reader.column() == 0
            && self.reader.prefix_matches("...")
            && is_blank_or_end(self.reader.peek(3))
    }

    fn at_document_marker(&self) -> bool {
        (self.reader.prefix_matches("---") || self.reader.prefix_matches("..."))
            && is_blank_or_end(self.reader.peek(3))
    }

    fn check_block_entry(&self) -> bool {
        is_blank_or_end(self.reader.peek(1))
    }

    fn check_key(&self) -> bool {
        self.flow_level() > 0 || is_blank_or_end(self.reader.peek(1))
    }

    fn check_value(&self) -> bool {
        if self.processing_version() == YamlVersion::V1_1 {
            if self.flow_level() > 0 {
                return true;
            }
        } else if self.flow_level() > 0 {
            if self.flow_context.last() == Some(&'[') {
                if !is_blank_or_end(self.reader.peek(1)) {
                    return false;
                }
            } else if self
                .tokens
                .back()
                .is_some_and(|token| token.kind == TokenKind::Value)
                && !is_blank_or_end(self.reader.peek(1))
            {
                return false;
            }
            return true;
        }
        is_blank_or_end(self.reader.peek(1))
    }

    fn check_plain(&self) -> bool {
        const NOT_PLAIN: &str = "\0 \t\r\n\u{85}\u{2028}\u{2029}-?:,[]{}#&*!|>'\"%@`";
        let ch = self.reader.peek(0);
        let next = self.reader.peek(1);
        let flow = self.flow_level() > 0;
        if self.processing_version() == YamlVersion::V1_1 {
            return !NOT_PLAIN.contains(ch)
                || (!is_blank_or_end(next) && (ch == '-' || (!flow && "?:".contains(ch))));
        }
        if !NOT_PLAIN.contains(ch) {
            return true;
        }
        if ch == '-' && !is_blank_or_end(next) {
            return true;
        }
        if ch == ':' && flow && next != ' ' && next != '\t' {
            return true;
        }
        !is_blank_or_end(next) && (ch == '-' || (!flow && "?:".contains(ch)))
    }

    // Scanners

    fn scan_to_next_token(&mut self) {
        if self.reader.index() == 0 && self.reader.peek(0) == BOM {
            self.reader.forward(1);
        }
        let mut line_start = !self.line_open;
        loop {
            loop {
                let ch = self.reader.peek(0);
                let tab_allowed = self.flow_level() > 0 || !self.allow_simple_key;
                if ch == ' ' || (ch == '\t' && tab_allowed) {
                    self.reader.forward(1);
                } else {
                    break;
                }
            }
            if self.reader.peek(0) == '#' {
                let column = self.reader.column();
                let mut text = String::new();
                while !is_break_or_end(self.reader.peek(0)) {
                    text.push(self.reader.peek(0));
                    self.reader.forward(1);
                }
                if self.round_trip {
                    self.record_comment(column, text.trim_end());
                }
                line_start = false;
            }
            if self.scan_line_break().is_empty() {
                break;
            }
            if self.flow_level() == 0 {
                self.allow_simple_key = true;
            }
            if line_start && self.round_trip {
                self.pending_comments.push(CommentLine::blank());
            }
            self.line_open = false;
            line_start = true;
        }
    }

    fn record_comment(&mut self, column: usize, text: &str) {
        if self.line_open {
            if let Some(last) = self.tokens.back_mut() {
                let comments = last.comments_mut();
                if comments.post.is_none() {
                    comments.post = Some(CommentLine::new(column, text));
                    return;
                }
            }
        }
        self.pending_comments.push(CommentLine::new(column, text));
    }

    fn scan_directive(&mut self) -> Result<Token> {
        let start_mark = self.reader.get_mark();
        self.reader.forward(1);
        let name = self.scan_directive_name(&start_mark)?;
        let kind = match name.as_str() {
            "YAML" => {
                let (major, minor) = self.scan_yaml_directive_value(&start_mark)?;
                TokenKind::VersionDirective { major, minor }
            }
            "TAG" => {
                let (handle, prefix) = self.scan_tag_directive_value(&start_mark)?;
                TokenKind::TagDirective { handle, prefix }
            }
            _ => {
                while !is_break_or_end(self.reader.peek(0)) {
                    self.reader.forward(1);
                }
                TokenKind::ReservedDirective { name }
            }
        };
        let end_mark = self.reader.get_mark();
        self.scan_directive_ignored_line(&start_mark)?;
        Ok(Token::new(kind, start_mark, end_mark))
    }

    fn scan_directive_name(&mut self, start_mark: &Mark) -> Result<String> {
        let mut length = 0;
        let mut ch = self.reader.peek(length);
        while ch.is_ascii_alphanumeric() || "-_:.".contains(ch) {
            length += 1;
            ch = self.reader.peek(length);
        }
        if length == 0 {
            return Err(self.directive_error(start_mark, expected_alnum(ch)));
        }
        let value = self.reader.prefix(length);
        self.reader.forward(length);
        let ch = self.reader.peek(0);
        if !is_blank_or_end(ch) || ch == '\t' {
            return Err(self.directive_error(start_mark, expected_alnum(ch)));
        }
        Ok(value)
    }

    fn scan_yaml_directive_value(&mut self, start_mark: &Mark) -> Result<(u32, u32)> {
        self.skip_spaces();
        let major = self.scan_yaml_directive_number(start_mark)?;
        if self.reader.peek(0) != '.' {
            let problem = format!(
                "expected a digit or '.', but found {}",
                repr_char(self.reader.peek(0))
            );
            return Err(self.directive_error(start_mark, problem));
        }
        self.reader.forward(1);
        let minor = self.scan_yaml_directive_number(start_mark)?;
        if !is_blank_or_end(self.reader.peek(0)) || self.reader.peek(0) == '\t' {
            let problem = format!(
                "expected a digit or ' ', but found {}",
                repr_char(self.reader.peek(0))
            );
            return Err(self.directive_error(start_mark, problem));
        }
        if let Some(version) = YamlVersion::from_numbers(major, minor) {
            self.directive_version = Some(version);
        }
        Ok((major, minor))
    }

    fn scan_yaml_directive_number(&mut self, start_mark: &Mark) -> Result<u32> {
        let ch = self.reader.peek(0);
        if !ch.is_ascii_digit() {
            let problem = format!("expected a digit, but found {}", repr_char(ch));
            return Err(self.directive_error(start_mark, problem));
        }
        let mut length = 0;
        while self.reader.peek(length).is_ascii_digit() {
            length += 1;
        }
        let digits = self.reader.prefix(length);
        self.reader.forward(length);
        digits.parse::<u32>().map_err(|_| {
            self.directive_error(start_mark, format!("version number {digits} is out of range"))
        })
    }

    fn scan_tag_directive_value(&mut self, start_mark: &Mark) -> Result<(String, String)> {
        self.skip_spaces();
        let handle = self.scan_tag_handle("directive", start_mark)?;
        if self.reader.peek(0) != ' ' {
            let problem = format!("expected ' ', but found {}", repr_char(self.reader.peek(0)));
            return Err(self.directive_error(start_mark, problem));
        }
        self.skip_spaces();
        let prefix = self.scan_tag_uri("directive", start_mark)?;
        let ch = self.reader.peek(0);
        if !is_blank_or_end(ch) || ch == '\t' {
            let problem = format!("expected ' ', but found {}", repr_char(ch));
            return Err(self.directive_error(start_mark, problem));
        }
        Ok((handle, prefix))
    }

    fn scan_directive_ignored_line(&mut self, start_mark: &Mark) -> Result<()> {
        self.skip_spaces();
        if self.reader.peek(0) == '#' {
            let column = self.reader.column();
            let mut text = String::new();
            while !is_break_or_end(self.reader.peek(0)) {
                text.push(self.reader.peek(0));
                self.reader.forward(1);
            }
            if self.round_trip {
                self.pending_comments
                    .push(CommentLine::new(column, text.trim_end()));
            }
        }
        let ch = self.reader.peek(0);
        if !is_break_or_end(ch) {
            let problem = format!(
                "expected a comment or a line break, but found {}",
                repr_char(ch)
            );
            return Err(self.directive_error(start_mark, problem));
        }
        self.scan_line_break();
        Ok(())
    }

    fn directive_error(&self, start_mark: &Mark, problem: impl Into<String>) -> Error {
        Error::scanner(
            Some(WHILE_DIRECTIVE),
            Some(start_mark.clone()),
            problem,
            Some(self.reader.get_mark()),
        )
    }

    fn skip_spaces(&mut self) {
        while self.reader.peek(0) == ' ' {
            self.reader.forward(1);
        }
    }

    fn scan_anchor(&mut self, alias: bool) -> Result<Token> {
        let name = if alias { "alias" } else { "anchor" };
        let start_mark = self.reader.get_mark();
        self.reader.forward(1);
        let mut length = 0;
        let mut ch = self.reader.peek(length);
        while is_anchor_char(ch) {
            length += 1;
            ch = self.reader.peek(length);
        }
        if length == 0 {
            return Err(Error::scanner(
                Some(format!("while scanning an {name}").as_str()),
                Some(start_mark),
                expected_alnum(ch),
                Some(self.reader.get_mark()),
            ));
        }
        let value = SmolStr::new(self.reader.prefix(length));
        self.reader.forward(length);
        if !is_blank_or_end(ch) && !"?:,[]{}%@`".contains(ch) {
            return Err(Error::scanner(
                Some(format!("while scanning an {name}").as_str()),
                Some(start_mark),
                expected_alnum(ch),
                Some(self.reader.get_mark()),
            ));
        }
        let end_mark = self.reader.get_mark();
        let kind = if alias {
            TokenKind::Alias(value)
        } else {
            TokenKind::Anchor(value)
        };
        Ok(Token::new(kind, start_mark, end_mark))
    }

    fn scan_tag(&mut self) -> Result<Token> {
        let start_mark = self.reader.get_mark();
        let ch = self.reader.peek(1);
        let (handle, suffix) = if ch == '<' {
            self.reader.forward(2);
            let suffix = self.scan_tag_uri("tag", &start_mark)?;
            if self.reader.peek(0) != '>' {
                return Err(Error::scanner(
                    Some("while parsing a tag"),
                    Some(start_mark),
                    format!("expected '>', but found {}", repr_char(self.reader.peek(0))),
                    Some(self.reader.get_mark()),
                ));
            }
            self.reader.forward(1);
            (None, suffix)
        } else if is_blank_or_end(ch) {
            self.reader.forward(1);
            (None, "!".to_owned())
        } else {
            let mut length = 1;
            let mut use_handle = false;
            let mut ch = ch;
            while !is_blank_or_end(ch) {
                if ch == '!' {
                    use_handle = true;
                    break;
                }
                length += 1;
                ch = self.reader.peek(length);
            }
            let handle = if use_handle {
                self.scan_tag_handle("tag", &start_mark)?
            } else {
                self.reader.forward(1);
                "!".to_owned()
            };
            let suffix = self.scan_tag_uri("tag", &start_mark)?;
            (Some(SmolStr::new(handle)), suffix)
        };
        let ch = self.reader.peek(0);
        if !is_blank_or_end(ch) && !(self.flow_level() > 0 && ",]}".contains(ch)) {
            return Err(Error::scanner(
                Some("while scanning a tag"),
                Some(start_mark),
                format!("expected ' ', but found {}", repr_char(ch)),
                Some(self.reader.get_mark()),
            ));
        }
        let end_mark = self.reader.get_mark();
        Ok(Token::new(TokenKind::Tag { handle, suffix }, start_mark, end_mark))
    }

    fn scan_tag_handle(&mut self, name: &str, start_mark: &Mark) -> Result<String> {
        let ch = self.reader.peek(0);
        if ch != '!' {
            return Err(Error::scanner(
                Some(format!("while scanning a {name}").as_str()),
                Some(start_mark.clone()),
                format!("expected '!', but found {}", repr_char(ch)),
                Some(self.reader.get_mark()),
            ));
        }
        let mut length = 1;
        let mut ch = self.reader.peek(length);
        if ch != ' ' {
            while ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                length += 1;
                ch = self.reader.peek(length);
            }
            if ch != '!' {
                self.reader.forward(length);
                return Err(Error::scanner(
                    Some(format!("while scanning a {name}").as_str()),
                    Some(start_mark.clone()),
                    format!("expected '!', but found {}", repr_char(ch)),
                    Some(self.reader.get_mark()),
                ));
            }
            length += 1;
        }
        let value = self.reader.prefix(length);
        self.reader.forward(length);
        Ok(value)
    }

    fn scan_tag_uri(&mut self, name: &str, start_mark: &Mark) -> Result<String> {
        let allow_hash = self.processing_version() != YamlVersion::V1_1;
        let mut chunks = String::new();
        let mut length = 0;
        let mut ch = self.reader.peek(length);
        while ch.is_ascii_alphanumeric()
            || "-;/?:@&=+$,_.!~*'()[]%".contains(ch)
            || (allow_hash && ch == '#')
        {
            if ch == '%' {
                chunks.push_str(&self.reader.prefix(length));
                self.reader.forward(length);
                length = 0;
                chunks.push_str(&self.scan_uri_escapes(name, start_mark)?);
            } else {
                length += 1;
            }
            ch = self.reader.peek(length);
        }
        if length != 0 {
            chunks.push_str(&self.reader.prefix(length));
            self.reader.forward(length);
        }
        if chunks.is_empty() {
            return Err(Error::scanner(
                Some(format!("while parsing a {name}").as_str()),
                Some(start_mark.clone()),
                format!("expected URI, but found {}", repr_char(ch)),
                Some(self.reader.get_mark()),
            ));
        }
        Ok(chunks)
    }

    fn scan_uri_escapes(&mut self, name: &str, start_mark: &Mark) -> Result<String> {
        let mark = self.reader.get_mark();
        let mut bytes = Vec::new();
        while self.reader.peek(0) == '%' {
            self.reader.forward(1);
            let mut byte = 0u8;
            for k in 0..2 {
                let Some(digit) = self.reader.peek(k).to_digit(16) else {
                    return Err(Error::scanner(
                        Some(format!("while scanning a {name}").as_str()),
                        Some(start_mark.clone()),
                        format!(
                            "expected URI escape sequence of 2 hexdecimal numbers, but found {}",
                            repr_char(self.reader.peek(k))
                        ),
                        Some(self.reader.get_mark()),
                    ));
                };
                byte = byte * 16 + digit as u8;
            }
            bytes.push(byte);
            self.reader.forward(2);
        }
        String::from_utf8(bytes).map_err(|err| {
            Error::scanner(
                Some(format!("while scanning a {name}").as_str()),
                Some(start_mark.clone()),
                err.to_string(),
                Some(mark),
            )
        })
    }

    fn scan_block_scalar(&mut self, style: ScalarStyle) -> Result<(Token, usize)> {
        let folded = style == ScalarStyle::Folded;
        let mut chunks = ScalarBuf::default();
        let mut fold_positions = Vec::new();
        let start_mark = self.reader.get_mark();
        self.reader.forward(1);
        let (chomping, increment) = self.scan_block_scalar_indicators(&start_mark)?;
        let header_comment = self.scan_block_scalar_ignored_line(&start_mark)?;

        let mut min_indent = self.indent + 1;
        let indent;
        let mut breaks;
        let mut end_mark;
        match increment {
            Some(increment) => {
                if min_indent < 1 {
                    min_indent = 1;
                }
                indent = min_indent + increment as isize - 1;
                (breaks, end_mark) = self.scan_block_scalar_breaks(indent);
            }
            None => {
                let (found, max_indent, mark) = self.scan_block_scalar_indentation();
                indent = min_indent.max(max_indent as isize);
                breaks = found;
                end_mark = mark;
            }
        }

        let mut line_break = String::new();
        while self.reader.column() as isize == indent && self.reader.peek(0) != '\0' {
            for item in breaks.drain(..) {
                chunks.push_str(&item);
            }
            let leading_non_space = !matches!(self.reader.peek(0), ' ' | '\t');
            let mut length = 0;
            while !is_break_or_end(self.reader.peek(length)) {
                length += 1;
            }
            chunks.push_str(&self.reader.prefix(length));
            self.reader.forward(length);
            line_break = self.scan_line_break();
            (breaks, end_mark) = self.scan_block_scalar_breaks(indent);
            if min_indent == 0 && (self.check_document_start() || self.check_document_end()) {
                break;
            }
            if self.reader.column() as isize == indent && self.reader.peek(0) != '\0' {
                let next_is_space = matches!(self.reader.peek(0), ' ' | '\t');
                if folded && line_break == "\n" && leading_non_space && !next_is_space {
                    if breaks.is_empty() {
                        fold_positions.push(chunks.chars);
                        chunks.push(' ');
                    }
                } else {
                    chunks.push_str(&line_break);
                }
            } else {
                break;
            }
        }

        let mut trailing_blank_lines = 0;
        match chomping {
            Chomping::Keep => {
                chunks.push_str(&line_break);
                for item in breaks {
                    chunks.push_str(&item);
                }
            }
            Chomping::Clip => {
                chunks.push_str(&line_break);
                trailing_blank_lines = breaks.len();
            }
            Chomping::Strip => trailing_blank_lines = breaks.len(),
        }

        let mut token = Token::new(
            TokenKind::Scalar {
                value: chunks.text,
                style,
                fold_positions,
            },
            start_mark,
            end_mark,
        );
        if let Some(comment) = header_comment.filter(|_| self.round_trip) {
            token.comments_mut().post = Some(comment);
        }
        Ok((token, trailing_blank_lines))
    }

    fn scan_block_scalar_indicators(&mut self, start_mark: &Mark) -> Result<(Chomping, Option<u32>)> {
        let mut chomping = Chomping::Clip;
        let mut increment = None;
        let ch = self.reader.peek(0);
        if ch == '+' || ch == '-' {
            chomping = if ch == '+' { Chomping::Keep } else { Chomping::Strip };
            self.reader.forward(1);
            if let Some(digit) = self.reader.peek(0).to_digit(10) {
                increment = Some(self.check_increment(digit, start_mark)?);
                self.reader.forward(1);
            }
        } else if let Some(digit) = ch.to_digit(10) {
            increment = Some(self.check_increment(digit, start_mark)?);
            self.reader.forward(1);
            let ch = self.reader.peek(0);
            if ch == '+' || ch == '-' {
                chomping = if ch == '+' { Chomping::Keep } else { Chomping::Strip };
                self.reader.forward(1);
            }
        }
        let ch = self.reader.peek(0);
        if !is_blank_or_end(ch) || ch == '\t' {
            return Err(Error::scanner(
                Some(WHILE_BLOCK_SCALAR),
                Some(start_mark.clone()),
                format!(
                    "expected chomping or indentation indicators, but found {}",
                    repr_char(ch)
                ),
                Some(self.reader.get_mark()),
            ));
        }
        Ok((chomping, increment))
    }

    fn check_increment(&self, digit: u32, start_mark: &Mark) -> Result<u32> {
        if digit == 0 {
            return Err(Error::scanner(
                Some(WHILE_BLOCK_SCALAR),
                Some(start_mark.clone()),
                "expected indentation indicator in the range 1-9, but found 0",
                Some(self.reader.get_mark()),
            ));
        }
        Ok(digit)
    }

    fn scan_block_scalar_ignored_line(&mut self, start_mark: &Mark) -> Result<Option<CommentLine>> {
        self.skip_spaces();
        let mut comment = None;
        if self.reader.peek(0) == '#' {
            let column = self.reader.column();
            let mut text = String::new();
            while !is_break_or_end(self.reader.peek(0)) {
                text.push(self.reader.peek(0));
                self.reader.forward(1);
            }
            comment = Some(CommentLine::new(column, text.trim_end()));
        }
        let ch = self.reader.peek(0);
        if !is_break_or_end(ch) {
            return Err(Error::scanner(
                Some(WHILE_BLOCK_SCALAR),
                Some(start_mark.clone()),
                format!(
                    "expected a comment or a line break, but found {}",
                    repr_char(ch)
                ),
                Some(self.reader.get_mark()),
            ));
        }
        self.scan_line_break();
        Ok(comment)
    }

    fn scan_block_scalar_indentation(&mut self) -> (Vec<String>, usize, Mark) {
        let mut chunks = Vec::new();
        let mut max_indent = 0;
        let mut end_mark = self.reader.get_mark();
        loop {
            let ch = self.reader.peek(0);
            if ch == ' ' {
                self.reader.forward(1);
                max_indent = max_indent.max(self.reader.column());
            } else if is_break(ch) {
                chunks.push(self.scan_line_break());
                end_mark = self.reader.get_mark();
            } else {
                break;
            }
        }
        (chunks, max_indent, end_mark)
    }

    fn scan_block_scalar_breaks(&mut self, indent: isize) -> (Vec<String>, Mark) {
        let mut chunks = Vec::new();
        let mut end_mark = self.reader.get_mark();
        while (self.reader.column() as isize) < indent && self.reader.peek(0) == ' ' {
            self.reader.forward(1);
        }
        while is_break(self.reader.peek(0)) {
            chunks.push(self.scan_line_break());
            end_mark = self.reader.get_mark();
            while (self.reader.column() as isize) < indent && self.reader.peek(0) == ' ' {
                self.reader.forward(1);
            }
        }
        (chunks, end_mark)
    }

    fn scan_flow_scalar(&mut self, style: ScalarStyle) -> Result<Token> {
        let double = style == ScalarStyle::DoubleQuoted;
        let mut chunks = String::new();
        let start_mark = self.reader.get_mark();
        let quote = self.reader.peek(0);
        self.reader.forward(1);
        self.scan_flow_scalar_non_spaces(double, &start_mark, &mut chunks)?;
        while self.reader.peek(0) != quote {
            self.scan_flow_scalar_spaces(&start_mark, &mut chunks)?;
            self.scan_flow_scalar_non_spaces(double, &start_mark, &mut chunks)?;
        }
        self.reader.forward(1);
        let end_mark = self.reader.get_mark();
        Ok(Token::new(
            TokenKind::Scalar {
                value: chunks,
                style,
                fold_positions: Vec::new(),
            },
            start_mark,
            end_mark,
        ))
    }

    fn scan_flow_scalar_non_spaces(
        &mut self,
        double: bool,
        start_mark: &Mark,
        chunks: &mut String,
    ) -> Result<()> {
        loop {
            let mut length = 0;
            while !" \n'\"\\\0\t\r\u{85}\u{2028}\u{2029}".contains(self.reader.peek(length)) {
                length += 1;
            }
            if length != 0 {
                chunks.push_str(&self.reader.prefix(length));
                self.reader.forward(length);
            }
            let ch = self.reader.peek(0);
            if !double && ch == '\'' && self.reader.peek(1) == '\'' {
                chunks.push('\'');
                self.reader.forward(2);
            } else if (double && ch == '\'') || (!double && (ch == '"' || ch == '\\')) {
                chunks.push(ch);
                self.reader.forward(1);
            } else if double && ch == '\\' {
                self.reader.forward(1);
                let ch = self.reader.peek(0);
                if let Some(replacement) = escape_replacement(ch) {
                    chunks.push(replacement);
                    self.reader.forward(1);
                } else if let Some(length) = escape_code_length(ch) {
                    self.reader.forward(1);
                    let mut code = 0u32;
                    for k in 0..length {
                        let Some(digit) = self.reader.peek(k).to_digit(16) else {
                            return Err(Error::scanner(
                                Some("while scanning a double-quoted scalar"),
                                Some(start_mark.clone()),
                                format!(
                                    "expected escape sequence of {} hexdecimal numbers, but found {}",
                                    length,
                                    repr_char(self.reader.peek(k))
                                ),
                                Some(self.reader.get_mark()),
                            ));
                        };
                        code = code * 16 + digit;
                    }
                    let Some(decoded) = char::from_u32(code) else {
                        return Err(Error::scanner(
                            Some("while scanning a double-quoted scalar"),
                            Some(start_mark.clone()),
                            format!("found invalid escaped code point #x{code:x}"),
                            Some(self.reader.get_mark()),
                        ));
                    };
                    chunks.push(decoded);
                    self.reader.forward(length);
                } else if is_break(ch) {
                    self.scan_line_break();
                    self.scan_flow_scalar_breaks(start_mark, chunks)?;
                } else {
                    return Err(Error::scanner(
                        Some("while scanning a double-quoted scalar"),
                        Some(start_mark.clone()),
                        format!("found unknown escape character {}", repr_char(ch)),
                        Some(self.reader.get_mark()),
                    ));
                }
            } else {
                return Ok(());
            }
        }
    }

    fn scan_flow_scalar_spaces(&mut self, start_mark: &Mark, chunks: &mut String) -> Result<()> {
        let mut length = 0;
        while matches!(self.reader.peek(length), ' ' | '\t') {
            length += 1;
        }
        let whitespaces = self.reader.prefix(length);
        self.reader.forward(length);
        let ch = self.reader.peek(0);
        if ch == '\0' {
            return Err(Error::scanner(
                Some(WHILE_QUOTED),
                Some(start_mark.clone()),
                "found unexpected end of stream",
                Some(self.reader.get_mark()),
            ));
        }
        if is_break(ch) {
            let line_break = self.scan_line_break();
            let mut breaks = String::new();
            self.scan_flow_scalar_breaks(start_mark, &mut breaks)?;
            if line_break != "\n" {
                chunks.push_str(&line_break);
            } else if breaks.is_empty() {
                chunks.push(' ');
            }
            chunks.push_str(&breaks);
        } else {
            chunks.push_str(&whitespaces);
        }
        Ok(())
    }

    fn scan_flow_scalar_breaks(&mut self, start_mark: &Mark, chunks: &mut String) -> Result<()> {
        loop {
            if self.at_document_marker() && self.reader.column() == 0 {
                return Err(Error::scanner(
                    Some(WHILE_QUOTED),
                    Some(start_mark.clone()),
                    "found unexpected document separator",
                    Some(self.reader.get_mark()),
                ));
            }
            while matches!(self.reader.peek(0), ' ' | '\t') {
                self.reader.forward(1);
            }
            if is_break(self.reader.peek(0)) {
                let line_break = self.scan_line_break();
                chunks.push_str(&line_break);
            } else {
                return Ok(());
            }
        }
    }

    fn scan_plain(&mut self) -> Result<(Token, PlainSpaces)> {
        let mut chunks = String::new();
        let start_mark = self.reader.get_mark();
        let mut end_mark = start_mark.clone();
        let indent = self.indent + 1;
        let flow = self.flow_level() > 0;
        let version_1_1 = self.processing_version() == YamlVersion::V1_1;
        let mut spaces = PlainSpaces::default();
        loop {
            if self.reader.peek(0) == '#' {
                break;
            }
            let mut length = 0;
            loop {
                let ch = self.reader.peek(length);
                let next = self.reader.peek(length + 1);
                if ch == ':' && !is_blank_or_end(next) {
                    // `a:b` stays part of the scalar
                } else if ch == '?' && !version_1_1 {
                    // a `?` inside a scalar is content in 1.2
                } else if is_blank_or_end(ch)
                    || (!flow && ch == ':' && is_blank_or_end(next))
                    || (flow && ",:?[]{}".contains(ch))
                {
                    break;
                }
                length += 1;
            }
            if length == 0 {
                break;
            }
            self.allow_simple_key = false;
            for chunk in spaces.chunks.drain(..) {
                chunks.push_str(&chunk);
            }
            chunks.push_str(&self.reader.prefix(length));
            self.reader.forward(length);
            end_mark = self.reader.get_mark();
            spaces = self.scan_plain_spaces();
            if spaces.chunks.is_empty()
                || spaces.at_document_marker
                || self.reader.peek(0) == '#'
                || (!flow && (self.reader.column() as isize) < indent)
            {
                break;
            }
        }
        let token = Token::new(
            TokenKind::Scalar {
                value: chunks,
                style: ScalarStyle::Plain,
                fold_positions: Vec::new(),
            },
            start_mark,
            end_mark,
        );
        Ok((token, spaces))
    }

    fn scan_plain_spaces(&mut self) -> PlainSpaces {
        let mut out = PlainSpaces::default();
        let mut length = 0;
        while matches!(self.reader.peek(length), ' ' | '\t') {
            length += 1;
        }
        let whitespaces = self.reader.prefix(length);
        self.reader.forward(length);
        let ch = self.reader.peek(0);
        if is_break(ch) {
            let line_break = self.scan_line_break();
            self.allow_simple_key = true;
            out.crossed_line = true;
            if self.at_document_marker() {
                out.at_document_marker = true;
                return out;
            }
            let mut breaks = Vec::new();
            loop {
                let ch = self.reader.peek(0);
                if ch == ' ' {
                    self.reader.forward(1);
                } else if is_break(ch) {
                    breaks.push(self.scan_line_break());
                    if self.at_document_marker() {
                        out.breaks = breaks.len();
                        out.at_document_marker = true;
                        return out;
                    }
                } else {
                    break;
                }
            }
            if line_break != "\n" {
                out.chunks.push(line_break);
            } else if breaks.is_empty() {
                out.chunks.push(" ".to_owned());
            }
            out.breaks = breaks.len();
            out.chunks.extend(breaks);
        } else if !whitespaces.is_empty() {
            out.chunks.push(whitespaces);
        }
        out
    }

    /// Consume one line break, normalising `\r\n`, `\r` and `\x85` to `\n`.
    fn scan_line_break(&mut self) -> String {
        let ch = self.reader.peek(0);
        match ch {
            '\r' | '\n' | '\u{85}' => {
                if ch == '\r' && self.reader.peek(1) == '\n' {
                    self.reader.forward(2);
                } else {
                    self.reader.forward(1);
                }
                "\n".to_owned()
            }
            '\u{2028}' | '\u{2029}' => {
                self.reader.forward(1);
                ch.to_string()
            }
            _ => String::new(),
        }
    }
}

impl Iterator for Scanner {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        self.get_token().transpose()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chomping {
    Strip,
    Clip,
    Keep,
}

fn escape_replacement(ch: char) -> Option<char> {
    Some(match ch {
        '0' => '\0',
        'a' => '\u{7}',
        'b' => '\u{8}',
        't' | '\t' => '\t',
        'n' => '\n',
        'v' => '\u{b}',
        'f' => '\u{c}',
        'r' => '\r',
        'e' => '\u{1b}',
        ' ' => ' ',
        '"' => '"',
        '/' => '/',
        '\\' => '\\',
        'N' => '\u{85}',
        '_' => '\u{a0}',
        'L' => '\u{2028}',
        'P' => '\u{2029}',
        _ => return None,
    })
}

fn escape_code_length(ch: char) -> Option<usize> {
    match ch {
        'x' => Some(2),
        'u' => Some(4),
        'U' => Some(8),
        _ => None,
    }
}

fn expected_alnum(ch: char) -> String {
    format!(
        "expected alphabetic or numeric character, but found {}",
        repr_char(ch)
    )
}

/// Quote a character the way error messages show it: `'a'`, `'\t'`, `'\x00'`.
pub(crate) fn repr_char(ch: char) -> String {
    match ch {
        '\'' => "\"'\"".to_owned(),
        '\\' => "'\\\\'".to_owned(),
        '\t' => "'\\t'".to_owned(),
        '\n' => "'\\n'".to_owned(),
        '\r' => "'\\r'".to_owned(),
        ch if (ch as u32) < 0x20 || ch as u32 == 0x7f => format!("'\\x{:02x}'", ch as u32),
        ch => format!("'{ch}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn make_scanner(input: &str) -> Scanner {
        Scanner::new(Reader::from_str(input, "<test>").unwrap())
    }

    fn kinds(input: &str) -> Vec<TokenKind> {
        make_scanner(input)
            .map(|token| token.unwrap().kind)
            .collect()
    }

    fn scalar(value: &str, style: ScalarStyle) -> TokenKind {
        TokenKind::Scalar {
            value: value.to_owned(),
            style,
            fold_positions: Vec::new(),
        }
    }

    fn plain(value: &str) -> TokenKind {
        scalar(value, ScalarStyle::Plain)
    }

    fn scan_error(input: &str) -> Error {
        make_scanner(input)
            .find_map(|token| token.err())
            .expect("scanner error")
    }

    fn single_scalar(input: &str) -> String {
        kinds(input)
            .into_iter()
            .find_map(|kind| match kind {
                TokenKind::Scalar { value, .. } => Some(value),
                _ => None,
            })
            .expect("scalar token")
    }

    #[rstest]
    fn test_block_mapping_with_nested_sequence() {
        use TokenKind::*;
        assert_eq!(
            kinds("a: 1\nb:\n  - 2\n  - 3\n"),
            vec![
                StreamStart,
                BlockMappingStart,
                Key,
                plain("a"),
                Value,
                plain("1"),
                Key,
                plain("b"),
                Value,
                BlockSequenceStart,
                BlockEntry,
                plain("2"),
                BlockEntry,
                plain("3"),
                BlockEnd,
                BlockEnd,
                StreamEnd,
            ]
        );
    }

    #[rstest]
    fn test_flow_collections() {
        use TokenKind::*;
        assert_eq!(
            kinds("{a: [1, 2], b: c}"),
            vec![
                StreamStart,
                FlowMappingStart,
                Key,
                plain("a"),
                Value,
                FlowSequenceStart,
                plain("1"),
                FlowEntry,
                plain("2"),
                FlowSequenceEnd,
                FlowEntry,
                Key,
                plain("b"),
                Value,
                plain("c"),
                FlowMappingEnd,
                StreamEnd,
            ]
        );
    }

    #[rstest]
    fn test_anchor_alias_and_tag() {
        use TokenKind::*;
        assert_eq!(
            kinds("- &x !!str a\n- *x\n"),
            vec![
                StreamStart,
                BlockSequenceStart,
                BlockEntry,
                Anchor(SmolStr::new("x")),
                Tag {
                    handle: Some(SmolStr::new("!!")),
                    suffix: "str".to_owned()
                },
                plain("a"),
                BlockEntry,
                Alias(SmolStr::new("x")),
                BlockEnd,
                StreamEnd,
            ]
        );
    }

    #[rstest]
    fn test_directives_and_document_markers() {
        use TokenKind::*;
        assert_eq!(
            kinds("%YAML 1.1\n%TAG !e! tag:example.com,2000:\n--- a\n...\n"),
            vec![
                StreamStart,
                VersionDirective { major: 1, minor: 1 },
                TagDirective {
                    handle: "!e!".to_owned(),
                    prefix: "tag:example.com,2000:".to_owned()
                },
                DocumentStart,
                plain("a"),
                DocumentEnd,
                StreamEnd,
            ]
        );
    }

    #[rstest]
    #[case("|\n  a\n  b\n", "a\nb\n")]
    #[case("|-\n  a\n  b\n\n", "a\nb")]
    #[case("|+\n  a\n\n", "a\n\n")]
    #[case(">\n  a\n  b\n\n  c\n", "a b\nc\n")]
    #[case(">\n  a\n    more\n  b\n", "a\n  more\nb\n")]
    #[case("|2\n   x\n", " x\n")]
    fn test_block_scalars(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(single_scalar(input), expected);
    }

    #[rstest]
    fn test_folded_scalar_records_fold_positions() {
        let kind = kinds(">\n  ab\n  cd\n")
            .into_iter()
            .find(|kind| matches!(kind, TokenKind::Scalar { .. }))
            .unwrap();
        let TokenKind::Scalar {
            value,
            fold_positions,
            ..
        } = kind
        else {
            unreachable!()
        };
        assert_eq!(value, "ab cd\n");
        assert_eq!(fold_positions, vec![2]);
    }

    #[rstest]
    #[case(r#""a\tb\x41\u00e9\U0001F600""#, "a\tbA\u{e9}\u{1f600}")]
    #[case(r#""line\
  next""#, "linenext")]
    #[case("'it''s'", "it's")]
    #[case("'a\n\n  b'", "a\nb")]
    #[case("\"a\n  b\"", "a b")]
    fn test_quoted_scalars(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(single_scalar(input), expected);
    }

    #[rstest]
    #[case("a\n  b\n  c", "a b c")]
    #[case("a b  c", "a b  c")]
    #[case("url: http://x.y/z", "url")]
    fn test_plain_scalars(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(single_scalar(input), expected);
    }

    #[rstest]
    fn test_required_simple_key_without_colon() {
        let err = scan_error("a: 1\nb\nc: 2");
        assert_eq!(err.context(), Some("while scanning a simple key"));
        assert_eq!(err.problem(), Some("could not find expected ':'"));
    }

    #[rstest]
    fn test_block_indentation_indicator_zero() {
        let err = scan_error("|0\n a");
        assert_eq!(
            err.problem(),
            Some("expected indentation indicator in the range 1-9, but found 0")
        );
    }

    #[rstest]
    fn test_unknown_escape() {
        let err = scan_error(r#""\q""#);
        assert_eq!(err.problem(), Some("found unknown escape character 'q'"));
    }

    #[rstest]
    fn test_character_that_cannot_start_token() {
        let err = scan_error("a: @b");
        assert_eq!(
            err.problem(),
            Some("found character '@' that cannot start any token")
        );
        assert_eq!(err.problem_mark().unwrap().column, 3);
    }

    #[rstest]
    fn test_document_separator_inside_quoted_scalar() {
        let err = scan_error("'a\n---\n'");
        assert_eq!(err.problem(), Some("found unexpected document separator"));
    }

    #[rstest]
    #[case("a:\n  b:\n    c: 1\n  d: [1, {e: f}]\n")]
    #[case("- - a\n  - b\n- c: d\n  e: f\n")]
    #[case("? complex\n: value\n")]
    fn test_block_end_balance(#[case] input: &str) {
        let tokens = kinds(input);
        let starts = tokens
            .iter()
            .filter(|kind| {
                matches!(
                    kind,
                    TokenKind::BlockMappingStart | TokenKind::BlockSequenceStart
                )
            })
            .count();
        let ends = tokens
            .iter()
            .filter(|kind| **kind == TokenKind::BlockEnd)
            .count();
        assert_eq!(starts, ends);
    }

    #[rstest]
    fn test_version_1_1_flow_colon_is_value() {
        let scanner = make_scanner("[\"a\":b]").with_version(Some(YamlVersion::V1_1));
        let kinds_1_1: Vec<TokenKind> = scanner.map(|token| token.unwrap().kind).collect();
        assert!(kinds_1_1.contains(&TokenKind::Value));
        let kinds_1_2 = kinds("[\"a\":b]");
        assert!(!kinds_1_2.contains(&TokenKind::Value));
        assert!(kinds_1_2.contains(&plain(":b")));
    }

    #[rstest]
    fn test_round_trip_comments_attach() {
        let scanner = make_scanner("# head\na: 1  # eol\n\nb: 2\n# tail\n").with_round_trip(true);
        let tokens: Vec<Token> = scanner.map(|token| token.unwrap()).collect();
        let find = |value: &str| {
            tokens
                .iter()
                .find(|token| matches!(&token.kind, TokenKind::Scalar { value: v, .. } if v == value))
                .unwrap()
        };
        let a = find("a").comments.as_deref().unwrap();
        assert_eq!(a.pre.as_slice(), &[CommentLine::new(0, "# head")]);
        let one = find("1").comments.as_deref().unwrap();
        assert_eq!(one.post, Some(CommentLine::new(6, "# eol")));
        let b = find("b").comments.as_deref().unwrap();
        assert_eq!(b.pre.as_slice(), &[CommentLine::blank()]);
        let end = tokens.last().unwrap();
        assert_eq!(end.kind, TokenKind::StreamEnd);
        assert_eq!(
            end.comments.as_deref().unwrap().pre.as_slice(),
            &[CommentLine::new(0, "# tail")]
        );
    }

    #[rstest]
    fn test_block_scalar_header_comment() {
        let scanner = make_scanner("a: |  # note\n  text\n").with_round_trip(true);
        let token = scanner
            .map(|token| token.unwrap())
            .find(|token| matches!(&token.kind, TokenKind::Scalar { style: ScalarStyle::Literal, .. }))
            .unwrap();
        assert_eq!(
            token.comments.unwrap().post,
            Some(CommentLine::new(6, "# note"))
        );
    }
}
