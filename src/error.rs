use std::fmt;
use std::sync::Arc;

use thiserror::Error;

const SNIPPET_BREAKS: &[char] = &['\0', '\r', '\n', '\u{85}', '\u{2028}', '\u{2029}'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Reader,
    Scanner,
    Parser,
    Composer,
    Constructor,
    Representer,
    Serializer,
    Emitter,
    Io,
    Serde,
}

/// A position in the source text.
///
/// `index` and `pointer` count characters, `line` and `column` are zero-based.
/// Marks created by the reader keep a shared handle to the decoded buffer so
/// that error messages can print the offending line.
#[derive(Clone)]
pub struct Mark {
    pub name: Arc<str>,
    pub index: usize,
    pub line: usize,
    pub column: usize,
    buffer: Option<Arc<[char]>>,
    pointer: usize,
}

impl Mark {
    pub fn new(name: Arc<str>, index: usize, line: usize, column: usize) -> Self {
        Self {
            name,
            index,
            line,
            column,
            buffer: None,
            pointer: index,
        }
    }

    pub(crate) fn with_buffer(mut self, buffer: Arc<[char]>, pointer: usize) -> Self {
        self.buffer = Some(buffer);
        self.pointer = pointer;
        self
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    /// Two lines of context: the source line around the pointer and a caret
    /// beneath the offending character.
    pub fn snippet(&self, indent: usize, max_length: usize) -> Option<String> {
        let buffer = self.buffer.as_ref()?;
        let half = max_length / 2;
        let mut head = "";
        let mut start = self.pointer.min(buffer.len());
        while start > 0 && !SNIPPET_BREAKS.contains(&buffer[start - 1]) {
            start -= 1;
            if self.pointer - start + 1 > half {
                head = " ... ";
                start += 5;
                break;
            }
        }
        let mut tail = "";
        let mut end = self.pointer.min(buffer.len());
        while end < buffer.len() && !SNIPPET_BREAKS.contains(&buffer[end]) {
            end += 1;
            if end - self.pointer + 1 > half {
                tail = " ... ";
                end -= 5;
                break;
            }
        }
        let line: String = buffer[start..end.max(start)].iter().collect();
        let caret_pad = indent + self.pointer.saturating_sub(start) + head.len();
        Some(format!(
            "{}{}{}{}\n{}^ (line: {})",
            " ".repeat(indent),
            head,
            line,
            tail,
            " ".repeat(caret_pad),
            self.line + 1
        ))
    }

    fn same_position(&self, other: &Mark) -> bool {
        self.name == other.name && self.line == other.line && self.column == other.column
    }
}

impl PartialEq for Mark {
    fn eq(&self, other: &Self) -> bool {
        self.same_position(other) && self.index == other.index
    }
}

impl Eq for Mark {}

impl fmt::Debug for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mark")
            .field("name", &self.name)
            .field("index", &self.index)
            .field("line", &self.line)
            .field("column", &self.column)
            .finish()
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  in \"{}\", line {}, column {}",
            self.name,
            self.line + 1,
            self.column + 1
        )?;
        if let Some(snippet) = self.snippet(4, 75) {
            write!(f, ":\n{snippet}")?;
        }
        Ok(())
    }
}

/// The context/problem pair shared by every stage after the reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedError {
    pub context: Option<String>,
    pub context_mark: Option<Mark>,
    pub problem: String,
    pub problem_mark: Option<Mark>,
    pub note: Option<String>,
}

impl MarkedError {
    pub fn new(
        context: Option<&str>,
        context_mark: Option<Mark>,
        problem: impl Into<String>,
        problem_mark: Option<Mark>,
    ) -> Self {
        Self {
            context: context.map(str::to_owned),
            context_mark,
            problem: problem.into(),
            problem_mark,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

impl fmt::Display for MarkedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::with_capacity(5);
        if let Some(context) = &self.context {
            parts.push(context.clone());
        }
        if let Some(context_mark) = &self.context_mark {
            let differs = match &self.problem_mark {
                Some(problem_mark) => !context_mark.same_position(problem_mark),
                None => true,
            };
            if differs {
                parts.push(context_mark.to_string());
            }
        }
        parts.push(self.problem.clone());
        if let Some(problem_mark) = &self.problem_mark {
            parts.push(problem_mark.to_string());
        }
        if let Some(note) = self.note.as_deref().filter(|note| !note.is_empty()) {
            parts.push(note.to_owned());
        }
        f.write_str(&parts.join("\n"))
    }
}

/// Invalid input detected before tokenization: a codec failure or a
/// non-printable character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderError {
    pub name: Arc<str>,
    pub position: usize,
    pub problem: String,
}

impl ReaderError {
    pub fn unacceptable_character(name: Arc<str>, position: usize, character: char) -> Self {
        Self {
            name,
            position,
            problem: format!(
                "unacceptable character #x{:04x}: special characters are not allowed",
                character as u32
            ),
        }
    }

    pub fn undecodable_byte(
        name: Arc<str>,
        position: usize,
        encoding: &str,
        byte: u8,
        reason: &str,
    ) -> Self {
        Self {
            name,
            position,
            problem: format!("'{encoding}' codec can't decode byte #x{byte:02x}: {reason}"),
        }
    }
}

impl fmt::Display for ReaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n  in \"{}\", position {}",
            self.problem, self.name, self.position
        )
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Reader(Box<ReaderError>),
    #[error("{0}")]
    Scanner(Box<MarkedError>),
    #[error("{0}")]
    Parser(Box<MarkedError>),
    #[error("{0}")]
    Composer(Box<MarkedError>),
    #[error("{0}")]
    Constructor(Box<MarkedError>),
    #[error("{0}")]
    Representer(Box<MarkedError>),
    #[error("{0}")]
    Serializer(Box<MarkedError>),
    #[error("{0}")]
    Emitter(Box<MarkedError>),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Serde(String),
}

impl Error {
    pub fn scanner(
        context: Option<&str>,
        context_mark: Option<Mark>,
        problem: impl Into<String>,
        problem_mark: Option<Mark>,
    ) -> Self {
        Error::Scanner(Box::new(MarkedError::new(
            context,
            context_mark,
            problem,
            problem_mark,
        )))
    }

    pub fn parser(
        context: Option<&str>,
        context_mark: Option<Mark>,
        problem: impl Into<String>,
        problem_mark: Option<Mark>,
    ) -> Self {
        Error::Parser(Box::new(MarkedError::new(
            context,
            context_mark,
            problem,
            problem_mark,
        )))
    }

    pub fn composer(
        context: Option<&str>,
        context_mark: Option<Mark>,
        problem: impl Into<String>,
        problem_mark: Option<Mark>,
    ) -> Self {
        Error::Composer(Box::new(MarkedError::new(
            context,
            context_mark,
            problem,
            problem_mark,
        )))
    }

    pub fn constructor(
        context: Option<&str>,
        context_mark: Option<Mark>,
        problem: impl Into<String>,
        problem_mark: Option<Mark>,
    ) -> Self {
        Error::Constructor(Box::new(MarkedError::new(
            context,
            context_mark,
            problem,
            problem_mark,
        )))
    }

    pub fn representer(problem: impl Into<String>) -> Self {
        Error::Representer(Box::new(MarkedError::new(None, None, problem, None)))
    }

    pub fn serializer(problem: impl Into<String>) -> Self {
        Error::Serializer(Box::new(MarkedError::new(None, None, problem, None)))
    }

    pub fn emitter(problem: impl Into<String>) -> Self {
        Error::Emitter(Box::new(MarkedError::new(None, None, problem, None)))
    }

    pub fn serde(message: impl Into<String>) -> Self {
        Error::Serde(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Reader(_) => ErrorKind::Reader,
            Error::Scanner(_) => ErrorKind::Scanner,
            Error::Parser(_) => ErrorKind::Parser,
            Error::Composer(_) => ErrorKind::Composer,
            Error::Constructor(_) => ErrorKind::Constructor,
            Error::Representer(_) => ErrorKind::Representer,
            Error::Serializer(_) => ErrorKind::Serializer,
            Error::Emitter(_) => ErrorKind::Emitter,
            Error::Io(_) => ErrorKind::Io,
            Error::Serde(_) => ErrorKind::Serde,
        }
    }

    fn marked(&self) -> Option<&MarkedError> {
        match self {
            Error::Scanner(inner)
            | Error::Parser(inner)
            | Error::Composer(inner)
            | Error::Constructor(inner)
            | Error::Representer(inner)
            | Error::Serializer(inner)
            | Error::Emitter(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn context(&self) -> Option<&str> {
        self.marked().and_then(|inner| inner.context.as_deref())
    }

    pub fn context_mark(&self) -> Option<&Mark> {
        self.marked().and_then(|inner| inner.context_mark.as_ref())
    }

    pub fn problem(&self) -> Option<&str> {
        match self {
            Error::Reader(inner) => Some(&inner.problem),
            Error::Serde(message) => Some(message),
            other => other.marked().map(|inner| inner.problem.as_str()),
        }
    }

    pub fn problem_mark(&self) -> Option<&Mark> {
        self.marked().and_then(|inner| inner.problem_mark.as_ref())
    }

    pub fn note(&self) -> Option<&str> {
        self.marked().and_then(|inner| inner.note.as_deref())
    }
}

impl From<ReaderError> for Error {
    fn from(value: ReaderError) -> Self {
        Error::Reader(Box::new(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    DuplicateKey,
    MantissaWithoutDot,
    ReusedAnchor,
}

/// A non-fatal diagnostic. The load still succeeds; the warning is logged
/// and handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub kind: WarningKind,
    pub detail: MarkedError,
}

impl Warning {
    pub fn new(kind: WarningKind, detail: MarkedError) -> Self {
        Self { kind, detail }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.detail, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn mark_in(text: &str, pointer: usize, line: usize, column: usize) -> Mark {
        let buffer: Arc<[char]> = text.chars().chain(std::iter::once('\0')).collect();
        Mark::new(Arc::from("<unicode string>"), pointer, line, column).with_buffer(buffer, pointer)
    }

    #[rstest]
    fn test_mark_display_includes_snippet() {
        let mark = mark_in("a: 1\nb: @x\n", 8, 1, 3);
        let rendered = mark.to_string();
        assert_eq!(
            rendered,
            "  in \"<unicode string>\", line 2, column 4:\n    b: @x\n       ^ (line: 2)"
        );
    }

    #[rstest]
    fn test_context_mark_skipped_when_same_as_problem_mark() {
        let mark = Mark::new(Arc::from("f"), 0, 0, 0);
        let error = MarkedError::new(
            Some("while scanning a simple key"),
            Some(mark.clone()),
            "could not find expected ':'",
            Some(mark),
        );
        assert_eq!(
            error.to_string(),
            "while scanning a simple key\ncould not find expected ':'\n  in \"f\", line 1, column 1"
        );
    }

    #[rstest]
    fn test_reader_error_message() {
        let error = ReaderError::unacceptable_character(Arc::from("<file>"), 3, '\u{7}');
        assert_eq!(
            error.to_string(),
            "unacceptable character #x0007: special characters are not allowed\n  in \"<file>\", position 3"
        );
    }

    #[rstest]
    #[case(Error::emitter("x"), ErrorKind::Emitter)]
    #[case(Error::representer("x"), ErrorKind::Representer)]
    #[case(Error::scanner(None, None, "x", None), ErrorKind::Scanner)]
    fn test_error_kind(#[case] error: Error, #[case] kind: ErrorKind) {
        assert_eq!(error.kind(), kind);
        assert_eq!(error.problem(), Some("x"));
    }
}
