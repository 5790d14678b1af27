use std::fmt;

use crate::constants::{DEFAULT_INDENT, DEFAULT_MAX_DEPTH, DEFAULT_WIDTH};

/// Which YAML dialect drives implicit typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum YamlVersion {
    V1_1,
    #[default]
    V1_2,
}

impl YamlVersion {
    pub fn from_numbers(major: u32, minor: u32) -> Option<Self> {
        match (major, minor) {
            (1, 0) | (1, 1) => Some(YamlVersion::V1_1),
            (1, _) => Some(YamlVersion::V1_2),
            _ => None,
        }
    }

    pub fn numbers(self) -> (u32, u32) {
        match self {
            YamlVersion::V1_1 => (1, 1),
            YamlVersion::V1_2 => (1, 2),
        }
    }
}

impl fmt::Display for YamlVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (major, minor) = self.numbers();
        write!(f, "{major}.{minor}")
    }
}

/// Safe loading produces plain values; round-trip loading keeps quoting,
/// comments, anchors and number formatting so that a dump reproduces the
/// input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    Safe,
    #[default]
    RoundTrip,
}

/// What to do when a mapping repeats a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateKeys {
    Error,
    #[default]
    Warn,
    Allow,
}

/// Indentation width in spaces. Any count can be stored; the dumper
/// rejects counts outside 1..=9 before writing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indent(usize);

impl Indent {
    pub fn spaces(count: usize) -> Self {
        Indent(count)
    }

    pub fn get_spaces(self) -> usize {
        self.0
    }

    pub fn is_valid(self) -> bool {
        (1..=9).contains(&self.0)
    }
}

impl Default for Indent {
    fn default() -> Self {
        Indent(DEFAULT_INDENT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineBreak {
    #[default]
    Lf,
    Cr,
    CrLf,
}

impl LineBreak {
    pub fn as_str(self) -> &'static str {
        match self {
            LineBreak::Lf => "\n",
            LineBreak::Cr => "\r",
            LineBreak::CrLf => "\r\n",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Utf16Le,
    Utf16Be,
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub mode: Mode,
    pub version: Option<YamlVersion>,
    pub duplicate_keys: DuplicateKeys,
    pub preserve_quotes: bool,
    pub name: String,
    /// Deepest nesting of collections a document may have.
    pub max_depth: usize,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn safe() -> Self {
        Self::default().with_mode(Mode::Safe)
    }

    pub fn round_trip() -> Self {
        Self::default().with_mode(Mode::RoundTrip)
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Force a dialect regardless of any `%YAML` directive.
    pub fn with_version(mut self, version: Option<YamlVersion>) -> Self {
        self.version = version;
        self
    }

    pub fn with_duplicate_keys(mut self, duplicate_keys: DuplicateKeys) -> Self {
        self.duplicate_keys = duplicate_keys;
        self
    }

    pub fn with_preserve_quotes(mut self, preserve_quotes: bool) -> Self {
        self.preserve_quotes = preserve_quotes;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            mode: Mode::Safe,
            version: None,
            duplicate_keys: DuplicateKeys::default(),
            preserve_quotes: true,
            name: "<unicode string>".to_owned(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DumpOptions {
    pub mode: Mode,
    pub explicit_start: bool,
    pub explicit_end: bool,
    pub width: usize,
    pub indent: Indent,
    pub map_indent: Option<Indent>,
    pub sequence_indent: Option<Indent>,
    pub sequence_dash_offset: usize,
    pub allow_unicode: bool,
    pub default_flow_style: Option<bool>,
    pub canonical: bool,
    pub line_break: LineBreak,
    pub encoding: Encoding,
    pub version: Option<YamlVersion>,
    pub tags: Vec<(String, String)>,
    /// Write block sequences under a mapping key at the key's column.
    /// `None` follows what a round-trip load detected, and indents otherwise.
    pub indentless_sequences: Option<bool>,
    /// Deepest nesting of collections the dumper will walk into.
    pub max_depth: usize,
}

impl DumpOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn safe() -> Self {
        Self::default().with_mode(Mode::Safe)
    }

    pub fn round_trip() -> Self {
        Self::default().with_mode(Mode::RoundTrip)
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_explicit_start(mut self, explicit_start: bool) -> Self {
        self.explicit_start = explicit_start;
        self
    }

    pub fn with_explicit_end(mut self, explicit_end: bool) -> Self {
        self.explicit_end = explicit_end;
        self
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    pub fn with_indent(mut self, indent: Indent) -> Self {
        self.indent = indent;
        self
    }

    pub fn with_map_indent(mut self, indent: Option<Indent>) -> Self {
        self.map_indent = indent;
        self
    }

    pub fn with_sequence_indent(mut self, indent: Option<Indent>) -> Self {
        self.sequence_indent = indent;
        self
    }

    /// Columns between the parent indentation and the `-` of a block
    /// sequence entry.
    pub fn with_sequence_dash_offset(mut self, offset: usize) -> Self {
        self.sequence_dash_offset = offset;
        self
    }

    pub fn with_allow_unicode(mut self, allow_unicode: bool) -> Self {
        self.allow_unicode = allow_unicode;
        self
    }

    pub fn with_default_flow_style(mut self, default_flow_style: Option<bool>) -> Self {
        self.default_flow_style = default_flow_style;
        self
    }

    pub fn with_canonical(mut self, canonical: bool) -> Self {
        self.canonical = canonical;
        self
    }

    pub fn with_line_break(mut self, line_break: LineBreak) -> Self {
        self.line_break = line_break;
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_version(mut self, version: Option<YamlVersion>) -> Self {
        self.version = version;
        self
    }

    pub fn with_indentless_sequences(mut self, indentless: Option<bool>) -> Self {
        self.indentless_sequences = indentless;
        self
    }

    pub fn with_tag(mut self, handle: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.tags.push((handle.into(), prefix.into()));
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub(crate) fn effective_map_indent(&self) -> usize {
        self.map_indent.unwrap_or(self.indent).get_spaces()
    }

    pub(crate) fn effective_sequence_indent(&self) -> usize {
        self.sequence_indent.unwrap_or(self.indent).get_spaces()
    }

    /// Flow style used for collections that carry no preference of their own.
    pub(crate) fn effective_flow_style(&self) -> Option<bool> {
        match self.mode {
            Mode::RoundTrip => Some(self.default_flow_style.unwrap_or(false)),
            Mode::Safe => self.default_flow_style,
        }
    }
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            mode: Mode::Safe,
            explicit_start: false,
            explicit_end: false,
            width: DEFAULT_WIDTH,
            indent: Indent::default(),
            map_indent: None,
            sequence_indent: None,
            sequence_dash_offset: 0,
            allow_unicode: true,
            default_flow_style: Some(false),
            canonical: false,
            line_break: LineBreak::default(),
            encoding: Encoding::default(),
            version: None,
            tags: Vec::new(),
            indentless_sequences: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 1, Some(YamlVersion::V1_1))]
    #[case(1, 2, Some(YamlVersion::V1_2))]
    #[case(1, 3, Some(YamlVersion::V1_2))]
    #[case(2, 0, None)]
    fn test_version_from_numbers(
        #[case] major: u32,
        #[case] minor: u32,
        #[case] expected: Option<YamlVersion>,
    ) {
        assert_eq!(YamlVersion::from_numbers(major, minor), expected);
    }

    #[rstest]
    #[case(0, false)]
    #[case(1, true)]
    #[case(9, true)]
    #[case(10, false)]
    fn test_indent_validity(#[case] spaces: usize, #[case] valid: bool) {
        assert_eq!(Indent::spaces(spaces).is_valid(), valid);
    }

    #[rstest]
    fn test_builder_chain() {
        let options = DumpOptions::new()
            .with_indent(Indent::spaces(4))
            .with_sequence_indent(Some(Indent::spaces(2)))
            .with_explicit_start(true);
        assert_eq!(options.effective_map_indent(), 4);
        assert_eq!(options.effective_sequence_indent(), 2);
        assert!(options.explicit_start);
    }
}
