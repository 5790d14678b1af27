use crate::constants::is_break;
use crate::options::{Encoding, LineBreak};

/// Output buffer of the emitter.
///
/// Besides the text it keeps the position bookkeeping the emitter decides
/// on: the current line and column, whether the last thing written was
/// whitespace, and whether the line so far holds only indentation and
/// indicators.
pub(crate) struct Writer {
    buffer: String,
    line_break: LineBreak,
    encoding: Encoding,
    indent_cache: Vec<String>,
    pub(crate) line: usize,
    pub(crate) column: usize,
    pub(crate) whitespace: bool,
    pub(crate) indention: bool,
}

impl Writer {
    pub fn new(line_break: LineBreak, encoding: Encoding) -> Self {
        Self {
            buffer: String::new(),
            line_break,
            encoding,
            indent_cache: vec![String::new()],
            line: 0,
            column: 0,
            whitespace: true,
            indention: true,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn finish(self) -> String {
        self.buffer
    }

    /// The output in the configured encoding. UTF-16 output starts with a
    /// byte order mark.
    pub fn finish_bytes(self) -> Vec<u8> {
        match self.encoding {
            Encoding::Utf8 => self.buffer.into_bytes(),
            Encoding::Utf16Le => std::iter::once(0xfeff)
                .chain(self.buffer.encode_utf16())
                .flat_map(u16::to_le_bytes)
                .collect(),
            Encoding::Utf16Be => std::iter::once(0xfeff)
                .chain(self.buffer.encode_utf16())
                .flat_map(u16::to_be_bytes)
                .collect(),
        }
    }

    /// Writes text that holds no line breaks.
    pub fn write_str(&mut self, text: &str) {
        self.column += text.chars().count();
        self.buffer.push_str(text);
    }

    pub fn write_char(&mut self, ch: char) {
        self.column += 1;
        self.buffer.push(ch);
    }

    /// Writes an indicator, preceded by a space unless whitespace was just
    /// written or none is needed.
    pub fn write_indicator(
        &mut self,
        indicator: &str,
        need_whitespace: bool,
        whitespace: bool,
        indention: bool,
    ) {
        if !self.whitespace && need_whitespace {
            self.write_char(' ');
        }
        self.write_str(indicator);
        self.whitespace = whitespace;
        self.indention = self.indention && indention;
    }

    /// Starts a new line unless the current one holds nothing but
    /// indentation up to `indent`, then pads to `indent`.
    pub fn write_indent(&mut self, indent: usize) {
        if !self.indention
            || self.column > indent
            || (self.column == indent && !self.whitespace)
        {
            self.write_line_break(None);
        }
        self.pad_to(indent);
    }

    /// Pads the current line with spaces up to `column`.
    pub fn pad_to(&mut self, column: usize) {
        if self.column < column {
            self.whitespace = true;
            let count = column - self.column;
            self.write_spaces(count);
        }
    }

    pub fn write_spaces(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        if count >= self.indent_cache.len() {
            self.extend_indent_cache(count);
        }
        self.buffer.push_str(&self.indent_cache[count]);
        self.column += count;
    }

    /// Ends the line with `data`, or with the configured line break.
    pub fn write_line_break(&mut self, data: Option<char>) {
        match data {
            Some(ch) if is_break(ch) && ch != '\n' => self.buffer.push(ch),
            _ => self.buffer.push_str(self.line_break.as_str()),
        }
        self.whitespace = true;
        self.indention = true;
        self.line += 1;
        self.column = 0;
    }

    fn extend_indent_cache(&mut self, count: usize) {
        while self.indent_cache.len() <= count {
            let mut next = String::with_capacity(self.indent_cache.len());
            next.push_str(&self.indent_cache[self.indent_cache.len() - 1]);
            next.push(' ');
            self.indent_cache.push(next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn writer() -> Writer {
        Writer::new(LineBreak::Lf, Encoding::Utf8)
    }

    #[rstest]
    fn test_indicator_spacing() {
        let mut writer = writer();
        writer.write_indicator("-", true, false, true);
        writer.write_indicator("&a", true, false, false);
        writer.write_str("b");
        assert_eq!(writer.finish(), "- &ab");
    }

    #[rstest]
    fn test_write_indent_breaks_only_when_needed() {
        let mut writer = writer();
        writer.write_indent(0);
        writer.write_str("a:");
        writer.indention = false;
        writer.write_indent(2);
        writer.write_str("b");
        assert_eq!(writer.column, 3);
        assert_eq!(writer.line, 1);
        assert_eq!(writer.finish(), "a:\n  b");
    }

    #[rstest]
    fn test_line_break_choice() {
        let mut writer = Writer::new(LineBreak::CrLf, Encoding::Utf8);
        writer.write_str("a");
        writer.write_line_break(None);
        writer.write_str("b");
        writer.write_line_break(Some('\u{2028}'));
        writer.write_line_break(Some('\n'));
        assert_eq!(writer.finish(), "a\r\nb\u{2028}\r\n");
    }

    #[rstest]
    #[case(Encoding::Utf16Le, vec![0xff, 0xfe, b'a', 0])]
    #[case(Encoding::Utf16Be, vec![0xfe, 0xff, 0, b'a'])]
    #[case(Encoding::Utf8, vec![b'a'])]
    fn test_encodings(#[case] encoding: Encoding, #[case] expected: Vec<u8>) {
        let mut writer = Writer::new(LineBreak::Lf, encoding);
        writer.write_str("a");
        assert_eq!(writer.finish_bytes(), expected);
    }

    #[rstest]
    fn test_column_counts_characters() {
        let mut writer = writer();
        writer.write_str("héllo");
        writer.write_spaces(3);
        assert_eq!(writer.column, 8);
    }
}
