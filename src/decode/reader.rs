use std::sync::Arc;

use crate::constants::is_printable;
use crate::error::{Mark, ReaderError};

const BOM: char = '\u{feff}';

/// Character cursor over a fully decoded input buffer.
///
/// The buffer always ends with a `\0` sentinel so that lookahead past the
/// end of input never fails.
pub struct Reader {
    name: Arc<str>,
    buffer: Arc<[char]>,
    pointer: usize,
    line: usize,
    column: usize,
}

impl Reader {
    pub fn from_str(input: &str, name: &str) -> Result<Self, ReaderError> {
        let name: Arc<str> = Arc::from(name);
        let mut chars = Vec::with_capacity(input.len() + 1);
        for (index, ch) in input.chars().enumerate() {
            if !is_printable(ch) && ch != BOM {
                return Err(ReaderError::unacceptable_character(name, index, ch));
            }
            chars.push(ch);
        }
        chars.push('\0');
        Ok(Self::with_buffer(name, chars))
    }

    /// Decode raw bytes, sniffing a UTF-32 or UTF-16 byte order mark and
    /// falling back to UTF-8.
    pub fn from_bytes(input: &[u8], name: &str) -> Result<Self, ReaderError> {
        let shared: Arc<str> = Arc::from(name);
        let chars = match sniff_encoding(input) {
            Encoding::Utf8 => decode_utf8(input, &shared)?,
            Encoding::Utf16Le => decode_utf16(input, &shared, false)?,
            Encoding::Utf16Be => decode_utf16(input, &shared, true)?,
            Encoding::Utf32Le => decode_utf32(input, &shared, false)?,
            Encoding::Utf32Be => decode_utf32(input, &shared, true)?,
        };
        let mut checked = Vec::with_capacity(chars.len() + 1);
        for (index, ch) in chars.into_iter().enumerate() {
            if !is_printable(ch) && ch != BOM {
                return Err(ReaderError::unacceptable_character(shared, index, ch));
            }
            checked.push(ch);
        }
        checked.push('\0');
        Ok(Self::with_buffer(shared, checked))
    }

    fn with_buffer(name: Arc<str>, chars: Vec<char>) -> Self {
        Self {
            name,
            buffer: Arc::from(chars),
            pointer: 0,
            line: 0,
            column: 0,
        }
    }

    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.pointer
    }

    #[inline]
    pub fn line(&self) -> usize {
        self.line
    }

    #[inline]
    pub fn column(&self) -> usize {
        self.column
    }

    #[inline]
    pub fn peek(&self, offset: usize) -> char {
        self.buffer
            .get(self.pointer + offset)
            .copied()
            .unwrap_or('\0')
    }

    pub fn prefix(&self, length: usize) -> String {
        let end = (self.pointer + length).min(self.buffer.len());
        self.buffer[self.pointer..end].iter().collect()
    }

    pub(crate) fn prefix_matches(&self, expected: &str) -> bool {
        expected
            .chars()
            .enumerate()
            .all(|(offset, ch)| self.peek(offset) == ch)
    }

    pub fn forward(&mut self, length: usize) {
        for _ in 0..length {
            let Some(&ch) = self.buffer.get(self.pointer) else {
                return;
            };
            if ch == '\0' && self.pointer + 1 == self.buffer.len() {
                return;
            }
            self.pointer += 1;
            if ch == '\n' || (ch == '\r' && self.peek(0) != '\n') {
                self.line += 1;
                self.column = 0;
            } else if ch != BOM {
                self.column += 1;
            }
        }
    }

    pub fn get_mark(&self) -> Mark {
        Mark::new(self.name.clone(), self.pointer, self.line, self.column)
            .with_buffer(self.buffer.clone(), self.pointer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    Utf32Le,
    Utf32Be,
}

fn sniff_encoding(input: &[u8]) -> Encoding {
    match input {
        [0xFF, 0xFE, 0x00, 0x00, ..] => Encoding::Utf32Le,
        [0x00, 0x00, 0xFE, 0xFF, ..] => Encoding::Utf32Be,
        [0xFF, 0xFE, ..] => Encoding::Utf16Le,
        [0xFE, 0xFF, ..] => Encoding::Utf16Be,
        _ => Encoding::Utf8,
    }
}

fn decode_utf8(input: &[u8], name: &Arc<str>) -> Result<Vec<char>, ReaderError> {
    match std::str::from_utf8(input) {
        Ok(text) => Ok(text.chars().collect()),
        Err(err) => {
            let position = err.valid_up_to();
            let reason = match err.error_len() {
                Some(_) => "invalid start byte",
                None => "unexpected end of data",
            };
            Err(ReaderError::undecodable_byte(
                name.clone(),
                position,
                "utf-8",
                input[position],
                reason,
            ))
        }
    }
}

fn decode_utf16(input: &[u8], name: &Arc<str>, big_endian: bool) -> Result<Vec<char>, ReaderError> {
    let encoding = if big_endian { "utf-16-be" } else { "utf-16-le" };
    if input.len() % 2 != 0 {
        let position = input.len() - 1;
        return Err(ReaderError::undecodable_byte(
            name.clone(),
            position,
            encoding,
            input[position],
            "truncated data",
        ));
    }
    let units = input.chunks_exact(2).map(|pair| {
        if big_endian {
            u16::from_be_bytes([pair[0], pair[1]])
        } else {
            u16::from_le_bytes([pair[0], pair[1]])
        }
    });
    let mut chars = Vec::with_capacity(input.len() / 2);
    let mut position = 0;
    for decoded in char::decode_utf16(units) {
        match decoded {
            Ok(ch) => {
                position += ch.len_utf16() * 2;
                chars.push(ch);
            }
            Err(_) => {
                return Err(ReaderError::undecodable_byte(
                    name.clone(),
                    position,
                    encoding,
                    input[position],
                    "illegal UTF-16 surrogate",
                ));
            }
        }
    }
    Ok(chars)
}

fn decode_utf32(input: &[u8], name: &Arc<str>, big_endian: bool) -> Result<Vec<char>, ReaderError> {
    let encoding = if big_endian { "utf-32-be" } else { "utf-32-le" };
    let mut chars = Vec::with_capacity(input.len() / 4);
    for (index, quad) in input.chunks(4).enumerate() {
        let position = index * 4;
        let code = match quad {
            [a, b, c, d] if big_endian => u32::from_be_bytes([*a, *b, *c, *d]),
            [a, b, c, d] => u32::from_le_bytes([*a, *b, *c, *d]),
            _ => {
                return Err(ReaderError::undecodable_byte(
                    name.clone(),
                    position,
                    encoding,
                    quad[0],
                    "truncated data",
                ))
            }
        };
        match char::from_u32(code) {
            Some(ch) => chars.push(ch),
            None => {
                return Err(ReaderError::undecodable_byte(
                    name.clone(),
                    position,
                    encoding,
                    quad[0],
                    "code point not in range(0x110000)",
                ))
            }
        }
    }
    Ok(chars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_forward_tracks_lines_and_columns() {
        let mut reader = Reader::from_str("ab\ncd\r\ne", "<test>").unwrap();
        reader.forward(4);
        assert_eq!((reader.line(), reader.column()), (1, 1));
        reader.forward(3);
        assert_eq!((reader.line(), reader.column()), (2, 0));
        assert_eq!(reader.peek(0), 'e');
        assert_eq!(reader.peek(1), '\0');
    }

    #[rstest]
    fn test_forward_stops_at_sentinel() {
        let mut reader = Reader::from_str("a", "<test>").unwrap();
        reader.forward(10);
        assert_eq!(reader.index(), 1);
        assert_eq!(reader.peek(0), '\0');
    }

    #[rstest]
    fn test_bom_does_not_advance_column() {
        let mut reader = Reader::from_str("\u{feff}a", "<test>").unwrap();
        reader.forward(1);
        assert_eq!(reader.column(), 0);
    }

    #[rstest]
    fn test_rejects_control_character() {
        let err = Reader::from_str("a\u{1}b", "<test>").err().unwrap();
        assert_eq!(err.position, 1);
        assert!(err.problem.contains("#x0001"));
    }

    #[rstest]
    #[case(vec![0xFF, 0xFE, b'a', 0x00, b'b', 0x00], "\u{feff}ab")]
    #[case(vec![0xFE, 0xFF, 0x00, b'a'], "\u{feff}a")]
    #[case(vec![0xFF, 0xFE, 0x00, 0x00, b'a', 0, 0, 0], "\u{feff}a")]
    #[case(b"plain".to_vec(), "plain")]
    fn test_from_bytes_sniffs_encoding(#[case] bytes: Vec<u8>, #[case] expected: &str) {
        let reader = Reader::from_bytes(&bytes, "<bytes>").unwrap();
        assert_eq!(reader.prefix(expected.chars().count()), expected);
    }

    #[rstest]
    fn test_invalid_utf8_reports_offset() {
        let err = Reader::from_bytes(&[b'a', 0xFF, b'b'], "<bytes>").err().unwrap();
        assert_eq!(err.position, 1);
        assert!(err.problem.starts_with("'utf-8' codec can't decode byte #xff"));
    }

    #[rstest]
    fn test_mark_snippet_points_at_column() {
        let mut reader = Reader::from_str("key: value", "<test>").unwrap();
        reader.forward(5);
        let mark = reader.get_mark();
        assert_eq!(mark.column, 5);
        assert_eq!(
            mark.snippet(0, 75).unwrap(),
            "key: value\n     ^ (line: 1)"
        );
    }
}
