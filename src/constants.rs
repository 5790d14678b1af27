pub const TAG_NULL: &str = "tag:yaml.org,2002:null";
pub const TAG_BOOL: &str = "tag:yaml.org,2002:bool";
pub const TAG_INT: &str = "tag:yaml.org,2002:int";
pub const TAG_FLOAT: &str = "tag:yaml.org,2002:float";
pub const TAG_STR: &str = "tag:yaml.org,2002:str";
pub const TAG_BINARY: &str = "tag:yaml.org,2002:binary";
pub const TAG_TIMESTAMP: &str = "tag:yaml.org,2002:timestamp";
pub const TAG_MERGE: &str = "tag:yaml.org,2002:merge";
pub const TAG_VALUE: &str = "tag:yaml.org,2002:value";
pub const TAG_SEQ: &str = "tag:yaml.org,2002:seq";
pub const TAG_MAP: &str = "tag:yaml.org,2002:map";
pub const TAG_OMAP: &str = "tag:yaml.org,2002:omap";
pub const TAG_PAIRS: &str = "tag:yaml.org,2002:pairs";
pub const TAG_SET: &str = "tag:yaml.org,2002:set";

pub const DEFAULT_SCALAR_TAG: &str = TAG_STR;
pub const DEFAULT_SEQUENCE_TAG: &str = TAG_SEQ;
pub const DEFAULT_MAPPING_TAG: &str = TAG_MAP;

pub const DEFAULT_TAG_HANDLES: &[(&str, &str)] = &[("!", "!"), ("!!", "tag:yaml.org,2002:")];

pub const DEFAULT_INDENT: usize = 2;

pub const DEFAULT_WIDTH: usize = 80;

/// Nesting limit for loading and dumping, the same as serde_json's.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Longest scalar the emitter will still write as an implicit key.
pub const MAX_SIMPLE_KEY_LENGTH: usize = 128;

/// Characters the scanner will look ahead for a `:` before giving up on a
/// simple key.
pub const SIMPLE_KEY_LOOKAHEAD: usize = 1024;

/// Line break, including the end-of-input sentinel.
#[inline]
pub fn is_break_or_end(ch: char) -> bool {
    matches!(ch, '\0' | '\r' | '\n' | '\u{85}' | '\u{2028}' | '\u{2029}')
}

#[inline]
pub fn is_break(ch: char) -> bool {
    matches!(ch, '\r' | '\n' | '\u{85}' | '\u{2028}' | '\u{2029}')
}

#[inline]
pub fn is_blank_or_end(ch: char) -> bool {
    ch == ' ' || ch == '\t' || is_break_or_end(ch)
}

#[inline]
pub fn is_space_or_end(ch: char) -> bool {
    ch == ' ' || is_break_or_end(ch)
}

#[inline]
pub fn is_flow_indicator(ch: char) -> bool {
    matches!(ch, ',' | '[' | ']' | '{' | '}')
}

/// Characters allowed in anchor and alias names: printable, non-blank and
/// not a flow indicator.
#[inline]
pub fn is_anchor_char(ch: char) -> bool {
    if is_flow_indicator(ch) {
        return false;
    }
    matches!(ch,
        '\u{21}'..='\u{7e}'
        | '\u{a0}'..='\u{d7ff}'
        | '\u{e000}'..='\u{fffd}'
        | '\u{10000}'..='\u{10ffff}')
        && ch != '\u{feff}'
}

#[inline]
pub fn is_uri_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || "-;/?:@&=+$,_.!~*'()[]%".contains(ch)
}

/// Characters YAML accepts in a stream without escaping.
#[inline]
pub fn is_printable(ch: char) -> bool {
    matches!(ch,
        '\t' | '\n' | '\r' | '\u{85}'
        | '\u{20}'..='\u{7e}'
        | '\u{a0}'..='\u{d7ff}'
        | '\u{e000}'..='\u{fffd}'
        | '\u{10000}'..='\u{10ffff}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    fn test_is_break() {
        assert!(is_break('\n'));
        assert!(is_break('\r'));
        assert!(is_break('\u{2028}'));
        assert!(!is_break('\0'));
        assert!(is_break_or_end('\0'));
        assert!(!is_break(' '));
    }

    #[rstest::rstest]
    fn test_is_printable() {
        assert!(is_printable('a'));
        assert!(is_printable('\t'));
        assert!(is_printable('\u{e9}'));
        assert!(is_printable('\u{1f600}'));
        assert!(!is_printable('\u{7}'));
        assert!(!is_printable('\u{7f}'));
        assert!(!is_printable('\u{fffe}'));
    }

    #[rstest::rstest]
    fn test_is_anchor_char() {
        assert!(is_anchor_char('a'));
        assert!(is_anchor_char('-'));
        assert!(is_anchor_char(':'));
        assert!(!is_anchor_char(' '));
        assert!(!is_anchor_char(','));
        assert!(!is_anchor_char(']'));
    }
}
