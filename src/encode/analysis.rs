//! Which scalar styles can represent a string without changing it.

use crate::options::YamlVersion;

const BLANK_OR_BREAK: &[char] = &['\0', ' ', '\t', '\r', '\n', '\u{85}', '\u{2028}', '\u{2029}'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalarAnalysis {
    pub empty: bool,
    pub multiline: bool,
    pub allow_flow_plain: bool,
    pub allow_block_plain: bool,
    pub allow_single_quoted: bool,
    pub allow_double_quoted: bool,
    pub allow_block: bool,
}

fn is_line_break(ch: char) -> bool {
    matches!(ch, '\n' | '\u{85}' | '\u{2028}' | '\u{2029}')
}

/// Characters written as they are: printable ASCII and line feed, plus the
/// printable non-ASCII ranges when unicode output is allowed.
fn is_unescaped(ch: char, allow_unicode: bool) -> bool {
    if ch == '\n' || (' '..='~').contains(&ch) {
        return true;
    }
    let printable = matches!(ch,
        '\u{85}'
        | '\u{a0}'..='\u{d7ff}'
        | '\u{e000}'..='\u{fffd}'
        | '\u{10000}'..='\u{10ffff}')
        && ch != '\u{feff}';
    printable && allow_unicode
}

pub fn analyze_scalar(scalar: &str, allow_unicode: bool, version: YamlVersion) -> ScalarAnalysis {
    if scalar.is_empty() {
        return ScalarAnalysis {
            empty: true,
            multiline: false,
            allow_flow_plain: false,
            allow_block_plain: true,
            allow_single_quoted: true,
            allow_double_quoted: true,
            allow_block: false,
        };
    }
    let chars: Vec<char> = scalar.chars().collect();
    let last = chars.len() - 1;

    let mut block_indicators = false;
    let mut flow_indicators = false;
    let mut line_breaks = false;
    let mut special_characters = false;
    let mut leading_space = false;
    let mut leading_break = false;
    let mut trailing_space = false;
    let mut trailing_break = false;
    let mut break_space = false;
    let mut space_break = false;

    if scalar.starts_with("---") || scalar.starts_with("...") {
        block_indicators = true;
        flow_indicators = true;
    }

    let mut preceded_by_whitespace = true;
    let mut followed_by_whitespace = chars.len() == 1 || BLANK_OR_BREAK.contains(&chars[1]);
    let mut previous_space = false;
    let mut previous_break = false;

    for (index, &ch) in chars.iter().enumerate() {
        if index == 0 {
            if "#,[]{}&*!|>'\"%@`".contains(ch) {
                flow_indicators = true;
                block_indicators = true;
            }
            if ch == '?' || ch == ':' {
                if version == YamlVersion::V1_1 || chars.len() == 1 {
                    flow_indicators = true;
                }
                if followed_by_whitespace {
                    block_indicators = true;
                }
            }
            if ch == '-' && followed_by_whitespace {
                flow_indicators = true;
                block_indicators = true;
            }
        } else {
            if ",[]{}".contains(ch) {
                flow_indicators = true;
            }
            if ch == '?' && version == YamlVersion::V1_1 {
                flow_indicators = true;
            }
            if ch == ':' && followed_by_whitespace {
                flow_indicators = true;
                block_indicators = true;
            }
            if ch == '#' && preceded_by_whitespace {
                flow_indicators = true;
                block_indicators = true;
            }
        }

        if is_line_break(ch) {
            line_breaks = true;
        }
        if !is_unescaped(ch, allow_unicode) {
            special_characters = true;
        }

        if ch == ' ' {
            if index == 0 {
                leading_space = true;
            }
            if index == last {
                trailing_space = true;
            }
            if previous_break {
                break_space = true;
            }
            previous_space = true;
            previous_break = false;
        } else if is_line_break(ch) {
            if index == 0 {
                leading_break = true;
            }
            if index == last {
                trailing_break = true;
            }
            if previous_space {
                space_break = true;
            }
            previous_space = false;
            previous_break = true;
        } else {
            previous_space = false;
            previous_break = false;
        }

        preceded_by_whitespace = BLANK_OR_BREAK.contains(&ch);
        followed_by_whitespace = index + 2 >= chars.len() || BLANK_OR_BREAK.contains(&chars[index + 2]);
    }

    let mut analysis = ScalarAnalysis {
        empty: false,
        multiline: line_breaks,
        allow_flow_plain: true,
        allow_block_plain: true,
        allow_single_quoted: true,
        allow_double_quoted: true,
        allow_block: true,
    };
    if leading_space || leading_break || trailing_space || trailing_break {
        analysis.allow_flow_plain = false;
        analysis.allow_block_plain = false;
    }
    if trailing_space {
        analysis.allow_block = false;
    }
    if break_space {
        analysis.allow_flow_plain = false;
        analysis.allow_block_plain = false;
        analysis.allow_single_quoted = false;
    }
    if special_characters {
        analysis.allow_flow_plain = false;
        analysis.allow_block_plain = false;
        analysis.allow_single_quoted = false;
        analysis.allow_block = false;
    } else if space_break {
        analysis.allow_flow_plain = false;
        analysis.allow_block_plain = false;
        analysis.allow_single_quoted = false;
        analysis.allow_block = false;
    }
    if line_breaks {
        analysis.allow_flow_plain = false;
        analysis.allow_block_plain = false;
    }
    if flow_indicators {
        analysis.allow_flow_plain = false;
    }
    if block_indicators {
        analysis.allow_block_plain = false;
    }
    analysis
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn analyze(text: &str) -> ScalarAnalysis {
        analyze_scalar(text, true, YamlVersion::V1_2)
    }

    #[rstest]
    fn test_empty() {
        let analysis = analyze("");
        assert!(analysis.empty);
        assert!(!analysis.allow_flow_plain);
        assert!(analysis.allow_block_plain);
    }

    #[rstest]
    #[case("hello world", true, true)]
    #[case("a, b", false, true)]
    #[case("key: value", false, false)]
    #[case("@handle", false, false)]
    #[case("- item", false, false)]
    #[case("-1", true, true)]
    #[case("a #b", false, false)]
    #[case("a#b", true, true)]
    #[case("---", false, false)]
    #[case(" lead", false, false)]
    #[case("trail ", false, false)]
    fn test_plain_permissions(#[case] text: &str, #[case] flow: bool, #[case] block: bool) {
        let analysis = analyze(text);
        assert_eq!(analysis.allow_flow_plain, flow, "flow plain for {text:?}");
        assert_eq!(analysis.allow_block_plain, block, "block plain for {text:?}");
    }

    #[rstest]
    fn test_colon_and_question_mark_depend_on_version() {
        assert!(analyze_scalar("a?b", true, YamlVersion::V1_2).allow_flow_plain);
        assert!(!analyze_scalar("a?b", true, YamlVersion::V1_1).allow_flow_plain);
        assert!(analyze_scalar(":x", true, YamlVersion::V1_2).allow_flow_plain);
        assert!(!analyze_scalar(":x", true, YamlVersion::V1_1).allow_flow_plain);
    }

    #[rstest]
    fn test_control_characters_need_double_quotes() {
        let analysis = analyze("bell\u{7}");
        assert!(!analysis.allow_single_quoted);
        assert!(!analysis.allow_block);
        assert!(analysis.allow_double_quoted);
        let tab = analyze("a\tb");
        assert!(!tab.allow_block_plain);
    }

    #[rstest]
    fn test_unicode_follows_allow_unicode() {
        assert!(analyze_scalar("café", true, YamlVersion::V1_2).allow_block_plain);
        assert!(!analyze_scalar("café", false, YamlVersion::V1_2).allow_block_plain);
    }

    #[rstest]
    fn test_multiline() {
        let analysis = analyze("one\ntwo\n");
        assert!(analysis.multiline);
        assert!(analysis.allow_block);
        assert!(!analysis.allow_block_plain);
        let space_break = analyze("one \ntwo");
        assert!(!space_break.allow_single_quoted);
        assert!(!space_break.allow_block);
    }
}
