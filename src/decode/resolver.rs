use std::sync::OnceLock;

use regex::Regex;

use crate::constants::{
    DEFAULT_MAPPING_TAG, DEFAULT_SCALAR_TAG, DEFAULT_SEQUENCE_TAG, TAG_BOOL, TAG_FLOAT, TAG_INT,
    TAG_MERGE, TAG_NULL, TAG_TIMESTAMP, TAG_VALUE,
};
use crate::event::Implicit;
use crate::options::YamlVersion;

const DIGITS: &str = "0123456789";

struct Rule {
    tag: &'static str,
    /// Characters a matching scalar may start with. `matches_empty` covers
    /// the empty scalar.
    first: &'static str,
    matches_empty: bool,
    regex: Regex,
}

impl Rule {
    fn new(tag: &'static str, first: &'static str, pattern: &str) -> Self {
        let anchored = format!("^(?:{pattern})$");
        Self {
            tag,
            first,
            matches_empty: false,
            regex: Regex::new(&anchored).expect("built-in resolver pattern"),
        }
    }

    fn matching_empty(mut self) -> Self {
        self.matches_empty = true;
        self
    }

    fn applies_to(&self, value: &str) -> bool {
        match value.chars().next() {
            None => self.matches_empty,
            Some(first) => self.first.contains(first),
        }
    }
}

const BOOL_1_2: &str = "true|True|TRUE|false|False|FALSE";
const BOOL_1_1: &str =
    "y|Y|yes|Yes|YES|n|N|no|No|NO|true|True|TRUE|false|False|FALSE|on|On|ON|off|Off|OFF";
const FLOAT_1_2: &str = concat!(
    r"[-+]?(?:[0-9][0-9_]*)\.[0-9_]*(?:[eE][-+]?[0-9]+)?",
    r"|[-+]?(?:[0-9][0-9_]*)(?:[eE][-+]?[0-9]+)",
    r"|[-+]?\.[0-9_]+(?:[eE][-+][0-9]+)?",
    r"|[-+]?\.(?:inf|Inf|INF)",
    r"|\.(?:nan|NaN|NAN)",
);
const FLOAT_1_1: &str = concat!(
    r"[-+]?(?:[0-9][0-9_]*)\.[0-9_]*(?:[eE][-+]?[0-9]+)?",
    r"|[-+]?(?:[0-9][0-9_]*)(?:[eE][-+]?[0-9]+)",
    r"|\.[0-9_]+(?:[eE][-+][0-9]+)?",
    r"|[-+]?[0-9][0-9_]*(?::[0-5]?[0-9])+\.[0-9_]*",
    r"|[-+]?\.(?:inf|Inf|INF)",
    r"|\.(?:nan|NaN|NAN)",
);
const INT_1_2: &str = concat!(
    r"[-+]?0b[0-1_]+",
    r"|[-+]?0o?[0-7_]+",
    r"|[-+]?[0-9_]+",
    r"|[-+]?0x[0-9a-fA-F_]+",
);
const INT_1_1: &str = concat!(
    r"[-+]?0b[0-1_]+",
    r"|[-+]?0?[0-7_]+",
    r"|[-+]?(?:0|[1-9][0-9_]*)",
    r"|[-+]?0x[0-9a-fA-F_]+",
    r"|[-+]?[1-9][0-9_]*(?::[0-5]?[0-9])+",
);
const NULL: &str = "~|null|Null|NULL|";
const TIMESTAMP: &str = concat!(
    r"[0-9][0-9][0-9][0-9]-[0-9][0-9]-[0-9][0-9]",
    r"|[0-9][0-9][0-9][0-9]-[0-9][0-9]?-[0-9][0-9]?",
    r"(?:[Tt]|[ \t]+)[0-9][0-9]?",
    r":[0-9][0-9]:[0-9][0-9](?:\.[0-9]*)?",
    r"(?:[ \t]*(?:Z|[-+][0-9][0-9]?(?::[0-9][0-9])?))?",
);

fn shared_rules(rules: &mut Vec<Rule>) {
    rules.push(Rule::new(TAG_MERGE, "<", "<<"));
    rules.push(Rule::new(TAG_NULL, "~nN", NULL).matching_empty());
    rules.push(Rule::new(TAG_TIMESTAMP, DIGITS, TIMESTAMP));
    rules.push(Rule::new(TAG_VALUE, "=", "="));
}

fn rules(version: YamlVersion) -> &'static [Rule] {
    static V1_1: OnceLock<Vec<Rule>> = OnceLock::new();
    static V1_2: OnceLock<Vec<Rule>> = OnceLock::new();
    match version {
        YamlVersion::V1_1 => V1_1.get_or_init(|| {
            let mut rules = vec![
                Rule::new(TAG_BOOL, "yYnNtTfFoO", BOOL_1_1),
                Rule::new(TAG_FLOAT, "-+0123456789.", FLOAT_1_1),
                Rule::new(TAG_INT, "-+0123456789", INT_1_1),
            ];
            shared_rules(&mut rules);
            rules
        }),
        YamlVersion::V1_2 => V1_2.get_or_init(|| {
            let mut rules = vec![
                Rule::new(TAG_BOOL, "tTfF", BOOL_1_2),
                Rule::new(TAG_FLOAT, "-+0123456789.", FLOAT_1_2),
                Rule::new(TAG_INT, "-+0123456789", INT_1_2),
            ];
            shared_rules(&mut rules);
            rules
        }),
    }
}

/// Implicit tag resolution for untagged nodes.
///
/// Plain scalars are matched against the dialect's patterns in a fixed
/// order (bool, float, int, merge, null, timestamp, value); everything else
/// falls back to the default tag for its node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Resolver {
    version: YamlVersion,
}

impl Resolver {
    pub fn new(version: YamlVersion) -> Self {
        Self { version }
    }

    pub fn version(&self) -> YamlVersion {
        self.version
    }

    pub fn resolve_scalar(&self, value: &str, implicit: Implicit) -> &'static str {
        if implicit.plain {
            if let Some(rule) = rules(self.version)
                .iter()
                .find(|rule| rule.applies_to(value) && rule.regex.is_match(value))
            {
                return rule.tag;
            }
        }
        DEFAULT_SCALAR_TAG
    }

    pub fn resolve_sequence(&self) -> &'static str {
        DEFAULT_SEQUENCE_TAG
    }

    pub fn resolve_mapping(&self) -> &'static str {
        DEFAULT_MAPPING_TAG
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TAG_STR;
    use rstest::rstest;

    fn resolve(version: YamlVersion, value: &str) -> &'static str {
        Resolver::new(version).resolve_scalar(value, Implicit::new(true, false))
    }

    #[rstest]
    #[case("on", TAG_BOOL, TAG_STR)]
    #[case("yes", TAG_BOOL, TAG_STR)]
    #[case("True", TAG_BOOL, TAG_BOOL)]
    #[case("0o17", TAG_STR, TAG_INT)]
    #[case("017", TAG_INT, TAG_INT)]
    #[case("0x1F", TAG_INT, TAG_INT)]
    #[case("1_000", TAG_INT, TAG_INT)]
    #[case("1:20:30", TAG_INT, TAG_STR)]
    #[case("1:20.5", TAG_FLOAT, TAG_STR)]
    #[case("1.5", TAG_FLOAT, TAG_FLOAT)]
    #[case("1e3", TAG_FLOAT, TAG_FLOAT)]
    #[case("-.inf", TAG_FLOAT, TAG_FLOAT)]
    #[case(".NaN", TAG_FLOAT, TAG_FLOAT)]
    #[case("", TAG_NULL, TAG_NULL)]
    #[case("~", TAG_NULL, TAG_NULL)]
    #[case("nil", TAG_STR, TAG_STR)]
    #[case("<<", TAG_MERGE, TAG_MERGE)]
    #[case("=", TAG_VALUE, TAG_VALUE)]
    #[case("2001-12-14", TAG_TIMESTAMP, TAG_TIMESTAMP)]
    #[case("2001-12-14t21:59:43.10-05:00", TAG_TIMESTAMP, TAG_TIMESTAMP)]
    #[case("2001-12-14 21:59:43.10 Z", TAG_TIMESTAMP, TAG_TIMESTAMP)]
    #[case("12:30 pm", TAG_STR, TAG_STR)]
    fn test_resolve_plain_scalar(
        #[case] value: &str,
        #[case] v1_1: &str,
        #[case] v1_2: &str,
    ) {
        assert_eq!(resolve(YamlVersion::V1_1, value), v1_1, "1.1 {value:?}");
        assert_eq!(resolve(YamlVersion::V1_2, value), v1_2, "1.2 {value:?}");
    }

    #[rstest]
    fn test_quoted_scalars_stay_strings() {
        let resolver = Resolver::default();
        assert_eq!(resolver.resolve_scalar("123", Implicit::new(false, true)), TAG_STR);
        assert_eq!(resolver.resolve_sequence(), DEFAULT_SEQUENCE_TAG);
        assert_eq!(resolver.resolve_mapping(), DEFAULT_MAPPING_TAG);
    }
}
