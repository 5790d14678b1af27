use rstest::rstest;
use yaml_rt::{DumpOptions, DuplicateKeys, ErrorKind, Indent, LoadOptions, Value, WarningKind};

#[rstest]
#[case("a: @b", ErrorKind::Scanner, "found character '@' that cannot start any token")]
#[case("\"\\q\"", ErrorKind::Scanner, "found unknown escape character 'q'")]
#[case("- a\nb: c", ErrorKind::Parser, "expected <block end>, but found '?'")]
#[case("[a, b", ErrorKind::Parser, "expected ',' or ']', but got '<stream end>'")]
#[case("!u!x a", ErrorKind::Parser, "found undefined tag handle '!u!'")]
#[case("%YAML 2.0\n--- a", ErrorKind::Parser, "found incompatible YAML document (version 1.* is required)")]
#[case("- *x\n", ErrorKind::Composer, "found undefined alias 'x'")]
#[case("!thing 3", ErrorKind::Constructor, "could not determine a constructor for the tag '!thing'")]
#[case("? {a: 1}\n: v\n", ErrorKind::Constructor, "found unhashable key")]
#[case("!!int abc", ErrorKind::Constructor, "cannot interpret 'abc' as an int")]
#[case("a\u{1}b", ErrorKind::Reader, "unacceptable character #x0001: special characters are not allowed")]
fn load_errors(#[case] input: &str, #[case] kind: ErrorKind, #[case] problem: &str) {
    let err = yaml_rt::load(input).unwrap_err();
    assert_eq!(err.kind(), kind, "{err}");
    assert_eq!(err.problem(), Some(problem));
}

#[rstest]
fn simple_key_without_colon() {
    let err = yaml_rt::load("a: 1\nb\nc: 2").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Scanner);
    assert_eq!(err.context(), Some("while scanning a simple key"));
    assert_eq!(err.problem(), Some("could not find expected ':'"));
}

#[rstest]
fn messages_name_the_source_and_position() {
    let options = LoadOptions::safe().with_name("config.yaml");
    let err = yaml_rt::load_with_options("a: 1\nb: @c\n", &options).unwrap_err();
    let mark = err.problem_mark().unwrap();
    assert_eq!((mark.line, mark.column), (1, 3));
    let message = err.to_string();
    assert!(
        message.contains("in \"config.yaml\", line 2, column 4"),
        "{message}"
    );
    assert!(message.contains("b: @c\n       ^ (line: 2)"), "{message}");
}

#[rstest]
fn invalid_utf8_is_a_reader_error() {
    let err = yaml_rt::from_slice::<serde_json::Value>(&[b'a', 0xff]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Reader);
    assert!(err.problem().unwrap().starts_with("'utf-8' codec can't decode byte #xff"));
}

#[rstest]
fn duplicate_keys_follow_the_policy() {
    let input = "a: 1\na: 2\n";
    let strict = LoadOptions::safe().with_duplicate_keys(DuplicateKeys::Error);
    let err = yaml_rt::load_with_options(input, &strict).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Constructor);
    assert_eq!(
        err.problem(),
        Some("found duplicate key \"a\" with value \"2\" (original value: \"1\")")
    );

    let (value, warnings) = yaml_rt::load_with_warnings(input, &LoadOptions::safe()).unwrap();
    assert_eq!(value.get("a"), Some(Value::from(2)));
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].kind, WarningKind::DuplicateKey);
    assert!(warnings[0].to_string().contains("found duplicate key"));

    let allow = LoadOptions::safe().with_duplicate_keys(DuplicateKeys::Allow);
    let (_, warnings) = yaml_rt::load_with_warnings(input, &allow).unwrap();
    assert!(warnings.is_empty());
}

#[rstest]
#[case(DumpOptions::safe().with_indent(Indent::spaces(0)), "indent must be between 1 and 9, but got 0")]
#[case(DumpOptions::safe().with_map_indent(Some(Indent::spaces(11))), "mapping indent must be between 1 and 9, but got 11")]
fn invalid_dump_options(#[case] options: DumpOptions, #[case] problem: &str) {
    let err = yaml_rt::dump_with_options(&Value::from(1), &options).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Emitter);
    assert_eq!(err.problem(), Some(problem));
}

#[rstest]
fn safe_dump_rejects_unknown_tags() {
    let mut value = Value::from("x");
    value.update_format(|format| format.tag = Some("!custom".to_owned()));
    let err = yaml_rt::dump(&value).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Representer);
    assert!(err.problem().unwrap().starts_with("cannot represent an object"));
}

#[rstest]
fn recursive_values_cannot_become_json() {
    let value = yaml_rt::load("&a [*a]").unwrap();
    let err = value.to_json().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Serde);
}

#[rstest]
fn typed_deserialization_errors_are_serde_errors() {
    #[derive(Debug, serde::Deserialize)]
    #[allow(dead_code)]
    struct Config {
        port: u16,
    }
    let err = yaml_rt::from_str::<Config>("port: high\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Serde);
}

fn nested_sequences(depth: usize) -> String {
    format!("{}x{}", "[".repeat(depth), "]".repeat(depth))
}

#[rstest]
fn nesting_up_to_the_limit_loads() {
    let options = LoadOptions::safe().with_max_depth(32);
    let mut value = yaml_rt::load_with_options(&nested_sequences(32), &options).unwrap();
    for _ in 0..32 {
        value = value.get(0).unwrap();
    }
    assert_eq!(value, Value::from("x"));
}

#[rstest]
#[case(129)]
#[case(20_000)]
fn nesting_past_the_default_limit_is_an_error(#[case] depth: usize) {
    let err = yaml_rt::load(&nested_sequences(depth)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Composer);
    assert!(
        err.to_string().contains("exceeded the maximum nesting depth of 128"),
        "{err}"
    );
}

#[rstest]
fn dump_stops_at_the_nesting_limit() {
    let mut value = Value::from("leaf");
    for _ in 0..9 {
        value = Value::from(vec![value]);
    }
    let err = yaml_rt::dump_with_options(&value, &DumpOptions::safe().with_max_depth(8)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Representer);
    assert_eq!(err.problem(), Some("exceeded the maximum nesting depth of 8"));
    assert!(yaml_rt::dump_with_options(&value, &DumpOptions::safe().with_max_depth(9)).is_ok());
}
