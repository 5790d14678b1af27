use rstest::rstest;
use serde_json::json;
use yaml_rt::{LoadOptions, Value, YamlVersion};

fn to_json(input: &str) -> serde_json::Value {
    yaml_rt::load(input)
        .and_then(|value| value.to_json())
        .unwrap_or_else(|err| panic!("load failed for {input:?}: {err}"))
}

#[rstest]
#[case("a: 1\nb: [x, y]\n", json!({"a": 1, "b": ["x", "y"]}))]
#[case("- {name: Ada, born: 1815}\n- {name: Alan, born: 1912}\n",
    json!([{"name": "Ada", "born": 1815}, {"name": "Alan", "born": 1912}]))]
#[case("key:\n  nested:\n    - 1\n    - two\n", json!({"key": {"nested": [1, "two"]}}))]
#[case("a:\n- 1\n- 2\n", json!({"a": [1, 2]}))]
#[case("? complex\n: value\n", json!({"complex": "value"}))]
#[case("[a, b: c, {d: e}]", json!(["a", {"b": "c"}, {"d": "e"}]))]
#[case("{a, b: }", json!({"a": null, "b": null}))]
#[case("plain\n  continued\n", json!("plain continued"))]
fn loads_structures(#[case] input: &str, #[case] expected: serde_json::Value) {
    assert_eq!(to_json(input), expected);
}

#[rstest]
#[case("~", json!(null))]
#[case("null", json!(null))]
#[case("", json!(null))]
#[case("true", json!(true))]
#[case("False", json!(false))]
#[case("0x1F", json!(31))]
#[case("0o17", json!(15))]
#[case("+12", json!(12))]
#[case("1_000", json!(1000))]
#[case("-1.5e3", json!(-1500.0))]
#[case(".inf", json!(".inf"))]
#[case("-.Inf", json!("-.inf"))]
#[case("'0x1F'", json!("0x1F"))]
#[case("\"tab\\there\"", json!("tab\there"))]
#[case("\"\\u00e9\\x41\"", json!("éA"))]
#[case("'it''s'", json!("it's"))]
#[case("yes", json!("yes"))]
#[case("2001-12-14", json!("2001-12-14"))]
#[case("2001-12-14t21:59:43.10-05:00", json!("2001-12-15T02:59:43.100000"))]
fn resolves_scalars(#[case] input: &str, #[case] expected: serde_json::Value) {
    assert_eq!(to_json(input), expected);
}

#[rstest]
#[case("on", json!(true))]
#[case("No", json!(false))]
#[case("017", json!(15))]
#[case("0b101", json!(5))]
#[case("1:30", json!(90))]
#[case("0o17", json!("0o17"))]
fn yaml_1_1_dialect(#[case] input: &str, #[case] expected: serde_json::Value) {
    let options = LoadOptions::safe().with_version(Some(YamlVersion::V1_1));
    let value = yaml_rt::load_with_options(input, &options).unwrap();
    assert_eq!(value.to_json().unwrap(), expected);
}

#[rstest]
fn version_directive_selects_the_dialect() {
    let value = yaml_rt::load("%YAML 1.1\n---\n[on, 017]\n").unwrap();
    assert_eq!(value.to_json().unwrap(), json!([true, 15]));
}

#[rstest]
#[case("|\n  one\n  two\n", "one\ntwo\n")]
#[case("|-\n  one\n", "one")]
#[case("|+\n  one\n\n", "one\n\n")]
#[case(">\n  one\n  two\n\n  three\n", "one two\nthree\n")]
#[case(">\n  one\n    indented\n  two\n", "one\n  indented\ntwo\n")]
#[case("|2\n   lead\n", " lead\n")]
fn block_scalars(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(yaml_rt::load(input).unwrap(), Value::from(expected));
}

#[rstest]
fn loads_every_document() {
    let values = yaml_rt::load_all("--- 1\n--- 2\n...\n--- [3]\n").unwrap();
    let json: Vec<_> = values.iter().map(|value| value.to_json().unwrap()).collect();
    assert_eq!(json, vec![json!(1), json!(2), json!([3])]);
}

#[rstest]
fn empty_stream_has_no_documents() {
    assert!(yaml_rt::load_all("").unwrap().is_empty());
    assert!(yaml_rt::load_all("# only a comment\n").unwrap().is_empty());
    assert!(yaml_rt::load("").unwrap().is_null());
}

#[rstest]
fn single_load_rejects_a_second_document() {
    let err = yaml_rt::load("a\n--- b\n").unwrap_err();
    assert_eq!(err.kind(), yaml_rt::ErrorKind::Composer);
}

#[rstest]
fn merge_keys_fill_in_missing_entries() {
    let input = "base: &base {x: 1, y: 2}\nchild:\n  <<: *base\n  y: 3\n";
    assert_eq!(
        to_json(input),
        json!({"base": {"x": 1, "y": 2}, "child": {"x": 1, "y": 3}})
    );
}

#[rstest]
fn standard_collection_tags() {
    let value = yaml_rt::load("o: !!omap [b: 1, a: 2]\ns: !!set {x, y}\nbin: !!binary aGk=\n").unwrap();
    assert_eq!(
        value.to_json().unwrap(),
        json!({"o": {"b": 1, "a": 2}, "s": ["x", "y"], "bin": "aGk="})
    );
    assert_eq!(value.get("bin").and_then(|v| v.as_bytes().map(<[u8]>::to_vec)), Some(b"hi".to_vec()));
}

#[rstest]
fn explicit_str_tag_keeps_text() {
    assert_eq!(yaml_rt::load("!!str 123").unwrap(), Value::from("123"));
    assert_eq!(yaml_rt::load("!!int '7'").unwrap(), Value::from(7));
}

#[rstest]
fn byte_order_marks_select_the_encoding() {
    let utf16: Vec<u8> = [0xff, 0xfe]
        .into_iter()
        .chain("a: 1\n".encode_utf16().flat_map(u16::to_le_bytes))
        .collect();
    let value: serde_json::Value = yaml_rt::from_slice(&utf16).unwrap();
    assert_eq!(value, json!({"a": 1}));

    let mut utf8 = vec![0xef, 0xbb, 0xbf];
    utf8.extend_from_slice(b"- x\n");
    let value: serde_json::Value = yaml_rt::from_slice(&utf8).unwrap();
    assert_eq!(value, json!(["x"]));
}
