use rstest::rstest;
use serde_json::json;
use yaml_rt::value::{Mapping, Sequence};
use yaml_rt::{LoadOptions, Value, WarningKind};

#[rstest]
fn aliases_share_one_value() {
    let value = yaml_rt::load("- &shared {n: 1}\n- *shared\n").unwrap();
    let first = value.get(0).unwrap();
    let second = value.get(1).unwrap();
    assert_eq!(first.identity(), second.identity());

    first.as_mapping().unwrap().insert("n", 2);
    assert_eq!(second.get("n"), Some(Value::from(2)));
}

#[rstest]
fn recursive_structures_load() {
    let value = yaml_rt::load("&list [1, *list]").unwrap();
    let inner = value.get(1).unwrap();
    assert_eq!(inner.identity(), value.identity());

    let value = yaml_rt::load("&node\nname: root\nparent: *node\n").unwrap();
    assert_eq!(value.get("parent").unwrap().identity(), value.identity());
}

#[rstest]
fn reused_anchor_names_rebind() {
    let input = "- &a 1\n- &a 2\n- *a\n";
    let (value, warnings) = yaml_rt::load_with_warnings(input, &LoadOptions::safe()).unwrap();
    assert_eq!(value.to_json().unwrap(), json!([1, 2, 2]));
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].kind, WarningKind::ReusedAnchor);
}

#[rstest]
fn safe_dump_generates_anchor_names() {
    let shared = Value::Map(Mapping::from_entries([(Value::from("n"), Value::from(1))]));
    let root = Value::Map(Mapping::from_entries([
        (Value::from("first"), shared.clone()),
        (Value::from("second"), shared),
    ]));
    assert_eq!(
        yaml_rt::dump(&root).unwrap(),
        "first: &id001\n  n: 1\nsecond: *id001\n"
    );
}

#[rstest]
fn anchor_numbers_continue_across_documents() {
    let shared = Value::from(vec![Value::from(1)]);
    let doc = Value::from(vec![shared.clone(), shared]);
    let output = yaml_rt::dump_all(&[doc.clone(), doc]).unwrap();
    assert!(output.contains("&id001"), "{output}");
    assert!(output.contains("&id002"), "{output}");
}

#[rstest]
fn recursive_value_dumps_with_an_alias() {
    let seq = Sequence::new();
    seq.push(Value::from("x"));
    seq.push(Value::Seq(seq.clone()));
    let output = yaml_rt::dump(&Value::Seq(seq)).unwrap();
    assert_eq!(output, "&id001\n- x\n- *id001\n");

    let reloaded = yaml_rt::load(&output).unwrap();
    assert_eq!(reloaded.get(1).unwrap().identity(), reloaded.identity());
}

#[rstest]
fn round_trip_keeps_anchor_names() {
    let input = "defaults: &defaults\n  retries: 3\nservice:\n  <<: *defaults\n  name: api\n";
    let value = yaml_rt::round_trip_load(input).unwrap();
    assert_eq!(yaml_rt::round_trip_dump(&value).unwrap(), input);
}

#[rstest]
fn scalars_are_not_aliased_in_safe_mode() {
    let value = yaml_rt::load("- &s text\n- *s\n").unwrap();
    assert_eq!(yaml_rt::dump(&value).unwrap(), "- text\n- text\n");
}
