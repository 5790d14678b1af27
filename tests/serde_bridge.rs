use std::collections::BTreeMap;

use rstest::rstest;
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Service {
    name: String,
    port: u16,
    enabled: bool,
    tags: Vec<String>,
    limits: Limits,
    #[serde(default)]
    note: Option<String>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Limits {
    cpu: f64,
    memory: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Level {
    Debug,
    Info,
}

fn sample() -> Service {
    Service {
        name: "api".to_owned(),
        port: 8080,
        enabled: true,
        tags: vec!["web".to_owned(), "public".to_owned()],
        limits: Limits {
            cpu: 0.5,
            memory: "512Mi".to_owned(),
        },
        note: None,
    }
}

const SAMPLE_YAML: &str = "\
name: api
port: 8080
enabled: true
tags:
  - web
  - public
limits:
  cpu: 0.5
  memory: 512Mi
note: null
";

#[rstest]
fn serializes_structs_in_field_order() {
    assert_eq!(yaml_rt::to_string(&sample()).unwrap(), SAMPLE_YAML);
}

#[rstest]
fn deserializes_structs() {
    let service: Service = yaml_rt::from_str(SAMPLE_YAML).unwrap();
    assert_eq!(service, sample());
}

#[rstest]
fn optional_fields_may_be_missing() {
    let input = "name: db\nport: 5432\nenabled: false\ntags: []\nlimits: {cpu: 2.0, memory: 1Gi}\n";
    let service: Service = yaml_rt::from_str(input).unwrap();
    assert_eq!(service.note, None);
    assert!(service.tags.is_empty());
}

#[rstest]
fn unit_enums_are_strings() {
    let levels: Vec<Level> = yaml_rt::from_str("- debug\n- info\n").unwrap();
    assert_eq!(levels, vec![Level::Debug, Level::Info]);
    assert_eq!(yaml_rt::to_string(&Level::Info).unwrap(), "info\n");
}

#[rstest]
fn maps_with_yaml_features() {
    let input = "base: &b {x: 1}\nderived:\n  <<: *b\n  y: 2\n";
    let value: BTreeMap<String, BTreeMap<String, i32>> = yaml_rt::from_str(input).unwrap();
    assert_eq!(value["derived"]["x"], 1);
    assert_eq!(value["derived"]["y"], 2);
}

#[rstest]
fn reader_and_writer_variants() {
    let service: Service = yaml_rt::from_reader(SAMPLE_YAML.as_bytes()).unwrap();
    let mut out = Vec::new();
    yaml_rt::to_writer(&mut out, &service).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), SAMPLE_YAML);
    assert_eq!(yaml_rt::to_vec(&service).unwrap(), SAMPLE_YAML.as_bytes());
}

#[rstest]
fn strings_that_look_like_other_types_survive() {
    let values = vec!["true".to_owned(), "1.0".to_owned(), "~".to_owned(), "".to_owned()];
    let text = yaml_rt::to_string(&values).unwrap();
    let back: Vec<String> = yaml_rt::from_str(&text).unwrap();
    assert_eq!(back, values);
}
