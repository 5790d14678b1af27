use rstest::rstest;
use yaml_rt::event::ScalarStyle;
use yaml_rt::{LoadOptions, Value};

fn load(input: &str) -> Value {
    yaml_rt::round_trip_load(input).unwrap_or_else(|err| panic!("load failed for {input:?}: {err}"))
}

#[rstest]
fn round_trip_values_compare_like_safe_ones() {
    let input = "a: 0x10\nb: 'text'\nc: [1, 2]\nd: ~\n";
    assert_eq!(load(input), yaml_rt::load(input).unwrap());
}

#[rstest]
#[case("'single'", ScalarStyle::SingleQuoted)]
#[case("\"double\"", ScalarStyle::DoubleQuoted)]
#[case("|\n  literal\n", ScalarStyle::Literal)]
#[case(">\n  folded\n", ScalarStyle::Folded)]
fn quoting_style_is_recorded(#[case] input: &str, #[case] style: ScalarStyle) {
    assert_eq!(load(input).format().style, Some(style));
}

#[rstest]
fn plain_scalars_record_no_style() {
    assert_eq!(load("plain").format().style, None);
}

#[rstest]
fn flow_style_is_recorded_per_collection() {
    let value = load("block:\n  - 1\nflow: [1]\n");
    assert_eq!(value.format().flow_style, Some(false));
    assert_eq!(value.get("block").unwrap().format().flow_style, Some(false));
    assert_eq!(value.get("flow").unwrap().format().flow_style, Some(true));
}

#[rstest]
fn anchors_are_recorded() {
    let value = load("base: &anchor {x: 1}\ncopy: *anchor\n");
    let base = value.get("base").unwrap();
    assert_eq!(base.anchor().as_deref(), Some("anchor"));
    assert_eq!(base.identity(), value.get("copy").unwrap().identity());
}

fn comment_texts(comments: Option<yaml_rt::comments::Comments>) -> Vec<String> {
    comments
        .map(|comments| {
            comments
                .pre
                .iter()
                .chain(comments.post.iter())
                .map(|line| line.text.clone())
                .collect()
        })
        .unwrap_or_default()
}

#[rstest]
fn comments_attach_to_values() {
    let value = load("# head\na: 1  # one\nb: 2\n");
    let mut texts = comment_texts(value.comments());
    if let Some(document) = value.format().document {
        texts.extend(comment_texts(document.start_comments.map(|comments| *comments)));
    }
    for (key, item) in value.as_mapping().unwrap().entries() {
        texts.extend(comment_texts(key.comments()));
        texts.extend(comment_texts(item.comments()));
    }
    assert!(texts.iter().any(|text| text == "# head"), "{texts:?}");
    assert!(texts.iter().any(|text| text == "# one"), "{texts:?}");
}

#[rstest]
fn unknown_tags_are_kept() {
    let value = load("- !point {x: 1}\n- !name ada\n- !list [1]\n");
    let point = value.get(0).unwrap();
    assert_eq!(point.tag().as_deref(), Some("!point"));
    assert_eq!(point.get("x"), Some(Value::from(1)));
    let name = value.get(1).unwrap();
    assert_eq!(name.as_str(), Some("ada"));
    assert_eq!(name.tag().as_deref(), Some("!name"));
    assert_eq!(value.get(2).unwrap().tag().as_deref(), Some("!list"));
}

#[rstest]
fn merges_stay_references() {
    let value = load("a: &a {x: 1}\nb:\n  <<: *a\n  y: 2\n");
    let b = value.get("b").unwrap();
    let mapping = b.as_mapping().unwrap();
    assert_eq!(mapping.borrow().entries.len(), 1);
    assert_eq!(mapping.len(), 2);
    assert_eq!(mapping.merges().len(), 1);
    assert_eq!(b.get("x"), Some(Value::from(1)));
    assert_eq!(b.get("y"), Some(Value::from(2)));
}

#[rstest]
fn unhashable_keys_are_allowed() {
    let value = load("? {a: 1}\n: v\n");
    assert_eq!(value.as_mapping().unwrap().len(), 1);
}

#[rstest]
fn number_spellings_are_recorded() {
    let value = load("hex: 0x1F\nunder: 1_000\nexp: 1.5E3\n");
    assert_eq!(value.get("hex").unwrap().format().spelling.as_deref(), Some("0x1F"));
    assert!(value.get("hex").unwrap().format().int.is_some());
    assert!(value.get("exp").unwrap().format().float.is_some());
    assert_eq!(value.get("under"), Some(Value::from(1000)));
}

#[rstest]
fn document_format_is_recorded() {
    let value = load("%YAML 1.1\n--- \na: on\n");
    let document = value.format().document.unwrap();
    assert!(document.explicit_start);
    assert_eq!(value.get("a"), Some(Value::from(true)));
}

#[rstest]
fn quotes_can_be_dropped() {
    let options = LoadOptions::round_trip().with_preserve_quotes(false);
    let value = yaml_rt::load_with_options("'q'", &options).unwrap();
    assert_eq!(value.format().style, None);
}
