//! Value graph to node graph.
//!
//! Standard values are represented by their variant. A value whose format
//! carries a tag is first looked up in a [`RepresenterRegistry`]. When no
//! handler matches, a round-trip dump keeps the tag on the node, while a safe
//! dump rejects any tag outside the standard set.
//!
//! Every collection, and every anchored scalar in round-trip mode, is
//! memoized by identity as soon as its node exists, so a second reference
//! (including one from inside the collection itself) reuses that node and
//! the serializer writes it as an alias.

use std::collections::HashMap;
use std::rc::Rc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use log::trace;

use crate::arena::{Arena, Document, Node, NodeData, NodeId};
use crate::constants::{
    TAG_BINARY, TAG_BOOL, TAG_FLOAT, TAG_INT, TAG_MAP, TAG_MERGE, TAG_NULL, TAG_OMAP, TAG_PAIRS,
    TAG_SEQ, TAG_SET, TAG_STR, TAG_TIMESTAMP,
};
use crate::error::Error;
use crate::event::ScalarStyle;
use crate::num::{format_float, format_float_default, format_int, parse_bool};
use crate::options::{DumpOptions, Mode, YamlVersion};
use crate::value::{Format, Mapping, Meta, Value};
use crate::Result;

const BASE64_LINE: usize = 76;

pub type RepresentFn = dyn Fn(&mut Representer, &Value, &str) -> Result<NodeId>;

/// Representers keyed by the tag a value carries in its format.
///
/// Lookup order is exact tag, then the longest matching tag prefix; a
/// registry created with [`RepresenterRegistry::with_base`] checks its own
/// entries before the base's.
#[derive(Default)]
pub struct RepresenterRegistry {
    exact: HashMap<String, Box<RepresentFn>>,
    prefixes: Vec<(String, Box<RepresentFn>)>,
    base: Option<Rc<RepresenterRegistry>>,
}

impl RepresenterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base(base: Rc<RepresenterRegistry>) -> Self {
        Self {
            base: Some(base),
            ..Self::default()
        }
    }

    pub fn add_representer(
        &mut self,
        tag: impl Into<String>,
        represent: impl Fn(&mut Representer, &Value, &str) -> Result<NodeId> + 'static,
    ) {
        self.exact.insert(tag.into(), Box::new(represent));
    }

    /// Representer for every tag starting with `prefix`.
    pub fn add_multi_representer(
        &mut self,
        prefix: impl Into<String>,
        represent: impl Fn(&mut Representer, &Value, &str) -> Result<NodeId> + 'static,
    ) {
        self.prefixes.push((prefix.into(), Box::new(represent)));
    }

    pub fn lookup(&self, tag: &str) -> Option<&RepresentFn> {
        self.lookup_exact(tag).or_else(|| self.lookup_prefix(tag))
    }

    fn lookup_exact(&self, tag: &str) -> Option<&RepresentFn> {
        self.exact.get(tag).map(Box::as_ref).or_else(|| {
            self.base
                .as_deref()
                .and_then(|base| base.lookup_exact(tag))
        })
    }

    fn lookup_prefix(&self, tag: &str) -> Option<&RepresentFn> {
        self.prefixes
            .iter()
            .filter(|(prefix, _)| tag.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, represent)| represent.as_ref())
            .or_else(|| {
                self.base
                    .as_deref()
                    .and_then(|base| base.lookup_prefix(tag))
            })
    }
}

fn is_standard_tag(tag: &str) -> bool {
    [
        TAG_NULL,
        TAG_BOOL,
        TAG_INT,
        TAG_FLOAT,
        TAG_STR,
        TAG_BINARY,
        TAG_TIMESTAMP,
        TAG_SEQ,
        TAG_MAP,
        TAG_OMAP,
        TAG_PAIRS,
        TAG_SET,
    ]
    .contains(&tag)
}

fn is_null_spelling(text: &str) -> bool {
    matches!(text, "" | "~" | "null" | "Null" | "NULL")
}

/// Base64 in lines of 76 characters, each ending with a line break.
fn encode_base64(bytes: &[u8]) -> String {
    let encoded = STANDARD.encode(bytes);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / BASE64_LINE + 1);
    for (index, ch) in encoded.chars().enumerate() {
        if index > 0 && index % BASE64_LINE == 0 {
            out.push('\n');
        }
        out.push(ch);
    }
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

fn decodes_to(spelling: &str, bytes: &[u8]) -> bool {
    let compact: String = spelling.chars().filter(|ch| !ch.is_whitespace()).collect();
    STANDARD
        .decode(compact.as_bytes())
        .is_ok_and(|decoded| decoded == bytes)
}

/// Builds one [`Document`] per call from a value graph.
pub struct Representer {
    registry: Rc<RepresenterRegistry>,
    round_trip: bool,
    default_flow_style: Option<bool>,
    default_version: YamlVersion,
    version: YamlVersion,
    arena: Arena,
    represented: HashMap<usize, NodeId>,
    alias_key: Option<usize>,
    depth: usize,
    max_depth: usize,
    flow_depth: usize,
    in_key: bool,
}

impl Representer {
    pub fn new(registry: Rc<RepresenterRegistry>, options: &DumpOptions) -> Self {
        let version = options.version.unwrap_or_default();
        Self {
            registry,
            round_trip: options.mode == Mode::RoundTrip,
            default_flow_style: options.effective_flow_style(),
            default_version: version,
            version,
            arena: Arena::new(),
            represented: HashMap::new(),
            alias_key: None,
            depth: 0,
            max_depth: options.max_depth,
            flow_depth: 0,
            in_key: false,
        }
    }

    /// Represents `value` as the root of a new document. In round-trip mode
    /// the document-level details recorded on the root (markers, directives
    /// and comments) are carried over.
    pub fn represent(&mut self, value: &Value) -> Result<Document> {
        let document_format = if self.round_trip {
            value.format().document
        } else {
            None
        };
        self.version = document_format
            .as_ref()
            .and_then(|format| format.version)
            .and_then(|(major, minor)| YamlVersion::from_numbers(major, minor))
            .unwrap_or(self.default_version);

        let result = self.represent_data(value);
        let arena = std::mem::replace(&mut self.arena, Arena::new());
        self.represented.clear();
        self.alias_key = None;
        self.depth = 0;
        self.flow_depth = 0;
        self.in_key = false;
        let root = result?;
        trace!("represented {} nodes", arena.len());

        let mut document = Document::new(arena, root);
        if let Some(format) = document_format {
            document.explicit_start = format.explicit_start;
            document.explicit_end = format.explicit_end;
            document.version = format.version;
            document.tags = format.tags;
            document.start_comments = format.start_comments;
            document.end_comments = format.end_comments;
            document.indentless_sequences = format.indentless_sequences;
        }
        Ok(document)
    }

    /// Node of `value`, reusing the node of an earlier reference to the same
    /// collection or anchored scalar.
    pub fn represent_data(&mut self, value: &Value) -> Result<NodeId> {
        let alias_key = if self.ignore_aliases(value) {
            None
        } else {
            value.identity()
        };
        if let Some(key) = alias_key {
            if let Some(&id) = self.represented.get(&key) {
                self.alias_key = None;
                return Ok(id);
            }
        }
        self.alias_key = alias_key;

        let format = value.format();
        if let Some(tag) = format.tag.as_deref() {
            let registry = Rc::clone(&self.registry);
            if let Some(represent) = registry.lookup(tag) {
                return represent(self, value, tag);
            }
            if !self.round_trip && !is_standard_tag(tag) {
                return Err(Error::representer(format!(
                    "cannot represent an object: {value}"
                )));
            }
        }

        match value {
            Value::Null(_) => {
                let text = self.null_text(&format);
                Ok(self.scalar_node(TAG_NULL, text, &format, None))
            }
            Value::Bool(flag, _) => {
                let text = format
                    .spelling
                    .as_deref()
                    .filter(|spelling| self.round_trip && parse_bool(spelling) == Some(*flag))
                    .map(str::to_owned)
                    .unwrap_or_else(|| if *flag { "true" } else { "false" }.to_owned());
                Ok(self.scalar_node(TAG_BOOL, text, &format, None))
            }
            Value::Int(number, _) => {
                let text = match format.int.as_ref().filter(|_| self.round_trip) {
                    Some(int_format) => format_int(*number, int_format),
                    None => itoa::Buffer::new().format(*number).to_owned(),
                };
                Ok(self.scalar_node(TAG_INT, text, &format, None))
            }
            Value::Float(number, _) => {
                let text = match format.float.as_ref().filter(|_| self.round_trip) {
                    Some(float_format) => format_float(*number, float_format),
                    None => format_float_default(*number, self.version),
                };
                Ok(self.scalar_node(TAG_FLOAT, text, &format, None))
            }
            Value::Str(text, _) => Ok(self.scalar_node(TAG_STR, text.clone(), &format, None)),
            Value::Binary(bytes, _) => {
                let text = format
                    .spelling
                    .as_deref()
                    .filter(|spelling| self.round_trip && decodes_to(spelling, bytes))
                    .map(str::to_owned)
                    .unwrap_or_else(|| encode_base64(bytes));
                Ok(self.scalar_node(TAG_BINARY, text, &format, Some(ScalarStyle::Literal)))
            }
            Value::Timestamp(timestamp, _) => {
                let timestamp_format = format.timestamp.as_ref().filter(|_| self.round_trip);
                let text = timestamp.format(timestamp_format);
                Ok(self.scalar_node(TAG_TIMESTAMP, text, &format, None))
            }
            Value::Seq(seq) => {
                let items = seq.items();
                if format.tag.as_deref() == Some(TAG_PAIRS) {
                    self.pairs_node(&items, &format)
                } else {
                    self.sequence_node(TAG_SEQ, &items, &format)
                }
            }
            Value::Map(map) => {
                let (entries, merges, merge_position) = {
                    let data = map.borrow();
                    let entries: Vec<(Value, Value)> = data
                        .entries
                        .iter()
                        .map(|(key, value)| (key.clone(), value.clone()))
                        .collect();
                    (entries, data.merges.clone(), data.merge_position)
                };
                if format.tag.as_deref() == Some(TAG_OMAP) {
                    self.omap_node(&entries, &format)
                } else {
                    self.mapping_node(TAG_MAP, &entries, &merges, merge_position, &format)
                }
            }
            Value::Set(set) => {
                let items = set.items();
                self.set_node(&items, &format)
            }
        }
    }

    /// A scalar node, for use from registered representers.
    pub fn represent_scalar(
        &mut self,
        tag: &str,
        value: impl Into<String>,
        style: Option<ScalarStyle>,
    ) -> NodeId {
        self.push(Node::scalar(tag, value, style))
    }

    /// A sequence node, for use from registered representers.
    pub fn represent_sequence(
        &mut self,
        tag: &str,
        items: &[Value],
        flow_style: Option<bool>,
    ) -> Result<NodeId> {
        let format = Format {
            flow_style,
            ..Format::default()
        };
        self.sequence_node(tag, items, &format)
    }

    /// A mapping node, for use from registered representers.
    pub fn represent_mapping(
        &mut self,
        tag: &str,
        entries: &[(Value, Value)],
        flow_style: Option<bool>,
    ) -> Result<NodeId> {
        let format = Format {
            flow_style,
            ..Format::default()
        };
        self.mapping_node(tag, entries, &[], 0, &format)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.arena.get_mut(id)
    }

    /// Plain scalars are written again each time they occur; an anchored
    /// scalar keeps its alias only in round-trip mode.
    pub fn ignore_aliases(&self, value: &Value) -> bool {
        if value.is_collection() {
            return false;
        }
        !(self.round_trip && value.meta().and_then(Meta::anchor).is_some())
    }

    /// Adds a node and memoizes it for the value currently being represented.
    fn push(&mut self, node: Node) -> NodeId {
        let id = self.arena.push(node);
        if let Some(key) = self.alias_key.take() {
            self.represented.insert(key, id);
        }
        id
    }

    fn decorate(&self, mut node: Node, format: &Format) -> Node {
        if !self.round_trip {
            return node;
        }
        if let Some(tag) = &format.tag {
            node.tag = tag.clone();
            node.explicit_tag = true;
        }
        node.anchor = format.anchor.clone();
        node.comments = format.comments.clone();
        node.end_comments = format.end_comments.clone();
        node
    }

    fn flow_style_for(&self, format: &Format) -> Option<bool> {
        if self.round_trip {
            format.flow_style.or(self.default_flow_style)
        } else {
            self.default_flow_style
        }
    }

    /// A null keeps its spelling when the spelling still reads as null
    /// where it lands. An empty null is only possible as a block value.
    fn null_text(&self, format: &Format) -> String {
        let visible = !self.round_trip || self.depth == 0 || self.in_key || self.flow_depth > 0;
        if self.round_trip {
            if let Some(spelling) = format.spelling.as_deref() {
                if is_null_spelling(spelling) && !(visible && spelling.is_empty()) {
                    return spelling.to_owned();
                }
            }
        }
        if visible { "null" } else { "" }.to_owned()
    }

    fn scalar_node(
        &mut self,
        tag: &str,
        text: String,
        format: &Format,
        default_style: Option<ScalarStyle>,
    ) -> NodeId {
        let style = if self.round_trip {
            format.style.or(default_style)
        } else {
            default_style
        };
        let mut node = self.decorate(Node::scalar(tag, text, style), format);
        if self.round_trip && style == Some(ScalarStyle::Folded) {
            if let NodeData::Scalar { fold_positions, .. } = &mut node.data {
                *fold_positions = Some(format.fold_positions.clone());
            }
        }
        self.push(node)
    }

    fn is_plain_scalar(&self, id: NodeId) -> bool {
        matches!(
            self.arena[id].data,
            NodeData::Scalar {
                style: None | Some(ScalarStyle::Plain),
                ..
            }
        )
    }

    fn set_flow_style(&mut self, id: NodeId, flow: bool) {
        match &mut self.arena[id].data {
            NodeData::Sequence { flow_style, .. } | NodeData::Mapping { flow_style, .. } => {
                *flow_style = Some(flow);
            }
            NodeData::Scalar { .. } => {}
        }
    }

    fn enter(&mut self, flow_style: Option<bool>) -> Result<()> {
        if self.depth >= self.max_depth {
            return Err(Error::representer(format!(
                "exceeded the maximum nesting depth of {}",
                self.max_depth
            )));
        }
        self.depth += 1;
        if flow_style == Some(true) {
            self.flow_depth += 1;
        }
        Ok(())
    }

    fn leave(&mut self, flow_style: Option<bool>) {
        self.depth -= 1;
        if flow_style == Some(true) {
            self.flow_depth -= 1;
        }
    }

    fn represent_key(&mut self, key: &Value) -> Result<NodeId> {
        let outer = std::mem::replace(&mut self.in_key, true);
        let result = self.represent_data(key);
        self.in_key = outer;
        result
    }

    fn sequence_node(&mut self, tag: &str, items: &[Value], format: &Format) -> Result<NodeId> {
        let flow_style = self.flow_style_for(format);
        let node = self.decorate(Node::sequence(tag, flow_style), format);
        let id = self.push(node);
        self.enter(flow_style)?;
        let mut best_style = true;
        for item in items {
            let child = self.represent_data(item)?;
            best_style &= self.is_plain_scalar(child);
            self.arena.push_item(id, child);
        }
        self.leave(flow_style);
        if flow_style.is_none() {
            self.set_flow_style(id, best_style);
        }
        Ok(id)
    }

    fn mapping_node(
        &mut self,
        tag: &str,
        entries: &[(Value, Value)],
        merges: &[Mapping],
        merge_position: usize,
        format: &Format,
    ) -> Result<NodeId> {
        let flow_style = self.flow_style_for(format);
        let node = self.decorate(Node::mapping(tag, flow_style), format);
        let id = self.push(node);
        self.enter(flow_style)?;
        let mut best_style = true;
        for (index, (key, value)) in entries.iter().enumerate() {
            if index == merge_position && !merges.is_empty() {
                self.push_merge(id, merges)?;
                best_style = false;
            }
            let key_id = self.represent_key(key)?;
            let value_id = self.represent_data(value)?;
            best_style &= self.is_plain_scalar(key_id) && self.is_plain_scalar(value_id);
            self.arena.push_pair(id, key_id, value_id);
        }
        if !merges.is_empty() && merge_position >= entries.len() {
            self.push_merge(id, merges)?;
            best_style = false;
        }
        self.leave(flow_style);
        if flow_style.is_none() {
            self.set_flow_style(id, best_style);
        }
        Ok(id)
    }

    /// Writes the `<<` entry back: one merged mapping directly, several as a
    /// flow sequence.
    fn push_merge(&mut self, mapping: NodeId, merges: &[Mapping]) -> Result<()> {
        let key = self.arena.push(Node::scalar(TAG_MERGE, "<<", None));
        let value = match merges {
            [merge] => self.represent_data(&Value::Map(merge.clone()))?,
            _ => {
                let sequence = self.arena.push(Node::sequence(TAG_SEQ, Some(true)));
                self.enter(Some(true))?;
                for merge in merges {
                    let item = self.represent_data(&Value::Map(merge.clone()))?;
                    self.arena.push_item(sequence, item);
                }
                self.leave(Some(true));
                sequence
            }
        };
        self.arena.push_pair(mapping, key, value);
        Ok(())
    }

    /// A single-entry mapping, the item of `omap` and `pairs` sequences.
    fn single_pair(&mut self, key: &Value, value: &Value, flow_style: Option<bool>) -> Result<NodeId> {
        let item_flow = Some(flow_style.unwrap_or(false));
        let item = self.arena.push(Node::mapping(TAG_MAP, item_flow));
        self.enter(item_flow)?;
        let key_id = self.represent_key(key)?;
        let value_id = self.represent_data(value)?;
        self.leave(item_flow);
        self.arena.push_pair(item, key_id, value_id);
        Ok(item)
    }

    fn omap_node(&mut self, entries: &[(Value, Value)], format: &Format) -> Result<NodeId> {
        let flow_style = self.flow_style_for(format);
        let node = self.decorate(Node::sequence(TAG_OMAP, flow_style), format);
        let id = self.push(node);
        self.enter(flow_style)?;
        for (key, value) in entries {
            let item = self.single_pair(key, value, flow_style)?;
            self.arena.push_item(id, item);
        }
        self.leave(flow_style);
        if flow_style.is_none() {
            self.set_flow_style(id, false);
        }
        Ok(id)
    }

    fn pairs_node(&mut self, items: &[Value], format: &Format) -> Result<NodeId> {
        let flow_style = self.flow_style_for(format);
        let node = self.decorate(Node::sequence(TAG_PAIRS, flow_style), format);
        let id = self.push(node);
        self.enter(flow_style)?;
        for item in items {
            let pair = match item {
                Value::Seq(seq) => match seq.items().as_slice() {
                    [key, value] => Some((key.clone(), value.clone())),
                    _ => None,
                },
                _ => None,
            };
            let Some((key, value)) = pair else {
                return Err(Error::representer(format!(
                    "expected a key-value pair in pairs, but found {}",
                    item.kind_name()
                )));
            };
            let item = self.single_pair(&key, &value, flow_style)?;
            self.arena.push_item(id, item);
        }
        self.leave(flow_style);
        if flow_style.is_none() {
            self.set_flow_style(id, false);
        }
        Ok(id)
    }

    fn set_node(&mut self, items: &[Value], format: &Format) -> Result<NodeId> {
        let flow_style = Some(self.flow_style_for(format).unwrap_or(false));
        let node = self.decorate(Node::mapping(TAG_SET, flow_style), format);
        let id = self.push(node);
        self.enter(flow_style)?;
        for item in items {
            let key = self.represent_key(item)?;
            let value = self.arena.push(Node::scalar(TAG_NULL, "", None));
            self.arena.push_pair(id, key, value);
        }
        self.leave(flow_style);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::emitter::Emitter;
    use crate::encode::serializer::Serializer;
    use crate::error::ErrorKind;
    use crate::num::parse_int;
    use crate::value::{Sequence, Set};
    use rstest::rstest;

    fn dump_with(registry: RepresenterRegistry, value: &Value, options: &DumpOptions) -> Result<String> {
        let mut representer = Representer::new(Rc::new(registry), options);
        let document = representer.represent(value)?;
        let mut emitter = Emitter::new(options);
        let mut serializer = Serializer::new(options);
        serializer.open(&mut emitter)?;
        serializer.serialize(&document, &mut emitter)?;
        serializer.close(&mut emitter)?;
        Ok(emitter.finish())
    }

    fn dump(value: &Value, options: &DumpOptions) -> Result<String> {
        dump_with(RepresenterRegistry::new(), value, options)
    }

    fn tagged(value: Value, tag: &str) -> Value {
        let mut value = value;
        value.update_format(|format| format.tag = Some(tag.to_owned()));
        value
    }

    #[rstest]
    fn test_safe_scalars() {
        let map = Mapping::from_entries([
            (Value::from("n"), Value::null()),
            (Value::from("b"), Value::from(true)),
            (Value::from("i"), Value::from(42)),
            (Value::from("f"), Value::from(1.5)),
            (Value::from("s"), Value::from("x")),
            (Value::from("q"), Value::from("42")),
        ]);
        let output = dump(&Value::Map(map), &DumpOptions::safe()).unwrap();
        assert_eq!(output, "n: null\nb: true\ni: 42\nf: 1.5\ns: x\nq: '42'\n");
    }

    #[rstest]
    fn test_round_trip_null_is_empty_in_block_context() {
        let map = Mapping::from_entries([(Value::from("a"), Value::null())]);
        let options = DumpOptions::round_trip();
        assert_eq!(dump(&Value::Map(map), &options).unwrap(), "a:\n");
        assert_eq!(dump(&Value::null(), &options).unwrap(), "null\n");
    }

    #[rstest]
    fn test_null_spelling_is_kept() {
        let tilde = Value::Null(Meta::new(Format {
            spelling: Some("~".into()),
            ..Format::default()
        }));
        let map = Mapping::from_entries([(Value::from("a"), tilde)]);
        let output = dump(&Value::Map(map), &DumpOptions::round_trip()).unwrap();
        assert_eq!(output, "a: ~\n");
    }

    #[rstest]
    fn test_int_format_is_kept_in_round_trip() {
        let (number, int_format) = parse_int("0xff", YamlVersion::V1_2).unwrap();
        let value = Value::Int(
            number,
            Meta::new(Format {
                int: Some(int_format),
                ..Format::default()
            }),
        );
        assert_eq!(dump(&value, &DumpOptions::round_trip()).unwrap(), "0xff\n");
        assert_eq!(dump(&value, &DumpOptions::safe()).unwrap(), "255\n");
    }

    #[rstest]
    fn test_shared_collection_becomes_alias() {
        let shared = Value::Map(Mapping::from_entries([(Value::from("n"), Value::from(1))]));
        let root = Value::from(vec![shared.clone(), shared]);
        let options = DumpOptions::safe().with_default_flow_style(None);
        assert_eq!(dump(&root, &options).unwrap(), "- &id001 {n: 1}\n- *id001\n");
    }

    #[rstest]
    fn test_self_containing_sequence() {
        let seq = Sequence::new();
        seq.push(Value::Seq(seq.clone()));
        let output = dump(&Value::Seq(seq), &DumpOptions::safe()).unwrap();
        assert!(output.starts_with("&id001"), "{output}");
        assert!(output.contains("*id001"), "{output}");
    }

    #[rstest]
    fn test_anchored_scalar_alias_in_round_trip() {
        let anchored = Value::Int(5, Meta::new(Format::default().with_anchor("n")));
        let root = Value::from(vec![anchored.clone(), anchored]);
        let output = dump(&root, &DumpOptions::round_trip()).unwrap();
        assert_eq!(output, "- &n 5\n- *n\n");
    }

    #[rstest]
    fn test_unknown_tag_is_an_error_in_safe_mode() {
        let value = tagged(Value::from("x"), "!custom");
        let err = dump(&value, &DumpOptions::safe()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Representer);
        assert_eq!(err.problem(), Some("cannot represent an object: x"));
    }

    #[rstest]
    fn test_unknown_tag_is_kept_in_round_trip() {
        let value = tagged(Value::from("x"), "!custom");
        assert_eq!(dump(&value, &DumpOptions::round_trip()).unwrap(), "!custom x\n");
    }

    #[rstest]
    fn test_registered_representer() {
        let mut registry = RepresenterRegistry::new();
        registry.add_representer("!upper", |representer, value, tag| {
            let text = value.as_str().unwrap_or_default().to_uppercase();
            Ok(representer.represent_scalar(tag, text, None))
        });
        let value = tagged(Value::from("abc"), "!upper");
        let output = dump_with(registry, &value, &DumpOptions::safe()).unwrap();
        assert_eq!(output, "!upper ABC\n");
    }

    #[rstest]
    fn test_registry_prefers_longest_prefix_then_base() {
        let mut base = RepresenterRegistry::new();
        base.add_representer("!base", |representer, _, tag| {
            Ok(representer.represent_scalar(tag, "base", None))
        });
        let mut registry = RepresenterRegistry::with_base(Rc::new(base));
        registry.add_multi_representer("!", |representer, _, tag| {
            Ok(representer.represent_scalar(tag, "short", None))
        });
        registry.add_multi_representer("!long", |representer, _, tag| {
            Ok(representer.represent_scalar(tag, "long", None))
        });
        let registry = Rc::new(registry);
        let options = DumpOptions::safe();
        let mut representer = Representer::new(registry, &options);
        let long = representer.represent(&tagged(Value::from("x"), "!longer")).unwrap();
        assert_eq!(long.root_node().and_then(Node::scalar_value), Some("long"));
        let base = representer.represent(&tagged(Value::from("x"), "!base")).unwrap();
        assert_eq!(base.root_node().and_then(Node::scalar_value), Some("base"));
    }

    #[rstest]
    fn test_set() {
        let set = Set::from_items([Value::from("a"), Value::from("b")]);
        let output = dump(&Value::Set(set), &DumpOptions::safe()).unwrap();
        assert_eq!(output, "!!set\n? a\n? b\n");
    }

    #[rstest]
    fn test_omap() {
        let map = Mapping::from_entries([(Value::from("a"), Value::from(1)), (Value::from("b"), Value::from(2))]);
        let value = tagged(Value::Map(map), TAG_OMAP);
        let output = dump(&value, &DumpOptions::safe()).unwrap();
        assert_eq!(output, "!!omap\n- a: 1\n- b: 2\n");
    }

    #[rstest]
    fn test_pairs_reject_items_that_are_not_pairs() {
        let value = tagged(Value::from(vec![Value::from(1)]), TAG_PAIRS);
        let err = dump(&value, &DumpOptions::safe()).unwrap_err();
        assert_eq!(
            err.problem(),
            Some("expected a key-value pair in pairs, but found int")
        );
    }

    #[rstest]
    fn test_merge_is_written_back() {
        let base = Mapping::from_entries([(Value::from("a"), Value::from(1))]);
        base.borrow_mut().format.anchor = Some("base".into());
        let own = Mapping::from_entries([(Value::from("b"), Value::from(3))]);
        own.borrow_mut().merges.push(base.clone());
        let root = Value::from(vec![Value::Map(base), Value::Map(own)]);
        let output = dump(&root, &DumpOptions::round_trip()).unwrap();
        assert!(output.contains("&base"), "{output}");
        assert!(output.contains("<<: *base"), "{output}");
        assert!(output.contains("b: 3"), "{output}");
    }

    #[rstest]
    fn test_binary() {
        let output = dump(&Value::from(b"hello".to_vec()), &DumpOptions::safe()).unwrap();
        assert_eq!(output, "!!binary |\n  aGVsbG8=\n");
    }

    #[rstest]
    fn test_base64_lines() {
        let encoded = encode_base64(&[0u8; 120]);
        let lines: Vec<&str> = encoded.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].len(), 76);
        assert!(encoded.ends_with('\n'));
        assert_eq!(encode_base64(&[]), "");
    }

    #[rstest]
    fn test_memo_is_reset_between_documents() {
        let options = DumpOptions::safe();
        let mut representer = Representer::new(Rc::new(RepresenterRegistry::new()), &options);
        let shared = Value::from(vec![Value::from(1)]);
        let first = representer.represent(&shared).unwrap();
        let second = representer.represent(&shared).unwrap();
        assert_eq!(first.arena.len(), 2);
        assert_eq!(second.arena.len(), 2);
    }
}
